//! Bindings of a template to the records it renders.

use std::collections::HashMap;

use crate::domain::error::FinpromptError;
use crate::domain::template::TemplateMeta;

/// One template bound to ordered flat records. Frozen at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateDataContainer {
    template: TemplateMeta,
    records: Vec<HashMap<String, String>>,
}

impl TemplateDataContainer {
    pub fn new(template: TemplateMeta, records: Vec<HashMap<String, String>>) -> Self {
        TemplateDataContainer { template, records }
    }

    pub fn template(&self) -> &TemplateMeta {
        &self.template
    }

    pub fn records(&self) -> &[HashMap<String, String>] {
        &self.records
    }

    /// Render every record through the template, newline-joined in order.
    ///
    /// The record list must be non-empty and the first record must carry
    /// every declared input variable. Later records are not pre-checked;
    /// a key missing there surfaces as `MissingVariable` during its own
    /// render.
    pub fn format_prompt(&self) -> Result<String, FinpromptError> {
        let first = self
            .records
            .first()
            .ok_or_else(|| FinpromptError::Validation {
                reason: "container has no records to render".to_string(),
            })?;
        for variable in &self.template.input_variables {
            if !first.contains_key(variable) {
                return Err(FinpromptError::Validation {
                    reason: format!("first record is missing input variable '{}'", variable),
                });
            }
        }

        let mut rendered = Vec::with_capacity(self.records.len());
        for record in &self.records {
            rendered.push(self.template.render(record)?);
        }
        Ok(rendered.join("\n"))
    }
}

/// An ordered set of containers, frozen at construction.
///
/// Build-up happens on a plain `Vec` before `new`; the collection itself
/// never grows.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateDataContainerCollection {
    containers: Vec<TemplateDataContainer>,
}

impl TemplateDataContainerCollection {
    pub fn new(containers: Vec<TemplateDataContainer>) -> Self {
        TemplateDataContainerCollection { containers }
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TemplateDataContainer> {
        self.containers.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TemplateDataContainer> {
        self.containers.iter()
    }

    /// A new collection holding `self`'s containers followed by `other`'s.
    pub fn concat(&self, other: &TemplateDataContainerCollection) -> TemplateDataContainerCollection {
        let mut containers = self.containers.clone();
        containers.extend(other.containers.iter().cloned());
        TemplateDataContainerCollection::new(containers)
    }

    /// Render every container, newline-joined in order.
    pub fn format_prompt(&self) -> Result<String, FinpromptError> {
        let mut rendered = Vec::with_capacity(self.containers.len());
        for container in &self.containers {
            rendered.push(container.format_prompt()?);
        }
        Ok(rendered.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::template::TemplateBody;

    fn line_template() -> TemplateMeta {
        TemplateMeta {
            input_variables: vec!["value".to_string()],
            prompt_type: "test".to_string(),
            body: TemplateBody::Simple("line {value}".to_string()),
        }
    }

    fn record(value: &str) -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("value".to_string(), value.to_string());
        map
    }

    #[test]
    fn renders_records_in_order() {
        let container =
            TemplateDataContainer::new(line_template(), vec![record("one"), record("two")]);
        assert_eq!(container.format_prompt().unwrap(), "line one\nline two");
    }

    #[test]
    fn empty_container_is_rejected() {
        let container = TemplateDataContainer::new(line_template(), vec![]);
        let err = container.format_prompt().unwrap_err();
        assert!(matches!(err, FinpromptError::Validation { .. }));
    }

    #[test]
    fn first_record_must_carry_all_input_variables() {
        let container = TemplateDataContainer::new(line_template(), vec![HashMap::new()]);
        let err = container.format_prompt().unwrap_err();
        assert!(
            matches!(err, FinpromptError::Validation { reason } if reason.contains("value"))
        );
    }

    // Only the first record is pre-validated. A hole in a later record is
    // not caught up front; it fails as MissingVariable once that record
    // renders.
    #[test]
    fn later_records_fail_at_render_time() {
        let container =
            TemplateDataContainer::new(line_template(), vec![record("one"), HashMap::new()]);
        let err = container.format_prompt().unwrap_err();
        assert!(
            matches!(err, FinpromptError::MissingVariable { variable } if variable == "value")
        );
    }

    #[test]
    fn collection_joins_containers_with_newlines() {
        let a = TemplateDataContainer::new(line_template(), vec![record("a1"), record("a2")]);
        let b = TemplateDataContainer::new(line_template(), vec![record("b1")]);
        let collection = TemplateDataContainerCollection::new(vec![a, b]);
        assert_eq!(
            collection.format_prompt().unwrap(),
            "line a1\nline a2\nline b1"
        );
    }

    #[test]
    fn concat_preserves_order_and_line_count() {
        let make = |values: &[&str]| {
            TemplateDataContainerCollection::new(vec![TemplateDataContainer::new(
                line_template(),
                values.iter().map(|v| record(v)).collect(),
            )])
        };
        let left = make(&["1", "2", "3"]);
        let right = make(&["4", "5"]);
        let merged = left.concat(&right);
        assert_eq!(merged.len(), 2);
        let text = merged.format_prompt().unwrap();
        assert_eq!(text.lines().count(), 5);
        assert!(text.starts_with("line 1"));
        assert!(text.ends_with("line 5"));
    }

    #[test]
    fn empty_collection_renders_empty() {
        let collection = TemplateDataContainerCollection::new(vec![]);
        assert_eq!(collection.format_prompt().unwrap(), "");
    }
}
