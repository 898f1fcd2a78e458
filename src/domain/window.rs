//! Sliding-window generation over a merged timestamp index.
//!
//! Windows are cut from the sorted union of OHLC and text timestamps. A
//! window whose last entry lands on a weekend is extended to reach the
//! following Monday; one that would run off the index is dropped.

use std::collections::{BTreeSet, HashMap};

use chrono::{Datelike, NaiveDateTime};

use crate::domain::container::{TemplateDataContainer, TemplateDataContainerCollection};
use crate::domain::data_point::{OhlcPoint, TextPoint};
use crate::domain::dataset::Dataset;
use crate::domain::error::FinpromptError;
use crate::domain::template::TemplateMeta;

pub const INCREASE_LABEL: &str = "Increase";
pub const DECREASE_LABEL: &str = "Decrease";

/// Everything the factory needs, passed explicitly at construction.
#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub window_size: usize,
    pub example_template: TemplateMeta,
    pub ohlc_template: TemplateMeta,
    pub text_template: TemplateMeta,
}

/// Builds rendered example containers from sliding windows over a pair
/// of datasets.
pub struct WindowFactory {
    config: WindowConfig,
}

/// Sorted union of distinct timestamps across both datasets.
pub fn merge_date_index(
    ohlc: &Dataset<OhlcPoint>,
    text: &Dataset<TextPoint>,
) -> Vec<NaiveDateTime> {
    let unique: BTreeSet<NaiveDateTime> = ohlc
        .iter()
        .map(|p| p.timestamp)
        .chain(text.iter().map(|p| p.timestamp))
        .collect();
    unique.into_iter().collect()
}

// Monday is 0, Sunday is 6. A window ending on Saturday needs 2 more
// positions to clear the weekend, one ending on Sunday needs 1.
fn weekend_skip(ts: NaiveDateTime) -> usize {
    let to_monday = 7 - ts.weekday().num_days_from_monday() as usize;
    if to_monday <= 2 { to_monday } else { 0 }
}

/// Every point except those at exactly `held_out`.
fn drop_timestamp<T, F>(points: &Dataset<T>, held_out: NaiveDateTime, timestamp: F) -> Dataset<T>
where
    T: Clone,
    F: Fn(&T) -> NaiveDateTime,
{
    points
        .iter()
        .filter(|p| timestamp(p) != held_out)
        .cloned()
        .collect()
}

/// The points whose timestamps fall inside `window`, sorted ascending.
///
/// `window` must be sorted; sub-slices of a merged index are.
fn filter_window<T, F>(points: &Dataset<T>, window: &[NaiveDateTime], timestamp: F) -> Dataset<T>
where
    T: Clone,
    F: Fn(&T) -> NaiveDateTime,
{
    let mut kept: Vec<T> = points
        .iter()
        .filter(|p| window.binary_search(&timestamp(p)).is_ok())
        .cloned()
        .collect();
    kept.sort_by_key(|p| timestamp(p));
    Dataset::new(kept)
}

/// Label for a full window plus the timestamp of the held-out bar, or
/// `None` when there are no bars to label. A flat close counts as
/// Decrease.
fn window_prediction(window: &Dataset<OhlcPoint>) -> Option<(&'static str, NaiveDateTime)> {
    let first = window.points().first()?;
    let last = window.points().last()?;
    let label = if last.close - first.close > 0.0 {
        INCREASE_LABEL
    } else {
        DECREASE_LABEL
    };
    Some((label, last.timestamp))
}

/// Rendered text for one side of a window, `""` when it has no points.
fn render_window(
    template: &TemplateMeta,
    records: Vec<HashMap<String, String>>,
) -> Result<String, FinpromptError> {
    if records.is_empty() {
        return Ok(String::new());
    }
    TemplateDataContainer::new(template.clone(), records).format_prompt()
}

impl WindowFactory {
    pub fn new(config: WindowConfig) -> Result<Self, FinpromptError> {
        if config.window_size == 0 {
            return Err(FinpromptError::Validation {
                reason: "window_size must be at least 1".to_string(),
            });
        }
        Ok(WindowFactory { config })
    }

    pub fn window_size(&self) -> usize {
        self.config.window_size
    }

    /// Lazy windows over a sorted index.
    ///
    /// A start position yields `window_size` entries, extended past a
    /// weekend when the last entry lands on one, or nothing when the
    /// extension overruns the index.
    pub fn index_windows<'a>(
        &self,
        index: &'a [NaiveDateTime],
    ) -> impl Iterator<Item = &'a [NaiveDateTime]> {
        let k = self.config.window_size;
        (0..(index.len() + 1).saturating_sub(k)).filter_map(move |start| {
            let end = start + k + weekend_skip(index[start + k - 1]);
            if end <= index.len() {
                Some(&index[start..end])
            } else {
                None
            }
        })
    }

    /// One container spanning the full merged index, with no prediction.
    ///
    /// Empty inputs produce a container whose window fields render as
    /// empty strings, not an error.
    pub fn data(
        &self,
        ohlc: &Dataset<OhlcPoint>,
        text: &Dataset<TextPoint>,
    ) -> Result<TemplateDataContainer, FinpromptError> {
        let index = merge_date_index(ohlc, text);
        let ohlc_window = filter_window(ohlc, &index, |p| p.timestamp);
        let text_window = filter_window(text, &index, |p| p.timestamp);
        self.window_container(&ohlc_window, &text_window, "")
    }

    /// One rendered container per sliding window.
    ///
    /// With `include_predictions`, each window is labeled from its own
    /// close-to-close move and the held-out timestamp is dropped from
    /// both sides before rendering. Too few points for a single window
    /// yields an empty collection; minimum-data enforcement belongs to
    /// the caller.
    pub fn data_windows(
        &self,
        ohlc: &Dataset<OhlcPoint>,
        text: &Dataset<TextPoint>,
        include_predictions: bool,
    ) -> Result<TemplateDataContainerCollection, FinpromptError> {
        let index = merge_date_index(ohlc, text);
        let mut containers = Vec::new();

        for window in self.index_windows(&index) {
            let mut ohlc_window = filter_window(ohlc, window, |p| p.timestamp);
            let mut text_window = filter_window(text, window, |p| p.timestamp);

            let mut prediction = "";
            if include_predictions {
                if let Some((label, held_out)) = window_prediction(&ohlc_window) {
                    prediction = label;
                    ohlc_window = drop_timestamp(&ohlc_window, held_out, |p| p.timestamp);
                    text_window = drop_timestamp(&text_window, held_out, |p| p.timestamp);
                }
            }

            containers.push(self.window_container(&ohlc_window, &text_window, prediction)?);
        }

        Ok(TemplateDataContainerCollection::new(containers))
    }

    fn window_container(
        &self,
        ohlc_window: &Dataset<OhlcPoint>,
        text_window: &Dataset<TextPoint>,
        prediction: &str,
    ) -> Result<TemplateDataContainer, FinpromptError> {
        let ohlc_rendered = render_window(
            &self.config.ohlc_template,
            ohlc_window.iter().map(OhlcPoint::template_record).collect(),
        )?;
        let text_rendered = render_window(
            &self.config.text_template,
            text_window.iter().map(TextPoint::template_record).collect(),
        )?;

        let mut record = HashMap::new();
        record.insert("ohlc_window".to_string(), ohlc_rendered);
        record.insert("text_window".to_string(), text_rendered);
        record.insert("prediction".to_string(), prediction.to_string());

        Ok(TemplateDataContainer::new(
            self.config.example_template.clone(),
            vec![record],
        ))
    }
}
