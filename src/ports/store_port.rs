//! Storage access port trait.

use chrono::NaiveDateTime;

use crate::domain::data_point::{DataPoint, Interval};
use crate::domain::dataset::Dataset;
use crate::domain::error::FinpromptError;
use crate::domain::template::TemplateMeta;

pub trait StorePort {
    /// Mixed-variant points for one symbol over `[start, end]` at the
    /// given interval, timestamp-ascending.
    fn fetch_data(
        &self,
        symbol: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        interval: Interval,
    ) -> Result<Dataset<DataPoint>, FinpromptError>;

    fn store_data(&self, dataset: &Dataset<DataPoint>) -> Result<(), FinpromptError>;

    /// All templates, or only those with the given `prompt_type`.
    fn fetch_templates(
        &self,
        prompt_type: Option<&str>,
    ) -> Result<Vec<TemplateMeta>, FinpromptError>;

    fn store_templates(&self, templates: &[TemplateMeta]) -> Result<(), FinpromptError>;

    /// Earliest timestamp, latest timestamp and point count for a symbol.
    fn data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, FinpromptError>;
}
