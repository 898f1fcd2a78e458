//! Built-in template set seeded into a fresh store.

use crate::domain::template::{TemplateBody, TemplateMeta};

pub const OHLC_TYPE: &str = "ohlc";
pub const TEXT_TYPE: &str = "text";
pub const EXAMPLE_TYPE: &str = "example";
pub const SYSTEM_TYPE: &str = "system";

/// Human turn asked at the end of every composed prompt. Not stored;
/// deployments swap wording by re-seeding the stored templates, the
/// question itself is fixed.
pub const QUESTION_TURN: &str = concat!(
    "Given the most recent market data:\n",
    "{current_window}\n",
    "Will {prediction_symbol} increase or decrease by {prediction_date}?\n",
    "Answer with exactly one word: Increase or Decrease."
);

pub fn ohlc_template() -> TemplateMeta {
    TemplateMeta {
        input_variables: vec![
            "datapoint_symbol".to_string(),
            "datapoint_timestamp".to_string(),
            "datapoint_interval".to_string(),
            "datapoint_open".to_string(),
            "datapoint_high".to_string(),
            "datapoint_low".to_string(),
            "datapoint_close".to_string(),
            "datapoint_volume".to_string(),
        ],
        prompt_type: OHLC_TYPE.to_string(),
        body: TemplateBody::Simple(
            concat!(
                "What is the performance of {datapoint_symbol} on {datapoint_timestamp} ",
                "with interval {datapoint_interval}?\n",
                "The performance of {datapoint_symbol} on {datapoint_timestamp} ",
                "({datapoint_interval}) is {datapoint_open} {datapoint_high} ",
                "{datapoint_low} {datapoint_close} {datapoint_volume}"
            )
            .to_string(),
        ),
    }
}

pub fn text_template() -> TemplateMeta {
    TemplateMeta {
        input_variables: vec![
            "datapoint_symbol".to_string(),
            "datapoint_timestamp".to_string(),
            "datapoint_interval".to_string(),
            "datapoint_text".to_string(),
        ],
        prompt_type: TEXT_TYPE.to_string(),
        body: TemplateBody::Simple(
            concat!(
                "What is the news for {datapoint_symbol} on {datapoint_timestamp} ",
                "with interval {datapoint_interval}?\n",
                "The news for {datapoint_symbol} on {datapoint_timestamp} ",
                "({datapoint_interval}) is {datapoint_text}"
            )
            .to_string(),
        ),
    }
}

pub fn example_template() -> TemplateMeta {
    TemplateMeta {
        input_variables: vec![
            "ohlc_window".to_string(),
            "text_window".to_string(),
            "prediction".to_string(),
        ],
        prompt_type: EXAMPLE_TYPE.to_string(),
        body: TemplateBody::Simple("{ohlc_window}\n{text_window}\n{prediction}".to_string()),
    }
}

pub fn system_template() -> TemplateMeta {
    TemplateMeta {
        input_variables: vec!["examples".to_string()],
        prompt_type: SYSTEM_TYPE.to_string(),
        body: TemplateBody::Simple(
            "You are a helpful assistant, an expert in finance.\nExamples:\n{examples}".to_string(),
        ),
    }
}

/// The four stored templates, in seeding order.
pub fn all() -> Vec<TemplateMeta> {
    vec![
        ohlc_template(),
        text_template(),
        example_template(),
        system_template(),
    ]
}
