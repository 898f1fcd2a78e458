//! Configuration validation.
//!
//! Checks the `[engine]` and `[request]` sections up front, before any
//! pipeline touches the store.

use crate::domain::data_point::{Interval, parse_timestamp};
use crate::domain::error::FinpromptError;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDateTime;

pub fn validate_engine_config(config: &dyn ConfigPort) -> Result<(), FinpromptError> {
    validate_window_size(config)?;
    validate_min_points(config)?;
    Ok(())
}

pub fn validate_request_config(config: &dyn ConfigPort) -> Result<(), FinpromptError> {
    validate_symbol(config)?;
    validate_interval(config)?;
    validate_dates(config)?;
    Ok(())
}

// window_size falls back to a default when absent; present means valid.
fn validate_window_size(config: &dyn ConfigPort) -> Result<(), FinpromptError> {
    if config.get_string("engine", "window_size").is_none() {
        return Ok(());
    }
    let value = config.get_int("engine", "window_size", 0);
    if value < 1 {
        return Err(FinpromptError::ConfigInvalid {
            section: "engine".to_string(),
            key: "window_size".to_string(),
            reason: "window_size must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn validate_min_points(config: &dyn ConfigPort) -> Result<(), FinpromptError> {
    if config.get_string("engine", "min_points").is_none() {
        return Ok(());
    }
    let value = config.get_int("engine", "min_points", 0);
    if value < 2 {
        return Err(FinpromptError::ConfigInvalid {
            section: "engine".to_string(),
            key: "min_points".to_string(),
            reason: "min_points must be at least 2".to_string(),
        });
    }
    Ok(())
}

fn validate_symbol(config: &dyn ConfigPort) -> Result<(), FinpromptError> {
    match config.get_string("request", "symbol") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(FinpromptError::ConfigMissing {
            section: "request".to_string(),
            key: "symbol".to_string(),
        }),
    }
}

fn validate_interval(config: &dyn ConfigPort) -> Result<(), FinpromptError> {
    match config.get_string("request", "interval") {
        None => Err(FinpromptError::ConfigMissing {
            section: "request".to_string(),
            key: "interval".to_string(),
        }),
        Some(s) => match Interval::parse(s.trim()) {
            Some(_) => Ok(()),
            None => Err(FinpromptError::ConfigInvalid {
                section: "request".to_string(),
                key: "interval".to_string(),
                reason: format!("unknown interval '{}', expected W, D or H1", s.trim()),
            }),
        },
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), FinpromptError> {
    let start_str = config.get_string("request", "start_date");
    let end_str = config.get_string("request", "end_date");
    let prediction_str = config.get_string("request", "prediction_date");

    let start = parse_request_timestamp(start_str.as_deref(), "start_date")?;
    let end = parse_request_timestamp(end_str.as_deref(), "end_date")?;
    let prediction = parse_request_timestamp(prediction_str.as_deref(), "prediction_date")?;

    if start >= end {
        return Err(FinpromptError::ConfigInvalid {
            section: "request".to_string(),
            key: "start_date".to_string(),
            reason: "start_date must be before end_date".to_string(),
        });
    }
    if prediction <= end {
        return Err(FinpromptError::ConfigInvalid {
            section: "request".to_string(),
            key: "prediction_date".to_string(),
            reason: "prediction_date must be after end_date".to_string(),
        });
    }
    Ok(())
}

fn parse_request_timestamp(
    value: Option<&str>,
    field: &str,
) -> Result<NaiveDateTime, FinpromptError> {
    match value {
        None => Err(FinpromptError::ConfigMissing {
            section: "request".to_string(),
            key: field.to_string(),
        }),
        Some(s) => parse_timestamp(s.trim()).ok_or_else(|| FinpromptError::ConfigInvalid {
            section: "request".to_string(),
            key: field.to_string(),
            reason: format!(
                "invalid {} format, expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS",
                field
            ),
        }),
    }
}
