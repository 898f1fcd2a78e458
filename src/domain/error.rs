//! Domain error types.

/// Top-level error type for finprompt.
#[derive(Debug, thiserror::Error)]
pub enum FinpromptError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("missing template variable '{variable}'")]
    MissingVariable { variable: String },

    #[error("validation error: {reason}")]
    Validation { reason: String },

    #[error("template lookup for type '{prompt_type}' matched {found} templates, expected exactly 1")]
    TemplateLookup { prompt_type: String, found: usize },

    #[error("insufficient data for {symbol}: have {points} points, need {minimum}")]
    InsufficientData {
        symbol: String,
        points: usize,
        minimum: usize,
    },

    #[error("llm error: {reason}")]
    Llm { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&FinpromptError> for std::process::ExitCode {
    fn from(err: &FinpromptError) -> Self {
        let code: u8 = match err {
            FinpromptError::Io(_) => 1,
            FinpromptError::ConfigParse { .. }
            | FinpromptError::ConfigMissing { .. }
            | FinpromptError::ConfigInvalid { .. } => 2,
            FinpromptError::Database { .. } | FinpromptError::DatabaseQuery { .. } => 3,
            FinpromptError::MissingVariable { .. }
            | FinpromptError::Validation { .. }
            | FinpromptError::TemplateLookup { .. } => 4,
            FinpromptError::InsufficientData { .. } => 5,
            FinpromptError::Llm { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::ExitCode;

    // ExitCode exposes no getter, so compare against the same constructor
    // through the Debug rendering.
    fn assert_exit_code(err: FinpromptError, expected: u8) {
        let code: ExitCode = (&err).into();
        assert_eq!(
            format!("{code:?}"),
            format!("{:?}", ExitCode::from(expected)),
            "wrong exit code for: {err}"
        );
    }

    #[test]
    fn io_errors_exit_with_one() {
        assert_exit_code(FinpromptError::Io(std::io::Error::other("disk gone")), 1);
    }

    #[test]
    fn config_errors_exit_with_two() {
        assert_exit_code(
            FinpromptError::ConfigParse {
                file: "finprompt.ini".to_string(),
                reason: "bad section header".to_string(),
            },
            2,
        );
        assert_exit_code(
            FinpromptError::ConfigMissing {
                section: "request".to_string(),
                key: "symbol".to_string(),
            },
            2,
        );
        assert_exit_code(
            FinpromptError::ConfigInvalid {
                section: "request".to_string(),
                key: "interval".to_string(),
                reason: "unknown interval 'M'".to_string(),
            },
            2,
        );
    }

    #[test]
    fn database_errors_exit_with_three() {
        assert_exit_code(
            FinpromptError::Database {
                reason: "connection reset".to_string(),
            },
            3,
        );
        assert_exit_code(
            FinpromptError::DatabaseQuery {
                reason: "unexpected null column".to_string(),
            },
            3,
        );
    }

    #[test]
    fn template_errors_exit_with_four() {
        assert_exit_code(
            FinpromptError::MissingVariable {
                variable: "examples".to_string(),
            },
            4,
        );
        assert_exit_code(
            FinpromptError::Validation {
                reason: "records disagree on keys".to_string(),
            },
            4,
        );
        assert_exit_code(
            FinpromptError::TemplateLookup {
                prompt_type: "example".to_string(),
                found: 0,
            },
            4,
        );
    }

    #[test]
    fn insufficient_data_exits_with_five() {
        assert_exit_code(
            FinpromptError::InsufficientData {
                symbol: "AAPL".to_string(),
                points: 2,
                minimum: 3,
            },
            5,
        );
    }

    #[test]
    fn llm_errors_exit_with_six() {
        assert_exit_code(
            FinpromptError::Llm {
                reason: "model unavailable".to_string(),
            },
            6,
        );
    }
}
