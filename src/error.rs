//! Error type for the I/O, configuration and request-validation layers.
//!
//! The simulation core itself is infallible; errors only arise when reading
//! history, loading configuration or accepting requests.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced by the planner's outer layers.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid configuration: {}", join_errors(.0))]
    InvalidConfig(Vec<ConfigError>),

    #[error("unknown preset '{name}', available: {available}")]
    UnknownPreset { name: String, available: String },

    #[error("unsupported sample file '{}': expected .csv or .json", .0.display())]
    UnsupportedFormat(PathBuf),
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<Vec<ConfigError>> for PlannerError {
    fn from(errors: Vec<ConfigError>) -> Self {
        Self::InvalidConfig(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_config_lists_every_field() {
        let err = PlannerError::from(vec![
            ConfigError {
                field: "scenario.added_pv_percent".into(),
                message: "must be >= 0".into(),
            },
            ConfigError {
                field: "costs.cost_per_kwp".into(),
                message: "must be >= 0".into(),
            },
        ]);
        let msg = err.to_string();
        assert!(msg.contains("scenario.added_pv_percent"));
        assert!(msg.contains("costs.cost_per_kwp"));
    }

    #[test]
    fn unsupported_format_names_path() {
        let err = PlannerError::UnsupportedFormat(PathBuf::from("history.xlsx"));
        assert!(err.to_string().contains("history.xlsx"));
    }
}
