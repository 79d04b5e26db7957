/// Errors returned when asking an engine for a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    #[error("the game is already over")]
    GameOver,

    #[error("no legal moves are available")]
    NoLegalMoves,
}

/// Errors that can occur while sampling a temperature source.
#[derive(Debug, thiserror::Error)]
pub enum ThermalError {
    #[error("failed to read temperature sensor: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse temperature reading {0:?}")]
    Parse(String),

    #[error("no temperature reading available")]
    Unavailable,
}

/// Errors that can occur when building an engine from configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown difficulty {0:?} (expected permissive, balanced or aggressive)")]
    UnknownDifficulty(String),

    #[error("config validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_error_display() {
        assert_eq!(SearchError::GameOver.to_string(), "the game is already over");
    }

    #[test]
    fn test_thermal_error_display() {
        let err = ThermalError::Parse("hot".to_string());
        assert_eq!(err.to_string(), "could not parse temperature reading \"hot\"");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Validation("reduced depth must be >= 1".to_string());
        assert_eq!(
            err.to_string(),
            "config validation error: reduced depth must be >= 1"
        );
    }
}
