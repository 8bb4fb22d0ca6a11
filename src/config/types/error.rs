//! Configuration error types.

use owo_colors::OwoColorize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// ConfigError
// ============================================================================

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config file parsing error")]
    Toml(#[from] toml::de::Error),

    #[error("{0}")]
    Validation(ConfigProblems),
}

// ============================================================================
// ConfigProblems
// ============================================================================

/// Validation problems, collected so they can be reported together.
#[derive(Debug, Default)]
pub struct ConfigProblems {
    problems: Vec<(&'static str, String)>,
}

impl ConfigProblems {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a problem with the field at `field` (e.g. `avif.speed`).
    pub fn error(&mut self, field: &'static str, message: impl Into<String>) {
        self.problems.push((field, message.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.problems.len()
    }

    #[allow(dead_code)]
    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.problems.iter().map(|(field, _)| *field)
    }

    /// Convert to Result (returns Err if there are problems).
    pub fn into_result(self) -> Result<(), ConfigError> {
        if self.problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(self))
        }
    }
}

impl fmt::Display for ConfigProblems {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", "config validation failed:".red().bold())?;
        for (field, message) in &self.problems {
            write!(
                f,
                "\n{}{}{} {} {}",
                "[".dimmed(),
                field.cyan(),
                "]".dimmed(),
                "→".red(),
                message
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigProblems {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_config_error_display() {
        let io_err = ConfigError::Io(
            PathBuf::from("test.toml"),
            Error::new(ErrorKind::NotFound, "file not found"),
        );
        let display = format!("{io_err}");
        assert!(display.contains("IO error"));
        assert!(display.contains("test.toml"));

        let mut problems = ConfigProblems::new();
        problems.error("marker", "must not be empty");
        let display = format!("{}", ConfigError::Validation(problems));
        assert!(display.contains("marker"));
        assert!(display.contains("must not be empty"));
    }

    #[test]
    fn test_problems_into_result() {
        assert!(ConfigProblems::new().into_result().is_ok());

        let mut problems = ConfigProblems::new();
        problems.error("jxl.effort", "out of range");
        problems.error("avif.speed", "out of range");
        assert_eq!(problems.len(), 2);
        assert!(matches!(
            problems.into_result(),
            Err(ConfigError::Validation(p)) if p.len() == 2
        ));
    }
}
