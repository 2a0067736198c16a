//! Common error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Logging error: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Config("Invalid log filter: bogus".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid log filter: bogus");

        let err = Error::Logging("already set".to_string());
        assert!(err.to_string().starts_with("Logging error"));
    }
}
