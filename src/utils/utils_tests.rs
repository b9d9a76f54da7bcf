// Test suite for the utils module
// Covers error construction, conversions and formatting.

use crate::utils::error::{PluginError, Result};

#[cfg(test)]
mod error_tests {
    use super::*;
    use std::io;

    /// Test creating a backend error through the helper
    #[test]
    fn test_backend_error_creation() {
        let error = PluginError::backend("Corsair", "device not found");
        assert_eq!(format!("{}", error), "Corsair SDK error: device not found");
    }

    /// Test conversion from std::io::Error to PluginError
    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed");
        let error: PluginError = io_error.into();
        match error {
            PluginError::Io(inner) => assert_eq!(inner.kind(), io::ErrorKind::BrokenPipe),
            _ => panic!("Expected Io error"),
        }
    }

    /// Test conversion from TOML deserialization error
    #[test]
    fn test_toml_de_error_conversion() {
        let result: std::result::Result<toml::Value, toml::de::Error> = toml::from_str("invalid toml [");
        let toml_error = result.unwrap_err();
        let error: PluginError = toml_error.into();
        match error {
            PluginError::Config(_) => (),
            _ => panic!("Expected Config error from TOML deserialization"),
        }
    }

    /// Test the Result type alias with `?` propagation
    #[test]
    fn test_error_propagation() {
        fn parse_step(input: &str) -> Result<u8> {
            input
                .parse::<u8>()
                .map_err(|e| PluginError::InvalidArguments(e.to_string()))
        }

        fn doubled(input: &str) -> Result<u16> {
            Ok(u16::from(parse_step(input)?) * 2)
        }

        assert_eq!(doubled("10").unwrap(), 20);
        assert!(matches!(doubled("300"), Err(PluginError::InvalidArguments(_))));
    }

    /// Test error message formatting
    #[test]
    fn test_error_formatting() {
        let error_cases = vec![
            (PluginError::Unavailable("Logitech".to_string()), "Logitech SDK is unavailable"),
            (PluginError::InvalidArguments("Bad input".to_string()), "Invalid arguments: Bad input"),
            (PluginError::Config("bad key".to_string()), "Configuration error: bad key"),
            (PluginError::Logging("twice".to_string()), "Logging error: twice"),
            (PluginError::NotFound("mouse".to_string()), "Resource not found: mouse"),
        ];

        for (error, expected) in error_cases {
            assert_eq!(format!("{}", error), expected);
        }
    }
}

#[cfg(test)]
mod tracing_tests {
    use super::*;
    use crate::utils::tracing::setup_tracing;

    /// Test that logging creates the log directory and installs only once
    #[test]
    fn test_setup_tracing_once() {
        let dir = tempfile::tempdir().unwrap();
        let log_file = dir.path().join("logs").join("plugin.log");

        setup_tracing(&log_file, "debug", false).unwrap();
        assert!(log_file.exists());

        let again: Result<()> = setup_tracing(&log_file, "debug", false);
        assert!(matches!(again, Err(PluginError::Logging(_))));
    }
}
