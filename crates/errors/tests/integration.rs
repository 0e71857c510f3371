//! Integration tests for error types

#[cfg(test)]
mod tests {
    use cmeval_errors::*;

    #[test]
    fn test_error_conversion() {
        let parse_err = ParseError::UnterminatedQuote {
            file: "CMakeLists.txt".into(),
            line: 4,
        };
        let err: Error = parse_err.into();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_error_display() {
        let err = ConfigError::NotFound {
            path: "/etc/cmeval.toml".into(),
        };
        assert_eq!(err.to_string(), "config file not found: /etc/cmeval.toml");
    }

    #[test]
    fn test_error_clone() {
        let err = EvalError::Stopped {
            reason: "fatal diagnostic".into(),
        };
        let cloned = err.clone();
        assert_eq!(err.to_string(), cloned.to_string());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io { .. }));
    }
}
