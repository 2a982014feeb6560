/// The run configuration is malformed or missing a required field.
///
/// Always detected before the bench binary is spawned.
#[derive(derive_more::Error, derive_more::Display, Debug)]
#[display("Invalid run configuration: {msg}")]
pub struct ConfigError {
    msg: String,
}

impl ConfigError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }

    /// Shorthand for a required field that was never set.
    pub fn missing(field: &str) -> Self {
        Self::new(format!("required field '{field}' is not set"))
    }

    pub fn message(&self) -> &str {
        &self.msg
    }
}

/// The bench binary could not be started.
///
/// Carries the underlying I/O error when the failure came from the operating system.
#[derive(derive_more::Error, derive_more::Display, Debug)]
#[display("Failed to launch bench binary: {msg}")]
pub struct LaunchError {
    msg: String,
    source: Option<std::io::Error>,
}

impl LaunchError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            source: None,
        }
    }

    pub fn with_source(msg: impl Into<String>, source: std::io::Error) -> Self {
        Self {
            msg: msg.into(),
            source: Some(source),
        }
    }

    pub fn message(&self) -> &str {
        &self.msg
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn config_error_names_missing_field() {
        let err = ConfigError::missing("model_path");
        assert_eq!(
            err.to_string(),
            "Invalid run configuration: required field 'model_path' is not set"
        );
    }

    #[test]
    fn launch_error_exposes_io_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = LaunchError::with_source("/opt/bench", io);
        assert_eq!(err.to_string(), "Failed to launch bench binary: /opt/bench");
        assert!(err.source().is_some());

        assert!(LaunchError::new("plain").source().is_none());
    }
}
