//! Error types for the logger hierarchy

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Neither the logger nor any of its ancestors carries a level.
    ///
    /// The root of a correctly initialized repository always has one, so this
    /// means the repository itself is broken.
    #[error("No level specified for logger '{logger}' or its ancestors")]
    NoLevelInHierarchy { logger: String },

    /// Resource bundle has no entry for the key
    #[error("No resource is associated with key \"{key}\"")]
    MissingResource { key: String },

    /// Text that names no standard or registered level
    #[error("Invalid log level: '{0}'")]
    UnknownLevel(String),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Appender used after `close`
    #[error("Appender '{name}' is closed")]
    AppenderClosed { name: String },

    /// File appender error with path
    #[error("File appender error for '{path}': {message}")]
    FileAppenderError { path: String, message: String },

    /// File rotation error
    #[error("File rotation failed for '{path}': {message}")]
    FileRotationError { path: String, message: String },

    /// Writer error (generic)
    #[error("Writer error: {0}")]
    WriterError(String),

    /// Channel send error
    #[error("Failed to send logging event to async worker")]
    ChannelSendError,

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    pub fn no_level(logger: impl Into<String>) -> Self {
        LoggerError::NoLevelInHierarchy {
            logger: logger.into(),
        }
    }

    pub fn missing_resource(key: impl Into<String>) -> Self {
        LoggerError::MissingResource { key: key.into() }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn appender_closed(name: impl Into<String>) -> Self {
        LoggerError::AppenderClosed { name: name.into() }
    }

    /// Create a file appender error
    pub fn file_appender(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileAppenderError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a file rotation error
    pub fn file_rotation(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileRotationError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a writer error (generic)
    pub fn writer<S: Into<String>>(msg: S) -> Self {
        LoggerError::WriterError(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }

    /// True for errors that indicate a broken repository rather than a
    /// recoverable runtime condition
    #[must_use]
    pub fn is_configuration_defect(&self) -> bool {
        matches!(self, LoggerError::NoLevelInHierarchy { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = LoggerError::no_level("db.pool");
        assert!(matches!(err, LoggerError::NoLevelInHierarchy { .. }));
        assert!(err.is_configuration_defect());

        let err = LoggerError::config("Hierarchy", "Invalid threshold");
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
        assert!(!err.is_configuration_defect());

        let err = LoggerError::file_appender("/var/log/app.log", "Permission denied");
        assert!(matches!(err, LoggerError::FileAppenderError { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = LoggerError::no_level("db.pool");
        assert_eq!(
            err.to_string(),
            "No level specified for logger 'db.pool' or its ancestors"
        );

        let err = LoggerError::missing_resource("greeting");
        assert_eq!(
            err.to_string(),
            "No resource is associated with key \"greeting\""
        );

        let err = LoggerError::file_rotation("/var/log/app.log", "Disk full");
        assert_eq!(
            err.to_string(),
            "File rotation failed for '/var/log/app.log': Disk full"
        );
    }

    #[test]
    fn test_io_operation_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = LoggerError::io_operation("writing log file", "cannot write to file", io_err);

        assert!(matches!(err, LoggerError::IoOperation { .. }));
        assert!(err.to_string().contains("writing log file"));
        assert!(err.to_string().contains("cannot write to file"));
    }
}
