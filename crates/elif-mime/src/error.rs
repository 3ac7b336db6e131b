use thiserror::Error;

/// Body rendering errors
#[derive(Error, Debug)]
pub enum EmailError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Error raised by the template engine, kept as-is.
    #[error(transparent)]
    Template(Box<dyn std::error::Error + Send + Sync>),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("IO error: {message}")]
    Io { message: String },
}

impl EmailError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn template<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Template(Box::new(err))
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Whether this error was produced by the template engine.
    pub fn is_template(&self) -> bool {
        matches!(self, Self::Template(_))
    }
}

// Convert from common error types
impl From<tera::Error> for EmailError {
    fn from(err: tera::Error) -> Self {
        Self::template(err)
    }
}

impl From<serde_json::Error> for EmailError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<std::io::Error> for EmailError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}
