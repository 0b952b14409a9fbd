use thiserror::Error;

/// Why a documentation download did not produce bytes.
#[derive(Error, Debug)]
pub enum FetchFailure {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("request cancelled")]
    Cancelled,
}

#[derive(Error, Debug)]
pub enum SpecError {
    #[error("fetching spec from {url}: {cause}")]
    Fetch {
        url: String,
        #[source]
        cause: FetchFailure,
    },

    #[error("parsing OpenAPI spec for {service}: {reason}")]
    Parse { service: String, reason: String },

    #[error("service {0:?} not configured")]
    NotConfigured(String),

    #[error("no OpenAPI URL configured for {0}")]
    MissingSpecUrl(String),

    #[error("endpoint {path} not found in {service}")]
    NotFound { service: String, path: String },

    #[error("loading spec for {0} was cancelled")]
    Cancelled(String),
}

impl SpecError {
    /// Short text for tool output. The URL and transport detail stay in
    /// the logs.
    pub fn summary(&self) -> String {
        match self {
            SpecError::Fetch {
                cause: FetchFailure::Status(code),
                ..
            } => format!("documentation download failed (HTTP {code})"),
            SpecError::Fetch {
                cause: FetchFailure::Transport(e),
                ..
            } if e.is_timeout() => "documentation download timed out".to_string(),
            SpecError::Fetch {
                cause: FetchFailure::Transport(_),
                ..
            } => "documentation server unreachable".to_string(),
            SpecError::Fetch {
                cause: FetchFailure::Cancelled,
                ..
            }
            | SpecError::Cancelled(_) => "cancelled".to_string(),
            SpecError::Parse { .. } => "document is not valid OpenAPI JSON or YAML".to_string(),
            other => other.to_string(),
        }
    }

    pub fn fetch(url: &str, cause: FetchFailure) -> Self {
        SpecError::Fetch {
            url: url.to_string(),
            cause,
        }
    }

    pub fn parse(service: &str, reason: impl Into<String>) -> Self {
        SpecError::Parse {
            service: service.to_string(),
            reason: reason.into(),
        }
    }
}

/// A filter directive without the `field:op:value` shape. The shaping engine
/// treats this as "no filter".
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FilterError {
    #[error("expected field:op:value, got {0:?}")]
    Shape(String),
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("invalid HTTP method {0:?}")]
    InvalidMethod(String),

    #[error("executing request: {0}")]
    Request(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, SpecError>;
