use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_AUTH_HEADER: &str = "X-Api-Key";
pub const QUERY_KEY_PARAM: &str = "apikey";

/// How an API key is presented, as written in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    #[default]
    Header,
    Query,
    Basic,
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Header => "header",
            Self::Query => "query",
            Self::Basic => "basic",
        };
        f.write_str(s)
    }
}

/// Credentials applied to every outgoing request.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Header { name: String, key: String },
    Query { param: String, key: String },
    Basic { username: String, password: String },
}

impl Credentials {
    pub fn from_config(method: AuthMethod, api_key: &str, header: Option<&str>) -> Self {
        match method {
            AuthMethod::Header => Self::Header {
                name: header
                    .filter(|h| !h.is_empty())
                    .unwrap_or(DEFAULT_AUTH_HEADER)
                    .to_string(),
                key: api_key.to_string(),
            },
            AuthMethod::Query => Self::Query {
                param: QUERY_KEY_PARAM.to_string(),
                key: api_key.to_string(),
            },
            AuthMethod::Basic => Self::Basic {
                username: api_key.to_string(),
                password: String::new(),
            },
        }
    }

    pub fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Self::Header { name, key } => request.header(name.as_str(), key.as_str()),
            Self::Query { param, key } => request.query(&[(param.as_str(), key.as_str())]),
            Self::Basic { username, password } => request.basic_auth(username, Some(password)),
        }
    }
}

// Keys never end up in logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header { name, .. } => f.debug_struct("Header").field("name", name).finish(),
            Self::Query { param, .. } => f.debug_struct("Query").field("param", param).finish(),
            Self::Basic { username, .. } => {
                f.debug_struct("Basic").field("username", username).finish()
            }
        }
    }
}
