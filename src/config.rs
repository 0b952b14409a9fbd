use crate::client::{AuthMethod, Credentials};
use crate::shaping::governor::DEFAULT_MAX_RESPONSE_KB;
use crate::spec::{SpecCache, SpecSource};
use anyhow::Context;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// API prefix and documentation location of a service family member.
struct KnownService {
    name: &'static str,
    api_version: &'static str,
    openapi_url: Option<&'static str>,
}

const KNOWN_SERVICES: &[KnownService] = &[
    KnownService {
        name: "sonarr",
        api_version: "/api/v3",
        openapi_url: Some("https://raw.githubusercontent.com/Sonarr/Sonarr/develop/src/Sonarr.Api.V3/openapi.json"),
    },
    KnownService {
        name: "radarr",
        api_version: "/api/v3",
        openapi_url: Some("https://raw.githubusercontent.com/Radarr/Radarr/develop/src/Radarr.Api.V3/openapi.json"),
    },
    KnownService {
        name: "lidarr",
        api_version: "/api/v1",
        openapi_url: Some("https://raw.githubusercontent.com/Lidarr/Lidarr/develop/src/Lidarr.Api.V1/openapi.json"),
    },
    KnownService {
        name: "readarr",
        api_version: "/api/v1",
        openapi_url: Some("https://raw.githubusercontent.com/Readarr/Readarr/develop/src/Readarr.Api.V1/openapi.json"),
    },
    KnownService {
        name: "prowlarr",
        api_version: "/api/v1",
        openapi_url: Some("https://raw.githubusercontent.com/Prowlarr/Prowlarr/develop/src/Prowlarr.Api.V1/openapi.json"),
    },
    KnownService {
        name: "bazarr",
        api_version: "/api",
        openapi_url: None,
    },
    KnownService {
        name: "overseerr",
        api_version: "/api/v1",
        openapi_url: Some("https://raw.githubusercontent.com/sct/overseerr/develop/overseerr-api.yml"),
    },
];

fn known(name: &str) -> Option<&'static KnownService> {
    KNOWN_SERVICES.iter().find(|k| k.name == name)
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub services: BTreeMap<String, ServiceConfig>,
    /// Size limit for tool responses, in units of 1024 bytes.
    #[serde(default)]
    pub max_response_size_kb: i64,
    #[serde(default)]
    pub allow_destructive: bool,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceConfig {
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub auth_method: AuthMethod,
    #[serde(default)]
    pub auth_header: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub openapi_url: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Config {
    /// `<config_dir>/arr-navigator/config.yaml`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("arr-navigator")
            .join("config.yaml")
    }

    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_yaml_str(raw: &str) -> anyhow::Result<Self> {
        let mut config: Config = serde_yaml::from_str(raw)?;
        config.apply_defaults();
        Ok(config)
    }

    fn apply_defaults(&mut self) {
        for (name, service) in self.services.iter_mut() {
            let known = known(name);

            if service.auth_method == AuthMethod::Header && service.auth_header.is_none() {
                service.auth_header = Some(crate::client::auth::DEFAULT_AUTH_HEADER.to_string());
            }
            if service.api_version.is_none() {
                service.api_version = known.map(|k| k.api_version.to_string());
            }
            if service.openapi_url.as_deref().is_none_or(str::is_empty) {
                service.openapi_url = known.and_then(|k| k.openapi_url).map(str::to_string);
            }
            if service.display_name.is_none() {
                service.display_name = Some(capitalize(name));
            }
        }

        if self.max_response_size_kb <= 0 {
            self.max_response_size_kb = DEFAULT_MAX_RESPONSE_KB as i64;
        }
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = DEFAULT_TIMEOUT_SECS;
        }
    }

    pub fn max_response_kb(&self) -> usize {
        usize::try_from(self.max_response_size_kb).unwrap_or(DEFAULT_MAX_RESPONSE_KB)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(SpecCache::default_dir)
    }

    /// One documentation source per configured service.
    pub fn spec_sources(&self) -> Vec<SpecSource> {
        self.services
            .iter()
            .map(|(name, service)| SpecSource {
                name: name.clone(),
                display_name: service.display_name(name),
                spec_url: service.openapi_url.clone().filter(|u| !u.is_empty()),
            })
            .collect()
    }
}

impl ServiceConfig {
    /// Service URL plus API prefix, e.g. `http://host:8989/api/v3`.
    pub fn base_url(&self) -> String {
        format!(
            "{}{}",
            self.url.trim_end_matches('/'),
            self.api_version.as_deref().unwrap_or_default()
        )
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::from_config(self.auth_method, &self.api_key, self.auth_header.as_deref())
    }

    pub fn display_name(&self, name: &str) -> String {
        self.display_name.clone().unwrap_or_else(|| capitalize(name))
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
