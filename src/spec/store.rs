use crate::error::{Result, SpecError};
use crate::models::EndpointSummary;
use crate::spec::cache::SpecCache;
use crate::spec::fetcher::SpecFetcher;
use crate::spec::index::Index;
use crate::spec::parser;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Where a service's documentation lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSource {
    pub name: String,
    pub display_name: String,
    pub spec_url: Option<String>,
}

/// service -> current index. Each slot is replaced by swapping in a new
/// `Arc<Index>`; readers hold their own `Arc` and never see a half-built index.
#[derive(Debug, Default)]
pub struct IndexSlots {
    slots: RwLock<BTreeMap<String, Arc<Index>>>,
}

impl IndexSlots {
    pub fn get(&self, service: &str) -> Option<Arc<Index>> {
        self.slots.read().get(service).cloned()
    }

    /// Install `index` for `service`, returning the one it replaced.
    pub fn install(&self, service: &str, index: Arc<Index>) -> Option<Arc<Index>> {
        self.slots.write().insert(service.to_string(), index)
    }

    /// All installed indexes, ordered by service name.
    pub fn snapshot(&self) -> Vec<Arc<Index>> {
        self.slots.read().values().cloned().collect()
    }
}

/// Owns one [`Index`] per configured service.
pub struct SpecStore {
    sources: BTreeMap<String, SpecSource>,
    cache: SpecCache,
    fetcher: SpecFetcher,
    slots: IndexSlots,
}

impl SpecStore {
    pub fn new(
        sources: impl IntoIterator<Item = SpecSource>,
        cache: SpecCache,
        fetcher: SpecFetcher,
    ) -> Self {
        Self {
            sources: sources
                .into_iter()
                .map(|s| (s.name.clone(), s))
                .collect(),
            cache,
            fetcher,
            slots: IndexSlots::default(),
        }
    }

    pub fn sources(&self) -> impl Iterator<Item = &SpecSource> {
        self.sources.values()
    }

    pub fn cache(&self) -> &SpecCache {
        &self.cache
    }

    /// Fetch, parse and install every documented service. Failures are logged
    /// and do not stop the remaining services. Returns how many loaded.
    pub async fn load_all(&self, cancel: &CancellationToken) -> usize {
        let mut loaded = 0;
        for source in self.sources.values() {
            let Some(url) = source.spec_url.as_deref() else {
                continue;
            };
            match self.load(&source.name, url, cancel).await {
                Ok(index) => {
                    loaded += 1;
                    tracing::info!(
                        service = %source.name,
                        endpoints = index.count(),
                        warnings = index.warnings().len(),
                        "Spec loaded"
                    );
                }
                Err(e) => {
                    tracing::warn!(service = %source.name, error = %e, "Failed to load spec");
                }
            }
        }
        loaded
    }

    /// Drop the cached document for `service` and load it again. On failure the
    /// previously installed index stays in place.
    pub async fn refresh(&self, service: &str, cancel: &CancellationToken) -> Result<Arc<Index>> {
        let source = self
            .sources
            .get(service)
            .ok_or_else(|| SpecError::NotConfigured(service.to_string()))?;
        let url = source
            .spec_url
            .as_deref()
            .ok_or_else(|| SpecError::MissingSpecUrl(service.to_string()))?;

        // A refresh cancelled before it starts leaves the cached copy alone.
        if cancel.is_cancelled() {
            return Err(SpecError::Cancelled(service.to_string()));
        }
        self.cache.invalidate(url);
        self.load(service, url, cancel).await
    }

    /// Refresh every documented service, returning only the failures.
    pub async fn refresh_all(&self, cancel: &CancellationToken) -> BTreeMap<String, SpecError> {
        let mut failures = BTreeMap::new();
        for source in self.sources.values().filter(|s| s.spec_url.is_some()) {
            if let Err(e) = self.refresh(&source.name, cancel).await {
                tracing::error!(service = %source.name, error = %e, "Spec refresh failed");
                failures.insert(source.name.clone(), e);
            }
        }
        failures
    }

    /// Current index for `service`; `None` until a load has succeeded.
    pub fn get_index(&self, service: &str) -> Option<Arc<Index>> {
        self.slots.get(service)
    }

    /// Search one service, or all of them in service-name order.
    pub fn search(&self, query: &str, service: Option<&str>) -> Vec<EndpointSummary> {
        let service = service.filter(|s| !s.is_empty());
        self.slots
            .snapshot()
            .iter()
            .filter(|index| service.is_none_or(|s| index.service() == s))
            .flat_map(|index| index.search(query))
            .collect()
    }

    // Network and parsing happen before the slot lock is taken.
    async fn load(&self, service: &str, url: &str, cancel: &CancellationToken) -> Result<Arc<Index>> {
        let bytes = self.fetcher.fetch(url, &self.cache, cancel).await?;

        let name = service.to_string();
        let index = tokio::task::spawn_blocking(move || parser::parse(&name, &bytes))
            .await
            .map_err(|e| SpecError::parse(service, format!("parser task failed: {e}")))??;

        if cancel.is_cancelled() {
            return Err(SpecError::Cancelled(service.to_string()));
        }

        let index = Arc::new(index);
        self.slots.install(service, Arc::clone(&index));
        Ok(index)
    }
}
