//! Catalog service
//!
//! Read-through access to server types, locations and images:
//!
//! 1. unexpired cache entry -> returned as is, no API call
//! 2. no credential -> built-in fallback
//! 3. API listing -> written to the cache and returned
//! 4. API failure or unexpected shape -> built-in fallback
//!
//! Fallback data is never written to the cache, so a credential that becomes
//! valid later is picked up on the very next call. Cache and transport
//! problems degrade to fallback data and are never surfaced to the caller.

use crate::fallback;
use crate::model::{
    ApiImage, ApiLocation, ApiServerType, Image, Location, ServerType, selectable_images,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use vpsflow_cloud::{
    ApiCredential, CacheStore, Clock, CloudError, DEFAULT_TTL, HttpMethod, ProviderApi, Result,
    SystemClock,
};

/// Image choices offered to the end user are capped at this many
pub const MAX_IMAGE_CHOICES: usize = 20;

const CONNECTION_TEST_ENDPOINT: &str = "/server_types?per_page=1";

/// A catalog listing that can be cached and has a fallback table
pub trait CatalogResource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Cache key
    const KEY: &'static str;
    /// Listing endpoint
    const ENDPOINT: &'static str;
    /// Field of the listing response holding the array
    const FIELD: &'static str;

    type Wire: DeserializeOwned + Into<Self>;

    fn fallback() -> Vec<Self>;
}

impl CatalogResource for ServerType {
    const KEY: &'static str = "server_types";
    const ENDPOINT: &'static str = "/server_types";
    const FIELD: &'static str = "server_types";
    type Wire = ApiServerType;

    fn fallback() -> Vec<Self> {
        fallback::server_types()
    }
}

impl CatalogResource for Location {
    const KEY: &'static str = "locations";
    const ENDPOINT: &'static str = "/locations";
    const FIELD: &'static str = "locations";
    type Wire = ApiLocation;

    fn fallback() -> Vec<Self> {
        fallback::locations()
    }
}

impl CatalogResource for Image {
    const KEY: &'static str = "images";
    const ENDPOINT: &'static str = "/images?type=system&status=available";
    const FIELD: &'static str = "images";
    type Wire = ApiImage;

    fn fallback() -> Vec<Self> {
        fallback::images()
    }
}

/// Cache keys managed by the catalog, in display order
pub const CATALOG_KEYS: [&str; 3] = [ServerType::KEY, Location::KEY, Image::KEY];

/// Where a listing came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogSource {
    Cache,
    Api,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct Catalog<R> {
    pub items: Vec<R>,
    pub source: CatalogSource,
}

/// Outcome of refreshing one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed { count: usize },
    Fallback { reason: String },
}

impl fmt::Display for RefreshOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshOutcome::Refreshed { count } => write!(f, "{} found", count),
            RefreshOutcome::Fallback { reason } => write!(f, "could not update ({})", reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RefreshReport {
    /// Entries removed before refetching
    pub cleared: usize,
    pub server_types: RefreshOutcome,
    pub locations: RefreshOutcome,
    pub images: RefreshOutcome,
}

impl RefreshReport {
    pub fn outcomes(&self) -> [(&'static str, &RefreshOutcome); 3] {
        [
            (ServerType::KEY, &self.server_types),
            (Location::KEY, &self.locations),
            (Image::KEY, &self.images),
        ]
    }

    pub fn is_complete(&self) -> bool {
        self.outcomes()
            .iter()
            .all(|(_, o)| matches!(o, RefreshOutcome::Refreshed { .. }))
    }
}

/// State of one cache key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheState {
    Cached {
        items: usize,
        expires_at: DateTime<Utc>,
    },
    Expired {
        items: usize,
        expires_at: DateTime<Utc>,
    },
    NotCached,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStatus {
    pub key: &'static str,
    pub state: CacheState,
}

/// One entry of a dropdown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigChoice {
    pub value: String,
    pub label: String,
}

impl fmt::Display for ConfigChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.value, self.label)
    }
}

/// A dropdown configuration option
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigOption {
    pub name: &'static str,
    pub friendly_name: &'static str,
    pub description: &'static str,
    pub choices: Vec<ConfigChoice>,
}

impl ConfigOption {
    /// Comma-joined `value|label` list
    pub fn options_string(&self) -> String {
        self.choices
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Dropdowns offered when ordering a server
#[derive(Debug, Clone)]
pub struct ConfigOptions {
    pub server_type: ConfigOption,
    pub location: ConfigOption,
    pub image: ConfigOption,
}

impl ConfigOptions {
    pub fn iter(&self) -> impl Iterator<Item = &ConfigOption> {
        [&self.server_type, &self.location, &self.image].into_iter()
    }
}

fn server_type_label(st: &ServerType) -> String {
    let price = st
        .display_price()
        .map(|p| format!(" - €{}/month", p))
        .unwrap_or_default();
    format!(
        "{} - {} vCPU, {}GB RAM, {}GB SSD{}",
        st.id_name.to_uppercase(),
        st.cores,
        st.memory_gb,
        st.disk_gb,
        price
    )
}

/// Cached, fallback-backed access to the provider catalog
pub struct CatalogService {
    api: Arc<dyn ProviderApi>,
    cache: Arc<dyn CacheStore>,
    credential: Option<ApiCredential>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl CatalogService {
    pub fn new(
        api: Arc<dyn ProviderApi>,
        cache: Arc<dyn CacheStore>,
        credential: Option<ApiCredential>,
    ) -> Self {
        Self {
            api,
            cache,
            credential,
            ttl: DEFAULT_TTL,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub async fn server_types(&self) -> Vec<ServerType> {
        self.fetch::<ServerType>().await.items
    }

    pub async fn locations(&self) -> Vec<Location> {
        self.fetch::<Location>().await.items
    }

    /// Available system images, in listing order
    pub async fn images(&self) -> Vec<Image> {
        selectable_images(self.fetch::<Image>().await.items)
    }

    /// Cache, then API, then fallback
    pub async fn fetch<R: CatalogResource>(&self) -> Catalog<R> {
        if let Some(items) = self.cached::<R>().await {
            return Catalog {
                items,
                source: CatalogSource::Cache,
            };
        }

        let Some(credential) = &self.credential else {
            tracing::debug!("No API token, using fallback {}", R::KEY);
            return Catalog {
                items: R::fallback(),
                source: CatalogSource::Fallback,
            };
        };

        match self.fetch_remote::<R>(credential).await {
            Ok(items) => Catalog {
                items,
                source: CatalogSource::Api,
            },
            Err(e) => {
                tracing::warn!("Falling back to built-in {}: {}", R::KEY, e);
                Catalog {
                    items: R::fallback(),
                    source: CatalogSource::Fallback,
                }
            }
        }
    }

    async fn cached<R: CatalogResource>(&self) -> Option<Vec<R>> {
        let payload = match self.cache.get(R::KEY).await {
            Ok(payload) => payload?,
            Err(e) => {
                tracing::warn!("Cache read failed for {}, treating as miss: {}", R::KEY, e);
                return None;
            }
        };

        match serde_json::from_value::<Vec<R>>(payload) {
            Ok(items) if items.is_empty() => {
                tracing::debug!("Cached {} is empty, treating as miss", R::KEY);
                None
            }
            Ok(items) => Some(items),
            Err(e) => {
                tracing::warn!("Cached {} has unexpected shape, ignoring: {}", R::KEY, e);
                None
            }
        }
    }

    /// Lists `R` from the API and caches it. The cache write is best-effort.
    async fn fetch_remote<R: CatalogResource>(&self, credential: &ApiCredential) -> Result<Vec<R>> {
        let response = self
            .api
            .call(R::ENDPOINT, HttpMethod::Get, credential, None)
            .await?;

        let listing = response.get(R::FIELD).cloned().ok_or_else(|| {
            CloudError::Provider(format!("response is missing '{}'", R::FIELD))
        })?;
        let wire: Vec<R::Wire> = serde_json::from_value(listing).map_err(|e| {
            CloudError::Provider(format!("unexpected '{}' payload: {}", R::FIELD, e))
        })?;
        let items: Vec<R> = wire.into_iter().map(Into::into).collect();

        match serde_json::to_value(&items) {
            Ok(payload) => {
                if let Err(e) = self.cache.put(R::KEY, payload, self.ttl).await {
                    tracing::warn!("Failed to cache {}: {}", R::KEY, e);
                }
            }
            Err(e) => tracing::warn!("Failed to serialize {}: {}", R::KEY, e),
        }

        tracing::debug!("Fetched {} {} from API", items.len(), R::KEY);
        Ok(items)
    }

    async fn refresh_one<R: CatalogResource>(&self, credential: &ApiCredential) -> RefreshOutcome {
        match self.fetch_remote::<R>(credential).await {
            Ok(items) => RefreshOutcome::Refreshed { count: items.len() },
            Err(e) => {
                tracing::warn!("Could not update {}: {}", R::KEY, e);
                RefreshOutcome::Fallback {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Clears the cache and refetches every resource from the API.
    ///
    /// Without a credential nothing is cleared and `Auth` is returned.
    pub async fn refresh(&self) -> Result<RefreshReport> {
        let credential = self
            .credential
            .as_ref()
            .ok_or_else(|| CloudError::Auth("API token is required".to_string()))?;

        let cleared = match self.cache.invalidate_all().await {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!("Failed to clear cache: {}", e);
                0
            }
        };

        let report = RefreshReport {
            cleared,
            server_types: self.refresh_one::<ServerType>(credential).await,
            locations: self.refresh_one::<Location>(credential).await,
            images: self.refresh_one::<Image>(credential).await,
        };
        tracing::info!("Catalog refresh finished (cleared {} entries)", cleared);
        Ok(report)
    }

    /// Item count and expiry of every catalog key
    pub async fn status(&self) -> Vec<CacheStatus> {
        let now = self.clock.now_epoch();
        let mut statuses = Vec::with_capacity(CATALOG_KEYS.len());

        for key in CATALOG_KEYS {
            let state = match self.cache.peek(key).await {
                Ok(Some(entry)) => {
                    let expires_at =
                        DateTime::from_timestamp(entry.expires_at, 0).unwrap_or_default();
                    let items = entry.item_count();
                    if entry.is_valid_at(now) {
                        CacheState::Cached { items, expires_at }
                    } else {
                        CacheState::Expired { items, expires_at }
                    }
                }
                Ok(None) => CacheState::NotCached,
                Err(e) => {
                    tracing::warn!("Cannot read cache status for {}: {}", key, e);
                    CacheState::NotCached
                }
            };
            statuses.push(CacheStatus { key, state });
        }

        statuses
    }

    /// Verifies the credential against a minimal listing call
    pub async fn test_connection(&self) -> Result<()> {
        let credential = self
            .credential
            .as_ref()
            .ok_or_else(|| CloudError::Auth("API token is required".to_string()))?;

        let response = self
            .api
            .call(CONNECTION_TEST_ENDPOINT, HttpMethod::Get, credential, None)
            .await?;

        if response.get(ServerType::FIELD).is_some() {
            Ok(())
        } else {
            Err(CloudError::Provider(
                "Unable to connect to Hetzner Cloud API".to_string(),
            ))
        }
    }

    /// Dropdown projection of the catalog
    pub async fn config_options(&self) -> ConfigOptions {
        let server_types = self.server_types().await;
        let locations = self.locations().await;
        let images = self.images().await;

        ConfigOptions {
            server_type: ConfigOption {
                name: "server_type",
                friendly_name: "Server Configuration",
                description: "Server configuration (auto-updated from Hetzner API)",
                choices: server_types
                    .iter()
                    .map(|st| ConfigChoice {
                        value: st.id_name.clone(),
                        label: server_type_label(st),
                    })
                    .collect(),
            },
            location: ConfigOption {
                name: "location",
                friendly_name: "Server Location",
                description: "Server location (auto-updated from Hetzner API)",
                choices: locations
                    .iter()
                    .map(|l| ConfigChoice {
                        value: l.id_name.clone(),
                        label: format!("{}, {} ({})", l.city, l.country_code, l.id_name),
                    })
                    .collect(),
            },
            image: ConfigOption {
                name: "image",
                friendly_name: "Operating System",
                description: "Operating system image (auto-updated from Hetzner API)",
                choices: images
                    .iter()
                    .take(MAX_IMAGE_CHOICES)
                    .map(|i| ConfigChoice {
                        value: i.id_name.clone(),
                        label: i.label().to_string(),
                    })
                    .collect(),
            },
        }
    }
}
