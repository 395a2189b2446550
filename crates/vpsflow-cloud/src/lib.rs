//! VPSFlow Cloud core
//!
//! Provider-neutral building blocks for provisioning virtual servers on
//! behalf of a billing platform:
//!
//! - [`ProviderApi`]: the API client seam (one authenticated call, no retries)
//! - [`CacheStore`]: durable keyed cache with TTL expiry
//! - [`RecordStore`]: service id -> provider instance bookkeeping
//! - [`ServerAction`]: closed set of instance actions
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                vpsflow CLI / host                │
//! └───────────────┬──────────────────┬───────────────┘
//!                 │                  │
//! ┌───────────────▼───────┐ ┌────────▼───────────────┐
//! │    CatalogService     │ │  ProvisioningService   │
//! │ cache → API → fallback│ │  API + record store    │
//! └───────┬───────┬───────┘ └────────┬───────┬───────┘
//!         │       │                  │       │
//! ┌───────▼──┐ ┌──▼──────────────────▼──┐ ┌──▼────────┐
//! │CacheStore│ │      ProviderApi       │ │RecordStore│
//! └──────────┘ └────────────────────────┘ └───────────┘
//! ```

pub mod action;
pub mod cache;
pub mod clock;
pub mod defaults;
pub mod error;
mod fs;
pub mod provider;
pub mod state;

// Re-exports
pub use action::{ActionOutcome, ServerAction};
pub use cache::{CacheEntry, CacheStore, DEFAULT_TTL, FileCacheStore, MemoryCacheStore};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ApiError, ApiErrorKind, CloudError, ProvisionError, Result};
pub use provider::{ApiCredential, HttpMethod, ProviderApi, SecretString};
pub use state::{FileRecordStore, MemoryRecordStore, RecordStore, ServerRecord};
