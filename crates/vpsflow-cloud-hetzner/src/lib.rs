//! Hetzner Cloud provider for VPSFlow
//!
//! This crate talks to the Hetzner Cloud REST API directly over HTTPS and
//! builds the two services the host surface uses:
//!
//! - [`CatalogService`]: server types, locations and images, cached with a
//!   TTL and backed by built-in fallback tables
//! - [`ProvisioningService`]: create, power, reset and delete servers, keyed
//!   by the billing platform's service id
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use vpsflow_cloud::{ApiCredential, FileCacheStore};
//! use vpsflow_cloud_hetzner::{CatalogService, HetznerClient};
//!
//! let api = Arc::new(HetznerClient::new()?);
//! let cache = Arc::new(FileCacheStore::new("/var/lib/vpsflow/cache"));
//! let token = ApiCredential::from_optional(std::env::var("HCLOUD_TOKEN").ok());
//!
//! let catalog = CatalogService::new(api, cache, token);
//! for location in catalog.locations().await {
//!     println!("{} ({})", location.city, location.id_name);
//! }
//! ```

pub mod audit;
pub mod catalog;
pub mod client;
pub mod fallback;
pub mod model;
pub mod provisioner;

#[cfg(test)]
mod testing;

pub use audit::{AuditEntry, AuditLog};
pub use catalog::{
    CacheState, CacheStatus, Catalog, CatalogResource, CatalogService, CatalogSource,
    ConfigChoice, ConfigOption, ConfigOptions, MAX_IMAGE_CHOICES, RefreshOutcome, RefreshReport,
};
pub use client::{HETZNER_API_BASE, HetznerClient, REQUEST_TIMEOUT};
pub use model::{Image, ImageKind, ImageStatus, Location, ServerType};
pub use provisioner::{CreateOptions, CreateServerRequest, ProvisioningService, TerminateOutcome};
