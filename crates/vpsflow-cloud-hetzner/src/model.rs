//! Catalog snapshots
//!
//! Immutable views of what the provider offers. They are parsed from the
//! listing endpoints, stored in the cache in this form, and also used for
//! the built-in fallback tables.

use serde::{Deserialize, Serialize};

/// A purchasable server size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerType {
    pub id_name: String,
    pub cores: u32,
    pub memory_gb: f64,
    pub disk_gb: f64,
    /// Gross monthly price as the provider formats it (e.g. `"3.92"`)
    #[serde(default)]
    pub monthly_price: Option<String>,
}

impl ServerType {
    pub fn new(id_name: &str, cores: u32, memory_gb: f64, disk_gb: f64, price: &str) -> Self {
        Self {
            id_name: id_name.to_string(),
            cores,
            memory_gb,
            disk_gb,
            monthly_price: Some(price.to_string()),
        }
    }

    /// Monthly price trimmed of trailing zeros (`"3.9200000000"` -> `"3.92"`)
    pub fn display_price(&self) -> Option<String> {
        let price = self.monthly_price.as_deref()?.trim();
        if price.is_empty() {
            return None;
        }
        if !price.contains('.') {
            return Some(price.to_string());
        }
        let trimmed = price.trim_end_matches('0').trim_end_matches('.');
        let (whole, frac) = trimmed.split_once('.').unwrap_or((trimmed, ""));
        // Keep at least cents
        Some(match frac.len() {
            0 => format!("{}.00", whole),
            1 => format!("{}.{}0", whole, frac),
            _ => trimmed.to_string(),
        })
    }
}

/// A datacenter location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id_name: String,
    pub city: String,
    pub country_code: String,
}

impl Location {
    pub fn new(id_name: &str, city: &str, country_code: &str) -> Self {
        Self {
            id_name: id_name.to_string(),
            city: city.to_string(),
            country_code: country_code.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStatus {
    Available,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageKind {
    System,
    #[serde(other)]
    Other,
}

/// An OS image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id_name: String,
    pub description: String,
    pub status: ImageStatus,
    pub kind: ImageKind,
}

impl Image {
    pub fn system(id_name: &str, description: &str) -> Self {
        Self {
            id_name: id_name.to_string(),
            description: description.to_string(),
            status: ImageStatus::Available,
            kind: ImageKind::System,
        }
    }

    /// Installable OS image
    pub fn is_selectable(&self) -> bool {
        self.status == ImageStatus::Available && self.kind == ImageKind::System
    }

    /// Description, or the name when the description is empty
    pub fn label(&self) -> &str {
        if self.description.trim().is_empty() {
            &self.id_name
        } else {
            &self.description
        }
    }
}

/// Keeps only available system images, preserving order
pub fn selectable_images(images: Vec<Image>) -> Vec<Image> {
    images.into_iter().filter(Image::is_selectable).collect()
}

// ============ API Types ============

/// `server_types[]` element of the listing response
#[derive(Debug, Deserialize)]
pub struct ApiServerType {
    name: String,
    cores: u32,
    memory: f64,
    disk: f64,
    #[serde(default)]
    prices: Vec<ApiPrice>,
}

#[derive(Debug, Deserialize)]
struct ApiPrice {
    price_monthly: ApiAmount,
}

#[derive(Debug, Deserialize)]
struct ApiAmount {
    gross: String,
}

impl From<ApiServerType> for ServerType {
    fn from(api: ApiServerType) -> Self {
        Self {
            id_name: api.name,
            cores: api.cores,
            memory_gb: api.memory,
            disk_gb: api.disk,
            monthly_price: api.prices.into_iter().next().map(|p| p.price_monthly.gross),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiLocation {
    name: String,
    #[serde(default)]
    city: String,
    #[serde(default)]
    country: String,
}

impl From<ApiLocation> for Location {
    fn from(api: ApiLocation) -> Self {
        Self {
            id_name: api.name,
            city: api.city,
            country_code: api.country,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiImage {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    status: ImageStatus,
    #[serde(rename = "type")]
    kind: ImageKind,
}

impl From<ApiImage> for Image {
    fn from(api: ApiImage) -> Self {
        // Snapshots and backups have no name; their numeric id is the handle
        let id_name = api
            .name
            .filter(|n| !n.is_empty())
            .or_else(|| api.id.map(|id| id.to_string()))
            .unwrap_or_default();
        Self {
            id_name,
            description: api.description.unwrap_or_default(),
            status: api.status,
            kind: api.kind,
        }
    }
}
