//! Data models for catalog listings, seller identity and advisor payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder shown when a listing carries no `SELLER_SKU` attribute.
pub const MISSING_SKU: &str = "NO-SKU";

/// Listings above this weight (kg) are flagged on the dashboard.
pub const HEAVY_LISTING_KG: f64 = 10.0;

/// Package size in centimeters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub height: f64,
    pub width: f64,
    pub length: f64,
}

/// Marketplace-side state of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Active,
    Paused,
    Review,
}

impl ListingStatus {
    /// Maps the raw marketplace status. Anything that is neither live nor
    /// under review is treated as paused.
    pub fn from_marketplace(raw: &str) -> Self {
        match raw {
            "active" => Self::Active,
            "under_review" | "review" => Self::Review,
            _ => Self::Paused,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Review => "review",
        }
    }
}

/// Fulfilment program the listing ships under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShippingMode {
    Me1,
    Me2,
    Custom,
}

impl ShippingMode {
    pub fn from_marketplace(raw: &str) -> Self {
        match raw {
            "me1" => Self::Me1,
            "me2" => Self::Me2,
            _ => Self::Custom,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Me1 => "me1",
            Self::Me2 => "me2",
            Self::Custom => "custom",
        }
    }
}

/// A catalog listing with the shipping metadata the seller can edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub title: String,
    pub sku: String,
    /// Display only, never sent back to the marketplace.
    pub price: f64,
    pub dimensions: Dimensions,
    /// Kilograms.
    pub weight: f64,
    pub status: ListingStatus,
    pub shipping_mode: Option<ShippingMode>,
    pub thumbnail: Option<String>,
    pub permalink: Option<String>,
    pub last_sync: Option<DateTime<Utc>>,
}

impl Product {
    pub fn is_heavy(&self) -> bool {
        self.weight > HEAVY_LISTING_KG
    }

    /// Case-insensitive match on SKU or title.
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        needle.is_empty()
            || self.sku.to_lowercase().contains(&needle)
            || self.title.to_lowercase().contains(&needle)
    }
}

/// The seller account a credential belongs to (`GET /users/me`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellerAccount {
    pub id: u64,
    pub nickname: String,
    #[serde(default)]
    pub email: String,
}

/// Structured shipping recommendation returned by the advisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticsAnalysis {
    pub category: String,
    #[serde(rename = "estimatedCost")]
    pub estimated_cost: String,
    /// Kilograms.
    #[serde(rename = "volumetricWeight")]
    pub volumetric_weight: f64,
    pub warnings: Vec<String>,
    #[serde(rename = "packingTips")]
    pub packing_tip: String,
    #[serde(rename = "isOptimized")]
    pub is_optimized: bool,
}

impl LogisticsAnalysis {
    /// Returned without any network call when no advisor key is configured.
    pub fn configuration_error() -> Self {
        Self {
            category: "Configuration error".to_string(),
            estimated_cost: "R$ 0,00".to_string(),
            volumetric_weight: 0.0,
            warnings: vec!["Set ADVISOR_API_KEY to enable AI logistics analysis.".to_string()],
            packing_tip: "No tips available.".to_string(),
            is_optimized: false,
        }
    }

    /// Returned when the advisor call fails or answers with garbage.
    pub fn unavailable() -> Self {
        Self {
            category: "Undefined".to_string(),
            estimated_cost: "R$ --,--".to_string(),
            volumetric_weight: 0.0,
            warnings: vec!["Could not reach the AI service.".to_string()],
            packing_tip: "Try again.".to_string(),
            is_optimized: false,
        }
    }
}

/// `generateContent` request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

/// One conversation turn sent to or received from the advisor
#[derive(Debug, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// Text fragment inside a content turn
#[derive(Debug, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
}

/// Forces a JSON answer that follows `response_schema`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    pub response_schema: serde_json::Value,
}

/// `generateContent` response body, reduced to what we read.
#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .find_map(|part| part.text.as_deref())
    }
}
