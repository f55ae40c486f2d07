//! Seams between the catalog controller and its remote collaborators

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{LogisticsAnalysis, Product, SellerAccount};

/// Marketplace operations the catalog workflows depend on.
///
/// Every call is a single stateless round trip authorized by `credential`.
#[async_trait]
pub trait MarketplaceApi: Send + Sync {
    /// Resolve the seller account that owns `credential`.
    ///
    /// # Errors
    /// * `AppError::Auth` when the token is rejected or under-scoped
    /// * `AppError::Network` when the marketplace cannot be reached
    async fn current_user(&self, credential: &str) -> Result<SellerAccount>;

    /// First page of active listing ids for `user_id`.
    async fn list_active_item_ids(&self, credential: &str, user_id: u64) -> Result<Vec<String>>;

    /// Full listings for `item_ids`, fetched in marketplace-sized batches.
    async fn fetch_item_details(&self, credential: &str, item_ids: &[String]) -> Result<Vec<Product>>;

    /// Persist only the shipping dimensions and weight of `product`.
    async fn update_shipping_dimensions(&self, credential: &str, product: &Product) -> Result<()>;
}

/// Source of AI shipping recommendations.
#[async_trait]
pub trait LogisticsAdvisor: Send + Sync {
    /// Never fails: every failure resolves to a degraded analysis.
    async fn analyze(&self, product: &Product) -> LogisticsAnalysis;
}
