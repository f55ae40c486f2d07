//! # Marketplace REST client
//!
//! Thin wrapper over the four marketplace calls the catalog needs:
//!
//! - `GET /users/me` resolves the seller behind a bearer token
//! - `GET /users/{id}/items/search` lists active listing ids (first page only)
//! - `GET /items?ids=...` batch-fetches full listings, at most 20 per call
//! - `PUT /items/{id}` patches the shipping dimensions of one listing
//!
//! Raw item JSON is decoded into typed structs and mapped into [`Product`],
//! including the `"<h>x<w>x<l>,<grams>"` dimension string. There is no retry,
//! no pagination past the first page and no partial-batch recovery.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode, header};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dimensions;
use crate::error::{AppError, Result};
use crate::models::{ListingStatus, MISSING_SKU, Product, SellerAccount, ShippingMode};
use crate::traits::MarketplaceApi;

pub const DEFAULT_BASE_URL: &str = "https://api.mercadolibre.com";

/// Page size for the active listing search.
pub const ITEM_PAGE_SIZE: usize = 50;

/// Marketplace ceiling on ids per `/items` call.
pub const ITEM_BATCH_SIZE: usize = 20;

const USER_AGENT: &str = concat!("listing-logistics/", env!("CARGO_PKG_VERSION"));
const SKU_ATTRIBUTE: &str = "SELLER_SKU";

/// HTTP client bound to one marketplace base URL.
#[derive(Clone)]
pub struct MarketplaceClient {
    client: Client,
    base_url: String,
}

impl MarketplaceClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    fn request(&self, builder: RequestBuilder, credential: &str) -> RequestBuilder {
        builder
            .bearer_auth(credential)
            .header(header::ACCEPT, "application/json")
    }

    fn get(&self, credential: &str, path: &str) -> RequestBuilder {
        self.request(self.client.get(format!("{}{path}", self.base_url)), credential)
    }

    async fn send(builder: RequestBuilder) -> Result<Response> {
        builder
            .send()
            .await
            .map_err(|e| AppError::Network(e.to_string()))
    }
}

#[async_trait]
impl MarketplaceApi for MarketplaceClient {
    async fn current_user(&self, credential: &str) -> Result<SellerAccount> {
        let response = Self::send(self.get(credential, "/users/me")).await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => {
                return Err(AppError::Auth("token invalid or expired (401)".to_string()));
            }
            StatusCode::FORBIDDEN => {
                return Err(AppError::Auth(
                    "access denied (403), check the token scopes".to_string(),
                ));
            }
            _ => {}
        }

        let seller: SellerAccount = ensure_success(response).await?.json().await?;
        info!("Authenticated as {} (id {})", seller.nickname, seller.id);
        Ok(seller)
    }

    async fn list_active_item_ids(&self, credential: &str, user_id: u64) -> Result<Vec<String>> {
        let path = format!("/users/{user_id}/items/search?status=active&limit={ITEM_PAGE_SIZE}");
        let response = Self::send(self.get(credential, &path)).await?;
        let search: SearchResponse = ensure_success(response).await?.json().await?;

        info!("Marketplace returned {} active listing ids", search.results.len());
        Ok(search.results)
    }

    async fn fetch_item_details(&self, credential: &str, item_ids: &[String]) -> Result<Vec<Product>> {
        if item_ids.is_empty() {
            return Ok(Vec::new());
        }

        let synced_at = Utc::now();
        let mut products = Vec::with_capacity(item_ids.len());

        for batch in item_batches(item_ids) {
            let response = Self::send(self.get(credential, &format!("/items?ids={batch}"))).await?;
            let wrappers: Vec<ItemWrapper> = ensure_success(response).await?.json().await?;

            for wrapper in wrappers {
                products.push(wrapper.into_product(synced_at)?);
            }
        }

        info!("Loaded details for {} listings", products.len());
        Ok(products)
    }

    async fn update_shipping_dimensions(&self, credential: &str, product: &Product) -> Result<()> {
        let patch = ShippingPatch {
            shipping: ShippingDimensionsPatch {
                dimensions: dimensions::encode(&product.dimensions, product.weight),
            },
        };
        let url = format!("{}/items/{}", self.base_url, urlencoding::encode(&product.id));

        info!(
            "Updating shipping dimensions of {} to {}",
            product.id, patch.shipping.dimensions
        );

        let request = self.request(self.client.put(url), credential).json(&patch);
        ensure_success(Self::send(request).await?).await?;

        Ok(())
    }
}

/// Comma-joined, url-encoded id lists of at most [`ITEM_BATCH_SIZE`] ids each.
pub fn item_batches(item_ids: &[String]) -> Vec<String> {
    item_ids
        .chunks(ITEM_BATCH_SIZE)
        .map(|chunk| {
            chunk
                .iter()
                .map(|id| urlencoding::encode(id).into_owned())
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect()
}

/// Turns a non-2xx response into `AppError::Api`, keeping the error body.
async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let payload = response.json::<serde_json::Value>().await.ok();
    let message = payload
        .as_ref()
        .and_then(error_message)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    warn!("Marketplace answered {status}: {message}");

    Err(AppError::Api {
        status: status.as_u16(),
        message,
        payload,
    })
}

fn error_message(payload: &serde_json::Value) -> Option<String> {
    ["message", "error"]
        .iter()
        .find_map(|key| payload.get(key).and_then(serde_json::Value::as_str))
        .map(str::to_string)
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<String>,
}

/// One entry of the `/items?ids=` multiget answer.
#[derive(Debug, Deserialize)]
struct ItemWrapper {
    code: u16,
    body: serde_json::Value,
}

impl ItemWrapper {
    fn into_product(self, synced_at: DateTime<Utc>) -> Result<Product> {
        if self.code != 200 {
            return Err(AppError::Api {
                status: self.code,
                message: error_message(&self.body)
                    .unwrap_or_else(|| "item could not be loaded".to_string()),
                payload: Some(self.body),
            });
        }

        let body: ItemBody = serde_json::from_value(self.body)?;
        Ok(body.into_product(synced_at))
    }
}

#[derive(Debug, Deserialize)]
struct ItemBody {
    id: String,
    title: String,
    #[serde(default)]
    price: Option<f64>,
    #[serde(default)]
    status: String,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    permalink: Option<String>,
    #[serde(default)]
    attributes: Vec<ItemAttribute>,
    #[serde(default)]
    shipping: Option<ItemShipping>,
}

#[derive(Debug, Deserialize)]
struct ItemAttribute {
    id: String,
    #[serde(default)]
    value_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ItemShipping {
    #[serde(default)]
    dimensions: Option<String>,
    #[serde(default)]
    mode: Option<String>,
}

impl ItemBody {
    fn into_product(self, synced_at: DateTime<Utc>) -> Product {
        let sku = self
            .attributes
            .iter()
            .find(|attribute| attribute.id == SKU_ATTRIBUTE)
            .and_then(|attribute| attribute.value_name.clone())
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| MISSING_SKU.to_string());

        let shipping = self.shipping.as_ref();
        let (size, weight) = dimensions::decode(shipping.and_then(|s| s.dimensions.as_deref()));
        let shipping_mode = shipping
            .and_then(|s| s.mode.as_deref())
            .map(ShippingMode::from_marketplace);

        Product {
            id: self.id,
            title: self.title,
            sku,
            price: self.price.unwrap_or_default(),
            dimensions: size,
            weight,
            status: ListingStatus::from_marketplace(&self.status),
            shipping_mode,
            thumbnail: self.thumbnail,
            permalink: self.permalink,
            last_sync: Some(synced_at),
        }
    }
}

#[derive(Debug, Serialize)]
struct ShippingPatch {
    shipping: ShippingDimensionsPatch,
}

#[derive(Debug, Serialize)]
struct ShippingDimensionsPatch {
    dimensions: String,
}
