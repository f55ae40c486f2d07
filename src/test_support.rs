//! In-memory marketplace and advisor fakes, plus a tiny HTTP stub server

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use crate::dimensions;
use crate::error::{AppError, Result};
use crate::models::{ListingStatus, LogisticsAnalysis, Product, SellerAccount};
use crate::traits::{LogisticsAdvisor, MarketplaceApi};

/// Seller returned for any token not listed in `other_sellers`.
pub const DEFAULT_SELLER_ID: u64 = 330;

#[derive(Debug, Clone, Copy)]
pub enum Failure {
    Network,
    Auth,
    Api,
}

impl Failure {
    pub fn to_error(self) -> AppError {
        match self {
            Failure::Network => AppError::Network("connection refused".to_string()),
            Failure::Auth => AppError::Auth("token invalid or expired (401)".to_string()),
            Failure::Api => AppError::Api {
                status: 400,
                message: "invalid dimensions".to_string(),
                payload: None,
            },
        }
    }
}

#[derive(Default)]
pub struct FakeMarketplace {
    /// Listings of the default seller.
    pub ids: Vec<String>,
    pub products: Vec<Product>,
    /// Additional accounts by token. They own no listings.
    pub other_sellers: HashMap<String, SellerAccount>,
    pub rejected_tokens: HashSet<String>,
    pub auth_failure: Option<Failure>,
    pub details_failure: Option<Failure>,
    pub update_failure: Option<Failure>,
    pub calls: Mutex<Vec<String>>,
    /// `"<credential> <item id> <dimension string>"` per update call.
    pub updates: Mutex<Vec<String>>,
}

impl FakeMarketplace {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn updates(&self) -> Vec<String> {
        self.updates.lock().clone()
    }
}

#[async_trait]
impl MarketplaceApi for FakeMarketplace {
    async fn current_user(&self, credential: &str) -> Result<SellerAccount> {
        self.calls.lock().push(format!("current_user:{credential}"));
        if let Some(failure) = self.auth_failure {
            return Err(failure.to_error());
        }
        if self.rejected_tokens.contains(credential) {
            return Err(Failure::Auth.to_error());
        }
        if let Some(seller) = self.other_sellers.get(credential) {
            return Ok(seller.clone());
        }
        Ok(SellerAccount {
            id: DEFAULT_SELLER_ID,
            nickname: "LOJA_TESTE".to_string(),
            email: "seller@example.com".to_string(),
        })
    }

    async fn list_active_item_ids(&self, _credential: &str, user_id: u64) -> Result<Vec<String>> {
        self.calls.lock().push(format!("list_ids:{user_id}"));
        if user_id == DEFAULT_SELLER_ID {
            Ok(self.ids.clone())
        } else {
            Ok(Vec::new())
        }
    }

    async fn fetch_item_details(&self, _credential: &str, item_ids: &[String]) -> Result<Vec<Product>> {
        self.calls.lock().push(format!("details:{}", item_ids.join(",")));
        if let Some(failure) = self.details_failure {
            return Err(failure.to_error());
        }
        Ok(self.products.clone())
    }

    async fn update_shipping_dimensions(&self, credential: &str, product: &Product) -> Result<()> {
        self.updates.lock().push(format!(
            "{credential} {} {}",
            product.id,
            dimensions::encode(&product.dimensions, product.weight)
        ));
        match self.update_failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }
}

pub struct FakeAdvisor {
    pub optimized: bool,
}

#[async_trait]
impl LogisticsAdvisor for FakeAdvisor {
    async fn analyze(&self, product: &Product) -> LogisticsAnalysis {
        let size = &product.dimensions;
        LogisticsAnalysis {
            category: "Standard".to_string(),
            estimated_cost: "R$ 25,00".to_string(),
            volumetric_weight: size.height * size.width * size.length / 6000.0,
            warnings: Vec::new(),
            packing_tip: "Use a snug box".to_string(),
            is_optimized: self.optimized,
        }
    }
}

pub fn product(id: &str, raw_dimensions: &str) -> Product {
    let (size, weight) = dimensions::decode(Some(raw_dimensions));
    Product {
        id: id.to_string(),
        title: format!("Listing {id}"),
        sku: format!("SKU-{id}"),
        price: 99.0,
        dimensions: size,
        weight,
        status: ListingStatus::Active,
        shipping_mode: None,
        thumbnail: None,
        permalink: None,
        last_sync: None,
    }
}

pub fn two_listings() -> FakeMarketplace {
    FakeMarketplace {
        ids: vec!["ID1".to_string(), "ID2".to_string()],
        products: vec![product("ID1", "10x20x30,1500"), product("ID2", "10x20x30,1500")],
        ..FakeMarketplace::default()
    }
}

/// One request as seen by [`StubServer`]. Header names are lowercased.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

type Responder = dyn Fn(&RecordedRequest) -> (u16, String) + Send + Sync;

/// Local HTTP/1.1 server answering every request with `respond`.
pub struct StubServer {
    pub url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubServer {
    pub async fn start<F>(respond: F) -> Self
    where
        F: Fn(&RecordedRequest) -> (u16, String) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let respond: Arc<Responder> = Arc::new(respond);

        let recorded = requests.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let recorded = recorded.clone();
                let respond = respond.clone();
                tokio::spawn(async move {
                    let (read, mut write) = stream.into_split();
                    let mut reader = BufReader::new(read);

                    while let Some(request) = read_request(&mut reader).await {
                        let (status, body) = respond(&request);
                        recorded.lock().push(request);

                        let response = format!(
                            "HTTP/1.1 {status} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\r\n{body}",
                            body.len()
                        );
                        if write.write_all(response.as_bytes()).await.is_err() {
                            break;
                        }
                    }
                });
            }
        });

        Self { url, requests }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }
}

async fn read_request<R>(reader: &mut BufReader<R>) -> Option<RecordedRequest>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut line = String::new();
    if reader.read_line(&mut line).await.ok()? == 0 {
        return None;
    }
    let mut parts = line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let mut headers = HashMap::new();
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header).await.ok()? == 0 {
            return None;
        }
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let length = headers
        .get("content-length")
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0; length];
    reader.read_exact(&mut body).await.ok()?;

    Some(RecordedRequest {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}
