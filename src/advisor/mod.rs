//! # Logistics Advisor
//!
//! Asks a generative model (Gemini `generateContent`) for a shipping
//! recommendation for one listing. The request pins the answer to a JSON
//! schema with six mandatory fields, which map onto [`LogisticsAnalysis`].
//!
//! ## Degradation
//!
//! The advisor never hands an error to its caller:
//! - **No API key**: returns [`LogisticsAnalysis::configuration_error`]
//!   immediately, without touching the network
//! - **Transport, HTTP or parse failure**: returns
//!   [`LogisticsAnalysis::unavailable`] and logs the root cause with `tracing`
//!
//! ## Environment Configuration
//!
//! `ADVISOR_API_KEY` enables the advisor. `ADVISOR_MODEL` and
//! `ADVISOR_API_URL` override the model and endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::models::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, LogisticsAnalysis,
    Part, Product,
};
use crate::traits::LogisticsAdvisor;

pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Divisor (cm³ per kg) the prompt asks the model to use for volumetric weight.
pub const VOLUMETRIC_DIVISOR: u32 = 6000;

/// Connection details for the advisor backend.
#[derive(Debug, Clone)]
pub struct AdvisorSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub api_url: String,
}

impl Default for AdvisorSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }
}

/// Gemini-backed [`LogisticsAdvisor`].
///
/// Cheap to clone; the underlying `reqwest::Client` shares its pool.
#[derive(Clone)]
pub struct GeminiAdvisor {
    client: Client,
    settings: AdvisorSettings,
}

impl GeminiAdvisor {
    /// Creates the advisor. A missing key is logged once here and then
    /// answered with the configuration-error analysis on every request.
    pub fn new(mut settings: AdvisorSettings) -> Self {
        settings.api_key = settings.api_key.filter(|key| !key.trim().is_empty());

        if settings.api_key.is_none() {
            warn!("ADVISOR_API_KEY not set - logistics analysis will be disabled");
        }

        Self {
            client: Client::new(),
            settings,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.api_url.trim_end_matches('/'),
            self.settings.model
        )
    }

    async fn request_analysis(&self, api_key: &str, product: &Product) -> Result<LogisticsAnalysis> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(build_prompt(product)),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: response_schema(),
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Api {
                status: status.as_u16(),
                message: body,
                payload: None,
            });
        }

        let answer: GenerateContentResponse = response.json().await?;
        let text = answer
            .first_text()
            .ok_or_else(|| AppError::Decode("advisor returned no text".to_string()))?;

        Ok(serde_json::from_str(text)?)
    }
}

#[async_trait]
impl LogisticsAdvisor for GeminiAdvisor {
    async fn analyze(&self, product: &Product) -> LogisticsAnalysis {
        let Some(api_key) = self.settings.api_key.as_deref() else {
            warn!("Skipping analysis of {}: advisor API key missing", product.id);
            return LogisticsAnalysis::configuration_error();
        };

        match self.request_analysis(api_key, product).await {
            Ok(analysis) => {
                info!(
                    "Logistics analysis for {}: {} ({})",
                    product.id, analysis.category, analysis.estimated_cost
                );
                analysis
            }
            Err(e) => {
                warn!("Logistics analysis failed for {}: {}", product.id, e);
                LogisticsAnalysis::unavailable()
            }
        }
    }
}

/// Instructions sent to the model for one listing.
pub fn build_prompt(product: &Product) -> String {
    let size = &product.dimensions;
    format!(
        "Act as a logistics specialist for marketplace sellers shipping within Brazil.\n\
         Analyze this product:\n\
         Name: {title}\n\
         Price: R$ {price:.2}\n\
         Dimensions: {h}cm (H) x {w}cm (W) x {l}cm (L)\n\
         Actual weight: {weight} kg\n\
         \n\
         Tasks:\n\
         1. Compute the volumetric weight using the standard divisor of {divisor} cm3/kg.\n\
         2. Classify the shipping tier: standard marketplace shipping, same-day flex, or a special carrier for oversized packages.\n\
         3. Estimate an average interstate delivery cost (for example SP to RJ), formatted in BRL.\n\
         4. Check whether the dimensions are efficient or waste packaging space.\n\
         5. Give one short packing tip to lower cost or avoid damage.",
        title = product.title,
        price = product.price,
        h = size.height,
        w = size.width,
        l = size.length,
        weight = product.weight,
        divisor = VOLUMETRIC_DIVISOR,
    )
}

/// Schema the model must answer with. Every field is required.
pub fn response_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "category": {
                "type": "STRING",
                "description": "Shipping tier, e.g. standard pickup, flex or dedicated carrier"
            },
            "estimatedCost": {
                "type": "STRING",
                "description": "Estimated freight cost formatted in BRL"
            },
            "volumetricWeight": {
                "type": "NUMBER",
                "description": "Computed volumetric weight in kg"
            },
            "warnings": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "Exceeded limits or shipping risks"
            },
            "packingTips": {
                "type": "STRING",
                "description": "Short packing tip"
            },
            "isOptimized": {
                "type": "BOOLEAN",
                "description": "Whether the dimensions look optimized"
            }
        },
        "required": [
            "category",
            "estimatedCost",
            "volumetricWeight",
            "warnings",
            "packingTips",
            "isOptimized"
        ]
    })
}
