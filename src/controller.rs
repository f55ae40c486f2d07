//! Session and catalog workflows: connect, import, edit, analyze, save

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::error::{AppError, Result};
use crate::models::{LogisticsAnalysis, Product, SellerAccount};
use crate::state::{AppState, Busy, NoticeKind, View};
use crate::traits::{LogisticsAdvisor, MarketplaceApi};

const NETWORK_HINT: &str =
    "HINT: this is usually a connectivity, proxy or cross-origin restriction rather than a bad token.";

/// Result of a connect workflow.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectOutcome {
    /// No credential configured; nothing was attempted.
    NotConfigured,
    /// Startup connection already ran for this controller.
    AlreadyInitialized,
    Connected {
        seller: SellerAccount,
        imported: usize,
    },
}

/// Editable numeric fields of a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
    Height,
    Width,
    Length,
    Weight,
}

impl DraftField {
    pub fn max(self) -> f64 {
        match self {
            Self::Weight => MAX_WEIGHT_KG,
            Self::Height | Self::Width | Self::Length => MAX_DIMENSION_CM,
        }
    }
}

/// Raises a busy flag for as long as it lives.
struct BusyGuard<'a> {
    state: &'a RwLock<AppState>,
    flag: Busy,
}

impl<'a> BusyGuard<'a> {
    fn raise(state: &'a RwLock<AppState>, flag: Busy) -> Self {
        state.write().busy.set(flag, true);
        Self { state, flag }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.state.write().busy.set(self.flag, false);
    }
}

/// Owns the application state and sequences every user-visible workflow.
///
/// Workflows that change the session or the catalog run one at a time; the
/// state lock itself is never held across a network call.
#[derive(Clone)]
pub struct CatalogController {
    marketplace: Arc<dyn MarketplaceApi>,
    advisor: Arc<dyn LogisticsAdvisor>,
    state: Arc<RwLock<AppState>>,
    session: Arc<Mutex<()>>,
    initialized: Arc<AtomicBool>,
}

impl CatalogController {
    pub fn new(
        marketplace: Arc<dyn MarketplaceApi>,
        advisor: Arc<dyn LogisticsAdvisor>,
        credential: Option<String>,
    ) -> Self {
        Self {
            marketplace,
            advisor,
            state: Arc::new(RwLock::new(AppState::with_credential(credential))),
            session: Arc::new(Mutex::new(())),
            initialized: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Copy of the current state for rendering.
    pub fn snapshot(&self) -> AppState {
        self.state.read().clone()
    }

    pub fn read<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
        f(&*self.state.read())
    }

    fn update<R>(&self, f: impl FnOnce(&mut AppState) -> R) -> R {
        f(&mut *self.state.write())
    }

    fn log(&self, message: impl Into<String>) {
        let message = message.into();
        info!("{message}");
        self.state.write().activity.record(message);
    }

    pub fn set_view(&self, view: View) {
        self.update(|st| st.view = view);
    }

    pub fn clear_activity(&self) {
        self.update(|st| st.activity.clear());
    }

    /// Startup connection. Runs at most once per controller; later calls
    /// return [`ConnectOutcome::AlreadyInitialized`].
    ///
    /// On failure the error is recorded, the connection error is set and the
    /// settings view is brought to front.
    pub async fn initialize(&self) -> Result<ConnectOutcome> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return Ok(ConnectOutcome::AlreadyInitialized);
        }

        let _session = self.session.lock().await;

        let Some(credential) = self.read(|st| st.credential.clone()) else {
            info!("No marketplace credential configured; skipping automatic connection");
            return Ok(ConnectOutcome::NotConfigured);
        };

        self.log("Starting automatic connection...");

        match self.authenticate_and_import(&credential).await {
            Ok((seller, imported)) => Ok(ConnectOutcome::Connected { seller, imported }),
            Err(err) => {
                self.record_connection_failure(&err, true);
                Err(err)
            }
        }
    }

    /// Manual reconnect with a raw token typed by the user.
    ///
    /// The token replaces the current one only once the marketplace accepts
    /// it; a rejected token leaves the existing session untouched.
    pub async fn connect_with_token(&self, token: &str) -> Result<ConnectOutcome> {
        let token = token.trim();
        if token.is_empty() {
            return Err(self.reject("Please enter an access token."));
        }

        let _session = self.session.lock().await;

        self.update(|st| st.connection_error = None);
        self.log("Attempting manual connection...");

        match self.authenticate_and_import(token).await {
            Ok((seller, imported)) => {
                self.update(|st| {
                    st.notify(
                        NoticeKind::Success,
                        format!("Connected as {} ({imported} listings).", seller.nickname),
                    );
                });
                Ok(ConnectOutcome::Connected { seller, imported })
            }
            Err(err) => {
                self.record_connection_failure(&err, false);
                Err(err)
            }
        }
    }

    /// Manual reconnect from a pasted OAuth answer such as
    /// `{"access_token": "...", "expires_in": 21600}`.
    pub async fn connect_with_blob(&self, blob: &str) -> Result<ConnectOutcome> {
        let token = match parse_token_blob(blob) {
            Ok(token) => token,
            Err(err) => {
                self.update(|st| st.notify(NoticeKind::Error, err.user_message()));
                return Err(err);
            }
        };

        self.log("New token extracted from JSON.");
        self.connect_with_token(&token).await
    }

    /// Reloads the catalog for the connected seller.
    pub async fn refresh_catalog(&self) -> Result<usize> {
        let _session = self.session.lock().await;

        let (credential, seller) = self.read(|st| (st.credential.clone(), st.seller.clone()));
        let (Some(credential), Some(seller)) = (credential, seller) else {
            let err = self.reject("Connect your account first in settings.");
            self.set_view(View::Settings);
            return Err(err);
        };

        self.log("Fetching listing ids...");

        match self.import_catalog(&credential, seller.id).await {
            Ok(0) => {
                self.update(|st| {
                    st.activity.record("No items returned by the marketplace.");
                    st.notify(NoticeKind::Warning, "No active listings found on this account.");
                });
                Ok(0)
            }
            Ok(imported) => {
                self.update(|st| {
                    st.activity.record("Products updated in the table.");
                    st.notify(NoticeKind::Success, format!("Loaded {imported} listings."));
                });
                Ok(imported)
            }
            Err(err) => {
                error!("Catalog refresh failed: {err}");
                self.update(|st| {
                    st.activity.record(format!("Error importing: {err}"));
                    if err.is_network() {
                        st.activity.record(NETWORK_HINT);
                    }
                    st.notify(NoticeKind::Error, err.user_message());
                });
                Err(err)
            }
        }
    }

    /// Forgets the session, the credential and the loaded catalog.
    pub async fn disconnect(&self) {
        let _session = self.session.lock().await;

        self.update(|st| {
            st.disconnect();
            st.activity.record("Disconnected from the marketplace.");
            st.notify(NoticeKind::Info, "Disconnected.");
        });
    }

    /// Starts editing `id` on an independent copy of its catalog entry.
    pub fn select_product(&self, id: &str) -> Result<Product> {
        let selected = self.update(|st| {
            let product = st.catalog.get(id).cloned()?;
            st.draft = Some(product.clone());
            st.analysis = None;
            st.activity.record(format!("Editing {} ({}).", product.sku, product.id));
            Some(product)
        });

        selected.ok_or_else(|| self.reject(format!("Listing {id} is not in the catalog.")))
    }

    /// Sets one numeric draft field. Unparsable or negative input becomes 0;
    /// values above the field's maximum are rejected and leave the draft as is.
    pub fn edit_draft(&self, field: DraftField, raw: &str) -> Result<f64> {
        let value = match parse_measure_input(raw, field.max()) {
            Ok(value) => value,
            Err(err) => {
                self.update(|st| st.notify(NoticeKind::Warning, err.user_message()));
                return Err(err);
            }
        };

        let edited = self.update(|st| {
            let draft = st.draft.as_mut()?;
            match field {
                DraftField::Height => draft.dimensions.height = value,
                DraftField::Width => draft.dimensions.width = value,
                DraftField::Length => draft.dimensions.length = value,
                DraftField::Weight => draft.weight = value,
            }
            Some(value)
        });

        edited.ok_or_else(|| self.reject("Select a product first."))
    }

    /// Asks the advisor about the current draft. Never fails once a draft
    /// exists; advisor problems come back as a degraded analysis.
    pub async fn analyze_draft(&self) -> Result<LogisticsAnalysis> {
        let Some(draft) = self.read(|st| st.draft.clone()) else {
            return Err(self.reject("Select a product first."));
        };

        self.log(format!("Requesting logistics analysis for {}...", draft.sku));

        let analysis = {
            let _analyzing = BusyGuard::raise(&self.state, Busy::Analyzing);
            self.advisor.analyze(&draft).await
        };

        self.update(|st| {
            // A different product may have been selected meanwhile.
            if st.draft.as_ref().is_some_and(|d| d.id == draft.id) {
                st.analysis = Some(analysis.clone());
            }
            if analysis.is_optimized {
                st.optimized.insert(draft.id.clone());
            } else {
                st.optimized.remove(&draft.id);
            }
            st.activity.record(format!(
                "Analysis for {}: {} ({}).",
                draft.sku, analysis.category, analysis.estimated_cost
            ));
        });

        Ok(analysis)
    }

    /// Pushes the draft's dimensions to the marketplace and, once confirmed,
    /// replaces the catalog entry with the draft plus a fresh sync time.
    pub async fn save_draft(&self) -> Result<Product> {
        let _session = self.session.lock().await;

        let (credential, draft) = self.read(|st| (st.credential.clone(), st.draft.clone()));
        let Some(draft) = draft else {
            return Err(self.reject("Select a product first."));
        };
        let Some(credential) = credential else {
            return Err(self.reject("Connect your account first in settings."));
        };

        self.log(format!("Sending update for item {}...", draft.sku));

        let result = {
            let _saving = BusyGuard::raise(&self.state, Busy::Saving);
            self.marketplace
                .update_shipping_dimensions(&credential, &draft)
                .await
        };

        match result {
            Ok(()) => {
                let saved = Product {
                    last_sync: Some(Utc::now()),
                    ..draft
                };
                self.update(|st| {
                    if !st.catalog.replace_entry(saved.clone()) {
                        warn!("Saved listing {} is no longer in the catalog", saved.id);
                    }
                    st.activity.record("Update applied on the marketplace.");
                    st.notify(
                        NoticeKind::Success,
                        format!("Dimensions of {} updated on the marketplace.", saved.sku),
                    );
                });
                Ok(saved)
            }
            Err(err) => {
                error!("Saving {} failed: {err}", draft.id);
                self.update(|st| {
                    st.activity.record(format!("Error saving to the marketplace: {err}"));
                    st.notify(NoticeKind::Error, err.user_message());
                });
                Err(err)
            }
        }
    }

    async fn authenticate_and_import(&self, credential: &str) -> Result<(SellerAccount, usize)> {
        let seller = {
            let _connecting = BusyGuard::raise(&self.state, Busy::Connecting);
            self.marketplace.current_user(credential).await?
        };

        self.update(|st| {
            // Listings loaded for another account must not outlive its session.
            if st.seller.as_ref().map(|s| s.id) != Some(seller.id) {
                st.forget_catalog();
            }
            st.credential = Some(credential.to_string());
            st.seller = Some(seller.clone());
            st.connection_error = None;
        });
        self.log(format!(
            "Authenticated user: {} (ID: {})",
            seller.nickname, seller.id
        ));

        let imported = self.import_catalog(credential, seller.id).await?;
        Ok((seller, imported))
    }

    /// Lists ids then loads details. An empty id list leaves the catalog as is.
    async fn import_catalog(&self, credential: &str, user_id: u64) -> Result<usize> {
        let _importing = BusyGuard::raise(&self.state, Busy::Importing);

        let ids = self
            .marketplace
            .list_active_item_ids(credential, user_id)
            .await?;
        self.log(format!("Found {} active listings.", ids.len()));

        if ids.is_empty() {
            self.log("No active listings found for this token.");
            return Ok(0);
        }

        let products = self.marketplace.fetch_item_details(credential, &ids).await?;
        let imported = products.len();

        self.update(|st| {
            st.catalog.replace_all(products);
            st.activity.record(format!("Details loaded: {imported} products."));
        });

        Ok(imported)
    }

    fn record_connection_failure(&self, err: &AppError, redirect: bool) {
        error!("Connection failed: {err}");

        self.update(|st| {
            st.activity.record(format!("ERROR: {err}"));
            if err.is_network() {
                st.activity.record(NETWORK_HINT);
            }
            let message = format!("Connection failed: {}", err.user_message());
            st.connection_error = Some(message.clone());
            st.notify(NoticeKind::Error, message);
            if redirect {
                st.view = View::Settings;
            }
        });
    }

    fn reject(&self, reason: impl Into<String>) -> AppError {
        let err = AppError::Validation(reason.into());
        self.update(|st| st.notify(NoticeKind::Warning, err.user_message()));
        err
    }
}

/// Pulls `access_token` out of a pasted JSON blob.
pub fn parse_token_blob(blob: &str) -> Result<String> {
    let value: serde_json::Value = serde_json::from_str(blob).map_err(|_| {
        AppError::Validation("Could not read the JSON; check that it was copied completely.".to_string())
    })?;

    value
        .get("access_token")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::Validation("Invalid JSON: field 'access_token' not found.".to_string()))
}

/// Largest accepted package side, in centimeters.
pub const MAX_DIMENSION_CM: f64 = 1_000.0;

/// Largest accepted package weight, in kilograms.
pub const MAX_WEIGHT_KG: f64 = 1_000.0;

/// Lenient number parsing for form input: unparsable or negative input is 0,
/// anything above `max` is rejected.
pub fn parse_measure_input(raw: &str, max: f64) -> Result<f64> {
    let Ok(value) = raw.trim().parse::<f64>() else {
        return Ok(0.0);
    };
    if value.is_nan() || value <= 0.0 {
        return Ok(0.0);
    }
    if value > max {
        return Err(AppError::Validation(format!(
            "{} is above the maximum of {max}.",
            raw.trim()
        )));
    }
    Ok(value)
}
