//! Session and catalog state owned by the controller

use std::collections::HashSet;

use crate::activity::ActivityLog;
use crate::models::{ListingStatus, LogisticsAnalysis, Product, SellerAccount};

/// Which of the three views is in front.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum View {
    Dashboard,
    #[default]
    Products,
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Warning,
    Error,
}

/// Last short message addressed to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn new(kind: NoticeKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// In-flight operations. Each one disables its own affordance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Busy {
    Connecting,
    Importing,
    Analyzing,
    Saving,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusyFlags {
    pub connecting: bool,
    pub importing: bool,
    pub analyzing: bool,
    pub saving: bool,
}

impl BusyFlags {
    pub fn set(&mut self, flag: Busy, value: bool) {
        match flag {
            Busy::Connecting => self.connecting = value,
            Busy::Importing => self.importing = value,
            Busy::Analyzing => self.analyzing = value,
            Busy::Saving => self.saving = value,
        }
    }

    pub fn is_set(&self, flag: Busy) -> bool {
        match flag {
            Busy::Connecting => self.connecting,
            Busy::Importing => self.importing,
            Busy::Analyzing => self.analyzing,
            Busy::Saving => self.saving,
        }
    }

    pub fn any(&self) -> bool {
        self.connecting || self.importing || self.analyzing || self.saving
    }
}

/// Ordered listings, unique by id.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    /// Replaces every entry. Later duplicates of an id are dropped.
    pub fn replace_all(&mut self, products: Vec<Product>) {
        let mut seen = HashSet::new();
        self.products = products
            .into_iter()
            .filter(|product| seen.insert(product.id.clone()))
            .collect();
    }

    /// Swaps in `product` where its id lives. Returns false if the id is unknown.
    pub fn replace_entry(&mut self, product: Product) -> bool {
        match self.products.iter_mut().find(|p| p.id == product.id) {
            Some(slot) => {
                *slot = product;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn clear(&mut self) {
        self.products.clear();
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.products.iter()
    }

    pub fn search<'a>(&'a self, query: &'a str) -> impl Iterator<Item = &'a Product> {
        self.products.iter().filter(move |p| p.matches(query))
    }
}

/// Headline numbers for the dashboard view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSummary {
    pub total: usize,
    pub active: usize,
    pub heavy: usize,
    pub optimized: usize,
    pub connected_as: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Bearer token for marketplace calls.
    pub credential: Option<String>,
    pub seller: Option<SellerAccount>,
    pub catalog: Catalog,
    /// Working copy of the product being edited.
    pub draft: Option<Product>,
    pub analysis: Option<LogisticsAnalysis>,
    /// Ids whose latest analysis came back optimized.
    pub optimized: HashSet<String>,
    pub activity: ActivityLog,
    pub busy: BusyFlags,
    pub view: View,
    pub connection_error: Option<String>,
    pub notice: Option<Notice>,
}

impl AppState {
    pub fn with_credential(credential: Option<String>) -> Self {
        Self {
            credential: credential.filter(|token| !token.trim().is_empty()),
            ..Self::default()
        }
    }

    pub fn is_connected(&self) -> bool {
        self.seller.is_some()
    }

    pub fn notify(&mut self, kind: NoticeKind, text: impl Into<String>) {
        self.notice = Some(Notice::new(kind, text));
    }

    /// Drops the session and everything loaded through it.
    pub fn disconnect(&mut self) {
        self.credential = None;
        self.seller = None;
        self.connection_error = None;
        self.forget_catalog();
    }

    /// Drops listings, the draft and analysis results, keeping the session.
    pub fn forget_catalog(&mut self) {
        self.catalog.clear();
        self.draft = None;
        self.analysis = None;
        self.optimized.clear();
    }

    pub fn summary(&self) -> DashboardSummary {
        DashboardSummary {
            total: self.catalog.len(),
            active: self
                .catalog
                .iter()
                .filter(|p| p.status == ListingStatus::Active)
                .count(),
            heavy: self.catalog.iter().filter(|p| p.is_heavy()).count(),
            optimized: self
                .catalog
                .iter()
                .filter(|p| self.optimized.contains(&p.id))
                .count(),
            connected_as: self.seller.as_ref().map(|s| s.nickname.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Dimensions;

    fn product(id: &str, weight: f64, status: ListingStatus) -> Product {
        Product {
            id: id.to_string(),
            title: format!("Item {id}"),
            sku: format!("SKU-{id}"),
            price: 10.0,
            dimensions: Dimensions::default(),
            weight,
            status,
            shipping_mode: None,
            thumbnail: None,
            permalink: None,
            last_sync: None,
        }
    }

    #[test]
    fn replace_all_keeps_first_of_duplicate_ids() {
        let mut catalog = Catalog::default();
        catalog.replace_all(vec![
            product("A", 1.0, ListingStatus::Active),
            product("B", 2.0, ListingStatus::Active),
            product("A", 9.0, ListingStatus::Paused),
        ]);

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("A").unwrap().weight, 1.0);
    }

    #[test]
    fn replace_entry_only_touches_matching_id() {
        let mut catalog = Catalog::default();
        catalog.replace_all(vec![
            product("A", 1.0, ListingStatus::Active),
            product("B", 2.0, ListingStatus::Active),
        ]);

        assert!(catalog.replace_entry(product("B", 5.0, ListingStatus::Active)));
        assert!(!catalog.replace_entry(product("Z", 5.0, ListingStatus::Active)));
        assert_eq!(catalog.get("A").unwrap().weight, 1.0);
        assert_eq!(catalog.get("B").unwrap().weight, 5.0);
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn summary_counts_active_heavy_and_optimized() {
        let mut state = AppState::default();
        state.catalog.replace_all(vec![
            product("A", 12.0, ListingStatus::Active),
            product("B", 2.0, ListingStatus::Paused),
            product("C", 10.0, ListingStatus::Active),
        ]);
        state.optimized.insert("C".to_string());
        state.optimized.insert("gone".to_string());

        let summary = state.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.active, 2);
        assert_eq!(summary.heavy, 1);
        assert_eq!(summary.optimized, 1);
        assert_eq!(summary.connected_as, None);
    }

    #[test]
    fn disconnect_clears_session_and_catalog() {
        let mut state = AppState::with_credential(Some("token".to_string()));
        state.seller = Some(SellerAccount {
            id: 1,
            nickname: "SHOP".to_string(),
            email: String::new(),
        });
        state.catalog.replace_all(vec![product("A", 1.0, ListingStatus::Active)]);
        state.activity.record("kept");

        state.disconnect();

        assert!(!state.is_connected());
        assert!(state.credential.is_none());
        assert!(state.catalog.is_empty());
        assert_eq!(state.activity.len(), 1);
    }

    #[test]
    fn blank_credential_counts_as_missing() {
        assert!(AppState::with_credential(Some("  ".to_string())).credential.is_none());
    }

    #[test]
    fn busy_flags_track_each_operation() {
        let mut flags = BusyFlags::default();
        flags.set(Busy::Saving, true);
        assert!(flags.is_set(Busy::Saving));
        assert!(!flags.is_set(Busy::Analyzing));
        assert!(flags.any());
        flags.set(Busy::Saving, false);
        assert!(!flags.any());
    }
}
