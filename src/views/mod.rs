//! # Views
//!
//! Plain-text renderings of the three screens (dashboard, product table,
//! settings) plus the product editor. Every function takes a state snapshot
//! and returns the text to print, so rendering never blocks a workflow.

use std::fmt::Write;

use crate::models::{LogisticsAnalysis, Product};
use crate::state::{AppState, Busy, Notice, NoticeKind};

const TITLE_WIDTH: usize = 40;

pub fn render_dashboard(state: &AppState) -> String {
    let summary = state.summary();
    let mut out = String::new();

    let _ = writeln!(out, "== Dashboard ==");
    match &summary.connected_as {
        Some(nickname) => {
            let _ = writeln!(out, "Connected as {nickname}");
        }
        None => {
            let _ = writeln!(out, "Offline");
        }
    }
    let _ = writeln!(out, "Listings:       {}", summary.total);
    let _ = writeln!(out, "Active:         {}", summary.active);
    let _ = writeln!(out, "Heavy (>10 kg): {}", summary.heavy);
    let _ = writeln!(out, "Optimized:      {}", summary.optimized);

    if let Some(latest) = state.activity.latest() {
        let _ = writeln!(out, "Last activity:  {latest}");
    }

    out
}

/// Product table, filtered by `search` on SKU or title.
pub fn render_products(state: &AppState, search: Option<&str>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== Products ==");

    if state.catalog.is_empty() {
        let hint = if state.is_connected() {
            "No listings loaded."
        } else {
            "No listings loaded. Connect an account in settings."
        };
        let _ = writeln!(out, "{hint}");
        return out;
    }

    let rows: Vec<&Product> = state.catalog.search(search.unwrap_or_default()).collect();
    let _ = writeln!(
        out,
        "{:<16} {:<14} {:<width$} {:>10} {:>16} {:>8} {:<7} {:<6}",
        "ID",
        "SKU",
        "TITLE",
        "PRICE",
        "H x W x L (cm)",
        "KG",
        "STATUS",
        "MODE",
        width = TITLE_WIDTH
    );
    for product in &rows {
        let _ = writeln!(out, "{}", product_row(product));
    }

    let _ = writeln!(out, "{} of {} listings", rows.len(), state.catalog.len());
    out
}

fn product_row(product: &Product) -> String {
    let size = &product.dimensions;
    format!(
        "{:<16} {:<14} {:<width$} {:>10.2} {:>16} {:>8.3} {:<7} {:<6}",
        product.id,
        product.sku,
        truncate(&product.title, TITLE_WIDTH),
        product.price,
        format!("{}x{}x{}", size.height, size.width, size.length),
        product.weight,
        product.status.label(),
        product.shipping_mode.map_or("-", |mode| mode.label()),
        width = TITLE_WIDTH
    )
}

/// Draft editor with the original values alongside and the latest analysis.
pub fn render_editor(state: &AppState) -> String {
    let mut out = String::new();

    let Some(draft) = &state.draft else {
        let _ = writeln!(out, "No product selected.");
        return out;
    };

    let _ = writeln!(out, "== {} ({}) ==", draft.title, draft.sku);
    if let Some(link) = &draft.permalink {
        let _ = writeln!(out, "{link}");
    }

    let original = state.catalog.get(&draft.id);
    let fields = [
        ("Height (cm)", draft.dimensions.height, original.map(|p| p.dimensions.height)),
        ("Width (cm)", draft.dimensions.width, original.map(|p| p.dimensions.width)),
        ("Length (cm)", draft.dimensions.length, original.map(|p| p.dimensions.length)),
        ("Weight (kg)", draft.weight, original.map(|p| p.weight)),
    ];
    for (label, value, before) in fields {
        match before {
            Some(before) if before != value => {
                let _ = writeln!(out, "{label:<12} {value} (was {before})");
            }
            _ => {
                let _ = writeln!(out, "{label:<12} {value}");
            }
        }
    }

    match original.and_then(|p| p.last_sync) {
        Some(at) => {
            let _ = writeln!(out, "Last sync    {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        None => {
            let _ = writeln!(out, "Last sync    never");
        }
    }

    if state.busy.is_set(Busy::Analyzing) {
        let _ = writeln!(out, "Analyzing...");
    } else if let Some(analysis) = &state.analysis {
        out.push_str(&render_analysis(analysis));
    }
    if state.busy.is_set(Busy::Saving) {
        let _ = writeln!(out, "Saving...");
    }

    out
}

fn render_analysis(analysis: &LogisticsAnalysis) -> String {
    let mut out = String::new();
    let verdict = if analysis.is_optimized {
        "optimized"
    } else {
        "not optimized"
    };

    let _ = writeln!(out, "-- Logistics analysis ({verdict}) --");
    let _ = writeln!(out, "Category           {}", analysis.category);
    let _ = writeln!(out, "Estimated cost     {}", analysis.estimated_cost);
    let _ = writeln!(out, "Volumetric weight  {:.2} kg", analysis.volumetric_weight);
    for warning in &analysis.warnings {
        let _ = writeln!(out, "! {warning}");
    }
    let _ = writeln!(out, "Tip: {}", analysis.packing_tip);
    out
}

/// Connection status and the activity log, newest first.
pub fn render_settings(state: &AppState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== Settings ==");

    match (&state.seller, &state.credential) {
        (Some(seller), _) => {
            let _ = writeln!(out, "Connected as {} (ID: {})", seller.nickname, seller.id);
        }
        (None, Some(_)) => {
            let _ = writeln!(out, "Token configured, not connected");
        }
        (None, None) => {
            let _ = writeln!(out, "No token configured");
        }
    }
    if let Some(error) = &state.connection_error {
        let _ = writeln!(out, "{error}");
    }

    let _ = writeln!(out, "-- Activity ({}) --", state.activity.len());
    for entry in state.activity.iter() {
        let _ = writeln!(out, "{entry}");
    }
    out
}

pub fn render_notice(notice: &Notice) -> String {
    let tag = match notice.kind {
        NoticeKind::Info => "info",
        NoticeKind::Success => "ok",
        NoticeKind::Warning => "warning",
        NoticeKind::Error => "error",
    };
    format!("[{tag}] {}", notice.text)
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut short: String = text.chars().take(width.saturating_sub(3)).collect();
    short.push_str("...");
    short
}
