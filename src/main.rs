use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

mod activity;
mod advisor;
mod config;
mod controller;
mod dimensions;
mod error;
mod marketplace;
mod models;
mod state;
mod traits;
mod views;

#[cfg(test)]
mod test_support;

use advisor::GeminiAdvisor;
use config::{Cli, Command};
use controller::{CatalogController, ConnectOutcome, DraftField};
use marketplace::MarketplaceClient;
use state::View;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let command = cli.selected_command();

    info!("Starting listing logistics");

    let marketplace = MarketplaceClient::new(cli.settings.marketplace_url.clone())?;
    let advisor = GeminiAdvisor::new(cli.settings.advisor());
    let controller = CatalogController::new(
        Arc::new(marketplace),
        Arc::new(advisor),
        cli.settings.credential(),
    );

    // A manual connect replaces the configured token, so skip the startup one.
    if !matches!(command, Command::Connect { .. }) {
        if let Err(e) = controller.initialize().await {
            warn!("Automatic connection failed: {}", e);
        }
    }

    let outcome = run(&controller, command).await;

    let state = controller.snapshot();
    if let Some(notice) = &state.notice {
        println!("{}", views::render_notice(notice));
    }

    outcome
}

/// Runs one command against the controller and prints the resulting view.
///
/// A failed edit, save or connection is returned so the process exits
/// non-zero; the view and notice are printed either way.
async fn run(controller: &CatalogController, command: Command) -> Result<()> {
    let edits = command.draft_edits();

    match command {
        Command::Dashboard => controller.set_view(View::Dashboard),
        Command::Products { search } => {
            print_view(controller, search.as_deref());
            return Ok(());
        }
        Command::Edit {
            id, analyze, save, ..
        } => {
            if let Err(e) = controller.select_product(&id) {
                print_view(controller, None);
                return Err(e.into());
            }

            let result = edit_listing(controller, edits, analyze, save).await;
            println!("{}", views::render_editor(&controller.snapshot()));
            return result;
        }
        Command::Connect { token, json } => {
            let outcome = match (token, json) {
                (_, Some(json)) => controller.connect_with_blob(&json).await,
                (token, None) => {
                    controller
                        .connect_with_token(token.as_deref().unwrap_or_default())
                        .await
                }
            };
            controller.set_view(View::Settings);
            print_view(controller, None);

            if let ConnectOutcome::Connected { seller, imported } = outcome? {
                info!("Connected as {} with {} listings", seller.nickname, imported);
            }
            return Ok(());
        }
        Command::Disconnect => {
            controller.disconnect().await;
            controller.set_view(View::Settings);
        }
        Command::Settings { clear_log } => {
            if clear_log {
                controller.clear_activity();
            }
            controller.set_view(View::Settings);
        }
    }

    print_view(controller, None);
    Ok(())
}

async fn edit_listing(
    controller: &CatalogController,
    edits: Vec<(DraftField, String)>,
    analyze: bool,
    save: bool,
) -> Result<()> {
    for (field, raw) in edits {
        controller.edit_draft(field, &raw)?;
    }
    if analyze {
        controller.analyze_draft().await?;
    }
    if save {
        controller.save_draft().await?;
    }
    Ok(())
}

fn print_view(controller: &CatalogController, search: Option<&str>) {
    let state = controller.snapshot();
    let text = match state.view {
        View::Dashboard => views::render_dashboard(&state),
        View::Products => views::render_products(&state, search),
        View::Settings => views::render_settings(&state),
    };
    println!("{text}");
}
