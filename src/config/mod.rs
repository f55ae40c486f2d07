//! Command-line and environment configuration

use clap::{Parser, Subcommand};

use crate::advisor::{AdvisorSettings, DEFAULT_API_URL, DEFAULT_MODEL};
use crate::controller::DraftField;
use crate::marketplace::DEFAULT_BASE_URL;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "listing-logistics",
    about = "Review and correct the shipping dimensions of marketplace listings",
    version
)]
pub struct Cli {
    #[command(flatten)]
    pub settings: Settings,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Listing table when no subcommand is given.
    pub fn selected_command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or(Command::Products { search: None })
    }
}

/// Connection settings. Each one can come from a flag or the environment.
#[derive(clap::Args, Debug, Clone)]
pub struct Settings {
    #[arg(
        long,
        env = "MARKETPLACE_ACCESS_TOKEN",
        value_name = "TOKEN",
        hide_env_values = true,
        global = true,
        help = "Marketplace OAuth access token used for the automatic connection"
    )]
    pub access_token: Option<String>,

    #[arg(
        long,
        env = "MARKETPLACE_API_URL",
        value_name = "URL",
        default_value = DEFAULT_BASE_URL,
        global = true,
        help = "Marketplace REST API base URL"
    )]
    pub marketplace_url: String,

    #[arg(
        long,
        env = "ADVISOR_API_KEY",
        value_name = "KEY",
        hide_env_values = true,
        global = true,
        help = "API key for the logistics advisor; analysis is disabled without it"
    )]
    pub advisor_api_key: Option<String>,

    #[arg(
        long,
        env = "ADVISOR_MODEL",
        value_name = "MODEL",
        default_value = DEFAULT_MODEL,
        global = true,
        help = "Model used for logistics analysis"
    )]
    pub advisor_model: String,

    #[arg(
        long,
        env = "ADVISOR_API_URL",
        value_name = "URL",
        default_value = DEFAULT_API_URL,
        global = true,
        help = "Logistics advisor API base URL"
    )]
    pub advisor_url: String,
}

impl Settings {
    /// The configured token, unless blank.
    pub fn credential(&self) -> Option<String> {
        self.access_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
    }

    pub fn advisor(&self) -> AdvisorSettings {
        AdvisorSettings {
            api_key: self.advisor_api_key.clone(),
            model: self.advisor_model.clone(),
            api_url: self.advisor_url.clone(),
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Catalog summary and connection status
    Dashboard,

    /// Listing table, optionally filtered by SKU or title
    Products {
        #[arg(long, short)]
        search: Option<String>,
    },

    /// Edit one listing's shipping dimensions, analyze and save them
    Edit {
        /// Listing id, e.g. MLB123456789
        id: String,

        #[arg(long, value_name = "CM", allow_hyphen_values = true)]
        height: Option<String>,

        #[arg(long, value_name = "CM", allow_hyphen_values = true)]
        width: Option<String>,

        #[arg(long, value_name = "CM", allow_hyphen_values = true)]
        length: Option<String>,

        #[arg(long, value_name = "KG", allow_hyphen_values = true)]
        weight: Option<String>,

        /// Ask the logistics advisor about the edited values
        #[arg(long)]
        analyze: bool,

        /// Push the edited values to the marketplace
        #[arg(long)]
        save: bool,
    },

    /// Reconnect with a new token or a pasted OAuth JSON answer
    Connect {
        #[arg(long, conflicts_with = "json", required_unless_present = "json")]
        token: Option<String>,

        #[arg(long, value_name = "JSON")]
        json: Option<String>,
    },

    /// Forget the session and the loaded catalog
    Disconnect,

    /// Connection status and activity log
    Settings {
        #[arg(long)]
        clear_log: bool,
    },
}

impl Command {
    /// Draft edits requested by an `edit` invocation, in field order.
    pub fn draft_edits(&self) -> Vec<(DraftField, String)> {
        let Command::Edit {
            height,
            width,
            length,
            weight,
            ..
        } = self
        else {
            return Vec::new();
        };

        [
            (DraftField::Height, height),
            (DraftField::Width, width),
            (DraftField::Length, length),
            (DraftField::Weight, weight),
        ]
        .into_iter()
        .filter_map(|(field, raw)| raw.clone().map(|raw| (field, raw)))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["listing-logistics"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_to_product_table() {
        let cli = parse(&["--marketplace-url", "http://localhost:9"]);
        assert_eq!(cli.selected_command(), Command::Products { search: None });
        assert_eq!(cli.settings.marketplace_url, "http://localhost:9");
    }

    #[test]
    fn blank_token_is_treated_as_missing() {
        let cli = parse(&["--access-token", "  ", "dashboard"]);
        assert_eq!(cli.settings.credential(), None);

        let cli = parse(&["--access-token", " APP_USR-1 ", "dashboard"]);
        assert_eq!(cli.settings.credential().as_deref(), Some("APP_USR-1"));
    }

    #[test]
    fn edit_collects_only_given_fields() {
        let cli = parse(&["edit", "MLB1", "--weight", "2.75", "--height", "-3", "--save"]);
        let command = cli.selected_command();

        assert_eq!(
            command.draft_edits(),
            vec![
                (DraftField::Height, "-3".to_string()),
                (DraftField::Weight, "2.75".to_string()),
            ]
        );
        assert!(matches!(command, Command::Edit { save: true, analyze: false, .. }));
    }

    #[test]
    fn connect_needs_token_or_json() {
        let argv = ["listing-logistics", "connect"];
        assert!(Cli::try_parse_from(argv).is_err());

        let cli = parse(&["connect", "--json", r#"{"access_token":"x"}"#]);
        assert!(matches!(cli.selected_command(), Command::Connect { token: None, json: Some(_) }));
    }

    #[test]
    fn advisor_settings_follow_flags() {
        let cli = parse(&["--advisor-model", "gemini-test", "--advisor-api-key", "k"]);
        let advisor = cli.settings.advisor();
        assert_eq!(advisor.model, "gemini-test");
        assert_eq!(advisor.api_key.as_deref(), Some("k"));
    }
}
