//! Card Study client: resilient access to the flashcard backend over a local
//! dev origin and a hosted origin, plus the auth/dashboard/deck/study calls
//! built on it.

pub mod api;
pub mod config;
pub mod credentials;
pub mod dashboard;
pub mod decks;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod network;
pub mod selector;
pub mod session;
pub mod storage;
pub mod study;
pub mod timeout;
pub mod transport;

pub use api::ApiClient;
pub use config::ClientConfig;
pub use engine::RequestOptions;
pub use error::{is_connectivity_failure, Error, Result};
pub use network::{Origin, Origins};

use clap::{Parser, Subcommand};
use serde::Serialize;
use session::UserSession;

#[derive(Parser)]
#[command(name = "cardstudy", version, about = "Card Study backend client")]
pub struct Cli {
    /// Per-attempt timeout in milliseconds.
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Probe the health endpoint on either origin.
    Ping,
    /// Show or change the sticky base.
    Base {
        #[command(subcommand)]
        action: BaseAction,
    },
    Login { email: String, password: String },
    Logout,
    Whoami,
    /// GET an arbitrary path and print the JSON.
    Get {
        path: String,
        #[arg(long)]
        prefer_local: bool,
    },
    Dashboard,
    /// Decks, progress, weekly goal and rounded stats in one view.
    Overview,
    Decks {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        per_page: u32,
    },
    /// Show or persist client settings in config.json.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Show,
    Set {
        #[arg(long)]
        local_url: Option<String>,
        #[arg(long)]
        prod_url: Option<String>,
        /// Default per-attempt timeout in milliseconds.
        #[arg(long)]
        default_timeout_ms: Option<u64>,
        #[arg(long)]
        health_path: Option<String>,
    },
}

#[derive(Subcommand)]
enum BaseAction {
    Show,
    Reset,
    Force { origin: Origin },
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("cannot render output: {}", e),
    }
}

fn show_base(api: &ApiClient) {
    print_json(&serde_json::json!({
        "active": api.active_base().as_str(),
        "label": api.connected_label(),
        "sticky": api.sticky_base().map(Origin::as_str),
        "url": api.current_base_url(),
    }));
}

fn show_config(cfg: &ClientConfig) {
    print_json(&serde_json::json!({
        "local_url": cfg.local_url,
        "prod_url": cfg.prod_url,
        "timeout_ms": cfg.timeout_ms,
        "health_path": cfg.health_path,
        "config_dir": cfg.config_dir.display().to_string(),
        "session_dir": cfg.session_dir.as_ref().map(|d| d.display().to_string()),
    }));
}

fn configure(action: ConfigAction) -> Result<()> {
    let mut cfg = ClientConfig::load();
    if let ConfigAction::Set {
        local_url,
        prod_url,
        default_timeout_ms,
        health_path,
    } = action
    {
        if let Some(url) = local_url {
            cfg.local_url = url;
        }
        if let Some(url) = prod_url {
            cfg.prod_url = url;
        }
        if let Some(ms) = default_timeout_ms.filter(|ms| *ms > 0) {
            cfg.timeout_ms = ms;
        }
        if let Some(path) = health_path {
            cfg.health_path = path;
        }
        let path = cfg
            .save()
            .map_err(|e| Error::Config(format!("cannot write config: {}", e)))?;
        log::info!("Saved {}", path.display());
    }
    show_config(&cfg);
    Ok(())
}

pub async fn run(cli: Cli) -> Result<()> {
    let mut cfg = ClientConfig::load();
    if let Some(ms) = cli.timeout_ms.filter(|ms| *ms > 0) {
        cfg.timeout_ms = ms;
    }
    log::debug!("Origins: local={} prod={}", cfg.local_url, cfg.prod_url);
    let api = ApiClient::from_config(&cfg)?;

    match cli.command {
        Command::Ping => {
            let up = api.ping().await;
            print_json(&serde_json::json!({ "ok": up, "base": api.connected_label() }));
        }
        Command::Base { action } => {
            match action {
                BaseAction::Show => {}
                BaseAction::Reset => api.reset_base(),
                BaseAction::Force { origin } => api.force_base(origin),
            }
            show_base(&api);
        }
        Command::Login { email, password } => {
            let session = UserSession::new(api);
            let user = session.login(email.trim(), password.trim()).await?;
            print_json(&user);
        }
        Command::Logout => UserSession::new(api).logout(),
        Command::Whoami => {
            let user = UserSession::new(api).current_user().await?;
            print_json(&user);
        }
        Command::Get { path, prefer_local } => {
            let mut opts = RequestOptions::new();
            if prefer_local {
                opts = opts.prefer_local();
            }
            print_json(&api.get_json(&path, &opts).await?);
        }
        Command::Dashboard => print_json(&dashboard::fetch_dashboard_bundle(&api, None).await),
        Command::Overview => print_json(&dashboard::fetch_user_data(&api).await?),
        Command::Decks { page, per_page } => {
            print_json(&decks::fetch_decks(&api, page, per_page).await)
        }
        Command::Config { action } => configure(action)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_set_parses_given_settings() {
        let cli = Cli::try_parse_from([
            "cardstudy",
            "config",
            "set",
            "--local-url",
            "http://localhost:9000",
            "--default-timeout-ms",
            "2500",
        ])
        .unwrap();
        match cli.command {
            Command::Config {
                action:
                    ConfigAction::Set {
                        local_url,
                        prod_url,
                        default_timeout_ms,
                        health_path,
                    },
            } => {
                assert_eq!(local_url.as_deref(), Some("http://localhost:9000"));
                assert_eq!(prod_url, None);
                assert_eq!(default_timeout_ms, Some(2500));
                assert_eq!(health_path, None);
            }
            _ => panic!("expected config set"),
        }
    }

    #[test]
    fn overview_is_a_command() {
        let cli = Cli::try_parse_from(["cardstudy", "overview"]).unwrap();
        assert!(matches!(cli.command, Command::Overview));
    }
}
