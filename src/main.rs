//! `hype-train`: log in with Twitch and look at the Hype Train of your channel.
//!
//! Set `TWITCH_CLIENT_ID` (or put it in a `.env` file) to the client id of an application
//! registered at <https://dev.twitch.tv/console/apps>, and add the redirect url
//! (`http://localhost:10666/` unless overridden) to its OAuth redirect URLs.
use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use futures::executor::block_on;
use log::info;
use twitch_hype_train::{
    render::{HtmlPage, TextReport},
    storage::default_storage_path,
    App, Config, DiskStorage, Theme,
};
use url::Url;

#[derive(Parser)]
#[command(name = "hype-train")]
#[command(about = "Show the Hype Train status and records of your Twitch channel")]
#[command(version)]
struct Cli {
    /// Client id of the Twitch application
    #[arg(long, global = true)]
    client_id: Option<String>,

    /// Redirect url registered for the application
    #[arg(long, global = true)]
    redirect_url: Option<String>,

    /// Port of the local redirect listener, defaults to the port of the redirect url
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Always show the Twitch consent screen on login
    #[arg(long, global = true)]
    force_verify: bool,

    /// Storage file for the token and preferences
    #[arg(long, global = true)]
    storage: Option<PathBuf>,

    /// Also write the dashboard as an HTML page
    #[arg(long, global = true)]
    html: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Log in through the browser and show the dashboard
    Login,
    /// Finish a login with the url the browser was redirected to
    Callback { url: Url },
    /// Show the dashboard with the stored token (default)
    Status,
    /// Delete the stored token
    Logout,
    /// Show or change the dashboard theme: dark, light or toggle
    Theme { action: Option<String> },
}

fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();
    env_logger::init();
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(client_id) = cli.client_id {
        config = config.with_client_id(client_id);
    }
    if let Some(redirect_url) = &cli.redirect_url {
        config = config.with_redirect_url(redirect_url)?;
    }
    config.force_verify |= cli.force_verify;

    let storage_path = cli
        .storage
        .or_else(default_storage_path)
        .context("no data directory on this platform, pass --storage")?;
    let storage = DiskStorage::new(&storage_path)?;
    info!("storage: {}", storage.location().display());

    let mut app = App::new(twitch_oauth2::client::surf_http_client, &storage, config);

    match cli.command.unwrap_or(Command::Status) {
        Command::Theme { action } => {
            let current = Theme::load(&storage)?;
            let theme = match action.as_deref() {
                None => current,
                Some("toggle") => current.toggle(),
                Some(other) => other.parse()?,
            };
            theme.save(&storage)?;
            println!("{} {}", theme.icon(), theme);
            return Ok(());
        }
        Command::Logout => {
            app.logout()?;
            println!("Logged out.");
            return Ok(());
        }
        Command::Login => {
            let grant = app.authorize(cli.port, |url| {
                println!("To log in, please visit\n{}", url);
            });
            if let Ok(grant) = grant {
                block_on(app.complete_login(grant));
            }
        }
        Command::Callback { url } => block_on(app.init(Some(&url))),
        Command::Status => block_on(app.init(None)),
    }

    print!("{}", TextReport(app.screen()));
    if let Some(path) = cli.html {
        let page = HtmlPage {
            screen: app.screen(),
            theme: Theme::load(&storage)?,
        };
        fs::write(&path, page.to_string())
            .with_context(|| format!("could not write {}", path.display()))?;
        info!("dashboard written to {}", path.display());
    }

    if app.screen().error().is_some() {
        std::process::exit(1);
    }
    Ok(())
}
