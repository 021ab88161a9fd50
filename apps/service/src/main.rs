use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::info;
use uuid::Uuid;

use openping::config::Config;
use openping::{HttpFetcher, JsonFileStore, MonitoringScheduler, Site, SiteCoordinator, SiteStatus};

/// How long one-shot commands wait for a fresh probe before giving up
const PROBE_WAIT: Duration = Duration::from_secs(30);

#[derive(Debug, Parser)]
#[command(name = "openping", version, about = "Keep an eye on your HTTPS endpoints")]
struct Cli {
    /// Config file (defaults to $XDG_CONFIG_HOME/openping/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Register a site and check it once
    Add {
        url: String,
        /// Seconds between checks: 30, 60, 90 or 120
        #[arg(short, long, default_value_t = 30)]
        frequency: u64,
    },
    /// Change the URL and frequency of a site
    Edit {
        id: Uuid,
        url: String,
        /// Keeps the current frequency when omitted
        #[arg(short, long)]
        frequency: Option<u64>,
    },
    /// Stop monitoring a site
    Delete { id: Uuid },
    /// Pause or resume a site
    Toggle { id: Uuid },
    /// Show all sites with their last known status
    List,
    /// Check every active site once
    Check,
    /// Monitor continuously until interrupted
    Run,
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_config(cli.config.as_ref()).context("Failed to load configuration")?;
    logger::init_tracing_with(logger::parse_level(&config.logging.level));

    if let Command::Config = cli.command {
        print!("{config}");
        return Ok(());
    }

    let store = Arc::new(JsonFileStore::new(&config.storage.path));
    let fetcher = Arc::new(
        HttpFetcher::new(config.monitoring.timeout(), &config.monitoring.user_agent)
            .context("Failed to build HTTP client")?,
    );
    let coordinator = SiteCoordinator::with_save_timing(
        store,
        fetcher,
        config.monitoring.debounce(),
        config.monitoring.max_save_delay(),
    );
    coordinator.hydrate().await;

    match cli.command {
        Command::Add { url, frequency } => {
            let site = coordinator.add(&url, frequency).await?;
            println!("Added {} ({})", site.url, site.id);
            if let Some(site) = wait_for_probe(&coordinator, site.id).await {
                print_site(&site);
            }
        }
        Command::Edit { id, url, frequency } => {
            let site = coordinator.edit(id, &url, frequency).await?;
            println!("Updated {}", site.id);
            if site.is_active {
                if let Some(site) = wait_for_probe(&coordinator, site.id).await {
                    print_site(&site);
                }
            }
        }
        Command::Delete { id } => {
            let site = coordinator.delete(id).await?;
            println!("Deleted {}", site.url);
        }
        Command::Toggle { id } => {
            let site = coordinator.toggle_active(id).await?;
            if site.is_active {
                println!("Resumed {}", site.url);
                if let Some(site) = wait_for_probe(&coordinator, site.id).await {
                    print_site(&site);
                }
            } else {
                println!("Paused {}", site.url);
            }
        }
        Command::List => {
            let sites = coordinator.sites().await;
            if sites.is_empty() {
                println!("No sites yet. Add one with `openping add <url>`.");
            }
            for site in &sites {
                print_site(site);
            }
        }
        Command::Check => check_all(&coordinator).await,
        Command::Run => run(&coordinator, config.monitoring.scheduler_tick()).await?,
        Command::Config => {}
    }

    coordinator.flush().await;
    Ok(())
}

async fn check_all(coordinator: &SiteCoordinator) {
    let mut checks = JoinSet::new();
    for site in coordinator.sites().await.into_iter().filter(|s| s.is_active) {
        let coordinator = coordinator.clone();
        checks.spawn(async move { coordinator.check_now(site.id).await });
    }

    while let Some(result) = checks.join_next().await {
        if let Ok(Some(site)) = result {
            print_site(&site);
        }
    }
}

async fn run(coordinator: &SiteCoordinator, tick: Duration) -> Result<()> {
    let sites = coordinator.sites().await;
    info!(
        "Monitoring {} sites ({} active)",
        sites.len(),
        sites.iter().filter(|s| s.is_active).count()
    );

    let scheduler = MonitoringScheduler::new(coordinator.clone(), tick).start();
    let transitions = tokio::spawn(log_transitions(coordinator.subscribe()));

    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;
    info!("Shutting down");

    scheduler.abort();
    transitions.abort();
    Ok(())
}

/// Log every status change seen on the snapshot feed
async fn log_transitions(mut rx: watch::Receiver<Vec<Site>>) {
    let mut last: HashMap<Uuid, SiteStatus> =
        rx.borrow_and_update().iter().map(|s| (s.id, s.status())).collect();

    while rx.changed().await.is_ok() {
        let sites = rx.borrow_and_update().clone();
        for site in &sites {
            let status = site.status();
            if last.get(&site.id) != Some(&status) {
                info!(site = %site.id, url = %site.url, "Status {}", status);
            }
        }
        last = sites.iter().map(|s| (s.id, s.status())).collect();
    }
}

/// Wait for the site's next committed probe. Returns the current record when
/// the wait ends, or `None` if the site went away.
async fn wait_for_probe(coordinator: &SiteCoordinator, id: Uuid) -> Option<Site> {
    let mut rx = coordinator.subscribe();
    let before = rx.borrow().iter().find(|s| s.id == id).and_then(|s| s.last_pinged_at);

    let _ = tokio::time::timeout(
        PROBE_WAIT,
        rx.wait_for(|sites| {
            sites.iter().find(|s| s.id == id).is_none_or(|s| s.last_pinged_at > before)
        }),
    )
    .await;

    rx.borrow().iter().find(|s| s.id == id).cloned()
}

fn print_site(site: &Site) {
    let last = site
        .last_pinged_at
        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".into());

    println!(
        "{}  {:<8} every {:>3}s  last checked {}  {}",
        site.id,
        site.status(),
        site.frequency,
        last,
        site.url
    );
}
