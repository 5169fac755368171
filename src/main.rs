//! chatglass - live chat-page observation and reply assistant engine.
//!
//! Wires the observer engine to a running Chromium over the DevTools
//! protocol. The browser must be started with remote debugging enabled:
//!
//! ```bash
//! chromium --remote-debugging-port=9222
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url::Url;

use chatglass_observer::{
    AnalysisChannel, AnalyzeRequest, AnalyzeResponse, CdpClient, CdpConfig, HttpAnalysisChannel,
    ObserverConfig, ObserverController, PageDriver, Platform, PrivacyStore,
};

/// chatglass CLI.
#[derive(Parser)]
#[command(name = "chatglass")]
#[command(about = "Live chat-page observation and reply assistant engine")]
#[command(version)]
struct Cli {
    /// Browser remote-debugging port
    #[arg(long, default_value_t = 9222, global = true)]
    port: u16,

    /// Privacy flag file; `true` inside means fully disengaged
    #[arg(long, global = true)]
    privacy_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the chat tab, anchoring overlays to detected message bubbles
    Observe {
        /// Skip mounting the persistent sidebar
        #[arg(long)]
        no_sidebar: bool,
    },

    /// Print the most recent incoming message
    Scrape,

    /// Write text into the compose field
    Inject {
        /// Text to insert at the caret
        text: String,
    },

    /// Scrape the latest incoming message, send it for analysis, print the
    /// reply
    Analyze {
        /// Analysis service endpoint
        #[arg(long, env = "CHATGLASS_ANALYSIS_URL")]
        endpoint: Url,
    },

    /// List open page targets and how their addresses resolve
    Pages,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = CdpConfig {
        debug_port: cli.port,
    };

    match cli.command {
        Commands::Pages => {
            let client = CdpClient::connect(&config.endpoint())
                .await
                .context("connecting to browser")?;
            for page in client.list_pages().await? {
                let platform = Url::parse(&page.url)
                    .map(|u| Platform::resolve(&u))
                    .unwrap_or(Platform::Unknown);
                println!("{:10} {}", platform.to_string(), page.url);
            }
        }

        Commands::Observe { no_sidebar } => {
            let (_client, page) = attach_chat_tab(&config).await?;
            let driver: Arc<dyn PageDriver> = page;
            let controller = ObserverController::new(
                driver,
                ObserverConfig {
                    mount_sidebar: !no_sidebar,
                    ..ObserverConfig::default()
                },
            );

            // When a privacy file is given its current value decides
            // whether we engage at all, and later edits toggle the engine.
            let _store = match &cli.privacy_file {
                Some(path) => {
                    let store =
                        PrivacyStore::open(path).context("opening privacy flag store")?;
                    let _binding = controller.bind_privacy(store.subscribe());
                    Some(store)
                }
                None => {
                    controller.start().await?;
                    None
                }
            };

            info!("observing; ctrl-c to stop");
            tokio::signal::ctrl_c().await?;
            controller.stop().await;
        }

        Commands::Scrape => {
            let (_client, page) = attach_chat_tab(&config).await?;
            let controller = ObserverController::new(page, ObserverConfig::default());
            let extraction = controller
                .scrape_last_incoming()
                .await
                .context("extraction failed")?;
            if extraction.low_confidence {
                warn!("no direction signal available; returning the newest message");
            }
            println!("{}", extraction.text);
        }

        Commands::Inject { text } => {
            let (_client, page) = attach_chat_tab(&config).await?;
            let controller = ObserverController::new(page, ObserverConfig::default());
            if controller.insert_text(&text).await? {
                info!("text inserted into the compose field");
            } else {
                bail!("no usable compose surface on this page");
            }
        }

        Commands::Analyze { endpoint } => {
            let (_client, page) = attach_chat_tab(&config).await?;
            let controller = ObserverController::new(page, ObserverConfig::default());
            let extraction = controller
                .scrape_last_incoming()
                .await
                .context("extraction failed")?;
            info!(
                chars = extraction.text.chars().count(),
                low_confidence = extraction.low_confidence,
                "sending text for analysis"
            );

            let channel = HttpAnalysisChannel::new(endpoint);
            match channel.analyze(AnalyzeRequest::new(extraction.text)).await? {
                AnalyzeResponse::Success(data) => {
                    println!("{}", serde_json::to_string_pretty(&data)?);
                }
                AnalyzeResponse::Failure(error) => bail!("analysis failed: {error}"),
            }
        }
    }

    Ok(())
}

/// Connect and attach to the first open tab that resolves to a supported
/// chat platform. The tab belongs to the user; we never open one.
async fn attach_chat_tab(config: &CdpConfig) -> Result<(CdpClient, Arc<dyn PageDriver>)> {
    let client = CdpClient::connect(&config.endpoint())
        .await
        .context("connecting to browser (is it running with --remote-debugging-port?)")?;

    let pages = client.list_pages().await?;
    let target = pages.iter().find(|p| {
        Url::parse(&p.url)
            .map(|u| Platform::resolve(&u) != Platform::Unknown)
            .unwrap_or(false)
    });
    let Some(target) = target else {
        bail!("no open chat tab found; open WhatsApp, Instagram or Messenger web first");
    };

    info!(url = %target.url, "attaching to chat tab");
    let page: Arc<dyn PageDriver> = Arc::new(client.attach_page(&target.id).await?);
    Ok((client, page))
}
