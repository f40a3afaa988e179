mod commands;
mod host;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use hkmp_core::{AnalyticsMode, NoopAnalytics, SharedAnalytics, TracingAnalytics};
use hkmp_nav::ProviderId;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "hkmp")]
#[command(about = "Hong Kong motorcycle parking: load spaces and build navigation links")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Load parking spaces from the KML source and print them
    Points {
        /// Primary KML URL or path; defaults to HKMP_KML_URL
        #[arg(long)]
        url: Option<String>,
        /// Only print spaces whose name contains this text
        #[arg(long)]
        filter: Option<String>,
        #[command(flatten)]
        near: NearArgs,
        #[arg(long)]
        json: bool,
    },
    /// Print app and web navigation links for a location
    Links {
        #[command(flatten)]
        location: LocationArgs,
        #[command(flatten)]
        device: DeviceArgs,
        #[arg(long)]
        json: bool,
    },
    /// Open a location in a map provider, falling back to the web link
    Open {
        #[command(flatten)]
        location: LocationArgs,
        #[command(flatten)]
        device: DeviceArgs,
        #[arg(long)]
        provider: ProviderId,
    },
    /// Build the parking KML document from the HK eMobility WFS feed
    GenerateKml {
        /// GeoJSON feed URL; defaults to HKMP_WFS_URL
        #[arg(long)]
        url: Option<String>,
        /// Output path; defaults to HKMP_FALLBACK_KML
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

impl Commands {
    fn page(&self) -> &'static str {
        match self {
            Commands::Points { .. } => "/points",
            Commands::Links { .. } => "/links",
            Commands::Open { .. } => "/open",
            Commands::GenerateKml { .. } => "/generate-kml",
        }
    }
}

#[derive(Debug, Clone, Args)]
struct LocationArgs {
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,
    #[arg(long, allow_hyphen_values = true)]
    lng: f64,
    #[arg(long, default_value = "停車位")]
    name: String,
}

/// Where the rider is; sorts spaces nearest first.
#[derive(Debug, Clone, Args)]
struct NearArgs {
    #[arg(long, allow_hyphen_values = true, requires = "near_lng")]
    near_lat: Option<f64>,
    #[arg(long, allow_hyphen_values = true, requires = "near_lat")]
    near_lng: Option<f64>,
}

#[derive(Debug, Clone, Args)]
struct DeviceArgs {
    /// User-agent string used to pick iOS, Android, or desktop links
    #[arg(long, env = "HKMP_DEVICE_USER_AGENT", default_value = "")]
    user_agent: String,
    /// navigator.platform value, if known
    #[arg(long, default_value = "")]
    platform: String,
    #[arg(long, default_value_t = 0)]
    max_touch_points: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = hkmp_core::load_app_config_from_env()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let analytics: SharedAnalytics = match config.analytics {
        AnalyticsMode::Tracing => Arc::new(TracingAnalytics),
        AnalyticsMode::Off => Arc::new(NoopAnalytics),
    };

    analytics.track_page_view(cli.command.page());

    match cli.command {
        Commands::Points {
            url,
            filter,
            near,
            json,
        } => {
            commands::run_points(&config, analytics, url, filter, &near, json).await?;
        }
        Commands::Links {
            location,
            device,
            json,
        } => commands::run_links(&config, &location, &device, json)?,
        Commands::Open {
            location,
            device,
            provider,
        } => commands::run_open(&config, analytics, &location, &device, provider).await?,
        Commands::GenerateKml { url, output } => {
            commands::run_generate_kml(&config, analytics, url, output).await?;
        }
    }

    Ok(())
}
