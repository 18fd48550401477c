mod api;
mod setup;
mod status_cmd;
mod terminal_output;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use snapsheet_config::{apply_all_defaults, defaults, load_source, redact, ConfigError, Settings};
use snapsheet_core::ImageRef;
use snapsheet_logging::{init_logger, LoggerGuard};

use api::AppState;
use terminal_output::{note_error, note_info, note_success, note_warn, render_section};

#[derive(Parser)]
#[command(name = "snapsheet")]
#[command(about = "LINE image → Gemini OCR → Google Sheets")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
        /// YAML config file; environment variables are used when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Process one image and write its table to the spreadsheet
    Process {
        /// Image to process; defaults to the newest stored image
        #[arg(short, long)]
        image: Option<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Query the health endpoint of a running server
    Status {
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, config } => {
            let (mut settings, _guard) = startup(config.as_deref()).await?;
            if let Some(port) = port {
                settings.server.port = port;
            }
            run_server(settings).await?;
        }
        Commands::Process { image, config } => {
            let (settings, _guard) = startup(config.as_deref()).await?;
            run_once(settings, image).await?;
        }
        Commands::Status { port } => {
            let port = port
                .or_else(|| std::env::var("SNAPSHEET_PORT").ok().and_then(|p| p.parse().ok()))
                .unwrap_or(defaults::DEFAULT_PORT);
            status_cmd::run(port).await?;
        }
    }

    Ok(())
}

/// Load config, start logging, and resolve settings. Missing settings are
/// fatal and each one is reported.
async fn startup(path: Option<&Path>) -> Result<(Settings, LoggerGuard)> {
    let config = apply_all_defaults(load_source(path).await?);
    let logging = config.logging.clone().unwrap_or_default();
    let guard = init_logger(
        logging.dir.as_deref().unwrap_or(defaults::DEFAULT_LOG_DIR),
        logging.level.as_deref().unwrap_or(defaults::DEFAULT_LOG_LEVEL),
    );

    let view = serde_json::to_value(&config).context("Config is not serializable")?;
    info!(config = %redact(&view), "Loaded configuration");

    match Settings::from_config(config) {
        Ok(settings) => Ok((settings, guard)),
        Err(ConfigError::Invalid(errors)) => {
            for e in &errors {
                error!(path = %e.path, message = %e.message, "Invalid configuration");
                note_error(&format!("{}: {}", e.path, e.message));
            }
            Err(ConfigError::Invalid(errors).into())
        }
    }
}

async fn run_server(settings: Settings) -> Result<()> {
    let http = setup::http_client(&settings)?;
    let pipeline = setup::build_pipeline(&settings, http.clone()).await?;

    let state = Arc::new(AppState {
        pipeline: Arc::new(pipeline),
        line: setup::line_client(&settings, http),
        channel_secret: settings.line.channel_secret.clone(),
        api_token: settings.server.api_token.clone(),
    });

    let app = api::build_router(state, &settings.line.webhook_path)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());
    let addr = settings.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(
        addr = %addr,
        webhook = %settings.line.webhook_path,
        api_auth = settings.server.api_token.is_some(),
        "HTTP server listening"
    );
    axum::serve(listener, app).await?;
    Ok(())
}

async fn run_once(settings: Settings, image: Option<PathBuf>) -> Result<()> {
    let http = setup::http_client(&settings)?;
    let pipeline = setup::build_pipeline(&settings, http).await?;

    let result = match image {
        Some(path) => pipeline.run_image(ImageRef::new(path)).await,
        None => pipeline.run_latest().await,
    };
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            note_error(&e.to_string());
            return Err(e.into());
        }
    };

    note_info(&format!("Image: {}", outcome.image));
    print!("{}", render_section("Extracted text:", &outcome.text));
    print!("{}", render_section("Table:", &outcome.table.to_string()));

    let report = &outcome.report;
    if !report.cleared {
        note_warn("The sheet could not be cleared before writing");
    }
    if report.rows_failed() > 0 {
        note_warn(&format!("{} row(s) were not written", report.rows_failed()));
    }
    note_success(&format!(
        "Wrote {} row(s) to {}",
        report.rows_written(),
        settings.sheets.sheet_name
    ));
    Ok(())
}
