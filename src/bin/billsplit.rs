//! Server binary for billsplit.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ServiceConfig` and runs the HTTP server.

use anyhow::{Context, Result};
use billsplit::{serve, AnthropicVision, ServiceConfig, VisionModel};
use clap::Parser;
use std::io;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"ENDPOINTS:
  GET  /               banner
  POST /parse-bill     multipart upload (field "file"): JPEG, PNG, WebP, HEIC/HEIF
  POST /split-equal    {"items", "tax", "tip", "people_count", "split_type"}
  POST /split-by-item  {"items", "tax", "tip", "assignments"}

EXAMPLES:
  # Local development next to the Vite frontend
  export ANTHROPIC_API_KEY=sk-ant-...
  billsplit

  # Listen on all interfaces for a deployed frontend
  billsplit --bind 0.0.0.0 --port 8080 --allowed-origin https://split.example.com

  # Try it
  curl -F file=@receipt.jpg http://localhost:8000/parse-bill

ENVIRONMENT VARIABLES:
  ANTHROPIC_API_KEY       Vision model API key (read on every parse request)
  RUST_LOG                Log filter, e.g. billsplit=debug,tower_http=info
"#;

/// Receipt parsing and bill splitting HTTP API.
#[derive(Parser, Debug)]
#[command(
    name = "billsplit",
    version,
    about = "Receipt parsing and bill splitting HTTP API",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Address to bind.
    #[arg(long, env = "BILLSPLIT_BIND", default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on.
    #[arg(short, long, env = "BILLSPLIT_PORT", default_value_t = 8000)]
    port: u16,

    /// The one browser origin allowed by CORS.
    #[arg(
        long,
        env = "BILLSPLIT_ALLOWED_ORIGIN",
        default_value = billsplit::config::DEFAULT_ALLOWED_ORIGIN
    )]
    allowed_origin: String,

    /// Vision model ID.
    #[arg(long, env = "BILLSPLIT_MODEL", default_value = billsplit::config::DEFAULT_MODEL)]
    model: String,

    /// Max tokens the model may generate per receipt.
    #[arg(long, env = "BILLSPLIT_MAX_TOKENS", default_value_t = 1000)]
    max_tokens: u32,

    /// Messages API base URL.
    #[arg(long, env = "BILLSPLIT_API_BASE_URL", default_value = "https://api.anthropic.com")]
    api_base_url: String,

    /// Environment variable holding the API key.
    #[arg(long, env = "BILLSPLIT_API_KEY_ENV", default_value = "ANTHROPIC_API_KEY")]
    api_key_env: String,

    /// Per-call vision model timeout in seconds.
    #[arg(long, env = "BILLSPLIT_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// JPEG quality (1–100) for converted HEIC uploads.
    #[arg(long, env = "BILLSPLIT_JPEG_QUALITY", default_value_t = 85,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Largest accepted upload in MiB.
    #[arg(long, env = "BILLSPLIT_MAX_UPLOAD_MB", default_value_t = 20)]
    max_upload_mb: usize,

    /// Emit logs as JSON lines.
    #[arg(long, env = "BILLSPLIT_LOG_JSON")]
    log_json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "BILLSPLIT_VERBOSE")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let default_filter = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    if cli.log_json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }

    // ── Build config ─────────────────────────────────────────────────────
    let config = build_config(&cli)?;

    if std::env::var(&config.api_key_env).map_or(true, |k| k.trim().is_empty()) {
        tracing::warn!(
            "{} is not set; /parse-bill will fail until it is",
            config.api_key_env
        );
    }

    let vision: Arc<dyn VisionModel> = Arc::new(
        AnthropicVision::from_config(&config).context("Failed to create vision model client")?,
    );

    // ── Run server ───────────────────────────────────────────────────────
    serve(config, vision).await.context("Server failed")?;

    Ok(())
}

/// Map CLI args to `ServiceConfig`.
fn build_config(cli: &Cli) -> Result<ServiceConfig> {
    ServiceConfig::builder()
        .bind_address(&cli.bind)
        .port(cli.port)
        .allowed_origin(&cli.allowed_origin)
        .model(&cli.model)
        .max_tokens(cli.max_tokens)
        .api_base_url(&cli.api_base_url)
        .api_key_env(&cli.api_key_env)
        .api_timeout_secs(cli.api_timeout)
        .jpeg_quality(cli.jpeg_quality)
        .max_upload_bytes(cli.max_upload_mb.saturating_mul(1024 * 1024))
        .build()
        .context("Invalid configuration")
}
