use anyhow::{Context as _, Result};
use clap::Parser;
use std::sync::Arc;
use taskd::{
    config::ServiceConfig, rest, storage::PgTaskStore, tasks::TaskService, AppContext,
};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "taskd",
    about = "HTTP CRUD service for named tasks",
    version
)]
struct Args {
    /// HTTP server port
    #[arg(long, short = 'p', env = "TASKD_PORT")]
    port: Option<u16>,

    /// Bind address for the HTTP server (default: 127.0.0.1; use 0.0.0.0 for LAN access)
    #[arg(long, env = "TASKD_BIND")]
    bind_address: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "TASKD_LOG")]
    log: Option<String>,

    /// Log output format: compact | json
    #[arg(long, env = "TASKD_LOG_FORMAT")]
    log_format: Option<String>,

    /// Write logs to this file path (rotated daily). Optional.
    #[arg(long, env = "TASKD_LOG_FILE")]
    log_file: Option<std::path::PathBuf>,

    /// Path to the TOML config file
    #[arg(long, env = "TASKD_CONFIG", default_value = "taskd.toml")]
    config: std::path::PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // ── Logging setup ────────────────────────────────────────────────────────
    // Init once, before any tracing calls.
    let log_level = args.log.as_deref().unwrap_or("info").to_owned();
    let log_format = args.log_format.as_deref().unwrap_or("compact").to_owned();
    let _file_guard = setup_logging(&log_level, args.log_file.as_deref(), &log_format);

    install_panic_hook();

    run_server(args).await
}

/// Initialize the tracing subscriber.
/// If `log_file` is set, logs go to both stdout and a daily-rolling file.
/// Returns a `WorkerGuard` that must stay alive for the process lifetime.
///
/// `log_format` may be `"compact"` (default, human-readable) or `"json"`
/// (structured JSON for log aggregators).
///
/// If the log directory cannot be created, falls back to stdout-only logging
/// with a warning, never a panic.
fn setup_logging(
    log_level: &str,
    log_file: Option<&std::path::Path>,
    log_format: &str,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let use_json = log_format == "json";

    if let Some(path) = log_file {
        let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
        let filename = path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("taskd.log"));

        // Ensure the directory exists before tracing-appender tries to open it.
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!(
                "warn: could not create log directory '{}': {e}, falling back to stdout",
                dir.display()
            );
            if use_json {
                tracing_subscriber::fmt().json().with_env_filter(log_level).init();
            } else {
                tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
            }
            return None;
        }

        let appender = tracing_appender::rolling::daily(dir, filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);

        if use_json {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().json())
                .with(fmt::layer().json().with_writer(non_blocking))
                .init();
        } else {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().compact())
                .with(fmt::layer().with_writer(non_blocking))
                .init();
        }

        Some(guard)
    } else if use_json {
        tracing_subscriber::fmt().json().with_env_filter(log_level).init();
        None
    } else {
        tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
        None
    }
}

/// Install a panic hook that records the panic through tracing before the
/// default hook prints to stderr, so crashes land in the log file too.
fn install_panic_hook() {
    let original = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| info.payload().downcast_ref::<String>().map(|s| s.as_str()))
            .unwrap_or("unknown panic");

        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown location".to_string());

        tracing::error!(%location, "panic: {msg}");

        original(info);
    }));
}

async fn run_server(args: Args) -> Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "taskd starting");

    let config = Arc::new(ServiceConfig::new(
        args.port,
        args.bind_address,
        args.log,
        args.log_format,
        &args.config,
    ));
    info!(
        port = config.port,
        bind = %config.bind_address,
        db_host = %config.database.host,
        db_name = %config.database.database,
        "config loaded"
    );

    let store = PgTaskStore::connect_with_slow_query(
        &config.database,
        config.observability.slow_query_threshold_ms,
    )
    .await
    .context("database connection failed")?;
    info!("database connected");

    let ctx = Arc::new(AppContext {
        config: config.clone(),
        tasks: TaskService::new(Arc::new(store.clone())),
        started_at: std::time::Instant::now(),
    });

    rest::serve(ctx).await?;

    // serve() only returns after the shutdown signal; drain the pool so
    // in-flight statements finish before the process exits.
    store.close().await;
    info!("database disconnected, bye");
    Ok(())
}
