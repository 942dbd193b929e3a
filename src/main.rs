//! PenguinBlur - upload, blur and download video clips.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use penguinblur::{
    config::{CheckConfig, CleanupConfig, Cli, Command, LogFormat, ServeConfig},
    server::{create_router, RouterConfig},
    spawn_sweeper,
    storage::{write_atomic, StoragePaths},
    video::{PassthroughTransform, VideoService, RETENTION_WINDOW},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Cleanup(config) => run_cleanup(config).await,
        Command::Check(config) => run_check(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose, config.log_format);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    print_banner();

    let paths = config.storage.paths();
    info!("Configuration:");
    info!("  Environment: {}", config.environment);
    info!("  Upload dir: {}", paths.upload_dir().display());
    info!("  Temp dir: {}", paths.temp_dir().display());
    info!("  Static dir: {}", paths.static_dir().display());
    info!("  Max upload size: {} MB", config.max_upload_size / (1024 * 1024));
    info!("  Retention: {} minutes", RETENTION_WINDOW.as_secs() / 60);
    match config.sweep_interval() {
        Some(period) => info!("  Background cleanup: every {}s", period.as_secs()),
        None => info!("  Background cleanup: off (DELETE /api/cleanup to reap)"),
    }

    if let Err(e) = paths.ensure_dirs().await {
        error!("Failed to create storage directories: {}", e);
        return ExitCode::FAILURE;
    }

    let service = Arc::new(VideoService::new(paths, PassthroughTransform));
    let sweeper = config
        .sweep_interval()
        .map(|period| spawn_sweeper(Arc::clone(&service), period));

    let router = create_router(service, build_router_config(&config));

    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!("    curl -F 'file=@clip.mp4;type=video/mp4' http://{}/api/upload", addr);
    info!(
        "    curl -X POST 'http://{}/api/video/process?filename=clip.mp4'",
        addr
    );
    info!("    curl http://{}/api/video/list", addr);
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    let result = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if let Some(handle) = sweeper {
        handle.abort();
    }

    if let Err(e) = result {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("PenguinBlur server shut down");
    ExitCode::SUCCESS
}

/// Print the startup banner.
fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    info!("");
    info!("   (o_   ██████╗ ███████╗███╗   ██╗ ██████╗ ██╗   ██╗██╗███╗   ██╗");
    info!("   //\\   ██╔══██╗██╔════╝████╗  ██║██╔════╝ ██║   ██║██║████╗  ██║");
    info!("   V_/_  ██████╔╝█████╗  ██╔██╗ ██║██║  ███╗██║   ██║██║██╔██╗ ██║");
    info!("         ██╔═══╝ ██╔══╝  ██║╚██╗██║██║   ██║██║   ██║██║██║╚██╗██║");
    info!("         ██║     ███████╗██║ ╚████║╚██████╔╝╚██████╔╝██║██║ ╚████║");
    info!("         ╚═╝     ╚══════╝╚═╝  ╚═══╝ ╚═════╝  ╚═════╝ ╚═╝╚═╝  ╚═══╝");
    info!("                                                          blur v{}", version);
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool, format: LogFormat) {
    let env_filter = if verbose {
        "penguinblur=debug,tower_http=debug"
    } else {
        "penguinblur=info,tower_http=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| env_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new(config.port)
        .with_max_upload_size(config.max_upload_size)
        .with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}

/// Resolve on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}

// =============================================================================
// Cleanup Command
// =============================================================================

async fn run_cleanup(config: CleanupConfig) -> ExitCode {
    init_logging(config.verbose, LogFormat::Text);

    if let Err(e) = config.storage.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let service = VideoService::new(config.storage.paths(), PassthroughTransform);
    match service.cleanup().await {
        Ok(report) => {
            println!("Deleted {} file(s)", report.deleted);
            if report.failed > 0 {
                println!("Failed to delete {} file(s)", report.failed);
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Cleanup failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Check Command
// =============================================================================

async fn run_check(config: CheckConfig) -> ExitCode {
    if config.verbose {
        init_logging(true, LogFormat::Text);
    }

    println!("PenguinBlur Configuration Check");
    println!("═══════════════════════════════");
    println!();

    if let Err(e) = config.storage.validate() {
        println!("✗ Configuration: {}", e);
        return ExitCode::FAILURE;
    }

    let paths = config.storage.paths();
    let mut ok = true;

    for (label, dir) in [
        ("Upload dir", paths.upload_dir()),
        ("Temp dir", paths.temp_dir()),
    ] {
        match check_writable(dir).await {
            Ok(()) => println!("✓ {}: {}", label, dir.display()),
            Err(e) => {
                println!("✗ {}: {} ({})", label, dir.display(), e);
                ok = false;
            }
        }
    }

    if paths.static_dir().join("index.html").is_file() {
        println!("✓ Frontend: {}", paths.static_dir().display());
    } else {
        println!(
            "! Frontend: no index.html in {} (GET / will return 404)",
            paths.static_dir().display()
        );
    }

    if ok {
        print_temp_summary(paths).await;
    }

    println!();
    println!("═══════════════════════════════");
    if ok {
        println!("✓ All checks passed!");
        ExitCode::SUCCESS
    } else {
        println!("✗ Some checks failed");
        ExitCode::FAILURE
    }
}

/// Write and remove a probe file in `dir`.
async fn check_writable(dir: &std::path::Path) -> Result<(), String> {
    if !dir.is_dir() {
        return Err("does not exist".to_string());
    }
    let probe = dir.join("penguinblur-check.probe");
    write_atomic(&probe, b"ok").await.map_err(|e| e.to_string())?;
    tokio::fs::remove_file(&probe)
        .await
        .map_err(|e| e.to_string())
}

async fn print_temp_summary(paths: StoragePaths) {
    let service = VideoService::new(paths, PassthroughTransform);
    match service.list_processed().await {
        Ok(files) => {
            let total: u64 = files.iter().map(|f| f.size).sum();
            println!();
            println!(
                "Processed files: {} ({:.2} MB)",
                files.len(),
                total as f64 / (1024.0 * 1024.0)
            );
        }
        Err(e) => println!("  Error listing processed files: {}", e),
    }
}
