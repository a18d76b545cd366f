//! bitblt - signed image resizing for HTML pages.
//!
//! This binary serves a directory through the bitblt middleware and offers
//! helpers to sign directives and rewrite HTML files offline.

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use axum::Router;
use clap::Parser;
use tower_http::services::ServeDir;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bitblt::{
    config::{Cli, Command, RewriteConfig, ServeConfig, SignConfig, SignOutputFormat},
    create_router, Directive, DiskCache, MemoryCache, RouterConfig, Signer, TagRewriter,
    TransformCache,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Sign(config) => run_sign(config),
        Command::Rewrite(config) => run_rewrite(config),
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let mut bitblt_config = config.bitblt_config();

    info!("Configuration:");
    info!("  Root: {}", config.root.display());
    info!("  Quality: {}", bitblt_config.quality);
    info!("  Filter: {}", bitblt_config.filter);
    info!("  XHTML: {}", bitblt_config.xhtml);
    if bitblt_config.limit_to_application_url {
        match &bitblt_config.app_url {
            Some(app_url) => info!("  Rewriting limited to: {}", app_url),
            None => info!("  Rewriting limited to: request host"),
        }
    }

    if let Some(cache) = build_cache(&config) {
        bitblt_config = bitblt_config.with_cache(cache);
    } else {
        info!("  Cache: disabled");
    }

    let origin = Router::new().fallback_service(ServeDir::new(&config.root));
    let router_config = RouterConfig::new(bitblt_config).with_tracing(!config.no_tracing);

    let router = match create_router(origin, router_config) {
        Ok(router) => router,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let addr = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("Server listening on: http://{}", addr);

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Build the transform cache selected on the command line.
fn build_cache(config: &ServeConfig) -> Option<Arc<dyn TransformCache>> {
    if let Some(dir) = &config.cache_dir {
        info!("  Cache: disk at {}", dir.display());
        return Some(Arc::new(DiskCache::new(dir)));
    }
    config.cache_memory.map(|capacity| {
        info!("  Cache: memory, {}MB", capacity / (1024 * 1024));
        Arc::new(MemoryCache::with_capacity(capacity)) as Arc<dyn TransformCache>
    })
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "bitblt=debug,tower_http=debug"
    } else {
        "bitblt=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

// =============================================================================
// Sign Command
// =============================================================================

fn run_sign(config: SignConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let signer = Signer::new(config.secret.as_deref().unwrap_or_default());
    let directive = Directive::new(&signer, config.width, config.height);

    match config.format {
        SignOutputFormat::Segment => {
            println!("{}", directive.segment());
        }
        SignOutputFormat::Json => {
            let json = serde_json::json!({
                "width": directive.width,
                "height": directive.height,
                "signature": directive.signature,
                "segment": directive.segment(),
            });
            match serde_json::to_string_pretty(&json) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Rewrite Command
// =============================================================================

fn run_rewrite(config: RewriteConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let body = match std::fs::read(&config.input) {
        Ok(body) => body,
        Err(e) => {
            eprintln!("Error: failed to read {}: {}", config.input.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let signer = Signer::new(config.secret.as_deref().unwrap_or_default());
    let rewriter = TagRewriter::new(signer).with_xhtml(config.xhtml);
    let rewritten = rewriter.rewrite(&body, config.app_url.as_deref());

    let mut stdout = std::io::stdout().lock();
    if let Err(e) = stdout.write_all(&rewritten.body).and_then(|_| stdout.flush()) {
        eprintln!("Error: failed to write output: {}", e);
        return ExitCode::FAILURE;
    }

    eprintln!("Rewrote {} image tag(s)", rewritten.rewritten);
    ExitCode::SUCCESS
}
