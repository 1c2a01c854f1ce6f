use std::error::Error;
use std::sync::Arc;

use clap::Parser;
mod cli;
use tokenrelay_core::Core;
use tokenrelay_provider_core::EnvTokenSource;
use tokenrelay_provider_impl::HuggingFaceProvider;
use tracing::{info, warn};

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    // A missing .env is the normal case in deployment.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.log_json);
    if let Err(err) = run(cli).await {
        eprintln!("tokenrelay failed: {err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error + Send + Sync>> {
    cli.validate()?;

    let provider_config = cli.provider_config();
    let provider = HuggingFaceProvider::new(provider_config.clone())?;
    let tokens = EnvTokenSource::new(cli.tokens_var.trim());
    info!(
        upstream_url = %provider_config.url,
        timeout_secs = provider_config.timeout.as_secs(),
        max_new_tokens = provider_config.parameters.max_new_tokens,
        proxy = %provider_config.proxy.as_deref().unwrap_or(""),
        tokens_var = %tokens.var(),
        "config loaded"
    );
    if std::env::var_os(tokens.var()).is_none() {
        warn!(tokens_var = %tokens.var(), "token variable not set; requests will fail until it is");
    }

    let core = Core::new(Arc::new(provider), Arc::new(tokens), cli.core_config());
    let app = core.router();

    let bind = cli.bind();
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!(addr = %bind, route = %core.route(), "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("shutdown complete");

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(
            "tokenrelay=info,tokenrelay_core=info,tokenrelay_provider_core=info,tokenrelay_provider_impl=info,tower_http=info",
        )
    });
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
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
    info!("shutdown signal received");
}
