use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use cronlink_core::{ConnectorConfig, FunctionInvoker};
use cronlink_gateway::{build_http_client, resolve_credentials, GatewayClient, GatewayInvoker};
use cronlink_scheduler::SchedulerAdapter;
use tracing::info;

mod reconcile;
mod responses;

use reconcile::Reconciler;
use responses::ResponseLog;

/// Invoke gateway functions on the cron schedules in their annotations.
#[derive(Debug, Parser)]
#[command(name = "cronlink-connector", version)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(short, long, env = "CRONLINK_CONFIG")]
    config: Option<String>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "cronlink_connector=debug,cronlink_scheduler=debug,cronlink_gateway=debug"
    } else {
        "cronlink_connector=info,cronlink_scheduler=info,cronlink_gateway=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let config = ConnectorConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let gateway_url = config.gateway_url().to_string();
    let settings = &config.connector;

    let credentials = resolve_credentials(&config.gateway).context("resolving gateway credentials")?;
    let http = build_http_client(config.gateway.upstream_timeout())
        .context("building HTTP client")?;

    // Invoker -> result consumer
    let (results_tx, results_rx) = tokio::sync::mpsc::unbounded_channel();
    tokio::spawn(responses::drain(
        results_rx,
        ResponseLog {
            print_response: settings.print_response,
            print_body: settings.print_response_body,
        },
    ));

    let invoker: Arc<dyn FunctionInvoker> = Arc::new(
        GatewayInvoker::new(http.clone(), gateway_url.clone(), results_tx)
            .with_async_by_default(settings.async_invocation)
            .with_content_type(settings.content_type.clone())
            .with_credentials(credentials.clone()),
    );
    let scheduler = SchedulerAdapter::new(invoker);
    scheduler.start();

    let registry = GatewayClient::new(http, gateway_url.clone(), credentials);
    let reconciler = Reconciler::new(
        registry,
        scheduler,
        settings.topic.clone(),
        settings.listing_timeout(),
    );

    info!(
        gateway = %gateway_url,
        topic = %settings.topic,
        async_invocation = settings.async_invocation,
        "cronlink connector starting"
    );

    tokio::select! {
        _ = reconciler.run(settings.rebuild_interval()) => {}
        res = tokio::signal::ctrl_c() => {
            res.context("waiting for ctrl-c")?;
            info!("interrupt received, shutting down");
        }
    }
    Ok(())
}
