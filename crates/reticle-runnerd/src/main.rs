mod cli;
mod metrics;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use reticle_api::{HttpApi, ProvisionerAdapter};
use reticle_core::{ClusterConnector, Provisioner, ResourceBuilder, SharedCluster};
use reticle_kube::{KubeConnector, KubeGateway};
use reticle_observe::{LoggerTimeZone, init_local_offset, init_logger};
use reticle_prometheus::PrometheusMetrics;

use crate::cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // local offset must be read before the runtime spawns threads
    if cli.log_tz == LoggerTimeZone::Local {
        init_local_offset();
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?
        .block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // 1) logger
    init_logger(&cli.logger_config()?)?;

    // 2) workload config, fixed for the process lifetime
    let config = Arc::new(cli.workload_config());
    config.validate().context("invalid workload configuration")?;
    if config.assessor_image.is_empty() {
        warn!("no assessor image configured, jobs will be rejected by the cluster");
    }

    // 3) cluster access
    let connector: Arc<dyn ClusterConnector> = if cli.lazy_connect {
        info!("connecting to the cluster per submission");
        Arc::new(KubeConnector::new(config.namespace.as_str()))
    } else {
        let gateway = KubeGateway::connect(config.namespace.as_str())
            .await
            .context("failed to connect to the cluster")?;
        Arc::new(SharedCluster::new(Arc::new(gateway)))
    };

    // 4) provisioner + metrics
    let metrics = Arc::new(PrometheusMetrics::new().context("failed to register metrics")?);
    let provisioner = Provisioner::new(ResourceBuilder::new(Arc::clone(&config)), connector)
        .with_cleanup(cli.cleanup)
        .with_metrics(metrics.clone());

    let mut adapter = ProvisionerAdapter::new(Arc::new(provisioner));
    if let Some(timeout) = cli.submit_timeout() {
        adapter = adapter.with_timeout(timeout);
    }

    // 5) http
    let app = HttpApi::new(Arc::new(adapter))
        .router()
        .merge(metrics::router(metrics));

    let listener = TcpListener::bind(cli.listen)
        .await
        .with_context(|| format!("failed to bind {}", cli.listen))?;
    info!(addr = %cli.listen, namespace = %config.namespace, cleanup = %cli.cleanup, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
