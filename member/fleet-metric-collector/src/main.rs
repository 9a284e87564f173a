use std::net::SocketAddr;

use envconfig::Envconfig;
use fleet_metric_collector::{
    config::CollectorConfig, controller::run_collector, hub,
    prometheus::PromClient,
};
use fleet_observability::{TracingConfig, serve_probes, setup_tracing};
use kube::Client;
use tokio::try_join;
use tracing::info;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    setup_tracing(TracingConfig {
        service_name: "fleet-metric-collector".to_string(),
        ..Default::default()
    })
    .map_err(|e| anyhow::anyhow!(e))?;

    let cfg = CollectorConfig::init_from_env()?;
    let hub_namespace = cfg.hub_namespace();
    info!(
        member = %cfg.member_cluster_name,
        namespace = %hub_namespace,
        hub = %cfg.hub_server_url,
        "starting metric collector"
    );

    let hub_config = hub::hub_config(&cfg).await?;
    let client = Client::try_from(hub_config)?;
    let prom = PromClient::new(cfg.prom_auth.auth()?)?;

    if cfg.leader.enabled {
        let lease = cfg
            .leader
            .lease_config(&hub_namespace, fleet_leader::default_identity());
        fleet_leader::acquire(&client, &lease).await?;
        let hold_client = client.clone();
        tokio::spawn(async move {
            if let Err(e) = fleet_leader::hold(hold_client, lease).await {
                tracing::error!(error = ?e, "leadership lost, exiting");
                std::process::exit(1);
            }
        });
    }

    let http_addr: SocketAddr = ([0, 0, 0, 0], cfg.http_port).into();
    let collector = tokio::spawn(run_collector(
        client.clone(),
        hub_namespace,
        prom,
        cfg.collection_interval_secs,
    ));
    let http = tokio::spawn(async move { serve_probes(http_addr).await });

    let (c_res, h_res) = try_join!(collector, http)?;
    c_res?;
    h_res?;
    Ok(())
}
