use std::net::SocketAddr;

use envconfig::Envconfig;
use fleet_approval_controller::{
    config::ApprovalConfig, controller::run_controller, startup,
};
use fleet_observability::{TracingConfig, serve_probes, setup_tracing};
use kube::Client;
use tokio::try_join;
use tracing::info;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    setup_tracing(TracingConfig {
        service_name: "fleet-approval-controller".to_string(),
        ..Default::default()
    })
    .map_err(|e| anyhow::anyhow!(e))?;

    let cfg = ApprovalConfig::init_from_env()?;
    info!(?cfg, "starting approval controller");

    let client = Client::try_default().await?;
    startup::check_required_apis(&client).await?;

    if cfg.leader.enabled {
        let lease = cfg.leader.lease_config(fleet_leader::default_identity());
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
    let controller_client = client.clone();
    let controller =
        tokio::spawn(
            async move { run_controller(controller_client, cfg).await },
        );
    let http = tokio::spawn(async move { serve_probes(http_addr).await });

    let (c_res, h_res) = try_join!(controller, http)?;
    c_res?;
    h_res?;
    Ok(())
}
