use http::header::{HeaderName, HeaderValue};
use kube::Config;
use kube::config::{KubeConfigOptions, Kubeconfig};
use serde_json::json;
use tracing::info;

use crate::config::CollectorConfig;

const CUSTOM_HEADER: &str = "x-custom-header";

/// Client configuration for the hub cluster, assembled from the agent
/// environment the same way the fleet member agent bootstraps: a
/// programmatic kubeconfig with one cluster, one user and one context
/// pinned to the member's hub namespace. Credentials are referenced by
/// file path so token rotation is picked up without a restart.
pub async fn hub_config(cfg: &CollectorConfig) -> anyhow::Result<Config> {
    let mut cluster = json!({
        "server": cfg.hub_server_url,
    });
    if cfg.tls_insecure {
        cluster["insecure-skip-tls-verify"] = json!(true);
    }
    if let Some(ca) = cfg.ca_file() {
        cluster["certificate-authority"] = json!(ca);
    }

    let user = match (&cfg.identity_cert, &cfg.identity_key) {
        (Some(cert), Some(key)) => {
            info!("using certificate-based authentication for the hub");
            json!({
                "client-certificate": cert,
                "client-key": key,
            })
        }
        _ => {
            info!("using token-based authentication for the hub");
            json!({"tokenFile": cfg.hub_token_file})
        }
    };

    let kubeconfig: Kubeconfig = serde_json::from_value(json!({
        "apiVersion": "v1",
        "kind": "Config",
        "clusters": [{"name": "hub", "cluster": cluster}],
        "users": [{"name": "member", "user": user}],
        "contexts": [{
            "name": "hub",
            "context": {
                "cluster": "hub",
                "user": "member",
                "namespace": cfg.hub_namespace(),
            }
        }],
        "current-context": "hub",
    }))?;

    let mut config =
        Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await?;

    if let Some(header) = &cfg.hub_kube_header {
        config.headers.push((
            HeaderName::from_static(CUSTOM_HEADER),
            HeaderValue::from_str(header)?,
        ));
    }

    Ok(config)
}
