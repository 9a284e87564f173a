//! Lease-based single-leader election.
//!
//! Both controllers run one active instance per cluster; standbys block in
//! [`acquire`] until the coordination/v1 Lease is free or expired, and the
//! active instance renews it from [`hold`]. Conflicting writers are
//! resolved by the API server's resource-version check: a losing replace
//! returns 409 and the contender goes back to waiting.

use chrono::{DateTime, Utc};
use k8s_openapi::api::coordination::v1::{Lease, LeaseSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::MicroTime;
use kube::Client;
use kube::api::{Api, PostParams};
use kube::core::ObjectMeta;
use tokio::time::Duration;
use tracing::{debug, info, warn};

#[derive(Clone, Debug)]
pub struct LeaseConfig {
    pub namespace: String,
    pub name: String,
    /// Unique per-process holder identity.
    pub identity: String,
    pub lease_duration_secs: i64,
    pub renew_interval_secs: u64,
}

/// Holder identity for this process: pod name (HOSTNAME) plus pid.
pub fn default_identity() -> String {
    let host =
        std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string());
    format!("{}-{}", host, std::process::id())
}

/// Block until this process holds the lease.
pub async fn acquire(client: &Client, cfg: &LeaseConfig) -> anyhow::Result<()> {
    let api: Api<Lease> = Api::namespaced(client.clone(), &cfg.namespace);
    info!(lease = %cfg.name, namespace = %cfg.namespace, identity = %cfg.identity,
        "waiting for leadership");
    loop {
        let now = Utc::now();
        match api.get_opt(&cfg.name).await? {
            None => {
                let lease = Lease {
                    metadata: ObjectMeta {
                        name: Some(cfg.name.clone()),
                        ..Default::default()
                    },
                    spec: Some(claim(cfg, None, now)),
                };
                match api.create(&PostParams::default(), &lease).await {
                    Ok(_) => {
                        info!(lease = %cfg.name, "acquired leadership");
                        return Ok(());
                    }
                    // Lost the creation race; go back to waiting.
                    Err(kube::Error::Api(ae)) if ae.code == 409 => {}
                    Err(e) => return Err(e.into()),
                }
            }
            Some(existing) => {
                let spec = existing.spec.clone().unwrap_or_default();
                if held_by(&spec, &cfg.identity) || is_expired(&spec, now) {
                    let mut updated = existing;
                    updated.spec = Some(claim(cfg, Some(&spec), now));
                    match api
                        .replace(&cfg.name, &PostParams::default(), &updated)
                        .await
                    {
                        Ok(_) => {
                            info!(lease = %cfg.name, "acquired leadership");
                            return Ok(());
                        }
                        Err(kube::Error::Api(ae)) if ae.code == 409 => {}
                        Err(e) => return Err(e.into()),
                    }
                } else {
                    debug!(
                        lease = %cfg.name,
                        holder = ?spec.holder_identity,
                        "lease held elsewhere"
                    );
                }
            }
        }
        tokio::time::sleep(Duration::from_secs(cfg.renew_interval_secs)).await;
    }
}

/// Renew the lease until it is lost; returns an error when leadership is
/// gone so the caller can terminate and let a standby take over.
pub async fn hold(client: Client, cfg: LeaseConfig) -> anyhow::Result<()> {
    let api: Api<Lease> = Api::namespaced(client, &cfg.namespace);
    loop {
        tokio::time::sleep(Duration::from_secs(cfg.renew_interval_secs)).await;
        let existing = api.get(&cfg.name).await?;
        let mut spec = existing.spec.clone().unwrap_or_default();
        if !held_by(&spec, &cfg.identity) {
            warn!(lease = %cfg.name, holder = ?spec.holder_identity, "lease lost");
            anyhow::bail!(
                "leadership lost on lease {}/{}",
                cfg.namespace,
                cfg.name
            );
        }
        spec.renew_time = Some(MicroTime(Utc::now()));
        let mut updated = existing;
        updated.spec = Some(spec);
        api.replace(&cfg.name, &PostParams::default(), &updated).await?;
    }
}

fn held_by(spec: &LeaseSpec, identity: &str) -> bool {
    spec.holder_identity.as_deref() == Some(identity)
}

fn is_expired(spec: &LeaseSpec, now: DateTime<Utc>) -> bool {
    if spec.holder_identity.is_none() {
        return true;
    }
    let last = match spec.renew_time.as_ref().or(spec.acquire_time.as_ref()) {
        Some(t) => t.0,
        None => return true,
    };
    let duration = i64::from(spec.lease_duration_seconds.unwrap_or(0));
    last + chrono::Duration::seconds(duration) < now
}

fn claim(
    cfg: &LeaseConfig,
    previous: Option<&LeaseSpec>,
    now: DateTime<Utc>,
) -> LeaseSpec {
    let taking_over = previous
        .map(|p| p.holder_identity.as_deref() != Some(cfg.identity.as_str()))
        .unwrap_or(true);
    let transitions = previous.and_then(|p| p.lease_transitions).unwrap_or(0);
    LeaseSpec {
        holder_identity: Some(cfg.identity.clone()),
        lease_duration_seconds: Some(cfg.lease_duration_secs as i32),
        acquire_time: if taking_over {
            Some(MicroTime(now))
        } else {
            previous.and_then(|p| p.acquire_time.clone())
        },
        renew_time: Some(MicroTime(now)),
        lease_transitions: Some(if taking_over {
            transitions + 1
        } else {
            transitions
        }),
        ..Default::default()
    }
}
