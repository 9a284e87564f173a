use std::sync::Arc;

use chrono::Utc;
use futures_util::StreamExt;
use kube::{
    Client, ResourceExt,
    api::{Api, Patch, PatchParams},
    runtime::{Controller, controller::Action, watcher::Config},
};
use serde_json::json;
use tokio::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use fleet_api::{
    Condition, ConditionStatus, MetricReport,
    condition::{
        CONDITION_METRICS_COLLECTED, REASON_COLLECTION_FAILED,
        REASON_COLLECTION_SUCCEEDED,
    },
    find_condition, set_condition,
};

use crate::prometheus::PromClient;

#[derive(thiserror::Error, Debug)]
pub enum ReconcileErr {
    #[error("kube api error: {0}")]
    Kube(#[from] kube::Error),
}

#[derive(Clone)]
pub struct CollectorContext {
    pub client: Client,
    pub prom: PromClient,
    pub interval: Duration,
}

/// Run the collection loop over this member's hub namespace until
/// shutdown. The namespace-scoped `Api` is the correctness boundary:
/// reports for other clusters are invisible here by construction.
pub async fn run_collector(
    client: Client,
    hub_namespace: String,
    prom: PromClient,
    interval_secs: u64,
) -> anyhow::Result<()> {
    let api: Api<MetricReport> =
        Api::namespaced(client.clone(), &hub_namespace);
    let ctx = Arc::new(CollectorContext {
        client,
        prom,
        interval: Duration::from_secs(interval_secs),
    });
    info!(namespace = %hub_namespace, "starting metric collector");

    Controller::new(api, Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((_obj_ref, action)) => {
                    debug!("reconciled MetricReport: requeue={:?}", action)
                }
                Err(e) => error!(error = ?e, "MetricReport reconcile error"),
            }
        })
        .await;

    Ok(())
}

/// One collection tick: query the member-local Prometheus at the URL the
/// report spec names, then persist the outcome. The timer is the
/// authoritative trigger; watch events only pull the tick forward.
#[instrument(skip_all, fields(
    name = %report.name_any(),
    namespace = %report.namespace().unwrap_or_default()
))]
async fn reconcile(
    report: Arc<MetricReport>,
    ctx: Arc<CollectorContext>,
) -> Result<Action, ReconcileErr> {
    // Lifecycle belongs to the hub-side provisioner.
    if report.metadata.deletion_timestamp.is_some() {
        return Ok(Action::await_change());
    }

    // Our own status patch fires a watch event right back at us. The
    // interval is the authoritative cadence, so a reconcile that lands
    // while the last collection is still fresh only re-arms the timer.
    // A generation change (new spec) always collects immediately.
    if let Some(remaining) = fresh_backoff(&report, ctx.interval, Utc::now()) {
        debug!(?remaining, "last collection still fresh");
        return Ok(Action::requeue(remaining));
    }

    let name = report.name_any();
    let ns = report.namespace().unwrap_or_default();
    let api: Api<MetricReport> = Api::namespaced(ctx.client.clone(), &ns);

    let now = Utc::now().to_rfc3339();
    let mut conditions = report
        .status
        .as_ref()
        .map(|s| s.conditions.clone())
        .unwrap_or_default();

    let status = match ctx
        .prom
        .query_workload_health(&report.spec.prometheus_url)
        .await
    {
        Ok(samples) => {
            let monitored = samples.len();
            debug!(samples = monitored, "collected workload health");
            set_condition(
                &mut conditions,
                Condition {
                    type_: CONDITION_METRICS_COLLECTED.into(),
                    status: ConditionStatus::True,
                    observed_generation: report.metadata.generation,
                    reason: Some(REASON_COLLECTION_SUCCEEDED.into()),
                    message: Some(format!(
                        "Successfully collected metrics from {monitored} workload samples"
                    )),
                    last_transition_time: Some(now.clone()),
                },
            );
            json!({
                "conditions": conditions,
                "collectedMetrics": samples,
                "workloadsMonitored": monitored as i32,
                "lastCollectionTime": now,
            })
        }
        Err(e) => {
            // Stale samples stay visible: a transient metrics outage must
            // not cascade into revoking a healthy observation.
            warn!(error = %e, "metric collection failed");
            set_condition(
                &mut conditions,
                Condition {
                    type_: CONDITION_METRICS_COLLECTED.into(),
                    status: ConditionStatus::False,
                    observed_generation: report.metadata.generation,
                    reason: Some(REASON_COLLECTION_FAILED.into()),
                    message: Some(format!("Failed to collect metrics: {e}")),
                    last_transition_time: Some(now.clone()),
                },
            );
            json!({
                "conditions": conditions,
                "lastCollectionTime": now,
            })
        }
    };

    api.patch_status(
        &name,
        &PatchParams::default(),
        &Patch::Merge(&json!({"status": status})),
    )
    .await?;

    Ok(Action::requeue(ctx.interval))
}

/// Time left until the next collection is due, or `None` when a
/// collection should run now. Pure so the debounce rule is testable.
fn fresh_backoff(
    report: &MetricReport,
    interval: Duration,
    now: chrono::DateTime<chrono::Utc>,
) -> Option<Duration> {
    let status = report.status.as_ref()?;
    let cond = find_condition(&status.conditions, CONDITION_METRICS_COLLECTED)?;
    if cond.observed_generation != report.metadata.generation {
        return None;
    }
    let last = status.last_collection_time.as_deref()?;
    let last = chrono::DateTime::parse_from_rfc3339(last)
        .ok()?
        .with_timezone(&chrono::Utc);
    let interval = chrono::Duration::from_std(interval).ok()?;
    let elapsed = now.signed_duration_since(last);
    if elapsed >= chrono::Duration::zero() && elapsed < interval {
        (interval - elapsed).to_std().ok()
    } else {
        None
    }
}

fn error_policy(
    _obj: Arc<MetricReport>,
    _error: &ReconcileErr,
    _ctx: Arc<CollectorContext>,
) -> Action {
    Action::requeue(Duration::from_secs(60))
}
