use std::sync::Arc;

use chrono::Utc;
use futures_util::StreamExt;
use kube::{
    Client,
    api::{Api, Patch, PatchParams},
    runtime::{
        Controller,
        controller::Action,
        events::{EventType, Recorder},
        watcher::Config,
    },
};
use serde_json::json;
use tokio::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use fleet_api::{
    ApprovalRequest, ApprovalTarget, ClusterApprovalRequest,
    ClusterStagedUpdateRun, ClusterStagedWorkloadTracker, Condition,
    ConditionStatus, StagedUpdateRun, StagedWorkloadTracker, WorkloadRef,
    condition::{CONDITION_APPROVED, REASON_ALL_WORKLOADS_HEALTHY},
    report::FINALIZER,
    set_condition, stage_clusters,
};

use crate::config::ApprovalConfig;

mod events;
pub mod health;
pub mod reports;


use health::StageEvaluation;

#[derive(thiserror::Error, Debug)]
pub enum ReconcileErr {
    #[error("kube api error: {0}")]
    Kube(#[from] kube::Error),
    #[error("stage {stage} not found in update run {update_run}")]
    StageNotFound { update_run: String, stage: String },
}

#[derive(Clone)]
pub struct ControllerContext {
    pub client: Client,
    pub cfg: ApprovalConfig,
    pub recorder: Recorder,
}

/// Run both approval-request controllers (cluster-scoped and namespaced)
/// until shutdown. The two watch loops share one context and converge on
/// the same reconcile logic through [`ApprovalTarget`].
pub async fn run_controller(
    client: Client,
    cfg: ApprovalConfig,
) -> anyhow::Result<()> {
    let recorder =
        Recorder::new(client.clone(), "fleet-approval-controller".into());
    let ctx = Arc::new(ControllerContext {
        client: client.clone(),
        cfg,
        recorder,
    });

    let cluster_api: Api<ClusterApprovalRequest> = Api::all(client.clone());
    let namespaced_api: Api<ApprovalRequest> = Api::all(client.clone());

    let cluster = Controller::new(cluster_api, Config::default())
        .shutdown_on_signal()
        .run(reconcile_cluster, error_policy, ctx.clone())
        .for_each(|res| async move {
            match res {
                Ok((_obj_ref, action)) => {
                    debug!("reconciled ClusterApprovalRequest: requeue={:?}", action)
                }
                Err(e) => {
                    error!(error = ?e, "ClusterApprovalRequest reconcile error")
                }
            }
        });

    let namespaced = Controller::new(namespaced_api, Config::default())
        .shutdown_on_signal()
        .run(reconcile_namespaced, error_policy, ctx.clone())
        .for_each(|res| async move {
            match res {
                Ok((_obj_ref, action)) => {
                    debug!("reconciled ApprovalRequest: requeue={:?}", action)
                }
                Err(e) => error!(error = ?e, "ApprovalRequest reconcile error"),
            }
        });

    tokio::join!(cluster, namespaced);
    Ok(())
}

async fn reconcile_cluster(
    obj: Arc<ClusterApprovalRequest>,
    ctx: Arc<ControllerContext>,
) -> Result<Action, ReconcileErr> {
    reconcile_target(ApprovalTarget::Cluster((*obj).clone()), ctx).await
}

async fn reconcile_namespaced(
    obj: Arc<ApprovalRequest>,
    ctx: Arc<ControllerContext>,
) -> Result<Action, ReconcileErr> {
    reconcile_target(ApprovalTarget::Namespaced((*obj).clone()), ctx).await
}

#[instrument(skip_all, fields(
    kind = %target.kind(),
    name = %target.name(),
    namespace = %target.namespace().unwrap_or_default()
))]
async fn reconcile_target(
    target: ApprovalTarget,
    ctx: Arc<ControllerContext>,
) -> Result<Action, ReconcileErr> {
    if target.is_deleting() {
        return cleanup(&target, &ctx).await;
    }

    // Absorbing state: once approved the engine never mutates the object
    // again (finalizer removal on deletion aside).
    if target.is_approved() {
        debug!("approval request already approved");
        return Ok(Action::await_change());
    }

    ensure_finalizer(&target, &ctx.client).await?;

    let clusters = match resolve_stage_clusters(&target, &ctx).await? {
        Some(clusters) => clusters,
        None => {
            debug!("update run or stage status not yet visible");
            return Ok(requeue(&ctx));
        }
    };
    if clusters.is_empty() {
        debug!("stage has no clusters yet");
        return Ok(requeue(&ctx));
    }

    reports::ensure_reports(
        &ctx.client,
        &ctx.cfg.prometheus_url,
        &target,
        &clusters,
    )
    .await?;

    let workloads = fetch_tracker_workloads(&target, &ctx.client).await?;
    let fetched = reports::fetch_reports(&ctx.client, &target, &clusters).await?;

    match health::evaluate_stage(workloads.as_deref(), &fetched) {
        StageEvaluation::Healthy {
            workloads,
            clusters,
        } => {
            approve(&target, &ctx, workloads, clusters).await?;
            Ok(Action::await_change())
        }
        StageEvaluation::Pending { reasons } => {
            debug!(?reasons, "stage not healthy yet");
            Ok(requeue(&ctx))
        }
        StageEvaluation::Missing { reason } => {
            debug!(%reason, "health inputs incomplete");
            Ok(requeue(&ctx))
        }
    }
}

fn requeue(ctx: &ControllerContext) -> Action {
    Action::requeue(Duration::from_secs(ctx.cfg.requeue_secs))
}

async fn ensure_finalizer(
    target: &ApprovalTarget,
    client: &Client,
) -> Result<(), ReconcileErr> {
    if target.has_finalizer(FINALIZER) {
        return Ok(());
    }
    let mut finalizers = target.finalizers();
    finalizers.push(FINALIZER.to_string());
    let patch = json!({"metadata": {"finalizers": finalizers}});
    patch_target(target, client, &patch).await?;
    debug!("added cleanup finalizer");
    Ok(())
}

async fn patch_target(
    target: &ApprovalTarget,
    client: &Client,
    patch: &serde_json::Value,
) -> Result<(), kube::Error> {
    let name = target.name();
    match target {
        ApprovalTarget::Cluster(_) => {
            let api: Api<ClusterApprovalRequest> = Api::all(client.clone());
            api.patch(&name, &PatchParams::default(), &Patch::Merge(patch))
                .await?;
        }
        ApprovalTarget::Namespaced(_) => {
            let ns = target.namespace().unwrap_or_default();
            let api: Api<ApprovalRequest> =
                Api::namespaced(client.clone(), &ns);
            api.patch(&name, &PatchParams::default(), &Patch::Merge(patch))
                .await?;
        }
    }
    Ok(())
}

async fn patch_target_status(
    target: &ApprovalTarget,
    client: &Client,
    patch: &serde_json::Value,
) -> Result<(), kube::Error> {
    let name = target.name();
    match target {
        ApprovalTarget::Cluster(_) => {
            let api: Api<ClusterApprovalRequest> = Api::all(client.clone());
            api.patch_status(&name, &PatchParams::default(), &Patch::Merge(patch))
                .await?;
        }
        ApprovalTarget::Namespaced(_) => {
            let ns = target.namespace().unwrap_or_default();
            let api: Api<ApprovalRequest> =
                Api::namespaced(client.clone(), &ns);
            api.patch_status(&name, &PatchParams::default(), &Patch::Merge(patch))
                .await?;
        }
    }
    Ok(())
}

/// Member-cluster list for the target's stage. `Ok(None)` means the
/// update run or its stage status has not become visible yet — a missing
/// precondition the caller requeues quietly at the standard cadence. A
/// stage name that does not exist in a present, populated run is an
/// operator error: it is surfaced as a reconcile error (and an event) so
/// the work queue retries with backoff while the operator corrects the
/// objects.
async fn resolve_stage_clusters(
    target: &ApprovalTarget,
    ctx: &ControllerContext,
) -> Result<Option<Vec<String>>, ReconcileErr> {
    let run = target.target_update_run();
    let stage = target.target_stage();

    let status = match target.namespace() {
        None => {
            let api: Api<ClusterStagedUpdateRun> = Api::all(ctx.client.clone());
            api.get_opt(run).await?.and_then(|r| r.status)
        }
        Some(ns) => {
            let api: Api<StagedUpdateRun> =
                Api::namespaced(ctx.client.clone(), &ns);
            api.get_opt(run).await?.and_then(|r| r.status)
        }
    };

    let Some(status) = status else {
        return Ok(None);
    };
    if status.stages_status.is_empty() {
        return Ok(None);
    }

    match stage_clusters(Some(&status), stage) {
        Some(clusters) => Ok(Some(clusters)),
        None => {
            let err = ReconcileErr::StageNotFound {
                update_run: run.to_string(),
                stage: stage.to_string(),
            };
            warn!(%err, "failed to resolve stage");
            events::emit_event(
                &ctx.recorder,
                target,
                EventType::Warning,
                "StageNotFound",
                "ResolveStage",
                Some(err.to_string()),
            )
            .await;
            Err(err)
        }
    }
}

/// Tracker identity equals the update-run identity; `None` means the
/// operator has not created it yet, which defers approval without error.
async fn fetch_tracker_workloads(
    target: &ApprovalTarget,
    client: &Client,
) -> Result<Option<Vec<WorkloadRef>>, ReconcileErr> {
    let run = target.target_update_run();
    match target.namespace() {
        None => {
            let api: Api<ClusterStagedWorkloadTracker> =
                Api::all(client.clone());
            Ok(api.get_opt(run).await?.map(|t| t.spec.workloads))
        }
        Some(ns) => {
            let api: Api<StagedWorkloadTracker> =
                Api::namespaced(client.clone(), &ns);
            Ok(api.get_opt(run).await?.map(|t| t.spec.workloads))
        }
    }
}

async fn approve(
    target: &ApprovalTarget,
    ctx: &ControllerContext,
    workloads: usize,
    clusters: usize,
) -> Result<(), ReconcileErr> {
    // The terminal check at the top of the pass is the double-fire guard;
    // a concurrent writer surfaces as a patch conflict and re-queues.
    let message = format!(
        "All {workloads} workloads are healthy across {clusters} clusters"
    );
    let mut conditions = target.conditions().to_vec();
    set_condition(
        &mut conditions,
        Condition {
            type_: CONDITION_APPROVED.into(),
            status: ConditionStatus::True,
            observed_generation: target.generation(),
            reason: Some(REASON_ALL_WORKLOADS_HEALTHY.into()),
            message: Some(message.clone()),
            last_transition_time: Some(Utc::now().to_rfc3339()),
        },
    );
    let patch = json!({"status": {"conditions": conditions}});
    patch_target_status(target, &ctx.client, &patch).await?;
    info!(workloads, clusters, "approved stage");

    events::emit_event(
        &ctx.recorder,
        target,
        EventType::Normal,
        "Approved",
        "Approve",
        Some(format!("{message} in stage {}", target.target_stage())),
    )
    .await;
    Ok(())
}

/// Finalizer-driven cleanup: delete every provisioned report, then release
/// the finalizer. Owner references cannot cross namespaces, so this is the
/// only path that garbage-collects the per-cluster reports.
async fn cleanup(
    target: &ApprovalTarget,
    ctx: &ControllerContext,
) -> Result<Action, ReconcileErr> {
    if !target.has_finalizer(FINALIZER) {
        return Ok(Action::await_change());
    }

    let clusters = clusters_for_cleanup(target, &ctx.client).await;
    reports::purge_reports(
        &ctx.client,
        target.target_update_run(),
        target.target_stage(),
        &clusters,
    )
    .await?;

    let finalizers: Vec<String> = target
        .finalizers()
        .into_iter()
        .filter(|f| f != FINALIZER)
        .collect();
    let patch = json!({"metadata": {"finalizers": finalizers}});
    patch_target(target, &ctx.client, &patch).await?;
    info!(clusters = clusters.len(), "cleaned up metric reports");
    Ok(Action::await_change())
}

/// Deletion-safe discovery: a vanished update run or stage must not wedge
/// the approval request, so any miss resolves to an empty cluster list and
/// the finalizer still comes off.
async fn clusters_for_cleanup(
    target: &ApprovalTarget,
    client: &Client,
) -> Vec<String> {
    let run = target.target_update_run();
    let stage = target.target_stage();
    let status = match target.namespace() {
        None => {
            let api: Api<ClusterStagedUpdateRun> = Api::all(client.clone());
            api.get_opt(run).await.ok().flatten().and_then(|r| r.status)
        }
        Some(ns) => {
            let api: Api<StagedUpdateRun> =
                Api::namespaced(client.clone(), &ns);
            api.get_opt(run).await.ok().flatten().and_then(|r| r.status)
        }
    };
    stage_clusters(status.as_ref(), stage).unwrap_or_default()
}

fn error_policy<K>(
    _obj: Arc<K>,
    _error: &ReconcileErr,
    _ctx: Arc<ControllerContext>,
) -> Action {
    Action::requeue(Duration::from_secs(60))
}
