use std::collections::BTreeMap;

use kube::{
    Client,
    api::{Api, DeleteParams, Patch, PatchParams},
};
use tracing::debug;

use fleet_api::{
    ApprovalTarget, MetricReport, MetricReportSpec, member_namespace,
    report::{
        LABEL_APPROVAL_REQUEST, LABEL_CLUSTER, LABEL_STAGE, LABEL_UPDATE_RUN,
    },
    report_name,
};

use super::ReconcileErr;

const FIELD_MANAGER: &str = "fleet-approval-controller";

fn report_labels(
    target: &ApprovalTarget,
    cluster: &str,
) -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_APPROVAL_REQUEST.to_string(), target.name()),
        (
            LABEL_UPDATE_RUN.to_string(),
            target.target_update_run().to_string(),
        ),
        (LABEL_STAGE.to_string(), target.target_stage().to_string()),
        (LABEL_CLUSTER.to_string(), cluster.to_string()),
    ])
}

/// Idempotent provisioning: one report per target cluster, converged via
/// server-side apply so this controller owns spec and labels while the
/// member-side collector stays the sole writer of status. No owner
/// reference is set: references cannot cross namespaces, cleanup is
/// finalizer-driven instead.
///
/// A per-cluster failure aborts the loop; already-created reports remain
/// and the next reconcile fills the gap.
pub async fn ensure_reports(
    client: &Client,
    prometheus_url: &str,
    target: &ApprovalTarget,
    clusters: &[String],
) -> Result<(), ReconcileErr> {
    let name = report_name(target.target_update_run(), target.target_stage());
    for cluster in clusters {
        let ns = member_namespace(cluster);
        let api: Api<MetricReport> = Api::namespaced(client.clone(), &ns);
        let mut report = MetricReport::new(
            &name,
            MetricReportSpec {
                prometheus_url: prometheus_url.to_string(),
            },
        );
        report.metadata.labels = Some(report_labels(target, cluster));
        api.patch(
            &name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(&report),
        )
        .await?;
        debug!(%name, namespace = %ns, %cluster, "ensured metric report");
    }
    Ok(())
}

/// Delete the report in every cluster namespace. NotFound is success;
/// any other failure keeps the caller's finalizer in place.
pub async fn purge_reports(
    client: &Client,
    update_run: &str,
    stage: &str,
    clusters: &[String],
) -> Result<(), ReconcileErr> {
    let name = report_name(update_run, stage);
    for cluster in clusters {
        let ns = member_namespace(cluster);
        let api: Api<MetricReport> = Api::namespaced(client.clone(), &ns);
        match api.delete(&name, &DeleteParams::default()).await {
            Ok(_) => debug!(%name, namespace = %ns, "deleted metric report"),
            Err(kube::Error::Api(ae)) if ae.code == 404 => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Fetch the stage's reports in cluster order. Absent reports map to
/// `None` and count as unhealthy during evaluation.
pub async fn fetch_reports(
    client: &Client,
    target: &ApprovalTarget,
    clusters: &[String],
) -> Result<Vec<(String, Option<MetricReport>)>, ReconcileErr> {
    let name = report_name(target.target_update_run(), target.target_stage());
    let mut out = Vec::with_capacity(clusters.len());
    for cluster in clusters {
        let ns = member_namespace(cluster);
        let api: Api<MetricReport> = Api::namespaced(client.clone(), &ns);
        out.push((cluster.clone(), api.get_opt(&name).await?));
    }
    Ok(out)
}
