use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::condition::Condition;

/// Finalizer carried by approval requests while per-cluster reports
/// exist. Owner references cannot cross namespaces, so report cleanup is
/// driven entirely by this finalizer.
pub const FINALIZER: &str =
    "kubernetes-fleet.io/metric-collector-report-cleanup";

pub const LABEL_APPROVAL_REQUEST: &str = "approval-request";
pub const LABEL_UPDATE_RUN: &str = "update-run";
pub const LABEL_STAGE: &str = "stage";
pub const LABEL_CLUSTER: &str = "cluster";

/// Cross-cluster rendezvous object: created on the hub by the approval
/// controller in each `fleet-member-<cluster>` namespace, filled in by
/// the collector running on that member cluster.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema)]
#[kube(
    group = "autoapprove.kubernetes-fleet.io",
    version = "v1alpha1",
    kind = "MetricReport",
    plural = "metricreports",
    namespaced,
    status = "MetricReportStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct MetricReportSpec {
    /// Member-local Prometheus endpoint the collector queries.
    pub prometheus_url: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct MetricReportStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workloads_monitored: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_collection_time: Option<String>,
    /// Most recent successful collection; left intact when a collection
    /// attempt fails.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collected_metrics: Vec<WorkloadSample>,
}

/// One observation of `workload_health` for a pod.
#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadSample {
    pub namespace: String,
    pub workload_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workload_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod_name: Option<String>,
    pub health: bool,
}

/// Report name shared by every cluster of a stage; namespaces differ.
pub fn report_name(update_run: &str, stage: &str) -> String {
    format!("mc-{update_run}-{stage}")
}

/// Per-cluster namespace on the hub, pre-created by the orchestrator.
pub fn member_namespace(cluster: &str) -> String {
    format!("fleet-member-{cluster}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_identity_follows_naming_convention() {
        assert_eq!(report_name("run-a", "s1"), "mc-run-a-s1");
        assert_eq!(member_namespace("c1"), "fleet-member-c1");
    }

    #[test]
    fn sample_serializes_to_contract_field_names() {
        let s = WorkloadSample {
            namespace: "ns".into(),
            workload_name: "app".into(),
            workload_kind: Some("Deployment".into()),
            pod_name: Some("app-abc".into()),
            health: true,
        };
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["workloadName"], "app");
        assert_eq!(v["workloadKind"], "Deployment");
        assert_eq!(v["podName"], "app-abc");
        assert_eq!(v["health"], true);
    }

    #[test]
    fn status_omits_empty_collections() {
        let st = MetricReportStatus::default();
        let v = serde_json::to_value(&st).unwrap();
        assert!(v.get("collectedMetrics").is_none());
        assert!(v.get("conditions").is_none());
    }
}
