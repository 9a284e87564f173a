use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One workload the operator wants gated on health before a stage is
/// approved. `kind` narrows matching when set; `healthy_replicas` is the
/// minimum count of healthy pods required.
#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadRef {
    pub name: String,
    pub namespace: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub healthy_replicas: i32,
}

/// Operator intent for a `ClusterStagedUpdateRun`: the tracker's name must
/// equal the update-run name, there is no other linkage.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema)]
#[kube(
    group = "autoapprove.kubernetes-fleet.io",
    version = "v1alpha1",
    kind = "ClusterStagedWorkloadTracker",
    plural = "clusterstagedworkloadtrackers"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStagedWorkloadTrackerSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub workloads: Vec<WorkloadRef>,
}

/// Operator intent for a `StagedUpdateRun`: name and namespace must equal
/// those of the update run.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema)]
#[kube(
    group = "autoapprove.kubernetes-fleet.io",
    version = "v1alpha1",
    kind = "StagedWorkloadTracker",
    plural = "stagedworkloadtrackers",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct StagedWorkloadTrackerSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub workloads: Vec<WorkloadRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workload_ref_accepts_optional_kind() {
        let w: WorkloadRef = serde_json::from_value(serde_json::json!({
            "name": "app",
            "namespace": "ns",
            "healthyReplicas": 2
        }))
        .unwrap();
        assert_eq!(w.kind, None);
        assert_eq!(w.healthy_replicas, 2);

        let w: WorkloadRef = serde_json::from_value(serde_json::json!({
            "name": "app",
            "namespace": "ns",
            "kind": "Deployment",
            "healthyReplicas": 1
        }))
        .unwrap();
        assert_eq!(w.kind.as_deref(), Some("Deployment"));
    }
}
