use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Ordered stages of a cluster-scoped staged rollout. Consumed read-only:
/// only the status fields the engine needs are modeled, the orchestrator
/// owns the rest of the object and unknown fields are ignored on fetch.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema)]
#[kube(
    group = "placement.kubernetes-fleet.io",
    version = "v1beta1",
    kind = "ClusterStagedUpdateRun",
    plural = "clusterstagedupdateruns",
    status = "StagedUpdateRunStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStagedUpdateRunSpec {}

/// Namespaced variant.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema)]
#[kube(
    group = "placement.kubernetes-fleet.io",
    version = "v1beta1",
    kind = "StagedUpdateRun",
    plural = "stagedupdateruns",
    namespaced,
    status = "StagedUpdateRunStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct StagedUpdateRunSpec {}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct StagedUpdateRunStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stages_status: Vec<StageStatus>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StageStatus {
    pub stage_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clusters: Vec<ClusterUpdatingStatus>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterUpdatingStatus {
    pub cluster_name: String,
}

/// Member-cluster names for one stage, or `None` when the stage does not
/// appear in the run status.
pub fn stage_clusters(
    status: Option<&StagedUpdateRunStatus>,
    stage: &str,
) -> Option<Vec<String>> {
    status?
        .stages_status
        .iter()
        .find(|s| s.stage_name == stage)
        .map(|s| s.clusters.iter().map(|c| c.cluster_name.clone()).collect())
}
