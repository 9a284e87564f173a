use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::condition::{CONDITION_APPROVED, Condition, is_condition_true};

/// Pause point emitted by the staged-update orchestrator for one
/// (update run, stage) pair. Cluster-scoped variant.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema)]
#[kube(
    group = "placement.kubernetes-fleet.io",
    version = "v1beta1",
    kind = "ClusterApprovalRequest",
    plural = "clusterapprovalrequests",
    status = "ApprovalRequestStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterApprovalRequestSpec {
    /// Name of the update run this request pauses.
    pub target_update_run: String,
    /// Stage awaiting approval.
    pub target_stage: String,
}

/// Namespaced variant of the pause point.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema)]
#[kube(
    group = "placement.kubernetes-fleet.io",
    version = "v1beta1",
    kind = "ApprovalRequest",
    plural = "approvalrequests",
    namespaced,
    status = "ApprovalRequestStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequestSpec {
    pub target_update_run: String,
    pub target_stage: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequestStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

/// The two approval-request kinds behind the one contract the engine
/// needs: identity, lifecycle markers, the target coordinates, and the
/// condition list. Scope branching elsewhere is limited to object fetch
/// and identity resolution.
#[derive(Clone, Debug)]
pub enum ApprovalTarget {
    Cluster(ClusterApprovalRequest),
    Namespaced(ApprovalRequest),
}

impl ApprovalTarget {
    pub fn name(&self) -> String {
        match self {
            ApprovalTarget::Cluster(o) => o.name_any(),
            ApprovalTarget::Namespaced(o) => o.name_any(),
        }
    }

    pub fn namespace(&self) -> Option<String> {
        match self {
            ApprovalTarget::Cluster(_) => None,
            ApprovalTarget::Namespaced(o) => o.namespace(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApprovalTarget::Cluster(_) => "ClusterApprovalRequest",
            ApprovalTarget::Namespaced(_) => "ApprovalRequest",
        }
    }

    pub fn api_version(&self) -> &'static str {
        "placement.kubernetes-fleet.io/v1beta1"
    }

    pub fn uid(&self) -> Option<String> {
        match self {
            ApprovalTarget::Cluster(o) => o.metadata.uid.clone(),
            ApprovalTarget::Namespaced(o) => o.metadata.uid.clone(),
        }
    }

    pub fn generation(&self) -> Option<i64> {
        match self {
            ApprovalTarget::Cluster(o) => o.metadata.generation,
            ApprovalTarget::Namespaced(o) => o.metadata.generation,
        }
    }

    pub fn is_deleting(&self) -> bool {
        match self {
            ApprovalTarget::Cluster(o) => {
                o.metadata.deletion_timestamp.is_some()
            }
            ApprovalTarget::Namespaced(o) => {
                o.metadata.deletion_timestamp.is_some()
            }
        }
    }

    pub fn finalizers(&self) -> Vec<String> {
        match self {
            ApprovalTarget::Cluster(o) => {
                o.metadata.finalizers.clone().unwrap_or_default()
            }
            ApprovalTarget::Namespaced(o) => {
                o.metadata.finalizers.clone().unwrap_or_default()
            }
        }
    }

    pub fn has_finalizer(&self, finalizer: &str) -> bool {
        self.finalizers().iter().any(|f| f == finalizer)
    }

    pub fn target_update_run(&self) -> &str {
        match self {
            ApprovalTarget::Cluster(o) => &o.spec.target_update_run,
            ApprovalTarget::Namespaced(o) => &o.spec.target_update_run,
        }
    }

    pub fn target_stage(&self) -> &str {
        match self {
            ApprovalTarget::Cluster(o) => &o.spec.target_stage,
            ApprovalTarget::Namespaced(o) => &o.spec.target_stage,
        }
    }

    pub fn conditions(&self) -> &[Condition] {
        let status = match self {
            ApprovalTarget::Cluster(o) => o.status.as_ref(),
            ApprovalTarget::Namespaced(o) => o.status.as_ref(),
        };
        status.map(|s| s.conditions.as_slice()).unwrap_or(&[])
    }

    /// Terminal check: once the Approved condition is True the engine
    /// never mutates the object again (finalizer removal aside).
    pub fn is_approved(&self) -> bool {
        is_condition_true(self.conditions(), CONDITION_APPROVED)
    }
}
