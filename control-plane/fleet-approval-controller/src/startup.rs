use kube::{Client, discovery::Discovery};
use tracing::info;

/// Every API kind the engine consumes or provisions. The orchestrator and
/// this project's CRDs are installed out of band; starting without them
/// would only produce a watch-error loop, so fail fast instead.
const REQUIRED_KINDS: &[(&str, &str)] = &[
    ("placement.kubernetes-fleet.io", "ApprovalRequest"),
    ("placement.kubernetes-fleet.io", "ClusterApprovalRequest"),
    ("placement.kubernetes-fleet.io", "StagedUpdateRun"),
    ("placement.kubernetes-fleet.io", "ClusterStagedUpdateRun"),
    ("autoapprove.kubernetes-fleet.io", "StagedWorkloadTracker"),
    ("autoapprove.kubernetes-fleet.io", "ClusterStagedWorkloadTracker"),
    ("autoapprove.kubernetes-fleet.io", "MetricReport"),
];

pub async fn check_required_apis(client: &Client) -> anyhow::Result<()> {
    let discovery = Discovery::new(client.clone()).run().await?;

    let mut missing = Vec::new();
    for (group, kind) in REQUIRED_KINDS {
        let served = discovery
            .groups()
            .find(|g| g.name() == *group)
            .map(|g| g.recommended_kind(kind).is_some())
            .unwrap_or(false);
        if !served {
            missing.push(format!("{kind}.{group}"));
        }
    }

    if missing.is_empty() {
        info!(kinds = REQUIRED_KINDS.len(), "all required API kinds are served");
        Ok(())
    } else {
        anyhow::bail!("missing required API kinds: {}", missing.join(", "))
    }
}
