//! Typed API for the fleet auto-approval protocol: the approval-request
//! contract consumed from the staged-update orchestrator, the
//! operator-supplied workload trackers, and the `MetricReport` rendezvous
//! object exchanged between the hub and member clusters.

pub mod approval;
pub mod condition;
pub mod report;
pub mod tracker;
pub mod update_run;

pub use approval::{
    ApprovalRequest, ApprovalRequestSpec, ApprovalRequestStatus,
    ApprovalTarget, ClusterApprovalRequest, ClusterApprovalRequestSpec,
};
pub use condition::{
    Condition, ConditionStatus, find_condition, is_condition_true,
    set_condition,
};
pub use report::{
    MetricReport, MetricReportSpec, MetricReportStatus, WorkloadSample,
    member_namespace, report_name,
};
pub use tracker::{
    ClusterStagedWorkloadTracker, ClusterStagedWorkloadTrackerSpec,
    StagedWorkloadTracker, StagedWorkloadTrackerSpec, WorkloadRef,
};
pub use update_run::{
    ClusterStagedUpdateRun, ClusterStagedUpdateRunSpec, StagedUpdateRun,
    StagedUpdateRunSpec, StagedUpdateRunStatus, stage_clusters,
};
