//! Stage health aggregation, kept free of I/O so the approval rule can be
//! tested without a cluster: the decision is a pure function of the
//! tracker's workload list and the fetched per-cluster reports.

use std::collections::HashSet;

use fleet_api::{MetricReport, WorkloadRef, WorkloadSample};

/// Outcome of evaluating one stage.
#[derive(Clone, Debug, PartialEq)]
pub enum StageEvaluation {
    /// Every tracked workload in every cluster meets its healthy-replica
    /// threshold; counts are carried for the approval message.
    Healthy { workloads: usize, clusters: usize },
    /// Inputs are present but at least one workload is not healthy yet.
    Pending { reasons: Vec<String> },
    /// The tracker is absent; the operator may still create it.
    Missing { reason: String },
}

enum WorkloadHealth {
    Healthy,
    NotFound,
    Insufficient { got: i32, need: i32 },
}

pub fn evaluate_stage(
    workloads: Option<&[WorkloadRef]>,
    reports: &[(String, Option<MetricReport>)],
) -> StageEvaluation {
    let Some(workloads) = workloads else {
        return StageEvaluation::Missing {
            reason: "tracker not found".to_string(),
        };
    };
    if workloads.is_empty() {
        return StageEvaluation::Pending {
            reasons: vec!["tracker has no workloads".to_string()],
        };
    }

    let mut reasons = Vec::new();
    for (cluster, report) in reports {
        let Some(report) = report else {
            reasons.push(format!("cluster {cluster}: report not found"));
            continue;
        };
        let samples = report
            .status
            .as_ref()
            .map(|s| s.collected_metrics.as_slice())
            .unwrap_or(&[]);
        for w in workloads {
            match workload_health(w, samples) {
                WorkloadHealth::Healthy => {}
                WorkloadHealth::NotFound => reasons.push(format!(
                    "cluster {cluster}: workload {}/{} not found",
                    w.namespace, w.name
                )),
                WorkloadHealth::Insufficient { got, need } => {
                    reasons.push(format!(
                        "cluster {cluster}: workload {}/{} has insufficient healthy pods (got {got}, need {need})",
                        w.namespace, w.name
                    ))
                }
            }
        }
    }

    if reasons.is_empty() {
        StageEvaluation::Healthy {
            workloads: workloads.len(),
            clusters: reports.len(),
        }
    } else {
        StageEvaluation::Pending { reasons }
    }
}

/// Count healthy samples matching one tracked workload. Matching is by
/// (namespace, name), narrowed by kind (case-insensitive) when the
/// tracker sets one. A pod name present on a sample breaks ties: the same
/// pod never counts twice, while samples without pod identity each count
/// once.
fn workload_health(
    w: &WorkloadRef,
    samples: &[WorkloadSample],
) -> WorkloadHealth {
    let mut seen_pods: HashSet<&str> = HashSet::new();
    let mut matched = false;
    let mut healthy: i32 = 0;

    for s in samples {
        if s.namespace != w.namespace || s.workload_name != w.name {
            continue;
        }
        if let Some(kind) = &w.kind {
            match &s.workload_kind {
                Some(sample_kind)
                    if sample_kind.eq_ignore_ascii_case(kind) => {}
                _ => continue,
            }
        }
        matched = true;
        if let Some(pod) = &s.pod_name {
            if !seen_pods.insert(pod.as_str()) {
                continue;
            }
        }
        if s.health {
            healthy += 1;
        }
    }

    if !matched {
        WorkloadHealth::NotFound
    } else if healthy >= w.healthy_replicas {
        WorkloadHealth::Healthy
    } else {
        WorkloadHealth::Insufficient {
            got: healthy,
            need: w.healthy_replicas,
        }
    }
}
