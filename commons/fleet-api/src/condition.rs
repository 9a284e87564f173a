use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Condition type set on approval requests once a stage is healthy.
pub const CONDITION_APPROVED: &str = "Approved";
/// Condition type maintained by the member-side collector on reports.
pub const CONDITION_METRICS_COLLECTED: &str = "MetricsCollected";

pub const REASON_ALL_WORKLOADS_HEALTHY: &str = "AllWorkloadsHealthy";
pub const REASON_COLLECTION_SUCCEEDED: &str = "CollectionSucceeded";
pub const REASON_COLLECTION_FAILED: &str = "CollectionFailed";

/// K8s-style status condition carried on our custom resources.
///
/// The approval-request status is shared with other controllers, so the
/// type is an open string rather than an enum: foreign condition types
/// must survive a read-modify-write of the condition list.
#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: ConditionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

#[derive(
    Deserialize, Serialize, Clone, Copy, Debug, JsonSchema, PartialEq, Eq,
)]
#[serde(rename_all = "PascalCase")]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

pub fn find_condition<'a>(
    conditions: &'a [Condition],
    type_: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}

pub fn is_condition_true(conditions: &[Condition], type_: &str) -> bool {
    find_condition(conditions, type_)
        .map(|c| c.status == ConditionStatus::True)
        .unwrap_or(false)
}

/// Upsert `incoming` by condition type. `lastTransitionTime` only
/// advances when the status actually flips, so a steady condition keeps
/// its original transition timestamp across refreshes.
pub fn set_condition(conditions: &mut Vec<Condition>, mut incoming: Condition) {
    if let Some(idx) =
        conditions.iter().position(|c| c.type_ == incoming.type_)
    {
        if conditions[idx].status == incoming.status {
            incoming.last_transition_time =
                conditions[idx].last_transition_time.clone();
        }
        conditions[idx] = incoming;
    } else {
        conditions.push(incoming);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cond(type_: &str, status: ConditionStatus, ltt: &str) -> Condition {
        Condition {
            type_: type_.into(),
            status,
            observed_generation: None,
            reason: None,
            message: None,
            last_transition_time: Some(ltt.into()),
        }
    }

    #[test]
    fn set_condition_inserts_new_type() {
        let mut conds = vec![];
        set_condition(
            &mut conds,
            cond(CONDITION_APPROVED, ConditionStatus::True, "t1"),
        );
        assert_eq!(conds.len(), 1);
        assert!(is_condition_true(&conds, CONDITION_APPROVED));
    }

    #[test]
    fn set_condition_preserves_transition_time_when_status_unchanged() {
        let mut conds =
            vec![cond(CONDITION_METRICS_COLLECTED, ConditionStatus::True, "t1")];
        set_condition(
            &mut conds,
            cond(CONDITION_METRICS_COLLECTED, ConditionStatus::True, "t2"),
        );
        assert_eq!(conds[0].last_transition_time.as_deref(), Some("t1"));
    }

    #[test]
    fn set_condition_advances_transition_time_on_flip() {
        let mut conds =
            vec![cond(CONDITION_METRICS_COLLECTED, ConditionStatus::True, "t1")];
        set_condition(
            &mut conds,
            cond(CONDITION_METRICS_COLLECTED, ConditionStatus::False, "t2"),
        );
        assert_eq!(conds[0].last_transition_time.as_deref(), Some("t2"));
        assert!(!is_condition_true(&conds, CONDITION_METRICS_COLLECTED));
    }

    #[test]
    fn set_condition_keeps_foreign_conditions() {
        let mut conds = vec![cond("SomethingElse", ConditionStatus::True, "t0")];
        set_condition(
            &mut conds,
            cond(CONDITION_APPROVED, ConditionStatus::True, "t1"),
        );
        assert_eq!(conds.len(), 2);
        assert!(find_condition(&conds, "SomethingElse").is_some());
    }

    #[test]
    fn condition_serializes_to_contract_field_names() {
        let c = Condition {
            type_: CONDITION_APPROVED.into(),
            status: ConditionStatus::True,
            observed_generation: Some(3),
            reason: Some(REASON_ALL_WORKLOADS_HEALTHY.into()),
            message: None,
            last_transition_time: Some("2025-01-01T00:00:00Z".into()),
        };
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v["type"], "Approved");
        assert_eq!(v["status"], "True");
        assert_eq!(v["observedGeneration"], 3);
        assert_eq!(v["lastTransitionTime"], "2025-01-01T00:00:00Z");
        assert!(v.get("message").is_none());
    }
}
