use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{Event, EventType, Recorder};

use fleet_api::ApprovalTarget;

fn build_obj_ref(target: &ApprovalTarget) -> ObjectReference {
    ObjectReference {
        api_version: Some(target.api_version().to_string()),
        kind: Some(target.kind().to_string()),
        name: Some(target.name()),
        namespace: target.namespace(),
        uid: target.uid(),
        ..Default::default()
    }
}

/// Publish an event against an approval request; event delivery is
/// best-effort and never fails a reconcile.
pub async fn emit_event(
    recorder: &Recorder,
    target: &ApprovalTarget,
    type_: EventType,
    reason: &str,
    action: &str,
    note: Option<String>,
) {
    let _ = recorder
        .publish(
            &Event {
                type_,
                reason: reason.into(),
                note,
                action: action.into(),
                secondary: None,
            },
            &build_obj_ref(target),
        )
        .await;
}
