//! Append-only audit trail: growth properties and the stored JSON shape.

mod common;

use changeflow_core::models::{
    ActorId, ArchiveDelta, DomainObject, ModificationEntry, ModificationLog, ModificationType,
    SystemActor,
};
use changeflow_core::storage::ObjectStore;
use changeflow_core::testing::fixtures;
use chrono::DateTime;
use common::Harness;
use proptest::prelude::*;

fn modification_type_strategy() -> impl Strategy<Value = ModificationType> {
    prop_oneof![
        Just(ModificationType::Created),
        Just(ModificationType::Updated),
        Just(ModificationType::Submitted),
        Just(ModificationType::Approved),
        Just(ModificationType::Cancelled),
        Just(ModificationType::Completed),
        Just(ModificationType::Deleted),
        Just(ModificationType::Processed),
        Just(ModificationType::MeetingCancelled),
    ]
}

fn entry_strategy() -> impl Strategy<Value = ModificationEntry> {
    (
        modification_type_strategy(),
        prop::option::of(prop_oneof![Just("acme"), Just("globex"), Just("initech")]),
        prop_oneof![
            Just(ActorId::system(SystemActor::Reconciler)),
            Just(ActorId::parse(fixtures::AUTHOR).unwrap()),
        ],
    )
        .prop_map(|(modification_type, tenant, actor)| {
            let entry = ModificationEntry::new(actor, modification_type);
            match tenant {
                Some(code) => entry.for_tenant(code),
                None => entry,
            }
        })
}

fn base_object() -> DomainObject {
    fixtures::approved_change("CHG-LOG", &["acme", "globex"], false)
}

proptest! {
    /// Every append grows the log by one and leaves earlier entries untouched
    #[test]
    fn appends_only_ever_grow_the_log(entries in prop::collection::vec(entry_strategy(), 0..40)) {
        let mut log = ModificationLog::new();
        for entry in entries {
            let before = log.entries().to_vec();
            log.append(entry.clone()).unwrap();
            prop_assert_eq!(log.len(), before.len() + 1);
            prop_assert_eq!(&log.entries()[..before.len()], before.as_slice());
            prop_assert_eq!(log.last(), Some(&entry));
        }
    }

    /// A delta re-applied on top of concurrent writes keeps them all and only
    /// records `processed` when no newer status landed in between and no other
    /// delivery already recorded it
    #[test]
    fn delta_application_preserves_concurrent_entries(
        concurrent in prop::collection::vec(entry_strategy(), 0..8),
    ) {
        let observed = base_object();
        let mut delta = ArchiveDelta::for_object(&observed, "acme");
        delta.push_entry(ModificationEntry::meeting_cancelled(
            ActorId::system(SystemActor::Reconciler),
            "acme",
        ));
        delta.set_processed(ModificationEntry::processed(
            ActorId::system(SystemActor::Reconciler),
            "acme",
        ));

        let mut current = observed.clone();
        for entry in &concurrent {
            current.modifications.append(entry.clone()).unwrap();
        }
        let before = current.modifications.entries().to_vec();
        let processed_before = current
            .modifications
            .count_for_tenant(ModificationType::Processed, "acme");
        let newer_status = concurrent
            .iter()
            .any(|entry| entry.modification_type.is_status_transition());
        let already_processed =
            !newer_status && current.modifications.processed_since_latest_status("acme");

        let application = delta.apply(&mut current).unwrap();

        prop_assert_eq!(&current.modifications.entries()[..before.len()], before.as_slice());
        prop_assert_eq!(current.modifications.len(), before.len() + application.appended);
        prop_assert_eq!(application.superseded, newer_status);
        prop_assert_eq!(application.already_processed, already_processed);

        let processed_after = current
            .modifications
            .count_for_tenant(ModificationType::Processed, "acme");
        if newer_status || already_processed {
            prop_assert_eq!(processed_after, processed_before);
        } else {
            prop_assert_eq!(processed_after, processed_before + 1);
            prop_assert_eq!(
                current.modifications.last().map(|e| e.modification_type),
                Some(ModificationType::Processed)
            );
        }
        prop_assert!(current.modifications.processed_since_latest_status("acme") || newer_status);
    }
}

#[tokio::test]
async fn test_archived_json_keeps_the_wire_shape() {
    let mut harness = Harness::new(&["acme"]).await;
    harness
        .publish(&fixtures::approved_change("CHG-JSON", &["acme"], true))
        .await;
    harness.drain("acme").await;

    let stored = harness
        .store
        .get("archive/CHG-JSON.json")
        .await
        .unwrap()
        .expect("archive object exists");
    let json: serde_json::Value = serde_json::from_slice(&stored.body).unwrap();

    assert_eq!(json["status"], "approved");
    assert_eq!(json["prior_status"], "submitted");
    let modifications = json["modifications"].as_array().expect("modifications array");
    for entry in modifications {
        let timestamp = entry["timestamp"].as_str().expect("timestamp string");
        assert!(DateTime::parse_from_rfc3339(timestamp).is_ok(), "{timestamp}");
        assert!(entry["actor_id"].is_string());
        assert!(entry["modification_type"].is_string());
    }

    let scheduled = modifications
        .iter()
        .find(|entry| entry["modification_type"] == "meeting_scheduled")
        .expect("meeting_scheduled entry");
    assert_eq!(scheduled["tenant_code"], "acme");
    assert_eq!(scheduled["actor_id"], "system:reconciler");
    let metadata = &scheduled["meeting_metadata"];
    assert!(metadata["meeting_id"].as_str().is_some_and(|id| !id.is_empty()));
    assert!(metadata["join_url"].is_string());
    for field in ["start_time", "end_time"] {
        let value = metadata[field].as_str().expect("rfc3339 time");
        assert!(DateTime::parse_from_rfc3339(value).is_ok(), "{field}: {value}");
    }

    let last = modifications.last().expect("non-empty log");
    assert_eq!(last["modification_type"], "processed");
    assert_eq!(last["tenant_code"], "acme");
    assert!(last.get("meeting_metadata").is_none());
}

#[test]
fn test_new_object_writes_empty_prior_status() {
    let draft = fixtures::draft_change("CHG-NEW", &["acme"]);
    let json: serde_json::Value = serde_json::from_slice(&draft.to_json_vec().unwrap()).unwrap();
    assert_eq!(json["prior_status"], "");
    assert_eq!(json["status"], "draft");

    let parsed = DomainObject::from_json_slice(&draft.to_json_vec().unwrap(), "CHG-NEW").unwrap();
    assert_eq!(parsed.prior_status, None);
}

#[test]
fn test_log_with_malformed_entry_is_rejected() {
    let json = r#"[
        {"timestamp":"2025-03-01T10:00:00Z","actor_id":"ops@example.com","modification_type":"created"},
        {"timestamp":"2025-03-01T10:05:00Z","actor_id":"ops@example.com","modification_type":"rescheduled"}
    ]"#;
    assert!(serde_json::from_str::<ModificationLog>(json).is_err());
}
