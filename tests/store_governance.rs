//! Integration coverage for the run-artifact store: immutability, cursor
//! pagination, soft/hard delete policy, and index rebuild-from-scratch.

use chrono::Utc;
use pocketcore::config::{Config, DeleteMode};
use pocketcore::error::CoreError;
use pocketcore::feasibility::RiskLevel;
use pocketcore::store::{
    ArtifactHashes, ArtifactOutputs, Decision, DeleteRequest, IndexFilter, RunArtifact, RunStatus, RunStore,
    WorkflowLinkage,
};
use std::collections::HashMap;
use tempfile::tempdir;

fn artifact(run_id: &str, offset_secs: i64) -> RunArtifact {
    RunArtifact {
        run_id: run_id.to_string(),
        created_at_utc: Utc::now() + chrono::Duration::seconds(offset_secs),
        mode: "normal".into(),
        tool_id: "t1".into(),
        status: RunStatus::Ok,
        event_type: "plan".into(),
        request_summary: serde_json::json!({}),
        feasibility: pocketcore::feasibility::FeasibilityResult {
            risk_level: RiskLevel::Green,
            score: 100,
            blocking: false,
            warnings: vec![],
            blocking_reasons: vec![],
            engine_version: "1.0.0".into(),
            computed_at_utc: Utc::now(),
        },
        decision: Decision {
            risk_level: RiskLevel::Green,
            score: Some(100),
            block_reason: None,
            warnings: vec![],
            details: serde_json::json!({}),
        },
        hashes: ArtifactHashes {
            feasibility_sha256: pocketcore::hashing::sha256_of_text("fz"),
            toolpaths_sha256: Some(pocketcore::hashing::sha256_of_text("tp")),
            gcode_sha256: None,
            opplan_sha256: None,
        },
        outputs: ArtifactOutputs::default(),
        attachments: vec![],
        meta: HashMap::new(),
        linkage: WorkflowLinkage::default(),
        mutable: Default::default(),
    }
}

#[test]
fn cursor_pagination_visits_every_run_exactly_once() {
    let dir = tempdir().unwrap();
    let store = RunStore::new(dir.path(), Config::default()).unwrap();
    for i in 0..7 {
        store.put(&artifact(&format!("run-{i}"), i)).unwrap();
    }

    let mut seen = std::collections::HashSet::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = store.query_recent(3, cursor.as_deref()).unwrap();
        if page.items.is_empty() {
            break;
        }
        for item in &page.items {
            assert!(seen.insert(item.run_id.clone()), "run visited twice: {}", item.run_id);
        }
        match page.next_cursor {
            Some(c) => cursor = Some(c),
            None => break,
        }
    }
    assert_eq!(seen.len(), 7);
}

#[test]
fn filtered_listing_matches_tool_id() {
    let dir = tempdir().unwrap();
    let store = RunStore::new(dir.path(), Config::default()).unwrap();
    let mut a = artifact("run-a", 0);
    a.tool_id = "drill-3mm".into();
    store.put(&a).unwrap();
    store.put(&artifact("run-b", 1)).unwrap();

    let filter = IndexFilter {
        tool_id: Some("drill-3mm".into()),
        ..Default::default()
    };
    let page = store.list_runs_filtered(&filter, 10, 0).unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].run_id, "run-a");
}

#[test]
fn soft_deleted_run_reads_as_not_found() {
    let dir = tempdir().unwrap();
    let store = RunStore::new(dir.path(), Config::default()).unwrap();
    store.put(&artifact("run-1", 0)).unwrap();
    store
        .delete_run(&DeleteRequest {
            run_id: "run-1".into(),
            mode: DeleteMode::Soft,
            reason: "duplicate test data".into(),
            actor: "tester".into(),
            request_id: "req-1".into(),
            admin_asserted: false,
        })
        .unwrap();
    assert!(store.get("run-1").unwrap().is_none());

    let records = store.audit_log().read_all().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].run_id, "run-1");
}

#[test]
fn delete_rate_limit_trips_after_quota() {
    let config = Config {
        delete_rate_limit_max: 2,
        ..Config::default()
    };
    let dir = tempdir().unwrap();
    let store = RunStore::new(dir.path(), config).unwrap();
    for i in 0..3 {
        store.put(&artifact(&format!("run-{i}"), i)).unwrap();
    }

    for i in 0..2 {
        store
            .delete_run(&DeleteRequest {
                run_id: format!("run-{i}"),
                mode: DeleteMode::Soft,
                reason: "quota test".into(),
                actor: "same-actor".into(),
                request_id: format!("req-{i}"),
                admin_asserted: false,
            })
            .unwrap();
    }

    let err = store
        .delete_run(&DeleteRequest {
            run_id: "run-2".into(),
            mode: DeleteMode::Soft,
            reason: "quota test".into(),
            actor: "same-actor".into(),
            request_id: "req-2".into(),
            admin_asserted: false,
        })
        .unwrap_err();
    assert!(matches!(err, CoreError::RateLimited(_)));
}

#[test]
fn delete_run_rejects_reason_shorter_than_six_chars() {
    let dir = tempdir().unwrap();
    let store = RunStore::new(dir.path(), Config::default()).unwrap();
    store.put(&artifact("run-1", 0)).unwrap();

    let err = store
        .delete_run(&DeleteRequest {
            run_id: "run-1".into(),
            mode: DeleteMode::Soft,
            reason: "nope".into(),
            actor: "tester".into(),
            request_id: "req-1".into(),
            admin_asserted: false,
        })
        .unwrap_err();
    assert!(matches!(err, CoreError::BadParameter(_)));
    assert!(store.get("run-1").unwrap().is_some(), "rejected delete must not touch the run");
}

#[test]
fn attachment_dedup_tracks_ref_count_across_many_runs() {
    let dir = tempdir().unwrap();
    let attach_store = pocketcore::attachments::AttachmentStore::new(dir.path().join("attachments")).unwrap();
    let payload = b"{\"k\":1}";
    for i in 0..100 {
        attach_store
            .put_bytes(payload, "advisory", "application/json", "note.json", ".json", &format!("run-{i}"))
            .unwrap();
    }
    let sha = pocketcore::hashing::sha256_of_bytes(payload);
    let meta = attach_store.meta_for(&sha).unwrap().expect("meta present");
    assert_eq!(meta.ref_count, 100);
    assert_eq!(meta.first_seen_run_id, "run-0");
    assert_eq!(meta.last_seen_run_id, "run-99");
}
