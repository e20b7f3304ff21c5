//! End-to-end orchestration tests.
//!
//! Each test wires the in-memory store and a connection registry into the
//! services and checks both the stored state and the events viewers receive.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use notehub_core::{
    ConnectionRegistry, Content, ContentRepository, ContentType, Error, Permission, Result,
    Subscription, WebSocketEvent,
};
use notehub_service::Services;
use notehub_store::{InMemoryContentRepository, Store};

struct Harness {
    services: Services,
    store: Store,
}

fn harness() -> Harness {
    let store = Store::new();
    let registry = Arc::new(ConnectionRegistry::new(32));
    Harness {
        services: Services::new(&store, registry),
        store,
    }
}

fn subscribe(h: &Harness, note_id: &str) -> Subscription {
    h.services.registry.subscribe(note_id)
}

fn drain(sub: &mut Subscription) -> Vec<WebSocketEvent> {
    let mut events = Vec::new();
    while let Ok(raw) = sub.rx.try_recv() {
        events.push(serde_json::from_str(&raw).expect("Failed to parse event"));
    }
    events
}

/// Note "n1" at version 2 holding content c1 (v0) and c2 (v0).
async fn seeded(h: &Harness) {
    let notes = &h.services.notes;
    notes
        .create_note("n1", "Groceries", "alice")
        .await
        .expect("Failed to create note");
    notes
        .create_content_in_note("n1", "c1", "text", "milk", -1, 0)
        .await
        .expect("Failed to add c1");
    notes
        .create_content_in_note("n1", "c2", "text", "eggs", -1, 1)
        .await
        .expect("Failed to add c2");
}

#[tokio::test]
async fn test_groceries_scenario() {
    let h = harness();
    let notes = &h.services.notes;
    let id = notes.create_note("", "Groceries", "alice").await.unwrap();

    let note = notes.get_note_by_id(&id).await.unwrap();
    assert_eq!(note.version(), 0);
    assert!(note.content_ids().is_empty());

    assert_eq!(notes.add_content(&id, "c1", 0, 0).await.unwrap(), 1);
    let note = notes.get_note_by_id(&id).await.unwrap();
    assert_eq!(note.content_ids(), ["c1"]);

    let err = notes.add_content(&id, "c1", 0, 0).await.unwrap_err();
    assert!(err.is_conflict(), "stale retry must conflict, got {err:?}");
}

#[tokio::test]
async fn test_share_then_revoke_scenario() {
    let h = harness();
    let notes = &h.services.notes;
    notes.create_note("n1", "Groceries", "alice").await.unwrap();
    notes.add_content("n1", "c1", 0, 0).await.unwrap();

    assert_eq!(notes.share_note("n1", "alice", "bob", "read", 1).await.unwrap(), 2);
    let note = notes.get_note_by_id("n1").await.unwrap();
    assert_eq!(note.permission_for("bob"), Some(Permission::Read));

    assert_eq!(notes.revoke_access("n1", "alice", "bob", 2).await.unwrap(), 3);
    assert!(notes
        .get_note_by_id("n1")
        .await
        .unwrap()
        .permission_for("bob")
        .is_none());

    assert_eq!(
        notes.revoke_access("n1", "alice", "bob", 3).await.unwrap_err(),
        Error::UserNotFound("bob".to_string())
    );
}

#[tokio::test]
async fn test_revoke_cascades_keywords() {
    let h = harness();
    let notes = &h.services.notes;
    notes.create_note("n1", "Groceries", "alice").await.unwrap();
    notes.share_note("n1", "alice", "bob", "read-write", 0).await.unwrap();
    notes.tag_note("n1", "bob", "weekly", 1).await.unwrap();
    notes.tag_note("n1", "bob", "food", 2).await.unwrap();
    assert_eq!(notes.find_notes_by_keyword("bob", "weekly").await.unwrap().len(), 1);

    notes.revoke_access("n1", "alice", "bob", 3).await.unwrap();

    let note = notes.get_note_by_id("n1").await.unwrap();
    assert!(!note.collaborators().contains_key("bob"));
    assert!(!note.keywords().contains_key("bob"));
    assert!(notes.find_notes_by_keyword("bob", "weekly").await.unwrap().is_empty());
    assert!(notes.get_accessible_notes("bob").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_accessible_notes() {
    let h = harness();
    let notes = &h.services.notes;
    notes.create_note("a", "Alice's", "alice").await.unwrap();
    notes.create_note("b", "Bob's", "bob").await.unwrap();
    notes.share_note("a", "alice", "bob", "read", 0).await.unwrap();

    let ids: Vec<String> = notes
        .get_accessible_notes("bob")
        .await
        .unwrap()
        .iter()
        .map(|n| n.id().to_string())
        .collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(notes.get_accessible_notes("alice").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_add_content_event() {
    let h = harness();
    seeded(&h).await;
    let mut sub = subscribe(&h, "n1");

    let (content_id, version) = h
        .services
        .notes
        .create_content_in_note("n1", "", "text", "bread", 2, 2)
        .await
        .unwrap();
    assert_eq!(version, 3);

    let events = drain(&mut sub);
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0],
        WebSocketEvent::AddContent {
            note_id: "n1".to_string(),
            content_id: content_id.clone(),
            data: Some("bread".to_string()),
            content_type: Some(ContentType::Text),
            note_version: 3,
            content_version: Some(0),
            index: 2,
        }
    );
    let note = h.services.notes.get_note_by_id("n1").await.unwrap();
    assert_eq!(note.content_ids(), ["c1", "c2", content_id.as_str()]);
}

#[tokio::test]
async fn test_add_content_out_of_bounds_on_empty_note() {
    let h = harness();
    let notes = &h.services.notes;
    notes.create_note("n1", "Empty", "alice").await.unwrap();
    let mut sub = subscribe(&h, "n1");

    let err = notes
        .create_content_in_note("n1", "c1", "text", "x", 5, 0)
        .await
        .unwrap_err();
    assert_eq!(err, Error::IndexOutOfBounds { index: 5, len: 0 });
    assert!(drain(&mut sub).is_empty());
    assert!(h.store.contents.find_by_id("c1").await.is_err());
}

#[tokio::test]
async fn test_update_content_event() {
    let h = harness();
    seeded(&h).await;
    let mut sub = subscribe(&h, "n1");

    let version = h
        .services
        .contents
        .update_content("c1", "oat milk", 0)
        .await
        .unwrap();
    assert_eq!(version, 1);

    let events = drain(&mut sub);
    assert!(matches!(
        &events[..],
        [WebSocketEvent::UpdateContent { content_version: 1, note_version: 2, .. }]
    ));
    // Content edits do not move the note's version
    assert_eq!(h.services.notes.get_note_by_id("n1").await.unwrap().version(), 2);
}

#[tokio::test]
async fn test_delete_content_from_note_event() {
    let h = harness();
    seeded(&h).await;
    let mut sub = subscribe(&h, "n1");

    let version = h
        .services
        .notes
        .delete_content_from_note("n1", "c1", 2, 0)
        .await
        .unwrap();
    assert_eq!(version, 3);

    assert_eq!(
        drain(&mut sub),
        vec![WebSocketEvent::DeleteContent {
            note_id: "n1".to_string(),
            content_id: "c1".to_string(),
            note_version: 3,
            index: Some(0),
        }]
    );
    assert!(h.store.contents.find_by_id("c1").await.is_err());
    let note = h.services.notes.get_note_by_id("n1").await.unwrap();
    assert_eq!(note.content_ids(), ["c2"]);
}

#[tokio::test]
async fn test_delete_content_from_note_stale_content_version() {
    let h = harness();
    seeded(&h).await;
    h.services.contents.update_content("c1", "x", 0).await.unwrap();

    let err = h
        .services
        .notes
        .delete_content_from_note("n1", "c1", 2, 0)
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    // Nothing changed
    let note = h.services.notes.get_note_by_id("n1").await.unwrap();
    assert_eq!(note.version(), 2);
    assert_eq!(note.content_ids(), ["c1", "c2"]);
}

/// Content store whose versioned delete always loses the race, as if the
/// block was edited between the version check and the delete.
struct RacingContentRepository {
    inner: InMemoryContentRepository,
}

#[async_trait]
impl ContentRepository for RacingContentRepository {
    async fn save(&self, content: &Content) -> Result<u64> {
        self.inner.save(content).await
    }

    async fn insert(&self, content: &Content) -> Result<()> {
        self.inner.insert(content).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Content> {
        self.inner.find_by_id(id).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.inner.delete(id).await
    }

    async fn delete_at_version(&self, id: &str, version: u64) -> Result<()> {
        Err(Error::conflict(id, version, version + 1))
    }

    async fn find_all_by_note_id(&self, note_id: &str) -> Result<Vec<Content>> {
        self.inner.find_all_by_note_id(note_id).await
    }

    async fn delete_all_by_note_id(&self, note_id: &str) -> Result<usize> {
        self.inner.delete_all_by_note_id(note_id).await
    }
}

#[tokio::test]
async fn test_delete_content_from_note_surfaces_lost_delete() {
    let plain = Store::new();
    let store = Store::with_repositories(
        Arc::clone(&plain.notes),
        Arc::new(RacingContentRepository {
            inner: InMemoryContentRepository::new(),
        }),
    );
    let registry = Arc::new(ConnectionRegistry::new(32));
    let h = Harness {
        services: Services::new(&store, registry),
        store,
    };
    h.services.notes.create_note("n1", "Groceries", "alice").await.unwrap();
    h.services
        .notes
        .create_content_in_note("n1", "c1", "text", "milk", -1, 0)
        .await
        .unwrap();
    let mut sub = subscribe(&h, "n1");

    let err = h
        .services
        .notes
        .delete_content_from_note("n1", "c1", 1, 0)
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    // Note untouched, record kept, nobody told
    let note = h.services.notes.get_note_by_id("n1").await.unwrap();
    assert_eq!(note.version(), 1);
    assert_eq!(note.content_ids(), ["c1"]);
    assert!(h.store.contents.find_by_id("c1").await.is_ok());
    assert!(drain(&mut sub).is_empty());
}

#[tokio::test]
async fn test_remove_content_keeps_record() {
    let h = harness();
    seeded(&h).await;

    h.services.notes.remove_content("n1", "c2", 2).await.unwrap();
    assert!(h.store.contents.find_by_id("c2").await.is_ok());
    assert_eq!(
        h.services.notes.remove_content("n1", "c2", 3).await.unwrap_err(),
        Error::ContentNotFound("c2".to_string())
    );
}

#[tokio::test]
async fn test_delete_note_cascades_and_closes_subscribers() {
    let h = harness();
    seeded(&h).await;
    let mut first = subscribe(&h, "n1");
    let mut second = subscribe(&h, "n1");

    h.services.notes.delete_note("n1", 2).await.unwrap();

    for sub in [&mut first, &mut second] {
        let raw = sub.rx.recv().await.expect("delete event queued");
        let event: WebSocketEvent = serde_json::from_str(&raw).unwrap();
        assert_eq!(event, WebSocketEvent::delete_note("n1", 3));
        assert!(sub.rx.recv().await.is_none(), "stream must end after delete");
    }
    assert_eq!(h.services.registry.subscriber_count("n1"), 0);
    assert!(h
        .services
        .notes
        .get_note_by_id("n1")
        .await
        .unwrap_err()
        .is_not_found());
    assert!(h.store.contents.find_all_by_note_id("n1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_note_stale_version_conflicts() {
    let h = harness();
    seeded(&h).await;

    assert!(h.services.notes.delete_note("n1", 1).await.unwrap_err().is_conflict());
    assert!(h
        .services
        .notes
        .delete_note("missing", 0)
        .await
        .unwrap_err()
        .is_not_found());
    assert_eq!(h.store.contents.find_all_by_note_id("n1").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_fan_out_to_all_subscribers_only_of_that_note() {
    let h = harness();
    let notes = &h.services.notes;
    notes.create_note("x", "X", "alice").await.unwrap();
    notes.create_note("y", "Y", "alice").await.unwrap();

    let mut xs: Vec<Subscription> = (0..5).map(|_| subscribe(&h, "x")).collect();
    let mut y = subscribe(&h, "y");

    notes.update_title("x", "X1", 0).await.unwrap();
    for sub in xs.iter_mut() {
        assert_eq!(drain(sub).len(), 1);
    }
    assert!(drain(&mut y).is_empty());

    let gone = xs.pop().unwrap();
    assert!(h.services.registry.remove("x", gone.id));
    notes.update_title("x", "X2", 1).await.unwrap();
    for sub in xs.iter_mut() {
        assert_eq!(drain(sub).len(), 1);
    }
    assert_eq!(h.services.registry.subscriber_count("x"), 4);
}

#[tokio::test]
async fn test_broadcast_order_per_subscriber() {
    let h = harness();
    let notes = &h.services.notes;
    notes.create_note("n1", "v0", "alice").await.unwrap();
    let mut sub = subscribe(&h, "n1");

    for v in 0..5u64 {
        notes.update_title("n1", &format!("v{}", v + 1), v).await.unwrap();
    }

    let versions: Vec<u64> = drain(&mut sub).iter().map(|e| e.note_version()).collect();
    assert_eq!(versions, vec![1, 2, 3, 4, 5]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_one_conflict() {
    let h = harness();
    h.services.notes.create_note("n1", "Groceries", "alice").await.unwrap();
    let mut sub = subscribe(&h, "n1");

    let writers = ["a", "b"].into_iter().map(|cid| {
        let notes = h.services.notes.clone();
        tokio::spawn(async move { notes.add_content("n1", cid, -1, 0).await })
    });
    let results: Vec<_> = join_all(writers)
        .await
        .into_iter()
        .map(|r| r.expect("task panicked"))
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(e) if e.is_conflict()))
            .count(),
        1
    );
    let note = h.services.notes.get_note_by_id("n1").await.unwrap();
    assert_eq!(note.version(), 1);
    assert_eq!(note.content_ids().len(), 1);
    // Only the winning write is announced
    assert_eq!(drain(&mut sub).len(), 1);
}

#[tokio::test]
async fn test_slow_subscriber_does_not_block_writer() {
    let store = Store::new();
    let registry = Arc::new(ConnectionRegistry::new(1));
    let services = Services::new(&store, Arc::clone(&registry));
    services.notes.create_note("n1", "t0", "alice").await.unwrap();
    let mut slow = registry.subscribe("n1");

    for v in 0..10u64 {
        services
            .notes
            .update_title("n1", &format!("t{}", v + 1), v)
            .await
            .expect("writes must not be held up by a full queue");
    }
    // The slow viewer kept only what fit
    assert_eq!(drain(&mut slow).len(), 1);
    assert_eq!(services.notes.get_note_by_id("n1").await.unwrap().version(), 10);
}
