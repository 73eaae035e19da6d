//! Concurrent captures against one on-disk database, each thread holding its
//! own connection the way independent request handlers would.

use std::sync::{Arc, Barrier};
use std::thread;

use reset_core::ActivitySample;
use reset_store::{Store, Tracker};

const URL: &str = "https://github.com/acme/widgets/pull/42";

#[test]
fn test_concurrent_captures_keep_one_live_context() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("reset.db");
    Store::open(&db).unwrap();

    const WRITERS: usize = 8;
    let barrier = Arc::new(Barrier::new(WRITERS));
    let handles: Vec<_> = (0..WRITERS)
        .map(|i| {
            let db = db.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let store = Store::open(&db).unwrap();
                barrier.wait();
                // vary the spelling; all normalize to the same key
                let url = if i % 2 == 0 {
                    URL.to_string()
                } else {
                    format!("{URL}/?pass={i}")
                };
                store
                    .capture("u1", None, &ActivitySample::new(&url), i as i64)
                    .unwrap()
            })
        })
        .collect();

    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let created = outcomes.iter().filter(|o| !o.was_update).count();
    assert_eq!(created, 1, "exactly one capture should create the context");
    assert!(outcomes.iter().all(|o| o.context_id == outcomes[0].context_id));

    let store = Store::open(&db).unwrap();
    let active = store.list_active("u1", 100).unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].visit_count as usize, WRITERS);
}

#[test]
fn test_concurrent_users_stay_partitioned() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().to_path_buf();
    Tracker::open(Some(base.as_path())).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let base = base.clone();
            thread::spawn(move || {
                let tracker = Tracker::open(Some(base.as_path())).unwrap();
                let user = format!("user-{}", i % 2);
                for _ in 0..3 {
                    tracker
                        .capture_activity(&user, None, &ActivitySample::new(URL))
                        .unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let tracker = Tracker::open(Some(base.as_path())).unwrap();
    for user in ["user-0", "user-1"] {
        let active = tracker.list_active_contexts(user, None).unwrap();
        assert_eq!(active.len(), 1, "{user}");
        assert_eq!(active[0].visit_count, 6, "{user}");
    }
}
