mod common;

use branchforest::prelude::*;
use common::{quick_logger, MockWriter};

#[tokio::test]
async fn fork_creates_a_linked_child_branch() {
    let (logger, writer) = quick_logger("root", MockWriter::new());
    let root_id = logger.root().id().clone();

    logger
        .on_future(async {
            log("root message", MessageType::User, None);

            fork("child")
                .on_future(async {
                    log("child message", MessageType::User, None);
                })
                .await;

            log("root again", MessageType::User, None);
        })
        .await;

    let snapshot = writer.snapshot();

    let root_entries = snapshot.entries.get(&root_id).unwrap();
    assert_eq!(root_entries.len(), 2);

    let (root_parent, root_children) = snapshot.tree.get(&root_id).expect("root tree edge recorded");
    assert!(root_parent.is_none());
    assert_eq!(root_children.len(), 1);

    let child_id = &root_children[0];
    let child_entries = snapshot.entries.get(child_id).expect("child branch should have its own entries");
    assert_eq!(child_entries.len(), 1);
    assert_eq!(child_entries[0].message, "child message");

    let (child_parent, _) = snapshot.tree.get(child_id).expect("child tree edge recorded");
    assert_eq!(child_parent.as_ref(), Some(&root_id));
}

#[tokio::test]
async fn forking_outside_any_scope_runs_the_future_unchanged() {
    let ran = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let ran2 = ran.clone();

    fork("orphan")
        .on_future(async move {
            ran2.store(true, std::sync::atomic::Ordering::SeqCst);
        })
        .await;

    assert!(ran.load(std::sync::atomic::Ordering::SeqCst));
}
