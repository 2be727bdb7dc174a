mod common;

use branchforest::prelude::*;
use common::{quick_logger, MockWriter};
use rand::Rng;

/// Two sibling branches logging concurrently from separate spawned tasks
/// must not cross-contaminate each other's entries, even with randomized
/// interleaving.
#[tokio::test]
async fn sibling_forks_keep_independent_logs_under_jitter() {
    let (logger, writer) = quick_logger("root", MockWriter::new());

    logger
        .on_future(async {
            let left = fork("left")
                .on_future(async {
                    for i in 0..5 {
                        jittered_sleep().await;
                        log(format!("left-{i}"), MessageType::User, None);
                    }
                    context().first().unwrap().id().clone()
                });

            let right = fork("right")
                .on_future(async {
                    for i in 0..5 {
                        jittered_sleep().await;
                        log(format!("right-{i}"), MessageType::User, None);
                    }
                    context().first().unwrap().id().clone()
                });

            let (left_id, right_id) = tokio::join!(left, right);
            assert_ne!(left_id, right_id);
        })
        .await;

    let snapshot = writer.snapshot();
    let left_entries: Vec<_> = snapshot
        .entries
        .values()
        .find(|entries| entries.iter().any(|e| e.message.starts_with("left-")))
        .expect("left branch entries present")
        .iter()
        .map(|e| e.message.clone())
        .collect();
    let right_entries: Vec<_> = snapshot
        .entries
        .values()
        .find(|entries| entries.iter().any(|e| e.message.starts_with("right-")))
        .expect("right branch entries present")
        .iter()
        .map(|e| e.message.clone())
        .collect();

    assert_eq!(left_entries.len(), 5);
    assert_eq!(right_entries.len(), 5);
    assert!(left_entries.iter().all(|m| m.starts_with("left-")));
    assert!(right_entries.iter().all(|m| m.starts_with("right-")));
}

async fn jittered_sleep() {
    let millis = rand::thread_rng().gen_range(1..10);
    tokio::time::sleep(std::time::Duration::from_millis(millis)).await;
}
