mod common;

use branchforest::prelude::*;
use common::{quick_logger, MockWriter};

#[tokio::test]
async fn apply_rejects_an_empty_call() {
    let (logger, _writer) = quick_logger("root", MockWriter::new());

    logger
        .on_future(async {
            let result = apply(None, None);
            assert_eq!(result, Err(ValidationError::EmptyApply));
        })
        .await;
}

#[tokio::test]
async fn apply_adds_tags_and_metadata_to_the_current_frontier() {
    let (logger, writer) = quick_logger("root", MockWriter::new());
    let root_id = logger.root().id().clone();

    logger
        .on_future(async {
            let mut metadata = Metadata::new();
            metadata.insert("priority".to_string(), Scalar::Int(1));
            apply(Some(vec!["urgent".to_string()]), Some(metadata)).unwrap();
        })
        .await;

    let snapshot = writer.snapshot();
    assert_eq!(snapshot.tags.get(&root_id).unwrap(), &vec!["urgent".to_string()]);
    assert_eq!(snapshot.metadata.get(&root_id).unwrap().get("priority"), Some(&Scalar::Int(1)));
}

#[tokio::test]
async fn log_typed_rejects_an_unknown_message_type() {
    let (logger, _writer) = quick_logger("root", MockWriter::new());

    logger
        .on_future(async {
            let result = log_typed("oops", "fatal", None);
            assert!(matches!(result, Err(ValidationError::UnknownMessageType(_))));
        })
        .await;
}

#[test]
fn tags_must_be_non_blank() {
    use branchforest::validate::validate_tags;
    assert!(validate_tags(&["  ", "ok"]).is_err());
}
