//! Live projections shared between clients of one store.

use std::sync::Arc;

use boardsync::board::{
    adapters::memory::InMemoryRecordStore,
    domain::{NewTask, UserRef},
};
use rstest::rstest;

use super::helpers::{alice, client, quick_retry, store};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn writes_from_one_client_reach_another(
    store: Arc<InMemoryRecordStore>,
    alice: UserRef,
) {
    let writer = client(Arc::clone(&store), quick_retry());
    let reader = client(Arc::clone(&store), quick_retry());
    writer.initialize().await.expect("board initializes");
    let mut live = reader.subscribe().expect("subscription opens");

    let column = writer
        .create_column("Inbox")
        .await
        .expect("column created");
    let task = writer
        .create_task(column.id(), NewTask::new("Reply to email"), &alice)
        .await
        .expect("task created");
    let projection = live
        .wait_until(|projection| {
            projection
                .board()
                .is_some_and(|board| board.find_task(task.id()).is_some())
        })
        .await
        .expect("projection catches up");
    assert_eq!(projection.columns().len(), 1);

    reader
        .update_column(column.id(), "Triage")
        .await
        .expect("reader renames column");
    let renamed = live
        .wait_until(|projection| {
            projection
                .columns()
                .first()
                .is_some_and(|first| first.name() == "Triage")
        })
        .await
        .expect("own write is projected");
    assert!(renamed.version() > projection.version());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn each_subscriber_has_its_own_projection(store: Arc<InMemoryRecordStore>) {
    let service = client(Arc::clone(&store), quick_retry());
    service.initialize().await.expect("board initializes");
    let mut first = service.subscribe().expect("first subscription");
    let mut second = service.subscribe().expect("second subscription");

    service.create_column("Backlog").await.expect("column created");

    for live in [&mut first, &mut second] {
        let projection = live
            .wait_until(|projection| projection.columns().len() == 1)
            .await
            .expect("column projected");
        assert!(projection.error().is_none());
    }
    drop(first);
    let snapshot = second.snapshot();
    assert_eq!(snapshot.columns().len(), 1);
}
