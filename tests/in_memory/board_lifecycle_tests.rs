//! End-to-end board flows against in-memory adapters.

use std::sync::Arc;

use boardsync::board::{
    adapters::memory::{InMemoryBlobStorage, InMemoryRecordStore},
    domain::{AttachmentUpload, Column, NewComment, NewTask, TaskPatch, UserRef},
    services::{BoardConfig, BoardErrorKind, BoardService},
};
use mockable::DefaultClock;
use rstest::rstest;

use super::helpers::{alice, bob, client, quick_retry, store};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn task_travels_across_the_board(
    store: Arc<InMemoryRecordStore>,
    alice: UserRef,
    bob: UserRef,
) {
    let service = client(Arc::clone(&store), quick_retry());
    service.initialize().await.expect("board initializes");
    let todo = service.create_column("To Do").await.expect("todo created");
    let doing = service.create_column("Doing").await.expect("doing created");
    let done = service.create_column("Done").await.expect("done created");
    let task = service
        .create_task(todo.id(), NewTask::new("Release 1.0"), &alice)
        .await
        .expect("task created");
    let resources = service.resources();

    resources
        .add_comment(todo.id(), task.id(), NewComment::text("Kicking off"), &alice)
        .await
        .expect("comment posted");
    resources
        .add_label(todo.id(), task.id(), "release", &alice)
        .await
        .expect("label added");

    for (from, to) in [(&todo, &doing), (&doing, &done)] {
        let board = service.board().await.expect("read").expect("board");
        let mut placement = board.placement();
        let moving = placement
            .get_mut(from.id())
            .and_then(Vec::pop)
            .expect("task in source column");
        placement.get_mut(to.id()).expect("target listed").push(moving);
        service
            .move_tasks(placement, &bob)
            .await
            .expect("move accepted");
    }

    let finished = service
        .update_task(
            done.id(),
            task.id(),
            TaskPatch::default().with_description("Shipped"),
            &bob,
        )
        .await
        .expect("update in final column");
    assert_eq!(finished.status(), done.id());
    assert_eq!(finished.comments().len(), 1);
    assert!(finished.labels().contains("release"));
    assert_eq!(finished.updated_by(), "bob");

    let reordered: Vec<Column> = vec![done.clone(), doing.clone(), todo.clone()];
    service
        .move_columns(reordered.iter().map(|column| column.id().clone()).collect())
        .await
        .expect("columns reordered");
    let board = service.board().await.expect("read").expect("board");
    assert_eq!(board.columns(), reordered.as_slice());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deleting_a_column_releases_every_owned_blob(
    store: Arc<InMemoryRecordStore>,
    alice: UserRef,
) {
    let storage = Arc::new(InMemoryBlobStorage::new());
    let service = BoardService::new(
        Arc::clone(&store),
        Arc::clone(&storage),
        Arc::new(DefaultClock),
        BoardConfig::default(),
    );
    service.initialize().await.expect("board initializes");
    let column = service.create_column("Archive").await.expect("column created");
    let resources = service.resources();
    for name in ["a", "b", "c"] {
        let task = service
            .create_task(column.id(), NewTask::new(format!("Task {name}")), &alice)
            .await
            .expect("task created");
        resources
            .add_attachment(
                column.id(),
                task.id(),
                AttachmentUpload::new(format!("{name}.txt"), "text/plain", name.as_bytes().to_vec()),
                &alice,
            )
            .await
            .expect("attachment added");
        resources
            .add_image_comment(
                column.id(),
                task.id(),
                AttachmentUpload::new(format!("{name}.png"), "image/png", vec![1]),
                None,
                &alice,
            )
            .await
            .expect("image comment posted");
    }
    assert_eq!(storage.blob_count().expect("count"), 6);

    let report = service
        .delete_column(column.id())
        .await
        .expect("column deleted");

    assert!(report.is_clean());
    assert_eq!(report.released.len(), 6);
    assert_eq!(storage.blob_count().expect("count"), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn operations_resume_after_transport_outage(
    store: Arc<InMemoryRecordStore>,
    alice: UserRef,
) {
    let service = client(Arc::clone(&store), quick_retry());
    service.initialize().await.expect("board initializes");
    let column = service.create_column("To Do").await.expect("column created");

    store.fail_requests("offline").expect("outage installed");
    let failed = service
        .create_task(column.id(), NewTask::new("Queued"), &alice)
        .await;
    assert_eq!(
        failed.map_err(|err| err.kind()).err(),
        Some(BoardErrorKind::TransportFailure)
    );

    store.restore_requests().expect("outage cleared");
    service
        .create_task(column.id(), NewTask::new("Queued"), &alice)
        .await
        .expect("task created after outage");
    let board = service.board().await.expect("read").expect("board");
    assert_eq!(board.task_count(), 1);
}
