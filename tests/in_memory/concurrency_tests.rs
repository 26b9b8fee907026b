//! Concurrent writers against a single board record.

use std::sync::Arc;

use boardsync::board::{
    adapters::memory::InMemoryRecordStore,
    domain::{ColumnId, NewComment, NewTask, Priority, TaskId, TaskPatch, UserRef},
    services::{BoardErrorKind, BoardServiceError, ConflictRetryConfig},
};
use rstest::rstest;

use super::helpers::{GatedStore, MemoryBoardService, alice, bob, client, quick_retry};

struct Contended {
    store: Arc<GatedStore>,
    first: MemoryBoardService<GatedStore>,
    second: MemoryBoardService<GatedStore>,
    column: ColumnId,
    task: TaskId,
}

async fn contended(retry: ConflictRetryConfig, actor: &UserRef) -> Contended {
    let store = Arc::new(GatedStore::new(InMemoryRecordStore::new(), 2));
    let first = client(Arc::clone(&store), retry.clone());
    let second = client(Arc::clone(&store), retry);
    first.initialize().await.expect("board initializes");
    let column = first
        .create_column("Doing")
        .await
        .expect("column created")
        .id()
        .clone();
    let task = first
        .create_task(
            &column,
            NewTask::new("Shared task").with_description("original"),
            actor,
        )
        .await
        .expect("task created")
        .id();
    Contended {
        store,
        first,
        second,
        column,
        task,
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_task_edits_are_both_kept(alice: UserRef, bob: UserRef) {
    let board = contended(quick_retry(), &alice).await;
    board.store.arm(2);

    let (renamed, reprioritized) = tokio::join!(
        board.first.update_task(
            &board.column,
            board.task,
            TaskPatch::default().with_name("Renamed by alice"),
            &alice,
        ),
        board.second.update_task(
            &board.column,
            board.task,
            TaskPatch::default().with_priority(Priority::High),
            &bob,
        ),
    );
    renamed.expect("alice's edit commits");
    reprioritized.expect("bob's edit commits");

    let task = board
        .first
        .find_task(board.task)
        .await
        .expect("lookup succeeds")
        .expect("task exists");
    assert_eq!(task.name(), "Renamed by alice");
    assert_eq!(task.priority(), Priority::High);
    assert_eq!(task.description(), "original");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_subtasks_are_both_kept(alice: UserRef, bob: UserRef) {
    let board = contended(quick_retry(), &alice).await;
    let first_resources = board.first.resources();
    let second_resources = board.second.resources();
    board.store.arm(2);

    let (left, right) = tokio::join!(
        first_resources.add_subtask(&board.column, board.task, "Write tests", &alice),
        second_resources.add_subtask(&board.column, board.task, "Update docs", &bob),
    );
    left.expect("first subtask added");
    right.expect("second subtask added");

    let task = board
        .first
        .find_task(board.task)
        .await
        .expect("lookup succeeds")
        .expect("task exists");
    let mut names: Vec<&str> = task
        .subtasks()
        .iter()
        .map(|subtask| subtask.name.as_str())
        .collect();
    names.sort_unstable();
    assert_eq!(names, vec!["Update docs", "Write tests"]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn losing_writer_without_retries_reports_contention(alice: UserRef, bob: UserRef) {
    let board = contended(ConflictRetryConfig::single_attempt(), &alice).await;
    board.store.arm(2);

    let (left, right) = tokio::join!(
        board.first.update_task(
            &board.column,
            board.task,
            TaskPatch::default().with_description("from alice"),
            &alice,
        ),
        board.second.update_task(
            &board.column,
            board.task,
            TaskPatch::default().with_description("from bob"),
            &bob,
        ),
    );

    let outcomes = [left.is_ok(), right.is_ok()];
    assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
    let failure = left.err().or_else(|| right.err()).expect("one writer lost");
    assert!(matches!(
        failure,
        BoardServiceError::RetriesExhausted { attempts: 1, .. }
    ));
    assert_eq!(failure.kind(), BoardErrorKind::Contention);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_task_creation_appends_both(alice: UserRef, bob: UserRef) {
    let board = contended(quick_retry(), &alice).await;
    board.store.arm(2);

    let (left, right) = tokio::join!(
        board
            .first
            .create_task(&board.column, NewTask::new("From alice"), &alice),
        board
            .second
            .create_task(&board.column, NewTask::new("From bob"), &bob),
    );
    let left = left.expect("alice's task created");
    let right = right.expect("bob's task created");

    let stored = board
        .first
        .board()
        .await
        .expect("read succeeds")
        .expect("board exists");
    let ids: Vec<TaskId> = stored
        .tasks_in(&board.column)
        .expect("task list")
        .iter()
        .map(|task| task.id())
        .collect();
    assert_eq!(ids.len(), 3);
    assert!(ids.contains(&left.id()) && ids.contains(&right.id()));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_column_creation_keeps_both(alice: UserRef) {
    let board = contended(quick_retry(), &alice).await;

    let (left, right) = tokio::join!(
        board.first.create_column("Review"),
        board.second.create_column("Done"),
    );
    let left = left.expect("first column created");
    let right = right.expect("second column created");

    let stored = board
        .second
        .board()
        .await
        .expect("read succeeds")
        .expect("board exists");
    assert_eq!(stored.columns().len(), 3);
    assert!(stored.tasks_in(left.id()).is_some());
    assert!(stored.tasks_in(right.id()).is_some());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_delete_and_edit_do_not_resurrect_task(alice: UserRef, bob: UserRef) {
    let board = contended(quick_retry(), &alice).await;
    board.store.arm(2);

    let (deleted, edited) = tokio::join!(
        board.first.delete_task(&board.column, board.task),
        board.second.update_task(
            &board.column,
            board.task,
            TaskPatch::default().with_name("Edited"),
            &bob,
        ),
    );

    let stored = board
        .first
        .find_task(board.task)
        .await
        .expect("lookup succeeds");
    match (deleted, edited) {
        (Ok(_), Err(err)) => {
            assert_eq!(err.kind(), BoardErrorKind::NotFound);
            assert!(stored.is_none());
        }
        (Ok(_), Ok(_)) => assert!(stored.is_none()),
        (Err(err), _) => panic!("delete failed: {err}"),
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_edits_to_neighbouring_tasks_are_both_kept(alice: UserRef, bob: UserRef) {
    let board = contended(quick_retry(), &alice).await;
    let neighbour = board
        .first
        .create_task(
            &board.column,
            NewTask::new("Neighbour task").with_description("original"),
            &alice,
        )
        .await
        .expect("neighbour created")
        .id();
    board.store.arm(2);

    let (left, right) = tokio::join!(
        board.first.update_task(
            &board.column,
            board.task,
            TaskPatch::default().with_description("edited by alice"),
            &alice,
        ),
        board.second.update_task(
            &board.column,
            neighbour,
            TaskPatch::default().with_description("edited by bob"),
            &bob,
        ),
    );
    left.expect("alice's edit commits");
    right.expect("bob's edit commits");

    let stored = board
        .second
        .board()
        .await
        .expect("read succeeds")
        .expect("board exists");
    let shared = stored.task(&board.column, board.task).expect("shared task");
    let other = stored.task(&board.column, neighbour).expect("neighbour task");
    assert_eq!(shared.description(), "edited by alice");
    assert_eq!(shared.updated_by(), "alice");
    assert_eq!(other.description(), "edited by bob");
    assert_eq!(other.updated_by(), "bob");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn moving_from_a_stale_snapshot_keeps_newer_task_edits(alice: UserRef, bob: UserRef) {
    let board = contended(quick_retry(), &alice).await;
    let done = board
        .first
        .create_column("Done")
        .await
        .expect("column created")
        .id()
        .clone();
    let stale = board
        .second
        .board()
        .await
        .expect("read succeeds")
        .expect("board exists");

    board
        .first
        .update_task(
            &board.column,
            board.task,
            TaskPatch::default().with_name("Renamed by alice"),
            &alice,
        )
        .await
        .expect("rename commits");
    board
        .first
        .resources()
        .add_comment(&board.column, board.task, NewComment::text("hello"), &alice)
        .await
        .expect("comment posted");

    let mut placement = stale.placement();
    let moving = placement
        .get_mut(&board.column)
        .and_then(Vec::pop)
        .expect("task in source column");
    placement.get_mut(&done).expect("done listed").push(moving);
    board
        .second
        .move_tasks(placement, &bob)
        .await
        .expect("move accepted");

    let stored = board
        .first
        .board()
        .await
        .expect("read succeeds")
        .expect("board exists");
    let moved = stored.task(&done, board.task).expect("task moved to done");
    assert_eq!(moved.name(), "Renamed by alice");
    assert_eq!(moved.comments().len(), 1);
    assert_eq!(moved.status(), &done);
    assert_eq!(moved.updated_by(), "bob");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn reordering_from_a_stale_snapshot_keeps_newer_renames(alice: UserRef) {
    let board = contended(quick_retry(), &alice).await;
    let done = board
        .first
        .create_column("Done")
        .await
        .expect("column created");
    let mut stale_order = board
        .second
        .board()
        .await
        .expect("read succeeds")
        .expect("board exists")
        .column_order();
    stale_order.reverse();

    board
        .first
        .update_column(&board.column, "Renamed")
        .await
        .expect("rename commits");
    board
        .second
        .move_columns(stale_order)
        .await
        .expect("reorder accepted");

    let stored = board
        .first
        .board()
        .await
        .expect("read succeeds")
        .expect("board exists");
    let names: Vec<&str> = stored.columns().iter().map(|column| column.name()).collect();
    assert_eq!(names, vec![done.name(), "Renamed"]);
}
