//! Then steps for board BDD scenarios.

use super::world::{BoardWorld, run_async};
use boardsync::board::domain::{Column, Priority};
use chrono::TimeDelta;
use eyre::WrapErr;
use rstest_bdd_macros::then;

#[then(r#"the board has exactly one column named "{name}""#)]
fn exactly_one_column(world: &BoardWorld, name: String) -> Result<(), eyre::Report> {
    let board = world.board()?;
    let names: Vec<&str> = board.columns().iter().map(Column::name).collect();
    eyre::ensure!(names == vec![name.as_str()], "unexpected columns {names:?}");
    Ok(())
}

#[then("the column has an empty task list")]
fn column_task_list_empty(world: &BoardWorld) -> Result<(), eyre::Report> {
    let board = world.board()?;
    let column_id = world.column()?.id();
    let tasks = board
        .tasks_in(column_id)
        .ok_or_else(|| eyre::eyre!("no task list for {column_id}"))?;
    eyre::ensure!(tasks.is_empty(), "expected no tasks, found {}", tasks.len());
    Ok(())
}

#[then(r#"the column holds exactly one task named "{name}""#)]
fn exactly_one_task(world: &BoardWorld, name: String) -> Result<(), eyre::Report> {
    let board = world.board()?;
    let column_id = world.column()?.id();
    let tasks = board
        .tasks_in(column_id)
        .ok_or_else(|| eyre::eyre!("no task list for {column_id}"))?;
    eyre::ensure!(tasks.len() == 1, "expected one task, found {}", tasks.len());
    let task = tasks
        .first()
        .ok_or_else(|| eyre::eyre!("expected at least one task"))?;
    eyre::ensure!(task.name() == name, "unexpected task name {}", task.name());
    Ok(())
}

#[then("the task has medium priority and a 24 hour due window")]
fn task_defaults(world: &BoardWorld) -> Result<(), eyre::Report> {
    let task = world.task()?;
    let requested_at = world
        .task_requested_at
        .ok_or_else(|| eyre::eyre!("missing request time in scenario world"))?;
    eyre::ensure!(task.priority() == Priority::Medium, "priority was not defaulted");
    let due = task.due();
    eyre::ensure!(
        due.end() - due.start() == TimeDelta::hours(24),
        "due window is not 24 hours"
    );
    eyre::ensure!(
        due.start() >= requested_at && due.start() == task.created_at(),
        "due window does not start at creation"
    );
    Ok(())
}

#[then("the task status is that column")]
fn task_status_is_column(world: &BoardWorld) -> Result<(), eyre::Report> {
    let board = world.board()?;
    let column_id = world.column()?.id();
    let task_id = world.task()?.id();
    let stored = board
        .task(column_id, task_id)
        .wrap_err("task missing from its column")?;
    eyre::ensure!(stored.status() == column_id, "status is {}", stored.status());
    Ok(())
}

#[then("the board has no entry for the column in columns or tasks")]
fn column_fully_removed(world: &BoardWorld) -> Result<(), eyre::Report> {
    let board = world.board()?;
    let column_id = world.column()?.id();
    eyre::ensure!(board.column(column_id).is_none(), "column still listed");
    eyre::ensure!(board.tasks_in(column_id).is_none(), "task list still present");
    eyre::ensure!(board.task_count() == 0, "orphaned tasks remain");
    Ok(())
}

#[then(r#"the task carries the label "{label}""#)]
fn task_has_label(world: &BoardWorld, label: String) -> Result<(), eyre::Report> {
    let outcome = world
        .last_label_result
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing label result in scenario world"))?
        .as_ref()
        .map_err(|err| eyre::eyre!("adding label failed: {err}"))?;
    eyre::ensure!(outcome.attached, "label was reported as already attached");
    let task = run_async(world.service.find_task(world.task()?.id()))
        .wrap_err("find task")?
        .ok_or_else(|| eyre::eyre!("task vanished"))?;
    eyre::ensure!(task.labels().contains(&label), "task labels {:?}", task.labels());
    Ok(())
}

#[then(r#"the board vocabulary contains "{label}""#)]
fn vocabulary_has_label(world: &BoardWorld, label: String) -> Result<(), eyre::Report> {
    let vocabulary = run_async(world.service.resources().label_vocabulary())
        .wrap_err("read label vocabulary")?;
    eyre::ensure!(vocabulary.contains(&label), "vocabulary {vocabulary:?}");
    Ok(())
}
