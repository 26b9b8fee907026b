//! Given steps for board BDD scenarios.

use super::world::{BoardWorld, run_async, user};
use boardsync::board::domain::NewTask;
use eyre::WrapErr;
use rstest_bdd_macros::given;

#[given("an initialized empty board")]
fn initialized_board(world: &mut BoardWorld) -> Result<(), eyre::Report> {
    run_async(world.service.initialize()).wrap_err("initialize board")?;
    Ok(())
}

#[given(r#"a column named "{name}" exists"#)]
fn column_exists(world: &mut BoardWorld, name: String) -> Result<(), eyre::Report> {
    let column = run_async(world.service.create_column(&name)).wrap_err("create column")?;
    world.column = Some(column);
    Ok(())
}

#[given("the column holds {count:usize} tasks")]
fn column_holds_tasks(world: &mut BoardWorld, count: usize) -> Result<(), eyre::Report> {
    let column_id = world.column()?.id().clone();
    let actor = user("user-1");
    for index in 1..=count {
        run_async(world.service.create_task(
            &column_id,
            NewTask::new(format!("Task {index}")),
            &actor,
        ))
        .wrap_err("create task")?;
    }
    Ok(())
}

#[given(r#"a task named "{name}" exists in that column"#)]
fn task_exists(world: &mut BoardWorld, name: String) -> Result<(), eyre::Report> {
    let column_id = world.column()?.id().clone();
    let task = run_async(world.service.create_task(
        &column_id,
        NewTask::new(name),
        &user("user-1"),
    ))
    .wrap_err("create task")?;
    world.task = Some(task);
    Ok(())
}

#[given(r#"the board vocabulary does not contain "{label}""#)]
fn vocabulary_lacks_label(world: &mut BoardWorld, label: String) -> Result<(), eyre::Report> {
    let vocabulary = run_async(world.service.resources().label_vocabulary())
        .wrap_err("read label vocabulary")?;
    eyre::ensure!(
        !vocabulary.contains(&label),
        "vocabulary unexpectedly contains {label}"
    );
    Ok(())
}
