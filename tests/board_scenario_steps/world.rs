//! Shared world state for board BDD scenarios.

use std::sync::Arc;

use boardsync::board::{
    adapters::memory::{InMemoryBlobStorage, InMemoryRecordStore},
    domain::{Board, Column, Task, UserRef},
    services::{BoardConfig, BoardService, BoardServiceError, LabelAdded},
};
use chrono::{DateTime, Utc};
use mockable::DefaultClock;
use rstest::fixture;

/// Service type used by the BDD world.
pub type TestBoardService = BoardService<InMemoryRecordStore, InMemoryBlobStorage, DefaultClock>;

/// Scenario world for board behaviour tests.
pub struct BoardWorld {
    pub service: TestBoardService,
    pub column: Option<Column>,
    pub task: Option<Task>,
    pub task_requested_at: Option<DateTime<Utc>>,
    pub last_label_result: Option<Result<LabelAdded, BoardServiceError>>,
}

impl BoardWorld {
    /// Creates a world backed by fresh in-memory adapters.
    #[must_use]
    pub fn new() -> Self {
        let service = BoardService::new(
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(InMemoryBlobStorage::new()),
            Arc::new(DefaultClock),
            BoardConfig::default(),
        );
        Self {
            service,
            column: None,
            task: None,
            task_requested_at: None,
            last_label_result: None,
        }
    }

    /// Returns the column under test.
    ///
    /// # Errors
    ///
    /// Returns an error when no column was created earlier in the scenario.
    pub fn column(&self) -> Result<&Column, eyre::Report> {
        self.column
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing column in scenario world"))
    }

    /// Returns the task under test.
    ///
    /// # Errors
    ///
    /// Returns an error when no task was created earlier in the scenario.
    pub fn task(&self) -> Result<&Task, eyre::Report> {
        self.task
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing task in scenario world"))
    }

    /// Reads the current board.
    ///
    /// # Errors
    ///
    /// Returns an error when the board cannot be read or does not exist.
    pub fn board(&self) -> Result<Board, eyre::Report> {
        run_async(self.service.board())
            .map_err(|err| eyre::eyre!("board read failed: {err}"))?
            .ok_or_else(|| eyre::eyre!("board has not been initialized"))
    }
}

impl Default for BoardWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the acting user for a scenario step.
#[must_use]
pub fn user(id: &str) -> UserRef {
    UserRef::new(id, format!("User {id}"))
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> BoardWorld {
    BoardWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
