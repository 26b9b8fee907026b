//! Versioned access to the board record.

use super::{BoardConfig, BoardServiceError, BoardServiceResult};
use crate::board::{
    domain::{Board, MalformedBoardError},
    ports::{FieldUpdate, RecordStore, RecordStoreError, RecordVersion},
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Shared handle used by every board service to read and write the board
/// record.
pub(crate) struct BoardHandle<S> {
    store: Arc<S>,
    config: Arc<BoardConfig>,
}

impl<S> Clone for BoardHandle<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S: RecordStore> BoardHandle<S> {
    pub(crate) fn new(store: Arc<S>, config: BoardConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    pub(crate) fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub(crate) fn store(&self) -> &S {
        &self.store
    }

    /// Reads the board, or `None` when it has never been written.
    pub(crate) async fn read(&self) -> BoardServiceResult<Option<(Board, RecordVersion)>> {
        let Some(record) = self.store.get(&self.config.board_key).await? else {
            return Ok(None);
        };
        let board = Board::from_record(&record.value)?;
        Ok(Some((board, record.version)))
    }

    /// Reads the board, failing when it does not exist.
    pub(crate) async fn load(&self) -> BoardServiceResult<(Board, RecordVersion)> {
        self.read()
            .await?
            .ok_or_else(|| BoardServiceError::BoardMissing(self.config.board_key.clone()))
    }

    /// Runs a read-modify-write cycle guarded by the record version.
    ///
    /// `mutate` sees a fresh board on every attempt. A domain error aborts
    /// the transaction without writing; a lost version race re-runs it after
    /// a backoff until the retry policy is exhausted.
    pub(crate) async fn transact<T, F>(
        &self,
        operation: &'static str,
        mut mutate: F,
    ) -> BoardServiceResult<T>
    where
        F: FnMut(&mut Board) -> BoardServiceResult<T> + Send,
        T: Send,
    {
        let retry = &self.config.retry;
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let (mut board, version) = self.load().await?;
            let outcome = mutate(&mut board)?;
            let record = board.to_record()?;
            match self
                .store
                .set_if_version(&self.config.board_key, record, version)
                .await
            {
                Ok(written) => {
                    if attempt > 1 {
                        debug!(operation, attempt, version = %written, "board write committed after retry");
                    }
                    return Ok(outcome);
                }
                Err(err) if err.is_conflict() && attempt < retry.max_attempts => {
                    let delay = retry.backoff_for(attempt);
                    debug!(operation, attempt, ?delay, error = %err, "board write conflicted, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(err) if err.is_conflict() => {
                    warn!(operation, attempts = attempt, "board write abandoned after repeated conflicts");
                    return Err(BoardServiceError::RetriesExhausted {
                        operation,
                        attempts: attempt,
                    });
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Applies path-scoped updates to the existing board record.
    pub(crate) async fn merge(&self, updates: Vec<FieldUpdate>) -> BoardServiceResult<RecordVersion> {
        self.store
            .merge(&self.config.board_key, updates)
            .await
            .map_err(|err| match err {
                RecordStoreError::MissingRecord(key) => BoardServiceError::BoardMissing(key),
                other => BoardServiceError::Store(other),
            })
    }
}

/// Serializes a board value for a path-scoped update.
pub(crate) fn encode<T: Serialize>(value: &T) -> BoardServiceResult<Value> {
    serde_json::to_value(value)
        .map_err(|err| BoardServiceError::InvalidState(MalformedBoardError::Encode(err.to_string())))
}
