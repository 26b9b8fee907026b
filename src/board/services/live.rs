//! Live projection of the board record.
//!
//! A [`LiveBoard`] owns a background task that decodes every record pushed
//! by the store into a [`BoardProjection`]. Dropping the handle stops the
//! task and releases the store subscription.

use crate::board::{
    domain::{Board, Column, MalformedBoardError, TaskLayout},
    ports::{RecordFeed, RecordKey, RecordStoreError, RecordSubscription, RecordVersion},
};
use std::sync::Arc;
use thiserror::Error;
use tokio::{runtime::Handle, sync::watch, task::JoinHandle};
use tracing::{Instrument, debug, debug_span, warn};

/// Errors surfaced through a live board subscription.
#[derive(Debug, Clone, Error)]
pub enum BoardFeedError {
    /// The store reported a failure on the subscription.
    #[error(transparent)]
    Store(#[from] RecordStoreError),

    /// A pushed record could not be decoded as a board.
    #[error("board record is malformed: {0}")]
    InvalidState(#[from] MalformedBoardError),

    /// The store closed the subscription.
    #[error("board subscription closed")]
    Closed,
}

/// Point-in-time view of the board as seen by a subscriber.
#[derive(Debug, Clone)]
pub struct BoardProjection {
    board: Option<Arc<Board>>,
    version: Option<RecordVersion>,
    loading: bool,
    error: Option<BoardFeedError>,
}

impl BoardProjection {
    const fn loading() -> Self {
        Self {
            board: None,
            version: None,
            loading: true,
            error: None,
        }
    }

    /// Returns the latest decoded board, if the record exists.
    #[must_use]
    pub fn board(&self) -> Option<&Board> {
        self.board.as_deref()
    }

    /// Returns a shared handle to the latest decoded board.
    #[must_use]
    pub fn shared_board(&self) -> Option<Arc<Board>> {
        self.board.clone()
    }

    /// Returns the ordered columns, empty while loading or when absent.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        self.board().map_or(&[][..], Board::columns)
    }

    /// Returns the task layout of the latest board.
    #[must_use]
    pub fn tasks(&self) -> Option<&TaskLayout> {
        self.board().map(Board::tasks)
    }

    /// Returns the version of the latest record delivered.
    #[must_use]
    pub const fn version(&self) -> Option<RecordVersion> {
        self.version
    }

    /// Returns `true` until the first record has been delivered.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// Returns the most recent subscription failure.
    #[must_use]
    pub const fn error(&self) -> Option<&BoardFeedError> {
        self.error.as_ref()
    }
}

/// Subscription handle yielding board projections as the record changes.
#[derive(Debug)]
pub struct LiveBoard {
    receiver: watch::Receiver<BoardProjection>,
    worker: JoinHandle<()>,
}

impl LiveBoard {
    pub(crate) fn spawn(
        subscription: RecordSubscription,
        key: &RecordKey,
        runtime: &Handle,
    ) -> Self {
        let (sender, receiver) = watch::channel(BoardProjection::loading());
        let span = debug_span!("board_subscription", key = %key);
        let worker = runtime.spawn(forward(subscription, sender).instrument(span));
        Self { receiver, worker }
    }

    /// Returns the latest projection without waiting.
    #[must_use]
    pub fn snapshot(&self) -> BoardProjection {
        self.receiver.borrow().clone()
    }

    /// Waits for the next projection.
    ///
    /// # Errors
    ///
    /// Returns the feed error carried by the projection, or
    /// [`BoardFeedError::Closed`] once no further projections can arrive.
    pub async fn changed(&mut self) -> Result<BoardProjection, BoardFeedError> {
        self.receiver
            .changed()
            .await
            .map_err(|_| BoardFeedError::Closed)?;
        let projection = self.receiver.borrow_and_update().clone();
        match projection.error.clone() {
            Some(err) => Err(err),
            None => Ok(projection),
        }
    }

    /// Waits until a projection satisfies `predicate`, checking the current
    /// one first.
    ///
    /// # Errors
    ///
    /// Same as [`LiveBoard::changed`].
    pub async fn wait_until<P>(&mut self, mut predicate: P) -> Result<BoardProjection, BoardFeedError>
    where
        P: FnMut(&BoardProjection) -> bool + Send,
    {
        let mut projection = self.receiver.borrow_and_update().clone();
        loop {
            if let Some(err) = projection.error.clone() {
                return Err(err);
            }
            if predicate(&projection) {
                return Ok(projection);
            }
            projection = self.changed().await?;
        }
    }

    /// Stops delivery and releases the store subscription.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for LiveBoard {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

async fn forward(mut subscription: RecordSubscription, sender: watch::Sender<BoardProjection>) {
    let mut feed = subscription.current();
    loop {
        if publish(&sender, feed) || sender.is_closed() {
            break;
        }
        match subscription.changed().await {
            Some(next) => feed = next,
            None => {
                sender.send_modify(|projection| {
                    projection.loading = false;
                    projection.error = Some(BoardFeedError::Closed);
                });
                break;
            }
        }
    }
    debug!("board subscription stopped");
}

/// Publishes one feed item. Returns `true` when the feed has ended.
fn publish(sender: &watch::Sender<BoardProjection>, feed: RecordFeed) -> bool {
    match feed {
        Ok(Some(record)) => match Board::from_record(&record.value) {
            Ok(board) => {
                sender.send_replace(BoardProjection {
                    board: Some(Arc::new(board)),
                    version: Some(record.version),
                    loading: false,
                    error: None,
                });
                false
            }
            Err(err) => {
                warn!(version = %record.version, error = %err, "pushed board record is malformed");
                sender.send_modify(|projection| {
                    projection.loading = false;
                    projection.version = Some(record.version);
                    projection.error = Some(BoardFeedError::InvalidState(err));
                });
                false
            }
        },
        Ok(None) => {
            sender.send_replace(BoardProjection {
                board: None,
                version: None,
                loading: false,
                error: None,
            });
            false
        }
        Err(err) => {
            warn!(error = %err, "board subscription failed");
            sender.send_modify(|projection| {
                projection.loading = false;
                projection.error = Some(BoardFeedError::Store(err));
            });
            true
        }
    }
}
