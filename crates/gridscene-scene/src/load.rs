use gridscene_core::{OptionsError, QueryError};
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use uuid::Uuid;

use crate::layer::LayerHandle;

#[derive(Error, Debug, PartialEq)]
pub enum LoadError {
    #[error("Scene has been disposed")]
    Disposed,

    #[error("Invalid load options: {0}")]
    Options(#[from] OptionsError),
}

/// How a load request ended.
#[derive(Debug)]
pub enum LoadOutcome {
    /// The grid was projected and assigned to the layer.
    Loaded,
    /// The query failed; the layer's resources were released.
    Failed(QueryError),
    /// The caller cancelled the load before it completed.
    Cancelled,
    /// The scene was cleared or disposed while the query ran; the result was dropped.
    Stale,
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded)
    }
}

/// Returned by `SceneController::load` before the query resolves.
///
/// Holds the (still empty) layer, lets the caller cancel the query, and
/// resolves to the final outcome.
#[derive(Debug)]
pub struct LoadHandle {
    id: Uuid,
    layer: LayerHandle,
    abort: AbortHandle,
    outcome: oneshot::Receiver<LoadOutcome>,
}

impl LoadHandle {
    pub(crate) fn new(
        id: Uuid,
        layer: LayerHandle,
        abort: AbortHandle,
        outcome: oneshot::Receiver<LoadOutcome>,
    ) -> Self {
        Self {
            id,
            layer,
            abort,
            outcome,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn layer(&self) -> &LayerHandle {
        &self.layer
    }

    /// Abort the query. Has no effect once the load has completed.
    pub fn cancel(&self) {
        log::debug!("load {} cancelled", self.id);
        self.abort.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }

    /// Wait for the load to end. An aborted task resolves to `Cancelled`.
    pub async fn outcome(self) -> LoadOutcome {
        self.outcome.await.unwrap_or(LoadOutcome::Cancelled)
    }
}
