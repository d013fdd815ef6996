//! Runs rebuilds in response to change batches.
//!
//! At most one rebuild is in flight. A batch arriving while a rebuild runs
//! cancels it, folds its paths into the new batch and starts over, so the
//! result always reflects the latest state of the files.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use sitepack_bundler::{BuildError, BuildReport, BuildSession, CancelToken};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_stream::{Stream, StreamExt};
use tracing::debug;

use super::debounce::ChangeBatch;

/// Reacts to rebuilds. Cancelled runs are never reported.
pub trait BuildHandler: Send + Sync + 'static {
    fn started(&self, batch: &ChangeBatch, root: &Path);

    fn finished(&self, result: &Result<BuildReport, BuildError>, session: &BuildSession);
}

struct InFlight {
    handle: JoinHandle<()>,
    cancel: CancelToken,
    batch: ChangeBatch,
}

impl InFlight {
    /// Signal the run and wait for it to stop at its next checkpoint.
    ///
    /// The task is not aborted: a run that has started writing outputs must
    /// finish and commit, or the session would lose track of those files.
    async fn cancel(self) -> ChangeBatch {
        self.cancel.cancel();
        let _ = self.handle.await;
        self.batch
    }
}

pub struct Coordinator<H> {
    session: Arc<Mutex<BuildSession>>,
    handler: Arc<H>,
}

impl<H: BuildHandler> Coordinator<H> {
    pub fn new(session: BuildSession, handler: H) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            handler: Arc::new(handler),
        }
    }

    pub fn session(&self) -> Arc<Mutex<BuildSession>> {
        Arc::clone(&self.session)
    }

    /// Build immediately, reporting to the handler. Returns whether the
    /// build succeeded.
    pub async fn build_now(&self) -> bool {
        let mut session = self.session.lock().await;
        let result = session.build(&CancelToken::new()).await;
        self.handler.finished(&result, &session);
        result.is_ok()
    }

    /// Rebuild for every batch until the stream ends or `shutdown` resolves.
    pub async fn run<S, F>(self, batches: S, shutdown: F)
    where
        S: Stream<Item = ChangeBatch>,
        F: Future<Output = ()>,
    {
        tokio::pin!(batches);
        tokio::pin!(shutdown);
        let mut in_flight: Option<InFlight> = None;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    if let Some(previous) = in_flight.take() {
                        previous.cancel().await;
                    }
                    break;
                }
                next = batches.next() => {
                    let Some(mut batch) = next else {
                        if let Some(previous) = in_flight.take() {
                            let _ = previous.handle.await;
                        }
                        break;
                    };
                    if let Some(previous) = in_flight.take() {
                        if !previous.handle.is_finished() {
                            debug!(paths = previous.batch.len(), "superseding in-flight rebuild");
                            batch.merge(previous.cancel().await);
                        }
                    }
                    in_flight = Some(self.spawn(batch));
                }
            }
        }
    }

    fn spawn(&self, batch: ChangeBatch) -> InFlight {
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let session = Arc::clone(&self.session);
        let handler = Arc::clone(&self.handler);
        let changed = batch.clone();

        let handle = tokio::spawn(async move {
            let mut session = session.lock().await;
            if token.is_cancelled() {
                return;
            }
            handler.started(&changed, session.root());
            let result = session.build(&token).await;
            if matches!(&result, Err(err) if err.is_cancelled()) {
                return;
            }
            handler.finished(&result, &session);
        });

        InFlight { handle, cancel, batch }
    }
}
