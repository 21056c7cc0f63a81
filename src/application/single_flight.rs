// Per-key request coalescing
use crate::domain::error::ScrapeError;
use crate::domain::model::RequestKey;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;

type SharedResult<T> = Shared<BoxFuture<'static, Result<T, ScrapeError>>>;

enum Registration<T> {
    Joined(SharedResult<T>),
    Leader {
        id: u64,
        tx: oneshot::Sender<Result<T, ScrapeError>>,
        result: SharedResult<T>,
    },
}

struct InFlight<T> {
    /// Distinguishes successive operations registered under the same key.
    id: u64,
    result: SharedResult<T>,
}

/// Ensures at most one operation per [`RequestKey`] runs at a time.
///
/// The first caller for a key registers its operation and spawns it onto the
/// runtime; every caller that arrives while it is running awaits the same
/// result. The entry is removed as soon as the operation finishes, before the
/// result is handed out, so a later call always starts fresh work.
///
/// The operation runs on its own task: callers that stop waiting do not
/// cancel it. Only live operations are tracked, which keeps the map bounded
/// by the number of concurrently requested keys.
pub struct SingleFlight<T> {
    in_flight: Arc<DashMap<RequestKey, InFlight<T>>>,
    next_id: Arc<AtomicU64>,
}

impl<T> Clone for SingleFlight<T> {
    fn clone(&self) -> Self {
        Self {
            in_flight: Arc::clone(&self.in_flight),
            next_id: Arc::clone(&self.next_id),
        }
    }
}

impl<T> Default for SingleFlight<T> {
    fn default() -> Self {
        Self {
            in_flight: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `op` for `key`, or join the run already in progress.
    ///
    /// `op` is only invoked when no operation is registered for the key.
    /// Errors reach every waiter unchanged.
    pub async fn run<F, Fut>(&self, key: &RequestKey, op: F) -> Result<T, ScrapeError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ScrapeError>> + Send + 'static,
    {
        // The shard lock held by `entry` makes check-then-register atomic.
        let registration = match self.in_flight.entry(key.clone()) {
            Entry::Occupied(entry) => {
                tracing::debug!(key = %key, "joining in-flight operation");
                Registration::Joined(entry.get().result.clone())
            }
            Entry::Vacant(entry) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let (tx, rx) = oneshot::channel();
                let result = rx
                    .map(|received| {
                        received.unwrap_or_else(|_| {
                            Err(ScrapeError::Interrupted(
                                "operation ended without a result".to_string(),
                            ))
                        })
                    })
                    .boxed()
                    .shared();
                entry.insert(InFlight {
                    id,
                    result: result.clone(),
                });
                Registration::Leader { id, tx, result }
            }
        };

        let shared = match registration {
            Registration::Joined(shared) => shared,
            Registration::Leader { id, tx, result } => {
                tracing::debug!(key = %key, "starting operation");
                let fut = match std::panic::catch_unwind(AssertUnwindSafe(op)) {
                    Ok(fut) => fut,
                    Err(panic) => {
                        self.in_flight.remove_if(key, |_, entry| entry.id == id);
                        std::panic::resume_unwind(panic);
                    }
                };
                let in_flight = Arc::clone(&self.in_flight);
                let key = key.clone();
                tokio::spawn(async move {
                    let outcome = match AssertUnwindSafe(fut).catch_unwind().await {
                        Ok(outcome) => outcome,
                        Err(_) => {
                            tracing::error!(key = %key, "operation panicked");
                            Err(ScrapeError::Interrupted("operation panicked".to_string()))
                        }
                    };
                    in_flight.remove_if(&key, |_, entry| entry.id == id);
                    // Nobody may be listening any more; that is fine.
                    let _ = tx.send(outcome);
                });
                result
            }
        };

        shared.await
    }

    /// Number of operations currently running.
    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }

    pub fn is_in_flight(&self, key: &RequestKey) -> bool {
        self.in_flight.contains_key(key)
    }
}
