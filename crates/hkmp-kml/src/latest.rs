//! Keeps the result of the most recent load and aborts superseded ones.
//!
//! A load for a different URL aborts every load in flight, including repeat
//! loads of the same URL. Aborted loads never touch the committed snapshot;
//! of the loads that finish, the last one to complete wins.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{AbortHandle, Abortable};
use hkmp_core::ParkingPoint;

use crate::loader::KmlLoader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Committed { count: usize },
    Cancelled,
}

struct InFlight {
    id: u64,
    url: String,
    abort: AbortHandle,
    cancelled: Arc<AtomicBool>,
}

impl InFlight {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.abort.abort();
    }
}

#[derive(Default)]
struct LoadState {
    next_id: u64,
    in_flight: Vec<InFlight>,
    committed_url: Option<String>,
    points: Option<Arc<[ParkingPoint]>>,
}

pub struct LatestLoad {
    loader: Arc<KmlLoader>,
    state: Mutex<LoadState>,
}

impl LatestLoad {
    #[must_use]
    pub fn new(loader: Arc<KmlLoader>) -> Self {
        Self {
            loader,
            state: Mutex::new(LoadState::default()),
        }
    }

    /// Loads `url` and commits the result unless a newer request for a
    /// different URL cancels it first.
    pub async fn load(&self, url: &str) -> LoadOutcome {
        let (abort, registration) = AbortHandle::new_pair();
        let cancelled = Arc::new(AtomicBool::new(false));

        let id = {
            let mut state = self.lock();
            if state.in_flight.iter().any(|f| f.url != url) {
                for previous in state.in_flight.drain(..) {
                    tracing::info!(previous = %previous.url, next = url, "superseding in-flight KML load");
                    previous.cancel();
                }
            } else if !state.in_flight.is_empty() {
                tracing::debug!(url, "repeat load for in-flight source");
            }
            state.next_id += 1;
            let id = state.next_id;
            state.in_flight.push(InFlight {
                id,
                url: url.to_owned(),
                abort,
                cancelled: Arc::clone(&cancelled),
            });
            id
        };

        let result = Abortable::new(self.loader.load(url), registration).await;

        let mut state = self.lock();
        state.in_flight.retain(|f| f.id != id);

        match result {
            Ok(points) if !cancelled.load(Ordering::SeqCst) => {
                let count = points.len();
                state.points = Some(points.into());
                state.committed_url = Some(url.to_owned());
                tracing::debug!(url, count, "committed KML load");
                LoadOutcome::Committed { count }
            }
            _ => {
                tracing::debug!(url, "KML load cancelled");
                LoadOutcome::Cancelled
            }
        }
    }

    /// Aborts every load in flight.
    pub fn cancel(&self) {
        for in_flight in self.lock().in_flight.drain(..) {
            in_flight.cancel();
        }
    }

    /// The committed snapshot; empty before the first successful commit.
    #[must_use]
    pub fn points(&self) -> Arc<[ParkingPoint]> {
        self.lock()
            .points
            .clone()
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }

    /// URL of the committed snapshot.
    #[must_use]
    pub fn source(&self) -> Option<String> {
        self.lock().committed_url.clone()
    }

    fn lock(&self) -> MutexGuard<'_, LoadState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
