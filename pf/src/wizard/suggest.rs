//! Reactive suggestion fetching
//!
//! The fetcher is fed the wizard's current [`SuggestQuery`] after every change. A new
//! key starts a new request; the previous in-flight request is aborted and its
//! generation retired, so a late response for an old key can never overwrite the
//! result for the current one.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::{ApiError, PathfinderApi, SuggestQuery};
use crate::domain::Venue;

/// What the results stage shows
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SuggestionState {
    /// No request possible (first stop empty or locations unset)
    #[default]
    Disabled,
    Pending,
    /// Venues in backend order
    Ready(Vec<Venue>),
    /// Empty result or failed request
    NotFound,
}

impl SuggestionState {
    pub fn venues(&self) -> Option<&[Venue]> {
        match self {
            SuggestionState::Ready(venues) => Some(venues),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, SuggestionState::Pending)
    }
}

#[derive(Debug)]
struct Completion {
    generation: u64,
    result: Result<Vec<Venue>, ApiError>,
}

pub struct SuggestionFetcher {
    api: Arc<dyn PathfinderApi>,
    key: Option<SuggestQuery>,
    generation: u64,
    state: SuggestionState,
    task: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
}

impl SuggestionFetcher {
    pub fn new(api: Arc<dyn PathfinderApi>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            api,
            key: None,
            generation: 0,
            state: SuggestionState::Disabled,
            task: None,
            tx,
            rx,
        }
    }

    pub fn state(&self) -> &SuggestionState {
        &self.state
    }

    pub fn key(&self) -> Option<&SuggestQuery> {
        self.key.as_ref()
    }

    /// Feed the current request key; returns true if a new request was issued
    ///
    /// Must be called from within a tokio runtime.
    pub fn update(&mut self, key: Option<SuggestQuery>) -> bool {
        if key == self.key {
            return false;
        }
        debug!(generation = %self.generation, ?key, "SuggestionFetcher::update: key changed");

        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.generation += 1;
        self.key = key.clone();

        let Some(query) = key else {
            self.state = SuggestionState::Disabled;
            return false;
        };

        self.state = SuggestionState::Pending;
        let api = self.api.clone();
        let tx = self.tx.clone();
        let generation = self.generation;
        self.task = Some(tokio::spawn(async move {
            let result = api.suggest(&query).await;
            // The receiver lives as long as the fetcher
            let _ = tx.send(Completion { generation, result });
        }));
        true
    }

    /// Apply any completed responses without waiting; returns true if the state changed
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(completion) = self.rx.try_recv() {
            changed |= self.apply(completion);
        }
        changed
    }

    /// Wait for the next response that belongs to the current key and apply it
    ///
    /// Pends forever while nothing is in flight, so it can sit in a `select!` arm.
    pub async fn changed(&mut self) {
        loop {
            let Some(completion) = self.rx.recv().await else {
                return std::future::pending().await;
            };
            if self.apply(completion) {
                return;
            }
        }
    }

    /// Wait until the current request (if any) has completed
    pub async fn settle(&mut self) -> &SuggestionState {
        while self.state.is_pending() {
            self.changed().await;
        }
        &self.state
    }

    fn apply(&mut self, completion: Completion) -> bool {
        if completion.generation != self.generation {
            debug!(
                stale = %completion.generation,
                current = %self.generation,
                "SuggestionFetcher::apply: discarding stale response"
            );
            return false;
        }
        self.task = None;
        self.state = match completion.result {
            Ok(venues) if venues.is_empty() => {
                debug!("SuggestionFetcher::apply: no suggestions");
                SuggestionState::NotFound
            }
            Ok(venues) => {
                debug!(count = %venues.len(), "SuggestionFetcher::apply: suggestions ready");
                SuggestionState::Ready(venues)
            }
            Err(e) => {
                warn!(error = %e, "Suggestion fetch failed");
                SuggestionState::NotFound
            }
        };
        true
    }
}

impl Drop for SuggestionFetcher {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
