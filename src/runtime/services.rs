//! Collaborator bundle handed to store constructors.

use std::sync::Arc;

use crate::storage::backend::KeyValueStorage;

use super::clock::{Clock, SystemClock};
use super::notifier::{LogNotifier, Notifier};
use super::scheduler::Scheduler;

/// Storage, timers, time and user notices for one form session.
#[derive(Clone)]
pub struct Services {
    pub storage: Arc<dyn KeyValueStorage>,
    pub scheduler: Arc<dyn Scheduler>,
    pub clock: Arc<dyn Clock>,
    pub notifier: Arc<dyn Notifier>,
}

impl Services {
    /// System clock and log-only notices.
    pub fn new(storage: Arc<dyn KeyValueStorage>, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            storage,
            scheduler,
            clock: Arc::new(SystemClock),
            notifier: Arc::new(LogNotifier),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}
