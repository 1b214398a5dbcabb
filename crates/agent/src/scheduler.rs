//! Background evaluation scheduler
//!
//! At most one run per session id is in flight. The in-flight entry lives in
//! a [`RunSlot`] that is released when the run's task finishes, including
//! when the task panics.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::task::JoinHandle;

use coach_core::{Error, Result};

/// Claim on a session id; dropping it frees the id
pub struct RunSlot {
    id: String,
    in_flight: Arc<DashMap<String, Instant>>,
}

impl RunSlot {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for RunSlot {
    fn drop(&mut self) {
        if let Some((_, started)) = self.in_flight.remove(&self.id) {
            tracing::debug!(
                session_id = %self.id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Released evaluation slot"
            );
        }
    }
}

#[derive(Clone, Default)]
pub struct EvaluationScheduler {
    in_flight: Arc<DashMap<String, Instant>>,
}

impl EvaluationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `id`, failing with `AlreadyRunning` while another run holds it
    pub fn claim(&self, id: &str) -> Result<RunSlot> {
        match self.in_flight.entry(id.to_string()) {
            Entry::Occupied(_) => Err(Error::AlreadyRunning(format!(
                "evaluation {} is already running",
                id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(Instant::now());
                Ok(RunSlot {
                    id: id.to_string(),
                    in_flight: Arc::clone(&self.in_flight),
                })
            },
        }
    }

    /// Run `work` on the runtime, holding `slot` until it ends
    pub fn spawn<F>(&self, slot: RunSlot, work: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(async move {
            let _slot = slot;
            work.await;
        })
    }

    /// Claim and spawn in one step
    pub fn submit<F>(&self, id: &str, work: F) -> Result<JoinHandle<()>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let slot = self.claim(id)?;
        Ok(self.spawn(slot, work))
    }

    pub fn is_running(&self, id: &str) -> bool {
        self.in_flight.contains_key(id)
    }

    pub fn running(&self) -> usize {
        self.in_flight.len()
    }
}
