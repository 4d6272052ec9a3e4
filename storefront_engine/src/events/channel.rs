//! Stateless pub-sub for order lifecycle events.
//!
//! Components subscribe a handler per event type. Handlers only ever see the event itself, never the engine's state,
//! and each event is handled on its own tokio task. Publishing happens after the database transaction that produced
//! the event has committed, so a handler never observes a transition that could still roll back.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::{sync::mpsc, task::JoinSet};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Owns the receiving end of an event channel and runs `handler` for every event that arrives on it.
pub struct EventHandler<E: Send + Sync + 'static> {
    inbox: mpsc::Receiver<E>,
    outbox: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (outbox, inbox) = mpsc::channel(buffer_size);
        Self { inbox, outbox, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.outbox.clone())
    }

    /// Runs until every [`EventProducer`] has been dropped, then waits for in-flight handlers to finish.
    pub async fn start_handler(self) {
        let Self { mut inbox, outbox, handler } = self;
        debug!("📬️ Starting event handler");
        drop(outbox);
        let mut jobs = JoinSet::new();
        while let Some(event) = inbox.recv().await {
            trace!("📬️ Handling event");
            jobs.spawn((handler)(event));
            // Reap finished jobs so the set does not grow without bound on a long-lived server
            while let Some(done) = jobs.try_join_next() {
                log_job_result(done);
            }
        }
        if !jobs.is_empty() {
            debug!("📬️ Waiting for {} event jobs to complete", jobs.len());
        }
        while let Some(done) = jobs.join_next().await {
            log_job_result(done);
        }
        debug!("📬️ Event handler has shut down");
    }
}

fn log_job_result(result: Result<(), tokio::task::JoinError>) {
    match result {
        Ok(()) => trace!("📬️ Event handled"),
        Err(e) => warn!("📬️ An event hook did not complete: {e}"),
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    outbox: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(outbox: mpsc::Sender<E>) -> Self {
        Self { outbox }
    }

    /// Queues the event. Waits if the handler's buffer is full. A closed channel is logged, not returned, since
    /// the transition that produced the event has already been committed.
    pub async fn publish_event(&self, event: E) {
        if let Err(e) = self.outbox.send(event).await {
            error!("📬️ Failed to send event: {e}");
        }
    }
}
