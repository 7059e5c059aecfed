//! Consumer runtime shared by every participant.
//!
//! Each participant consumes one subscription, one message at a time and in
//! arrival order. Steps that model slow work hand back a future instead of
//! blocking; the consumer runs it as a separate task and keeps reading.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};

use crate::Result;
use crate::bus::Subscription;
use crate::messages::{ChannelMessage, decode};

/// What a handler did with a message.
pub enum Handled {
    /// The message is fully processed.
    Done,
    /// Processing continues in the background.
    Spawned(BoxFuture<'static, Result<()>>),
}

impl std::fmt::Debug for Handled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handled::Done => write!(f, "Done"),
            Handled::Spawned(_) => write!(f, "Spawned"),
        }
    }
}

/// A saga participant reacting to the messages of one channel.
#[async_trait]
pub trait Participant: Send + Sync + 'static {
    /// Messages of the consumed channel.
    type Message: ChannelMessage;

    /// Service name used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Handles one decoded message.
    async fn handle(&self, message: Self::Message) -> Result<Handled>;
}

/// Triggers shutdown of every consumer created from it.
#[derive(Debug)]
pub struct Shutdown {
    sender: watch::Sender<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender }
    }

    /// Returns a signal that resolves once shutdown is triggered.
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of [`Shutdown`].
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Waits until shutdown is triggered or the trigger is dropped.
    pub async fn triggered(&mut self) {
        while !*self.receiver.borrow_and_update() {
            if self.receiver.changed().await.is_err() {
                return;
            }
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }
}

/// Drives one participant from one subscription.
pub struct Consumer<P: Participant> {
    participant: Arc<P>,
    subscription: Subscription,
    shutdown: ShutdownSignal,
    grace: Duration,
}

impl<P: Participant> Consumer<P> {
    pub fn new(
        participant: Arc<P>,
        subscription: Subscription,
        shutdown: ShutdownSignal,
        grace: Duration,
    ) -> Self {
        Self {
            participant,
            subscription,
            shutdown,
            grace,
        }
    }

    /// Runs the consumer on its own task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Consumes until shutdown or until the bus goes away, then drains
    /// in-flight steps for at most the grace window.
    pub async fn run(self) {
        let Consumer {
            participant,
            mut subscription,
            mut shutdown,
            grace,
        } = self;
        let service = participant.name();
        let mut in_flight: JoinSet<Result<()>> = JoinSet::new();

        tracing::info!(service, route = %subscription.route(), "consumer started");

        loop {
            tokio::select! {
                _ = shutdown.triggered() => break,
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    report_step(service, joined);
                }
                body = subscription.receive() => {
                    let Some(body) = body else { break };
                    if let Err(e) = dispatch(participant.as_ref(), &body, &mut in_flight).await {
                        report_failure(service, &e);
                    }
                }
            }
        }

        drain(service, &mut in_flight, grace).await;
        tracing::info!(service, "consumer stopped");
    }
}

async fn dispatch<P: Participant>(
    participant: &P,
    body: &[u8],
    in_flight: &mut JoinSet<Result<()>>,
) -> Result<()> {
    let message = decode::<P::Message>(body)?;
    match participant.handle(message).await? {
        Handled::Done => {}
        Handled::Spawned(step) => {
            in_flight.spawn(step);
        }
    }
    Ok(())
}

fn report_failure(service: &'static str, error: &crate::SagaError) {
    if error.is_protocol_error() {
        metrics::counter!("messages_discarded_total", "service" => service).increment(1);
        tracing::warn!(service, error = %error, "message discarded");
    } else {
        metrics::counter!("messages_failed_total", "service" => service).increment(1);
        tracing::error!(service, error = %error, "message handling failed");
    }
}

fn report_step(
    service: &'static str,
    joined: std::result::Result<Result<()>, tokio::task::JoinError>,
) {
    match joined {
        Ok(Ok(())) => {}
        Ok(Err(e)) => report_failure(service, &e),
        Err(e) if e.is_cancelled() => tracing::warn!(service, "step cancelled"),
        Err(e) => tracing::error!(service, error = %e, "step panicked"),
    }
}

async fn drain(service: &'static str, in_flight: &mut JoinSet<Result<()>>, grace: Duration) {
    if in_flight.is_empty() {
        return;
    }
    tracing::info!(service, pending = in_flight.len(), "draining in-flight steps");

    let drained = tokio::time::timeout(grace, async {
        while let Some(joined) = in_flight.join_next().await {
            report_step(service, joined);
        }
    })
    .await;

    if drained.is_err() {
        tracing::warn!(service, aborted = in_flight.len(), "grace window elapsed, aborting steps");
        in_flight.abort_all();
        while in_flight.join_next().await.is_some() {}
    }
}
