//! Typed publishing on top of the message bus.

use std::sync::Arc;
use std::time::Duration;

use common::SiteId;

use crate::Result;
use crate::bus::MessageBus;
use crate::deadline::bounded;
use crate::messages::{ChannelMessage, encode};
use crate::topology::Route;

/// Publishes channel messages to a location's exchange.
///
/// The routing key is taken from the message type, so a message can only
/// ever be sent to the channel that understands it.
#[derive(Clone)]
pub struct Producer {
    bus: Arc<dyn MessageBus>,
    deadline: Duration,
}

impl Producer {
    pub fn new(bus: Arc<dyn MessageBus>, deadline: Duration) -> Self {
        Self { bus, deadline }
    }

    /// Encodes and publishes a message to `exchange`.
    pub async fn send<M: ChannelMessage>(&self, exchange: &SiteId, message: &M) -> Result<()> {
        let route = Route::new(exchange.clone(), M::CHANNEL);
        let body = encode(message)?;
        bounded(self.deadline, "publish", self.bus.publish(&route, body)).await?;
        tracing::debug!(%route, "message published");
        Ok(())
    }
}
