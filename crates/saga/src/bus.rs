//! Message bus abstraction and an in-process implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{RwLock, mpsc};

use crate::Result;
use crate::topology::Route;

/// Publishing side of the bus.
///
/// Publishing is fire-and-forget: a message reaches every subscriber bound
/// to its route at the time of publishing, at least once, and is silently
/// dropped when nobody is bound.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publishes an encoded message.
    async fn publish(&self, route: &Route, body: Vec<u8>) -> Result<()>;
}

/// Receiving side of one binding.
pub struct Subscription {
    route: Route,
    receiver: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl Subscription {
    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Waits for the next message. Returns `None` once the bus is gone.
    pub async fn receive(&mut self) -> Option<Vec<u8>> {
        self.receiver.recv().await
    }

    /// Returns the next message if one is already queued.
    pub fn try_receive(&mut self) -> Option<Vec<u8>> {
        self.receiver.try_recv().ok()
    }
}

/// In-process bus: every binding gets its own queue.
///
/// Cloning shares the bindings, so all services of one process publish and
/// subscribe through the same instance.
#[derive(Clone, Default)]
pub struct InMemoryBus {
    bindings: Arc<RwLock<HashMap<Route, Vec<mpsc::UnboundedSender<Vec<u8>>>>>>,
}

impl InMemoryBus {
    /// Creates a new bus without bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a new queue to a route.
    pub async fn subscribe(&self, route: Route) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.bindings
            .write()
            .await
            .entry(route.clone())
            .or_default()
            .push(sender);
        tracing::debug!(%route, "queue bound");
        Subscription { route, receiver }
    }

    /// Returns the number of live queues bound to a route.
    pub async fn binding_count(&self, route: &Route) -> usize {
        self.bindings
            .read()
            .await
            .get(route)
            .map_or(0, |senders| senders.iter().filter(|s| !s.is_closed()).count())
    }
}

#[async_trait]
impl MessageBus for InMemoryBus {
    async fn publish(&self, route: &Route, body: Vec<u8>) -> Result<()> {
        let mut bindings = self.bindings.write().await;
        let Some(senders) = bindings.get_mut(route) else {
            tracing::trace!(%route, "no queue bound, message dropped");
            return Ok(());
        };

        senders.retain(|sender| sender.send(body.clone()).is_ok());
        metrics::counter!("bus_messages_published_total", "channel" => route.channel.as_str())
            .increment(1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::Channel;
    use common::SiteId;

    fn route(site: &str, channel: Channel) -> Route {
        Route::new(SiteId::from(site), channel)
    }

    #[tokio::test]
    async fn test_message_reaches_bound_queue() {
        let bus = InMemoryBus::new();
        let mut subscription = bus.subscribe(route("usa", Channel::Factory)).await;

        bus.publish(&route("usa", Channel::Factory), b"hello".to_vec())
            .await
            .unwrap();

        assert_eq!(subscription.receive().await, Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn test_routes_are_isolated() {
        let bus = InMemoryBus::new();
        let mut usa = bus.subscribe(route("usa", Channel::Factory)).await;
        let mut china = bus.subscribe(route("china", Channel::Factory)).await;
        let mut usa_parts = bus.subscribe(route("usa", Channel::Part)).await;

        bus.publish(&route("china", Channel::Factory), b"x".to_vec())
            .await
            .unwrap();

        assert_eq!(china.receive().await, Some(b"x".to_vec()));
        assert!(usa.try_receive().is_none());
        assert!(usa_parts.try_receive().is_none());
    }

    #[tokio::test]
    async fn test_every_binding_gets_a_copy() {
        let bus = InMemoryBus::new();
        let mut first = bus.subscribe(route("london", Channel::Order)).await;
        let mut second = bus.subscribe(route("london", Channel::Order)).await;

        bus.publish(&route("london", Channel::Order), b"m".to_vec())
            .await
            .unwrap();

        assert_eq!(first.receive().await, Some(b"m".to_vec()));
        assert_eq!(second.receive().await, Some(b"m".to_vec()));
    }

    #[tokio::test]
    async fn test_publish_without_binding_is_dropped() {
        let bus = InMemoryBus::new();
        let result = bus
            .publish(&route("nowhere", Channel::Kpi), b"lost".to_vec())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_dropped_subscriptions_are_unbound() {
        let bus = InMemoryBus::new();
        let target = route("usa", Channel::Assembly);
        let subscription = bus.subscribe(target.clone()).await;
        assert_eq!(bus.binding_count(&target).await, 1);

        drop(subscription);
        bus.publish(&target, b"m".to_vec()).await.unwrap();
        assert_eq!(bus.binding_count(&target).await, 0);
    }
}
