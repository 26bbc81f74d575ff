//! InMemoryBus adapter using tokio::broadcast
//!
//! Concrete implementation of the EventPublisher and EventSubscriber ports.
//! Publishing never blocks; a send without subscribers is not an error.

use async_trait::async_trait;
use simrun_ports::{
    EventBusError, EventPublisher, EventReceiver, EventSubscriber, SimulationEvent,
};
use tokio::sync::broadcast;

/// In-memory event bus for completion notifications
pub struct InMemoryBus {
    sender: broadcast::Sender<SimulationEvent>,
}

impl InMemoryBus {
    /// Create a new InMemoryBus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new(1_024)
    }
}

#[async_trait]
impl EventPublisher for InMemoryBus {
    async fn publish(&self, event: SimulationEvent) -> Result<(), EventBusError> {
        // SendError only means nobody is listening right now
        let _ = self.sender.send(event);
        Ok(())
    }
}

#[async_trait]
impl EventSubscriber for InMemoryBus {
    async fn subscribe(&self) -> Result<EventReceiver, EventBusError> {
        Ok(EventReceiver {
            receiver: self.sender.subscribe(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simrun_core::TargetId;

    #[tokio::test]
    async fn test_subscriber_receives_published_event() {
        let bus = InMemoryBus::new(16);
        let mut rx = bus.subscribe().await.unwrap();

        bus.publish(SimulationEvent::TimedOut {
            target: TargetId::new("T1"),
        })
        .await
        .unwrap();

        match rx.recv().await.unwrap() {
            SimulationEvent::TimedOut { target } => assert_eq!(target, TargetId::new("T1")),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let bus = InMemoryBus::new(16);
        bus.publish(SimulationEvent::Failed {
            target: TargetId::new("T1"),
            reason: "no output".to_string(),
        })
        .await
        .unwrap();
    }
}
