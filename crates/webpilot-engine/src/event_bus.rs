//! Execution event fan-out.
//!
//! Live subscribers receive events through a bounded broadcast ring: a slow
//! subscriber loses the oldest events (and is told how many) instead of
//! blocking the traversal task. A bounded history serves polling clients.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::trace;
use webpilot_protocols::ExecutionEvent;

/// Publish/subscribe channel for [`ExecutionEvent`]s.
pub struct EventBus {
    sender: broadcast::Sender<ExecutionEvent>,
    history: Mutex<VecDeque<ExecutionEvent>>,
    history_limit: usize,
}

impl EventBus {
    /// Create a bus with the given live buffer and history sizes.
    pub fn new(buffer: usize, history_limit: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer.max(1));
        Self {
            sender,
            history: Mutex::new(VecDeque::with_capacity(history_limit.min(1024))),
            history_limit,
        }
    }

    /// Publish an event. Never blocks; events with no subscriber only go to history.
    pub fn publish(&self, event: ExecutionEvent) {
        {
            let mut history = self.history.lock();
            if self.history_limit > 0 {
                while history.len() >= self.history_limit {
                    history.pop_front();
                }
                history.push_back(event.clone());
            }
        }
        let receivers = self.sender.send(event).unwrap_or(0);
        trace!(receivers, "event published");
    }

    /// Subscribe to events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.sender.subscribe()
    }

    /// The most recent `limit` events, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<ExecutionEvent> {
        let history = self.history.lock();
        let skip = history.len().saturating_sub(limit);
        history.iter().skip(skip).cloned().collect()
    }

    /// Events of one execution, oldest first.
    pub fn for_execution(&self, execution_id: &str) -> Vec<ExecutionEvent> {
        self.history
            .lock()
            .iter()
            .filter(|e| e.execution_id.as_deref() == Some(execution_id))
            .cloned()
            .collect()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256, 512)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::RecvError;
    use webpilot_protocols::ExecutionEventType;

    #[tokio::test]
    async fn test_subscriber_receives_in_order() {
        let bus = EventBus::new(16, 16);
        let mut rx = bus.subscribe();
        bus.publish(ExecutionEvent::node_start("a"));
        bus.publish(ExecutionEvent::node_complete("a"));
        bus.publish(ExecutionEvent::execution_complete());

        assert_eq!(rx.recv().await.unwrap().event_type, ExecutionEventType::NodeStart);
        assert_eq!(rx.recv().await.unwrap().event_type, ExecutionEventType::NodeComplete);
        assert_eq!(
            rx.recv().await.unwrap().event_type,
            ExecutionEventType::ExecutionComplete
        );
    }

    #[tokio::test]
    async fn test_slow_subscriber_drops_oldest() {
        let bus = EventBus::new(2, 16);
        let mut rx = bus.subscribe();
        for id in ["a", "b", "c", "d"] {
            bus.publish(ExecutionEvent::node_start(id));
        }

        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(2))));
        assert_eq!(rx.recv().await.unwrap().node_id.as_deref(), Some("c"));
        assert_eq!(rx.recv().await.unwrap().node_id.as_deref(), Some("d"));
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new(4, 4);
        bus.publish(ExecutionEvent::node_start("a"));
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.recent(10).len(), 1);
    }

    #[test]
    fn test_history_is_bounded() {
        let bus = EventBus::new(4, 3);
        for id in ["a", "b", "c", "d", "e"] {
            bus.publish(ExecutionEvent::node_start(id));
        }
        let ids: Vec<_> = bus
            .recent(10)
            .into_iter()
            .filter_map(|e| e.node_id)
            .collect();
        assert_eq!(ids, vec!["c", "d", "e"]);

        let last: Vec<_> = bus.recent(1).into_iter().filter_map(|e| e.node_id).collect();
        assert_eq!(last, vec!["e"]);
    }

    #[test]
    fn test_for_execution_filters() {
        let bus = EventBus::new(4, 8);
        bus.publish(ExecutionEvent::node_start("a").with_execution("x"));
        bus.publish(ExecutionEvent::node_start("b").with_execution("y"));
        let events = bus.for_execution("y");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].node_id.as_deref(), Some("b"));
    }
}
