//! Event channels with an explicit subscription lifetime.
//!
//! Each `subscribe` hands out a receiver; dropping it is the unsubscribe.
//! Publishers never need to know who is listening.

use std::sync::mpsc::{self, Receiver, Sender};

/// Fan-out publisher for events of type `T`.
pub struct EventChannel<T> {
    subscribers: Vec<Sender<T>>,
}

impl<T> Default for EventChannel<T> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }
}

impl<T: Clone> EventChannel<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new listener. Events published from now on are queued on the receiver.
    pub fn subscribe(&mut self) -> Receiver<T> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Deliver `event` to every live subscriber, forgetting the ones that hung up.
    pub fn publish(&mut self, event: T) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Number of subscribers still holding their receiver (as of the last publish).
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl<T> std::fmt::Debug for EventChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventChannel")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subscriber_sees_events_in_order() {
        let mut channel = EventChannel::new();
        let a = channel.subscribe();
        let b = channel.subscribe();
        channel.publish(1);
        channel.publish(2);
        assert_eq!(a.try_iter().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(b.try_iter().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn dropped_receiver_unsubscribes() {
        let mut channel = EventChannel::new();
        let keep = channel.subscribe();
        drop(channel.subscribe());
        channel.publish("hello");
        assert_eq!(channel.subscriber_count(), 1);
        assert_eq!(keep.try_recv().unwrap(), "hello");
    }
}
