//! Connection registry.
//!
//! Each live connection owns a bounded outbound queue drained by its writer
//! task. Everything that delivers frames, from command results to room
//! broadcasts, goes through [`Gateway::send_to`]. Delivery is best-effort:
//! a full or closed queue drops the frame and never blocks the sender.

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::messages::OutboundFrame;

pub type Outbox = mpsc::Sender<OutboundFrame>;

pub struct Gateway {
    connections: DashMap<String, Outbox>,
    buffer: usize,
}

impl Gateway {
    pub fn new(buffer: usize) -> Self {
        Self {
            connections: DashMap::new(),
            buffer: buffer.max(1),
        }
    }

    /// Register a connection and return the receiving end of its queue.
    pub fn register(&self, connection_id: &str) -> mpsc::Receiver<OutboundFrame> {
        let (tx, rx) = mpsc::channel(self.buffer);
        self.connections.insert(connection_id.to_string(), tx);
        tracing::debug!(connection_id = %connection_id, "Connection registered");
        rx
    }

    /// Drop a connection's queue. Its writer task ends once the queue drains.
    pub fn unregister(&self, connection_id: &str) {
        if self.connections.remove(connection_id).is_some() {
            tracing::debug!(connection_id = %connection_id, "Connection unregistered");
        }
    }

    /// Queue a frame for one connection. Returns whether it was queued.
    pub fn send_to(&self, connection_id: &str, frame: OutboundFrame) -> bool {
        let Some(outbox) = self.connections.get(connection_id).map(|o| o.clone()) else {
            return false;
        };
        match outbox.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(frame)) => {
                tracing::warn!(
                    connection_id = %connection_id,
                    event = %frame.event,
                    "Outbound queue full, dropping frame"
                );
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Queue a frame for several connections. Returns how many accepted it.
    pub fn send_to_many<'a, I>(&self, connection_ids: I, frame: &OutboundFrame) -> usize
    where
        I: IntoIterator<Item = &'a String>,
    {
        connection_ids
            .into_iter()
            .filter(|id| self.send_to(id, frame.clone()))
            .count()
    }

    pub fn is_connected(&self, connection_id: &str) -> bool {
        self.connections.contains_key(connection_id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}
