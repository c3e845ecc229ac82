use super::event::FeedMessage;
use dashmap::DashMap;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::sync::mpsc;

pub type WsSender = mpsc::UnboundedSender<String>;

/// Fan-out of issue feed messages to every connected socket.
#[derive(Clone)]
pub struct IssueHub {
    connections: Arc<DashMap<u64, WsSender>>,
    next_conn_id: Arc<AtomicU64>,
}

impl Default for IssueHub {
    fn default() -> Self {
        Self::new()
    }
}

impl IssueHub {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(DashMap::new()),
            next_conn_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn subscribe(&self) -> (u64, mpsc::UnboundedReceiver<String>) {
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections.insert(conn_id, tx);
        (conn_id, rx)
    }

    pub fn unsubscribe(&self, conn_id: u64) {
        self.connections.remove(&conn_id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.connections.len()
    }

    pub fn broadcast(&self, message: &FeedMessage) {
        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Failed to serialize feed message: {}", e);
                return;
            }
        };

        // Drop closed channels while sending
        self.connections
            .retain(|_, sender| sender.send(text.clone()).is_ok());
    }
}
