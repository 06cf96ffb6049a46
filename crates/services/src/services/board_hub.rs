use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, broadcast};
use ts_rs::TS;
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 256;

/// Event delivered to clients subscribed to one board.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct BoardEvent {
    pub event: String,
    pub board_id: Uuid,
    pub payload: serde_json::Value,
}

/// In-process fan-out of board events: one broadcast channel per board,
/// created lazily on first subscription. This sits behind the same
/// `broadcast(board_id, event)` seam an external pub/sub backend would.
#[derive(Clone)]
pub struct BoardHub {
    channels: Arc<RwLock<HashMap<Uuid, broadcast::Sender<BoardEvent>>>>,
}

impl BoardHub {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn subscribe(&self, board_id: Uuid) -> broadcast::Receiver<BoardEvent> {
        let mut channels = self.channels.write().await;
        channels
            .entry(board_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Delivers the event to every client subscribed to the board. Returns
    /// the number of receivers; boards with no subscribers are a no-op.
    pub async fn broadcast(&self, board_id: Uuid, event: BoardEvent) -> usize {
        let mut channels = self.channels.write().await;
        let Some(sender) = channels.get(&board_id) else {
            return 0;
        };

        if sender.receiver_count() == 0 {
            channels.remove(&board_id);
            return 0;
        }

        sender.send(event).unwrap_or(0)
    }

    pub async fn board_count(&self) -> usize {
        self.channels.read().await.len()
    }
}

impl Default for BoardHub {
    fn default() -> Self {
        Self::new()
    }
}
