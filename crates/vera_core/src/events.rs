//! Avatar input events and the queue that serialises them into the frame loop
//!
//! Click/key input and audio callbacks may fire at any point relative to the
//! frame in progress. They never touch controller state directly: they go
//! through an unbounded channel and are drained at the start of the next
//! frame update, so every mutation happens inside `advance` and is stamped
//! with that frame's time.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Discrete event delivered to the avatar controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "key")]
pub enum AvatarEvent {
    /// Pointer click anywhere on the viewport
    Click,
    /// Key press, with the key identity
    KeyDown(String),
    /// Start a sneeze (ignored while already sneezing)
    TriggerSneeze,
    /// Audio playback of a voice clip started
    SpeakingStarted,
    /// Audio playback of a voice clip ended
    SpeakingEnded,
}

impl AvatarEvent {
    /// Click and key events count as user interaction.
    pub fn is_interaction(&self) -> bool {
        matches!(self, AvatarEvent::Click | AvatarEvent::KeyDown(_))
    }
}

/// Cloneable handle for delivering events from callbacks or other tasks.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<AvatarEvent>,
}

impl EventSender {
    /// Enqueue an event. Returns false if the controller is gone.
    pub fn send(&self, event: AvatarEvent) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("Avatar event dropped, controller closed: {:?}", e.0);
                false
            }
        }
    }
}

/// Receiving side, owned by the controller.
#[derive(Debug)]
pub struct EventQueue {
    tx: mpsc::UnboundedSender<AvatarEvent>,
    rx: mpsc::UnboundedReceiver<AvatarEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    pub fn sender(&self) -> EventSender {
        EventSender {
            tx: self.tx.clone(),
        }
    }

    /// Enqueue from the owning side.
    pub fn push(&self, event: AvatarEvent) {
        // The receiver lives in `self`, so the channel cannot be closed here.
        let _ = self.tx.send(event);
    }

    /// Take every pending event in arrival order without blocking.
    pub fn drain(&mut self) -> Vec<AvatarEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_preserves_order() {
        let mut queue = EventQueue::new();
        let sender = queue.sender();
        sender.send(AvatarEvent::Click);
        queue.push(AvatarEvent::TriggerSneeze);
        sender.send(AvatarEvent::KeyDown("a".to_string()));

        let events = queue.drain();
        assert_eq!(
            events,
            vec![
                AvatarEvent::Click,
                AvatarEvent::TriggerSneeze,
                AvatarEvent::KeyDown("a".to_string()),
            ]
        );
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_sender_after_queue_dropped() {
        let queue = EventQueue::new();
        let sender = queue.sender();
        drop(queue);
        assert!(!sender.send(AvatarEvent::Click));
    }

    #[test]
    fn test_interaction_classification() {
        assert!(AvatarEvent::Click.is_interaction());
        assert!(AvatarEvent::KeyDown("x".into()).is_interaction());
        assert!(!AvatarEvent::TriggerSneeze.is_interaction());
        assert!(!AvatarEvent::SpeakingStarted.is_interaction());
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_string(&AvatarEvent::KeyDown("s".into())).unwrap();
        assert_eq!(json, r#"{"type":"key_down","key":"s"}"#);
        let click: AvatarEvent = serde_json::from_str(r#"{"type":"click"}"#).unwrap();
        assert_eq!(click, AvatarEvent::Click);
    }
}
