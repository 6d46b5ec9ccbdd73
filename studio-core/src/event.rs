//! Process-wide studio event bus.
//!
//! Decouples UI surfaces that request work (e.g. an export button in the
//! slide navigator) from the per-slide controller that can actually do it:
//! the requester does not hold the slide's surface reference, it only knows
//! the slide id. Delivery is fire-and-forget; completion comes back as its
//! own event rather than a bounded wait.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::SlideId;

/// Broadcast capacity for the studio bus.
const BUS_CAPACITY: usize = 64;

/// Events carried on the studio bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum StudioEvent {
    /// Request rasterization of one slide at a scale multiplier.
    ///
    /// Every mounted controller sees this; only the one owning `slide_id`
    /// acts.
    ExportSlide {
        /// Slide to rasterize.
        slide_id: SlideId,
        /// Output scale multiplier (e.g. 2.0 for retina).
        scale: f32,
    },

    /// Outcome of an export request.
    ExportCompleted {
        /// Whether rasterization and delivery succeeded.
        success: bool,
        /// The slide the request targeted.
        slide_id: SlideId,
        /// Failure description when `success` is false.
        error: Option<String>,
    },
}

/// A cloneable handle on the process-wide studio bus.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<StudioEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Create a new bus.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    /// Publish an event to every subscriber.
    pub fn emit(&self, event: StudioEvent) {
        // Nobody listening is fine.
        let _ = self.tx.send(event);
    }

    /// Subscribe to bus events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StudioEvent> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_reaches_subscriber() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        let slide_id = SlideId::new();
        bus.emit(StudioEvent::ExportSlide {
            slide_id,
            scale: 2.0,
        });

        match rx.try_recv() {
            Ok(StudioEvent::ExportSlide { slide_id: got, .. }) => assert_eq!(got, slide_id),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_emit_without_subscribers_is_noop() {
        let bus = EventBus::new();
        bus.emit(StudioEvent::ExportCompleted {
            success: true,
            slide_id: SlideId::new(),
            error: None,
        });
    }

    #[test]
    fn test_event_serde_round_trip() {
        let event = StudioEvent::ExportCompleted {
            success: false,
            slide_id: SlideId::new(),
            error: Some("disposed".to_string()),
        };
        let json = serde_json::to_string(&event).expect("serialize");
        let back: StudioEvent = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(event, back);
    }
}
