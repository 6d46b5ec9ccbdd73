//! Screen-space offset stabilization.
//!
//! The surface caches its screen-space origin so pointer coordinates can
//! be mapped to slide coordinates. Any surrounding layout change (window
//! resize, scroll, sidebar collapse, deck reorder) silently invalidates
//! the cache, so the engine recomputes it at every moment the cache could
//! have gone stale: on mount after a settle delay, on every host
//! resize/scroll notification, on pointer-enter of the slide container,
//! and twice around every full rebuild.

use studio_core::SlideId;

use crate::controller::SlideController;

/// Host-side source of the surface's screen-space origin.
pub trait LayoutProbe: Send + Sync {
    /// Screen-space offset of the slide's surface, if it is laid out.
    fn surface_offset(&self, slide_id: SlideId) -> Option<(f32, f32)>;
}

/// Probe for hosts without a layout tree (headless runs, tests).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLayoutProbe;

impl LayoutProbe for NullLayoutProbe {
    fn surface_offset(&self, _slide_id: SlideId) -> Option<(f32, f32)> {
        None
    }
}

impl SlideController {
    /// Recompute the cached offset from the layout probe.
    ///
    /// A disposed surface or a probe miss is swallowed; the next
    /// interaction triggers another recompute anyway.
    pub(crate) fn refresh_offset(&mut self) {
        if self.surface.is_disposed() {
            tracing::debug!(
                "Offset refresh skipped: surface {} disposed",
                self.surface.slide_id()
            );
            return;
        }
        match self.probe.surface_offset(self.surface.slide_id()) {
            Some(offset) => self.surface.set_offset(Some(offset)),
            None => tracing::debug!(
                "Layout probe has no offset for slide {}",
                self.surface.slide_id()
            ),
        }
    }

    /// The host window resized or scrolled.
    pub fn handle_viewport_change(&mut self) {
        self.refresh_offset();
    }

    /// The pointer entered the slide container: cheap just-in-time
    /// refresh before any hit test can use a stale cache.
    pub fn pointer_entered(&mut self) {
        self.refresh_offset();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use studio_core::{DocumentStore, EventBus};

    use super::*;
    use crate::{EngineConfig, SlideController};

    #[derive(Default)]
    struct CountingProbe {
        calls: AtomicU32,
    }

    impl LayoutProbe for CountingProbe {
        fn surface_offset(&self, _slide_id: SlideId) -> Option<(f32, f32)> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Some((12.0, 34.0))
        }
    }

    #[tokio::test]
    async fn test_offset_cached_from_probe() {
        let store = DocumentStore::new();
        let slide_id = store.current_slide().id;
        let probe = Arc::new(CountingProbe::default());
        let mut controller =
            SlideController::new(slide_id, store, EventBus::new(), EngineConfig::default())
                .with_layout_probe(probe.clone());

        controller.handle_viewport_change();
        assert_eq!(controller.surface().offset(), Some((12.0, 34.0)));
        assert_eq!(probe.calls.load(Ordering::Relaxed), 1);

        controller.pointer_entered();
        assert_eq!(probe.calls.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_disposed_surface_swallows_refresh() {
        let store = DocumentStore::new();
        let slide_id = store.current_slide().id;
        let mut controller =
            SlideController::new(slide_id, store, EventBus::new(), EngineConfig::default());
        controller.unmount();
        controller.handle_viewport_change();
        assert_eq!(controller.surface().offset(), None);
    }

    #[tokio::test]
    async fn test_rebuild_schedules_deferred_refresh() {
        let store = DocumentStore::new();
        let slide_id = store.current_slide().id;
        let probe = Arc::new(CountingProbe::default());
        let mut controller =
            SlideController::new(slide_id, store, EventBus::new(), EngineConfig::default())
                .with_layout_probe(probe.clone());

        controller.mount().await.expect("mount");
        let after_mount = probe.calls.load(Ordering::Relaxed);
        assert!(after_mount >= 1);

        // The deferred settle pass runs two frames later.
        controller.tick();
        controller.tick();
        assert!(probe.calls.load(Ordering::Relaxed) > after_mount);
    }
}
