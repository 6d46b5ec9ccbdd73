//! Per-slide controller: the exclusive owner of one surface.
//!
//! The controller wires the document store, the studio bus, and the host
//! renderer together. All coordination is cooperative and single-turn:
//! the guards are plain booleans toggled within one synchronous call
//! stack (or across an await the same pass holds), and deferred work is a
//! frame-counted queue drained by `tick()` instead of wall-clock timers.

use std::collections::HashMap;
use std::sync::Arc;

use studio_core::{DocumentStore, ElementId, EventBus, SlideId, StoreEvent, StudioEvent};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

use crate::config::EngineConfig;
use crate::export::{ExportSink, MemorySink, Rasterizer, SvgRasterizer};
use crate::reconcile::{FontResolver, SystemFontResolver};
use crate::surface::Surface;
use crate::text_edit::{EditSession, HeuristicMeasurer, TextMeasurer};
use crate::viewport::{LayoutProbe, NullLayoutProbe};
use crate::SyncResult;

/// Work postponed by a number of frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeferredAction {
    /// Drop the internal-selection-update guard.
    ClearSelectionGuard,
    /// Drop the multi-select-modifying guard.
    ClearMultiSelectGuard,
    /// Re-run the font-metric settle pass.
    RemeasureText,
    /// Recompute the screen-space offset cache.
    RefreshOffset,
}

#[derive(Debug)]
pub(crate) struct Deferred {
    pub(crate) frames_left: u8,
    pub(crate) action: DeferredAction,
}

/// Synchronizes one slide's scene graph with the document store.
///
/// Exactly one controller exists per mounted slide, keyed by the stable
/// slide id; reordering the deck never re-creates it. The controller is
/// the only writer of its [`Surface`].
pub struct SlideController {
    pub(crate) store: DocumentStore,
    pub(crate) bus: EventBus,
    pub(crate) config: EngineConfig,
    pub(crate) surface: Surface,

    pub(crate) fonts: Arc<dyn FontResolver>,
    pub(crate) measurer: Arc<dyn TextMeasurer>,
    pub(crate) probe: Arc<dyn LayoutProbe>,
    pub(crate) rasterizer: Arc<dyn Rasterizer>,
    pub(crate) sink: Arc<dyn ExportSink>,

    /// Set while this controller itself changes the active selection, so
    /// the resulting scene event does not echo back into the store.
    pub(crate) internal_selection_update: bool,
    /// Set for the duration of a reconciliation pass, including its await
    /// windows; scene selection events observed under it are rebuild
    /// artifacts, not user intent.
    pub(crate) rendering: bool,
    /// Set while a live multi-select gesture streams updates; suppresses
    /// the reconciler until two frames after the last nudge.
    pub(crate) multi_select_modifying: bool,

    pub(crate) last_fingerprint: Option<u64>,
    pub(crate) last_index: Option<usize>,

    pub(crate) edit: Option<EditSession>,
    /// Pre-drag world positions recorded when a multi-selection forms.
    pub(crate) drag_origin: HashMap<ElementId, (f32, f32)>,

    pub(crate) deferred: Vec<Deferred>,

    store_rx: broadcast::Receiver<StoreEvent>,
    bus_rx: broadcast::Receiver<StudioEvent>,
}

impl SlideController {
    /// Create a controller for one slide with default collaborators.
    #[must_use]
    pub fn new(slide_id: SlideId, store: DocumentStore, bus: EventBus, config: EngineConfig) -> Self {
        let store_rx = store.subscribe();
        let bus_rx = bus.subscribe();
        let rasterizer = SvgRasterizer::new(config.page_width, config.page_height);
        Self {
            store,
            bus,
            surface: Surface::new(slide_id),
            fonts: Arc::new(SystemFontResolver),
            measurer: Arc::new(HeuristicMeasurer),
            probe: Arc::new(NullLayoutProbe),
            rasterizer: Arc::new(rasterizer),
            sink: Arc::new(MemorySink::default()),
            internal_selection_update: false,
            rendering: false,
            multi_select_modifying: false,
            last_fingerprint: None,
            last_index: None,
            edit: None,
            drag_origin: HashMap::new(),
            deferred: Vec::new(),
            store_rx,
            bus_rx,
            config,
        }
    }

    /// Replace the font resolver.
    #[must_use]
    pub fn with_font_resolver(mut self, fonts: Arc<dyn FontResolver>) -> Self {
        self.fonts = fonts;
        self
    }

    /// Replace the text measurer.
    #[must_use]
    pub fn with_measurer(mut self, measurer: Arc<dyn TextMeasurer>) -> Self {
        self.measurer = measurer;
        self
    }

    /// Replace the layout probe.
    #[must_use]
    pub fn with_layout_probe(mut self, probe: Arc<dyn LayoutProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Replace the rasterizer.
    #[must_use]
    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    /// Replace the export sink.
    #[must_use]
    pub fn with_export_sink(mut self, sink: Arc<dyn ExportSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The surface owned by this controller.
    #[must_use]
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Mutable surface access for the host's gesture plumbing.
    ///
    /// Hosts mutate nodes directly during a live gesture and call
    /// [`Self::commit_node`] (or the multi-select paths) on release.
    pub fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }

    /// The shared document store.
    #[must_use]
    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Whether an inline text edit session is active.
    #[must_use]
    pub fn is_editing(&self) -> bool {
        self.edit.is_some()
    }

    /// Mount the controller: first reconciliation plus the deferred
    /// offset settle.
    ///
    /// # Errors
    ///
    /// Propagates reconciliation failures.
    pub async fn mount(&mut self) -> SyncResult<()> {
        self.sync().await?;
        self.schedule(self.config.settle_frames, DeferredAction::RefreshOffset);
        Ok(())
    }

    /// Unmount the controller, disposing the surface.
    ///
    /// Work already in flight (font loads, deferred frames) becomes a
    /// no-op against the disposed surface.
    pub fn unmount(&mut self) {
        self.surface.dispose();
        self.deferred.clear();
    }

    /// Queue an action to run after `frames` ticks.
    pub(crate) fn schedule(&mut self, frames: u8, action: DeferredAction) {
        self.deferred.push(Deferred {
            frames_left: frames,
            action,
        });
    }

    /// Advance one host frame: age the deferred queue and run whatever
    /// comes due.
    pub fn tick(&mut self) {
        for entry in &mut self.deferred {
            entry.frames_left = entry.frames_left.saturating_sub(1);
        }
        let mut due = Vec::new();
        self.deferred.retain(|entry| {
            if entry.frames_left == 0 {
                due.push(entry.action);
                false
            } else {
                true
            }
        });
        for action in due {
            match action {
                DeferredAction::ClearSelectionGuard => self.internal_selection_update = false,
                DeferredAction::ClearMultiSelectGuard => self.multi_select_modifying = false,
                DeferredAction::RemeasureText => self.surface.remeasure_text(),
                DeferredAction::RefreshOffset => self.refresh_offset(),
            }
        }
    }

    /// Drain pending store notifications and react.
    ///
    /// Element/slide changes coalesce into one reconciliation pass;
    /// selection changes into one selection application. A lagged
    /// receiver falls back to doing both.
    ///
    /// # Errors
    ///
    /// Propagates reconciliation failures.
    pub async fn process_store_events(&mut self) -> SyncResult<()> {
        let mut needs_sync = false;
        let mut needs_selection = false;
        loop {
            match self.store_rx.try_recv() {
                Ok(StoreEvent::ElementsChanged { .. } | StoreEvent::SlidesChanged) => {
                    needs_sync = true;
                }
                Ok(StoreEvent::SelectionChanged) => needs_selection = true,
                Err(TryRecvError::Lagged(n)) => {
                    tracing::warn!("Store feed lagged by {n} events; full refresh");
                    needs_sync = true;
                    needs_selection = true;
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        if needs_sync {
            self.sync().await?;
        }
        if needs_selection {
            self.apply_store_selection();
        }
        Ok(())
    }

    /// Drain pending studio bus events and act on the ones addressed to
    /// this controller's slide.
    pub fn process_bus_events(&mut self) {
        loop {
            match self.bus_rx.try_recv() {
                Ok(StudioEvent::ExportSlide { slide_id, scale })
                    if slide_id == self.surface.slide_id() =>
                {
                    self.export_slide(scale);
                }
                Ok(_) => {}
                Err(TryRecvError::Lagged(n)) => {
                    tracing::warn!("Studio bus lagged by {n} events");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_runs_due_actions_in_order() {
        let store = DocumentStore::new();
        let slide_id = store.current_slide().id;
        let mut controller =
            SlideController::new(slide_id, store, EventBus::new(), EngineConfig::default());

        controller.internal_selection_update = true;
        controller.multi_select_modifying = true;
        controller.schedule(1, DeferredAction::ClearSelectionGuard);
        controller.schedule(2, DeferredAction::ClearMultiSelectGuard);

        controller.tick();
        assert!(!controller.internal_selection_update);
        assert!(controller.multi_select_modifying);

        controller.tick();
        assert!(!controller.multi_select_modifying);
        assert!(controller.deferred.is_empty());
    }

    #[test]
    fn test_unmount_disposes_surface() {
        let store = DocumentStore::new();
        let slide_id = store.current_slide().id;
        let mut controller =
            SlideController::new(slide_id, store, EventBus::new(), EngineConfig::default());
        controller.schedule(3, DeferredAction::RefreshOffset);

        controller.unmount();
        assert!(controller.surface().is_disposed());
        assert!(controller.deferred.is_empty());
    }
}
