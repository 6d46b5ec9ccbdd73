//! Selection reconciliation: keep the store's selected-id set and the
//! surface's active-node set equal, in both directions, without feedback
//! loops.
//!
//! Each direction is a plain function gated by an explicit re-entrancy
//! flag. The sets may diverge inside a single call stack but converge
//! again before the next turn observes them.

use std::collections::HashSet;

use studio_core::ElementId;

use crate::controller::{DeferredAction, SlideController};
use crate::surface::ActiveSelection;

impl SlideController {
    /// Scene → store: the host observed a node activation change.
    ///
    /// Ignored while this controller is itself changing the selection or a
    /// rebuild is in progress; in both cases the activation change is an
    /// artifact, and writing it through would overwrite user intent.
    pub fn notify_scene_selection(&mut self, ids: &[ElementId]) {
        if self.internal_selection_update {
            tracing::debug!("Scene selection ignored: internal update in progress");
            return;
        }
        if self.rendering {
            tracing::debug!("Scene selection ignored: rebuild in progress");
            return;
        }

        // Scene-driven deselection of a multi-selection is where drag
        // results get committed.
        if matches!(self.surface.active(), ActiveSelection::Group(_)) {
            let old: HashSet<ElementId> = self.surface.active_ids().into_iter().collect();
            let new: HashSet<ElementId> = ids.iter().copied().collect();
            if old != new {
                self.end_multi_drag();
            }
        }

        self.surface.set_active(ids);
        self.record_drag_origins();

        let active = self.surface.active_ids();
        match active.len() {
            0 => self.store.select_element(None),
            1 => self.store.select_element(Some(active[0])),
            _ => self.store.select_elements(&active),
        }
    }

    /// Store → scene: make the active nodes match the store's selection.
    ///
    /// Order-independent set comparison; on divergence the nodes are
    /// activated directly from the id map (no rebuild) under the guard
    /// flag, which a deferred frame clears so the resulting scene event
    /// cannot echo back.
    pub fn apply_store_selection(&mut self) {
        if self.surface.is_disposed() {
            return;
        }
        if self.rendering {
            // The running pass restores selection itself.
            return;
        }

        let want: HashSet<ElementId> = self.store.selected_ids().into_iter().collect();
        let have: HashSet<ElementId> = self.surface.active_ids().into_iter().collect();
        if want == have {
            return;
        }

        self.internal_selection_update = true;
        let ids = self.store.selected_ids();
        self.surface.set_active(&ids);
        self.record_drag_origins();
        self.surface.request_render();
        self.schedule(1, DeferredAction::ClearSelectionGuard);
    }
}
