//! Shared document storage for the composition editor.
//!
//! Provides a thread-safe [`DocumentStore`] that owns the deck (slides,
//! elements, selection, history) and notifies subscribers of changes over a
//! broadcast channel. The store is the single owner of element truth; the
//! scene graph kept by the sync engine is a derived, disposable cache.

use std::collections::HashSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::broadcast;

use crate::{Element, ElementId, ElementPatch, Slide, SlideId, StoreError, StoreResult};

/// Maximum number of undo checkpoints retained.
const MAX_HISTORY: usize = 100;

/// Broadcast capacity for store change notifications.
const EVENT_CAPACITY: usize = 64;

/// Change notifications emitted after every store mutation.
///
/// Events are advisory: a subscriber that lags or misses events recovers by
/// reading the authoritative state on its next reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// Elements of the given slide changed (add/update/remove/reorder).
    ElementsChanged {
        /// The slide whose element list changed.
        slide: SlideId,
    },
    /// The selected-id set changed.
    SelectionChanged,
    /// The slide list or the current slide index changed.
    SlidesChanged,
}

/// Direction for z-order changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderDirection {
    /// One step towards the viewer.
    Forward,
    /// One step away from the viewer.
    Backward,
    /// All the way to the top.
    Front,
    /// All the way to the bottom.
    Back,
}

/// A history checkpoint: the whole deck at a point in time.
///
/// Selection is deliberately not captured; undoing a move should not also
/// yank the user's selection around.
#[derive(Debug, Clone)]
struct DeckSnapshot {
    slides: Vec<Slide>,
    current: usize,
}

#[derive(Debug)]
struct DeckState {
    slides: Vec<Slide>,
    current: usize,
    selected: Vec<ElementId>,
    undo_stack: Vec<DeckSnapshot>,
    redo_stack: Vec<DeckSnapshot>,
}

impl DeckState {
    fn snapshot(&self) -> DeckSnapshot {
        DeckSnapshot {
            slides: self.slides.clone(),
            current: self.current,
        }
    }

    fn push_checkpoint(&mut self) {
        let snapshot = self.snapshot();
        self.undo_stack.push(snapshot);
        if self.undo_stack.len() > MAX_HISTORY {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
    }

    fn restore(&mut self, snapshot: DeckSnapshot) {
        self.slides = snapshot.slides;
        self.current = snapshot.current.min(self.slides.len().saturating_sub(1));
        let live: HashSet<ElementId> = self.slides[self.current]
            .elements
            .iter()
            .map(|e| e.id)
            .collect();
        self.selected.retain(|id| live.contains(id));
    }
}

/// Thread-safe deck storage shared between the editor shell and the sync
/// engine.
///
/// All methods take `&self`; clones share the same underlying deck.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    state: Arc<RwLock<DeckState>>,
    event_tx: broadcast::Sender<StoreEvent>,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore {
    /// Create a store with a single empty slide.
    #[must_use]
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::new(RwLock::new(DeckState {
                slides: vec![Slide::new("Slide 1")],
                current: 0,
                selected: Vec::new(),
                undo_stack: Vec::new(),
                redo_stack: Vec::new(),
            })),
            event_tx,
        }
    }

    /// Subscribe to change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.event_tx.subscribe()
    }

    fn read(&self) -> RwLockReadGuard<'_, DeckState> {
        self.state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, DeckState> {
        self.state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn emit(&self, event: StoreEvent) {
        // Nobody listening is fine.
        let _ = self.event_tx.send(event);
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Number of slides in the deck.
    #[must_use]
    pub fn slide_count(&self) -> usize {
        self.read().slides.len()
    }

    /// Index of the current slide.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.read().current
    }

    /// The current slide (cloned).
    #[must_use]
    pub fn current_slide(&self) -> Slide {
        let state = self.read();
        state.slides[state.current].clone()
    }

    /// A slide by index (cloned).
    #[must_use]
    pub fn slide(&self, index: usize) -> Option<Slide> {
        self.read().slides.get(index).cloned()
    }

    /// All slides (cloned).
    #[must_use]
    pub fn slides(&self) -> Vec<Slide> {
        self.read().slides.clone()
    }

    /// An element on the current slide by id (cloned).
    #[must_use]
    pub fn element(&self, id: ElementId) -> Option<Element> {
        let state = self.read();
        state.slides[state.current].element(id).cloned()
    }

    /// The currently selected element ids.
    #[must_use]
    pub fn selected_ids(&self) -> Vec<ElementId> {
        self.read().selected.clone()
    }

    // -----------------------------------------------------------------------
    // Slide management
    // -----------------------------------------------------------------------

    /// Append a new empty slide and return its id.
    pub fn add_slide(&self, title: impl Into<String>) -> SlideId {
        let slide = Slide::new(title);
        let id = slide.id;
        self.write().slides.push(slide);
        self.emit(StoreEvent::SlidesChanged);
        id
    }

    /// Remove the slide at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SlideOutOfRange`] for a bad index and
    /// [`StoreError::InvalidOperation`] when removing the last slide.
    pub fn remove_slide(&self, index: usize) -> StoreResult<()> {
        {
            let mut state = self.write();
            if index >= state.slides.len() {
                return Err(StoreError::SlideOutOfRange(index));
            }
            if state.slides.len() == 1 {
                return Err(StoreError::InvalidOperation(
                    "cannot remove the last slide".to_string(),
                ));
            }
            state.slides.remove(index);
            if state.current >= state.slides.len() {
                state.current = state.slides.len() - 1;
            }
            state.selected.clear();
        }
        self.emit(StoreEvent::SlidesChanged);
        self.emit(StoreEvent::SelectionChanged);
        Ok(())
    }

    /// Move a slide from one index to another, keeping the current slide
    /// pointing at the same slide when possible.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SlideOutOfRange`] if either index is out of
    /// bounds.
    pub fn move_slide(&self, from: usize, to: usize) -> StoreResult<()> {
        {
            let mut state = self.write();
            let len = state.slides.len();
            if from >= len {
                return Err(StoreError::SlideOutOfRange(from));
            }
            if to >= len {
                return Err(StoreError::SlideOutOfRange(to));
            }
            if from == to {
                return Ok(());
            }
            let slide = state.slides.remove(from);
            state.slides.insert(to, slide);
            let current = state.current;
            state.current = if current == from {
                to
            } else if from < current && current <= to {
                current - 1
            } else if to <= current && current < from {
                current + 1
            } else {
                current
            };
        }
        self.emit(StoreEvent::SlidesChanged);
        Ok(())
    }

    /// Switch the current slide.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SlideOutOfRange`] for a bad index.
    pub fn set_current_slide(&self, index: usize) -> StoreResult<()> {
        {
            let mut state = self.write();
            if index >= state.slides.len() {
                return Err(StoreError::SlideOutOfRange(index));
            }
            if state.current == index {
                return Ok(());
            }
            state.current = index;
            state.selected.clear();
        }
        self.emit(StoreEvent::SlidesChanged);
        self.emit(StoreEvent::SelectionChanged);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Element mutation
    // -----------------------------------------------------------------------

    /// Add an element to the current slide and return its id.
    pub fn add_element(&self, element: Element) -> ElementId {
        let (id, slide_id) = {
            let mut state = self.write();
            let current = state.current;
            let slide = &mut state.slides[current];
            let id = element.id;
            let slide_id = slide.id;
            slide.elements.push(element);
            (id, slide_id)
        };
        self.emit(StoreEvent::ElementsChanged { slide: slide_id });
        id
    }

    /// Apply a partial update to one element on the current slide.
    ///
    /// With `record_history` a checkpoint is pushed before the change;
    /// streamed updates (keystrokes, live gestures) pass `false` and rely on
    /// the caller's coarser checkpoints.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ElementNotFound`] if the id is not on the
    /// current slide.
    pub fn update_element(
        &self,
        id: ElementId,
        patch: &ElementPatch,
        record_history: bool,
    ) -> StoreResult<()> {
        let slide_id = {
            let mut state = self.write();
            let current = state.current;
            if state.slides[current].element(id).is_none() {
                return Err(StoreError::ElementNotFound(id.to_string()));
            }
            if record_history {
                state.push_checkpoint();
            }
            let slide = &mut state.slides[current];
            let slide_id = slide.id;
            if let Some(element) = slide.element_mut(id) {
                element.apply_patch(patch);
            }
            slide_id
        };
        self.emit(StoreEvent::ElementsChanged { slide: slide_id });
        Ok(())
    }

    /// Apply a batch of partial updates as one mutation.
    ///
    /// Ids missing from the current slide are skipped with a warning; the
    /// batch itself never fails and emits exactly one change event. History
    /// is the caller's concern (`push_to_history` before the batch).
    pub fn update_elements(&self, batch: &[(ElementId, ElementPatch)]) {
        let slide_id = {
            let mut state = self.write();
            let current = state.current;
            let slide = &mut state.slides[current];
            let slide_id = slide.id;
            for (id, patch) in batch {
                if let Some(element) = slide.element_mut(*id) {
                    element.apply_patch(patch);
                } else {
                    tracing::warn!("Batch update skipped missing element {id}");
                }
            }
            slide_id
        };
        self.emit(StoreEvent::ElementsChanged { slide: slide_id });
    }

    /// Remove elements from the current slide, pruning the selection.
    pub fn remove_elements(&self, ids: &[ElementId]) {
        let (slide_id, selection_changed) = {
            let mut state = self.write();
            state.push_checkpoint();
            let current = state.current;
            let slide = &mut state.slides[current];
            let slide_id = slide.id;
            slide.elements.retain(|e| !ids.contains(&e.id));
            let before = state.selected.len();
            state.selected.retain(|id| !ids.contains(id));
            (slide_id, state.selected.len() != before)
        };
        self.emit(StoreEvent::ElementsChanged { slide: slide_id });
        if selection_changed {
            self.emit(StoreEvent::SelectionChanged);
        }
    }

    /// Change an element's z-order.
    ///
    /// `Forward`/`Backward` swap z with the nearest neighbor in paint order;
    /// `Front`/`Back` jump past the extremes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ElementNotFound`] if the id is not on the
    /// current slide.
    pub fn reorder_element(&self, id: ElementId, direction: ReorderDirection) -> StoreResult<()> {
        let slide_id = {
            let mut state = self.write();
            let current = state.current;
            let slide = &mut state.slides[current];
            let slide_id = slide.id;

            let mut order: Vec<(ElementId, i32)> =
                slide.elements.iter().map(|e| (e.id, e.z_index)).collect();
            order.sort_by_key(|&(_, z)| z);
            let pos = order
                .iter()
                .position(|&(eid, _)| eid == id)
                .ok_or_else(|| StoreError::ElementNotFound(id.to_string()))?;

            let new_z = match direction {
                ReorderDirection::Forward => order.get(pos + 1).map(|&(_, z)| z),
                ReorderDirection::Backward => pos.checked_sub(1).map(|p| order[p].1),
                ReorderDirection::Front => order.last().map(|&(_, z)| z + 1),
                ReorderDirection::Back => order.first().map(|&(_, z)| z - 1),
            };

            if let Some(new_z) = new_z {
                // Neighbor swaps trade z values; jumps only move the target.
                match direction {
                    ReorderDirection::Forward | ReorderDirection::Backward => {
                        let own_z = order[pos].1;
                        if let Some(neighbor) = slide
                            .elements
                            .iter_mut()
                            .find(|e| e.z_index == new_z && e.id != id)
                        {
                            neighbor.z_index = own_z;
                        }
                    }
                    ReorderDirection::Front | ReorderDirection::Back => {}
                }
                if let Some(element) = slide.element_mut(id) {
                    element.z_index = new_z;
                }
            }
            slide_id
        };
        self.emit(StoreEvent::ElementsChanged { slide: slide_id });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    /// Select a single element, or clear the selection with `None`.
    pub fn select_element(&self, id: Option<ElementId>) {
        let ids: Vec<ElementId> = id.into_iter().collect();
        self.select_elements(&ids);
    }

    /// Replace the selection with the given ids.
    ///
    /// A write that leaves the selected-id *set* unchanged is dropped
    /// without an event, so guarded reconciliation converges instead of
    /// echoing.
    pub fn select_elements(&self, ids: &[ElementId]) {
        let changed = {
            let mut state = self.write();
            let old: HashSet<ElementId> = state.selected.iter().copied().collect();
            let new: HashSet<ElementId> = ids.iter().copied().collect();
            if old == new {
                false
            } else {
                let mut deduped = Vec::with_capacity(ids.len());
                for id in ids {
                    if !deduped.contains(id) {
                        deduped.push(*id);
                    }
                }
                state.selected = deduped;
                true
            }
        };
        if changed {
            self.emit(StoreEvent::SelectionChanged);
        }
    }

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    /// Push an undo checkpoint of the whole deck.
    pub fn push_to_history(&self) {
        self.write().push_checkpoint();
    }

    /// Undo the most recent checkpoint. Returns whether anything changed.
    pub fn undo(&self) -> bool {
        let restored = {
            let mut state = self.write();
            if let Some(snapshot) = state.undo_stack.pop() {
                let redo = state.snapshot();
                state.redo_stack.push(redo);
                state.restore(snapshot);
                true
            } else {
                false
            }
        };
        if restored {
            self.emit(StoreEvent::SlidesChanged);
            let slide_id = self.current_slide().id;
            self.emit(StoreEvent::ElementsChanged { slide: slide_id });
        }
        restored
    }

    /// Redo the most recently undone checkpoint. Returns whether anything
    /// changed.
    pub fn redo(&self) -> bool {
        let restored = {
            let mut state = self.write();
            if let Some(snapshot) = state.redo_stack.pop() {
                let undo = state.snapshot();
                state.undo_stack.push(undo);
                state.restore(snapshot);
                true
            } else {
                false
            }
        };
        if restored {
            self.emit(StoreEvent::SlidesChanged);
            let slide_id = self.current_slide().id;
            self.emit(StoreEvent::ElementsChanged { slide: slide_id });
        }
        restored
    }
}
