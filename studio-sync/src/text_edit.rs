//! Inline editing of text embedded in shapes.
//!
//! An edit session is a value owned by the controller, not a hidden node
//! convention: entering spawns an unstyled overlay positioned over the
//! shape, leaving writes the result back as one store update. At most one
//! session exists, and the element reconciler stays suspended while it
//! does.

use studio_core::{ElementId, ElementPatch, Size};

use crate::controller::SlideController;
use crate::surface::NodeKind;
use crate::{SyncError, SyncResult};

/// Line height used for wrapped label measurement.
const LABEL_LINE_HEIGHT: f32 = 1.2;

/// Synchronous text measurement contract.
///
/// The host renderer owns real font metrics; the engine only needs wrapped
/// heights. Measurements taken before a family's metrics settle are
/// corrected by the reconciler's remeasure passes.
pub trait TextMeasurer: Send + Sync {
    /// Height in pixels of `content` wrapped at `max_width`.
    fn measure_height(
        &self,
        content: &str,
        font_size: f32,
        line_height: f32,
        max_width: f32,
    ) -> f32;
}

/// Glyph-width estimate measurer for hosts and tests without a text stack.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicMeasurer;

impl TextMeasurer for HeuristicMeasurer {
    fn measure_height(
        &self,
        content: &str,
        font_size: f32,
        line_height: f32,
        max_width: f32,
    ) -> f32 {
        let glyph_width = (font_size * 0.6).max(1.0);
        let per_line = (max_width / glyph_width).floor().max(1.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let per_line = per_line as usize;

        let mut lines = 0usize;
        for raw in content.split('\n') {
            let chars = raw.chars().count();
            lines += 1 + chars.saturating_sub(1) / per_line;
        }
        #[allow(clippy::cast_precision_loss)]
        let lines = lines.max(1) as f32;
        lines * font_size * line_height
    }
}

/// The overlay node covering a shape while its label is edited.
///
/// Plain text, no selection chrome; it tracks the shape's placement and is
/// discarded on exit.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayNode {
    /// X of the overlay's top-left corner.
    pub left: f32,
    /// Y of the overlay's top-left corner.
    pub top: f32,
    /// Rotation matching the shape, in degrees.
    pub angle: f32,
    /// Wrap width: the shape's scaled width.
    pub width: f32,
    /// Font family copied from the label.
    pub font_family: String,
    /// Font size copied from the label.
    pub font_size: f32,
    /// Text color copied from the label.
    pub fill: String,
}

/// An active inline edit: `IDLE → EDITING → IDLE` with the session value
/// existing only in the EDITING state.
#[derive(Debug, Clone, PartialEq)]
pub struct EditSession {
    /// The shape being edited.
    pub element_id: ElementId,
    /// Current text, updated on every keystroke.
    pub content: String,
    /// The temporary overlay node.
    pub overlay: OverlayNode,
    /// Whether the whole text is selected (true right after entry).
    pub select_all: bool,
    /// Label visibility to restore on exit.
    label_was_visible: bool,
}

impl SlideController {
    /// Enter an edit session on a shape (double-click).
    ///
    /// Hides the shape's label sub-node, spawns the overlay seeded with
    /// the existing text, and selects all. An already-active session on a
    /// different shape is committed first.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NodeNotFound`] when no node carries the id and
    /// [`SyncError::InvalidElement`] when the node is not a shape.
    pub fn begin_text_edit(&mut self, id: ElementId) -> SyncResult<()> {
        if let Some(session) = &self.edit {
            if session.element_id == id {
                return Ok(());
            }
            self.end_text_edit()?;
        }

        let Some(node) = self.surface.node_mut(id) else {
            return Err(SyncError::NodeNotFound(id.to_string()));
        };
        let NodeKind::Shape { label, .. } = &mut node.kind else {
            return Err(SyncError::InvalidElement(format!(
                "inline edit targets shapes, got element {id}"
            )));
        };

        let (content, font_family, font_size, fill, label_was_visible) = match label {
            Some(label) => {
                let seeded = (
                    label.content.clone(),
                    label.font_family.clone(),
                    label.font_size,
                    label.fill.clone(),
                    label.visible,
                );
                label.visible = false;
                seeded
            }
            None => (
                String::new(),
                "Inter".to_string(),
                14.0,
                "#000000".to_string(),
                true,
            ),
        };

        let overlay = OverlayNode {
            left: node.left,
            top: node.top,
            angle: node.angle,
            width: node.width * node.scale_x,
            font_family,
            font_size,
            fill,
        };
        self.edit = Some(EditSession {
            element_id: id,
            content,
            overlay,
            select_all: true,
            label_was_visible,
        });
        self.surface.request_render();
        Ok(())
    }

    /// Apply a keystroke: `content` is the full current text.
    ///
    /// Re-measures the wrapped height and grows the underlying shape in
    /// place when the text no longer fits, correcting for the node's
    /// compounded scale. The text itself streams to the store without a
    /// history checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidElement`] when no session is active.
    pub fn edit_input(&mut self, content: &str) -> SyncResult<()> {
        let Some(session) = self.edit.as_mut() else {
            return Err(SyncError::InvalidElement(
                "keystroke without an active edit session".to_string(),
            ));
        };
        let id = session.element_id;
        let font_size = session.overlay.font_size;
        let wrap_width = session.overlay.width;

        let measured =
            self.measurer
                .measure_height(content, font_size, LABEL_LINE_HEIGHT, wrap_width);

        if let Some(node) = self.surface.node_mut(id) {
            let world_height = node.height * node.scale_y;
            if measured > world_height + self.config.grow_tolerance {
                node.height = measured / node.scale_y;
                // Re-pin the overlay: growth extends downward from the
                // shape's anchored corner.
                session.overlay.left = node.left;
                session.overlay.top = node.top;
            }
        }

        session.content = content.to_string();
        session.select_all = false;

        self.store.update_element(
            id,
            &ElementPatch {
                content: Some(content.to_string()),
                ..ElementPatch::default()
            },
            false,
        )?;
        self.surface.request_render();
        Ok(())
    }

    /// Exit the edit session (blur or deselect).
    ///
    /// Writes the final text and final shape height back as one update
    /// behind one checkpoint, restores the label sub-node, and discards
    /// the overlay.
    ///
    /// # Errors
    ///
    /// Store failures propagate; the session is closed regardless.
    pub fn end_text_edit(&mut self) -> SyncResult<()> {
        let Some(session) = self.edit.take() else {
            return Ok(());
        };
        let id = session.element_id;

        let mut final_size = None;
        if let Some(node) = self.surface.node_mut(id) {
            final_size = Some(Size::new(node.width, node.height));
            if let NodeKind::Shape { label, .. } = &mut node.kind {
                if let Some(label) = label {
                    label.content.clone_from(&session.content);
                    label.visible = session.label_was_visible;
                }
            }
        }

        self.store.push_to_history();
        let result = self.store.update_element(
            id,
            &ElementPatch {
                content: Some(session.content),
                size: final_size,
                ..ElementPatch::default()
            },
            false,
        );
        self.surface.request_render();

        if let Err(e) = result {
            // The element may have been deleted out from under the session.
            tracing::warn!("Inline edit result for {id} could not be saved: {e}");
        }
        Ok(())
    }
}
