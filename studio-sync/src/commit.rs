//! Interaction commit pipeline: turn finished gestures into store
//! mutations.
//!
//! Live gestures mutate scene nodes directly; nothing reaches the store
//! until release. Commit granularity is the unit of undo: one checkpoint
//! per gesture, however many elements it touched.

use studio_core::{Element, ElementId, ElementKind, ElementPatch, Point, Size};

use crate::controller::{DeferredAction, SlideController};
use crate::surface::{ActiveSelection, WorldBox};
use crate::{SyncError, SyncResult};

/// Translate a node's final world box into a store patch.
///
/// Text bakes scale into font size and extents, rectangle-like shapes into
/// extents; images (and open shapes like lines) keep their authored scale
/// because crop and endpoint math read natural pixels.
fn commit_patch(element: &Element, world: &WorldBox) -> ElementPatch {
    let mut patch = ElementPatch {
        position: Some(Point::new(world.left, world.top)),
        rotation: Some(world.angle),
        ..ElementPatch::default()
    };
    match &element.kind {
        ElementKind::Text(text) => {
            patch.font_size = Some(text.font_size * world.scale_y);
            patch.size = Some(Size::new(
                world.width * world.scale_x,
                world.height * world.scale_y,
            ));
            patch.scale_x = Some(1.0);
            patch.scale_y = Some(1.0);
        }
        ElementKind::Shape(shape) if shape.shape_type.is_rectangle_like() => {
            patch.size = Some(Size::new(
                world.width * world.scale_x,
                world.height * world.scale_y,
            ));
            patch.scale_x = Some(1.0);
            patch.scale_y = Some(1.0);
        }
        ElementKind::Shape(_) | ElementKind::Image(_) => {
            patch.scale_x = Some(world.scale_x);
            patch.scale_y = Some(world.scale_y);
        }
    }
    patch
}

/// Whether committing this element resets its node scale to 1.
fn bakes_scale(element: &Element) -> bool {
    match &element.kind {
        ElementKind::Text(_) => true,
        ElementKind::Shape(shape) => shape.shape_type.is_rectangle_like(),
        ElementKind::Image(_) => false,
    }
}

impl SlideController {
    /// Commit one node's gesture on release.
    ///
    /// Reads the node's final left/top/angle/scale, writes one partial
    /// update behind one history checkpoint, and resets the node's scale
    /// so the next gesture does not compound.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NodeNotFound`] when no node carries the id;
    /// store failures propagate.
    pub fn commit_node(&mut self, id: ElementId) -> SyncResult<()> {
        let Some(node) = self.surface.node(id) else {
            return Err(SyncError::NodeNotFound(id.to_string()));
        };
        if !node.interactive {
            tracing::debug!("Commit ignored for locked element {id}");
            return Ok(());
        }
        let Some(element) = self.store.element(id) else {
            return Err(SyncError::Store(studio_core::StoreError::ElementNotFound(
                id.to_string(),
            )));
        };
        let Some(world) = self.surface.world_box(id) else {
            return Err(SyncError::NodeNotFound(id.to_string()));
        };

        let patch = commit_patch(&element, &world);
        self.store.push_to_history();
        self.store.update_element(id, &patch, false)?;

        if bakes_scale(&element) {
            if let Some(node) = self.surface.node_mut(id) {
                let (sx, sy) = (node.scale_x, node.scale_y);
                node.width *= sx;
                node.height *= sy;
                if let crate::surface::NodeKind::Text { font_size, .. } = &mut node.kind {
                    *font_size *= sy;
                }
                node.scale_x = 1.0;
                node.scale_y = 1.0;
            }
        }
        Ok(())
    }

    /// Nudge the active selection by a pixel delta (keyboard arrows).
    ///
    /// The whole selection translates live; every interactive member's
    /// composed transform is decomposed back to a top-left world position
    /// and the result is written as a single batched update per nudge.
    /// The reconciler stays suppressed until two frames later, because the
    /// host renderer's own reflow runs one frame behind the gesture.
    pub fn nudge_selection(&mut self, dx: f32, dy: f32) {
        if self.edit.is_some() {
            return;
        }
        if let ActiveSelection::Single(id) = self.surface.active() {
            let id = *id;
            if !self.surface.node(id).is_some_and(|node| node.interactive) {
                tracing::debug!("Nudge ignored for locked element {id}");
                return;
            }
        }
        let members = self.surface.active_ids();
        if members.is_empty() {
            return;
        }

        // Guard up before the store write so the change event cannot
        // trigger a rebuild mid-gesture.
        self.multi_select_modifying = true;
        self.schedule(2, DeferredAction::ClearMultiSelectGuard);

        self.surface.translate_active(dx, dy);

        let mut batch = Vec::with_capacity(members.len());
        for id in members {
            let Some(node) = self.surface.node(id) else {
                continue;
            };
            if !node.interactive {
                continue;
            }
            let Some(world) = self.surface.world_box(id) else {
                continue;
            };
            batch.push((id, ElementPatch::at(world.left, world.top)));
        }
        if !batch.is_empty() {
            self.store.update_elements(&batch);
        }
        self.surface.request_render();
    }

    /// Record every group member's pre-drag world position.
    ///
    /// Called whenever a multi-selection forms; [`Self::end_multi_drag`]
    /// diffs against these to decide what actually moved.
    pub(crate) fn record_drag_origins(&mut self) {
        self.drag_origin.clear();
        let members = match self.surface.active() {
            ActiveSelection::Group(group) => group.members.clone(),
            _ => return,
        };
        for id in members {
            if let Some(world) = self.surface.world_box(id) {
                self.drag_origin.insert(id, (world.left, world.top));
            }
        }
    }

    /// Finalize a multi-select drag.
    ///
    /// Compares each member's current world position against the recorded
    /// pre-drag position within a sub-pixel epsilon; when anything moved,
    /// pushes exactly one history checkpoint and one batched update with
    /// every changed member's per-type commit patch.
    pub fn end_multi_drag(&mut self) {
        let members = match self.surface.active() {
            ActiveSelection::Group(group) => group.members.clone(),
            _ => {
                self.drag_origin.clear();
                return;
            }
        };
        let epsilon = self.config.drag_epsilon;

        let mut batch = Vec::new();
        for id in members {
            let Some(&(origin_x, origin_y)) = self.drag_origin.get(&id) else {
                continue;
            };
            let Some(node) = self.surface.node(id) else {
                continue;
            };
            if !node.interactive {
                continue;
            }
            let Some(world) = self.surface.world_box(id) else {
                continue;
            };
            if (world.left - origin_x).abs() <= epsilon && (world.top - origin_y).abs() <= epsilon {
                continue;
            }
            let Some(element) = self.store.element(id) else {
                continue;
            };
            batch.push((id, commit_patch(&element, &world)));
        }
        self.drag_origin.clear();

        if batch.is_empty() {
            return;
        }
        self.store.push_to_history();
        self.store.update_elements(&batch);
    }
}

#[cfg(test)]
mod tests {
    use studio_core::{
        DocumentStore, Element, ElementKind, EventBus, ImageProps, ShapeProps, TextProps,
    };

    use crate::{EngineConfig, SlideController};

    async fn mounted(store: &DocumentStore) -> SlideController {
        let slide_id = store.current_slide().id;
        let mut controller = SlideController::new(
            slide_id,
            store.clone(),
            EventBus::new(),
            EngineConfig::default(),
        );
        controller.mount().await.expect("mount");
        controller
    }

    #[tokio::test]
    async fn test_text_commit_bakes_scale_into_font_size() {
        let store = DocumentStore::new();
        let id = store.add_element(
            Element::new(ElementKind::Text(TextProps {
                font_size: 20.0,
                ..TextProps::default()
            }))
            .with_size(200.0, 50.0),
        );
        let mut controller = mounted(&store).await;

        {
            let node = controller.surface_mut().node_mut(id).expect("node");
            node.scale_x = 2.0;
            node.scale_y = 1.5;
            node.left = 30.0;
        }
        controller.commit_node(id).expect("commit");

        let element = store.element(id).expect("element");
        match &element.kind {
            ElementKind::Text(text) => assert!((text.font_size - 30.0).abs() < 1e-3),
            _ => panic!("expected text"),
        }
        assert!((element.size.width - 400.0).abs() < 1e-3);
        assert!((element.size.height - 75.0).abs() < 1e-3);
        assert!((element.scale_x - 1.0).abs() < f32::EPSILON);

        // The node is baked too.
        let node = controller.surface().node(id).expect("node");
        assert!((node.scale_x - 1.0).abs() < f32::EPSILON);
        assert!((node.width - 400.0).abs() < 1e-3);
    }

    #[tokio::test]
    async fn test_image_commit_preserves_scale() {
        let store = DocumentStore::new();
        let id = store.add_element(
            Element::new(ElementKind::Image(ImageProps {
                src: "asset://photo.png".to_string(),
                ..ImageProps::default()
            }))
            .with_size(320.0, 240.0),
        );
        let mut controller = mounted(&store).await;

        {
            let node = controller.surface_mut().node_mut(id).expect("node");
            node.scale_x = 0.5;
            node.scale_y = 0.5;
        }
        controller.commit_node(id).expect("commit");

        let element = store.element(id).expect("element");
        // Natural size untouched, authored scale persisted.
        assert!((element.size.width - 320.0).abs() < f32::EPSILON);
        assert!((element.scale_x - 0.5).abs() < f32::EPSILON);
        let node = controller.surface().node(id).expect("node");
        assert!((node.scale_x - 0.5).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_shape_commit_bakes_size() {
        let store = DocumentStore::new();
        let id = store.add_element(
            Element::new(ElementKind::Shape(ShapeProps::default())).with_size(100.0, 80.0),
        );
        let mut controller = mounted(&store).await;

        {
            let node = controller.surface_mut().node_mut(id).expect("node");
            node.scale_x = 3.0;
        }
        controller.commit_node(id).expect("commit");

        let element = store.element(id).expect("element");
        assert!((element.size.width - 300.0).abs() < 1e-3);
        assert!((element.scale_x - 1.0).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_commit_is_one_checkpoint() {
        let store = DocumentStore::new();
        let id = store.add_element(Element::new(ElementKind::Shape(ShapeProps::default())));
        let mut controller = mounted(&store).await;

        {
            let node = controller.surface_mut().node_mut(id).expect("node");
            node.left = 55.0;
        }
        controller.commit_node(id).expect("commit");

        assert!(store.undo());
        let element = store.element(id).expect("element");
        assert!(element.position.x.abs() < f32::EPSILON);
        // One checkpoint: a second undo has nothing left.
        assert!(!store.undo());
    }

    #[tokio::test]
    async fn test_nudge_skips_locked_members() {
        let store = DocumentStore::new();
        let locked = store
            .add_element(Element::new(ElementKind::Text(TextProps::default())).with_locked(true));
        let free = store.add_element(
            Element::new(ElementKind::Text(TextProps::default())).with_position(200.0, 0.0),
        );
        let mut controller = mounted(&store).await;
        controller.notify_scene_selection(&[locked, free]);

        controller.nudge_selection(10.0, 0.0);

        let locked_element = store.element(locked).expect("locked");
        assert!(locked_element.position.x.abs() < f32::EPSILON);
        let free_element = store.element(free).expect("free");
        assert!((free_element.position.x - 210.0).abs() < 1e-3);
    }

    #[tokio::test]
    async fn test_nudge_suppresses_reconciler_for_two_frames() {
        let store = DocumentStore::new();
        let a = store.add_element(Element::new(ElementKind::Text(TextProps::default())));
        let b = store.add_element(
            Element::new(ElementKind::Text(TextProps::default())).with_position(150.0, 0.0),
        );
        let mut controller = mounted(&store).await;
        controller.notify_scene_selection(&[a, b]);

        controller.nudge_selection(0.0, 10.0);
        assert!(controller.multi_select_modifying);
        controller.tick();
        assert!(controller.multi_select_modifying);
        controller.tick();
        assert!(!controller.multi_select_modifying);
    }
}
