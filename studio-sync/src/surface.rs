//! The per-slide scene graph surface.
//!
//! A [`Surface`] is the mutable, interactive counterpart of one slide: one
//! scene node per visible element, an id→node map, the active selection,
//! and a cached screen-space offset for hit testing. It is a derived cache:
//! the document store owns element truth and the surface can be rebuilt
//! from it at any time.

use std::collections::HashMap;

use studio_core::{ElementId, Fill, ShapeType, SlideId, TextAlign};

use crate::config::NodeStyle;

/// An embedded label rendered inside a shape node.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelNode {
    /// Label text.
    pub content: String,
    /// Font family name.
    pub font_family: String,
    /// Font size in pixels.
    pub font_size: f32,
    /// Label color as hex.
    pub fill: String,
    /// Horizontal alignment.
    pub align: TextAlign,
    /// Hidden while an inline edit overlay covers it.
    pub visible: bool,
}

/// Kind-specific render payload of a scene node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Free-standing text.
    Text {
        /// Text content.
        content: String,
        /// Font family name.
        font_family: String,
        /// Font size in pixels.
        font_size: f32,
        /// Text color as hex.
        fill: String,
    },
    /// A geometric shape with an optional embedded label.
    Shape {
        /// Geometric variant.
        shape_type: ShapeType,
        /// Interior paint.
        fill: Fill,
        /// Stroke color as hex.
        stroke: String,
        /// Embedded label sub-node.
        label: Option<LabelNode>,
    },
    /// A bitmap image.
    Image {
        /// Source URI.
        src: String,
        /// Horizontal crop offset in natural pixels.
        crop_x: f32,
        /// Vertical crop offset in natural pixels.
        crop_y: f32,
    },
}

/// A mutable render object tagged with the id of exactly one element.
///
/// `left`/`top` locate the scaled bounding box's top-left corner in slide
/// coordinates; `width`/`height` are the unscaled extents and `scale_x`/
/// `scale_y` apply on top, so the on-screen box is `width * scale_x` by
/// `height * scale_y`. Rotation is stored as an angle about the box center
/// and does not move `left`/`top`.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    /// Back-reference to the owning element. Weak: the node never outlives
    /// a rebuild and the store never learns about it.
    pub element_id: ElementId,
    /// X of the scaled box's top-left corner.
    pub left: f32,
    /// Y of the scaled box's top-left corner.
    pub top: f32,
    /// Unscaled width in pixels.
    pub width: f32,
    /// Unscaled height in pixels.
    pub height: f32,
    /// Rotation in degrees about the box center.
    pub angle: f32,
    /// Horizontal scale factor.
    pub scale_x: f32,
    /// Vertical scale factor.
    pub scale_y: f32,
    /// Opacity (0.0 to 1.0).
    pub opacity: f32,
    /// False when the element is locked: no move/scale/rotate.
    pub interactive: bool,
    /// Interaction style merged at construction.
    pub style: NodeStyle,
    /// Bumped to force the host renderer to re-measure text metrics.
    pub metrics_epoch: u32,
    /// Render payload.
    pub kind: NodeKind,
}

impl SceneNode {
    /// Whether this node renders any text that depends on font metrics.
    #[must_use]
    pub fn has_text(&self) -> bool {
        match &self.kind {
            NodeKind::Text { .. } => true,
            NodeKind::Shape { label, .. } => label.is_some(),
            NodeKind::Image { .. } => false,
        }
    }

    /// Force the host renderer to re-measure this node's text.
    pub fn bump_metrics(&mut self) {
        self.metrics_epoch = self.metrics_epoch.wrapping_add(1);
    }
}

/// World-space box of a node with group transforms folded in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldBox {
    /// X of the scaled box's top-left corner.
    pub left: f32,
    /// Y of the scaled box's top-left corner.
    pub top: f32,
    /// Unscaled width in pixels.
    pub width: f32,
    /// Unscaled height in pixels.
    pub height: f32,
    /// Rotation in degrees.
    pub angle: f32,
    /// Composed horizontal scale.
    pub scale_x: f32,
    /// Composed vertical scale.
    pub scale_y: f32,
}

/// The transient wrapper representing a multi-selection.
///
/// Members keep their nodes; the group stores each member's center offset
/// in group space, so moving/scaling/rotating the group moves every member
/// without touching the nodes until commit time. Groups are cheap to form
/// and discard on every selection divergence.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupNode {
    /// Member element ids in selection order.
    pub members: Vec<ElementId>,
    /// Group center X in slide coordinates.
    pub center_x: f32,
    /// Group center Y in slide coordinates.
    pub center_y: f32,
    /// Group horizontal scale.
    pub scale_x: f32,
    /// Group vertical scale.
    pub scale_y: f32,
    /// Group rotation in degrees.
    pub angle: f32,
    /// Member box-center offsets from the group center, in group space.
    offsets: HashMap<ElementId, (f32, f32)>,
}

impl GroupNode {
    /// Form a group around the given nodes.
    fn form(nodes: &[&SceneNode]) -> Self {
        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;
        for node in nodes {
            min_x = min_x.min(node.left);
            min_y = min_y.min(node.top);
            max_x = max_x.max(node.left + node.width * node.scale_x);
            max_y = max_y.max(node.top + node.height * node.scale_y);
        }
        let center_x = (min_x + max_x) / 2.0;
        let center_y = (min_y + max_y) / 2.0;

        let mut offsets = HashMap::with_capacity(nodes.len());
        let mut members = Vec::with_capacity(nodes.len());
        for node in nodes {
            let cx = node.left + node.width * node.scale_x / 2.0;
            let cy = node.top + node.height * node.scale_y / 2.0;
            offsets.insert(node.element_id, (cx - center_x, cy - center_y));
            members.push(node.element_id);
        }

        Self {
            members,
            center_x,
            center_y,
            scale_x: 1.0,
            scale_y: 1.0,
            angle: 0.0,
            offsets,
        }
    }

    /// World-space center of a member's box under the group transform.
    #[must_use]
    pub fn member_center(&self, id: ElementId) -> Option<(f32, f32)> {
        let (ox, oy) = *self.offsets.get(&id)?;
        let sx = ox * self.scale_x;
        let sy = oy * self.scale_y;
        let rad = self.angle.to_radians();
        let (sin, cos) = rad.sin_cos();
        Some((
            self.center_x + sx * cos - sy * sin,
            self.center_y + sx * sin + sy * cos,
        ))
    }
}

/// The active selection on a surface.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ActiveSelection {
    /// Nothing selected.
    #[default]
    None,
    /// One node active.
    Single(ElementId),
    /// Several nodes wrapped in a transient group.
    Group(GroupNode),
}

impl ActiveSelection {
    /// The selected element ids, in selection order.
    #[must_use]
    pub fn ids(&self) -> Vec<ElementId> {
        match self {
            Self::None => Vec::new(),
            Self::Single(id) => vec![*id],
            Self::Group(group) => group.members.clone(),
        }
    }

    /// Whether the id is part of the selection.
    #[must_use]
    pub fn contains(&self, id: ElementId) -> bool {
        match self {
            Self::None => false,
            Self::Single(single) => *single == id,
            Self::Group(group) => group.members.contains(&id),
        }
    }
}

/// One slide's interactive rendering surface.
///
/// Created once per mounted slide, keyed by the stable slide id so a deck
/// reorder never tears it down, and disposed on unmount. Exclusively owned
/// by one controller; nothing else may mutate it.
#[derive(Debug)]
pub struct Surface {
    slide_id: SlideId,
    /// Nodes in paint order (ascending z at build time).
    nodes: Vec<SceneNode>,
    /// Element id → index into `nodes`.
    index: HashMap<ElementId, usize>,
    active: ActiveSelection,
    /// Cached screen-space offset of the surface origin, for hit testing.
    offset: Option<(f32, f32)>,
    disposed: bool,
    render_count: u64,
}

impl Surface {
    /// Create an empty surface for a slide.
    #[must_use]
    pub fn new(slide_id: SlideId) -> Self {
        Self {
            slide_id,
            nodes: Vec::new(),
            index: HashMap::new(),
            active: ActiveSelection::None,
            offset: None,
            disposed: false,
            render_count: 0,
        }
    }

    /// The owning slide's stable id.
    #[must_use]
    pub fn slide_id(&self) -> SlideId {
        self.slide_id
    }

    /// Whether the surface has been disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Dispose the surface. Further renders and node operations are no-ops.
    pub fn dispose(&mut self) {
        self.disposed = true;
        self.nodes.clear();
        self.index.clear();
        self.active = ActiveSelection::None;
    }

    /// Schedule a repaint on the host renderer.
    pub fn request_render(&mut self) {
        if self.disposed {
            tracing::debug!("Render requested on disposed surface {}", self.slide_id);
            return;
        }
        self.render_count += 1;
    }

    /// Number of repaints requested so far.
    #[must_use]
    pub fn render_count(&self) -> u64 {
        self.render_count
    }

    /// Whether any nodes are populated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether a node is tagged with the given element id.
    #[must_use]
    pub fn contains(&self, id: ElementId) -> bool {
        self.index.contains_key(&id)
    }

    /// Nodes in paint order.
    #[must_use]
    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    /// A node by element id.
    #[must_use]
    pub fn node(&self, id: ElementId) -> Option<&SceneNode> {
        self.index.get(&id).map(|&i| &self.nodes[i])
    }

    /// A mutable node by element id.
    pub fn node_mut(&mut self, id: ElementId) -> Option<&mut SceneNode> {
        self.index.get(&id).map(|&i| &mut self.nodes[i])
    }

    /// Append a node. Paint order is insertion order.
    pub fn add_node(&mut self, node: SceneNode) {
        if self.disposed {
            tracing::debug!("Node add on disposed surface {}", self.slide_id);
            return;
        }
        self.index.insert(node.element_id, self.nodes.len());
        self.nodes.push(node);
    }

    /// Remove a node by element id.
    pub fn remove_node(&mut self, id: ElementId) -> Option<SceneNode> {
        let pos = self.index.remove(&id)?;
        let node = self.nodes.remove(pos);
        for slot in self.index.values_mut() {
            if *slot > pos {
                *slot -= 1;
            }
        }
        if self.active.contains(id) {
            let remaining: Vec<ElementId> =
                self.active.ids().into_iter().filter(|&i| i != id).collect();
            self.set_active(&remaining);
        }
        Some(node)
    }

    /// Drop every node and the active selection.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.index.clear();
        self.active = ActiveSelection::None;
    }

    /// The active selection.
    #[must_use]
    pub fn active(&self) -> &ActiveSelection {
        &self.active
    }

    /// The active element ids, in selection order.
    #[must_use]
    pub fn active_ids(&self) -> Vec<ElementId> {
        self.active.ids()
    }

    /// Replace the active selection.
    ///
    /// Unknown ids are dropped; two or more surviving ids form a transient
    /// group wrapper, which is recomputed from scratch on every call.
    pub fn set_active(&mut self, ids: &[ElementId]) {
        let known: Vec<ElementId> = ids.iter().copied().filter(|&id| self.contains(id)).collect();
        self.active = match known.len() {
            0 => ActiveSelection::None,
            1 => ActiveSelection::Single(known[0]),
            _ => {
                let nodes: Vec<&SceneNode> = known
                    .iter()
                    .filter_map(|&id| self.node(id))
                    .collect();
                ActiveSelection::Group(GroupNode::form(&nodes))
            }
        };
    }

    /// Clear the active selection.
    pub fn deselect_all(&mut self) {
        self.active = ActiveSelection::None;
    }

    /// Mutable access to the transient group wrapper, if one is active.
    ///
    /// Hosts drive group scale/rotate gestures through this; the commit
    /// paths decompose the composed transform per member afterwards.
    pub fn active_group_mut(&mut self) -> Option<&mut GroupNode> {
        match &mut self.active {
            ActiveSelection::Group(group) => Some(group),
            _ => None,
        }
    }

    /// Translate the active selection by a delta without committing.
    pub fn translate_active(&mut self, dx: f32, dy: f32) {
        match &mut self.active {
            ActiveSelection::None => {}
            ActiveSelection::Single(id) => {
                let id = *id;
                if let Some(node) = self.node_mut(id) {
                    node.left += dx;
                    node.top += dy;
                }
            }
            ActiveSelection::Group(group) => {
                group.center_x += dx;
                group.center_y += dy;
            }
        }
    }

    /// A node's world box with any group transform folded in.
    ///
    /// Group scale and rotation compose with the node's own; the returned
    /// `left`/`top` convert the composed center back to a top-left corner.
    #[must_use]
    pub fn world_box(&self, id: ElementId) -> Option<WorldBox> {
        let node = self.node(id)?;
        if let ActiveSelection::Group(group) = &self.active {
            if let Some((cx, cy)) = group.member_center(id) {
                let scale_x = group.scale_x * node.scale_x;
                let scale_y = group.scale_y * node.scale_y;
                return Some(WorldBox {
                    left: cx - node.width * scale_x / 2.0,
                    top: cy - node.height * scale_y / 2.0,
                    width: node.width,
                    height: node.height,
                    angle: group.angle + node.angle,
                    scale_x,
                    scale_y,
                });
            }
        }
        Some(WorldBox {
            left: node.left,
            top: node.top,
            width: node.width,
            height: node.height,
            angle: node.angle,
            scale_x: node.scale_x,
            scale_y: node.scale_y,
        })
    }

    /// Bump the metrics epoch of every text-bearing node and repaint.
    pub fn remeasure_text(&mut self) {
        if self.disposed {
            return;
        }
        let mut touched = false;
        for node in &mut self.nodes {
            if node.has_text() {
                node.bump_metrics();
                touched = true;
            }
        }
        if touched {
            self.request_render();
        }
    }

    /// The cached screen-space offset, if known.
    #[must_use]
    pub fn offset(&self) -> Option<(f32, f32)> {
        self.offset
    }

    /// Replace the cached screen-space offset.
    pub fn set_offset(&mut self, offset: Option<(f32, f32)>) {
        self.offset = offset;
    }
}
