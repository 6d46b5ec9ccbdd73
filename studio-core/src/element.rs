//! Slide elements - the building blocks of a composition.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an element.
///
/// Ids are minted by whoever creates the element (layout, import, UI); the
/// sync engine only ever reads and writes by id and never regenerates one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId(Uuid);

impl ElementId {
    /// Create a new unique element ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlideId(Uuid);

impl SlideId {
    /// Create a new unique slide ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SlideId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SlideId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A 2D point in slide coordinates (pixels from the top-left corner).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
}

impl Point {
    /// Create a point.
    #[must_use]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A 2D size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
}

impl Size {
    /// Create a size.
    #[must_use]
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl Default for Size {
    fn default() -> Self {
        Self {
            width: 100.0,
            height: 100.0,
        }
    }
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    /// Left aligned.
    #[default]
    Left,
    /// Centered.
    Center,
    /// Right aligned.
    Right,
    /// Justified.
    Justify,
}

/// Font slant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    /// Upright glyphs.
    #[default]
    Normal,
    /// Italic glyphs.
    Italic,
}

/// Text decoration line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDecoration {
    /// No decoration.
    #[default]
    None,
    /// Underline.
    Underline,
    /// Strike-through.
    LineThrough,
}

/// Geometric shape variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeType {
    /// Axis-aligned rectangle.
    #[default]
    Rectangle,
    /// Rectangle with rounded corners.
    RoundedRectangle,
    /// Ellipse inscribed in the bounding box.
    Ellipse,
    /// Triangle inscribed in the bounding box.
    Triangle,
    /// Straight line across the bounding box diagonal.
    Line,
}

impl ShapeType {
    /// Whether the shape commits scale by baking it into width/height.
    ///
    /// Lines keep their authored scale; everything with a filled interior
    /// is treated as rectangle-like for commit purposes.
    #[must_use]
    pub fn is_rectangle_like(self) -> bool {
        !matches!(self, Self::Line)
    }
}

/// A color stop in a gradient fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    /// Position along the gradient axis (0.0 to 1.0).
    pub offset: f32,
    /// Stop color as hex.
    pub color: String,
}

/// Fill paint for shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Fill {
    /// A single solid color as hex.
    Solid(String),
    /// A linear gradient.
    Gradient {
        /// Gradient color stops.
        stops: Vec<GradientStop>,
        /// Gradient axis angle in degrees.
        angle: f32,
    },
}

impl Default for Fill {
    fn default() -> Self {
        Self::Solid("#d9d9d9".to_string())
    }
}

/// Properties of a free-standing text element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextProps {
    /// Text content, may contain newlines.
    pub content: String,
    /// Font family name.
    pub font_family: String,
    /// Font size in pixels.
    pub font_size: f32,
    /// Font weight (100-900).
    pub font_weight: u16,
    /// Font slant.
    pub font_style: FontStyle,
    /// Horizontal alignment.
    pub align: TextAlign,
    /// Decoration line.
    pub decoration: TextDecoration,
    /// Line height multiplier.
    pub line_height: f32,
    /// Letter spacing in pixels.
    pub letter_spacing: f32,
    /// Text color as hex.
    pub fill: String,
}

impl Default for TextProps {
    fn default() -> Self {
        Self {
            content: String::new(),
            font_family: "Inter".to_string(),
            font_size: 16.0,
            font_weight: 400,
            font_style: FontStyle::Normal,
            align: TextAlign::Left,
            decoration: TextDecoration::None,
            line_height: 1.2,
            letter_spacing: 0.0,
            fill: "#000000".to_string(),
        }
    }
}

/// Text embedded inside a shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeLabel {
    /// Label content, may contain newlines.
    pub content: String,
    /// Font family name.
    pub font_family: String,
    /// Font size in pixels.
    pub font_size: f32,
    /// Label color as hex.
    pub fill: String,
    /// Horizontal alignment.
    pub align: TextAlign,
}

impl Default for ShapeLabel {
    fn default() -> Self {
        Self {
            content: String::new(),
            font_family: "Inter".to_string(),
            font_size: 14.0,
            fill: "#000000".to_string(),
            align: TextAlign::Center,
        }
    }
}

/// Properties of a shape element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeProps {
    /// Geometric variant.
    pub shape_type: ShapeType,
    /// Interior paint.
    pub fill: Fill,
    /// Stroke color as hex.
    pub stroke: String,
    /// Stroke width in pixels.
    pub stroke_width: f32,
    /// Stroke dash pattern (empty = solid).
    pub dash_array: Vec<f32>,
    /// Corner radius for rounded variants.
    pub corner_radius: f32,
    /// Optional embedded text.
    pub label: Option<ShapeLabel>,
}

impl Default for ShapeProps {
    fn default() -> Self {
        Self {
            shape_type: ShapeType::Rectangle,
            fill: Fill::default(),
            stroke: "#333333".to_string(),
            stroke_width: 1.0,
            dash_array: Vec::new(),
            corner_radius: 0.0,
            label: None,
        }
    }
}

/// Properties of an image element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageProps {
    /// Image source URI (opaque to the engine).
    pub src: String,
    /// Horizontal crop offset in natural pixels.
    pub crop_x: f32,
    /// Vertical crop offset in natural pixels.
    pub crop_y: f32,
    /// Corner radius applied to the image frame.
    pub corner_radius: f32,
}

impl Default for ImageProps {
    fn default() -> Self {
        Self {
            src: String::new(),
            crop_x: 0.0,
            crop_y: 0.0,
            corner_radius: 0.0,
        }
    }
}

/// The type of content an element contains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ElementKind {
    /// Free-standing text.
    Text(TextProps),
    /// A geometric shape, optionally with embedded text.
    Shape(ShapeProps),
    /// A bitmap image.
    Image(ImageProps),
}

/// A slide element with content and placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Unique identifier, stable for the element's lifetime.
    pub id: ElementId,
    /// Top-left position in slide coordinates.
    pub position: Point,
    /// Unscaled size in pixels.
    pub size: Size,
    /// Rotation in degrees, clockwise.
    pub rotation: f32,
    /// Opacity (0.0 to 1.0).
    pub opacity: f32,
    /// Whether interaction (move/scale/rotate) is disabled.
    pub locked: bool,
    /// Whether the element is rendered at all.
    pub visible: bool,
    /// Z-order; higher values paint on top.
    pub z_index: i32,
    /// Horizontal scale factor.
    pub scale_x: f32,
    /// Vertical scale factor.
    pub scale_y: f32,
    /// Element content.
    pub kind: ElementKind,
}

impl Element {
    /// Create a new element with the given kind at the origin.
    #[must_use]
    pub fn new(kind: ElementKind) -> Self {
        Self {
            id: ElementId::new(),
            position: Point::default(),
            size: Size::default(),
            rotation: 0.0,
            opacity: 1.0,
            locked: false,
            visible: true,
            z_index: 0,
            scale_x: 1.0,
            scale_y: 1.0,
            kind,
        }
    }

    /// Set the position.
    #[must_use]
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = Point::new(x, y);
        self
    }

    /// Set the size.
    #[must_use]
    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.size = Size::new(width, height);
        self
    }

    /// Set the z-order.
    #[must_use]
    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    /// Set the rotation in degrees.
    #[must_use]
    pub fn with_rotation(mut self, degrees: f32) -> Self {
        self.rotation = degrees;
        self
    }

    /// Set the locked flag.
    #[must_use]
    pub fn with_locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    /// Feed every mutable visual field into a hasher.
    ///
    /// This is the element's contribution to the slide fingerprint used for
    /// dirty-checking; any field that can change what the scene graph shows
    /// must be included. Floats hash by bit pattern.
    pub fn hash_visual<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        hash_f32(self.position.x, state);
        hash_f32(self.position.y, state);
        hash_f32(self.size.width, state);
        hash_f32(self.size.height, state);
        hash_f32(self.rotation, state);
        hash_f32(self.opacity, state);
        self.locked.hash(state);
        self.visible.hash(state);
        self.z_index.hash(state);
        hash_f32(self.scale_x, state);
        hash_f32(self.scale_y, state);
        match &self.kind {
            ElementKind::Text(t) => {
                0u8.hash(state);
                t.content.hash(state);
                t.font_family.hash(state);
                hash_f32(t.font_size, state);
                t.font_weight.hash(state);
                t.font_style.hash(state);
                t.align.hash(state);
                t.decoration.hash(state);
                hash_f32(t.line_height, state);
                hash_f32(t.letter_spacing, state);
                t.fill.hash(state);
            }
            ElementKind::Shape(s) => {
                1u8.hash(state);
                s.shape_type.hash(state);
                match &s.fill {
                    Fill::Solid(color) => {
                        0u8.hash(state);
                        color.hash(state);
                    }
                    Fill::Gradient { stops, angle } => {
                        1u8.hash(state);
                        for stop in stops {
                            hash_f32(stop.offset, state);
                            stop.color.hash(state);
                        }
                        hash_f32(*angle, state);
                    }
                }
                s.stroke.hash(state);
                hash_f32(s.stroke_width, state);
                for d in &s.dash_array {
                    hash_f32(*d, state);
                }
                hash_f32(s.corner_radius, state);
                if let Some(label) = &s.label {
                    label.content.hash(state);
                    label.font_family.hash(state);
                    hash_f32(label.font_size, state);
                    label.fill.hash(state);
                    label.align.hash(state);
                }
            }
            ElementKind::Image(i) => {
                2u8.hash(state);
                i.src.hash(state);
                hash_f32(i.crop_x, state);
                hash_f32(i.crop_y, state);
                hash_f32(i.corner_radius, state);
            }
        }
    }

    /// Apply a partial update in place.
    ///
    /// Fields that do not apply to this element's variant (e.g. `font_size`
    /// on an image) are ignored with a debug log; a patch never fails.
    pub fn apply_patch(&mut self, patch: &ElementPatch) {
        if let Some(position) = patch.position {
            self.position = position;
        }
        if let Some(size) = patch.size {
            self.size = size;
        }
        if let Some(rotation) = patch.rotation {
            self.rotation = rotation;
        }
        if let Some(scale_x) = patch.scale_x {
            self.scale_x = scale_x;
        }
        if let Some(scale_y) = patch.scale_y {
            self.scale_y = scale_y;
        }
        if let Some(opacity) = patch.opacity {
            self.opacity = opacity;
        }
        if let Some(locked) = patch.locked {
            self.locked = locked;
        }
        if let Some(visible) = patch.visible {
            self.visible = visible;
        }
        if let Some(z_index) = patch.z_index {
            self.z_index = z_index;
        }
        if let Some(content) = &patch.content {
            match &mut self.kind {
                ElementKind::Text(t) => t.content.clone_from(content),
                ElementKind::Shape(s) => {
                    s.label.get_or_insert_with(ShapeLabel::default).content = content.clone();
                }
                ElementKind::Image(_) => {
                    tracing::debug!("Ignoring content patch on image element {}", self.id);
                }
            }
        }
        if let Some(font_size) = patch.font_size {
            match &mut self.kind {
                ElementKind::Text(t) => t.font_size = font_size,
                ElementKind::Shape(s) => {
                    s.label.get_or_insert_with(ShapeLabel::default).font_size = font_size;
                }
                ElementKind::Image(_) => {
                    tracing::debug!("Ignoring font_size patch on image element {}", self.id);
                }
            }
        }
    }
}

/// A partial element update.
///
/// Every field is optional; `None` leaves the current value untouched.
/// `content` and `font_size` target the text content of text elements and
/// the embedded label of shapes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementPatch {
    /// New top-left position.
    pub position: Option<Point>,
    /// New unscaled size.
    pub size: Option<Size>,
    /// New rotation in degrees.
    pub rotation: Option<f32>,
    /// New horizontal scale factor.
    pub scale_x: Option<f32>,
    /// New vertical scale factor.
    pub scale_y: Option<f32>,
    /// New opacity.
    pub opacity: Option<f32>,
    /// New locked flag.
    pub locked: Option<bool>,
    /// New visibility flag.
    pub visible: Option<bool>,
    /// New z-order.
    pub z_index: Option<i32>,
    /// New text or label content.
    pub content: Option<String>,
    /// New text or label font size.
    pub font_size: Option<f32>,
}

impl ElementPatch {
    /// A patch that only moves the element.
    #[must_use]
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            position: Some(Point::new(x, y)),
            ..Self::default()
        }
    }
}

fn hash_f32<H: Hasher>(value: f32, state: &mut H) {
    value.to_bits().hash(state);
}
