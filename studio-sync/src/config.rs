//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Default frames to wait before the deferred remeasure/offset passes.
const DEFAULT_SETTLE_FRAMES: u8 = 2;
/// Default keyboard nudge distance in pixels.
const DEFAULT_NUDGE_STEP: f32 = 1.0;
/// Default keyboard nudge distance with the modifier held.
const DEFAULT_NUDGE_STEP_LARGE: f32 = 10.0;
/// Default sub-pixel tolerance when diffing drag positions.
const DEFAULT_DRAG_EPSILON: f32 = 0.5;
/// Default tolerance before inline editing grows a shape, in pixels.
const DEFAULT_GROW_TOLERANCE: f32 = 1.0;

/// Corner handle shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CornerStyle {
    /// Round handles.
    #[default]
    Circle,
    /// Square handles.
    Rect,
}

/// Shared interaction style merged into every scene node at construction.
///
/// This is a plain value: the scene graph manager copies it into each node
/// it builds, so changing a style after the fact never retroactively
/// restyles existing nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStyle {
    /// Selection handle fill color as hex.
    pub handle_color: String,
    /// Selection handle shape.
    pub corner_style: CornerStyle,
    /// Selection border color as hex.
    pub border_color: String,
    /// Selection border dash pattern (empty = solid).
    pub border_dash: Vec<f32>,
    /// Selection handle size in pixels.
    pub handle_size: f32,
}

impl Default for NodeStyle {
    fn default() -> Self {
        Self {
            handle_color: "#6965db".to_string(),
            corner_style: CornerStyle::Circle,
            border_color: "#6965db".to_string(),
            border_dash: vec![4.0, 4.0],
            handle_size: 8.0,
        }
    }
}

/// Engine tuning knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Frames to wait before the deferred font-settle remeasure and the
    /// deferred offset refresh. Hosts with a deterministic fonts-ready
    /// signal can set this to 0.
    pub settle_frames: u8,
    /// Keyboard nudge distance in pixels.
    pub nudge_step: f32,
    /// Keyboard nudge distance with the modifier held.
    pub nudge_step_large: f32,
    /// Sub-pixel tolerance when deciding whether a dragged member moved.
    pub drag_epsilon: f32,
    /// Height slack before inline editing grows a shape, in pixels.
    pub grow_tolerance: f32,
    /// Page width in pixels, used by the default rasterizer.
    pub page_width: f32,
    /// Page height in pixels, used by the default rasterizer.
    pub page_height: f32,
    /// Interaction style merged into every node.
    pub style: NodeStyle,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            settle_frames: DEFAULT_SETTLE_FRAMES,
            nudge_step: DEFAULT_NUDGE_STEP,
            nudge_step_large: DEFAULT_NUDGE_STEP_LARGE,
            drag_epsilon: DEFAULT_DRAG_EPSILON,
            grow_tolerance: DEFAULT_GROW_TOLERANCE,
            page_width: 960.0,
            page_height: 540.0,
            style: NodeStyle::default(),
        }
    }
}

impl EngineConfig {
    /// Create a config from environment variables or defaults.
    ///
    /// Environment variables:
    /// - `STUDIO_SETTLE_FRAMES`: deferred settle delay in frames
    /// - `STUDIO_NUDGE_STEP`: nudge distance in pixels
    /// - `STUDIO_NUDGE_STEP_LARGE`: modified nudge distance in pixels
    /// - `STUDIO_DRAG_EPSILON`: drag diff tolerance in pixels
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(v) = env_parse("STUDIO_SETTLE_FRAMES") {
            config.settle_frames = v;
        }
        if let Some(v) = env_parse("STUDIO_NUDGE_STEP") {
            config.nudge_step = v;
        }
        if let Some(v) = env_parse("STUDIO_NUDGE_STEP_LARGE") {
            config.nudge_step_large = v;
        }
        if let Some(v) = env_parse("STUDIO_DRAG_EPSILON") {
            config.drag_epsilon = v;
        }
        config
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
