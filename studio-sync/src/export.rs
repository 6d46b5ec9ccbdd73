//! Export bridge: on-demand slide rasterization over the studio bus.
//!
//! Requests arrive as [`StudioEvent::ExportSlide`] broadcasts because the
//! requesting UI does not hold the per-slide surface reference; only the
//! controller owning the slide id acts. The response is a completion
//! event, never a bounded wait.
//!
//! The default [`SvgRasterizer`] produces an SVG snapshot of the scene
//! graph; hosts with a raster pipeline plug in their own [`Rasterizer`].

use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Mutex;

use studio_core::{Fill, ShapeType, SlideId, StudioEvent, TextAlign};

use crate::controller::{DeferredAction, SlideController};
use crate::surface::{NodeKind, SceneNode, Surface};
use crate::{SyncError, SyncResult};

/// Turns a surface into encoded image bytes.
pub trait Rasterizer: Send + Sync {
    /// Rasterize the surface at a scale multiplier.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Export`] when the surface cannot be encoded.
    fn rasterize(&self, surface: &Surface, background: &str, scale: f32) -> SyncResult<Vec<u8>>;
}

/// Receives exported bytes (the "download" end of the bridge).
pub trait ExportSink: Send + Sync {
    /// Deliver the finished export.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Export`] when delivery fails.
    fn deliver(&self, slide_id: SlideId, bytes: &[u8]) -> SyncResult<()>;
}

/// Sink that keeps exports in memory; the default, and what tests use.
#[derive(Debug, Default)]
pub struct MemorySink {
    exports: Mutex<Vec<(SlideId, Vec<u8>)>>,
}

impl MemorySink {
    /// Take every delivered export, oldest first.
    #[must_use]
    pub fn take(&self) -> Vec<(SlideId, Vec<u8>)> {
        let mut exports = self
            .exports
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        std::mem::take(&mut *exports)
    }
}

impl ExportSink for MemorySink {
    fn deliver(&self, slide_id: SlideId, bytes: &[u8]) -> SyncResult<()> {
        let mut exports = self
            .exports
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        exports.push((slide_id, bytes.to_vec()));
        Ok(())
    }
}

/// Sink that writes `<slide_id>.svg` files into a directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Create a sink targeting `dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Export`] when the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> SyncResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| SyncError::Export(format!("cannot create export dir: {e}")))?;
        Ok(Self { dir })
    }
}

impl ExportSink for DirectorySink {
    fn deliver(&self, slide_id: SlideId, bytes: &[u8]) -> SyncResult<()> {
        let path = self.dir.join(format!("{slide_id}.svg"));
        std::fs::write(&path, bytes)
            .map_err(|e| SyncError::Export(format!("write {} failed: {e}", path.display())))
    }
}

/// SVG snapshot rasterizer over the scene graph.
#[derive(Debug, Clone, Copy)]
pub struct SvgRasterizer {
    page_width: f32,
    page_height: f32,
}

impl SvgRasterizer {
    /// Create a rasterizer for the given page size.
    #[must_use]
    pub fn new(page_width: f32, page_height: f32) -> Self {
        Self {
            page_width,
            page_height,
        }
    }
}

impl Rasterizer for SvgRasterizer {
    fn rasterize(&self, surface: &Surface, background: &str, scale: f32) -> SyncResult<Vec<u8>> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(SyncError::Export(format!("invalid export scale {scale}")));
        }
        let out_w = self.page_width * scale;
        let out_h = self.page_height * scale;

        let mut svg = String::with_capacity(4096);
        let _ = write!(
            svg,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{out_w}\" height=\"{out_h}\" viewBox=\"0 0 {} {}\">",
            self.page_width, self.page_height,
        );
        let _ = write!(
            svg,
            "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
            escape_xml(background),
        );

        // Nodes are already in paint order.
        for (idx, node) in surface.nodes().iter().enumerate() {
            render_node_svg(&mut svg, node, idx);
        }

        svg.push_str("</svg>");
        Ok(svg.into_bytes())
    }
}

/// Render a single scene node to SVG.
fn render_node_svg(svg: &mut String, node: &SceneNode, idx: usize) {
    let half_w = node.width * node.scale_x / 2.0;
    let half_h = node.height * node.scale_y / 2.0;
    let _ = write!(
        svg,
        "<g transform=\"translate({},{}) rotate({} {half_w} {half_h}) scale({},{})\" opacity=\"{}\">",
        node.left, node.top, node.angle, node.scale_x, node.scale_y, node.opacity,
    );

    match &node.kind {
        NodeKind::Text {
            content,
            font_family,
            font_size,
            fill,
        } => {
            write_text_lines(svg, content, 0.0, *font_size, font_family, fill, TextAlign::Left, node.width);
        }

        NodeKind::Shape {
            shape_type,
            fill,
            stroke,
            label,
        } => {
            let paint = shape_fill_paint(svg, fill, idx);
            let (w, h) = (node.width, node.height);
            match shape_type {
                ShapeType::Rectangle | ShapeType::RoundedRectangle => {
                    let _ = write!(
                        svg,
                        "<rect width=\"{w}\" height=\"{h}\" fill=\"{paint}\" stroke=\"{}\"/>",
                        escape_xml(stroke),
                    );
                }
                ShapeType::Ellipse => {
                    let _ = write!(
                        svg,
                        "<ellipse cx=\"{}\" cy=\"{}\" rx=\"{}\" ry=\"{}\" fill=\"{paint}\" stroke=\"{}\"/>",
                        w / 2.0,
                        h / 2.0,
                        w / 2.0,
                        h / 2.0,
                        escape_xml(stroke),
                    );
                }
                ShapeType::Triangle => {
                    let _ = write!(
                        svg,
                        "<polygon points=\"{},0 {w},{h} 0,{h}\" fill=\"{paint}\" stroke=\"{}\"/>",
                        w / 2.0,
                        escape_xml(stroke),
                    );
                }
                ShapeType::Line => {
                    let _ = write!(
                        svg,
                        "<line x1=\"0\" y1=\"0\" x2=\"{w}\" y2=\"{h}\" stroke=\"{}\"/>",
                        escape_xml(stroke),
                    );
                }
            }
            if let Some(label) = label {
                if label.visible && !label.content.is_empty() {
                    write_text_lines(
                        svg,
                        &label.content,
                        h / 2.0 - label.font_size / 2.0,
                        label.font_size,
                        &label.font_family,
                        &label.fill,
                        label.align,
                        w,
                    );
                }
            }
        }

        NodeKind::Image { src, .. } => {
            let _ = write!(
                svg,
                "<image width=\"{}\" height=\"{}\" href=\"{}\"/>",
                node.width,
                node.height,
                escape_xml(src),
            );
        }
    }

    svg.push_str("</g>");
}

/// Resolve a shape fill to a paint reference, emitting gradient defs.
fn shape_fill_paint(svg: &mut String, fill: &Fill, idx: usize) -> String {
    match fill {
        Fill::Solid(color) => escape_xml(color),
        Fill::Gradient { stops, angle } => {
            let id = format!("grad{idx}");
            let rad = angle.to_radians();
            let (sin, cos) = rad.sin_cos();
            let _ = write!(
                svg,
                "<defs><linearGradient id=\"{id}\" x1=\"0\" y1=\"0\" x2=\"{cos}\" y2=\"{sin}\">",
            );
            for stop in stops {
                let _ = write!(
                    svg,
                    "<stop offset=\"{}\" stop-color=\"{}\"/>",
                    stop.offset,
                    escape_xml(&stop.color),
                );
            }
            svg.push_str("</linearGradient></defs>");
            format!("url(#{id})")
        }
    }
}

/// Write multi-line text as stacked tspans.
#[allow(clippy::too_many_arguments, clippy::cast_precision_loss)]
fn write_text_lines(
    svg: &mut String,
    content: &str,
    y_offset: f32,
    font_size: f32,
    font_family: &str,
    fill: &str,
    align: TextAlign,
    width: f32,
) {
    let (anchor, x) = match align {
        TextAlign::Left | TextAlign::Justify => ("start", 0.0),
        TextAlign::Center => ("middle", width / 2.0),
        TextAlign::Right => ("end", width),
    };
    for (line_no, line) in content.split('\n').enumerate() {
        let y = y_offset + font_size * (line_no as f32 + 1.0);
        let _ = write!(
            svg,
            "<text x=\"{x}\" y=\"{y}\" font-size=\"{font_size}\" font-family=\"{}\" fill=\"{}\" text-anchor=\"{anchor}\">{}</text>",
            escape_xml(font_family),
            escape_xml(fill),
            escape_xml(line),
        );
    }
}

/// Escape special XML characters.
fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

impl SlideController {
    /// Rasterize this controller's slide and deliver the result.
    ///
    /// Deselects first so interaction handles are not baked into the
    /// output, then emits an [`StudioEvent::ExportCompleted`] either way.
    /// Failures are reported in the completion event; there is no retry.
    pub fn export_slide(&mut self, scale: f32) {
        let slide_id = self.surface.slide_id();

        if self.surface.is_disposed() {
            self.bus.emit(StudioEvent::ExportCompleted {
                success: false,
                slide_id,
                error: Some("surface disposed".to_string()),
            });
            return;
        }

        self.internal_selection_update = true;
        self.surface.deselect_all();
        self.store.select_element(None);
        self.schedule(1, DeferredAction::ClearSelectionGuard);

        let background = self
            .store
            .slides()
            .iter()
            .find(|slide| slide.id == slide_id)
            .map_or_else(|| "#ffffff".to_string(), |slide| slide.background_color.clone());

        let result = self
            .rasterizer
            .rasterize(&self.surface, &background, scale)
            .and_then(|bytes| self.sink.deliver(slide_id, &bytes));

        match result {
            Ok(()) => self.bus.emit(StudioEvent::ExportCompleted {
                success: true,
                slide_id,
                error: None,
            }),
            Err(e) => {
                tracing::warn!("Export of slide {slide_id} failed: {e}");
                self.bus.emit(StudioEvent::ExportCompleted {
                    success: false,
                    slide_id,
                    error: Some(e.to_string()),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use studio_core::{DocumentStore, Element, ElementKind, EventBus, TextProps};

    use super::*;
    use crate::{EngineConfig, SlideController};

    #[test]
    fn test_svg_snapshot_basics() {
        let mut surface = Surface::new(SlideId::new());
        let element = Element::new(ElementKind::Text(TextProps {
            content: "Hello & <World>".to_string(),
            ..TextProps::default()
        }));
        let node =
            crate::reconcile::build_node(&element, &crate::NodeStyle::default()).expect("node");
        surface.add_node(node);

        let rasterizer = SvgRasterizer::new(960.0, 540.0);
        let bytes = rasterizer.rasterize(&surface, "#fafafa", 2.0).expect("svg");
        let svg = String::from_utf8(bytes).expect("utf8");

        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("width=\"1920\""));
        assert!(svg.contains("viewBox=\"0 0 960 540\""));
        assert!(svg.contains("Hello &amp; &lt;World&gt;"));
    }

    #[test]
    fn test_invalid_scale_rejected() {
        let surface = Surface::new(SlideId::new());
        let rasterizer = SvgRasterizer::new(960.0, 540.0);
        assert!(rasterizer.rasterize(&surface, "#fff", 0.0).is_err());
        assert!(rasterizer.rasterize(&surface, "#fff", f32::NAN).is_err());
    }

    #[tokio::test]
    async fn test_export_deselects_and_delivers() {
        let store = DocumentStore::new();
        let id = store.add_element(Element::new(ElementKind::Text(TextProps::default())));
        let slide_id = store.current_slide().id;
        let bus = EventBus::new();
        let sink = Arc::new(MemorySink::default());
        let mut controller =
            SlideController::new(slide_id, store, bus.clone(), EngineConfig::default())
                .with_export_sink(sink.clone());
        controller.mount().await.expect("mount");
        controller.notify_scene_selection(&[id]);

        let mut rx = bus.subscribe();
        controller.export_slide(1.0);

        assert!(controller.surface().active_ids().is_empty());
        let exports = sink.take();
        assert_eq!(exports.len(), 1);
        assert_eq!(exports[0].0, slide_id);

        match rx.try_recv() {
            Ok(StudioEvent::ExportCompleted {
                success, slide_id: done, ..
            }) => {
                assert!(success);
                assert_eq!(done, slide_id);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_directory_sink_writes_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sink = DirectorySink::new(dir.path()).expect("sink");
        let slide_id = SlideId::new();
        sink.deliver(slide_id, b"<svg/>").expect("deliver");
        assert!(dir.path().join(format!("{slide_id}.svg")).exists());
    }

    #[tokio::test]
    async fn test_export_failure_reported_in_completion() {
        struct FailingRasterizer;
        impl Rasterizer for FailingRasterizer {
            fn rasterize(&self, _: &Surface, _: &str, _: f32) -> SyncResult<Vec<u8>> {
                Err(SyncError::Export("encoder exploded".to_string()))
            }
        }

        let store = DocumentStore::new();
        let slide_id = store.current_slide().id;
        let bus = EventBus::new();
        let mut controller =
            SlideController::new(slide_id, store, bus.clone(), EngineConfig::default())
                .with_rasterizer(Arc::new(FailingRasterizer));
        controller.mount().await.expect("mount");

        let mut rx = bus.subscribe();
        controller.export_slide(1.0);

        match rx.try_recv() {
            Ok(StudioEvent::ExportCompleted { success, error, .. }) => {
                assert!(!success);
                assert!(error.expect("error").contains("encoder exploded"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
