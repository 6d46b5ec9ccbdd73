//! Element sync reconciliation: make the scene graph match the store.
//!
//! One-directional (store → scene). A pass is skipped while an inline edit
//! session or a live multi-select gesture owns the surface, and when the
//! slide's visual fingerprint and deck position are both unchanged.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use async_trait::async_trait;
use studio_core::{Element, ElementId, ElementKind, Slide};

use crate::controller::{DeferredAction, SlideController};
use crate::surface::{LabelNode, NodeKind, SceneNode};
use crate::{NodeStyle, SyncError, SyncResult};

/// Awaited-promise contract for font availability.
///
/// The engine awaits resolution before the first paint that depends on the
/// family's metrics; fetching and caching are the host's business. A
/// resolution arriving after the surface was disposed must be harmless,
/// which the reconciler guarantees by re-checking disposal after the await.
#[async_trait]
pub trait FontResolver: Send + Sync {
    /// Resolve a font family to a usable state.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::FontLoad`] when the family cannot be made
    /// available; the reconciler logs and continues with fallback metrics.
    async fn resolve(&self, family: &str) -> SyncResult<()>;
}

/// Resolver for hosts whose fonts are installed up front.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemFontResolver;

#[async_trait]
impl FontResolver for SystemFontResolver {
    async fn resolve(&self, _family: &str) -> SyncResult<()> {
        Ok(())
    }
}

/// Structural fingerprint of a slide's mutable visual state.
///
/// Order-sensitive over the element list so z-ties that resolve by array
/// order are covered too.
#[must_use]
pub fn fingerprint(slide: &Slide) -> u64 {
    let mut hasher = DefaultHasher::new();
    slide.id.hash(&mut hasher);
    slide.background_color.hash(&mut hasher);
    for element in &slide.elements {
        element.hash_visual(&mut hasher);
    }
    hasher.finish()
}

/// Build one scene node from an element, merging the shared style.
///
/// # Errors
///
/// Returns [`SyncError::InvalidElement`] for data the renderer cannot
/// represent (non-finite geometry, an image without a source).
pub(crate) fn build_node(element: &Element, style: &NodeStyle) -> SyncResult<SceneNode> {
    let geometry = [
        element.position.x,
        element.position.y,
        element.size.width,
        element.size.height,
        element.rotation,
        element.scale_x,
        element.scale_y,
    ];
    if geometry.iter().any(|v| !v.is_finite()) {
        return Err(SyncError::InvalidElement(format!(
            "non-finite geometry on element {}",
            element.id
        )));
    }

    let kind = match &element.kind {
        ElementKind::Text(text) => NodeKind::Text {
            content: text.content.clone(),
            font_family: text.font_family.clone(),
            font_size: text.font_size,
            fill: text.fill.clone(),
        },
        ElementKind::Shape(shape) => NodeKind::Shape {
            shape_type: shape.shape_type,
            fill: shape.fill.clone(),
            stroke: shape.stroke.clone(),
            label: shape.label.as_ref().map(|label| LabelNode {
                content: label.content.clone(),
                font_family: label.font_family.clone(),
                font_size: label.font_size,
                fill: label.fill.clone(),
                align: label.align,
                visible: true,
            }),
        },
        ElementKind::Image(image) => {
            if image.src.is_empty() {
                return Err(SyncError::InvalidElement(format!(
                    "image element {} has no source",
                    element.id
                )));
            }
            NodeKind::Image {
                src: image.src.clone(),
                crop_x: image.crop_x,
                crop_y: image.crop_y,
            }
        }
    };

    Ok(SceneNode {
        element_id: element.id,
        left: element.position.x,
        top: element.position.y,
        width: element.size.width,
        height: element.size.height,
        angle: element.rotation,
        scale_x: element.scale_x,
        scale_y: element.scale_y,
        opacity: element.opacity,
        interactive: !element.locked,
        style: style.clone(),
        metrics_epoch: 0,
        kind,
    })
}

impl SlideController {
    /// Reconcile the surface against the store's view of this slide.
    ///
    /// # Errors
    ///
    /// Currently infallible in its tolerated failure modes (bad elements
    /// are skipped, a vanished slide is a no-op) but returns `Result` so
    /// hosts treat it as the fallible boundary it is.
    pub async fn sync(&mut self) -> SyncResult<()> {
        if self.surface.is_disposed() {
            tracing::debug!("Sync skipped: surface {} disposed", self.surface.slide_id());
            return Ok(());
        }
        if self.edit.is_some() {
            tracing::debug!("Sync suspended: inline edit session active");
            return Ok(());
        }
        if self.multi_select_modifying {
            tracing::debug!("Sync suspended: multi-select gesture in flight");
            return Ok(());
        }

        let slides = self.store.slides();
        let slide_id = self.surface.slide_id();
        let Some((index, slide)) = slides
            .iter()
            .enumerate()
            .find(|(_, slide)| slide.id == slide_id)
        else {
            tracing::debug!("Sync skipped: slide {slide_id} no longer in the deck");
            return Ok(());
        };

        let print = fingerprint(slide);
        if self.last_fingerprint == Some(print)
            && !self.surface.is_empty()
            && self.last_index == Some(index)
        {
            return Ok(());
        }

        self.rendering = true;
        let prior_selection = {
            let active = self.surface.active_ids();
            if active.is_empty() {
                self.store.selected_ids()
            } else {
                active
            }
        };

        self.surface.clear();

        let families = referenced_families(slide);
        if !families.is_empty() {
            let resolver = Arc::clone(&self.fonts);
            let pending: Vec<_> = families
                .iter()
                .map(|family| resolver.resolve(family))
                .collect();
            let results = futures::future::join_all(pending).await;
            for (family, result) in families.iter().zip(results) {
                if let Err(e) = result {
                    tracing::warn!("Font {family} unavailable, falling back: {e}");
                }
            }
        }

        // Unmount may have raced the font await; the stale pass must not
        // touch a disposed surface.
        if self.surface.is_disposed() {
            self.rendering = false;
            return Ok(());
        }

        let mut ordered: Vec<&Element> = slide.elements.iter().filter(|e| e.visible).collect();
        ordered.sort_by_key(|e| e.z_index);
        for element in ordered {
            match build_node(element, &self.config.style) {
                Ok(node) => self.surface.add_node(node),
                Err(e) => tracing::warn!("Skipping element {}: {e}", element.id),
            }
        }

        // A rebuild must never silently clear the user's selection.
        let restore: Vec<ElementId> = prior_selection
            .into_iter()
            .filter(|&id| self.surface.contains(id))
            .collect();
        self.surface.set_active(&restore);
        self.record_drag_origins();

        self.last_fingerprint = Some(print);
        self.last_index = Some(index);
        self.surface.request_render();

        // Some hosts apply freshly loaded font metrics one frame late:
        // remeasure now and once more after the settle delay.
        self.surface.remeasure_text();
        self.schedule(self.config.settle_frames, DeferredAction::RemeasureText);

        self.refresh_offset();
        self.schedule(self.config.settle_frames, DeferredAction::RefreshOffset);

        self.rendering = false;
        Ok(())
    }
}

/// Unique font families referenced by a slide's text and shape labels.
fn referenced_families(slide: &Slide) -> Vec<String> {
    let mut families: Vec<String> = Vec::new();
    for element in &slide.elements {
        let family = match &element.kind {
            ElementKind::Text(text) => Some(&text.font_family),
            ElementKind::Shape(shape) => shape.label.as_ref().map(|l| &l.font_family),
            ElementKind::Image(_) => None,
        };
        if let Some(family) = family {
            if !families.contains(family) {
                families.push(family.clone());
            }
        }
    }
    families
}
