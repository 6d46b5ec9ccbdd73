//! Slides - ordered pages of a composition.

use serde::{Deserialize, Serialize};

use crate::{Element, ElementId, SlideId};

/// A single slide: an ordered list of elements plus page-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    /// Unique identifier, stable across reorders.
    pub id: SlideId,
    /// Elements on this slide. Paint order is decided by `z_index`,
    /// not by position in this list.
    pub elements: Vec<Element>,
    /// Page background color as hex.
    pub background_color: String,
    /// Slide title shown in the navigator.
    pub title: String,
    /// Whether the slide is skipped during presentation.
    pub hidden: bool,
}

impl Slide {
    /// Create an empty slide with the given title.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: SlideId::new(),
            elements: Vec::new(),
            background_color: "#ffffff".to_string(),
            title: title.into(),
            hidden: false,
        }
    }

    /// Get an element by id.
    #[must_use]
    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }

    /// Get a mutable element by id.
    pub fn element_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| e.id == id)
    }

    /// Number of elements on the slide.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }
}
