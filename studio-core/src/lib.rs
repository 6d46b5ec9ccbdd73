//! # Studio Core
//!
//! Document model for the Content Studio composition editor: slides,
//! elements, the shared document store, and the process-wide event bus.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                studio-core                  │
//! ├─────────────────────────────────────────────┤
//! │  Document Store   │  Model                  │
//! │  - Slides/deck    │  - Element variants     │
//! │  - Selection      │  - Partial patches      │
//! │  - Undo/redo      │  - Visual fingerprints  │
//! ├─────────────────────────────────────────────┤
//! │  Change feed      │  Studio bus             │
//! │  - StoreEvent     │  - Export request/done  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The store is the single owner of element truth. Anything a renderer
//! builds from it (the `studio-sync` scene graph in particular) is a
//! derived cache that can be rebuilt from here at any time.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod element;
pub mod error;
pub mod event;
pub mod slide;
pub mod store;

pub use element::{
    Element, ElementId, ElementKind, ElementPatch, Fill, FontStyle, GradientStop, ImageProps,
    Point, ShapeLabel, ShapeProps, ShapeType, Size, SlideId, TextAlign, TextDecoration, TextProps,
};
pub use error::{StoreError, StoreResult};
pub use event::{EventBus, StudioEvent};
pub use slide::Slide;
pub use store::{DocumentStore, ReorderDirection, StoreEvent};

/// Studio core version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
