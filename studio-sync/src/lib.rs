//! # Studio Sync
//!
//! Synchronization engine for the Content Studio composition editor: keeps
//! the declarative document model in `studio-core` consistent with a
//! mutable, event-driven scene graph per mounted slide.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                  studio-sync                     │
//! ├──────────────────────────────────────────────────┤
//! │  Surface            │  SlideController           │
//! │  - scene nodes      │  - element reconciler      │
//! │  - id → node map    │  - selection reconciler    │
//! │  - active selection │  - commit pipeline         │
//! │  - offset cache     │  - inline text editing     │
//! ├──────────────────────────────────────────────────┤
//! │  Host contracts     │  Export bridge             │
//! │  - FontResolver     │  - Rasterizer / ExportSink │
//! │  - TextMeasurer     │  - studio bus wiring       │
//! │  - LayoutProbe      │                            │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! Data flows store → reconciler → surface → user interaction → commit
//! pipeline / selection reconciler → store, closing the loop. Re-entrancy
//! is tamed by explicit boolean guards; everything deferred runs off a
//! frame-counted queue driven by [`SlideController::tick`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod commit;
pub mod config;
pub mod controller;
pub mod error;
pub mod export;
pub mod reconcile;
pub mod selection;
pub mod surface;
pub mod text_edit;
pub mod viewport;

pub use config::{CornerStyle, EngineConfig, NodeStyle};
pub use controller::SlideController;
pub use error::{SyncError, SyncResult};
pub use export::{DirectorySink, ExportSink, MemorySink, Rasterizer, SvgRasterizer};
pub use reconcile::{fingerprint, FontResolver, SystemFontResolver};
pub use surface::{
    ActiveSelection, GroupNode, LabelNode, NodeKind, SceneNode, Surface, WorldBox,
};
pub use text_edit::{EditSession, HeuristicMeasurer, OverlayNode, TextMeasurer};
pub use viewport::{LayoutProbe, NullLayoutProbe};

/// Studio sync version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
