//! In-memory annotation state shared by the diagram handlers.
//!
//! - [`AnnotationSessions`]: undo/redo history per pending inspection.
//! - [`DiagramMarkCache`]: read-through cache of default marks per diagram.

pub mod mark_cache;
pub mod sessions;

pub use mark_cache::DiagramMarkCache;
pub use sessions::AnnotationSessions;
