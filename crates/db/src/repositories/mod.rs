//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod diagram_mark_repo;
pub mod inspection_repo;

pub use diagram_mark_repo::DiagramMarkRepo;
pub use inspection_repo::InspectionRepo;
