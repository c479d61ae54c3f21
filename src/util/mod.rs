//! Filesystem helpers shared by the runner and the report builder.

pub mod disk;
pub mod size;

pub use disk::free_space;
pub use size::{folder_size, format_size};
