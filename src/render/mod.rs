//! Per-day views over computed track assignments.

pub mod adapter;
pub mod grid;

pub use adapter::*;
pub use grid::*;
