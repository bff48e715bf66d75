//! Command implementations

pub mod extender;
pub mod nodes;
