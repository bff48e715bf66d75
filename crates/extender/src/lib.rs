//! HTTP front end of the renewable-aware scheduler extender

pub mod api;
pub mod config;
