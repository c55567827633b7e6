//! Filesystem glue feeding the harness: project discovery and settings.

pub mod projects;
pub mod settings;
