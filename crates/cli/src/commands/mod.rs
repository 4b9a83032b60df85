//! CLI subcommands

pub mod predict;
pub mod service;
