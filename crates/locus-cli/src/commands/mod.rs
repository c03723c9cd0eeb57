//! Command handlers

pub mod common;
pub mod config;
pub mod import;
pub mod status;
