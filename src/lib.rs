//! Loads objects that land in a storage bucket into a warehouse table.
//!
//! One storage notification becomes one load job; the row count of the
//! destination table is reported once the job finishes.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod trigger_service;
