// src/lib.rs
pub mod api;
pub mod banner;
pub mod catalog;
pub mod classifier;
pub mod config;
pub mod endpoints;
pub mod errors;
pub mod fallback;
pub mod harness;
pub mod kata;
pub mod models;
pub mod pipeline;
pub mod providers;
pub mod runs;
pub mod submission;
pub mod testgen;
pub mod transport;
