//! End-to-end behaviour of indices, the registry and configuration.

#[path = "../common/mod.rs"]
mod common;

mod concurrency;
mod config;
mod lifecycle;
mod persistence;
mod registry;
mod scenarios;
