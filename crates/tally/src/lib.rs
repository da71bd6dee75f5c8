//! Tally - personal bookkeeping client core
//!
//! This crate provides the self-update pipeline of the Tally client together
//! with the configuration, persistence and network plumbing it depends on.

pub mod clock;
pub mod config;
pub mod network;
pub mod storage;
pub mod updater;
