// ABOUTME: Library root for ferry - exposes the relay building blocks for testing.
// ABOUTME: The main binary is in main.rs.

pub mod broker;
pub mod config;
pub mod destination;
pub mod dial;
pub mod error;
pub mod listener;
pub mod relay;
pub mod session;
pub mod ssh;
