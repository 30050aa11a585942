//! Post page retrieval, either through a cross-origin relay or directly.
pub mod client;
pub mod types;

pub use client::{DirectClient, RelayClient};
