//! Proxmox VE HTTP API client.
//!
//! Everything the CLI knows about the wire format lives here: ticket
//! authentication, the `{"data": ...}` response envelopes, and the
//! per-endpoint typed decode. Downstream code only ever sees the named
//! structs from [`types`] — no dynamic field access.

pub mod client;
pub mod types;

pub use client::PveClient;
