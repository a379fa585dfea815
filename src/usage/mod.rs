//! Usage endpoint access and response model.

pub mod client;
pub mod transport;
pub mod types;

pub use client::UsageClient;
pub use transport::{HttpReply, HttpUsageTransport, TransportError, UsageTransport};
pub use types::{UsageSnapshot, UsageWindow};
