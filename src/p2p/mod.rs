//! P2P networking module - peer model, broadcast fan-out, service clients

mod peer;
mod client;
mod services;

pub use peer::*;
pub use client::*;
pub use services::*;
