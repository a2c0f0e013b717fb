//! Node orchestration - configuration, shared context, consensus
//! resolution, events and the mining loop

mod bootstrap;
mod config;
mod context;
mod error;
mod events;
mod mining_loop;
mod resolver;

pub use bootstrap::*;
pub use config::*;
pub use context::*;
pub use error::*;
pub use events::*;
pub use mining_loop::*;
pub use resolver::*;
