//! Application Services
//!
//! Pipelines that drive the domain through the ports.
//!
//! - `SymbolResolver`: batched identifier lookup with caching
//! - `ReplayCoordinator`: buffered replay pipeline
//! - `LiveTickHandler`: deduplicating live pipeline

mod live;
mod replay;
mod resolver;

pub use live::{DEFAULT_LIVE_EXCHANGE, LiveStats, LiveTickHandler};
pub use replay::{BufferSettings, ReplayCoordinator, ReplayError, ReplayStats};
pub use resolver::SymbolResolver;
