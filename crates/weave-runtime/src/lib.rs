//! # weave-runtime
//!
//! Orchestration layer for the Weave framework:
//!
//! - Layered, profile-aware configuration loading (`config`)
//! - Logging initialization (`logging`)
//! - The update-source contract and the dispatch loop (`runtime`)
//!
//! ```rust,ignore
//! use weave_framework::{Composer, Dispatcher};
//! use weave_runtime::{Runtime, config::load_config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     let dispatcher = Dispatcher::new(my_composer())
//!         .with_channel_mode(config.dispatch.channel_mode);
//!     let runtime = Runtime::from_config(&config, dispatcher);
//!
//!     // `source` is any transport implementing UpdateSource,
//!     // e.g. an mpsc receiver fed by a webhook server.
//!     runtime.run(source).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{ConfigError, ConfigLoader, ConfigResult, WeaveConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::LoggingBuilder;
pub use runtime::{Runtime, UpdateSource};

// Re-export tracing for use by downstream crates.
pub use tracing;
pub use tracing_subscriber;
