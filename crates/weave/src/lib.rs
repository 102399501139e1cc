//! # Weave
//!
//! An update classification and middleware-composition/routing engine
//! for chat-platform bots.
//!
//! ## Overview
//!
//! Weave receives discrete inbound event payloads ("updates") and routes
//! each one through a composable pipeline of handlers:
//!
//! ```text
//! ┌───────────┐    ┌────────────────────┐    ┌──────────────────────────┐
//! │ Transport │───▶│ Context/Classifier │───▶│ Composed middleware      │
//! │ (yours)   │    │ type + subtypes    │    │ mount / hears / command  │
//! └───────────┘    └────────────────────┘    │ … ▶ your handlers        │
//!                                            └──────────────────────────┘
//! ```
//!
//! - **weave-core**: update model, per-dispatch context, the onion-model
//!   middleware engine, generic predicate combinators
//! - **weave-framework**: triggers, routing combinators, composer,
//!   router, session layer, dispatcher
//! - **weave-runtime**: configuration, logging, the dispatch loop
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use weave::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let bot = Composer::new()
//!         .command("start", greet())
//!         .hears("ping", pong());
//!
//!     let config = load_config()?;
//!     let runtime = Runtime::from_config(&config, Dispatcher::new(bot));
//!     runtime.run(my_update_source()).await?;
//!     Ok(())
//! }
//! ```

pub use weave_core as core;
pub use weave_framework as framework;
pub use weave_runtime as runtime;

/// Prelude module for convenient imports.
pub mod prelude {
    // Runtime - entry point and configuration
    pub use weave_runtime::config::load_config;
    pub use weave_runtime::{Runtime, UpdateSource, WeaveConfig};

    // Dispatch and registration
    pub use weave_framework::{Composer, Dispatcher, Route, Router};

    // Session layer
    pub use weave_framework::{MemorySessionStore, SessionOptions, SessionStore, session, session_with};

    // Core contract types for handlers
    pub use weave_core::combinators::{Predicate, Selector};
    pub use weave_core::{
        ApiClient, Context, MatchCapture, Middleware, Next, Update, UpdateKind, WeaveError,
        WeaveResult,
    };

    // Logging macros
    pub use weave_runtime::tracing::{debug, error, info, trace, warn};
}

// Re-export tracing so prelude users get a consistent version.
pub use weave_runtime::tracing;
