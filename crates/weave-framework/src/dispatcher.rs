//! The dispatch entry point.
//!
//! A [`Dispatcher`] owns a compiled root pipeline plus the per-process
//! environment a context needs (bot identity, capability client, channel
//! compatibility mode). Its single entry point, [`dispatch`]
//! (Dispatcher::dispatch), builds one context for the inbound update and
//! runs the pipeline to completion.
//!
//! The dispatcher never retries and never swallows: whatever the chain
//! returns is handed back to the caller.

use parking_lot::RwLock;
use tracing::debug;

use weave_core::api::BoxedApiClient;
use weave_core::{Context, Middleware, MiddlewareFn, Next, Update, WeaveResult};

/// Builds contexts and runs the root pipeline, one dispatch per update.
pub struct Dispatcher {
    root: MiddlewareFn,
    me: RwLock<Option<String>>,
    api: Option<BoxedApiClient>,
    channel_mode: bool,
}

impl Dispatcher {
    /// Creates a dispatcher around a root middleware (typically a
    /// composer).
    pub fn new(root: impl Into<Middleware>) -> Self {
        Self {
            root: root.into().unwrap(),
            me: RwLock::new(None),
            api: None,
            channel_mode: false,
        }
    }

    /// Attaches a capability client, reachable from every context.
    pub fn with_api(mut self, api: BoxedApiClient) -> Self {
        self.api = Some(api);
        self
    }

    /// Opts channel posts into message-subtype derivation.
    pub fn with_channel_mode(mut self, enabled: bool) -> Self {
        self.channel_mode = enabled;
        self
    }

    /// Records the bot's own username.
    ///
    /// Identity is usually unknown until a lookup against the platform
    /// completes; until then, identity-dependent routing (the `@botname`
    /// command form) silently stays off.
    pub fn set_identity(&self, me: impl Into<String>) {
        *self.me.write() = Some(me.into());
    }

    /// The recorded bot identity, once known.
    pub fn identity(&self) -> Option<String> {
        self.me.read().clone()
    }

    /// Dispatches one update through the pipeline.
    pub async fn dispatch(&self, update: Update) -> WeaveResult<()> {
        let ctx = Context::from_parts(
            update,
            self.identity(),
            self.api.clone(),
            self.channel_mode,
        );
        debug!(
            update_id = ctx.update().update_id,
            classification = %ctx.classification(),
            "dispatching update"
        );
        let next = Next::terminal(&ctx);
        (self.root)(ctx, next).await
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("identity", &self.identity())
            .field("channel_mode", &self.channel_mode)
            .finish_non_exhaustive()
    }
}
