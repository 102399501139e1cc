//! Runtime orchestration.
//!
//! The [`Runtime`] drains an [`UpdateSource`] and spawns one task per
//! inbound update, so concurrently arriving updates execute fully
//! independently while each single dispatch stays strictly sequential. A
//! failed dispatch is logged and dropped; the engine never retries: the
//! transport owns its own retry policy.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use weave_core::Update;
use weave_framework::Dispatcher;

use crate::config::WeaveConfig;
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// A transport-agnostic stream of inbound updates.
///
/// The transport behind a source is responsible for sequencing each
/// update before it reaches the engine; the runtime assumes updates
/// arrive ready to dispatch.
#[async_trait]
pub trait UpdateSource: Send {
    /// The next inbound update; `None` when the source is exhausted.
    async fn next_update(&mut self) -> Option<Update>;
}

#[async_trait]
impl UpdateSource for mpsc::Receiver<Update> {
    async fn next_update(&mut self) -> Option<Update> {
        self.recv().await
    }
}

/// Drives a [`Dispatcher`] from an update source until shutdown.
///
/// # Example
///
/// ```rust,ignore
/// use weave_runtime::{Runtime, config::load_config};
/// use weave_framework::{Composer, Dispatcher};
///
/// let config = load_config()?;
/// let dispatcher = Dispatcher::new(Composer::new().hears("ping", pong()));
/// let runtime = Runtime::from_config(&config, dispatcher);
/// runtime.run(source).await?;
/// ```
pub struct Runtime {
    dispatcher: Arc<Dispatcher>,
    shutdown: CancellationToken,
    running: AtomicBool,
}

impl Runtime {
    /// Creates a runtime around a dispatcher.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            shutdown: CancellationToken::new(),
            running: AtomicBool::new(false),
        }
    }

    /// Creates a runtime from configuration.
    ///
    /// Initializes logging and applies the dispatch settings (channel
    /// mode is applied by the caller when building the dispatcher; a
    /// configured identity override is recorded here).
    pub fn from_config(config: &WeaveConfig, dispatcher: Dispatcher) -> Self {
        logging::init_from_config(&config.logging);
        if let Some(identity) = &config.dispatch.identity {
            dispatcher.set_identity(identity.clone());
        }
        info!(
            log_level = %config.logging.level,
            channel_mode = config.dispatch.channel_mode,
            "Runtime initialized from configuration"
        );
        Self::new(dispatcher)
    }

    /// The dispatcher driven by this runtime.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// A token cancelled when the runtime shuts down.
    ///
    /// Clone it into transports so they can stop producing updates.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Requests shutdown.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Drains `source` until it is exhausted, shutdown is requested, or a
    /// termination signal arrives.
    ///
    /// Every update gets its own task; dispatch failures are logged and
    /// never retried.
    pub async fn run<S: UpdateSource>(&self, mut source: S) -> RuntimeResult<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(RuntimeError::AlreadyRunning);
        }
        info!("Weave runtime is now running");

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested, stopping");
                    break;
                }
                _ = wait_for_signal() => {
                    info!("Termination signal received, stopping");
                    self.shutdown.cancel();
                    break;
                }
                maybe_update = source.next_update() => {
                    match maybe_update {
                        Some(update) => self.spawn_dispatch(update),
                        None => {
                            debug!("Update source exhausted");
                            break;
                        }
                    }
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!("Runtime stopped");
        Ok(())
    }

    fn spawn_dispatch(&self, update: Update) {
        let dispatcher = Arc::clone(&self.dispatcher);
        tokio::spawn(async move {
            if let Err(err) = dispatcher.dispatch(update).await {
                error!(error = %err, "Dispatch failed");
            }
        });
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("running", &self.running.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Waits for Ctrl+C or SIGTERM.
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(err) => {
                error!(error = %err, "Failed to register SIGTERM handler");
                let _ = signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use weave_core::{Chat, ChatKind, Message, Middleware};
    use weave_framework::Composer;

    fn text_update(id: i64, text: &str) -> Update {
        let mut msg = Message::new(id, Chat::new(1, ChatKind::Private));
        msg.text = Some(text.to_string());
        let mut update = Update::from_message(msg);
        update.update_id = id;
        update
    }

    fn counting(counter: &Arc<AtomicUsize>) -> Middleware {
        let counter = Arc::clone(counter);
        Middleware::from_fn(move |ctx, next| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                next.run(ctx).await
            }
        })
    }

    #[tokio::test]
    async fn drains_the_source_and_dispatches_each_update() {
        let hits = Arc::new(AtomicUsize::new(0));
        let runtime = Runtime::new(Dispatcher::new(
            Composer::new().use_(counting(&hits)),
        ));

        let (tx, rx) = mpsc::channel(8);
        for i in 0..5 {
            tx.send(text_update(i, "hi")).await.unwrap();
        }
        drop(tx);

        runtime.run(rx).await.unwrap();
        // Spawned dispatches settle after the loop exits.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn shutdown_token_stops_the_loop() {
        let hits = Arc::new(AtomicUsize::new(0));
        let runtime = Arc::new(Runtime::new(Dispatcher::new(
            Composer::new().use_(counting(&hits)),
        )));

        let (_tx, rx) = mpsc::channel::<Update>(1);
        let handle = {
            let runtime = Arc::clone(&runtime);
            tokio::spawn(async move { runtime.run(rx).await })
        };

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        runtime.shutdown();
        handle.await.unwrap().unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn running_twice_is_rejected() {
        let runtime = Arc::new(Runtime::new(Dispatcher::new(Composer::new())));

        let (_tx, rx) = mpsc::channel::<Update>(1);
        let handle = {
            let runtime = Arc::clone(&runtime);
            tokio::spawn(async move { runtime.run(rx).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        let (_tx2, rx2) = mpsc::channel::<Update>(1);
        let err = runtime.run(rx2).await.unwrap_err();
        assert!(matches!(err, RuntimeError::AlreadyRunning));

        runtime.shutdown();
        handle.await.unwrap().unwrap();
    }
}
