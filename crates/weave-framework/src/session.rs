//! Session layer.
//!
//! The engine's contract with a session store is "read before the chain,
//! write after": the middleware loads the value for the derived key into
//! the context, runs the rest of the chain, then persists what the chain
//! left behind (or deletes the entry when the chain cleared it). The
//! write is skipped when the chain fails.
//!
//! Concurrent dispatches sharing a key perform a read-modify-write with
//! no coordination by default; the race is documented, not hidden. The
//! opt-in serialized mode holds a per-key lock across the whole dispatch,
//! so such dispatches converge instead.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::trace;

use weave_core::{Context, Middleware, WeaveResult};

/// An external, process-lifetime associative store for sessions.
///
/// No assumption is made about the backing; implementations may be
/// in-memory, on disk, or remote. An absent key is "no prior session",
/// never an error.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads the value stored under `key`.
    async fn get(&self, key: &str) -> WeaveResult<Option<Value>>;

    /// Stores `value` under `key`.
    async fn set(&self, key: &str, value: Value) -> WeaveResult<()>;

    /// Deletes the entry under `key`; deleting an absent key is a no-op.
    async fn delete(&self, key: &str) -> WeaveResult<()>;
}

/// Process-local in-memory session store.
///
/// Each individual operation is atomic, but the store does nothing to
/// serialize a read-modify-write spanning several operations; see the
/// module documentation.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` when no session is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> WeaveResult<Option<Value>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> WeaveResult<()> {
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> WeaveResult<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Derives the session key for a dispatch; `None` skips the session
/// entirely.
pub type SessionKeyFn = Arc<dyn Fn(&Context) -> Option<String> + Send + Sync>;

/// The default key: `"<from_id>:<chat_id>"`, requiring both a resolvable
/// sender and chat.
pub fn default_session_key(ctx: &Context) -> Option<String> {
    let from = ctx.from()?;
    let chat = ctx.chat()?;
    Some(format!("{}:{}", from.id, chat.id))
}

/// Options for the session middleware.
#[derive(Clone)]
pub struct SessionOptions {
    key_fn: SessionKeyFn,
    serialized: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            key_fn: Arc::new(default_session_key),
            serialized: false,
        }
    }
}

impl SessionOptions {
    /// Default options: derived `from:chat` key, no per-key
    /// serialization.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the key-derivation function.
    pub fn key_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&Context) -> Option<String> + Send + Sync + 'static,
    {
        self.key_fn = Arc::new(f);
        self
    }

    /// Holds a per-key lock across the whole dispatch, so concurrent
    /// dispatches sharing a key run their read-modify-write one at a
    /// time.
    pub fn serialized(mut self) -> Self {
        self.serialized = true;
        self
    }
}

/// Session middleware with default options.
pub fn session(store: Arc<dyn SessionStore>) -> Middleware {
    session_with(store, SessionOptions::default())
}

/// Session middleware.
///
/// Loads the session before the rest of the chain runs, exposes it
/// through the context's session slot, and persists the slot's final
/// content once the chain completes successfully.
pub fn session_with(store: Arc<dyn SessionStore>, options: SessionOptions) -> Middleware {
    // Per-key locks for the serialized mode; entries are retained for the
    // process lifetime.
    let locks: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>> =
        Arc::new(Mutex::new(HashMap::new()));
    let key_fn = options.key_fn;
    let serialized = options.serialized;

    Middleware::from_fn(move |ctx, next| {
        let store = Arc::clone(&store);
        let key_fn = Arc::clone(&key_fn);
        let locks = Arc::clone(&locks);
        async move {
            let Some(key) = key_fn(&ctx) else {
                return next.run(ctx).await;
            };

            let _guard = if serialized {
                let lock = Arc::clone(
                    locks
                        .lock()
                        .entry(key.clone())
                        .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
                );
                Some(lock.lock_owned().await)
            } else {
                None
            };

            if let Some(value) = store.get(&key).await? {
                ctx.set_session(value);
            }
            trace!(%key, "session loaded");

            let result = next.run(ctx.clone()).await;
            if result.is_ok() {
                match ctx.session() {
                    Some(value) => store.set(&key, value).await?,
                    None => store.delete(&key).await?,
                }
                trace!(%key, "session stored");
            }
            result
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_core::pipeline::compose;
    use weave_core::{Chat, ChatKind, Message, Next, Update, User, WeaveError};

    fn keyed_update(user_id: i64) -> Update {
        let mut msg = Message::new(1, Chat::new(10, ChatKind::Private));
        msg.from = Some(User::new(user_id));
        msg.text = Some("hi".to_string());
        Update::from_message(msg)
    }

    /// Reads the counter out of the session, yields, writes it back
    /// incremented. The yield forces the read and the write into
    /// different scheduler slices, which is what exposes the race.
    fn incrementing() -> Middleware {
        Middleware::from_fn(|ctx, next| async move {
            let current = ctx
                .session()
                .and_then(|v| v.as_i64())
                .unwrap_or(0);
            tokio::task::yield_now().await;
            ctx.set_session(Value::from(current + 1));
            next.run(ctx).await
        })
    }

    async fn dispatch(mw: &Middleware, update: Update) -> WeaveResult<()> {
        let chain = mw.unwrap();
        let ctx = Context::new(update);
        let next = Next::terminal(&ctx);
        chain(ctx, next).await
    }

    #[tokio::test]
    async fn loads_and_persists_session() {
        let store = Arc::new(MemorySessionStore::new());
        let mw = Middleware::Func(compose([
            session(Arc::clone(&store) as Arc<dyn SessionStore>),
            incrementing(),
        ]));

        dispatch(&mw, keyed_update(42)).await.unwrap();
        dispatch(&mw, keyed_update(42)).await.unwrap();

        assert_eq!(store.get("42:10").await.unwrap(), Some(Value::from(2)));
    }

    #[tokio::test]
    async fn cleared_session_deletes_the_entry() {
        let store = Arc::new(MemorySessionStore::new());
        store.set("42:10", Value::from(9)).await.unwrap();

        let clearing = Middleware::from_fn(|ctx, next| async move {
            ctx.clear_session();
            next.run(ctx).await
        });
        let mw = Middleware::Func(compose([
            session(Arc::clone(&store) as Arc<dyn SessionStore>),
            clearing,
        ]));

        dispatch(&mw, keyed_update(42)).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn failed_chain_skips_the_write() {
        let store = Arc::new(MemorySessionStore::new());
        let failing = Middleware::from_fn(|ctx, _next| async move {
            ctx.set_session(Value::from(99));
            Err(WeaveError::msg("boom"))
        });
        let mw = Middleware::Func(compose([
            session(Arc::clone(&store) as Arc<dyn SessionStore>),
            failing,
        ]));

        dispatch(&mw, keyed_update(42)).await.unwrap_err();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn missing_key_skips_the_session() {
        let store = Arc::new(MemorySessionStore::new());
        let mw = Middleware::Func(compose([
            session(Arc::clone(&store) as Arc<dyn SessionStore>),
            incrementing(),
        ]));

        // No chat and no sender, so no key can be derived.
        dispatch(&mw, Update::default()).await.unwrap();
        assert!(store.is_empty());
    }

    /// Without per-key serialization, 100 concurrent increments of the
    /// same key collapse: every dispatch reads the store before any
    /// dispatch writes it back. This is the documented race.
    #[tokio::test(flavor = "current_thread")]
    async fn concurrent_increments_race_without_serialization() {
        let store = Arc::new(MemorySessionStore::new());
        let mw = Arc::new(Middleware::Func(compose([
            session(Arc::clone(&store) as Arc<dyn SessionStore>),
            incrementing(),
        ])));

        let mut tasks = Vec::new();
        for _ in 0..100 {
            let mw = Arc::clone(&mw);
            tasks.push(tokio::spawn(async move {
                dispatch(&mw, keyed_update(42)).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let stored = store.get("42:10").await.unwrap().unwrap();
        let stored = stored.as_i64().unwrap();
        assert!(stored < 100, "lost updates expected, got {stored}");
    }

    /// With per-key serialization, the same 100 concurrent increments
    /// converge to exactly 100.
    #[tokio::test(flavor = "current_thread")]
    async fn concurrent_increments_converge_when_serialized() {
        let store = Arc::new(MemorySessionStore::new());
        let mw = Arc::new(Middleware::Func(compose([
            session_with(
                Arc::clone(&store) as Arc<dyn SessionStore>,
                SessionOptions::new().serialized(),
            ),
            incrementing(),
        ])));

        let mut tasks = Vec::new();
        for _ in 0..100 {
            let mw = Arc::clone(&mw);
            tasks.push(tokio::spawn(async move {
                dispatch(&mw, keyed_update(42)).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(store.get("42:10").await.unwrap(), Some(Value::from(100)));
    }

    /// Distinct keys never contend, serialized or not.
    #[tokio::test]
    async fn distinct_keys_are_independent() {
        let store = Arc::new(MemorySessionStore::new());
        let mw = Middleware::Func(compose([
            session_with(
                Arc::clone(&store) as Arc<dyn SessionStore>,
                SessionOptions::new().serialized(),
            ),
            incrementing(),
        ]));

        dispatch(&mw, keyed_update(1)).await.unwrap();
        dispatch(&mw, keyed_update(2)).await.unwrap();

        assert_eq!(store.get("1:10").await.unwrap(), Some(Value::from(1)));
        assert_eq!(store.get("2:10").await.unwrap(), Some(Value::from(1)));
    }
}
