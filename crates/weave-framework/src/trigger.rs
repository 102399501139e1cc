//! Trigger compilation.
//!
//! Text routing accepts three trigger shapes: literal strings, regular
//! expressions, and functions. Each is compiled once, at registration
//! time, into a [`Trigger`]; applying a trigger to a dispatch's matchable
//! text yields an optional [`MatchCapture`].
//!
//! Literal strings compile to an anchored whole-string equality test.
//! Regular expressions use the `regex` crate, whose matchers are
//! stateless, so repeated dispatches cannot leak matcher position state.

use std::sync::Arc;

use regex::Regex;

use weave_core::{Context, MatchCapture};

/// A function trigger: full access to the text and the context.
pub type TriggerFn = Arc<dyn Fn(&str, &Context) -> Option<MatchCapture> + Send + Sync>;

/// A compiled trigger.
#[derive(Clone)]
pub enum Trigger {
    /// Anchored whole-string equality.
    Literal(String),
    /// Regular-expression match.
    Pattern(Regex),
    /// Arbitrary matcher function.
    Func(TriggerFn),
}

impl Trigger {
    /// A function trigger.
    pub fn func<F>(f: F) -> Self
    where
        F: Fn(&str, &Context) -> Option<MatchCapture> + Send + Sync + 'static,
    {
        Trigger::Func(Arc::new(f))
    }

    /// Applies this trigger to `text`.
    pub fn apply(&self, text: &str, ctx: &Context) -> Option<MatchCapture> {
        match self {
            Trigger::Literal(literal) => (text == literal).then(|| MatchCapture::whole(text)),
            Trigger::Pattern(pattern) => pattern.captures(text).map(|caps| {
                MatchCapture::new(
                    caps.iter()
                        .map(|group| group.map(|m| m.as_str().to_string()))
                        .collect(),
                )
            }),
            Trigger::Func(f) => f(text, ctx),
        }
    }
}

impl std::fmt::Debug for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trigger::Literal(s) => f.debug_tuple("Trigger::Literal").field(s).finish(),
            Trigger::Pattern(re) => f.debug_tuple("Trigger::Pattern").field(&re.as_str()).finish(),
            Trigger::Func(_) => f.write_str("Trigger::Func"),
        }
    }
}

impl From<&str> for Trigger {
    fn from(value: &str) -> Self {
        Trigger::Literal(value.to_string())
    }
}

impl From<String> for Trigger {
    fn from(value: String) -> Self {
        Trigger::Literal(value)
    }
}

impl From<Regex> for Trigger {
    fn from(value: Regex) -> Self {
        Trigger::Pattern(value)
    }
}

/// Conversion of registration arguments into a trigger list.
///
/// Registering with an empty list is a programmer error and panics
/// immediately, at startup.
pub trait IntoTriggers {
    /// Compiles the argument into an ordered trigger list.
    fn into_triggers(self) -> Vec<Trigger>;
}

impl IntoTriggers for Trigger {
    fn into_triggers(self) -> Vec<Trigger> {
        vec![self]
    }
}

impl IntoTriggers for &str {
    fn into_triggers(self) -> Vec<Trigger> {
        vec![self.into()]
    }
}

impl IntoTriggers for String {
    fn into_triggers(self) -> Vec<Trigger> {
        vec![self.into()]
    }
}

impl IntoTriggers for Regex {
    fn into_triggers(self) -> Vec<Trigger> {
        vec![self.into()]
    }
}

impl<T: Into<Trigger>> IntoTriggers for Vec<T> {
    fn into_triggers(self) -> Vec<Trigger> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<T: Into<Trigger>, const N: usize> IntoTriggers for [T; N] {
    fn into_triggers(self) -> Vec<Trigger> {
        self.into_iter().map(Into::into).collect()
    }
}

/// Compiles and validates a trigger list.
pub(crate) fn compile(triggers: impl IntoTriggers) -> Vec<Trigger> {
    let triggers = triggers.into_triggers();
    assert!(
        !triggers.is_empty(),
        "at least one trigger must be provided"
    );
    triggers
}
