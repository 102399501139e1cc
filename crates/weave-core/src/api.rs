//! Capability-client contract.
//!
//! The engine never performs outbound platform calls itself; handlers and a
//! small number of gating combinators reach the platform through an opaque
//! [`ApiClient`] attached to the context. Transport, serialization of
//! per-method request types, and retry policy all live behind this trait.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::model::ChatMember;

/// Errors that can occur in capability-client operations.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The client has no live connection to the platform.
    #[error("api client is not connected")]
    NotConnected,

    /// The platform rejected or failed the request.
    #[error("api request '{method}' failed: {message}")]
    Request {
        /// The remote method that was invoked.
        method: String,
        /// Failure description from the client or platform.
        message: String,
    },

    /// The platform answered with a payload the caller could not decode.
    #[error("unexpected response for '{method}': {reason}")]
    InvalidResponse {
        /// The remote method that was invoked.
        method: String,
        /// Why decoding failed.
        reason: String,
    },
}

/// Result type for capability-client operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Shared handle to a capability client.
pub type BoxedApiClient = Arc<dyn ApiClient>;

/// Opaque client for outbound platform operations.
///
/// Implementations live outside the engine. The engine itself only calls
/// [`get_chat_member`](Self::get_chat_member), and only from the membership
/// gating combinators; everything else is for user handlers.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Invokes a remote method with JSON parameters.
    async fn call(&self, method: &str, params: Value) -> ApiResult<Value>;

    /// Looks up a chat member.
    ///
    /// Returns `Ok(None)` when the chat has no such member; implementations
    /// must not surface an absent member as an error.
    async fn get_chat_member(&self, chat_id: i64, user_id: i64) -> ApiResult<Option<ChatMember>> {
        let params = serde_json::json!({ "chat_id": chat_id, "user_id": user_id });
        let value = self.call("getChatMember", params).await?;
        if value.is_null() {
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| ApiError::InvalidResponse {
                method: "getChatMember".to_string(),
                reason: e.to_string(),
            })
    }
}
