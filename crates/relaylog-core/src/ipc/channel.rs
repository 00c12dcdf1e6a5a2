//! Transport seams for the bridge.
//!
//! A responder implements [`ServerChannel`]; a requester talks to it through
//! a [`ChannelClient`] that carries the requester's scope. Payloads are JSON
//! values so any call/event transport can carry them.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

use crate::error::LogResult;
use crate::types::ScopeId;

/// Stream of event payloads
pub type ValueStream = BoxStream<'static, Value>;

/// Responder side: handles commands and hands out event streams.
#[async_trait]
pub trait ServerChannel: Send + Sync {
    async fn call(&self, command: &str, args: Value) -> LogResult<Value>;

    /// Subscribe to `event` on behalf of a listener with `scope`.
    ///
    /// The subscription is live when this returns.
    fn listen(&self, event: &str, scope: Option<&ScopeId>) -> LogResult<ValueStream>;
}

/// Requester side of a connection.
#[async_trait]
pub trait ChannelClient: Send + Sync {
    async fn call(&self, command: &str, args: Value) -> LogResult<Value>;

    fn listen(&self, event: &str) -> LogResult<ValueStream>;

    /// Requester identity the responder filters events by
    fn scope(&self) -> Option<&ScopeId> {
        None
    }
}

/// Client bound directly to a server living in the same process.
///
/// Arguments and results go through a JSON text round trip, so only what
/// would survive a real process boundary gets through.
pub struct InProcessChannel {
    server: Arc<dyn ServerChannel>,
    scope: Option<ScopeId>,
}

impl InProcessChannel {
    pub fn new(server: Arc<dyn ServerChannel>, scope: Option<ScopeId>) -> Self {
        Self { server, scope }
    }
}

fn over_the_wire(value: &Value) -> LogResult<Value> {
    let text = serde_json::to_string(value)?;
    Ok(serde_json::from_str(&text)?)
}

#[async_trait]
impl ChannelClient for InProcessChannel {
    async fn call(&self, command: &str, args: Value) -> LogResult<Value> {
        let args = over_the_wire(&args)?;
        let result = self.server.call(command, args).await?;
        over_the_wire(&result)
    }

    fn listen(&self, event: &str) -> LogResult<ValueStream> {
        self.server.listen(event, self.scope.as_ref())
    }

    fn scope(&self) -> Option<&ScopeId> {
        self.scope.as_ref()
    }
}
