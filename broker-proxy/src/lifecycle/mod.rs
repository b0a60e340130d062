//! Binding and callback-registration state machine shared by both proxies.
//!
//! A proxy starts unbound and collects on-bind callbacks. Binding happens exactly
//! once and drains the callbacks, which then run sequentially or concurrently
//! depending on [`CallbackMode`][crate::CallbackMode]. After binding the callback
//! list is frozen. The producer can later release its client on close, which never
//! re-opens the gate.

pub(crate) mod bind_callbacks;
pub(crate) mod bind_gate;

use crate::error::CallbackError;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// Callback invoked once with the bound client.
///
/// Closures returning a future implement this trait:
///
/// ```
/// use std::sync::Arc;
/// use broker_proxy::{CallbackError, ConsumerClient, ConsumerProxy, OnBind};
///
/// let proxy = ConsumerProxy::new();
/// let subscribe: Arc<dyn OnBind<dyn ConsumerClient>> =
///     Arc::new(|client: Arc<dyn ConsumerClient>| async move {
///         client.subscribe(&["orders".to_string()]).await?;
///         Ok::<(), CallbackError>(())
///     });
///
/// assert!(proxy.register([subscribe]).is_ok());
/// ```
#[async_trait]
pub trait OnBind<C: ?Sized + Send + Sync + 'static>: Send + Sync {
    async fn on_bind(&self, client: Arc<C>) -> Result<(), CallbackError>;
}

#[async_trait]
impl<C, F, Fut> OnBind<C> for F
where
    C: ?Sized + Send + Sync + 'static,
    F: Fn(Arc<C>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), CallbackError>> + Send + 'static,
{
    async fn on_bind(&self, client: Arc<C>) -> Result<(), CallbackError> {
        (self)(client).await
    }
}
