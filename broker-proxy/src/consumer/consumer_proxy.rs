/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

use crate::client::{ConsumerClient, ConsumerClientBuilder};
use crate::consumer::dispatch_loop::WatchHandle;
use crate::consumer::handlers::{ConsumerHandlers, ErrorHandler, MessageHandler};
use crate::error::ProxyError;
use crate::lifecycle::bind_callbacks::run_bind_callbacks;
use crate::lifecycle::bind_gate::BindGate;
use crate::lifecycle::OnBind;
use crate::observability::events;
use crate::options::{ConsumerOptions, BOOTSTRAP_SERVERS};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

const PROXY: &str = "consumer";
const COMPONENT: &str = "consumer_proxy";

/// Lifecycle wrapper around a consumer-role broker client.
///
/// Callbacks registered before binding run once the client is bound. Message and error
/// handlers can be registered at any time, once each. At most one watch loop reads the
/// client's events at a time.
pub struct ConsumerProxy {
    gate: BindGate<dyn ConsumerClient>,
    options: Mutex<ConsumerOptions>,
    handlers: Arc<ConsumerHandlers>,
    runtime: OnceLock<Handle>,
    active_watch: Mutex<Option<CancellationToken>>,
}

impl Default for ConsumerProxy {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsumerProxy {
    pub fn new() -> Self {
        Self::with_options(ConsumerOptions::default())
    }

    /// Creates an unbound proxy whose options are the base for [`initialize`](Self::initialize)
    /// and decide the callback mode of [`bind`](Self::bind).
    pub fn with_options(options: ConsumerOptions) -> Self {
        Self {
            gate: BindGate::new(),
            options: Mutex::new(options),
            handlers: Arc::new(ConsumerHandlers::default()),
            runtime: OnceLock::new(),
            active_watch: Mutex::new(None),
        }
    }

    fn lock_options(&self) -> MutexGuard<'_, ConsumerOptions> {
        self.options.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_active_watch(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.active_watch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the current options.
    pub fn options(&self) -> ConsumerOptions {
        self.lock_options().clone()
    }

    pub fn is_ready(&self) -> bool {
        self.gate.is_bound()
    }

    /// The bound client, if any.
    pub fn client(&self) -> Option<Arc<dyn ConsumerClient>> {
        self.gate.client()
    }

    /// Queues callbacks to run when the client gets bound.
    pub fn register<I>(&self, callbacks: I) -> Result<(), ProxyError>
    where
        I: IntoIterator<Item = Arc<dyn OnBind<dyn ConsumerClient>>>,
    {
        self.gate.register(callbacks)
    }

    /// Binds an already constructed client and runs the pending callbacks.
    pub async fn bind(&self, client: Arc<dyn ConsumerClient>) -> Result<(), ProxyError> {
        let options = self.options();
        self.bind_with_options(client, options).await
    }

    /// Builds a client from the merged options and binds it.
    ///
    /// `endpoints` always ends up under `bootstrap.servers`. A construction failure is
    /// returned unchanged and leaves the proxy untouched. A client built here that loses
    /// the bind is closed again.
    pub async fn initialize(
        &self,
        builder: &dyn ConsumerClientBuilder,
        endpoints: &str,
        options: ConsumerOptions,
    ) -> Result<(), ProxyError> {
        if self.is_ready() {
            return Err(ProxyError::AlreadyBound);
        }

        let mut merged = self.options().merged(&options);
        merged.settings.set(BOOTSTRAP_SERVERS, endpoints);

        let client = builder.build(&merged.settings).map_err(|err| {
            error!(
                event = events::CLIENT_BUILD_FAILED,
                component = COMPONENT,
                proxy = PROXY,
                err = %err,
                "unable to construct consumer client"
            );
            ProxyError::from(err)
        })?;

        if let Err(err) = self.bind_with_options(client.clone(), merged).await {
            if let Err(close_err) = client.close().await {
                warn!(
                    event = events::CLIENT_DISCARDED,
                    component = COMPONENT,
                    proxy = PROXY,
                    err = %close_err,
                    "unable to close unbound consumer client"
                );
            }
            return Err(err);
        }
        Ok(())
    }

    async fn bind_with_options(
        &self,
        client: Arc<dyn ConsumerClient>,
        options: ConsumerOptions,
    ) -> Result<(), ProxyError> {
        // Set before the gate opens so a bound proxy always has a runtime to spawn on.
        let runtime = Handle::try_current().map_err(ProxyError::no_runtime)?;
        let _ = self.runtime.set(runtime);

        let callbacks = match self.gate.bind(client.clone()) {
            Ok(callbacks) => callbacks,
            Err(err) => {
                debug!(
                    event = events::BIND_REJECTED,
                    component = COMPONENT,
                    proxy = PROXY,
                    "consumer proxy is already bound"
                );
                return Err(err);
            }
        };
        let mode = options.callback_mode;
        *self.lock_options() = options;

        debug!(
            event = events::BIND_OK,
            component = COMPONENT,
            proxy = PROXY,
            callbacks = callbacks.len(),
            mode = ?mode,
            "consumer client bound"
        );
        run_bind_callbacks(PROXY, client, callbacks, mode).await;
        Ok(())
    }

    /// Sets the message handler. A second call fails with `AlreadyRegistered`.
    pub fn on_message(&self, handler: Arc<dyn MessageHandler>) -> Result<(), ProxyError> {
        self.handlers.set_message(handler)
    }

    /// Sets the error handler. A second call fails with `AlreadyRegistered`.
    pub fn on_error(&self, handler: Arc<dyn ErrorHandler>) -> Result<(), ProxyError> {
        self.handlers.set_error(handler)
    }

    /// Starts a background dispatch loop over the bound client's events.
    ///
    /// Fails with `AlreadyWatching` until the previous loop has exited, including one
    /// that was cancelled but is still finishing its current event. Callable from any
    /// thread; the loop runs on the runtime the client was bound in.
    pub fn watch(&self) -> Result<WatchHandle, ProxyError> {
        let client = self.gate.client().ok_or(ProxyError::NotYetBound)?;
        let runtime = self.runtime.get().ok_or(ProxyError::NotYetBound)?;

        let mut active = self.lock_active_watch();
        if active.as_ref().is_some_and(|exited| !exited.is_cancelled()) {
            debug!(
                event = events::CONSUMER_WATCH_REJECTED,
                component = COMPONENT,
                "consumer watch loop is already running"
            );
            return Err(ProxyError::AlreadyWatching);
        }
        let handle = WatchHandle::spawn(runtime, client, self.handlers.clone());
        *active = Some(handle.exit_signal());
        Ok(handle)
    }
}
