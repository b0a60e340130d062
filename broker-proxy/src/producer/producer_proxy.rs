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

use crate::client::{ProducerClient, ProducerClientBuilder};
use crate::error::ProxyError;
use crate::lifecycle::bind_callbacks::run_bind_callbacks;
use crate::lifecycle::bind_gate::BindGate;
use crate::lifecycle::OnBind;
use crate::message::Message;
use crate::observability::{events, fields};
use crate::options::{ProducerOptions, BOOTSTRAP_SERVERS};
use crate::producer::delivery_loop::delivery_loop;
use crate::producer::handlers::{DeliveryHandler, DeliveryHandlers, EventHandler};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

const PROXY: &str = "producer";
const COMPONENT: &str = "producer_proxy";

#[derive(Default)]
struct DeliveryState {
    watching: bool,
    handlers: DeliveryHandlers,
}

/// Lifecycle wrapper around a producer-role broker client.
///
/// Once bound, and unless delivery confirmation is disabled, a background task reads
/// delivery reports, counts successful deliveries and forwards reports to the
/// registered handlers. Handlers can only be registered before that task starts.
pub struct ProducerProxy {
    gate: BindGate<dyn ProducerClient>,
    options: Mutex<ProducerOptions>,
    delivery: Mutex<DeliveryState>,
    delivered: Arc<AtomicU64>,
    delivery_task: Mutex<Option<JoinHandle<()>>>,
    runtime: OnceLock<Handle>,
}

impl Default for ProducerProxy {
    fn default() -> Self {
        Self::new()
    }
}

impl ProducerProxy {
    pub fn new() -> Self {
        Self::with_options(ProducerOptions::default())
    }

    pub fn with_options(options: ProducerOptions) -> Self {
        Self {
            gate: BindGate::new(),
            options: Mutex::new(options),
            delivery: Mutex::new(DeliveryState::default()),
            delivered: Arc::new(AtomicU64::new(0)),
            delivery_task: Mutex::new(None),
            runtime: OnceLock::new(),
        }
    }

    fn lock_options(&self) -> MutexGuard<'_, ProducerOptions> {
        self.options.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_delivery(&self) -> MutexGuard<'_, DeliveryState> {
        self.delivery.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_delivery_task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.delivery_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the current options.
    pub fn options(&self) -> ProducerOptions {
        self.lock_options().clone()
    }

    pub fn is_ready(&self) -> bool {
        self.gate.is_bound()
    }

    pub fn is_watching_delivery(&self) -> bool {
        self.lock_delivery().watching
    }

    /// Number of successful delivery reports seen so far.
    pub fn delivered_count(&self) -> u64 {
        self.delivered.load(Ordering::Acquire)
    }

    /// The bound client, if any.
    pub fn client(&self) -> Option<Arc<dyn ProducerClient>> {
        self.gate.client()
    }

    /// Queues callbacks to run when the client gets bound.
    pub fn register<I>(&self, callbacks: I) -> Result<(), ProxyError>
    where
        I: IntoIterator<Item = Arc<dyn OnBind<dyn ProducerClient>>>,
    {
        self.gate.register(callbacks)
    }

    /// Binds an already constructed client, runs the pending callbacks and starts the
    /// delivery loop unless confirmation is disabled.
    pub async fn bind(&self, client: Arc<dyn ProducerClient>) -> Result<(), ProxyError> {
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
        builder: &dyn ProducerClientBuilder,
        endpoints: &str,
        options: ProducerOptions,
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
                "unable to construct producer client"
            );
            ProxyError::from(err)
        })?;

        if let Err(err) = self.bind_with_options(client.clone(), merged).await {
            client.close().await;
            debug!(
                event = events::CLIENT_DISCARDED,
                component = COMPONENT,
                proxy = PROXY,
                "closed producer client that was never bound"
            );
            return Err(err);
        }
        Ok(())
    }

    async fn bind_with_options(
        &self,
        client: Arc<dyn ProducerClient>,
        options: ProducerOptions,
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
                    "producer proxy is already bound"
                );
                return Err(err);
            }
        };
        let mode = options.callback_mode;
        let confirm_delivery = options.confirm_delivery;
        *self.lock_options() = options;

        debug!(
            event = events::BIND_OK,
            component = COMPONENT,
            proxy = PROXY,
            callbacks = callbacks.len(),
            mode = ?mode,
            confirm_delivery,
            "producer client bound"
        );
        run_bind_callbacks(PROXY, client, callbacks, mode).await;

        if confirm_delivery {
            self.start_delivery_loop();
        }
        Ok(())
    }

    fn start_delivery_loop(&self) {
        // Held until the task is stored: `close` clears `watching` and takes the task
        // only after this returns.
        let mut delivery = self.lock_delivery();

        // A sequential callback or a concurrent `close` may have released the client.
        let (Some(client), Some(runtime)) = (self.gate.client(), self.runtime.get()) else {
            return;
        };

        delivery.watching = true;
        let task = runtime.spawn(delivery_loop(
            client,
            delivery.handlers.clone(),
            self.delivered.clone(),
        ));
        *self.lock_delivery_task() = Some(task);
    }

    fn register_delivery_handlers(
        &self,
        add: impl FnOnce(&mut DeliveryHandlers),
    ) -> Result<(), ProxyError> {
        let mut delivery = self.lock_delivery();
        if delivery.watching {
            return Err(ProxyError::DeliverIsWatching);
        }
        add(&mut delivery.handlers);
        Ok(())
    }

    /// Adds handlers for successful delivery reports. Rejected once the delivery loop runs.
    pub fn on_delivery<I>(&self, handlers: I) -> Result<(), ProxyError>
    where
        I: IntoIterator<Item = Arc<dyn DeliveryHandler>>,
    {
        self.register_delivery_handlers(|all| all.delivered.extend(handlers))
    }

    /// Adds handlers for failed delivery reports. Rejected once the delivery loop runs.
    pub fn on_delivery_error<I>(&self, handlers: I) -> Result<(), ProxyError>
    where
        I: IntoIterator<Item = Arc<dyn DeliveryHandler>>,
    {
        self.register_delivery_handlers(|all| all.failed.extend(handlers))
    }

    /// Adds handlers for every other producer event. Rejected once the delivery loop runs.
    pub fn on_unrecognized_event<I>(&self, handlers: I) -> Result<(), ProxyError>
    where
        I: IntoIterator<Item = Arc<dyn EventHandler>>,
    {
        self.register_delivery_handlers(|all| all.unrecognized.extend(handlers))
    }

    /// Hands `message` to the client's production channel from a detached task.
    ///
    /// Returns right away. Failures only show up in the delivery loop or the log. Callable
    /// from any thread; the task runs on the runtime the client was bound in.
    pub fn send_async(&self, message: Message) -> Result<(), ProxyError> {
        let client = self.gate.client().ok_or(ProxyError::NotYetBound)?;
        let runtime = self.runtime.get().ok_or(ProxyError::NotYetBound)?;
        let channel = client.produce_channel();

        runtime.spawn(async move {
            if let Err(err) = channel.send(message).await {
                let message = err.0;
                error!(
                    event = events::PRODUCER_SEND_ASYNC_FAILED,
                    component = COMPONENT,
                    topic = message.topic(),
                    key = fields::format_message_key(&message).as_str(),
                    "production channel is closed"
                );
            }
        });
        Ok(())
    }

    /// Submits `message` through the client's direct produce call.
    ///
    /// The result only reflects submission. Delivery is reported later through the
    /// delivery loop.
    pub fn send_sync(&self, message: Message) -> Result<(), ProxyError> {
        let client = self.gate.client().ok_or(ProxyError::NotYetBound)?;
        client.produce(message)?;
        Ok(())
    }

    /// Releases and closes the client, then waits for the delivery loop to drain.
    ///
    /// A closed proxy cannot be bound again.
    pub async fn close(&self) -> Result<(), ProxyError> {
        let client = self.gate.release()?;
        self.lock_delivery().watching = false;

        info!(
            event = events::PRODUCER_CLOSE,
            component = COMPONENT,
            delivered = self.delivered_count(),
            "closing producer client"
        );
        client.close().await;

        let task = self.lock_delivery_task().take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                error!(
                    event = events::PRODUCER_DELIVERY_WATCH_CLOSED,
                    component = COMPONENT,
                    err = %err,
                    "producer delivery task ended abnormally"
                );
            }
        }
        Ok(())
    }
}
