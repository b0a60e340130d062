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

//! Consumer event-dispatch loop and its cancellation handle.

use crate::client::ConsumerClient;
use crate::consumer::handlers::ConsumerHandlers;
use crate::event::ConsumerEvent;
use crate::observability::{events, fields};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const COMPONENT: &str = "consumer_dispatch_loop";

/// Handle to a running consumer watch loop.
///
/// Cancellation is cooperative: the loop checks for it only between event reads, so an
/// event that is being dispatched always completes first.
pub struct WatchHandle {
    token: CancellationToken,
    exited: CancellationToken,
    join_handle: JoinHandle<()>,
}

impl WatchHandle {
    pub(crate) fn spawn(
        runtime: &Handle,
        client: Arc<dyn ConsumerClient>,
        handlers: Arc<ConsumerHandlers>,
    ) -> Self {
        let token = CancellationToken::new();
        let exited = CancellationToken::new();
        let loop_token = token.clone();
        let exit_guard = exited.clone().drop_guard();
        let join_handle = runtime.spawn(async move {
            let _exit_guard = exit_guard;
            dispatch_loop(client, handlers, loop_token).await;
        });
        Self {
            token,
            exited,
            join_handle,
        }
    }

    /// Fires once the loop task is gone, however it ended.
    pub(crate) fn exit_signal(&self) -> CancellationToken {
        self.exited.clone()
    }

    /// Signals the loop to stop. Only the first call has an effect.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.join_handle.is_finished()
    }

    /// Waits until the loop has exited, either after [`cancel`](Self::cancel) or
    /// because the client's event stream closed.
    pub async fn stopped(self) {
        if let Err(err) = self.join_handle.await {
            error!(
                event = events::CONSUMER_WATCH_CLOSED,
                component = COMPONENT,
                err = %err,
                "consumer dispatch task ended abnormally"
            );
        }
    }
}

pub(crate) async fn dispatch_loop(
    client: Arc<dyn ConsumerClient>,
    handlers: Arc<ConsumerHandlers>,
    token: CancellationToken,
) {
    info!(
        event = events::CONSUMER_WATCH_START,
        component = COMPONENT,
        "consumer dispatch loop started"
    );

    loop {
        let received = tokio::select! {
            biased;
            _ = token.cancelled() => {
                info!(
                    event = events::CONSUMER_WATCH_CANCELLED,
                    component = COMPONENT,
                    reason = fields::REASON_CANCELLED,
                    "stopping consumer dispatch loop"
                );
                break;
            }
            received = client.recv_event() => received,
        };

        let Some(event) = received else {
            info!(
                event = events::CONSUMER_WATCH_CLOSED,
                component = COMPONENT,
                reason = fields::REASON_EVENT_STREAM_CLOSED,
                "event stream closed; stopping consumer dispatch loop"
            );
            break;
        };

        dispatch_event(client.as_ref(), &handlers, event).await;
    }
}

/// Routes one event to its handler, or to the default log output.
pub(crate) async fn dispatch_event(
    client: &dyn ConsumerClient,
    handlers: &ConsumerHandlers,
    event: ConsumerEvent,
) {
    match event {
        ConsumerEvent::PartitionsAssigned(partitions) => {
            error!(
                event = events::CONSUMER_PARTITIONS_ASSIGNED,
                component = COMPONENT,
                partitions = fields::format_partitions(&partitions).as_str(),
                "partitions assigned"
            );
            if let Err(err) = client.assign(&partitions).await {
                error!(
                    event = events::CONSUMER_ASSIGN_FAILED,
                    component = COMPONENT,
                    err = %err,
                    "unable to accept partition assignment"
                );
            }
        }
        ConsumerEvent::PartitionsRevoked(partitions) => {
            error!(
                event = events::CONSUMER_PARTITIONS_REVOKED,
                component = COMPONENT,
                partitions = fields::format_partitions(&partitions).as_str(),
                "partitions revoked"
            );
            if let Err(err) = client.unassign().await {
                error!(
                    event = events::CONSUMER_UNASSIGN_FAILED,
                    component = COMPONENT,
                    err = %err,
                    "unable to release partition assignment"
                );
            }
        }
        ConsumerEvent::Message(message) => match handlers.message() {
            Some(handler) => handler.on_message(message).await,
            None => info!(
                event = events::CONSUMER_MESSAGE,
                component = COMPONENT,
                topic = message.topic(),
                partition = message.topic_partition.partition,
                key = fields::format_message_key(&message).as_str(),
                value = fields::format_message_value(&message).as_str(),
                "message received"
            ),
        },
        ConsumerEvent::PartitionEof(tp) => {
            info!(
                event = events::CONSUMER_PARTITION_EOF,
                component = COMPONENT,
                partition = fields::format_topic_partition(&tp).as_str(),
                "reached end of partition"
            );
        }
        ConsumerEvent::Error(err) => match handlers.error() {
            Some(handler) => handler.on_error(err).await,
            None => error!(
                event = events::CONSUMER_BROKER_ERROR,
                component = COMPONENT,
                err = %err,
                "broker reported an error"
            ),
        },
        ConsumerEvent::Other(description) => {
            error!(
                event = events::CONSUMER_IGNORED_EVENT,
                component = COMPONENT,
                description = description.as_str(),
                "ignored consumer event"
            );
        }
    }
}
