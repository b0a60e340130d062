//! Canonical structured event names used across `broker-proxy`.

// Bind gate and on-bind callbacks.
pub const BIND_OK: &str = "bind_ok";
pub const BIND_REJECTED: &str = "bind_rejected";
pub const BIND_CALLBACK_OK: &str = "bind_callback_ok";
pub const BIND_CALLBACK_FAILED: &str = "bind_callback_failed";
pub const CLIENT_BUILD_FAILED: &str = "client_build_failed";
pub const CLIENT_DISCARDED: &str = "client_discarded";

// Consumer dispatch loop.
pub const CONSUMER_WATCH_START: &str = "consumer_watch_start";
pub const CONSUMER_WATCH_REJECTED: &str = "consumer_watch_rejected";
pub const CONSUMER_WATCH_CANCELLED: &str = "consumer_watch_cancelled";
pub const CONSUMER_WATCH_CLOSED: &str = "consumer_watch_closed";
pub const CONSUMER_PARTITIONS_ASSIGNED: &str = "consumer_partitions_assigned";
pub const CONSUMER_PARTITIONS_REVOKED: &str = "consumer_partitions_revoked";
pub const CONSUMER_ASSIGN_FAILED: &str = "consumer_assign_failed";
pub const CONSUMER_UNASSIGN_FAILED: &str = "consumer_unassign_failed";
pub const CONSUMER_MESSAGE: &str = "consumer_message";
pub const CONSUMER_PARTITION_EOF: &str = "consumer_partition_eof";
pub const CONSUMER_BROKER_ERROR: &str = "consumer_broker_error";
pub const CONSUMER_IGNORED_EVENT: &str = "consumer_ignored_event";

// Producer send path and delivery loop.
pub const PRODUCER_SEND_ASYNC_FAILED: &str = "producer_send_async_failed";
pub const PRODUCER_DELIVERY_WATCH_START: &str = "producer_delivery_watch_start";
pub const PRODUCER_DELIVERY_WATCH_CLOSED: &str = "producer_delivery_watch_closed";
pub const PRODUCER_DELIVERED: &str = "producer_delivered";
pub const PRODUCER_DELIVERY_FAILED: &str = "producer_delivery_failed";
pub const PRODUCER_IGNORED_EVENT: &str = "producer_ignored_event";
pub const PRODUCER_CLOSE: &str = "producer_close";
