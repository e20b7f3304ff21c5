//! Centralized default constants for notehub.
//!
//! Every crate references these instead of defining its own magic numbers.

// =============================================================================
// CONTENT ORDERING
// =============================================================================

/// Raw insertion index meaning "append after the last content block".
pub const APPEND_INDEX: i64 = -1;

// =============================================================================
// FAN-OUT
// =============================================================================

/// Capacity of each subscriber's outbound queue. A subscriber whose queue is
/// full misses the message instead of blocking the writer.
pub const SUBSCRIBER_BUFFER: usize = 64;

/// Interval between WebSocket keepalive pings.
pub const WS_PING_INTERVAL_SECS: u64 = 30;

// =============================================================================
// SERVER
// =============================================================================

pub const SERVER_HOST: &str = "0.0.0.0";

pub const SERVER_PORT: u16 = 8080;

/// Maximum accepted request body, in bytes.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;
