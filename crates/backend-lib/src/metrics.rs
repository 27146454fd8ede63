// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for Prometheus metric keys
pub const WS_CONNECTION: &str = "ws.connection";
pub const WS_DISCONNECTION: &str = "ws.disconnection";
pub const WS_ACTIVE: &str = "ws.active";
pub const ROOM_CREATED: &str = "room.created";
pub const ROOM_CLOSED: &str = "room.closed";
pub const ROOM_ACTIVE: &str = "room.active";
pub const INTENT_HANDLED: &str = "intent.handled";
pub const INTENT_REJECTED: &str = "intent.rejected";
pub const MALFORMED_FRAME: &str = "frame.malformed";
