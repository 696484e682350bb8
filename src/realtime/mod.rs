pub mod hub;
pub mod socket;

pub use hub::RealtimeHub;

/// Names of the frames exchanged over `/ws`.
pub mod events {
    pub const BOOKING_NEW: &str = "booking:new";
    pub const BOOKING_UPDATED: &str = "booking:updated";
    pub const COMPLAINT_NEW: &str = "complaint:new";
    pub const COMPLAINT_UPDATED: &str = "complaint:updated";
    pub const CHAT_SEND: &str = "chat:send";
    pub const CHAT_MESSAGE: &str = "chat:message";
    pub const CHAT_READ: &str = "chat:read";
    pub const USER_ONLINE: &str = "user:online";
    pub const USER_OFFLINE: &str = "user:offline";
    pub const PING: &str = "ping";
    pub const PONG: &str = "pong";
    pub const ERROR: &str = "error";
}
