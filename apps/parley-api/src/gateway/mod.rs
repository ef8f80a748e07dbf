//! Real-time chat gateway: one WebSocket per client, fanned out through the
//! [`fanout::BroadcastRouter`].

pub mod events;
pub mod fanout;
pub mod lifecycle;
pub mod presence;
pub mod reply_queue;
pub mod responder;
pub mod server;
pub mod session;
