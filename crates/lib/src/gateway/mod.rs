//! Gateway: the inbound HTTP side of the relay.
//!
//! One port serves `POST /slack/events` (Slack Events API) and `GET /` (health).
//! Qualifying events are handed to the dispatcher and acknowledged without waiting.

mod server;
pub mod signature;

pub use server::{router, run_server, serve, RelayState};
