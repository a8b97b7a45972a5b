//! Reaction relay library: receives Slack `reaction_added` events, fetches the
//! reacted-to message and adds it as a page to a Notion database.

pub mod config;
pub mod dispatch;
pub mod escape;
pub mod events;
pub mod gateway;
pub mod notion;
pub mod slack;
