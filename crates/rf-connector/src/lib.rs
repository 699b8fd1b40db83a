//! # rf-connector: Game Server Connector
//!
//! HTTP connection to the slot game server.
//!
//! ## Features
//!
//! - Line-bonus and cascade spin endpoints as a [`rf_reveal::GameService`]
//! - Profile balance resync as a [`rf_reveal::SessionAuthority`]
//! - Bearer token shared between both, cleared on `401`
//! - Server error bodies classified into spin failures

pub mod connector;
pub mod protocol;
pub mod session;

pub use connector::*;
pub use protocol::*;
pub use session::*;
