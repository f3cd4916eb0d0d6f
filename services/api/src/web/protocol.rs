//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol for the live dashboard feed.
//! A client subscribes to one feed at a time and receives a full snapshot on
//! every refresh tick.

use serde::{Deserialize, Serialize};

use crate::web::dto::{EventResponse, SubscriptionResponse};

/// The data a live connection can follow.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Feed {
    /// Calendar events with their derived status.
    Events,
    /// Subscription contracts with days remaining and expiry status.
    Subscriptions,
}

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Starts (or switches to) a feed. Any previous feed is cancelled first.
    Subscribe { feed: Feed },

    /// Stops the current feed. No further snapshots are sent for it.
    Unsubscribe,

    /// Requests an immediate snapshot of the current feed.
    Refresh,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms a subscription and how often snapshots will arrive.
    Subscribed { feed: Feed, refresh_interval_secs: u64 },

    /// A full snapshot of the events feed.
    Events { events: Vec<EventResponse> },

    /// A full snapshot of the subscriptions feed.
    Subscriptions { subscriptions: Vec<SubscriptionResponse> },

    /// Confirms that the feed was stopped.
    Unsubscribed,

    /// Reports an error to the client, which should display the message.
    Error { message: String },
}
