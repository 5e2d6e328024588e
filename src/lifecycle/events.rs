//! Transport lifecycle events
//!
//! The finite set of messages a transport integration feeds the
//! controller. Transports with callback-style APIs can call the
//! controller's `on_*` methods directly; transports that deliver events
//! over a channel dispatch values of this enum instead.

use std::net::IpAddr;

/// One transport lifecycle event for a connection
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// TCP connection established
    Connect {
        /// Transport-assigned connection ID
        session_id: u64,
        /// Remote peer IP
        ip: IpAddr,
    },
    /// Publish request for a stream path
    PublishRequest {
        /// Transport-assigned connection ID
        session_id: u64,
        /// Remote peer IP
        ip: IpAddr,
        /// Raw stream path (`/live/<key>`)
        path: String,
    },
    /// Playback request for a stream path
    PlayRequest {
        /// Transport-assigned connection ID
        session_id: u64,
        /// Remote peer IP
        ip: IpAddr,
        /// Raw stream path (`/live/<key>`)
        path: String,
    },
    /// Data packet observed on the connection
    Data {
        /// Transport-assigned connection ID
        session_id: u64,
        /// Payload size in bytes
        bytes: u64,
    },
    /// Publisher stopped publishing
    Unpublish {
        /// Transport-assigned connection ID
        session_id: u64,
    },
    /// Viewer stopped playback
    Unplay {
        /// Transport-assigned connection ID
        session_id: u64,
    },
    /// Connection closed
    Disconnect {
        /// Transport-assigned connection ID
        session_id: u64,
    },
}
