//! WebSocket protocol message definitions
//! These are the wire types for the LAN relay

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::session::SessionSettings;
use crate::game::{ForgedWeapon, MatchSettings, PlayerId, PlayerSnapshot};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Open a new room under a code chosen by the host
    CreateRoom { room_code: String },

    /// Join an existing room
    JoinRoom { room_code: String },

    /// Local player state, relayed to the other members
    Update { state: PlayerSnapshot },

    /// Ask the forge for a weapon; the result goes to the whole room
    Forge { prompt: String },

    /// Host starts the match for everyone in the room
    StartMatch,

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },

    LeaveRoom,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        connection_id: Uuid,
        server_time: u64,
    },

    /// Confirmation of create/join
    RoomJoined {
        room_code: String,
        player_id: PlayerId,
        /// Everyone in the room, including the new member
        players: Vec<PlayerId>,
    },

    PeerJoined {
        player_id: PlayerId,
    },

    PeerLeft {
        player_id: PlayerId,
    },

    /// Another member's latest state
    PeerState {
        player_id: PlayerId,
        state: PlayerSnapshot,
    },

    /// A weapon forged for one of the members
    WeaponForged {
        weapon: ForgedWeapon,
    },

    /// Everyone simulates with the same tuning
    MatchStarting {
        players: Vec<PlayerId>,
        settings: MatchSettings,
        session: SessionSettings,
    },

    /// Error message
    Error {
        code: String,
        message: String,
    },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

impl ServerMsg {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        ServerMsg::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}
