//! LAN lobby: rooms addressed by a short code

pub mod rooms;

pub use rooms::{LobbyError, Membership, RoomEnvelope, RoomRegistry};
