//! Room registry for the relay. Player ids are handed out in join order.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

use crate::game::r#match::MAX_PLAYERS;
use crate::game::PlayerId;
use crate::ws::protocol::ServerMsg;

const ROOM_CHANNEL_CAPACITY: usize = 128;

/// A message fanned out to a room, tagged with its sender
#[derive(Debug, Clone)]
pub struct RoomEnvelope {
    /// `None` for messages originating from the server itself
    pub from: Option<PlayerId>,
    pub msg: ServerMsg,
}

#[derive(Debug, Clone, Copy)]
struct RoomMember {
    player_id: PlayerId,
    connection_id: Uuid,
}

struct Room {
    members: Vec<RoomMember>,
    next_player_id: PlayerId,
    tx: broadcast::Sender<RoomEnvelope>,
}

impl Room {
    fn player_ids(&self) -> Vec<PlayerId> {
        self.members.iter().map(|m| m.player_id).collect()
    }
}

/// What a connection gets back from create/join
#[derive(Debug)]
pub struct Membership {
    pub room_code: String,
    pub player_id: PlayerId,
    pub players: Vec<PlayerId>,
    pub rx: broadcast::Receiver<RoomEnvelope>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LobbyError {
    #[error("Room {0} already exists")]
    RoomExists(String),

    #[error("Room {0} not found")]
    RoomNotFound(String),

    #[error("Room {0} is full")]
    RoomFull(String),

    #[error("Not in a room")]
    NotInRoom,
}

impl LobbyError {
    /// Stable code for the wire
    pub fn code(&self) -> &'static str {
        match self {
            LobbyError::RoomExists(_) => "room_exists",
            LobbyError::RoomNotFound(_) => "room_not_found",
            LobbyError::RoomFull(_) => "room_full",
            LobbyError::NotInRoom => "not_in_room",
        }
    }
}

/// Registry of all open rooms
pub struct RoomRegistry {
    rooms: DashMap<String, Room>,
    max_players: usize,
}

impl RoomRegistry {
    pub fn new(max_players: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            max_players: max_players.max(1),
        }
    }

    /// Open a room; the creator becomes player 0 and the first host
    pub fn create(&self, room_code: &str, connection_id: Uuid) -> Result<Membership, LobbyError> {
        match self.rooms.entry(room_code.to_string()) {
            Entry::Occupied(_) => Err(LobbyError::RoomExists(room_code.to_string())),
            Entry::Vacant(slot) => {
                let (tx, rx) = broadcast::channel(ROOM_CHANNEL_CAPACITY);
                let member = RoomMember {
                    player_id: 0,
                    connection_id,
                };
                slot.insert(Room {
                    members: vec![member],
                    next_player_id: 1,
                    tx,
                });

                info!(room = %room_code, "Room created");
                Ok(Membership {
                    room_code: room_code.to_string(),
                    player_id: 0,
                    players: vec![0],
                    rx,
                })
            }
        }
    }

    pub fn join(&self, room_code: &str, connection_id: Uuid) -> Result<Membership, LobbyError> {
        let mut room = self
            .rooms
            .get_mut(room_code)
            .ok_or_else(|| LobbyError::RoomNotFound(room_code.to_string()))?;

        if room.members.len() >= self.max_players {
            return Err(LobbyError::RoomFull(room_code.to_string()));
        }

        let player_id = room.next_player_id;
        room.next_player_id += 1;
        room.members.push(RoomMember {
            player_id,
            connection_id,
        });

        // Announce before subscribing so the newcomer does not hear itself
        let _ = room.tx.send(RoomEnvelope {
            from: None,
            msg: ServerMsg::PeerJoined { player_id },
        });
        let rx = room.tx.subscribe();

        info!(room = %room_code, player_id, players = room.members.len(), "Player joined room");
        Ok(Membership {
            room_code: room_code.to_string(),
            player_id,
            players: room.player_ids(),
            rx,
        })
    }

    /// Remove a connection; the room closes when its last member leaves
    pub fn leave(&self, room_code: &str, connection_id: Uuid) -> Option<PlayerId> {
        let left = {
            let mut room = self.rooms.get_mut(room_code)?;
            let index = room
                .members
                .iter()
                .position(|m| m.connection_id == connection_id)?;
            let member = room.members.remove(index);
            let _ = room.tx.send(RoomEnvelope {
                from: None,
                msg: ServerMsg::PeerLeft {
                    player_id: member.player_id,
                },
            });
            member.player_id
        };

        if self
            .rooms
            .remove_if(room_code, |_, room| room.members.is_empty())
            .is_some()
        {
            info!(room = %room_code, "Room closed");
        }
        debug!(room = %room_code, player_id = left, "Player left room");
        Some(left)
    }

    /// Fan a message out to everyone in the room
    pub fn publish(&self, room_code: &str, from: Option<PlayerId>, msg: ServerMsg) -> Result<(), LobbyError> {
        let room = self
            .rooms
            .get(room_code)
            .ok_or_else(|| LobbyError::RoomNotFound(room_code.to_string()))?;
        let _ = room.tx.send(RoomEnvelope { from, msg });
        Ok(())
    }

    /// Longest-standing member; passes down the join order as members leave
    pub fn host(&self, room_code: &str) -> Option<PlayerId> {
        self.rooms
            .get(room_code)
            .and_then(|room| room.members.first().map(|m| m.player_id))
    }

    pub fn players(&self, room_code: &str) -> Option<Vec<PlayerId>> {
        self.rooms.get(room_code).map(|room| room.player_ids())
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn player_count(&self) -> usize {
        self.rooms.iter().map(|room| room.members.len()).sum()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(MAX_PLAYERS)
    }
}
