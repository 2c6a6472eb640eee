//! WebSocket upgrade handler and the per-connection relay

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::PlayerId;
use crate::lobby::{LobbyError, Membership, RoomEnvelope};
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

const OUTBOUND_CAPACITY: usize = 128;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let connection_id = Uuid::new_v4();
    debug!(connection_id = %connection_id, "WebSocket upgrade");
    ws.on_upgrade(move |socket| handle_socket(socket, connection_id, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, connection_id: Uuid, state: AppState) {
    info!(connection_id = %connection_id, "New WebSocket connection");

    let (mut ws_sink, mut ws_stream) = socket.split();

    let welcome = ServerMsg::Welcome {
        connection_id,
        server_time: unix_millis(),
    };
    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(connection_id = %connection_id, error = %e, "Failed to send welcome");
        return;
    }

    // Writer task: outbound queue -> WebSocket
    let (out_tx, mut out_rx) = mpsc::channel::<ServerMsg>(OUTBOUND_CAPACITY);
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(connection_id = %connection_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    let mut connection = Connection::new(connection_id, state, out_tx);

    // Reader loop: WebSocket -> relay
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMsg>(&text) {
                Ok(msg) => {
                    if !connection.handle(msg).await {
                        break;
                    }
                }
                Err(e) => {
                    warn!(connection_id = %connection_id, error = %e, "Failed to parse client message");
                    if !connection.reply(ServerMsg::error("bad_message", e.to_string())).await {
                        break;
                    }
                }
            },
            Ok(Message::Binary(_)) => {
                warn!(connection_id = %connection_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) => {
                debug!(connection_id = %connection_id, "Received ping");
            }
            Ok(Message::Pong(_)) => {
                debug!(connection_id = %connection_id, "Received pong");
            }
            Ok(Message::Close(_)) => {
                info!(connection_id = %connection_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    connection.leave_room();
    writer_handle.abort();

    info!(connection_id = %connection_id, "WebSocket connection closed");
}

/// A connection's place in a room
struct Seat {
    room_code: String,
    player_id: PlayerId,
    forwarder: JoinHandle<()>,
}

/// Relay state for one client
struct Connection {
    id: Uuid,
    state: AppState,
    out_tx: mpsc::Sender<ServerMsg>,
    limiter: ConnectionRateLimiter,
    seat: Option<Seat>,
}

impl Connection {
    fn new(id: Uuid, state: AppState, out_tx: mpsc::Sender<ServerMsg>) -> Self {
        let limiter = ConnectionRateLimiter::new(state.config.forge_cooldown);
        Self {
            id,
            state,
            out_tx,
            limiter,
            seat: None,
        }
    }

    /// Queue a message for this client. False once the writer is gone.
    async fn reply(&self, msg: ServerMsg) -> bool {
        self.out_tx.send(msg).await.is_ok()
    }

    /// Apply one client message. Returns false when the connection should close.
    async fn handle(&mut self, msg: ClientMsg) -> bool {
        match msg {
            ClientMsg::CreateRoom { room_code } => {
                self.leave_room();
                let result = self.state.rooms.create(&room_code, self.id);
                self.take_seat(result).await
            }
            ClientMsg::JoinRoom { room_code } => {
                self.leave_room();
                let result = self.state.rooms.join(&room_code, self.id);
                self.take_seat(result).await
            }
            ClientMsg::Update { mut state } => {
                let Some(seat) = &self.seat else {
                    return self.reply(not_in_room()).await;
                };
                if !self.limiter.check_sync() {
                    debug!(connection_id = %self.id, "Rate limited state update");
                    return true;
                }

                // Members can only speak for themselves
                state.player_id = seat.player_id;
                let relayed = ServerMsg::PeerState {
                    player_id: seat.player_id,
                    state,
                };
                if let Err(e) = self.state.rooms.publish(&seat.room_code, Some(seat.player_id), relayed) {
                    return self.reply(ServerMsg::error(e.code(), e.to_string())).await;
                }
                true
            }
            ClientMsg::Forge { prompt } => {
                let Some(seat) = &self.seat else {
                    return self.reply(not_in_room()).await;
                };
                if !self.limiter.check_forge() {
                    return self
                        .reply(ServerMsg::error("rate_limited", "Forge is cooling down"))
                        .await;
                }
                self.spawn_forge(seat.room_code.clone(), seat.player_id, prompt);
                true
            }
            ClientMsg::StartMatch => {
                let Some(seat) = &self.seat else {
                    return self.reply(not_in_room()).await;
                };
                if self.state.rooms.host(&seat.room_code) != Some(seat.player_id) {
                    return self
                        .reply(ServerMsg::error("not_host", "Only the host can start the match"))
                        .await;
                }

                let players = self.state.rooms.players(&seat.room_code).unwrap_or_default();
                info!(room = %seat.room_code, players = players.len(), "Match starting");
                let starting = ServerMsg::MatchStarting {
                    players,
                    settings: self.state.config.match_settings.clone(),
                    session: self.state.config.session.clone(),
                };
                if let Err(e) = self.state.rooms.publish(&seat.room_code, None, starting) {
                    return self.reply(ServerMsg::error(e.code(), e.to_string())).await;
                }
                true
            }
            ClientMsg::Ping { t } => self.reply(ServerMsg::Pong { t }).await,
            ClientMsg::LeaveRoom => {
                self.leave_room();
                true
            }
        }
    }

    async fn take_seat(&mut self, result: Result<Membership, LobbyError>) -> bool {
        match result {
            Ok(membership) => {
                let joined = ServerMsg::RoomJoined {
                    room_code: membership.room_code.clone(),
                    player_id: membership.player_id,
                    players: membership.players.clone(),
                };
                let forwarder = spawn_forwarder(self.id, membership.player_id, membership.rx, self.out_tx.clone());
                self.seat = Some(Seat {
                    room_code: membership.room_code,
                    player_id: membership.player_id,
                    forwarder,
                });
                self.reply(joined).await
            }
            Err(e) => {
                debug!(connection_id = %self.id, error = %e, "Room request refused");
                self.reply(ServerMsg::error(e.code(), e.to_string())).await
            }
        }
    }

    fn spawn_forge(&self, room_code: String, player_id: PlayerId, prompt: String) {
        let state = self.state.clone();
        let out_tx = self.out_tx.clone();
        tokio::spawn(async move {
            match state.forge.forge(player_id, prompt).await {
                Ok(weapon) => {
                    // The room may have closed while forging
                    if let Err(e) = state.rooms.publish(&room_code, None, ServerMsg::WeaponForged { weapon }) {
                        debug!(room = %room_code, error = %e, "Forged weapon dropped");
                    }
                }
                Err(e) => {
                    let _ = out_tx.send(ServerMsg::error("forge_failed", e.to_string())).await;
                }
            }
        });
    }

    fn leave_room(&mut self) {
        if let Some(seat) = self.seat.take() {
            seat.forwarder.abort();
            self.state.rooms.leave(&seat.room_code, self.id);
        }
    }
}

fn not_in_room() -> ServerMsg {
    let e = LobbyError::NotInRoom;
    ServerMsg::error(e.code(), e.to_string())
}

/// Room broadcast -> this connection's outbound queue, minus its own messages
fn spawn_forwarder(
    connection_id: Uuid,
    player_id: PlayerId,
    mut room_rx: broadcast::Receiver<RoomEnvelope>,
    out_tx: mpsc::Sender<ServerMsg>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match room_rx.recv().await {
                Ok(envelope) => {
                    if envelope.from == Some(player_id) {
                        continue;
                    }
                    if out_tx.send(envelope.msg).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(
                        connection_id = %connection_id,
                        lagged_count = n,
                        "Client lagged, skipping {} room messages", n
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(connection_id = %connection_id, "Room channel closed");
                    break;
                }
            }
        }
    })
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
