//! Local simulation loop: fixed-rate ticks, input mailbox, round phases

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::util::time::{Timer, SIMULATION_TPS};

use super::events::GameEvent;
use super::geometry::{Rect, SharedPlatforms};
use super::player::Intent;
use super::r#match::MatchController;
use super::round::{self, ForgeGate, ForgeGateStatus, RoundClock, RoundOutcome};
use super::snapshot::{PlayerSnapshot, SnapshotBuilder};
use super::weapon::{ForgedWeapon, WeaponMode};
use super::PlayerId;

const INPUT_CAPACITY: usize = 256;
const OUTPUT_CAPACITY: usize = 64;

/// Round pacing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    pub round_seconds: f32,
    pub intermission_secs: f32,
    pub forge_timeout_secs: f32,
    /// Stop after this many rounds; `None` plays until shut down
    pub max_rounds: Option<u32>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            round_seconds: 180.0,
            intermission_secs: 3.0,
            forge_timeout_secs: 20.0,
            max_rounds: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Waiting for forged weapons before the first round
    Forging,
    InProgress,
    /// Pause between rounds
    Intermission,
    Ended,
}

/// Mailbox entries, applied strictly between ticks
#[derive(Debug, Clone)]
pub enum SessionInput {
    Intent { player_id: PlayerId, intent: Intent },
    Forged(ForgedWeapon),
    RemoteState(PlayerSnapshot),
    EndRound,
    Shutdown,
}

/// Published to every subscriber
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionMsg {
    Snapshot {
        tick: u64,
        round: u32,
        time_remaining: f32,
        players: Vec<PlayerSnapshot>,
    },
    Events {
        tick: u64,
        events: Vec<GameEvent>,
    },
    PhaseChanged {
        phase: SessionPhase,
        round: u32,
    },
    RoundOver {
        round: u32,
        outcome: RoundOutcome,
        scores: Vec<(PlayerId, u32)>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session closed")]
    Closed,

    #[error("Session input queue full")]
    Busy,
}

/// Cloneable handle to a running session
#[derive(Clone)]
pub struct SessionHandle {
    input_tx: mpsc::Sender<SessionInput>,
    output_tx: broadcast::Sender<SessionMsg>,
    platforms: SharedPlatforms,
}

impl SessionHandle {
    pub async fn send(&self, input: SessionInput) -> Result<(), SessionError> {
        self.input_tx
            .send(input)
            .await
            .map_err(|_| SessionError::Closed)
    }

    pub fn try_send(&self, input: SessionInput) -> Result<(), SessionError> {
        self.input_tx.try_send(input).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SessionError::Busy,
            mpsc::error::TrySendError::Closed(_) => SessionError::Closed,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionMsg> {
        self.output_tx.subscribe()
    }

    /// Swap the arena layout; takes effect on the next tick
    pub fn replace_platforms(&self, platforms: Vec<Rect>) {
        self.platforms.replace(platforms);
    }
}

/// Drives a `MatchController` through forging, rounds and intermissions
pub struct GameSession {
    controller: MatchController,
    settings: SessionSettings,
    phase: SessionPhase,
    clock: RoundClock,
    gate: ForgeGate,
    intermission_remaining: f32,
    /// Projectiles forged before the first round, launched once it starts
    held: Vec<ForgedWeapon>,
    tick: u64,
    input_rx: mpsc::Receiver<SessionInput>,
    output_tx: broadcast::Sender<SessionMsg>,
    platforms: SharedPlatforms,
    snapshot_builder: SnapshotBuilder,
}

impl GameSession {
    pub fn new(
        controller: MatchController,
        settings: SessionSettings,
        platforms: SharedPlatforms,
    ) -> (Self, SessionHandle) {
        let (input_tx, input_rx) = mpsc::channel(INPUT_CAPACITY);
        let (output_tx, _) = broadcast::channel(OUTPUT_CAPACITY);

        let handle = SessionHandle {
            input_tx,
            output_tx: output_tx.clone(),
            platforms: platforms.clone(),
        };

        let gate = ForgeGate::new(
            controller.players().iter().map(|p| p.player_id),
            settings.forge_timeout_secs,
        );
        let session = Self {
            clock: RoundClock::new(settings.round_seconds),
            gate,
            controller,
            settings,
            phase: SessionPhase::Forging,
            intermission_remaining: 0.0,
            held: Vec::new(),
            tick: 0,
            input_rx,
            output_tx,
            platforms,
            snapshot_builder: SnapshotBuilder::default(),
        };

        (session, handle)
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn controller(&self) -> &MatchController {
        &self.controller
    }

    pub fn time_remaining(&self) -> f32 {
        self.clock.time_remaining()
    }

    /// Run the tick loop until shut down, all handles dropped, or the last round ends
    pub async fn run(mut self) -> MatchController {
        info!(players = self.controller.players().len(), "Session started");

        let tick_duration = Duration::from_micros(1_000_000 / SIMULATION_TPS as u64);
        let mut tick_interval = interval(tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut timer = Timer::new();

        loop {
            tick_interval.tick().await;

            if !self.process_inputs() {
                info!("Session shutting down");
                break;
            }

            let dt = timer.lap_secs();
            self.step(dt);

            if self.phase == SessionPhase::Ended {
                info!(rounds = self.controller.round_number() - 1, "Session ended");
                break;
            }
        }

        self.controller
    }

    /// Drain the mailbox. Returns false once the session should stop.
    fn process_inputs(&mut self) -> bool {
        loop {
            match self.input_rx.try_recv() {
                Ok(input) => {
                    if !self.handle_input(input) {
                        return false;
                    }
                }
                Err(mpsc::error::TryRecvError::Empty) => return true,
                Err(mpsc::error::TryRecvError::Disconnected) => return false,
            }
        }
    }

    fn handle_input(&mut self, input: SessionInput) -> bool {
        match input {
            SessionInput::Intent { player_id, intent } => {
                if self.phase == SessionPhase::InProgress {
                    self.controller.apply_intent(player_id, intent);
                }
            }
            SessionInput::Forged(forged) => {
                self.gate.mark_forged(forged.owner_id);
                let launches = self.controller.settings().weapon_mode == WeaponMode::Projectile;
                if launches && self.phase != SessionPhase::InProgress {
                    debug!(owner_id = forged.owner_id, "Holding projectile until round start");
                    self.held.push(forged);
                } else {
                    self.controller.deliver_weapon(forged);
                }
            }
            SessionInput::RemoteState(snapshot) => {
                self.controller.apply_remote_state(&snapshot);
            }
            SessionInput::EndRound => {
                if self.phase == SessionPhase::InProgress {
                    self.finish_round(RoundOutcome::Called);
                }
            }
            SessionInput::Shutdown => return false,
        }
        true
    }

    /// Advance one tick of `dt` seconds and publish what happened
    pub fn step(&mut self, dt: f32) {
        self.tick += 1;

        match self.phase {
            SessionPhase::Forging => {
                self.gate.tick(dt);
                match self.gate.status() {
                    ForgeGateStatus::Waiting => {}
                    ForgeGateStatus::AllForged => self.begin_round(),
                    ForgeGateStatus::TimedOut { missing } => {
                        warn!(missing = ?missing, "Forge wait timed out, starting unarmed");
                        self.begin_round();
                    }
                }
            }
            SessionPhase::InProgress => {
                let platforms = self.platforms.snapshot();
                self.controller.update(dt, &platforms);
                self.clock.tick(dt);
                let rule = self.controller.settings().round_rule;
                if let Some(outcome) = round::evaluate(&self.controller, &self.clock, rule) {
                    self.finish_round(outcome);
                }
            }
            SessionPhase::Intermission => {
                self.intermission_remaining -= dt;
                if self.intermission_remaining <= 0.0 {
                    self.begin_round();
                }
            }
            SessionPhase::Ended => {}
        }

        self.publish();
    }

    fn begin_round(&mut self) {
        self.clock.reset();
        self.controller.start_round();
        for forged in std::mem::take(&mut self.held) {
            self.controller.deliver_weapon(forged);
        }
        self.set_phase(SessionPhase::InProgress);
        self.snapshot_builder.force_next();
    }

    fn finish_round(&mut self, outcome: RoundOutcome) {
        let round = self.controller.round_number();
        self.controller.end_round();

        let mut scores: Vec<(PlayerId, u32)> = self
            .controller
            .scores()
            .iter()
            .map(|(id, score)| (*id, *score))
            .collect();
        scores.sort_unstable();

        info!(round, outcome = ?outcome, "Round over");
        let _ = self.output_tx.send(SessionMsg::RoundOver {
            round,
            outcome,
            scores,
        });

        let last_round = self.settings.max_rounds.is_some_and(|max| round >= max);
        if last_round {
            self.set_phase(SessionPhase::Ended);
        } else {
            self.intermission_remaining = self.settings.intermission_secs;
            self.set_phase(SessionPhase::Intermission);
        }
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        self.phase = phase;
        debug!(phase = ?phase, round = self.controller.round_number(), "Phase changed");
        let _ = self.output_tx.send(SessionMsg::PhaseChanged {
            phase,
            round: self.controller.round_number(),
        });
    }

    fn publish(&mut self) {
        let events = self.controller.drain_events();
        if !events.is_empty() {
            let _ = self.output_tx.send(SessionMsg::Events {
                tick: self.tick,
                events,
            });
        }

        if self.phase == SessionPhase::InProgress && self.snapshot_builder.should_send() {
            let _ = self.output_tx.send(SessionMsg::Snapshot {
                tick: self.tick,
                round: self.controller.round_number(),
                time_remaining: self.clock.time_remaining(),
                players: self.snapshot_builder.build(self.controller.players()),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::r#match::MatchSettings;
    use crate::game::round::RoundRule;
    use crate::game::weapon::WeaponDescriptor;

    const DT: f32 = 1.0 / 60.0;

    fn session(match_settings: MatchSettings, settings: SessionSettings) -> (GameSession, SessionHandle) {
        let mut controller = MatchController::new(match_settings);
        for id in 0..2 {
            let player = controller.create_player(id, [10, 200, 10]);
            controller.add_player(player);
        }
        GameSession::new(controller, settings, SharedPlatforms::default())
    }

    fn forged(owner_id: PlayerId) -> SessionInput {
        SessionInput::Forged(ForgedWeapon {
            owner_id,
            descriptor: WeaponDescriptor::named("Spark").speed(0.0),
        })
    }

    fn drain(rx: &mut broadcast::Receiver<SessionMsg>) -> Vec<SessionMsg> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[test]
    fn forge_wait_times_out_into_first_round() {
        let (mut s, _handle) = session(MatchSettings::default(), SessionSettings::default());
        for _ in 0..19 {
            s.step(1.0);
            assert_eq!(s.phase(), SessionPhase::Forging);
        }
        s.step(1.0);
        assert_eq!(s.phase(), SessionPhase::InProgress);
        assert!(s.controller().is_round_active());
        assert!(s.controller().players().iter().all(|p| p.equipped.is_none()));
    }

    #[test]
    fn held_projectiles_launch_at_round_start() {
        let (mut s, handle) = session(MatchSettings::default(), SessionSettings::default());
        handle.try_send(forged(0)).unwrap();
        handle.try_send(forged(1)).unwrap();
        assert!(s.process_inputs());
        assert!(s.controller().weapons().is_empty());

        s.step(DT);
        assert_eq!(s.phase(), SessionPhase::InProgress);
        assert_eq!(s.controller().weapons().len(), 2);
    }

    #[test]
    fn time_up_then_intermission_then_next_round() {
        let settings = SessionSettings {
            round_seconds: 1.0,
            forge_timeout_secs: 0.0,
            ..SessionSettings::default()
        };
        let (mut s, handle) = session(MatchSettings::default(), settings);
        let mut rx = handle.subscribe();

        s.step(DT);
        assert_eq!(s.phase(), SessionPhase::InProgress);
        for _ in 0..61 {
            s.step(DT);
        }
        assert_eq!(s.phase(), SessionPhase::Intermission);

        let msgs = drain(&mut rx);
        assert!(msgs.iter().any(|m| matches!(
            m,
            SessionMsg::RoundOver { round: 1, outcome: RoundOutcome::TimeUp, scores }
                if scores == &vec![(0, 1), (1, 1)]
        )));
        assert!(msgs.iter().any(|m| matches!(m, SessionMsg::Snapshot { .. })));

        for _ in 0..181 {
            s.step(DT);
        }
        assert_eq!(s.phase(), SessionPhase::InProgress);
        assert_eq!(s.controller().round_number(), 2);
    }

    #[test]
    fn elimination_ends_round_and_session() {
        let match_settings = MatchSettings {
            round_rule: RoundRule::Elimination,
            ..MatchSettings::default()
        };
        let settings = SessionSettings {
            forge_timeout_secs: 0.0,
            max_rounds: Some(1),
            ..SessionSettings::default()
        };
        let (mut s, handle) = session(match_settings, settings);
        let mut rx = handle.subscribe();
        s.step(DT);

        s.controller.player_mut(1).unwrap().invuln_timer = 0.0;
        s.controller.player_mut(1).unwrap().take_damage(500, 0.0, 0.0);
        s.step(DT);

        assert_eq!(s.phase(), SessionPhase::Ended);
        assert_eq!(s.controller().score(0), 1);
        assert_eq!(s.controller().score(1), 0);
        assert!(drain(&mut rx).iter().any(|m| matches!(
            m,
            SessionMsg::RoundOver {
                outcome: RoundOutcome::Elimination { survivor: Some(0) },
                ..
            }
        )));
    }

    #[test]
    fn intents_only_apply_during_rounds() {
        let (mut s, handle) = session(MatchSettings::default(), SessionSettings::default());
        handle
            .try_send(SessionInput::Intent {
                player_id: 0,
                intent: Intent::Move { direction: 1 },
            })
            .unwrap();
        s.process_inputs();
        assert_eq!(s.controller().player(0).unwrap().vx, 0.0);
    }

    #[test]
    fn end_round_input_stops_the_clock() {
        let settings = SessionSettings {
            forge_timeout_secs: 0.0,
            ..SessionSettings::default()
        };
        let (mut s, handle) = session(MatchSettings::default(), settings);
        s.step(DT);
        handle.try_send(SessionInput::EndRound).unwrap();
        s.process_inputs();
        assert_eq!(s.phase(), SessionPhase::Intermission);
        assert!(!s.controller().is_round_active());
    }

    #[test]
    fn platform_swap_reaches_the_next_tick() {
        let settings = SessionSettings {
            forge_timeout_secs: 0.0,
            ..SessionSettings::default()
        };
        let (mut s, handle) = session(MatchSettings::default(), settings);
        s.step(DT);
        handle.replace_platforms(vec![Rect::new(0.0, 470.0, 1280.0, 40.0)]);
        for _ in 0..120 {
            s.step(DT);
        }
        let p = s.controller().player(1).unwrap();
        assert!(p.on_ground);
        assert_eq!(p.rect.bottom(), 470.0);
    }

    #[tokio::test]
    async fn shutdown_stops_the_loop() {
        let (s, handle) = session(MatchSettings::default(), SessionSettings::default());
        let task = tokio::spawn(s.run());
        handle.send(SessionInput::Shutdown).await.unwrap();

        let controller = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("session did not stop")
            .unwrap();
        assert_eq!(controller.players().len(), 2);
    }

    #[tokio::test]
    async fn dropping_every_handle_stops_the_loop() {
        let (s, handle) = session(MatchSettings::default(), SessionSettings::default());
        let task = tokio::spawn(s.run());
        drop(handle);
        assert!(tokio::time::timeout(Duration::from_secs(2), task).await.is_ok());
    }
}
