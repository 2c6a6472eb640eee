//! Round timing, outcome evaluation and the pre-round forge wait

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::r#match::MatchController;
use super::PlayerId;

/// How a round may end besides the clock running out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundRule {
    /// Only the timer ends the round; the dead respawn
    #[default]
    Timed,
    /// The round also ends when at most one player is left standing
    Elimination,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RoundOutcome {
    TimeUp,
    Elimination { survivor: Option<PlayerId> },
    /// Ended from outside the loop
    Called,
}

/// Countdown owned by the timer/UI side of the loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundClock {
    duration: f32,
    remaining: f32,
}

impl RoundClock {
    pub fn new(duration: f32) -> Self {
        Self {
            duration,
            remaining: duration,
        }
    }

    pub fn tick(&mut self, dt: f32) {
        self.remaining = (self.remaining - dt).max(0.0);
    }

    pub fn time_remaining(&self) -> f32 {
        self.remaining
    }

    pub fn expired(&self) -> bool {
        self.remaining <= 0.0
    }

    pub fn reset(&mut self) {
        self.remaining = self.duration;
    }
}

/// Decide whether the active round is over
pub fn evaluate(
    controller: &MatchController,
    clock: &RoundClock,
    rule: RoundRule,
) -> Option<RoundOutcome> {
    if !controller.is_round_active() {
        return None;
    }
    if clock.expired() {
        return Some(RoundOutcome::TimeUp);
    }

    match rule {
        RoundRule::Timed => None,
        RoundRule::Elimination => {
            if controller.players().len() < 2 {
                return None;
            }
            let mut alive = controller.players().iter().filter(|p| p.alive);
            match (alive.next(), alive.next()) {
                (None, _) => Some(RoundOutcome::Elimination { survivor: None }),
                (Some(last), None) => Some(RoundOutcome::Elimination {
                    survivor: Some(last.player_id),
                }),
                _ => None,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForgeGateStatus {
    Waiting,
    AllForged,
    /// Deadline passed; the listed players fight unarmed
    TimedOut { missing: Vec<PlayerId> },
}

/// Bounded wait for every player to forge a weapon before the first round
#[derive(Debug, Clone)]
pub struct ForgeGate {
    pending: BTreeSet<PlayerId>,
    timeout: f32,
    elapsed: f32,
}

impl ForgeGate {
    pub fn new(players: impl IntoIterator<Item = PlayerId>, timeout: f32) -> Self {
        Self {
            pending: players.into_iter().collect(),
            timeout,
            elapsed: 0.0,
        }
    }

    pub fn mark_forged(&mut self, player_id: PlayerId) {
        self.pending.remove(&player_id);
    }

    pub fn tick(&mut self, dt: f32) {
        self.elapsed += dt;
    }

    pub fn time_remaining(&self) -> f32 {
        (self.timeout - self.elapsed).max(0.0)
    }

    pub fn status(&self) -> ForgeGateStatus {
        if self.pending.is_empty() {
            ForgeGateStatus::AllForged
        } else if self.elapsed >= self.timeout {
            ForgeGateStatus::TimedOut {
                missing: self.pending.iter().copied().collect(),
            }
        } else {
            ForgeGateStatus::Waiting
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::r#match::MatchSettings;

    fn controller_with(n: i32) -> MatchController {
        let mut controller = MatchController::new(MatchSettings::default());
        for id in 0..n {
            let player = controller.create_player(id, [255, 255, 255]);
            controller.add_player(player);
        }
        controller.start_round();
        controller
    }

    #[test]
    fn clock_counts_down_to_zero() {
        let mut clock = RoundClock::new(1.0);
        clock.tick(0.4);
        assert!((clock.time_remaining() - 0.6).abs() < 1e-6);
        clock.tick(5.0);
        assert_eq!(clock.time_remaining(), 0.0);
        assert!(clock.expired());
        clock.reset();
        assert_eq!(clock.time_remaining(), 1.0);
    }

    #[test]
    fn time_up_ends_any_rule() {
        let controller = controller_with(2);
        let mut clock = RoundClock::new(1.0);
        assert_eq!(evaluate(&controller, &clock, RoundRule::Timed), None);
        clock.tick(1.0);
        assert_eq!(
            evaluate(&controller, &clock, RoundRule::Timed),
            Some(RoundOutcome::TimeUp)
        );
    }

    #[test]
    fn elimination_names_the_survivor() {
        let mut controller = controller_with(3);
        let clock = RoundClock::new(60.0);
        controller.player_mut(0).unwrap().die();
        assert_eq!(evaluate(&controller, &clock, RoundRule::Elimination), None);

        controller.player_mut(2).unwrap().die();
        assert_eq!(
            evaluate(&controller, &clock, RoundRule::Elimination),
            Some(RoundOutcome::Elimination { survivor: Some(1) })
        );
        assert_eq!(evaluate(&controller, &clock, RoundRule::Timed), None);
    }

    #[test]
    fn inactive_round_has_no_outcome() {
        let mut controller = controller_with(2);
        controller.end_round();
        let mut clock = RoundClock::new(1.0);
        clock.tick(2.0);
        assert_eq!(evaluate(&controller, &clock, RoundRule::Timed), None);
    }

    #[test]
    fn forge_gate_opens_when_everyone_forged() {
        let mut gate = ForgeGate::new([0, 1], 20.0);
        assert_eq!(gate.status(), ForgeGateStatus::Waiting);
        gate.mark_forged(0);
        gate.mark_forged(1);
        assert_eq!(gate.status(), ForgeGateStatus::AllForged);
    }

    #[test]
    fn forge_gate_times_out() {
        let mut gate = ForgeGate::new([0, 1], 20.0);
        gate.mark_forged(1);
        gate.tick(19.0);
        assert_eq!(gate.status(), ForgeGateStatus::Waiting);
        gate.tick(1.0);
        assert_eq!(gate.status(), ForgeGateStatus::TimedOut { missing: vec![0] });
    }
}
