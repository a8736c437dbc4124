use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use tracing::debug;
use veris_time::Clock;

use crate::config::ScoreConfig;
use crate::peer::PeerId;

#[cfg(test)]
#[path = "scorer_test.rs"]
mod scorer_test;

/// One peer's reputation record.
///
/// Invariant: `total` equals the weighted sum of the positive components plus
/// the validator bonus minus the penalties; all components are non-negative;
/// the validator bonus is 0 or exactly the configured maximum.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PeerScore {
    pub uptime: f64,
    pub response: f64,
    pub behavior: f64,
    pub stake: f64,
    pub validator_bonus: f64,
    pub disconnection_penalty: f64,
    pub misbehavior_penalty: f64,
    pub rate_limit_penalty: f64,
    pub total: f64,
}

impl PeerScore {
    fn recompute(&mut self, config: &ScoreConfig) {
        self.total = self.uptime * config.uptime_weight
            + self.response * config.response_weight
            + self.behavior * config.behavior_weight
            + self.stake * config.stake_weight
            + self.validator_bonus
            - self.disconnection_penalty
            - self.misbehavior_penalty
            - self.rate_limit_penalty;
    }
}

struct ScoreRecord {
    score: PeerScore,
    last_updated: Instant,
}

/// Reputation bookkeeping over all known peers. Scores persist across
/// reconnects until the record is explicitly removed.
pub struct PeerScorer {
    config: ScoreConfig,
    clock: Arc<dyn Clock>,
    scores: RwLock<HashMap<PeerId, ScoreRecord>>,
}

impl PeerScorer {
    pub fn new(config: ScoreConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock, scores: RwLock::new(HashMap::new()) }
    }

    /// Creates or refreshes a peer's record at connection time.
    pub fn init_peer(&self, peer_id: PeerId, stake: u128, is_validator: bool) {
        let mut scores = self.scores.write().expect("score table lock poisoned");
        let record = scores.entry(peer_id).or_insert_with(|| ScoreRecord {
            score: PeerScore::default(),
            last_updated: self.clock.now(),
        });
        // log10 keeps whale stakes from dwarfing every other component.
        record.score.stake = if stake == 0 { 0.0 } else { (stake as f64).log10() };
        record.score.validator_bonus =
            if is_validator { self.config.validator_bonus_max } else { 0.0 };
        record.score.recompute(&self.config);
    }

    pub fn record_uptime(&self, peer_id: &PeerId, amount: f64) {
        self.update(peer_id, |score| score.uptime += amount);
    }

    pub fn record_response(&self, peer_id: &PeerId, amount: f64) {
        self.update(peer_id, |score| score.response += amount);
    }

    pub fn record_good_behavior(&self, peer_id: &PeerId, amount: f64) {
        self.update(peer_id, |score| score.behavior += amount);
    }

    /// Raises the misbehavior penalty; returns true when the peer crossed the
    /// severe threshold and should be banned.
    pub fn record_misbehavior(&self, peer_id: &PeerId, severity: f64) -> bool {
        let mut crossed = false;
        self.update(peer_id, |score| {
            score.misbehavior_penalty += severity;
        });
        if let Some(score) = self.score_record(peer_id) {
            crossed = score.misbehavior_penalty >= self.config.severe_misbehavior_threshold;
        }
        if crossed {
            debug!(%peer_id, "misbehavior crossed the severe threshold");
        }
        crossed
    }

    pub fn record_disconnection(&self, peer_id: &PeerId, penalty: f64) {
        self.update(peer_id, |score| score.disconnection_penalty += penalty);
    }

    pub fn record_rate_limit_violation(&self, peer_id: &PeerId, penalty: f64) {
        self.update(peer_id, |score| score.rate_limit_penalty += penalty);
    }

    /// Applies `elapsed_hours` of decay: positive components shrink at the
    /// positive rate, penalties at the penalty rate. Nothing goes negative;
    /// the validator bonus is exempt from decay.
    pub fn apply_decay(&self, elapsed_hours: f64) {
        let positive_factor = (1.0 - self.config.decay_per_hour * elapsed_hours).max(0.0);
        let penalty_factor = (1.0 - self.config.penalty_decay_per_hour * elapsed_hours).max(0.0);
        let now = self.clock.now();

        let mut scores = self.scores.write().expect("score table lock poisoned");
        for record in scores.values_mut() {
            let score = &mut record.score;
            score.uptime *= positive_factor;
            score.response *= positive_factor;
            score.behavior *= positive_factor;
            score.stake *= positive_factor;
            score.disconnection_penalty *= penalty_factor;
            score.misbehavior_penalty *= penalty_factor;
            score.rate_limit_penalty *= penalty_factor;
            score.recompute(&self.config);
            record.last_updated = now;
        }
    }

    /// The peer's current total, when a record exists.
    pub fn total(&self, peer_id: &PeerId) -> Option<f64> {
        self.score_record(peer_id).map(|score| score.total)
    }

    /// A snapshot of the full score record.
    pub fn score_record(&self, peer_id: &PeerId) -> Option<PeerScore> {
        self.scores.read().expect("score table lock poisoned").get(peer_id).map(|r| r.score.clone())
    }

    pub fn remove(&self, peer_id: &PeerId) {
        self.scores.write().expect("score table lock poisoned").remove(peer_id);
    }

    pub fn auto_ban_duration_secs(&self) -> u64 {
        self.config.auto_ban_duration_secs
    }

    fn update(&self, peer_id: &PeerId, mutate: impl FnOnce(&mut PeerScore)) {
        let mut scores = self.scores.write().expect("score table lock poisoned");
        let record = scores.entry(peer_id.clone()).or_insert_with(|| ScoreRecord {
            score: PeerScore::default(),
            last_updated: self.clock.now(),
        });
        mutate(&mut record.score);
        record.score.recompute(&self.config);
        record.last_updated = self.clock.now();
    }
}
