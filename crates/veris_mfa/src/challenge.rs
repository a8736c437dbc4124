use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rand::RngCore;
use veris_time::Clock;
use veris_types::address::AccountAddress;

use crate::errors::{MfaError, MfaResult};
use crate::factors::FactorType;

#[cfg(test)]
#[path = "challenge_test.rs"]
mod challenge_test;

/// How long a challenge stays answerable.
pub const DEFAULT_CHALLENGE_TTL: Duration = Duration::from_secs(300);
/// How many responses a challenge accepts before it is discarded.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// An outstanding second-factor challenge.
#[derive(Clone, Debug)]
pub struct MfaChallenge {
    pub challenge_id: String,
    pub address: AccountAddress,
    pub factor_type: FactorType,
    pub factor_id: String,
    /// The transaction category the challenge authorizes.
    pub tx_type: String,
    pub created_at: Instant,
    pub ttl: Duration,
    pub max_attempts: u32,
    pub attempts: u32,
}

impl MfaChallenge {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) >= self.ttl
    }
}

/// In-memory challenge table.
///
/// Challenges are consumed on successful verification and discarded on TTL
/// expiry or attempt exhaustion; a discarded challenge id never verifies.
#[derive(Debug)]
pub struct ChallengeStore {
    clock: Arc<dyn Clock>,
    ttl: Duration,
    max_attempts: u32,
    challenges: Mutex<HashMap<String, MfaChallenge>>,
}

impl ChallengeStore {
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration, max_attempts: u32) -> Self {
        Self { clock, ttl, max_attempts, challenges: Mutex::new(HashMap::new()) }
    }

    /// Persists a new challenge against the given factor.
    pub fn create(
        &self,
        address: AccountAddress,
        factor_type: FactorType,
        factor_id: String,
        tx_type: String,
    ) -> MfaChallenge {
        let challenge = MfaChallenge {
            challenge_id: new_challenge_id(),
            address,
            factor_type,
            factor_id,
            tx_type,
            created_at: self.clock.now(),
            ttl: self.ttl,
            max_attempts: self.max_attempts,
            attempts: 0,
        };
        let mut challenges = self.challenges.lock().expect("challenge store lock poisoned");
        challenges.insert(challenge.challenge_id.clone(), challenge.clone());
        challenge
    }

    /// Runs one verification attempt through `verify`.
    ///
    /// TTL is checked first; then the attempt is counted; `verify` decides
    /// whether the response matches. Success consumes the challenge.
    pub fn attempt(
        &self,
        challenge_id: &str,
        verify: impl FnOnce(&MfaChallenge) -> bool,
    ) -> MfaResult<MfaChallenge> {
        let now = self.clock.now();
        let mut challenges = self.challenges.lock().expect("challenge store lock poisoned");
        let challenge = challenges.get_mut(challenge_id).ok_or_else(|| {
            MfaError::ChallengeNotFound { challenge_id: challenge_id.to_owned() }
        })?;

        if challenge.is_expired(now) {
            challenges.remove(challenge_id);
            return Err(MfaError::ChallengeExpired { challenge_id: challenge_id.to_owned() });
        }
        if challenge.attempts >= challenge.max_attempts {
            let max_attempts = challenge.max_attempts;
            challenges.remove(challenge_id);
            return Err(MfaError::TooManyAttempts {
                challenge_id: challenge_id.to_owned(),
                max_attempts,
            });
        }

        challenge.attempts += 1;
        if verify(challenge) {
            let consumed = challenges.remove(challenge_id).expect("challenge present");
            Ok(consumed)
        } else {
            let factor_id = challenge.factor_id.clone();
            if challenge.attempts >= challenge.max_attempts {
                challenges.remove(challenge_id);
            }
            Err(MfaError::ProofRejected { factor_id })
        }
    }

    /// Drops every expired challenge; returns how many were reclaimed.
    pub fn prune_expired(&self) -> usize {
        let now = self.clock.now();
        let mut challenges = self.challenges.lock().expect("challenge store lock poisoned");
        let before = challenges.len();
        challenges.retain(|_, challenge| !challenge.is_expired(now));
        before - challenges.len()
    }

    /// Number of outstanding challenges.
    pub fn len(&self) -> usize {
        self.challenges.lock().expect("challenge store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn new_challenge_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
