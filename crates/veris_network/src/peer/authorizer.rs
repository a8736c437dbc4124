use std::sync::Arc;

use crate::config::PeerConfig;
use crate::errors::PeerError;
use crate::peer::registry::PeerRegistry;
use crate::peer::scorer::PeerScorer;
use crate::peer::PeerInfo;

#[cfg(test)]
#[path = "authorizer_test.rs"]
mod authorizer_test;

/// Second gate of the peer lifecycle: capacity and reputation.
pub struct PeerAuthorizer {
    config: PeerConfig,
    registry: Arc<PeerRegistry>,
    scorer: Arc<PeerScorer>,
}

impl PeerAuthorizer {
    pub fn new(config: PeerConfig, registry: Arc<PeerRegistry>, scorer: Arc<PeerScorer>) -> Self {
        Self { config, registry, scorer }
    }

    /// Checks the total and direction-specific limits, then the score
    /// threshold for peers with a history.
    pub fn authorize(&self, info: &PeerInfo) -> Result<(), PeerError> {
        if !self.config.enabled {
            return Ok(());
        }

        let total = self.registry.count();
        if total >= self.config.max_peers {
            return Err(PeerError::TooManyPeers { current: total, max: self.config.max_peers });
        }

        if info.is_inbound {
            let inbound = self.registry.inbound_count();
            if inbound >= self.config.max_inbound {
                return Err(PeerError::TooManyInbound {
                    current: inbound,
                    max: self.config.max_inbound,
                });
            }
        } else {
            let outbound = self.registry.outbound_count();
            if outbound >= self.config.max_outbound {
                return Err(PeerError::TooManyOutbound {
                    current: outbound,
                    max: self.config.max_outbound,
                });
            }
        }

        // First-time peers have no record; only history can disqualify.
        if let Some(total_score) = self.scorer.total(&info.peer_id) {
            if total_score < self.config.peer_score_threshold {
                return Err(PeerError::ScoreBelowThreshold {
                    peer_id: info.peer_id.clone(),
                    score: total_score.round() as i64,
                    threshold: self.config.peer_score_threshold.round() as i64,
                });
            }
        }
        Ok(())
    }
}
