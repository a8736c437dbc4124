use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};
use veris_config::dumping::{prepend_sub_config_name, ser_param, SerializeConfig};
use veris_config::{ParamPath, SerializedParam};

use crate::firewall::FirewallKind;

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

/// Noise transport knobs.
#[derive(Clone, Debug, Serialize, Deserialize, Validate, PartialEq)]
pub struct NoiseConfig {
    pub enabled: bool,
    pub handshake_timeout_secs: u64,
    /// Reject sessions whose remote static key is not in the trusted set.
    pub require_peer_auth: bool,
    pub allowed_cipher_suites: Vec<String>,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            handshake_timeout_secs: 10,
            require_peer_auth: false,
            allowed_cipher_suites: vec!["chacha20poly1305".to_owned()],
        }
    }
}

impl SerializeConfig for NoiseConfig {
    fn dump(&self) -> BTreeMap<ParamPath, SerializedParam> {
        BTreeMap::from_iter([
            ser_param("enabled", &self.enabled, "Whether transport encryption is enforced."),
            ser_param(
                "handshake_timeout_secs",
                &self.handshake_timeout_secs,
                "Wall-clock deadline of the two-message handshake.",
            ),
            ser_param(
                "require_peer_auth",
                &self.require_peer_auth,
                "Whether the remote static key must be pre-authorized.",
            ),
            ser_param(
                "allowed_cipher_suites",
                &self.allowed_cipher_suites,
                "AEAD suites accepted during negotiation.",
            ),
        ])
    }
}

/// Peer table limits and admission thresholds.
#[derive(Clone, Debug, Serialize, Deserialize, Validate, PartialEq)]
#[validate(schema(function = "validate_peer_config"))]
pub struct PeerConfig {
    pub enabled: bool,
    pub max_peers: usize,
    pub max_inbound: usize,
    pub max_outbound: usize,
    /// Peers whose score falls below this are refused on reconnect.
    pub peer_score_threshold: f64,
    pub trusted_peers: Vec<String>,
    pub banned_peers: Vec<String>,
    pub min_stake_for_trust: u128,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_peers: 50,
            max_inbound: 30,
            max_outbound: 20,
            peer_score_threshold: -50.0,
            trusted_peers: Vec::new(),
            banned_peers: Vec::new(),
            min_stake_for_trust: 0,
        }
    }
}

fn validate_peer_config(config: &PeerConfig) -> Result<(), ValidationError> {
    if !config.enabled {
        return Ok(());
    }
    if config.max_peers == 0 {
        return Err(ValidationError::new("max_peers must be positive"));
    }
    if config.max_inbound + config.max_outbound < config.max_peers {
        return Err(ValidationError::new(
            "direction limits must cover the total peer limit",
        ));
    }
    Ok(())
}

impl SerializeConfig for PeerConfig {
    fn dump(&self) -> BTreeMap<ParamPath, SerializedParam> {
        BTreeMap::from_iter([
            ser_param("enabled", &self.enabled, "Whether peer admission policy is enforced."),
            ser_param("max_peers", &self.max_peers, "Total connected peer limit."),
            ser_param("max_inbound", &self.max_inbound, "Inbound peer limit."),
            ser_param("max_outbound", &self.max_outbound, "Outbound peer limit."),
            ser_param(
                "peer_score_threshold",
                &self.peer_score_threshold,
                "Minimum reputation score for re-admission.",
            ),
            ser_param("trusted_peers", &self.trusted_peers, "Peer ids that always authenticate."),
            ser_param("banned_peers", &self.banned_peers, "Peer ids banned at startup."),
            ser_param(
                "min_stake_for_trust",
                &self.min_stake_for_trust,
                "Stake required before a peer may enter the trusted set.",
            ),
        ])
    }
}

/// Reputation weights and decay rates.
#[derive(Clone, Debug, Serialize, Deserialize, Validate, PartialEq)]
pub struct ScoreConfig {
    pub uptime_weight: f64,
    pub response_weight: f64,
    pub behavior_weight: f64,
    pub stake_weight: f64,
    /// Bonus granted to validators; a peer holds either 0 or exactly this.
    pub validator_bonus_max: f64,
    /// Hourly decay applied to positive components.
    pub decay_per_hour: f64,
    /// Hourly decay applied to penalties.
    pub penalty_decay_per_hour: f64,
    /// Misbehavior penalty that triggers an automatic ban.
    pub severe_misbehavior_threshold: f64,
    pub auto_ban_duration_secs: u64,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            uptime_weight: 0.2,
            response_weight: 0.2,
            behavior_weight: 0.3,
            stake_weight: 0.3,
            validator_bonus_max: 10.0,
            decay_per_hour: 0.01,
            penalty_decay_per_hour: 0.05,
            severe_misbehavior_threshold: 50.0,
            auto_ban_duration_secs: 3600,
        }
    }
}

impl SerializeConfig for ScoreConfig {
    fn dump(&self) -> BTreeMap<ParamPath, SerializedParam> {
        BTreeMap::from_iter([
            ser_param("uptime_weight", &self.uptime_weight, "Weight of the uptime component."),
            ser_param("response_weight", &self.response_weight, "Weight of the response component."),
            ser_param("behavior_weight", &self.behavior_weight, "Weight of the behavior component."),
            ser_param("stake_weight", &self.stake_weight, "Weight of the stake component."),
            ser_param(
                "validator_bonus_max",
                &self.validator_bonus_max,
                "Score bonus granted to validator peers.",
            ),
            ser_param("decay_per_hour", &self.decay_per_hour, "Hourly decay of positives."),
            ser_param(
                "penalty_decay_per_hour",
                &self.penalty_decay_per_hour,
                "Hourly decay of penalties.",
            ),
            ser_param(
                "severe_misbehavior_threshold",
                &self.severe_misbehavior_threshold,
                "Misbehavior penalty that triggers an automatic ban.",
            ),
            ser_param(
                "auto_ban_duration_secs",
                &self.auto_ban_duration_secs,
                "Duration of automatic misbehavior bans.",
            ),
        ])
    }
}

/// DDoS flood-detection thresholds.
#[derive(Clone, Debug, Serialize, Deserialize, Validate, PartialEq)]
pub struct DdosConfig {
    pub enabled: bool,
    pub max_connections_per_window: u64,
    pub max_messages_per_window: u64,
    pub window_secs: u64,
    pub ban_duration_secs: u64,
}

impl Default for DdosConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_connections_per_window: 500,
            max_messages_per_window: 10_000,
            window_secs: 60,
            ban_duration_secs: 900,
        }
    }
}

impl SerializeConfig for DdosConfig {
    fn dump(&self) -> BTreeMap<ParamPath, SerializedParam> {
        BTreeMap::from_iter([
            ser_param("enabled", &self.enabled, "Whether flood detection runs."),
            ser_param(
                "max_connections_per_window",
                &self.max_connections_per_window,
                "Global connection budget per detection window.",
            ),
            ser_param(
                "max_messages_per_window",
                &self.max_messages_per_window,
                "Global message budget per detection window.",
            ),
            ser_param("window_secs", &self.window_secs, "Width of the detection window."),
            ser_param(
                "ban_duration_secs",
                &self.ban_duration_secs,
                "How long a flooding address stays banned.",
            ),
        ])
    }
}

/// Sybil-attack caps.
#[derive(Clone, Debug, Serialize, Deserialize, Validate, PartialEq)]
pub struct SybilConfig {
    pub enabled: bool,
    /// Cap per /24 (IPv4) or /48 (IPv6).
    pub max_peers_per_subnet: usize,
    pub max_peers_per_asn: usize,
    pub min_stake: u128,
}

impl Default for SybilConfig {
    fn default() -> Self {
        Self { enabled: true, max_peers_per_subnet: 3, max_peers_per_asn: 8, min_stake: 0 }
    }
}

impl SerializeConfig for SybilConfig {
    fn dump(&self) -> BTreeMap<ParamPath, SerializedParam> {
        BTreeMap::from_iter([
            ser_param("enabled", &self.enabled, "Whether Sybil caps are enforced."),
            ser_param(
                "max_peers_per_subnet",
                &self.max_peers_per_subnet,
                "Peer cap per /24 (IPv4) or /48 (IPv6) subnet.",
            ),
            ser_param("max_peers_per_asn", &self.max_peers_per_asn, "Peer cap per origin ASN."),
            ser_param("min_stake", &self.min_stake, "Minimum stake demanded of new peers."),
        ])
    }
}

/// Eclipse-attack protections.
#[derive(Clone, Debug, Serialize, Deserialize, Validate, PartialEq)]
pub struct EclipseConfig {
    pub enabled: bool,
    /// Connection slots inbound peers may never occupy.
    pub outbound_only_slots: usize,
    pub rotation_interval_secs: u64,
    pub anchor_count: usize,
    pub seed_refresh_interval_secs: u64,
    /// Share of non-anchor peers replaced per rotation.
    pub random_selection_ratio: f64,
}

impl Default for EclipseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            outbound_only_slots: 8,
            rotation_interval_secs: 3600,
            anchor_count: 4,
            seed_refresh_interval_secs: 6 * 3600,
            random_selection_ratio: 0.25,
        }
    }
}

impl SerializeConfig for EclipseConfig {
    fn dump(&self) -> BTreeMap<ParamPath, SerializedParam> {
        BTreeMap::from_iter([
            ser_param("enabled", &self.enabled, "Whether eclipse protections run."),
            ser_param(
                "outbound_only_slots",
                &self.outbound_only_slots,
                "Connection slots reserved for outbound peers.",
            ),
            ser_param(
                "rotation_interval_secs",
                &self.rotation_interval_secs,
                "Interval between non-anchor peer rotations.",
            ),
            ser_param("anchor_count", &self.anchor_count, "Number of pinned anchor peers."),
            ser_param(
                "seed_refresh_interval_secs",
                &self.seed_refresh_interval_secs,
                "Interval between seed-node refreshes.",
            ),
            ser_param(
                "random_selection_ratio",
                &self.random_selection_ratio,
                "Share of non-anchor peers replaced per rotation.",
            ),
        ])
    }
}

/// Token-bucket limits at the network edge.
#[derive(Clone, Debug, Serialize, Deserialize, Validate, PartialEq)]
#[validate(schema(function = "validate_net_rate_limit_config"))]
pub struct NetRateLimitConfig {
    pub enabled: bool,
    pub connections_per_second: f64,
    pub connection_burst: f64,
    pub messages_per_second: f64,
    pub message_burst: f64,
    /// Per-IP bandwidth budget; 0 disables bandwidth limiting.
    pub bytes_per_second: f64,
    pub adaptive_enabled: bool,
    /// System load above which per-IP refill rates shrink.
    pub load_threshold: f64,
    pub idle_reclaim_secs: u64,
}

impl Default for NetRateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            connections_per_second: 20.0,
            connection_burst: 40.0,
            messages_per_second: 200.0,
            message_burst: 400.0,
            bytes_per_second: 1_048_576.0,
            adaptive_enabled: true,
            load_threshold: 0.8,
            idle_reclaim_secs: 600,
        }
    }
}

impl NetRateLimitConfig {
    /// Bytes one bandwidth token is worth.
    pub fn bytes_per_token(&self) -> f64 {
        self.bytes_per_second / self.messages_per_second
    }
}

fn validate_net_rate_limit_config(config: &NetRateLimitConfig) -> Result<(), ValidationError> {
    if !config.enabled {
        return Ok(());
    }
    if config.connections_per_second <= 0.0 || config.messages_per_second <= 0.0 {
        return Err(ValidationError::new("rates must be positive when enabled"));
    }
    // Bandwidth tokens are denominated in bytes-per-message, so the message
    // rate must be positive whenever bandwidth limiting is on.
    if config.bytes_per_second > 0.0 && config.messages_per_second <= 0.0 {
        return Err(ValidationError::new(
            "messages_per_second must be positive when bandwidth limiting is enabled",
        ));
    }
    if !(0.0..=1.0).contains(&config.load_threshold) {
        return Err(ValidationError::new("load_threshold must lie in [0, 1]"));
    }
    Ok(())
}

impl SerializeConfig for NetRateLimitConfig {
    fn dump(&self) -> BTreeMap<ParamPath, SerializedParam> {
        BTreeMap::from_iter([
            ser_param("enabled", &self.enabled, "Whether edge rate limiting runs."),
            ser_param(
                "connections_per_second",
                &self.connections_per_second,
                "Per-IP connection refill rate.",
            ),
            ser_param("connection_burst", &self.connection_burst, "Per-IP connection burst."),
            ser_param(
                "messages_per_second",
                &self.messages_per_second,
                "Per-IP message refill rate.",
            ),
            ser_param("message_burst", &self.message_burst, "Per-IP message burst."),
            ser_param(
                "bytes_per_second",
                &self.bytes_per_second,
                "Per-IP bandwidth budget; 0 disables bandwidth limiting.",
            ),
            ser_param(
                "adaptive_enabled",
                &self.adaptive_enabled,
                "Whether refill rates shrink under system load.",
            ),
            ser_param(
                "load_threshold",
                &self.load_threshold,
                "System load above which adaptive throttling engages.",
            ),
            ser_param(
                "idle_reclaim_secs",
                &self.idle_reclaim_secs,
                "Idle window after which per-IP buckets are reclaimed.",
            ),
        ])
    }
}

/// Firewall rendering knobs.
#[derive(Clone, Debug, Serialize, Deserialize, Validate, PartialEq)]
pub struct FirewallConfig {
    pub enabled: bool,
    pub firewall_type: FirewallKind,
    pub allowed_ports: Vec<u16>,
    pub default_deny: bool,
}

impl Default for FirewallConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            firewall_type: FirewallKind::Iptables,
            allowed_ports: vec![26656, 26657],
            default_deny: true,
        }
    }
}

impl SerializeConfig for FirewallConfig {
    fn dump(&self) -> BTreeMap<ParamPath, SerializedParam> {
        BTreeMap::from_iter([
            ser_param("enabled", &self.enabled, "Whether firewall rules are rendered."),
            ser_param("firewall_type", &self.firewall_type, "Target rule dialect."),
            ser_param("allowed_ports", &self.allowed_ports, "Publicly reachable ports."),
            ser_param("default_deny", &self.default_deny, "Whether a catch-all deny is appended."),
        ])
    }
}

/// Intrusion-detection reporting.
#[derive(Clone, Debug, Serialize, Deserialize, Validate, PartialEq)]
pub struct IdsConfig {
    pub enabled: bool,
    pub alert_level: String,
}

impl Default for IdsConfig {
    fn default() -> Self {
        Self { enabled: true, alert_level: "warn".to_owned() }
    }
}

impl SerializeConfig for IdsConfig {
    fn dump(&self) -> BTreeMap<ParamPath, SerializedParam> {
        BTreeMap::from_iter([
            ser_param("enabled", &self.enabled, "Whether IDS alerts are emitted."),
            ser_param("alert_level", &self.alert_level, "Minimum severity forwarded to the IDS."),
        ])
    }
}

/// The whole network-security surface.
#[derive(Clone, Debug, Serialize, Deserialize, Validate, PartialEq)]
pub struct NetworkSecurityConfig {
    #[validate(nested)]
    pub noise: NoiseConfig,
    #[validate(nested)]
    pub peer: PeerConfig,
    #[validate(nested)]
    pub score: ScoreConfig,
    #[validate(nested)]
    pub ddos: DdosConfig,
    #[validate(nested)]
    pub sybil: SybilConfig,
    #[validate(nested)]
    pub eclipse: EclipseConfig,
    #[validate(nested)]
    pub rate_limit: NetRateLimitConfig,
    #[validate(nested)]
    pub firewall: FirewallConfig,
    #[validate(nested)]
    pub ids: IdsConfig,
    pub maintenance_interval_secs: u64,
}

impl Default for NetworkSecurityConfig {
    fn default() -> Self {
        Self {
            noise: NoiseConfig::default(),
            peer: PeerConfig::default(),
            score: ScoreConfig::default(),
            ddos: DdosConfig::default(),
            sybil: SybilConfig::default(),
            eclipse: EclipseConfig::default(),
            rate_limit: NetRateLimitConfig::default(),
            firewall: FirewallConfig::default(),
            ids: IdsConfig::default(),
            maintenance_interval_secs: 30,
        }
    }
}

impl SerializeConfig for NetworkSecurityConfig {
    fn dump(&self) -> BTreeMap<ParamPath, SerializedParam> {
        let mut dump = BTreeMap::from_iter([ser_param(
            "maintenance_interval_secs",
            &self.maintenance_interval_secs,
            "Tick of the background maintenance task.",
        )]);
        dump.extend(prepend_sub_config_name(self.noise.dump(), "noise"));
        dump.extend(prepend_sub_config_name(self.peer.dump(), "peer"));
        dump.extend(prepend_sub_config_name(self.score.dump(), "score"));
        dump.extend(prepend_sub_config_name(self.ddos.dump(), "ddos"));
        dump.extend(prepend_sub_config_name(self.sybil.dump(), "sybil"));
        dump.extend(prepend_sub_config_name(self.eclipse.dump(), "eclipse"));
        dump.extend(prepend_sub_config_name(self.rate_limit.dump(), "rate_limit"));
        dump.extend(prepend_sub_config_name(self.firewall.dump(), "firewall"));
        dump.extend(prepend_sub_config_name(self.ids.dump(), "ids"));
        dump
    }
}
