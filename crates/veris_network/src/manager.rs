use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use veris_time::Clock;

use crate::config::NetworkSecurityConfig;
use crate::ddos::{DdosProtector, IntrusionSink, LogIntrusionSink};
use crate::errors::{NetworkError, NetworkResult, PeerError};
use crate::firewall::{self, FirewallPolicy, IpRule};
use crate::metrics::{
    register_metrics,
    RejectReason,
    NETWORK_ACTIVE_PEERS,
    NETWORK_CONNECTIONS_ACCEPTED,
    NETWORK_CONNECTIONS_REJECTED,
    NETWORK_HANDSHAKE_FAILURES,
    NETWORK_MESSAGES_THROTTLED,
    NETWORK_PEERS_BANNED,
};
use crate::noise::{self, NoiseSession, StaticKeypair};
use crate::peer::{
    EclipseGuard,
    PeerAuthenticator,
    PeerAuthorizer,
    PeerId,
    PeerInfo,
    PeerRegistry,
    PeerScorer,
    SybilGuard,
};
use crate::ratelimit::NetRateLimiter;

#[cfg(test)]
#[path = "manager_test.rs"]
mod manager_test;

/// Penalty applied when a peer trips the message rate limiter.
const RATE_LIMIT_PENALTY: f64 = 1.0;
/// Penalty applied on disconnect.
const DISCONNECT_PENALTY: f64 = 0.5;

/// The facade over the whole network-defense layer.
///
/// Connection admission runs rate limiting and flood detection first, then
/// transport encryption, then the peer gates in order: authenticate,
/// authorize, Sybil, Eclipse. Registration inserts the peer into every
/// relevant table; disconnection removes it from each.
pub struct NetworkSecurityManager {
    config: NetworkSecurityConfig,
    clock: Arc<dyn Clock>,
    static_keypair: StaticKeypair,
    registry: Arc<PeerRegistry>,
    authenticator: Arc<PeerAuthenticator>,
    authorizer: PeerAuthorizer,
    scorer: Arc<PeerScorer>,
    sybil: SybilGuard,
    eclipse: EclipseGuard,
    rate_limiter: NetRateLimiter,
    ddos: DdosProtector,
    firewall_policy: RwLock<FirewallPolicy>,
    trusted_transport_keys: RwLock<std::collections::HashSet<[u8; 32]>>,
    last_decay: Mutex<Instant>,
}

impl NetworkSecurityManager {
    pub fn new(config: NetworkSecurityConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_intrusion_sink(config, clock, Arc::new(LogIntrusionSink))
    }

    pub fn with_intrusion_sink(
        config: NetworkSecurityConfig,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IntrusionSink>,
    ) -> Self {
        register_metrics();
        let registry = Arc::new(PeerRegistry::new(clock.clone()));
        let scorer = Arc::new(PeerScorer::new(config.score.clone(), clock.clone()));
        let authenticator = Arc::new(PeerAuthenticator::new(clock.clone()).with_seeds(
            config.peer.trusted_peers.iter().map(|id| PeerId::from(id.as_str())),
            config.peer.banned_peers.iter().map(|id| PeerId::from(id.as_str())),
            Duration::from_secs(config.score.auto_ban_duration_secs),
        ));
        let firewall_policy = FirewallPolicy {
            allowed_ports: config.firewall.allowed_ports.clone(),
            default_deny: config.firewall.default_deny,
            ..FirewallPolicy::default()
        };
        Self {
            authorizer: PeerAuthorizer::new(
                config.peer.clone(),
                registry.clone(),
                scorer.clone(),
            ),
            sybil: SybilGuard::new(config.sybil.clone()),
            eclipse: EclipseGuard::new(config.eclipse.clone(), clock.clone()),
            rate_limiter: NetRateLimiter::new(config.rate_limit.clone(), clock.clone()),
            ddos: DdosProtector::new(config.ddos.clone(), clock.clone(), ids),
            firewall_policy: RwLock::new(firewall_policy),
            trusted_transport_keys: RwLock::new(std::collections::HashSet::new()),
            static_keypair: StaticKeypair::generate(),
            last_decay: Mutex::new(clock.now()),
            registry,
            authenticator,
            scorer,
            config,
            clock,
        }
    }

    /// The node's long-term transport public key, published to peers.
    pub fn transport_public_key(&self) -> [u8; 32] {
        self.static_keypair.public_key()
    }

    /// Admits or rejects a peer, registering it in every table on success.
    pub fn admit_peer(&self, info: PeerInfo) -> NetworkResult<()> {
        let addr = info.ip();

        if !self.rate_limiter.allow_connection(addr) {
            NETWORK_CONNECTIONS_REJECTED.increment(1, &RejectReason::RateLimited.as_label());
            return Err(NetworkError::ConnectionRateLimited { addr });
        }
        self.ddos.record_connection(addr).inspect_err(|_| {
            NETWORK_CONNECTIONS_REJECTED.increment(1, &RejectReason::Flood.as_label());
        })?;

        self.authenticator.authenticate(&info).inspect_err(|err| {
            let reason = match err {
                PeerError::Banned { .. } => RejectReason::Banned,
                _ => RejectReason::Authentication,
            };
            NETWORK_CONNECTIONS_REJECTED.increment(1, &reason.as_label());
        })?;
        self.authorizer.authorize(&info).inspect_err(|_| {
            NETWORK_CONNECTIONS_REJECTED.increment(1, &RejectReason::Authorization.as_label());
        })?;
        self.sybil.check(&info).inspect_err(|_| {
            NETWORK_CONNECTIONS_REJECTED.increment(1, &RejectReason::Sybil.as_label());
        })?;
        self.eclipse
            .check(&info, self.registry.inbound_count(), self.config.peer.max_peers)
            .inspect_err(|_| {
                NETWORK_CONNECTIONS_REJECTED.increment(1, &RejectReason::Eclipse.as_label());
            })?;

        // All gates passed: insert into every table.
        self.registry.register(info.clone())?;
        self.sybil.register(&info);
        self.scorer.init_peer(info.peer_id.clone(), info.stake, info.is_validator);

        NETWORK_CONNECTIONS_ACCEPTED.increment(1);
        NETWORK_ACTIVE_PEERS.set(self.registry.count() as f64);
        info!(peer_id = %info.peer_id, addr = %info.address, inbound = info.is_inbound, "peer admitted");
        Ok(())
    }

    /// Encrypts an inbound connection: responder side of the handshake.
    pub fn secure_inbound<T: Read + Write>(&self, mut io: T) -> NetworkResult<NoiseSession<T>> {
        let handshake = noise::respond(&mut io, &self.static_keypair).inspect_err(|_| {
            NETWORK_HANDSHAKE_FAILURES.increment(1);
        })?;
        Ok(NoiseSession::new(io, handshake))
    }

    /// Encrypts an outbound connection to a responder whose static key is
    /// already known. With `require_peer_auth` set, the key must also be in
    /// the trusted transport-key set.
    pub fn secure_outbound<T: Read + Write>(
        &self,
        mut io: T,
        remote_static: &[u8; 32],
    ) -> NetworkResult<NoiseSession<T>> {
        if self.config.noise.require_peer_auth {
            let trusted =
                self.trusted_transport_keys.read().expect("trusted key set lock poisoned");
            if !trusted.contains(remote_static) {
                NETWORK_HANDSHAKE_FAILURES.increment(1);
                return Err(crate::errors::NoiseError::InvalidPublicKey.into());
            }
        }
        let handshake = noise::initiate(&mut io, remote_static).inspect_err(|_| {
            NETWORK_HANDSHAKE_FAILURES.increment(1);
        })?;
        Ok(NoiseSession::new(io, handshake))
    }

    /// Adds a remote static key to the trusted transport-key set.
    pub fn trust_transport_key(&self, key: [u8; 32]) {
        self.trusted_transport_keys.write().expect("trusted key set lock poisoned").insert(key);
    }

    /// The wall-clock deadline for one handshake, applied by the caller to
    /// the socket before `secure_inbound`/`secure_outbound`.
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.config.noise.handshake_timeout_secs)
    }

    /// Per-message admission: rate limits, bandwidth and flood windows.
    pub fn on_message(&self, peer_id: &PeerId, size: usize) -> NetworkResult<()> {
        let Some(peer) = self.registry.get(peer_id) else {
            return Err(PeerError::UnknownPeer { peer_id: peer_id.clone() }.into());
        };
        let addr = peer.info.ip();

        if !self.rate_limiter.allow_message(addr, size) {
            NETWORK_MESSAGES_THROTTLED.increment(1);
            self.scorer.record_rate_limit_violation(peer_id, RATE_LIMIT_PENALTY);
            return Err(NetworkError::MessageRateLimited { addr });
        }
        self.ddos.record_message(addr)?;
        Ok(())
    }

    /// Raises a peer's misbehavior penalty; severe offenders are banned for
    /// the configured duration.
    pub fn report_misbehavior(&self, peer_id: &PeerId, severity: f64, reason: &str) {
        if self.scorer.record_misbehavior(peer_id, severity) {
            self.authenticator.ban(
                peer_id.clone(),
                Duration::from_secs(self.scorer.auto_ban_duration_secs()),
                reason,
            );
            NETWORK_PEERS_BANNED.increment(1);
        }
    }

    /// Removes a departed peer from every table. The score record survives
    /// so history follows the peer across reconnects.
    pub fn disconnect_peer(&self, peer_id: &PeerId) -> NetworkResult<()> {
        let departed = self.registry.unregister(peer_id)?;
        self.sybil.unregister(&departed.info);
        self.eclipse.unregister(peer_id);
        self.scorer.record_disconnection(peer_id, DISCONNECT_PENALTY);
        NETWORK_ACTIVE_PEERS.set(self.registry.count() as f64);
        debug!(%peer_id, "peer disconnected");
        Ok(())
    }

    /// Feeds the observed system load into adaptive rate limiting.
    pub fn observe_system_load(&self, load: f64) {
        self.rate_limiter.set_system_load(load);
    }

    /// Replaces the dynamic firewall tables.
    pub fn update_firewall_policy(&self, blocked_ips: Vec<IpRule>, allowed_ips: Vec<IpRule>) {
        let mut policy = self.firewall_policy.write().expect("firewall policy lock poisoned");
        policy.blocked_ips = blocked_ips;
        policy.allowed_ips = allowed_ips;
    }

    /// Renders the current firewall policy. Pure with respect to the policy
    /// tables: no mutation between calls means byte-identical output.
    pub fn render_firewall(&self) -> String {
        let policy = self.firewall_policy.read().expect("firewall policy lock poisoned");
        firewall::generate(&policy, self.config.firewall.firewall_type, self.clock.unix_now())
    }

    /// One maintenance pass: reclaim expired bans and stale buckets, decay
    /// scores, re-select anchors, and surface rotation victims for the
    /// connection layer to replace. Errors are logged, never propagated.
    pub fn run_maintenance(&self) -> Vec<PeerId> {
        let reclaimed_bans = self.authenticator.prune_expired_bans();
        let reclaimed_addr_bans = self.ddos.prune_expired_bans();
        let reclaimed_buckets = self.rate_limiter.prune_stale();
        if reclaimed_bans + reclaimed_addr_bans + reclaimed_buckets > 0 {
            debug!(
                reclaimed_bans,
                reclaimed_addr_bans, reclaimed_buckets, "maintenance reclaimed expired entries"
            );
        }

        // Decay is coarse: whole elapsed hours since the last decay pass.
        {
            let mut last_decay = self.last_decay.lock().expect("decay clock lock poisoned");
            let elapsed = self.clock.now().saturating_duration_since(*last_decay);
            let elapsed_hours = elapsed.as_secs() / 3600;
            if elapsed_hours > 0 {
                self.scorer.apply_decay(elapsed_hours as f64);
                *last_decay += Duration::from_secs(elapsed_hours * 3600);
            }
        }

        let peers = self.registry.snapshot();
        self.eclipse.select_anchors(&peers, &self.scorer);

        if self.eclipse.seed_refresh_due() {
            // Seed dialing lives in the connection layer; maintenance only
            // tracks the schedule.
            info!("seed node refresh due");
            self.eclipse.mark_seed_refreshed();
        }

        if self.eclipse.rotation_due() {
            let victims = self.eclipse.rotation_victims(&peers);
            self.eclipse.mark_rotated();
            if !victims.is_empty() {
                info!(count = victims.len(), "rotating non-anchor peers");
            }
            return victims;
        }
        Vec::new()
    }

    /// Spawns the background maintenance thread on the configured tick.
    pub fn spawn_maintenance(self: &Arc<Self>) -> MaintenanceHandle {
        let manager = Arc::clone(self);
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let tick = Duration::from_secs(self.config.maintenance_interval_secs.max(1));

        let handle = std::thread::Builder::new()
            .name("network-maintenance".to_owned())
            .spawn(move || {
                while !stop_flag.load(Ordering::Relaxed) {
                    std::thread::sleep(tick);
                    if stop_flag.load(Ordering::Relaxed) {
                        break;
                    }
                    let rotated = manager.run_maintenance();
                    for peer_id in rotated {
                        if let Err(err) = manager.disconnect_peer(&peer_id) {
                            warn!(%peer_id, %err, "rotation disconnect failed");
                        }
                    }
                }
            })
            .expect("spawning the maintenance thread");
        MaintenanceHandle { stop, handle: Some(handle) }
    }

    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    pub fn scorer(&self) -> &PeerScorer {
        &self.scorer
    }

    pub fn is_address_banned(&self, addr: std::net::IpAddr) -> bool {
        self.ddos.is_banned(addr)
    }
}

/// Stops the maintenance thread on drop.
pub struct MaintenanceHandle {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl MaintenanceHandle {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            // The thread wakes from its sleep and observes the flag.
            let _ = handle.join();
        }
    }
}

impl Drop for MaintenanceHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        self.handle.take();
    }
}
