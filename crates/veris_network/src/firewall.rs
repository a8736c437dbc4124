use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use strum::Display;

#[cfg(test)]
#[path = "firewall_test.rs"]
mod firewall_test;

/// Target rule dialect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FirewallKind {
    Iptables,
    Nftables,
    Pf,
    Windows,
}

/// An allow/deny entry for one address, optionally port-scoped, optionally
/// expiring.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpRule {
    pub ip: IpAddr,
    pub port: Option<u16>,
    /// Unix seconds after which the rule is elided; `None` never expires.
    pub expires_at: Option<u64>,
}

impl IpRule {
    fn is_live(&self, unix_now: u64) -> bool {
        self.expires_at.map_or(true, |expiry| expiry > unix_now)
    }
}

/// An allow entry for a whole network.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRule {
    pub cidr: String,
    pub port: Option<u16>,
}

/// The dynamic policy tables the renderer reads.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallPolicy {
    pub allowed_ports: Vec<u16>,
    pub default_deny: bool,
    pub allowed_ips: Vec<IpRule>,
    pub blocked_ips: Vec<IpRule>,
    pub allowed_networks: Vec<NetworkRule>,
}

/// The platform-independent intermediate form. Every renderer emits every
/// rule of this form; none may drop one.
#[derive(Clone, Debug, PartialEq, Eq)]
enum RenderRule {
    BlockIp { ip: IpAddr, port: Option<u16> },
    AllowIp { ip: IpAddr, port: Option<u16> },
    AllowNetwork { cidr: String, port: Option<u16> },
    AllowPort { port: u16 },
    DenyAll,
}

/// Renders the policy to a textual rule set.
///
/// Pure function of `(policy, kind, unix_now)`: rules come out
/// priority-ordered (blocks first, catch-all last) and expired entries are
/// elided, so consecutive calls with the same inputs are byte-identical.
pub fn generate(policy: &FirewallPolicy, kind: FirewallKind, unix_now: u64) -> String {
    let rules = lower(policy, unix_now);
    let mut lines: Vec<String> = Vec::with_capacity(rules.len());
    for rule in &rules {
        lines.push(match kind {
            FirewallKind::Iptables => render_iptables(rule),
            FirewallKind::Nftables => render_nftables(rule),
            FirewallKind::Pf => render_pf(rule),
            FirewallKind::Windows => render_windows(rule),
        });
    }
    let mut output = lines.join("\n");
    if !output.is_empty() {
        output.push('\n');
    }
    output
}

fn lower(policy: &FirewallPolicy, unix_now: u64) -> Vec<RenderRule> {
    let mut rules = Vec::new();

    for blocked in policy.blocked_ips.iter().filter(|rule| rule.is_live(unix_now)) {
        rules.push(RenderRule::BlockIp { ip: blocked.ip, port: blocked.port });
    }
    for allowed in policy.allowed_ips.iter().filter(|rule| rule.is_live(unix_now)) {
        rules.push(RenderRule::AllowIp { ip: allowed.ip, port: allowed.port });
    }
    for network in &policy.allowed_networks {
        rules.push(RenderRule::AllowNetwork { cidr: network.cidr.clone(), port: network.port });
    }
    for port in &policy.allowed_ports {
        rules.push(RenderRule::AllowPort { port: *port });
    }
    if policy.default_deny {
        rules.push(RenderRule::DenyAll);
    }
    rules
}

fn render_iptables(rule: &RenderRule) -> String {
    match rule {
        RenderRule::BlockIp { ip, port: Some(port) } => {
            format!("-A INPUT -s {ip} -p tcp --dport {port} -j DROP")
        }
        RenderRule::BlockIp { ip, port: None } => format!("-A INPUT -s {ip} -j DROP"),
        RenderRule::AllowIp { ip, port: Some(port) } => {
            format!("-A INPUT -s {ip} -p tcp --dport {port} -j ACCEPT")
        }
        RenderRule::AllowIp { ip, port: None } => format!("-A INPUT -s {ip} -j ACCEPT"),
        RenderRule::AllowNetwork { cidr, port: Some(port) } => {
            format!("-A INPUT -s {cidr} -p tcp --dport {port} -j ACCEPT")
        }
        RenderRule::AllowNetwork { cidr, port: None } => format!("-A INPUT -s {cidr} -j ACCEPT"),
        RenderRule::AllowPort { port } => format!("-A INPUT -p tcp --dport {port} -j ACCEPT"),
        RenderRule::DenyAll => "-A INPUT -j DROP".to_owned(),
    }
}

fn render_nftables(rule: &RenderRule) -> String {
    match rule {
        RenderRule::BlockIp { ip, port: Some(port) } => {
            format!("add rule inet filter input ip saddr {ip} tcp dport {port} drop")
        }
        RenderRule::BlockIp { ip, port: None } => {
            format!("add rule inet filter input ip saddr {ip} drop")
        }
        RenderRule::AllowIp { ip, port: Some(port) } => {
            format!("add rule inet filter input ip saddr {ip} tcp dport {port} accept")
        }
        RenderRule::AllowIp { ip, port: None } => {
            format!("add rule inet filter input ip saddr {ip} accept")
        }
        RenderRule::AllowNetwork { cidr, port: Some(port) } => {
            format!("add rule inet filter input ip saddr {cidr} tcp dport {port} accept")
        }
        RenderRule::AllowNetwork { cidr, port: None } => {
            format!("add rule inet filter input ip saddr {cidr} accept")
        }
        RenderRule::AllowPort { port } => {
            format!("add rule inet filter input tcp dport {port} accept")
        }
        RenderRule::DenyAll => "add rule inet filter input drop".to_owned(),
    }
}

fn render_pf(rule: &RenderRule) -> String {
    match rule {
        RenderRule::BlockIp { ip, port: Some(port) } => {
            format!("block in quick proto tcp from {ip} to any port {port}")
        }
        RenderRule::BlockIp { ip, port: None } => format!("block in quick from {ip} to any"),
        RenderRule::AllowIp { ip, port: Some(port) } => {
            format!("pass in quick proto tcp from {ip} to any port {port}")
        }
        RenderRule::AllowIp { ip, port: None } => format!("pass in quick from {ip} to any"),
        RenderRule::AllowNetwork { cidr, port: Some(port) } => {
            format!("pass in quick proto tcp from {cidr} to any port {port}")
        }
        RenderRule::AllowNetwork { cidr, port: None } => {
            format!("pass in quick from {cidr} to any")
        }
        RenderRule::AllowPort { port } => format!("pass in proto tcp to any port {port}"),
        RenderRule::DenyAll => "block in all".to_owned(),
    }
}

fn render_windows(rule: &RenderRule) -> String {
    match rule {
        RenderRule::BlockIp { ip, port: Some(port) } => format!(
            "netsh advfirewall firewall add rule name=\"veris-block-{ip}-{port}\" dir=in \
             action=block remoteip={ip} protocol=TCP localport={port}"
        ),
        // Portless blocks must render too; dropping them leaves the address
        // reachable on every port the policy otherwise opens.
        RenderRule::BlockIp { ip, port: None } => format!(
            "netsh advfirewall firewall add rule name=\"veris-block-{ip}\" dir=in action=block \
             remoteip={ip}"
        ),
        RenderRule::AllowIp { ip, port: Some(port) } => format!(
            "netsh advfirewall firewall add rule name=\"veris-allow-{ip}-{port}\" dir=in \
             action=allow remoteip={ip} protocol=TCP localport={port}"
        ),
        RenderRule::AllowIp { ip, port: None } => format!(
            "netsh advfirewall firewall add rule name=\"veris-allow-{ip}\" dir=in action=allow \
             remoteip={ip}"
        ),
        RenderRule::AllowNetwork { cidr, port: Some(port) } => format!(
            "netsh advfirewall firewall add rule name=\"veris-allow-net-{cidr}-{port}\" dir=in \
             action=allow remoteip={cidr} protocol=TCP localport={port}"
        ),
        RenderRule::AllowNetwork { cidr, port: None } => format!(
            "netsh advfirewall firewall add rule name=\"veris-allow-net-{cidr}\" dir=in \
             action=allow remoteip={cidr}"
        ),
        RenderRule::AllowPort { port } => format!(
            "netsh advfirewall firewall add rule name=\"veris-allow-port-{port}\" dir=in \
             action=allow protocol=TCP localport={port}"
        ),
        RenderRule::DenyAll => "netsh advfirewall set allprofiles firewallpolicy \
                                blockinbound,allowoutbound"
            .to_owned(),
    }
}
