use std::net::IpAddr;

use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::firewall::{generate, FirewallKind, FirewallPolicy, IpRule, NetworkRule};

fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

fn sample_policy() -> FirewallPolicy {
    FirewallPolicy {
        allowed_ports: vec![26656],
        default_deny: true,
        allowed_ips: vec![IpRule { ip: ip("203.0.113.5"), port: Some(26657), expires_at: None }],
        blocked_ips: vec![IpRule { ip: ip("198.51.100.9"), port: None, expires_at: None }],
        allowed_networks: vec![NetworkRule { cidr: "10.0.0.0/8".to_owned(), port: Some(26656) }],
    }
}

#[test]
fn rules_come_out_priority_ordered() {
    let output = generate(&sample_policy(), FirewallKind::Iptables, 0);
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(
        lines,
        vec![
            "-A INPUT -s 198.51.100.9 -j DROP",
            "-A INPUT -s 203.0.113.5 -p tcp --dport 26657 -j ACCEPT",
            "-A INPUT -s 10.0.0.0/8 -p tcp --dport 26656 -j ACCEPT",
            "-A INPUT -p tcp --dport 26656 -j ACCEPT",
            "-A INPUT -j DROP",
        ]
    );
}

#[rstest]
#[case::iptables(FirewallKind::Iptables)]
#[case::nftables(FirewallKind::Nftables)]
#[case::pf(FirewallKind::Pf)]
#[case::windows(FirewallKind::Windows)]
fn every_renderer_emits_every_rule(#[case] kind: FirewallKind) {
    let output = generate(&sample_policy(), kind, 0);
    // One line per intermediate rule, portless blocked IP included.
    assert_eq!(output.lines().count(), 5);
    assert!(output.contains("198.51.100.9"), "blocked ip missing from {kind}: {output}");
}

#[rstest]
#[case::iptables(FirewallKind::Iptables)]
#[case::nftables(FirewallKind::Nftables)]
#[case::pf(FirewallKind::Pf)]
#[case::windows(FirewallKind::Windows)]
fn generation_is_idempotent(#[case] kind: FirewallKind) {
    let policy = sample_policy();
    assert_eq!(generate(&policy, kind, 42), generate(&policy, kind, 42));
}

#[test]
fn expired_entries_are_elided_at_render_time() {
    let mut policy = sample_policy();
    policy.blocked_ips.push(IpRule {
        ip: ip("198.51.100.10"),
        port: None,
        expires_at: Some(100),
    });
    policy.allowed_ips.push(IpRule {
        ip: ip("203.0.113.6"),
        port: None,
        expires_at: Some(200),
    });

    let before_expiry = generate(&policy, FirewallKind::Iptables, 99);
    assert!(before_expiry.contains("198.51.100.10"));
    assert!(before_expiry.contains("203.0.113.6"));

    let after_first_expiry = generate(&policy, FirewallKind::Iptables, 100);
    assert!(!after_first_expiry.contains("198.51.100.10"));
    assert!(after_first_expiry.contains("203.0.113.6"));

    let after_both = generate(&policy, FirewallKind::Iptables, 200);
    assert!(!after_both.contains("203.0.113.6"));
}

#[test]
fn default_deny_toggle_controls_the_catch_all() {
    let mut policy = sample_policy();
    policy.default_deny = false;
    let output = generate(&policy, FirewallKind::Pf, 0);
    assert!(!output.contains("block in all"));

    policy.default_deny = true;
    let output = generate(&policy, FirewallKind::Pf, 0);
    assert!(output.ends_with("block in all\n"));
}

#[test]
fn empty_policy_renders_empty_output() {
    let policy = FirewallPolicy::default();
    assert_eq!(generate(&policy, FirewallKind::Nftables, 0), "");
}
