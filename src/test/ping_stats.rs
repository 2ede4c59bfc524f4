use crate::probe::{PairOutcome, PingStats, Probe, ProbeResult, SweepReport, natural_key};
use std::net::Ipv4Addr;

#[test]
fn parses_successful_ping_output() {
    let out = "\
PING 10.0.1.2 (10.0.1.2) 56(84) bytes of data.

--- 10.0.1.2 ping statistics ---
1 packets transmitted, 1 received, 0% packet loss, time 0ms
rtt min/avg/max/mdev = 0.046/0.046/0.046/0.000 ms
";
    let stats = PingStats::parse(out).unwrap();
    assert_eq!(
        stats,
        PingStats {
            transmitted: 1,
            received: 1
        }
    );
    assert!(stats.success());
    assert_eq!(stats.loss_pct(), 0);
}

#[test]
fn parses_failed_ping_output() {
    let out = "\
--- 192.168.3.2 ping statistics ---
1 packets transmitted, 0 received, +1 errors, 100% packet loss, time 0ms
";
    let stats = PingStats::parse(out).unwrap();
    assert_eq!(stats.received, 0);
    assert!(!stats.success());
    assert_eq!(
        stats.to_string(),
        "1 packets transmitted, 0 received, 100% packet loss"
    );
}

#[test]
fn missing_statistics_line_yields_none() {
    assert_eq!(PingStats::parse(""), None);
    assert_eq!(PingStats::parse("connect: Network is unreachable\n"), None);
}

#[test]
fn loss_is_rounded_down() {
    let stats = PingStats {
        transmitted: 3,
        received: 1,
    };
    assert_eq!(stats.loss_pct(), 66);
    let none = PingStats {
        transmitted: 0,
        received: 0,
    };
    assert_eq!(none.loss_pct(), 100);
    assert!(!none.success());
}

#[test]
fn probe_result_prints_label_and_summary() {
    let result = ProbeResult {
        probe: Probe {
            label: "r2-r4".to_string(),
            from: "r2".to_string(),
            dst: Ipv4Addr::new(10, 0, 4, 2),
        },
        stats: PingStats {
            transmitted: 1,
            received: 1,
        },
    };
    assert_eq!(
        result.to_string(),
        "[r2-r4] 1 packets transmitted, 1 received, 0% packet loss"
    );
}

#[test]
fn sweep_report_prints_matrix_and_totals() {
    let pair = |from: &str, to: &str, received: u32| PairOutcome {
        from: from.to_string(),
        to: to.to_string(),
        dst: Ipv4Addr::new(10, 0, 0, 1),
        stats: PingStats {
            transmitted: 1,
            received,
        },
    };
    let report = SweepReport {
        order: vec!["r1".into(), "h1".into(), "h2".into()],
        pairs: vec![
            pair("r1", "h1", 1),
            pair("r1", "h2", 0),
            pair("h1", "r1", 1),
            pair("h1", "h2", 0),
            pair("h2", "r1", 0),
            pair("h2", "h1", 0),
        ],
    };
    assert_eq!(report.sent(), 6);
    assert_eq!(report.received(), 2);
    assert_eq!(report.dropped_pct(), 66);
    assert_eq!(
        report.to_string(),
        "*** Ping: testing ping reachability\n\
         r1 -> h1 X\n\
         h1 -> r1 X\n\
         h2 -> X X\n\
         *** Results: 66% dropped (2/6 received)"
    );
    assert!(report.outcome("h2", "r1").is_some());
    assert!(report.outcome("h2", "h2").is_none());
}

#[test]
fn node_names_sort_numerically() {
    let mut names = vec!["r10", "r2", "h2", "r1", "h1", "core", "r9"];
    names.sort_by(|a, b| natural_key(a).cmp(&natural_key(b)));
    assert_eq!(names, ["core", "h1", "h2", "r1", "r2", "r9", "r10"]);
}
