use crate::emu::{ModelBackend, Session};
use crate::net::{RouteSpec, Topology};
use crate::run::{RunOpts, run};
use crate::topo::four_router::{FourRouterOpts, four_router_spec};
use crate::{Error, RouteInstallError};

fn session(with_routes: bool) -> Session {
    let spec = four_router_spec(&FourRouterOpts { with_routes });
    let topo = Topology::from_spec(&spec).unwrap();
    Session::new(topo, Box::new(ModelBackend::new()))
}

#[test]
fn unrouted_run_prints_neighbor_checks() {
    let mut session = session(false);
    let mut out = Vec::new();
    let report = run(&mut session, &RunOpts::default(), &b""[..], &mut out).unwrap();

    assert_eq!(report.checks.len(), 16);
    assert!(report.sweep.is_none());
    assert_eq!(report.routes_installed, 0);
    assert!(!session.is_running());

    let out = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 16);
    assert_eq!(
        lines[0],
        "[h1-r1] 1 packets transmitted, 1 received, 0% packet loss"
    );
    assert_eq!(
        lines[9],
        "[r2-r4] 1 packets transmitted, 1 received, 0% packet loss"
    );
}

#[test]
fn routed_run_installs_routes_and_sweeps() {
    let mut session = session(true);
    let opts = RunOpts {
        with_routes: true,
        ..RunOpts::default()
    };
    let mut out = Vec::new();
    let report = run(&mut session, &opts, &b""[..], &mut out).unwrap();

    assert_eq!(report.routes_installed, 22);
    assert!(report.checks.is_empty());
    let sweep = report.sweep.unwrap();
    assert_eq!(sweep.received(), 30);

    let out = String::from_utf8(out).unwrap();
    assert!(out.starts_with("*** Ping: testing ping reachability\n"), "{out}");
    assert!(out.contains("*** Results: 0% dropped (30/30 received)"), "{out}");
    assert!(!session.is_running());
}

#[test]
fn routed_run_can_open_the_shell() {
    let mut session = session(true);
    let opts = RunOpts {
        with_routes: true,
        interactive: true,
        cleanup: false,
    };
    let mut out = Vec::new();
    run(&mut session, &opts, &b"nodes\nexit\n"[..], &mut out).unwrap();
    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("available nodes are: r1 r2 r3 r4 h1 h2"), "{out}");
}

#[test]
fn route_failure_aborts_and_tears_down() {
    let mut spec = four_router_spec(&FourRouterOpts { with_routes: true });
    spec.routes
        .push(RouteSpec::new("r1", "172.16.0.0/16", "10.0.1.9", "r1-eth1"));
    let topo = Topology::from_spec(&spec).unwrap();
    let mut session = Session::new(topo, Box::new(ModelBackend::new()));

    let opts = RunOpts {
        with_routes: true,
        ..RunOpts::default()
    };
    let mut out = Vec::new();
    let err = run(&mut session, &opts, &b""[..], &mut out).unwrap_err();
    assert!(matches!(
        err,
        Error::Route(RouteInstallError::NextHopUnreachable { .. })
    ));
    assert!(!session.is_running());
    assert!(out.is_empty());
}
