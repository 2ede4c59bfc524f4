use crate::emu::{Backend, ModelBackend, Session};
use crate::net::{Fib, Route};
use crate::topo::four_router::{FourRouterOpts, build_four_router};
use crate::{EmuError, Error, RouteInstallError};

fn model(session: &Session) -> &ModelBackend {
    session
        .backend()
        .as_any()
        .downcast_ref::<ModelBackend>()
        .expect("model backend")
}

fn routed_session() -> Session {
    let topo = build_four_router(&FourRouterOpts { with_routes: true }).unwrap();
    Session::new(topo, Box::new(ModelBackend::new()))
}

fn fib_snapshot(session: &Session) -> Vec<Option<Fib>> {
    session
        .topology()
        .nodes()
        .iter()
        .map(|n| model(session).fib(n.name()).cloned())
        .collect()
}

#[test]
fn operations_require_a_running_session() {
    let mut session = routed_session();
    assert!(!session.is_running());
    assert!(matches!(
        session.ping("h1", "192.168.1.1".parse().unwrap()),
        Err(Error::NotRunning)
    ));
    let route = session.topology().routes()[0].clone();
    assert!(matches!(session.add_route(&route), Err(Error::NotRunning)));
    assert!(matches!(session.install_routes(), Err(Error::NotRunning)));
    // 未启动时 stop 是空操作
    session.stop().unwrap();
}

#[test]
fn start_twice_is_an_error() {
    let mut session = routed_session();
    session.start().unwrap();
    assert!(matches!(session.start(), Err(Error::AlreadyRunning)));
    assert!(session.is_running());
}

#[test]
fn stop_tears_down_every_node() {
    let mut session = routed_session();
    session.start().unwrap();
    session.install_routes().unwrap();
    assert_eq!(model(&session).node_count(), 6);
    assert_eq!(session.installed_routes().len(), 22);

    session.stop().unwrap();
    assert!(!session.is_running());
    assert_eq!(model(&session).node_count(), 0);
    assert!(session.installed_routes().is_empty());
    assert_eq!(model(&session).forwarding("r1"), None);
}

#[test]
fn restart_yields_identical_state() {
    let mut session = routed_session();
    session.start().unwrap();
    session.install_routes().unwrap();
    let routes: Vec<Route> = session.installed_routes().to_vec();
    let fibs = fib_snapshot(&session);
    session.stop().unwrap();

    session.start().unwrap();
    session.install_routes().unwrap();
    assert_eq!(session.installed_routes(), routes.as_slice());
    assert_eq!(fib_snapshot(&session), fibs);
}

#[test]
fn duplicate_and_bad_routes_are_rejected() {
    let mut session = routed_session();
    session.start().unwrap();
    session.install_routes().unwrap();

    let dup = session.topology().routes()[0].clone();
    assert!(matches!(
        session.add_route(&dup),
        Err(Error::Route(RouteInstallError::Exists { .. }))
    ));

    let unreachable = Route {
        node: "r1".to_string(),
        dst: "172.16.0.0/16".parse().unwrap(),
        via: "10.0.1.9".parse().unwrap(),
        dev: "r1-eth1".to_string(),
    };
    assert!(matches!(
        session.add_route(&unreachable),
        Err(Error::Route(RouteInstallError::NextHopUnreachable { .. }))
    ));

    let missing = session
        .remove_route("r2", &"172.16.0.0/16".parse().unwrap())
        .unwrap_err();
    assert!(matches!(
        missing,
        Error::Route(RouteInstallError::NotFound { .. })
    ));
    assert_eq!(session.installed_routes().len(), 22);
}

#[test]
fn failed_start_rolls_back_created_nodes() {
    let topo = build_four_router(&FourRouterOpts::default()).unwrap();
    let mut backend = ModelBackend::new();
    // 预先占用 h2，启动到 h2 时失败
    backend.add_node(topo.node_by_name("h2").unwrap()).unwrap();

    let mut session = Session::new(topo, Box::new(backend));
    let err = session.start().unwrap_err();
    match err {
        Error::Emu(EmuError::NodeExists(name)) => assert_eq!(name, "h2"),
        other => panic!("unexpected error {other:?}"),
    }
    assert!(!session.is_running());
    // 只剩预先占用的节点
    assert_eq!(model(&session).node_count(), 1);
    assert!(model(&session).has_node("h2"));
    assert!(!model(&session).has_node("r1"));
}

#[test]
fn cleanup_clears_leftovers() {
    let topo = build_four_router(&FourRouterOpts::default()).unwrap();
    let mut backend = ModelBackend::new();
    backend.add_node(topo.node_by_name("h2").unwrap()).unwrap();

    let mut session = Session::new(topo, Box::new(backend));
    session.cleanup().unwrap();
    session.start().unwrap();
    assert_eq!(model(&session).node_count(), 6);
}
