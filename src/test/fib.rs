use crate::net::{Destination, Fib, Route, parse_cidr};
use std::net::Ipv4Addr;

fn route(dst: &str, via: &str, dev: &str) -> Route {
    Route {
        node: "r1".to_string(),
        dst: dst.parse().unwrap(),
        via: via.parse().unwrap(),
        dev: dev.to_string(),
    }
}

fn r1_fib() -> Fib {
    let mut fib = Fib::new();
    fib.add_connected("r1-eth0", parse_cidr("192.168.1.1/24").unwrap());
    fib.add_connected("r1-eth1", parse_cidr("10.0.1.1/24").unwrap());
    fib
}

#[test]
fn connected_subnets_resolve_without_gateway() {
    let fib = r1_fib();
    let entry = fib.lookup(Ipv4Addr::new(10, 0, 1, 2)).unwrap();
    assert_eq!(entry.dev, "r1-eth1");
    assert_eq!(entry.via, None);
    assert_eq!(entry.src, Ipv4Addr::new(10, 0, 1, 1));
    assert_eq!(
        entry.to_string(),
        "10.0.1.0/24 dev r1-eth1 proto kernel scope link src 10.0.1.1"
    );
    assert!(fib.lookup(Ipv4Addr::new(192, 168, 3, 2)).is_none());
}

#[test]
fn longest_prefix_wins() {
    let mut fib = r1_fib();
    let src = Ipv4Addr::new(10, 0, 1, 1);
    assert!(fib.add_static(&route("default", "10.0.1.2", "r1-eth1"), src));
    assert!(fib.add_static(&route("192.168.3.0/24", "10.0.1.2", "r1-eth1"), src));

    let hit = fib.lookup(Ipv4Addr::new(192, 168, 3, 2)).unwrap();
    assert_eq!(hit.dst, "192.168.3.0/24".parse::<Destination>().unwrap());

    let fallback = fib.lookup(Ipv4Addr::new(8, 8, 8, 8)).unwrap();
    assert_eq!(fallback.dst, Destination::Default);

    fib.add_connected("r1-eth2", parse_cidr("10.0.2.1/24").unwrap());
    assert!(fib.add_static(&route("192.168.3.2", "10.0.2.2", "r1-eth2"), src));
    let host = fib.lookup(Ipv4Addr::new(192, 168, 3, 2)).unwrap();
    assert_eq!(host.dev, "r1-eth2");
    let other = fib.lookup(Ipv4Addr::new(192, 168, 3, 9)).unwrap();
    assert_eq!(other.dev, "r1-eth1");
}

#[test]
fn duplicate_destination_is_rejected() {
    let mut fib = r1_fib();
    let src = Ipv4Addr::new(10, 0, 1, 1);
    assert!(fib.add_static(&route("192.168.3.0/24", "10.0.1.2", "r1-eth1"), src));
    assert!(!fib.add_static(&route("192.168.3.0/24", "10.0.1.3", "r1-eth1"), src));
    assert_eq!(fib.static_entries().count(), 1);
}

#[test]
fn remove_static_leaves_connected_routes() {
    let mut fib = r1_fib();
    let src = Ipv4Addr::new(10, 0, 1, 1);
    fib.add_static(&route("192.168.3.0/24", "10.0.1.2", "r1-eth1"), src);

    let connected: Destination = "10.0.1.0/24".parse().unwrap();
    assert!(fib.remove_static(&connected).is_none());

    let removed = fib
        .remove_static(&"192.168.3.0/24".parse().unwrap())
        .unwrap();
    assert_eq!(removed.via, Some(Ipv4Addr::new(10, 0, 1, 2)));
    assert!(fib.lookup(Ipv4Addr::new(192, 168, 3, 2)).is_none());
    assert_eq!(fib.entries().len(), 2);
}
