use crate::ConfigError;
use crate::net::{Destination, is_assignable, parse_cidr, parse_ip, same_subnet, subnet_of};
use std::net::Ipv4Addr;

#[test]
fn parse_cidr_keeps_host_bits() {
    let addr = parse_cidr("192.168.1.1/24").unwrap();
    assert_eq!(addr.ip(), Ipv4Addr::new(192, 168, 1, 1));
    assert_eq!(addr.prefix(), 24);
    assert_eq!(subnet_of(&addr).ip(), Ipv4Addr::new(192, 168, 1, 0));
}

#[test]
fn parse_cidr_rejects_garbage() {
    for bad in ["300.1.1.1/24", "10.0.1.1/33", "r1-eth0", ""] {
        let err = parse_cidr(bad).unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidAddress { .. }),
            "{bad}: unexpected error {err:?}"
        );
    }
    assert!(parse_ip("10.0.1").is_err());
}

#[test]
fn same_subnet_requires_equal_prefix() {
    let a = parse_cidr("10.0.1.1/24").unwrap();
    let b = parse_cidr("10.0.1.2/24").unwrap();
    let c = parse_cidr("10.0.1.2/16").unwrap();
    let d = parse_cidr("10.0.2.2/24").unwrap();
    assert!(same_subnet(&a, &b));
    assert!(!same_subnet(&a, &c));
    assert!(!same_subnet(&a, &d));
}

#[test]
fn network_and_broadcast_are_not_assignable() {
    assert!(is_assignable(&parse_cidr("192.168.1.1/24").unwrap()));
    assert!(!is_assignable(&parse_cidr("192.168.1.0/24").unwrap()));
    assert!(!is_assignable(&parse_cidr("192.168.1.255/24").unwrap()));
    // 点对点子网没有网络/广播地址
    assert!(is_assignable(&parse_cidr("10.0.0.0/31").unwrap()));
}

#[test]
fn destination_parses_default_host_and_subnet() {
    let def: Destination = "default".parse().unwrap();
    assert_eq!(def, Destination::Default);
    assert_eq!(def.prefix_len(), 0);
    assert!(def.contains(Ipv4Addr::new(8, 8, 8, 8)));
    assert_eq!(def.to_string(), "default");

    let host: Destination = "192.168.2.1".parse().unwrap();
    assert_eq!(host.prefix_len(), 32);
    assert!(host.contains(Ipv4Addr::new(192, 168, 2, 1)));
    assert!(!host.contains(Ipv4Addr::new(192, 168, 2, 2)));
    assert_eq!(host.to_string(), "192.168.2.1");

    let net: Destination = "192.168.3.0/24".parse().unwrap();
    assert_eq!(net.prefix_len(), 24);
    assert!(net.contains(Ipv4Addr::new(192, 168, 3, 2)));
    assert_eq!(net.to_string(), "192.168.3.0/24");
}

#[test]
fn destination_rejects_host_bits() {
    let err = "192.168.3.1/24".parse::<Destination>().unwrap_err();
    match err {
        ConfigError::InvalidAddress { input, reason } => {
            assert_eq!(input, "192.168.3.1/24");
            assert!(reason.contains("host bits"), "reason={reason}");
        }
        other => panic!("unexpected error {other:?}"),
    }
}
