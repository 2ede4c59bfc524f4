//! 四路由器 / 两主机拓扑
//!
//! ```text
//! h1 --1M-- r1 --0.5M-- r3 --1M-- h2
//! h1 --1M-- r2 --1M---- r3
//!           r1 --1M---- r4 --1M-- h2
//!           r2 --0.5M-- r4
//! ```
//!
//! 每台路由器只知道自己的直连子网，其余子网需要静态路由。路由表是人工给定的，
//! 必须逐条保留，不能用最短路重新推导。

use crate::error::ConfigError;
use crate::net::{EndpointSpec, LinkSpec, NodeSpec, RouteSpec, Topology, TopologySpec};

/// 拓扑变体选项
#[derive(Debug, Clone, Default)]
pub struct FourRouterOpts {
    /// 是否附带静态路由（routed 变体）
    pub with_routes: bool,
}

/// (a 端节点, a 端接口, a 端地址, b 端节点, b 端接口, b 端地址, 带宽 Mbps)
type LinkRow = (
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    f64,
);

const ROUTERS: [&str; 4] = ["r1", "r2", "r3", "r4"];
const HOSTS: [&str; 2] = ["h1", "h2"];

const LINKS: [LinkRow; 8] = [
    ("r1", "r1-eth0", "192.168.1.1/24", "h1", "h1-eth0", "192.168.1.2/24", 1.0),
    ("r2", "r2-eth0", "192.168.2.1/24", "h1", "h1-eth1", "192.168.2.2/24", 1.0),
    ("r3", "r3-eth0", "192.168.3.1/24", "h2", "h2-eth0", "192.168.3.2/24", 1.0),
    ("r4", "r4-eth0", "192.168.4.1/24", "h2", "h2-eth1", "192.168.4.2/24", 1.0),
    ("r1", "r1-eth1", "10.0.1.1/24", "r3", "r3-eth1", "10.0.1.2/24", 0.5),
    ("r1", "r1-eth2", "10.0.2.1/24", "r4", "r4-eth1", "10.0.2.2/24", 1.0),
    ("r2", "r2-eth1", "10.0.3.1/24", "r3", "r3-eth2", "10.0.3.2/24", 1.0),
    ("r2", "r2-eth2", "10.0.4.1/24", "r4", "r4-eth2", "10.0.4.2/24", 0.5),
];

/// (节点, 目的地, 下一跳, 出接口)，按安装顺序
const ROUTES: [(&str, &str, &str, &str); 22] = [
    ("r1", "10.0.3.0/24", "10.0.1.2", "r1-eth1"),
    ("r1", "192.168.2.1", "10.0.1.2", "r1-eth1"),
    ("r1", "192.168.3.0/24", "10.0.1.2", "r1-eth1"),
    ("r1", "192.168.4.0/24", "10.0.2.2", "r1-eth2"),
    ("r2", "10.0.1.0/24", "10.0.3.2", "r2-eth1"),
    ("r2", "192.168.1.1", "10.0.3.2", "r2-eth1"),
    ("r2", "192.168.3.0/24", "10.0.3.2", "r2-eth1"),
    ("r2", "192.168.4.0/24", "10.0.4.2", "r2-eth2"),
    ("r3", "10.0.2.0/24", "10.0.1.1", "r3-eth1"),
    ("r3", "192.168.1.0/24", "10.0.1.1", "r3-eth1"),
    ("r3", "192.168.2.0/24", "10.0.3.1", "r3-eth2"),
    ("r3", "192.168.4.1", "10.0.1.1", "r3-eth1"),
    ("r4", "10.0.1.0/24", "10.0.2.1", "r4-eth1"),
    ("r4", "192.168.1.0/24", "10.0.2.1", "r4-eth1"),
    ("r4", "192.168.2.0/24", "10.0.4.1", "r4-eth2"),
    ("r4", "192.168.3.1", "10.0.2.1", "r4-eth1"),
    ("h1", "192.168.3.0/24", "192.168.1.1", "h1-eth0"),
    ("h1", "192.168.4.0/24", "192.168.2.1", "h1-eth1"),
    ("h1", "default", "192.168.1.1", "h1-eth0"),
    ("h2", "192.168.1.0/24", "192.168.3.1", "h2-eth0"),
    ("h2", "192.168.2.0/24", "192.168.4.1", "h2-eth1"),
    ("h2", "default", "192.168.3.1", "h2-eth0"),
];

/// 生成描述符
pub fn four_router_spec(opts: &FourRouterOpts) -> TopologySpec {
    let nodes = ROUTERS
        .iter()
        .map(|r| NodeSpec::router(r))
        .chain(HOSTS.iter().map(|h| NodeSpec::host(h)))
        .collect();

    let links = LINKS
        .iter()
        .map(|&(an, ai, aip, bn, bi, bip, bw_mbps)| LinkSpec {
            a: EndpointSpec::new(an, ai, aip),
            b: EndpointSpec::new(bn, bi, bip),
            bw_mbps,
            subnet: None,
        })
        .collect();

    let routes = if opts.with_routes {
        ROUTES
            .iter()
            .map(|&(node, dst, via, dev)| RouteSpec::new(node, dst, via, dev))
            .collect()
    } else {
        Vec::new()
    };

    TopologySpec {
        name: Some(if opts.with_routes {
            "four-router-routed".to_string()
        } else {
            "four-router".to_string()
        }),
        nodes,
        links,
        routes,
    }
}

/// 构建四路由器拓扑
pub fn build_four_router(opts: &FourRouterOpts) -> Result<Topology, ConfigError> {
    Topology::from_spec(&four_router_spec(opts))
}
