//! 网络拓扑
//!
//! 节点、链路与静态路由的静态声明。构建过程中完成全部校验，
//! 构建完成后拓扑只读。

use std::collections::HashMap;
use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;
use tracing::{debug, trace};

use super::addr::{Destination, is_assignable, parse_cidr, parse_ip, same_subnet, subnet_of};
use super::id::{LinkId, NodeId};
use super::link::{Endpoint, Link};
use super::node::{Interface, Node, NodeRole};
use super::route::Route;
use super::spec::{EndpointSpec, LinkSpec, NodeSpec, RouteSpec, TopologySpec};
use crate::error::{ConfigError, RouteInstallError};

/// Linux 网卡名上限（IFNAMSIZ - 1）
pub const MAX_IFNAME_LEN: usize = 15;

/// 链路带宽上限（Mbps），即 100 Gbit/s
pub const MAX_BW_MBPS: f64 = 100_000.0;

/// 网络拓扑
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    name: Option<String>,
    nodes: Vec<Node>,
    links: Vec<Link>,
    routes: Vec<Route>,
    by_name: HashMap<String, NodeId>,
    addr_owner: HashMap<Ipv4Addr, String>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从描述符构建并校验拓扑
    pub fn from_spec(spec: &TopologySpec) -> Result<Self, ConfigError> {
        let mut topo = Topology {
            name: spec.name.clone(),
            ..Default::default()
        };
        for node in &spec.nodes {
            topo.add_node_spec(node)?;
        }
        for link in &spec.links {
            topo.add_link(link)?;
        }
        for route in &spec.routes {
            topo.add_route(route)?;
        }
        debug!(
            nodes = topo.nodes.len(),
            links = topo.links.len(),
            routes = topo.routes.len(),
            "topology built"
        );
        Ok(topo)
    }

    /// 从 JSON 文本构建
    pub fn from_json(raw: &str) -> Result<Self, crate::Error> {
        let spec: TopologySpec = serde_json::from_str(raw)?;
        Ok(Self::from_spec(&spec)?)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// 添加路由器节点
    pub fn add_router(&mut self, name: &str) -> Result<NodeId, ConfigError> {
        self.add_node_spec(&NodeSpec::router(name))
    }

    /// 添加主机节点
    pub fn add_host(&mut self, name: &str) -> Result<NodeId, ConfigError> {
        self.add_node_spec(&NodeSpec::host(name))
    }

    pub fn add_node_spec(&mut self, spec: &NodeSpec) -> Result<NodeId, ConfigError> {
        if spec.name.is_empty() || self.by_name.contains_key(&spec.name) {
            return Err(ConfigError::DuplicateNode(spec.name.clone()));
        }
        let id = NodeId(self.nodes.len());
        let caps = spec
            .capabilities
            .clone()
            .unwrap_or_else(|| spec.role.default_capabilities());
        self.nodes.push(Node::new(id, spec.name.clone(), spec.role, caps));
        self.by_name.insert(spec.name.clone(), id);
        trace!(node = %spec.name, role = %spec.role, "added node");
        Ok(id)
    }

    /// 连接两个节点，同时在两端各创建一个接口
    pub fn add_link(&mut self, spec: &LinkSpec) -> Result<LinkId, ConfigError> {
        let a_id = self.resolve(&spec.a.node)?;
        let b_id = self.resolve(&spec.b.node)?;
        if a_id == b_id {
            return Err(ConfigError::SelfLink {
                node: spec.a.node.clone(),
                a: spec.a.intf.clone(),
                b: spec.b.intf.clone(),
            });
        }
        if !(spec.bw_mbps.is_finite() && spec.bw_mbps > 0.0 && spec.bw_mbps <= MAX_BW_MBPS) {
            return Err(ConfigError::InvalidBandwidth {
                a: spec.a.intf.clone(),
                b: spec.b.intf.clone(),
                bw_mbps: spec.bw_mbps,
            });
        }

        let a_addr = self.check_endpoint(&spec.a)?;
        let b_addr = self.check_endpoint(&spec.b)?;
        if a_addr.ip() == b_addr.ip() {
            return Err(ConfigError::DuplicateAddress {
                addr: a_addr.ip(),
                first: spec.a.intf.clone(),
                second: spec.b.intf.clone(),
            });
        }

        let subnet = match &spec.subnet {
            Some(raw) => {
                let net = parse_cidr(raw)?;
                subnet_of(&net)
            }
            None => subnet_of(&a_addr),
        };
        for (ep, addr) in [(&spec.a, &a_addr), (&spec.b, &b_addr)] {
            if !same_subnet(&subnet, addr) || !is_assignable(addr) {
                return Err(ConfigError::OutsideSubnet {
                    a: spec.a.intf.clone(),
                    b: spec.b.intf.clone(),
                    addr: format!("{}/{}", addr.ip(), addr.prefix()),
                    subnet: format!("{}/{}", subnet.network(), subnet.prefix()),
                });
            }
            trace!(intf = %ep.intf, addr = %addr, "endpoint checked");
        }

        let id = LinkId(self.links.len());
        self.links.push(Link {
            id,
            a: Endpoint {
                node: a_id,
                intf: spec.a.intf.clone(),
                addr: a_addr,
            },
            b: Endpoint {
                node: b_id,
                intf: spec.b.intf.clone(),
                addr: b_addr,
            },
            bw_mbps: spec.bw_mbps,
        });
        for (node_id, ep, addr) in [(a_id, &spec.a, a_addr), (b_id, &spec.b, b_addr)] {
            self.nodes[node_id.0].push_interface(Interface {
                name: ep.intf.clone(),
                addr,
                link: id,
            });
            self.addr_owner.insert(addr.ip(), ep.intf.clone());
        }
        trace!(link = %id, a = %spec.a.intf, b = %spec.b.intf, bw_mbps = spec.bw_mbps, "added link");
        Ok(id)
    }

    /// 声明一条静态路由
    ///
    /// 这里只检查语法与归属；下一跳是否可达在安装时由 [`Topology::check_route`] 判定。
    pub fn add_route(&mut self, spec: &RouteSpec) -> Result<(), ConfigError> {
        let node_id = self.resolve(&spec.node)?;
        let dst: Destination = spec.dst.parse()?;
        let via = parse_ip(&spec.via)?;
        if self
            .routes
            .iter()
            .any(|r| r.node == spec.node && r.dst == dst)
        {
            return Err(ConfigError::InvalidRoute {
                node: spec.node.clone(),
                reason: format!("duplicate destination {dst}"),
            });
        }
        if spec.dev.is_empty() {
            return Err(ConfigError::InvalidRoute {
                node: spec.node.clone(),
                reason: "missing egress interface".into(),
            });
        }
        self.routes.push(Route {
            node: self.nodes[node_id.0].name().to_string(),
            dst,
            via,
            dev: spec.dev.clone(),
        });
        Ok(())
    }

    /// 删除某节点去往 `dst` 的静态路由
    pub fn remove_route(&mut self, node: &str, dst: &Destination) -> Option<Route> {
        let idx = self
            .routes
            .iter()
            .position(|r| r.node == node && r.dst == *dst)?;
        Some(self.routes.remove(idx))
    }

    /// 判断路由能否安装：出接口属于该节点，且下一跳是该接口上的直连邻居。
    pub fn check_route(&self, route: &Route) -> Result<(), RouteInstallError> {
        let node = self
            .node_by_name(&route.node)
            .ok_or_else(|| RouteInstallError::UnknownInterface {
                node: route.node.clone(),
                dev: route.dev.clone(),
            })?;
        let intf = node
            .interface(&route.dev)
            .ok_or_else(|| RouteInstallError::UnknownInterface {
                node: route.node.clone(),
                dev: route.dev.clone(),
            })?;
        let link = &self.links[intf.link.0];
        let on_link = intf.addr.contains(route.via) && intf.addr.ip() != route.via;
        let is_neighbor = link
            .peer_of(node.id())
            .is_some_and(|peer| peer.addr.ip() == route.via);
        if !(on_link && is_neighbor) {
            return Err(RouteInstallError::NextHopUnreachable {
                node: route.node.clone(),
                via: route.via,
                dev: route.dev.clone(),
            });
        }
        Ok(())
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn routes_for<'a>(&'a self, node: &'a str) -> impl Iterator<Item = &'a Route> + 'a {
        self.routes.iter().filter(move |r| r.node == node)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.by_name.get(name).map(|id| &self.nodes[id.0])
    }

    pub fn link(&self, id: LinkId) -> &Link {
        &self.links[id.0]
    }

    /// 所有路由器，按声明顺序
    pub fn routers(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.role() == NodeRole::Router)
    }

    /// 所有主机，按声明顺序
    pub fn hosts(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.role() == NodeRole::Host)
    }

    /// 拥有该地址的节点
    pub fn owner_of(&self, ip: Ipv4Addr) -> Option<&Node> {
        self.nodes.iter().find(|n| n.owns_addr(ip))
    }

    /// 导出为描述符；`from_spec(to_spec())` 得到相同的拓扑
    pub fn to_spec(&self) -> TopologySpec {
        let nodes = self
            .nodes
            .iter()
            .map(|n| NodeSpec {
                name: n.name().to_string(),
                role: n.role(),
                capabilities: if n.capabilities() == n.role().default_capabilities().as_slice() {
                    None
                } else {
                    Some(n.capabilities().to_vec())
                },
            })
            .collect();
        let links = self
            .links
            .iter()
            .map(|l| LinkSpec {
                a: self.endpoint_spec(&l.a),
                b: self.endpoint_spec(&l.b),
                bw_mbps: l.bw_mbps,
                subnet: None,
            })
            .collect();
        let routes = self
            .routes
            .iter()
            .map(|r| RouteSpec {
                node: r.node.clone(),
                dst: r.dst.to_string(),
                via: r.via.to_string(),
                dev: r.dev.clone(),
            })
            .collect();
        TopologySpec {
            name: self.name.clone(),
            nodes,
            links,
            routes,
        }
    }

    fn endpoint_spec(&self, ep: &Endpoint) -> EndpointSpec {
        EndpointSpec {
            node: self.nodes[ep.node.0].name().to_string(),
            intf: ep.intf.clone(),
            ip: format!("{}/{}", ep.addr.ip(), ep.addr.prefix()),
        }
    }

    fn resolve(&self, name: &str) -> Result<NodeId, ConfigError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| ConfigError::UnknownNode(name.to_string()))
    }

    fn check_endpoint(&self, ep: &EndpointSpec) -> Result<Ipv4Network, ConfigError> {
        if ep.intf.is_empty() || ep.intf.len() > MAX_IFNAME_LEN {
            return Err(ConfigError::InvalidInterfaceName(ep.intf.clone()));
        }
        let node = &self.nodes[self.resolve(&ep.node)?.0];
        if node.interface(&ep.intf).is_some() {
            return Err(ConfigError::DuplicateInterface {
                node: ep.node.clone(),
                intf: ep.intf.clone(),
            });
        }
        let addr = parse_cidr(&ep.ip)?;
        if let Some(first) = self.addr_owner.get(&addr.ip()) {
            return Err(ConfigError::DuplicateAddress {
                addr: addr.ip(),
                first: first.clone(),
                second: ep.intf.clone(),
            });
        }
        Ok(addr)
    }
}
