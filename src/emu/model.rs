//! 内存仿真后端
//!
//! 不依赖内核：每个节点维护接口、转发开关与一张 [`Fib`]，`ping` 逐跳查表，
//! 先走请求再走应答。规则与 Linux 默认行为一致：
//!
//! - 目的地址属于本节点任一接口即本地交付；
//! - 下一跳必须是出接口对端节点拥有的地址（相当于 ARP 能解析）；
//! - 未开启转发的节点丢弃非本地报文；
//! - TTL 为 64。

use std::any::Any;
use std::collections::HashMap;
use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;
use tracing::{debug, trace};

use super::backend::Backend;
use crate::error::{EmuError, LinkError, RouteInstallError};
use crate::net::{Fib, Link, Node, Route};
use crate::probe::PingStats;

const DEFAULT_TTL: u8 = 64;

#[derive(Debug, Clone)]
struct ModelIntf {
    name: String,
    addr: Ipv4Network,
}

#[derive(Debug, Clone, Default)]
struct ModelNode {
    interfaces: Vec<ModelIntf>,
    forwarding: bool,
    fib: Fib,
}

impl ModelNode {
    fn owns(&self, ip: Ipv4Addr) -> bool {
        self.interfaces.iter().any(|i| i.addr.ip() == ip)
    }

    fn intf(&self, name: &str) -> Option<&ModelIntf> {
        self.interfaces.iter().find(|i| i.name == name)
    }
}

/// 报文在一次单向传递中的结局
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HopOutcome {
    Delivered,
    /// 查表失败
    NoRoute { at: String },
    /// 下一跳地址在链路对端不存在
    NeighborUnresolved { at: String, next_hop: Ipv4Addr },
    /// 节点未开启转发
    NotForwarding { at: String },
    TtlExceeded { at: String },
}

/// 单向传递的轨迹
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trace {
    /// 经过的节点，含起点
    pub hops: Vec<String>,
    pub src: Option<Ipv4Addr>,
    pub outcome: HopOutcome,
}

impl Trace {
    pub fn delivered(&self) -> bool {
        self.outcome == HopOutcome::Delivered
    }
}

/// 内存后端
#[derive(Debug, Default)]
pub struct ModelBackend {
    nodes: HashMap<String, ModelNode>,
    /// (节点, 接口) -> (对端节点, 对端接口)
    wires: HashMap<(String, String), (String, String)>,
}

impl ModelBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前是否存在该节点
    pub fn has_node(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn forwarding(&self, name: &str) -> Option<bool> {
        self.nodes.get(name).map(|n| n.forwarding)
    }

    pub fn fib(&self, name: &str) -> Option<&Fib> {
        self.nodes.get(name).map(|n| &n.fib)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// 模拟从 `from` 发往 `dst` 的单向传递
    pub fn trace(&self, from: &str, dst: Ipv4Addr) -> Result<Trace, EmuError> {
        let origin = self
            .nodes
            .get(from)
            .ok_or_else(|| EmuError::UnknownNode(from.to_string()))?;

        let mut hops = vec![from.to_string()];
        if origin.owns(dst) {
            return Ok(Trace {
                hops,
                src: Some(dst),
                outcome: HopOutcome::Delivered,
            });
        }

        let mut src = None;
        let mut cur_name = from.to_string();
        let mut ttl = DEFAULT_TTL;
        loop {
            let cur = &self.nodes[&cur_name];
            let Some(entry) = cur.fib.lookup(dst) else {
                return Ok(Trace {
                    hops,
                    src,
                    outcome: HopOutcome::NoRoute { at: cur_name },
                });
            };
            if src.is_none() {
                src = Some(entry.src);
            }
            let next_hop = entry.via.unwrap_or(dst);
            trace!(at = %cur_name, dst = %dst, entry = %entry, "fib hit");

            let peer = self
                .wires
                .get(&(cur_name.clone(), entry.dev.clone()))
                .and_then(|(peer, _)| self.nodes.get(peer).map(|n| (peer, n)));
            let Some((peer_name, peer)) = peer.filter(|(_, n)| n.owns(next_hop)) else {
                return Ok(Trace {
                    hops,
                    src,
                    outcome: HopOutcome::NeighborUnresolved {
                        at: cur_name,
                        next_hop,
                    },
                });
            };

            hops.push(peer_name.clone());
            if peer.owns(dst) {
                return Ok(Trace {
                    hops,
                    src,
                    outcome: HopOutcome::Delivered,
                });
            }
            if !peer.forwarding {
                return Ok(Trace {
                    hops,
                    src,
                    outcome: HopOutcome::NotForwarding {
                        at: peer_name.clone(),
                    },
                });
            }
            ttl -= 1;
            if ttl == 0 {
                return Ok(Trace {
                    hops,
                    src,
                    outcome: HopOutcome::TtlExceeded {
                        at: peer_name.clone(),
                    },
                });
            }
            cur_name = peer_name.clone();
        }
    }

    /// 往返：请求送达后，从目的节点向请求的源地址回送应答
    pub fn round_trip(&self, from: &str, dst: Ipv4Addr) -> Result<bool, EmuError> {
        let request = self.trace(from, dst)?;
        if !request.delivered() {
            debug!(from, dst = %dst, outcome = ?request.outcome, "request dropped");
            return Ok(false);
        }
        let (Some(responder), Some(src)) = (request.hops.last(), request.src) else {
            return Ok(false);
        };
        let reply = self.trace(responder, src)?;
        let ok = reply.delivered() && reply.hops.last().map(String::as_str) == Some(from);
        if !ok {
            debug!(from = %responder, dst = %src, outcome = ?reply.outcome, "reply dropped");
        }
        Ok(ok)
    }

    fn node_mut(&mut self, name: &str) -> Result<&mut ModelNode, EmuError> {
        self.nodes
            .get_mut(name)
            .ok_or_else(|| EmuError::UnknownNode(name.to_string()))
    }

    fn render_routes(&self, name: &str) -> Result<String, EmuError> {
        let node = self
            .nodes
            .get(name)
            .ok_or_else(|| EmuError::UnknownNode(name.to_string()))?;
        let mut out = String::new();
        for entry in node.fib.entries() {
            out.push_str(&entry.to_string());
            out.push('\n');
        }
        Ok(out)
    }

    fn render_addrs(&self, name: &str) -> Result<String, EmuError> {
        let node = self
            .nodes
            .get(name)
            .ok_or_else(|| EmuError::UnknownNode(name.to_string()))?;
        let mut out = String::new();
        for (idx, intf) in node.interfaces.iter().enumerate() {
            out.push_str(&format!(
                "{}: {}    inet {}/{}\n",
                idx + 1,
                intf.name,
                intf.addr.ip(),
                intf.addr.prefix()
            ));
        }
        Ok(out)
    }
}

impl Backend for ModelBackend {
    fn name(&self) -> &'static str {
        "model"
    }

    fn cleanup(&mut self) -> Result<(), EmuError> {
        self.nodes.clear();
        self.wires.clear();
        Ok(())
    }

    fn add_node(&mut self, node: &Node) -> Result<(), EmuError> {
        if self.nodes.contains_key(node.name()) {
            return Err(EmuError::NodeExists(node.name().to_string()));
        }
        self.nodes
            .insert(node.name().to_string(), ModelNode::default());
        Ok(())
    }

    fn remove_node(&mut self, node: &Node) -> Result<(), EmuError> {
        let name = node.name().to_string();
        self.nodes
            .remove(&name)
            .ok_or_else(|| EmuError::UnknownNode(name.clone()))?;
        // veth 随命名空间一起消失，对端也一并断开
        self.wires
            .retain(|(n, _), (peer, _)| *n != name && *peer != name);
        Ok(())
    }

    fn set_forwarding(&mut self, node: &Node, enabled: bool) -> Result<(), EmuError> {
        self.node_mut(node.name())?.forwarding = enabled;
        Ok(())
    }

    fn add_link(&mut self, a: &Node, b: &Node, link: &Link) -> Result<(), LinkError> {
        for name in [a.name(), b.name()] {
            if !self.nodes.contains_key(name) {
                return Err(LinkError::MissingNode {
                    a: link.a.intf.clone(),
                    b: link.b.intf.clone(),
                    node: name.to_string(),
                });
            }
        }
        // 两端都检查完再落地，失败时不留半条链路
        for (node, ep) in [(a, &link.a), (b, &link.b)] {
            let taken = self
                .nodes
                .get(node.name())
                .is_some_and(|m| m.intf(&ep.intf).is_some());
            if taken {
                return Err(LinkError::Endpoint {
                    a: link.a.intf.clone(),
                    b: link.b.intf.clone(),
                    source: EmuError::Command {
                        command: format!("ip link add {}", ep.intf),
                        stderr: "RTNETLINK answers: File exists".into(),
                    },
                });
            }
        }
        for (node, ep) in [(a, &link.a), (b, &link.b)] {
            let model = self.nodes.entry(node.name().to_string()).or_default();
            model.interfaces.push(ModelIntf {
                name: ep.intf.clone(),
                addr: ep.addr,
            });
            model.fib.add_connected(&ep.intf, ep.addr);
        }
        self.wires.insert(
            (a.name().to_string(), link.a.intf.clone()),
            (b.name().to_string(), link.b.intf.clone()),
        );
        self.wires.insert(
            (b.name().to_string(), link.b.intf.clone()),
            (a.name().to_string(), link.a.intf.clone()),
        );
        Ok(())
    }

    fn add_route(&mut self, route: &Route) -> Result<(), RouteInstallError> {
        let node = self
            .nodes
            .get_mut(&route.node)
            .ok_or_else(|| RouteInstallError::Backend {
                node: route.node.clone(),
                source: EmuError::UnknownNode(route.node.clone()),
            })?;
        let intf = node
            .intf(&route.dev)
            .ok_or_else(|| RouteInstallError::UnknownInterface {
                node: route.node.clone(),
                dev: route.dev.clone(),
            })?;
        if !intf.addr.contains(route.via) || intf.addr.ip() == route.via {
            return Err(RouteInstallError::NextHopUnreachable {
                node: route.node.clone(),
                via: route.via,
                dev: route.dev.clone(),
            });
        }
        let src = intf.addr.ip();
        if !node.fib.add_static(route, src) {
            return Err(RouteInstallError::Exists {
                node: route.node.clone(),
                dst: route.dst.to_string(),
            });
        }
        Ok(())
    }

    fn del_route(&mut self, route: &Route) -> Result<(), RouteInstallError> {
        let node = self
            .nodes
            .get_mut(&route.node)
            .ok_or_else(|| RouteInstallError::Backend {
                node: route.node.clone(),
                source: EmuError::UnknownNode(route.node.clone()),
            })?;
        node.fib
            .remove_static(&route.dst)
            .map(|_| ())
            .ok_or_else(|| RouteInstallError::NotFound {
                node: route.node.clone(),
                dst: route.dst.to_string(),
            })
    }

    fn ping(&mut self, node: &Node, dst: Ipv4Addr) -> Result<PingStats, EmuError> {
        let ok = self.round_trip(node.name(), dst)?;
        Ok(PingStats {
            transmitted: 1,
            received: u32::from(ok),
        })
    }

    fn exec(&mut self, node: &Node, args: &[String]) -> Result<String, EmuError> {
        let words: Vec<&str> = args.iter().map(String::as_str).collect();
        match words.as_slice() {
            ["ping", .., last] => {
                let dst: Ipv4Addr = last.parse().map_err(|_| EmuError::Unsupported {
                    backend: "model",
                    command: args.join(" "),
                })?;
                let stats = self.ping(node, dst)?;
                Ok(format!("--- {dst} ping statistics ---\n{stats}\n"))
            }
            ["ip", "route"] | ["ip", "route", "show"] => self.render_routes(node.name()),
            ["ip", "addr"] | ["ip", "addr", "show"] => self.render_addrs(node.name()),
            ["sysctl", "net.ipv4.ip_forward"] => {
                let on = self.forwarding(node.name()).unwrap_or(false);
                Ok(format!("net.ipv4.ip_forward = {}\n", u8::from(on)))
            }
            _ => Err(EmuError::Unsupported {
                backend: "model",
                command: args.join(" "),
            }),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

