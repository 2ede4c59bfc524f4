//! 链路类型
//!
//! 点对点链路，两端各一个接口，带宽上限以 Mbps 计（允许小数）。

use ipnetwork::Ipv4Network;

use super::addr::subnet_of;
use super::id::{LinkId, NodeId};

/// 链路端点
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub node: NodeId,
    pub intf: String,
    pub addr: Ipv4Network,
}

/// 网络链路
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub id: LinkId,
    pub a: Endpoint,
    pub b: Endpoint,
    pub bw_mbps: f64,
}

impl Link {
    /// 整形速率（kbit/s），0.5 Mbps -> 500 kbit
    pub fn rate_kbit(&self) -> u64 {
        (self.bw_mbps * 1000.0).round().max(1.0) as u64
    }

    /// 两端共享的子网
    pub fn subnet(&self) -> Ipv4Network {
        subnet_of(&self.a.addr)
    }

    /// 返回 `node` 在这条链路上的对端
    pub fn peer_of(&self, node: NodeId) -> Option<&Endpoint> {
        if self.a.node == node {
            Some(&self.b)
        } else if self.b.node == node {
            Some(&self.a)
        } else {
            None
        }
    }

    /// 返回 `node` 在这条链路上的本端
    pub fn end_of(&self, node: NodeId) -> Option<&Endpoint> {
        if self.a.node == node {
            Some(&self.a)
        } else if self.b.node == node {
            Some(&self.b)
        } else {
            None
        }
    }
}
