use serde::{Deserialize, Serialize};

use super::node::{Capability, NodeRole};

/// 可序列化的拓扑描述符（JSON）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologySpec {
    #[serde(default)]
    pub name: Option<String>,
    pub nodes: Vec<NodeSpec>,
    pub links: Vec<LinkSpec>,
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub name: String,
    pub role: NodeRole,
    /// 缺省时使用角色的默认能力
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Vec<Capability>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointSpec {
    pub node: String,
    pub intf: String,
    /// 接口地址，`a.b.c.d/len`
    pub ip: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSpec {
    pub a: EndpointSpec,
    pub b: EndpointSpec,
    pub bw_mbps: f64,
    /// 声明的子网；缺省时取 `a` 端地址所在子网
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSpec {
    pub node: String,
    /// `default`、主机地址或规范化的子网
    pub dst: String,
    pub via: String,
    pub dev: String,
}

impl NodeSpec {
    pub fn router(name: &str) -> Self {
        Self {
            name: name.to_string(),
            role: NodeRole::Router,
            capabilities: None,
        }
    }

    pub fn host(name: &str) -> Self {
        Self {
            name: name.to_string(),
            role: NodeRole::Host,
            capabilities: None,
        }
    }
}

impl EndpointSpec {
    pub fn new(node: &str, intf: &str, ip: &str) -> Self {
        Self {
            node: node.to_string(),
            intf: intf.to_string(),
            ip: ip.to_string(),
        }
    }
}

impl RouteSpec {
    pub fn new(node: &str, dst: &str, via: &str, dev: &str) -> Self {
        Self {
            node: node.to_string(),
            dst: dst.to_string(),
            via: via.to_string(),
            dev: dev.to_string(),
        }
    }
}
