//! 节点类型
//!
//! 节点只有两种角色：路由器与主机。转发能力不是通过子类型表达，而是作为
//! [`Capability`] 挂在节点上，由仿真会话在节点生命周期的起止处应用。

use std::fmt;
use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};

use super::id::{LinkId, NodeId};

/// 节点角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    Router,
    Host,
}

impl NodeRole {
    /// 该角色默认具备的能力
    pub fn default_capabilities(self) -> Vec<Capability> {
        match self {
            NodeRole::Router => vec![Capability::Forwarding],
            NodeRole::Host => Vec::new(),
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRole::Router => f.write_str("router"),
            NodeRole::Host => f.write_str("host"),
        }
    }
}

/// 节点能力
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// 创建后开启 IPv4 转发，拆除前关闭
    Forwarding,
}

/// 节点上的一个接口
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    pub addr: Ipv4Network,
    pub link: LinkId,
}

/// 拓扑中的节点
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    id: NodeId,
    name: String,
    role: NodeRole,
    capabilities: Vec<Capability>,
    interfaces: Vec<Interface>,
}

impl Node {
    pub(crate) fn new(
        id: NodeId,
        name: impl Into<String>,
        role: NodeRole,
        capabilities: Vec<Capability>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            role,
            capabilities,
            interfaces: Vec::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    pub fn has_capability(&self, cap: Capability) -> bool {
        self.capabilities.contains(&cap)
    }

    /// 接口按链路声明顺序排列
    pub fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }

    pub fn interface(&self, name: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    /// 主地址：第一个接口的地址
    pub fn primary_addr(&self) -> Option<Ipv4Addr> {
        self.interfaces.first().map(|i| i.addr.ip())
    }

    pub fn owns_addr(&self, ip: Ipv4Addr) -> bool {
        self.interfaces.iter().any(|i| i.addr.ip() == ip)
    }

    pub(crate) fn push_interface(&mut self, intf: Interface) {
        self.interfaces.push(intf);
    }
}
