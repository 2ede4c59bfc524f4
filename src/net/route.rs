//! 静态路由

use std::fmt;
use std::net::Ipv4Addr;

use super::addr::Destination;

/// 某个节点上的一条静态路由：`<dst> via <via> dev <dev>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Route {
    pub node: String,
    pub dst: Destination,
    pub via: Ipv4Addr,
    pub dev: String,
}

impl Route {
    /// 传给 `ip route add/del` 的参数
    pub fn ip_args(&self) -> Vec<String> {
        vec![
            self.dst.to_string(),
            "via".into(),
            self.via.to_string(),
            "dev".into(),
            self.dev.clone(),
        ]
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} via {} dev {}", self.dst, self.via, self.dev)
    }
}
