//! 地址与目的前缀
//!
//! 接口地址使用 `ipnetwork::Ipv4Network` 表示（保留主机位，如 `192.168.1.1/24`），
//! 路由目的地使用 [`Destination`]，要求前缀已规范化（主机位为 0）。

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use ipnetwork::Ipv4Network;

use crate::error::ConfigError;

/// 解析 `a.b.c.d/len` 形式的接口地址；省略前缀时视为 /32。
pub fn parse_cidr(input: &str) -> Result<Ipv4Network, ConfigError> {
    Ipv4Network::from_str(input.trim()).map_err(|e| ConfigError::InvalidAddress {
        input: input.to_string(),
        reason: e.to_string(),
    })
}

/// 解析单个 IPv4 地址
pub fn parse_ip(input: &str) -> Result<Ipv4Addr, ConfigError> {
    Ipv4Addr::from_str(input.trim()).map_err(|e| ConfigError::InvalidAddress {
        input: input.to_string(),
        reason: e.to_string(),
    })
}

/// 接口地址所在的子网（主机位清零）
pub fn subnet_of(addr: &Ipv4Network) -> Ipv4Network {
    // 前缀来自一个合法的 Ipv4Network，new 不会失败
    Ipv4Network::new(addr.network(), addr.prefix()).unwrap_or(*addr)
}

/// 两个接口地址是否处于同一子网
pub fn same_subnet(a: &Ipv4Network, b: &Ipv4Network) -> bool {
    a.prefix() == b.prefix() && a.network() == b.network()
}

/// 地址能否分配给接口：/31 与 /32 之外不能是网络地址或广播地址。
pub fn is_assignable(addr: &Ipv4Network) -> bool {
    if addr.prefix() >= 31 {
        return true;
    }
    addr.ip() != addr.network() && addr.ip() != addr.broadcast()
}

/// 路由目的地
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    Default,
    Net(Ipv4Network),
}

impl Destination {
    pub fn prefix_len(&self) -> u8 {
        match self {
            Destination::Default => 0,
            Destination::Net(net) => net.prefix(),
        }
    }

    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        match self {
            Destination::Default => true,
            Destination::Net(net) => net.contains(ip),
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Default => f.write_str("default"),
            Destination::Net(net) if net.prefix() == 32 => write!(f, "{}", net.ip()),
            Destination::Net(net) => write!(f, "{}/{}", net.network(), net.prefix()),
        }
    }
}

impl FromStr for Destination {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "default" {
            return Ok(Destination::Default);
        }
        let net = parse_cidr(s)?;
        if net.ip() != net.network() {
            return Err(ConfigError::InvalidAddress {
                input: s.to_string(),
                reason: format!("host bits set for /{}", net.prefix()),
            });
        }
        Ok(Destination::Net(net))
    }
}
