//! 转发表（FIB）
//!
//! 每个节点一张表：接口直连子网 + 静态路由，按最长前缀匹配查找。
//! 前缀长度相同时先插入者优先（直连路由总是先于静态路由插入）。

use std::fmt;
use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;

use super::addr::{Destination, subnet_of};
use super::route::Route;

/// 转发表项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FibEntry {
    pub dst: Destination,
    /// None 表示直连
    pub via: Option<Ipv4Addr>,
    pub dev: String,
    /// 从该出接口发出时使用的源地址
    pub src: Ipv4Addr,
}

impl fmt::Display for FibEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.via {
            Some(via) => write!(f, "{} via {} dev {}", self.dst, via, self.dev),
            None => write!(
                f,
                "{} dev {} proto kernel scope link src {}",
                self.dst, self.dev, self.src
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fib {
    entries: Vec<FibEntry>,
}

impl Fib {
    pub fn new() -> Self {
        Self::default()
    }

    /// 接口上线时加入直连路由
    pub fn add_connected(&mut self, dev: &str, addr: Ipv4Network) {
        self.entries.push(FibEntry {
            dst: Destination::Net(subnet_of(&addr)),
            via: None,
            dev: dev.to_string(),
            src: addr.ip(),
        });
    }

    /// 加入静态路由；同一目的地已存在时返回 false
    pub fn add_static(&mut self, route: &Route, src: Ipv4Addr) -> bool {
        if self.entries.iter().any(|e| e.dst == route.dst) {
            return false;
        }
        self.entries.push(FibEntry {
            dst: route.dst,
            via: Some(route.via),
            dev: route.dev.clone(),
            src,
        });
        true
    }

    /// 删除一条静态路由
    pub fn remove_static(&mut self, dst: &Destination) -> Option<FibEntry> {
        let idx = self
            .entries
            .iter()
            .position(|e| e.via.is_some() && e.dst == *dst)?;
        Some(self.entries.remove(idx))
    }

    /// 最长前缀匹配
    pub fn lookup(&self, dst: Ipv4Addr) -> Option<&FibEntry> {
        self.entries
            .iter()
            .filter(|e| e.dst.contains(dst))
            .fold(None, |best: Option<&FibEntry>, e| match best {
                Some(b) if b.dst.prefix_len() >= e.dst.prefix_len() => Some(b),
                _ => Some(e),
            })
    }

    pub fn entries(&self) -> &[FibEntry] {
        &self.entries
    }

    pub fn static_entries(&self) -> impl Iterator<Item = &FibEntry> {
        self.entries.iter().filter(|e| e.via.is_some())
    }
}
