//! 仿真后端接口与节点生命周期钩子

use std::any::Any;
use std::net::Ipv4Addr;

use tracing::debug;

use crate::error::{EmuError, LinkError, RouteInstallError};
use crate::net::{Capability, Link, Node, Route};
use crate::probe::PingStats;

/// 把拓扑落地的仿真引擎
///
/// 调用顺序由 [`Session`](super::Session) 保证：先 `add_node`，再 `add_link`，
/// 之后才会安装路由或发起探测；拆除时逆序 `remove_node`。
pub trait Backend {
    /// 后端名称，用于日志和错误信息
    fn name(&self) -> &'static str;

    /// 清理上一次运行遗留的资源
    fn cleanup(&mut self) -> Result<(), EmuError>;

    fn add_node(&mut self, node: &Node) -> Result<(), EmuError>;

    fn remove_node(&mut self, node: &Node) -> Result<(), EmuError>;

    /// 打开或关闭节点的 IPv4 转发
    fn set_forwarding(&mut self, node: &Node, enabled: bool) -> Result<(), EmuError>;

    /// 创建链路的两个端点：配置地址、上线、按带宽整形
    fn add_link(&mut self, a: &Node, b: &Node, link: &Link) -> Result<(), LinkError>;

    fn add_route(&mut self, route: &Route) -> Result<(), RouteInstallError>;

    fn del_route(&mut self, route: &Route) -> Result<(), RouteInstallError>;

    /// 从 `node` 向 `dst` 发一个 echo 请求
    fn ping(&mut self, node: &Node, dst: Ipv4Addr) -> Result<PingStats, EmuError>;

    /// 在节点内执行一条命令，返回标准输出
    fn exec(&mut self, node: &Node, args: &[String]) -> Result<String, EmuError>;

    fn as_any(&self) -> &dyn Any;
}

/// 节点生命周期钩子
pub trait NodeHook {
    fn on_start(&self, node: &Node, backend: &mut dyn Backend) -> Result<(), EmuError>;

    fn on_stop(&self, node: &Node, backend: &mut dyn Backend) -> Result<(), EmuError>;
}

/// 转发能力：创建后开启转发，拆除前关闭
#[derive(Debug, Default, Clone, Copy)]
pub struct ForwardingHook;

impl NodeHook for ForwardingHook {
    fn on_start(&self, node: &Node, backend: &mut dyn Backend) -> Result<(), EmuError> {
        debug!(node = node.name(), "enable ip forwarding");
        backend.set_forwarding(node, true)
    }

    fn on_stop(&self, node: &Node, backend: &mut dyn Backend) -> Result<(), EmuError> {
        debug!(node = node.name(), "disable ip forwarding");
        backend.set_forwarding(node, false)
    }
}

/// 根据节点能力生成钩子列表
pub fn hooks_for(node: &Node) -> Vec<Box<dyn NodeHook>> {
    node.capabilities()
        .iter()
        .map(|cap| match cap {
            Capability::Forwarding => Box::new(ForwardingHook) as Box<dyn NodeHook>,
        })
        .collect()
}
