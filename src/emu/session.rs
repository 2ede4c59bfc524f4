//! 仿真会话
//!
//! 一个会话独占一个后端和一份拓扑，显式 `start` / `stop`。节点按声明顺序创建、
//! 逆序拆除；节点能力对应的生命周期钩子在创建之后、拆除之前执行。

use std::net::Ipv4Addr;

use tracing::{debug, info, warn};

use super::backend::{Backend, hooks_for};
use crate::Error;
use crate::error::RouteInstallError;
use crate::net::{Destination, NodeId, Route, Topology};
use crate::probe::PingStats;

pub struct Session {
    topo: Topology,
    backend: Box<dyn Backend>,
    running: bool,
    /// 已创建的节点，按创建顺序
    created: Vec<NodeId>,
    installed: Vec<Route>,
}

impl Session {
    pub fn new(topo: Topology, backend: Box<dyn Backend>) -> Self {
        Self {
            topo,
            backend,
            running: false,
            created: Vec::new(),
            installed: Vec::new(),
        }
    }

    pub fn topology(&self) -> &Topology {
        &self.topo
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// 已安装的静态路由，按安装顺序
    pub fn installed_routes(&self) -> &[Route] {
        &self.installed
    }

    /// 清理上次运行的遗留资源
    pub fn cleanup(&mut self) -> Result<(), Error> {
        info!(backend = self.backend.name(), "cleaning up leftovers");
        self.backend.cleanup()?;
        Ok(())
    }

    /// 创建所有节点与链路；中途失败会拆除已创建的部分再返回错误
    #[tracing::instrument(skip(self), fields(backend = self.backend.name()))]
    pub fn start(&mut self) -> Result<(), Error> {
        if self.running {
            return Err(Error::AlreadyRunning);
        }
        self.running = true;
        if let Err(err) = self.materialize() {
            warn!(error = %err, "start failed, tearing down");
            if let Err(stop_err) = self.stop() {
                warn!(error = %stop_err, "teardown after failed start");
            }
            return Err(err);
        }
        info!(
            nodes = self.topo.nodes().len(),
            links = self.topo.links().len(),
            "network started"
        );
        Ok(())
    }

    fn materialize(&mut self) -> Result<(), Error> {
        for node in self.topo.nodes() {
            self.backend.add_node(node)?;
            self.created.push(node.id());
            for hook in hooks_for(node) {
                hook.on_start(node, self.backend.as_mut())?;
            }
            debug!(node = node.name(), role = %node.role(), "node up");
        }
        for link in self.topo.links() {
            let a = self.topo.node(link.a.node);
            let b = self.topo.node(link.b.node);
            self.backend.add_link(a, b, link)?;
            debug!(a = %link.a.intf, b = %link.b.intf, bw_mbps = link.bw_mbps, "link up");
        }
        Ok(())
    }

    /// 按声明顺序安装拓扑中的全部静态路由，返回安装条数
    #[tracing::instrument(skip(self))]
    pub fn install_routes(&mut self) -> Result<usize, Error> {
        let routes = self.topo.routes().to_vec();
        for route in &routes {
            self.add_route(route)?;
        }
        info!(count = routes.len(), "static routes installed");
        Ok(routes.len())
    }

    /// 安装一条路由；下一跳必须是出接口上的直连邻居
    pub fn add_route(&mut self, route: &Route) -> Result<(), Error> {
        if !self.running {
            return Err(Error::NotRunning);
        }
        self.topo.check_route(route)?;
        if self.installed.iter().any(|r| r.node == route.node && r.dst == route.dst) {
            return Err(RouteInstallError::Exists {
                node: route.node.clone(),
                dst: route.dst.to_string(),
            }
            .into());
        }
        self.backend.add_route(route)?;
        debug!(node = %route.node, route = %route, "route installed");
        self.installed.push(route.clone());
        Ok(())
    }

    /// 删除一条已安装的路由并返回它
    pub fn remove_route(&mut self, node: &str, dst: &Destination) -> Result<Route, Error> {
        if !self.running {
            return Err(Error::NotRunning);
        }
        let idx = self
            .installed
            .iter()
            .position(|r| r.node == node && r.dst == *dst)
            .ok_or_else(|| RouteInstallError::NotFound {
                node: node.to_string(),
                dst: dst.to_string(),
            })?;
        self.backend.del_route(&self.installed[idx])?;
        let route = self.installed.remove(idx);
        debug!(node, route = %route, "route removed");
        Ok(route)
    }

    /// 从节点 `from` ping `dst`
    pub fn ping(&mut self, from: &str, dst: Ipv4Addr) -> Result<PingStats, Error> {
        if !self.running {
            return Err(Error::NotRunning);
        }
        let node = self
            .topo
            .node_by_name(from)
            .ok_or_else(|| crate::error::EmuError::UnknownNode(from.to_string()))?;
        Ok(self.backend.ping(node, dst)?)
    }

    /// 在节点内执行命令
    pub fn exec(&mut self, node: &str, args: &[String]) -> Result<String, Error> {
        if !self.running {
            return Err(Error::NotRunning);
        }
        let node = self
            .topo
            .node_by_name(node)
            .ok_or_else(|| crate::error::EmuError::UnknownNode(node.to_string()))?;
        Ok(self.backend.exec(node, args)?)
    }

    /// 逆序拆除所有已创建节点
    ///
    /// 单个节点拆除失败不会中断其余节点，返回遇到的第一个错误。
    #[tracing::instrument(skip(self), fields(backend = self.backend.name()))]
    pub fn stop(&mut self) -> Result<(), Error> {
        if !self.running {
            return Ok(());
        }
        let mut first_err: Option<Error> = None;
        while let Some(id) = self.created.pop() {
            let node = self.topo.node(id);
            for hook in hooks_for(node) {
                if let Err(err) = hook.on_stop(node, self.backend.as_mut()) {
                    warn!(node = node.name(), error = %err, "stop hook failed");
                    first_err.get_or_insert(err.into());
                }
            }
            if let Err(err) = self.backend.remove_node(node) {
                warn!(node = node.name(), error = %err, "remove node failed");
                first_err.get_or_insert(err.into());
            }
        }
        self.installed.clear();
        self.running = false;
        info!("network stopped");
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.running {
            if let Err(err) = self.stop() {
                warn!(error = %err, "teardown on drop failed");
            }
        }
    }
}
