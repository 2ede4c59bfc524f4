//! Linux 网络命名空间后端
//!
//! 每个节点一个命名空间 `<prefix><node>`，链路是直接建在两个命名空间里的
//! veth 对，每端挂一个 TBF 根队列做带宽整形。所有操作通过 `ip`、`tc`、
//! `sysctl`、`ping` 命令完成（可选 `sudo`）。

use std::any::Any;
use std::net::Ipv4Addr;
use std::process::Command;

use tracing::{debug, info, trace, warn};

use super::backend::Backend;
use crate::error::{EmuError, LinkError, RouteInstallError};
use crate::net::{Link, Node, Route};
use crate::probe::PingStats;

/// 默认命名空间前缀
pub const DEFAULT_NS_PREFIX: &str = "nl-";

/// 命令的执行结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// 执行外部命令
pub trait CommandRunner {
    fn run(&mut self, program: &str, args: &[String]) -> Result<CommandOutput, EmuError>;
}

/// 真正调用系统命令的执行器
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    pub sudo: bool,
}

impl SystemRunner {
    pub fn new(sudo: bool) -> Self {
        Self { sudo }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&mut self, program: &str, args: &[String]) -> Result<CommandOutput, EmuError> {
        let mut cmd = if self.sudo {
            let mut c = Command::new("sudo");
            c.arg(program);
            c
        } else {
            Command::new(program)
        };
        cmd.args(args);
        trace!(program, args = %args.join(" "), "run");
        let output = cmd.output().map_err(|source| EmuError::Spawn {
            command: render(program, args),
            source,
        })?;
        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// 命名空间后端
pub struct NetnsBackend {
    runner: Box<dyn CommandRunner>,
    prefix: String,
}

impl NetnsBackend {
    pub fn new(runner: Box<dyn CommandRunner>, prefix: impl Into<String>) -> Self {
        Self {
            runner,
            prefix: prefix.into(),
        }
    }

    /// 节点对应的命名空间名
    pub fn ns_name(&self, node: &str) -> String {
        format!("{}{}", self.prefix, node)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn ip(&mut self, args: &[&str]) -> Result<CommandOutput, EmuError> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        self.runner.run("ip", &args)
    }

    fn ip_checked(&mut self, args: &[&str]) -> Result<CommandOutput, EmuError> {
        let out = self.ip(args)?;
        check("ip", args, out)
    }

    /// `ip netns exec <ns> <args...>`
    fn ns_exec(&mut self, ns: &str, args: &[String]) -> Result<CommandOutput, EmuError> {
        let mut full = vec!["netns".to_string(), "exec".into(), ns.to_string()];
        full.extend_from_slice(args);
        self.runner.run("ip", &full)
    }

    fn ns_exec_checked(&mut self, ns: &str, args: &[&str]) -> Result<CommandOutput, EmuError> {
        let owned: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let out = self.ns_exec(ns, &owned)?;
        let mut shown = vec!["netns", "exec", ns];
        shown.extend_from_slice(args);
        check("ip", &shown, out)
    }

    fn setup_endpoint(
        &mut self,
        ns: &str,
        intf: &str,
        cidr: &str,
        rate_kbit: u64,
    ) -> Result<(), EmuError> {
        self.ns_exec_checked(ns, &["ip", "addr", "add", cidr, "dev", intf])?;
        self.ns_exec_checked(ns, &["ip", "link", "set", intf, "up"])?;

        // burst 至少一个 MTU，约为 100ms 的数据量
        let burst = (rate_kbit.saturating_mul(1000) / 8).max(15_400) / 10;
        let rate = format!("{rate_kbit}kbit");
        let burst = burst.to_string();
        self.ns_exec_checked(
            ns,
            &[
                "tc",
                "qdisc",
                "replace",
                "dev",
                intf,
                "root",
                "tbf",
                "rate",
                rate.as_str(),
                "burst",
                burst.as_str(),
                "latency",
                "50ms",
            ],
        )?;
        trace!(ns, intf, rate = %rate, "endpoint shaped");
        Ok(())
    }
}

impl Backend for NetnsBackend {
    fn name(&self) -> &'static str {
        "netns"
    }

    fn cleanup(&mut self) -> Result<(), EmuError> {
        // 空前缀会匹配宿主机上所有命名空间
        if self.prefix.is_empty() {
            warn!("empty namespace prefix, skipping cleanup");
            return Ok(());
        }
        let out = self.ip_checked(&["netns", "list"])?;
        let stale: Vec<String> = out
            .stdout
            .lines()
            .filter_map(|line| line.split_whitespace().next())
            .filter(|ns| ns.starts_with(&self.prefix))
            .map(str::to_string)
            .collect();
        for ns in &stale {
            info!(ns = %ns, "removing stale namespace");
            self.ip_checked(&["netns", "del", ns.as_str()])?;
        }
        Ok(())
    }

    fn add_node(&mut self, node: &Node) -> Result<(), EmuError> {
        let ns = self.ns_name(node.name());
        self.ip_checked(&["netns", "add", ns.as_str()])?;
        // 回环口失败不致命
        let lo_up: Vec<String> = ["ip", "link", "set", "lo", "up"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let lo = self.ns_exec(&ns, &lo_up)?;
        if !lo.success {
            warn!(ns = %ns, stderr = %lo.stderr.trim(), "failed to bring up loopback");
        }
        debug!(node = node.name(), ns = %ns, "created namespace");
        Ok(())
    }

    fn remove_node(&mut self, node: &Node) -> Result<(), EmuError> {
        let ns = self.ns_name(node.name());
        self.ip_checked(&["netns", "del", ns.as_str()])?;
        debug!(node = node.name(), ns = %ns, "deleted namespace");
        Ok(())
    }

    fn set_forwarding(&mut self, node: &Node, enabled: bool) -> Result<(), EmuError> {
        let ns = self.ns_name(node.name());
        let value = if enabled {
            "net.ipv4.ip_forward=1"
        } else {
            "net.ipv4.ip_forward=0"
        };
        self.ns_exec_checked(&ns, &["sysctl", "-w", value])?;
        Ok(())
    }

    fn add_link(&mut self, a: &Node, b: &Node, link: &Link) -> Result<(), LinkError> {
        let ns_a = self.ns_name(a.name());
        let ns_b = self.ns_name(b.name());
        let wrap = |source: EmuError| LinkError::Endpoint {
            a: link.a.intf.clone(),
            b: link.b.intf.clone(),
            source,
        };

        self.ip_checked(&[
            "link",
            "add",
            link.a.intf.as_str(),
            "netns",
            ns_a.as_str(),
            "type",
            "veth",
            "peer",
            "name",
            link.b.intf.as_str(),
            "netns",
            ns_b.as_str(),
        ])
        .map_err(wrap)?;

        let rate = link.rate_kbit();
        let a_cidr = format!("{}/{}", link.a.addr.ip(), link.a.addr.prefix());
        let b_cidr = format!("{}/{}", link.b.addr.ip(), link.b.addr.prefix());
        self.setup_endpoint(&ns_a, &link.a.intf, &a_cidr, rate)
            .map_err(wrap)?;
        self.setup_endpoint(&ns_b, &link.b.intf, &b_cidr, rate)
            .map_err(wrap)?;

        debug!(
            a = %link.a.intf,
            b = %link.b.intf,
            rate_kbit = rate,
            "veth link configured"
        );
        Ok(())
    }

    fn add_route(&mut self, route: &Route) -> Result<(), RouteInstallError> {
        let ns = self.ns_name(&route.node);
        let mut args = vec!["ip".to_string(), "route".into(), "add".into()];
        args.extend(route.ip_args());
        let out = self
            .ns_exec(&ns, &args)
            .and_then(|out| check_owned(&ns, &args, out))
            .map_err(|source| RouteInstallError::Backend {
                node: route.node.clone(),
                source,
            })?;
        trace!(node = %route.node, route = %route, stdout = %out.stdout.trim(), "route added");
        Ok(())
    }

    fn del_route(&mut self, route: &Route) -> Result<(), RouteInstallError> {
        let ns = self.ns_name(&route.node);
        let mut args = vec!["ip".to_string(), "route".into(), "del".into()];
        args.extend(route.ip_args());
        self.ns_exec(&ns, &args)
            .and_then(|out| check_owned(&ns, &args, out))
            .map_err(|source| RouteInstallError::Backend {
                node: route.node.clone(),
                source,
            })?;
        Ok(())
    }

    fn ping(&mut self, node: &Node, dst: Ipv4Addr) -> Result<PingStats, EmuError> {
        let ns = self.ns_name(node.name());
        let args: Vec<String> = ["ping", "-c", "1", "-W", "1", "-q"]
            .iter()
            .map(|s| s.to_string())
            .chain(std::iter::once(dst.to_string()))
            .collect();
        // ping 丢包时退出码非零，只看统计行
        let out = self.ns_exec(&ns, &args)?;
        PingStats::parse(&out.stdout).ok_or_else(|| EmuError::Command {
            command: format!("ip netns exec {ns} {}", args.join(" ")),
            stderr: out.stderr.trim().to_string(),
        })
    }

    fn exec(&mut self, node: &Node, args: &[String]) -> Result<String, EmuError> {
        let ns = self.ns_name(node.name());
        let out = self.ns_exec(&ns, args)?;
        let out = check_owned(&ns, args, out)?;
        Ok(out.stdout)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn render(program: &str, args: &[String]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{program} {}", args.join(" "))
    }
}

fn check(program: &str, args: &[&str], out: CommandOutput) -> Result<CommandOutput, EmuError> {
    if out.success {
        return Ok(out);
    }
    Err(EmuError::Command {
        command: format!("{program} {}", args.join(" ")),
        stderr: out.stderr.trim().to_string(),
    })
}

fn check_owned(ns: &str, args: &[String], out: CommandOutput) -> Result<CommandOutput, EmuError> {
    if out.success {
        return Ok(out);
    }
    Err(EmuError::Command {
        command: format!("ip netns exec {ns} {}", args.join(" ")),
        stderr: out.stderr.trim().to_string(),
    })
}
