//! 一次完整运行
//!
//! 清理遗留 -> 启动 -> (安装路由 -> 全连通扫描 -> 交互) 或 直连检查 -> 拆除。
//! 任一步出错都会先拆除网络再返回错误。

use std::io::{BufRead, Write};

use tracing::{info, warn};

use crate::Error;
use crate::cli::interactive;
use crate::emu::Session;
use crate::probe::{ProbeResult, SweepReport, neighbor_checks, ping_all, run_checks};

/// 运行选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOpts {
    /// 安装静态路由并做全连通扫描；否则只做直连检查
    pub with_routes: bool,
    /// 扫描后进入交互式会话
    pub interactive: bool,
    /// 启动前清理上次运行的遗留
    pub cleanup: bool,
}

impl Default for RunOpts {
    fn default() -> Self {
        Self {
            with_routes: false,
            interactive: false,
            cleanup: true,
        }
    }
}

/// 运行结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub checks: Vec<ProbeResult>,
    pub sweep: Option<SweepReport>,
    pub routes_installed: usize,
}

/// 执行一次运行，结果写到 `out`，交互命令从 `input` 读取
pub fn run<R: BufRead, W: Write>(
    session: &mut Session,
    opts: &RunOpts,
    input: R,
    out: &mut W,
) -> Result<RunReport, Error> {
    if opts.cleanup {
        session.cleanup()?;
    }
    session.start()?;

    let result = exercise(session, opts, input, out);
    let stopped = session.stop();
    let report = result?;
    stopped?;
    info!(
        checks = report.checks.len(),
        routes = report.routes_installed,
        "run finished"
    );
    Ok(report)
}

fn exercise<R: BufRead, W: Write>(
    session: &mut Session,
    opts: &RunOpts,
    input: R,
    out: &mut W,
) -> Result<RunReport, Error> {
    let mut report = RunReport::default();
    if opts.with_routes {
        report.routes_installed = session.install_routes()?;
        let sweep = ping_all(session)?;
        writeln!(out, "{sweep}")?;
        report.sweep = Some(sweep);
        if opts.interactive {
            interactive(session, input, out)?;
        }
    } else {
        if opts.interactive {
            warn!("interactive session is only available with routes, ignoring");
        }
        let probes = neighbor_checks(session.topology());
        let results = run_checks(session, &probes)?;
        for result in &results {
            writeln!(out, "{result}")?;
        }
        report.checks = results;
    }
    out.flush()?;
    Ok(report)
}
