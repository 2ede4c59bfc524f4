//! 连通性探测
//!
//! 探测严格串行：一次一个 echo 请求，按声明顺序执行。

use std::fmt;
use std::net::Ipv4Addr;

use tracing::{debug, info};

use crate::Error;
use crate::emu::Session;
use crate::net::Topology;

/// 一次 ping 的统计
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingStats {
    pub transmitted: u32,
    pub received: u32,
}

impl PingStats {
    /// 解析 ping 的统计行：`1 packets transmitted, 1 received, 0% packet loss, time 0ms`
    pub fn parse(output: &str) -> Option<Self> {
        output.lines().find_map(|line| {
            let (tx, rest) = line.split_once(" packets transmitted, ")?;
            let transmitted = tx.trim().parse().ok()?;
            let rx = rest.split_whitespace().next()?;
            let received = rx.parse().ok()?;
            Some(Self {
                transmitted,
                received,
            })
        })
    }

    pub fn success(&self) -> bool {
        self.transmitted > 0 && self.received == self.transmitted
    }

    /// 丢包率（百分比，向下取整）
    pub fn loss_pct(&self) -> u32 {
        if self.transmitted == 0 {
            return 100;
        }
        let lost = self.transmitted.saturating_sub(self.received);
        lost * 100 / self.transmitted
    }
}

impl fmt::Display for PingStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} packets transmitted, {} received, {}% packet loss",
            self.transmitted,
            self.received,
            self.loss_pct()
        )
    }
}

/// 一条探测：从 `from` ping `dst`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub label: String,
    pub from: String,
    pub dst: Ipv4Addr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub probe: Probe,
    pub stats: PingStats,
}

impl fmt::Display for ProbeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.probe.label, self.stats)
    }
}

/// 直连检查：每个节点 ping 自己每个接口的链路对端
///
/// 先主机后路由器，组内按声明顺序，节点内按接口顺序。
pub fn neighbor_checks(topo: &Topology) -> Vec<Probe> {
    let mut probes = Vec::new();
    for node in topo.hosts().chain(topo.routers()) {
        for intf in node.interfaces() {
            let link = topo.link(intf.link);
            let Some(peer) = link.peer_of(node.id()) else {
                continue;
            };
            let peer_name = topo.node(peer.node).name();
            probes.push(Probe {
                label: format!("{}-{}", node.name(), peer_name),
                from: node.name().to_string(),
                dst: peer.addr.ip(),
            });
        }
    }
    probes
}

/// 依次执行探测
pub fn run_checks(session: &mut Session, probes: &[Probe]) -> Result<Vec<ProbeResult>, Error> {
    let mut results = Vec::with_capacity(probes.len());
    for probe in probes {
        let stats = session.ping(&probe.from, probe.dst)?;
        debug!(label = %probe.label, dst = %probe.dst, received = stats.received, "probe done");
        results.push(ProbeResult {
            probe: probe.clone(),
            stats,
        });
    }
    Ok(results)
}

/// 全连通扫描中的一对节点
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairOutcome {
    pub from: String,
    pub to: String,
    pub dst: Ipv4Addr,
    pub stats: PingStats,
}

/// 全连通扫描结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// 节点名自然序
    pub order: Vec<String>,
    pub pairs: Vec<PairOutcome>,
}

impl SweepReport {
    pub fn sent(&self) -> u32 {
        self.pairs.iter().map(|p| p.stats.transmitted).sum()
    }

    pub fn received(&self) -> u32 {
        self.pairs.iter().map(|p| p.stats.received).sum()
    }

    /// 丢包率（百分比，向下取整）
    pub fn dropped_pct(&self) -> u32 {
        PingStats {
            transmitted: self.sent(),
            received: self.received(),
        }
        .loss_pct()
    }

    pub fn outcome(&self, from: &str, to: &str) -> Option<&PairOutcome> {
        self.pairs.iter().find(|p| p.from == from && p.to == to)
    }
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "*** Ping: testing ping reachability")?;
        for from in &self.order {
            write!(f, "{from} ->")?;
            for pair in self.pairs.iter().filter(|p| &p.from == from) {
                if pair.stats.success() {
                    write!(f, " {}", pair.to)?;
                } else {
                    f.write_str(" X")?;
                }
            }
            writeln!(f)?;
        }
        write!(
            f,
            "*** Results: {}% dropped ({}/{} received)",
            self.dropped_pct(),
            self.received(),
            self.sent()
        )
    }
}

/// 节点名的自然序：字母前缀相同时按末尾数字比较（`r2` < `r10`）
pub(crate) fn natural_key(name: &str) -> (&str, Option<u64>, &str) {
    let stem = name.trim_end_matches(|c: char| c.is_ascii_digit());
    (stem, name[stem.len()..].parse().ok(), name)
}

/// 全连通扫描：每个节点 ping 其他每个节点的主地址
///
/// 节点按名字自然序排列（`h1 h2 r1 r2 ...`）。
pub fn ping_all(session: &mut Session) -> Result<SweepReport, Error> {
    let mut targets: Vec<(String, Option<Ipv4Addr>)> = session
        .topology()
        .nodes()
        .iter()
        .map(|n| (n.name().to_string(), n.primary_addr()))
        .collect();
    targets.sort_by(|(a, _), (b, _)| natural_key(a).cmp(&natural_key(b)));

    let mut report = SweepReport {
        order: targets.iter().map(|(name, _)| name.clone()).collect(),
        pairs: Vec::new(),
    };
    for (from, _) in &targets {
        for (to, addr) in &targets {
            if from == to {
                continue;
            }
            let Some(dst) = *addr else {
                continue;
            };
            let stats = session.ping(from, dst)?;
            report.pairs.push(PairOutcome {
                from: from.clone(),
                to: to.clone(),
                dst,
                stats,
            });
        }
    }
    info!(
        sent = report.sent(),
        received = report.received(),
        dropped_pct = report.dropped_pct(),
        "ping sweep finished"
    );
    Ok(report)
}
