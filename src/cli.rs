//! 交互式会话
//!
//! 按行读取命令，作用于一个已启动的 [`Session`]。`<node> <cmd...>` 在节点内执行命令，
//! 其余为内置命令。遇到 EOF 或 `exit` 结束。

use std::io::{BufRead, Write};

use tracing::debug;

use crate::Error;
use crate::emu::Session;
use crate::net::Destination;
use crate::probe::ping_all;

const HELP: &str = "\
commands:
  help                 show this message
  nodes                list nodes
  links                list links
  net                  list each node's interfaces and peers
  routes <node>        list installed static routes of a node
  delroute <node> <dst>  remove an installed static route
  pingall              ping between every pair of nodes
  <node> <cmd...>      run a command inside a node
  exit | quit          leave the session
";

/// 运行交互式会话直到输入结束
pub fn interactive<R: BufRead, W: Write>(
    session: &mut Session,
    input: R,
    out: &mut W,
) -> Result<(), Error> {
    write!(out, "netlab> ")?;
    out.flush()?;
    for line in input.lines() {
        let line = line?;
        let words: Vec<&str> = line.split_whitespace().collect();
        debug!(line = %line, "cli command");
        match words.as_slice() {
            [] => {}
            ["exit"] | ["quit"] => break,
            ["help"] => out.write_all(HELP.as_bytes())?,
            ["nodes"] => {
                let names: Vec<&str> = session
                    .topology()
                    .nodes()
                    .iter()
                    .map(|n| n.name())
                    .collect();
                writeln!(out, "available nodes are: {}", names.join(" "))?;
            }
            ["links"] => {
                for link in session.topology().links() {
                    writeln!(
                        out,
                        "{}<->{} ({} Mbit/s)",
                        link.a.intf, link.b.intf, link.bw_mbps
                    )?;
                }
            }
            ["net"] => {
                let topo = session.topology();
                for node in topo.nodes() {
                    write!(out, "{}", node.name())?;
                    for intf in node.interfaces() {
                        let link = topo.link(intf.link);
                        if let Some(peer) = link.peer_of(node.id()) {
                            write!(out, " {}:{}", intf.name, peer.intf)?;
                        }
                    }
                    writeln!(out)?;
                }
            }
            ["routes", node] => {
                let routes: Vec<String> = session
                    .installed_routes()
                    .iter()
                    .filter(|r| r.node == *node)
                    .map(|r| r.to_string())
                    .collect();
                for route in routes {
                    writeln!(out, "{route}")?;
                }
            }
            ["delroute", node, dst] => match dst.parse::<Destination>() {
                Ok(dst) => match session.remove_route(node, &dst) {
                    Ok(route) => writeln!(out, "removed {node}: {route}")?,
                    Err(err) => writeln!(out, "*** {err}")?,
                },
                Err(err) => writeln!(out, "*** {err}")?,
            },
            ["pingall"] => {
                let report = ping_all(session)?;
                writeln!(out, "{report}")?;
            }
            [node, rest @ ..] if session.topology().node_by_name(node).is_some() => {
                if rest.is_empty() {
                    writeln!(out, "*** usage: {node} <cmd...>")?;
                } else {
                    let args: Vec<String> = rest.iter().map(|s| s.to_string()).collect();
                    // 单条命令失败不结束会话
                    match session.exec(node, &args) {
                        Ok(stdout) => out.write_all(stdout.as_bytes())?,
                        Err(err) => writeln!(out, "*** {err}")?,
                    }
                }
            }
            [other, ..] => writeln!(out, "*** unknown command: {other}")?,
        }
        write!(out, "netlab> ")?;
        out.flush()?;
    }
    writeln!(out)?;
    Ok(())
}
