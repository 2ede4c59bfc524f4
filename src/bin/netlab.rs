//! 四路由器实验网络
//!
//! 搭建 4 路由器 + 2 主机的拓扑并做连通性检查，`--routes` 时安装静态路由做全连通扫描。

use clap::{Parser, ValueEnum};
use netlab_rs::Error;
use netlab_rs::emu::{Backend, DEFAULT_NS_PREFIX, ModelBackend, NetnsBackend, Session, SystemRunner};
use netlab_rs::net::Topology;
use netlab_rs::run::{RunOpts, run};
use netlab_rs::topo::four_router::{FourRouterOpts, build_four_router};
use std::fs;
use std::io;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackendKind {
    /// Linux 网络命名空间（需要 root 或 --sudo）
    Netns,
    /// 内存仿真，无需特权
    Model,
}

#[derive(Debug, Parser)]
#[command(name = "netlab", about = "四路由器实验网络：直连检查或静态路由全连通扫描")]
struct Args {
    /// 安装静态路由并做全连通扫描
    #[arg(long)]
    routes: bool,

    #[arg(long, value_enum, default_value_t = BackendKind::Netns)]
    backend: BackendKind,

    /// 用 sudo 执行系统命令
    #[arg(long)]
    sudo: bool,

    /// 命名空间名前缀
    #[arg(long, default_value = DEFAULT_NS_PREFIX, value_parser = parse_ns_prefix)]
    ns_prefix: String,

    /// 自定义拓扑描述（JSON）
    #[arg(long)]
    topology: Option<PathBuf>,

    /// 打印拓扑描述后退出
    #[arg(long)]
    dump_topology: bool,

    /// 扫描结束后进入交互式会话（从 stdin 读命令）
    #[arg(long)]
    interactive: bool,

    /// 启动前不清理上次运行的遗留
    #[arg(long)]
    skip_cleanup: bool,

    /// 日志级别；设置了 RUST_LOG 时以 RUST_LOG 为准
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn parse_ns_prefix(raw: &str) -> Result<String, String> {
    if raw.is_empty() {
        return Err("namespace prefix must not be empty".to_string());
    }
    Ok(raw.to_string())
}

fn load_topology(args: &Args) -> Result<Topology, Error> {
    match &args.topology {
        Some(path) => {
            let raw = fs::read_to_string(path)?;
            Topology::from_json(&raw)
        }
        None => Ok(build_four_router(&FourRouterOpts {
            with_routes: args.routes,
        })?),
    }
}

fn real_main(args: Args) -> Result<(), Error> {
    let topo = load_topology(&args)?;

    if args.dump_topology {
        let json = serde_json::to_string_pretty(&topo.to_spec())?;
        println!("{json}");
        return Ok(());
    }

    let backend: Box<dyn Backend> = match args.backend {
        BackendKind::Netns => Box::new(NetnsBackend::new(
            Box::new(SystemRunner::new(args.sudo)),
            args.ns_prefix.clone(),
        )),
        BackendKind::Model => Box::new(ModelBackend::new()),
    };
    let mut session = Session::new(topo, backend);

    let opts = RunOpts {
        with_routes: args.routes,
        interactive: args.interactive,
        cleanup: !args.skip_cleanup,
    };
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    run(&mut session, &opts, stdin.lock(), &mut stdout)?;
    Ok(())
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .with_writer(io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    if let Err(err) = real_main(args) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
