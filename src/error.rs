//! 错误类型
//!
//! 所有错误对一次运行都是致命的：一旦出错，拓扑会被拆除，进程以非零码退出。

use std::net::Ipv4Addr;

use thiserror::Error;

/// 拓扑构建期（描述符校验）错误
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid address '{input}': {reason}")]
    InvalidAddress { input: String, reason: String },

    #[error("duplicate node '{0}'")]
    DuplicateNode(String),

    #[error("unknown node '{0}'")]
    UnknownNode(String),

    #[error("node '{node}' already has an interface named '{intf}'")]
    DuplicateInterface { node: String, intf: String },

    #[error("interface name '{0}' must be 1..=15 bytes")]
    InvalidInterfaceName(String),

    #[error("address {addr} is assigned to both {first} and {second}")]
    DuplicateAddress {
        addr: Ipv4Addr,
        first: String,
        second: String,
    },

    #[error("link {a} <-> {b} connects node '{node}' to itself")]
    SelfLink { node: String, a: String, b: String },

    #[error("link {a} <-> {b}: bandwidth must be in (0, 100000] Mbps, got {bw_mbps}")]
    InvalidBandwidth { a: String, b: String, bw_mbps: f64 },

    #[error("link {a} <-> {b}: endpoint {addr} is outside subnet {subnet}")]
    OutsideSubnet {
        a: String,
        b: String,
        addr: String,
        subnet: String,
    },

    #[error("route on '{node}': {reason}")]
    InvalidRoute { node: String, reason: String },
}

/// 链路端点创建失败
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("link {a} <-> {b}: {source}")]
    Endpoint {
        a: String,
        b: String,
        #[source]
        source: EmuError,
    },

    #[error("link {a} <-> {b}: node '{node}' has not been created")]
    MissingNode { a: String, b: String, node: String },
}

/// 静态路由安装失败
#[derive(Debug, Error)]
pub enum RouteInstallError {
    #[error("{node}: no interface '{dev}'")]
    UnknownInterface { node: String, dev: String },

    #[error("{node}: next hop {via} is not reachable through {dev}")]
    NextHopUnreachable {
        node: String,
        via: Ipv4Addr,
        dev: String,
    },

    #[error("{node}: route to {dst} already exists")]
    Exists { node: String, dst: String },

    #[error("{node}: no route to {dst}")]
    NotFound { node: String, dst: String },

    #[error("{node}: {source}")]
    Backend {
        node: String,
        #[source]
        source: EmuError,
    },
}

/// 仿真后端执行错误
#[derive(Debug, Error)]
pub enum EmuError {
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command failed: {command}\n{stderr}")]
    Command { command: String, stderr: String },

    #[error("unknown node '{0}'")]
    UnknownNode(String),

    #[error("node '{0}' already exists")]
    NodeExists(String),

    #[error("unsupported command in {backend} backend: {command}")]
    Unsupported { backend: &'static str, command: String },
}

/// crate 级错误
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Route(#[from] RouteInstallError),

    #[error(transparent)]
    Emu(#[from] EmuError),

    #[error("session is not running")]
    NotRunning,

    #[error("session is already running")]
    AlreadyRunning,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid topology JSON: {0}")]
    Json(#[from] serde_json::Error),
}
