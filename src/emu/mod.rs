//! 仿真后端模块
//!
//! 把静态拓扑落地为可运行的网络：后端接口、节点生命周期钩子、
//! 两种后端实现（Linux 网络命名空间、内存模型）以及持有它们的会话。

mod backend;
mod model;
mod netns;
mod session;

pub use backend::{Backend, ForwardingHook, NodeHook, hooks_for};
pub use model::{HopOutcome, ModelBackend, Trace};
pub use netns::{CommandOutput, CommandRunner, DEFAULT_NS_PREFIX, NetnsBackend, SystemRunner};
pub use session::Session;
