//! 网络模型模块
//!
//! 此模块包含静态网络模型：节点、接口、链路、静态路由与转发表。

// 子模块声明
mod addr;
mod fib;
mod id;
mod link;
mod node;
mod route;
mod spec;
mod topology;

// 重新导出公共接口
pub use addr::{Destination, is_assignable, parse_cidr, parse_ip, same_subnet, subnet_of};
pub use fib::{Fib, FibEntry};
pub use id::{LinkId, NodeId};
pub use link::{Endpoint, Link};
pub use node::{Capability, Interface, Node, NodeRole};
pub use route::Route;
pub use spec::{EndpointSpec, LinkSpec, NodeSpec, RouteSpec, TopologySpec};
pub use topology::{MAX_BW_MBPS, MAX_IFNAME_LEN, Topology};
