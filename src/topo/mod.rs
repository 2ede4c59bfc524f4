//! 拓扑构建

pub mod four_router;
