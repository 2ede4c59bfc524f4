pub mod cli;
pub mod emu;
pub mod error;
pub mod net;
pub mod probe;
pub mod run;
pub mod topo;

pub use error::{ConfigError, EmuError, Error, LinkError, RouteInstallError};

#[cfg(test)]
mod test;
