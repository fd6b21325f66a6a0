mod network;
mod process;
mod syscall;

pub use network::*;
pub use process::*;
pub use syscall::*;
