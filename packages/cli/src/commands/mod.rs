pub mod init;
pub mod replay;
pub mod serve;
pub mod simulate;

pub use init::{init, InitArgs};
pub use replay::{replay, ReplayArgs};
pub use serve::{serve, ServeArgs};
pub use simulate::{simulate, SimulateArgs};
