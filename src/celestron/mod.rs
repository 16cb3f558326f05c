//! Everything that speaks NexStar: byte-level encodings, the typed command
//! set, the serial and simulator transports, and the telescope driver
//! built on top of them.

mod driver;
mod protocol;
mod serial;
mod simulator;
pub(crate) mod wire;

pub use driver::{model_name, CelestronTelescope};
pub use protocol::{Channel, NexStar};
pub use serial::SerialChannel;
pub use simulator::Simulator;
