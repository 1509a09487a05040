//! Client implementations
//!
//! Contains MemoryClient, LogClient, FileClient, RecorderClient, and MockClient.

mod file;
mod log;
mod memory;
mod mock;
mod recorder;

pub use self::file::FileClient;
pub use self::log::LogClient;
pub use self::memory::MemoryClient;
pub use self::mock::{MockCall, MockClient};
pub use self::recorder::RecorderClient;
