//! The three backing stores, fastest first.
//!
//! | Tier   | Latency | Durability        | Shared across nodes |
//! |--------|---------|-------------------|---------------------|
//! | Memory | <1µs    | process lifetime  | no                  |
//! | File   | ~100µs  | survives restarts | no                  |
//! | Remote | ~1ms    | Redis persistence | yes                 |

pub mod file;
pub mod memory;
pub mod remote;

pub use file::FileTier;
pub use memory::MemoryTier;
pub use remote::RemoteTier;
