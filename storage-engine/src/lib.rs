pub mod memory_kv;
pub mod vclock;

pub use memory_kv::{Fault, MemoryKv, Operation};
pub use vclock::{Dot, VClock};
