pub mod error;
pub mod types;
pub mod clock;
pub mod availability;
pub mod condition;
pub mod config;
pub mod store;
mod table;
pub mod memory;
pub mod wal;
pub mod disk;

pub use error::{Error, Result};
pub use types::*;
pub use clock::{Clock, FixedClock, SystemClock};
pub use availability::{is_available, Availability};
pub use condition::{Condition, Field, Mutation, Operand};
pub use config::StoreConfig;
pub use store::{ConditionalUpdate, PasteStore, StoreStats};
pub use memory::MemoryStore;
pub use disk::DiskStore;
