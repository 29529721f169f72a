//! Synchronization Module
//!
//! Concurrency building blocks used by the object registry.
//!
//! - [`FairLock`]: reader/writer lock whose writers can yield to readers
//! - [`ConcurrentPool`]: two-generation map with lock-free steady-state reads
//! - [`ResolveGate`]: lets a delete wait for borrows already resolving

mod fair_lock;
mod gate;
mod pool;

pub use fair_lock::{FairLock, FairReadGuard, FairWriteGuard};
pub use gate::{GateTicket, ResolveGate};
pub use pool::ConcurrentPool;
