//! Generic concurrency primitives shared by the simulation core's scheduler
//! policies: a persistent round-dispatch worker pool and the count-down
//! latch it's built from.

pub mod pool;
pub mod sync;

pub use pool::WorkerPool;
