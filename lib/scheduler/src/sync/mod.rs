mod count_down_latch;

pub use count_down_latch::{build_count_down_latch, LatchCounter, LatchWaiter};
