//! Project tree scanning: one bounded walk, one immutable snapshot.

pub mod scanner;
pub mod signal;

pub use scanner::{ScanConfig, Scanner};
pub use signal::{ProjectSignal, ScanSnapshot, SignalRole};
