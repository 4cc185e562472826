pub mod comparator;
pub mod engine;
pub mod progress;
pub mod scanner;
pub mod transfer;

pub use comparator::{needs_transfer, FileComparator, Side};
pub use engine::{EnumerationPolicy, SyncConfig, SyncEngine};
pub use progress::ProgressSink;
pub use scanner::{FileScanner, FileSet, DENYLIST};
pub use transfer::{format_size_mb, order_by_modified, TransferScheduler};
