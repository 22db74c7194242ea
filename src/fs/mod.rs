pub mod listing;

pub use listing::{FileEntryProvider, WalkDirProvider, DEFAULT_IGNORE_PATTERNS};
