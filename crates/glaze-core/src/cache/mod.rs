//! Bounded caches for baked LUTs and rendered previews.

pub mod bounded;
pub mod fingerprint;
pub mod lut_cache;
pub mod preview;

pub use bounded::CacheStats;
pub use fingerprint::Fingerprint;
pub use lut_cache::{LutCache, LutCaches, LutHandle, LutKey};
pub use preview::{PreviewKey, PreviewResultCache};
