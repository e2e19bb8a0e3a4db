//! Services over network managers.
//!
//! Services are resolved from the [`AppContext`](crate::context::AppContext)
//! with the `FromContext` derive.

mod storage;

pub use storage::StorageService;
