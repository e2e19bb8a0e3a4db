//! Dependency injection infrastructure.
//!
//! Compile-time resolution through the `FromRef` trait and the derive
//! macros from `di-macros`:
//!
//! - `FromRef<T>`: extract a value from a reference to `T`
//! - `#[derive(Context)]`: make each field of the root context extractable
//! - `#[derive(FromContext)]`: build a service from its fields' `FromRef` impls
//!
//! ```ignore
//! let ctx = AppContext::new(config, Arc::new(DumpOnlyStorage));
//! let service = StorageService::from_ref(&ctx);
//! ```

/// Extracts a value from a reference to another type.
pub trait FromRef<T> {
    fn from_ref(input: &T) -> Self;
}

/// Any Clone type can be extracted from itself.
impl<T: Clone> FromRef<T> for T {
    fn from_ref(input: &T) -> Self {
        input.clone()
    }
}

pub use di_macros::{Context, FromContext};
