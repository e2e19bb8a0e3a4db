//! Compile-time dependency injection for VidiGraph.
//!
//! - `#[derive(Context)]` makes each field of a root context extractable.
//! - `#[derive(FromContext)]` builds a service by extracting its fields.
//!
//! Generated code refers to `crate::FromRef`, which the consuming crate
//! re-exports at its root.

use proc_macro::TokenStream;

mod context;
mod fields;
mod from_context;

/// Generates `impl FromRef<Ctx> for FieldType` for every field.
///
/// Field types must be `Clone` and distinct.
///
/// ```ignore
/// #[derive(Context, Clone)]
/// pub struct AppContext {
///     pub config: Arc<Config>,
///     pub storage: Arc<dyn NetworkStorage>,
/// }
/// ```
#[proc_macro_derive(Context)]
pub fn derive_context(input: TokenStream) -> TokenStream {
    context::derive_context_impl(input)
}

/// Generates `impl FromRef<Ctx> for Service`, resolving each field with
/// `FromRef`.
///
/// The context defaults to `AppContext`; override it with
/// `#[from_context(Context = "OtherContext")]`.
///
/// ```ignore
/// #[derive(FromContext, Clone)]
/// pub struct StorageService {
///     config: Arc<Config>,
///     storage: Arc<dyn NetworkStorage>,
/// }
/// ```
#[proc_macro_derive(FromContext, attributes(from_context))]
pub fn derive_from_context(input: TokenStream) -> TokenStream {
    from_context::derive_from_context_impl(input)
}
