//! annex-extension-api - Extension API for the annex extensibility engine
//!
//! This crate provides the traits and types needed to write code units that
//! contribute behavior to named extension points. A unit is a dynamic
//! library placed under `extensions/<kind>/<point>/` inside a plugin
//! directory; it declares what it contributes through [`export_unit!`].
//!
//! # Example
//!
//! ```ignore
//! use annex_extension_api::{
//!     Extension, ExtensionContext, ExtensionError, UnitExport, async_trait, export_unit,
//! };
//!
//! #[derive(Default)]
//! pub struct MemoryInit;
//!
//! #[async_trait]
//! impl Extension for MemoryInit {
//!     async fn execute(&mut self, ctx: &mut ExtensionContext) -> Result<(), ExtensionError> {
//!         ctx.log_info("memory ready");
//!         Ok(())
//!     }
//! }
//!
//! export_unit!(UnitExport::extension::<MemoryInit>("MemoryInit"));
//! ```

pub mod context;
pub mod deferred;
pub mod error;
pub mod types;
pub mod unit;

pub use async_trait::async_trait;
pub use context::{ExtensionContext, LogSink, TracingSink};
pub use deferred::{
    Consumption, DeferredCompletion, DeferredConfig, DeferredHandle, DeferredOutcome,
    DeferredSlot, DeferredSpawner, DeferredTasks, DeferredWork, TokioSpawner, UnitGuard,
    is_delayed_mode_enabled,
};
pub use error::{DeferredError, ExtensionError};
pub use types::PluginManifest;
pub use unit::{Capability, ExtensionFactory, UnitExport};

/// Current unit API version. Units must match this exactly.
/// This is checked before a unit's exports are read.
pub const API_VERSION: u32 = 1;

/// The base capability every dispatched contribution implements.
///
/// A contribution is instantiated fresh for each dispatch and receives the
/// dispatch's shared context. Contributions at the same point run strictly
/// one after another, so a contribution may leave notes in the context for
/// the ones that follow it.
#[async_trait]
pub trait Extension: Send {
    /// Run this contribution against the shared dispatch context.
    async fn execute(&mut self, ctx: &mut ExtensionContext) -> Result<(), ExtensionError>;
}

/// Export the contributions of a code unit for dynamic loading.
///
/// Exports are listed in declaration order. The loader walks them in reverse
/// and takes the last qualifying one (or all of them when configured to), so
/// a re-exported base capability listed first is never picked over the
/// unit's own type.
///
/// # Usage
///
/// ```ignore
/// annex_extension_api::export_unit!(
///     UnitExport::base(Capability::EXTENSION),
///     UnitExport::extension::<RecallWait>("RecallWait"),
/// );
/// ```
///
/// # Generated Functions
///
/// - `_annex_unit_api_version()`: Returns the API version
/// - `_annex_unit_exports()`: Returns the boxed export list, or null if
///   building it panicked
#[macro_export]
macro_rules! export_unit {
    ($($export:expr),* $(,)?) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn _annex_unit_api_version() -> u32 {
            $crate::API_VERSION
        }

        #[unsafe(no_mangle)]
        #[allow(improper_ctypes_definitions)]
        pub extern "C" fn _annex_unit_exports() -> *mut ::std::vec::Vec<$crate::UnitExport> {
            // Unwinding out of an extern "C" fn aborts, so a panic becomes null
            match ::std::panic::catch_unwind(|| -> ::std::vec::Vec<$crate::UnitExport> {
                vec![$($export),*]
            }) {
                Ok(exports) => ::std::boxed::Box::into_raw(::std::boxed::Box::new(exports)),
                Err(_) => ::std::ptr::null_mut(),
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_version_is_set() {
        assert_eq!(API_VERSION, 1);
    }

    #[test]
    fn test_extension_trait_is_object_safe() {
        // This compiles only if Extension is object-safe
        fn _takes_boxed_extension(_: Box<dyn Extension>) {}
    }
}
