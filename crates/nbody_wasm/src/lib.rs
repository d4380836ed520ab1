//! WASM bridge exposing `nbody_core` simulations to a JavaScript front end.
//!
//! The front end owns all plotting and animation; this crate only runs the core and hands back
//! plain arrays.

pub mod system;

pub use system::WasmSimulation;

/// Routes panics and `log` records to the browser console. Safe to call more than once.
pub(crate) fn init_logging() {
    console_error_panic_hook::set_once();
    #[cfg(target_arch = "wasm32")]
    {
        // A second call fails because a logger is already set; that is fine.
        let _ = console_log::init_with_level(log::Level::Info);
    }
}
