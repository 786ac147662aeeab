//! Logging setup. The engine itself only calls `log::{info,warn}`; wiring
//! up a subscriber is left to the binary, not the library.

/// Initialize the default `env_logger` subscriber from `RUST_LOG` (falling
/// back to `info` so a binary that forgets to set the variable still sees
/// engine lifecycle and warning logs).
pub fn init() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();
}
