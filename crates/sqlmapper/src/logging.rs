//! Process-wide logger init (SPEC_FULL.md §2.1). Every module logs through
//! the `log` facade (`log::debug!`/`log::warn!`, see e.g. `result_mapper`'s
//! eager-nested-query notice); this just wires a backend once per process
//! so a host application that doesn't set up its own logger still sees
//! output, controlled by `RUST_LOG` the usual way.

use std::sync::Once;

static INIT: Once = Once::new();

/// Installs an `env_logger` backend the first time it's called; later calls
/// are no-ops, so library code can call this defensively without
/// double-initializing a host application's own logger.
pub fn init() {
    INIT.call_once(|| {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    });
}
