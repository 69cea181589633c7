//! Process-wide `env_logger` setup for the shell binary and tests.

use std::sync::Once;

use env_logger::Builder;
use log::LevelFilter;

static INIT: Once = Once::new();

/// Install the logger on first call; later calls do nothing.
///
/// Other crates log at `Info`. The table itself logs every operation at
/// `trace` and every resize at `debug`, so it defaults to `Warn`, which keeps
/// allocation failures visible. `RUST_LOG` overrides both, e.g.
/// `RUST_LOG=chained_htable=debug`.
pub fn init_logger() {
    INIT.call_once_force(|_| {
        let mut builder = Builder::new();
        builder
            .filter_level(LevelFilter::Info)
            .filter_module("chained_htable::chain_table", LevelFilter::Warn)
            .format_timestamp_millis()
            .parse_default_env();

        // The embedding program may have installed its own logger.
        if builder.try_init().is_err() {
            log::debug!("logger already installed, keeping it");
        }
    });
}
