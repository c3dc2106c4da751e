//! Triangle demo
//!
//! Opens a window and draws one vertex-colored triangle over a cornflower
//! blue background until the window is closed or Escape is pressed.
//!
//! Usage: `triangle [config.toml|config.ron]`

use frame_engine::foundation::logging;
use frame_engine::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC occurred: {panic_info}");

        if let Some(location) = panic_info.location() {
            eprintln!("Panic location: {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    let config = match std::env::args().nth(1) {
        Some(path) => ApplicationConfig::load_from_file(&path)?,
        None => ApplicationConfig::new("Triangle"),
    };

    logging::init_with_level(&config.engine.log_level);
    log::info!("Starting triangle demo ({}x{})", config.window.width, config.window.height);

    match Engine::run(&config) {
        Ok(reason) => {
            log::info!("Triangle demo finished: {reason:?}");
            Ok(())
        }
        Err(e) => {
            log::error!("Triangle demo failed: {e}");
            Err(e.into())
        }
    }
}
