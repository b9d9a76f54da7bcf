//! Corsair lighting plugin
//!
//! Serves `corsair_*` commands over stdin/stdout through the LED backend.

use plugmsg::launcher::launch;
use plugmsg::lighting::LightingPlugin;
use plugmsg::lighting::led::LedBackend;
use plugmsg::lighting::simulated::SimulatedSdk;
use std::process::ExitCode;

const PLUGIN_NAME: &str = "corsair-plugin";

fn main() -> ExitCode {
    launch(PLUGIN_NAME, |config| {
        let sdk = SimulatedSdk::from_config(&config.simulation);
        let backend = LedBackend::new(sdk, config.lighting.connect_attempt_limit);
        LightingPlugin::new(PLUGIN_NAME, backend, &config.lighting)
    })
}
