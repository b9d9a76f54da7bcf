//! Logitech lighting plugin
//!
//! Serves `logi_*` commands over stdin/stdout. Lighting goes through the
//! zone backend; the SDK is the in-memory simulation configured in the
//! `[simulation]` section.

use plugmsg::launcher::launch;
use plugmsg::lighting::LightingPlugin;
use plugmsg::lighting::simulated::SimulatedSdk;
use plugmsg::lighting::zone::ZoneBackend;
use std::process::ExitCode;

const PLUGIN_NAME: &str = "logiled-plugin";

fn main() -> ExitCode {
    launch(PLUGIN_NAME, |config| {
        let sdk = SimulatedSdk::from_config(&config.simulation);
        let backend = ZoneBackend::new(sdk, config.lighting.max_zones);
        LightingPlugin::new(PLUGIN_NAME, backend, &config.lighting)
    })
}
