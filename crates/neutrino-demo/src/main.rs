mod geometry;
mod host;

use anyhow::Result;

use neutrino_bridge::device::GpuInit;
use neutrino_bridge::logging::{init_logging, LoggingConfig};
use neutrino_bridge::window::{Runtime, RuntimeConfig};

use crate::host::DemoHost;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = RuntimeConfig {
        title: "neutrino demo".to_string(),
        ..RuntimeConfig::default()
    };

    Runtime::run(config, GpuInit::default(), DemoHost::new())
}
