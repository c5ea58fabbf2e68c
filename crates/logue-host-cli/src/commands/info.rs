//! Print what a unit declares.

use std::path::PathBuf;

use clap::Args;
use logue_host::{HostConfig, Module, Session};

use super::Outcome;

#[derive(Args)]
pub struct InfoArgs {
    /// Unit shared library (.drmlgunit / .so)
    #[arg(value_name = "UNIT")]
    unit: PathBuf,
}

pub fn run(args: InfoArgs) -> anyhow::Result<Outcome> {
    let module = Module::load(&args.unit).map_err(logue_host::Error::from)?;
    let supports_presets = module.supports_presets();

    // Initializing lets string-valued parameters render their labels.
    let session = match Session::open(module, &HostConfig::default()) {
        Ok(session) => session,
        Err(err) => return Err(logue_host::Error::from(err).into()),
    };
    if let Some(info) = session.describe() {
        println!("{info}");
    }

    if supports_presets {
        let unit = session.instance();
        let count = session.descriptor().map_or(0, |d| d.num_presets.min(256));
        println!("Presets:");
        for index in 0..count {
            let name = unit.preset_name(index as u8).map_err(logue_host::Error::from)?;
            println!("  [{index:3}] {}", name.as_deref().unwrap_or("<null>"));
        }
    }

    session.close().map_err(logue_host::Error::from)?;
    Ok(Outcome::Success)
}
