use anyhow::Result;
use log::info;

use crate::{cli::ConfigArgs, config::ReconConfig};

pub fn execute(args: &ConfigArgs) -> Result<()> {
    let config = ReconConfig::default().with_preset(args.preset);
    match &args.output {
        Some(path) => {
            config.save(path)?;
            info!("Configuration written to {path:?}");
        }
        None => print!("{}", config.to_yaml_string()?),
    }
    Ok(())
}
