//! `iamusersync config`: print the configuration a run would use.

use anyhow::{Context, Result};
use clap::Args;

use super::ConfigArgs;
use crate::logging;

#[derive(Args, Debug)]
pub struct ConfigCommandArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

impl ConfigCommandArgs {
    pub fn run(self) -> Result<()> {
        logging::init_stderr();
        let config = self.config.resolve()?;
        let yaml = serde_yaml::to_string(&config).context("failed to serialize configuration")?;
        print!("{yaml}");
        Ok(())
    }
}
