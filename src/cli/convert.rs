use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use nwb2bids::context::RunContext;
use nwb2bids::dataset::DatasetConverter;
use nwb2bids::nwb::default_reader;

use super::{finish, RunArgs};

/// Convert local NWB files to BIDS
pub fn run(paths: Vec<PathBuf>, args: RunArgs) -> Result<()> {
    let (config, silent) = args.resolve()?;

    info!("nwb2bids - NWB to BIDS");
    info!("======================");
    for path in &paths {
        info!("Input:  {}", path.display());
    }
    info!("Output: {}", config.bids_directory().display());
    info!("Run:    {}", config.run_directory().display());

    let context = RunContext::new(config.clone(), default_reader()).shared();
    let converter = DatasetConverter::from_nwb_paths(&paths, context)
        .context("Failed to collect NWB sessions")?;
    info!("Sessions: {}", converter.sessions().len());

    finish(converter, &config, silent)?;
    Ok(())
}
