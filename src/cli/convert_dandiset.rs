use anyhow::{Context, Result};
use log::info;
use std::sync::Arc;

use nwb2bids::context::RunContext;
use nwb2bids::dataset::DatasetConverter;
use nwb2bids::nwb::default_reader;
use nwb2bids::remote::DandiApiClient;

use super::{finish, RunArgs};

/// Convert the NWB assets of a DANDI dataset to BIDS
pub fn run(dandiset_id: String, version: String, api_url: String, args: RunArgs) -> Result<()> {
    let (config, silent) = args.resolve()?;

    info!("nwb2bids - DANDI to BIDS");
    info!("========================");
    info!("Dandiset: {} ({})", dandiset_id, version);
    info!("API:      {}", api_url);
    info!("Output:   {}", config.bids_directory().display());

    let client = DandiApiClient::with_base_url(api_url).context("Failed to create the DANDI client")?;
    let context = RunContext::new(config.clone(), default_reader()).shared();
    let converter =
        DatasetConverter::from_remote_dandiset(&dandiset_id, &version, Arc::new(client), context);
    info!("Sessions: {}", converter.sessions().len());

    finish(converter, &config, silent)?;
    Ok(())
}
