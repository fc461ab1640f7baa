//! # nwb2bids
//!
//! A command-line tool that reorganizes NWB neurophysiology files into a BIDS
//! dataset.
//!
//! ## Usage
//!
//! ```bash
//! # Convert a directory of NWB files
//! nwb2bids convert recordings/ --bids-directory bids_dataset
//!
//! # Symlink instead of copying, with sanitized labels
//! nwb2bids convert a.nwb b.nwb -o bids_dataset --file-mode symlink --sanitization-level critical
//!
//! # Convert a DANDI dataset
//! nwb2bids convert-dandiset 000003 -o bids_dataset
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbosity());
    cli::dispatch(cli)
}
