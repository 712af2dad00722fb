//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

use crate::cli::path_or_empty;
use crate::domain::model::TitleRequest;

/// Arguments for the rip command
#[derive(Args, Debug)]
pub struct RipArgs {
    /// DVD device or image (default: /dev/dvd, or the configured device)
    #[arg(short, long, env = "DVDRIP_DEVICE", value_parser = path_or_empty())]
    pub input_file: Option<PathBuf>,

    /// Directory the episodes are written to
    #[arg(short, long)]
    pub output_dir: PathBuf,

    /// Episode label of each title, as `<title_id>=<episode>` (e.g. 1=S02E04)
    #[arg(short, long, required = true, num_args = 1.., value_parser = TitleRequest::parse)]
    pub title_map: Vec<TitleRequest>,

    /// Series name
    #[arg(short = 'n', long)]
    pub series_name: String,

    /// Episode file name template; {name} is the series, {episode} the label
    #[arg(short = 'f', long, env = "DVDRIP_EPISODE_FORMAT")]
    pub episode_name_format: Option<String>,

    /// Leave the disc in the drive when done
    #[arg(long)]
    pub no_eject: bool,

    /// Log progress instead of drawing progress bars
    #[arg(long)]
    pub no_progress: bool,
}

/// Arguments for the scan command
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// DVD device or image (default: /dev/dvd, or the configured device)
    #[arg(short, long, env = "DVDRIP_DEVICE", value_parser = path_or_empty())]
    pub input_file: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Log progress instead of drawing progress bars
    #[arg(long)]
    pub no_progress: bool,
}
