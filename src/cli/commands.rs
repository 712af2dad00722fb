//! Command implementations

use tracing::info;

use crate::adapters::toml_config::RipConfig;
use crate::app::container::{AppContainer, DefaultAppContainer};
use crate::app::rip_interactor::RipRequest;
use crate::app::scan_interactor::{ScanInteractor, ScanRequest};
use crate::cli::args::{RipArgs, ScanArgs};
use crate::config_initialization::{resolve_device, resolve_episode_name_format};
use crate::domain::model::RipReport;
use crate::engine::progress::{BarProgress, LogProgress, ProgressObserver};
use crate::error::RipResult;

fn observer(no_progress: bool) -> Box<dyn ProgressObserver> {
    if no_progress {
        Box::new(LogProgress::new())
    } else {
        Box::new(BarProgress::new())
    }
}

/// Execute the rip command
pub async fn rip(args: RipArgs, config: &RipConfig) -> RipResult<()> {
    let request = RipRequest {
        device: resolve_device(args.input_file, config),
        output_dir: args.output_dir,
        series_name: args.series_name,
        episode_name_format: resolve_episode_name_format(args.episode_name_format, config),
        titles: args.title_map,
        eject: !args.no_eject,
    };

    info!("Input: {}", request.device.display());
    info!("Output: {}", request.output_dir.display());

    let container = DefaultAppContainer::new(config);
    let mut progress = observer(args.no_progress);
    let report = container
        .rip_interactor()
        .execute(&request, progress.as_mut())
        .await?;

    print!("{}", format_report(&report));
    Ok(())
}

/// Execute the scan command
pub async fn scan(args: ScanArgs, config: &RipConfig) -> RipResult<()> {
    let request = ScanRequest {
        device: resolve_device(args.input_file, config),
    };

    let container = DefaultAppContainer::new(config);
    let mut progress = observer(args.no_progress);
    let scan = container
        .scan_interactor()
        .execute(&request, progress.as_mut())
        .await?;

    if args.json {
        println!("{}", ScanInteractor::format_as_json(&scan)?);
    } else {
        print!("{}", ScanInteractor::format_as_text(&scan));
    }
    Ok(())
}

/// Human-readable summary of a finished rip
fn format_report(report: &RipReport) -> String {
    let mut output = String::new();

    for planned in &report.outputs {
        output.push_str(&format!(
            "Title {:>2} -> {}\n",
            planned.title_index,
            planned.file_path.display()
        ));
    }
    output.push_str(&format!("Ripped {} title(s)", report.outputs.len()));
    if report.ejected {
        output.push_str(", disc ejected");
    }
    output.push('\n');

    output
}
