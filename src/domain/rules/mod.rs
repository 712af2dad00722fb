// Business rules - Validation and naming of the outputs

use std::path::Path;

use crate::domain::model::{PlannedOutput, ScanResult, TitleRequest};
use crate::error::{RipError, RipResult};


/// Extension of every output file
pub const OUTPUT_EXTENSION: &str = "mkv";

/// Default template for episode file names
pub const DEFAULT_EPISODE_NAME_FORMAT: &str = "{name} — DVDRip — {episode}";

/// Check that every requested title exists on the disc.
///
/// All missing indices are reported together, sorted, so the user can fix
/// the title map in one go.
pub fn check_consistency(scan: &ScanResult, requests: &[TitleRequest]) -> RipResult<()> {
    let existing = scan.indices();
    let mut missing: Vec<u32> = requests
        .iter()
        .map(|r| r.title_index)
        .filter(|index| !existing.contains(index))
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    missing.sort_unstable();
    missing.dedup();
    Err(RipError::TitlesNotFound { missing })
}

/// Render an episode name from its template.
///
/// `{name}` is replaced by the series name and `{episode}` by the episode
/// label. `{{` and `}}` produce literal braces. Any other placeholder is an
/// error.
pub fn render_episode_name(template: &str, series: &str, episode: &str) -> RipResult<String> {
    let invalid = |reason: &str| RipError::InvalidTemplate {
        template: template.to_string(),
        reason: reason.to_string(),
    };

    let mut rendered = String::with_capacity(template.len() + series.len() + episode.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                rendered.push('{');
            }
            '{' => {
                let mut key = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(k) => key.push(k),
                        None => return Err(invalid("unclosed '{'")),
                    }
                }
                match key.as_str() {
                    "name" => rendered.push_str(series),
                    "episode" => rendered.push_str(episode),
                    other => return Err(invalid(&format!("unknown placeholder '{{{}}}'", other))),
                }
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                rendered.push('}');
            }
            '}' => return Err(invalid("single '}' is not allowed")),
            other => rendered.push(other),
        }
    }

    Ok(rendered)
}

/// Derive one output per title request.
///
/// The scan result provides the subtitle languages of each title; duplicated
/// language codes collapse into one. Requests are expected to have passed
/// [`check_consistency`] first, a title missing from the scan is reported
/// the same way.
pub fn plan_outputs(
    scan: &ScanResult,
    requests: &[TitleRequest],
    output_dir: &Path,
    series: &str,
    template: &str,
) -> RipResult<Vec<PlannedOutput>> {
    requests
        .iter()
        .map(|request| {
            let title = scan
                .title(request.title_index)
                .ok_or_else(|| RipError::TitlesNotFound {
                    missing: vec![request.title_index],
                })?;

            let name = render_episode_name(template, series, &request.episode_label)?;
            let file_name = format!("{}.{}", name, OUTPUT_EXTENSION);

            Ok(PlannedOutput {
                dir_path: output_dir.to_path_buf(),
                file_path: output_dir.join(&file_name),
                file_name,
                title_index: request.title_index,
                subtitle_languages: title.subtitle_languages(),
            })
        })
        .collect()
}
