//! Full runs against fake HandBrakeCLI scripts
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use dvdrip_cli::adapters::{RipConfig, TokioProcessLauncher};
use dvdrip_cli::app::{AppContainer, DefaultAppContainer, RipRequest, ScanRequest};
use dvdrip_cli::engine::LogProgress;
use dvdrip_cli::{RipError, TitleRequest};

/// Scan output followed by a transcode writing its output file.
/// Every call is appended to calls.log next to the script.
const FAKE_HANDBRAKE: &str = r#"#!/bin/sh
echo "$*" >> "$(dirname "$0")/calls.log"
case " $* " in
*" --scan "*)
    cat <<'OUT'
Version: {
    "Name": "HandBrake",
    "VersionString": "1.6.1"
}
Progress: {
    "Scanning": {
        "Progress": 0.5,
        "Title": 1,
        "TitleCount": 2
    },
    "State": "SCANNING"
}
JSON Title Set: {
    "MainFeature": 1,
    "TitleList": [
        {
            "Duration": {"Hours": 0, "Minutes": 22, "Seconds": 5},
            "Index": 1,
            "SubtitleList": [
                {"LanguageCode": "fra"},
                {"LanguageCode": "eng"},
                {"LanguageCode": "fra"}
            ]
        },
        {
            "Duration": {"Hours": 0, "Minutes": 21, "Seconds": 58},
            "Index": 2,
            "SubtitleList": []
        }
    ]
}
OUT
    echo "libdvdread: Encrypted DVD support unavailable." >&2
    ;;
*)
    out=""
    prev=""
    for arg in "$@"; do
        if [ "$prev" = "-o" ]; then out="$arg"; fi
        prev="$arg"
    done
    cat <<'OUT'
Progress: {
    "Scanning": {
        "Progress": 1.0
    },
    "State": "SCANNING"
}
Progress: {
    "State": "WORKING",
    "Working": {
        "Progress": 0.42,
        "Rate": 120.5
    }
}
Progress: {
    "State": "WORKDONE",
    "WorkDone": {
        "Error": 0
    }
}
OUT
    printf 'matroska' > "$out"
    ;;
esac
"#;

/// HandBrake failing after a few lines of diagnostics
const FAILING_HANDBRAKE: &str = r#"#!/bin/sh
for i in 1 2 3 4 5 6 7; do
    echo "line $i" >&2
done
echo "No title found." >&2
exit 3
"#;

/// HandBrake that reports its pid, starts scanning and never finishes
const HANGING_HANDBRAKE: &str = r#"#!/bin/sh
echo $$ > "$(dirname "$0")/handbrake.pid"
cat <<'OUT'
Progress: {
    "Scanning": {
        "Progress": 0.1
    },
    "State": "SCANNING"
}
OUT
exec sleep 60
"#;

fn write_script(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn config(handbrake: &Path) -> RipConfig {
    RipConfig {
        handbrake_bin: handbrake.display().to_string(),
        eject_bin: "true".to_string(),
        ..RipConfig::default()
    }
}

fn calls(dir: &Path) -> Vec<String> {
    fs::read_to_string(dir.join("calls.log"))
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_rip_with_real_processes() {
    let temp_dir = TempDir::new().unwrap();
    let handbrake = write_script(temp_dir.path(), "HandBrakeCLI", FAKE_HANDBRAKE);
    let output_dir = temp_dir.path().join("out").join("Foo");

    let container = DefaultAppContainer::with_launcher(
        Arc::new(TokioProcessLauncher::new()),
        &config(&handbrake),
    );
    let request = RipRequest {
        device: PathBuf::from("/dev/dvd"),
        output_dir: output_dir.clone(),
        series_name: "Foo".to_string(),
        episode_name_format: "{name} — DVDRip — {episode}".to_string(),
        titles: vec![TitleRequest::new(2, "S01E02"), TitleRequest::new(1, "S01E01")],
        eject: true,
    };

    let report = container
        .rip_interactor()
        .execute(&request, &mut LogProgress::new())
        .await
        .unwrap();

    assert!(report.ejected);
    let first = output_dir.join("Foo — DVDRip — S01E02.mkv");
    let second = output_dir.join("Foo — DVDRip — S01E01.mkv");
    assert_eq!(report.outputs[0].file_path, first);
    assert_eq!(fs::read_to_string(&first).unwrap(), "matroska");
    assert!(second.is_file());

    let calls = calls(temp_dir.path());
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0], "--json --scan -t 0 -i /dev/dvd");
    assert!(calls[1].starts_with("--json --title 2 --format av_mkv"));
    assert!(calls[2].contains("--subtitle-lang-list eng,fra --all-subtitles"));
}

#[tokio::test]
async fn test_scan_with_real_process() {
    let temp_dir = TempDir::new().unwrap();
    let handbrake = write_script(temp_dir.path(), "HandBrakeCLI", FAKE_HANDBRAKE);

    let container = DefaultAppContainer::with_launcher(
        Arc::new(TokioProcessLauncher::new()),
        &config(&handbrake),
    );
    let scan = container
        .scan_interactor()
        .execute(
            &ScanRequest {
                device: PathBuf::from("disc.iso"),
            },
            &mut LogProgress::new(),
        )
        .await
        .unwrap();

    assert_eq!(scan.titles.len(), 2);
    assert_eq!(scan.titles[0].subtitle_languages().len(), 2);
}

#[tokio::test]
async fn test_failure_keeps_last_stderr_lines() {
    let temp_dir = TempDir::new().unwrap();
    let handbrake = write_script(temp_dir.path(), "HandBrakeCLI", FAILING_HANDBRAKE);

    let container = DefaultAppContainer::with_launcher(
        Arc::new(TokioProcessLauncher::new()),
        &config(&handbrake),
    );
    let err = container
        .scan_interactor()
        .execute(
            &ScanRequest {
                device: PathBuf::from("/dev/dvd"),
            },
            &mut LogProgress::new(),
        )
        .await
        .unwrap_err();

    match err {
        RipError::ProcessFailed {
            status,
            diagnostics,
            ..
        } => {
            assert_eq!(status, "exit status: 3");
            assert_eq!(diagnostics, "line 4\nline 5\nline 6\nline 7\nNo title found.");
        }
        other => panic!("unexpected error: {}", other),
    }
}

fn dvdrip(dir: &TempDir, handbrake: &Path) -> Command {
    let config_path = dir.path().join("config.toml");
    fs::write(
        &config_path,
        format!(
            "handbrake_bin = \"{}\"\neject_bin = \"true\"\n",
            handbrake.display()
        ),
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("dvdrip").unwrap();
    cmd.current_dir(dir.path())
        .env("HOME", dir.path())
        .env("DVDRIP_CONFIG", &config_path)
        .env_remove("DVDRIP_DEVICE")
        .env_remove("DVDRIP_EPISODE_FORMAT")
        .env_remove("DVDRIP_HANDBRAKE")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_binary_rip() {
    let temp_dir = TempDir::new().unwrap();
    let handbrake = write_script(temp_dir.path(), "HandBrakeCLI", FAKE_HANDBRAKE);

    dvdrip(&temp_dir, &handbrake)
        .args([
            "rip", "-i", "disc.iso", "-o", "season", "-n", "Foo", "-f", "{name} {episode}", "-t",
            "1=S01E01", "--no-progress",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Foo S01E01.mkv"))
        .stdout(predicate::str::contains("Ripped 1 title(s), disc ejected"));

    assert!(temp_dir.path().join("season").join("Foo S01E01.mkv").is_file());
}

#[test]
fn test_binary_reports_missing_titles() {
    let temp_dir = TempDir::new().unwrap();
    let handbrake = write_script(temp_dir.path(), "HandBrakeCLI", FAKE_HANDBRAKE);

    dvdrip(&temp_dir, &handbrake)
        .args([
            "rip", "-o", "season", "-n", "Foo", "-t", "1=S01E01", "7=S01E07", "5=S01E05",
            "--no-progress",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error: Titles not found: {5, 7}"));

    assert!(!temp_dir.path().join("season").exists());
}

#[test]
fn test_binary_scan_json() {
    let temp_dir = TempDir::new().unwrap();
    let handbrake = write_script(temp_dir.path(), "HandBrakeCLI", FAKE_HANDBRAKE);

    dvdrip(&temp_dir, &handbrake)
        .args(["scan", "--json", "--no-progress"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"TitleList\""));
}

#[test]
fn test_binary_process_failure() {
    let temp_dir = TempDir::new().unwrap();
    let handbrake = write_script(temp_dir.path(), "HandBrakeCLI", FAILING_HANDBRAKE);

    dvdrip(&temp_dir, &handbrake)
        .args(["scan", "--no-progress"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error: "))
        .stderr(predicate::str::contains("No title found."));
}

/// Poll until `f` returns something or the deadline passes
fn wait_for<T>(timeout: Duration, mut f: impl FnMut() -> Option<T>) -> Option<T> {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Some(value) = f() {
            return Some(value);
        }
        thread::sleep(Duration::from_millis(50));
    }
    None
}

/// True when `pid` is gone or only left as a zombie
fn is_dead(pid: u32) -> bool {
    let output = std::process::Command::new("ps")
        .args(["-o", "stat=", "-p", &pid.to_string()])
        .output()
        .unwrap();
    let stat = String::from_utf8_lossy(&output.stdout);
    let stat = stat.trim();
    stat.is_empty() || stat.starts_with('Z')
}

#[test]
fn test_sigterm_kills_handbrake_and_says_bye() {
    let temp_dir = TempDir::new().unwrap();
    let handbrake = write_script(temp_dir.path(), "HandBrakeCLI", HANGING_HANDBRAKE);
    let pid_file = temp_dir.path().join("handbrake.pid");

    let mut dvdrip = std::process::Command::new(assert_cmd::cargo::cargo_bin("dvdrip"))
        .current_dir(temp_dir.path())
        .env("HOME", temp_dir.path())
        .env_remove("XDG_CONFIG_HOME")
        .env_remove("DVDRIP_CONFIG")
        .env_remove("DVDRIP_DEVICE")
        .env_remove("DVDRIP_HANDBRAKE")
        .env_remove("RUST_LOG")
        .args(["--handbrake-bin", handbrake.to_str().unwrap()])
        .args(["scan", "-i", "disc.iso", "--no-progress"])
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    let handbrake_pid = wait_for(Duration::from_secs(20), || {
        fs::read_to_string(&pid_file).ok()?.trim().parse::<u32>().ok()
    })
    .expect("HandBrakeCLI never started");
    // Let the scan settle on its first progress message
    thread::sleep(Duration::from_millis(500));
    assert!(!is_dead(handbrake_pid));

    let sent = std::process::Command::new("kill")
        .args(["-TERM", &dvdrip.id().to_string()])
        .status()
        .unwrap();
    assert!(sent.success());

    let status = wait_for(Duration::from_secs(20), || dvdrip.try_wait().unwrap());
    let Some(status) = status else {
        dvdrip.kill().unwrap();
        panic!("dvdrip did not exit after SIGTERM");
    };
    let output = dvdrip.wait_with_output().unwrap();
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(status.code(), Some(1));
    assert!(stderr.contains("ok, bye"), "stderr: {stderr}");
    assert!(wait_for(Duration::from_secs(5), || is_dead(handbrake_pid).then_some(())).is_some());
}
