//! Repository automation: `cargo run -p xtask -- <command>`.
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Names every guest module must define and the C header must declare.
const ENTRY_POINTS: [&str; 9] = [
    "create_enhanced_model",
    "destroy_model",
    "run_processes_for_dt",
    "run_processes_for_steps",
    "run_processes_until_time",
    "apply_velocity_data",
    "interpolate_elevation_to_points",
    "get_current_time",
    "get_time_step",
];

const HEADER_ONLY: [&str; 4] = [
    "initialize_gospl_extensions",
    "finalize_gospl_extensions",
    "create_velocity_field",
    "gospl_last_error",
];

fn main() {
    let mut args = env::args().skip(1);
    let cmd = args.next().unwrap_or_else(|| "verify".to_string());
    let result = match cmd.as_str() {
        "verify" => verify(),
        "fmt" => fmt_check(),
        "clippy" => clippy(),
        "test" => test_workspace(),
        "guest-check" => guest_check(),
        _ => usage_error(&cmd),
    };
    if let Err(msg) = result {
        eprintln!("{msg}");
        std::process::exit(1);
    }
}

fn usage_error(cmd: &str) -> Result<(), String> {
    Err(format!(
        "Unknown command: {cmd}\nUsage: cargo run -p xtask -- <verify|fmt|clippy|test|guest-check>"
    ))
}

fn verify() -> Result<(), String> {
    fmt_check()?;
    clippy()?;
    guest_check()?;
    test_workspace()?;
    Ok(())
}

/// Runs a tool to completion; a non-zero exit carries its captured output.
fn checked(cmd: &str, args: &[&str]) -> Result<(), String> {
    eprintln!("$ {cmd} {}", args.join(" "));
    let out = Command::new(cmd)
        .args(args)
        .output()
        .map_err(|e| format!("cannot run {cmd}: {e}"))?;
    if out.status.success() {
        return Ok(());
    }
    Err(failure_report(cmd, &out))
}

fn failure_report(cmd: &str, out: &Output) -> String {
    let mut report = format!("{cmd} exited with {}", out.status);
    for (stream, bytes) in [("stdout", &out.stdout), ("stderr", &out.stderr)] {
        let text = String::from_utf8_lossy(bytes);
        let text = text.trim_end();
        if !text.is_empty() {
            report.push_str(&format!("\n--- {stream}\n{text}"));
        }
    }
    report
}

fn fmt_check() -> Result<(), String> {
    checked("cargo", &["fmt", "--all", "--", "--check"])
}

fn clippy() -> Result<(), String> {
    checked(
        "cargo",
        &[
            "clippy",
            "--workspace",
            "--all-targets",
            "--",
            "-D",
            "warnings",
        ],
    )
}

fn test_workspace() -> Result<(), String> {
    // Bridge tests embed one interpreter per test binary.
    checked("cargo", &["test", "--workspace"])
}

fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(|p| p.parent())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Guest modules compile and define every entry point; the header declares
/// every export.
fn guest_check() -> Result<(), String> {
    let root = repo_root();
    let guests = [
        root.join("guest/gospl_python_interface.py"),
        root.join("crates/tecto_bridge/tests/guest/gospl_python_interface.py"),
    ];
    for g in &guests {
        let path = g.to_string_lossy();
        checked("python3", &["-m", "py_compile", path.as_ref()])?;
        let src = read(g)?;
        let missing: Vec<&str> = ENTRY_POINTS
            .iter()
            .copied()
            .filter(|name| !defines(&src, name))
            .collect();
        if !missing.is_empty() {
            return Err(format!("{path} is missing: {}", missing.join(", ")));
        }
    }
    checked("python3", &["-c", "import numpy"])
        .map_err(|e| format!("numpy is required by every guest\n{e}"))?;

    let header_path = root.join("crates/tecto_bridge/include/tecto_bridge.h");
    let header = read(&header_path)?;
    let undeclared: Vec<&str> = ENTRY_POINTS
        .iter()
        .chain(HEADER_ONLY.iter())
        .copied()
        .filter(|name| !header.contains(&format!(" {name}(")))
        .collect();
    if !undeclared.is_empty() {
        return Err(format!(
            "{} does not declare: {}",
            header_path.display(),
            undeclared.join(", ")
        ));
    }
    eprintln!("guest modules and header are consistent");
    Ok(())
}

fn defines(src: &str, name: &str) -> bool {
    let prefix = format!("def {name}(");
    src.lines().any(|l| l.starts_with(&prefix))
}

fn read(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("Read failed {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_top_level_defs_count() {
        let src = "def destroy_model(h):\n    pass\n    def get_time_step(h):\n";
        assert!(defines(src, "destroy_model"));
        assert!(!defines(src, "get_time_step"));
    }

    #[cfg(unix)]
    #[test]
    fn failure_report_skips_empty_streams() {
        use std::os::unix::process::ExitStatusExt;

        let out = Output {
            status: std::process::ExitStatus::from_raw(1 << 8),
            stdout: Vec::new(),
            stderr: b"NameError: numpy\n".to_vec(),
        };
        let report = failure_report("python3", &out);
        assert!(report.starts_with("python3 exited with"), "{report}");
        assert!(report.ends_with("--- stderr\nNameError: numpy"), "{report}");
        assert!(!report.contains("stdout"));
    }
}
