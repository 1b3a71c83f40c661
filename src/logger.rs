//! Session logger for the canvas.
//!
//! The desktop app writes one log file per session, truncated at launch:
//!   Windows:  `%APPDATA%\GenesisCanvas\genesis_canvas.log`
//!   Linux:    `~/.local/share/GenesisCanvas/genesis_canvas.log`
//!   macOS:    `~/Library/Application Support/GenesisCanvas/genesis_canvas.log`
//!
//! Headless runs skip the file; with `--verbose` the same lines are echoed to
//! stderr instead, so load and decode traces show up next to CLI errors.
//! With neither sink enabled (tests, library use) every write is a no-op.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

static LOG_FILE: OnceLock<Mutex<File>> = OnceLock::new();
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();
static ECHO: AtomicBool = AtomicBool::new(false);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn tag(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

/// Returns the path to the current session log file.
pub fn log_path() -> Option<&'static PathBuf> {
    LOG_PATH.get()
}

/// Mirror log lines to stderr.
pub fn set_echo(enabled: bool) {
    ECHO.store(enabled, Ordering::Relaxed);
}

fn echo_enabled() -> bool {
    ECHO.load(Ordering::Relaxed)
}

fn write_line(line: &str) {
    if let Some(mutex) = LOG_FILE.get()
        && let Ok(mut file) = mutex.lock()
    {
        let _ = writeln!(file, "{}", line);
    }
}

fn format_line(clock: &str, level: Level, msg: &str) -> String {
    format!("[{}] [{}] {}", clock, level.tag(), msg)
}

/// Write a timestamped, level-tagged line to every enabled sink.
pub fn write(level: Level, msg: &str) {
    let echo = echo_enabled();
    if LOG_FILE.get().is_none() && !echo {
        return;
    }
    let line = format_line(&timestamp(), level, msg);
    if echo {
        eprintln!("{}", line);
    }
    write_line(&line);
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Info, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Warn, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_err {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Error, &format!($($arg)*))
    };
}

/// Open the session log file and install a panic hook that records panics
/// (a decode or expansion worker dying, for instance) before the default handler.
pub fn init() {
    let path = log_file_path();

    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&path);

    match file {
        Ok(f) => {
            let _ = LOG_PATH.set(path.clone());
            let _ = LOG_FILE.set(Mutex::new(f));
        }
        Err(e) => {
            eprintln!("[logger] Failed to open log file {:?}: {}", path, e);
            return;
        }
    }

    write_line(&session_banner(unix_secs()));
    write_line(&format!("Log file: {}", path.display()));
    write_line("");

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        write_line(&format_line(&timestamp(), Level::Error, &format!("PANIC: {}", info)));
        prev(info);
    }));
}

fn session_banner(secs: Option<u64>) -> String {
    let started = match secs {
        Some(s) => format!("(unix {})", s),
        None => "(unknown time)".to_string(),
    };
    format!(
        "=== GenesisCanvas {} session started {} ===",
        env!("CARGO_PKG_VERSION"),
        started
    )
}

fn log_file_path() -> PathBuf {
    data_dir().join("GenesisCanvas").join("genesis_canvas.log")
}

/// Platform data directory (without the app sub-folder).
fn data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata);
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support");
        }
    }
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    PathBuf::from(".")
}

fn unix_secs() -> Option<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs())
}

/// HH:MM:SS within the UTC day.
fn clock_of_day(secs: u64) -> String {
    let h = (secs % 86400) / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    format!("{:02}:{:02}:{:02}", h, m, s)
}

fn timestamp() -> String {
    match unix_secs() {
        Some(secs) => clock_of_day(secs),
        None => "??:??:??".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_layout() {
        assert_eq!(
            format_line("09:05:00", Level::Warn, "Invalid background color \"x\""),
            "[09:05:00] [WARN] Invalid background color \"x\""
        );
        assert_eq!(Level::Error.tag(), "ERROR");
    }

    #[test]
    fn clock_wraps_at_midnight() {
        assert_eq!(clock_of_day(0), "00:00:00");
        assert_eq!(clock_of_day(3 * 3600 + 7 * 60 + 9), "03:07:09");
        assert_eq!(clock_of_day(86400 + 61), "00:01:01");
    }

    #[test]
    fn banner_names_version() {
        let banner = session_banner(Some(42));
        assert!(banner.contains(env!("CARGO_PKG_VERSION")));
        assert!(banner.ends_with("(unix 42) ==="));
        assert!(session_banner(None).contains("(unknown time)"));
    }
}
