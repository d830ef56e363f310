use std::any::Any;
use std::io::Write;
use std::panic::PanicHookInfo;
use std::path::Path;

use chrono::Local;

use crate::logging::LOG_FILE_PREFIX;

/// Log panics through `tracing`, then run the previously installed hook.
///
/// Release builds abort on panic, so the non-blocking file writer may never
/// flush. There the line is also appended to today's log file directly.
pub fn install(log_dir: impl AsRef<Path>) {
    let log_dir = log_dir.as_ref().to_path_buf();
    let previous = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |info: &PanicHookInfo<'_>| {
        let message = panic_message(info.payload());
        let location = info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_default();
        let thread = std::thread::current().name().unwrap_or("<unnamed>").to_string();

        tracing::error!(%thread, %location, "panic: {message}");
        if cfg!(panic = "abort") {
            let line = format!(
                "{} PANIC thread={thread} location={location} {message}",
                Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
            );
            let _ = append_line(&log_dir, &line);
        }

        previous(info);
    }));
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string payload>")
}

fn append_line(log_dir: &Path, line: &str) -> std::io::Result<()> {
    // Same name the daily appender uses for today.
    let name = format!("{}.{}", LOG_FILE_PREFIX, Local::now().format("%Y-%m-%d"));
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join(name))?;
    writeln!(file, "{line}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_reads_str_and_string_payloads() {
        let literal: Box<dyn Any + Send> = Box::new("boom");
        let formatted: Box<dyn Any + Send> = Box::new(format!("bad login {}", "x"));
        let other: Box<dyn Any + Send> = Box::new(7_u32);

        assert_eq!(panic_message(literal.as_ref()), "boom");
        assert_eq!(panic_message(formatted.as_ref()), "bad login x");
        assert_eq!(panic_message(other.as_ref()), "<non-string payload>");
    }

    #[test]
    fn panic_lines_append_to_todays_log_file() {
        let dir = tempfile::tempdir().unwrap();
        append_line(dir.path(), "PANIC first").unwrap();
        append_line(dir.path(), "PANIC second").unwrap();

        let name = format!("{}.{}", LOG_FILE_PREFIX, Local::now().format("%Y-%m-%d"));
        let content = std::fs::read_to_string(dir.path().join(name)).unwrap();
        assert_eq!(content, "PANIC first\nPANIC second\n");
    }
}
