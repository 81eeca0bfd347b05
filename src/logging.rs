use crate::config::Config;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. The terminal belongs to the dashboard, so
/// nothing is logged unless `log_enabled` is set, and then only to a file
/// (stderr when the file cannot be opened).
pub fn init(config: &Config) -> Option<WorkerGuard> {
    if !config.log_enabled {
        return None;
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directive(&config.log_level)))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let (writer, guard) = writer_for(config.log_file.trim());

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_level(true)
        .with_target(true)
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f".to_string()))
        .compact()
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
    Some(guard)
}

/// Our own crate logs at the configured level; dependencies stay at warn
/// so reqwest connection chatter does not drown the search trail.
fn filter_directive(level: &str) -> String {
    let level = level.trim();
    let level = if level.is_empty() { "info" } else { level };
    if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("warn,cirrostrats_tui={level}")
    }
}

fn writer_for(path: &str) -> (NonBlocking, WorkerGuard) {
    if path.is_empty() {
        return tracing_appender::non_blocking(io::stderr());
    }
    match open_log_file(Path::new(path)) {
        Ok(file) => tracing_appender::non_blocking(file),
        Err(_) => tracing_appender::non_blocking(io::stderr()),
    }
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn plain_level_scopes_to_crate() {
        assert_eq!(filter_directive("debug"), "warn,cirrostrats_tui=debug");
        assert_eq!(filter_directive("  "), "warn,cirrostrats_tui=info");
        assert_eq!(filter_directive("reqwest=trace"), "reqwest=trace");
    }

    #[test]
    fn log_file_parent_is_created() {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let dir = std::env::temp_dir().join(format!("cirrostrats-log-test-{suffix}"));
        let path = dir.join("nested").join("tui.log");
        assert!(open_log_file(&path).is_ok());
        assert!(path.exists());
        let _ = fs::remove_dir_all(&dir);
    }
}
