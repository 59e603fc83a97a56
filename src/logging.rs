use chrono::Utc;
use slog::Drain;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;

/// Async terminal logger tagged with the member it belongs to.
pub fn create_root_logger_for_stdout(member_id: String) -> slog::Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).use_file_location().build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    slog::Logger::root(drain, slog::o!("member" => member_id))
}

/// Async plain-text logger writing to `{directory}/{member_id}/{timestamp}_info.log`.
pub fn create_root_logger_for_file(directory: &Path, member_id: String) -> io::Result<slog::Logger> {
    let now = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    let member_directory = directory.join(&member_id);
    fs::create_dir_all(&member_directory)?;
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(member_directory.join(format!("{}_info.log", now)))?;

    let decorator = slog_term::PlainDecorator::new(file);
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    Ok(slog::Logger::root(drain, slog::o!("member" => member_id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn file_logger_writes_under_member_directory() -> io::Result<()> {
        // -- setup --
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos()).unwrap_or(0);
        let directory = std::env::temp_dir().join(format!("causal-core-logging-{}-{}", std::process::id(), nanos));

        // -- execute --
        let logger = create_root_logger_for_file(&directory, "m1".to_string())?;
        slog::info!(logger, "Shipper started"; "follower" => "m2");
        // Dropping the last handle joins the async drain thread, flushing the file.
        drop(logger);

        // -- verify --
        let files: Vec<_> = fs::read_dir(directory.join("m1"))?.collect::<Result<_, _>>()?;
        assert_eq!(files.len(), 1);
        let contents = fs::read_to_string(files[0].path())?;
        assert!(contents.contains("Shipper started"), "{}", contents);
        assert!(contents.contains("member: m1"), "{}", contents);

        fs::remove_dir_all(&directory)
    }
}
