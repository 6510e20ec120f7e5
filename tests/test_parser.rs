use mobylette::parser::{open_log, CollectorProcessor, FileParser};
use mobylette::UsageError;
use std::fs;
use std::io::Read;
use tempfile::TempDir;

mod common;

#[test]
fn test_parse_plain_log_file() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = common::create_test_log(
        temp_dir.path(),
        "lmod.log",
        &[
            common::minimal_line("1546333200.1", "alice", "gcc/8.2.0"),
            "Jan  1 10:00:01 cn001 kernel: unrelated line".to_string(),
            common::extended_line("1546333201.1", "bob", "fftw/3.3.8", "libraries", "42"),
        ],
    )?;

    let events = FileParser::new().process_log_file(&path, CollectorProcessor::new())?;
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].user, "alice");
    assert!(!events[0].is_extended());
    assert_eq!(events[1].job_id(), Some("42"));
    assert_eq!(events[1].category(), Some("libraries"));
    Ok(())
}

#[test]
fn test_gzip_detected_by_magic_bytes() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    // No .gz extension on purpose.
    let path = common::create_gzip_log(
        temp_dir.path(),
        "lmod.log.1",
        &[
            common::minimal_line("1546333200.1", "alice", "gcc/8.2.0"),
            common::minimal_line("1546333200.2", "bob", "gcc/8.2.0"),
        ],
    )?;

    let events = FileParser::new().process_log_file(&path, CollectorProcessor::new())?;
    assert_eq!(events.len(), 2);

    let mut text = String::new();
    open_log(&path)?.read_to_string(&mut text)?;
    assert!(text.contains("user=bob"));
    Ok(())
}

#[test]
fn test_corrupt_gzip_is_unreadable() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("broken.gz");
    fs::write(&path, [0x1f, 0x8b, 0x00, 0xff, 0x12, 0x34, 0x56])?;

    let result = FileParser::new().process_log_file(&path, CollectorProcessor::new());
    assert!(matches!(result, Err(UsageError::UnreadableFile { .. })));
    Ok(())
}

#[test]
fn test_missing_file_is_unreadable() {
    let result = FileParser::new().process_log_file(
        std::path::Path::new("/nonexistent/lmod.log"),
        CollectorProcessor::new(),
    );
    match result {
        Err(UsageError::UnreadableFile { path, .. }) => {
            assert_eq!(path, std::path::PathBuf::from("/nonexistent/lmod.log"))
        }
        other => panic!("expected UnreadableFile, got {:?}", other),
    }
}

#[test]
fn test_invalid_utf8_does_not_abort_file() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("mixed.log");
    let mut content = b"garbage \xff\xfe bytes\n".to_vec();
    content.extend_from_slice(common::minimal_line("1.0", "alice", "gcc/8.2.0").as_bytes());
    content.push(b'\n');
    fs::write(&path, content)?;

    let events = FileParser::new().process_log_file(&path, CollectorProcessor::new())?;
    assert_eq!(events.len(), 1);
    Ok(())
}

#[test]
fn test_empty_and_tiny_files() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let empty = temp_dir.path().join("empty.log");
    fs::write(&empty, "")?;
    let one_byte = temp_dir.path().join("one.log");
    fs::write(&one_byte, [0x1f])?;

    assert!(FileParser::new().process_log_file(&empty, CollectorProcessor::new())?.is_empty());
    assert!(FileParser::new().process_log_file(&one_byte, CollectorProcessor::new())?.is_empty());
    Ok(())
}
