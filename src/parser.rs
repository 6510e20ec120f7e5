//! Lmod usage-log parsing
//!
//! Lmod's `ModUsageTrack` hook writes one syslog line per `module load`. Two
//! layouts are found in the wild: the historic minimal one, prefixed with
//! `lmod:`, and an extended one that also records the module category and the
//! batch job the load happened in. Both are matched by substring search, so
//! syslog headers before the record and any trailing text are ignored.
//!
//! Files are read either plain or through a gzip decoder, chosen by the magic
//! bytes rather than the file name.

use crate::error::UsageError;
use crate::models::{ExtendedFields, UsageEvent};
use flate2::read::MultiGzDecoder;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

static MINIMAL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        lmod:\x20source=ModUsageTrack,\x20
        time=(?P<timestamp>[0-9]+(?:\.[0-9]*)?),\x20
        host=(?P<host>\S+),\x20
        user=(?P<user>\S+),\x20
        action=(?P<action>load),\x20
        module=(?P<module>\S+),\x20
        path=(?P<path>\S+)",
    )
    .unwrap_or_else(|_| unreachable!())
});

static EXTENDED_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        source=ModUsageTrack,\x20
        time=(?P<timestamp>[0-9]+(?:\.[0-9]*)?),\x20
        host=(?P<host>\S+),\x20
        user=(?P<user>\S+),\x20
        action=(?P<action>load),\x20
        module=(?P<module>\S+),\x20
        path=(?P<path>\S+),\x20
        cat=(?P<cat>\S+),\x20
        version=(?P<version>\S+),\x20
        shell=(?P<shell>\S+),\x20
        job_id=(?P<job_id>[0-9]+),\x20
        job_acc=(?P<job_acc>\S+),\x20
        job_part=(?P<job_part>\S+)",
    )
    .unwrap_or_else(|_| unreachable!())
});

/// Outcome of matching one line against both grammars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineMatch {
    Extended(UsageEvent),
    Minimal(UsageEvent),
    NoMatch,
}

impl LineMatch {
    pub fn into_event(self) -> Option<UsageEvent> {
        match self {
            LineMatch::Extended(event) | LineMatch::Minimal(event) => Some(event),
            LineMatch::NoMatch => None,
        }
    }
}

fn field(caps: &Captures<'_>, name: &str) -> String {
    caps.name(name).map(|m| m.as_str().to_string()).unwrap_or_default()
}

fn common_event(caps: &Captures<'_>) -> UsageEvent {
    UsageEvent {
        timestamp: field(caps, "timestamp"),
        host: field(caps, "host"),
        user: field(caps, "user"),
        action: field(caps, "action"),
        module: field(caps, "module"),
        path: field(caps, "path"),
        extended: None,
    }
}

/// Matches the `lmod: source=ModUsageTrack, ...` layout.
pub fn match_minimal(line: &str) -> Option<UsageEvent> {
    MINIMAL_PATTERN.captures(line).map(|caps| common_event(&caps))
}

/// Matches the layout carrying category and job fields.
pub fn match_extended(line: &str) -> Option<UsageEvent> {
    EXTENDED_PATTERN.captures(line).map(|caps| {
        let mut event = common_event(&caps);
        event.extended = Some(ExtendedFields {
            category: field(&caps, "cat"),
            version: field(&caps, "version"),
            shell: field(&caps, "shell"),
            job_id: field(&caps, "job_id"),
            job_account: field(&caps, "job_acc"),
            job_partition: field(&caps, "job_part"),
        });
        event
    })
}

/// Tries the extended grammar first, then the minimal one.
pub fn match_line(line: &str) -> LineMatch {
    if let Some(event) = match_extended(line) {
        return LineMatch::Extended(event);
    }
    match match_minimal(line) {
        Some(event) => LineMatch::Minimal(event),
        None => LineMatch::NoMatch,
    }
}

/// Receives every matched event of a file, in line order.
pub trait LogProcessor {
    type Output;

    fn process_event(&mut self, event: UsageEvent, line_number: usize);
    fn finalize(self) -> Self::Output;
}

/// Opens `path`, transparently decompressing gzip content.
pub fn open_log(path: &Path) -> Result<Box<dyn BufRead + Send>, UsageError> {
    let unreadable = |source| UsageError::UnreadableFile {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(unreadable)?;
    let mut magic = [0u8; 2];
    let mut read = 0;
    while read < magic.len() {
        match file.read(&mut magic[read..]).map_err(unreadable)? {
            0 => break,
            n => read += n,
        }
    }
    // Reopen rather than seek so the decoder sees the stream from byte 0.
    let file = File::open(path).map_err(unreadable)?;

    if read == magic.len() && magic == GZIP_MAGIC {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

#[derive(Debug, Default)]
pub struct FileParser {}

impl FileParser {
    pub fn new() -> Self {
        Self {}
    }

    /// Streams every line of `path` through the matcher into `processor`.
    ///
    /// Lines matching neither grammar are skipped. Invalid UTF-8 is decoded
    /// lossily; only I/O and decompression failures abort the file.
    pub fn process_log_file<P: LogProcessor>(
        &self,
        path: &Path,
        mut processor: P,
    ) -> Result<P::Output, UsageError> {
        let mut reader = open_log(path)?;
        let mut buf = Vec::new();
        let mut line_number = 0;

        loop {
            buf.clear();
            let n = reader
                .read_until(b'\n', &mut buf)
                .map_err(|source| UsageError::UnreadableFile {
                    path: path.to_path_buf(),
                    source,
                })?;
            if n == 0 {
                break;
            }
            line_number += 1;

            let line = String::from_utf8_lossy(&buf);
            if let Some(event) = match_line(&line).into_event() {
                processor.process_event(event, line_number);
            }
        }

        tracing::debug!(
            file = %path.display(),
            lines = line_number,
            "Finished reading log file"
        );
        Ok(processor.finalize())
    }
}

/// Collects every matched event; mostly useful for inspection and tests.
#[derive(Debug, Default)]
pub struct CollectorProcessor {
    events: Vec<UsageEvent>,
}

impl CollectorProcessor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LogProcessor for CollectorProcessor {
    type Output = Vec<UsageEvent>;

    fn process_event(&mut self, event: UsageEvent, _line_number: usize) {
        self.events.push(event);
    }

    fn finalize(self) -> Self::Output {
        self.events
    }
}
