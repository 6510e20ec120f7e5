//! CSV report writer.

use crate::error::UsageError;
use crate::models::{GroupMode, UsageCounts};
use std::io::Write;
use std::path::Path;

fn report_error(path: &Path, err: csv::Error) -> UsageError {
    let source = match err.into_kind() {
        csv::ErrorKind::Io(io) => io,
        other => std::io::Error::new(std::io::ErrorKind::Other, format!("{:?}", other)),
    };
    UsageError::Report {
        path: path.to_path_buf(),
        source,
    }
}

/// Writes the ranked rows; `group` is only emitted when counts are grouped.
pub fn write_csv<W: Write>(counts: &UsageCounts, writer: W) -> Result<(), csv::Error> {
    let grouped = counts.group_mode != GroupMode::None;
    let mut csv_writer = csv::Writer::from_writer(writer);

    if grouped {
        csv_writer.write_record(["group", "module", "count"])?;
    } else {
        csv_writer.write_record(["module", "count"])?;
    }

    for row in &counts.rows {
        let count = row.count.to_string();
        if grouped {
            csv_writer.write_record([row.group.as_deref().unwrap_or_default(), row.module.as_str(), count.as_str()])?;
        } else {
            csv_writer.write_record([row.module.as_str(), count.as_str()])?;
        }
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_csv_file(counts: &UsageCounts, path: &Path) -> Result<(), UsageError> {
    let file = std::fs::File::create(path).map_err(|source| UsageError::Report {
        path: path.to_path_buf(),
        source,
    })?;
    write_csv(counts, file).map_err(|err| report_error(path, err))?;
    tracing::info!(report = %path.display(), rows = counts.rows.len(), "Wrote CSV report");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CountMode, ModuleCount};

    #[test]
    fn test_ungrouped_csv() {
        let counts = UsageCounts {
            count_mode: CountMode::Jobs,
            group_mode: GroupMode::None,
            rows: vec![
                ModuleCount { group: None, module: "gcc/12".into(), count: 7 },
                ModuleCount { group: None, module: "fftw/3".into(), count: 2 },
            ],
        };
        let mut out = Vec::new();
        write_csv(&counts, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "module,count\ngcc/12,7\nfftw/3,2\n");
    }

    #[test]
    fn test_grouped_csv_quotes_when_needed() {
        let counts = UsageCounts {
            count_mode: CountMode::Users,
            group_mode: GroupMode::Category,
            rows: vec![ModuleCount { group: Some("tools, misc".into()), module: "git/2".into(), count: 1 }],
        };
        let mut out = Vec::new();
        write_csv(&counts, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "group,module,count\n\"tools, misc\",git/2,1\n");
    }
}
