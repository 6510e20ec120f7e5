#![allow(dead_code)]

use anyhow::Result;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub fn minimal_line(time: &str, user: &str, module: &str) -> String {
    format!(
        "Jan  1 10:00:00 cn001 lmod: source=ModUsageTrack, time={}, host=cn001, user={}, \
         action=load, module={}, path=/opt/modules/{}.lua",
        time, user, module, module
    )
}

pub fn extended_line(time: &str, user: &str, module: &str, category: &str, job_id: &str) -> String {
    format!(
        "Jan  1 10:00:00 cn001 ModuleUsageTracking: source=ModUsageTrack, time={}, host=cn001, \
         user={}, action=load, module={}, path=/apps/{}/{}.lua, cat={}, version=1.0, shell=bash, \
         job_id={}, job_acc=acct, job_part=compute",
        time, user, module, category, module, category, job_id
    )
}

pub fn create_test_log(dir: &Path, filename: &str, lines: &[String]) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    let mut content = lines.join("\n");
    content.push('\n');
    fs::write(&file_path, content)?;
    Ok(file_path)
}

pub fn create_gzip_log(dir: &Path, filename: &str, lines: &[String]) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    let mut encoder = GzEncoder::new(fs::File::create(&file_path)?, Compression::default());
    for line in lines {
        writeln!(encoder, "{}", line)?;
    }
    encoder.finish()?;
    Ok(file_path)
}
