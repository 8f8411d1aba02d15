//! Core processing pipeline: read → parse and collect → resolve every probe.

use std::fs;
use std::time::Instant;

use rayon::prelude::*;
use tracing::info;

use cxxsema_cpp::analyze_with;
use cxxsema_error::{Error, Result};
use cxxsema_resolver::Config;

use crate::CxxsemaOptions;
use crate::output::Record;

/// Resolved probes of one file, or the reason it could not be analyzed.
#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub file: String,
    pub records: Vec<Record>,
    /// Probes dropped because they use syntax that is not lowered.
    pub skipped: usize,
    pub error: Option<String>,
}

/// Analyze each file independently. Reports come back in input order.
#[tracing::instrument(skip_all)]
pub fn process_files(opts: &CxxsemaOptions, files: &[String], config: &Config) -> Vec<FileReport> {
    let start = Instant::now();
    info!("Analyzing {} files", files.len());

    let reports: Vec<FileReport> = if opts.sequential {
        files.iter().map(|file| process_file(file, config)).collect()
    } else {
        files.par_iter().map(|file| process_file(file, config)).collect()
    };

    let probes: usize = reports.iter().map(|report| report.records.len()).sum();
    info!(
        probes,
        "Analysis: {:.2}s",
        start.elapsed().as_secs_f64()
    );
    reports
}

fn process_file(file: &str, config: &Config) -> FileReport {
    match analyze_file(file, config) {
        Ok((records, skipped)) => FileReport {
            file: file.to_string(),
            records,
            skipped,
            error: None,
        },
        Err(err) => {
            tracing::error!(file, error = %err, "analysis failed");
            FileReport {
                file: file.to_string(),
                records: Vec::new(),
                skipped: 0,
                error: Some(err.to_string()),
            }
        }
    }
}

fn analyze_file(file: &str, config: &Config) -> Result<(Vec<Record>, usize)> {
    let source = fs::read_to_string(file)
        .map_err(|err| Error::from(err).with_context("path", file))?;
    let unit = analyze_with(&source, config).map_err(|err| err.with_context("path", file))?;

    let records = unit
        .probes
        .iter()
        .map(|probe| {
            let ty = unit.resolve(probe);
            Record::new(file, probe, &ty, unit.render(&ty))
        })
        .collect();
    if unit.skipped > 0 {
        tracing::debug!(file, skipped = unit.skipped, "probes skipped");
    }
    Ok((records, unit.skipped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.cpp");
        fs::write(&good, "int *p; void f() { *p; }").unwrap();
        let files = vec![
            dir.path().join("missing.cpp").to_string_lossy().to_string(),
            good.to_string_lossy().to_string(),
        ];

        let reports = process_files(&CxxsemaOptions::default(), &files, &Config::default());
        assert_eq!(reports.len(), 2);
        assert!(reports[0].error.is_some());
        assert_eq!(reports[1].error, None);
        assert_eq!(reports[1].records.len(), 1);
        assert_eq!(reports[1].records[0].ty, "int");
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = Vec::new();
        for i in 0..8 {
            let path = dir.path().join(format!("f{i}.cpp"));
            fs::write(&path, format!("int v{i}; void f() {{ &v{i}; }}")).unwrap();
            files.push(path.to_string_lossy().to_string());
        }

        let parallel = process_files(&CxxsemaOptions::default(), &files, &Config::default());
        let sequential = process_files(
            &CxxsemaOptions {
                sequential: true,
                ..Default::default()
            },
            &files,
            &Config::default(),
        );
        assert_eq!(parallel, sequential);
        assert_eq!(parallel[3].records[0].expr, "&v3");
    }
}
