//! Output generation (text lines or JSON).

use std::fmt::Write;

use clap::ValueEnum;
use serde::Serialize;

use cxxsema_core::TyRef;
use cxxsema_cpp::Probe;
use cxxsema_error::{Error, ErrorKind, Result};

use crate::pipeline::FileReport;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// A problem type reported for one probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProblemRecord {
    pub code: String,
    pub message: String,
}

/// One resolved expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub file: String,
    pub line: usize,
    pub expr: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub problem: Option<ProblemRecord>,
}

impl Record {
    pub fn new(file: &str, probe: &Probe, ty: &TyRef, rendered: String) -> Self {
        let problem = ty.problem_info().map(|problem| ProblemRecord {
            code: problem.code.id().to_string(),
            message: problem.to_string(),
        });
        Self {
            file: file.to_string(),
            line: probe.line,
            expr: probe.text.clone(),
            ty: rendered,
            problem,
        }
    }

    pub fn is_problem(&self) -> bool {
        self.problem.is_some()
    }
}

/// Render all records of `reports` in input order.
pub fn render(reports: &[FileReport], format: OutputFormat, problems_only: bool) -> Result<String> {
    let records = reports
        .iter()
        .flat_map(|report| &report.records)
        .filter(|record| !problems_only || record.is_problem());

    match format {
        OutputFormat::Text => {
            let mut out = String::new();
            for record in records {
                write_line(&mut out, record).map_err(|err| {
                    Error::new(ErrorKind::SerializationFailed, err.to_string())
                        .with_operation("output::render")
                        .with_context("file", record.file.as_str())
                })?;
            }
            Ok(out)
        }
        OutputFormat::Json => {
            let records: Vec<&Record> = records.collect();
            serde_json::to_string_pretty(&records).map_err(|err| {
                Error::new(ErrorKind::SerializationFailed, err.to_string())
                    .with_operation("output::render")
                    .set_source(err)
            })
        }
    }
}

fn write_line(out: &mut impl Write, record: &Record) -> std::fmt::Result {
    match &record.problem {
        Some(problem) => writeln!(
            out,
            "{}:{}: error[{}]: {}",
            record.file, record.line, problem.code, problem.message
        ),
        None => writeln!(
            out,
            "{}:{}: {} : {}",
            record.file, record.line, record.expr, record.ty
        ),
    }
}
