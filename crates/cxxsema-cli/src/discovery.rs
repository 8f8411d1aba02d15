//! File discovery and filtering for cxxsema.

use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;

use ignore::WalkBuilder;
use tracing::info;

use cxxsema_error::{Error, ErrorKind, Result};

use crate::CxxsemaOptions;

/// Directories to skip during file discovery.
fn should_skip_dir(name: &str) -> bool {
    matches!(
        name,
        // Build output directories
        "target"
            | "build"
            | "dist"
            | "out"
            | "cmake-build-debug"
            | "cmake-build-release"
            // Vendor/dependency directories
            | "vendor"
            | "node_modules"
            | "third_party"
    )
}

/// Check if a file is generated from a schema (protobuf, flatbuffers, gRPC).
fn is_generated_file(path: &Path) -> bool {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    file_name.ends_with(".pb.h")
        || file_name.ends_with(".pb.cc")
        || file_name.ends_with(".grpc.pb.h")
        || file_name.ends_with(".grpc.pb.cc")
        || file_name.ends_with("_generated.h")
}

/// Discover files matching any of the given extensions.
///
/// Walks `opts.dirs` and collects files with matching extensions,
/// plus any explicit `opts.files`. Explicit files are kept even when
/// their extension does not match.
pub fn discover_files(opts: &CxxsemaOptions, extensions: &HashSet<&str>) -> Result<Vec<String>> {
    let discovery_start = Instant::now();

    let mut seen = HashSet::new();
    let mut files = Vec::new();
    let mut skipped_count = 0usize;

    let mut add_path = |path: &str| {
        if seen.contains(path) {
            return;
        }
        if is_generated_file(Path::new(path)) {
            skipped_count += 1;
            return;
        }
        seen.insert(path.to_string());
        files.push(path.to_string());
    };

    for file in &opts.files {
        add_path(file);
    }

    for dir in &opts.dirs {
        if !Path::new(dir).is_dir() {
            return Err(Error::file_not_found(dir.as_str()).with_operation("discovery::walk"));
        }

        let mut builder = WalkBuilder::new(dir);
        builder
            .standard_filters(true)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(|entry| {
                if entry.depth() == 0 {
                    return true;
                }
                let Some(file_type) = entry.file_type() else {
                    return true;
                };
                if !file_type.is_dir() {
                    return true;
                }
                let Some(name) = entry.file_name().to_str() else {
                    return true;
                };
                !should_skip_dir(&name.to_ascii_lowercase())
            });

        for entry in builder.build() {
            let entry = entry.map_err(|e| {
                Error::new(ErrorKind::TraversalFailed, e.to_string())
                    .with_operation("discovery::walk")
                    .with_context("dir", dir.as_str())
                    .set_source(e)
            })?;

            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let path = entry.path();
            let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
                continue;
            };

            if extensions.contains(ext) {
                add_path(&path.to_string_lossy());
            }
        }
    }

    if skipped_count > 0 {
        info!("Skipped {} generated files", skipped_count);
    }

    info!(
        "File discovery: {:.2}s ({} files)",
        discovery_start.elapsed().as_secs_f64(),
        files.len()
    );

    if files.is_empty() {
        return Err(Error::new(
            ErrorKind::FileNotFound,
            "No input files found. Check that the directory contains C++ sources.",
        )
        .with_operation("discovery::discover_files"));
    }

    Ok(files)
}
