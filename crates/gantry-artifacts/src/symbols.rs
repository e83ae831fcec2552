//! Debug symbol archive builder

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, info, instrument};

use gantry_core::config::Config;
use gantry_core::{AssemblyError, BuildOutput, SymbolArchive};

use crate::archive::{list_files, ArchiveWriter};

/// Options for symbol collection
#[derive(Debug, Clone)]
pub struct SymbolOptions {
    /// Root of generated files; archives go to `<output_dir>/symbols/`
    pub output_dir: PathBuf,
    /// Exclusion globs, matched against `<target>/<relative path>`
    pub exclude: Vec<String>,
    /// Whether builds are expected to leave symbol files
    pub expect_symbols: bool,
}

impl SymbolOptions {
    /// Options from configuration
    pub fn from_config(config: &Config, output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            exclude: config.symbols.exclude.clone(),
            expect_symbols: config.toolchain.produces_symbols,
        }
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, AssemblyError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| AssemblyError::InvalidPattern {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| AssemblyError::InvalidPattern {
        pattern: patterns.join(", "),
        reason: e.to_string(),
    })
}

/// Archive the symbol files of one variant.
///
/// Every file in the symbol directory of a build is a candidate, named
/// `<target>/<relative path>`. Candidates matching an exclusion glob are
/// dropped. Returns `Ok(None)` when symbols are not expected and none were
/// found; an empty result is an error when they are expected.
#[instrument(skip(outputs, options), fields(outputs = outputs.len()))]
pub fn collect_symbols(
    variant: &str,
    outputs: &[BuildOutput],
    options: &SymbolOptions,
) -> Result<Option<SymbolArchive>, AssemblyError> {
    let exclude = build_globset(&options.exclude)?;

    let mut candidates = Vec::new();
    for output in outputs {
        let Some(dir) = output.symbols.as_deref().and_then(Path::parent) else {
            debug!(abi = %output.target, "build left no symbols");
            continue;
        };

        for (relative, path) in list_files(dir)? {
            let name = format!("{}/{}", output.target, relative);
            if exclude.is_match(&name) {
                debug!(entry = %name, "symbol file excluded");
                continue;
            }
            candidates.push((name, path));
        }
    }

    if candidates.is_empty() {
        if options.expect_symbols && !outputs.is_empty() {
            return Err(AssemblyError::EmptyArchive {
                variant: variant.to_string(),
            });
        }
        debug!("no symbol files to archive");
        return Ok(None);
    }

    let path = options
        .output_dir
        .join("symbols")
        .join(format!("{}.zip", variant));

    let mut writer = ArchiveWriter::create(&path)?;
    for (name, source) in &candidates {
        writer.add_file(name, source)?;
    }
    let entries = writer.finish()?;

    info!(archive = %path.display(), entries = entries.len(), "symbol archive written");
    Ok(Some(SymbolArchive {
        variant: variant.to_string(),
        path,
        entries,
    }))
}
