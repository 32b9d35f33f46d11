//! Batch reporting: directory traversal, suffix filtering, and CSV output.
//!
//! Traverses a directory tree of slides at a fixed nesting depth, runs the
//! per-image pipeline on every qualifying file, and appends one CSV row per
//! processed image. Rows are flushed as they are written, so an interrupted
//! run keeps everything produced so far.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::CountError;
use crate::loader::SlideLoader;
use crate::pipeline::Analyzer;
use crate::CountSummary;

/// Directory nesting expected under the batch root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BatchLayout {
    /// `root/<slide-file>` — one label column (the file name).
    Slides,
    /// `root/<collection>/<slide>/<region-file>` — three label columns.
    CollectionSlideRegion,
}

/// What to do when a qualifying file fails to load or decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum MissingPolicy {
    /// Log the failure and continue with the next file.
    #[default]
    SkipAndLog,
    /// Abort the whole batch on the first failure.
    Abort,
}

/// Shape of the trailing count columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum RowSchema {
    /// `[labels..., valid]`
    ValidOnly,
    /// `[labels..., valid, total]`
    #[default]
    ValidAndTotal,
}

/// Batch traversal configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BatchConfig {
    /// Nesting depth under the root.
    pub layout: BatchLayout,
    /// Required filename suffix; the only discriminator for which files
    /// qualify (e.g. `m.vsi` marker-stain slides, `d.vsi` nuclear slides).
    pub suffix: String,
    /// Failure policy for qualifying files that cannot be processed.
    pub missing: MissingPolicy,
    /// Trailing column shape.
    pub schema: RowSchema,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            layout: BatchLayout::Slides,
            suffix: "m.vsi".to_string(),
            missing: MissingPolicy::default(),
            schema: RowSchema::default(),
        }
    }
}

/// Outcome counters for one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Rows appended to the report.
    pub rows_written: usize,
    /// Entries that did not match the suffix convention.
    pub skipped: usize,
    /// Qualifying files that failed under [`MissingPolicy::SkipAndLog`].
    pub failed: usize,
}

/// Minimal CSV row writer: comma-delimited, no header, quote-on-demand,
/// flush per row.
pub struct CsvWriter<W: Write> {
    inner: W,
}

impl<W: Write> CsvWriter<W> {
    /// Wrap a sink.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Append one row and flush it.
    pub fn write_row(&mut self, fields: &[&str]) -> std::io::Result<()> {
        let mut first = true;
        for field in fields {
            if !first {
                self.inner.write_all(b",")?;
            }
            first = false;
            if field.contains([',', '"', '\n']) {
                let escaped = field.replace('"', "\"\"");
                write!(self.inner, "\"{escaped}\"")?;
            } else {
                self.inner.write_all(field.as_bytes())?;
            }
        }
        self.inner.write_all(b"\n")?;
        self.inner.flush()
    }
}

/// Walk `root` per the batch layout and append one row per processed file.
pub fn run_batch<W: Write>(
    loader: &SlideLoader<'_>,
    analyzer: &Analyzer,
    config: &BatchConfig,
    root: &Path,
    out: &mut CsvWriter<W>,
) -> Result<BatchStats, CountError> {
    let mut stats = BatchStats::default();

    match config.layout {
        BatchLayout::Slides => {
            for slide in sorted_entries(root)? {
                let labels = [entry_name(&slide)];
                process_entry(loader, analyzer, config, &slide, &labels, out, &mut stats)?;
            }
        }
        BatchLayout::CollectionSlideRegion => {
            for collection in sorted_entries(root)? {
                if !collection.is_dir() {
                    info!("skipping non-directory {}", collection.display());
                    stats.skipped += 1;
                    continue;
                }
                for slide in sorted_entries(&collection)? {
                    if !slide.is_dir() {
                        info!("skipping non-directory {}", slide.display());
                        stats.skipped += 1;
                        continue;
                    }
                    for region in sorted_entries(&slide)? {
                        let labels = [
                            entry_name(&collection),
                            entry_name(&slide),
                            entry_name(&region),
                        ];
                        process_entry(
                            loader, analyzer, config, &region, &labels, out, &mut stats,
                        )?;
                    }
                }
            }
        }
    }

    info!(
        "batch complete: {} rows, {} skipped, {} failed",
        stats.rows_written, stats.skipped, stats.failed
    );
    Ok(stats)
}

fn process_entry<W: Write>(
    loader: &SlideLoader<'_>,
    analyzer: &Analyzer,
    config: &BatchConfig,
    path: &Path,
    labels: &[String],
    out: &mut CsvWriter<W>,
    stats: &mut BatchStats,
) -> Result<(), CountError> {
    if !qualifies(path, &config.suffix) {
        info!("skipping {}", path.display());
        stats.skipped += 1;
        return Ok(());
    }

    let summary = match analyzer.analyze_file(loader, path) {
        Ok(analysis) => analysis.summary,
        Err(e) => match config.missing {
            MissingPolicy::Abort => return Err(e),
            MissingPolicy::SkipAndLog => {
                warn!("failed on {}: {e}", path.display());
                stats.failed += 1;
                return Ok(());
            }
        },
    };

    write_record(out, labels, summary, config.schema)?;
    stats.rows_written += 1;
    info!(
        "{}: valid={} total={}",
        path.display(),
        summary.valid,
        summary.total
    );
    Ok(())
}

fn write_record<W: Write>(
    out: &mut CsvWriter<W>,
    labels: &[String],
    summary: CountSummary,
    schema: RowSchema,
) -> std::io::Result<()> {
    let valid = summary.valid.to_string();
    let total = summary.total.to_string();
    let mut fields: Vec<&str> = labels.iter().map(String::as_str).collect();
    fields.push(&valid);
    if schema == RowSchema::ValidAndTotal {
        fields.push(&total);
    }
    out.write_row(&fields)
}

/// Is this a regular file whose name carries the required suffix?
fn qualifies(path: &Path, suffix: &str) -> bool {
    path.is_file()
        && path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(suffix))
}

/// Directory entries in lexicographic name order.
fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, CountError> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|e| e.path())
        .collect();
    entries.sort();
    Ok(entries)
}

fn entry_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::test_utils::{fill_disc, rgb_canvas};

    fn save_synthetic(path: &Path) {
        let mut img = rgb_canvas(80, 80);
        fill_disc(&mut img, [40.0, 40.0], 20.0, [255, 0, 0]);
        fill_disc(&mut img, [40.0, 40.0], 6.0, [255, 0, 255]);
        img.save(path).expect("save synthetic image");
    }

    #[test]
    fn csv_rows_quote_on_demand() {
        let mut buf = Vec::new();
        {
            let mut w = CsvWriter::new(&mut buf);
            w.write_row(&["plain", "with,comma", "with\"quote"]).unwrap();
        }
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "plain,\"with,comma\",\"with\"\"quote\"\n"
        );
    }

    #[test]
    fn flat_batch_emits_one_row_per_qualifying_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        save_synthetic(&dir.path().join("slide_bm.png"));
        save_synthetic(&dir.path().join("slide_am.png"));
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let config = BatchConfig {
            layout: BatchLayout::Slides,
            suffix: "m.png".to_string(),
            missing: MissingPolicy::SkipAndLog,
            schema: RowSchema::ValidAndTotal,
        };
        let loader = SlideLoader::new();
        let analyzer = Analyzer::with_config(AnalysisConfig::dual_stain());

        let mut buf = Vec::new();
        let stats = run_batch(
            &loader,
            &analyzer,
            &config,
            dir.path(),
            &mut CsvWriter::new(&mut buf),
        )
        .expect("batch");

        assert_eq!(stats.rows_written, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.failed, 0);

        let text = String::from_utf8(buf).unwrap();
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows.len(), 2);
        // Lexicographic order, label column first.
        assert!(rows[0].starts_with("slide_am.png,"));
        assert!(rows[1].starts_with("slide_bm.png,"));
        assert!(rows[0].ends_with(",1,1"));
    }

    #[test]
    fn nested_batch_carries_three_label_columns() {
        let dir = tempfile::tempdir().expect("tempdir");
        let region_dir = dir.path().join("groupA").join("slide1");
        std::fs::create_dir_all(&region_dir).unwrap();
        save_synthetic(&region_dir.join("region_m.png"));

        let config = BatchConfig {
            layout: BatchLayout::CollectionSlideRegion,
            suffix: "m.png".to_string(),
            missing: MissingPolicy::SkipAndLog,
            schema: RowSchema::ValidOnly,
        };
        let loader = SlideLoader::new();
        let analyzer = Analyzer::with_config(AnalysisConfig::dual_stain());

        let mut buf = Vec::new();
        let stats = run_batch(
            &loader,
            &analyzer,
            &config,
            dir.path(),
            &mut CsvWriter::new(&mut buf),
        )
        .expect("batch");

        assert_eq!(stats.rows_written, 1);
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().next().unwrap(), "groupA,slide1,region_m.png,1");
    }

    #[test]
    fn skip_policy_survives_a_broken_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        save_synthetic(&dir.path().join("good_m.png"));
        std::fs::write(dir.path().join("bad_m.png"), b"not an image").unwrap();

        let config = BatchConfig {
            layout: BatchLayout::Slides,
            suffix: "m.png".to_string(),
            missing: MissingPolicy::SkipAndLog,
            schema: RowSchema::ValidAndTotal,
        };
        let loader = SlideLoader::new();
        let analyzer = Analyzer::with_config(AnalysisConfig::dual_stain());

        let mut buf = Vec::new();
        let stats = run_batch(
            &loader,
            &analyzer,
            &config,
            dir.path(),
            &mut CsvWriter::new(&mut buf),
        )
        .expect("batch");

        assert_eq!(stats.rows_written, 1);
        assert_eq!(stats.failed, 1);
    }

    #[test]
    fn abort_policy_stops_the_batch() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("bad_m.png"), b"not an image").unwrap();

        let config = BatchConfig {
            layout: BatchLayout::Slides,
            suffix: "m.png".to_string(),
            missing: MissingPolicy::Abort,
            schema: RowSchema::ValidAndTotal,
        };
        let loader = SlideLoader::new();
        let analyzer = Analyzer::with_config(AnalysisConfig::dual_stain());

        let mut buf = Vec::new();
        let result = run_batch(
            &loader,
            &analyzer,
            &config,
            dir.path(),
            &mut CsvWriter::new(&mut buf),
        );
        assert!(matches!(result, Err(CountError::ImageLoad { .. })));
    }
}
