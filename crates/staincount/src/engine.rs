//! Scoped handle to the external proprietary-slide decoding engine.
//!
//! The engine is process-global: at most one live instance, started before
//! the first `.vsi` decode of a run and released exactly once when the
//! handle drops. Per-file start/stop is not supported — repeated engine
//! restarts within one process are unsafe in the underlying toolchain.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use image::DynamicImage;
use tempfile::TempDir;
use tracing::{debug, info};

use crate::error::CountError;

/// Name of the environment variable overriding the converter executable.
pub const CONVERTER_ENV: &str = "STAINCOUNT_CONVERTER";

/// Default converter executable searched on `PATH`.
pub const DEFAULT_CONVERTER: &str = "bfconvert";

static ENGINE_LIVE: AtomicBool = AtomicBool::new(false);

/// Engine startup options.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Explicit converter executable. When unset, `STAINCOUNT_CONVERTER`
    /// and then `PATH` lookup of `bfconvert` are tried in that order.
    pub converter: Option<PathBuf>,
}

/// Live handle to the slide decoding engine.
///
/// Holds the scratch directory for converted rasters and the process-wide
/// liveness flag; both are released on drop, on every exit path.
pub struct SlideEngine {
    converter: PathBuf,
    scratch: TempDir,
    seq: AtomicU64,
}

impl SlideEngine {
    /// Start the engine, verifying the converter executable is reachable.
    ///
    /// Errors with [`CountError::EngineAlreadyRunning`] if another handle is
    /// live in this process.
    pub fn start(config: &EngineConfig) -> Result<Self, CountError> {
        if ENGINE_LIVE.swap(true, Ordering::SeqCst) {
            return Err(CountError::EngineAlreadyRunning);
        }

        match Self::init(config) {
            Ok(engine) => Ok(engine),
            Err(e) => {
                ENGINE_LIVE.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    fn init(config: &EngineConfig) -> Result<Self, CountError> {
        let converter = resolve_converter(config)?;
        let scratch = TempDir::new()?;
        info!(
            "slide engine started (converter: {}, scratch: {})",
            converter.display(),
            scratch.path().display()
        );
        Ok(Self {
            converter,
            scratch,
            seq: AtomicU64::new(0),
        })
    }

    /// Path of the converter executable in use.
    pub fn converter(&self) -> &Path {
        &self.converter
    }

    /// Decode the first series/plane of a proprietary slide file.
    ///
    /// Converts the slide into a scratch PNG via the external tool, then
    /// decodes that raster.
    pub fn decode(&self, path: &Path) -> Result<DynamicImage, CountError> {
        let n = self.seq.fetch_add(1, Ordering::Relaxed);
        let out = self.scratch.path().join(format!("plane-{n:06}.png"));

        debug!("converting {} -> {}", path.display(), out.display());
        let output = Command::new(&self.converter)
            .arg("-overwrite")
            .arg("-series")
            .arg("0")
            .arg(path)
            .arg(&out)
            .output()
            .map_err(|e| CountError::ConverterFailed {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CountError::ConverterFailed {
                path: path.to_path_buf(),
                detail: format!("{} ({})", stderr.trim(), output.status),
            });
        }

        image::open(&out).map_err(|e| CountError::ImageLoad {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

impl Drop for SlideEngine {
    fn drop(&mut self) {
        info!("slide engine stopped");
        ENGINE_LIVE.store(false, Ordering::SeqCst);
    }
}

fn resolve_converter(config: &EngineConfig) -> Result<PathBuf, CountError> {
    if let Some(explicit) = &config.converter {
        if explicit.exists() {
            return Ok(explicit.clone());
        }
        return Err(CountError::ConverterNotFound {
            name: explicit.display().to_string(),
        });
    }

    if let Some(from_env) = std::env::var_os(CONVERTER_ENV) {
        let path = PathBuf::from(&from_env);
        if path.exists() {
            return Ok(path);
        }
        return Err(CountError::ConverterNotFound {
            name: path.display().to_string(),
        });
    }

    search_path(DEFAULT_CONVERTER).ok_or_else(|| CountError::ConverterNotFound {
        name: DEFAULT_CONVERTER.to_string(),
    })
}

/// Look an executable name up on `PATH`.
fn search_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    // One test covers the whole lifecycle: the liveness flag is process-wide,
    // so concurrent engine tests would interfere with each other.
    #[test]
    fn engine_lifecycle_enforces_single_instance() {
        let missing = EngineConfig {
            converter: Some(PathBuf::from("/nonexistent/converter-binary")),
        };
        assert!(matches!(
            SlideEngine::start(&missing),
            Err(CountError::ConverterNotFound { .. })
        ));

        // A placeholder converter file keeps startup verification offline.
        let dir = TempDir::new().expect("scratch dir");
        let fake = dir.path().join("fake-converter");
        File::create(&fake).expect("create placeholder");

        let config = EngineConfig {
            converter: Some(fake.clone()),
        };

        let engine = SlideEngine::start(&config).expect("first start");
        assert_eq!(engine.converter(), fake.as_path());

        // Second concurrent start must fail.
        assert!(matches!(
            SlideEngine::start(&config),
            Err(CountError::EngineAlreadyRunning)
        ));

        // Dropping releases the liveness flag and allows a fresh start.
        drop(engine);
        let engine = SlideEngine::start(&config).expect("restart after drop");
        drop(engine);
    }
}
