//! File-path to raster decoding.

use std::path::Path;

use image::DynamicImage;
use tracing::debug;

use crate::engine::SlideEngine;
use crate::error::CountError;

/// Extension of proprietary slide files routed through the engine.
const SLIDE_EXTENSION: &str = "vsi";

/// Decodes slide and raster files into in-memory images.
///
/// Borrows an optional [`SlideEngine`]; plain raster formats decode without
/// one, proprietary slides require it.
pub struct SlideLoader<'e> {
    engine: Option<&'e SlideEngine>,
}

impl<'e> SlideLoader<'e> {
    /// Loader for plain raster files only.
    pub fn new() -> Self {
        Self { engine: None }
    }

    /// Loader that can also decode proprietary slides through `engine`.
    pub fn with_engine(engine: &'e SlideEngine) -> Self {
        Self {
            engine: Some(engine),
        }
    }

    /// Whether `path` would be routed through the slide engine.
    pub fn is_slide(path: &Path) -> bool {
        path.extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(SLIDE_EXTENSION))
    }

    /// Decode `path` into a raster image.
    pub fn load(&self, path: &Path) -> Result<DynamicImage, CountError> {
        if !path.exists() {
            return Err(CountError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        if Self::is_slide(path) {
            let engine = self.engine.ok_or_else(|| CountError::EngineRequired {
                path: path.to_path_buf(),
            })?;
            debug!("decoding slide {}", path.display());
            return engine.decode(path);
        }

        debug!("decoding raster {}", path.display());
        image::open(path).map_err(|e| CountError::ImageLoad {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

impl Default for SlideLoader<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn slide_extension_is_detected_case_insensitively() {
        assert!(SlideLoader::is_slide(Path::new("a/b/slide_m.vsi")));
        assert!(SlideLoader::is_slide(Path::new("a/b/SLIDE_M.VSI")));
        assert!(!SlideLoader::is_slide(Path::new("a/b/region.png")));
        assert!(!SlideLoader::is_slide(Path::new("a/b/no_extension")));
    }

    #[test]
    fn missing_file_is_a_definite_failure() {
        let loader = SlideLoader::new();
        let err = loader
            .load(Path::new("/nonexistent/slide_m.vsi"))
            .expect_err("must fail");
        assert!(matches!(err, CountError::FileNotFound { .. }));
    }

    #[test]
    fn slide_without_engine_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path: PathBuf = dir.path().join("slide_m.vsi");
        std::fs::write(&path, b"opaque").expect("write");

        let loader = SlideLoader::new();
        let err = loader.load(&path).expect_err("must fail");
        assert!(matches!(err, CountError::EngineRequired { .. }));
    }

    #[test]
    fn undecodable_raster_reports_image_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").expect("write");

        let loader = SlideLoader::new();
        let err = loader.load(&path).expect_err("must fail");
        assert!(matches!(err, CountError::ImageLoad { .. }));
    }

    #[test]
    fn raster_round_trip_decodes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("plane.png");
        let img = image::RgbImage::from_pixel(8, 8, image::Rgb([1, 2, 3]));
        img.save(&path).expect("save");

        let loader = SlideLoader::new();
        let loaded = loader.load(&path).expect("load");
        assert_eq!(loaded.width(), 8);
        assert_eq!(loaded.height(), 8);
    }
}
