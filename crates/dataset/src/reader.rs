//! ImageFolderReader - FrameSource over a directory of images
//!
//! Images are sorted by file name and decoded on demand to grey `f32`.

use std::path::{Path, PathBuf};

use contracts::{ContractError, DecodedFrame, FrameId, FrameSource};
use image::imageops::FilterType;
use tracing::{debug, info};

use crate::calibration::PhotometricUndistorter;
use crate::error::{DatasetError, Result};
use crate::timestamps::{load_times, FrameTimes};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "pgm", "ppm", "bmp", "tif", "tiff"];

/// Read-only image sequence backed by a folder
#[derive(Debug)]
pub struct ImageFolderReader {
    name: String,
    dir: PathBuf,
    files: Vec<PathBuf>,
    times: FrameTimes,
    rescale: f64,
    photometric: Option<PhotometricUndistorter>,
}

impl ImageFolderReader {
    /// Open an image folder and its times file
    ///
    /// # Errors
    /// Missing directory, unreadable directory, or no images
    pub fn open(name: impl Into<String>, dir: impl Into<PathBuf>, rescale: f64) -> Result<Self> {
        let name = name.into();
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(DatasetError::DirectoryNotFound { path: dir });
        }

        let files = list_images(&dir)?;
        if files.is_empty() {
            return Err(DatasetError::NoImages { path: dir });
        }
        let times = load_times(&dir, files.len())?;

        info!(
            stream = %name,
            dir = %dir.display(),
            images = files.len(),
            "opened image folder"
        );

        Ok(Self {
            name,
            dir,
            files,
            times,
            rescale,
            photometric: None,
        })
    }

    /// Apply photometric correction to every decoded frame
    pub fn with_photometric(mut self, undistorter: PhotometricUndistorter) -> Self {
        self.photometric = Some(undistorter);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn photometric(&self) -> Option<&PhotometricUndistorter> {
        self.photometric.as_ref()
    }

    pub fn exposure(&self, id: FrameId) -> f32 {
        self.times.exposures.get(id).copied().unwrap_or(0.0)
    }

    pub fn path(&self, id: FrameId) -> Option<&Path> {
        self.files.get(id).map(PathBuf::as_path)
    }

    fn decode(&self, id: FrameId) -> Result<DecodedFrame> {
        let path = self.files.get(id).ok_or_else(|| DatasetError::OutOfRange {
            stream: self.name.clone(),
            id,
            count: self.files.len(),
        })?;

        let mut grey = image::open(path)
            .map_err(|source| DatasetError::Decode {
                path: path.clone(),
                source,
            })?
            .to_luma8();

        if self.rescale != 1.0 {
            let width = scaled(grey.width(), self.rescale);
            let height = scaled(grey.height(), self.rescale);
            grey = image::imageops::resize(&grey, width, height, FilterType::Triangle);
        }

        let (width, height) = grey.dimensions();
        let mut pixels: Vec<f32> = grey.into_raw().into_iter().map(f32::from).collect();
        if let Some(undistorter) = &self.photometric {
            undistorter.apply(width, height, &mut pixels);
        }

        debug!(stream = %self.name, id, width, height, "decoded frame");
        DecodedFrame::new(
            id,
            self.timestamp(id),
            self.exposure(id),
            width,
            height,
            pixels,
        )
        .map_err(|e| DatasetError::calibration(path, e.to_string()))
    }
}

impl FrameSource for ImageFolderReader {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> usize {
        self.files.len()
    }

    fn timestamp(&self, id: FrameId) -> f64 {
        self.times.timestamps.get(id).copied().unwrap_or(0.0)
    }

    fn load(&self, id: FrameId) -> std::result::Result<DecodedFrame, ContractError> {
        self.decode(id).map_err(ContractError::from)
    }
}

fn scaled(size: u32, factor: f64) -> u32 {
    ((size as f64 * factor).round() as u32).max(1)
}

fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let read_err = |source| DatasetError::Read {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()));
        if is_image && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
