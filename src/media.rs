//! Media file filtering and metadata probing.
//! Pixel dimensions come from image headers or the GStreamer discoverer.

use std::path::{Path, PathBuf};

use gstreamer as gst;
use gstreamer_pbutils as gst_pbutils;
use thiserror::Error;
use tracing::debug;

/// Supported image extensions
pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] = &[
    "gif", "png", "jpg", "jpeg", "tif", "tiff", "jfif", "bmp", "eps", "raw", "cr2", "nef", "orf",
    "sr2",
];

/// Supported video extensions
pub const SUPPORTED_VIDEO_EXTENSIONS: &[&str] =
    &["mp4", "mov", "wmv", "flv", "avi", "avchd", "webm", "mkv"];

/// All extensions offered by the open dialog (videos first, then images)
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    // Videos
    "mp4", "mov", "wmv", "flv", "avi", "avchd", "webm", "mkv",
    // Images
    "gif", "png", "jpg", "jpeg", "tif", "tiff", "jfif", "bmp", "eps", "raw", "cr2", "nef", "orf",
    "sr2",
];

/// How long the discoverer may take on one file
const DISCOVER_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{0}: unsupported file type")]
    UnsupportedType(PathBuf),
    #[error("{path}: could not read media dimensions: {reason}")]
    Unreadable { path: PathBuf, reason: String },
    #[error("{path}: media reports zero size ({width}x{height})")]
    ZeroDimension {
        path: PathBuf,
        width: u32,
        height: u32,
    },
}

/// Check if a file is any supported media (image or video)
pub fn is_supported_media(path: &Path) -> bool {
    is_supported_image(path) || is_supported_video(path)
}

/// Check if a file has one of the image extensions
pub fn is_supported_image(path: &Path) -> bool {
    has_extension_in(path, SUPPORTED_IMAGE_EXTENSIONS)
}

/// Check if a file has one of the video container extensions
pub fn is_supported_video(path: &Path) -> bool {
    has_extension_in(path, SUPPORTED_VIDEO_EXTENSIONS)
}

fn has_extension_in(path: &Path, list: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| list.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Source of pixel dimensions for a media file
pub trait MetadataReader {
    fn dimensions(&self, path: &Path) -> Result<(u32, u32), MediaError>;
}

/// Reads image headers directly and falls back to the GStreamer discoverer
/// for video containers and camera formats.
#[derive(Debug, Default)]
pub struct MediaProbe;

impl MediaProbe {
    pub fn new() -> Self {
        Self
    }

    fn image_header_size(path: &Path) -> Option<(u32, u32)> {
        match imagesize::size(path) {
            Ok(size) => Some((size.width as u32, size.height as u32)),
            Err(e) => {
                debug!("imagesize could not read {}: {:?}", path.display(), e);
                None
            }
        }
    }

    fn discover_size(path: &Path) -> Result<(u32, u32), MediaError> {
        let unreadable = |reason: String| MediaError::Unreadable {
            path: path.to_path_buf(),
            reason,
        };

        let abs_path = std::fs::canonicalize(path).map_err(|e| unreadable(e.to_string()))?;
        let uri = gst::glib::filename_to_uri(&abs_path, None).map_err(|e| unreadable(e.to_string()))?;

        let discoverer = gst_pbutils::Discoverer::new(gst::ClockTime::from_seconds(DISCOVER_TIMEOUT_SECS))
            .map_err(|e| unreadable(e.to_string()))?;
        let info = discoverer
            .discover_uri(&uri)
            .map_err(|e| unreadable(e.to_string()))?;

        let video = info
            .video_streams()
            .into_iter()
            .next()
            .ok_or_else(|| unreadable("no video stream".to_string()))?;

        Ok((video.width(), video.height()))
    }
}

impl MetadataReader for MediaProbe {
    fn dimensions(&self, path: &Path) -> Result<(u32, u32), MediaError> {
        if !is_supported_media(path) {
            return Err(MediaError::UnsupportedType(path.to_path_buf()));
        }

        let header = if is_supported_image(path) {
            Self::image_header_size(path)
        } else {
            None
        };
        let (width, height) = match header {
            Some(size) => size,
            None => Self::discover_size(path)?,
        };

        if width == 0 || height == 0 {
            return Err(MediaError::ZeroDimension {
                path: path.to_path_buf(),
                width,
                height,
            });
        }

        debug!("{} is {}x{}", path.display(), width, height);
        Ok((width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Signature plus IHDR chunk, which is all a header probe reads.
    fn png_header(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.extend_from_slice(&13u32.to_be_bytes());
        bytes.extend_from_slice(b"IHDR");
        bytes.extend_from_slice(&width.to_be_bytes());
        bytes.extend_from_slice(&height.to_be_bytes());
        bytes.extend_from_slice(&[8, 6, 0, 0, 0]);
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        bytes
    }

    #[test]
    fn extension_filter_is_case_insensitive() {
        assert!(is_supported_media(Path::new("clip.MOV")));
        assert!(is_supported_media(Path::new("holiday.WebM")));
        assert!(is_supported_media(Path::new("scan.CR2")));
        assert!(!is_supported_media(Path::new("notes.txt")));
        assert!(!is_supported_media(Path::new("no_extension")));
        assert!(is_supported_video(Path::new("clip.MKV")));
        assert!(!is_supported_video(Path::new("photo.jpg")));
    }

    #[test]
    fn image_and_video_lists_cover_the_dialog_filter() {
        for ext in SUPPORTED_EXTENSIONS {
            let in_images = SUPPORTED_IMAGE_EXTENSIONS.contains(ext);
            let in_videos = SUPPORTED_VIDEO_EXTENSIONS.contains(ext);
            assert!(in_images ^ in_videos, "{ext} must be in exactly one list");
        }
        assert_eq!(
            SUPPORTED_EXTENSIONS.len(),
            SUPPORTED_IMAGE_EXTENSIONS.len() + SUPPORTED_VIDEO_EXTENSIONS.len()
        );
    }

    #[test]
    fn reads_png_dimensions_from_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.png");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(&png_header(1920, 1080))
            .unwrap();

        assert_eq!(MediaProbe::new().dimensions(&path).unwrap(), (1920, 1080));
    }

    #[test]
    fn zero_sized_media_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.png");
        std::fs::write(&path, png_header(0, 480)).unwrap();

        let err = MediaProbe::new().dimensions(&path).unwrap_err();
        assert!(matches!(err, MediaError::ZeroDimension { width: 0, height: 480, .. }));
    }

    #[test]
    fn rejects_unsupported_extension() {
        let err = MediaProbe::new()
            .dimensions(Path::new("readme.md"))
            .unwrap_err();
        assert!(matches!(err, MediaError::UnsupportedType(_)));
    }
}
