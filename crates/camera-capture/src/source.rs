//! Frame sources

use crate::{CameraConfig, CameraError, VideoFrame};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A source of video frames.
///
/// `next_frame` returns `Ok(None)` once the source has ended. `is_active`
/// mirrors a video element's "playing and not ended" state.
pub trait FrameSource {
    /// Pull the next frame
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError>;

    /// Whether the source is currently producing frames
    fn is_active(&self) -> bool;
}

/// Synthetic camera producing uniformly coloured frames
pub struct SyntheticCamera {
    config: CameraConfig,
    rgb: [u8; 3],
    sequence: u32,
    frame_limit: Option<u32>,
}

impl SyntheticCamera {
    /// Create a synthetic camera with a mid-grey fill
    pub fn new(config: CameraConfig) -> Self {
        info!(
            "Creating synthetic camera {}x{} @ {}fps",
            config.width, config.height, config.fps
        );
        Self {
            config,
            rgb: [128, 128, 128],
            sequence: 0,
            frame_limit: None,
        }
    }

    /// Stop after `limit` frames
    pub fn with_frame_limit(mut self, limit: u32) -> Self {
        self.frame_limit = Some(limit);
        self
    }

    /// Set the grey level of subsequent frames
    pub fn set_brightness(&mut self, level: u8) {
        self.rgb = [level, level, level];
    }

    /// Set the fill colour of subsequent frames
    pub fn set_color(&mut self, rgb: [u8; 3]) {
        self.rgb = rgb;
    }

    fn ended(&self) -> bool {
        self.frame_limit.map_or(false, |limit| self.sequence >= limit)
    }
}

impl FrameSource for SyntheticCamera {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        if self.ended() {
            return Ok(None);
        }
        let timestamp_ns = self.config.frame_interval().as_nanos() as u64 * self.sequence as u64;
        let frame = VideoFrame::filled(
            self.config.width,
            self.config.height,
            self.rgb,
            timestamp_ns,
            self.sequence,
        );
        self.sequence += 1;
        Ok(Some(frame))
    }

    fn is_active(&self) -> bool {
        !self.ended()
    }
}

/// Replays a directory of still images in file-name order
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    position: usize,
    looping: bool,
    frame_interval_ns: u64,
    sequence: u32,
}

impl ImageSequenceSource {
    /// Open a directory of PNG/JPEG/BMP stills
    pub fn open(dir: impl AsRef<Path>, config: &CameraConfig, looping: bool) -> Result<Self, CameraError> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir)
            .map_err(|e| CameraError::Open(format!("{}: {}", dir.display(), e)))?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg" | "bmp"))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(CameraError::Open(format!("{}: no images found", dir.display())));
        }

        info!("Opened image sequence {} ({} frames)", dir.display(), paths.len());
        Ok(Self {
            paths,
            position: 0,
            looping,
            frame_interval_ns: config.frame_interval().as_nanos() as u64,
            sequence: 0,
        })
    }

    /// Number of stills in the sequence
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        if self.position >= self.paths.len() {
            if !self.looping {
                return Ok(None);
            }
            debug!("Image sequence wrapped");
            self.position = 0;
        }

        let path = &self.paths[self.position];
        self.position += 1;

        let img = image::open(path).map_err(|e| {
            warn!("Failed to decode {}: {}", path.display(), e);
            CameraError::Decode(format!("{}: {}", path.display(), e))
        })?;

        let frame = VideoFrame::from_rgb_image(
            img.to_rgb8(),
            self.frame_interval_ns * self.sequence as u64,
            self.sequence,
        );
        self.sequence += 1;
        Ok(Some(frame))
    }

    fn is_active(&self) -> bool {
        self.looping || self.position < self.paths.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_camera_limit() {
        let config = CameraConfig { width: 8, height: 6, fps: 10 };
        let mut camera = SyntheticCamera::new(config).with_frame_limit(2);

        assert!(camera.is_active());
        let first = camera.next_frame().unwrap().unwrap();
        assert_eq!(first.sequence, 0);
        assert_eq!(first.timestamp_ns, 0);

        let second = camera.next_frame().unwrap().unwrap();
        assert_eq!(second.timestamp_ns, 100_000_000);

        assert!(camera.next_frame().unwrap().is_none());
        assert!(!camera.is_active());
    }

    #[test]
    fn test_synthetic_brightness() {
        let mut camera = SyntheticCamera::new(CameraConfig::default());
        camera.set_brightness(20);
        let frame = camera.next_frame().unwrap().unwrap();
        assert_eq!(frame.center_pixel(), Some([20, 20, 20]));
    }

    #[test]
    fn test_image_sequence_missing_dir() {
        let result = ImageSequenceSource::open(
            "/definitely/not/a/real/dir",
            &CameraConfig::default(),
            false,
        );
        assert!(matches!(result, Err(CameraError::Open(_))));
    }

    #[test]
    fn test_image_sequence_replay() {
        let dir = std::env::temp_dir().join(format!("camera-capture-seq-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for (i, level) in [10u8, 200u8].iter().enumerate() {
            let img = image::RgbImage::from_pixel(4, 4, image::Rgb([*level, *level, *level]));
            img.save(dir.join(format!("frame_{}.png", i))).unwrap();
        }

        let mut source = ImageSequenceSource::open(&dir, &CameraConfig::default(), false).unwrap();
        assert_eq!(source.len(), 2);
        assert_eq!(source.next_frame().unwrap().unwrap().get_pixel(0, 0), Some([10, 10, 10]));
        assert_eq!(source.next_frame().unwrap().unwrap().get_pixel(0, 0), Some([200, 200, 200]));
        assert!(!source.is_active());
        assert!(source.next_frame().unwrap().is_none());

        std::fs::remove_dir_all(&dir).ok();
    }
}
