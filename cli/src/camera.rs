//! Camera stand-in for the terminal: the "frame" is a PNG file chosen with
//! `/camera <file>`.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use concierge_widget::camera::{CameraDevice, FacingMode, MediaStream};
use concierge_widget::{Result, WidgetError};
use tracing::debug;

/// Holds the file the next capture will read
#[derive(Debug, Clone, Default)]
pub struct ImageFileCamera {
    next_image: Arc<Mutex<Option<PathBuf>>>,
}

impl ImageFileCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self, path: PathBuf) {
        if let Ok(mut slot) = self.next_image.lock() {
            *slot = Some(path);
        }
    }
}

struct FileStream {
    path: PathBuf,
    stopped: bool,
}

impl MediaStream for FileStream {
    fn capture_png(&mut self) -> Result<Vec<u8>> {
        if self.stopped {
            return Err(WidgetError::Camera("stream already stopped".to_string()));
        }
        Ok(fs::read(&self.path)?)
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}

#[async_trait]
impl CameraDevice for ImageFileCamera {
    async fn open(&self, facing: FacingMode) -> Result<Box<dyn MediaStream>> {
        let path = self
            .next_image
            .lock()
            .map_err(|_| WidgetError::Camera("camera state poisoned".to_string()))?
            .take()
            .ok_or_else(|| WidgetError::Camera("no image selected".to_string()))?;
        if !path.is_file() {
            return Err(WidgetError::Camera(format!("{} is not a file", path.display())));
        }
        debug!(?facing, path = %path.display(), "Opened image file as camera");
        Ok(Box::new(FileStream { path, stopped: false }))
    }
}
