//! Camera capture.
//!
//! A [`CameraSession`] holds the media stream for as long as the capture
//! preview is open. The stream is stopped on capture, on cancel and when the
//! session is dropped, whichever comes first.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Url;
use tracing::{debug, info};

use crate::error::{Result, WidgetError};

pub const INSECURE_ORIGIN_MESSAGE: &str =
    "カメラは安全な接続（HTTPS）またはローカル環境でのみ利用できます。";
pub const CAMERA_UNAVAILABLE_MESSAGE: &str =
    "カメラにアクセスできませんでした。権限と接続環境をご確認ください。";

/// Prefix of a captured frame as sent to the proxy
pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Which camera to ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    User,
    Environment,
}

/// A live video stream
pub trait MediaStream: Send {
    /// Grab the current frame, PNG-encoded
    fn capture_png(&mut self) -> Result<Vec<u8>>;

    /// Stop every track; calling it twice is harmless
    fn stop(&mut self);
}

/// Source of media streams (the platform's `getUserMedia`)
#[async_trait]
pub trait CameraDevice: Send + Sync {
    async fn open(&self, facing: FacingMode) -> Result<Box<dyn MediaStream>>;
}

/// Camera access needs a secure context: `https:` pages, or a page served
/// from `localhost` / `127.0.0.1`.
pub fn is_secure_origin(page_url: &str) -> bool {
    let Ok(url) = Url::parse(page_url) else {
        return false;
    };
    if url.scheme() == "https" {
        return true;
    }
    matches!(url.host_str(), Some("localhost") | Some("127.0.0.1"))
}

/// Encode PNG bytes as a `data:` URL
pub fn png_data_url(png: &[u8]) -> String {
    format!("{}{}", PNG_DATA_URL_PREFIX, STANDARD.encode(png))
}

/// Open capture preview
pub struct CameraSession {
    stream: Option<Box<dyn MediaStream>>,
}

impl std::fmt::Debug for CameraSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraSession")
            .field("active", &self.stream.is_some())
            .finish()
    }
}

impl CameraSession {
    /// Acquire the environment-facing camera
    pub async fn open(device: &dyn CameraDevice, page_url: &str) -> Result<Self> {
        if !is_secure_origin(page_url) {
            return Err(WidgetError::Camera(INSECURE_ORIGIN_MESSAGE.to_string()));
        }
        let stream = device.open(FacingMode::Environment).await?;
        info!("Camera stream acquired");
        Ok(Self {
            stream: Some(stream),
        })
    }

    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    /// Grab one frame as a PNG data URL and release the stream
    pub fn capture(mut self) -> Result<String> {
        let mut stream = self
            .stream
            .take()
            .ok_or_else(|| WidgetError::Camera("Camera stream already released".to_string()))?;
        let frame = stream.capture_png();
        stream.stop();
        debug!("Camera stream released after capture");
        Ok(png_data_url(&frame?))
    }

    /// Close the preview without capturing
    pub fn cancel(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            debug!("Camera stream released");
        }
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.release();
    }
}
