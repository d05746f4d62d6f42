use image::{DynamicImage, GrayImage, imageops};
use log::debug;
use xcap::Monitor;

use crate::error::CaptureError;
use crate::ui::UIPoint;

/// A grayscale still of the screen.
///
/// `origin` is the absolute screen position of pixel (0, 0), so a hit at
/// image position (x, y) sits at `origin + (x, y)` on the desktop.
#[derive(Debug, Clone)]
pub struct Screenshot {
    pub image: GrayImage,
    pub origin: UIPoint,
}

impl Screenshot {
    pub fn new(image: GrayImage, origin: UIPoint) -> Self {
        Self { image, origin }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

pub trait ScreenCapturer {
    /// Grabs the current screen contents. Never cached.
    fn capture(&mut self) -> Result<Screenshot, CaptureError>;
}

/// Captures one monitor, or all of them as a single virtual desktop.
///
/// Index 0 is the combined desktop, 1.. are the monitors in the order the OS
/// enumerates them.
pub struct MonitorCapturer {
    index: usize,
}

impl MonitorCapturer {
    pub fn new(index: usize) -> Self {
        Self { index }
    }

    fn capture_monitor(monitor: &Monitor) -> Result<Screenshot, CaptureError> {
        let origin = UIPoint::new(monitor.x()?, monitor.y()?);
        let rgba = monitor.capture_image()?;
        let gray = DynamicImage::ImageRgba8(rgba).into_luma8();
        Ok(Screenshot::new(gray, origin))
    }

    fn capture_desktop(monitors: &[Monitor]) -> Result<Screenshot, CaptureError> {
        let shots = monitors
            .iter()
            .map(Self::capture_monitor)
            .collect::<Result<Vec<_>, _>>()?;
        stitch(&shots).ok_or(CaptureError::NoMonitors)
    }
}

impl ScreenCapturer for MonitorCapturer {
    fn capture(&mut self) -> Result<Screenshot, CaptureError> {
        let monitors = Monitor::all()?;
        if monitors.is_empty() {
            return Err(CaptureError::NoMonitors);
        }
        let shot = match self.index {
            0 => Self::capture_desktop(&monitors)?,
            n => {
                let monitor = monitors
                    .get(n - 1)
                    .ok_or(CaptureError::MonitorOutOfRange {
                        index: n,
                        available: monitors.len(),
                    })?;
                Self::capture_monitor(monitor)?
            }
        };
        debug!(
            "Captured monitor {}: {}x{} at {}",
            self.index,
            shot.width(),
            shot.height(),
            shot.origin
        );
        Ok(shot)
    }
}

/// Lays the shots out on one canvas spanning their bounding box.
///
/// Areas not covered by any monitor stay black.
pub fn stitch(shots: &[Screenshot]) -> Option<Screenshot> {
    let left = shots.iter().map(|s| s.origin.x).min()?;
    let top = shots.iter().map(|s| s.origin.y).min()?;
    let right = shots.iter().map(|s| s.origin.x + s.width() as i32).max()?;
    let bottom = shots.iter().map(|s| s.origin.y + s.height() as i32).max()?;

    let mut canvas = GrayImage::new((right - left) as u32, (bottom - top) as u32);
    for shot in shots {
        imageops::replace(
            &mut canvas,
            &shot.image,
            i64::from(shot.origin.x - left),
            i64::from(shot.origin.y - top),
        );
    }
    Some(Screenshot::new(canvas, UIPoint::new(left, top)))
}
