//! Fakes for the screen and pointer boundaries.

use image::{GrayImage, Luma};
use std::collections::VecDeque;
use std::path::PathBuf;

use crate::assets::Pattern;
use crate::error::{CaptureError, InputError};
use crate::input::Pointer;
use crate::screen::{ScreenCapturer, Screenshot};
use crate::ui::UIPoint;

/// Deterministic texture so every window differs from its neighbours.
pub fn noise(width: u32, height: u32, seed: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let mut v = x
            .wrapping_mul(374_761_393)
            .wrapping_add(y.wrapping_mul(668_265_263))
            .wrapping_add(seed.wrapping_mul(2_246_822_519));
        v = (v ^ (v >> 13)).wrapping_mul(1_274_126_177);
        Luma([(v >> 24) as u8])
    })
}

pub fn blank(width: u32, height: u32, value: u8) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([value]))
}

pub fn paste(screen: &mut GrayImage, pattern: &GrayImage, x: u32, y: u32) {
    image::imageops::replace(screen, pattern, i64::from(x), i64::from(y));
}

pub fn pattern(name: &str, image: GrayImage) -> Pattern {
    Pattern {
        name: name.to_string(),
        path: PathBuf::from(format!("{name}.png")),
        image,
    }
}

pub enum Frame {
    Image(GrayImage),
    Fail(CaptureError),
}

/// Plays back frames in order, then keeps repeating the last image.
pub struct ScriptedScreen {
    frames: VecDeque<Frame>,
    last: GrayImage,
    pub calls: u32,
}

impl ScriptedScreen {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames: frames.into(),
            last: blank(320, 260, 30),
            calls: 0,
        }
    }

    /// The same image on every capture.
    pub fn still(image: GrayImage) -> Self {
        Self::new(vec![Frame::Image(image)])
    }
}

impl ScreenCapturer for ScriptedScreen {
    fn capture(&mut self) -> Result<Screenshot, CaptureError> {
        self.calls += 1;
        match self.frames.pop_front() {
            Some(Frame::Image(image)) => self.last = image,
            Some(Frame::Fail(err)) => return Err(err),
            None => {}
        }
        Ok(Screenshot::new(self.last.clone(), UIPoint::new(0, 0)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    Move(UIPoint),
    Click(UIPoint),
}

pub struct RecordingPointer {
    pub position: UIPoint,
    pub events: Vec<PointerEvent>,
    pub fail_clicks: bool,
}

impl RecordingPointer {
    pub fn at(position: UIPoint) -> Self {
        Self {
            position,
            events: Vec::new(),
            fail_clicks: false,
        }
    }

    pub fn clicks(&self) -> usize {
        self.clicked_at().len()
    }

    pub fn clicked_at(&self) -> Vec<UIPoint> {
        self.events
            .iter()
            .filter_map(|event| match event {
                PointerEvent::Click(point) => Some(*point),
                PointerEvent::Move(_) => None,
            })
            .collect()
    }
}

impl Pointer for RecordingPointer {
    fn location(&self) -> Result<UIPoint, InputError> {
        Ok(self.position)
    }

    fn move_to(&mut self, point: UIPoint) -> Result<(), InputError> {
        self.position = point;
        self.events.push(PointerEvent::Move(point));
        Ok(())
    }

    fn left_click(&mut self) -> Result<(), InputError> {
        if self.fail_clicks {
            return Err(enigo::InputError::Simulate("click rejected").into());
        }
        self.events.push(PointerEvent::Click(self.position));
        Ok(())
    }
}
