use enigo::{Button, Coordinate, Direction, Enigo, Mouse, Settings};
use log::debug;
use std::thread::sleep;
use std::time::Duration;

use crate::error::InputError;
use crate::ui::UIPoint;

/// Absolute pointer control.
pub trait Pointer {
    fn location(&self) -> Result<UIPoint, InputError>;
    fn move_to(&mut self, point: UIPoint) -> Result<(), InputError>;
    fn left_click(&mut self) -> Result<(), InputError>;
}

pub struct EnigoPointer {
    enigo: Enigo,
}

impl EnigoPointer {
    pub fn new() -> Result<Self, InputError> {
        Ok(Self {
            enigo: Enigo::new(&Settings::default())?,
        })
    }
}

impl Pointer for EnigoPointer {
    fn location(&self) -> Result<UIPoint, InputError> {
        let (x, y) = self.enigo.location()?;
        Ok(UIPoint::new(x, y))
    }

    fn move_to(&mut self, point: UIPoint) -> Result<(), InputError> {
        self.enigo.move_mouse(point.x, point.y, Coordinate::Abs)?;
        Ok(())
    }

    fn left_click(&mut self) -> Result<(), InputError> {
        self.enigo.button(Button::Left, Direction::Click)?;
        Ok(())
    }
}

/// Per call site timing for a click. The delays are tuned by hand for UI
/// elements that animate in, or need a moment before the next screen starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickOptions {
    pub click: bool,
    pub pre_click_delay: Duration,
    pub post_click_delay: Duration,
}

impl Default for ClickOptions {
    fn default() -> Self {
        Self {
            click: true,
            pre_click_delay: Duration::ZERO,
            post_click_delay: Duration::ZERO,
        }
    }
}

impl ClickOptions {
    pub fn hover() -> Self {
        Self {
            click: false,
            ..Self::default()
        }
    }
}

/// Moves the pointer to `target`, optionally clicks, then puts the pointer
/// back where it was so it doesn't hover over the game.
///
/// The pointer is restored even when the click fails; the click error is
/// returned afterwards.
pub fn move_and_click(
    pointer: &mut dyn Pointer,
    target: UIPoint,
    options: ClickOptions,
) -> Result<(), InputError> {
    let original = pointer.location()?;
    pointer.move_to(target)?;
    if !options.pre_click_delay.is_zero() {
        sleep(options.pre_click_delay);
    }

    let clicked = if options.click {
        debug!("Click at {}", target);
        pointer.left_click()
    } else {
        debug!("Hover at {}", target);
        Ok(())
    };

    pointer.move_to(original)?;
    clicked?;
    if !options.post_click_delay.is_zero() {
        sleep(options.post_click_delay);
    }
    Ok(())
}
