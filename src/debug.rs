use anyhow::Context;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::fs;
use std::path::{Path, PathBuf};

use crate::actions::Bot;
use crate::input::{ClickOptions, Pointer};
use crate::screen::{ScreenCapturer, Screenshot};
use crate::ui::{Match, UIPoint};

const DEBUG_SCALE: f32 = 0.3;
const BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

#[derive(Debug, Clone)]
pub struct Located {
    pub name: String,
    pub center: UIPoint,
    pub snapshot: PathBuf,
}

/// Looks for each named pattern, points at it and saves the screenshot with
/// the first match boxed in.
///
/// The pointer only hovers over each match and is then put back. Nothing is
/// clicked. Patterns that don't show up within the default timeout are skipped.
pub fn locate_patterns<S: ScreenCapturer, P: Pointer>(
    bot: &mut Bot<S, P>,
    names: &[String],
    out_dir: &Path,
) -> anyhow::Result<Vec<Located>> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create '{}'", out_dir.display()))?;

    let mut located = Vec::new();
    for name in names {
        let outcome = bot.wait_for(name, bot.default_timeout())?;
        let (Some(first), Some(shot)) = (outcome.result.first(), outcome.screenshot.as_ref())
        else {
            continue;
        };
        let center = first.center();
        bot.press(&outcome, ClickOptions::hover())?;

        let now = chrono::Local::now();
        let snapshot = out_dir.join(format!("{}-{}.png", name, now.format("%Y-%m-%dT%H-%M-%S")));
        annotate(shot, first)
            .save(&snapshot)
            .with_context(|| format!("failed to save '{}'", snapshot.display()))?;

        located.push(Located {
            name: name.clone(),
            center,
            snapshot,
        });
    }
    Ok(located)
}

/// Screenshot in colour with a 2px box around `found`, shrunk for viewing.
pub fn annotate(shot: &Screenshot, found: &Match) -> RgbImage {
    let mut canvas = DynamicImage::ImageLuma8(shot.image.clone()).into_rgb8();
    let x = found.x1 - shot.origin.x;
    let y = found.y1 - shot.origin.y;
    for inset in 0..2 {
        let width = found.width().saturating_sub(2 * inset as u32).max(1);
        let height = found.height().saturating_sub(2 * inset as u32).max(1);
        let rect = Rect::at(x + inset, y + inset).of_size(width, height);
        draw_hollow_rect_mut(&mut canvas, rect, BOX_COLOR);
    }

    let width = ((canvas.width() as f32 * DEBUG_SCALE) as u32).max(1);
    let height = ((canvas.height() as f32 * DEBUG_SCALE) as u32).max(1);
    imageops::resize(&canvas, width, height, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::HOME_BEFORE;
    use crate::assets::PatternSet;
    use crate::config::BotConfig;
    use crate::testutil::{RecordingPointer, ScriptedScreen, blank, noise, paste, pattern};

    #[test]
    fn test_annotate_boxes_the_match_and_scales_down() {
        let shot = Screenshot::new(blank(100, 50, 0), UIPoint::new(-100, 0));
        let found = Match {
            x1: -90,
            y1: 10,
            x2: -50,
            y2: 40,
            score: 1.0,
        };

        let image = annotate(&shot, &found);
        assert_eq!(image.dimensions(), (30, 15));
        // box corner at (10, 10) lands on (3, 3) after scaling
        assert!(image.get_pixel(3, 3)[0] > 0);
        assert_eq!(image.get_pixel(3, 3)[1], 0);
        assert_eq!(image.get_pixel(25, 2), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_locate_saves_found_patterns_only() {
        let home = pattern(HOME_BEFORE, noise(40, 30, 5));
        let mut screen = blank(320, 260, 30);
        paste(&mut screen, &home.image, 100, 200);

        let mut patterns = PatternSet::default();
        patterns.insert(home);
        patterns.insert(pattern("gacha", noise(40, 30, 6)));
        let config = BotConfig {
            timeout_secs: 0.05,
            poll_interval_ms: 5,
            ..BotConfig::default()
        };
        let mut bot = Bot::new(
            ScriptedScreen::still(screen),
            RecordingPointer::at(UIPoint::new(1, 1)),
            patterns,
            &config,
        );

        let dir = tempfile::tempdir().unwrap();
        let names = vec![HOME_BEFORE.to_string(), "gacha".to_string()];
        let located = locate_patterns(&mut bot, &names, dir.path()).unwrap();

        assert_eq!(located.len(), 1);
        assert_eq!(located[0].name, HOME_BEFORE);
        assert_eq!(located[0].center, UIPoint::new(120, 215));
        let saved = image::open(&located[0].snapshot).unwrap();
        assert_eq!((saved.width(), saved.height()), (96, 78));

        assert_eq!(bot.pointer().clicks(), 0);
        assert_eq!(bot.pointer().position, UIPoint::new(1, 1));
    }
}
