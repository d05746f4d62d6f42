//! Normalized cross-correlation template matching.
//!
//! Scores are the correlation coefficient between the pattern and the screen
//! window under it (both mean-subtracted), so they lie in [-1, 1] and do not
//! depend on the brightness or contrast of the window.

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::template_matching::find_extremes;
use log::debug;
use rayon::prelude::*;

use crate::assets::Pattern;
use crate::error::PatternError;
use crate::screen::Screenshot;
use crate::ui::{Match, SearchResult};

/// Row segments this long still fit a `u32` sum of `u8 * u8` products.
const DOT_CHUNK: usize = 4096;

/// Top-left offset of a hit inside the searched image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub x: u32,
    pub y: u32,
    pub score: f32,
}

/// Finds every place `pattern` appears in `shot` with a score >= `threshold`.
///
/// Matches are in raster order (row by row, left to right) and are reported in
/// absolute screen coordinates. Overlapping hits are all kept.
pub fn find_matches(
    shot: &Screenshot,
    pattern: &Pattern,
    threshold: f32,
) -> Result<SearchResult, PatternError> {
    check_fits(&shot.image, pattern)?;

    let hits = locate(&shot.image, &pattern.image, threshold);
    let (width, height) = pattern.image.dimensions();
    let matches: Vec<Match> = hits
        .iter()
        .map(|hit| {
            Match {
                x1: hit.x as i32,
                y1: hit.y as i32,
                x2: (hit.x + width) as i32,
                y2: (hit.y + height) as i32,
                score: hit.score,
            }
            .offset(shot.origin.x, shot.origin.y)
        })
        .collect();

    if let Some(first) = matches.first() {
        debug!(
            "MATCH '{}' -> {} hit(s), first ({}, {}) to ({}, {}) score={:.4}",
            pattern.name,
            matches.len(),
            first.x1,
            first.y1,
            first.x2,
            first.y2,
            first.score
        );
    }
    Ok(SearchResult::new(matches))
}

fn check_fits(screen: &GrayImage, pattern: &Pattern) -> Result<(), PatternError> {
    let (pattern_width, pattern_height) = pattern.image.dimensions();
    if pattern_width == 0 || pattern_height == 0 {
        return Err(PatternError::Empty {
            name: pattern.name.clone(),
        });
    }
    let (screen_width, screen_height) = screen.dimensions();
    if pattern_width > screen_width || pattern_height > screen_height {
        return Err(PatternError::TooLarge {
            name: pattern.name.clone(),
            pattern_width,
            pattern_height,
            screen_width,
            screen_height,
        });
    }
    Ok(())
}

/// Slides `template` over `image` and returns every offset scoring at least
/// `threshold`, in raster order.
///
/// Sums are kept in integers so the score does not lose precision on bright,
/// low-contrast windows. Rows of offsets are scored in parallel.
///
/// `template` must be non-empty and no larger than `image`.
pub fn locate(image: &GrayImage, template: &GrayImage, threshold: f32) -> Vec<Hit> {
    let (template_width, template_height) = template.dimensions();
    let out_width = image.width() - template_width + 1;
    let out_height = image.height() - template_height + 1;
    let area = u64::from(template_width) * u64::from(template_height);

    let image_sums = SummedArea::new(image);
    let template_stats = WindowStats::from_sums(
        area,
        template.pixels().map(|p| u64::from(p[0])).sum(),
        template.pixels().map(|p| u64::from(p[0]).pow(2)).sum(),
    );

    let mut scores = vec![0f32; out_width as usize * out_height as usize];
    scores
        .par_chunks_mut(out_width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, score) in row.iter_mut().enumerate() {
                let (x, y) = (x as u32, y as u32);
                let window = image_sums.window(x, y, template_width, template_height);
                *score = window_score(image, template, x, y, &window, &template_stats);
            }
        });

    let hits: Vec<Hit> = scores
        .iter()
        .enumerate()
        .filter(|(_, score)| **score >= threshold)
        .map(|(i, score)| Hit {
            x: (i % out_width as usize) as u32,
            y: (i / out_width as usize) as u32,
            score: *score,
        })
        .collect();

    if hits.is_empty() {
        let scores: Option<ImageBuffer<Luma<f32>, Vec<f32>>> =
            ImageBuffer::from_raw(out_width, out_height, scores);
        if let Some(scores) = scores {
            let extremes = find_extremes(&scores);
            debug!(
                "NO MATCH -> best x={}, y={}, score={:.4}",
                extremes.max_value_location.0, extremes.max_value_location.1, extremes.max_value
            );
        }
    }
    hits
}

/// Sum and sum of squares of a block of pixels.
#[derive(Debug, Clone, Copy)]
struct WindowStats {
    area: u64,
    sum: u64,
    /// `area * sum(x^2) - sum(x)^2`, i.e. the variance scaled by `area^2`.
    spread: i128,
}

impl WindowStats {
    fn from_sums(area: u64, sum: u64, squares: u64) -> Self {
        let spread = i128::from(area) * i128::from(squares) - i128::from(sum).pow(2);
        Self { area, sum, spread }
    }

    fn is_flat(&self) -> bool {
        self.spread == 0
    }
}

/// Summed-area tables of pixel values and squared pixel values.
///
/// Row and column 0 are zero padding so any window sum is four lookups.
struct SummedArea {
    stride: usize,
    sums: Vec<u64>,
    squares: Vec<u64>,
}

impl SummedArea {
    fn new(image: &GrayImage) -> Self {
        let (width, height) = image.dimensions();
        let stride = width as usize + 1;
        let mut sums = vec![0u64; stride * (height as usize + 1)];
        let mut squares = vec![0u64; sums.len()];

        for y in 0..height as usize {
            let mut row_sum = 0u64;
            let mut row_squares = 0u64;
            for x in 0..width as usize {
                let value = u64::from(image.get_pixel(x as u32, y as u32)[0]);
                row_sum += value;
                row_squares += value * value;
                let at = (y + 1) * stride + x + 1;
                sums[at] = sums[at - stride] + row_sum;
                squares[at] = squares[at - stride] + row_squares;
            }
        }
        Self {
            stride,
            sums,
            squares,
        }
    }

    fn window(&self, x: u32, y: u32, width: u32, height: u32) -> WindowStats {
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + width as usize, y0 + height as usize);
        let rect = |table: &[u64]| {
            table[y1 * self.stride + x1] + table[y0 * self.stride + x0]
                - table[y0 * self.stride + x1]
                - table[y1 * self.stride + x0]
        };
        WindowStats::from_sums(
            u64::from(width) * u64::from(height),
            rect(&self.sums),
            rect(&self.squares),
        )
    }
}

fn flat_score(window: &WindowStats, template: &WindowStats) -> Option<f32> {
    match (window.is_flat(), template.is_flat()) {
        (true, true) if window.sum == template.sum => Some(1.0),
        (true, _) | (_, true) => Some(0.0),
        _ => None,
    }
}

/// `sum(image * template)` over the window at `(x, y)`.
fn cross_product(image: &GrayImage, template: &GrayImage, x: u32, y: u32) -> u64 {
    let stride = image.width() as usize;
    let width = template.width() as usize;
    let pixels = image.as_raw();
    template
        .as_raw()
        .chunks_exact(width)
        .take(template.height() as usize)
        .enumerate()
        .map(|(dy, template_row)| {
            let start = (y as usize + dy) * stride + x as usize;
            dot(&pixels[start..start + width], template_row)
        })
        .sum()
}

fn dot(a: &[u8], b: &[u8]) -> u64 {
    a.chunks(DOT_CHUNK)
        .zip(b.chunks(DOT_CHUNK))
        .map(|(a, b)| {
            let sum: u32 = a
                .iter()
                .zip(b)
                .map(|(&p, &q)| u32::from(p) * u32::from(q))
                .sum();
            u64::from(sum)
        })
        .sum()
}

fn window_score(
    image: &GrayImage,
    template: &GrayImage,
    x: u32,
    y: u32,
    window: &WindowStats,
    template_stats: &WindowStats,
) -> f32 {
    if let Some(score) = flat_score(window, template_stats) {
        return score;
    }

    let cross = cross_product(image, template, x, y);
    let numerator = i128::from(window.area) * i128::from(cross)
        - i128::from(window.sum) * i128::from(template_stats.sum);

    // A pixel-identical window must score exactly 1 so that threshold 1.0 finds it.
    let perfect = numerator > 0
        && numerator
            .checked_mul(numerator)
            .zip(window.spread.checked_mul(template_stats.spread))
            .is_some_and(|(square, product)| square == product);
    if perfect {
        return 1.0;
    }

    let denominator = (window.spread as f64).sqrt() * (template_stats.spread as f64).sqrt();
    (numerator as f64 / denominator).clamp(-1.0, 1.0) as f32
}
