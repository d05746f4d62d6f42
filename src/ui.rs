use std::fmt;

/// A point in absolute screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UIPoint {
    pub x: i32,
    pub y: i32,
}

impl UIPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for UIPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Bounding box of one place where a pattern was found.
///
/// `(x1, y1)` is the top-left corner, `(x2, y2)` is the top-left corner plus
/// the pattern size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    pub score: f32,
}

impl Match {
    pub fn width(&self) -> u32 {
        (self.x2 - self.x1) as u32
    }

    pub fn height(&self) -> u32 {
        (self.y2 - self.y1) as u32
    }

    pub fn center(&self) -> UIPoint {
        UIPoint::new((self.x1 + self.x2) / 2, (self.y1 + self.y2) / 2)
    }

    /// Moves the box by `(dx, dy)`.
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x1: self.x1 + dx,
            y1: self.y1 + dy,
            x2: self.x2 + dx,
            y2: self.y2 + dy,
            score: self.score,
        }
    }
}

/// All matches of one capture+match attempt, in raster scan order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResult {
    matches: Vec<Match>,
}

impl SearchResult {
    pub fn new(matches: Vec<Match>) -> Self {
        Self { matches }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        !self.matches.is_empty()
    }

    // Scan order, not the best score: the topmost-leftmost hit wins even if a
    // later one correlates better.
    pub fn first(&self) -> Option<&Match> {
        self.matches.first()
    }

    pub fn center(&self) -> Option<UIPoint> {
        self.first().map(Match::center)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn button() -> Match {
        Match {
            x1: 100,
            y1: 200,
            x2: 140,
            y2: 230,
            score: 1.0,
        }
    }

    #[test]
    fn test_center_uses_integer_halving() {
        assert_eq!(button().center(), UIPoint::new(120, 215));

        let odd = Match {
            x1: 0,
            y1: 0,
            x2: 5,
            y2: 3,
            score: 0.9,
        };
        assert_eq!(odd.center(), UIPoint::new(2, 1));
    }

    #[test]
    fn test_offset_keeps_size() {
        let moved = button().offset(-100, 50);
        assert_eq!((moved.x1, moved.y1, moved.x2, moved.y2), (0, 250, 40, 280));
        assert_eq!((moved.width(), moved.height()), (40, 30));
    }

    #[test]
    fn test_search_result_first_is_scan_order() {
        let later = Match {
            score: 0.99,
            ..button().offset(0, 10)
        };
        let first = Match {
            score: 0.75,
            ..button()
        };
        let result = SearchResult::new(vec![first, later]);

        assert!(result.is_valid());
        assert_eq!(result.first(), Some(&first));
        assert_eq!(result.center(), Some(UIPoint::new(120, 215)));
    }

    #[test]
    fn test_empty_result_is_not_valid() {
        let result = SearchResult::empty();
        assert!(!result.is_valid());
        assert_eq!(result.center(), None);
    }
}
