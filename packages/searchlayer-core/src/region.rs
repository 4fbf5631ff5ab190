use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Rectangle as declared in markup: top-down pixel coordinates, `x0 y0` top-left, `x1 y1`
/// bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PixelBox {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl PixelBox {
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> i64 {
        i64::from(self.x1) - i64::from(self.x0)
    }

    pub fn height(&self) -> i64 {
        i64::from(self.y1) - i64::from(self.y0)
    }

    /// Re-expresses this box relative to `page`, flipping the vertical axis so that `y`
    /// grows upwards from the page bottom.
    pub fn to_page_relative(&self, page: &PixelBox) -> BoundingBox {
        let offset = |a: i32, b: i32| (i64::from(a) - i64::from(b)) as f32;
        BoundingBox {
            left: offset(self.x0, page.x0),
            right: offset(self.x1, page.x0),
            top: offset(page.y1, self.y0),
            bottom: offset(page.y1, self.y1),
        }
    }
}

impl fmt::Display for PixelBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bbox {} {} {} {}", self.x0, self.y0, self.x1, self.y1)
    }
}

/// Axis-aligned rectangle with a bottom-up vertical axis. Pixel units until a
/// [`PageGeometry`](crate::geometry::PageGeometry) maps it to page points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
    pub top: f32,
}

impl BoundingBox {
    pub fn new(left: f32, bottom: f32, right: f32, top: f32) -> Self {
        Self {
            left,
            bottom,
            right,
            top,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.top - self.bottom
    }

    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            left: self.left.min(other.left),
            bottom: self.bottom.min(other.bottom),
            right: self.right.max(other.right),
            top: self.top.max(other.top),
        }
    }

    pub fn scaled(&self, sx: f32, sy: f32) -> BoundingBox {
        BoundingBox {
            left: self.left * sx,
            bottom: self.bottom * sy,
            right: self.right * sx,
            top: self.top * sy,
        }
    }

    pub fn translated(&self, dx: f32, dy: f32) -> BoundingBox {
        BoundingBox {
            left: self.left + dx,
            bottom: self.bottom + dy,
            right: self.right + dx,
            top: self.top + dy,
        }
    }
}

/// One recognized unit of text: a line or a word, depending on the positioning mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRegion {
    pub page: u32,
    pub text: String,
    pub bounding_box: BoundingBox,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl TextRegion {
    pub fn new(page: u32, text: impl Into<String>, bounding_box: BoundingBox) -> Self {
        Self {
            page,
            text: text.into(),
            bounding_box,
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: Option<f32>) -> Self {
        self.confidence = confidence;
        self
    }

    /// Builds a new region covering every part, carrying `text`. The parts are left as
    /// they are. Returns `None` for an empty slice.
    pub fn merged(parts: &[TextRegion], text: impl Into<String>) -> Option<TextRegion> {
        let (first, rest) = parts.split_first()?;
        let bounding_box = rest
            .iter()
            .fold(first.bounding_box, |acc, r| acc.union(&r.bounding_box));
        let scores: Vec<f32> = parts.iter().filter_map(|r| r.confidence).collect();
        let confidence = if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f32>() / scores.len() as f32)
        };
        Some(TextRegion {
            page: first.page,
            text: text.into(),
            bounding_box,
            confidence,
        })
    }
}

/// Ordered `page number (1-based) -> regions` mapping for one source image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageIndex {
    pages: BTreeMap<u32, Vec<TextRegion>>,
}

impl PageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the regions of one completed page and returns the number it was stored under.
    ///
    /// A page number that is already taken (two recognition passes both claiming it) is
    /// moved to `max(existing) + 1` instead of overwriting, and the regions are renumbered
    /// accordingly.
    pub fn insert_page(&mut self, page: u32, mut regions: Vec<TextRegion>) -> u32 {
        let assigned = if self.pages.contains_key(&page) {
            self.next_free_page()
        } else {
            page
        };
        if assigned != page {
            for region in &mut regions {
                region.page = assigned;
            }
        }
        self.pages.insert(assigned, regions);
        assigned
    }

    /// `max + 1`, or the lowest unused number once `max` is `u32::MAX`.
    fn next_free_page(&self) -> u32 {
        match self.max_page() {
            Some(max) => max
                .checked_add(1)
                .unwrap_or_else(|| (1..=u32::MAX).find(|n| !self.pages.contains_key(n)).unwrap_or(0)),
            None => 1,
        }
    }

    pub fn get(&self, page: u32) -> Option<&[TextRegion]> {
        self.pages.get(&page).map(Vec::as_slice)
    }

    pub fn pages(&self) -> impl Iterator<Item = (u32, &[TextRegion])> {
        self.pages.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    pub fn max_page(&self) -> Option<u32> {
        self.pages.keys().next_back().copied()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn total_regions(&self) -> usize {
        self.pages.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(page: u32, text: &str) -> TextRegion {
        TextRegion::new(page, text, BoundingBox::new(0.0, 0.0, 10.0, 10.0))
    }

    #[test]
    fn test_page_relative_flips_vertical_axis() {
        let page = PixelBox::new(0, 0, 200, 100);
        let word = PixelBox::new(10, 10, 60, 30);
        let bbox = word.to_page_relative(&page);
        assert_eq!(bbox, BoundingBox::new(10.0, 70.0, 60.0, 90.0));
    }

    #[test]
    fn test_page_relative_respects_page_origin() {
        let page = PixelBox::new(5, 5, 105, 55);
        let bbox = PixelBox::new(15, 10, 25, 20).to_page_relative(&page);
        assert_eq!(bbox.left, 10.0);
        assert_eq!(bbox.top, 45.0);
        assert_eq!(bbox.bottom, 35.0);
    }

    #[test]
    fn test_merged_takes_union_and_leaves_parts_alone() {
        let a = TextRegion::new(1, "wor", BoundingBox::new(10.0, 5.0, 30.0, 20.0))
            .with_confidence(Some(90.0));
        let b = TextRegion::new(1, "ld", BoundingBox::new(31.0, 4.0, 45.0, 19.0))
            .with_confidence(Some(80.0));
        let parts = vec![a.clone(), b.clone()];
        let merged = TextRegion::merged(&parts, "world").unwrap();

        assert_eq!(merged.text, "world");
        assert_eq!(merged.bounding_box, BoundingBox::new(10.0, 4.0, 45.0, 20.0));
        assert_eq!(merged.confidence, Some(85.0));
        assert_eq!(parts[0], a);
        assert_eq!(parts[1], b);
    }

    #[test]
    fn test_merged_empty() {
        assert!(TextRegion::merged(&[], "x").is_none());
    }

    #[test]
    fn test_page_collision_renumbers_without_loss() {
        let mut index = PageIndex::new();
        assert_eq!(index.insert_page(1, vec![region(1, "a"), region(1, "b")]), 1);
        assert_eq!(index.insert_page(1, vec![region(1, "c")]), 2);
        assert_eq!(index.insert_page(1, vec![region(1, "d")]), 3);

        assert_eq!(index.len(), 3);
        assert_eq!(index.total_regions(), 4);
        assert_eq!(index.get(2).unwrap()[0].text, "c");
        assert_eq!(index.get(2).unwrap()[0].page, 2);
        assert_eq!(index.get(3).unwrap()[0].page, 3);
    }

    #[test]
    fn test_collision_goes_past_highest_page() {
        let mut index = PageIndex::new();
        index.insert_page(1, vec![]);
        index.insert_page(5, vec![]);
        assert_eq!(index.insert_page(1, vec![region(1, "x")]), 6);
        let order: Vec<u32> = index.pages().map(|(n, _)| n).collect();
        assert_eq!(order, vec![1, 5, 6]);
    }

    #[test]
    fn test_page_relative_extreme_coordinates() {
        let page = PixelBox::new(i32::MIN, i32::MIN, i32::MAX, i32::MAX);
        let bbox = PixelBox::new(i32::MIN, 0, 10, 20).to_page_relative(&page);
        assert_eq!(bbox.left, 0.0);
        assert!(bbox.right > 2.0e9);
        assert!(bbox.top >= bbox.bottom);
        assert_eq!(page.width(), u32::MAX as i64);
    }

    #[test]
    fn test_collision_at_highest_page_number_reuses_free_number() {
        let mut index = PageIndex::new();
        index.insert_page(u32::MAX, vec![region(u32::MAX, "last")]);
        assert_eq!(index.insert_page(u32::MAX, vec![region(u32::MAX, "again")]), 1);
        assert_eq!(index.get(1).unwrap()[0].page, 1);
        assert_eq!(index.total_regions(), 2);
    }
}
