//! Skyline rectangle packing.
//!
//! The packer keeps a skyline: a left-to-right staircase of horizontal
//! segments marking the lowest free row above each column range. A rectangle
//! is placed at the lowest position where it fits, leftmost on ties, and the
//! skyline is raised over the columns it covers. Placements are final; there
//! is no repacking.

use std::cmp::Reverse;

/// A segment of the skyline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SkylineNode {
    /// Left edge of the segment.
    x: u32,
    /// First free row above the segment.
    y: u32,
    /// Segment width.
    width: u32,
}

/// A rectangle to place, and its placement once packed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PackRect {
    /// Caller-defined identifier, carried through unchanged.
    pub id: usize,
    /// Requested width.
    pub width: u32,
    /// Requested height.
    pub height: u32,
    /// Assigned left edge (valid when `packed`).
    pub x: u32,
    /// Assigned top edge (valid when `packed`).
    pub y: u32,
    /// Whether a placement was found.
    pub packed: bool,
}

impl PackRect {
    /// Create an unpacked request.
    pub fn new(id: usize, width: u32, height: u32) -> Self {
        Self {
            id,
            width,
            height,
            ..Self::default()
        }
    }

    /// Whether two packed rectangles share any pixel.
    pub fn overlaps(&self, other: &PackRect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }

    /// Bottom edge (exclusive).
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }
}

/// Skyline bottom-left packer for a fixed-size target.
#[derive(Debug, Clone)]
pub struct AtlasPacker {
    width: u32,
    height: u32,
    skyline: Vec<SkylineNode>,
    packed_count: usize,
    packed_area: u64,
}

impl AtlasPacker {
    /// Create a packer for a `width` x `height` target.
    ///
    /// `capacity` is the expected number of rectangles and only sizes the
    /// internal skyline storage.
    pub fn new(width: u32, height: u32, capacity: usize) -> Self {
        let mut skyline = Vec::with_capacity(capacity.max(1));
        skyline.push(SkylineNode { x: 0, y: 0, width });
        Self {
            width,
            height,
            skyline,
            packed_count: 0,
            packed_area: 0,
        }
    }

    /// Target width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Target height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of rectangles placed so far.
    pub fn packed_count(&self) -> usize {
        self.packed_count
    }

    /// Fraction of the target area covered by placed rectangles.
    pub fn usage(&self) -> f32 {
        let total = self.width as u64 * self.height as u64;
        if total == 0 {
            return 0.0;
        }
        self.packed_area as f32 / total as f32
    }

    /// Pack a batch of rectangles.
    ///
    /// The batch is placed tallest first, but results are written back into
    /// `rects` in their original order. Returns `true` if every rectangle
    /// was placed.
    pub fn pack(&mut self, rects: &mut [PackRect]) -> bool {
        let mut order: Vec<usize> = (0..rects.len()).collect();
        order.sort_by_key(|&i| (Reverse(rects[i].height), Reverse(rects[i].width)));

        let mut all_packed = true;
        for i in order {
            let rect = &mut rects[i];
            match self.allocate(rect.width, rect.height) {
                Some((x, y)) => {
                    rect.x = x;
                    rect.y = y;
                    rect.packed = true;
                }
                None => {
                    rect.packed = false;
                    all_packed = false;
                }
            }
        }
        all_packed
    }

    /// Place a single rectangle, returning its top-left corner.
    ///
    /// Zero-sized rectangles always succeed at the origin without touching
    /// the skyline.
    pub fn allocate(&mut self, width: u32, height: u32) -> Option<(u32, u32)> {
        if width == 0 || height == 0 {
            return Some((0, 0));
        }
        if width > self.width || height > self.height {
            return None;
        }

        let mut best: Option<(usize, u32)> = None;
        for idx in 0..self.skyline.len() {
            if let Some(y) = self.fit(idx, width, height) {
                if best.is_none_or(|(_, best_y)| y < best_y) {
                    best = Some((idx, y));
                }
            }
        }

        let (idx, y) = best?;
        let x = self.skyline[idx].x;
        self.raise(idx, x, y + height, width);

        self.packed_count += 1;
        self.packed_area += width as u64 * height as u64;
        Some((x, y))
    }

    /// Lowest row at which a `width` x `height` rectangle fits with its left
    /// edge on skyline node `idx`.
    fn fit(&self, idx: usize, width: u32, height: u32) -> Option<u32> {
        let x = self.skyline[idx].x;
        if x + width > self.width {
            return None;
        }

        let right = x + width;
        let mut y = 0;
        for node in &self.skyline[idx..] {
            if node.x >= right {
                break;
            }
            y = y.max(node.y);
            if y + height > self.height {
                return None;
            }
        }
        Some(y)
    }

    /// Replace the skyline over `x..x + width` with a segment at `top`.
    fn raise(&mut self, idx: usize, x: u32, top: u32, width: u32) {
        let right = x + width;

        while idx < self.skyline.len() {
            let node = self.skyline[idx];
            if node.x >= right {
                break;
            }
            let node_right = node.x + node.width;
            if node_right > right {
                self.skyline[idx] = SkylineNode {
                    x: right,
                    y: node.y,
                    width: node_right - right,
                };
                break;
            }
            self.skyline.remove(idx);
        }

        self.skyline.insert(
            idx,
            SkylineNode {
                x,
                y: top,
                width,
            },
        );
        self.merge();
    }

    /// Merge neighbouring segments at the same height.
    fn merge(&mut self) {
        let mut i = 0;
        while i + 1 < self.skyline.len() {
            if self.skyline[i].y == self.skyline[i + 1].y {
                self.skyline[i].width += self.skyline[i + 1].width;
                self.skyline.remove(i + 1);
            } else {
                i += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_disjoint(rects: &[PackRect]) {
        for (i, a) in rects.iter().enumerate() {
            for b in &rects[i + 1..] {
                assert!(!a.overlaps(b), "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn test_first_rect_lands_at_origin() {
        let mut packer = AtlasPacker::new(64, 64, 4);
        assert_eq!(packer.allocate(10, 12), Some((0, 0)));
        assert_eq!(packer.allocate(10, 12), Some((10, 0)));
        assert_eq!(packer.packed_count(), 2);
    }

    #[test]
    fn test_bottom_left_prefers_lowest_row() {
        let mut packer = AtlasPacker::new(20, 64, 4);
        assert_eq!(packer.allocate(10, 20), Some((0, 0)));
        assert_eq!(packer.allocate(10, 5), Some((10, 0)));
        // The shorter column on the right is lower, so the next rect goes there.
        assert_eq!(packer.allocate(10, 5), Some((10, 5)));
        // A rect spanning both columns sits on top of the taller one.
        assert_eq!(packer.allocate(20, 4), Some((0, 20)));
    }

    #[test]
    fn test_rejects_when_full() {
        let mut packer = AtlasPacker::new(16, 16, 4);
        assert!(packer.allocate(16, 16).is_some());
        assert!(packer.allocate(1, 1).is_none());
        assert!(packer.allocate(17, 1).is_none());
    }

    #[test]
    fn test_zero_sized_rect_always_fits() {
        let mut packer = AtlasPacker::new(4, 4, 1);
        assert!(packer.allocate(4, 4).is_some());
        assert_eq!(packer.allocate(0, 3), Some((0, 0)));
    }

    #[test]
    fn test_batch_keeps_call_order() {
        let mut packer = AtlasPacker::new(32, 32, 3);
        let mut rects = [
            PackRect::new(7, 4, 2),
            PackRect::new(8, 4, 9),
            PackRect::new(9, 4, 5),
        ];
        assert!(packer.pack(&mut rects));
        assert_eq!(rects.map(|r| r.id), [7, 8, 9]);
        // Tallest is placed first.
        assert_eq!((rects[1].x, rects[1].y), (0, 0));
        assert_disjoint(&rects);
    }

    #[test]
    fn test_batch_reports_failures() {
        let mut packer = AtlasPacker::new(8, 8, 2);
        let mut rects = [PackRect::new(0, 8, 8), PackRect::new(1, 2, 2)];
        assert!(!packer.pack(&mut rects));
        assert!(rects[0].packed);
        assert!(!rects[1].packed);
    }

    #[test]
    fn test_many_rects_never_overlap() {
        let mut packer = AtlasPacker::new(128, 256, 200);
        let mut placed = Vec::new();
        for i in 0..200u32 {
            let w = 1 + (i * 7) % 13;
            let h = 1 + (i * 5) % 11;
            if let Some((x, y)) = packer.allocate(w, h) {
                assert!(x + w <= 128 && y + h <= 256);
                placed.push(PackRect {
                    id: i as usize,
                    width: w,
                    height: h,
                    x,
                    y,
                    packed: true,
                });
            }
        }
        assert_eq!(placed.len(), 200);
        assert_disjoint(&placed);
        assert!(packer.usage() > 0.0 && packer.usage() <= 1.0);
    }
}
