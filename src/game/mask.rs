//! Pixel masks for exact overlap tests

use glam::{IVec2, Vec2};

use crate::util::geometry::rotate_screen;

/// A 1-bit silhouette. Pixel (0, 0) is the top-left corner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: i32,
    height: i32,
    bits: Vec<bool>,
}

impl Mask {
    pub fn new(width: i32, height: i32) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        Self {
            width,
            height,
            bits: vec![false; (width * height) as usize],
        }
    }

    pub fn filled(width: i32, height: i32) -> Self {
        let mut mask = Self::new(width, height);
        mask.bits.fill(true);
        mask
    }

    pub fn get(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return false;
        }
        self.bits[(y * self.width + x) as usize]
    }

    /// Fill an axis-aligned rectangle, clipped to the mask
    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32) {
        for py in y.max(0)..(y + h).min(self.height) {
            for px in x.max(0)..(x + w).min(self.width) {
                self.bits[(py * self.width + px) as usize] = true;
            }
        }
    }

    pub fn count(&self) -> usize {
        self.bits.iter().filter(|b| **b).count()
    }

    /// Rotate counter-clockwise by `theta` radians about the center into a square
    /// canvas of side `side`, sampling the source per destination pixel
    pub fn rotated(&self, theta: f32, side: i32) -> Mask {
        let mut out = Mask::new(side, side);
        let src_center = Vec2::new(self.width as f32, self.height as f32) / 2.0;
        let dst_center = Vec2::splat(side as f32 / 2.0);

        for y in 0..side {
            for x in 0..side {
                let offset = Vec2::new(x as f32 + 0.5, y as f32 + 0.5) - dst_center;
                let src = rotate_screen(offset, -theta) + src_center;
                if self.get(src.x.floor() as i32, src.y.floor() as i32) {
                    out.bits[(y * side + x) as usize] = true;
                }
            }
        }
        out
    }

    /// Range of own pixel rows/cols shared with `other` placed at `offset`
    fn shared_bounds(&self, other: &Mask, offset: IVec2) -> Option<(i32, i32, i32, i32)> {
        let x0 = offset.x.max(0);
        let y0 = offset.y.max(0);
        let x1 = (offset.x + other.width).min(self.width);
        let y1 = (offset.y + other.height).min(self.height);
        (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
    }

    /// First overlapping pixel in this mask's coordinates, `other` placed at `offset`
    pub fn overlap(&self, other: &Mask, offset: IVec2) -> Option<IVec2> {
        let (x0, y0, x1, y1) = self.shared_bounds(other, offset)?;
        for y in y0..y1 {
            for x in x0..x1 {
                if self.get(x, y) && other.get(x - offset.x, y - offset.y) {
                    return Some(IVec2::new(x, y));
                }
            }
        }
        None
    }

    /// Overlapping pixel count and their centroid, in this mask's coordinates
    pub fn overlap_centroid(&self, other: &Mask, offset: IVec2) -> Option<(usize, Vec2)> {
        let (x0, y0, x1, y1) = self.shared_bounds(other, offset)?;
        let mut count = 0usize;
        let mut sum = Vec2::ZERO;
        for y in y0..y1 {
            for x in x0..x1 {
                if self.get(x, y) && other.get(x - offset.x, y - offset.y) {
                    count += 1;
                    sum += Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                }
            }
        }
        (count > 0).then(|| (count, sum / count as f32))
    }
}
