use std::sync::Arc;

use image::{Rgba, RgbaImage};

// ============================================================================
// GEOMETRY
// ============================================================================

/// A position in buffer-pixel coordinates.
///
/// Callers translating from screen/display space are responsible for the
/// scale conversion before handing points to the editor.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Rect origins are clamped to `±COORD_LIMIT`; anything that far out is
/// outside every buffer, and the clamp keeps edge arithmetic from overflowing.
pub const COORD_LIMIT: i64 = 1 << 40;

/// Grid cell holding `v`. Non-finite and huge values land at the limit.
fn grid_origin(v: f32) -> i64 {
    if v.is_nan() {
        return -COORD_LIMIT;
    }
    (v.floor() as i64).clamp(-COORD_LIMIT, COORD_LIMIT)
}

/// Integer rectangle in buffer space. Unlike the buffer itself it may extend
/// past the image edges (or lie entirely outside them).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: i64, y: i64, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Square of side `side` centered on `center`; the top-left corner is
    /// floored so the same center always maps to the same pixel grid.
    pub fn centered_square(center: Point, side: u32) -> Self {
        let half = side as f32 / 2.0;
        Self {
            x: grid_origin(center.x - half),
            y: grid_origin(center.y - half),
            width: side,
            height: side,
        }
    }

    pub fn right(&self) -> i64 {
        self.x.saturating_add(self.width as i64)
    }

    pub fn bottom(&self) -> i64 {
        self.y.saturating_add(self.height as i64)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// True when every pixel of the rect lies inside a `width`×`height` buffer.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        !self.is_empty()
            && self.x >= 0
            && self.y >= 0
            && self.right() <= width as i64
            && self.bottom() <= height as i64
    }

    /// Intersection with `[0, width) × [0, height)`, or `None` when nothing
    /// of the rect is inside.
    pub fn clip_to(&self, width: u32, height: u32) -> Option<PixelRect> {
        let min_x = self.x.max(0);
        let min_y = self.y.max(0);
        let max_x = self.right().min(width as i64);
        let max_y = self.bottom().min(height as i64);
        if max_x <= min_x || max_y <= min_y {
            return None;
        }
        Some(PixelRect {
            x: min_x,
            y: min_y,
            width: (max_x - min_x) as u32,
            height: (max_y - min_y) as u32,
        })
    }
}

// ============================================================================
// SNAPSHOT - immutable full-resolution copy of the buffer
// ============================================================================

/// A frozen copy of every sample in a [`PixelBuffer`].
///
/// The pixels sit behind an `Arc` and are never handed out mutably, so
/// cloning a snapshot (e.g. the pristine original reseeding the history) is
/// cheap and can't alias the live buffer.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pixels: Arc<RgbaImage>,
}

impl Snapshot {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        if x < self.width() && y < self.height() {
            Some(*self.pixels.get_pixel(x, y))
        } else {
            None
        }
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.pixels
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels) || *self.pixels == *other.pixels
    }
}

impl From<RgbaImage> for Snapshot {
    fn from(image: RgbaImage) -> Self {
        Self {
            pixels: Arc::new(image),
        }
    }
}

// ============================================================================
// PIXEL BUFFER - the live, editable image
// ============================================================================

/// Width×height RGBA samples, row-major. Dimensions never change after
/// construction; a new image means a new buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelBuffer {
    pixels: RgbaImage,
}

impl PixelBuffer {
    /// Fully transparent buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
        }
    }

    pub fn from_image(image: RgbaImage) -> Self {
        Self { pixels: image }
    }

    /// `None` when `data.len() != width * height * 4`.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        RgbaImage::from_raw(width, height, data).map(Self::from_image)
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Owned copy for export.
    pub fn to_image(&self) -> RgbaImage {
        self.pixels.clone()
    }

    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.width() as i64 && y < self.height() as i64
    }

    pub fn get_pixel(&self, x: i64, y: i64) -> Option<Rgba<u8>> {
        if self.contains(x, y) {
            Some(*self.pixels.get_pixel(x as u32, y as u32))
        } else {
            None
        }
    }

    /// Replace one pixel. Returns `false` (and writes nothing) outside the buffer.
    pub fn set_pixel(&mut self, x: i64, y: i64, pixel: Rgba<u8>) -> bool {
        if !self.contains(x, y) {
            return false;
        }
        self.pixels.put_pixel(x as u32, y as u32, pixel);
        true
    }

    /// Copy out a rectangle that must lie entirely inside the buffer.
    /// Any overhang yields `None`; callers treat that as a skipped step.
    pub fn get_region(&self, rect: PixelRect) -> Option<RgbaImage> {
        if !rect.fits_within(self.width(), self.height()) {
            return None;
        }
        Some(self.copy_rect(rect))
    }

    /// Copy out the in-bounds part of `rect`, together with the clipped rect
    /// it came from. `None` when the rect misses the buffer entirely.
    pub fn get_region_clipped(&self, rect: PixelRect) -> Option<(PixelRect, RgbaImage)> {
        let clipped = rect.clip_to(self.width(), self.height())?;
        Some((clipped, self.copy_rect(clipped)))
    }

    fn copy_rect(&self, rect: PixelRect) -> RgbaImage {
        let mut out = RgbaImage::new(rect.width, rect.height);
        let stride = self.width() as usize * 4;
        let row_bytes = rect.width as usize * 4;
        let src = self.pixels.as_raw();
        for (row, dst_row) in out.chunks_exact_mut(row_bytes).enumerate() {
            let start = (rect.y as usize + row) * stride + rect.x as usize * 4;
            dst_row.copy_from_slice(&src[start..start + row_bytes]);
        }
        out
    }

    /// Write `region` with its top-left at `(x, y)`. Pixels falling outside
    /// the buffer are dropped. No blending: written pixels are replaced.
    pub fn put_region(&mut self, x: i64, y: i64, region: &RgbaImage) {
        self.put_region_where(x, y, region, |_, _| true);
    }

    /// Like [`put_region`](Self::put_region) but only cells for which
    /// `keep(col, row)` holds are written; the rest of the target is untouched.
    pub fn put_region_where<F>(&mut self, x: i64, y: i64, region: &RgbaImage, keep: F)
    where
        F: Fn(u32, u32) -> bool,
    {
        for (col, row, pixel) in region.enumerate_pixels() {
            if keep(col, row) {
                self.set_pixel(x + col as i64, y + row as i64, *pixel);
            }
        }
    }

    /// Deep copy of every sample.
    pub fn full_copy(&self) -> Snapshot {
        Snapshot::from(self.pixels.clone())
    }

    /// Replace every sample with the snapshot's.
    pub fn restore(&mut self, snapshot: &Snapshot) {
        if snapshot.as_image().dimensions() == self.dimensions() {
            self.pixels.copy_from_slice(snapshot.as_image().as_raw());
        } else {
            tracing::warn!(
                "restoring {}x{} snapshot into {}x{} buffer",
                snapshot.width(),
                snapshot.height(),
                self.width(),
                self.height()
            );
            self.pixels = snapshot.as_image().clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> PixelBuffer {
        PixelBuffer::from_image(RgbaImage::from_fn(width, height, |x, y| {
            Rgba([x as u8, y as u8, (x + y) as u8, 255])
        }))
    }

    #[test]
    fn extreme_centers_stay_outside_without_overflow() {
        for p in [
            Point::new(f32::MAX, 0.0),
            Point::new(0.0, f32::MIN),
            Point::new(f32::INFINITY, f32::NEG_INFINITY),
            Point::new(f32::NAN, 5.0),
            Point::new(1e19, 5.0),
        ] {
            let rect = PixelRect::centered_square(p, 20);
            assert!(rect.x.abs() <= COORD_LIMIT && rect.y.abs() <= COORD_LIMIT);
            assert!(!rect.fits_within(100, 100));
            assert!(rect.clip_to(100, 100).is_none());
        }
        let far = PixelRect::new(i64::MAX, i64::MAX, u32::MAX, u32::MAX);
        assert_eq!(far.right(), i64::MAX);
        assert!(!far.fits_within(u32::MAX, u32::MAX));
    }

    #[test]
    fn centered_square_floors_origin() {
        let rect = PixelRect::centered_square(Point::new(10.0, 10.0), 20);
        assert_eq!(rect, PixelRect::new(0, 0, 20, 20));

        let rect = PixelRect::centered_square(Point::new(10.4, 7.9), 5);
        assert_eq!(rect, PixelRect::new(7, 5, 5, 5));
    }

    #[test]
    fn clip_to_handles_partial_and_disjoint() {
        let rect = PixelRect::new(-3, 8, 6, 6);
        assert_eq!(rect.clip_to(10, 10), Some(PixelRect::new(0, 8, 3, 2)));
        assert_eq!(PixelRect::new(10, 0, 4, 4).clip_to(10, 10), None);
        assert!(PixelRect::new(0, 0, 10, 10).fits_within(10, 10));
        assert!(!PixelRect::new(1, 0, 10, 10).fits_within(10, 10));
    }

    #[test]
    fn get_region_rejects_overhang() {
        let buf = gradient(16, 16);
        assert!(buf.get_region(PixelRect::new(12, 12, 5, 5)).is_none());
        assert!(buf.get_region(PixelRect::new(-1, 0, 2, 2)).is_none());

        let region = buf.get_region(PixelRect::new(3, 4, 2, 2)).unwrap();
        assert_eq!(*region.get_pixel(0, 0), Rgba([3, 4, 7, 255]));
        assert_eq!(*region.get_pixel(1, 1), Rgba([4, 5, 9, 255]));
    }

    #[test]
    fn get_region_clipped_returns_in_bounds_part() {
        let buf = gradient(8, 8);
        let (rect, region) = buf.get_region_clipped(PixelRect::new(6, -2, 4, 4)).unwrap();
        assert_eq!(rect, PixelRect::new(6, 0, 2, 2));
        assert_eq!(region.dimensions(), (2, 2));
        assert_eq!(*region.get_pixel(1, 1), Rgba([7, 1, 8, 255]));
        assert!(buf.get_region_clipped(PixelRect::new(20, 20, 4, 4)).is_none());
    }

    #[test]
    fn put_region_drops_outside_pixels() {
        let mut buf = PixelBuffer::new(4, 4);
        let red = RgbaImage::from_pixel(3, 3, Rgba([255, 0, 0, 255]));
        buf.put_region(2, 2, &red);

        assert_eq!(buf.get_pixel(2, 2), Some(Rgba([255, 0, 0, 255])));
        assert_eq!(buf.get_pixel(3, 3), Some(Rgba([255, 0, 0, 255])));
        assert_eq!(buf.get_pixel(1, 1), Some(Rgba([0, 0, 0, 0])));
    }

    #[test]
    fn put_region_replaces_without_blending() {
        let mut buf = PixelBuffer::from_image(RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 255])));
        let half = RgbaImage::from_pixel(1, 1, Rgba([200, 100, 50, 128]));
        buf.put_region(0, 0, &half);
        assert_eq!(buf.get_pixel(0, 0), Some(Rgba([200, 100, 50, 128])));
    }

    #[test]
    fn full_copy_does_not_alias_live_buffer() {
        let mut buf = gradient(4, 4);
        let snap = buf.full_copy();
        buf.set_pixel(0, 0, Rgba([99, 99, 99, 99]));
        assert_eq!(snap.get_pixel(0, 0), Some(Rgba([0, 0, 0, 255])));

        buf.restore(&snap);
        assert_eq!(buf.get_pixel(0, 0), Some(Rgba([0, 0, 0, 255])));
        assert_eq!(buf.full_copy(), snap);
    }

    #[test]
    fn from_raw_checks_length() {
        assert!(PixelBuffer::from_raw(2, 2, vec![0; 16]).is_some());
        assert!(PixelBuffer::from_raw(2, 2, vec![0; 15]).is_none());
    }
}
