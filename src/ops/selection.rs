// ============================================================================
// SELECTION — a floating outline + raster with its own transform pipeline
// ============================================================================
//
// Lifecycle: a selection is created when a boundary outline is closed (the
// canvas pixels under it are captured and masked), mutated by pixel and
// geometric transforms (which mark it dirty), and destroyed when it is
// committed into the scratch overlay or simply dropped (deselect).
// ============================================================================

use image::{Rgba, RgbaImage, imageops};

use crate::canvas::{ScratchBuffer, blend_paint};
use crate::geometry::{Outline, Rect};
use crate::ops::flood::Paint;

/// A captured region of the canvas floating above it.
///
/// The backing raster covers the outline's bounding rectangle; pixels inside
/// the rectangle but outside the outline are forced fully transparent, so
/// the mask travels with the alpha channel.
#[derive(Clone, Debug)]
pub struct Selection {
    outline: Outline,
    location: (i32, i32),
    pixels: RgbaImage,
    dirty: bool,
}

impl Selection {
    /// Capture the canvas pixels under `outline`. The raster is sized to the
    /// outline's bounding rectangle; indices outside the canvas read as
    /// transparent.
    pub fn capture(outline: Outline, canvas: &RgbaImage) -> Self {
        let b = outline.bounds();
        let loc_x = b.min.x.floor() as i32;
        let loc_y = b.min.y.floor() as i32;
        let w = (b.max.x.ceil() - loc_x as f32).max(0.0) as u32;
        let h = (b.max.y.ceil() - loc_y as f32).max(0.0) as u32;

        let mut pixels = RgbaImage::new(w.max(1), h.max(1));
        for y in 0..pixels.height() {
            for x in 0..pixels.width() {
                let cx = loc_x + x as i32;
                let cy = loc_y + y as i32;
                if cx >= 0 && cy >= 0 && (cx as u32) < canvas.width() && (cy as u32) < canvas.height()
                {
                    pixels.put_pixel(x, y, *canvas.get_pixel(cx as u32, cy as u32));
                }
            }
        }

        let mut selection = Self {
            outline,
            location: (loc_x, loc_y),
            pixels,
            dirty: false,
        };
        selection.apply_mask();
        selection
    }

    pub fn outline(&self) -> &Outline {
        &self.outline
    }

    pub fn location(&self) -> (i32, i32) {
        self.location
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// True once the selection has been moved or transformed since capture
    /// (or since the last pickup).
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The outline translated so its bounding box starts at the origin —
    /// the coordinate space of the backing raster.
    pub fn identity_outline(&self) -> Outline {
        let b = self.outline.bounds();
        self.outline.translated(-b.min.x, -b.min.y)
    }

    /// Move the whole selection. Outline and raster stay consistent.
    pub fn translate(&mut self, dx: i32, dy: i32) {
        self.location.0 += dx;
        self.location.1 += dy;
        self.outline.translate(dx as f32, dy as f32);
        self.dirty = true;
    }

    /// Force every raster pixel outside the outline fully transparent.
    fn apply_mask(&mut self) {
        let identity = self.identity_outline();
        for (x, y, px) in self.pixels.enumerate_pixels_mut() {
            if !identity.contains(x as f32 + 0.5, y as f32 + 0.5) {
                *px = Rgba([0, 0, 0, 0]);
            }
        }
    }

    // ------------------------------------------------------------------
    // Pixel transforms — applied only inside the identity-space outline
    // ------------------------------------------------------------------

    /// Apply `f` to every raster pixel the identity outline contains and
    /// mark the selection dirty.
    pub fn transform_pixels<F>(&mut self, f: F)
    where
        F: Fn(u32, u32, Rgba<u8>) -> Rgba<u8>,
    {
        let identity = self.identity_outline();
        for (x, y, px) in self.pixels.enumerate_pixels_mut() {
            if identity.contains(x as f32 + 0.5, y as f32 + 0.5) {
                *px = f(x, y, *px);
            }
        }
        self.dirty = true;
    }

    /// Add `delta` to each of r/g/b, clamped. Alpha is untouched.
    pub fn brightness(&mut self, delta: i32) {
        self.transform_pixels(|_, _, px| {
            let adj = |c: u8| (c as i32 + delta).clamp(0, 255) as u8;
            Rgba([adj(px[0]), adj(px[1]), adj(px[2]), px[3]])
        });
    }

    /// Add `delta` to the alpha of every non-transparent pixel, clamped.
    pub fn alpha_delta(&mut self, delta: i32) {
        self.transform_pixels(|_, _, px| {
            if px[3] == 0 {
                return px;
            }
            Rgba([px[0], px[1], px[2], (px[3] as i32 + delta).clamp(0, 255) as u8])
        });
    }

    /// Invert r/g/b. Alpha is untouched.
    pub fn invert(&mut self) {
        self.transform_pixels(|_, _, px| {
            Rgba([255 - px[0], 255 - px[1], 255 - px[2], px[3]])
        });
    }

    /// Replace fully transparent pixels inside the outline with `paint`
    /// (texture paints are indexed in raster-local coordinates).
    pub fn fill_transparent(&mut self, paint: &Paint) {
        self.transform_pixels(|x, y, px| {
            if px[3] == 0 { paint.pixel_at(x, y) } else { px }
        });
    }

    // ------------------------------------------------------------------
    // Geometric transforms
    // ------------------------------------------------------------------

    /// Rotate 90° counter-clockwise about the centre.
    pub fn rotate_left(&mut self) {
        let rotated = imageops::rotate270(&self.pixels);
        self.replace_raster_rotated(rotated);
    }

    /// Rotate 90° clockwise about the centre.
    pub fn rotate_right(&mut self) {
        let rotated = imageops::rotate90(&self.pixels);
        self.replace_raster_rotated(rotated);
    }

    /// Width/height swap on a 90° rotation: shift the anchor so the shape
    /// stays centred on the same point.
    fn replace_raster_rotated(&mut self, rotated: RgbaImage) {
        let old_w = self.pixels.width() as i32;
        let old_h = self.pixels.height() as i32;
        let shift = (old_w - old_h) / 2;
        self.location.0 += shift;
        self.location.1 -= shift;
        self.pixels = rotated;
        self.rebuild_outline_from_raster();
        self.dirty = true;
    }

    pub fn flip_horizontal(&mut self) {
        self.pixels = imageops::flip_horizontal(&self.pixels);
        self.rebuild_outline_from_raster();
        self.dirty = true;
    }

    pub fn flip_vertical(&mut self) {
        self.pixels = imageops::flip_vertical(&self.pixels);
        self.rebuild_outline_from_raster();
        self.dirty = true;
    }

    /// After a geometric transform the mask lives entirely in the raster's
    /// alpha channel; the outline becomes the raster's bounding rectangle,
    /// anchored at the (possibly adjusted) location.
    fn rebuild_outline_from_raster(&mut self) {
        self.outline = Outline::Rectangle {
            rect: Rect::new(
                self.location.0 as f32,
                self.location.1 as f32,
                self.location.0 as f32 + self.pixels.width() as f32,
                self.location.1 as f32 + self.pixels.height() as f32,
            ),
        };
    }

    // ------------------------------------------------------------------
    // Pickup & commit
    // ------------------------------------------------------------------

    /// Recapture the canvas under the selection's current footprint.
    ///
    /// `canvas` must be rendered WITHOUT the selection overlay. The crop
    /// under the outline bounds becomes the new backing raster (masked),
    /// and those pixels are erased from the scratch overlay — so a later
    /// commit neither duplicates nor loses canvas content.
    pub fn pickup(&mut self, canvas: &RgbaImage, scratch: &mut ScratchBuffer) {
        let fresh = Selection::capture(self.outline.clone(), canvas);
        self.location = fresh.location;
        self.pixels = fresh.pixels;

        // Erase the picked-up footprint from the in-progress edit.
        let identity = self.identity_outline();
        for y in 0..self.pixels.height() {
            for x in 0..self.pixels.width() {
                if !identity.contains(x as f32 + 0.5, y as f32 + 0.5) {
                    continue;
                }
                let cx = self.location.0 + x as i32;
                let cy = self.location.1 + y as i32;
                if cx < 0 || cy < 0 || cx as u32 >= scratch.width() || cy as u32 >= scratch.height()
                {
                    continue;
                }
                scratch.add_mut().put_pixel(cx as u32, cy as u32, Rgba([0, 0, 0, 0]));
                scratch
                    .remove_mut()
                    .put_pixel(cx as u32, cy as u32, Rgba([0, 0, 0, 255]));
            }
        }
    }

    /// Blend the selection into the scratch overlay at its location,
    /// ending the selection's lifecycle (the value is consumed).
    pub fn commit(self, scratch: &mut ScratchBuffer) {
        for y in 0..self.pixels.height() {
            for x in 0..self.pixels.width() {
                let px = *self.pixels.get_pixel(x, y);
                if px[3] == 0 {
                    continue;
                }
                let cx = self.location.0 + x as i32;
                let cy = self.location.1 + y as i32;
                if cx < 0 || cy < 0 || cx as u32 >= scratch.width() || cy as u32 >= scratch.height()
                {
                    continue;
                }
                let base = *scratch.add().get_pixel(cx as u32, cy as u32);
                scratch
                    .add_mut()
                    .put_pixel(cx as u32, cy as u32, blend_paint(base, px));
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    fn red_canvas(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, RED)
    }

    #[test]
    fn capture_masks_pixels_outside_the_outline() {
        let canvas = red_canvas(10, 10);
        let outline = Outline::Circle { cx: 5.0, cy: 5.0, radius: 3.0 };
        let sel = Selection::capture(outline, &canvas);

        assert_eq!(sel.location(), (2, 2));
        assert_eq!((sel.width(), sel.height()), (6, 6));
        // Centre of the circle: captured.
        assert_eq!(*sel.pixels().get_pixel(3, 3), RED);
        // Corner of the bounding box: outside the circle, forced clear.
        assert_eq!(sel.pixels().get_pixel(0, 0)[3], 0);
        assert!(!sel.is_dirty());
    }

    #[test]
    fn capture_clips_silently_at_canvas_edges() {
        let canvas = red_canvas(4, 4);
        let outline = Outline::Rectangle { rect: Rect::new(2.0, 2.0, 8.0, 8.0) };
        let sel = Selection::capture(outline, &canvas);
        assert_eq!((sel.width(), sel.height()), (6, 6));
        // In-canvas part captured, out-of-canvas part transparent.
        assert_eq!(*sel.pixels().get_pixel(0, 0), RED);
        assert_eq!(sel.pixels().get_pixel(5, 5)[3], 0);
    }

    #[test]
    fn rotate_left_then_right_restores_dimensions() {
        let canvas = red_canvas(12, 8);
        let outline = Outline::Rectangle { rect: Rect::new(1.0, 2.0, 7.0, 5.0) };
        let mut sel = Selection::capture(outline, &canvas);
        let (w, h) = (sel.width(), sel.height());
        let loc = sel.location();

        sel.rotate_left();
        assert_eq!((sel.width(), sel.height()), (h, w));
        sel.rotate_right();
        assert_eq!((sel.width(), sel.height()), (w, h));
        assert_eq!(sel.location(), loc);
        assert!(sel.is_dirty());
    }

    #[test]
    fn rotation_reanchors_to_keep_the_shape_centered() {
        let canvas = red_canvas(20, 20);
        let outline = Outline::Rectangle { rect: Rect::new(4.0, 6.0, 12.0, 10.0) };
        let mut sel = Selection::capture(outline, &canvas);
        // 8×4 raster at (4, 6); centre (8, 8).
        sel.rotate_left();
        // (old_w − old_h)/2 = 2 → new location (6, 4), 4×8 raster,
        // centre still (8, 8).
        assert_eq!(sel.location(), (6, 4));
        assert_eq!((sel.width(), sel.height()), (4, 8));
    }

    #[test]
    fn double_flip_restores_content() {
        let mut canvas = red_canvas(6, 6);
        canvas.put_pixel(1, 2, Rgba([0, 255, 0, 255]));
        let outline = Outline::Rectangle { rect: Rect::new(0.0, 0.0, 6.0, 6.0) };
        let mut sel = Selection::capture(outline, &canvas);
        let before = sel.pixels().clone();

        sel.flip_horizontal();
        assert_ne!(*sel.pixels(), before);
        sel.flip_horizontal();
        assert_eq!(*sel.pixels(), before);

        sel.flip_vertical();
        sel.flip_vertical();
        assert_eq!(*sel.pixels(), before);
    }

    #[test]
    fn brightness_applies_only_inside_the_outline() {
        let canvas = RgbaImage::from_pixel(8, 8, Rgba([100, 100, 100, 255]));
        let quad = crate::geometry::Quad::from_corners([
            Point::new(0.0, 0.0),
            Point::new(8.0, 0.0),
            Point::new(0.0, 8.0),
            Point::new(0.0, 8.0),
        ]);
        // Triangle-ish quad covering the upper-left half.
        let mut sel = Selection::capture(Outline::Quadrilateral(quad.unwrap()), &canvas);
        sel.brightness(50);

        // Inside the triangle.
        assert_eq!(sel.pixels().get_pixel(1, 1)[0], 150);
        // The lower-right half is outside: masked to transparent at capture
        // and left untouched by the transform.
        assert_eq!(sel.pixels().get_pixel(7, 7)[3], 0);
        assert!(sel.is_dirty());
    }

    #[test]
    fn invert_preserves_alpha() {
        let canvas = red_canvas(4, 4);
        let outline = Outline::Rectangle { rect: Rect::new(0.0, 0.0, 4.0, 4.0) };
        let mut sel = Selection::capture(outline, &canvas);
        sel.invert();
        assert_eq!(*sel.pixels().get_pixel(0, 0), Rgba([0, 255, 255, 255]));
    }

    #[test]
    fn fill_transparent_only_touches_clear_pixels() {
        let mut canvas = red_canvas(4, 4);
        canvas.put_pixel(2, 2, Rgba([0, 0, 0, 0]));
        let outline = Outline::Rectangle { rect: Rect::new(0.0, 0.0, 4.0, 4.0) };
        let mut sel = Selection::capture(outline, &canvas);
        sel.fill_transparent(&Paint::Solid(Rgba([0, 0, 255, 255])));
        assert_eq!(*sel.pixels().get_pixel(2, 2), Rgba([0, 0, 255, 255]));
        assert_eq!(*sel.pixels().get_pixel(0, 0), RED);
    }

    #[test]
    fn translate_moves_outline_and_marks_dirty() {
        let canvas = red_canvas(8, 8);
        let outline = Outline::Rectangle { rect: Rect::new(0.0, 0.0, 4.0, 4.0) };
        let mut sel = Selection::capture(outline, &canvas);
        sel.translate(3, 2);
        assert_eq!(sel.location(), (3, 2));
        let b = sel.outline().bounds();
        assert_eq!((b.min.x, b.min.y), (3.0, 2.0));
        assert!(sel.is_dirty());
    }

    #[test]
    fn pickup_recaptures_and_erases_from_scratch() {
        // Canvas: red field. Selection moved over (4..8, 0..4).
        let canvas = red_canvas(8, 8);
        let outline = Outline::Rectangle { rect: Rect::new(0.0, 0.0, 4.0, 4.0) };
        let mut sel = Selection::capture(outline, &canvas);
        let mut scratch = ScratchBuffer::new(8, 8);
        sel.translate(4, 0);
        sel.pickup(&canvas, &mut scratch);

        // The raster now holds the pixels under the new footprint.
        assert_eq!(*sel.pixels().get_pixel(0, 0), RED);
        // The footprint is flagged for removal from the canvas.
        assert_eq!(scratch.remove().get_pixel(4, 0)[3], 255);
        assert_eq!(scratch.remove().get_pixel(7, 3)[3], 255);
        assert_eq!(scratch.remove().get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn commit_blends_into_scratch_at_location() {
        let canvas = red_canvas(8, 8);
        let outline = Outline::Rectangle { rect: Rect::new(0.0, 0.0, 2.0, 2.0) };
        let mut sel = Selection::capture(outline, &canvas);
        sel.translate(5, 5);

        let mut scratch = ScratchBuffer::new(8, 8);
        sel.commit(&mut scratch);
        assert_eq!(*scratch.add().get_pixel(5, 5), RED);
        assert_eq!(*scratch.add().get_pixel(6, 6), RED);
        assert_eq!(scratch.add().get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn pickup_then_commit_round_trips_canvas_pixels() {
        // Move a selection, pick it up, commit everything: the pixel count
        // of red coverage is conserved (nothing duplicated, nothing lost).
        let mut canvas = red_canvas(6, 6);
        let before_red = canvas.pixels().filter(|p| p[3] == 255).count();

        let outline = Outline::Rectangle { rect: Rect::new(0.0, 0.0, 3.0, 3.0) };
        let mut sel = Selection::capture(outline, &canvas);
        sel.translate(3, 3);

        let mut scratch = ScratchBuffer::new(6, 6);
        sel.pickup(&canvas, &mut scratch);
        sel.commit(&mut scratch);
        scratch.commit(&mut canvas);

        let after_red = canvas.pixels().filter(|p| p[3] == 255).count();
        assert_eq!(before_red, after_red);
    }
}
