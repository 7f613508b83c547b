// ============================================================================
// CANVAS — layers, layer sets, scratch overlays and compositing
// ============================================================================

use image::{Rgba, RgbaImage, imageops};
use uuid::Uuid;

use crate::geometry::Rect;

// ============================================================================
// COMPOSITE RULES
// ============================================================================

/// How a layer combines with everything painted below it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompositeRule {
    /// Adds paint: source-over alpha blend.
    Paint,
    /// Removes paint: the layer's alpha erases destination coverage.
    Erase,
}

impl CompositeRule {
    pub fn name(&self) -> &'static str {
        match self {
            CompositeRule::Paint => "paint",
            CompositeRule::Erase => "erase",
        }
    }

    pub fn all() -> &'static [CompositeRule] {
        &[CompositeRule::Paint, CompositeRule::Erase]
    }

    /// Stable id for project-file serialization.
    pub fn to_u8(&self) -> u8 {
        match self {
            CompositeRule::Paint => 0,
            CompositeRule::Erase => 1,
        }
    }

    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => CompositeRule::Erase,
            _ => CompositeRule::Paint,
        }
    }
}

/// Source-over blend of two straight-alpha pixels.
pub fn blend_paint(base: Rgba<u8>, top: Rgba<u8>) -> Rgba<u8> {
    // Fast paths: nothing to blend / full overwrite.
    if top[3] == 0 {
        return base;
    }
    if top[3] == 255 {
        return top;
    }

    let ta = top[3] as f32 / 255.0;
    let ba = base[3] as f32 / 255.0;
    let out_a = ta + ba * (1.0 - ta);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }
    let mut out = [0u8; 4];
    for c in 0..3 {
        let tc = top[c] as f32 / 255.0;
        let bc = base[c] as f32 / 255.0;
        let v = (tc * ta + bc * ba * (1.0 - ta)) / out_a;
        out[c] = (v * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgba(out)
}

/// Erase blend: the top pixel's alpha knocks coverage out of the base.
pub fn blend_erase(base: Rgba<u8>, top: Rgba<u8>) -> Rgba<u8> {
    if top[3] == 0 {
        return base;
    }
    let strength = top[3] as f32 / 255.0;
    let new_a = (base[3] as f32 / 255.0) * (1.0 - strength);
    Rgba([base[0], base[1], base[2], (new_a * 255.0).round() as u8])
}

// ============================================================================
// LAYERS
// ============================================================================

/// A positioned bitmap with a composite rule. Layers exclusively own their
/// pixels and are immutable once constructed.
#[derive(Clone, Debug)]
pub struct Layer {
    id: Uuid,
    location: (i32, i32),
    pixels: RgbaImage,
    rule: CompositeRule,
}

impl Layer {
    pub fn new(location: (i32, i32), pixels: RgbaImage, rule: CompositeRule) -> Self {
        Self {
            id: Uuid::new_v4(),
            location,
            pixels,
            rule,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn location(&self) -> (i32, i32) {
        self.location
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn rule(&self) -> CompositeRule {
        self.rule
    }

    /// Canvas-space bounds of this layer.
    pub fn bounds(&self) -> Rect {
        Rect::new(
            self.location.0 as f32,
            self.location.1 as f32,
            self.location.0 as f32 + self.pixels.width() as f32,
            self.location.1 as f32 + self.pixels.height() as f32,
        )
    }
}

// ============================================================================
// LAYER SET
// ============================================================================

/// Ordered, append-only stack of layers. Insertion order is paint order.
///
/// Every append bumps a monotonic version counter; callers that need change
/// notification keep the last version they saw and diff against `version()`.
#[derive(Clone, Debug, Default)]
pub struct LayerSet {
    layers: Vec<Layer>,
    version: u64,
}

impl LayerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer (the only mutation). Returns the new version.
    pub fn push(&mut self, layer: Layer) -> u64 {
        self.layers.push(layer);
        self.version += 1;
        self.version
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    /// True when any layer adds paint.
    pub fn is_adding_paint(&self) -> bool {
        self.layers.iter().any(|l| l.rule() == CompositeRule::Paint)
    }

    /// True when any layer removes paint.
    pub fn is_removing_paint(&self) -> bool {
        self.layers.iter().any(|l| l.rule() == CompositeRule::Erase)
    }

    /// Union of all layer bounds.
    pub fn bounds(&self) -> Rect {
        let mut r = Rect::NOTHING;
        for layer in &self.layers {
            r = r.union(layer.bounds());
        }
        if r.min.x > r.max.x { Rect::new(0.0, 0.0, 0.0, 0.0) } else { r }
    }

    /// Composite the stack into one bitmap, back-to-front in insertion
    /// order, each layer drawn with its own rule.
    ///
    /// The output covers the union of all layer bounds. `clip` (canvas
    /// coordinates) limits which pixels are computed; at `scale == 1.0`
    /// only the sub-region of each layer overlapping the clip is visited.
    /// Any other scale renders the full stack once and resizes the result
    /// uniformly.
    pub fn render(&self, scale: f32, clip: Option<Rect>) -> RgbaImage {
        let bounds = self.bounds();
        let out_w = bounds.width().ceil() as u32;
        let out_h = bounds.height().ceil() as u32;
        if out_w == 0 || out_h == 0 {
            return RgbaImage::new(out_w, out_h);
        }

        if scale != 1.0 {
            let full = self.render(1.0, clip);
            let sw = ((out_w as f32 * scale).round() as u32).max(1);
            let sh = ((out_h as f32 * scale).round() as u32).max(1);
            return imageops::resize(&full, sw, sh, imageops::FilterType::Triangle);
        }

        let origin_x = bounds.min.x.floor() as i32;
        let origin_y = bounds.min.y.floor() as i32;
        let mut result = RgbaImage::new(out_w, out_h);

        for layer in &self.layers {
            // Region of the layer to draw, in layer-local pixels: the whole
            // bitmap, or only the part overlapping the clip.
            let draw = match clip {
                Some(clip_rect) => {
                    let overlap = layer.bounds().intersect(clip_rect);
                    if overlap.is_empty() {
                        continue;
                    }
                    overlap
                }
                None => layer.bounds(),
            };

            let (lx, ly) = layer.location();
            let x0 = (draw.min.x.floor() as i32 - lx).max(0) as u32;
            let y0 = (draw.min.y.floor() as i32 - ly).max(0) as u32;
            let x1 = ((draw.max.x.ceil() as i32 - lx).max(0) as u32).min(layer.pixels().width());
            let y1 = ((draw.max.y.ceil() as i32 - ly).max(0) as u32).min(layer.pixels().height());

            for y in y0..y1 {
                for x in x0..x1 {
                    let dx = lx + x as i32 - origin_x;
                    let dy = ly + y as i32 - origin_y;
                    if dx < 0 || dy < 0 || dx as u32 >= out_w || dy as u32 >= out_h {
                        continue;
                    }
                    let top = *layer.pixels().get_pixel(x, y);
                    let base = *result.get_pixel(dx as u32, dy as u32);
                    let blended = match layer.rule() {
                        CompositeRule::Paint => blend_paint(base, top),
                        CompositeRule::Erase => blend_erase(base, top),
                    };
                    result.put_pixel(dx as u32, dy as u32, blended);
                }
            }
        }
        result
    }
}

// ============================================================================
// SCRATCH BUFFER
// ============================================================================

/// The uncommitted edit: two transparent canvas-sized overlays. `add` holds
/// paint the edit lays down; `remove` holds coverage the edit erases. Both
/// are merged into the canvas on commit, then reset.
#[derive(Clone, Debug)]
pub struct ScratchBuffer {
    add: RgbaImage,
    remove: RgbaImage,
}

impl ScratchBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            add: RgbaImage::new(width, height),
            remove: RgbaImage::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.add.width()
    }

    pub fn height(&self) -> u32 {
        self.add.height()
    }

    pub fn add(&self) -> &RgbaImage {
        &self.add
    }

    pub fn add_mut(&mut self) -> &mut RgbaImage {
        &mut self.add
    }

    pub fn remove(&self) -> &RgbaImage {
        &self.remove
    }

    pub fn remove_mut(&mut self) -> &mut RgbaImage {
        &mut self.remove
    }

    /// Merge the edit into `target` — erasures first, then paint — and
    /// reset both overlays to transparent.
    pub fn commit(&mut self, target: &mut RgbaImage) {
        let w = target.width().min(self.width());
        let h = target.height().min(self.height());
        for y in 0..h {
            for x in 0..w {
                let erased = blend_erase(*target.get_pixel(x, y), *self.remove.get_pixel(x, y));
                let painted = blend_paint(erased, *self.add.get_pixel(x, y));
                target.put_pixel(x, y, painted);
            }
        }
        self.reset();
    }

    /// Discard the in-progress edit.
    pub fn reset(&mut self) {
        for px in self.add.pixels_mut() {
            *px = Rgba([0, 0, 0, 0]);
        }
        for px in self.remove.pixels_mut() {
            *px = Rgba([0, 0, 0, 0]);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
