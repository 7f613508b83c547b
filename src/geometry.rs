// ============================================================================
// GEOMETRY — points, rectangles, quadrilaterals and closed outlines
// ============================================================================
//
// Outlines are the planar shapes shared by the brush engine (tip shapes),
// the selection pipeline (selection boundaries) and the fill tools (masks).
// A single tagged enum covers every shape kind; behavior is dispatched via
// `match` rather than trait objects.
// ============================================================================

use image::GrayImage;
use rayon::prelude::*;

/// A point in canvas coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Axis-aligned rectangle (min/max corners, canvas coordinates).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub min: Point,
    pub max: Point,
}

impl Rect {
    /// The empty rectangle — the identity element for `union`.
    pub const NOTHING: Rect = Rect {
        min: Point {
            x: f32::MAX,
            y: f32::MAX,
        },
        max: Point {
            x: f32::MIN,
            y: f32::MIN,
        },
    };

    pub fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            min: Point::new(min_x, min_y),
            max: Point::new(max_x, max_y),
        }
    }

    pub fn from_center(cx: f32, cy: f32, half_w: f32, half_h: f32) -> Self {
        Self::new(cx - half_w, cy - half_h, cx + half_w, cy + half_h)
    }

    pub fn width(&self) -> f32 {
        (self.max.x - self.min.x).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.max.y - self.min.y).max(0.0)
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.max.x <= self.min.x || self.max.y <= self.min.y
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.min.x && x <= self.max.x && y >= self.min.y && y <= self.max.y
    }

    /// Smallest rectangle covering both `self` and `other`.
    pub fn union(&self, other: Rect) -> Rect {
        Rect::new(
            self.min.x.min(other.min.x),
            self.min.y.min(other.min.y),
            self.max.x.max(other.max.x),
            self.max.y.max(other.max.y),
        )
    }

    /// Overlapping region of `self` and `other` (may be empty).
    pub fn intersect(&self, other: Rect) -> Rect {
        Rect::new(
            self.min.x.max(other.min.x),
            self.min.y.max(other.min.y),
            self.max.x.min(other.max.x),
            self.max.y.min(other.max.y),
        )
    }

    pub fn translated(&self, dx: f32, dy: f32) -> Rect {
        Rect::new(self.min.x + dx, self.min.y + dy, self.max.x + dx, self.max.y + dy)
    }
}

// ============================================================================
// QUADRILATERAL — four corners, never self-intersecting
// ============================================================================

/// An arbitrary four-corner quadrilateral. Corners are stored in drawing
/// order; the invariant that no edge crosses another is enforced on every
/// corner update, so a `Quad` is always a simple polygon.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quad {
    corners: [Point; 4],
}

impl Quad {
    /// Axis-aligned quad covering `rect`, corners in clockwise order
    /// starting top-left.
    pub fn from_rect(rect: Rect) -> Self {
        Self {
            corners: [
                rect.min,
                Point::new(rect.max.x, rect.min.y),
                rect.max,
                Point::new(rect.min.x, rect.max.y),
            ],
        }
    }

    /// Build from explicit corners. Returns `None` when the corners describe
    /// a self-intersecting (bow-tie) quadrilateral.
    pub fn from_corners(corners: [Point; 4]) -> Option<Self> {
        let quad = Self { corners };
        if quad.is_simple() { Some(quad) } else { None }
    }

    pub fn corners(&self) -> &[Point; 4] {
        &self.corners
    }

    pub fn corner(&self, idx: usize) -> Point {
        self.corners[idx]
    }

    /// Move one corner. The update is rejected (returns `false`, prior state
    /// intact) when it would make two edges cross.
    pub fn set_corner(&mut self, idx: usize, p: Point) -> bool {
        let prev = self.corners[idx];
        self.corners[idx] = p;
        if self.is_simple() {
            true
        } else {
            self.corners[idx] = prev;
            false
        }
    }

    /// The four edges in drawing order.
    pub fn edges(&self) -> [(Point, Point); 4] {
        let c = &self.corners;
        [(c[0], c[1]), (c[1], c[2]), (c[2], c[3]), (c[3], c[0])]
    }

    /// The two diagonals.
    pub fn diagonals(&self) -> [(Point, Point); 2] {
        let c = &self.corners;
        [(c[0], c[2]), (c[1], c[3])]
    }

    pub fn bounds(&self) -> Rect {
        let mut r = Rect::NOTHING;
        for c in &self.corners {
            r.min.x = r.min.x.min(c.x);
            r.min.y = r.min.y.min(c.y);
            r.max.x = r.max.x.max(c.x);
            r.max.y = r.max.y.max(c.y);
        }
        r
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        for c in &mut self.corners {
            c.x += dx;
            c.y += dy;
        }
    }

    /// Even-odd crossing test; valid for convex and concave simple quads.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        point_in_polygon(&self.corners, x, y)
    }

    /// True when no edge crosses a non-adjacent edge. Adjacent edges share a
    /// corner and are allowed to touch there.
    fn is_simple(&self) -> bool {
        let e = self.edges();
        !segments_cross(e[0], e[2]) && !segments_cross(e[1], e[3])
    }
}

/// Proper intersection test for two segments that share no endpoint.
fn segments_cross(a: (Point, Point), b: (Point, Point)) -> bool {
    fn orient(p: Point, q: Point, r: Point) -> f32 {
        (q.x - p.x) * (r.y - p.y) - (q.y - p.y) * (r.x - p.x)
    }
    let d1 = orient(a.0, a.1, b.0);
    let d2 = orient(a.0, a.1, b.1);
    let d3 = orient(b.0, b.1, a.0);
    let d4 = orient(b.0, b.1, a.1);
    (d1 * d2 < 0.0) && (d3 * d4 < 0.0)
}

/// Even-odd ray crossing over a closed vertex ring.
fn point_in_polygon(verts: &[Point], x: f32, y: f32) -> bool {
    let n = verts.len();
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (vi, vj) = (verts[i], verts[j]);
        if (vi.y > y) != (vj.y > y) {
            let cross_x = vi.x + (y - vi.y) / (vj.y - vi.y) * (vj.x - vi.x);
            if x < cross_x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

// ============================================================================
// OUTLINE — tagged union of every closed shape the toolkit draws with
// ============================================================================

/// A closed planar outline: brush tip, selection boundary or fill mask.
///
/// `Composite` is the union of its children — the accumulator the stroke
/// engine stamps tip copies into. A point is inside a composite when it is
/// inside any child.
#[derive(Clone, Debug)]
pub enum Outline {
    Circle { cx: f32, cy: f32, radius: f32 },
    Oval { rect: Rect },
    Rectangle { rect: Rect },
    RoundedRect { rect: Rect, corner_radius: f32 },
    RegularPolygon { cx: f32, cy: f32, radius: f32, sides: u32, rotation: f32 },
    Quadrilateral(Quad),
    /// Arbitrary polygon contours (glyph outlines after flattening).
    /// Even-odd filled, so holes are contours wound either way.
    Polygon { contours: Vec<Vec<Point>> },
    Composite(Vec<Outline>),
}

impl Outline {
    /// Square helper — a `Rectangle` with equal sides centred on (cx, cy).
    pub fn square(cx: f32, cy: f32, side: f32) -> Outline {
        Outline::Rectangle {
            rect: Rect::from_center(cx, cy, side * 0.5, side * 0.5),
        }
    }

    /// Empty union to accumulate stamps into.
    pub fn empty() -> Outline {
        Outline::Composite(Vec::new())
    }

    /// Union `other` into this outline. A composite absorbs the shape;
    /// any other variant is first wrapped into a composite of itself.
    pub fn union_with(&mut self, other: Outline) {
        match self {
            Outline::Composite(children) => children.push(other),
            _ => {
                let prev = std::mem::replace(self, Outline::Composite(Vec::new()));
                if let Outline::Composite(children) = self {
                    children.push(prev);
                    children.push(other);
                }
            }
        }
    }

    /// Number of leaf shapes in the union.
    pub fn leaf_count(&self) -> usize {
        match self {
            Outline::Composite(children) => children.iter().map(|c| c.leaf_count()).sum(),
            _ => 1,
        }
    }

    pub fn bounds(&self) -> Rect {
        match self {
            Outline::Circle { cx, cy, radius } => {
                Rect::from_center(*cx, *cy, *radius, *radius)
            }
            Outline::Oval { rect } | Outline::Rectangle { rect } => *rect,
            Outline::RoundedRect { rect, .. } => *rect,
            Outline::RegularPolygon { cx, cy, radius, .. } => {
                Rect::from_center(*cx, *cy, *radius, *radius)
            }
            Outline::Quadrilateral(quad) => quad.bounds(),
            Outline::Polygon { contours } => {
                let mut r = Rect::NOTHING;
                for contour in contours {
                    for p in contour {
                        r.min.x = r.min.x.min(p.x);
                        r.min.y = r.min.y.min(p.y);
                        r.max.x = r.max.x.max(p.x);
                        r.max.y = r.max.y.max(p.y);
                    }
                }
                if r.min.x > r.max.x { Rect::new(0.0, 0.0, 0.0, 0.0) } else { r }
            }
            Outline::Composite(children) => {
                let mut r = Rect::NOTHING;
                for child in children {
                    r = r.union(child.bounds());
                }
                if r.min.x > r.max.x { Rect::new(0.0, 0.0, 0.0, 0.0) } else { r }
            }
        }
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        match self {
            Outline::Circle { cx, cy, .. } => {
                *cx += dx;
                *cy += dy;
            }
            Outline::Oval { rect }
            | Outline::Rectangle { rect }
            | Outline::RoundedRect { rect, .. } => *rect = rect.translated(dx, dy),
            Outline::RegularPolygon { cx, cy, .. } => {
                *cx += dx;
                *cy += dy;
            }
            Outline::Quadrilateral(quad) => quad.translate(dx, dy),
            Outline::Polygon { contours } => {
                for contour in contours {
                    for p in contour {
                        p.x += dx;
                        p.y += dy;
                    }
                }
            }
            Outline::Composite(children) => {
                for child in children {
                    child.translate(dx, dy);
                }
            }
        }
    }

    pub fn translated(&self, dx: f32, dy: f32) -> Outline {
        let mut copy = self.clone();
        copy.translate(dx, dy);
        copy
    }

    /// Point-in-outline test at exact coordinates.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        match self {
            Outline::Circle { cx, cy, radius } => {
                let dx = x - cx;
                let dy = y - cy;
                dx * dx + dy * dy <= radius * radius
            }
            Outline::Oval { rect } => {
                let rx = rect.width() * 0.5;
                let ry = rect.height() * 0.5;
                if rx <= 0.0 || ry <= 0.0 {
                    return false;
                }
                let c = rect.center();
                let nx = (x - c.x) / rx;
                let ny = (y - c.y) / ry;
                nx * nx + ny * ny <= 1.0
            }
            Outline::Rectangle { rect } => rect.contains(x, y),
            Outline::RoundedRect { rect, corner_radius } => {
                let hw = rect.width() * 0.5;
                let hh = rect.height() * 0.5;
                let r = corner_radius.min(hw).min(hh);
                let c = rect.center();
                // Rounded-box SDF: negative inside.
                let qx = (x - c.x).abs() - (hw - r);
                let qy = (y - c.y).abs() - (hh - r);
                let outside = (qx.max(0.0).powi(2) + qy.max(0.0).powi(2)).sqrt();
                let inside = qx.max(qy).min(0.0);
                outside + inside - r <= 0.0
            }
            Outline::RegularPolygon { cx, cy, radius, sides, rotation } => {
                let verts = regular_polygon_vertices(*cx, *cy, *radius, *sides, *rotation);
                point_in_polygon(&verts, x, y)
            }
            Outline::Quadrilateral(quad) => quad.contains(x, y),
            Outline::Polygon { contours } => {
                // Even-odd across all contours together.
                let mut crossings = false;
                for contour in contours {
                    if contour.len() >= 3 && point_in_polygon(contour, x, y) {
                        crossings = !crossings;
                    }
                }
                crossings
            }
            Outline::Composite(children) => children.iter().any(|c| c.contains(x, y)),
        }
    }

    /// Rasterize to an 8-bit mask sampled at pixel centres: 255 inside,
    /// 0 outside. Outline coordinates are taken in image space.
    pub fn to_mask(&self, width: u32, height: u32) -> GrayImage {
        let w = width as usize;
        if width == 0 || height == 0 {
            return GrayImage::new(width, height);
        }
        let mut data = vec![0u8; w * height as usize];
        // Only the rows the bounds touch can contain coverage.
        let b = self.bounds();
        let y0 = (b.min.y.floor().max(0.0) as usize).min(height as usize);
        let y1 = ((b.max.y.ceil() + 1.0).max(0.0) as usize).min(height as usize);
        let x0 = (b.min.x.floor().max(0.0) as usize).min(w);
        let x1 = ((b.max.x.ceil() + 1.0).max(0.0) as usize).min(w);

        data[y0 * w..y1 * w]
            .par_chunks_mut(w)
            .enumerate()
            .for_each(|(row, row_out)| {
                let py = (y0 + row) as f32 + 0.5;
                for x in x0..x1 {
                    if self.contains(x as f32 + 0.5, py) {
                        row_out[x] = 255;
                    }
                }
            });

        GrayImage::from_raw(width, height, data).expect("mask buffer size")
    }
}

/// Vertex ring of a regular polygon, first vertex pointing up before
/// `rotation` is applied.
fn regular_polygon_vertices(cx: f32, cy: f32, radius: f32, sides: u32, rotation: f32) -> Vec<Point> {
    let sides = sides.max(3);
    let step = std::f32::consts::TAU / sides as f32;
    (0..sides)
        .map(|i| {
            let a = rotation - std::f32::consts::FRAC_PI_2 + i as f32 * step;
            Point::new(cx + radius * a.cos(), cy + radius * a.sin())
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_union_and_intersect() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 20.0, 8.0);
        let u = a.union(b);
        assert_eq!(u, Rect::new(0.0, 0.0, 20.0, 10.0));
        let i = a.intersect(b);
        assert_eq!(i, Rect::new(5.0, 5.0, 10.0, 8.0));
        assert!(Rect::NOTHING.union(a) == a);
    }

    #[test]
    fn quad_rejects_self_intersecting_corner_move() {
        let mut quad = Quad::from_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        let before = *quad.corners();
        // Dragging the top-left corner past the right edge crosses edges 1-2
        // and 3-0 — a bow-tie. Must be a no-op.
        assert!(!quad.set_corner(0, Point::new(20.0, 5.0)));
        assert_eq!(*quad.corners(), before);
        // A sane move is accepted.
        assert!(quad.set_corner(0, Point::new(2.0, 1.0)));
        assert_eq!(quad.corner(0), Point::new(2.0, 1.0));
    }

    #[test]
    fn quad_bowtie_constructor_rejected() {
        let bowtie = Quad::from_corners([
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 10.0),
        ]);
        assert!(bowtie.is_none());
    }

    #[test]
    fn quad_edges_and_diagonals() {
        let quad = Quad::from_rect(Rect::new(0.0, 0.0, 4.0, 2.0));
        let edges = quad.edges();
        assert_eq!(edges[0], (Point::new(0.0, 0.0), Point::new(4.0, 0.0)));
        assert_eq!(edges[3], (Point::new(0.0, 2.0), Point::new(0.0, 0.0)));
        let diags = quad.diagonals();
        assert_eq!(diags[0], (Point::new(0.0, 0.0), Point::new(4.0, 2.0)));
        assert_eq!(diags[1], (Point::new(4.0, 0.0), Point::new(0.0, 2.0)));
    }

    #[test]
    fn concave_quad_is_still_simple() {
        // A dart shape: concave but no crossing edges.
        let dart = Quad::from_corners([
            Point::new(0.0, 0.0),
            Point::new(10.0, 5.0),
            Point::new(0.0, 10.0),
            Point::new(3.0, 5.0),
        ]);
        assert!(dart.is_some());
        let dart = dart.unwrap();
        assert!(dart.contains(1.5, 5.0));
        assert!(!dart.contains(2.0, 1.0));
    }

    #[test]
    fn circle_containment() {
        let c = Outline::Circle { cx: 5.0, cy: 5.0, radius: 3.0 };
        assert!(c.contains(5.0, 5.0));
        assert!(c.contains(7.9, 5.0));
        assert!(!c.contains(8.1, 5.0));
        assert_eq!(c.bounds(), Rect::new(2.0, 2.0, 8.0, 8.0));
    }

    #[test]
    fn composite_union_and_bounds() {
        let mut acc = Outline::empty();
        acc.union_with(Outline::square(2.0, 2.0, 2.0));
        acc.union_with(Outline::Circle { cx: 10.0, cy: 2.0, radius: 1.0 });
        assert_eq!(acc.leaf_count(), 2);
        assert!(acc.contains(2.0, 2.0));
        assert!(acc.contains(10.0, 2.0));
        assert!(!acc.contains(6.0, 2.0));
        assert_eq!(acc.bounds(), Rect::new(1.0, 1.0, 11.0, 3.0));
    }

    #[test]
    fn union_with_wraps_non_composite() {
        let mut shape = Outline::square(1.0, 1.0, 2.0);
        shape.union_with(Outline::square(5.0, 1.0, 2.0));
        assert_eq!(shape.leaf_count(), 2);
        assert!(shape.contains(1.0, 1.0) && shape.contains(5.0, 1.0));
    }

    #[test]
    fn mask_matches_containment() {
        let rect = Outline::Rectangle { rect: Rect::new(1.0, 1.0, 4.0, 3.0) };
        let mask = rect.to_mask(6, 5);
        assert_eq!(mask.get_pixel(2, 2)[0], 255);
        assert_eq!(mask.get_pixel(0, 0)[0], 0);
        assert_eq!(mask.get_pixel(5, 4)[0], 0);
    }

    #[test]
    fn regular_polygon_contains_center() {
        let hex = Outline::RegularPolygon {
            cx: 0.0,
            cy: 0.0,
            radius: 5.0,
            sides: 6,
            rotation: 0.0,
        };
        assert!(hex.contains(0.0, 0.0));
        assert!(!hex.contains(5.5, 0.0));
    }

    #[test]
    fn translate_moves_everything() {
        let mut c = Outline::Composite(vec![
            Outline::Circle { cx: 0.0, cy: 0.0, radius: 1.0 },
            Outline::square(4.0, 0.0, 2.0),
        ]);
        c.translate(10.0, 20.0);
        assert!(c.contains(10.0, 20.0));
        assert!(c.contains(14.0, 20.0));
        assert!(!c.contains(0.0, 0.0));
    }
}
