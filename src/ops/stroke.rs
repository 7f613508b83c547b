// ============================================================================
// STAMP-STROKE BRUSH ENGINE — path flattening + tip stamping
// ============================================================================
//
// A stroke is built in two steps: curved path segments are flattened into a
// polyline (bounded deviation), then a copy of the brush tip outline is
// stamped at every vertex and, optionally, at fixed pixel intervals along
// each straight run. The stamps accumulate into one composite outline; the
// caller fills or strokes that outline with paint afterwards.
// ============================================================================

use ab_glyph::{Font, FontArc, OutlineCurve};

use crate::geometry::{Outline, Point, Quad, Rect};

/// Maximum deviation, in pixels, allowed when a curve is approximated with
/// straight segments.
pub const DEFAULT_FLATNESS: f32 = 2.0;

// ============================================================================
// PATHS
// ============================================================================

/// One path segment; the start point is the end of the previous segment.
#[derive(Clone, Copy, Debug)]
pub enum PathSegment {
    LineTo(Point),
    /// Quadratic Bézier: control, end.
    QuadTo(Point, Point),
    /// Cubic Bézier: control 1, control 2, end.
    CubicTo(Point, Point, Point),
}

/// An open path traced by a pointer: a start point plus segments.
#[derive(Clone, Debug, Default)]
pub struct Path {
    start: Point,
    segments: Vec<PathSegment>,
}

impl Path {
    pub fn new(start: Point) -> Self {
        Self {
            start,
            segments: Vec::new(),
        }
    }

    pub fn start(&self) -> Point {
        self.start
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn line_to(&mut self, to: Point) -> &mut Self {
        self.segments.push(PathSegment::LineTo(to));
        self
    }

    pub fn quad_to(&mut self, ctrl: Point, to: Point) -> &mut Self {
        self.segments.push(PathSegment::QuadTo(ctrl, to));
        self
    }

    pub fn cubic_to(&mut self, ctrl1: Point, ctrl2: Point, to: Point) -> &mut Self {
        self.segments.push(PathSegment::CubicTo(ctrl1, ctrl2, to));
        self
    }

    /// Flatten to a polyline. Curved segments are subdivided until no
    /// sub-segment deviates from the true curve by more than `flatness`
    /// pixels; straight segments pass through untouched. The returned
    /// vertices include the start point.
    pub fn flatten(&self, flatness: f32) -> Vec<Point> {
        let flatness = if flatness > 0.0 { flatness } else { DEFAULT_FLATNESS };
        let mut verts = vec![self.start];
        let mut cursor = self.start;
        for seg in &self.segments {
            match *seg {
                PathSegment::LineTo(to) => {
                    verts.push(to);
                    cursor = to;
                }
                PathSegment::QuadTo(ctrl, to) => {
                    flatten_quad(cursor, ctrl, to, flatness, 0, &mut verts);
                    cursor = to;
                }
                PathSegment::CubicTo(c1, c2, to) => {
                    flatten_cubic(cursor, c1, c2, to, flatness, 0, &mut verts);
                    cursor = to;
                }
            }
        }
        verts
    }
}

/// Recursion guard — 16 halvings reduce any curve below any sane flatness.
const MAX_SUBDIV_DEPTH: u32 = 16;

/// Distance from `p` to the chord a→b.
fn chord_distance(p: Point, a: Point, b: Point) -> f32 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len = (dx * dx + dy * dy).sqrt();
    if len < 1e-6 {
        return p.distance(a);
    }
    ((p.x - a.x) * dy - (p.y - a.y) * dx).abs() / len
}

fn midpoint(a: Point, b: Point) -> Point {
    Point::new((a.x + b.x) * 0.5, (a.y + b.y) * 0.5)
}

/// De Casteljau subdivision of a quadratic until the control point sits
/// within `flatness` of the chord. Pushes every vertex after the start.
fn flatten_quad(p0: Point, ctrl: Point, p1: Point, flatness: f32, depth: u32, out: &mut Vec<Point>) {
    if depth >= MAX_SUBDIV_DEPTH || chord_distance(ctrl, p0, p1) <= flatness {
        out.push(p1);
        return;
    }
    let a = midpoint(p0, ctrl);
    let b = midpoint(ctrl, p1);
    let m = midpoint(a, b);
    flatten_quad(p0, a, m, flatness, depth + 1, out);
    flatten_quad(m, b, p1, flatness, depth + 1, out);
}

fn flatten_cubic(
    p0: Point,
    c1: Point,
    c2: Point,
    p1: Point,
    flatness: f32,
    depth: u32,
    out: &mut Vec<Point>,
) {
    let dev = chord_distance(c1, p0, p1).max(chord_distance(c2, p0, p1));
    if depth >= MAX_SUBDIV_DEPTH || dev <= flatness {
        out.push(p1);
        return;
    }
    let a1 = midpoint(p0, c1);
    let a2 = midpoint(c1, c2);
    let a3 = midpoint(c2, p1);
    let b1 = midpoint(a1, a2);
    let b2 = midpoint(a2, a3);
    let m = midpoint(b1, b2);
    flatten_cubic(p0, a1, b1, m, flatness, depth + 1, out);
    flatten_cubic(m, b2, a3, p1, flatness, depth + 1, out);
}

// ============================================================================
// BRUSH TIPS
// ============================================================================

/// How a tip outline is placed onto a stamp target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TipTranslation {
    /// Translate the tip so its bounding-box centre lands on the target.
    Centered,
    /// The tip was already translated by half its bounding extents when it
    /// was built (glyph tips); the stamp adds the target coordinates only.
    PreTranslated,
}

/// A brush tip: the outline to stamp plus its translation mode.
#[derive(Clone, Debug)]
pub struct BrushTip {
    pub outline: Outline,
    pub mode: TipTranslation,
}

impl BrushTip {
    pub fn circle(diameter: f32) -> Self {
        Self {
            outline: Outline::Circle {
                cx: 0.0,
                cy: 0.0,
                radius: diameter * 0.5,
            },
            mode: TipTranslation::Centered,
        }
    }

    pub fn oval(width: f32, height: f32) -> Self {
        Self {
            outline: Outline::Oval {
                rect: Rect::from_center(0.0, 0.0, width * 0.5, height * 0.5),
            },
            mode: TipTranslation::Centered,
        }
    }

    pub fn rect(width: f32, height: f32) -> Self {
        Self {
            outline: Outline::Rectangle {
                rect: Rect::from_center(0.0, 0.0, width * 0.5, height * 0.5),
            },
            mode: TipTranslation::Centered,
        }
    }

    pub fn square(side: f32) -> Self {
        Self::rect(side, side)
    }

    pub fn rounded_rect(width: f32, height: f32, corner_radius: f32) -> Self {
        Self {
            outline: Outline::RoundedRect {
                rect: Rect::from_center(0.0, 0.0, width * 0.5, height * 0.5),
                corner_radius,
            },
            mode: TipTranslation::Centered,
        }
    }

    pub fn regular_polygon(sides: u32, radius: f32) -> Self {
        Self {
            outline: Outline::RegularPolygon {
                cx: 0.0,
                cy: 0.0,
                radius,
                sides,
                rotation: 0.0,
            },
            mode: TipTranslation::Centered,
        }
    }

    pub fn quad(quad: Quad) -> Self {
        Self {
            outline: Outline::Quadrilateral(quad),
            mode: TipTranslation::Centered,
        }
    }

    /// Build a tip from a glyph outline at `size` pixels.
    ///
    /// The glyph's curves are flattened into polygon contours here, once,
    /// with the same flatness rule as path flattening. The contours are
    /// shifted by half the glyph's bounding extents so the finished tip is
    /// centred on its own origin (`PreTranslated`). Returns `None` when the
    /// font has no outline for `ch` (e.g. whitespace).
    pub fn glyph(font: &FontArc, ch: char, size: f32, flatness: f32) -> Option<Self> {
        let glyph_outline = font.outline(font.glyph_id(ch))?;
        let scale = size / font.height_unscaled();
        let flatness = if flatness > 0.0 { flatness } else { DEFAULT_FLATNESS };

        // Font units are y-up; the canvas is y-down.
        let map = |p: ab_glyph::Point| Point::new(p.x * scale, -p.y * scale);

        let mut contours: Vec<Vec<Point>> = Vec::new();
        let mut current: Vec<Point> = Vec::new();
        let mut cursor = Point::ZERO;

        for curve in &glyph_outline.curves {
            let (start, end_points) = match *curve {
                OutlineCurve::Line(a, b) => {
                    let (a, b) = (map(a), map(b));
                    (a, vec![b])
                }
                OutlineCurve::Quad(a, c, b) => {
                    let (a, c, b) = (map(a), map(c), map(b));
                    let mut pts = Vec::new();
                    flatten_quad(a, c, b, flatness, 0, &mut pts);
                    (a, pts)
                }
                OutlineCurve::Cubic(a, c1, c2, b) => {
                    let (a, c1, c2, b) = (map(a), map(c1), map(c2), map(b));
                    let mut pts = Vec::new();
                    flatten_cubic(a, c1, c2, b, flatness, 0, &mut pts);
                    (a, pts)
                }
            };

            // A jump in the start point closes the running contour.
            if current.is_empty() || start.distance(cursor) > 1e-3 {
                if current.len() >= 3 {
                    contours.push(std::mem::take(&mut current));
                } else {
                    current.clear();
                }
                current.push(start);
            }
            cursor = *end_points.last().unwrap_or(&start);
            current.extend(end_points);
        }
        if current.len() >= 3 {
            contours.push(current);
        }
        if contours.is_empty() {
            return None;
        }

        let mut outline = Outline::Polygon { contours };
        let b = outline.bounds();
        // Pre-translate by half the bounding extents: centre on the origin.
        outline.translate(
            -b.min.x - b.width() * 0.5,
            -b.min.y - b.height() * 0.5,
        );

        Some(Self {
            outline,
            mode: TipTranslation::PreTranslated,
        })
    }

    /// The tip outline translated onto a stamp target.
    fn stamped_at(&self, target: Point) -> Outline {
        match self.mode {
            TipTranslation::Centered => {
                let c = self.outline.bounds().center();
                self.outline.translated(target.x - c.x, target.y - c.y)
            }
            TipTranslation::PreTranslated => self.outline.translated(target.x, target.y),
        }
    }
}

// ============================================================================
// STROKE RASTERIZATION
// ============================================================================

/// Turn a path plus a tip shape into one filled stroke outline.
///
/// Stamp targets are every vertex of the flattened path and, when
/// `interval >= 1`, every `interval`-th pixel step along each straight
/// segment between consecutive vertices (an interval of 1 stamps every
/// pixel; an interval of 0 or below stamps only the vertices).
pub fn stroke_outline(path: &Path, tip: &BrushTip, interval: i32, flatness: f32) -> Outline {
    let verts = path.flatten(flatness);
    let mut acc = Outline::empty();

    let stamp = |acc: &mut Outline, target: Point| {
        acc.union_with(tip.stamped_at(target));
    };

    stamp(&mut acc, verts[0]);
    for pair in verts.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if interval >= 1 {
            // Integer parameterization of the segment: one step per pixel
            // along the dominant axis.
            let steps = (b.x - a.x).abs().max((b.y - a.y).abs()).round() as i32;
            let mut i = interval;
            while i < steps {
                let t = i as f32 / steps as f32;
                stamp(
                    &mut acc,
                    Point::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t),
                );
                i += interval;
            }
        }
        if b != a {
            stamp(&mut acc, b);
        }
    }
    acc
}

// ============================================================================
// TESTS
// ============================================================================
