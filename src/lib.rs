//! RasterCore — the pixel and geometry core of a raster image editor.
//!
//! Everything operates on in-memory 8-bit RGBA bitmaps (`image::RgbaImage`):
//!
//! * [`ops::dither`] — quantization + error-diffusion dithering over a
//!   normalized per-channel float matrix.
//! * [`ops::flood`] — flood fill driven by pluggable boundary predicates and
//!   fill actions, painting into a scratch overlay.
//! * [`ops::stroke`] — the stamp-stroke brush engine: path flattening plus
//!   tip-shape stamping into one composite outline.
//! * [`canvas`] — layers, append-only layer sets, scratch overlays and the
//!   compositor.
//! * [`ops::selection`] — the selection pipeline: masked capture, pixel and
//!   affine transforms, pickup and commit.
//! * [`geometry`] — points, rectangles, quadrilaterals and the closed
//!   outline shapes shared by all of the above.
//!
//! The [`cli`] module backs the headless batch binary; [`project`] persists
//! layered documents; [`logger`] is the session log used throughout.

#![allow(clippy::too_many_arguments)]

pub mod canvas;
pub mod cli;
pub mod geometry;
pub mod logger;
pub mod ops;
pub mod project;

pub use canvas::{CompositeRule, Layer, LayerSet, ScratchBuffer};
pub use geometry::{Outline, Point, Quad, Rect};
pub use ops::dither::{DiffusionKernel, PixelMatrix, dither};
pub use ops::flood::{Paint, flood_fill};
pub use ops::selection::Selection;
pub use ops::stroke::{BrushTip, Path, TipTranslation, stroke_outline};
