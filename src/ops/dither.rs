// ============================================================================
// DITHERING — quantization + error-diffusion over a normalized pixel matrix
// ============================================================================
//
// The source bitmap is converted to a per-channel float matrix, traversed
// top-to-bottom / left-to-right, quantized pixel by pixel, and the rounding
// error is pushed into not-yet-visited neighbors through a named kernel.
// The matrix is a local value of each `dither` call; nothing is cached
// between calls, so concurrent dithers never share state.
// ============================================================================

use image::RgbaImage;
use rayon::prelude::*;

// ============================================================================
// NORMALIZED PIXEL MATRIX
// ============================================================================

/// Row-major float image used while diffusing error.
///
/// Channels are `[r, g, b, a]` with r/g/b normalized to `[0, 1]` and alpha
/// kept in `[0, 255]`. Values are allowed to leave their nominal range while
/// error is being distributed; clamping happens once, in `to_image`.
pub struct PixelMatrix {
    width: u32,
    height: u32,
    data: Vec<[f32; 4]>,
}

impl PixelMatrix {
    /// Build the matrix from a bitmap. Dimensions always match the source.
    pub fn from_image(src: &RgbaImage) -> Self {
        let w = src.width() as usize;
        let h = src.height() as usize;
        let raw = src.as_raw();
        let mut data = vec![[0.0f32; 4]; w * h];

        data.par_chunks_mut(w.max(1)).enumerate().for_each(|(y, row_out)| {
            let row_in = &raw[y * w * 4..(y + 1) * w * 4];
            for x in 0..w {
                let pi = x * 4;
                row_out[x] = [
                    row_in[pi] as f32 / 255.0,
                    row_in[pi + 1] as f32 / 255.0,
                    row_in[pi + 2] as f32 / 255.0,
                    row_in[pi + 3] as f32,
                ];
            }
        });

        Self {
            width: src.width(),
            height: src.height(),
            data,
        }
    }

    /// Convert back to a bitmap. R/G/B are scaled to `[0, 255]` and clamped;
    /// alpha is written back as stored.
    pub fn to_image(&self) -> RgbaImage {
        let w = self.width as usize;
        let mut raw = vec![0u8; w * self.height as usize * 4];

        raw.par_chunks_mut(w.max(1) * 4).enumerate().for_each(|(y, row_out)| {
            let row_in = &self.data[y * w..(y + 1) * w];
            for x in 0..w {
                let [r, g, b, a] = row_in[x];
                let pi = x * 4;
                row_out[pi] = (r * 255.0).round().clamp(0.0, 255.0) as u8;
                row_out[pi + 1] = (g * 255.0).round().clamp(0.0, 255.0) as u8;
                row_out[pi + 2] = (b * 255.0).round().clamp(0.0, 255.0) as u8;
                row_out[pi + 3] = a.round().clamp(0.0, 255.0) as u8;
            }
        });

        RgbaImage::from_raw(self.width, self.height, raw).expect("matrix buffer size")
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> [f32; 4] {
        self.data[y as usize * self.width as usize + x as usize]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, px: [f32; 4]) {
        self.data[y as usize * self.width as usize + x as usize] = px;
    }

    /// Add a fraction of an r/g/b error into the cell at `(x + dx, y + dy)`.
    /// Targets outside the matrix are silently ignored.
    #[inline]
    fn distribute(&mut self, x: u32, y: u32, dx: i32, dy: i32, err: [f32; 3], fraction: f32) {
        let tx = x as i64 + dx as i64;
        let ty = y as i64 + dy as i64;
        if tx < 0 || ty < 0 || tx >= self.width as i64 || ty >= self.height as i64 {
            return;
        }
        let cell = &mut self.data[ty as usize * self.width as usize + tx as usize];
        cell[0] += err[0] * fraction;
        cell[1] += err[1] * fraction;
        cell[2] += err[2] * fraction;
    }
}

// ============================================================================
// QUANTIZATION FUNCTIONS
// ============================================================================

/// Snap a pixel to pure black or pure white by average luminosity.
/// The threshold is 0.5, inclusive on the black side: exactly 0.5 stays
/// black. Alpha passes through.
pub fn monochrome_quantizer(px: [f32; 4]) -> [f32; 4] {
    let luminosity = (px[0] + px[1] + px[2]) / 3.0;
    let v = if luminosity > 0.5 { 1.0 } else { 0.0 };
    [v, v, v, px[3]]
}

/// Per-channel posterization: each of r/g/b snaps independently to the
/// nearest of `levels` evenly spaced values in `[0, 1]`. Alpha passes
/// through. `levels` is clamped to at least 2.
pub fn level_quantizer(levels: u32) -> impl Fn([f32; 4]) -> [f32; 4] {
    let steps = (levels.max(2) - 1) as f32;
    move |px: [f32; 4]| {
        [
            (px[0] * steps).round() / steps,
            (px[1] * steps).round() / steps,
            (px[2] * steps).round() / steps,
            px[3],
        ]
    }
}

// ============================================================================
// ERROR-DIFFUSION KERNELS
// ============================================================================

/// A named error-diffusion kernel: fixed `(dx, dy, fraction)` targets
/// relative to the pixel being quantized.
///
/// Every kernel's fractions sum to 1.0, with one historical exception:
/// `Atkinson` lists six targets of 1/8 (the `(0, 1)` cell twice) and so
/// deliberately diffuses only three quarters of the error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiffusionKernel {
    FloydSteinberg,
    Atkinson,
    Sierra3,
    SierraLite,
    SierraTwo,
    Stucki,
    Burkes,
    JarvisJudiceNinke,
    /// No diffusion — pass-through quantization only.
    Null,
}

const FLOYD_STEINBERG: &[(i32, i32, f64)] = &[
    (1, 0, 7.0 / 16.0),
    (-1, 1, 3.0 / 16.0),
    (0, 1, 5.0 / 16.0),
    (1, 1, 1.0 / 16.0),
];

const ATKINSON: &[(i32, i32, f64)] = &[
    (1, 0, 1.0 / 8.0),
    (2, 0, 1.0 / 8.0),
    (-1, 1, 1.0 / 8.0),
    (0, 1, 1.0 / 8.0),
    (0, 1, 1.0 / 8.0),
    (1, 1, 1.0 / 8.0),
];

const SIERRA_3: &[(i32, i32, f64)] = &[
    (1, 0, 5.0 / 32.0),
    (2, 0, 3.0 / 32.0),
    (-2, 1, 2.0 / 32.0),
    (-1, 1, 4.0 / 32.0),
    (0, 1, 5.0 / 32.0),
    (1, 1, 4.0 / 32.0),
    (2, 1, 2.0 / 32.0),
    (-1, 2, 2.0 / 32.0),
    (0, 2, 3.0 / 32.0),
    (1, 2, 2.0 / 32.0),
];

const SIERRA_LITE: &[(i32, i32, f64)] = &[
    (1, 0, 1.0 / 2.0),
    (-1, 1, 1.0 / 4.0),
    (0, 1, 1.0 / 4.0),
];

const SIERRA_TWO: &[(i32, i32, f64)] = &[
    (1, 0, 4.0 / 16.0),
    (2, 0, 3.0 / 16.0),
    (-2, 1, 1.0 / 16.0),
    (-1, 1, 2.0 / 16.0),
    (0, 1, 3.0 / 16.0),
    (1, 1, 1.0 / 16.0),
    (2, 1, 1.0 / 16.0),
];

const STUCKI: &[(i32, i32, f64)] = &[
    (1, 0, 8.0 / 42.0),
    (2, 0, 4.0 / 42.0),
    (-2, 1, 2.0 / 42.0),
    (-1, 1, 4.0 / 42.0),
    (0, 1, 8.0 / 42.0),
    (1, 1, 4.0 / 42.0),
    (2, 1, 2.0 / 42.0),
    (-2, 2, 1.0 / 42.0),
    (-1, 2, 2.0 / 42.0),
    (0, 2, 4.0 / 42.0),
    (1, 2, 2.0 / 42.0),
    (2, 2, 1.0 / 42.0),
];

const BURKES: &[(i32, i32, f64)] = &[
    (1, 0, 8.0 / 32.0),
    (2, 0, 4.0 / 32.0),
    (-2, 1, 2.0 / 32.0),
    (-1, 1, 4.0 / 32.0),
    (0, 1, 8.0 / 32.0),
    (1, 1, 4.0 / 32.0),
    (2, 1, 2.0 / 32.0),
];

const JARVIS_JUDICE_NINKE: &[(i32, i32, f64)] = &[
    (1, 0, 7.0 / 48.0),
    (2, 0, 5.0 / 48.0),
    (-2, 1, 3.0 / 48.0),
    (-1, 1, 5.0 / 48.0),
    (0, 1, 7.0 / 48.0),
    (1, 1, 5.0 / 48.0),
    (2, 1, 3.0 / 48.0),
    (-2, 2, 1.0 / 48.0),
    (-1, 2, 3.0 / 48.0),
    (0, 2, 5.0 / 48.0),
    (1, 2, 3.0 / 48.0),
    (2, 2, 1.0 / 48.0),
];

impl DiffusionKernel {
    pub fn all() -> &'static [DiffusionKernel] {
        &[
            DiffusionKernel::FloydSteinberg,
            DiffusionKernel::Atkinson,
            DiffusionKernel::Sierra3,
            DiffusionKernel::SierraLite,
            DiffusionKernel::SierraTwo,
            DiffusionKernel::Stucki,
            DiffusionKernel::Burkes,
            DiffusionKernel::JarvisJudiceNinke,
            DiffusionKernel::Null,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            DiffusionKernel::FloydSteinberg => "floyd-steinberg",
            DiffusionKernel::Atkinson => "atkinson",
            DiffusionKernel::Sierra3 => "sierra-3",
            DiffusionKernel::SierraLite => "sierra-lite",
            DiffusionKernel::SierraTwo => "sierra-two",
            DiffusionKernel::Stucki => "stucki",
            DiffusionKernel::Burkes => "burkes",
            DiffusionKernel::JarvisJudiceNinke => "jarvis-judice-ninke",
            DiffusionKernel::Null => "null",
        }
    }

    /// Parse a kernel by its CLI name.
    pub fn from_name(name: &str) -> Option<DiffusionKernel> {
        Self::all().iter().copied().find(|k| k.name() == name)
    }

    /// The `(dx, dy, fraction)` targets. Empty for `Null`. Fractions are
    /// kept in f64 so their sums stay exact to well under 1e-9.
    pub fn offsets(&self) -> &'static [(i32, i32, f64)] {
        match self {
            DiffusionKernel::FloydSteinberg => FLOYD_STEINBERG,
            DiffusionKernel::Atkinson => ATKINSON,
            DiffusionKernel::Sierra3 => SIERRA_3,
            DiffusionKernel::SierraLite => SIERRA_LITE,
            DiffusionKernel::SierraTwo => SIERRA_TWO,
            DiffusionKernel::Stucki => STUCKI,
            DiffusionKernel::Burkes => BURKES,
            DiffusionKernel::JarvisJudiceNinke => JARVIS_JUDICE_NINKE,
            DiffusionKernel::Null => &[],
        }
    }
}

// ============================================================================
// DITHER DRIVER
// ============================================================================

/// Quantize every pixel of `src` with `quantize`, diffusing the per-channel
/// r/g/b rounding error through `kernel`. The source is left untouched.
///
/// Traversal is row-major, each pixel visited exactly once. Alpha is never
/// quantized and collects no error.
pub fn dither<Q>(src: &RgbaImage, kernel: DiffusionKernel, quantize: Q) -> RgbaImage
where
    Q: Fn([f32; 4]) -> [f32; 4],
{
    let mut matrix = PixelMatrix::from_image(src);
    let offsets = kernel.offsets();

    for y in 0..matrix.height() {
        for x in 0..matrix.width() {
            let original = matrix.get(x, y);
            let quantized = quantize(original);
            matrix.set(x, y, quantized);

            if offsets.is_empty() {
                continue;
            }
            let err = [
                original[0] - quantized[0],
                original[1] - quantized[1],
                original[2] - quantized[2],
            ];
            for &(dx, dy, fraction) in offsets {
                matrix.distribute(x, y, dx, dy, err, fraction as f32);
            }
        }
    }

    matrix.to_image()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(w: u32, h: u32, px: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(px))
    }

    #[test]
    fn kernel_fractions_sum_to_one() {
        for kernel in DiffusionKernel::all() {
            let sum: f64 = kernel.offsets().iter().map(|&(_, _, f)| f).sum();
            match kernel {
                DiffusionKernel::Null => assert_eq!(kernel.offsets().len(), 0),
                // Atkinson spreads six eighths and keeps the rest.
                DiffusionKernel::Atkinson => assert!((sum - 0.75).abs() < 1e-9),
                _ => assert!(
                    (sum - 1.0).abs() < 1e-9,
                    "{} sums to {}",
                    kernel.name(),
                    sum
                ),
            }
        }
    }

    #[test]
    fn kernel_names_round_trip() {
        for kernel in DiffusionKernel::all() {
            assert_eq!(DiffusionKernel::from_name(kernel.name()), Some(*kernel));
        }
        assert_eq!(DiffusionKernel::from_name("nonsense"), None);
    }

    #[test]
    fn matrix_round_trip_is_exact() {
        // Alpha 0/255 and rgb values that are exact multiples of 1/255
        // survive the float round trip bit-for-bit.
        let mut img = RgbaImage::new(3, 2);
        img.put_pixel(0, 0, Rgba([0, 128, 255, 255]));
        img.put_pixel(1, 0, Rgba([17, 34, 51, 0]));
        img.put_pixel(2, 0, Rgba([250, 1, 99, 255]));
        img.put_pixel(0, 1, Rgba([255, 255, 255, 0]));
        img.put_pixel(1, 1, Rgba([0, 0, 0, 255]));
        img.put_pixel(2, 1, Rgba([127, 63, 200, 255]));

        let round = PixelMatrix::from_image(&img).to_image();
        assert_eq!(img, round);
    }

    #[test]
    fn monochrome_threshold_is_exclusive_of_white() {
        assert_eq!(monochrome_quantizer([0.5, 0.5, 0.5, 255.0]), [0.0, 0.0, 0.0, 255.0]);
        assert_eq!(
            monochrome_quantizer([0.51, 0.51, 0.51, 42.0]),
            [1.0, 1.0, 1.0, 42.0]
        );
        assert_eq!(monochrome_quantizer([0.0, 0.0, 0.0, 0.0]), [0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn null_kernel_equals_per_pixel_quantization() {
        let mut img = RgbaImage::new(4, 3);
        for (i, px) in img.pixels_mut().enumerate() {
            let v = (i * 23 % 256) as u8;
            *px = Rgba([v, 255 - v, v / 2, 255]);
        }

        let dithered = dither(&img, DiffusionKernel::Null, monochrome_quantizer);

        // Quantize each pixel independently and compare.
        for (x, y, px) in img.enumerate_pixels() {
            let q = monochrome_quantizer([
                px[0] as f32 / 255.0,
                px[1] as f32 / 255.0,
                px[2] as f32 / 255.0,
                px[3] as f32,
            ]);
            let expect = Rgba([
                (q[0] * 255.0) as u8,
                (q[1] * 255.0) as u8,
                (q[2] * 255.0) as u8,
                px[3],
            ]);
            assert_eq!(*dithered.get_pixel(x, y), expect);
        }
    }

    #[test]
    fn single_black_pixel_stays_black_for_every_kernel() {
        let img = solid(1, 1, [0, 0, 0, 255]);
        for kernel in DiffusionKernel::all() {
            let out = dither(&img, *kernel, monochrome_quantizer);
            assert_eq!(*out.get_pixel(0, 0), Rgba([0, 0, 0, 255]), "{}", kernel.name());
        }
    }

    #[test]
    fn dither_does_not_mutate_source() {
        let img = solid(8, 8, [100, 150, 200, 255]);
        let copy = img.clone();
        let _ = dither(&img, DiffusionKernel::FloydSteinberg, monochrome_quantizer);
        assert_eq!(img, copy);
    }

    #[test]
    fn dither_preserves_alpha_channel() {
        let mut img = solid(4, 4, [120, 120, 120, 255]);
        img.put_pixel(2, 2, Rgba([120, 120, 120, 7]));
        let out = dither(&img, DiffusionKernel::Stucki, monochrome_quantizer);
        assert_eq!(out.get_pixel(2, 2)[3], 7);
        assert_eq!(out.get_pixel(0, 0)[3], 255);
    }

    #[test]
    fn mid_grey_floyd_steinberg_averages_out() {
        // A 50% grey field quantized to black/white must come out roughly
        // half black, half white — that is the whole point of dithering.
        let img = solid(16, 16, [128, 128, 128, 255]);
        let out = dither(&img, DiffusionKernel::FloydSteinberg, monochrome_quantizer);
        let white = out.pixels().filter(|p| p[0] == 255).count();
        let total = (out.width() * out.height()) as usize;
        assert!(white > total / 4 && white < 3 * total / 4, "white = {}/{}", white, total);
    }

    #[test]
    fn level_quantizer_posterizes_channels_independently() {
        let q = level_quantizer(3); // levels: 0.0, 0.5, 1.0
        let out = q([0.1, 0.6, 0.9, 200.0]);
        assert_eq!(out, [0.0, 0.5, 1.0, 200.0]);
    }
}
