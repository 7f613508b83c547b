// ============================================================================
// RasterCore CLI — headless batch dithering via command-line arguments
// ============================================================================
//
// Usage examples:
//   rastercore --input photo.png --output dithered.png
//   rastercore -i photo.jpg -k atkinson -o out.png
//   rastercore -i "*.jpg" --levels 4 --output-dir processed/ --format png
//   rastercore -i a.png b.png c.png --output-dir out/ -k sierra-lite
//
// All processing runs synchronously on the current thread.
// ============================================================================

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::ops::dither::{DiffusionKernel, dither, level_quantizer, monochrome_quantizer};
use crate::{log_err, log_info};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// RasterCore headless batch ditherer.
///
/// Quantize images to monochrome or a reduced per-channel palette with
/// error-diffusion dithering — no GUI required.
#[derive(Parser, Debug)]
#[command(
    name = "rastercore",
    about = "RasterCore headless batch ditherer",
    long_about = "Apply error-diffusion dithering to image files without opening a GUI.\n\
                  Images are quantized to monochrome by default, or to an evenly\n\
                  spaced per-channel palette with --levels.\n\n\
                  Example:\n  \
                  rastercore --input photo.png --kernel atkinson --output result.png\n  \
                  rastercore -i \"*.jpg\" --levels 4 --output-dir out/ --format png"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Error-diffusion kernel: floyd-steinberg, atkinson, sierra-3,
    /// sierra-lite, sierra-two, stucki, burkes, jarvis-judice-ninke, null.
    #[arg(short, long, default_value = "floyd-steinberg", value_name = "KERNEL")]
    pub kernel: String,

    /// Posterize each color channel to N evenly spaced levels instead of
    /// quantizing to monochrome.
    #[arg(short, long, value_name = "N")]
    pub levels: Option<u32>,

    /// Output file path. Only valid for single-file input.
    /// For batch input use --output-dir instead.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    /// Files are written here with the original stem and the target format's extension.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format (png, jpeg, bmp, ...). When omitted, the format is
    /// inferred from the output path's extension, defaulting to png.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Print per-file timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Runner
// ============================================================================

/// Process every input; returns the process exit code.
pub fn run(args: CliArgs) -> ExitCode {
    let kernel = match DiffusionKernel::from_name(&args.kernel) {
        Some(k) => k,
        None => {
            eprintln!(
                "error: unknown kernel '{}' (expected one of: {})",
                args.kernel,
                DiffusionKernel::all()
                    .iter()
                    .map(|k| k.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            return ExitCode::FAILURE;
        }
    };

    let inputs = expand_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched");
        return ExitCode::FAILURE;
    }
    if args.output.is_some() && inputs.len() > 1 {
        eprintln!("error: --output is only valid for a single input; use --output-dir");
        return ExitCode::FAILURE;
    }

    let mut failures = 0usize;
    for input in &inputs {
        let started = Instant::now();
        match process_one(input, kernel, &args) {
            Ok(out_path) => {
                log_info!("dithered {} -> {}", input.display(), out_path.display());
                if args.verbose {
                    println!(
                        "{} -> {} ({} ms)",
                        input.display(),
                        out_path.display(),
                        started.elapsed().as_millis()
                    );
                }
            }
            Err(msg) => {
                log_err!("{}: {}", input.display(), msg);
                eprintln!("error: {}: {}", input.display(), msg);
                failures += 1;
            }
        }
    }

    if args.verbose {
        println!("{}/{} file(s) processed", inputs.len() - failures, inputs.len());
    }
    if failures > 0 { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

/// Expand glob patterns; plain paths pass through untouched.
fn expand_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for pattern in patterns {
        let path = PathBuf::from(pattern);
        if path.exists() {
            files.push(path);
            continue;
        }
        match glob::glob(pattern) {
            Ok(matches) => {
                for entry in matches.flatten() {
                    files.push(entry);
                }
            }
            Err(_) => files.push(path),
        }
    }
    files
}

fn process_one(input: &Path, kernel: DiffusionKernel, args: &CliArgs) -> Result<PathBuf, String> {
    let src = image::open(input)
        .map_err(|e| format!("failed to load: {}", e))?
        .into_rgba8();

    let out = match args.levels {
        Some(levels) => dither(&src, kernel, level_quantizer(levels)),
        None => dither(&src, kernel, monochrome_quantizer),
    };

    let out_path = resolve_output_path(input, args)?;
    if let Some(parent) = out_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| format!("failed to create output dir: {}", e))?;
    }

    // JPEG has no alpha channel — flatten before encoding.
    let is_jpeg = out_path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"));
    let result = if is_jpeg {
        image::DynamicImage::ImageRgba8(out).to_rgb8().save(&out_path)
    } else {
        out.save(&out_path)
    };
    result.map_err(|e| format!("failed to save: {}", e))?;
    Ok(out_path)
}

/// Where one input's result goes: --output, or --output-dir + stem, or a
/// "<stem>-dithered.<ext>" sibling of the input.
fn resolve_output_path(input: &Path, args: &CliArgs) -> Result<PathBuf, String> {
    let ext = args.format.clone().unwrap_or_else(|| {
        args.output
            .as_ref()
            .and_then(|p| p.extension())
            .and_then(|e| e.to_str())
            .unwrap_or("png")
            .to_string()
    });

    if let Some(output) = &args.output {
        return Ok(output.clone());
    }

    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| "input has no usable file name".to_string())?;

    if let Some(dir) = &args.output_dir {
        return Ok(dir.join(format!("{}.{}", stem, ext)));
    }
    Ok(input.with_file_name(format!("{}-dithered.{}", stem, ext)))
}

// ============================================================================
// TESTS
// ============================================================================
