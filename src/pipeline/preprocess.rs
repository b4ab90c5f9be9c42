//! Preprocessing cascade: raw page raster → image tuned for recognition.
//!
//! Steps run in a fixed order over a grayscale working image:
//!
//! ```text
//! grayscale ──▶ upscale ──▶ median ──▶ binarize ──▶ open
//!                                     (adaptive,     (optional)
//!                                      Otsu fallback)
//! ```
//!
//! The cascade is an interpreter over a list of [`Step`]s. Inputs that the
//! filters cannot handle (empty images, images smaller than the threshold
//! block) are rejected up front. Each step also runs behind `catch_unwind`
//! as a last resort: a step that fails or panics is skipped and the next
//! step receives the last image that was produced successfully. A caught
//! panic is still printed by the process panic hook; it is a bug report,
//! not a normal outcome. The
//! original raster is never modified and is handed back alongside the
//! processed image for the last-resort recognition attempt.

use crate::config::PreprocessConfig;
use crate::error::PreprocessError;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage};
use imageproc::contrast::{adaptive_threshold, otsu_level};
use imageproc::distance_transform::Norm;
use imageproc::filter::median_filter;
use imageproc::morphology::open;
use std::borrow::Cow;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, warn};

/// One transformation in the cascade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    Grayscale,
    Upscale { factor: f32 },
    MedianBlur { radius: u32 },
    Binarize { block_radius: u32 },
    Open { radius: u8 },
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Step::Grayscale => "grayscale",
            Step::Upscale { .. } => "upscale",
            Step::MedianBlur { .. } => "median",
            Step::Binarize { .. } => "binarize",
            Step::Open { .. } => "open",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Grayscale => write!(f, "grayscale"),
            Step::Upscale { factor } => write!(f, "upscale x{factor}"),
            Step::MedianBlur { radius } => write!(f, "median r={radius}"),
            Step::Binarize { block_radius } => write!(f, "binarize r={block_radius}"),
            Step::Open { radius } => write!(f, "open r={radius}"),
        }
    }
}

/// Build the step list for a configuration. Disabled steps are omitted.
pub fn plan(config: &PreprocessConfig) -> Vec<Step> {
    let mut steps = vec![Step::Grayscale];
    if config.upscale_factor > 1.0 {
        steps.push(Step::Upscale {
            factor: config.upscale_factor,
        });
    }
    if config.median_radius > 0 {
        steps.push(Step::MedianBlur {
            radius: config.median_radius,
        });
    }
    steps.push(Step::Binarize {
        block_radius: config.adaptive_block_radius.max(1),
    });
    if config.open_radius > 0 {
        steps.push(Step::Open {
            radius: config.open_radius,
        });
    }
    steps
}

/// Output of the cascade.
#[derive(Debug, Clone)]
pub struct PreprocessedPage {
    /// Result of the last successful step (the original if none succeeded).
    pub processed: DynamicImage,
    /// The untouched input raster.
    pub original: DynamicImage,
    /// Steps that produced an image, in order, e.g. `"binarize(otsu)"`.
    pub applied: Vec<String>,
}

/// Run the cascade on a page raster. Never fails.
pub fn preprocess(original: DynamicImage, config: &PreprocessConfig) -> PreprocessedPage {
    let mut current: Option<DynamicImage> = None;
    let mut applied = Vec::new();

    for step in plan(config) {
        let input = current.as_ref().unwrap_or(&original);
        match run_guarded(step, input) {
            Ok((image, label)) => {
                debug!("Preprocess {} → {}x{}", label, image.width(), image.height());
                applied.push(label);
                current = Some(image);
            }
            Err(e) => warn!("Preprocess step skipped: {}", e),
        }
    }

    PreprocessedPage {
        processed: current.unwrap_or_else(|| original.clone()),
        original,
        applied,
    }
}

fn run_guarded(step: Step, input: &DynamicImage) -> Result<(DynamicImage, String), PreprocessError> {
    let name = step.name();
    if input.width() == 0 || input.height() == 0 {
        return Err(PreprocessError::TooSmall {
            step: name,
            width: input.width(),
            height: input.height(),
        });
    }
    catch_unwind(AssertUnwindSafe(|| apply(step, input)))
        .map_err(|_| PreprocessError::Panicked { step: name })?
}

fn apply(step: Step, input: &DynamicImage) -> Result<(DynamicImage, String), PreprocessError> {
    let gray = luma(input);
    let (image, label) = match step {
        Step::Grayscale => (gray.into_owned(), step.name().to_string()),
        Step::Upscale { factor } => {
            let width = scaled(gray.width(), factor);
            let height = scaled(gray.height(), factor);
            (
                imageops::resize(gray.as_ref(), width, height, FilterType::CatmullRom),
                step.to_string(),
            )
        }
        Step::MedianBlur { radius } => (median_filter(gray.as_ref(), radius, radius), step.to_string()),
        Step::Binarize { block_radius } => match adaptive(gray.as_ref(), block_radius) {
            Ok(image) => (image, "binarize(adaptive)".to_string()),
            Err(e) => {
                debug!("Adaptive threshold unavailable ({}), using Otsu", e);
                (otsu(gray.as_ref()), "binarize(otsu)".to_string())
            }
        },
        Step::Open { radius } => (open(gray.as_ref(), Norm::LInf, radius), step.to_string()),
    };
    Ok((DynamicImage::ImageLuma8(image), label))
}

// Adaptive thresholding needs at least one full block of context.
fn adaptive(gray: &GrayImage, block_radius: u32) -> Result<GrayImage, PreprocessError> {
    let block = 2 * block_radius + 1;
    if gray.width() < block || gray.height() < block {
        return Err(PreprocessError::TooSmall {
            step: "binarize",
            width: gray.width(),
            height: gray.height(),
        });
    }
    Ok(adaptive_threshold(gray, block_radius))
}

fn otsu(gray: &GrayImage) -> GrayImage {
    let level = otsu_level(gray);
    let mut out = gray.clone();
    for pixel in out.pixels_mut() {
        pixel.0[0] = if pixel.0[0] > level { 255 } else { 0 };
    }
    out
}

fn luma(image: &DynamicImage) -> Cow<'_, GrayImage> {
    match image {
        DynamicImage::ImageLuma8(gray) => Cow::Borrowed(gray),
        other => Cow::Owned(other.to_luma8()),
    }
}

fn scaled(dim: u32, factor: f32) -> u32 {
    ((dim as f32 * factor).round() as u32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    fn page(width: u32, height: u32) -> DynamicImage {
        // dark "glyph" stripes on a light background
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, _| {
            if x % 8 < 2 {
                Rgb([20, 20, 20])
            } else {
                Rgb([235, 235, 235])
            }
        }))
    }

    #[test]
    fn default_plan_order() {
        let steps = plan(&PreprocessConfig::default());
        let names: Vec<_> = steps.iter().map(Step::name).collect();
        assert_eq!(names, vec!["grayscale", "upscale", "median", "binarize"]);
    }

    #[test]
    fn opening_is_planned_when_enabled() {
        let config = PreprocessConfig {
            open_radius: 1,
            upscale_factor: 1.0,
            median_radius: 0,
            ..PreprocessConfig::default()
        };
        let names: Vec<_> = plan(&config).iter().map(Step::name).collect();
        assert_eq!(names, vec!["grayscale", "binarize", "open"]);
    }

    #[test]
    fn full_cascade_upscales_and_binarizes() {
        let out = preprocess(page(64, 48), &PreprocessConfig::default());
        assert_eq!(out.processed.width(), 96);
        assert_eq!(out.processed.height(), 72);
        assert_eq!(out.original.width(), 64);
        assert!(out.applied.contains(&"binarize(adaptive)".to_string()));
        let gray = out.processed.to_luma8();
        assert!(gray.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn page_smaller_than_block_uses_otsu() {
        // 8x8 upscales to 12x12, below the 21-pixel adaptive block.
        let out = preprocess(page(8, 8), &PreprocessConfig::default());
        assert_eq!(out.applied.last().map(String::as_str), Some("binarize(otsu)"));
        let DynamicImage::ImageLuma8(gray) = &out.processed else {
            panic!("expected a grayscale result");
        };
        assert!(gray.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn one_pixel_image_survives() {
        let tiny = DynamicImage::ImageLuma8(GrayImage::from_pixel(1, 1, Luma([128])));
        let out = preprocess(tiny, &PreprocessConfig::default());
        assert!(out.processed.width() >= 1);
        assert!(out.applied.contains(&"binarize(otsu)".to_string()));
    }

    #[test]
    fn empty_image_falls_back_to_original() {
        let empty = DynamicImage::ImageLuma8(GrayImage::new(0, 0));
        let out = preprocess(empty, &PreprocessConfig::default());
        assert!(out.applied.is_empty());
        assert_eq!(out.processed.width(), 0);
    }

    #[test]
    fn original_is_untouched() {
        let input = page(32, 32);
        let out = preprocess(input.clone(), &PreprocessConfig::default());
        assert_eq!(out.original, input);
    }
}
