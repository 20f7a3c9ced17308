//! Deterministic image-preprocessing variants.
//!
//! No single filter is reliable across print qualities, so the resolver
//! runs the OCR collaborator under each variant and pools the detections.
//! These are fixed transforms, not tunable denoising.

use image::imageops::{self, FilterType};
use image::GrayImage;
use imageproc::contrast::{adaptive_threshold, equalize_histogram};
use imageproc::filter::{gaussian_blur_f32, sharpen3x3};
use imageproc::distance_transform::Norm;
use imageproc::morphology::close;

/// Longest crop side handed to the OCR collaborator.
const MAX_DIM: u32 = 2200;

/// The preprocessing variants, applied in order. Each contributes its own
/// detections to the candidate pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreprocessVariant {
    /// Mild blur + morphological close + histogram equalization; recovers
    /// thin printed letters.
    LetterRecovery,
    /// Equalize + sharpen; the middle-of-the-road pass.
    Medium,
    /// Invert + equalize + adaptive threshold; recovers light text on dark
    /// stamp fields.
    LightText,
}

impl PreprocessVariant {
    /// All variants, in application order.
    pub const ALL: [Self; 3] = [Self::LetterRecovery, Self::Medium, Self::LightText];

    /// Short tag used in log lines.
    #[inline]
    #[must_use = "returns the variant tag"]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::LetterRecovery => "LETTER",
            Self::Medium => "MEDIUM",
            Self::LightText => "LIGHT",
        }
    }

    /// Apply the variant to a region crop.
    #[must_use = "returns the preprocessed image"]
    pub fn apply(self, gray: &GrayImage) -> GrayImage {
        match self {
            Self::LetterRecovery => {
                let blurred = gaussian_blur_f32(gray, 0.8);
                let closed = close(&blurred, Norm::LInf, 1);
                equalize_histogram(&closed)
            }
            Self::Medium => {
                let equalized = equalize_histogram(gray);
                sharpen3x3(&equalized)
            }
            Self::LightText => {
                let mut inverted = gray.clone();
                imageops::invert(&mut inverted);
                let equalized = equalize_histogram(&inverted);
                adaptive_threshold(&equalized, 15)
            }
        }
    }
}

/// Downscale a crop so its longest side fits [`MAX_DIM`]. Smaller crops
/// pass through untouched.
#[must_use = "returns the resized image"]
pub fn safe_resize(gray: &GrayImage) -> GrayImage {
    let (w, h) = gray.dimensions();
    let longest = w.max(h);
    if longest <= MAX_DIM || longest == 0 {
        return gray.clone();
    }
    let scale = f64::from(MAX_DIM) / f64::from(longest);
    let new_w = ((f64::from(w) * scale) as u32).max(1);
    let new_h = ((f64::from(h) * scale) as u32).max(1);
    imageops::resize(gray, new_w, new_h, FilterType::CatmullRom)
}
