//! Detection and candidate types for revision arbitration.

use chrono::NaiveDate;
use image::GrayImage;
use serde::{Deserialize, Serialize};

/// One raw OCR detection from the collaborator: text, confidence and the
/// four corner points of its bounding box in crop coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextDetection {
    /// Raw recognized text.
    pub text: String,
    /// Recognition confidence (0.0 to 1.0).
    pub confidence: f32,
    /// Four bounding-box corner points `(x, y)`.
    pub bbox: [(f32, f32); 4],
    /// Optional region label from the detection model.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub label: Option<String>,
}

impl TextDetection {
    /// Rendered width of the bounding box.
    #[must_use = "returns the bounding-box width"]
    pub fn bbox_width(&self) -> f32 {
        let xs = self.bbox.map(|p| p.0);
        let max = xs.iter().copied().fold(f32::MIN, f32::max);
        let min = xs.iter().copied().fold(f32::MAX, f32::min);
        max - min
    }

    /// Vertical center of the bounding box.
    #[must_use = "returns the bounding-box vertical center"]
    pub fn y_center(&self) -> f32 {
        self.bbox.iter().map(|p| p.1).sum::<f32>() / 4.0
    }
}

/// A provisional revision value with its arbitration metadata. Produced
/// transiently per region, discarded after selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Confidence of the detection that produced this candidate.
    pub confidence: f32,
    /// Vertical position in the crop; topmost row wins arbitration.
    pub y_center: f32,
    /// The extracted revision value, e.g. `A` or `A.1`.
    pub value: String,
    /// Date parsed from the same detection, if any.
    pub date: Option<NaiveDate>,
    /// Whether the word `REV` appeared in the raw text: rows carrying the
    /// label are trusted more.
    pub from_labeled_row: bool,
}

/// The arbitration result for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRevision {
    /// The authoritative revision code.
    pub code: String,
    /// The date from the selected row, if one was parsed.
    pub date: Option<NaiveDate>,
}

/// The OCR engine collaborator boundary.
///
/// The engine is a black box: it receives an image crop and returns raw
/// detections. Its internals (model, runtime) are out of scope.
pub trait OcrEngine {
    /// Recognize text in a (preprocessed) region crop.
    ///
    /// # Errors
    ///
    /// Engine failures propagate to the caller, which logs them and treats
    /// the pass as having produced no detections.
    fn read_text(&self, image: &GrayImage) -> anyhow::Result<Vec<TextDetection>>;
}

/// A proportionally-defined rectangle on a rasterized page where a metadata
/// block is expected to appear.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionSpec {
    /// Left edge as a fraction of page width.
    pub left: f32,
    /// Top edge as a fraction of page height.
    pub top: f32,
    /// Right edge as a fraction of page width.
    pub right: f32,
    /// Bottom edge as a fraction of page height.
    pub bottom: f32,
}

impl RegionSpec {
    /// The fixed region where the revision table usually sits.
    pub const PRIMARY: Self = Self {
        left: 0.72,
        top: 0.79,
        right: 0.86,
        bottom: 0.88,
    };

    /// Fallback region, lower on the page next to the logo block, used when
    /// the primary region yields nothing.
    pub const FALLBACK: Self = Self {
        left: 0.72,
        top: 0.825,
        right: 0.86,
        bottom: 0.885,
    };

    /// Crop this region out of a full page. Returns `None` when the region
    /// degenerates to zero height or width.
    #[must_use = "returns the cropped region"]
    pub fn crop(&self, page: &GrayImage) -> Option<GrayImage> {
        let (w, h) = page.dimensions();
        let x1 = ((w as f32 * self.left) as u32).min(w);
        let x2 = ((w as f32 * self.right) as u32).min(w);
        let y1 = ((h as f32 * self.top) as u32).min(h);
        let y2 = ((h as f32 * self.bottom) as u32).min(h);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(image::imageops::crop_imm(page, x1, y1, x2 - x1, y2 - y1).to_image())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(text: &str, width: f32, y: f32) -> TextDetection {
        TextDetection {
            text: text.to_string(),
            confidence: 0.9,
            bbox: [(0.0, y - 5.0), (width, y - 5.0), (width, y + 5.0), (0.0, y + 5.0)],
            label: None,
        }
    }

    #[test]
    fn test_bbox_geometry() {
        let det = detection("A", 100.0, 50.0);
        assert!((det.bbox_width() - 100.0).abs() < f32::EPSILON);
        assert!((det.y_center() - 50.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_region_crop() {
        let page = GrayImage::from_pixel(1000, 1000, image::Luma([255]));
        let crop = RegionSpec::PRIMARY.crop(&page).unwrap();
        assert_eq!(crop.dimensions(), (140, 90));
    }

    #[test]
    fn test_degenerate_region() {
        let page = GrayImage::from_pixel(4, 4, image::Luma([255]));
        // Fractions collapse to the same pixel on a tiny page.
        assert!(RegionSpec::PRIMARY.crop(&page).is_none());
    }
}
