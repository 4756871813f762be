use std::fmt;

use serde::{Deserialize, Serialize};

/// Aspect ratios accepted by the image model's `imageConfig.aspectRatio`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "9:16")]
    Portrait9x16,
    #[serde(rename = "3:4")]
    Portrait3x4,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "4:3")]
    Landscape4x3,
    #[serde(rename = "16:9")]
    Landscape16x9,
}

/// Candidate order is load-bearing: ties resolve to the earlier entry.
pub const ASPECT_RATIO_CANDIDATES: [AspectRatio; 5] = [
    AspectRatio::Portrait9x16,
    AspectRatio::Portrait3x4,
    AspectRatio::Square,
    AspectRatio::Landscape4x3,
    AspectRatio::Landscape16x9,
];

pub const DEFAULT_ASPECT_RATIO: AspectRatio = AspectRatio::Portrait3x4;

impl AspectRatio {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Portrait9x16 => "9:16",
            Self::Portrait3x4 => "3:4",
            Self::Square => "1:1",
            Self::Landscape4x3 => "4:3",
            Self::Landscape16x9 => "16:9",
        }
    }

    pub fn quotient(self) -> f64 {
        match self {
            Self::Portrait9x16 => 9.0 / 16.0,
            Self::Portrait3x4 => 3.0 / 4.0,
            Self::Square => 1.0,
            Self::Landscape4x3 => 4.0 / 3.0,
            Self::Landscape16x9 => 16.0 / 9.0,
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output resolution tier sent as `imageConfig.imageSize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageSize {
    #[serde(rename = "1K")]
    OneK,
    #[serde(rename = "2K")]
    TwoK,
    #[serde(rename = "4K")]
    FourK,
}

pub const DEFAULT_IMAGE_SIZE: ImageSize = ImageSize::OneK;

impl ImageSize {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneK => "1K",
            Self::TwoK => "2K",
            Self::FourK => "4K",
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Picks the supported ratio closest to `width / height`.
///
/// Missing dimensions (or a zero height) fall back to `3:4`. Candidates are
/// scanned in [`ASPECT_RATIO_CANDIDATES`] order and a later candidate only
/// wins on a strictly smaller distance.
pub fn select_aspect_ratio(width: Option<u32>, height: Option<u32>) -> AspectRatio {
    let (Some(width), Some(height)) = (width, height) else {
        return DEFAULT_ASPECT_RATIO;
    };
    if height == 0 {
        return DEFAULT_ASPECT_RATIO;
    }

    let target = f64::from(width) / f64::from(height);
    let mut best = ASPECT_RATIO_CANDIDATES[0];
    let mut best_delta = (best.quotient() - target).abs();
    for candidate in ASPECT_RATIO_CANDIDATES.into_iter().skip(1) {
        let delta = (candidate.quotient() - target).abs();
        if delta < best_delta {
            best = candidate;
            best_delta = delta;
        }
    }
    best
}
