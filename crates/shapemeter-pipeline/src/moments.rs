//! Raw image moments of a binary mask.
//!
//! Every nonzero mask pixel counts with weight one, so the zeroth moment is
//! the object's pixel area and the first moments give its centroid.

use image::GrayImage;
use serde::{Deserialize, Serialize};

/// Zeroth and first raw moments of a binary mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryMoments {
    /// Number of nonzero pixels (m00).
    pub m00: u64,
    /// Sum of x coordinates of nonzero pixels (m10).
    pub m10: u64,
    /// Sum of y coordinates of nonzero pixels (m01).
    pub m01: u64,
}

/// Center of mass in sub-pixel image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Centroid {
    /// The centroid truncated to the pixel that contains it.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn pixel(self) -> crate::Point {
        crate::Point::new(self.x as i32, self.y as i32)
    }
}

impl PrimaryMoments {
    /// Compute the moments of `mask`, treating every nonzero pixel as 1.
    #[must_use]
    pub fn of(mask: &GrayImage) -> Self {
        let mut moments = Self {
            m00: 0,
            m10: 0,
            m01: 0,
        };
        for (x, y, pixel) in mask.enumerate_pixels() {
            if pixel.0[0] != 0 {
                moments.m00 += 1;
                moments.m10 += u64::from(x);
                moments.m01 += u64::from(y);
            }
        }
        moments
    }

    /// Object area in pixels.
    #[must_use]
    pub const fn area(&self) -> u64 {
        self.m00
    }

    /// Center of mass, or `None` when the mask is empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn centroid(&self) -> Option<Centroid> {
        if self.m00 == 0 {
            return None;
        }
        let area = self.m00 as f64;
        Some(Centroid {
            x: self.m10 as f64 / area,
            y: self.m01 as f64 / area,
        })
    }
}
