// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page geometry — where an image lands on a fixed-size page.

use blattwerk_core::error::{BlattwerkError, Result};

/// Intrinsic size of an image or a page, in any consistent unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
}

impl PageGeometry {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    fn validate(&self, what: &str) -> Result<()> {
        if !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
        {
            return Err(BlattwerkError::InputValidation(format!(
                "{} size must be positive, got {}x{}",
                what, self.width, self.height
            )));
        }
        Ok(())
    }

    fn aspect_ratio(&self) -> f32 {
        self.width / self.height
    }
}

/// Target rectangle for drawing an image onto a page.
///
/// `x`/`y` are measured from the page's lower-left corner (PDF user space),
/// though the centred result is the same from either corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Scale `image` uniformly to the largest size that fits inside `page`, then
/// centre it.
///
/// An image relatively wider than the page spans the full page width;
/// otherwise it spans the full height. Equal ratios take the full-height
/// branch, which yields the same rectangle.
pub fn fit_to_page(page: PageGeometry, image: PageGeometry) -> Result<PlacementRect> {
    page.validate("page")?;
    image.validate("image")?;

    let image_ratio = image.aspect_ratio();
    let page_ratio = page.aspect_ratio();

    let (width, height) = if image_ratio > page_ratio {
        (page.width, page.width / image_ratio)
    } else {
        (page.height * image_ratio, page.height)
    };

    Ok(PlacementRect {
        x: (page.width - width) / 2.0,
        y: (page.height - height) / 2.0,
        width,
        height,
    })
}
