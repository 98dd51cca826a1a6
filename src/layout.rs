//! Page layout calculations
//!
//! All values are PDF points (1/72 inch). The coordinate system has its
//! origin at the bottom-left of the page with y increasing upward.

use crate::error::{Error, Result};

/// Width and height of a page or canvas in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// US Letter size (8.5" × 11")
    pub fn letter() -> Self {
        Self::new(612.0, 792.0)
    }

    /// A4 size (210mm × 297mm)
    pub fn a4() -> Self {
        Self::new(mm_to_pt(210.0), mm_to_pt(297.0))
    }

    fn validate(self) -> Result<Self> {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        if ok(self.width) && ok(self.height) {
            Ok(self)
        } else {
            Err(Error::InvalidGeometry {
                width: self.width,
                height: self.height,
            })
        }
    }
}

/// Convert millimeters to points
pub fn mm_to_pt(mm: f64) -> f64 {
    mm * 72.0 / 25.4
}

/// A page's media box: lower-left corner plus size
///
/// The lower-left corner is usually `(0, 0)` but PDFs are free to place
/// it anywhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PageBox {
    /// Build a box from `[llx lly urx ury]` corner coordinates
    pub fn from_corners(llx: f64, lly: f64, urx: f64, ury: f64) -> Self {
        Self {
            x: llx.min(urx),
            y: lly.min(ury),
            width: (urx - llx).abs(),
            height: (ury - lly).abs(),
        }
    }

    /// A box of the given size anchored at the origin
    pub fn from_size(size: PageSize) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: size.width,
            height: size.height,
        }
    }

    pub fn size(&self) -> PageSize {
        PageSize::new(self.width, self.height)
    }
}

/// How a margin value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarginMode {
    /// The value is a point count
    #[default]
    Absolute,
    /// The value is a fraction of the original page dimension on that axis
    Relative,
}

/// One side's margin before it is resolved against a page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margin {
    pub value: f64,
    pub mode: MarginMode,
}

impl Margin {
    pub fn points(value: f64) -> Self {
        Self {
            value,
            mode: MarginMode::Absolute,
        }
    }

    pub fn relative(fraction: f64) -> Self {
        Self {
            value: fraction,
            mode: MarginMode::Relative,
        }
    }

    pub fn zero() -> Self {
        Self::points(0.0)
    }

    /// Resolve against the original page dimension on this margin's axis
    pub fn resolve(&self, reference: f64) -> Result<f64> {
        resolve_margin(self.value, reference, self.mode)
    }
}

/// Resolve a margin value to points
///
/// Relative values are `ceil(value × reference)`; absolute values are used
/// as-is. `reference` is always the original page dimension, never the
/// enlarged canvas.
pub fn resolve_margin(value: f64, reference: f64, mode: MarginMode) -> Result<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::InvalidMargin(format!(
            "margin must be a non-negative number, got {}",
            value
        )));
    }

    match mode {
        MarginMode::Absolute => Ok(value),
        MarginMode::Relative => Ok(ceil_points(value * reference)),
    }
}

/// Round up to whole points, treating products within float noise of an
/// integer as that integer (`0.07 × 600` is 42, not 43)
fn ceil_points(product: f64) -> f64 {
    let nearest = product.round();
    if (product - nearest).abs() < 1e-9 {
        nearest
    } else {
        product.ceil()
    }
}

/// Margins for all four sides, unresolved
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarginSpec {
    pub left: Margin,
    pub right: Margin,
    pub top: Margin,
    pub bottom: Margin,
}

impl MarginSpec {
    /// Absolute point margins for each side
    pub fn absolute(left: f64, right: f64, top: f64, bottom: f64) -> Self {
        Self {
            left: Margin::points(left),
            right: Margin::points(right),
            top: Margin::points(top),
            bottom: Margin::points(bottom),
        }
    }

    /// Same margin on all sides
    pub fn uniform(margin: Margin) -> Self {
        Self {
            left: margin,
            right: margin,
            top: margin,
            bottom: margin,
        }
    }

    /// No margins at all
    pub fn zero() -> Self {
        Self::uniform(Margin::zero())
    }

    /// True if any side is given as a fraction of the page
    pub fn has_relative(&self) -> bool {
        [self.left, self.right, self.top, self.bottom]
            .iter()
            .any(|m| m.mode == MarginMode::Relative)
    }

    /// Resolve every side against the original page
    ///
    /// Left and right use the page width, top and bottom the page height.
    pub fn resolve(&self, page: &PageBox) -> Result<ResolvedMargins> {
        Ok(ResolvedMargins {
            left: self.left.resolve(page.width)?,
            right: self.right.resolve(page.width)?,
            top: self.top.resolve(page.height)?,
            bottom: self.bottom.resolve(page.height)?,
        })
    }
}

impl Default for MarginSpec {
    fn default() -> Self {
        Self::absolute(150.0, 150.0, 0.0, 0.0)
    }
}

/// Margins in points, ready to apply to a page
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResolvedMargins {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

/// Where an original page lands on its new canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Size of the new page
    pub canvas: PageSize,
    /// Translation applied to the original content
    ///
    /// Maps the original box's lower-left corner onto `(left, bottom)`.
    pub offset: (f64, f64),
}

/// Compute the enlarged canvas for a page and the offset of its content
pub fn transform_page(page: &PageBox, margins: &ResolvedMargins) -> Result<Placement> {
    page.size().validate()?;

    for (side, value) in [
        ("left", margins.left),
        ("right", margins.right),
        ("top", margins.top),
        ("bottom", margins.bottom),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(Error::InvalidMargin(format!(
                "{} margin must be a non-negative number, got {}",
                side, value
            )));
        }
    }

    let canvas = PageSize::new(
        page.width + margins.left + margins.right,
        page.height + margins.top + margins.bottom,
    )
    .validate()?;

    Ok(Placement {
        canvas,
        offset: (margins.left - page.x, margins.bottom - page.y),
    })
}

/// One page of the output sequence
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputPage {
    /// Original page `source_index` composited onto a larger canvas
    Composited {
        source_index: usize,
        placement: Placement,
    },
    /// Empty page matching the page before it
    Blank { size: PageSize },
}

impl OutputPage {
    pub fn size(&self) -> PageSize {
        match self {
            OutputPage::Composited { placement, .. } => placement.canvas,
            OutputPage::Blank { size } => *size,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, OutputPage::Blank { .. })
    }
}

/// Lazy output sequence produced by [`process_document`]
///
/// Stops for good after the first error.
pub struct OutputPages<I> {
    pages: std::iter::Enumerate<I>,
    margins: MarginSpec,
    insert_blank: bool,
    pending_blank: Option<PageSize>,
    done: bool,
}

impl<I> Iterator for OutputPages<I>
where
    I: Iterator<Item = PageBox>,
{
    type Item = Result<OutputPage>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if let Some(size) = self.pending_blank.take() {
            return Some(Ok(OutputPage::Blank { size }));
        }

        let (source_index, page) = match self.pages.next() {
            Some(item) => item,
            None => {
                self.done = true;
                return None;
            }
        };

        let placement = self
            .margins
            .resolve(&page)
            .and_then(|resolved| transform_page(&page, &resolved));

        match placement {
            Ok(placement) => {
                if self.insert_blank {
                    self.pending_blank = Some(placement.canvas);
                }
                Some(Ok(OutputPage::Composited {
                    source_index,
                    placement,
                }))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<I> std::iter::FusedIterator for OutputPages<I> where I: Iterator<Item = PageBox> {}

/// Turn the pages of a document into its output page sequence
///
/// Every input page yields its composited page, followed by a blank page of
/// the same size when `insert_blank` is set. Order follows the input.
pub fn process_document<P>(
    pages: P,
    margins: &MarginSpec,
    insert_blank: bool,
) -> OutputPages<P::IntoIter>
where
    P: IntoIterator<Item = PageBox>,
{
    OutputPages {
        pages: pages.into_iter().enumerate(),
        margins: *margins,
        insert_blank,
        pending_blank: None,
        done: false,
    }
}
