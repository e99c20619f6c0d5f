//! Paged document output.
//!
//! The primary strategy gives every image its own page, sized from the image's
//! pixel dimensions at the requested DPI. A lower DPI therefore produces a
//! physically larger page for the same image. If the primary pass hits a
//! structural problem the whole set is rendered again, from scratch, onto
//! fixed US-Letter pages.

use std::path::{Path, PathBuf};

use printpdf::{Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, Pt, RawImage, XObjectTransform};
use tracing::{error, info, warn};

use crate::contract::DownloadedImage;
use crate::download::persist_atomically;
use crate::error::{AssemblyError, DecodeError};
use crate::images::{assembly_order, probe_dimensions};

pub const POINTS_PER_INCH: f64 = 72.0;
/// Smallest and largest page edge a PDF viewer is required to support.
pub const MIN_PAGE_POINTS: f64 = 3.0;
pub const MAX_PAGE_POINTS: f64 = 14_400.0;

/// Written to the document info dictionary of every PDF.
pub const AUTHOR: &str = "Comic Compiler";

const FIT_FACTOR: f64 = 0.95;
const MIN_SCALE: f64 = 0.1;

/// Size of one variable-geometry page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width_points: f64,
    pub height_points: f64,
}

impl PageGeometry {
    pub fn from_pixels(width_px: u32, height_px: u32, dpi: u32) -> Self {
        let dpi = f64::from(dpi);
        Self {
            width_points: f64::from(width_px) * POINTS_PER_INCH / dpi,
            height_points: f64::from(height_px) * POINTS_PER_INCH / dpi,
        }
    }

    pub fn is_printable(&self) -> bool {
        let ok = |edge: f64| edge.is_finite() && (MIN_PAGE_POINTS..=MAX_PAGE_POINTS).contains(&edge);
        ok(self.width_points) && ok(self.height_points)
    }
}

/// A fixed page with equal margins on every side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedPage {
    pub width_points: f64,
    pub height_points: f64,
    pub margin_points: f64,
}

pub const LETTER: FixedPage = FixedPage {
    width_points: 612.0,
    height_points: 792.0,
    margin_points: 36.0,
};

/// Where and how large an image is drawn on a fixed page, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl FixedPage {
    /// Fit an image into 95% of the content box, never upscaling, centred
    /// horizontally and anchored to the top margin.
    pub fn place(&self, width_px: u32, height_px: u32) -> Placement {
        let (w, h) = (f64::from(width_px), f64::from(height_px));
        let max_width = (self.width_points - 2.0 * self.margin_points) * FIT_FACTOR;
        let max_height = (self.height_points - 2.0 * self.margin_points) * FIT_FACTOR;

        let scale = (max_width / w).min(max_height / h).min(1.0).max(MIN_SCALE);
        let (mut width, mut height) = (w * scale, h * scale);

        // The minimum scale can push an extreme aspect ratio past the box.
        if width > max_width {
            width = max_width;
            height = width / w * h;
        }
        if height > max_height {
            height = max_height;
            width = height / h * w;
        }

        let available_width = self.width_points - 2.0 * self.margin_points;
        Placement {
            x: self.margin_points + (available_width - width) / 2.0,
            y: self.height_points - self.margin_points - height,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfStrategy {
    VariableGeometry,
    FixedGeometry,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PdfReport {
    pub path: PathBuf,
    pub strategy: PdfStrategy,
    pub pages: usize,
    pub skipped: usize,
}

struct RenderedPdf {
    bytes: Vec<u8>,
    strategy: PdfStrategy,
    pages: usize,
    skipped: usize,
}

/// Build the PDF for one issue at `output_path`.
pub fn assemble(
    images: &[DownloadedImage],
    output_path: &Path,
    title: &str,
    dpi: u32,
) -> Result<PdfReport, AssemblyError> {
    let ordered = assembly_order(images);
    if ordered.is_empty() {
        error!(path = %output_path.display(), "No images found for PDF creation");
        return Err(AssemblyError::NoImages);
    }
    let paths: Vec<&Path> = ordered.iter().map(|i| i.local_path.as_path()).collect();

    info!(dpi, images = paths.len(), "Creating PDF with per-image page sizes");
    let rendered = match render_variable(&paths, title, dpi) {
        Ok(rendered) => rendered,
        Err(e) => {
            error!(error = %e, "Error building variable-size PDF");
            warn!("Falling back to fixed page size PDF");
            render_fixed(&paths, title, &LETTER)?
        }
    };

    persist_atomically(output_path, &rendered.bytes).map_err(|source| {
        error!(path = %output_path.display(), error = ?source, "Failed to write PDF");
        AssemblyError::Write {
            path: output_path.to_path_buf(),
            source,
        }
    })?;
    info!(
        path = %output_path.display(),
        strategy = ?rendered.strategy,
        pages = rendered.pages,
        skipped = rendered.skipped,
        "PDF created"
    );
    Ok(PdfReport {
        path: output_path.to_path_buf(),
        strategy: rendered.strategy,
        pages: rendered.pages,
        skipped: rendered.skipped,
    })
}

struct PageImage {
    width_px: u32,
    height_px: u32,
    bytes: Vec<u8>,
}

fn read_page_image(path: &Path) -> Result<PageImage, DecodeError> {
    let bytes = std::fs::read(path).map_err(|source| DecodeError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let (width_px, height_px) = probe_dimensions(&bytes)?;
    Ok(PageImage {
        width_px,
        height_px,
        bytes,
    })
}

fn decode_for_pdf(image: &PageImage) -> Result<RawImage, DecodeError> {
    let mut warnings = Vec::new();
    RawImage::decode_from_bytes(&image.bytes, &mut warnings).map_err(DecodeError::Image)
}

fn new_document(title: &str) -> PdfDocument {
    let mut doc = PdfDocument::new(title);
    doc.metadata.info.author = AUTHOR.to_string();
    doc
}

fn page_size(width_points: f64, height_points: f64) -> (Mm, Mm) {
    (
        Mm::from(Pt(width_points as f32)),
        Mm::from(Pt(height_points as f32)),
    )
}

fn render_variable(paths: &[&Path], title: &str, dpi: u32) -> Result<RenderedPdf, AssemblyError> {
    let mut doc = new_document(title);
    let mut pages = Vec::with_capacity(paths.len());
    let mut skipped = 0;

    for (i, path) in paths.iter().enumerate() {
        let image = match read_page_image(path) {
            Ok(image) => image,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Error processing image, skipping");
                skipped += 1;
                continue;
            }
        };
        let geometry = PageGeometry::from_pixels(image.width_px, image.height_px, dpi);
        if !geometry.is_printable() {
            return Err(AssemblyError::PageSize {
                path: path.to_path_buf(),
                width_points: geometry.width_points,
                height_points: geometry.height_points,
            });
        }
        let raw = match decode_for_pdf(&image) {
            Ok(raw) => raw,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Error processing image, skipping");
                skipped += 1;
                continue;
            }
        };
        let id = doc.add_image(&raw);
        // At the page's own DPI the image's natural size is exactly the page.
        let ops = vec![Op::UseXobject {
            id,
            transform: XObjectTransform {
                translate_x: Some(Pt(0.0)),
                translate_y: Some(Pt(0.0)),
                dpi: Some(dpi as f32),
                ..Default::default()
            },
        }];
        let (width, height) = page_size(geometry.width_points, geometry.height_points);
        pages.push(PdfPage::new(width, height, ops));
        info!(
            page = i + 1,
            total = paths.len(),
            width_pt = geometry.width_points,
            height_pt = geometry.height_points,
            "Added PDF page"
        );
    }

    if pages.is_empty() {
        return Err(AssemblyError::NoRenderablePages {
            attempted: paths.len(),
        });
    }
    let count = pages.len();
    let mut warnings = Vec::new();
    let bytes = doc
        .with_pages(pages)
        .save(&PdfSaveOptions::default(), &mut warnings);
    Ok(RenderedPdf {
        bytes,
        strategy: PdfStrategy::VariableGeometry,
        pages: count,
        skipped,
    })
}

fn render_fixed(paths: &[&Path], title: &str, page: &FixedPage) -> Result<RenderedPdf, AssemblyError> {
    info!("Creating standard PDF");
    let mut doc = new_document(title);
    let mut pages = Vec::with_capacity(paths.len());
    let mut skipped = 0;

    for path in paths {
        let decoded = read_page_image(path).and_then(|image| {
            let raw = decode_for_pdf(&image)?;
            Ok((image, raw))
        });
        let (image, raw) = match decoded {
            Ok(pair) => pair,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Error processing image, skipping");
                skipped += 1;
                continue;
            }
        };
        let placement = page.place(image.width_px, image.height_px);
        let id = doc.add_image(&raw);
        // At 72 DPI one pixel is one point, so the scale maps pixels to the placement box.
        let ops = vec![Op::UseXobject {
            id,
            transform: XObjectTransform {
                translate_x: Some(Pt(placement.x as f32)),
                translate_y: Some(Pt(placement.y as f32)),
                scale_x: Some((placement.width / f64::from(image.width_px)) as f32),
                scale_y: Some((placement.height / f64::from(image.height_px)) as f32),
                dpi: Some(POINTS_PER_INCH as f32),
                ..Default::default()
            },
        }];
        let (width, height) = page_size(page.width_points, page.height_points);
        pages.push(PdfPage::new(width, height, ops));
    }

    if pages.is_empty() {
        error!("Error building standard PDF: no renderable images");
        return Err(AssemblyError::NoRenderablePages {
            attempted: paths.len(),
        });
    }
    let count = pages.len();
    let mut warnings = Vec::new();
    let bytes = doc
        .with_pages(pages)
        .save(&PdfSaveOptions::default(), &mut warnings);
    Ok(RenderedPdf {
        bytes,
        strategy: PdfStrategy::FixedGeometry,
        pages: count,
        skipped,
    })
}
