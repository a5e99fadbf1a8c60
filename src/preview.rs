//! Citation preview: render the cited page and place the highlight on it.

use tracing::{debug, warn};

use crate::errors::AppError;
use crate::geometry::{OverlayRect, PageViewport};
use crate::models::Citation;

pub const DEFAULT_RENDER_SCALE: f64 = 1.5;

/// A page drawn by a [`PageRasterizer`].
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    /// Geometry exactly as the rasterizer reports it.
    pub viewport: PageViewport,
    pub width_px: f64,
    pub height_px: f64,
}

/// The PDF rendering capability. Implementations decode page `page` (1-based)
/// of `pdf_url` at `scale`, draw it wherever they display rasters, and report
/// the page geometry.
#[allow(async_fn_in_trait)]
pub trait PageRasterizer {
    async fn render_page(&self, pdf_url: &str, page: u32, scale: f64)
        -> Result<RenderedPage, String>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CitationPreview {
    pub citation: Citation,
    pub page: RenderedPage,
    /// `None` keeps the overlay hidden; the page is still shown.
    pub overlay: Option<OverlayRect>,
}

/// UI state of one preview pane.
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewState {
    Loading,
    Ready(CitationPreview),
    Failed(String),
}

impl From<Result<CitationPreview, AppError>> for PreviewState {
    fn from(result: Result<CitationPreview, AppError>) -> Self {
        match result {
            Ok(preview) => PreviewState::Ready(preview),
            Err(e) => PreviewState::Failed(e.to_string()),
        }
    }
}

/// Render the cited page and compute its overlay. The overlay is computed
/// fresh from this render's viewport every time.
pub async fn open_preview<R: PageRasterizer>(
    rasterizer: &R,
    citation: &Citation,
    scale: f64,
) -> Result<CitationPreview, AppError> {
    let rasterization = |message: String| AppError::Rasterization {
        pdf_url: citation.pdf_url.clone(),
        page: citation.page,
        message,
    };

    if !(scale.is_finite() && scale > 0.0) {
        return Err(rasterization(format!("invalid render scale {scale}")));
    }
    if citation.page == 0 {
        return Err(rasterization("pages are numbered from 1".to_string()));
    }

    let page = rasterizer
        .render_page(&citation.pdf_url, citation.page, scale)
        .await
        .map_err(|e| {
            warn!("rasterization of {} page {} failed: {e}", citation.pdf_url, citation.page);
            rasterization(e)
        })?;

    let overlay = page.viewport.overlay_for(citation.highlight());
    if overlay.is_none() && citation.bbox.is_some() {
        debug!(bbox = ?citation.bbox, "citation box not drawable, overlay hidden");
    }

    Ok(CitationPreview { citation: citation.clone(), page, overlay })
}
