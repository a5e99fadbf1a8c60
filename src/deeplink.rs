//! Citation deep links passed between the chat view and the standalone viewer.
//!
//! Query layout: `pdf_url=<percent-encoded>&page=N[&x0=..&y0=..&x1=..&y1=..]`.
//! Coordinates are written with the shortest representation that parses back
//! to the same `f64`, so a link round-trips losslessly.

use std::borrow::Cow;

use crate::errors::AppError;
use crate::models::{BBox, Citation};

pub const VIEWER_PATH: &str = "/viewer";

#[derive(Debug, Clone, PartialEq)]
pub struct CitationLink {
    pub pdf_url: String,
    /// 1-based.
    pub page: u32,
    pub bbox: Option<BBox>,
}

impl CitationLink {
    pub fn from_citation(citation: &Citation) -> Self {
        Self { pdf_url: citation.pdf_url.clone(), page: citation.page, bbox: citation.bbox }
    }

    pub fn to_query(&self) -> String {
        let mut query = format!("pdf_url={}&page={}", urlencoding::encode(&self.pdf_url), self.page);
        if let Some(b) = &self.bbox {
            query.push_str(&format!("&x0={}&y0={}&x1={}&y1={}", b.x0, b.y0, b.x1, b.y1));
        }
        query
    }

    pub fn viewer_url(&self) -> String {
        format!("{VIEWER_PATH}?{}", self.to_query())
    }

    /// Parse a query string, with or without its leading `?`.
    ///
    /// `pdf_url` is required. A missing or unparsable `page` falls back to the
    /// first page; a bbox is only kept when all four bounds parse.
    pub fn parse_query(query: &str) -> Result<Self, AppError> {
        let query = query.strip_prefix('?').unwrap_or(query);

        let mut pdf_url = None;
        let mut page = None;
        let mut bounds: [Option<f64>; 4] = [None; 4];

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = decode_component(value)?;
            match key {
                "pdf_url" => pdf_url = Some(value.into_owned()),
                "page" => page = value.parse::<u32>().ok().filter(|p| *p >= 1),
                "x0" => bounds[0] = value.parse().ok(),
                "y0" => bounds[1] = value.parse().ok(),
                "x1" => bounds[2] = value.parse().ok(),
                "y1" => bounds[3] = value.parse().ok(),
                _ => {}
            }
        }

        let pdf_url = pdf_url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| AppError::InvalidDeepLink { reason: "missing pdf_url".to_string() })?;
        let bbox = match bounds {
            [Some(x0), Some(y0), Some(x1), Some(y1)] => Some(BBox::new(x0, y0, x1, y1)),
            _ => None,
        };

        Ok(Self { pdf_url, page: page.unwrap_or(1), bbox })
    }

    /// Citation shown by the standalone viewer, which only knows the link.
    pub fn into_citation(self) -> Citation {
        Citation {
            doc_id: "deeplink".to_string(),
            doc_title: "Document".to_string(),
            pdf_url: self.pdf_url,
            page: self.page,
            bbox: self.bbox,
            snippet: String::new(),
            score: None,
        }
    }
}

fn decode_component(value: &str) -> Result<Cow<'_, str>, AppError> {
    let value: Cow<'_, str> = if value.contains('+') {
        Cow::Owned(value.replace('+', " "))
    } else {
        Cow::Borrowed(value)
    };
    match urlencoding::decode(&value) {
        Ok(decoded) => Ok(Cow::Owned(decoded.into_owned())),
        Err(e) => Err(AppError::InvalidDeepLink { reason: e.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn citation(pdf_url: &str, bbox: Option<BBox>) -> Citation {
        Citation {
            doc_id: "d1".into(),
            doc_title: "Service manual".into(),
            pdf_url: pdf_url.into(),
            page: 12,
            bbox,
            snippet: String::new(),
            score: Some(0.5),
        }
    }

    #[test]
    fn round_trips_awkward_urls_and_fractional_bounds() {
        let bbox = BBox::new(72.125, 700.1, 300.0, 1.0 / 3.0);
        let link = CitationLink::from_citation(&citation(
            "/uploads/Q3 report & notes+v2 (é).pdf?x=1#frag",
            Some(bbox),
        ));
        let url = link.viewer_url();
        assert!(url.starts_with("/viewer?pdf_url=%2Fuploads%2FQ3%20report%20%26"));

        let query = url.split_once('?').unwrap().1;
        assert_eq!(CitationLink::parse_query(query).unwrap(), link);
    }

    #[test]
    fn link_without_bbox_has_no_bound_params() {
        let link = CitationLink::from_citation(&citation("/uploads/a.pdf", None));
        assert_eq!(link.to_query(), "pdf_url=%2Fuploads%2Fa.pdf&page=12");
        assert_eq!(CitationLink::parse_query(&link.to_query()).unwrap(), link);
    }

    #[test]
    fn partial_bbox_is_ignored_and_page_defaults() {
        let link = CitationLink::parse_query("?pdf_url=%2Fa.pdf&x0=1&y0=2&x1=3").unwrap();
        assert_eq!(link.page, 1);
        assert_eq!(link.bbox, None);

        let link = CitationLink::parse_query("pdf_url=%2Fa.pdf&page=zero").unwrap();
        assert_eq!(link.page, 1);
    }

    #[test]
    fn zero_bounds_are_kept() {
        let link = CitationLink::parse_query("pdf_url=a.pdf&page=2&x0=0&y0=0&x1=10&y1=10").unwrap();
        assert_eq!(link.bbox, Some(BBox::new(0.0, 0.0, 10.0, 10.0)));
    }

    #[test]
    fn plus_decodes_as_space() {
        let link = CitationLink::parse_query("pdf_url=%2Fuploads%2Fmy+file.pdf").unwrap();
        assert_eq!(link.pdf_url, "/uploads/my file.pdf");
    }

    #[test]
    fn missing_pdf_url_is_rejected() {
        let err = CitationLink::parse_query("page=3").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn viewer_citation_carries_the_link() {
        let c = CitationLink::parse_query("pdf_url=a.pdf&page=4").unwrap().into_citation();
        assert_eq!(c.page, 4);
        assert_eq!(c.doc_title, "Document");
        assert!(c.highlight().is_none());
    }
}
