//! PDF.js bindings and the browser [`PageRasterizer`].
//!
//! `index.html` loads PDF.js, which exposes the `pdfjsLib` global.

use js_sys::{Array, Object, Promise, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use rag_chat::geometry::{PageViewport, Transform};
use rag_chat::preview::{PageRasterizer, RenderedPage};

use crate::api::js_error;

#[wasm_bindgen]
extern "C" {
    type PdfLoadingTask;
    #[wasm_bindgen(js_namespace = pdfjsLib, js_name = getDocument)]
    fn get_document(src: &str) -> PdfLoadingTask;
    #[wasm_bindgen(method, getter)]
    fn promise(this: &PdfLoadingTask) -> Promise;

    type PdfDocument;
    #[wasm_bindgen(method, js_name = getPage)]
    fn get_page(this: &PdfDocument, number: u32) -> Promise;

    type PdfPage;
    #[wasm_bindgen(method, getter)]
    fn view(this: &PdfPage) -> Array;
    #[wasm_bindgen(method, js_name = getViewport)]
    fn get_viewport(this: &PdfPage, params: &Object) -> PdfViewport;
    #[wasm_bindgen(method)]
    fn render(this: &PdfPage, params: &Object) -> PdfRenderTask;

    type PdfRenderTask;
    #[wasm_bindgen(method, getter)]
    fn promise(this: &PdfRenderTask) -> Promise;

    type PdfViewport;
    #[wasm_bindgen(method, getter)]
    fn width(this: &PdfViewport) -> f64;
    #[wasm_bindgen(method, getter)]
    fn height(this: &PdfViewport) -> f64;
    #[wasm_bindgen(method, getter)]
    fn transform(this: &PdfViewport) -> Array;
}

/// Draws pages into one canvas.
pub struct PdfJsRasterizer {
    pub canvas: HtmlCanvasElement,
}

impl PageRasterizer for PdfJsRasterizer {
    async fn render_page(
        &self,
        pdf_url: &str,
        page: u32,
        scale: f64,
    ) -> Result<RenderedPage, String> {
        let doc: PdfDocument = JsFuture::from(get_document(pdf_url).promise())
            .await
            .map_err(js_error)?
            .unchecked_into();
        let pdf_page: PdfPage = JsFuture::from(doc.get_page(page))
            .await
            .map_err(js_error)?
            .unchecked_into();

        let viewport = pdf_page.get_viewport(&params(&[("scale", JsValue::from_f64(scale))])?);
        let ctx: CanvasRenderingContext2d = self
            .canvas
            .get_context("2d")
            .map_err(js_error)?
            .ok_or_else(|| "canvas has no 2d context".to_string())?
            .unchecked_into();
        let (width_px, height_px) = (viewport.width(), viewport.height());
        let transform = to_transform(&viewport.transform())?;
        // view is [x0, y0, x1, y1] of the page box in points
        let page_height = pdf_page.view().get(3).as_f64().ok_or("page has no view box")?;

        self.canvas.set_width(width_px as u32);
        self.canvas.set_height(height_px as u32);
        let render_params = params(&[
            ("canvasContext", ctx.into()),
            ("viewport", viewport.into()),
        ])?;
        JsFuture::from(pdf_page.render(&render_params).promise())
            .await
            .map_err(js_error)?;
        log::debug!("rendered {pdf_url} page {page} at scale {scale}");

        Ok(RenderedPage {
            viewport: PageViewport::new(scale, transform, page_height),
            width_px,
            height_px,
        })
    }
}

fn params(entries: &[(&str, JsValue)]) -> Result<Object, String> {
    let obj = Object::new();
    for (key, value) in entries {
        Reflect::set(&obj, &JsValue::from_str(key), value).map_err(js_error)?;
    }
    Ok(obj)
}

fn to_transform(values: &Array) -> Result<Transform, String> {
    let mut t = [0.0; 6];
    for (i, slot) in t.iter_mut().enumerate() {
        *slot = values
            .get(i as u32)
            .as_f64()
            .ok_or_else(|| format!("viewport transform has no coefficient {i}"))?;
    }
    Ok(t)
}
