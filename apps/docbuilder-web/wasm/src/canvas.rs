//! `<canvas>` binding for the signature pad.
//!
//! The pad raster lives in Rust; every change is blitted to the canvas with
//! `putImageData`. Pointer and touch samples are mapped through the element's
//! bounding rect so CSS scaling and the device pixel ratio are accounted for.

use docsign_core::{
    to_canvas_space, ElementRect, PadState, PadStyle, Point, SignaturePad, DEFAULT_UNDO_CAPACITY,
};
use js_sys::Function;
use wasm_bindgen::prelude::*;
use wasm_bindgen::{Clamped, JsCast};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, ImageData, PointerEvent, TouchEvent};

#[wasm_bindgen]
pub struct SignatureCanvas {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    pad: SignaturePad,
}

#[wasm_bindgen]
impl SignatureCanvas {
    /// Attach to `canvas`. `style_json` is an optional serialized `PadStyle`;
    /// its size is replaced by the element's CSS size times the device pixel
    /// ratio.
    #[wasm_bindgen(constructor)]
    pub fn new(
        canvas: HtmlCanvasElement,
        style_json: Option<String>,
        undo_capacity: Option<usize>,
    ) -> Result<SignatureCanvas, JsValue> {
        let mut style: PadStyle = match style_json {
            Some(json) => serde_json::from_str(&json).map_err(crate::js_err)?,
            None => PadStyle::default(),
        };

        let rect = canvas.get_bounding_client_rect();
        let dpr = web_sys::window()
            .map(|w| w.device_pixel_ratio())
            .unwrap_or(1.0);
        if rect.width() > 0.0 && rect.height() > 0.0 {
            style.width = (rect.width() * dpr).round() as u32;
            style.height = (rect.height() * dpr).round() as u32;
        }
        canvas.set_width(style.width);
        canvas.set_height(style.height);

        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()?;

        let pad = SignaturePad::new(style, undo_capacity.unwrap_or(DEFAULT_UNDO_CAPACITY));
        let this = Self { canvas, ctx, pad };
        this.render()?;
        Ok(this)
    }

    /// `callback(hasInk: boolean)` runs when the pad gains ink or becomes empty.
    pub fn on_change(&mut self, callback: Function) {
        self.pad.on_change(Box::new(move |has_ink| {
            if let Err(e) = callback.call1(&JsValue::NULL, &JsValue::from_bool(has_ink)) {
                web_sys::console::error_2(&"signature change callback failed".into(), &e);
            }
        }));
    }

    pub fn pointer_down(&mut self, event: &PointerEvent) -> Result<(), JsValue> {
        event.prevent_default();
        // capture keeps the stroke alive when the pointer leaves the element
        let _ = self.canvas.set_pointer_capture(event.pointer_id());
        let point = self.canvas_point(event.client_x(), event.client_y());
        self.pad.begin(point);
        self.render()
    }

    pub fn pointer_move(&mut self, event: &PointerEvent) -> Result<(), JsValue> {
        if self.pad.state() == PadState::Idle {
            return Ok(());
        }
        let point = self.canvas_point(event.client_x(), event.client_y());
        self.pad.extend(point);
        self.render()
    }

    pub fn pointer_up(&mut self) -> Result<(), JsValue> {
        self.pad.end();
        self.render()
    }

    pub fn touch_start(&mut self, event: &TouchEvent) -> Result<(), JsValue> {
        event.prevent_default();
        if let Some(touch) = event.touches().get(0) {
            let point = self.canvas_point(touch.client_x(), touch.client_y());
            self.pad.begin(point);
        }
        self.render()
    }

    pub fn touch_move(&mut self, event: &TouchEvent) -> Result<(), JsValue> {
        event.prevent_default();
        if let Some(touch) = event.touches().get(0) {
            let point = self.canvas_point(touch.client_x(), touch.client_y());
            self.pad.extend(point);
        }
        self.render()
    }

    pub fn touch_end(&mut self, event: &TouchEvent) -> Result<(), JsValue> {
        event.prevent_default();
        self.pointer_up()
    }

    pub fn clear(&mut self) -> Result<(), JsValue> {
        self.pad.clear();
        self.render()
    }

    /// Returns `false` when there was nothing to undo.
    pub fn undo(&mut self) -> Result<bool, JsValue> {
        let undone = self.pad.undo();
        self.render()?;
        Ok(undone)
    }

    pub fn is_empty(&self) -> bool {
        self.pad.is_empty()
    }

    /// Placeholder text to overlay while nothing is drawn.
    pub fn hint(&self) -> Option<String> {
        self.pad.hint().map(str::to_string)
    }

    /// PNG data URL, or `undefined` for an empty pad.
    pub fn to_data_url(&self) -> Result<Option<String>, JsValue> {
        self.pad.export_data_url().map_err(crate::js_err)
    }

    fn canvas_point(&self, client_x: i32, client_y: i32) -> Point {
        let r = self.canvas.get_bounding_client_rect();
        let rect = ElementRect {
            left: r.left() as f32,
            top: r.top() as f32,
            width: r.width() as f32,
            height: r.height() as f32,
        };
        to_canvas_space(
            client_x as f32,
            client_y as f32,
            &rect,
            self.canvas.width(),
            self.canvas.height(),
        )
    }

    fn render(&self) -> Result<(), JsValue> {
        let surface = self.pad.surface();
        let image = ImageData::new_with_u8_clamped_array_and_sh(
            Clamped(surface.pixels()),
            surface.width(),
            surface.height(),
        )?;
        self.ctx.put_image_data(&image, 0.0, 0.0)
    }
}
