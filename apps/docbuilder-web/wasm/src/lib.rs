//! DocBuilder - browser bindings
//!
//! Exposes the signature canvas and the pure parts of the builder (pricing,
//! placeholder expansion, template lookup, PDF export) to JavaScript. Values
//! cross the boundary as JSON strings.

use docbuilder_core::{
    expand, prepare_export_input, tokens_in, DiscountPolicy, PlaceholderContext,
    PricingCalculator, TemplateCatalog,
};
use js_sys::Uint8Array;
use serde::Deserialize;
use shared_pdf::{ExportInput, ExportOptions, PdfExporter};
use shared_types::{format_currency, DiscountSpec, DocumentType, PricingLineItem, ServiceType};
use wasm_bindgen::prelude::*;

pub mod canvas;

pub use canvas::SignatureCanvas;

#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    web_sys::console::log_1(&"DocBuilder WASM initialized".into());
}

pub(crate) fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

#[derive(Deserialize)]
struct PricingRequest {
    items: Vec<PricingLineItem>,
    #[serde(default)]
    discount: Option<DiscountSpec>,
    #[serde(default)]
    policy: DiscountPolicy,
    /// Omit for the default HST line, `0` to show no tax
    #[serde(default)]
    tax_rate: Option<f64>,
    #[serde(default)]
    tax_label: Option<String>,
}

fn summarize(request_json: &str) -> Result<String, String> {
    let request: PricingRequest = serde_json::from_str(request_json).map_err(|e| e.to_string())?;
    let mut calculator = PricingCalculator {
        policy: request.policy,
        ..PricingCalculator::default()
    };
    match (request.tax_rate, request.tax_label) {
        (Some(rate), _) if rate <= 0.0 => calculator.tax = None,
        (Some(rate), label) => {
            let label = label.unwrap_or_else(|| format!("Tax ({}%)", rate * 100.0));
            calculator.tax = Some((label, rate));
        }
        (None, Some(label)) => {
            if let Some((_, rate)) = calculator.tax.take() {
                calculator.tax = Some((label, rate));
            }
        }
        (None, None) => {}
    }
    let summary = calculator
        .summarize(&request.items, request.discount.as_ref())
        .map_err(|e| e.to_string())?;
    serde_json::to_string(&summary).map_err(|e| e.to_string())
}

/// `{items, discount?, policy?, tax_rate?, tax_label?}` -> `PricingSummary` JSON
#[wasm_bindgen]
pub fn compute_pricing(request_json: &str) -> Result<String, JsValue> {
    summarize(request_json).map_err(js_err)
}

/// `$1,234.50`
#[wasm_bindgen]
pub fn format_amount(amount: f64) -> String {
    format_currency(amount)
}

/// Expand `{{TOKENS}}` with a `PlaceholderContext` JSON object.
#[wasm_bindgen]
pub fn expand_placeholders(content: &str, context_json: &str) -> Result<String, JsValue> {
    let ctx: PlaceholderContext = serde_json::from_str(context_json).map_err(js_err)?;
    Ok(expand(content, &ctx))
}

/// Known tokens still present in `content`.
#[wasm_bindgen]
pub fn unresolved_placeholders(content: &str) -> Vec<JsValue> {
    tokens_in(content)
        .into_iter()
        .map(|p| JsValue::from_str(&p.token()))
        .collect()
}

fn parse_pair(document_type: &str, service_type: &str) -> Result<(DocumentType, ServiceType), String> {
    let dt = serde_json::from_value(serde_json::Value::String(document_type.to_string()))
        .map_err(|_| format!("unknown document type '{}'", document_type))?;
    let st = serde_json::from_value(serde_json::Value::String(service_type.to_string()))
        .map_err(|_| format!("unknown service type '{}'", service_type))?;
    Ok((dt, st))
}

/// The built-in template for a combination as JSON, or `undefined`.
#[wasm_bindgen]
pub fn template_for(document_type: &str, service_type: &str) -> Result<Option<String>, JsValue> {
    let (dt, st) = parse_pair(document_type, service_type).map_err(js_err)?;
    TemplateCatalog::builtin()
        .lookup(dt, st)
        .map(|t| serde_json::to_string(t).map_err(js_err))
        .transpose()
}

/// Render an `ExportInput` JSON payload. Placeholders are expanded here.
///
/// Returns `{ bytes: Uint8Array, fileName, pages, toc }`.
#[wasm_bindgen]
pub fn export_pdf(input_json: &str, options_json: Option<String>) -> Result<JsValue, JsValue> {
    let raw: ExportInput = serde_json::from_str(input_json).map_err(js_err)?;
    let options: ExportOptions = match options_json {
        Some(json) => serde_json::from_str(&json).map_err(js_err)?,
        None => ExportOptions::default(),
    };
    let input = prepare_export_input(
        raw.document,
        raw.client,
        raw.signatures,
        raw.company,
        raw.audit_events,
        raw.generated_on,
    );
    let pdf = PdfExporter::new(&options).export(&input).map_err(js_err)?;

    let toc = serde_json::to_string(&pdf.toc).map_err(js_err)?;
    let result = js_sys::Object::new();
    js_sys::Reflect::set(&result, &"bytes".into(), &Uint8Array::from(pdf.bytes.as_slice()))?;
    js_sys::Reflect::set(&result, &"fileName".into(), &pdf.file_name.into())?;
    js_sys::Reflect::set(&result, &"pages".into(), &(pdf.pages.len() as u32).into())?;
    js_sys::Reflect::set(&result, &"toc".into(), &js_sys::JSON::parse(&toc)?)?;
    Ok(result.into())
}
