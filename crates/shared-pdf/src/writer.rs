//! Serialize laid-out pages with lopdf

use chrono::{DateTime, Utc};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::error::PdfExportError;
use crate::image::{add_image_xobject, DecodedImage};
use crate::layout::Rgb;
use crate::metrics::{encode_win_ansi, Font};
use crate::page::{DrawOp, Page};

/// Document information dictionary values.
#[derive(Debug, Clone)]
pub struct DocInfo {
    pub title: String,
    pub author: String,
    pub subject: String,
    pub created: DateTime<Utc>,
}

fn pdf_string(text: &str) -> Object {
    Object::String(encode_win_ansi(text), StringFormat::Literal)
}

fn pdf_date(at: &DateTime<Utc>) -> Object {
    Object::String(
        at.format("D:%Y%m%d%H%M%SZ").to_string().into_bytes(),
        StringFormat::Literal,
    )
}

fn real(v: f32) -> Object {
    Object::Real(v)
}

fn color_operands(color: Rgb) -> Vec<Object> {
    vec![real(color.0), real(color.1), real(color.2)]
}

fn image_name(index: usize) -> String {
    format!("Im{}", index)
}

fn page_operations(page: &Page) -> Vec<Operation> {
    let mut ops = Vec::with_capacity(page.ops.len() * 5);
    for op in &page.ops {
        match op {
            DrawOp::FillRect {
                x,
                y,
                width,
                height,
                color,
            } => {
                ops.push(Operation::new("q", vec![]));
                ops.push(Operation::new("rg", color_operands(*color)));
                ops.push(Operation::new(
                    "re",
                    vec![real(*x), real(*y), real(*width), real(*height)],
                ));
                ops.push(Operation::new("f", vec![]));
                ops.push(Operation::new("Q", vec![]));
            }
            DrawOp::StrokeRect {
                x,
                y,
                width,
                height,
                line_width,
                color,
            } => {
                ops.push(Operation::new("q", vec![]));
                ops.push(Operation::new("RG", color_operands(*color)));
                ops.push(Operation::new("w", vec![real(*line_width)]));
                ops.push(Operation::new(
                    "re",
                    vec![real(*x), real(*y), real(*width), real(*height)],
                ));
                ops.push(Operation::new("S", vec![]));
                ops.push(Operation::new("Q", vec![]));
            }
            DrawOp::Line {
                x1,
                y1,
                x2,
                y2,
                line_width,
                color,
            } => {
                ops.push(Operation::new("q", vec![]));
                ops.push(Operation::new("RG", color_operands(*color)));
                ops.push(Operation::new("w", vec![real(*line_width)]));
                ops.push(Operation::new("m", vec![real(*x1), real(*y1)]));
                ops.push(Operation::new("l", vec![real(*x2), real(*y2)]));
                ops.push(Operation::new("S", vec![]));
                ops.push(Operation::new("Q", vec![]));
            }
            DrawOp::Text {
                x,
                y,
                font,
                size,
                color,
                text,
            } => {
                ops.push(Operation::new("BT", vec![]));
                ops.push(Operation::new("rg", color_operands(*color)));
                ops.push(Operation::new(
                    "Tf",
                    vec![Object::Name(font.resource_name().to_vec()), real(*size)],
                ));
                ops.push(Operation::new("Td", vec![real(*x), real(*y)]));
                ops.push(Operation::new("Tj", vec![pdf_string(text)]));
                ops.push(Operation::new("ET", vec![]));
            }
            DrawOp::Image {
                index,
                x,
                y,
                width,
                height,
            } => {
                ops.push(Operation::new("q", vec![]));
                ops.push(Operation::new(
                    "cm",
                    vec![
                        real(*width),
                        real(0.0),
                        real(0.0),
                        real(*height),
                        real(*x),
                        real(*y),
                    ],
                ));
                ops.push(Operation::new(
                    "Do",
                    vec![Object::Name(image_name(*index).into_bytes())],
                ));
                ops.push(Operation::new("Q", vec![]));
            }
        }
    }
    ops
}

fn font_dict(font: Font) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => font.base_font(),
        "Encoding" => "WinAnsiEncoding",
    }
}

/// Write `pages` into a complete PDF.
///
/// Object numbering follows page order, so identical input gives identical
/// bytes.
pub fn write_pdf(
    pages: &[Page],
    images: &[DecodedImage],
    info: &DocInfo,
) -> Result<Vec<u8>, PdfExportError> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(font_dict(Font::Regular));
    let bold_id = doc.add_object(font_dict(Font::Bold));

    let image_ids: Vec<ObjectId> = images
        .iter()
        .map(|img| add_image_xobject(&mut doc, img))
        .collect::<Result<_, _>>()?;

    let mut kids = Vec::with_capacity(pages.len());
    for page in pages {
        let content = Content {
            operations: page_operations(page),
        };
        let encoded = content
            .encode()
            .map_err(|e| PdfExportError::Content(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

        let mut xobjects = Dictionary::new();
        for op in &page.ops {
            if let DrawOp::Image { index, .. } = op {
                let id = image_ids.get(*index).ok_or_else(|| {
                    PdfExportError::Content(format!("page references missing image {}", index))
                })?;
                xobjects.set(image_name(*index), Object::Reference(*id));
            }
        }

        let mut resources = dictionary! {
            "Font" => dictionary! {
                "F1" => regular_id,
                "F2" => bold_id,
            },
        };
        if !xobjects.is_empty() {
            resources.set("XObject", xobjects);
        }

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                real(0.0),
                real(0.0),
                real(page.geometry.width),
                real(page.geometry.height),
            ],
            "Contents" => content_id,
            "Resources" => resources,
        });
        kids.push(Object::Reference(page_id));
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => pdf_string(&info.title),
        "Author" => pdf_string(&info.author),
        "Subject" => pdf_string(&info.subject),
        "Creator" => pdf_string("Document Builder"),
        "Producer" => pdf_string("shared-pdf"),
        "CreationDate" => pdf_date(&info.created),
        "ModDate" => pdf_date(&info.created),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PdfExportError::Write(e.to_string()))?;
    Ok(buffer)
}
