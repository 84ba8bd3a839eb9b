//! Page-level drawing model.
//!
//! Layout produces `Page`s of `DrawOp`s in PDF user space; the writer turns
//! them into content streams. Keeping the two apart lets layout be inspected
//! in tests without parsing PDF bytes.

use serde::Serialize;

use crate::layout::{PageGeometry, Rgb};
use crate::metrics::Font;

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    FillRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Rgb,
    },
    StrokeRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        line_width: f32,
        color: Rgb,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        line_width: f32,
        color: Rgb,
    },
    Text {
        x: f32,
        y: f32,
        font: Font,
        size: f32,
        color: Rgb,
        text: String,
    },
    Image {
        /// Index into the exporter's decoded image list
        index: usize,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageKind {
    Cover,
    TableOfContents,
    Section { key: String },
    Pricing,
    Signatures,
    Audit,
}

#[derive(Debug, Clone)]
pub struct Page {
    pub kind: PageKind,
    pub geometry: PageGeometry,
    pub ops: Vec<DrawOp>,
}

impl Page {
    pub fn new(kind: PageKind, geometry: PageGeometry) -> Self {
        Self {
            kind,
            geometry,
            ops: Vec::new(),
        }
    }

    /// All text drawn on the page, in drawing order.
    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn image_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Image { .. }))
            .count()
    }

    // Drawing helpers take top-down coordinates.

    pub fn fill_rect(&mut self, x: f32, top: f32, width: f32, height: f32, color: Rgb) {
        self.ops.push(DrawOp::FillRect {
            x,
            y: self.geometry.flip(top + height),
            width,
            height,
            color,
        });
    }

    pub fn stroke_rect(
        &mut self,
        x: f32,
        top: f32,
        width: f32,
        height: f32,
        line_width: f32,
        color: Rgb,
    ) {
        self.ops.push(DrawOp::StrokeRect {
            x,
            y: self.geometry.flip(top + height),
            width,
            height,
            line_width,
            color,
        });
    }

    pub fn hline(&mut self, x1: f32, x2: f32, y: f32, line_width: f32, color: Rgb) {
        let y = self.geometry.flip(y);
        self.ops.push(DrawOp::Line {
            x1,
            y1: y,
            x2,
            y2: y,
            line_width,
            color,
        });
    }

    /// Draw `text` with its baseline at top-down `baseline`.
    pub fn text(&mut self, x: f32, baseline: f32, font: Font, size: f32, color: Rgb, text: &str) {
        if text.is_empty() {
            return;
        }
        self.ops.push(DrawOp::Text {
            x,
            y: self.geometry.flip(baseline),
            font,
            size,
            color,
            text: text.to_string(),
        });
    }

    pub fn text_right(
        &mut self,
        right: f32,
        baseline: f32,
        font: Font,
        size: f32,
        color: Rgb,
        text: &str,
    ) {
        let x = right - font.text_width(text, size);
        self.text(x, baseline, font, size, color, text);
    }

    pub fn text_centered(
        &mut self,
        center: f32,
        baseline: f32,
        font: Font,
        size: f32,
        color: Rgb,
        text: &str,
    ) {
        let x = center - font.text_width(text, size) / 2.0;
        self.text(x, baseline, font, size, color, text);
    }

    pub fn image(&mut self, index: usize, x: f32, top: f32, width: f32, height: f32) {
        self.ops.push(DrawOp::Image {
            index,
            x,
            y: self.geometry.flip(top + height),
            width,
            height,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_down_coordinates_are_flipped() {
        let geometry = PageGeometry::default();
        let mut page = Page::new(PageKind::Cover, geometry);
        page.fill_rect(0.0, 0.0, geometry.width, 100.0, Rgb::BLACK);
        page.text(10.0, 50.0, Font::Regular, 12.0, Rgb::BLACK, "Hello");

        match &page.ops[0] {
            DrawOp::FillRect { y, height, .. } => {
                assert!((y - (geometry.height - 100.0)).abs() < 1e-3);
                assert_eq!(*height, 100.0);
            }
            other => panic!("unexpected op {:?}", other),
        }
        match &page.ops[1] {
            DrawOp::Text { y, .. } => assert!((y - (geometry.height - 50.0)).abs() < 1e-3),
            other => panic!("unexpected op {:?}", other),
        }
        assert_eq!(page.texts(), vec!["Hello"]);
    }

    #[test]
    fn right_aligned_text_ends_at_edge() {
        let mut page = Page::new(PageKind::Pricing, PageGeometry::default());
        page.text_right(500.0, 100.0, Font::Bold, 10.0, Rgb::BLACK, "$270.00");
        match &page.ops[0] {
            DrawOp::Text { x, font, size, text, .. } => {
                let end = x + font.text_width(text, *size);
                assert!((end - 500.0).abs() < 1e-3);
            }
            other => panic!("unexpected op {:?}", other),
        }
    }

    #[test]
    fn empty_text_is_skipped() {
        let mut page = Page::new(PageKind::Audit, PageGeometry::default());
        page.text(0.0, 0.0, Font::Regular, 10.0, Rgb::BLACK, "");
        assert!(page.ops.is_empty());
    }
}
