//! Hand-drawn signature capture.
//!
//! `SignaturePad` owns an RGBA raster and a small state machine:
//!
//! ```text
//! Idle --begin--> Drawing --extend*--> Drawing --end--> Idle
//! ```
//!
//! Every stroke pushes a snapshot of the raster (and its emptiness) onto a
//! bounded undo stack. Emptiness is tracked as a flag rather than by scanning
//! pixels, so the background and baseline never count as ink.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::coords::Point;
use crate::error::PadError;
use crate::surface::{Rgba, Surface};
use crate::validate::png_data_url;

pub const DEFAULT_UNDO_CAPACITY: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PadStyle {
    pub width: u32,
    pub height: u32,
    pub stroke_color: Rgba,
    pub stroke_width: f32,
    pub background: Rgba,
    pub baseline_color: Rgba,
    /// Text the host shows over an empty pad
    pub hint: String,
}

impl Default for PadStyle {
    fn default() -> Self {
        Self {
            width: 600,
            height: 200,
            stroke_color: [30, 41, 59, 255],
            stroke_width: 2.5,
            background: [255, 255, 255, 255],
            baseline_color: [203, 213, 225, 160],
            hint: "Sign here".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PadState {
    Idle,
    Drawing { last: Point, drew: bool },
}

#[derive(Clone)]
struct Snapshot {
    surface: Surface,
    empty: bool,
}

/// Observer called with `true` when the pad gains ink, `false` when it
/// becomes empty.
pub type ChangeObserver = Box<dyn FnMut(bool)>;

pub struct SignaturePad {
    style: PadStyle,
    surface: Surface,
    state: PadState,
    empty: bool,
    undo: VecDeque<Snapshot>,
    undo_capacity: usize,
    observer: Option<ChangeObserver>,
}

impl std::fmt::Debug for SignaturePad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignaturePad")
            .field("width", &self.surface.width())
            .field("height", &self.surface.height())
            .field("state", &self.state)
            .field("empty", &self.empty)
            .field("undo_depth", &self.undo.len())
            .finish()
    }
}

impl SignaturePad {
    pub fn new(style: PadStyle, undo_capacity: usize) -> Self {
        let surface = blank_surface(&style);
        Self {
            style,
            surface,
            state: PadState::Idle,
            empty: true,
            undo: VecDeque::with_capacity(undo_capacity),
            undo_capacity: undo_capacity.max(1),
            observer: None,
        }
    }

    pub fn on_change(&mut self, observer: ChangeObserver) {
        self.observer = Some(observer);
    }

    pub fn style(&self) -> &PadStyle {
        &self.style
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn state(&self) -> PadState {
        self.state
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    /// Hint to overlay while the pad is empty.
    pub fn hint(&self) -> Option<&str> {
        self.empty.then_some(self.style.hint.as_str())
    }

    /// Start a stroke at `point`. The undo stack holds one extra snapshot
    /// until the stroke ends.
    pub fn begin(&mut self, point: Point) {
        if let PadState::Drawing { .. } = self.state {
            self.end();
        }
        self.undo.push_back(Snapshot {
            surface: self.surface.clone(),
            empty: self.empty,
        });
        self.state = PadState::Drawing {
            last: point,
            drew: false,
        };
    }

    /// Extend the current stroke to `point`. Ignored while idle.
    pub fn extend(&mut self, point: Point) {
        let PadState::Drawing { last, .. } = self.state else {
            return;
        };
        self.surface.draw_segment(
            last,
            point,
            self.style.stroke_width,
            self.style.stroke_color,
        );
        self.empty = false;
        self.state = PadState::Drawing {
            last: point,
            drew: true,
        };
    }

    /// Finish the current stroke.
    pub fn end(&mut self) {
        let PadState::Drawing { drew, .. } = self.state else {
            return;
        };
        self.state = PadState::Idle;
        if drew {
            // evict only once the stroke is known to count
            while self.undo.len() > self.undo_capacity {
                self.undo.pop_front();
            }
            self.notify(true);
        } else {
            // nothing drawn: the snapshot would make undo a no-op
            self.undo.pop_back();
        }
    }

    /// Reset to a blank pad and forget the undo history.
    pub fn clear(&mut self) {
        self.surface = blank_surface(&self.style);
        self.state = PadState::Idle;
        self.empty = true;
        self.undo.clear();
        self.notify(false);
    }

    /// Restore the state before the most recent stroke. Returns `false` when
    /// there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        self.state = PadState::Idle;
        let Some(snapshot) = self.undo.pop_back() else {
            return false;
        };
        self.surface = snapshot.surface;
        self.empty = snapshot.empty;
        debug!(remaining = self.undo.len(), empty = self.empty, "Undid stroke");
        self.notify(!self.empty);
        true
    }

    /// PNG bytes of the drawing, or `None` for an empty pad.
    pub fn export_png(&self) -> Result<Option<Vec<u8>>, PadError> {
        if self.empty {
            return Ok(None);
        }
        self.surface
            .encode_png()
            .map(Some)
            .map_err(|e| PadError::Encode(e.to_string()))
    }

    pub fn export_data_url(&self) -> Result<Option<String>, PadError> {
        Ok(self.export_png()?.map(|png| png_data_url(&png)))
    }

    fn notify(&mut self, has_ink: bool) {
        if let Some(observer) = self.observer.as_mut() {
            observer(has_ink);
        }
    }
}

impl Default for SignaturePad {
    fn default() -> Self {
        Self::new(PadStyle::default(), DEFAULT_UNDO_CAPACITY)
    }
}

fn blank_surface(style: &PadStyle) -> Surface {
    let mut surface = Surface::new(style.width, style.height, style.background);
    // faint guide line at 75% height
    let y = style.height * 3 / 4;
    let inset = style.width / 20;
    surface.hline(y, inset, style.width.saturating_sub(inset), style.baseline_color);
    surface
}
