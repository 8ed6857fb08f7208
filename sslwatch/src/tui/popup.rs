//! Popup overlays: WHOIS detail and key help

use ratatui::layout::Rect;
use sslwatch_lib::{CheckResult, RequestId, WhoisStatus};
use tracing::debug;

/// Marker drawn on the WHOIS popup border; clicking it closes the popup.
pub const CLOSE_GLYPH: &str = "[x]";

/// Key bindings listed in the help popup.
pub const HELP_ENTRIES: &[(&str, &str)] = &[
    ("Enter", "Check the domain / import the file"),
    ("Ctrl-F", "Switch between domain and file input"),
    ("Ctrl-D", "Toggle detailed view"),
    ("Left / Right", "Previous / next page"),
    ("Click", "WHOIS for a certificate row"),
    ("Up / Down", "Scroll WHOIS text"),
    ("PgUp / PgDn", "Scroll WHOIS text by a page"),
    ("q / Esc", "Close WHOIS popup"),
    ("F1", "Show this help"),
    ("Ctrl-C / Ctrl-Q", "Quit"),
];

/// Open overlay, if any. Input goes to the overlay while it is open.
#[derive(Debug)]
pub enum Overlay {
    None,
    Whois(WhoisPopup),
    Help,
}

impl Overlay {
    pub fn is_open(&self) -> bool {
        !matches!(self, Overlay::None)
    }
}

/// State of one WHOIS popup, bound to the request that opened it.
#[derive(Debug)]
pub struct WhoisPopup {
    request: RequestId,
    domain: String,
    fetched: Option<FetchedRecord>,
    scroll: usize,
}

#[derive(Debug)]
struct FetchedRecord {
    status: WhoisStatus,
    lines: Vec<String>,
}

impl WhoisPopup {
    pub fn new(request: RequestId, domain: impl Into<String>) -> Self {
        Self {
            request,
            domain: domain.into(),
            fetched: None,
            scroll: 0,
        }
    }

    pub fn request(&self) -> RequestId {
        self.request
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn is_fetched(&self) -> bool {
        self.fetched.is_some()
    }

    pub fn status(&self) -> Option<WhoisStatus> {
        self.fetched.as_ref().map(|record| record.status)
    }

    pub fn lines(&self) -> &[String] {
        self.fetched
            .as_ref()
            .map(|record| record.lines.as_slice())
            .unwrap_or(&[])
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    /// Store the reply for this popup's request. Later replies are ignored.
    pub fn accept(&mut self, result: CheckResult) {
        if self.fetched.is_some() {
            return;
        }

        let (status, text) = match result {
            CheckResult::Whois { status, data, .. } => (status, data),
            CheckResult::Error { message, .. } => (WhoisStatus::Error, message),
            other => {
                debug!(kind = %other.kind(), "unexpected whois reply");
                (WhoisStatus::Error, format!("Unexpected reply: {}", other.kind()))
            }
        };

        self.fetched = Some(FetchedRecord {
            status,
            lines: text.lines().map(str::to_string).collect(),
        });
        self.scroll = 0;
    }

    /// Largest scroll offset that still fills `visible_rows`.
    pub fn max_scroll(&self, visible_rows: usize) -> usize {
        self.lines().len().saturating_sub(visible_rows)
    }

    /// Move the view by `delta` lines, clamped to the record.
    pub fn scroll_by(&mut self, delta: isize, visible_rows: usize) {
        let max = self.max_scroll(visible_rows);
        self.scroll = self.scroll.saturating_add_signed(delta).min(max);
    }

    /// Re-clamp after the visible area changed size.
    pub fn clamp_scroll(&mut self, visible_rows: usize) {
        self.scroll = self.scroll.min(self.max_scroll(visible_rows));
    }
}

/// A rect of at most `max_width` x `max_height` centered in `area`.
pub fn centered_area(area: Rect, max_width: u16, max_height: u16) -> Rect {
    let width = area.width.min(max_width);
    let height = area.height.min(max_height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}
