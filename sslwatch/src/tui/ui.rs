//! UI rendering
//!
//! Layout:
//! ```text
//!
//!                     SSL Certificate Checker
//!
//!                        Enter domain name:
//!
//!         ┌ Domain Input ─────────────────────────────────────┐
//!         │ example.com                                       │
//!         └───────────────────────────────────────────────────┘
//!
//!   ┌ Results: 42 Page: 1/4 ─────────────────────────────────────┐
//!   │ example.com OK                                             │
//!   │ example.org WARNING                                        │
//!   │ ...                                                        │
//!   └────────────────────────────────────────────────────────────┘
//!   Enter: Check | Ctrl-F: File | Ctrl-D: Details | ...
//! ```

use super::app::{App, InputMode};
use super::popup::{centered_area, Overlay, WhoisPopup, CLOSE_GLYPH, HELP_ENTRIES};
use ratatui::{
    layout::{Alignment, Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Padding, Paragraph, Row, Table},
    Frame,
};
use sslwatch_lib::{CheckResult, ResultKind, WhoisStatus};

const TITLE: &str = "SSL Certificate Checker";
const INPUT_WIDTH: u16 = 60;
const EMPTY_HINT: &str = "Enter a domain name above and press Enter.";

/// Rows per certificate entry in detailed view, including the spacer line.
pub const DETAILED_LINES: usize = 7;

/// Rows used by Info, Error and Unknown entries in either view.
pub const BLOCK_LINES: usize = 2;

/// Screen geometry, derived from the terminal size alone.
///
/// Rendering and mouse hit-testing both read from this so a click always
/// lands on what was drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenLayout {
    pub title: Rect,
    pub prompt: Rect,
    pub input: Rect,
    pub output: Rect,
    pub footer: Rect,
    pub whois: Rect,
    pub help: Rect,
}

impl ScreenLayout {
    pub fn new(area: Rect) -> Self {
        let [_, title, _, prompt, _, input_row, _, output_row, footer_row, _] = Layout::vertical([
            Constraint::Length(1), // top margin
            Constraint::Length(1), // title
            Constraint::Length(1),
            Constraint::Length(1), // prompt
            Constraint::Length(1),
            Constraint::Length(3), // input box
            Constraint::Length(1),
            Constraint::Min(0), // results
            Constraint::Length(1), // key hints
            Constraint::Length(1), // bottom margin
        ])
        .areas(area);

        let [_, output, _] = Layout::horizontal([
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(2),
        ])
        .areas(output_row);
        let [_, footer] =
            Layout::horizontal([Constraint::Length(2), Constraint::Min(0)]).areas(footer_row);

        Self {
            title,
            prompt,
            input: centered_area(input_row, INPUT_WIDTH, 3),
            output,
            footer,
            whois: centered_area(
                area,
                area.width.saturating_sub(8),
                area.height.saturating_sub(4),
            ),
            help: centered_area(area, 64, HELP_ENTRIES.len() as u16 + 4),
        }
    }

    /// Rows available for result entries inside the output box.
    pub fn output_rows(&self) -> usize {
        self.output.height.saturating_sub(2) as usize
    }

    /// Rows available for WHOIS text below the popup's status line.
    pub fn whois_rows(&self) -> usize {
        self.whois.height.saturating_sub(3) as usize
    }

    /// Where the close glyph sits on the WHOIS popup's top border.
    pub fn close_glyph(&self) -> Rect {
        let width = CLOSE_GLYPH.len() as u16;
        Rect::new(
            self.whois.right().saturating_sub(width + 2),
            self.whois.y,
            width,
            1,
        )
        .intersection(self.whois)
    }
}

/// A result entry placed in the output box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntrySlot {
    /// Index into the result list
    pub index: usize,
    /// First row of the entry, relative to the top of the output box interior
    pub offset: usize,
    pub height: usize,
}

/// Current page and page count for the output header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub current: usize,
    pub total: usize,
}

pub fn lines_per_entry(detailed: bool) -> usize {
    if detailed {
        DETAILED_LINES
    } else {
        1
    }
}

/// Rows one result takes up in the current view.
pub fn entry_height(result: &CheckResult, detailed: bool) -> usize {
    if result.kind().is_block() {
        BLOCK_LINES
    } else {
        lines_per_entry(detailed)
    }
}

/// Entries per page. Always at least one.
pub fn page_size(rows: usize, detailed: bool) -> usize {
    (rows / lines_per_entry(detailed)).max(1)
}

pub fn page_info(len: usize, page_size: usize, scroll: usize) -> PageInfo {
    let page_size = page_size.max(1);
    let total = len.div_ceil(page_size).max(1);
    PageInfo {
        current: (scroll / page_size + 1).min(total),
        total,
    }
}

/// Entries that fit in `rows`, starting at `scroll`.
///
/// An entry is only placed if all of its rows fit.
pub fn visible_entries(
    results: &[CheckResult],
    detailed: bool,
    scroll: usize,
    rows: usize,
) -> Vec<EntrySlot> {
    let mut slots = Vec::new();
    let mut offset = 0;

    for (index, result) in results.iter().enumerate().skip(scroll) {
        let height = entry_height(result, detailed);
        if offset + height > rows {
            break;
        }
        slots.push(EntrySlot {
            index,
            offset,
            height,
        });
        offset += height;
    }

    slots
}

/// Fixed status-to-color map.
#[derive(Debug, Clone)]
pub struct Palette {
    ok: Color,
    warning: Color,
    alert: Color,
    expired: Color,
    info: Color,
    error: Color,
    unknown: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            ok: Color::Green,
            warning: Color::Yellow,
            alert: Color::Red,
            expired: Color::Red,
            info: Color::Cyan,
            error: Color::Red,
            unknown: Color::Yellow,
        }
    }
}

impl Palette {
    pub fn color(&self, kind: ResultKind) -> Color {
        match kind {
            ResultKind::Ok => self.ok,
            ResultKind::Warning => self.warning,
            ResultKind::Alert => self.alert,
            ResultKind::Expired => self.expired,
            ResultKind::Info => self.info,
            ResultKind::Error => self.error,
            ResultKind::Unknown => self.unknown,
        }
    }

    pub fn style(&self, kind: ResultKind) -> Style {
        Style::new().fg(self.color(kind))
    }
}

/// Draws the whole screen from application state. Created once per session.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    palette: Palette,
}

impl Renderer {
    pub fn new(palette: Palette) -> Self {
        Self { palette }
    }

    /// Render the entire UI
    pub fn draw(&self, frame: &mut Frame, app: &App) {
        let layout = app.layout();

        self.draw_header(frame, app, layout);
        self.draw_input(frame, app, layout);
        self.draw_output(frame, app, layout);
        self.draw_footer(frame, app, layout);

        match &app.overlay {
            Overlay::None => {}
            Overlay::Whois(popup) => self.draw_whois(frame, popup, layout),
            Overlay::Help => self.draw_help(frame, layout),
        }
    }

    fn draw_header(&self, frame: &mut Frame, app: &App, layout: &ScreenLayout) {
        let title = Paragraph::new(TITLE)
            .style(Style::new().add_modifier(Modifier::BOLD | Modifier::UNDERLINED))
            .alignment(Alignment::Center);
        frame.render_widget(title, layout.title);

        let prompt = Paragraph::new(app.view.mode.prompt()).alignment(Alignment::Center);
        frame.render_widget(prompt, layout.prompt);
    }

    fn draw_input(&self, frame: &mut Frame, app: &App, layout: &ScreenLayout) {
        let border = match app.view.mode {
            InputMode::Domain => Color::Reset,
            InputMode::File => Color::Cyan,
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::new().fg(border))
            .title(app.view.mode.title())
            .padding(Padding::left(1));
        let inner = block.inner(layout.input);
        frame.render_widget(block, layout.input);

        // Keep the tail of long input visible with room for the cursor
        let room = (inner.width as usize).saturating_sub(1);
        let input = app.view.input.as_str();
        let shown = &input[input.len().saturating_sub(room)..];
        frame.render_widget(Paragraph::new(shown), inner);

        if !app.overlay.is_open() && inner.height > 0 {
            frame.set_cursor_position(Position::new(inner.x + shown.len() as u16, inner.y));
        }
    }

    fn draw_output(&self, frame: &mut Frame, app: &App, layout: &ScreenLayout) {
        let results = app.results.entries();
        let mut block = Block::default()
            .borders(Borders::ALL)
            .padding(Padding::left(1))
            .title_bottom(Line::from(" F1: Help ").right_aligned());
        if app.workers.is_checking() {
            block = block.title_bottom(Line::styled(
                format!(" {} pending ", app.workers.active()),
                self.palette.style(ResultKind::Info),
            ));
        }

        if results.is_empty() {
            let block = block.title(" Result ");
            let inner = block.inner(layout.output);
            frame.render_widget(block, layout.output);
            frame.render_widget(
                Paragraph::new(vec![Line::default(), Line::from(EMPTY_HINT)]),
                inner,
            );
            return;
        }

        let page = page_info(results.len(), app.page_size(), app.view.scroll);
        let title = if results.len() > 1 && page.total > 1 {
            format!(
                " Results: {} Page: {}/{} ",
                results.len(),
                page.current,
                page.total
            )
        } else {
            format!(" Results: {} ", results.len())
        };

        let block = block.title(title);
        let inner = block.inner(layout.output);
        frame.render_widget(block, layout.output);

        let slots = visible_entries(
            results,
            app.view.detailed,
            app.view.scroll,
            layout.output_rows(),
        );
        let lines: Vec<Line> = slots
            .iter()
            .flat_map(|slot| self.entry_lines(&results[slot.index], app.view.detailed))
            .collect();
        frame.render_widget(Paragraph::new(lines), inner);
    }

    /// Lines for one entry; the count always equals `entry_height`.
    fn entry_lines(&self, result: &CheckResult, detailed: bool) -> Vec<Line<'static>> {
        let kind = result.kind();
        let color = self.palette.style(kind);
        let status = Span::styled(kind.as_str(), color.add_modifier(Modifier::BOLD));

        match result {
            CheckResult::Certificate(report) if detailed => vec![
                Line::from(format!("Domain:     {}", report.domain)),
                Line::from(format!("Subject:    {}", report.subject_cn)),
                Line::from(format!("Issuer:     {}", report.issuer_cn)),
                Line::from(format!("Issued:     {}", report.issued_on)),
                Line::from(format!(
                    "Expires:    {} ({} days)",
                    report.expires_on, report.days_left
                )),
                Line::from(vec![Span::raw("Status:     "), status]),
                Line::default(),
            ],
            CheckResult::Certificate(report) => {
                vec![Line::from(vec![Span::raw(format!("{} ", report.domain)), status])]
            }
            CheckResult::Info { message } => block_lines(None, message, color),
            CheckResult::Error { domain, message } => {
                block_lines(domain.as_deref(), message, color)
            }
            CheckResult::Whois { domain, status, .. } => {
                block_lines(Some(domain), status.as_str(), color)
            }
        }
    }

    fn draw_footer(&self, frame: &mut Frame, app: &App, layout: &ScreenLayout) {
        let mut hint = String::from("Enter: Check | Ctrl-F: File | Ctrl-D: Details | Ctrl-C: Quit");
        if !app.results.is_empty() {
            hint.push_str(" | ←/→: Page");
        }
        frame.render_widget(Paragraph::new(hint), layout.footer);
    }

    fn draw_whois(&self, frame: &mut Frame, popup: &WhoisPopup, layout: &ScreenLayout) {
        let area = layout.whois;
        frame.render_widget(Clear, area);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::new().fg(Color::Cyan))
            .title(format!(" WHOIS: {} ", popup.domain()))
            .title_bottom(" ↑/↓ PgUp/PgDn: Scroll | q/Esc: Close ")
            .padding(Padding::horizontal(1));
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(
            Paragraph::new(CLOSE_GLYPH).style(Style::new().fg(Color::Red).add_modifier(Modifier::BOLD)),
            layout.close_glyph(),
        );

        let [status_row, body] =
            Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).areas(inner);

        let status = match popup.status() {
            None => Line::from(Span::styled(
                format!("Fetching WHOIS data for '{}'...", popup.domain()),
                self.palette.style(ResultKind::Info),
            )),
            Some(status) => {
                let kind = match status {
                    WhoisStatus::Success => ResultKind::Ok,
                    WhoisStatus::Error => ResultKind::Error,
                };
                let total = popup.lines().len();
                let first = (popup.scroll() + 1).min(total);
                let last = (popup.scroll() + layout.whois_rows()).min(total);
                Line::from(vec![
                    Span::styled(
                        status.as_str(),
                        self.palette.style(kind).add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!("  lines {}-{} of {}", first, last, total),
                        Style::new().add_modifier(Modifier::DIM),
                    ),
                ])
            }
        };
        frame.render_widget(Paragraph::new(status), status_row);

        let text: Vec<Line> = popup
            .lines()
            .iter()
            .skip(popup.scroll())
            .take(layout.whois_rows())
            .map(|line| Line::from(line.as_str()))
            .collect();
        frame.render_widget(Paragraph::new(text), body);
    }

    fn draw_help(&self, frame: &mut Frame, layout: &ScreenLayout) {
        let area = layout.help;
        frame.render_widget(Clear, area);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::new().fg(Color::Yellow))
            .title(" Help ")
            .title_bottom(" Press any key to close ")
            .padding(Padding::uniform(1));

        let key_style = Style::new().fg(Color::Yellow).add_modifier(Modifier::BOLD);
        let rows = HELP_ENTRIES.iter().map(|(key, description)| {
            Row::new(vec![
                Span::styled(*key, key_style),
                Span::raw(*description),
            ])
        });
        let table = Table::new(rows, [Constraint::Length(16), Constraint::Min(0)]).block(block);
        frame.render_widget(table, area);
    }
}

fn block_lines(domain: Option<&str>, message: &str, style: Style) -> Vec<Line<'static>> {
    vec![
        Line::from(Span::styled(
            format!("Domain: {}", domain.unwrap_or("N/A")),
            style,
        )),
        Line::from(message.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use sslwatch_lib::{CertStatus, CertificateReport};

    fn cert(domain: &str, days_left: i64) -> CheckResult {
        CheckResult::Certificate(CertificateReport {
            domain: domain.to_string(),
            subject_cn: domain.to_string(),
            issuer_cn: "Example CA".to_string(),
            issued_on: "2024-01-01".to_string(),
            expires_on: "2025-01-01".to_string(),
            days_left,
            status: CertStatus::from_days_left(days_left),
        })
    }

    #[test]
    fn test_layout_80x24() {
        let layout = ScreenLayout::new(Rect::new(0, 0, 80, 24));
        assert_eq!(layout.title.y, 1);
        assert_eq!(layout.prompt.y, 3);
        assert_eq!(layout.input, Rect::new(10, 5, 60, 3));
        assert_eq!(layout.output, Rect::new(2, 9, 76, 13));
        assert_eq!(layout.footer.y, 22);
        assert_eq!(layout.footer.x, 2);
        assert_eq!(layout.output_rows(), 11);
    }

    #[test]
    fn test_close_glyph_on_popup_border() {
        let layout = ScreenLayout::new(Rect::new(0, 0, 80, 24));
        let glyph = layout.close_glyph();
        assert_eq!(glyph.y, layout.whois.y);
        assert_eq!(glyph.width, 3);
        assert!(glyph.right() < layout.whois.right());
    }

    #[test]
    fn test_blocks_take_two_lines_in_both_views() {
        let block_results = [
            CheckResult::info("Please wait"),
            CheckResult::error(Some("bad.example"), "Could not resolve hostname: 'bad.example'."),
            CheckResult::Whois {
                domain: "example.com".to_string(),
                status: WhoisStatus::Success,
                data: String::new(),
            },
        ];
        for result in &block_results {
            assert_eq!(entry_height(result, false), 2);
            assert_eq!(entry_height(result, true), 2);
        }
        assert_eq!(entry_height(&cert("a.example", 90), false), 1);
        assert_eq!(entry_height(&cert("a.example", 90), true), 7);
    }

    #[test]
    fn test_entry_lines_match_height() {
        let renderer = Renderer::default();
        let results = [
            cert("a.example", 90),
            CheckResult::info("Please wait"),
            CheckResult::error(None, "File not found: 'x'"),
        ];
        for detailed in [false, true] {
            for result in &results {
                assert_eq!(
                    renderer.entry_lines(result, detailed).len(),
                    entry_height(result, detailed)
                );
            }
        }
    }

    #[test]
    fn test_page_math() {
        assert_eq!(page_size(11, false), 11);
        assert_eq!(page_size(11, true), 1);
        assert_eq!(page_size(3, true), 1);

        assert_eq!(page_info(0, 11, 0), PageInfo { current: 1, total: 1 });
        assert_eq!(page_info(23, 11, 0), PageInfo { current: 1, total: 3 });
        assert_eq!(page_info(23, 11, 22), PageInfo { current: 3, total: 3 });
    }

    #[test]
    fn test_visible_entries_stop_when_full() {
        let results: Vec<CheckResult> = (0..5).map(|i| cert(&format!("s{}.example", i), 90)).collect();

        let compact = visible_entries(&results, false, 0, 3);
        assert_eq!(compact.len(), 3);
        assert_eq!(compact[2], EntrySlot { index: 2, offset: 2, height: 1 });

        let detailed = visible_entries(&results, true, 1, 15);
        assert_eq!(detailed.len(), 2);
        assert_eq!(detailed[1], EntrySlot { index: 2, offset: 7, height: 7 });

        let mut mixed = results.clone();
        mixed.insert(1, CheckResult::error(Some("x.example"), "boom"));
        let slots = visible_entries(&mixed, false, 0, 3);
        assert_eq!(slots.len(), 2, "block entry needs two rows");
        assert_eq!(slots[1].height, 2);
    }

    #[test]
    fn test_palette_is_static() {
        let palette = Palette::default();
        assert_eq!(palette.color(ResultKind::Ok), Color::Green);
        assert_eq!(palette.color(ResultKind::Warning), Color::Yellow);
        assert_eq!(palette.color(ResultKind::Alert), Color::Red);
        assert_eq!(palette.color(ResultKind::Expired), Color::Red);
        assert_eq!(palette.color(ResultKind::Error), Color::Red);
        assert_eq!(palette.color(ResultKind::Info), Color::Cyan);
        assert_eq!(palette.color(ResultKind::Unknown), Color::Yellow);
    }
}
