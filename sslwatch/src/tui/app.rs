//! Main application state
//!
//! All state lives here and is only touched from the UI thread. Background
//! checks reach it solely through the orchestrator's result channels, which
//! are drained once per tick.

use super::event::{Action, InputContext, PageDirection, PopupScroll};
use super::popup::{Overlay, WhoisPopup};
use super::ui::{self, ScreenLayout};
use ratatui::layout::{Position, Rect};
use sslwatch_lib::{read_domains_from_file, CheckOrchestrator, CheckResult};
use tracing::{debug, info, warn};

/// What the input box is collecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Domain,
    File,
}

impl InputMode {
    pub fn toggled(self) -> Self {
        match self {
            InputMode::Domain => InputMode::File,
            InputMode::File => InputMode::Domain,
        }
    }

    pub fn prompt(self) -> &'static str {
        match self {
            InputMode::Domain => "Enter domain name:",
            InputMode::File => "Enter file path:",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            InputMode::Domain => " Domain Input ",
            InputMode::File => " Import Domains ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub mode: InputMode,
    pub detailed: bool,
    /// Index of the first result shown
    pub scroll: usize,
    pub input: String,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            mode: InputMode::Domain,
            detailed: false,
            scroll: 0,
            input: String::new(),
        }
    }
}

/// Results in arrival order.
///
/// A list holding only an Info placeholder is replaced by the next result
/// instead of growing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultList {
    entries: Vec<CheckResult>,
}

impl ResultList {
    pub fn entries(&self) -> &[CheckResult] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CheckResult> {
        self.entries.get(index)
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.entries.as_slice(), [only] if only.is_info())
    }

    /// Replace everything with a single entry.
    pub fn reset(&mut self, result: CheckResult) {
        self.entries.clear();
        self.entries.push(result);
    }

    /// Add a drained result. Returns true if it replaced the placeholder.
    pub fn absorb(&mut self, result: CheckResult) -> bool {
        if self.is_placeholder() {
            self.reset(result);
            true
        } else {
            self.entries.push(result);
            false
        }
    }
}

/// Outstanding certificate checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    active: usize,
    checking: bool,
}

impl WorkerStats {
    pub fn start(&mut self, count: usize) {
        self.active = count;
        self.checking = count > 0;
    }

    pub fn complete_one(&mut self) {
        self.active = self.active.saturating_sub(1);
        if self.active == 0 {
            self.checking = false;
        }
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn is_checking(&self) -> bool {
        self.checking
    }
}

/// Main application state
pub struct App {
    pub view: ViewState,
    pub results: ResultList,
    pub workers: WorkerStats,
    pub overlay: Overlay,
    layout: ScreenLayout,
    orchestrator: CheckOrchestrator,
    dirty: bool,
    clear_pending: bool,
    should_quit: bool,
}

impl App {
    pub fn new(orchestrator: CheckOrchestrator, area: Rect) -> Self {
        Self {
            view: ViewState::default(),
            results: ResultList::default(),
            workers: WorkerStats::default(),
            overlay: Overlay::None,
            layout: ScreenLayout::new(area),
            orchestrator,
            dirty: true,
            clear_pending: false,
            should_quit: false,
        }
    }

    pub fn layout(&self) -> &ScreenLayout {
        &self.layout
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Whether the screen must be redrawn. Resets the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Whether the terminal must be fully cleared first. Resets the flag.
    pub fn take_clear(&mut self) -> bool {
        std::mem::take(&mut self.clear_pending)
    }

    pub fn input_context(&self) -> InputContext {
        match self.overlay {
            Overlay::None => InputContext::Main,
            Overlay::Whois(_) => InputContext::WhoisPopup,
            Overlay::Help => InputContext::Help,
        }
    }

    /// Results per page in the current view.
    pub fn page_size(&self) -> usize {
        ui::page_size(self.layout.output_rows(), self.view.detailed)
    }

    /// Apply one user action to the state.
    pub fn apply(&mut self, action: Action) {
        match action {
            Action::ToggleInputMode => {
                self.view.mode = self.view.mode.toggled();
                self.view.input.clear();
                self.dirty = true;
            }
            Action::ToggleDetailView => {
                self.view.detailed = !self.view.detailed;
                self.view.scroll = 0;
                self.dirty = true;
            }
            Action::Backspace => {
                if self.view.input.pop().is_some() {
                    self.dirty = true;
                }
            }
            Action::AppendChar(c) => {
                self.view.input.push(c);
                self.dirty = true;
            }
            Action::Submit => self.submit(),
            Action::ScrollPage(direction) => self.scroll_page(direction),
            Action::OpenHelp => {
                if !self.overlay.is_open() {
                    self.overlay = Overlay::Help;
                    self.dirty = true;
                }
            }
            Action::PointerClick { row, column } => self.click(row, column),
            Action::ScrollPopup(step) => self.scroll_popup(step),
            Action::ClosePopup => self.close_overlay(),
            Action::Resize { width, height } => self.resize(width, height),
            Action::Quit => self.should_quit = true,
        }
    }

    /// Start checking whatever is in the input box.
    ///
    /// Does nothing while a previous submission is still running or when the
    /// input is blank.
    fn submit(&mut self) {
        let input = self.view.input.trim().to_string();
        if self.workers.is_checking() || input.is_empty() {
            return;
        }

        match self.view.mode {
            InputMode::Domain => {
                info!(domain = %input, "checking certificate");
                self.results.reset(CheckResult::info(format!(
                    "Please wait, checking SSL cert for '{}'...",
                    input
                )));
                let spawned = self.orchestrator.spawn_certificate_checks([input]);
                self.workers.start(spawned);
            }
            InputMode::File => {
                self.import_file(&input);
                self.view.mode = InputMode::Domain;
            }
        }

        self.view.scroll = 0;
        self.view.input.clear();
        self.dirty = true;
    }

    fn import_file(&mut self, path: &str) {
        let domains = match read_domains_from_file(path) {
            Ok(domains) => domains,
            Err(err) => {
                warn!(path, error = %err, "could not read domain file");
                self.results.reset(CheckResult::error(None, err.to_string()));
                return;
            }
        };

        if domains.is_empty() {
            warn!(path, "domain file is empty");
            self.results.reset(CheckResult::error(
                None,
                format!("No domains found in '{}'.", path),
            ));
            return;
        }

        info!(path, count = domains.len(), "importing domain file");
        self.results.reset(CheckResult::info(format!(
            "Processing {} domains from '{}'...",
            domains.len(),
            path
        )));
        let spawned = self.orchestrator.spawn_certificate_checks(domains);
        self.workers.start(spawned);
    }

    fn scroll_page(&mut self, direction: PageDirection) {
        let page = self.page_size();
        match direction {
            PageDirection::Left => {
                if self.view.scroll > 0 {
                    self.view.scroll = self.view.scroll.saturating_sub(page);
                    self.dirty = true;
                }
            }
            PageDirection::Right => {
                if self.view.scroll + page < self.results.len() {
                    self.view.scroll += page;
                    self.dirty = true;
                }
            }
        }
    }

    fn click(&mut self, row: u16, column: u16) {
        let position = Position::new(column, row);
        match self.overlay {
            Overlay::None => {
                if let Some(domain) = self.certificate_at(position) {
                    self.open_whois(domain);
                }
            }
            Overlay::Whois(_) => {
                if self.layout.close_glyph().contains(position) {
                    self.close_overlay();
                }
            }
            Overlay::Help => {}
        }
    }

    /// Domain of the certificate entry drawn at `position`, if any.
    fn certificate_at(&self, position: Position) -> Option<String> {
        let output = self.layout.output;
        if !output.contains(position) {
            return None;
        }
        // Row inside the box border
        let row = position.y.checked_sub(output.y + 1)? as usize;

        ui::visible_entries(
            self.results.entries(),
            self.view.detailed,
            self.view.scroll,
            self.layout.output_rows(),
        )
        .into_iter()
        .find(|slot| (slot.offset..slot.offset + slot.height).contains(&row))
        .and_then(|slot| match self.results.get(slot.index) {
            Some(CheckResult::Certificate(report)) => Some(report.domain.clone()),
            _ => None,
        })
    }

    fn open_whois(&mut self, domain: String) {
        let request = self.orchestrator.request_whois(&domain);
        info!(domain = %domain, ?request, "opening whois popup");
        self.overlay = Overlay::Whois(WhoisPopup::new(request, domain));
        self.dirty = true;
    }

    fn scroll_popup(&mut self, step: PopupScroll) {
        let rows = self.layout.whois_rows();
        if let Overlay::Whois(popup) = &mut self.overlay {
            let page = rows.max(1) as isize;
            let delta = match step {
                PopupScroll::LineUp => -1,
                PopupScroll::LineDown => 1,
                PopupScroll::PageUp => -page,
                PopupScroll::PageDown => page,
            };
            let before = popup.scroll();
            popup.scroll_by(delta, rows);
            if popup.scroll() != before {
                self.dirty = true;
            }
        }
    }

    /// Close any open popup. A WHOIS lookup still in flight is cancelled.
    fn close_overlay(&mut self) {
        match std::mem::replace(&mut self.overlay, Overlay::None) {
            Overlay::None => return,
            Overlay::Whois(popup) => {
                if !popup.is_fetched() {
                    self.orchestrator.cancel_whois(popup.request());
                }
            }
            Overlay::Help => {}
        }
        self.clear_pending = true;
        self.dirty = true;
    }

    fn resize(&mut self, width: u16, height: u16) {
        self.layout = ScreenLayout::new(Rect::new(0, 0, width, height));
        let rows = self.layout.whois_rows();
        if let Overlay::Whois(popup) = &mut self.overlay {
            popup.clamp_scroll(rows);
        }
        self.clear_pending = true;
        self.dirty = true;
    }

    /// Take everything the background checks have produced so far.
    pub fn drain(&mut self) {
        self.drain_certificates();
        self.drain_whois();
    }

    fn drain_certificates(&mut self) {
        while let Some(result) = self.orchestrator.try_recv_certificate() {
            debug!(domain = ?result.domain(), kind = %result.kind(), "drained result");
            if self.results.absorb(result) {
                self.view.scroll = 0;
            }
            self.workers.complete_one();
            self.dirty = true;
        }
    }

    fn drain_whois(&mut self) {
        while let Some(reply) = self.orchestrator.try_recv_whois() {
            match &mut self.overlay {
                Overlay::Whois(popup) if popup.request() == reply.request => {
                    popup.accept(reply.result);
                    self.dirty = true;
                }
                _ => debug!(request = ?reply.request, "discarding stale whois reply"),
            }
        }
    }

    /// Cancel outstanding checks before the session ends.
    pub fn shutdown(&self) {
        self.orchestrator.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sslwatch_lib::{
        CertStatus, CertificateReport, DomainInspector, ResultKind, SslWatchError, WhoisStatus,
    };
    use std::io::Write;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::NamedTempFile;
    use tokio::runtime::Runtime;

    /// Answers at once, except for "slow.example" which never finishes
    /// and "unresolvable.invalid" which fails.
    struct FakeInspector;

    #[async_trait]
    impl DomainInspector for FakeInspector {
        async fn check_certificate(&self, domain: &str) -> CheckResult {
            match domain {
                "slow.example" => std::future::pending().await,
                "unresolvable.invalid" => SslWatchError::resolve(domain).into(),
                _ => CheckResult::Certificate(CertificateReport {
                    domain: domain.to_string(),
                    subject_cn: domain.to_string(),
                    issuer_cn: "Example CA".to_string(),
                    issued_on: "2024-01-01".to_string(),
                    expires_on: "2025-01-01".to_string(),
                    days_left: 45,
                    status: CertStatus::Ok,
                }),
            }
        }

        async fn lookup_whois(&self, domain: &str) -> CheckResult {
            if domain == "slow.example" {
                std::future::pending::<()>().await;
            }
            CheckResult::Whois {
                domain: domain.to_string(),
                status: WhoisStatus::Success,
                data: format!("Domain Name: {}", domain),
            }
        }
    }

    fn app() -> (Runtime, App) {
        let runtime = Runtime::new().unwrap();
        let orchestrator = CheckOrchestrator::new(Arc::new(FakeInspector), 4, runtime.handle().clone());
        let app = App::new(orchestrator, Rect::new(0, 0, 80, 24));
        (runtime, app)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.apply(Action::AppendChar(c));
        }
    }

    fn drain_until(app: &mut App, done: impl Fn(&App) -> bool) {
        for _ in 0..400 {
            app.drain();
            if done(app) {
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("condition not reached");
    }

    fn certificates(app: &mut App, domains: &[&str]) {
        let file = domain_file(&domains.join("\n"));
        app.apply(Action::ToggleInputMode);
        type_text(app, &file.path().display().to_string());
        app.apply(Action::Submit);
        let expected = domains.len();
        drain_until(app, |app| !app.workers.is_checking() && app.results.len() == expected);
    }

    fn domain_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_domain_submit_replaces_placeholder() {
        let (_runtime, mut app) = app();
        type_text(&mut app, "  example.com ");
        app.apply(Action::Submit);

        assert!(app.workers.is_checking());
        assert_eq!(app.workers.active(), 1);
        assert!(app.results.is_placeholder());
        assert!(app.view.input.is_empty());
        assert_eq!(
            app.results.get(0),
            Some(&CheckResult::info(
                "Please wait, checking SSL cert for 'example.com'..."
            ))
        );

        drain_until(&mut app, |app| !app.workers.is_checking());
        assert_eq!(app.results.len(), 1);
        assert_eq!(app.results.get(0).map(CheckResult::kind), Some(ResultKind::Ok));
    }

    #[test]
    fn test_blank_submit_is_noop() {
        let (_runtime, mut app) = app();
        type_text(&mut app, "   ");
        app.apply(Action::Submit);
        assert!(app.results.is_empty());
        assert!(!app.workers.is_checking());
        assert_eq!(app.view.input, "   ");
    }

    #[test]
    fn test_submit_while_checking_changes_nothing() {
        let (_runtime, mut app) = app();
        type_text(&mut app, "slow.example");
        app.apply(Action::Submit);
        assert!(app.workers.is_checking());

        type_text(&mut app, "other.example");
        let view = app.view.clone();
        let results = app.results.clone();
        let workers = app.workers;

        app.apply(Action::Submit);
        app.drain();

        assert_eq!(app.view, view);
        assert_eq!(app.results, results);
        assert_eq!(app.workers, workers);
    }

    #[test]
    fn test_file_batch_drains_to_idle() {
        let (_runtime, mut app) = app();
        let file = domain_file("example.com\n\nexample.org\nunresolvable.invalid\n");

        app.apply(Action::ToggleInputMode);
        assert_eq!(app.view.mode, InputMode::File);
        type_text(&mut app, &file.path().display().to_string());
        app.apply(Action::Submit);

        assert_eq!(app.view.mode, InputMode::Domain);
        assert_eq!(app.workers.active(), 3);
        match app.results.get(0) {
            Some(CheckResult::Info { message }) => {
                assert!(message.starts_with("Processing 3 domains from '"))
            }
            other => panic!("expected placeholder, got {:?}", other),
        }

        drain_until(&mut app, |app| !app.workers.is_checking());
        assert_eq!(app.workers.active(), 0);
        assert_eq!(app.results.len(), 3);
        assert_eq!(
            app.results
                .entries()
                .iter()
                .filter(|r| r.kind() == ResultKind::Error)
                .count(),
            1
        );
    }

    #[test]
    fn test_missing_file_reports_error_and_reverts_mode() {
        let (_runtime, mut app) = app();
        app.apply(Action::ToggleInputMode);
        type_text(&mut app, "/no/such/domains.txt");
        app.apply(Action::Submit);

        assert_eq!(app.view.mode, InputMode::Domain);
        assert!(!app.workers.is_checking());
        assert_eq!(app.results.len(), 1);
        match app.results.get(0) {
            Some(CheckResult::Error { message, .. }) => {
                assert!(message.contains("/no/such/domains.txt"))
            }
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_file_spawns_nothing() {
        let (_runtime, mut app) = app();
        let file = domain_file("\n# nothing here\n\n");
        app.apply(Action::ToggleInputMode);
        type_text(&mut app, &file.path().display().to_string());
        app.apply(Action::Submit);

        assert!(!app.workers.is_checking());
        match app.results.get(0) {
            Some(CheckResult::Error { message, .. }) => {
                assert!(message.starts_with("No domains found in '"))
            }
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[test]
    fn test_toggle_mode_clears_input() {
        let (_runtime, mut app) = app();
        type_text(&mut app, "example.com");
        app.apply(Action::ToggleInputMode);
        assert!(app.view.input.is_empty());
        app.apply(Action::Backspace);
        assert!(app.view.input.is_empty());
    }

    #[test]
    fn test_paging_bounds() {
        let (_runtime, mut app) = app();
        let domains: Vec<String> = (0..15).map(|i| format!("site{}.example", i)).collect();
        let refs: Vec<&str> = domains.iter().map(String::as_str).collect();
        certificates(&mut app, &refs);
        assert_eq!(app.page_size(), 11);

        app.apply(Action::ScrollPage(PageDirection::Left));
        assert_eq!(app.view.scroll, 0);

        app.apply(Action::ScrollPage(PageDirection::Right));
        assert_eq!(app.view.scroll, 11);

        // 11 + 11 >= 15: stays on the last page
        app.apply(Action::ScrollPage(PageDirection::Right));
        assert_eq!(app.view.scroll, 11);

        app.apply(Action::ScrollPage(PageDirection::Left));
        assert_eq!(app.view.scroll, 0);
    }

    #[test]
    fn test_detail_toggle_resets_scroll() {
        let (_runtime, mut app) = app();
        let domains: Vec<String> = (0..15).map(|i| format!("site{}.example", i)).collect();
        let refs: Vec<&str> = domains.iter().map(String::as_str).collect();
        certificates(&mut app, &refs);

        app.apply(Action::ScrollPage(PageDirection::Right));
        assert_ne!(app.view.scroll, 0);
        app.apply(Action::ToggleDetailView);
        assert!(app.view.detailed);
        assert_eq!(app.view.scroll, 0);
        assert_eq!(app.page_size(), 1);
    }

    #[test]
    fn test_click_on_certificate_opens_whois() {
        let (_runtime, mut app) = app();
        certificates(&mut app, &["example.com"]);
        let domain = app.results.get(0).and_then(|r| r.domain()).map(str::to_string);

        // First row inside the output box border
        let output = app.layout().output;
        app.apply(Action::PointerClick {
            row: output.y + 1,
            column: output.x + 3,
        });
        assert_eq!(app.input_context(), InputContext::WhoisPopup);

        drain_until(&mut app, |app| match &app.overlay {
            Overlay::Whois(popup) => popup.is_fetched(),
            _ => false,
        });
        match &app.overlay {
            Overlay::Whois(popup) => {
                assert_eq!(Some(popup.domain().to_string()), domain);
                assert_eq!(popup.status(), Some(WhoisStatus::Success));
            }
            _ => unreachable!(),
        }

        app.apply(Action::ClosePopup);
        assert_eq!(app.input_context(), InputContext::Main);
        assert!(app.take_clear());
    }

    #[test]
    fn test_click_on_error_row_ignored() {
        let (_runtime, mut app) = app();
        certificates(&mut app, &["unresolvable.invalid"]);
        let output = app.layout().output;
        app.apply(Action::PointerClick {
            row: output.y + 1,
            column: output.x + 3,
        });
        assert_eq!(app.input_context(), InputContext::Main);
    }

    #[test]
    fn test_stale_whois_reply_discarded() {
        let (_runtime, mut app) = app();
        app.open_whois("slow.example".to_string());
        app.apply(Action::ClosePopup);
        app.open_whois("example.com".to_string());

        drain_until(&mut app, |app| match &app.overlay {
            Overlay::Whois(popup) => popup.is_fetched(),
            _ => false,
        });
        match &app.overlay {
            Overlay::Whois(popup) => {
                assert_eq!(popup.domain(), "example.com");
                assert_eq!(popup.lines(), ["Domain Name: example.com"]);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_close_glyph_click_closes_popup() {
        let (_runtime, mut app) = app();
        app.open_whois("example.com".to_string());
        let glyph = app.layout().close_glyph();
        app.apply(Action::PointerClick {
            row: glyph.y,
            column: glyph.x + 1,
        });
        assert!(!app.overlay.is_open());
    }

    #[test]
    fn test_certificates_drain_under_popup() {
        let (_runtime, mut app) = app();
        type_text(&mut app, "example.com");
        app.apply(Action::Submit);
        app.apply(Action::OpenHelp);
        drain_until(&mut app, |app| !app.workers.is_checking());
        assert_eq!(app.input_context(), InputContext::Help);
        assert_eq!(app.results.get(0).map(CheckResult::kind), Some(ResultKind::Ok));
    }

    #[test]
    fn test_quit() {
        let (_runtime, mut app) = app();
        assert!(!app.should_quit());
        app.apply(Action::Quit);
        assert!(app.should_quit());
    }

    #[test]
    fn test_result_list_placeholder_replaced() {
        let mut list = ResultList::default();
        list.reset(CheckResult::info("Please wait"));
        assert!(list.absorb(CheckResult::error(Some("a.example"), "boom")));
        assert_eq!(list.len(), 1);
        assert!(!list.absorb(CheckResult::error(Some("b.example"), "boom")));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_worker_stats() {
        let mut stats = WorkerStats::default();
        stats.start(2);
        assert!(stats.is_checking());
        stats.complete_one();
        assert!(stats.is_checking());
        stats.complete_one();
        assert!(!stats.is_checking());
        stats.complete_one();
        assert_eq!(stats.active(), 0);
    }
}
