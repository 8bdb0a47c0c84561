use std::sync::Arc;

use chatbot_core::{ChatSession, FileRef, MessageId, PendingQuery, QueryError, QueryService};
use ratatui::layout::Rect;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::input::EditCursor;
use crate::tui::AppEvent;
use crate::ui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Url,
    Upload,
    Messages,
    Question,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Focus::Url => Focus::Upload,
            Focus::Upload => Focus::Messages,
            Focus::Messages => Focus::Question,
            Focus::Question => Focus::Url,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Focus::Url => Focus::Question,
            Focus::Upload => Focus::Url,
            Focus::Messages => Focus::Upload,
            Focus::Question => Focus::Messages,
        }
    }
}

/// "Upload PDF" popup: the user types the location of the document
#[derive(Debug, Clone, Default)]
pub struct FilePicker {
    pub input: String,
    pub cursor: EditCursor,
}

pub struct App {
    pub should_quit: bool,
    pub focus: Focus,
    pub session: ChatSession,
    pub endpoint: String,

    // Field cursors (values live in the session draft)
    pub url_cursor: EditCursor,
    pub question_cursor: EditCursor,

    // Chat list scroll state
    pub chat_scroll: u16,
    pub chat_height: u16, // Inner height of the message list
    pub chat_width: u16,  // Inner width, for wrap calculations
    pub chat_area: Option<Rect>,

    pub file_picker: Option<FilePicker>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    client: Arc<dyn QueryService>,
    events: mpsc::UnboundedSender<AppEvent>,
    // Cancelled when the screen goes away; in-flight queries stop with it
    cancel: CancellationToken,
}

impl App {
    pub fn new(
        client: Arc<dyn QueryService>,
        events: mpsc::UnboundedSender<AppEvent>,
        endpoint: &str,
    ) -> Self {
        Self {
            should_quit: false,
            focus: Focus::Question,
            session: ChatSession::new(),
            endpoint: endpoint.to_string(),

            url_cursor: EditCursor::default(),
            question_cursor: EditCursor::default(),

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_area: None,

            file_picker: None,

            animation_frame: 0,

            client,
            events,
            cancel: CancellationToken::new(),
        }
    }

    // Field editing
    pub fn set_url(&mut self, url: String) {
        self.session.set_url(url);
    }

    pub fn set_question(&mut self, question: String) {
        self.session.set_question(question);
    }

    /// Send the drafted question to the query service in the background.
    ///
    /// The answer comes back through the event channel as `AppEvent::Answer`.
    pub fn submit_question(&mut self) {
        let Some(PendingQuery { ticket, question }) = self.session.begin_submit() else {
            return;
        };

        self.question_cursor.reset();
        self.scroll_chat_to_bottom();

        debug!(%ticket, "query submitted");

        let client = Arc::clone(&self.client);
        let events = self.events.clone();
        let token = self.cancel.child_token();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(%ticket, "query cancelled");
                }
                outcome = client.query(&question) => {
                    let _ = events.send(AppEvent::Answer { ticket, outcome });
                }
            }
        });
    }

    pub fn apply_answer(&mut self, ticket: MessageId, outcome: Result<String, QueryError>) {
        if self.session.complete(&ticket, outcome).is_some() {
            self.scroll_chat_to_bottom();
        }
    }

    // File picker
    pub fn open_file_picker(&mut self) {
        let input = self
            .session
            .draft()
            .selected_file()
            .map(|f| f.as_str().to_string())
            .unwrap_or_default();
        let mut cursor = EditCursor::default();
        cursor.end(&input);
        self.file_picker = Some(FilePicker { input, cursor });
    }

    pub fn close_file_picker(&mut self) {
        self.file_picker = None;
    }

    /// Store the typed location as the selected file; blank clears it
    pub fn confirm_file_picker(&mut self) {
        if let Some(picker) = self.file_picker.take() {
            let location = picker.input.trim();
            if location.is_empty() {
                self.session.clear_file();
            } else {
                self.session.select_file(FileRef::new(location));
            }
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.session.is_awaiting_response() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Total rendered lines of the message list at the current width
    pub fn chat_line_count(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 { self.chat_width } else { 50 };
        let lines = ui::chat_paragraph(self).line_count(wrap_width);
        u16::try_from(lines).unwrap_or(u16::MAX)
    }

    pub fn max_chat_scroll(&self) -> u16 {
        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };
        self.chat_line_count().saturating_sub(visible_height)
    }

    /// Record where the message list was laid out this frame.
    ///
    /// A view that was showing the newest entry keeps showing it when the
    /// pane changes size; otherwise the offset is clamped to the new content.
    pub fn set_chat_area(&mut self, area: Rect) {
        let pinned = self.chat_scroll >= self.max_chat_scroll();

        self.chat_area = Some(area);
        self.chat_height = area.height.saturating_sub(2);
        self.chat_width = area.width.saturating_sub(2);

        if pinned {
            self.scroll_chat_to_bottom();
        } else {
            self.chat_scroll = self.chat_scroll.min(self.max_chat_scroll());
        }
    }

    /// The terminal changed size. The old chat rect no longer matches the
    /// screen, so mouse hits are ignored until the next draw lays it out.
    pub fn resized(&mut self, width: u16, height: u16) {
        debug!(width, height, "terminal resized");
        self.chat_area = None;
    }

    /// Scroll the message list so the newest entry is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        self.chat_scroll = self.max_chat_scroll();
    }

    pub fn scroll_chat_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.max_chat_scroll());
    }

    pub fn scroll_chat_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn half_page(&self) -> u16 {
        (self.chat_height / 2).max(1)
    }

    pub fn shutdown(&mut self) {
        self.cancel.cancel();
        self.should_quit = true;
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
