use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use chatbot_core::ChatRole;
use crate::app::{App, Focus};
use crate::input::EditCursor;

// Light green used for the user's own messages
const USER_BUBBLE: Color = Color::Rgb(0xDC, 0xF8, 0xC6);

const QUESTION_HEIGHT: u16 = 6;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let file_label_height = if app.session.draft().selected_file().is_some() { 1 } else { 0 };

    let [header_area, url_area, file_area, upload_area, chat_area, question_area, submit_area, footer_area] =
        Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(file_label_height),
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(QUESTION_HEIGHT),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(area);

    render_header(app, frame, header_area);
    render_url_input(app, frame, url_area);
    if file_label_height > 0 {
        render_file_label(app, frame, file_area);
    }
    render_button(frame, upload_area, "Upload PDF", app.focus == Focus::Upload, true);
    render_messages(app, frame, chat_area);
    render_question_input(app, frame, question_area);
    render_button(
        frame,
        submit_area,
        "Submit",
        false,
        !app.session.is_awaiting_response(),
    );
    render_footer(app, frame, footer_area);

    if app.file_picker.is_some() {
        render_file_picker(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Chatbot ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.endpoint.clone(), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn border_color(focused: bool) -> Color {
    if focused { Color::Yellow } else { Color::DarkGray }
}

/// Render `value` (or `placeholder` when empty) with horizontal and vertical
/// scrolling so the cursor stays inside the box, then place the cursor.
fn render_text_field(
    frame: &mut Frame,
    area: Rect,
    block: Block,
    value: &str,
    placeholder: &str,
    cursor: &EditCursor,
    focused: bool,
) {
    let inner = block.inner(area);
    let inner_width = inner.width as usize;
    let inner_height = inner.height as usize;

    let (row, col) = cursor.row_col(value);

    // Scroll offsets keep the cursor visible
    let col_offset = if inner_width == 0 || col < inner_width { 0 } else { col - inner_width + 1 };
    let row_offset = if inner_height == 0 || row < inner_height { 0 } else { row - inner_height + 1 };

    let text = if value.is_empty() {
        Text::from(Span::styled(placeholder.to_string(), Style::default().fg(Color::DarkGray)))
    } else {
        let lines: Vec<Line> = value
            .split('\n')
            .skip(row_offset)
            .take(inner_height.max(1))
            .map(|line| Line::from(line.chars().skip(col_offset).take(inner_width).collect::<String>()))
            .collect();
        Text::from(lines)
    };

    let field = Paragraph::new(text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);
    frame.render_widget(field, area);

    if focused && inner_width > 0 && inner_height > 0 {
        frame.set_cursor_position((
            inner.x + (col - col_offset) as u16,
            inner.y + (row - row_offset) as u16,
        ));
    }
}

fn render_url_input(app: &App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == Focus::Url && app.file_picker.is_none();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(focused)))
        .title(" URL ");

    render_text_field(
        frame,
        area,
        block,
        app.session.draft().url(),
        "Enter URL",
        &app.url_cursor,
        focused,
    );
}

fn render_file_label(app: &App, frame: &mut Frame, area: Rect) {
    if let Some(file) = app.session.draft().selected_file() {
        let label = Line::from(vec![
            Span::raw(" Selected File: "),
            Span::styled(file.display_name().to_string(), Style::default().fg(Color::Magenta).bold()),
        ]);
        frame.render_widget(Paragraph::new(label), area);
    }
}

fn render_button(frame: &mut Frame, area: Rect, label: &str, focused: bool, enabled: bool) {
    let style = if !enabled {
        Style::default().fg(Color::DarkGray)
    } else if focused {
        Style::default().bg(Color::Blue).fg(Color::White).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD)
    };

    let button = Paragraph::new(Line::from(Span::styled(format!("[ {} ]", label), style)));
    frame.render_widget(button, area);
}

/// The message list as drawn, without its border. Scroll math measures this
/// same paragraph so wrapped line counts always agree with the screen.
pub fn chat_paragraph(app: &App) -> Paragraph<'static> {
    let awaiting = app.session.is_awaiting_response();
    let messages = app.session.messages();

    let chat_text = if messages.is_empty() && !awaiting {
        Text::from(Span::styled(
            "Ask a question to get started...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in messages {
            match msg.role {
                ChatRole::User => {
                    lines.push(Line::from(Span::styled(
                        "You:",
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    )));
                    let bubble = Style::default().bg(USER_BUBBLE).fg(Color::Black);
                    for line in msg.content.lines() {
                        lines.push(Line::from(Span::styled(line.to_string(), bubble)));
                    }
                }
                ChatRole::Assistant => {
                    lines.push(Line::from(Span::styled(
                        "Bot:",
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    )));
                    for line in msg.content.lines() {
                        lines.push(Line::from(line.to_string()));
                    }
                }
            }
            lines.push(Line::default());
        }

        if awaiting {
            lines.push(Line::from(Span::styled(
                "Bot:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    Paragraph::new(chat_text).wrap(Wrap { trim: false })
}

fn render_messages(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store area for mouse hit-testing and dimensions for scroll calculations
    app.set_chat_area(area);

    let focused = app.focus == Focus::Messages;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { Color::Cyan } else { Color::DarkGray }))
        .title(" Messages ");

    let chat = chat_paragraph(app)
        .block(block)
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_question_input(app: &App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == Focus::Question && app.file_picker.is_none();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(focused)))
        .title(" Question ");

    render_text_field(
        frame,
        area,
        block,
        app.session.draft().question(),
        "Enter your question",
        &app.question_cursor,
        focused,
    );
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut hints = if app.file_picker.is_some() {
        vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" select ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" cancel ", label_style),
        ]
    } else {
        match app.focus {
            Focus::Question => vec![
                Span::styled(" Enter ", key_style),
                Span::styled(" submit ", label_style),
                Span::styled(" Alt+Enter ", key_style),
                Span::styled(" newline ", label_style),
            ],
            Focus::Url => vec![
                Span::styled(" Enter ", key_style),
                Span::styled(" to question ", label_style),
            ],
            Focus::Upload => vec![
                Span::styled(" Enter ", key_style),
                Span::styled(" choose file ", label_style),
                Span::styled(" x ", key_style),
                Span::styled(" clear ", label_style),
            ],
            Focus::Messages => vec![
                Span::styled(" j/k ", key_style),
                Span::styled(" scroll ", label_style),
                Span::styled(" g/G ", key_style),
                Span::styled(" top/bottom ", label_style),
                Span::styled(" q ", key_style),
                Span::styled(" quit ", label_style),
            ],
        }
    };

    if app.file_picker.is_none() {
        hints.extend(vec![
            Span::styled(" Tab ", key_style),
            Span::styled(" focus ", label_style),
            Span::styled(" ^O ", key_style),
            Span::styled(" upload ", label_style),
            Span::styled(" ^S ", key_style),
            Span::styled(" submit ", label_style),
            Span::styled(" ^C ", key_style),
            Span::styled(" quit ", label_style),
        ]);
    }

    let footer = Paragraph::new(Line::from(hints)).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_file_picker(app: &App, frame: &mut Frame, area: Rect) {
    let Some(picker) = app.file_picker.as_ref() else {
        return;
    };

    // Calculate popup size and position (centered)
    let popup_width = 60.min(area.width.saturating_sub(4));
    let popup_height = 6.min(area.height);

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Upload PDF ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    if inner.height < 3 {
        return;
    }

    let instructions = Paragraph::new("Path or URI of the document. Enter to select, Esc to cancel.")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 1));

    let input_area = Rect::new(inner.x, inner.y + 2, inner.width, 1);
    let field = Block::default();
    render_text_field(frame, input_area, field, &picker.input, "", &picker.cursor, true);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{test_app, StaticService};
    use crate::handler::handle_event;
    use crate::tui::AppEvent;
    use chatbot_core::FileRef;
    use ratatui::{backend::TestBackend, Terminal};

    fn draw(app: &mut App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();

        let buffer = terminal.backend().buffer();
        let mut screen = String::new();
        for row in buffer.content.chunks(buffer.area.width as usize) {
            for cell in row {
                screen.push_str(cell.symbol());
            }
            screen.push('\n');
        }
        screen
    }

    #[test]
    fn test_empty_screen_shows_fields_and_triggers() {
        let (mut app, _rx) = test_app(StaticService(Ok("A")));
        let screen = draw(&mut app, 100, 30);

        assert!(screen.contains("Chatbot"));
        assert!(screen.contains("Enter URL"));
        assert!(screen.contains("[ Upload PDF ]"));
        assert!(screen.contains("Enter your question"));
        assert!(screen.contains("[ Submit ]"));
        assert!(!screen.contains("Selected File:"));
        assert_eq!(app.chat_height, 30 - 1 - 3 - 1 - QUESTION_HEIGHT - 1 - 1 - 2);
    }

    #[test]
    fn test_file_label_shows_trailing_segment() {
        let (mut app, _rx) = test_app(StaticService(Ok("A")));
        app.session.select_file(FileRef::new("content://media/docs/annual-report.pdf"));

        let screen = draw(&mut app, 100, 30);
        assert!(screen.contains("Selected File: annual-report.pdf"));
        assert!(!screen.contains("content://media"));
    }

    #[test]
    fn test_messages_render_with_roles() {
        let (mut app, _rx) = test_app(StaticService(Ok("A")));
        app.set_question("What is Rust?".to_string());
        let pending = app.session.begin_submit().unwrap();

        let screen = draw(&mut app, 100, 30);
        assert!(screen.contains("You:"));
        assert!(screen.contains("What is Rust?"));
        assert!(screen.contains("Thinking."));

        app.apply_answer(pending.ticket, Ok("A systems language.".to_string()));
        let screen = draw(&mut app, 100, 30);
        assert!(screen.contains("Bot:"));
        assert!(screen.contains("A systems language."));
        assert!(!screen.contains("Thinking"));
    }

    #[test]
    fn test_file_picker_popup() {
        let (mut app, _rx) = test_app(StaticService(Ok("A")));
        app.open_file_picker();
        if let Some(picker) = app.file_picker.as_mut() {
            picker.input = "/tmp/notes.pdf".to_string();
        }

        let screen = draw(&mut app, 100, 30);
        assert!(screen.contains("Enter to select"));
        assert!(screen.contains("/tmp/notes.pdf"));
    }

    #[test]
    fn test_newest_answer_visible_after_word_wrap() {
        let (mut app, _rx) = test_app(StaticService(Ok("A")));
        app.set_question("Q".to_string());
        let pending = app.session.begin_submit().unwrap();

        // 30x24 leaves a 28x9 message pane
        draw(&mut app, 30, 24);
        assert_eq!((app.chat_width, app.chat_height), (28, 9));

        // Short words next to long ones break well before the pane edge
        let mut answer: Vec<String> = Vec::new();
        for letter in ['a', 'b', 'c', 'd', 'e', 'f'] {
            answer.push("short".to_string());
            answer.push(letter.to_string().repeat(24));
        }
        answer.push("END_MARK".to_string());
        app.apply_answer(pending.ticket, Ok(answer.join(" ")));

        let screen = draw(&mut app, 30, 24);
        assert!(screen.contains("END_MARK"), "tail of the answer is off screen:\n{}", screen);

        let bottom = app.chat_scroll;
        app.scroll_chat_down(10);
        assert_eq!(app.chat_scroll, bottom);
        let screen = draw(&mut app, 30, 24);
        assert!(screen.contains("END_MARK"));
    }

    #[test]
    fn test_shrinking_terminal_keeps_newest_entry_in_view() {
        let (mut app, _rx) = test_app(StaticService(Ok("A")));
        app.set_question("Q".to_string());
        let pending = app.session.begin_submit().unwrap();

        let mut answer: Vec<String> = (1..=30).map(|n| format!("line {}", n)).collect();
        answer.push("END_MARK".to_string());
        app.apply_answer(pending.ticket, Ok(answer.join("\n")));

        let screen = draw(&mut app, 60, 60);
        assert!(screen.contains("END_MARK"));
        assert_eq!(app.chat_scroll, 0);

        handle_event(&mut app, AppEvent::Resize(60, 20));
        assert!(app.chat_area.is_none());

        let screen = draw(&mut app, 60, 20);
        assert!(screen.contains("END_MARK"), "newest entry lost after resize:\n{}", screen);
        assert!(!screen.contains("line 1 "));
    }
}
