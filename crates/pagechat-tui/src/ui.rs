use pagechat_core::config::TOKEN_SETTINGS_URL;
use pagechat_core::{ChatRole, DisplayEntry, EntryBody};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, InputMode, Popup, TextInput};

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("**") {
        let after = &rest[start + 2..];
        match after.find("**") {
            Some(end) if end > 0 => {
                if start > 0 {
                    spans.push(Span::raw(rest[..start].to_string()));
                }
                spans.push(Span::styled(
                    after[..end].to_string(),
                    Style::default().add_modifier(Modifier::BOLD),
                ));
                rest = &after[end + 2..];
            }
            // No closing marker, keep the remainder literal
            _ => break,
        }
    }

    if !rest.is_empty() {
        spans.push(Span::raw(rest.to_string()));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

fn role_style(role: ChatRole) -> Style {
    let color = match role {
        ChatRole::User => Color::Cyan,
        ChatRole::Assistant => Color::Yellow,
        ChatRole::System => Color::Blue,
        ChatRole::Error => Color::Red,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, chat, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    if let Some(popup) = &app.popup {
        render_popup(popup, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let page = app
        .current_page()
        .map(|url| format!(" [{}]", url))
        .unwrap_or_else(|| " [no page open]".to_string());

    let title = Line::from(vec![
        Span::styled(" PageChat ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(page, Style::default().fg(Color::White)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn entry_lines(entry: &DisplayEntry, expand_context: bool, animation_frame: u8) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        format!("{}:", entry.role.label()),
        role_style(entry.role),
    ))];

    match &entry.body {
        EntryBody::Pending => {
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }
        EntryBody::Failed(_) => {
            lines.push(Line::from(Span::styled(entry.text(), Style::default().fg(Color::Red))));
        }
        EntryBody::PageContext { preview, full } => {
            if expand_context {
                lines.extend(full.lines().map(|line| Line::from(line.to_string())));
            } else {
                lines.push(Line::from(vec![
                    Span::raw(preview.clone()),
                    Span::styled(" (x to expand)", Style::default().fg(Color::DarkGray)),
                ]));
            }
        }
        EntryBody::Text(text) if entry.role == ChatRole::Assistant => {
            lines.extend(text.lines().map(parse_markdown_line));
        }
        EntryBody::Text(text) => {
            let style = if entry.role == ChatRole::Error {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };
            lines.extend(text.lines().map(|line| Line::styled(line.to_string(), style)));
        }
    }

    lines.push(Line::default());
    lines
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" {} ", app.model_name));

    let display = app.controller.display();
    let chat_text = if display.entries().is_empty() && display.notice().is_none() {
        Text::from(Span::styled(
            "Ask a question, or open a page with o and extract it with e...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();
        if let Some(notice) = display.notice() {
            lines.push(Line::from(Span::styled(
                notice.to_string(),
                Style::default().fg(Color::Green).add_modifier(Modifier::ITALIC),
            )));
            lines.push(Line::default());
        }
        for entry in display.entries() {
            lines.extend(entry_lines(entry, app.expand_context, app.animation_frame));
        }
        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

/// Visible slice of `input` and the cursor column within it.
fn visible_input(input: &TextInput, width: usize) -> (String, u16) {
    let scroll_offset = if width == 0 {
        0
    } else {
        (input.cursor + 1).saturating_sub(width)
    };

    let visible: String = input.value.chars().skip(scroll_offset).take(width).collect();
    (visible, (input.cursor - scroll_offset) as u16)
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing && app.popup.is_none();
    let border_color = if editing { Color::Yellow } else { Color::DarkGray };

    let title = if app.controller.is_awaiting_response() {
        " Ask (waiting for response) "
    } else {
        " Ask "
    };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let (visible_text, cursor_x) = visible_input(&app.input, inner_width);

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);
    frame.render_widget(input, area);

    if editing {
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" INSERT ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let keys: &[(&str, &str)] = match (&app.popup, app.input_mode) {
        (Some(_), _) => &[("Enter", "save"), ("Esc", "cancel")],
        (None, InputMode::Editing) => &[("Enter", "send"), ("Esc", "commands"), ("^C", "quit")],
        (None, InputMode::Normal) => &[
            ("i", "ask"),
            ("o", "open page"),
            ("e", "extract"),
            ("1-3", "quick ask"),
            ("x", "context"),
            ("c", "clear"),
            ("t", "token"),
            ("g", "get token"),
            ("j/k", "scroll"),
            ("q", "quit"),
        ],
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    for (key, label) in keys {
        spans.push(Span::styled(format!(" {} ", key), key_style));
        spans.push(Span::styled(format!(" {} ", label), label_style));
    }
    if let Some(status) = &app.status {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(status.clone(), Style::default().fg(Color::Magenta)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Mask a token, keeping only the last four characters readable.
fn mask_token(token: &str) -> String {
    let count = token.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let last_four: String = token.chars().skip(count - 4).collect();
    format!("{}...{}", "*".repeat((count - 4).min(20)), last_four)
}

fn render_popup(popup: &Popup, frame: &mut Frame, area: Rect) {
    let (title, instructions, input) = match popup {
        Popup::Token(input) => (
            " Hugging Face API Token ",
            format!("Paste a token from {} (Enter to save, Esc to cancel)", TOKEN_SETTINGS_URL),
            input,
        ),
        Popup::OpenPage(input) => (
            " Open Page ",
            "URL or path to an HTML file (Enter to open, Esc to cancel)".to_string(),
            input,
        ),
    };

    // Calculate popup size and position (centered)
    let popup_width = 70.min(area.width.saturating_sub(4));
    let popup_height = 8;
    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(title);
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let instructions = Paragraph::new(instructions)
        .style(Style::default().fg(Color::DarkGray))
        .wrap(Wrap { trim: true });
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 2));

    let input_area = Rect::new(inner.x, inner.y + 3, inner.width, 1);
    let (text, cursor_x) = match popup {
        Popup::Token(_) => {
            let masked = mask_token(&input.value);
            let width = masked.chars().count() as u16;
            (masked, width.min(input_area.width))
        }
        Popup::OpenPage(_) => visible_input(input, input_area.width as usize),
    };
    frame.render_widget(Paragraph::new(text).style(Style::default().fg(Color::Cyan)), input_area);
    frame.set_cursor_position((input_area.x + cursor_x, input_area.y));

    let status = Paragraph::new(format!("{} characters", input.value.chars().count()))
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(status, Rect::new(inner.x, inner.y + 5, inner.width, 1));
}
