use carebot_core::{render as render_reply, Block as ReplyBlock, Message, MessageKind, Segment};
use chrono::Local;
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::App;

const TYPING_TEXT: &str = "Searching for hospitals";

fn segment_spans(segments: &[Segment], emphasis: Style) -> Vec<Span<'static>> {
    segments
        .iter()
        .map(|segment| {
            if segment.emphasized {
                Span::styled(segment.text.clone(), emphasis)
            } else {
                Span::raw(segment.text.clone())
            }
        })
        .collect()
}

/// Convert rendered reply blocks into styled terminal lines
pub fn blocks_to_lines(blocks: &[ReplyBlock]) -> Vec<Line<'static>> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let title = Style::default().fg(Color::Green).add_modifier(Modifier::BOLD);
    let mut lines = Vec::new();

    for block in blocks {
        match block {
            ReplyBlock::Heading(text) => {
                lines.push(Line::from(Span::styled(
                    text.clone(),
                    bold.add_modifier(Modifier::UNDERLINED),
                )));
            }
            ReplyBlock::Paragraph(segments) => {
                lines.push(Line::from(segment_spans(segments, bold)));
            }
            ReplyBlock::OrderedList(items) => {
                for (i, item) in items.iter().enumerate() {
                    let mut spans = vec![Span::styled(
                        format!("  {}. ", i + 1),
                        Style::default().fg(Color::DarkGray),
                    )];
                    spans.extend(segment_spans(item, title));
                    lines.push(Line::from(spans));
                }
            }
            ReplyBlock::LineBreak => lines.push(Line::default()),
        }
    }

    lines
}

fn message_header(label: &'static str, color: Color, message: &Message) -> Line<'static> {
    let time = message.created_at().with_timezone(&Local).format("%H:%M").to_string();
    Line::from(vec![
        Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        Span::styled(format!("  {}", time), Style::default().fg(Color::DarkGray)),
    ])
}

fn message_lines(message: &Message) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    match message.kind() {
        MessageKind::System => {
            lines.push(
                Line::from(Span::styled(
                    message.content().to_string(),
                    Style::default().fg(Color::Green).add_modifier(Modifier::ITALIC),
                ))
                .alignment(Alignment::Center),
            );
        }
        MessageKind::User => {
            lines.push(message_header("You", Color::Cyan, message));
            lines.extend(message.content().lines().map(|l| Line::from(l.to_string())));
        }
        MessageKind::Bot => {
            lines.push(message_header("Bot", Color::Green, message));
            lines.extend(blocks_to_lines(&render_reply(message.content())));
        }
        MessageKind::Error => {
            lines.push(message_header("Error", Color::Red, message));
            lines.push(Line::from(Span::styled(
                message.content().to_string(),
                Style::default().fg(Color::Red),
            )));
        }
    }

    lines.push(Line::default());
    lines
}

/// A run of text that never breaks across rows: one word, or one gap between words
struct Token {
    spans: Vec<Span<'static>>,
    width: usize,
    is_space: bool,
}

fn tokenize(line: &Line) -> Vec<Token> {
    let mut tokens: Vec<Token> = Vec::new();

    for span in &line.spans {
        let style = line.style.patch(span.style);
        for c in span.content.chars() {
            let is_space = c.is_whitespace();
            if tokens.last().map_or(true, |token| token.is_space != is_space) {
                tokens.push(Token {
                    spans: Vec::new(),
                    width: 0,
                    is_space,
                });
            }
            let Some(token) = tokens.last_mut() else {
                continue;
            };
            let same_style = token.spans.last().is_some_and(|last| last.style == style);
            match token.spans.last_mut() {
                Some(last) if same_style => last.content.to_mut().push(c),
                _ => token.spans.push(Span::styled(c.to_string(), style)),
            }
            token.width += 1;
        }
    }

    tokens
}

/// Split `spans` after `at` characters, keeping each piece's style
fn split_spans(spans: Vec<Span<'static>>, at: usize) -> (Vec<Span<'static>>, Vec<Span<'static>>) {
    let mut head = Vec::new();
    let mut tail = Vec::new();
    let mut taken = 0;

    for span in spans {
        let len = span.content.chars().count();
        if taken >= at {
            tail.push(span);
        } else if taken + len <= at {
            taken += len;
            head.push(span);
        } else {
            let cut = at - taken;
            let first: String = span.content.chars().take(cut).collect();
            let rest: String = span.content.chars().skip(cut).collect();
            head.push(Span::styled(first, span.style));
            tail.push(Span::styled(rest, span.style));
            taken = at;
        }
    }

    (head, tail)
}

/// Wrap one styled line on word boundaries so that no row exceeds `width`
/// characters. Words longer than a row are split. Leading spaces on the
/// first row are kept; spaces at a row break are dropped.
fn wrap_line(line: &Line, width: usize) -> Vec<Line<'static>> {
    let finish_row = |spans: Vec<Span<'static>>| {
        let mut row = Line::from(spans);
        row.alignment = line.alignment;
        row
    };

    let mut rows = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut current_width = 0;

    for token in tokenize(line) {
        if token.is_space {
            if current_width == 0 && !rows.is_empty() {
                continue;
            }
            if current_width + token.width <= width {
                current.extend(token.spans);
                current_width += token.width;
            } else {
                rows.push(finish_row(std::mem::take(&mut current)));
                current_width = 0;
            }
            continue;
        }

        if current_width > 0 && current_width + token.width > width {
            rows.push(finish_row(std::mem::take(&mut current)));
            current_width = 0;
        }

        let mut spans = token.spans;
        let mut remaining = token.width;
        while current_width + remaining > width {
            let room = width - current_width;
            let (head, tail) = split_spans(spans, room);
            current.extend(head);
            rows.push(finish_row(std::mem::take(&mut current)));
            current_width = 0;
            remaining -= room;
            spans = tail;
        }
        current.extend(spans);
        current_width += remaining;
    }

    if current_width > 0 || rows.is_empty() {
        rows.push(finish_row(current));
    }

    rows
}

/// Wrap `lines` to `width` columns. The row count of the result is the
/// height the chat pane needs.
fn wrap_lines(lines: &[Line], width: u16) -> Vec<Line<'static>> {
    let width = width.max(1) as usize;
    lines.iter().flat_map(|line| wrap_line(line, width)).collect()
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    let show_banner = app.conversation.has_server_connectivity_error();

    let [header_area, chat_area, banner_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(if show_banner { 4 } else { 0 }),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    if show_banner {
        render_connection_banner(frame, banner_area);
    }
    render_input(app, frame, input_area);
    render_footer(frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let (status, status_color) = if app.conversation.is_awaiting_reply() {
        ("waiting for reply", Color::Yellow)
    } else {
        ("ready", Color::Green)
    };

    let title = Line::from(vec![
        Span::styled(" Hospital Finder ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(format!("[{}] ", status), Style::default().fg(status_color)),
        Span::styled(app.client.base_url().to_string(), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Conversation ");

    let mut lines: Vec<Line> = app
        .conversation
        .messages()
        .iter()
        .flat_map(message_lines)
        .collect();

    if app.conversation.is_awaiting_reply() {
        lines.push(Line::from(Span::styled(
            "Bot",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("{}{}", TYPING_TEXT, dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    // Inner size minus borders
    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);
    let rows = wrap_lines(&lines, inner_width);
    let total_rows = u16::try_from(rows.len()).unwrap_or(u16::MAX);
    app.update_chat_metrics(total_rows, inner_height);

    let chat = Paragraph::new(Text::from(rows))
        .block(chat_block)
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_connection_banner(frame: &mut Frame, area: Rect) {
    let banner = Paragraph::new(vec![
        Line::from(Span::styled(
            "Connection issue",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "Make sure the recommendation service is running. Press Ctrl+R to retry.",
            Style::default().fg(Color::Yellow),
        )),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow)),
    )
    .wrap(Wrap { trim: true });

    frame.render_widget(banner, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let border_color = if app.conversation.is_sending() {
        Color::DarkGray
    } else {
        Color::Yellow
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Ask for a recommendation ");

    // Calculate visible portion of input with horizontal scrolling
    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.cursor;

    // Calculate scroll offset to keep cursor visible
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);

    frame.render_widget(input, area);

    let cursor_x = (cursor_pos - scroll_offset) as u16;
    frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
}

fn render_footer(frame: &mut Frame, area: Rect) {
    let key_style = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let hints = Line::from(vec![
        Span::styled(" Enter", key_style),
        Span::raw(" send  "),
        Span::styled("Ctrl+R", key_style),
        Span::raw(" retry  "),
        Span::styled("PgUp/PgDn", key_style),
        Span::raw(" scroll  "),
        Span::styled("Esc", key_style),
        Span::raw(" quit"),
    ]);

    frame.render_widget(Paragraph::new(hints), area);
}
