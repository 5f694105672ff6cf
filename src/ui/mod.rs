mod theme;

use crate::app::{AppModel, ArchiveListView, Screen, SessionDetailView, View};
use crate::domain::{ARCHIVE_LOCATION_LABEL, Segment, SessionRecord, parse_segments};
use ratatui::prelude::*;
use ratatui::widgets::*;
use std::rc::Rc;
use unicode_width::UnicodeWidthStr;

pub const NOT_FOUND_MESSAGE: &str = "FILE NOT FOUND OR CORRUPTED.";
const RETURN_LABEL: &str = "[ RETURN ]";
const CLOSE_LABEL: &str = "[×]";
const END_OF_LOG: &str = "--- END OF LOG ---";
const EMPTY_ARCHIVE: &str = "DIRECTORY EMPTY";
/// Display-only address shown in the detail header.
const CHATLOG_URL_BASE: &str = "https://centralgpt.onion/chatlog/";

pub fn render(frame: &mut Frame, model: &AppModel) {
    let full_area = frame.area();
    if full_area.width == 0 || full_area.height == 0 {
        return;
    }

    render_title_bar(frame, full_area, model);

    let chunks = screen_chunks(full_area);
    match &model.view {
        View::Home => render_home(frame, &chunks, model),
        View::Archive(list_view) => render_archive(frame, &chunks, model, list_view),
        View::SessionDetail(detail_view) => {
            render_session_detail(frame, &chunks, model, detail_view)
        }
    }

    if model.help_open {
        render_help_overlay(frame, content_area(full_area), &model.view);
    }
}

/// Keeps the detail scroll offset inside the rendered content, so `End` followed by `Up`
/// moves immediately.
pub fn clamp_scroll_state(model: &mut AppModel) {
    let terminal_size = model.terminal_size;
    if let View::SessionDetail(view) = &mut model.view {
        let max_scroll = detail_max_scroll(terminal_size, view);
        view.scroll = view.scroll.min(max_scroll);
    }
}

/// The list area on the archive screen and the scrolling body on the detail screen.
pub fn body_area(terminal_size: (u16, u16)) -> Rect {
    screen_chunks(terminal_rect(terminal_size))[1]
}

/// Clickable regions that navigate back from a detail view: the header close button in both
/// states, plus the return button in the not-found state.
pub fn detail_back_targets(terminal_size: (u16, u16), view: &SessionDetailView) -> Vec<Rect> {
    let chunks = screen_chunks(terminal_rect(terminal_size));
    let mut targets = Vec::new();
    if let Some(close) = close_button_rect(chunks[0]) {
        targets.push(close);
    }
    if view.is_not_found() {
        if let Some(back) = return_button_rect(chunks[1]) {
            targets.push(back);
        }
    }
    targets
}

pub fn rect_contains(area: Rect, col: u16, row: u16) -> bool {
    col >= area.x
        && col < area.x.saturating_add(area.width)
        && row >= area.y
        && row < area.y.saturating_add(area.height)
}

pub fn line_to_plain(line: &Line) -> String {
    line.spans.iter().map(|span| span.content.as_ref()).collect()
}

fn terminal_rect(terminal_size: (u16, u16)) -> Rect {
    let (width, height) = terminal_size;
    Rect {
        x: 0,
        y: 0,
        width,
        height,
    }
}

fn content_area(full_area: Rect) -> Rect {
    if full_area.height > 1 {
        Rect {
            x: full_area.x,
            y: full_area.y.saturating_add(1),
            width: full_area.width,
            height: full_area.height.saturating_sub(1),
        }
    } else {
        full_area
    }
}

fn inner_area(area: Rect) -> Rect {
    if area.width < 40 || area.height < 12 {
        return area;
    }
    area.inner(Margin {
        vertical: 1,
        horizontal: 2,
    })
}

/// Header (3 rows), body, footer (1 row) below the title bar.
fn screen_chunks(full_area: Rect) -> Rc<[Rect]> {
    let area = inner_area(content_area(full_area));
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area)
}

fn close_button_rect(header: Rect) -> Option<Rect> {
    let width = UnicodeWidthStr::width(CLOSE_LABEL) as u16;
    if header.height < 3 || header.width < width.saturating_add(6) {
        return None;
    }
    Some(Rect {
        x: header.x + header.width - 2 - width,
        y: header.y + 1,
        width,
        height: 1,
    })
}

fn return_button_rect(body: Rect) -> Option<Rect> {
    let width = UnicodeWidthStr::width(RETURN_LABEL) as u16;
    if body.height < 5 || body.width < width.saturating_add(4) {
        return None;
    }
    Some(Rect {
        x: body.x + 2,
        y: body.y + 3,
        width,
        height: 1,
    })
}

fn panel_block(title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::BORDER))
        .padding(Padding::horizontal(1))
        .title(Span::styled(
            format!(" {title} "),
            Style::default()
                .fg(theme::ACCENT)
                .add_modifier(Modifier::BOLD),
        ))
}

fn render_title_bar(frame: &mut Frame, area: Rect, model: &AppModel) {
    let bar_area = Rect {
        x: area.x,
        y: area.y,
        width: area.width,
        height: 1,
    };

    let base_style = Style::default().fg(theme::FG).bg(theme::BAR_BG);
    let location = match &model.view {
        View::Home => Screen::Home.label().to_string(),
        View::Archive(_) => Screen::ArchiveList.label().to_string(),
        View::SessionDetail(view) => match &view.record {
            Some(record) => record.display_name(),
            None => Screen::NotFound.label().to_string(),
        },
    };

    let name = " chatlogs ";
    let location = format!(" · {location}");
    let hint = "F1 help ";
    let used = UnicodeWidthStr::width(name)
        + UnicodeWidthStr::width(location.as_str())
        + UnicodeWidthStr::width(hint);
    let remaining = (bar_area.width as usize).saturating_sub(used);

    let spans = vec![
        Span::styled(
            name,
            Style::default()
                .fg(theme::ACCENT)
                .bg(theme::BAR_BG)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(location, base_style),
        Span::styled(" ".repeat(remaining), base_style),
        Span::styled(hint, Style::default().fg(theme::DIM).bg(theme::BAR_BG)),
    ];

    frame.render_widget(Paragraph::new(Line::from(spans)).style(base_style), bar_area);
}

fn render_home(frame: &mut Frame, chunks: &[Rect], model: &AppModel) {
    let header = Paragraph::new(Span::styled(
        "Recorded conversation sessions",
        Style::default().fg(theme::MUTED),
    ))
    .block(panel_block("CHAT ARCHIVE"));
    frame.render_widget(header, chunks[0]);

    let count = model.data.records.len();
    let noun = if count == 1 { "session" } else { "sessions" };
    let body = Paragraph::new(vec![
        Line::from(""),
        Line::from(format!("{count} {noun} archived in {ARCHIVE_LOCATION_LABEL}")),
        Line::from(""),
        Line::from(vec![
            Span::styled(
                "[ Enter ]",
                Style::default()
                    .fg(theme::ACCENT)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" open server logs"),
        ]),
        Line::from(vec![
            Span::styled("[ q ]", Style::default().fg(theme::MUTED)),
            Span::raw("     quit"),
        ]),
    ])
    .block(panel_block("HOME"));
    frame.render_widget(body, chunks[1]);

    frame.render_widget(
        footer_paragraph(
            "Keys: Enter=open logs  q/Esc=quit  Ctrl+R=reload  F1/?=help",
            model,
        ),
        chunks[2],
    );
}

fn render_archive(
    frame: &mut Frame,
    chunks: &[Rect],
    model: &AppModel,
    list_view: &ArchiveListView,
) {
    let records = &model.data.records;

    let header_width = (chunks[0].width as usize).saturating_sub(4);
    let header =
        Paragraph::new(archive_header_line(records.len(), header_width)).block(panel_block("SERVER LOGS"));
    frame.render_widget(header, chunks[0]);

    if records.is_empty() {
        let empty = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled("∅", Style::default().fg(theme::DIM))).centered(),
            Line::from(""),
            Line::from(Span::styled(EMPTY_ARCHIVE, Style::default().fg(theme::MUTED))).centered(),
        ])
        .block(panel_block("LOGS"));
        frame.render_widget(empty, chunks[1]);
    } else {
        let list_area = chunks[1];
        let max_width = (list_area.width as usize).saturating_sub(6);
        let size_col_width = size_column_width(records);
        let items: Vec<ListItem> = records
            .iter()
            .map(|record| archive_list_item(record, max_width, size_col_width))
            .collect();

        let list = List::new(items)
            .block(panel_block("LOGS"))
            .highlight_style(
                Style::default()
                    .fg(theme::FG)
                    .bg(theme::ACCENT_BG)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▸ ");

        let mut state = ListState::default();
        state.select(Some(
            list_view.selected.min(records.len().saturating_sub(1)),
        ));
        frame.render_stateful_widget(list, list_area, &mut state);
    }

    frame.render_widget(
        footer_paragraph(
            "Keys: arrows=move  PgUp/PgDn=page  Enter/click=open  Esc=home  Ctrl+R=reload  Ctrl+Q=quit  F1/?=help",
            model,
        ),
        chunks[2],
    );
}

fn archive_header_line(count: usize, width: usize) -> Line<'static> {
    let left = format!("FILES FOUND: {count}");
    let right = format!("DIRECTORY: {ARCHIVE_LOCATION_LABEL}");
    let used = UnicodeWidthStr::width(left.as_str()) + UnicodeWidthStr::width(right.as_str());
    let style = Style::default().fg(theme::MUTED);

    if used + 2 > width {
        return Line::from(Span::styled(
            truncate_end(&format!("{left}  ·  {right}"), width),
            style,
        ));
    }

    Line::from(vec![
        Span::styled(left, style),
        Span::raw(" ".repeat(width - used)),
        Span::styled(right, Style::default().fg(theme::DIM)),
    ])
}

fn size_column_width(records: &[SessionRecord]) -> usize {
    records
        .iter()
        .map(|record| record.size_metric().to_string().len())
        .max()
        .unwrap_or(0)
}

fn archive_row_meta(record: &SessionRecord, size_col_width: usize) -> String {
    format!(
        "SIZE: {} B  ·  DATE: {}  ·  USER: {}",
        pad_left(&record.size_metric().to_string(), size_col_width),
        record.timestamp,
        record.username
    )
}

fn archive_list_item(
    record: &SessionRecord,
    max_width: usize,
    size_col_width: usize,
) -> ListItem<'static> {
    if max_width == 0 {
        return ListItem::new(Line::from(""));
    }

    let name = record.display_name();
    let meta = archive_row_meta(record, size_col_width);
    let meta_style = Style::default().fg(theme::DIM);

    let name_width = UnicodeWidthStr::width(name.as_str());
    let meta_width = UnicodeWidthStr::width(meta.as_str());
    let gap = 2usize;
    if name_width + gap + meta_width > max_width {
        let joined = truncate_end(&format!("{name}  {meta}"), max_width);
        return ListItem::new(Line::from(Span::raw(joined)));
    }

    let padding_width = max_width - name_width - meta_width;
    ListItem::new(Line::from(vec![
        Span::styled(name, Style::default().fg(theme::FG)),
        Span::raw(" ".repeat(padding_width)),
        Span::styled(meta, meta_style),
    ]))
}

fn render_session_detail(
    frame: &mut Frame,
    chunks: &[Rect],
    model: &AppModel,
    detail_view: &SessionDetailView,
) {
    let Some(record) = &detail_view.record else {
        render_not_found(frame, chunks, model);
        return;
    };

    let header_width = (chunks[0].width as usize)
        .saturating_sub(4)
        .saturating_sub(UnicodeWidthStr::width(CLOSE_LABEL) + 1);
    let address = format!("{CHATLOG_URL_BASE}{}", record.id);
    let header = Paragraph::new(Span::styled(
        truncate_end(&address, header_width),
        Style::default().fg(theme::MUTED),
    ))
    .block(panel_block("SESSION LOG"));
    frame.render_widget(header, chunks[0]);
    render_close_button(frame, chunks[0]);

    let body = chunks[1];
    let content_width = body.width.saturating_sub(4) as usize;
    let block = panel_block("LOG").title_top(
        Line::from(Span::styled(
            " CONFIDENTIAL ",
            Style::default().fg(theme::ACCENT_BG),
        ))
        .right_aligned(),
    );
    let paragraph = Paragraph::new(session_detail_lines(record, content_width))
        .wrap(Wrap { trim: false })
        .scroll((detail_view.scroll, 0))
        .block(block);
    frame.render_widget(Clear, body);
    frame.render_widget(paragraph, body);

    frame.render_widget(
        footer_paragraph(
            "Keys: arrows=scroll  PgUp/PgDn=page  Home/End  Esc/×=back  Ctrl+Q=quit  F1/?=help",
            model,
        ),
        chunks[2],
    );
}

fn render_not_found(frame: &mut Frame, chunks: &[Rect], model: &AppModel) {
    let header = Paragraph::new(Span::styled(
        format!("{CHATLOG_URL_BASE}?"),
        Style::default().fg(theme::MUTED),
    ))
    .block(panel_block("SESSION LOG"));
    frame.render_widget(header, chunks[0]);
    render_close_button(frame, chunks[0]);

    let body = chunks[1];
    let block = panel_block("LOG");
    let inner = block.inner(body);
    frame.render_widget(block, body);
    frame.render_widget(
        Paragraph::new(Span::styled(
            NOT_FOUND_MESSAGE,
            Style::default()
                .fg(theme::ERROR)
                .add_modifier(Modifier::BOLD),
        )),
        Rect {
            height: inner.height.min(1),
            ..inner
        },
    );
    if let Some(button) = return_button_rect(body) {
        frame.render_widget(
            Paragraph::new(Span::styled(
                RETURN_LABEL,
                Style::default()
                    .fg(theme::FG)
                    .bg(theme::ACCENT_BG)
                    .add_modifier(Modifier::BOLD),
            )),
            button,
        );
    }

    frame.render_widget(
        footer_paragraph("Keys: Enter/Esc=return  Ctrl+Q=quit", model),
        chunks[2],
    );
}

fn render_close_button(frame: &mut Frame, header: Rect) {
    if let Some(button) = close_button_rect(header) {
        frame.render_widget(
            Paragraph::new(Span::styled(
                CLOSE_LABEL,
                Style::default()
                    .fg(theme::MUTED)
                    .add_modifier(Modifier::BOLD),
            )),
            button,
        );
    }
}

fn detail_max_scroll(terminal_size: (u16, u16), view: &SessionDetailView) -> u16 {
    let Some(record) = &view.record else {
        return 0;
    };
    let body = body_area(terminal_size);
    let width = body.width.saturating_sub(4);
    let height = body.height.saturating_sub(2) as usize;
    if width == 0 {
        return 0;
    }

    let total = Paragraph::new(session_detail_lines(record, width as usize))
        .wrap(Wrap { trim: false })
        .line_count(width);
    u16::try_from(total.saturating_sub(height)).unwrap_or(u16::MAX)
}

/// Full detail body for one record. Only called for a present record; the not-found state
/// never parses anything.
pub fn session_detail_lines(record: &SessionRecord, width: usize) -> Vec<Line<'static>> {
    let fg = Style::default().fg(theme::FG);
    let dim = Style::default().fg(theme::DIM);
    let mut lines = Vec::new();

    lines.push(Line::from(Span::styled(
        format!("SESSION LOG: {}", record.id),
        fg.add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(Span::styled(
        format!("TIMESTAMP: {}", record.timestamp),
        dim,
    )));
    lines.push(Line::from(Span::styled(
        format!("PARTICIPANTS: {} & {}", record.username, record.ai_name),
        dim,
    )));
    lines.push(Line::from(Span::styled(
        "─".repeat(width.max(1)),
        Style::default().fg(theme::BORDER),
    )));
    lines.push(Line::from(""));

    let input_style = Style::default().fg(theme::MUTED);
    lines.push(Line::from(Span::styled(
        "INPUT (USER)",
        input_style.add_modifier(Modifier::BOLD),
    )));
    for text in content_lines(&record.user_message) {
        lines.push(Line::from(vec![
            Span::styled("│ ", input_style),
            Span::styled(text, fg),
        ]));
    }
    lines.push(Line::from(""));

    let output_style = Style::default().fg(theme::ACCENT);
    lines.push(Line::from(Span::styled(
        format!("OUTPUT ({})", record.ai_name).to_uppercase(),
        output_style.add_modifier(Modifier::BOLD),
    )));
    let segments = parse_segments(&record.ai_response);
    if segments.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("│ ", output_style),
            Span::styled("(no response)", dim),
        ]));
    }
    for line in segment_lines(&segments, width.saturating_sub(2)) {
        let mut spans = vec![Span::styled("│ ", output_style)];
        spans.extend(line.spans);
        lines.push(Line::from(spans));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(END_OF_LOG, dim)).centered());
    lines
}

/// Text segments become plain lines; code segments become a framed block whose top edge
/// carries the language tag.
pub fn segment_lines(segments: &[Segment], width: usize) -> Vec<Line<'static>> {
    let text_style = Style::default().fg(theme::FG);
    let mut lines = Vec::new();
    for segment in segments {
        match segment {
            Segment::Text { content } => {
                for text in content_lines(content) {
                    lines.push(Line::from(Span::styled(text, text_style)));
                }
            }
            Segment::Code { content, language } => {
                lines.extend(code_block_lines(content, language, width));
            }
        }
    }
    lines
}

fn code_block_lines(content: &str, language: &str, width: usize) -> Vec<Line<'static>> {
    let frame_style = Style::default().fg(theme::CODE_FRAME);
    let code_style = Style::default().fg(theme::CODE_FG);

    let corner = "╭─";
    let label = format!(" {} ", language.to_uppercase());
    let used = UnicodeWidthStr::width(corner) + UnicodeWidthStr::width(label.as_str());
    let fill = width.saturating_sub(used).max(1);

    let mut lines = vec![Line::from(vec![
        Span::styled(corner, frame_style),
        Span::styled(label, frame_style.add_modifier(Modifier::BOLD)),
        Span::styled("─".repeat(fill), frame_style),
    ])];
    for code in content_lines(content) {
        lines.push(Line::from(vec![
            Span::styled("│ ", frame_style),
            Span::styled(code, code_style),
        ]));
    }
    lines.push(Line::from(Span::styled(
        format!("╰{}", "─".repeat(width.saturating_sub(1).max(1))),
        frame_style,
    )));
    lines
}

const TAB_STOP: usize = 4;

/// Lines of `text` as written, minus one trailing line break. Tabs become spaces up to the
/// next tab stop; a raw tab in a cell would move the terminal cursor.
fn content_lines(text: &str) -> Vec<String> {
    let text = text.strip_suffix('\n').unwrap_or(text);
    text.split('\n')
        .map(|line| expand_tabs(line.strip_suffix('\r').unwrap_or(line)))
        .collect()
}

fn expand_tabs(line: &str) -> String {
    if !line.contains('\t') {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len() + TAB_STOP);
    let mut column = 0usize;
    for ch in line.chars() {
        if ch == '\t' {
            let pad = TAB_STOP - column % TAB_STOP;
            out.extend(std::iter::repeat_n(' ', pad));
            column += pad;
        } else {
            out.push(ch);
            column += unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        }
    }
    out
}

fn footer_with_notices(mut base: String, notices: [Option<&str>; 1]) -> String {
    for notice in notices {
        let Some(message) = notice else {
            continue;
        };
        if message.trim().is_empty() {
            continue;
        }
        base.push_str("  ·  ");
        base.push_str(message);
    }
    base
}

fn footer_paragraph(keys: &str, model: &AppModel) -> Paragraph<'static> {
    let warnings = model.data.warnings.get();
    let base = if warnings == 0 {
        keys.to_string()
    } else {
        format!("{keys}  ·  warnings: {warnings}")
    };
    Paragraph::new(footer_with_notices(base, [model.notice.as_deref()]))
        .style(Style::default().fg(theme::DIM))
}

fn render_help_overlay(frame: &mut Frame, area: Rect, view: &View) {
    let popup = centered_rect(70, 60, area);
    frame.render_widget(Clear, popup);

    let mut lines = vec![
        Line::from(Span::styled(
            "Global",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from("  Ctrl+Q / Ctrl+C   quit"),
        Line::from("  Ctrl+R            reload the archive"),
        Line::from("  F1 / ?            toggle this help"),
        Line::from(""),
    ];
    let (title, keys): (&str, Vec<&str>) = match view {
        View::Home => ("Home", vec!["  Enter   open server logs", "  q/Esc   quit"]),
        View::Archive(_) => (
            "Server logs",
            vec![
                "  ↑/↓ PgUp/PgDn Home/End   move selection",
                "  Enter / click            open the selected log",
                "  Esc                      back to home",
            ],
        ),
        View::SessionDetail(_) => (
            "Session log",
            vec![
                "  ↑/↓ PgUp/PgDn Home/End   scroll",
                "  Esc / q / [×]            back to server logs",
            ],
        ),
    };
    lines.push(Line::from(Span::styled(
        title,
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.extend(keys.into_iter().map(Line::from));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Press any key to close.",
        Style::default().fg(theme::DIM),
    )));

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(panel_block("HELP"));
    frame.render_widget(paragraph, popup);
}

fn pad_left(text: &str, width: usize) -> String {
    let current = UnicodeWidthStr::width(text);
    if current >= width {
        return text.to_string();
    }
    format!("{}{}", " ".repeat(width.saturating_sub(current)), text)
}

fn truncate_end(text: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }
    if UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }
    let ellipsis = "…";
    let available = max_width.saturating_sub(UnicodeWidthStr::width(ellipsis));
    let mut out = String::new();
    let mut used = 0usize;
    for ch in text.chars() {
        let ch_width = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + ch_width > available {
            break;
        }
        used += ch_width;
        out.push(ch);
    }
    out.push_str(ellipsis);
    out
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppData;
    use crate::domain::SessionId;
    use crate::infra::ArchiveLoad;
    use ratatui::backend::TestBackend;
    use std::path::PathBuf;

    fn record(id: SessionId, user_message: &str, ai_response: &str) -> SessionRecord {
        SessionRecord {
            id,
            timestamp: "2026-10-19 08:30".to_string(),
            username: "morpheus".to_string(),
            ai_name: "CentralGPT".to_string(),
            user_message: user_message.to_string(),
            ai_response: ai_response.to_string(),
        }
    }

    fn model_with(records: Vec<SessionRecord>) -> AppModel {
        let data = AppData::from_load(
            PathBuf::from("/tmp/archive.json"),
            ArchiveLoad {
                records,
                ..ArchiveLoad::default()
            },
        );
        AppModel::new(data).with_terminal_size(120, 30)
    }

    fn draw(model: &AppModel) -> String {
        let (width, height) = model.terminal_size;
        let mut terminal = Terminal::new(TestBackend::new(width, height)).expect("terminal");
        terminal.draw(|frame| render(frame, model)).expect("draw");
        let buffer = terminal.backend().buffer().clone();
        (0..height)
            .map(|y| {
                (0..width)
                    .map(|x| buffer.cell((x, y)).map(|cell| cell.symbol()).unwrap_or(" "))
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn plain(lines: &[Line]) -> Vec<String> {
        lines.iter().map(line_to_plain).collect()
    }

    #[test]
    fn empty_archive_renders_empty_state() {
        let model = model_with(Vec::new()).navigate(Screen::ArchiveList);
        let screen = draw(&model);
        assert!(screen.contains("FILES FOUND: 0"));
        assert!(screen.contains("DIRECTORY: /var/logs/chat_history/"));
        assert!(screen.contains(EMPTY_ARCHIVE));
    }

    #[test]
    fn archive_rows_show_name_size_date_and_user() {
        let model = model_with(vec![record(SessionId::from(7), "hé", "llo")])
            .navigate(Screen::ArchiveList);
        let screen = draw(&model);
        assert!(screen.contains("FILES FOUND: 1"));
        assert!(screen.contains("log_7_session.txt"));
        assert!(screen.contains("SIZE: 5 B"));
        assert!(screen.contains("DATE: 2026-10-19 08:30"));
        assert!(screen.contains("USER: morpheus"));
        assert!(!screen.contains(EMPTY_ARCHIVE));
    }

    #[test]
    fn duplicate_ids_render_as_separate_rows() {
        let model = model_with(vec![
            record(SessionId::from(5), "a", "b"),
            record(SessionId::from(5), "c", "d"),
        ])
        .navigate(Screen::ArchiveList);
        let screen = draw(&model);
        assert_eq!(screen.matches("log_5_session.txt").count(), 2);
    }

    #[test]
    fn rows_follow_caller_order() {
        let model = model_with(vec![
            record(SessionId::from("zeta"), "", ""),
            record(SessionId::from("alpha"), "", ""),
        ])
        .navigate(Screen::ArchiveList);
        let screen = draw(&model);
        let zeta = screen.find("log_zeta_session.txt").expect("zeta row");
        let alpha = screen.find("log_alpha_session.txt").expect("alpha row");
        assert!(zeta < alpha);
    }

    #[test]
    fn code_fence_renders_as_labeled_frame() {
        let r = record(SessionId::from(1), "run it", "```py\nprint(1)\n```");
        let lines = plain(&session_detail_lines(&r, 40));
        let top = lines
            .iter()
            .position(|line| line.contains("╭─ PY "))
            .expect("framed block");
        assert_eq!(lines[top + 1], "│ │ print(1)");
        assert!(lines[top + 2].starts_with("│ ╰─"));
    }

    #[test]
    fn text_and_code_segments_interleave_in_order() {
        let r = record(SessionId::from(1), "", "a```js\ncode\n```b");
        let lines = plain(&session_detail_lines(&r, 40));
        let output = lines
            .iter()
            .position(|line| line == "OUTPUT (CENTRALGPT)")
            .expect("output label");
        assert_eq!(lines[output + 1], "│ a");
        assert!(lines[output + 2].starts_with("│ ╭─ JS "));
        assert_eq!(lines[output + 3], "│ │ code");
        assert!(lines[output + 4].starts_with("│ ╰─"));
        assert_eq!(lines[output + 5], "│ b");
    }

    #[test]
    fn user_message_keeps_whitespace_and_blank_lines() {
        let r = record(SessionId::from(1), "line1\n\n   line3  ", "ok");
        let lines = plain(&session_detail_lines(&r, 40));
        let input = lines
            .iter()
            .position(|line| line == "INPUT (USER)")
            .expect("input label");
        assert_eq!(lines[input + 1], "│ line1");
        assert_eq!(lines[input + 2], "│ ");
        assert_eq!(lines[input + 3], "│    line3  ");
    }

    #[test]
    fn metadata_header_lists_id_timestamp_and_participants() {
        let r = record(SessionId::from("abc"), "", "");
        let lines = plain(&session_detail_lines(&r, 40));
        assert_eq!(lines[0], "SESSION LOG: abc");
        assert_eq!(lines[1], "TIMESTAMP: 2026-10-19 08:30");
        assert_eq!(lines[2], "PARTICIPANTS: morpheus & CentralGPT");
        assert!(lines.iter().any(|line| line.ends_with("(no response)")));
        assert!(lines.iter().any(|line| line.contains(END_OF_LOG)));
    }

    #[test]
    fn not_found_renders_message_and_return_button() {
        let model = model_with(Vec::new()).open_session_detail(None);
        let screen = draw(&model);
        assert!(screen.contains(NOT_FOUND_MESSAGE));
        assert!(screen.contains(RETURN_LABEL));

        let View::SessionDetail(view) = &model.view else {
            panic!("expected detail view");
        };
        let targets = detail_back_targets(model.terminal_size, view);
        assert_eq!(targets.len(), 2);
        let rows = screen.split('\n').collect::<Vec<_>>();
        let back = targets[1];
        let row = rows[back.y as usize];
        let label = row
            .chars()
            .skip(back.x as usize)
            .take(back.width as usize)
            .collect::<String>();
        assert_eq!(label, RETURN_LABEL);
    }

    #[test]
    fn found_detail_has_only_the_close_target() {
        let model = model_with(Vec::new())
            .open_session_detail(Some(record(SessionId::from(2), "q", "a")));
        let View::SessionDetail(view) = &model.view else {
            panic!("expected detail view");
        };
        assert_eq!(detail_back_targets(model.terminal_size, view).len(), 1);
        let screen = draw(&model);
        assert!(screen.contains(CLOSE_LABEL));
        assert!(screen.contains("SESSION LOG: 2"));
    }

    #[test]
    fn clamp_scroll_state_limits_end_to_content() {
        let r = record(SessionId::from(1), "q", &"line\n".repeat(100));
        let mut model =
            model_with(vec![r.clone()]).open_session_detail(Some(r));
        if let View::SessionDetail(view) = &mut model.view {
            view.scroll = u16::MAX;
        }
        clamp_scroll_state(&mut model);
        let View::SessionDetail(view) = &model.view else {
            panic!("expected detail view");
        };
        assert!(view.scroll > 0);
        assert!(view.scroll < 200);

        let mut not_found = model_with(Vec::new()).open_session_detail(None);
        if let View::SessionDetail(view) = &mut not_found.view {
            view.scroll = 10;
        }
        clamp_scroll_state(&mut not_found);
        let View::SessionDetail(view) = &not_found.view else {
            panic!("expected detail view");
        };
        assert_eq!(view.scroll, 0);
    }

    #[test]
    fn empty_code_block_still_has_a_body_line() {
        let lines = plain(&segment_lines(&[Segment::code("", "txt")], 20));
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("╭─ TXT "));
        assert_eq!(lines[1], "│ ");
    }

    #[test]
    fn tabs_render_as_spaces_to_the_next_stop() {
        let r = record(
            SessionId::from(1),
            "A\tB",
            "```go\nfunc f() {\n\treturn\n}\n```",
        );
        let lines = plain(&session_detail_lines(&r, 40));
        assert!(lines.iter().all(|line| !line.contains('\t')));
        assert!(lines.iter().any(|line| line == "│ A   B"));
        assert!(lines.iter().any(|line| line == "│ │     return"));

        let model = model_with(vec![r.clone()]).open_session_detail(Some(r));
        let screen = draw(&model);
        assert!(!screen.contains('\t'));
        assert!(screen.contains("│     return"));
    }

    #[test]
    fn tab_stops_account_for_wide_characters() {
        assert_eq!(expand_tabs("日\tx"), "日  x");
        assert_eq!(expand_tabs("abcd\tx"), "abcd    x");
        assert_eq!(expand_tabs("no tabs"), "no tabs");
    }

    #[test]
    fn detail_header_shows_the_chatlog_address() {
        let model = model_with(Vec::new())
            .open_session_detail(Some(record(SessionId::from(31), "q", "a")));
        let screen = draw(&model);
        assert!(screen.contains("https://centralgpt.onion/chatlog/31"));
    }
}
