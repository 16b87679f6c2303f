use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};

use crate::app::{App, FOOTER_HEIGHT, HEADER_HEIGHT, InputMode};
use crate::model::{RowData, ViewKind, truncate};
use crate::views::{ConsumerGroupsPane, DetailPane, GROUP_HEADERS, Overlay, ResourceTable};

const BG: Color = Color::Rgb(9, 15, 25);
const PANEL: Color = Color::Rgb(16, 27, 44);
const ACCENT: Color = Color::Rgb(52, 211, 153);
const MUTED: Color = Color::Rgb(140, 156, 178);
const WARN: Color = Color::Rgb(251, 191, 36);
const ERROR: Color = Color::Rgb(248, 113, 113);
const PL_A: Color = Color::Rgb(17, 94, 89);
const PL_B: Color = Color::Rgb(30, 64, 175);
const PL_C: Color = Color::Rgb(55, 48, 163);
const PL_D: Color = Color::Rgb(82, 24, 124);

const ENDPOINT_MAX_CHARS: usize = 40;

pub fn render(frame: &mut Frame, app: &App) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEADER_HEIGHT),
            Constraint::Min(3),
            Constraint::Length(FOOTER_HEIGHT),
        ])
        .split(frame.area());

    render_header(frame, root[0], app);
    render_body(frame, root[1], app);
    render_footer(frame, root[2], app);

    if app.show_help() {
        render_help_modal(frame, app);
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let left_line = build_left_header_line(app);
    let right_line = build_right_header_line(app);
    let right_width = spans_width(&right_line.spans) as u16;
    if area.width < 42 || right_width == 0 || right_width >= area.width {
        frame.render_widget(
            Paragraph::new(left_line).style(Style::default().bg(BG).fg(Color::White)),
            area,
        );
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(right_width)])
        .split(area);
    frame.render_widget(
        Paragraph::new(left_line).style(Style::default().bg(BG).fg(Color::White)),
        chunks[0],
    );
    frame.render_widget(
        Paragraph::new(right_line).style(Style::default().bg(BG)),
        chunks[1],
    );
}

fn build_left_header_line(app: &App) -> Line<'static> {
    let context = app.context();
    let mut spans = Vec::new();
    push_powerline_segment(&mut spans, " k4a ", Color::Black, ACCENT, PL_A);
    push_powerline_segment(
        &mut spans,
        format!(" ctx {} ", truncate(&context.name, 20)),
        Color::White,
        PL_A,
        PL_C,
    );
    push_powerline_segment(
        &mut spans,
        format!(" ns {} ", truncate(&context.namespace, 20)),
        Color::White,
        PL_C,
        PL_D,
    );
    let endpoint = display_endpoint(&context.api);
    let endpoint = if endpoint.is_empty() { "-".to_string() } else { endpoint };
    push_powerline_segment(&mut spans, format!(" {endpoint} "), Color::White, PL_D, BG);
    Line::from(spans)
}

fn build_right_header_line(app: &App) -> Line<'static> {
    let colors = ViewKind::ALL.map(|kind| {
        if kind == app.active_kind() {
            (Color::Black, Color::Rgb(59, 130, 246))
        } else {
            (Color::White, Color::Rgb(30, 41, 59))
        }
    });
    let mut spans = Vec::new();
    for (index, kind) in ViewKind::ALL.into_iter().enumerate() {
        let (fg, bg) = colors[index];
        let next_bg = colors.get(index + 1).map_or(BG, |(_, bg)| *bg);
        push_powerline_segment(&mut spans, format!(" {} ", kind.short_token()), fg, bg, next_bg);
    }
    Line::from(spans)
}

fn render_body(frame: &mut Frame, area: Rect, app: &App) {
    let view = app.active_view();
    match view.overlay() {
        Overlay::Detail(pane) => render_detail(frame, area, pane),
        Overlay::ConsumerGroups(pane) => render_consumer_groups(frame, area, pane),
        Overlay::None => render_table(frame, area, view.kind(), view.table()),
    }
}

fn render_table(frame: &mut Frame, area: Rect, kind: ViewKind, table: &ResourceTable) {
    if let Some(error) = table.error()
        && table.rows().is_empty()
    {
        render_message(
            frame,
            area,
            format!("{} Error", kind.title()),
            error.to_string(),
            ERROR,
        );
        return;
    }

    if table.is_loading() && table.rows().is_empty() {
        render_message(
            frame,
            area,
            kind.title().to_string(),
            format!("Loading {}…", kind.resource_kind().cli_name()),
            MUTED,
        );
        return;
    }

    let mut title = format!("{} ({})", kind.title(), table.rows().len());
    if !table.filter().is_empty() {
        title.push_str(&format!(" /{}", table.filter()));
    }
    if let Some(refreshed) = table.last_refreshed() {
        title.push_str(&format!(" · {}", refreshed.format("%H:%M:%S")));
    }
    if table.is_loading() {
        title.push_str(" · refreshing");
    }
    if let Some(error) = table.error() {
        title.push_str(&format!(" · stale: {}", truncate(error, 60)));
    }

    let border = if table.error().is_some() { WARN } else { ACCENT };
    render_rows(
        frame,
        area,
        title,
        table.headers(),
        table.rows(),
        table.selected_index(),
        border,
    );
}

fn render_rows(
    frame: &mut Frame,
    area: Rect,
    title: String,
    headers: &[&str],
    rows: &[RowData],
    selected: Option<usize>,
    border: Color,
) {
    let header_row = Row::new(headers.iter().map(|header| {
        Cell::from(header.to_string()).style(Style::default().add_modifier(Modifier::BOLD))
    }))
    .height(1)
    .style(Style::default().fg(ACCENT));

    let rows = rows.iter().map(|row| {
        Row::new(
            row.columns
                .iter()
                .map(|column| Cell::from(column.clone()).style(Style::default().fg(Color::White))),
        )
    });

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(PANEL));

    let table = Table::new(rows, column_constraints(headers.len()))
        .header(header_row)
        .block(block)
        .column_spacing(1)
        .row_highlight_style(
            Style::default()
                .bg(Color::Rgb(24, 36, 58))
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = TableState::default();
    state.select(selected);
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_message(frame: &mut Frame, area: Rect, title: String, message: String, color: Color) {
    let panel = Paragraph::new(Text::from(message))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color))
                .style(Style::default().bg(PANEL)),
        )
        .style(Style::default().fg(color));
    frame.render_widget(panel, area);
}

fn render_detail(frame: &mut Frame, area: Rect, pane: &DetailPane) {
    let block = Block::default()
        .title(pane.title().to_string())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT))
        .style(Style::default().bg(PANEL));
    let paragraph = Paragraph::new(highlight_yaml_text(pane.content()))
        .block(block)
        .style(Style::default().fg(Color::White))
        .wrap(Wrap { trim: false })
        .scroll((pane.scroll(), 0));

    frame.render_widget(paragraph, area);
}

fn render_consumer_groups(frame: &mut Frame, area: Rect, pane: &ConsumerGroupsPane) {
    let title = format!("Consumer Groups: {}", pane.topic());
    if let Some(error) = pane.error()
        && pane.rows().is_empty()
    {
        render_message(frame, area, title, error.to_string(), ERROR);
        return;
    }
    if pane.is_loading() && pane.rows().is_empty() {
        render_message(frame, area, title, "Loading consumer groups…".to_string(), MUTED);
        return;
    }
    if pane.rows().is_empty() {
        render_message(
            frame,
            area,
            title,
            "No consumer groups read this topic".to_string(),
            MUTED,
        );
        return;
    }

    render_rows(
        frame,
        area,
        format!("{title} ({})", pane.rows().len()),
        GROUP_HEADERS,
        pane.rows(),
        pane.selected_index(),
        ACCENT,
    );
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    if app.mode() == InputMode::Normal {
        let mut spans = Vec::new();
        push_powerline_segment(&mut spans, " nrm ", Color::White, PL_A, PL_B);
        let status_width = area.width.saturating_sub(24).min(120) as usize;
        push_powerline_segment(
            &mut spans,
            format!(" {} ", truncate(app.status(), status_width.max(24))),
            Color::White,
            PL_B,
            BG,
        );

        let hints = build_key_hint_spans(app);
        let max_right = area.width.saturating_sub(28);
        let right_width = (spans_width(&hints) as u16).min(max_right);
        if right_width == 0 {
            frame.render_widget(
                Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
                area,
            );
            return;
        }

        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(1), Constraint::Length(right_width)])
            .split(area);
        frame.render_widget(
            Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
            chunks[0],
        );
        frame.render_widget(
            Paragraph::new(Line::from(hints))
                .style(Style::default().bg(BG))
                .alignment(Alignment::Right),
            chunks[1],
        );
        return;
    }

    let (label, prompt, prompt_bg) = match app.mode() {
        InputMode::Filter => (" flt ", format!("/{}", app.input().text()), WARN),
        InputMode::Command | InputMode::Normal => {
            (" cmd ", format!(":{}", app.input().text()), ACCENT)
        }
    };

    let cursor = if app.input().submitted() { "" } else { "█" };
    let mut spans = Vec::new();
    push_powerline_segment(&mut spans, label, Color::Black, prompt_bg, PL_B);
    push_powerline_segment(&mut spans, format!(" {prompt}{cursor} "), Color::White, PL_B, BG);
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
        area,
    );
}

fn build_key_hint_spans(app: &App) -> Vec<Span<'static>> {
    let hints: &[(&str, &str)] = if app.active_view().has_overlay() {
        &[("j/k", "scroll"), ("esc", "back")]
    } else {
        app.active_view().key_hints()
    };

    let mut spans = Vec::new();
    for (key, label) in hints {
        spans.push(Span::styled(
            format!("<{key}>"),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(format!(" {label} "), Style::default().fg(MUTED)));
    }
    spans
}

fn highlight_yaml_text(input: &str) -> Text<'static> {
    let lines = input
        .lines()
        .map(highlight_yaml_line)
        .collect::<Vec<Line<'static>>>();
    Text::from(lines)
}

fn highlight_yaml_line(line: &str) -> Line<'static> {
    let indent_len = line
        .as_bytes()
        .iter()
        .take_while(|byte| **byte == b' ' || **byte == b'\t')
        .count();
    let indent = &line[..indent_len];
    let trimmed = &line[indent_len..];

    let mut spans = vec![Span::raw(indent.to_string())];
    if trimmed.is_empty() {
        return Line::from(spans);
    }

    if let Some(comment) = trimmed.strip_prefix('#') {
        spans.push(Span::styled(
            format!("#{comment}"),
            Style::default().fg(MUTED),
        ));
        return Line::from(spans);
    }

    if let Some(rest) = trimmed.strip_prefix("- ") {
        spans.push(Span::styled("- ", Style::default().fg(ACCENT)));
        spans.extend(highlight_yaml_content(rest));
        return Line::from(spans);
    }

    spans.extend(highlight_yaml_content(trimmed));
    Line::from(spans)
}

fn highlight_yaml_content(content: &str) -> Vec<Span<'static>> {
    let Some((key, value)) = split_yaml_key_value(content) else {
        return vec![Span::styled(
            content.to_string(),
            Style::default().fg(Color::White),
        )];
    };

    let mut spans = vec![
        Span::styled(
            key.to_string(),
            Style::default().fg(Color::Rgb(103, 232, 249)),
        ),
        Span::styled(":", Style::default().fg(MUTED)),
    ];
    if value.trim().is_empty() {
        return spans;
    }

    spans.push(Span::raw(" "));
    spans.push(Span::styled(
        value.trim_start().to_string(),
        Style::default().fg(yaml_value_color(value.trim())),
    ));
    spans
}

fn split_yaml_key_value(content: &str) -> Option<(&str, &str)> {
    let (key, value) = content.split_once(':')?;
    let key = key.trim_end();
    if key.is_empty() || key.contains(' ') {
        return None;
    }
    Some((key, value))
}

fn yaml_value_color(value: &str) -> Color {
    if value.starts_with('"') || value.starts_with('\'') {
        Color::Rgb(125, 211, 252)
    } else if matches!(value, "true" | "false" | "null" | "~") {
        WARN
    } else if value.parse::<f64>().is_ok() {
        Color::Rgb(251, 146, 60)
    } else if value.starts_with('{') || value.starts_with('[') {
        MUTED
    } else {
        Color::Rgb(147, 197, 253)
    }
}

fn push_powerline_segment(
    spans: &mut Vec<Span<'static>>,
    content: impl Into<String>,
    fg: Color,
    bg: Color,
    next_bg: Color,
) {
    spans.push(Span::styled(
        content.into(),
        Style::default().fg(fg).bg(bg).add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::styled("", Style::default().fg(bg).bg(next_bg)));
}

fn spans_width(spans: &[Span<'_>]) -> usize {
    spans.iter().map(|span| span.content.chars().count()).sum()
}

fn render_help_modal(frame: &mut Frame, app: &App) {
    let area = centered_rect(72, 70, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(format!(
            "k4a help  ctx:{}  ns:{}  view:{}",
            app.context().name,
            app.context().namespace,
            app.active_kind().title()
        )),
        Line::from(""),
    ];
    lines.extend(HELP_LINES.iter().map(|line| Line::from(*line)));

    let modal = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title("Help")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ACCENT))
                .style(Style::default().bg(PANEL)),
        )
        .style(Style::default().fg(Color::White));

    frame.render_widget(modal, area);
}

const HELP_LINES: &[&str] = &[
    "Navigate: j/k or arrows  g/G top/bottom  ctrl+f/ctrl+b page",
    "Inspect: d describe (cached)  D describe (live)  enter consumer groups (topics)",
    "Refresh: r refresh  R or ctrl+r force past the cache",
    "Connectors: p pause  s resume  t restart",
    "Filter: / then text, enter applies, esc cancels",
    "",
    "Commands:",
    "  :topics :schemas :connectors :consumers :acls   switch view",
    "  :ctx [name]                                     list or switch context",
    "  :ns <namespace>                                 set namespace",
    "  :invalidate                                     clear the disk cache",
    "  :q                                              quit",
    "",
    "esc back  ? close help  ctrl+c quit",
];

fn display_endpoint(api: &str) -> String {
    let trimmed = api.trim().trim_end_matches('/');
    let host = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    truncate(host, ENDPOINT_MAX_CHARS)
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn column_constraints(columns: usize) -> Vec<Constraint> {
    if columns == 0 {
        return vec![Constraint::Percentage(100)];
    }

    let width = (100 / columns as u16).max(1);
    (0..columns)
        .map(|_| Constraint::Percentage(width))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{display_endpoint, render, split_yaml_key_value};
    use crate::app::App;
    use crate::context::ContextSummary;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    #[test]
    fn endpoint_drops_scheme_and_truncates() {
        assert_eq!(display_endpoint("https://ns4kafka.example.com/"), "ns4kafka.example.com");
        let long = format!("https://{}", "a".repeat(60));
        assert_eq!(display_endpoint(&long).chars().count(), 40);
    }

    #[test]
    fn yaml_keys_must_not_contain_spaces() {
        assert_eq!(split_yaml_key_value("name: orders"), Some(("name", " orders")));
        assert_eq!(split_yaml_key_value("not a key: x"), None);
    }

    #[test]
    fn renders_loading_table_with_header() {
        let mut app = App::new(
            ContextSummary {
                name: "dev".to_string(),
                namespace: "team".to_string(),
                api: "https://api.example.com".to_string(),
            },
            vec!["dev".to_string()],
        );
        app.start();
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();

        terminal.draw(|frame| render(frame, &app)).unwrap();

        let buffer = terminal.backend().buffer();
        let text = buffer
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect::<String>();
        assert!(text.contains("ctx dev"));
        assert!(text.contains("Loading topics"));
    }
}
