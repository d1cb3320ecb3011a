use crate::app::App;
use memory_globe::braille::BrailleCanvas;
use memory_globe::records::Record;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
    Frame,
};

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    // Split into globe area and status bar
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Globe
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    let inner = render_globe(frame, app, chunks[0]);
    render_callout(frame, app, inner);
    render_detail(frame, app, inner);
    render_status_bar(frame, app, chunks[1]);
}

fn render_globe(frame: &mut Frame, app: &App, area: Rect) -> Rect {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " Memory Globe ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(CanvasWidget { canvas: app.animation.canvas() }, inner);
    inner
}

/// Blits a colored braille canvas cell by cell
struct CanvasWidget<'a> {
    canvas: &'a BrailleCanvas,
}

impl Widget for CanvasWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (_, rows) = self.canvas.size();
        for row in 0..rows.min(area.height as usize) {
            let y = area.y + row as u16;
            for (col, (ch, color)) in self.canvas.row_cells(row).enumerate().take(area.width as usize) {
                // Skip empty braille characters (U+2800)
                if ch == '\u{2800}' {
                    continue;
                }
                buf[(area.x + col as u16, y)].set_char(ch).set_fg(color);
            }
        }
    }
}

fn category_style(record: &Record) -> Style {
    let [r, g, b] = record.category.rgb();
    Style::default().fg(Color::Rgb(r, g, b))
}

/// Small card above the focused record
fn render_callout(frame: &mut Frame, app: &App, inner: Rect) {
    let Some(callout) = &app.callout else {
        return;
    };
    let Some(record) = app.records.iter().find(|r| r.id == callout.record_id) else {
        return;
    };
    let (col, row, cols, rows) = callout.rect.cells();
    let x = inner.x + col.min(inner.width.saturating_sub(1));
    let y = inner.y + row.min(inner.height.saturating_sub(1));
    let rect = Rect::new(
        x,
        y,
        cols.min(inner.right().saturating_sub(x)),
        rows.min(inner.bottom().saturating_sub(y)),
    );
    if rect.width < 4 || rect.height < 3 {
        return;
    }

    let accent = category_style(record);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(accent)
        .title(Span::styled(format!(" {} ", record.category.label()), accent));
    let lines = vec![
        Line::from(Span::styled(
            record.title.clone(),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(record.date.to_string(), Style::default().fg(Color::DarkGray))),
        Line::from(Span::styled(record.location.name.clone(), Style::default().fg(Color::Cyan))),
        Line::from(Span::styled("click / enter: details", Style::default().fg(Color::DarkGray))),
    ];
    frame.render_widget(Clear, rect);
    frame.render_widget(Paragraph::new(lines).block(block), rect);
}

/// Full record panel, centered over the globe
fn render_detail(frame: &mut Frame, app: &App, inner: Rect) {
    let Some(record) = app.detail_record() else {
        return;
    };
    let width = inner.width.min(60);
    let height = inner.height.min(16);
    let rect = Rect::new(
        inner.x + (inner.width - width) / 2,
        inner.y + (inner.height - height) / 2,
        width,
        height,
    );

    let accent = category_style(record);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(accent)
        .title(Span::styled(
            format!(" {} ", record.title),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ));

    let mut lines = vec![
        Line::from(vec![
            Span::styled(record.date.to_string(), Style::default().fg(Color::Yellow)),
            Span::styled("  ", Style::default()),
            Span::styled(record.category.label(), accent),
        ]),
        Line::from(Span::styled(
            format!(
                "{} ({:.4}, {:.4})",
                record.location.name, record.location.lat, record.location.lon
            ),
            Style::default().fg(Color::Cyan),
        )),
        Line::from(""),
        Line::from(record.description.clone()),
    ];
    if !record.images.is_empty() {
        lines.push(Line::from(""));
        lines.extend(
            record
                .images
                .iter()
                .map(|image| Line::from(Span::styled(format!("▣ {image}"), Style::default().fg(Color::DarkGray)))),
        );
    }

    frame.render_widget(Clear, rect);
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }).block(block), rect);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let land = if app.landmass.is_pending() {
        "loading"
    } else if app.landmass.has_failed() {
        "none"
    } else {
        "ok"
    };
    let mut spans = vec![
        Span::styled(" ", Style::default()),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
        Span::styled(" | land: ", Style::default().fg(Color::DarkGray)),
        Span::styled(land, Style::default().fg(Color::Magenta)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            if app.show_all { "[A]ll paths " } else { "[a]ll paths " },
            Style::default().fg(if app.show_all { Color::Green } else { Color::DarkGray }),
        ),
    ];
    if let Some(progress) = app.playback_progress() {
        spans.push(Span::styled(
            format!("▶ {progress} "),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ));
    } else if let Some(record) = app.focused_record() {
        spans.push(Span::styled(format!("◆ {} ", record.title), category_style(record)));
    }
    spans.push(Span::styled(
        "| drag/hjkl:rotate click:focus p:play enter:details esc:back q:quit",
        Style::default().fg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
