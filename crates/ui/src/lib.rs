//! ratatui-based UI.

use std::io::{self, Stdout};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{event, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, Borders, Clear, HighlightSpacing, List, ListItem, ListState, Paragraph, Row, Table,
    TableState, Wrap,
};
use timetable_application::{AppContext, FilterDimension, FilterSelection, LoadState};
use timetable_core::Theme;
use timetable_engine::Engine;

mod table;

use table::{HEADERS, column_widths, entry_cells, truncate_to_width};

const PAGE_STEP: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiExit {
    Quit,
}

#[derive(Debug, Clone)]
pub struct UiOutcome {
    pub ctx: AppContext,
    pub exit: UiExit,
}

pub struct Ui {
    ctx: AppContext,
    filter_panel: FilterPanel,
    open_panel: OpenPanel,
    pending_open: Option<PathBuf>,
    engine: Engine,
}

/// Edits a draft selection that only replaces the active filters on Enter.
#[derive(Debug)]
struct FilterPanel {
    open: bool,
    focus: FilterDimension,
    cursors: [usize; 3],
    draft: FilterSelection,
}

impl Default for FilterPanel {
    fn default() -> Self {
        Self {
            open: false,
            focus: FilterDimension::Class,
            cursors: [0; 3],
            draft: FilterSelection::default(),
        }
    }
}

#[derive(Debug, Default)]
struct OpenPanel {
    open: bool,
    input: String,
    error: Option<String>,
}

impl Ui {
    pub fn new(mut ctx: AppContext) -> Self {
        ctx.settings.normalize();
        Self {
            ctx,
            filter_panel: FilterPanel::default(),
            open_panel: OpenPanel::default(),
            pending_open: None,
            engine: Engine::new(),
        }
    }

    /// Parses `path` once the first frame is on screen.
    pub fn queue_document(&mut self, path: impl Into<PathBuf>) {
        self.pending_open = Some(path.into());
    }

    /// Parses `path` and replaces the loaded timetable with the result.
    pub fn open_document(&mut self, path: &Path) {
        let name = path.display().to_string();
        match self.engine.parse_pdf(path, &self.ctx.settings.layout) {
            Ok(doc) => {
                if doc.is_empty() {
                    log::warn!("{name}: no timetable grid found in {} pages", doc.pages);
                }
                self.ctx.load_entries(name, doc.entries);
            }
            Err(err) => {
                let message = format!("{:#}", anyhow::Error::from(err));
                log::error!("{message}");
                self.ctx.load_failed(name, message);
            }
        }
    }

    pub fn run(&mut self) -> anyhow::Result<UiOutcome> {
        let mut terminal = setup_terminal()?;
        terminal.clear().ok();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.event_loop(&mut terminal)
        }));
        let restore_result = restore_terminal(&mut terminal);

        match (result, restore_result) {
            (Ok(Ok(outcome)), Ok(())) => Ok(outcome),
            (Ok(Ok(_)), Err(err)) => Err(err),
            (Ok(Err(err)), Ok(())) => Err(err),
            (Ok(Err(err)), Err(restore_err)) => Err(err.context(format!(
                "additionally failed to restore terminal: {restore_err}"
            ))),
            (Err(panic), Ok(())) => Err(anyhow::anyhow!(panic_to_string(panic))),
            (Err(panic), Err(err)) => Err(anyhow::anyhow!(
                "{}\n(additionally failed to restore terminal: {err})",
                panic_to_string(panic)
            )),
        }
    }

    fn accent_color(&self) -> Color {
        match self.ctx.settings.theme {
            Theme::Light => Color::Blue,
            Theme::Dark => Color::Yellow,
        }
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ) -> anyhow::Result<UiOutcome> {
        let tick_rate = Duration::from_millis(250);
        let mut needs_redraw = true;

        loop {
            if needs_redraw {
                terminal.draw(|frame| self.draw(frame.area(), frame))?;
                needs_redraw = false;
            }

            // The busy overlay is already on screen at this point.
            if let Some(path) = self.pending_open.take() {
                self.open_document(&path);
                needs_redraw = true;
                continue;
            }

            if !event::poll(tick_rate)? {
                continue;
            }

            match event::read()? {
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Release {
                        continue;
                    }

                    needs_redraw = true;

                    let exit = if self.open_panel.open {
                        self.handle_open_panel_key(key)
                    } else if self.filter_panel.open {
                        self.handle_filter_panel_key(key)
                    } else {
                        self.handle_main_key(key)
                    };
                    if let Some(exit) = exit {
                        return Ok(UiOutcome {
                            ctx: self.ctx.clone(),
                            exit,
                        });
                    }
                }
                _ => {}
            }
        }
    }

    fn handle_main_key(&mut self, key: KeyEvent) -> Option<UiExit> {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return Some(UiExit::Quit),
            KeyCode::Char('o') => {
                self.open_panel.open = true;
                self.open_panel.error = None;
                if self.open_panel.input.is_empty()
                    && let Some(doc) = &self.ctx.document
                {
                    self.open_panel.input = doc.clone();
                }
            }
            KeyCode::Char('/') => self.open_filter_panel(),
            KeyCode::Char('c') => self.ctx.clear_filters(),
            KeyCode::Char('t') => self.ctx.settings.cycle_theme(),
            KeyCode::Down | KeyCode::Char('j') => self.ctx.select_next(),
            KeyCode::Up | KeyCode::Char('k') => self.ctx.select_prev(),
            KeyCode::PageDown => {
                for _ in 0..PAGE_STEP {
                    self.ctx.select_next();
                }
            }
            KeyCode::PageUp => {
                self.ctx.selected = self.ctx.selected.saturating_sub(PAGE_STEP);
            }
            KeyCode::Home => self.ctx.selected = 0,
            KeyCode::End => {
                self.ctx.selected = self.ctx.visible_entries().len().saturating_sub(1);
            }
            _ => {}
        }
        None
    }

    fn open_filter_panel(&mut self) {
        if self.ctx.entries.is_empty() {
            return;
        }
        self.filter_panel = FilterPanel {
            open: true,
            draft: self.ctx.filters.clone(),
            ..FilterPanel::default()
        };
    }

    fn handle_filter_panel_key(&mut self, key: KeyEvent) -> Option<UiExit> {
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && let KeyCode::Char('u') = key.code
        {
            self.filter_panel.draft = FilterSelection::default();
            return None;
        }

        let dimension = self.filter_panel.focus;
        let len = self.dimension_options(dimension).len();
        let slot = dimension_index(dimension);

        match key.code {
            KeyCode::Esc => self.filter_panel.open = false,
            KeyCode::Enter => {
                let draft = std::mem::take(&mut self.filter_panel.draft);
                self.ctx.apply_filters(draft);
                self.filter_panel.open = false;
            }
            KeyCode::Tab | KeyCode::Right => {
                self.filter_panel.focus = dimension.next();
            }
            KeyCode::BackTab | KeyCode::Left => {
                self.filter_panel.focus = dimension.prev();
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if len > 0 {
                    let cursor = &mut self.filter_panel.cursors[slot];
                    *cursor = (*cursor + 1).min(len - 1);
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                let cursor = &mut self.filter_panel.cursors[slot];
                *cursor = cursor.saturating_sub(1);
            }
            KeyCode::Char(' ') => {
                let idx = self.filter_panel.cursors[slot];
                if let Some(value) = self.dimension_options(dimension).get(idx).cloned() {
                    self.filter_panel.draft.toggle(dimension, &value);
                }
            }
            _ => {}
        }
        None
    }

    fn handle_open_panel_key(&mut self, key: KeyEvent) -> Option<UiExit> {
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && let KeyCode::Char('u') = key.code
        {
            self.open_panel.input.clear();
            return None;
        }

        match key.code {
            KeyCode::Esc => {
                self.open_panel.open = false;
                self.open_panel.error = None;
            }
            KeyCode::Enter => {
                let input = self.open_panel.input.trim();
                if input.is_empty() {
                    self.open_panel.error = Some("Enter a path to a PDF file".to_string());
                    return None;
                }
                let path = PathBuf::from(input);
                if let Err(err) = timetable_engine::check_pdf_input(&path) {
                    self.open_panel.error = Some(err.to_string());
                    return None;
                }
                self.open_panel.open = false;
                self.open_panel.error = None;
                self.pending_open = Some(path);
            }
            KeyCode::Backspace => {
                self.open_panel.input.pop();
            }
            KeyCode::Char(ch) => {
                if !ch.is_control() {
                    self.open_panel.input.push(ch);
                }
            }
            _ => {}
        }
        None
    }

    fn dimension_options(&self, dimension: FilterDimension) -> &[String] {
        match dimension {
            FilterDimension::Class => &self.ctx.options.classes,
            FilterDimension::Day => &self.ctx.options.days,
            FilterDimension::Subject => &self.ctx.options.subjects,
        }
    }

    fn draw(&self, area: Rect, frame: &mut ratatui::Frame) {
        frame.render_widget(Clear, area);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
            ])
            .split(area);

        let title = Paragraph::new(Text::from(self.header_lines()))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::BOTTOM));
        frame.render_widget(title, layout[0]);

        self.draw_entries(layout[1], frame);

        let footer = Paragraph::new(Text::from(footer_lines()))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::TOP));
        frame.render_widget(footer, layout[2]);

        if self.filter_panel.open {
            self.draw_filter_panel(area, frame);
        }
        if self.open_panel.open {
            self.draw_open_panel(area, frame);
        }
        if let Some(path) = &self.pending_open {
            self.draw_busy(area, frame, path);
        }
    }

    fn header_lines(&self) -> Vec<Line<'static>> {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let document = self
            .ctx
            .document
            .clone()
            .unwrap_or_else(|| "no document".to_string());

        let mut summary = vec![Span::styled("Timetable", bold), Span::raw(format!("  {document}"))];
        if !self.ctx.entries.is_empty() {
            let shown = self.ctx.visible_entries().len();
            summary.push(Span::raw(format!(
                "  ({shown}/{} entries)",
                self.ctx.entries.len()
            )));
        }

        vec![Line::from(summary), Line::from(self.filter_summary_spans())]
    }

    fn filter_summary_spans(&self) -> Vec<Span<'static>> {
        if self.ctx.filters.is_empty() {
            return vec![Span::styled(
                "no filters",
                Style::default().add_modifier(Modifier::DIM),
            )];
        }

        let mut spans = Vec::new();
        for dimension in FilterDimension::ALL {
            let values = self.ctx.filters.values(dimension);
            if values.is_empty() {
                continue;
            }
            if !spans.is_empty() {
                spans.push(Span::raw("  "));
            }
            spans.push(Span::styled(
                format!("{}: ", dimension.label()),
                Style::default().fg(self.accent_color()),
            ));
            spans.push(Span::raw(values.join(", ")));
        }
        spans
    }

    fn draw_entries(&self, area: Rect, frame: &mut ratatui::Frame) {
        let visible = self.ctx.visible_entries();
        if let Some(message) = empty_state_message(&self.ctx) {
            let paragraph = Paragraph::new(Text::from(message))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .block(Block::default().borders(Borders::ALL));
            frame.render_widget(paragraph, area);
            return;
        }

        let widths = column_widths(visible.iter().map(|e| entry_cells(e)));
        let header = Row::new(HEADERS)
            .style(Style::default().add_modifier(Modifier::BOLD))
            .bottom_margin(1);
        let rows = visible.iter().map(|entry| {
            let cells = entry_cells(entry);
            Row::new(
                cells
                    .iter()
                    .zip(widths)
                    .map(|(cell, width)| truncate_to_width(cell, usize::from(width))),
            )
        });

        let highlight_style = Style::default()
            .fg(Color::Black)
            .bg(self.accent_color())
            .add_modifier(Modifier::BOLD);

        let table = Table::new(rows, widths.map(Constraint::Length))
            .header(header)
            .column_spacing(2)
            .block(Block::default().borders(Borders::ALL))
            .row_highlight_style(highlight_style)
            .highlight_spacing(HighlightSpacing::Always)
            .highlight_symbol("> ");

        let mut state = TableState::default();
        state.select(Some(self.ctx.selected.min(visible.len() - 1)));
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn draw_filter_panel(&self, area: Rect, frame: &mut ratatui::Frame) {
        let popup_area = centered_rect(90, 70, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().borders(Borders::ALL).title(Span::styled(
            "Filters",
            Style::default().add_modifier(Modifier::BOLD),
        ));
        frame.render_widget(block.clone(), popup_area);

        let inner = block.inner(popup_area);
        let sections = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(3)])
            .split(inner);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(25),
                Constraint::Percentage(25),
                Constraint::Percentage(50),
            ])
            .split(sections[0]);

        for (dimension, column) in FilterDimension::ALL.into_iter().zip(columns.iter()) {
            self.draw_filter_column(dimension, *column, frame);
        }

        let help_lines = vec![
            Line::from(vec![
                Span::styled("Tab", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" focus  "),
                Span::styled("↑/↓", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" move  "),
                Span::styled("Space", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" toggle"),
            ]),
            Line::from(vec![
                Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" apply  "),
                Span::styled("Ctrl+u", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" clear all  "),
                Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" cancel"),
            ]),
        ];
        let help = Paragraph::new(Text::from(help_lines)).alignment(Alignment::Center);
        frame.render_widget(help, sections[1]);
    }

    fn draw_filter_column(&self, dimension: FilterDimension, area: Rect, frame: &mut ratatui::Frame) {
        let focused = self.filter_panel.focus == dimension;
        let selected = self.filter_panel.draft.values(dimension).len();
        let title = if selected == 0 {
            format!("{} (all)", dimension.label())
        } else {
            format!("{} ({selected})", dimension.label())
        };

        let border_style = if focused {
            Style::default().fg(self.accent_color())
        } else {
            Style::default()
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(title);

        let items: Vec<ListItem> = self
            .dimension_options(dimension)
            .iter()
            .map(|value| {
                let mark = if self.filter_panel.draft.is_selected(dimension, value) {
                    "[x] "
                } else {
                    "[ ] "
                };
                ListItem::new(Line::raw(format!("{mark}{value}")))
            })
            .collect();

        let mut list = List::new(items).block(block);
        if focused {
            list = list
                .highlight_style(
                    Style::default()
                        .fg(Color::Black)
                        .bg(self.accent_color())
                        .add_modifier(Modifier::BOLD),
                )
                .highlight_spacing(HighlightSpacing::Always)
                .highlight_symbol("> ");
        }

        let mut state = ListState::default();
        if focused {
            state.select(Some(self.filter_panel.cursors[dimension_index(dimension)]));
        }
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_open_panel(&self, area: Rect, frame: &mut ratatui::Frame) {
        let popup_area = centered_rect(80, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().borders(Borders::ALL).title(Span::styled(
            "Open PDF",
            Style::default().add_modifier(Modifier::BOLD),
        ));
        frame.render_widget(block.clone(), popup_area);

        let mut lines = vec![
            Line::from(vec![
                Span::styled("Path: ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(self.open_panel.input.clone()),
                Span::styled("_", Style::default().fg(self.accent_color())),
            ]),
            Line::raw(""),
            Line::from(vec![
                Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" parse  "),
                Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" cancel  "),
                Span::styled("Ctrl+U", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" clear"),
            ]),
        ];
        if let Some(err) = &self.open_panel.error {
            lines.push(Line::raw(""));
            lines.push(Line::styled(err.clone(), Style::default().fg(Color::Red)));
        }

        let paragraph = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });
        frame.render_widget(paragraph, block.inner(popup_area));
    }

    fn draw_busy(&self, area: Rect, frame: &mut ratatui::Frame, path: &Path) {
        let popup_area = centered_rect(60, 20, area);
        frame.render_widget(Clear, popup_area);
        let paragraph = Paragraph::new(Text::from(vec![
            Line::styled(
                "Parsing…",
                Style::default()
                    .fg(self.accent_color())
                    .add_modifier(Modifier::BOLD),
            ),
            Line::raw(path.display().to_string()),
        ]))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(paragraph, popup_area);
    }
}

fn footer_lines() -> Vec<Line<'static>> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    vec![Line::from(vec![
        Span::styled("o", bold),
        Span::raw(" open  "),
        Span::styled("/", bold),
        Span::raw(" filters  "),
        Span::styled("c", bold),
        Span::raw(" clear filters  "),
        Span::styled("t", bold),
        Span::raw(" theme  "),
        Span::styled("↑/↓", bold),
        Span::raw(" move  "),
        Span::styled("q", bold),
        Span::raw(" quit"),
    ])]
}

/// Message shown instead of the table, if any. No data and no match are reported differently.
fn empty_state_message(ctx: &AppContext) -> Option<String> {
    match &ctx.load_state {
        LoadState::Idle => Some("No timetable loaded. Press o to open a PDF.".to_string()),
        LoadState::NoData => Some(
            "No data could be extracted. The PDF layout may not be recognized.".to_string(),
        ),
        LoadState::Failed(message) => Some(format!("Could not read the PDF: {message}")),
        LoadState::Loaded => ctx
            .visible_entries()
            .is_empty()
            .then(|| "No results match the current filters.".to_string()),
    }
}

fn dimension_index(dimension: FilterDimension) -> usize {
    match dimension {
        FilterDimension::Class => 0,
        FilterDimension::Day => 1,
        FilterDimension::Subject => 2,
    }
}

fn setup_terminal() -> anyhow::Result<Terminal<CrosstermBackend<Stdout>>> {
    terminal::enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen).context("enter alt screen")?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("create terminal")
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    terminal::disable_raw_mode().context("disable raw mode")?;
    crossterm::execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("leave alt screen")?;
    Ok(())
}

fn panic_to_string(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic: (unknown payload)".to_string()
    }
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
    use timetable_core::{Settings, TimetableEntry};

    fn entry(class_name: &str, day: &str, subject: &str) -> TimetableEntry {
        TimetableEntry {
            class_name: class_name.to_string(),
            day: day.to_string(),
            time: "08:00-09:00".to_string(),
            period: "1".to_string(),
            subject: subject.to_string(),
            teacher: "N/A".to_string(),
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn loaded_ui() -> Ui {
        let ctx = AppContext::new(Settings::default()).with_entries(
            "week.pdf".to_string(),
            vec![
                entry("10A", "Sunday", "Math"),
                entry("10B", "Sunday", "Art"),
                entry("10A", "Monday", "Biology"),
            ],
        );
        Ui::new(ctx)
    }

    #[test]
    fn empty_states_are_distinct() {
        let mut ctx = AppContext::new(Settings::default());
        let idle = empty_state_message(&ctx);
        assert!(idle.is_some_and(|m| m.contains("Press o")));

        ctx.load_entries("a.pdf".to_string(), Vec::new());
        let no_data = empty_state_message(&ctx);
        assert!(no_data.is_some_and(|m| m.starts_with("No data could be extracted")));

        ctx.load_entries(
            "b.pdf".to_string(),
            vec![entry("10A", "Sunday", "Math"), entry("10B", "Monday", "Art")],
        );
        assert_eq!(empty_state_message(&ctx), None);

        ctx.apply_filters(FilterSelection {
            classes: vec!["10B".to_string()],
            days: vec!["Sunday".to_string()],
            ..FilterSelection::default()
        });
        assert_eq!(
            empty_state_message(&ctx).as_deref(),
            Some("No results match the current filters.")
        );

        ctx.load_failed("c.pdf".to_string(), "failed to read page 2".to_string());
        assert!(empty_state_message(&ctx).is_some_and(|m| m.contains("read page 2")));
    }

    #[test]
    fn filter_panel_applies_draft_only_on_enter() {
        let mut ui = loaded_ui();
        ui.handle_main_key(key(KeyCode::Char('/')));
        assert!(ui.filter_panel.open);

        // Class column: toggle the first class (10A).
        ui.handle_filter_panel_key(key(KeyCode::Char(' ')));
        assert!(ui.ctx.filters.is_empty());

        ui.handle_filter_panel_key(key(KeyCode::Enter));
        assert!(!ui.filter_panel.open);
        assert_eq!(ui.ctx.filters.classes, vec!["10A"]);
        assert_eq!(ui.ctx.visible_entries().len(), 2);
    }

    #[test]
    fn filter_panel_escape_discards_draft() {
        let mut ui = loaded_ui();
        ui.handle_main_key(key(KeyCode::Char('/')));
        ui.handle_filter_panel_key(key(KeyCode::Tab));
        ui.handle_filter_panel_key(key(KeyCode::Down));
        ui.handle_filter_panel_key(key(KeyCode::Char(' ')));
        assert_eq!(ui.filter_panel.draft.days, vec!["Monday"]);

        ui.handle_filter_panel_key(key(KeyCode::Esc));
        assert!(ui.ctx.filters.is_empty());
    }

    #[test]
    fn open_panel_rejects_empty_and_non_pdf_input() {
        let mut ui = loaded_ui();
        ui.handle_main_key(key(KeyCode::Char('o')));
        assert_eq!(ui.open_panel.input, "week.pdf");

        ui.handle_open_panel_key(KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL));
        ui.handle_open_panel_key(key(KeyCode::Enter));
        assert!(ui.open_panel.open);
        assert!(ui.open_panel.error.is_some());

        for ch in "/nowhere/week.pdf".chars() {
            ui.handle_open_panel_key(key(KeyCode::Char(ch)));
        }
        ui.handle_open_panel_key(key(KeyCode::Enter));
        assert!(ui.pending_open.is_none());
        assert!(
            ui.open_panel
                .error
                .as_deref()
                .is_some_and(|e| e.contains("file not found"))
        );
    }

    #[test]
    fn navigation_stays_within_visible_rows() {
        let mut ui = loaded_ui();
        ui.handle_main_key(key(KeyCode::End));
        assert_eq!(ui.ctx.selected, 2);
        ui.handle_main_key(key(KeyCode::PageDown));
        assert_eq!(ui.ctx.selected, 2);
        ui.handle_main_key(key(KeyCode::PageUp));
        assert_eq!(ui.ctx.selected, 0);
        assert_eq!(ui.handle_main_key(key(KeyCode::Char('q'))), Some(UiExit::Quit));
    }

    #[test]
    fn theme_key_cycles_theme() {
        let mut ui = loaded_ui();
        let before = ui.ctx.settings.theme;
        ui.handle_main_key(key(KeyCode::Char('t')));
        assert_ne!(ui.ctx.settings.theme, before);
    }
}
