use crate::calendar::{month_cells, DayCell, Edge, Extension, MonthRef, WeekStart};
use crate::carousel::{
    Carousel, CarouselGeometry, CarouselInput, CarouselMetrics, Gesture, SwipeTracker, Transition,
};
use crate::clock::{Clock, SystemClock};
use crate::index::EntryIndex;
use crate::model::{DateKey, EntriesByDate, Entry};
use crate::scroll::{Bounds, ScrollConfig, ScrollController, ScrollMetrics, ScrollOutcome, Viewport};
use crate::storage::{load_dataset, Config, Dataset};
use anyhow::Result;
use chrono::{Datelike, Days, NaiveDate};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Margin};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::path::PathBuf;
use std::time::Duration;

const TITLE_ROWS: usize = 1;
const CELL_ROWS: usize = 3;
const WHEEL_ROWS: isize = 3;
const IDLE_POLL: Duration = Duration::from_millis(50);

pub fn run(config: Config, data_path: PathBuf, dataset: Dataset) -> Result<()> {
    let mut session = TerminalSession::start()?;
    let mut app = App::new(config, data_path, dataset, Box::new(SystemClock));
    app.event_loop(&mut session.terminal)
}

/// Raw mode, alternate screen and mouse capture, released when dropped.
struct TerminalSession {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalSession {
    fn start() -> Result<Self> {
        enable_raw_mode()?;
        let mut out = stdout();
        if let Err(err) = execute!(out, EnterAlternateScreen, EnableMouseCapture) {
            let _ = disable_raw_mode();
            return Err(err.into());
        }
        match Terminal::new(CrosstermBackend::new(out)) {
            Ok(terminal) => {
                tracing::info!("terminal session started");
                Ok(TerminalSession { terminal })
            }
            Err(err) => {
                let _ = disable_raw_mode();
                let _ = execute!(stdout(), LeaveAlternateScreen, DisableMouseCapture);
                Err(err.into())
            }
        }
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        );
        let _ = self.terminal.show_cursor();
        tracing::info!("terminal session closed");
    }
}

struct App {
    clock: Box<dyn Clock>,
    config: Config,
    data_path: PathBuf,
    entries: EntriesByDate,
    index: EntryIndex,
    skipped: usize,
    controller: ScrollController,
    sections: Vec<Section>,
    scroll_top: usize,
    screen: Rect,
    calendar_area: Rect,
    needs_measure: bool,
    today: NaiveDate,
    cursor: NaiveDate,
    mode: Mode,
    swipe: SwipeTracker,
    status: String,
}

enum Mode {
    Calendar,
    Carousel(Carousel),
}

/// One mounted month, positioned on the scrollable content.
struct Section {
    month: MonthRef,
    top: usize,
    cells: Vec<DayCell>,
}

impl Section {
    fn height(&self) -> usize {
        TITLE_ROWS + self.cells.len() / 7 * CELL_ROWS
    }

    fn bottom(&self) -> usize {
        self.top + self.height()
    }

    fn row_of(&self, date: NaiveDate) -> Option<usize> {
        let idx = self
            .cells
            .iter()
            .position(|c| !c.is_other_month && c.date == date)?;
        Some(self.top + TITLE_ROWS + idx / 7 * CELL_ROWS)
    }
}

fn layout_sections(months: &[MonthRef], week_start: WeekStart) -> Vec<Section> {
    let mut top = 0;
    months
        .iter()
        .map(|&month| {
            let section = Section {
                month,
                top,
                cells: month_cells(month, week_start),
            };
            top = section.bottom();
            section
        })
        .collect()
}

fn section_height(month: MonthRef, week_start: WeekStart) -> usize {
    TITLE_ROWS + month_cells(month, week_start).len() / 7 * CELL_ROWS
}

fn content_height(sections: &[Section]) -> usize {
    sections.last().map(|s| s.bottom()).unwrap_or(0)
}

/// The calendar pane as the scroll controller sees it, in terminal rows.
struct CalendarViewport<'a> {
    sections: &'a [Section],
    scroll_top: usize,
    area: Rect,
}

impl Viewport for CalendarViewport<'_> {
    fn metrics(&self) -> Option<ScrollMetrics> {
        if self.area.height == 0 {
            return None;
        }
        Some(ScrollMetrics {
            scroll_top: self.scroll_top as f32,
            scroll_height: content_height(self.sections) as f32,
            client_height: self.area.height as f32,
        })
    }

    fn measure(&self, month: MonthRef) -> Option<Bounds> {
        let section = self.sections.iter().find(|s| s.month == month)?;
        Some(Bounds::new(
            section.top as f32 - self.scroll_top as f32,
            section.height() as f32,
            self.area.width as f32,
        ))
    }
}

struct CarouselLayout {
    wrapper: Rect,
    close: Rect,
    prev: Option<Rect>,
    next: Option<Rect>,
    cards: Vec<(usize, Rect)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CarouselHit {
    Close,
    Prev,
    Next,
    Card(usize),
    Track,
    Outside,
}

fn carousel_layout(screen: Rect, carousel: &Carousel) -> CarouselLayout {
    let wrapper = screen.inner(&Margin {
        vertical: 2,
        horizontal: 2,
    });
    let geometry = CarouselGeometry::compute(wrapper.width as f32, &CarouselMetrics::terminal());
    let track_y = wrapper.y + 1;
    let track_height = wrapper.height.saturating_sub(1);
    let width = wrapper.width as f32;
    let cards = (0..carousel.entries().len())
        .filter_map(|index| {
            let (left, right) = geometry.card_span(index, carousel.active());
            let left = left.round().max(0.0);
            let right = right.round().min(width);
            if right <= left {
                return None;
            }
            let rect = Rect::new(
                wrapper.x + left as u16,
                track_y,
                (right - left) as u16,
                track_height,
            );
            Some((index, rect))
        })
        .collect();
    let mid_y = track_y + track_height / 2;
    CarouselLayout {
        wrapper,
        close: Rect::new(wrapper.right().saturating_sub(3), wrapper.y, 3, 1),
        prev: carousel
            .can_go_prev()
            .then(|| Rect::new(wrapper.x, mid_y, 2, 1)),
        next: carousel
            .can_go_next()
            .then(|| Rect::new(wrapper.right().saturating_sub(2), mid_y, 2, 1)),
        cards,
    }
}

impl CarouselLayout {
    fn hit(&self, x: u16, y: u16) -> CarouselHit {
        if contains(self.close, x, y) {
            return CarouselHit::Close;
        }
        if self.prev.map_or(false, |r| contains(r, x, y)) {
            return CarouselHit::Prev;
        }
        if self.next.map_or(false, |r| contains(r, x, y)) {
            return CarouselHit::Next;
        }
        if let Some((index, _)) = self.cards.iter().find(|(_, r)| contains(*r, x, y)) {
            return CarouselHit::Card(*index);
        }
        if contains(self.wrapper, x, y) {
            CarouselHit::Track
        } else {
            CarouselHit::Outside
        }
    }
}

impl App {
    fn new(config: Config, data_path: PathBuf, dataset: Dataset, clock: Box<dyn Clock>) -> Self {
        let today = clock.today();
        let scroll_config = ScrollConfig {
            threshold: config.scroll_threshold_rows as f32,
            throttle: Duration::from_millis(config.throttle_ms),
        };
        let controller = ScrollController::new(today, config.max_months, scroll_config);
        let sections = layout_sections(controller.window().months(), config.week_start);
        let scroll_top = sections
            .iter()
            .find(|s| s.month == MonthRef::containing(today))
            .map(|s| s.top)
            .unwrap_or(0);
        let index = EntryIndex::build(&dataset.entries);
        let mut status = if index.is_empty() {
            format!("No entries in {}", data_path.display())
        } else {
            format!("Loaded {} entries from {}", index.len(), data_path.display())
        };
        if !dataset.skipped.is_empty() {
            status.push_str(&format!(" ({} skipped)", dataset.skipped.len()));
        }
        App {
            clock,
            config,
            data_path,
            entries: dataset.entries,
            index,
            skipped: dataset.skipped.len(),
            controller,
            sections,
            scroll_top,
            screen: Rect::default(),
            calendar_area: Rect::default(),
            needs_measure: false,
            today,
            cursor: today,
            mode: Mode::Calendar,
            swipe: SwipeTracker::default(),
            status,
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| self.draw(f))?;
            if std::mem::take(&mut self.needs_measure) {
                self.scroll_to(self.scroll_top);
                continue;
            }
            if event::poll(IDLE_POLL)? {
                if self.dispatch(event::read()?) {
                    break;
                }
            } else {
                self.on_idle();
            }
        }
        Ok(())
    }

    /// Handles one terminal event, then gives a throttled scroll its trailing pass.
    /// Returns true when the app should quit.
    fn dispatch(&mut self, event: Event) -> bool {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if self.handle_key(key) {
                    return true;
                }
            }
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            _ => {}
        }
        self.on_idle();
        false
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        match self.mode {
            Mode::Calendar => self.handle_calendar_key(key),
            Mode::Carousel(_) => {
                let input = match key.code {
                    KeyCode::Left | KeyCode::Char('h') => CarouselInput::ArrowLeft,
                    KeyCode::Right | KeyCode::Char('l') => CarouselInput::ArrowRight,
                    KeyCode::Esc => CarouselInput::Escape,
                    _ => return false,
                };
                self.carousel_input(input);
                false
            }
        }
    }

    fn handle_calendar_key(&mut self, key: KeyEvent) -> bool {
        let jump = key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::SUPER);
        let page = (self.calendar_area.height as f32 * self.config.page_fraction).round() as isize;
        let step = self.config.scroll_step_rows as isize;
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Home => self.scroll_to(0),
            KeyCode::End => self.scroll_to(usize::MAX),
            KeyCode::PageUp => self.scroll_by(-page.max(1)),
            KeyCode::PageDown => self.scroll_by(page.max(1)),
            KeyCode::Up if jump => self.scroll_by(-step),
            KeyCode::Down if jump => self.scroll_by(step),
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-7),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(7),
            KeyCode::Left | KeyCode::Char('h') => self.move_cursor(-1),
            KeyCode::Right | KeyCode::Char('l') => self.move_cursor(1),
            KeyCode::Enter | KeyCode::Char(' ') => self.activate_day(self.cursor),
            KeyCode::Char('r') => self.reload(),
            _ => {}
        }
        false
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        match self.mode {
            Mode::Calendar => match mouse.kind {
                MouseEventKind::ScrollUp => self.scroll_by(-WHEEL_ROWS),
                MouseEventKind::ScrollDown => self.scroll_by(WHEEL_ROWS),
                MouseEventKind::Down(MouseButton::Left) => {
                    if let Some(date) = self.cell_at(mouse.column, mouse.row).map(|c| c.date) {
                        if self.controller.window().contains(MonthRef::containing(date)) {
                            self.cursor = date;
                        }
                        self.activate_day(date);
                    }
                }
                _ => {}
            },
            Mode::Carousel(_) => match mouse.kind {
                MouseEventKind::Down(MouseButton::Left) => {
                    self.swipe.press(mouse.column as f32, mouse.row as f32);
                }
                MouseEventKind::Up(MouseButton::Left) => {
                    let delta = CarouselMetrics::terminal().swipe_delta;
                    match self.swipe.release(mouse.column as f32, delta) {
                        Some(Gesture::Swipe(input)) => self.carousel_input(input),
                        Some(Gesture::Tap { x, y }) => self.carousel_tap(x as u16, y as u16),
                        None => {}
                    }
                }
                _ => {}
            },
        }
    }

    fn carousel_tap(&mut self, x: u16, y: u16) {
        let Mode::Carousel(carousel) = &self.mode else {
            return;
        };
        let input = match carousel_layout(self.screen, carousel).hit(x, y) {
            CarouselHit::Close => CarouselInput::CloseButton,
            CarouselHit::Prev => CarouselInput::ArrowLeft,
            CarouselHit::Next => CarouselInput::ArrowRight,
            CarouselHit::Card(index) => CarouselInput::Select(index),
            CarouselHit::Outside => CarouselInput::OverlayClick,
            CarouselHit::Track => return,
        };
        self.carousel_input(input);
    }

    fn carousel_input(&mut self, input: CarouselInput) {
        let Mode::Carousel(carousel) = &mut self.mode else {
            return;
        };
        match carousel.handle(input) {
            Transition::Stay => {
                self.status = format!(
                    "Entry {} of {}: {}",
                    carousel.active() + 1,
                    carousel.entries().len(),
                    carousel.active_entry().description
                );
            }
            Transition::Close => {
                self.mode = Mode::Calendar;
                self.status = "Closed entries".into();
            }
        }
    }

    fn activate_day(&mut self, date: NaiveDate) {
        let key = DateKey::from_date(date);
        let count = self.entries.get(&key).len();
        let Some(start) = self.index.first_index(&key) else {
            self.status = cell_label(date, count);
            return;
        };
        match Carousel::open(self.index.shared(), start) {
            Some(carousel) => {
                tracing::debug!(date = %key, start, "opening carousel");
                self.status = format!("Entry {} of {}", start + 1, carousel.entries().len());
                self.mode = Mode::Carousel(carousel);
            }
            None => self.status = cell_label(date, count),
        }
    }

    fn move_cursor(&mut self, days: i64) {
        let target = if days >= 0 {
            self.cursor.checked_add_days(Days::new(days as u64))
        } else {
            self.cursor.checked_sub_days(Days::new(days.unsigned_abs()))
        };
        let Some(target) = target else {
            return;
        };
        let month = MonthRef::containing(target);
        if !self.controller.window().contains(month) {
            match self.controller.extend_to(month) {
                Some(ext) => self.apply_extensions(&[ext]),
                None => return,
            }
        }
        self.cursor = target;
        self.status = cell_label(target, self.entries.get(&DateKey::from_date(target)).len());
        self.reveal_cursor();
    }

    fn reveal_cursor(&mut self) {
        let Some(row) = self.cursor_row() else {
            return;
        };
        let height = self.calendar_area.height as usize;
        let mut top = self.scroll_top;
        if row < top + TITLE_ROWS {
            top = row.saturating_sub(TITLE_ROWS);
        } else if height > 0 && row + CELL_ROWS > top + height {
            top = (row + CELL_ROWS).saturating_sub(height);
        }
        if top != self.scroll_top {
            self.scroll_to(top);
        }
    }

    fn cursor_row(&self) -> Option<usize> {
        self.sections
            .iter()
            .find(|s| s.month.contains(self.cursor))?
            .row_of(self.cursor)
    }

    fn max_scroll(&self) -> usize {
        content_height(&self.sections).saturating_sub(self.calendar_area.height as usize)
    }

    fn scroll_by(&mut self, delta: isize) {
        let target = if delta >= 0 {
            self.scroll_top.saturating_add(delta as usize)
        } else {
            self.scroll_top.saturating_sub(delta.unsigned_abs())
        };
        self.scroll_to(target);
    }

    /// Every scroll request is a raw scroll event, even when clamped at an edge.
    fn scroll_to(&mut self, top: usize) {
        self.scroll_top = top.min(self.max_scroll());
        let now = self.clock.now();
        let viewport = CalendarViewport {
            sections: &self.sections,
            scroll_top: self.scroll_top,
            area: self.calendar_area,
        };
        let outcome = self.controller.on_scroll(now, &viewport);
        self.apply_outcome(outcome);
    }

    fn on_idle(&mut self) {
        let now = self.clock.now();
        let viewport = CalendarViewport {
            sections: &self.sections,
            scroll_top: self.scroll_top,
            area: self.calendar_area,
        };
        let outcome = self.controller.on_idle(now, &viewport);
        self.apply_outcome(outcome);
    }

    fn apply_outcome(&mut self, outcome: ScrollOutcome) {
        if !outcome.processed {
            return;
        }
        if !outcome.extensions.is_empty() {
            self.apply_extensions(&outcome.extensions);
        }
        if outcome.label_changed {
            tracing::debug!(label = %self.controller.label(), "current month changed");
        }
    }

    /// Relayouts after window growth, keeping the visible content in place.
    fn apply_extensions(&mut self, extensions: &[Extension]) {
        let week_start = self.config.week_start;
        for ext in extensions {
            match ext.edge {
                Edge::Front => {
                    self.scroll_top += section_height(ext.added, week_start);
                }
                Edge::Back => {
                    let removed: usize = ext
                        .dropped
                        .iter()
                        .map(|&m| section_height(m, week_start))
                        .sum();
                    self.scroll_top = self.scroll_top.saturating_sub(removed);
                }
            }
        }
        self.sections = layout_sections(self.controller.window().months(), week_start);
        self.scroll_top = self.scroll_top.min(self.max_scroll());
        self.clamp_cursor();
    }

    fn clamp_cursor(&mut self) {
        let window = self.controller.window();
        if self.cursor < window.first().first_day() {
            self.cursor = window.first().first_day();
        } else if !window.contains(MonthRef::containing(self.cursor)) {
            let last = window.last();
            self.cursor = last
                .first_day()
                .checked_add_days(Days::new(last.days() as u64 - 1))
                .unwrap_or(last.first_day());
        }
    }

    fn cell_at(&self, column: u16, row: u16) -> Option<&DayCell> {
        let area = self.calendar_area;
        if !contains(area, column, row) {
            return None;
        }
        let content_row = self.scroll_top + (row - area.y) as usize;
        let section = self
            .sections
            .iter()
            .find(|s| content_row >= s.top && content_row < s.bottom())?;
        let local = content_row - section.top;
        if local < TITLE_ROWS {
            return None;
        }
        let week = (local - TITLE_ROWS) / CELL_ROWS;
        let col = (column - area.x) as usize / cell_width(area.width);
        if col >= 7 {
            return None;
        }
        section.cells.get(week * 7 + col)
    }

    fn reload(&mut self) {
        match load_dataset(&self.data_path) {
            Ok(dataset) => {
                self.replace_dataset(dataset);
                self.status = format!("Reloaded {} entries", self.index.len());
            }
            Err(err) => {
                tracing::warn!(error = %err, "reload failed");
                self.status = format!("Reload failed: {:#}", err);
            }
        }
    }

    /// Swaps in a freshly built index; the old one is never patched in place.
    fn replace_dataset(&mut self, dataset: Dataset) {
        let index = EntryIndex::build(&dataset.entries);
        self.entries = dataset.entries;
        self.index = index;
        self.skipped = dataset.skipped.len();
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let screen = f.size();
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Min(4),
                Constraint::Length(3),
            ])
            .split(screen);

        if layout[2] != self.calendar_area {
            self.calendar_area = layout[2];
            self.needs_measure = true;
        }
        self.screen = screen;

        self.draw_header(f, layout[0]);
        self.draw_weekdays(f, layout[1]);
        self.draw_calendar(f, layout[2]);
        self.draw_footer(f, layout[3]);

        if let Mode::Carousel(carousel) = &self.mode {
            draw_carousel(f, screen, carousel);
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let mut spans = vec![
            Span::styled(
                "daybook ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                self.controller.label().label(),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("{} entries", self.index.len()),
                Style::default().fg(Color::Green),
            ),
        ];
        if self.skipped > 0 {
            spans.push(Span::styled(
                format!(" ({} skipped)", self.skipped),
                Style::default().fg(Color::LightRed),
            ));
        }
        spans.extend([
            Span::raw("  •  "),
            Span::styled(
                format!("{}", self.data_path.display()),
                Style::default().fg(Color::DarkGray),
            ),
        ]);
        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_weekdays(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let width = cell_width(area.width);
        let spans: Vec<Span<'static>> = self
            .config
            .week_start
            .labels()
            .iter()
            .map(|label| {
                Span::styled(
                    format!("{:^width$}", label, width = width),
                    Style::default()
                        .fg(Color::Gray)
                        .add_modifier(Modifier::BOLD),
                )
            })
            .collect();
        f.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn draw_calendar(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let width = cell_width(area.width);
        let lines: Vec<Line<'static>> = (self.scroll_top..self.scroll_top + area.height as usize)
            .map(|row| {
                self.sections
                    .iter()
                    .find(|s| row >= s.top && row < s.bottom())
                    .map(|s| self.section_line(s, row - s.top, width))
                    .unwrap_or_default()
            })
            .collect();
        f.render_widget(Paragraph::new(lines), area);
    }

    fn section_line(&self, section: &Section, local: usize, width: usize) -> Line<'static> {
        if local < TITLE_ROWS {
            return Line::from(vec![
                Span::styled("── ", Style::default().fg(Color::DarkGray)),
                Span::styled(
                    section.month.label(),
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(" ──", Style::default().fg(Color::DarkGray)),
            ]);
        }
        let week = (local - TITLE_ROWS) / CELL_ROWS;
        let part = (local - TITLE_ROWS) % CELL_ROWS;
        let spans = section
            .cells
            .iter()
            .skip(week * 7)
            .take(7)
            .map(|cell| self.cell_span(cell, part, width))
            .collect::<Vec<_>>();
        Line::from(spans)
    }

    fn cell_span(&self, cell: &DayCell, part: usize, width: usize) -> Span<'static> {
        let day = self.entries.get(&cell.key);
        let first = day.first();
        let text = match part {
            0 => {
                let count = if day.len() > 1 {
                    format!(" ×{}", day.len())
                } else {
                    String::new()
                };
                format!("{:>2}{}", cell.date.day(), count)
            }
            1 => first.map(|e| stars(e.rating)).unwrap_or_default(),
            _ => first.map(thumbnail_line).unwrap_or_default(),
        };
        let mut style = if cell.is_other_month {
            Style::default().fg(Color::DarkGray)
        } else if day.is_empty() {
            Style::default().fg(Color::Gray)
        } else if part == 1 {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::LightYellow)
        };
        if part == 0 && cell.date == self.today {
            style = style.add_modifier(Modifier::UNDERLINED | Modifier::BOLD);
        }
        if matches!(self.mode, Mode::Calendar) && cell.date == self.cursor && !cell.is_other_month
        {
            style = style
                .bg(Color::Cyan)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD);
        }
        Span::styled(fit(&text, width), style)
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(1)])
            .split(area);

        let help_bar = Paragraph::new(self.footer_help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(help_bar, rows[0]);

        let status = Paragraph::new(self.status.clone()).style(Style::default().fg(Color::Gray));
        f.render_widget(status, rows[1]);
    }

    fn footer_help_line(&self) -> Line<'static> {
        let key = |k: &'static str, color: Color| Span::styled(k, Style::default().fg(color));
        let spans = match self.mode {
            Mode::Calendar => vec![
                key("←↑↓→ / h j k l", Color::LightCyan),
                Span::raw(" move  "),
                key("Enter", Color::LightYellow),
                Span::raw(" open  "),
                key("PgUp/PgDn", Color::LightCyan),
                Span::raw(" page  "),
                key("Ctrl+↑↓", Color::LightCyan),
                Span::raw(" scroll  "),
                key("Home/End", Color::LightCyan),
                Span::raw(" edges  "),
                key("r", Color::LightGreen),
                Span::raw(" reload  "),
                key("q", Color::LightRed),
                Span::raw(" quit"),
            ],
            Mode::Carousel(_) => vec![
                key("←→", Color::LightCyan),
                Span::raw(" navigate  "),
                key("drag", Color::LightCyan),
                Span::raw(" swipe  "),
                key("click", Color::LightYellow),
                Span::raw(" select card  "),
                key("Esc", Color::LightRed),
                Span::raw(" close"),
            ],
        };
        Line::from(spans)
    }
}

fn draw_carousel(f: &mut ratatui::Frame<'_>, screen: Rect, carousel: &Carousel) {
    let layout = carousel_layout(screen, carousel);
    f.render_widget(Clear, screen);
    f.render_widget(
        Block::default().style(Style::default().bg(Color::Rgb(10, 11, 16))),
        screen,
    );
    let counter = Paragraph::new(format!(
        "{} / {}",
        carousel.active() + 1,
        carousel.entries().len()
    ))
    .alignment(Alignment::Center)
    .style(Style::default().fg(Color::Gray));
    f.render_widget(counter, Rect::new(layout.wrapper.x, layout.wrapper.y, layout.wrapper.width, 1));

    for (index, rect) in &layout.cards {
        let entry = &carousel.entries()[*index];
        f.render_widget(Clear, *rect);
        f.render_widget(card_paragraph(entry, *index == carousel.active()), *rect);
    }

    let arrow_style = Style::default()
        .fg(Color::Black)
        .bg(Color::LightCyan)
        .add_modifier(Modifier::BOLD);
    if let Some(prev) = layout.prev {
        f.render_widget(Paragraph::new("‹ ").style(arrow_style), prev);
    }
    if let Some(next) = layout.next {
        f.render_widget(Paragraph::new(" ›").style(arrow_style), next);
    }
    f.render_widget(
        Paragraph::new("[×]").style(Style::default().fg(Color::LightRed)),
        layout.close,
    );
}

fn card_paragraph(entry: &Entry, active: bool) -> Paragraph<'static> {
    let accent = if active { Color::Cyan } else { Color::DarkGray };
    let category = entry.first_category().unwrap_or_default().to_string();
    let lines = vec![
        Line::from(vec![
            Span::styled(
                format!(" {} ", category),
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::LightMagenta)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(stars(entry.rating), Style::default().fg(Color::LightYellow)),
        ]),
        Line::from(Span::styled(
            entry_heading(entry),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(entry.description.clone()),
        Line::from(Span::styled("────────", Style::default().fg(Color::DarkGray))),
        Line::from(Span::styled(
            entry.img_url.clone(),
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(Span::styled(
            "View full post",
            Style::default()
                .fg(Color::LightCyan)
                .add_modifier(Modifier::UNDERLINED),
        )),
    ];
    let mut style = Style::default().bg(Color::Rgb(22, 24, 30)).fg(Color::Gray);
    if !active {
        style = style.add_modifier(Modifier::DIM);
    }
    Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .style(style)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(accent)),
        )
}

/// "15 March" for a canonical key, or the raw key when it does not parse.
fn entry_heading(entry: &Entry) -> String {
    match entry.date.date() {
        Some(date) => date.format("%-d %B").to_string(),
        None => entry.date.to_string(),
    }
}

fn thumbnail_line(entry: &Entry) -> String {
    match entry.first_category().and_then(|c| c.chars().next()) {
        Some(initial) => format!("▣ {}", initial.to_uppercase()),
        None => "▣".to_string(),
    }
}

pub fn stars(rating: u8) -> String {
    (1..=5)
        .map(|i| if rating >= i { '★' } else { '☆' })
        .collect()
}

fn cell_label(date: NaiveDate, count: usize) -> String {
    let base = date.format("%a, %B %-d").to_string();
    match count {
        0 => base,
        1 => format!("{}, 1 journal entry", base),
        n => format!("{}, {} journal entries", base, n),
    }
}

fn cell_width(area_width: u16) -> usize {
    (area_width / 7).max(1) as usize
}

fn fit(text: &str, width: usize) -> String {
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    let len = out.chars().count();
    out.extend(std::iter::repeat(' ').take(width - len));
    out
}

fn contains(area: Rect, x: u16, y: u16) -> bool {
    x >= area.x && x < area.right() && y >= area.y && y < area.bottom()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::model::sample_entry;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dataset() -> Dataset {
        let mut entries = EntriesByDate::default();
        entries.insert(sample_entry("2024-03-02", 2, "market"));
        entries.insert(sample_entry("2024-03-15", 5, "sunrise"));
        entries.insert(sample_entry("2024-03-15", 4, "lunch"));
        entries.insert(sample_entry("2024-03-15", 3, "rain walk"));
        entries.insert(sample_entry("2024-04-01", 1, "prank"));
        Dataset {
            entries,
            skipped: vec![],
        }
    }

    fn app() -> (App, FixedClock) {
        let clock = FixedClock::new(date(2024, 3, 15));
        let mut app = App::new(
            Config::default(),
            PathBuf::from("journal.json"),
            dataset(),
            Box::new(clock.clone()),
        );
        app.screen = Rect::new(0, 0, 77, 38);
        app.calendar_area = Rect::new(0, 4, 77, 30);
        (app, clock)
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn opens_at_first_entry_of_the_day() {
        let (mut app, _) = app();
        press(&mut app, KeyCode::Enter);
        let Mode::Carousel(carousel) = &app.mode else {
            panic!("carousel should be open");
        };
        let start = carousel.active();
        assert_eq!(start, 1);
        let day: Vec<_> = carousel.entries()[start..start + 3]
            .iter()
            .map(|e| e.description.as_str())
            .collect();
        assert_eq!(day, vec!["sunrise", "lunch", "rain walk"]);

        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Esc);
        assert!(matches!(app.mode, Mode::Calendar));
    }

    #[test]
    fn empty_day_does_not_open() {
        let (mut app, _) = app();
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Enter);
        assert!(matches!(app.mode, Mode::Calendar));
        assert_eq!(app.status, "Sat, March 16");
    }

    #[test]
    fn home_prepends_and_keeps_content_anchored() {
        let (mut app, _) = app();
        // Feb 2024 occupies five weeks: 1 + 5 * 3 rows.
        assert_eq!(app.scroll_top, 16);
        press(&mut app, KeyCode::Home);
        let window = app.controller.window();
        assert_eq!(window.first(), MonthRef::new(2024, 0).unwrap());
        assert_eq!(window.len(), 4);
        assert_eq!(app.scroll_top, 16);
        assert_eq!(app.sections[1].month, MonthRef::new(2024, 1).unwrap());
        assert_eq!(app.sections[1].top, 16);
    }

    #[test]
    fn burst_of_scroll_requests_is_throttled() {
        let (mut app, clock) = app();
        for _ in 0..10 {
            press(&mut app, KeyCode::Home);
        }
        assert_eq!(app.controller.window().len(), 4);
        clock.advance(Duration::from_millis(20));
        press(&mut app, KeyCode::Home);
        assert_eq!(app.controller.window().len(), 5);
    }

    #[test]
    fn cursor_walks_into_unmounted_month() {
        let (mut app, _) = app();
        for _ in 0..10 {
            press(&mut app, KeyCode::Char('j'));
        }
        assert_eq!(app.cursor, date(2024, 5, 24));
        let window = app.controller.window();
        assert!(window.contains(MonthRef::new(2024, 4).unwrap()));
        assert!(window.is_contiguous());
        let row = app.cursor_row().unwrap();
        assert!(row >= app.scroll_top);
        assert!(row + CELL_ROWS <= app.scroll_top + app.calendar_area.height as usize);
    }

    #[test]
    fn click_maps_to_day_cell() {
        let (app, _) = app();
        // Row 4 is March's title; the first week starts one row below.
        let cell = app.cell_at(0, 5).unwrap();
        assert_eq!(cell.key.as_str(), "2024-02-25");
        assert!(cell.is_other_month);
        let cell = app.cell_at(5 * 11, 5 + 2 * 3).unwrap();
        assert_eq!(cell.key.as_str(), "2024-03-15");
        assert!(app.cell_at(0, 4).is_none());
        assert!(app.cell_at(0, 2).is_none());
    }

    #[test]
    fn clicking_a_populated_cell_opens_carousel() {
        let (mut app, _) = app();
        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), 55, 11));
        assert!(matches!(app.mode, Mode::Carousel(_)));
        assert_eq!(app.cursor, date(2024, 3, 15));
    }

    #[test]
    fn carousel_layout_centers_active_and_hides_illegal_arrows() {
        let entries = dataset();
        let index = EntryIndex::build(&entries.entries);
        let carousel = Carousel::open(index.shared(), 0).unwrap();
        let layout = carousel_layout(Rect::new(0, 0, 84, 30), &carousel);
        assert_eq!(layout.wrapper, Rect::new(2, 2, 80, 26));
        assert!(layout.prev.is_none());
        assert!(layout.next.is_some());
        let (first, rect) = layout.cards[0];
        assert_eq!(first, 0);
        assert_eq!(rect.x, 2 + 12);
        assert_eq!(rect.width, 56);
        assert_eq!(layout.hit(40, 15), CarouselHit::Card(0));
        assert_eq!(layout.hit(78, 15), CarouselHit::Card(1));
        assert_eq!(layout.hit(0, 0), CarouselHit::Outside);
        assert_eq!(layout.hit(80, 2), CarouselHit::Close);
    }

    #[test]
    fn drag_swipes_and_outside_click_closes() {
        let (mut app, _) = app();
        press(&mut app, KeyCode::Enter);
        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), 40, 15));
        app.handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left), 30, 15));
        let Mode::Carousel(carousel) = &app.mode else {
            panic!("carousel should stay open");
        };
        assert_eq!(carousel.active(), 2);

        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), 0, 0));
        app.handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left), 0, 0));
        assert!(matches!(app.mode, Mode::Calendar));
    }

    #[test]
    fn replacing_dataset_rebuilds_index() {
        let (mut app, _) = app();
        let mut entries = EntriesByDate::default();
        entries.insert(sample_entry("2024-03-16", 3, "new"));
        app.replace_dataset(Dataset {
            entries,
            skipped: vec!["bad".into()],
        });
        assert_eq!(app.index.len(), 1);
        assert_eq!(app.skipped, 1);
        press(&mut app, KeyCode::Enter);
        assert!(matches!(app.mode, Mode::Calendar));
    }

    #[test]
    fn labels_and_stars() {
        assert_eq!(stars(3), "★★★☆☆");
        assert_eq!(cell_label(date(2024, 3, 15), 0), "Fri, March 15");
        assert_eq!(
            cell_label(date(2024, 3, 15), 3),
            "Fri, March 15, 3 journal entries"
        );
        assert_eq!(cell_label(date(2024, 3, 15), 1), "Fri, March 15, 1 journal entry");
        assert_eq!(fit("★★★★★", 4), "★★★ ");
        assert_eq!(fit("7", 4), "7   ");
    }

    fn press_with(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> bool {
        app.handle_key(KeyEvent::new(code, modifiers))
    }

    #[test]
    fn end_scrolls_to_bottom_and_appends() {
        let (mut app, _) = app();
        press(&mut app, KeyCode::End);
        // Feb, Mar and Apr stack to 51 rows in a 30 row pane.
        assert_eq!(app.scroll_top, 21);
        let window = app.controller.window();
        assert_eq!(window.len(), 4);
        assert_eq!(window.last(), MonthRef::new(2024, 4).unwrap());
        assert_eq!(app.max_scroll(), 37);
    }

    #[test]
    fn page_keys_move_by_fraction_of_pane() {
        let (mut app, _) = app();
        app.calendar_area = Rect::new(0, 4, 77, 10);
        press(&mut app, KeyCode::PageDown);
        assert_eq!(app.scroll_top, 24);
        press(&mut app, KeyCode::PageUp);
        assert_eq!(app.scroll_top, 16);
        press(&mut app, KeyCode::PageUp);
        assert_eq!(app.scroll_top, 8);
        assert_eq!(app.controller.window().len(), 3);
    }

    #[test]
    fn modified_arrows_scroll_without_moving_cursor() {
        let (mut app, _) = app();
        app.calendar_area = Rect::new(0, 4, 77, 10);
        press_with(&mut app, KeyCode::Down, KeyModifiers::CONTROL);
        assert_eq!(app.scroll_top, 22);
        press_with(&mut app, KeyCode::Up, KeyModifiers::SUPER);
        assert_eq!(app.scroll_top, 16);
        assert_eq!(app.cursor, date(2024, 3, 15));
    }

    #[test]
    fn open_carousel_swallows_calendar_keys() {
        let (mut app, _) = app();
        press(&mut app, KeyCode::Enter);
        for code in [
            KeyCode::Home,
            KeyCode::End,
            KeyCode::PageDown,
            KeyCode::PageUp,
            KeyCode::Down,
        ] {
            press(&mut app, code);
        }
        assert!(!press(&mut app, KeyCode::Char('q')));
        assert!(matches!(app.mode, Mode::Carousel(_)));
        assert_eq!(app.scroll_top, 16);
        assert_eq!(app.controller.window().len(), 3);
        assert_eq!(app.cursor, date(2024, 3, 15));
    }

    #[test]
    fn any_event_runs_the_trailing_scroll_pass() {
        let (mut app, clock) = app();
        press(&mut app, KeyCode::Home);
        assert_eq!(app.controller.label(), MonthRef::new(2024, 1).unwrap());
        // Dropped by the throttle: same instant as Home.
        press(&mut app, KeyCode::PageDown);
        assert_eq!(app.scroll_top, 37);
        assert_eq!(app.controller.window().len(), 4);

        clock.advance(Duration::from_millis(20));
        let quit = app.dispatch(Event::Mouse(mouse(MouseEventKind::Moved, 1, 1)));
        assert!(!quit);
        assert_eq!(app.controller.label(), MonthRef::new(2024, 3).unwrap());
        assert_eq!(app.controller.window().last(), MonthRef::new(2024, 4).unwrap());

        let key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        assert!(app.dispatch(Event::Key(key)));
    }
}
