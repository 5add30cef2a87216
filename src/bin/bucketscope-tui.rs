use std::io::{self, stdout};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use tracing_subscriber::EnvFilter;

use bucketscope::format::format_bytes;
use bucketscope::gateway::{FetchEvent, Fetcher, Gateway, DEFAULT_ENDPOINT};
use bucketscope::model::BucketStatus;
use bucketscope::render_tree::TreeRow;
use bucketscope::session::{BucketListState, DetailState, Session, View};

#[derive(Parser)]
#[command(
    name = "bucketscope-tui",
    version,
    about = "Terminal browser for bucket storage usage"
)]
struct Args {
    /// Backend endpoint serving bucket summaries and trees.
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pane {
    Buckets,
    Tree,
}

#[derive(Default, Clone, Copy)]
struct UiLayoutState {
    buckets_area: Option<Rect>,
    tree_area: Option<Rect>,
}

struct App {
    endpoint: String,
    session: Session,
    fetcher: Fetcher,
    rx: Receiver<FetchEvent>,

    focus: Pane,
    bucket_cursor: usize,
    bucket_scroll: usize,
    tree_cursor: usize,
    tree_scroll: usize,
    /// Rows as of the last draw; key and mouse handling indexes into these.
    rows: Vec<TreeRow>,

    status: String,
    ui_layout: UiLayoutState,
    should_quit: bool,
}

impl App {
    fn new(endpoint: String, fetcher: Fetcher, rx: Receiver<FetchEvent>) -> Self {
        // The bucket list is fetched once on entry; every view reads it.
        let mut session = Session::new();
        session.begin_bucket_list();
        fetcher.request_bucket_list();

        Self {
            endpoint,
            session,
            fetcher,
            rx,
            focus: Pane::Buckets,
            bucket_cursor: 0,
            bucket_scroll: 0,
            tree_cursor: 0,
            tree_scroll: 0,
            rows: Vec::new(),
            status: String::from("Loading bucket list..."),
            ui_layout: UiLayoutState::default(),
            should_quit: false,
        }
    }

    fn poll_fetch_events(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(event) => {
                    self.session.apply(event);
                    self.refresh_status();
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.status = String::from("Fetch channel disconnected");
                    break;
                }
            }
        }

        let len = self.session.bucket_list().len();
        if len > 0 && self.bucket_cursor >= len {
            self.bucket_cursor = len - 1;
        }
    }

    fn refresh_status(&mut self) {
        self.status = match self.session.detail() {
            DetailState::Failed {
                bucket_name,
                message,
            } => format!("Failed to load '{}': {}", bucket_name, message),
            DetailState::Loaded(loaded) => format!(
                "Loaded '{}': {} folders, {} total",
                loaded.bucket_name,
                loaded.folder_count(),
                format_bytes(loaded.total_size())
            ),
            DetailState::Loading(request) => format!("Fetching '{}'...", request.bucket_name),
            DetailState::Idle => match self.session.buckets() {
                BucketListState::Loading => String::from("Loading bucket list..."),
                BucketListState::Failed(message) => {
                    format!("Bucket list unavailable: {}", message)
                }
                BucketListState::Ready(list) if list.is_empty() => {
                    String::from("No buckets to show.")
                }
                BucketListState::Ready(list) => {
                    format!("{} buckets. Enter opens the selected one.", list.len())
                }
            },
        };
    }

    fn on_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c'))
        {
            self.should_quit = true;
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Tab => self.toggle_focus(),
            KeyCode::Left => self.focus = Pane::Buckets,
            KeyCode::Right => self.focus = Pane::Tree,
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1),
            KeyCode::Enter => self.activate(),
            KeyCode::Char(' ') => self.toggle_row(),
            KeyCode::Char('h') | KeyCode::Esc => self.go_home(),
            KeyCode::Char('r') => self.refetch_bucket(),
            KeyCode::Char('R') => self.reload_list(),
            KeyCode::Char('c') => self.collapse_all(),
            _ => {}
        }
    }

    fn on_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(area) = self.ui_layout.buckets_area {
                    if point_in_rect(area, mouse.column, mouse.row) {
                        let index = self.bucket_scroll + (mouse.row - area.y) as usize;
                        if index < self.session.bucket_list().len() {
                            self.focus = Pane::Buckets;
                            self.bucket_cursor = index;
                            self.open_selected_bucket();
                        }
                        return;
                    }
                }
                if let Some(area) = self.ui_layout.tree_area {
                    if point_in_rect(area, mouse.column, mouse.row) {
                        let index = self.tree_scroll + (mouse.row - area.y) as usize;
                        if index < self.rows.len() {
                            self.focus = Pane::Tree;
                            self.tree_cursor = index;
                            self.toggle_row();
                        }
                    }
                }
            }
            MouseEventKind::ScrollUp => self.move_cursor(-1),
            MouseEventKind::ScrollDown => self.move_cursor(1),
            _ => {}
        }
    }

    fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Pane::Buckets => Pane::Tree,
            Pane::Tree => Pane::Buckets,
        };
    }

    fn move_cursor(&mut self, delta: i64) {
        match self.focus {
            Pane::Buckets => {
                let len = self.session.bucket_list().len();
                self.bucket_cursor = step(self.bucket_cursor, delta, len);
            }
            Pane::Tree => {
                let len = self.rows.len();
                self.tree_cursor = step(self.tree_cursor, delta, len);
            }
        }
    }

    fn activate(&mut self) {
        match self.focus {
            Pane::Buckets => self.open_selected_bucket(),
            Pane::Tree => self.toggle_row(),
        }
    }

    fn open_selected_bucket(&mut self) {
        let Some(bucket) = self.session.bucket_list().get(self.bucket_cursor) else {
            return;
        };
        let bucket_name = bucket.bucket_name.clone();

        let request = self.session.open_bucket(&bucket_name);
        self.fetcher.request_bucket_detail(request);
        self.focus = Pane::Tree;
        self.tree_cursor = 0;
        self.tree_scroll = 0;
        self.status = format!("Opening '{}'...", bucket_name);
    }

    fn toggle_row(&mut self) {
        if self.focus != Pane::Tree {
            return;
        }
        let Some(row) = self.rows.get(self.tree_cursor) else {
            return;
        };
        let (id, name, has_children) = (row.id, row.name.clone(), row.has_children);

        if !has_children {
            self.status = format!("'{}' has no subfolders", name);
            return;
        }

        if let DetailState::Loaded(loaded) = self.session.detail_mut() {
            let expanded = loaded.toggle(id);
            self.status = if expanded {
                format!("Expanded '{}'", name)
            } else {
                format!("Collapsed '{}'", name)
            };
        }
    }

    fn go_home(&mut self) {
        self.session.go_home();
        self.focus = Pane::Buckets;
        self.tree_cursor = 0;
        self.tree_scroll = 0;
        self.status = String::from("Select a bucket from the list to see its breakdown.");
    }

    fn refetch_bucket(&mut self) {
        if let View::Bucket(bucket_name) = self.session.view().clone() {
            let request = self.session.open_bucket(&bucket_name);
            self.fetcher.request_bucket_detail(request);
            self.tree_cursor = 0;
            self.tree_scroll = 0;
            self.status = format!("Refreshing '{}'...", bucket_name);
        }
    }

    /// Re-enter the root: back to Home with a freshly fetched list.
    fn reload_list(&mut self) {
        self.session.go_home();
        self.session.begin_bucket_list();
        self.fetcher.request_bucket_list();
        self.focus = Pane::Buckets;
        self.bucket_cursor = 0;
        self.bucket_scroll = 0;
        self.tree_cursor = 0;
        self.tree_scroll = 0;
        self.status = String::from("Reloading bucket list...");
    }

    fn collapse_all(&mut self) {
        if let DetailState::Loaded(loaded) = self.session.detail_mut() {
            loaded.collapse_all();
            self.tree_cursor = 0;
            self.tree_scroll = 0;
            self.status = String::from("Collapsed all folders");
        }
    }
}

fn step(current: usize, delta: i64, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    if delta < 0 {
        current.saturating_sub(delta.unsigned_abs() as usize)
    } else {
        (current + delta as usize).min(len - 1)
    }
}

fn point_in_rect(rect: Rect, x: u16, y: u16) -> bool {
    x >= rect.x
        && x < rect.x.saturating_add(rect.width)
        && y >= rect.y
        && y < rect.y.saturating_add(rect.height)
}

/// Keep the cursor inside the visible window, moving the window as
/// little as possible.
fn scroll_window(scroll: usize, cursor: usize, visible: usize) -> usize {
    if visible == 0 {
        return 0;
    }
    if cursor < scroll {
        cursor
    } else if cursor >= scroll + visible {
        cursor + 1 - visible
    } else {
        scroll
    }
}

fn pane_border(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn draw_ui(frame: &mut Frame, app: &mut App) {
    let root = frame.area();
    let vsplit = Layout::vertical([
        Constraint::Min(10),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .split(root);

    let hsplit =
        Layout::horizontal([Constraint::Length(38), Constraint::Min(30)]).split(vsplit[0]);
    draw_buckets_pane(frame, app, hsplit[0]);
    draw_content_pane(frame, app, hsplit[1]);
    draw_status(frame, app, vsplit[1]);
    draw_help(frame, vsplit[2]);
}

fn draw_buckets_pane(frame: &mut Frame, app: &mut App, area: Rect) {
    let focused = app.focus == Pane::Buckets;
    let block = Block::default()
        .title(" Buckets ")
        .borders(Borders::ALL)
        .border_style(pane_border(focused));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    app.ui_layout.buckets_area = Some(inner);

    match app.session.buckets() {
        BucketListState::Loading => {
            frame.render_widget(
                Paragraph::new("Loading buckets...").style(Style::default().fg(Color::Gray)),
                inner,
            );
            return;
        }
        BucketListState::Failed(message) => {
            let lines = vec![
                Line::from(Span::styled(
                    "No buckets to show.",
                    Style::default().fg(Color::Red),
                )),
                Line::from(message.as_str()),
            ];
            frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
            return;
        }
        BucketListState::Ready(list) if list.is_empty() => {
            frame.render_widget(
                Paragraph::new("No buckets to show.").style(Style::default().fg(Color::Gray)),
                inner,
            );
            return;
        }
        BucketListState::Ready(_) => {}
    }

    let visible = inner.height as usize;
    app.bucket_scroll = scroll_window(app.bucket_scroll, app.bucket_cursor, visible);

    let current = match app.session.view() {
        View::Bucket(name) => Some(name.clone()),
        _ => None,
    };

    let mut lines: Vec<Line> = Vec::new();
    for (i, bucket) in app
        .session
        .bucket_list()
        .iter()
        .enumerate()
        .skip(app.bucket_scroll)
        .take(visible)
    {
        let marker = if bucket.status == BucketStatus::Manual {
            " [manual]"
        } else {
            ""
        };
        let text = format!(
            "{}{}  {}",
            bucket.bucket_name,
            marker,
            format_bytes(bucket.size)
        );

        let mut style = Style::default();
        if current.as_deref() == Some(bucket.bucket_name.as_str()) {
            style = style.fg(Color::Green);
        }
        if i == app.bucket_cursor && focused {
            style = style.add_modifier(Modifier::REVERSED);
        } else if i == app.bucket_cursor {
            style = style.add_modifier(Modifier::BOLD);
        }
        lines.push(Line::from(Span::styled(text, style)));
    }
    frame.render_widget(Paragraph::new(lines), inner);
}

fn draw_content_pane(frame: &mut Frame, app: &mut App, area: Rect) {
    match app.session.view().clone() {
        View::Home => draw_home(frame, app, area),
        View::Error => draw_error(frame, app, area),
        View::Bucket(bucket_name) => draw_bucket(frame, app, area, &bucket_name),
    }
}

fn draw_home(frame: &mut Frame, app: &mut App, area: Rect) {
    app.ui_layout.tree_area = None;

    let block = Block::default()
        .title(" Overview ")
        .borders(Borders::ALL)
        .border_style(pane_border(app.focus == Pane::Tree));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines: Vec<Line> = Vec::new();
    if matches!(app.session.buckets(), BucketListState::Loading) {
        lines.push(Line::from("Loading buckets..."));
    } else if app.session.list_is_empty() {
        lines.push(Line::from("No buckets to show."));
        if let Some(message) = app.session.list_error() {
            lines.push(Line::from(message));
        }
    } else {
        lines.push(Line::from(
            "Select a bucket from the list to see its breakdown.",
        ));
    }
    frame.render_widget(
        Paragraph::new(lines)
            .style(Style::default().fg(Color::Gray))
            .wrap(Wrap { trim: true }),
        inner,
    );
}

fn draw_error(frame: &mut Frame, app: &mut App, area: Rect) {
    app.ui_layout.tree_area = None;

    let block = Block::default()
        .title(" Error ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = vec![Line::from(Span::styled(
        "Something went wrong.",
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    ))];
    if let DetailState::Failed {
        bucket_name,
        message,
    } = app.session.detail()
    {
        lines.push(Line::from(format!(
            "Bucket '{}' could not be loaded.",
            bucket_name
        )));
        lines.push(Line::from(message.as_str()));
    }
    lines.push(Line::from(""));
    lines.push(Line::from("Pick another bucket from the list to continue."));

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}

fn draw_bucket(frame: &mut Frame, app: &mut App, area: Rect, bucket_name: &str) {
    let vsplit = Layout::vertical([Constraint::Length(4), Constraint::Min(5)]).split(area);
    draw_bucket_header(frame, app, vsplit[0], bucket_name);
    draw_tree(frame, app, vsplit[1]);
}

fn draw_bucket_header(frame: &mut Frame, app: &App, area: Rect, bucket_name: &str) {
    let block = Block::default().title(" Bucket ").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines: Vec<Line> = Vec::new();
    match app.session.detail() {
        DetailState::Loading(_) => {
            lines.push(Line::from(Span::styled(
                bucket_name.to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(Span::styled(
                "Fetching...",
                Style::default().fg(Color::Gray),
            )));
        }
        DetailState::Loaded(loaded) => {
            let mut title = vec![
                Span::styled(
                    loaded.bucket_name.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw("  "),
                Span::styled(
                    format_bytes(loaded.total_size()),
                    Style::default().fg(Color::Yellow),
                ),
            ];
            if loaded.manual {
                title.push(Span::styled(
                    "  [manual]",
                    Style::default().fg(Color::Magenta),
                ));
            }
            lines.push(Line::from(title));

            if !loaded.datetime.is_empty() {
                lines.push(Line::from(Span::styled(
                    format!("Snapshot taken {}", loaded.datetime),
                    Style::default().fg(Color::Gray),
                )));
            }
        }
        _ => {
            lines.push(Line::from(bucket_name.to_string()));
        }
    }
    frame.render_widget(Paragraph::new(lines), inner);
}

fn draw_tree(frame: &mut Frame, app: &mut App, area: Rect) {
    let focused = app.focus == Pane::Tree;
    let block = Block::default()
        .title(" Folders ")
        .borders(Borders::ALL)
        .border_style(pane_border(focused));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    app.ui_layout.tree_area = Some(inner);

    if let DetailState::Loaded(loaded) = app.session.detail_mut() {
        app.rows = loaded.rows();
    } else {
        app.rows.clear();
    }

    if app.rows.is_empty() {
        if matches!(app.session.detail(), DetailState::Loaded(_)) {
            frame.render_widget(
                Paragraph::new("This bucket has no folders.")
                    .style(Style::default().fg(Color::Gray)),
                inner,
            );
        }
        return;
    }

    app.tree_cursor = app.tree_cursor.min(app.rows.len() - 1);
    let visible = inner.height as usize;
    app.tree_scroll = scroll_window(app.tree_scroll, app.tree_cursor, visible);

    let mut lines: Vec<Line> = Vec::new();
    for (i, row) in app
        .rows
        .iter()
        .enumerate()
        .skip(app.tree_scroll)
        .take(visible)
    {
        let indent = "  ".repeat(row.depth as usize);
        let arrow = if !row.has_children {
            "  "
        } else if row.expanded {
            "▾ "
        } else {
            "▸ "
        };
        let text = format!(
            "{}{}{}  {}",
            indent,
            arrow,
            row.name,
            format_bytes(row.size)
        );

        let mut style = Style::default();
        if !row.has_children {
            style = style.fg(Color::Gray);
        }
        if i == app.tree_cursor && focused {
            style = style.add_modifier(Modifier::REVERSED);
        }
        lines.push(Line::from(Span::styled(text, style)));
    }
    frame.render_widget(Paragraph::new(lines), inner);
}

fn draw_status(frame: &mut Frame, app: &App, area: Rect) {
    let fetching = if app.session.is_fetching() {
        " [fetching]"
    } else {
        ""
    };
    let text = format!(" {}{}  ({})", app.status, fetching, app.endpoint);
    frame.render_widget(
        Paragraph::new(text).style(Style::default().fg(Color::Gray)),
        area,
    );
}

fn draw_help(frame: &mut Frame, area: Rect) {
    let help = " Tab: switch pane   Enter: open/toggle   Space: toggle   h: home   r: refetch   R: reload list   c: collapse all   q: quit";
    frame.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    mut app: App,
) -> io::Result<()> {
    loop {
        app.poll_fetch_events();

        terminal.draw(|frame| {
            draw_ui(frame, &mut app);
        })?;

        if app.should_quit {
            break;
        }

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) => app.on_key(key),
                Event::Mouse(mouse) => app.on_mouse(mouse),
                Event::Resize(_, _) => {}
                Event::FocusGained | Event::FocusLost | Event::Paste(_) => {}
            }
        }
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs stay on stderr so the alternate screen is not disturbed;
    // enable with RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let (tx, rx) = mpsc::channel();
    let gateway = Gateway::new(&args.endpoint);
    let endpoint = gateway.base_url().to_string();
    let fetcher = Fetcher::new(gateway, tx).context("could not start the fetch runtime")?;
    let app = App::new(endpoint, fetcher, rx);

    enable_raw_mode()?;
    crossterm::execute!(stdout(), EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout());
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let app_result = run_app(&mut terminal, app);

    disable_raw_mode()?;
    crossterm::execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    app_result?;
    Ok(())
}
