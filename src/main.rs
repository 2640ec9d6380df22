use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols;
use ratatui::widgets::{
    Axis, Block, Borders, Cell, Chart, Clear, Dataset, GraphType, Paragraph, Row, Table,
    TableState, Tabs,
};
use tracing::{info, warn};

use try_finder::bet_log::{BetLog, BetStatus};
use try_finder::config::AppConfig;
use try_finder::logging;
use try_finder::model::position_label;
use try_finder::provider::{Provider, ProviderCommand};
use try_finder::state::{
    AppState, Delta, FetchStatus, InputMode, Tab, apply_delta, fetch_status_label, sort_label,
    tab_label,
};

struct App {
    state: AppState,
    provider: Provider,
    should_quit: bool,
    pending: Option<ProviderCommand>,
}

impl App {
    fn new(cfg: AppConfig, log: BetLog) -> Self {
        let mut state = AppState::new(cfg.model, cfg.profit_basis);
        state.default_stake = cfg.default_stake;
        state.round_label = cfg.round_label.clone();
        if cfg.odds.api_key.is_none() {
            state.push_log("[WARN] ODDS_API_KEY is not set; odds loads will fail");
        }
        Self {
            state,
            provider: Provider::new(cfg, log),
            should_quit: false,
            pending: None,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match self.state.input_mode {
            InputMode::Search => self.on_search_key(key),
            InputMode::Round => self.on_round_key(key),
            InputMode::Normal => self.on_normal_key(key),
        }
    }

    fn on_normal_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Tab | KeyCode::Char('t') => self.state.toggle_tab(),
            KeyCode::Char('/') => {
                self.state.tab = Tab::Live;
                self.state.input_mode = InputMode::Search;
            }
            KeyCode::Char('g') => self.state.input_mode = InputMode::Round,
            KeyCode::Enter | KeyCode::Char('o') => self.request_odds(),
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Char('p') | KeyCode::Right => self.state.cycle_position_next(),
            KeyCode::Char('P') | KeyCode::Left => self.state.cycle_position_prev(),
            KeyCode::Char('s') => self.state.cycle_sort(),
            KeyCode::Char('e') => self.request_log(BetStatus::Evaluated),
            KeyCode::Char('b') => self.request_log(BetStatus::Placed),
            KeyCode::Char('r') => {
                self.pending = Some(ProviderCommand::ReloadHistory);
            }
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::Esc => self.state.help_overlay = false,
            _ => {}
        }
    }

    fn on_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                self.state.input_mode = InputMode::Normal;
                self.request_odds();
            }
            KeyCode::Esc => self.state.input_mode = InputMode::Normal,
            KeyCode::Backspace => {
                self.state.search.pop();
            }
            KeyCode::Char(c) => self.state.search.push(c),
            _ => {}
        }
    }

    fn on_round_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => {
                self.state.input_mode = InputMode::Normal;
                let label = self.state.round_label.trim().to_string();
                self.state.push_log(format!("[INFO] Round label: '{label}'"));
            }
            KeyCode::Backspace => {
                self.state.round_label.pop();
            }
            KeyCode::Char(c) => self.state.round_label.push(c),
            _ => {}
        }
    }

    fn request_odds(&mut self) {
        if self.state.tab != Tab::Live {
            return;
        }
        let keyword = self.state.search.trim().to_string();
        self.state.begin_loading();
        self.state.push_log(format!("[INFO] Loading odds for '{keyword}'"));
        self.pending = Some(ProviderCommand::LoadOdds { keyword });
    }

    fn request_log(&mut self, status: BetStatus) {
        if self.state.tab != Tab::Live {
            return;
        }
        self.pending = Some(ProviderCommand::LogSelected { status });
    }

    // Blocks the UI thread for the length of the call.
    fn run_pending(&mut self) {
        let Some(cmd) = self.pending.take() else {
            return;
        };
        info!(?cmd, "running command");
        match self.provider.handle(&self.state, cmd) {
            Ok(deltas) => {
                for delta in deltas {
                    apply_delta(&mut self.state, delta);
                }
            }
            Err(err) => {
                warn!("command failed: {err:#}");
                apply_delta(&mut self.state, Delta::Log(format!("[ERROR] {err:#}")));
            }
        }
    }
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    let _log_guard = logging::init_logging();

    let cfg = AppConfig::from_env();
    let log = BetLog::from_env();
    info!(path = %log.path().display(), "starting");

    let mut app = App::new(cfg, log);
    for delta in app.provider.load_history() {
        apply_delta(&mut app.state, delta);
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        // Draw the loading state first, then block on the command.
        if app.pending.is_some() {
            app.run_pending();
            continue;
        }

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            app.on_key(key);
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(&app.state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    let selected_tab = match app.state.tab {
        Tab::Live => 0,
        Tab::Analytics => 1,
    };
    let tabs = Tabs::new(vec!["Live", "Analytics"])
        .select(selected_tab)
        .highlight_style(Style::default().add_modifier(Modifier::BOLD).fg(Color::Yellow));
    frame.render_widget(tabs, chunks[1]);

    match app.state.tab {
        Tab::Live => render_live(frame, chunks[2], &app.state),
        Tab::Analytics => render_analytics(frame, chunks[2], &app.state),
    }

    let footer = Paragraph::new(footer_text(&app.state))
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, chunks[3]);

    if app.state.help_overlay {
        let area = frame.size();
        render_help_overlay(frame, area);
    }
}

fn header_text(state: &AppState) -> String {
    let round = if state.round_label.trim().is_empty() {
        "-".to_string()
    } else {
        state.round_label.trim().to_string()
    };
    let title = format!(
        "TRY FINDER | {} | Sort: {} | Round: {}",
        tab_label(state.tab),
        sort_label(state.sort),
        round
    );
    let line1 = format!("   __   {title}");
    let line2 = "  (__)".to_string();
    let line3 = "   ||".to_string();
    format!("{line1}\n{line2}\n{line3}")
}

fn footer_text(state: &AppState) -> String {
    match state.input_mode {
        InputMode::Search => "Type match keyword | Enter Load | Esc Cancel".to_string(),
        InputMode::Round => "Type round label | Enter/Esc Done".to_string(),
        InputMode::Normal => match state.tab {
            Tab::Live => "/ Search | Enter Load | j/k Move | p/P Position | s Sort | e Log eval | b Log bet | g Round | Tab Analytics | ? Help | q Quit".to_string(),
            Tab::Analytics => "j/k Scroll | r Reload log | Tab Live | ? Help | q Quit".to_string(),
        },
    }
}

fn render_live(frame: &mut Frame, area: Rect, state: &AppState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(5),
        ])
        .split(area);

    let search_style = if state.input_mode == InputMode::Search {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let search_text = if state.input_mode == InputMode::Search {
        format!("{}_", state.search)
    } else {
        state.search.clone()
    };
    let search = Paragraph::new(search_text).style(search_style).block(
        Block::default()
            .title("Match search")
            .borders(Borders::ALL),
    );
    frame.render_widget(search, rows[0]);

    let context = Paragraph::new(context_text(state)).style(status_style(&state.odds_status));
    frame.render_widget(context, rows[1]);

    render_outcomes(frame, rows[2], state);

    let console = Paragraph::new(console_text(state))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, rows[3]);
}

fn context_text(state: &AppState) -> String {
    let total = state
        .context
        .total_points_line
        .map(|t| format!("{t:.1}"))
        .unwrap_or_else(|| "-".to_string());
    format!(
        " Total: {total} | Rain: {:.1} mm | Odds: {} | Weather: {}",
        state.context.rain_mm,
        fetch_status_label(&state.odds_status),
        fetch_status_label(&state.weather_status)
    )
}

fn status_style(status: &FetchStatus) -> Style {
    match status {
        FetchStatus::Failed(_) => Style::default().fg(Color::Red),
        FetchStatus::NoMarkets => Style::default().fg(Color::Yellow),
        FetchStatus::Loading => Style::default().fg(Color::Cyan),
        _ => Style::default().fg(Color::DarkGray),
    }
}

fn render_outcomes(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default().title("Anytime try").borders(Borders::ALL);
    if state.rows.is_empty() {
        let msg = match &state.odds_status {
            FetchStatus::Idle => "Press / to search a match, Enter to load odds",
            FetchStatus::Loading => "Loading...",
            _ => "No markets found",
        };
        let empty = Paragraph::new(msg)
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let header = Row::new(vec![
        "Player", "Book", "Odds", "Position", "My%", "Impl%", "Edge", "Conf",
    ])
    .style(Style::default().add_modifier(Modifier::BOLD));

    let body: Vec<Row> = state
        .rows
        .iter()
        .map(|row| {
            let (my, implied, edge, conf) = match row.eval {
                Some(e) => (
                    format!("{:.2}", e.my_prob),
                    format!("{:.2}", e.implied),
                    format!("{:+.2}", e.edge),
                    format!("{:.1}", e.confidence),
                ),
                None => ("-".into(), "-".into(), "-".into(), "-".into()),
            };
            let edge_style = match row.eval {
                Some(e) if e.edge > 0.0 => Style::default().fg(Color::Green),
                Some(_) => Style::default().fg(Color::Red),
                None => Style::default(),
            };
            Row::new(vec![
                Cell::from(row.quote.player.clone()),
                Cell::from(row.quote.book.clone()),
                Cell::from(format!("{:.2}", row.quote.odds)),
                Cell::from(position_label(row.position)),
                Cell::from(my),
                Cell::from(implied),
                Cell::from(edge).style(edge_style),
                Cell::from(conf),
            ])
        })
        .collect();

    let widths = [
        Constraint::Min(18),
        Constraint::Length(10),
        Constraint::Length(6),
        Constraint::Length(9),
        Constraint::Length(7),
        Constraint::Length(7),
        Constraint::Length(7),
        Constraint::Length(6),
    ];
    let table = Table::new(body, widths)
        .header(header)
        .block(block)
        .highlight_style(Style::default().fg(Color::White).bg(Color::DarkGray))
        .highlight_symbol("> ");

    let mut table_state = TableState::default();
    table_state.select(Some(state.selected));
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn render_analytics(frame: &mut Frame, area: Rect, state: &AppState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(40), Constraint::Min(30)])
        .split(area);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(10), Constraint::Min(3)])
        .split(columns[0]);

    let summary = Paragraph::new(summary_text(state))
        .block(Block::default().title("Bet log").borders(Borders::ALL));
    frame.render_widget(summary, left[0]);

    render_bucket_table(frame, left[1], state);
    render_confidence_chart(frame, columns[1], state);
}

fn summary_text(state: &AppState) -> String {
    if let Some(err) = &state.history_error {
        return format!("Log unreadable:\n{err}");
    }
    let s = &state.summary;
    let roi = s
        .roi_pct()
        .map(|v| format!("{v:+.1}%"))
        .unwrap_or_else(|| "-".to_string());
    let win_rate = s
        .win_rate_pct()
        .map(|v| format!("{v:.1}%"))
        .unwrap_or_else(|| "-".to_string());
    let mut lines = vec![
        format!("Rows: {}", s.total),
        format!("Pending: {}", s.pending),
        format!("Settled: {} (W {} / L {})", s.settled, s.wins, s.losses),
        format!("Win rate: {win_rate}"),
        format!("Profit: {:+.2}", s.total_profit),
        format!("ROI: {roi}"),
        format!("Stake: {}", state.profit_basis.label()),
    ];
    if state.history_skipped > 0 {
        lines.push(format!("Skipped rows: {}", state.history_skipped));
    }
    lines.join("\n")
}

fn render_bucket_table(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default()
        .title("Avg profit by confidence")
        .borders(Borders::ALL);
    if state.buckets.is_empty() {
        let empty = Paragraph::new("No settled bets yet")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let header =
        Row::new(vec!["Conf", "Avg P/L", "N"]).style(Style::default().add_modifier(Modifier::BOLD));
    let body: Vec<Row> = state
        .buckets
        .iter()
        .map(|b| {
            let style = if b.mean_profit >= 0.0 {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Red)
            };
            Row::new(vec![
                Cell::from(format!("{:.1}", b.confidence)),
                Cell::from(format!("{:+.2}", b.mean_profit)).style(style),
                Cell::from(b.samples.to_string()),
            ])
        })
        .collect();
    let widths = [
        Constraint::Length(8),
        Constraint::Length(10),
        Constraint::Length(5),
    ];
    let table = Table::new(body, widths)
        .header(header)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray));
    let mut table_state = TableState::default();
    table_state.select(Some(state.history_scroll));
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn render_confidence_chart(frame: &mut Frame, area: Rect, state: &AppState) {
    let points: Vec<(f64, f64)> = state
        .buckets
        .iter()
        .map(|b| (b.confidence, b.mean_profit))
        .collect();

    let (y_min, y_max) = profit_bounds(&points);
    let dataset = Dataset::default()
        .name("avg profit")
        .marker(symbols::Marker::Dot)
        .graph_type(GraphType::Scatter)
        .style(Style::default().fg(Color::Cyan))
        .data(&points);

    let chart = Chart::new(vec![dataset])
        .block(
            Block::default()
                .title("Confidence vs profit")
                .borders(Borders::ALL),
        )
        .x_axis(
            Axis::default()
                .title("Confidence")
                .style(Style::default().fg(Color::DarkGray))
                .bounds([0.0, 100.0])
                .labels(vec![Span::raw("0"), Span::raw("50"), Span::raw("100")]),
        )
        .y_axis(
            Axis::default()
                .title("Avg P/L")
                .style(Style::default().fg(Color::DarkGray))
                .bounds([y_min, y_max])
                .labels(vec![
                    Span::raw(format!("{y_min:.0}")),
                    Span::raw("0"),
                    Span::raw(format!("{y_max:.0}")),
                ]),
        );
    frame.render_widget(chart, area);
}

// Symmetric around zero so the break-even line sits mid-chart.
fn profit_bounds(points: &[(f64, f64)]) -> (f64, f64) {
    let peak = points
        .iter()
        .map(|(_, y)| y.abs())
        .fold(10.0_f64, f64::max)
        .ceil();
    (-peak, peak)
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No messages yet".to_string();
    }
    state
        .logs
        .iter()
        .rev()
        .take(3)
        .cloned()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 70, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Try Finder - Help",
        "",
        "Global:",
        "  Tab / t      Switch Live / Analytics",
        "  ?            Toggle help",
        "  q            Quit",
        "",
        "Live:",
        "  /            Edit match search",
        "  Enter / o    Load odds + weather",
        "  j/k or ↑/↓   Move",
        "  p/P or →/←   Cycle position",
        "  s            Cycle sort (feed/edge/odds)",
        "  e            Log selected as evaluated",
        "  b            Log selected as placed bet",
        "  g            Edit round label",
        "",
        "Analytics:",
        "  r            Reload bet log",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
