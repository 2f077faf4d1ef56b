//! Terminal client for the coinwatch server.
//!
//! Connects to the server WebSocket, renders the live snapshot as it is
//! pushed (price / volume / 24h change per coin plus a close-price
//! sparkline for the selected one) and sends interval-change requests.

use chrono::{DateTime, Utc};
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::{SinkExt, StreamExt};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, List, ListItem, Paragraph, Sparkline},
};
use serde::Deserialize;
use std::{collections::HashMap, io, sync::Arc, time::Duration};
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Interval labels offered on the number keys, matching the server table.
const INTERVALS: [&str; 5] = ["5m", "15m", "30m", "1h", "1d"];

/// Per-symbol state as pushed by the server.
#[derive(Debug, Clone, Deserialize)]
struct CoinState {
    price: String,
    volume: String,
    #[serde(rename = "change24h")]
    change_24h: String,
    history: Vec<f64>,
    interval: String,
}

type Snapshot = HashMap<String, CoinState>;

/// Application state shared between the network task and the render loop.
#[derive(Debug, Clone, Default)]
struct AppState {
    snapshot: Snapshot,
    /// Symbols in render order (sorted, stable across frames).
    coins: Vec<String>,
    selected: usize,
    connected: bool,
    last_update: Option<DateTime<Utc>>,
}

impl AppState {
    fn apply_snapshot(&mut self, snapshot: Snapshot) {
        let mut coins = snapshot.keys().cloned().collect::<Vec<_>>();
        coins.sort();
        self.snapshot = snapshot;
        self.coins = coins;
        if self.selected >= self.coins.len() {
            self.selected = self.coins.len().saturating_sub(1);
        }
        self.last_update = Some(Utc::now());
    }

    fn selected_coin(&self) -> Option<(&String, &CoinState)> {
        let symbol = self.coins.get(self.selected)?;
        self.snapshot.get(symbol).map(|state| (symbol, state))
    }

    /// Interval tag of the most recent data, for the status bar.
    fn active_interval(&self) -> &str {
        self.coins
            .first()
            .and_then(|symbol| self.snapshot.get(symbol))
            .map(|state| state.interval.as_str())
            .unwrap_or(INTERVALS[0])
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let url =
        std::env::var("COINWATCH_URL").unwrap_or_else(|_| "ws://127.0.0.1:8080/ws".to_string());

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let state = Arc::new(Mutex::new(AppState::default()));
    let (command_tx, command_rx) = mpsc::unbounded_channel::<&'static str>();

    let network_state = state.clone();
    tokio::spawn(async move {
        websocket_client(url, network_state, command_rx).await;
    });

    let result = run_app(&mut terminal, state, command_tx).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result.map_err(Into::into)
}

/// WebSocket loop with auto-reconnect: snapshot frames in, interval-change
/// requests out.
async fn websocket_client(
    url: String,
    state: Arc<Mutex<AppState>>,
    mut commands: mpsc::UnboundedReceiver<&'static str>,
) {
    loop {
        match connect_async(&url).await {
            Ok((ws_stream, _)) => {
                state.lock().await.connected = true;

                let (mut write, mut read) = ws_stream.split();

                loop {
                    tokio::select! {
                        msg = read.next() => {
                            let Some(msg) = msg else { break };
                            match msg {
                                Ok(Message::Text(text)) => {
                                    match serde_json::from_str::<Snapshot>(text.as_str()) {
                                        Ok(snapshot) => {
                                            state.lock().await.apply_snapshot(snapshot);
                                        }
                                        Err(error) => {
                                            eprintln!("failed to parse snapshot frame: {error}");
                                        }
                                    }
                                }
                                Ok(Message::Close(_)) | Err(_) => break,
                                _ => {}
                            }
                        }
                        command = commands.recv() => {
                            // The render loop owns the sender; it dropping
                            // means we are shutting down.
                            let Some(label) = command else { return };
                            let frame = format!(r#"{{"interval":"{label}"}}"#);
                            if write.send(Message::Text(frame.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                }

                state.lock().await.connected = false;
            }
            Err(_) => {
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }

        // Wait before reconnecting
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    state: Arc<Mutex<AppState>>,
    commands: mpsc::UnboundedSender<&'static str>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);

    loop {
        let state_snapshot = {
            let state = state.lock().await;
            state.clone()
        };

        terminal.draw(|frame| ui(frame, &state_snapshot))?;

        if crossterm::event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                    KeyCode::Up => {
                        let mut state = state.lock().await;
                        state.selected = state.selected.saturating_sub(1);
                    }
                    KeyCode::Down => {
                        let mut state = state.lock().await;
                        if state.selected + 1 < state.coins.len() {
                            state.selected += 1;
                        }
                    }
                    KeyCode::Char(digit @ '1'..='5') => {
                        let index = digit as usize - '1' as usize;
                        let _ = commands.send(INTERVALS[index]);
                    }
                    _ => {}
                }
            }
        }
    }
}

fn ui(frame: &mut Frame, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(frame.area());

    render_status_bar(frame, chunks[0], state);

    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[1]);

    render_coin_list(frame, main_chunks[0], state);
    render_history(frame, main_chunks[1], state);
}

fn render_status_bar(frame: &mut Frame, area: Rect, state: &AppState) {
    let (status_symbol, status_text, status_color) = if state.connected {
        ("●", "CONNECTED", Color::Green)
    } else {
        ("○", "DISCONNECTED", Color::Red)
    };

    let updated = state
        .last_update
        .map(|time| time.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string());

    let status_line = Line::from(vec![
        Span::styled(
            format!(" {status_symbol} {status_text} "),
            Style::default()
                .fg(status_color)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" interval {} ", state.active_interval()),
            Style::default().fg(Color::Yellow),
        ),
        Span::styled(
            format!(" updated {updated} "),
            Style::default().fg(Color::Blue),
        ),
        Span::styled(
            " [↑↓] Coin  [1-5] Interval  [Q] Quit ",
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(" coinwatch ");

    frame.render_widget(
        Paragraph::new(status_line)
            .block(block)
            .alignment(Alignment::Center),
        area,
    );
}

fn render_coin_list(frame: &mut Frame, area: Rect, state: &AppState) {
    let items = state
        .coins
        .iter()
        .enumerate()
        .map(|(index, symbol)| {
            let Some(coin) = state.snapshot.get(symbol) else {
                return ListItem::new(Line::from(symbol.as_str()));
            };

            let change = coin.change_24h.parse::<f64>().unwrap_or(0.0);
            let change_color = if change >= 0.0 {
                Color::Green
            } else {
                Color::Red
            };
            let marker = if index == state.selected { "▶" } else { " " };

            ListItem::new(Line::from(vec![
                Span::raw(format!(" {marker} ")),
                Span::styled(
                    format!("{symbol:<6}"),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!(" {:>14} ", coin.price)),
                Span::styled(
                    format!("{:>8}% ", coin.change_24h),
                    Style::default().fg(change_color),
                ),
                Span::styled(
                    format!("vol {} ", coin.volume),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect::<Vec<_>>();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Coins ({}) ", state.coins.len()));

    if items.is_empty() {
        frame.render_widget(
            Paragraph::new("waiting for first snapshot...")
                .block(block)
                .alignment(Alignment::Center),
            area,
        );
        return;
    }

    frame.render_widget(List::new(items).block(block), area);
}

fn render_history(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some((symbol, coin)) = state.selected_coin() else {
        frame.render_widget(
            Block::default().borders(Borders::ALL).title(" History "),
            area,
        );
        return;
    };

    let block = Block::default().borders(Borders::ALL).title(format!(
        " {} close prices ({} @ {} samples) ",
        symbol,
        coin.interval,
        coin.history.len()
    ));

    if coin.history.is_empty() {
        frame.render_widget(
            Paragraph::new("no history this cycle")
                .block(block)
                .alignment(Alignment::Center),
            area,
        );
        return;
    }

    let data = scale_for_sparkline(&coin.history);
    frame.render_widget(
        Sparkline::default()
            .block(block)
            .data(&data)
            .style(Style::default().fg(Color::Cyan)),
        area,
    );
}

/// Normalise close prices into sparkline heights. Zero samples (failed
/// candle parses upstream) are kept as gaps rather than skewing the scale.
fn scale_for_sparkline(history: &[f64]) -> Vec<u64> {
    let present = history.iter().copied().filter(|price| *price > 0.0);
    let min = present.clone().fold(f64::INFINITY, f64::min);
    let max = present.fold(f64::NEG_INFINITY, f64::max);

    if !min.is_finite() || !max.is_finite() {
        return vec![0; history.len()];
    }
    let span = (max - min).max(f64::EPSILON);

    history
        .iter()
        .map(|price| {
            if *price <= 0.0 {
                0
            } else {
                // 1..=100 so the lowest real sample still renders.
                (((price - min) / span) * 99.0) as u64 + 1
            }
        })
        .collect()
}
