use anyhow::Result;
use bmi_service::{
    calculator::BmiCategory, delete_all_records, get_all_records, record_measurement, BmiRecord,
};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use rusqlite::Connection;
use std::io;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Weight,
    Height,
}

impl Field {
    pub fn next(&self) -> Self {
        match self {
            Field::Name => Field::Weight,
            Field::Weight => Field::Height,
            Field::Height => Field::Name,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Field::Name => Field::Height,
            Field::Weight => Field::Name,
            Field::Height => Field::Weight,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Field::Name => "Your Name",
            Field::Weight => "Weight (kg)",
            Field::Height => "Height (m)",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    None,
    Info(String),
    Error(String),
}

pub struct App {
    conn: Connection,
    pub name: String,
    pub weight: String,
    pub height: String,
    pub focus: Field,
    pub message: Message,
    pub history: Vec<BmiRecord>,
    pub state: TableState,
    /// Set after the first Ctrl+D; the second one actually clears
    pub confirm_clear: bool,
}

impl App {
    pub fn new(conn: Connection) -> Self {
        let mut app = Self {
            conn,
            name: String::new(),
            weight: "70.0".to_string(),
            height: "1.70".to_string(),
            focus: Field::Name,
            message: Message::None,
            history: Vec::new(),
            state: TableState::default(),
            confirm_clear: false,
        };
        app.refresh_history();
        app
    }

    fn field_mut(&mut self) -> &mut String {
        match self.focus {
            Field::Name => &mut self.name,
            Field::Weight => &mut self.weight,
            Field::Height => &mut self.height,
        }
    }

    pub fn refresh_history(&mut self) {
        match get_all_records(&self.conn) {
            Ok(records) => {
                self.history = records;
                self.state
                    .select(if self.history.is_empty() { None } else { Some(0) });
            }
            Err(e) => {
                error!(error = %e, "Failed to load BMI history");
                self.message = Message::Error(format!("Error fetching BMI history: {}", e));
            }
        }
    }

    pub fn submit(&mut self) {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            self.message = Message::Error("Please enter your name".to_string());
            return;
        }

        let (weight, height) = match (self.weight.trim().parse::<f64>(), self.height.trim().parse::<f64>()) {
            (Ok(w), Ok(h)) => (w, h),
            _ => {
                self.message =
                    Message::Error("Weight and height must be numbers".to_string());
                return;
            }
        };

        match record_measurement(&self.conn, &name, weight, height) {
            Ok(record) => {
                info!(id = record.id, bmi = record.bmi, "BMI recorded from terminal UI");
                self.message = Message::Info(format!(
                    "Hello {}, your BMI is: {:.2} ({})",
                    record.name, record.bmi, record.category
                ));
                self.refresh_history();
            }
            Err(e) if e.is_client_error() => {
                self.message = Message::Error(
                    "Error calculating BMI. Please check your inputs.".to_string(),
                );
            }
            Err(e) => {
                error!(error = %e, "Failed to record BMI");
                self.message = Message::Error(format!("Could not save BMI: {}", e));
            }
        }
    }

    pub fn clear_history(&mut self) {
        if !self.confirm_clear {
            self.confirm_clear = true;
            self.message =
                Message::Info("Press Ctrl+D again to delete all history".to_string());
            return;
        }

        self.confirm_clear = false;
        match delete_all_records(&self.conn) {
            Ok(deleted) => {
                info!(deleted, "History cleared from terminal UI");
                self.message = Message::Info("History cleared successfully!".to_string());
                self.refresh_history();
            }
            Err(e) => {
                error!(error = %e, "Failed to clear history");
                self.message = Message::Error(format!("Error clearing history: {}", e));
            }
        }
    }

    pub fn next(&mut self) {
        if self.history.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < self.history.len() => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.history.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => self.history.len() - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    /// Apply one key press; returns true when the UI should exit
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if !(ctrl && key.code == KeyCode::Char('d')) {
            self.confirm_clear = false;
        }

        match key.code {
            KeyCode::Esc => return true,
            KeyCode::Char('c') if ctrl => return true,
            KeyCode::Char('d') if ctrl => self.clear_history(),
            KeyCode::Char('r') if ctrl => self.refresh_history(),
            KeyCode::Enter => self.submit(),
            KeyCode::Tab => self.focus = self.focus.next(),
            KeyCode::BackTab => self.focus = self.focus.previous(),
            KeyCode::Down => self.next(),
            KeyCode::Up => self.previous(),
            KeyCode::Backspace => {
                self.field_mut().pop();
            }
            KeyCode::Char(c) if !ctrl => {
                let accepts = match self.focus {
                    Field::Name => true,
                    Field::Weight | Field::Height => c.is_ascii_digit() || c == '.',
                };
                if accepts {
                    self.field_mut().push(c);
                }
            }
            _ => {}
        }

        false
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res?;
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press && app.handle_key(key) {
                return Ok(());
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Length(3), // Form
            Constraint::Length(3), // Result
            Constraint::Min(0),    // History + scale
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    let title = Paragraph::new(Line::from(vec![
        Span::styled(
            "BMI Calculator",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::styled(
            format!("Records: {}", app.history.len()),
            Style::default().fg(Color::White),
        ),
    ]))
    .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));
    f.render_widget(title, chunks[0]);

    render_form(f, chunks[1], app);
    render_message(f, chunks[2], app);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(28)])
        .split(chunks[3]);
    render_history(f, body[0], app);
    render_scale(f, body[1]);

    render_status_bar(f, chunks[4]);
}

fn render_form(f: &mut Frame, area: Rect, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(50),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
        ])
        .split(area);

    for (i, (field, value)) in [
        (Field::Name, &app.name),
        (Field::Weight, &app.weight),
        (Field::Height, &app.height),
    ]
    .into_iter()
    .enumerate()
    {
        let focused = field == app.focus;
        let border = if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let text = if focused {
            format!("{}▏", value)
        } else {
            value.clone()
        };

        let input = Paragraph::new(text).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title(format!(" {} ", field.label())),
        );
        f.render_widget(input, columns[i]);
    }
}

fn render_message(f: &mut Frame, area: Rect, app: &App) {
    let (text, color) = match &app.message {
        Message::None => ("Fill in the form and press Enter".to_string(), Color::DarkGray),
        Message::Info(msg) => (msg.clone(), Color::Green),
        Message::Error(msg) => (msg.clone(), Color::Red),
    };

    let message = Paragraph::new(Span::styled(text, Style::default().fg(color)))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(message, area);
}

fn category_color(category: BmiCategory) -> Color {
    match category {
        BmiCategory::Underweight => Color::Cyan,
        BmiCategory::NormalWeight => Color::Green,
        BmiCategory::Overweight => Color::Yellow,
        BmiCategory::Obese => Color::Red,
    }
}

fn render_history(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Date", "Name", "BMI", "Category", "Weight (kg)", "Height (m)"]
        .iter()
        .map(|h| {
            Cell::from(*h).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.history.iter().map(|record| {
        let color = category_color(record.category);

        Row::new(vec![
            Cell::from(record.timestamp.format("%Y-%m-%d %H:%M").to_string()),
            Cell::from(truncate(&record.name, 20)),
            Cell::from(format!("{:.2}", record.bmi)).style(Style::default().fg(color)),
            Cell::from(record.category.as_str()).style(Style::default().fg(color)),
            Cell::from(format!("{:.1}", record.weight)),
            Cell::from(format!("{:.2}", record.height)),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(17),
            Constraint::Length(22),
            Constraint::Length(7),
            Constraint::Length(14),
            Constraint::Length(12),
            Constraint::Length(11),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" BMI History "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_scale(f: &mut Frame, area: Rect) {
    let lines: Vec<Line> = BmiCategory::ALL
        .iter()
        .map(|c| {
            Line::from(vec![
                Span::styled(
                    format!("{:<14}", c.as_str()),
                    Style::default().fg(category_color(*c)),
                ),
                Span::raw(c.range_label()),
            ])
        })
        .collect();

    let scale = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" BMI Scale "));
    f.render_widget(scale, area);
}

fn render_status_bar(f: &mut Frame, area: Rect) {
    let key = Style::default().fg(Color::Yellow);
    let status = Paragraph::new(Line::from(vec![
        Span::styled(" Tab", key),
        Span::raw(" Field | "),
        Span::styled("Enter", key),
        Span::raw(" Calculate | "),
        Span::styled("↑/↓", key),
        Span::raw(" History | "),
        Span::styled("Ctrl+R", key),
        Span::raw(" Refresh | "),
        Span::styled("Ctrl+D", key),
        Span::raw(" Clear | "),
        Span::styled("Esc", Style::default().fg(Color::Red)),
        Span::raw(" Quit"),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
