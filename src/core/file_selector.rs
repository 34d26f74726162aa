use crate::core::debounce::Debouncer;
use crate::core::presets::PRESET_PROMPTS;
use crate::core::selection::{Session, normalize_path};
use crate::domain::errors::SelectionError;
use crate::domain::models::{FileContent, FileTreeNode, SelectedFile};
use crate::infra::file_service::FileService;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::{debug, info, warn};
use ratatui::{
    Frame, Terminal,
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::collections::HashSet;
use std::io::{self, IsTerminal};
use std::time::{Duration, Instant};

const STATUS_TTL: Duration = Duration::from_secs(6);

fn to_selected_file(
    service_path: &str,
    name: Option<&str>,
    extension: Option<&str>,
    content: FileContent,
    root: Option<&str>,
) -> SelectedFile {
    let mut file = SelectedFile::new(normalize_path(service_path, root), content.content)
        .with_token_count(content.token_count);
    if let Some(name) = name {
        file.name = Some(name.to_string());
    }
    if let Some(extension) = extension {
        file.extension = Some(extension.to_string());
    }
    file
}

pub fn load_selected_files(
    service: &dyn FileService,
    paths: &[String],
    root: Option<&str>,
) -> Vec<SelectedFile> {
    debug!("Loading {} files", paths.len());
    let mut selected_files = Vec::new();

    for path in paths {
        debug!("Reading file: {}", path);
        match service.file_content(path) {
            Ok(content) => selected_files.push(to_selected_file(path, None, None, content, root)),
            Err(e) => warn!("Error reading file {}: {}", path, e),
        }
    }

    info!("Successfully loaded {} files", selected_files.len());
    selected_files
}

pub fn load_tree_files(service: &dyn FileService, tree: &FileTreeNode) -> Vec<SelectedFile> {
    let root = tree_root(tree);
    let mut selected_files = Vec::new();

    for node in tree.files() {
        match service.file_content(&node.path) {
            Ok(content) => selected_files.push(to_selected_file(
                &node.path,
                Some(&node.name),
                node.extension.as_deref(),
                content,
                root,
            )),
            Err(e) => warn!("Error loading file {}: {}", node.path, e),
        }
    }

    info!("Loaded {} of {} files", selected_files.len(), tree.file_count());
    selected_files
}

pub fn tree_root(tree: &FileTreeNode) -> Option<&str> {
    Some(tree.path.as_str()).filter(|p| !p.is_empty())
}

struct Row {
    depth: usize,
    name: String,
    path: String,
    extension: Option<String>,
    is_dir: bool,
    expanded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Tree,
    Prompt,
}

#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Confirm,
    Cancel,
}

struct StatusMessage {
    text: String,
    is_error: bool,
    shown_at: Instant,
}

struct App<'a> {
    service: &'a dyn FileService,
    tree: FileTreeNode,
    collapsed: HashSet<String>,
    rows: Vec<Row>,
    state: ListState,
    session: Session,
    focus: Focus,
    status: Option<StatusMessage>,
    suggestions: Vec<String>,
    debouncer: Debouncer,
    title: String,
}

impl<'a> App<'a> {
    fn new(service: &'a dyn FileService, tree: FileTreeNode, session: Session) -> Self {
        let mut app = App {
            service,
            title: format!("Super Prompt · {}", tree.name),
            tree,
            collapsed: HashSet::new(),
            rows: Vec::new(),
            state: ListState::default(),
            session,
            focus: Focus::Tree,
            status: None,
            suggestions: Vec::new(),
            debouncer: Debouncer::default(),
        };
        app.rebuild_rows();
        app.debouncer.touch(Instant::now());
        app
    }

    fn root(&self) -> Option<&str> {
        tree_root(&self.tree)
    }

    fn rebuild_rows(&mut self) {
        fn flatten(
            node: &FileTreeNode,
            depth: usize,
            collapsed: &HashSet<String>,
            rows: &mut Vec<Row>,
        ) {
            for child in node.children() {
                let is_dir = !child.is_file();
                let expanded = is_dir && !collapsed.contains(&child.path);
                rows.push(Row {
                    depth,
                    name: child.name.clone(),
                    path: child.path.clone(),
                    extension: child.extension.clone(),
                    is_dir,
                    expanded,
                });
                if expanded {
                    flatten(child, depth + 1, collapsed, rows);
                }
            }
        }

        let previous = self.current_row().map(|row| row.path.clone());
        let mut rows = Vec::new();
        flatten(&self.tree, 0, &self.collapsed, &mut rows);
        self.rows = rows;

        let index = previous
            .and_then(|path| self.rows.iter().position(|row| row.path == path))
            .or(if self.rows.is_empty() { None } else { Some(0) });
        self.state.select(index);
    }

    fn current_row(&self) -> Option<&Row> {
        self.state.selected().and_then(|i| self.rows.get(i))
    }

    fn is_selected(&self, row: &Row) -> bool {
        !row.is_dir && self.session.selection.contains(&normalize_path(&row.path, self.root()))
    }

    fn next(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < self.rows.len() => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    fn previous(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => self.rows.len() - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    fn set_expanded(&mut self, expanded: bool) {
        let Some(row) = self.current_row().filter(|row| row.is_dir) else {
            return;
        };
        let path = row.path.clone();
        let changed = if expanded {
            self.collapsed.remove(&path)
        } else {
            self.collapsed.insert(path)
        };
        if changed {
            self.rebuild_rows();
        }
    }

    fn set_status(&mut self, text: impl Into<String>, is_error: bool) {
        self.status = Some(StatusMessage {
            text: text.into(),
            is_error,
            shown_at: Instant::now(),
        });
    }

    fn toggle_current(&mut self) {
        let Some(row) = self.current_row() else {
            return;
        };
        if row.is_dir {
            let expanded = row.expanded;
            self.set_expanded(!expanded);
            return;
        }

        let service_path = row.path.clone();
        let name = row.name.clone();
        let extension = row.extension.clone();
        let path = normalize_path(&service_path, self.root());

        if self.session.selection.remove(&path).is_some() {
            return;
        }

        match self.service.file_content(&service_path) {
            Ok(content) => {
                let file = to_selected_file(
                    &service_path,
                    Some(&name),
                    extension.as_deref(),
                    content,
                    self.root(),
                );
                self.session.selection.insert(file);
            }
            Err(e) => {
                warn!("Error loading file content {}: {}", service_path, e);
                self.set_status(format!("Error loading file: {}", e), true);
            }
        }
    }

    fn select_all(&mut self) {
        let files = load_tree_files(self.service, &self.tree);
        let total = self.tree.file_count();
        let loaded = files.len();
        self.session.selection.replace_all(files);

        if loaded < total {
            self.set_status(format!("Could not load {} of {} files", total - loaded, total), true);
        } else {
            self.set_status(format!("Selected {} files", loaded), false);
        }
    }

    fn apply_preset(&mut self, index: usize) {
        if let Some(preset) = PRESET_PROMPTS.get(index) {
            self.session.system_prompt = preset.prompt.to_string();
            self.set_status(format!("System instructions: {}", preset.name), false);
        }
    }

    fn prompt_changed(&mut self, now: Instant) {
        self.debouncer.touch(now);
    }

    fn tick(&mut self, now: Instant) {
        if self
            .status
            .as_ref()
            .is_some_and(|s| now.saturating_duration_since(s.shown_at) >= STATUS_TTL)
        {
            self.status = None;
        }

        if self.debouncer.fire(now) {
            match self.service.suggestions(&self.session.payload()) {
                Ok(suggestions) => self.suggestions = suggestions,
                Err(e) => {
                    warn!("Failed to fetch suggestions: {}", e);
                    self.set_status(format!("Suggestions unavailable: {}", e), true);
                }
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent, now: Instant) -> Option<Outcome> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(Outcome::Cancel);
        }

        match self.focus {
            Focus::Prompt => match key.code {
                KeyCode::Tab | KeyCode::Esc | KeyCode::Enter => self.focus = Focus::Tree,
                KeyCode::Backspace => {
                    if self.session.main_prompt.pop().is_some() {
                        self.prompt_changed(now);
                    }
                }
                KeyCode::Char(c) => {
                    self.session.main_prompt.push(c);
                    self.prompt_changed(now);
                }
                _ => {}
            },
            Focus::Tree => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => {
                    return Some(if self.session.selection.is_empty() {
                        Outcome::Cancel
                    } else {
                        Outcome::Confirm
                    });
                }
                KeyCode::Enter => return Some(Outcome::Confirm),
                KeyCode::Tab => self.focus = Focus::Prompt,
                KeyCode::Char(' ') => self.toggle_current(),
                KeyCode::Char('a') => self.select_all(),
                KeyCode::Char('n') => self.session.selection.clear(),
                KeyCode::Char('t') => self.session.include_tree = !self.session.include_tree,
                KeyCode::Char(c @ '1'..='9') => {
                    self.apply_preset(c as usize - '1' as usize);
                }
                KeyCode::Right => self.set_expanded(true),
                KeyCode::Left => self.set_expanded(false),
                KeyCode::Down => self.next(),
                KeyCode::Up => self.previous(),
                _ => {}
            },
        }
        None
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(f.area());

    let title = Paragraph::new(Span::styled(
        app.title.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    ));
    f.render_widget(title, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(chunks[1]);

    let selected_style = Style::default()
        .bg(Color::Blue)
        .fg(Color::White)
        .add_modifier(Modifier::BOLD);

    let items: Vec<ListItem> = app
        .rows
        .iter()
        .map(|row| {
            let indent = "  ".repeat(row.depth);
            let selected = app.is_selected(row);
            let prefix = match (row.is_dir, row.expanded, selected) {
                (true, true, _) => "▼ ",
                (true, false, _) => "► ",
                (false, _, true) => "[✓] ",
                (false, _, false) => "[ ] ",
            };

            let style = if selected {
                Style::default().fg(Color::Green)
            } else if row.is_dir {
                Style::default().fg(Color::Blue)
            } else {
                Style::default()
            };
            ListItem::new(Span::styled(format!("{}{}{}", indent, prefix, row.name), style))
        })
        .collect();

    let tree_border = if app.focus == Focus::Tree {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let file_list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(tree_border)
                .title(format!(
                    "Project Files ({} selected of {})",
                    app.session.selection.len(),
                    app.tree.file_count()
                )),
        )
        .highlight_style(selected_style);
    f.render_stateful_widget(file_list, body[0], &mut app.state);

    let document = app.session.document();
    let preview = Paragraph::new(document.text.as_str())
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Compiled Prompt"));
    f.render_widget(preview, body[1]);

    let prompt_border = if app.focus == Focus::Prompt {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let prompt = Paragraph::new(app.session.main_prompt.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(prompt_border)
            .title("Your Prompt (Tab to edit)"),
    );
    f.render_widget(prompt, chunks[2]);

    let notice = match &app.status {
        Some(status) => {
            let color = if status.is_error {
                Color::Red
            } else {
                Color::Green
            };
            Line::from(Span::styled(status.text.clone(), Style::default().fg(color)))
        }
        None if app.debouncer.is_pending() => Line::from(Span::styled(
            "💡 …",
            Style::default().fg(Color::DarkGray),
        )),
        None if !app.suggestions.is_empty() => Line::from(Span::styled(
            format!("💡 {}", app.suggestions.join(" · ")),
            Style::default().fg(Color::DarkGray),
        )),
        None => Line::default(),
    };
    f.render_widget(Paragraph::new(notice), chunks[3]);

    let tree_flag = if app.session.include_tree {
        " · file tree on"
    } else {
        ""
    };
    let metadata = Paragraph::new(Span::styled(
        format!("{}{}", document.metadata_line(), tree_flag),
        Style::default().fg(Color::Cyan),
    ));
    f.render_widget(metadata, chunks[4]);

    let help = match app.focus {
        Focus::Tree => {
            "↑/↓: Navigate | Space: Toggle | →/←: Expand/Collapse | a: All | n: None | t: Tree | 1-9: Preset | Tab: Prompt | Enter: Done | q: Quit"
        }
        Focus::Prompt => "Type your prompt | Backspace: Delete | Tab/Enter/Esc: Back to files",
    };
    f.render_widget(
        Paragraph::new(Span::styled(help, Style::default().fg(Color::DarkGray))),
        chunks[5],
    );
}

pub fn run_selector(
    service: &dyn FileService,
    tree: FileTreeNode,
    session: Session,
) -> anyhow::Result<Session> {
    if !io::stdout().is_terminal() {
        return Err(SelectionError::UnsupportedCapability("interactive terminal").into());
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(service, tree, session);
    let result = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    match result? {
        Outcome::Confirm => {
            info!("Selected {} files", app.session.selection.len());
            Ok(app.session)
        }
        Outcome::Cancel => Err(SelectionError::UserCancelled.into()),
    }
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> anyhow::Result<Outcome> {
    loop {
        app.tick(Instant::now());
        terminal.draw(|f| ui(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if let Some(outcome) = app.handle_key(key, Instant::now()) {
                    return Ok(outcome);
                }
            }
        }
    }
}
