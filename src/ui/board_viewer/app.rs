use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use crate::board::MoveRequest;
use crate::error::{Error, Result};
use crate::task::{BoardView, TaskStore};

use super::model::{BoardModel, Shift};
use super::view;

const EVENT_POLL_MS: u64 = 120;
const WATCH_DEBOUNCE_MS: u64 = 200;

enum Request {
    Reload,
    Move(MoveRequest),
}

enum UiMsg {
    Loaded(BoardView),
    LoadError(String),
    Moved(String, usize),
    MoveError(String),
    WatchError(String),
}

#[derive(Clone, Copy)]
pub(crate) enum StatusKind {
    Error,
    Info,
}

pub struct AppState {
    pub(crate) model: Option<BoardModel>,
    pub(crate) show_help: bool,
    status: Option<(String, StatusKind)>,
    watch_error: Option<String>,
    pub(crate) actor: String,
}

impl AppState {
    fn new(actor: String) -> Self {
        Self {
            model: None,
            show_help: false,
            status: None,
            watch_error: None,
            actor,
        }
    }

    pub(crate) fn status_line(&self) -> Option<(String, StatusKind)> {
        if let Some(status) = self.status.clone() {
            return Some(status);
        }
        self.watch_error
            .as_ref()
            .map(|err| (format!("watch: {err}"), StatusKind::Error))
    }

    fn set_error(&mut self, message: String) {
        self.status = Some((message, StatusKind::Error));
    }

    fn set_info(&mut self, message: String) {
        self.status = Some((message, StatusKind::Info));
    }

    fn handle_msg(&mut self, msg: UiMsg, req_tx: &Sender<Request>) {
        match msg {
            UiMsg::Loaded(view) => match self.model.as_mut() {
                Some(model) => model.replace(view),
                None => self.model = Some(BoardModel::from_view(view)),
            },
            UiMsg::LoadError(err) => self.set_error(format!("load failed: {err}")),
            UiMsg::Moved(id, applied) => {
                self.set_info(format!("moved {id} ({applied} card(s) renumbered)"));
            }
            UiMsg::MoveError(err) => {
                self.set_error(format!("move rejected: {err}"));
                let _ = req_tx.send(Request::Reload);
            }
            UiMsg::WatchError(err) => self.watch_error = Some(err),
        }
    }

    /// Returns true when the viewer should exit.
    fn handle_key(&mut self, key: KeyEvent, req_tx: &Sender<Request>) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }
        if self.show_help {
            self.show_help = false;
            return false;
        }
        let shift = match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('?') => {
                self.show_help = true;
                return false;
            }
            KeyCode::Char('r') => {
                self.status = None;
                let _ = req_tx.send(Request::Reload);
                return false;
            }
            KeyCode::Char('h') | KeyCode::Left => {
                self.with_model(|m| m.focus_column(-1));
                return false;
            }
            KeyCode::Char('l') | KeyCode::Right => {
                self.with_model(|m| m.focus_column(1));
                return false;
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.with_model(|m| m.select_row(-1));
                return false;
            }
            KeyCode::Char('j') | KeyCode::Down => {
                self.with_model(|m| m.select_row(1));
                return false;
            }
            KeyCode::Char('H') => Shift::Left,
            KeyCode::Char('L') => Shift::Right,
            KeyCode::Char('K') => Shift::Up,
            KeyCode::Char('J') => Shift::Down,
            _ => return false,
        };
        self.shift_selected(shift, req_tx);
        false
    }

    fn with_model(&mut self, f: impl FnOnce(&mut BoardModel)) {
        if let Some(model) = self.model.as_mut() {
            f(model);
        }
    }

    fn shift_selected(&mut self, shift: Shift, req_tx: &Sender<Request>) {
        let Some(model) = self.model.as_mut() else {
            return;
        };
        let Some(request) = model.plan_shift(shift) else {
            return;
        };
        match model.apply_move(&request) {
            Ok(changes) if changes.is_empty() => {}
            Ok(_) => {
                self.status = None;
                let _ = req_tx.send(Request::Move(request));
            }
            Err(err) => self.set_error(err.to_string()),
        }
    }
}

pub fn run(store: TaskStore, workspace: &str, actor: String) -> Result<()> {
    // Fail fast on an unknown workspace or a non-member before touching the terminal.
    let view = store.board_view(workspace, &actor, None)?;
    let workspace_id = view.workspace_id.clone();

    let (ui_tx, ui_rx) = mpsc::channel();
    let (req_tx, req_rx) = mpsc::channel();
    spawn_worker(
        store.clone(),
        workspace_id,
        actor.clone(),
        req_rx,
        ui_tx.clone(),
    );
    spawn_watch(&store, req_tx.clone(), ui_tx);

    let mut app = AppState::new(actor);
    app.model = Some(BoardModel::from_view(view));
    run_terminal(&mut app, ui_rx, req_tx)
}

fn run_terminal(app: &mut AppState, ui_rx: Receiver<UiMsg>, req_tx: Sender<Request>) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, app, ui_rx, req_tx);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    ui_rx: Receiver<UiMsg>,
    req_tx: Sender<Request>,
) -> Result<()> {
    let mut dirty = true;
    loop {
        while let Ok(msg) = ui_rx.try_recv() {
            app.handle_msg(msg, &req_tx);
            dirty = true;
        }

        if dirty {
            terminal.draw(|frame| view::render(frame, app))?;
            dirty = false;
        }

        if event::poll(Duration::from_millis(EVENT_POLL_MS))? {
            match event::read()? {
                Event::Key(key) => {
                    if app.handle_key(key, &req_tx) {
                        break;
                    }
                    dirty = true;
                }
                Event::Resize(_, _) => dirty = true,
                _ => {}
            }
        }
    }
    Ok(())
}

/// Store calls run off the UI thread, one at a time and in key order.
fn spawn_worker(
    store: TaskStore,
    workspace_id: String,
    actor: String,
    req_rx: Receiver<Request>,
    ui_tx: Sender<UiMsg>,
) {
    thread::spawn(move || {
        while let Ok(req) = req_rx.recv() {
            let msg = match req {
                Request::Reload => match store.board_view(&workspace_id, &actor, None) {
                    Ok(view) => UiMsg::Loaded(view),
                    Err(err) => UiMsg::LoadError(err.to_string()),
                },
                Request::Move(request) => {
                    match store.move_task(&request.task_id, request.to, request.index, &actor) {
                        Ok(report) => UiMsg::Moved(request.task_id, report.applied.len()),
                        Err(err) => UiMsg::MoveError(err.to_string()),
                    }
                }
            };
            if ui_tx.send(msg).is_err() {
                break;
            }
        }
    });
}

fn spawn_watch(store: &TaskStore, req_tx: Sender<Request>, ui_tx: Sender<UiMsg>) {
    let state_dir = store.storage().state_dir();
    let log = store.storage().tasks_log();

    thread::spawn(move || {
        let (event_tx, event_rx) = mpsc::channel();
        let watcher: notify::Result<RecommendedWatcher> = notify::recommended_watcher(move |res| {
            let _ = event_tx.send(res);
        });
        let mut watcher = match watcher {
            Ok(watcher) => watcher,
            Err(err) => {
                let _ = ui_tx.send(UiMsg::WatchError(err.to_string()));
                return;
            }
        };
        if let Err(err) = watcher.watch(&state_dir, RecursiveMode::NonRecursive) {
            let _ = ui_tx.send(UiMsg::WatchError(
                Error::OperationFailed(format!("watch {}: {err}", state_dir.display())).to_string(),
            ));
            return;
        }

        let debounce = Duration::from_millis(WATCH_DEBOUNCE_MS);
        let mut pending: Option<Instant> = None;
        loop {
            let timeout = pending
                .map(|deadline| deadline.saturating_duration_since(Instant::now()))
                .unwrap_or(Duration::from_secs(3600));
            match event_rx.recv_timeout(timeout) {
                Ok(Ok(event)) => {
                    if event
                        .paths
                        .iter()
                        .any(|path| path.file_name() == log.file_name())
                    {
                        pending = Some(Instant::now() + debounce);
                    }
                }
                Ok(Err(err)) => {
                    let _ = ui_tx.send(UiMsg::WatchError(err.to_string()));
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    if pending.take().is_some() && req_tx.send(Request::Reload).is_err() {
                        break;
                    }
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::TaskStatus;
    use crate::task::BoardColumn;

    fn app_with_empty_board() -> AppState {
        let mut app = AppState::new("alice".to_string());
        app.model = Some(BoardModel::from_view(BoardView {
            workspace_id: "ws-1".to_string(),
            workspace_name: "Ops".to_string(),
            project_id: None,
            columns: TaskStatus::ALL
                .iter()
                .map(|status| BoardColumn {
                    status: *status,
                    title: status.title().to_string(),
                    tasks: Vec::new(),
                })
                .collect(),
        }));
        app
    }

    #[test]
    fn move_error_requests_reload() {
        let mut app = app_with_empty_board();
        let (req_tx, req_rx) = mpsc::channel();
        app.handle_msg(UiMsg::MoveError("conflict".to_string()), &req_tx);
        assert!(matches!(req_rx.try_recv(), Ok(Request::Reload)));
        assert!(matches!(app.status_line(), Some((_, StatusKind::Error))));
    }

    #[test]
    fn quit_and_focus_keys() {
        let mut app = app_with_empty_board();
        let (req_tx, _req_rx) = mpsc::channel();
        let key = |code| KeyEvent::new(code, KeyModifiers::NONE);
        assert!(!app.handle_key(key(KeyCode::Char('l')), &req_tx));
        assert_eq!(
            app.model.as_ref().and_then(BoardModel::focused_status),
            Some(TaskStatus::Todo)
        );
        assert!(app.handle_key(key(KeyCode::Char('q')), &req_tx));
    }
}
