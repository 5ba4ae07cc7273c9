// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState};
use roster_app::{
    AdvancedFilters, CancelToken, CellRect, DEFAULT_OVERSCAN, DEFAULT_PAGE_SIZE,
    DEFAULT_PREFETCH_PAGES, Debouncer, Density, FetchError, FetchOrchestrator, FetchOutcome,
    FetchTask, Field, GridLayout, LayoutMode, LoaderSentinel, Page, PageRequest, PersonDetail,
    PersonId, PersonRow, PersonStatus, Preferences, RegistryCommand, RegistryEvent,
    RegistryState, RowWindow, SelectionInput, SortKey, ViewCatalog, ensure_visible,
    export_rows, max_scroll, rows_to_csv, visible_range, with_override,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const POLL_INTERVAL: Duration = Duration::from_millis(120);
const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(4);
const DETAIL_PAGE_LINES: u16 = 10;

/// Knobs the front end takes from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TuiOptions {
    pub page_size: usize,
    pub prefetch_pages: usize,
    pub overscan: usize,
    /// Grid card width floor, in terminal cells.
    pub min_card_width: u16,
    pub gap: u16,
    pub debounce: Duration,
}

impl Default for TuiOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            prefetch_pages: DEFAULT_PREFETCH_PAGES,
            overscan: DEFAULT_OVERSCAN,
            min_card_width: 26,
            gap: 1,
            debounce: Duration::from_millis(300),
        }
    }
}

pub trait AppRuntime {
    fn fetch_page(&mut self, request: &PageRequest, token: &CancelToken)
    -> Result<Page, FetchError>;
    /// Run one page request and report back through `tx`. The default runs
    /// inline; runtimes with real latency should move this off the UI thread.
    fn spawn_fetch(&mut self, task: FetchTask, tx: Sender<InternalEvent>) -> Result<()> {
        let result = self.fetch_page(&task.request, &task.token);
        tx.send(InternalEvent::PageLoaded {
            request_id: task.request_id,
            result,
        })
        .map_err(|_| anyhow!("fetch event channel closed"))?;
        Ok(())
    }
    fn fetch_detail(
        &mut self,
        id: PersonId,
        token: &CancelToken,
    ) -> Result<Arc<PersonDetail>, FetchError>;
    fn save_preferences(&mut self, preferences: &Preferences) -> Result<()>;
    fn save_views(&mut self, views: &ViewCatalog) -> Result<()>;
    fn export_csv(&mut self, csv: &str) -> Result<PathBuf>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    PageLoaded {
        request_id: u64,
        result: Result<Page, FetchError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptKind {
    Search,
    Filter,
    SaveView,
}

impl PromptKind {
    const fn label(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Filter => "filter",
            Self::SaveView => "save view as",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PromptUiState {
    kind: PromptKind,
    buffer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct PickerUiState {
    visible: bool,
    cursor: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DetailUiState {
    detail: Arc<PersonDetail>,
    scroll: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LoaderState {
    Idle,
    Loading,
    Failed(String),
}

/// One materialized position: a person row/card or the trailing loader.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Person {
        row: PersonRow,
        selected: bool,
        focused: bool,
    },
    Loader(LoaderState),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct GridCard {
    slot: Slot,
    rect: CellRect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Geometry {
    columns: usize,
    pitch: u32,
    item_height: u32,
    viewport_height: u32,
}

#[derive(Debug)]
struct ViewData {
    options: TuiOptions,
    fetch: FetchOrchestrator,
    sentinel: LoaderSentinel,
    sentinel_layout: LayoutMode,
    search: Debouncer<String>,
    viewport: Rect,
    grid: GridLayout,
    window: Option<RowWindow>,
    scroll: u32,
    top_row: usize,
    cursor: usize,
    selected_col: usize,
    prompt: Option<PromptUiState>,
    column_picker: PickerUiState,
    view_picker: PickerUiState,
    detail: Option<DetailUiState>,
    help_visible: bool,
    status_token: u64,
}

impl ViewData {
    fn new(options: TuiOptions) -> Self {
        Self {
            options,
            fetch: FetchOrchestrator::new(
                options.page_size,
                options.prefetch_pages,
                Field::BASE.to_vec(),
            ),
            sentinel: LoaderSentinel::default(),
            sentinel_layout: LayoutMode::default(),
            search: Debouncer::new(options.debounce),
            viewport: Rect::default(),
            grid: GridLayout::compute(0, u32::from(options.gap), u32::from(options.min_card_width)),
            window: None,
            scroll: 0,
            top_row: 0,
            cursor: 0,
            selected_col: 0,
            prompt: None,
            column_picker: PickerUiState::default(),
            view_picker: PickerUiState::default(),
            detail: None,
            help_visible: false,
            status_token: 0,
        }
    }
}

pub fn run_app<R: AppRuntime>(
    state: &mut RegistryState,
    runtime: &mut R,
    options: TuiOptions,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::new(options);
    let (internal_tx, internal_rx) = mpsc::channel();
    start_query(state, runtime, &mut view_data, &internal_tx);

    let mut result = Ok(());
    loop {
        process_internal_events(state, runtime, &mut view_data, &internal_tx, &internal_rx);
        poll_search(state, runtime, &mut view_data, &internal_tx, Instant::now());

        let size = match terminal.size() {
            Ok(size) => size,
            Err(error) => {
                result = Err(error).context("read terminal size");
                break;
            }
        };
        let body = body_inner(Rect::new(0, 0, size.width, size.height));
        sync_viewport(state, runtime, &mut view_data, &internal_tx, body);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(POLL_INTERVAL).context("poll event")?;
        if has_event
            && let Event::Key(key) = event::read().context("read event")?
            && handle_key_event(state, runtime, &mut view_data, &internal_tx, key)
        {
            break;
        }
    }

    view_data.fetch.cancel_all();
    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events<R: AppRuntime>(
    state: &mut RegistryState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(RegistryCommand::ClearStatus, &[]);
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::PageLoaded { request_id, result } => {
                let (outcome, follow_up) = view_data.fetch.complete(request_id, result);
                if let FetchOutcome::Failed(message) = outcome {
                    emit_status(
                        state,
                        view_data,
                        tx,
                        format!("fetch failed: {message}; press r to retry"),
                    );
                }
                if let Some(task) = follow_up {
                    spawn_task(state, runtime, view_data, tx, task);
                }
            }
        }
    }
}

fn poll_search<R: AppRuntime>(
    state: &mut RegistryState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    now: Instant,
) {
    if let Some(text) = view_data.search.poll(now) {
        dispatch(state, runtime, view_data, tx, RegistryCommand::SetSearchText(text));
    }
}

fn start_query<R: AppRuntime>(
    state: &mut RegistryState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    view_data.cursor = 0;
    view_data.top_row = 0;
    view_data.sentinel.reset();
    if let Some(task) = view_data.fetch.set_query(state.query.clone()) {
        debug!(generation = view_data.fetch.generation(), "query restarted");
        spawn_task(state, runtime, view_data, tx, task);
    }
}

fn spawn_task<R: AppRuntime>(
    state: &mut RegistryState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    task: FetchTask,
) {
    if let Err(error) = runtime.spawn_fetch(task, tx.clone()) {
        emit_status(state, view_data, tx, format!("fetch could not start: {error}"));
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_AFTER);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn arm_status_clear(view_data: &mut ViewData, internal_tx: &Sender<InternalEvent>) {
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn emit_status(
    state: &mut RegistryState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(RegistryCommand::SetStatus(message.into()), &[]);
    arm_status_clear(view_data, internal_tx);
}

fn dispatch<R: AppRuntime>(
    state: &mut RegistryState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    command: RegistryCommand,
) {
    let loaded = view_data.fetch.row_ids();
    let events = state.dispatch(command, &loaded);
    apply_events(state, runtime, view_data, tx, events);
}

fn apply_events<R: AppRuntime>(
    state: &mut RegistryState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    events: Vec<RegistryEvent>,
) {
    for event in events {
        match event {
            RegistryEvent::QueryChanged(_) => start_query(state, runtime, view_data, tx),
            RegistryEvent::PreferencesChanged => {
                if let Err(error) = runtime.save_preferences(&state.preferences()) {
                    emit_status(state, view_data, tx, format!("save preferences failed: {error:#}"));
                }
            }
            RegistryEvent::ViewsChanged => {
                if let Err(error) = runtime.save_views(&state.views) {
                    emit_status(state, view_data, tx, format!("save views failed: {error:#}"));
                }
            }
            RegistryEvent::StatusUpdated(_) => arm_status_clear(view_data, tx),
            RegistryEvent::SelectionChanged
            | RegistryEvent::OverridesChanged { .. }
            | RegistryEvent::StatusCleared => {}
        }
    }
}

fn card_height(density: Density) -> u32 {
    density.row_lines() + 2
}

fn geometry(state: &RegistryState, view_data: &ViewData) -> Geometry {
    let lines = state.density.row_lines();
    match state.layout {
        LayoutMode::List => Geometry {
            columns: 1,
            pitch: lines,
            item_height: lines,
            // One line goes to the header row.
            viewport_height: u32::from(view_data.viewport.height.saturating_sub(1)),
        },
        LayoutMode::Grid => {
            let card = card_height(state.density);
            Geometry {
                columns: view_data.grid.column_count,
                pitch: card + view_data.grid.gap,
                item_height: card,
                viewport_height: u32::from(view_data.viewport.height),
            }
        }
    }
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Recompute geometry for the body area: reflow the grid, keep the cursor in
/// view, derive the materialized window and fire the loader when it shows up.
fn sync_viewport<R: AppRuntime>(
    state: &mut RegistryState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    area: Rect,
) {
    view_data.viewport = area;
    let width = u32::from(area.width);
    if view_data.grid.needs_reflow(width) {
        view_data.grid = GridLayout::compute(
            width,
            u32::from(view_data.options.gap),
            u32::from(view_data.options.min_card_width),
        );
    }
    if view_data.sentinel_layout != state.layout {
        view_data.sentinel.reset();
        view_data.sentinel_layout = state.layout;
    }
    view_data.selected_col = view_data
        .selected_col
        .min(state.visible_columns.len().saturating_sub(1));
    view_data.cursor = view_data
        .cursor
        .min(view_data.fetch.rows().len().saturating_sub(1));

    let geometry = geometry(state, view_data);
    let count = view_data.fetch.row_count_with_loader();
    let rows_fit = (geometry.viewport_height / geometry.pitch).max(1);
    let total_rows = count.div_ceil(geometry.columns);
    let cursor_row = view_data.cursor / geometry.columns;

    // Scroll in whole rows so cards and rows never start half visible.
    let top = ensure_visible(to_u32(view_data.top_row), rows_fit, 1, cursor_row)
        .min(max_scroll(total_rows, 1, rows_fit));
    view_data.top_row = top as usize;
    view_data.scroll = top.saturating_mul(geometry.pitch);

    let overscan = view_data.options.overscan;
    view_data.window = match state.layout {
        LayoutMode::List => visible_range(
            view_data.scroll,
            geometry.viewport_height,
            geometry.pitch,
            count,
            overscan,
        ),
        LayoutMode::Grid => view_data.grid.visible_rows(
            view_data.scroll,
            geometry.viewport_height,
            geometry.item_height,
            count,
            overscan,
        ),
    };

    let loader_row = view_data
        .fetch
        .has_more()
        .then(|| view_data.fetch.rows().len() / geometry.columns);
    if view_data.sentinel.observe(view_data.window, loader_row)
        && let Some(task) = view_data.fetch.request_next()
    {
        debug!(request_id = task.request_id, cursor = %task.request.cursor, "loader visible");
        spawn_task(state, runtime, view_data, tx, task);
    }
}

fn handle_key_event<R: AppRuntime>(
    state: &mut RegistryState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('q') | KeyCode::Char('c'))
    {
        return true;
    }

    if view_data.prompt.is_some() {
        handle_prompt_key(state, runtime, view_data, internal_tx, key);
        return false;
    }
    if view_data.help_visible {
        view_data.help_visible = false;
        return false;
    }
    if view_data.detail.is_some() {
        handle_detail_key(view_data, key);
        return false;
    }
    if view_data.column_picker.visible {
        handle_column_picker_key(state, runtime, view_data, internal_tx, key);
        return false;
    }
    if view_data.view_picker.visible {
        handle_view_picker_key(state, runtime, view_data, internal_tx, key);
        return false;
    }

    handle_nav_key(state, runtime, view_data, internal_tx, key)
}

fn handle_nav_key<R: AppRuntime>(
    state: &mut RegistryState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let geometry = geometry(state, view_data);
    let step = geometry.columns as isize;
    let page = (geometry.viewport_height / geometry.pitch).max(1) as isize * step;

    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('d') if ctrl => move_cursor(view_data, page),
        KeyCode::Char('u') if ctrl => move_cursor(view_data, -page),
        KeyCode::PageDown => move_cursor(view_data, page),
        KeyCode::PageUp => move_cursor(view_data, -page),
        KeyCode::Char('j') | KeyCode::Down if !shift => move_cursor(view_data, step),
        KeyCode::Char('k') | KeyCode::Up if !shift => move_cursor(view_data, -step),
        KeyCode::Char('J') | KeyCode::Down => {
            move_cursor(view_data, step);
            select_at_cursor(state, runtime, view_data, tx, |target| {
                SelectionInput::Range {
                    target,
                    accumulate: false,
                }
            });
        }
        KeyCode::Char('K') | KeyCode::Up => {
            move_cursor(view_data, -step);
            select_at_cursor(state, runtime, view_data, tx, |target| {
                SelectionInput::Range {
                    target,
                    accumulate: false,
                }
            });
        }
        KeyCode::Char('h') | KeyCode::Left => match state.layout {
            LayoutMode::List => move_column(state, view_data, -1),
            LayoutMode::Grid => move_cursor(view_data, -1),
        },
        KeyCode::Char('l') | KeyCode::Right => match state.layout {
            LayoutMode::List => move_column(state, view_data, 1),
            LayoutMode::Grid => move_cursor(view_data, 1),
        },
        KeyCode::Char('g') | KeyCode::Home => view_data.cursor = 0,
        KeyCode::Char('G') | KeyCode::End => {
            view_data.cursor = view_data.fetch.rows().len().saturating_sub(1);
        }
        KeyCode::Char(' ') => {
            select_at_cursor(state, runtime, view_data, tx, SelectionInput::Point);
        }
        KeyCode::Char('x') => {
            select_at_cursor(state, runtime, view_data, tx, SelectionInput::Accumulate);
        }
        KeyCode::Char('u') => {
            select_at_cursor(state, runtime, view_data, tx, |target| {
                SelectionInput::Range {
                    target,
                    accumulate: true,
                }
            });
        }
        KeyCode::Char('a') => dispatch(
            state,
            runtime,
            view_data,
            tx,
            RegistryCommand::Select(SelectionInput::SelectAllOnPage),
        ),
        KeyCode::Esc => dispatch(
            state,
            runtime,
            view_data,
            tx,
            RegistryCommand::Select(SelectionInput::Clear),
        ),
        KeyCode::Char('/') => open_prompt(view_data, PromptKind::Search, state.query.text.clone()),
        KeyCode::Char('f') => open_prompt(
            view_data,
            PromptKind::Filter,
            state.query.filters.to_string(),
        ),
        KeyCode::Char('F') => dispatch(state, runtime, view_data, tx, RegistryCommand::ClearFilters),
        KeyCode::Char('t') => dispatch(
            state,
            runtime,
            view_data,
            tx,
            RegistryCommand::CycleQuickStatus,
        ),
        KeyCode::Char(code @ ('s' | 'S')) => {
            if let Some(field) = state.visible_columns.get(view_data.selected_col).copied() {
                dispatch(
                    state,
                    runtime,
                    view_data,
                    tx,
                    RegistryCommand::ToggleSort {
                        field,
                        additive: code == 'S',
                    },
                );
            }
        }
        KeyCode::Char('z') => dispatch(state, runtime, view_data, tx, RegistryCommand::ClearSort),
        KeyCode::Char('m') => dispatch(state, runtime, view_data, tx, RegistryCommand::ToggleLayout),
        KeyCode::Char('d') => dispatch(state, runtime, view_data, tx, RegistryCommand::CycleDensity),
        KeyCode::Char('c') => {
            view_data.column_picker = PickerUiState {
                visible: true,
                cursor: 0,
            };
        }
        KeyCode::Char('w') => open_prompt(view_data, PromptKind::SaveView, String::new()),
        KeyCode::Char('v') => {
            view_data.view_picker = PickerUiState {
                visible: true,
                cursor: 0,
            };
        }
        KeyCode::Char(digit @ ('1' | '2' | '3')) => {
            let status = match digit {
                '1' => PersonStatus::Active,
                '2' => PersonStatus::Paused,
                _ => PersonStatus::Archived,
            };
            dispatch(
                state,
                runtime,
                view_data,
                tx,
                RegistryCommand::BulkSetStatus(status),
            );
        }
        KeyCode::Char('e') => export_loaded(state, runtime, view_data, tx),
        KeyCode::Enter => open_detail(state, runtime, view_data, tx),
        KeyCode::Char('r') => retry_fetch(state, runtime, view_data, tx),
        KeyCode::Char('R') => reload_query(state, runtime, view_data, tx),
        KeyCode::Char('?') => view_data.help_visible = true,
        _ => {}
    }
    false
}

fn move_cursor(view_data: &mut ViewData, delta: isize) {
    let last = view_data.fetch.rows().len().saturating_sub(1);
    view_data.cursor = view_data.cursor.saturating_add_signed(delta).min(last);
}

fn move_column(state: &RegistryState, view_data: &mut ViewData, delta: isize) {
    let last = state.visible_columns.len().saturating_sub(1);
    view_data.selected_col = view_data.selected_col.saturating_add_signed(delta).min(last);
}

fn cursor_id(view_data: &ViewData) -> Option<PersonId> {
    view_data.fetch.rows().get(view_data.cursor).map(|row| row.id)
}

fn select_at_cursor<R: AppRuntime>(
    state: &mut RegistryState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    input: impl FnOnce(PersonId) -> SelectionInput,
) {
    let Some(id) = cursor_id(view_data) else {
        return;
    };
    dispatch(state, runtime, view_data, tx, RegistryCommand::Select(input(id)));
}

fn open_prompt(view_data: &mut ViewData, kind: PromptKind, buffer: String) {
    view_data.prompt = Some(PromptUiState { kind, buffer });
}

fn handle_prompt_key<R: AppRuntime>(
    state: &mut RegistryState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Esc => {
            view_data.search.cancel();
            view_data.prompt = None;
        }
        KeyCode::Enter => {
            if let Some(prompt) = view_data.prompt.take() {
                submit_prompt(state, runtime, view_data, tx, prompt);
            }
        }
        KeyCode::Backspace => edit_prompt(view_data, |buffer| {
            buffer.pop();
        }),
        KeyCode::Char(value) => edit_prompt(view_data, |buffer| buffer.push(value)),
        _ => {}
    }
}

fn edit_prompt(view_data: &mut ViewData, edit: impl FnOnce(&mut String)) {
    let Some(prompt) = view_data.prompt.as_mut() else {
        return;
    };
    edit(&mut prompt.buffer);
    if prompt.kind == PromptKind::Search {
        view_data.search.push(prompt.buffer.clone(), Instant::now());
    }
}

fn submit_prompt<R: AppRuntime>(
    state: &mut RegistryState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    prompt: PromptUiState,
) {
    match prompt.kind {
        PromptKind::Search => {
            view_data.search.cancel();
            dispatch(
                state,
                runtime,
                view_data,
                tx,
                RegistryCommand::SetSearchText(prompt.buffer),
            );
        }
        PromptKind::Filter => match AdvancedFilters::parse(&prompt.buffer) {
            Ok(filters) => dispatch(state, runtime, view_data, tx, RegistryCommand::SetFilters(filters)),
            Err(error) => emit_status(state, view_data, tx, format!("filter not applied: {error:#}")),
        },
        PromptKind::SaveView => dispatch(
            state,
            runtime,
            view_data,
            tx,
            RegistryCommand::SaveView(prompt.buffer),
        ),
    }
}

fn handle_detail_key(view_data: &mut ViewData, key: KeyEvent) {
    if matches!(
        key.code,
        KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')
    ) {
        view_data.detail = None;
        return;
    }
    let Some(detail) = view_data.detail.as_mut() else {
        return;
    };
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => detail.scroll = detail.scroll.saturating_add(1),
        KeyCode::Char('k') | KeyCode::Up => detail.scroll = detail.scroll.saturating_sub(1),
        KeyCode::PageDown => detail.scroll = detail.scroll.saturating_add(DETAIL_PAGE_LINES),
        KeyCode::PageUp => detail.scroll = detail.scroll.saturating_sub(DETAIL_PAGE_LINES),
        _ => {}
    }
}

fn handle_column_picker_key<R: AppRuntime>(
    state: &mut RegistryState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let last = Field::COLUMNS.len() - 1;
    let picker = &mut view_data.column_picker;
    match key.code {
        KeyCode::Esc | KeyCode::Char('c') => picker.visible = false,
        KeyCode::Char('j') | KeyCode::Down => picker.cursor = (picker.cursor + 1).min(last),
        KeyCode::Char('k') | KeyCode::Up => picker.cursor = picker.cursor.saturating_sub(1),
        KeyCode::Char(' ') | KeyCode::Enter => {
            if let Some(field) = Field::COLUMNS.get(picker.cursor).copied() {
                dispatch(state, runtime, view_data, tx, RegistryCommand::ToggleColumn(field));
            }
        }
        KeyCode::Char('a') => dispatch(state, runtime, view_data, tx, RegistryCommand::ShowAllColumns),
        _ => {}
    }
}

fn handle_view_picker_key<R: AppRuntime>(
    state: &mut RegistryState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let count = state.views.len();
    let selected = state
        .views
        .names()
        .get(view_data.view_picker.cursor)
        .map(|name| (*name).to_owned())
        .unwrap_or_default();
    let picker = &mut view_data.view_picker;
    match key.code {
        KeyCode::Esc | KeyCode::Char('v') => picker.visible = false,
        KeyCode::Char('j') | KeyCode::Down => {
            picker.cursor = (picker.cursor + 1).min(count.saturating_sub(1));
        }
        KeyCode::Char('k') | KeyCode::Up => picker.cursor = picker.cursor.saturating_sub(1),
        KeyCode::Enter => {
            picker.visible = false;
            dispatch(state, runtime, view_data, tx, RegistryCommand::LoadView(selected));
        }
        KeyCode::Char('d') | KeyCode::Delete => {
            dispatch(state, runtime, view_data, tx, RegistryCommand::DeleteView(selected));
            let remaining = state.views.len();
            let picker = &mut view_data.view_picker;
            picker.cursor = picker.cursor.min(remaining.saturating_sub(1));
        }
        _ => {}
    }
}

fn open_detail<R: AppRuntime>(
    state: &mut RegistryState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    let Some(id) = cursor_id(view_data) else {
        return;
    };
    let token = CancelToken::new();
    match runtime.fetch_detail(id, &token) {
        Ok(detail) => view_data.detail = Some(DetailUiState { detail, scroll: 0 }),
        Err(FetchError::Cancelled) => {}
        Err(FetchError::Failed(message)) => {
            emit_status(state, view_data, tx, format!("detail for {id} failed: {message}"));
        }
    }
}

fn export_loaded<R: AppRuntime>(
    state: &mut RegistryState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    let rows = export_rows(view_data.fetch.rows(), &state.selection, &state.overrides);
    if rows.is_empty() {
        emit_status(state, view_data, tx, "nothing to export");
        return;
    }
    let csv = rows_to_csv(&rows, &state.visible_columns);
    match runtime.export_csv(&csv) {
        Ok(path) => {
            info!(rows = rows.len(), path = %path.display(), "csv exported");
            emit_status(
                state,
                view_data,
                tx,
                format!("exported {} rows to {}", rows.len(), path.display()),
            );
        }
        Err(error) => emit_status(state, view_data, tx, format!("export failed: {error:#}")),
    }
}

fn reload_query<R: AppRuntime>(
    state: &mut RegistryState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    view_data.cursor = 0;
    view_data.top_row = 0;
    view_data.sentinel.reset();
    if let Some(task) = view_data.fetch.reload() {
        debug!(generation = view_data.fetch.generation(), "query reloaded");
        emit_status(state, view_data, tx, "reloading");
        spawn_task(state, runtime, view_data, tx, task);
    }
}

fn retry_fetch<R: AppRuntime>(
    state: &mut RegistryState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    match view_data.fetch.retry() {
        Some(task) => {
            emit_status(state, view_data, tx, "retrying");
            spawn_task(state, runtime, view_data, tx, task);
        }
        None if view_data.fetch.is_loading() => {
            emit_status(state, view_data, tx, "fetch already in progress");
        }
        None => emit_status(state, view_data, tx, "nothing to retry"),
    }
}

fn screen_layout(area: Rect) -> [Rect; 3] {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(area);
    [layout[0], layout[1], layout[2]]
}

fn body_inner(area: Rect) -> Rect {
    Block::default()
        .borders(Borders::ALL)
        .inner(screen_layout(area)[1])
}

fn loader_state(view_data: &ViewData) -> LoaderState {
    if let Some(error) = view_data.fetch.error() {
        LoaderState::Failed(error.to_owned())
    } else if view_data.fetch.is_loading() {
        LoaderState::Loading
    } else {
        LoaderState::Idle
    }
}

fn loader_label(loader: &LoaderState) -> String {
    match loader {
        LoaderState::Idle => "more rows below".to_owned(),
        LoaderState::Loading => "loading…".to_owned(),
        LoaderState::Failed(error) => format!("load failed: {error} (r retry)"),
    }
}

fn slot_at(state: &RegistryState, view_data: &ViewData, index: usize) -> Option<Slot> {
    let rows = view_data.fetch.rows();
    match rows.get(index) {
        Some(row) => Some(Slot::Person {
            row: with_override(&state.overrides, row),
            selected: state.selection.is_selected(row.id),
            focused: index == view_data.cursor,
        }),
        None if index == rows.len() && view_data.fetch.has_more() => {
            Some(Slot::Loader(loader_state(view_data)))
        }
        None => None,
    }
}

/// List rows inside the current window; nothing outside it is built.
fn materialize_list(state: &RegistryState, view_data: &ViewData) -> Vec<Slot> {
    let Some(window) = view_data.window else {
        return Vec::new();
    };
    window
        .indices()
        .filter_map(|index| slot_at(state, view_data, index))
        .collect()
}

fn grid_cards(state: &RegistryState, view_data: &ViewData) -> Vec<GridCard> {
    let Some(window) = view_data.window else {
        return Vec::new();
    };
    let count = view_data.fetch.row_count_with_loader();
    let height = card_height(state.density);
    view_data
        .grid
        .visible_cells(window, count)
        .into_iter()
        .filter_map(|cell| {
            let slot = slot_at(state, view_data, cell.index)?;
            Some(GridCard {
                slot,
                rect: view_data.grid.cell_rect(cell.index, height),
            })
        })
        .collect()
}

/// Screen area for a card, clipped to the body. Cards scrolled above the top
/// or starting past the bottom are skipped.
fn card_area(inner: Rect, rect: CellRect, scroll: u32) -> Option<Rect> {
    let top = rect.y.checked_sub(scroll)?;
    let height = u32::from(inner.height).checked_sub(top).filter(|rest| *rest > 0)?;
    let width = u32::from(inner.width)
        .checked_sub(rect.x)
        .filter(|rest| *rest > 0)?;
    Some(Rect::new(
        inner.x.saturating_add(u16::try_from(rect.x).ok()?),
        inner.y.saturating_add(u16::try_from(top).ok()?),
        u16::try_from(width.min(rect.width)).ok()?,
        u16::try_from(height.min(rect.height)).ok()?,
    ))
}

fn checkbox(selected: bool) -> &'static str {
    if selected { "[x]" } else { "[ ]" }
}

fn column_constraint(field: Field) -> Constraint {
    match field {
        Field::Id => Constraint::Length(7),
        Field::FullName => Constraint::Min(18),
        Field::BirthDate => Constraint::Length(10),
        Field::Gender => Constraint::Length(6),
        Field::City => Constraint::Min(10),
        Field::Email => Constraint::Min(20),
        Field::Phone => Constraint::Length(17),
        Field::Status => Constraint::Length(8),
        Field::RegisteredAddress => Constraint::Min(20),
    }
}

fn sort_marker(sort: &[SortKey], field: Field) -> Option<String> {
    let position = sort.iter().position(|key| key.field == field)?;
    let arrow = sort[position].direction.arrow();
    if sort.len() > 1 {
        Some(format!("{arrow}{}", position + 1))
    } else {
        Some(arrow.to_owned())
    }
}

fn header_label(state: &RegistryState, field: Field) -> String {
    match sort_marker(&state.query.sort, field) {
        Some(marker) => format!("{} {marker}", field.label()),
        None => field.label().to_owned(),
    }
}

fn sort_summary(sort: &[SortKey]) -> String {
    sort.iter()
        .map(|key| format!("{} {}", key.field.label(), key.direction.arrow()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn header_text(state: &RegistryState, view_data: &ViewData) -> String {
    let mut parts = Vec::new();
    if !state.query.text.is_empty() {
        parts.push(format!("search {:?}", state.query.text));
    }
    parts.push(format!("status {}", state.query.quick_status.as_str()));
    if !state.query.filters.is_empty() {
        parts.push(format!("filters {}", state.query.filters));
    }
    if !state.query.sort.is_empty() {
        parts.push(format!("sort {}", sort_summary(&state.query.sort)));
    }
    let loaded = view_data.fetch.rows().len();
    parts.push(match view_data.fetch.total() {
        Some(total) => format!("{loaded} of {total} loaded"),
        None => "loading".to_owned(),
    });
    parts.push(format!(
        "{} · {}",
        state.layout.as_str(),
        state.density.as_str()
    ));
    parts.join(" | ")
}

fn body_title(state: &RegistryState, view_data: &ViewData) -> String {
    let sort_target = state
        .visible_columns
        .get(view_data.selected_col)
        .map_or("-", |field| field.label());
    match state.layout {
        LayoutMode::List => format!("people · sort column {sort_target}"),
        LayoutMode::Grid => format!(
            "people · {} columns · sort column {sort_target}",
            view_data.grid.column_count
        ),
    }
}

fn render(frame: &mut ratatui::Frame<'_>, state: &RegistryState, view_data: &ViewData) {
    let [header_area, body_area, status_area] = screen_layout(frame.area());

    let header = Paragraph::new(header_text(state, view_data))
        .block(Block::default().title("roster").borders(Borders::ALL));
    frame.render_widget(header, header_area);

    match state.layout {
        LayoutMode::List => render_list(frame, body_area, state, view_data),
        LayoutMode::Grid => render_grid(frame, body_area, state, view_data),
    }

    let status_widget = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_widget, status_area);

    if view_data.column_picker.visible {
        let area = centered_rect(40, 60, frame.area());
        frame.render_widget(Clear, area);
        let picker = Paragraph::new(render_column_picker_text(state, view_data))
            .block(Block::default().title("columns").borders(Borders::ALL));
        frame.render_widget(picker, area);
    }

    if view_data.view_picker.visible {
        let area = centered_rect(50, 50, frame.area());
        frame.render_widget(Clear, area);
        let picker = Paragraph::new(render_view_picker_text(state, view_data))
            .block(Block::default().title("saved views").borders(Borders::ALL));
        frame.render_widget(picker, area);
    }

    if let Some(detail) = &view_data.detail {
        let area = centered_rect(70, 80, frame.area());
        frame.render_widget(Clear, area);
        let title = format!("person {}", detail.detail.id);
        let body = Paragraph::new(render_detail_text(&detail.detail))
            .scroll((detail.scroll, 0))
            .block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(body, area);
    }

    if view_data.help_visible {
        let area = centered_rect(80, 72, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_list(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    state: &RegistryState,
    view_data: &ViewData,
) {
    let loaded = view_data.fetch.row_ids();
    let height = u16::try_from(state.density.row_lines()).unwrap_or(1);

    let mut widths = vec![Constraint::Length(3)];
    widths.extend(state.visible_columns.iter().copied().map(column_constraint));

    let mut header_cells = vec![Cell::from(state.selection.page_state(&loaded).glyph())];
    header_cells.extend(state.visible_columns.iter().enumerate().map(|(index, field)| {
        let mut style = Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD);
        if index == view_data.selected_col {
            style = style.add_modifier(Modifier::UNDERLINED);
        }
        Cell::from(header_label(state, *field)).style(style)
    }));
    let header = Row::new(header_cells);

    let rows = materialize_list(state, view_data).into_iter().map(|slot| match slot {
        Slot::Person {
            row,
            selected,
            focused,
            ..
        } => {
            let mut style = Style::default();
            if selected {
                style = style.fg(Color::Cyan);
            }
            if focused {
                style = style.bg(Color::DarkGray);
            }
            let mut cells = vec![Cell::from(checkbox(selected))];
            cells.extend(state.visible_columns.iter().enumerate().map(|(index, field)| {
                let cell = Cell::from(row.cell(*field));
                if focused && index == view_data.selected_col {
                    cell.style(
                        Style::default()
                            .fg(Color::Black)
                            .bg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    )
                } else {
                    cell
                }
            }));
            Row::new(cells).height(height).style(style)
        }
        Slot::Loader(loader) => {
            let color = match loader {
                LoaderState::Failed(_) => Color::Red,
                LoaderState::Idle | LoaderState::Loading => Color::DarkGray,
            };
            Row::new(vec![Cell::from(""), Cell::from(loader_label(&loader))])
                .height(height)
                .style(Style::default().fg(color))
        }
    });

    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(
            Block::default()
                .title(body_title(state, view_data))
                .borders(Borders::ALL),
        );
    let offset = view_data
        .window
        .map_or(0, |window| view_data.top_row.saturating_sub(window.first));
    let mut table_state = TableState::default().with_offset(offset);
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn render_grid(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    state: &RegistryState,
    view_data: &ViewData,
) {
    let block = Block::default()
        .title(body_title(state, view_data))
        .borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    for card in grid_cards(state, view_data) {
        let Some(card_rect) = card_area(inner, card.rect, view_data.scroll) else {
            continue;
        };
        frame.render_widget(card_widget(&card.slot, state.density), card_rect);
    }
}

fn card_lines(row: &PersonRow, density: Density) -> Vec<String> {
    let lines = [
        format!("#{} {}", row.id, row.cell(Field::Status)),
        format!("{} · {}", row.cell(Field::City), row.cell(Field::BirthDate)),
        row.cell(Field::Email),
    ];
    lines
        .into_iter()
        .take(density.row_lines() as usize)
        .collect()
}

fn card_widget(slot: &Slot, density: Density) -> Paragraph<'static> {
    match slot {
        Slot::Person {
            row,
            selected,
            focused,
            ..
        } => {
            let mut border = Style::default();
            if *selected {
                border = border.fg(Color::Cyan);
            }
            if *focused {
                border = border.add_modifier(Modifier::BOLD | Modifier::REVERSED);
            }
            let title = format!("{} {}", checkbox(*selected), row.cell(Field::FullName));
            Paragraph::new(card_lines(row, density).join("\n")).block(
                Block::default()
                    .title(title)
                    .borders(Borders::ALL)
                    .border_style(border),
            )
        }
        Slot::Loader(loader) => Paragraph::new(loader_label(loader))
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL)),
    }
}

fn render_column_picker_text(state: &RegistryState, view_data: &ViewData) -> String {
    let mut lines: Vec<String> = Field::COLUMNS
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let cursor = if index == view_data.column_picker.cursor {
                ">"
            } else {
                " "
            };
            let mark = checkbox(state.visible_columns.contains(field));
            format!("{cursor} {mark} {}", field.label())
        })
        .collect();
    lines.push(String::new());
    lines.push("space toggle | a show all | esc close".to_owned());
    lines.join("\n")
}

fn render_view_picker_text(state: &RegistryState, view_data: &ViewData) -> String {
    if state.views.is_empty() {
        return "no saved views; press w to save the current one\n\nesc close".to_owned();
    }
    let mut lines: Vec<String> = state
        .views
        .views()
        .iter()
        .enumerate()
        .map(|(index, view)| {
            let cursor = if index == view_data.view_picker.cursor {
                ">"
            } else {
                " "
            };
            format!(
                "{cursor} {} ({}, {})",
                view.name,
                view.layout.as_str(),
                view.density.as_str()
            )
        })
        .collect();
    lines.push(String::new());
    lines.push("enter load | d delete | esc close".to_owned());
    lines.join("\n")
}

fn render_detail_text(detail: &PersonDetail) -> String {
    let mut out = String::new();
    for section in &detail.sections {
        out.push_str(&section.title);
        out.push('\n');
        for (label, value) in &section.fields {
            out.push_str(&format!("  {label}: {value}\n"));
        }
        out.push('\n');
    }
    out
}

fn help_overlay_text() -> &'static str {
    "global: ctrl+q quit | q quit | ? help\n\
nav: j/k up/down | h/l column (list) or card (grid) | g/G top/bottom | ctrl+d/u pgdn/pgup\n\
select: space toggle | x toggle keep anchor | J/K extend range | u add range to cursor | a page | esc clear\n\
query: / search | t quick status | f filter | F clear filters | s/S sort (add) | z clear sort\n\
display: m list/grid | d density | c columns\n\
views: w save | v open (enter load, d delete)\n\
rows: 1/2/3 set active/paused/archived | e export csv | enter detail | r retry failed fetch | R reload\n\
filter syntax: status:active,paused gender:f city:\"New York\" domain:example.com email:yes phone:no age:30-40 born:1980-01-01..1990-12-31"
}

fn status_text(state: &RegistryState, view_data: &ViewData) -> String {
    if let Some(prompt) = &view_data.prompt {
        return format!(
            "{}: {}_ | enter apply | esc cancel",
            prompt.kind.label(),
            prompt.buffer
        );
    }
    if status_hidden_by_overlay(view_data) {
        return String::new();
    }

    let loaded = view_data.fetch.row_ids();
    let page = state.selection.page_state(&loaded);
    let mut parts = Vec::new();
    if let Some(status) = &state.status_line {
        parts.push(status.clone());
    }
    if let Some(error) = view_data.fetch.error() {
        parts.push(format!("fetch error: {error} (r retry)"));
    }
    parts.push(format!("{} {} selected", page.glyph(), state.selection.len()));
    parts.push(
        "j/k move | space/x/J/K select | / search | t status | f filter | s sort | m layout | v views | e export | ? help"
            .to_owned(),
    );
    parts.join(" | ")
}

fn status_hidden_by_overlay(view_data: &ViewData) -> bool {
    view_data.help_visible
        || view_data.detail.is_some()
        || view_data.column_picker.visible
        || view_data.view_picker.visible
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
