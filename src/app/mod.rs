mod mouse;

use crate::domain::{SessionId, SessionRecord};
use crate::infra::{ArchiveLoad, LoadWarningCount};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("terminal I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    ResolveArchivePath(#[from] crate::infra::ResolveArchivePathError),

    #[error(transparent)]
    LoadArchive(#[from] crate::infra::LoadArchiveError),
}

#[derive(Clone, Debug)]
pub struct AppData {
    pub archive_path: PathBuf,
    pub records: Vec<SessionRecord>,
    pub warnings: LoadWarningCount,
}

impl AppData {
    pub fn from_load(archive_path: PathBuf, load: ArchiveLoad) -> Self {
        Self {
            archive_path,
            records: load.records,
            warnings: load.warnings,
        }
    }
}

/// Navigation tokens understood by the router.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Screen {
    Home,
    ArchiveList,
    NotFound,
}

impl Screen {
    pub fn label(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::ArchiveList => "archive list",
            Self::NotFound => "not found",
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppModel {
    pub data: AppData,
    pub view: View,
    pub terminal_size: (u16, u16),
    pub notice: Option<String>,
    pub help_open: bool,
}

impl AppModel {
    pub fn new(data: AppData) -> Self {
        Self {
            data,
            view: View::Home,
            terminal_size: (0, 0),
            notice: None,
            help_open: false,
        }
    }

    /// Swaps in freshly loaded data, keeping the current selection by session id.
    pub fn with_data(&self, data: AppData) -> Self {
        let view = match &self.view {
            View::Home => View::Home,
            View::Archive(list_view) => {
                View::Archive(list_view.rebased(&self.data.records, &data.records))
            }
            View::SessionDetail(detail_view) => {
                let mut next_view = detail_view.clone();
                next_view.from_archive = detail_view
                    .from_archive
                    .rebased(&self.data.records, &data.records);
                View::SessionDetail(next_view)
            }
        };

        Self {
            data,
            view,
            terminal_size: self.terminal_size,
            notice: None,
            help_open: self.help_open,
        }
    }

    pub fn with_terminal_size(&self, width: u16, height: u16) -> Self {
        Self {
            terminal_size: (width, height),
            ..self.clone()
        }
    }

    pub fn with_notice(&self, notice: Option<String>) -> Self {
        Self {
            notice,
            ..self.clone()
        }
    }

    /// Adds a notice after any notice already shown instead of replacing it.
    pub fn with_appended_notice(&self, notice: String) -> Self {
        let notice = match self.notice.as_deref() {
            Some(existing) if !existing.trim().is_empty() => format!("{existing}  ·  {notice}"),
            _ => notice,
        };
        self.with_notice(Some(notice))
    }

    /// Routes to a screen token. Returning to the archive from a detail view restores the
    /// list selection the detail view was opened from.
    pub fn navigate(&self, screen: Screen) -> Self {
        let from_archive = match &self.view {
            View::Archive(view) => view.clone(),
            View::SessionDetail(view) => view.from_archive.clone(),
            View::Home => ArchiveListView::new(),
        };

        let view = match screen {
            Screen::Home => View::Home,
            Screen::ArchiveList => {
                let mut view = from_archive;
                view.clamp(self.data.records.len());
                View::Archive(view)
            }
            Screen::NotFound => View::SessionDetail(SessionDetailView::new(None, from_archive)),
        };
        tracing::debug!(screen = screen.label(), "navigate");

        Self {
            view,
            help_open: false,
            ..self.clone()
        }
    }

    pub fn open_session_detail(&self, record: Option<SessionRecord>) -> Self {
        let from_archive = match &self.view {
            View::Archive(view) => view.clone(),
            View::SessionDetail(view) => view.from_archive.clone(),
            View::Home => ArchiveListView::new(),
        };
        tracing::debug!(
            id = record.as_ref().map(|record| record.id.to_string()),
            "open session detail"
        );

        Self {
            view: View::SessionDetail(SessionDetailView::new(record, from_archive)),
            help_open: false,
            ..self.clone()
        }
    }
}

#[derive(Clone, Debug)]
pub enum View {
    Home,
    Archive(ArchiveListView),
    SessionDetail(SessionDetailView),
}

/// Emitted once per row activation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ArchiveListEvent {
    Selected(SessionRecord),
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ArchiveListView {
    pub selected: usize,
    pub selected_id: Option<SessionId>,
}

impl ArchiveListView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_record<'a>(&self, records: &'a [SessionRecord]) -> Option<&'a SessionRecord> {
        records.get(self.selected)
    }

    /// `None` for an empty archive; otherwise the selected record, cloned unchanged.
    pub fn activate(&self, records: &[SessionRecord]) -> Option<ArchiveListEvent> {
        self.selected_record(records)
            .cloned()
            .map(ArchiveListEvent::Selected)
    }

    pub fn select(&mut self, index: usize, records: &[SessionRecord]) {
        self.selected = index;
        self.clamp(records.len());
        self.selected_id = self.selected_record(records).map(|record| record.id.clone());
    }

    fn clamp(&mut self, total: usize) {
        self.selected = self.selected.min(total.saturating_sub(1));
    }

    fn rebased(&self, previous: &[SessionRecord], next: &[SessionRecord]) -> Self {
        let anchor = self
            .selected_id
            .clone()
            .or_else(|| self.selected_record(previous).map(|record| record.id.clone()));
        // Stay on the same row when it still carries the anchor; ids may repeat.
        let index = anchor
            .as_ref()
            .and_then(|id| {
                if next
                    .get(self.selected)
                    .is_some_and(|record| &record.id == id)
                {
                    Some(self.selected)
                } else {
                    next.iter().position(|record| &record.id == id)
                }
            })
            .unwrap_or(self.selected);
        let mut view = Self::new();
        view.select(index, next);
        view
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionDetailEvent {
    Back,
}

#[derive(Clone, Debug)]
pub struct SessionDetailView {
    /// `None` renders the not-found state.
    pub record: Option<SessionRecord>,
    pub scroll: u16,
    pub from_archive: ArchiveListView,
}

impl SessionDetailView {
    pub fn new(record: Option<SessionRecord>, from_archive: ArchiveListView) -> Self {
        Self {
            record,
            scroll: 0,
            from_archive,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.record.is_none()
    }

    pub fn back(&self) -> SessionDetailEvent {
        SessionDetailEvent::Back
    }
}

#[derive(Clone, Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AppCommand {
    None,
    Quit,
    Reload,
    Navigate(Screen),
    OpenSessionDetail { record: Option<SessionRecord> },
}

impl From<ArchiveListEvent> for AppCommand {
    fn from(event: ArchiveListEvent) -> Self {
        match event {
            ArchiveListEvent::Selected(record) => Self::OpenSessionDetail {
                record: Some(record),
            },
        }
    }
}

impl From<SessionDetailEvent> for AppCommand {
    fn from(event: SessionDetailEvent) -> Self {
        match event {
            SessionDetailEvent::Back => Self::Navigate(Screen::ArchiveList),
        }
    }
}

pub fn update(model: AppModel, event: AppEvent) -> (AppModel, AppCommand) {
    match event {
        AppEvent::Key(key) => update_on_key(model, key),
        AppEvent::Mouse(mouse) => mouse::update_on_mouse(model, mouse),
    }
}

/// Applies routing commands to the model. Quit and Reload are left to the caller.
pub fn apply_command(model: AppModel, command: &AppCommand) -> AppModel {
    match command {
        AppCommand::Navigate(screen) => model.navigate(*screen),
        AppCommand::OpenSessionDetail { record } => model.open_session_detail(record.clone()),
        AppCommand::None | AppCommand::Quit | AppCommand::Reload => model,
    }
}

fn update_on_key(model: AppModel, key: KeyEvent) -> (AppModel, AppCommand) {
    let mut model = model;
    model.notice = None;

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('q') => return (model, AppCommand::Quit),
            KeyCode::Char('r') => return (model, AppCommand::Reload),
            _ => {}
        }
    }

    if model.help_open {
        model.help_open = false;
        return (model, AppCommand::None);
    }
    if matches!(key.code, KeyCode::F(1) | KeyCode::Char('?')) {
        model.help_open = true;
        return (model, AppCommand::None);
    }

    match model.view.clone() {
        View::Home => update_home(model, key),
        View::Archive(view) => update_archive(model, view, key),
        View::SessionDetail(view) => update_session_detail(model, view, key),
    }
}

fn update_home(model: AppModel, key: KeyEvent) -> (AppModel, AppCommand) {
    match key.code {
        KeyCode::Enter | KeyCode::Char('l') | KeyCode::Char('L') => {
            (model, AppCommand::Navigate(Screen::ArchiveList))
        }
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => (model, AppCommand::Quit),
        _ => (model, AppCommand::None),
    }
}

fn update_archive(
    mut model: AppModel,
    mut view: ArchiveListView,
    key: KeyEvent,
) -> (AppModel, AppCommand) {
    let total = model.data.records.len();
    let page = page_step_standard_list(model.terminal_size);

    match key.code {
        KeyCode::Enter => {
            let command = view
                .activate(&model.data.records)
                .map(AppCommand::from)
                .unwrap_or(AppCommand::None);
            return (model, command);
        }
        KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('q') => {
            return (model, AppCommand::Navigate(Screen::Home));
        }
        KeyCode::Up | KeyCode::Char('k') => {
            view.select(view.selected.saturating_sub(1), &model.data.records);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            if total > 0 {
                view.select(view.selected.saturating_add(1), &model.data.records);
            }
        }
        KeyCode::PageUp => {
            view.select(view.selected.saturating_sub(page), &model.data.records);
        }
        KeyCode::PageDown => {
            view.select(view.selected.saturating_add(page), &model.data.records);
        }
        KeyCode::Home => {
            view.select(0, &model.data.records);
        }
        KeyCode::End => {
            view.select(total.saturating_sub(1), &model.data.records);
        }
        _ => {}
    }

    model.view = View::Archive(view);
    (model, AppCommand::None)
}

fn update_session_detail(
    mut model: AppModel,
    mut view: SessionDetailView,
    key: KeyEvent,
) -> (AppModel, AppCommand) {
    let page = page_step_detail(model.terminal_size);

    match key.code {
        KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('q') => {
            return (model, view.back().into());
        }
        KeyCode::Enter if view.is_not_found() => {
            return (model, view.back().into());
        }
        KeyCode::Up | KeyCode::Char('k') => {
            view.scroll = view.scroll.saturating_sub(1);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            view.scroll = view.scroll.saturating_add(1);
        }
        KeyCode::PageUp => {
            view.scroll = view.scroll.saturating_sub(page);
        }
        KeyCode::PageDown | KeyCode::Char(' ') => {
            view.scroll = view.scroll.saturating_add(page);
        }
        KeyCode::Home => {
            view.scroll = 0;
        }
        KeyCode::End => {
            view.scroll = u16::MAX;
        }
        _ => {}
    }

    model.view = View::SessionDetail(view);
    (model, AppCommand::None)
}

fn page_step_for_height(height: u16) -> u16 {
    height.saturating_sub(1).max(1)
}

fn page_step_standard_list(terminal_size: (u16, u16)) -> usize {
    let list = crate::ui::body_area(terminal_size);
    page_step_for_height(list.height.saturating_sub(2)) as usize
}

fn page_step_detail(terminal_size: (u16, u16)) -> u16 {
    let body = crate::ui::body_area(terminal_size);
    page_step_for_height(body.height.saturating_sub(2))
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(super) fn make_record(id: i64, response: &str) -> SessionRecord {
        SessionRecord {
            id: SessionId::Number(id),
            timestamp: format!("2026-10-0{id} 10:00"),
            username: format!("user{id}"),
            ai_name: "CentralGPT".to_string(),
            user_message: format!("question {id}"),
            ai_response: response.to_string(),
        }
    }

    pub(super) fn archive_model(records: Vec<SessionRecord>) -> AppModel {
        let data = AppData::from_load(
            PathBuf::from("/tmp/archive.json"),
            ArchiveLoad {
                records,
                ..ArchiveLoad::default()
            },
        );
        AppModel::new(data)
            .with_terminal_size(100, 30)
            .navigate(Screen::ArchiveList)
    }

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn enter_on_empty_archive_emits_nothing() {
        let model = archive_model(Vec::new());
        let (next, command) = update(model, key(KeyCode::Enter));
        assert_eq!(command, AppCommand::None);
        assert!(matches!(next.view, View::Archive(_)));
    }

    #[test]
    fn enter_emits_exactly_one_selection_of_the_unchanged_record() {
        let records = vec![make_record(1, "a"), make_record(2, "```py\nx\n```")];
        let model = archive_model(records.clone());

        let (model, command) = update(model, key(KeyCode::Down));
        assert_eq!(command, AppCommand::None);

        let (model, command) = update(model, key(KeyCode::Enter));
        assert_eq!(
            command,
            AppCommand::OpenSessionDetail {
                record: Some(records[1].clone())
            }
        );

        // A second activation is a second, separate event.
        let (_model, command) = update(model, key(KeyCode::Enter));
        assert!(matches!(command, AppCommand::OpenSessionDetail { .. }));
    }

    #[test]
    fn activate_is_none_only_for_empty_archive() {
        let view = ArchiveListView::new();
        assert_eq!(view.activate(&[]), None);
        let records = vec![make_record(3, "r")];
        assert_eq!(
            view.activate(&records),
            Some(ArchiveListEvent::Selected(records[0].clone()))
        );
    }

    #[test]
    fn selection_is_clamped_to_the_archive() {
        let model = archive_model(vec![make_record(1, ""), make_record(2, "")]);
        let (model, _) = update(model, key(KeyCode::End));
        let (model, _) = update(model, key(KeyCode::Down));
        let View::Archive(view) = &model.view else {
            panic!("expected archive view");
        };
        assert_eq!(view.selected, 1);
    }

    #[test]
    fn opening_and_leaving_detail_restores_selection() {
        let records = vec![make_record(1, ""), make_record(2, ""), make_record(3, "")];
        let model = archive_model(records);
        let (model, _) = update(model, key(KeyCode::Down));
        let (model, _) = update(model, key(KeyCode::Down));
        let (model, command) = update(model, key(KeyCode::Enter));
        let model = apply_command(model, &command);
        assert!(matches!(&model.view, View::SessionDetail(view) if view.record.is_some()));

        let (model, command) = update(model, key(KeyCode::Esc));
        assert_eq!(command, AppCommand::Navigate(Screen::ArchiveList));
        let model = apply_command(model, &command);
        let View::Archive(view) = &model.view else {
            panic!("expected archive view");
        };
        assert_eq!(view.selected, 2);
    }

    #[test]
    fn not_found_detail_emits_back_once_per_activation() {
        let model = archive_model(vec![make_record(1, "")]).open_session_detail(None);
        assert!(matches!(&model.view, View::SessionDetail(view) if view.is_not_found()));

        let (model, command) = update(model, key(KeyCode::Enter));
        assert_eq!(command, AppCommand::Navigate(Screen::ArchiveList));
        // The model is not navigated until the command is applied.
        assert!(matches!(&model.view, View::SessionDetail(view) if view.is_not_found()));

        let (_model, command) = update(model, key(KeyCode::Esc));
        assert_eq!(command, AppCommand::Navigate(Screen::ArchiveList));
    }

    #[test]
    fn detail_view_never_mutates_the_record() {
        let record = make_record(4, "body ```rs\nfn x() {}\n``` tail");
        let model = archive_model(vec![record.clone()]).open_session_detail(Some(record.clone()));
        let (model, _) = update(model, key(KeyCode::Down));
        let (model, _) = update(model, key(KeyCode::PageDown));
        let View::SessionDetail(view) = &model.view else {
            panic!("expected detail view");
        };
        assert_eq!(view.record.as_ref(), Some(&record));
        assert_eq!(model.data.records[0], record);
    }

    #[test]
    fn esc_from_archive_goes_home_and_home_quits() {
        let model = archive_model(vec![make_record(1, "")]);
        let (model, command) = update(model, key(KeyCode::Esc));
        assert_eq!(command, AppCommand::Navigate(Screen::Home));
        let model = apply_command(model, &command);
        assert!(matches!(model.view, View::Home));

        let (_model, command) = update(model, key(KeyCode::Char('q')));
        assert_eq!(command, AppCommand::Quit);
    }

    #[test]
    fn reload_keeps_selection_by_id() {
        let model = archive_model(vec![make_record(1, ""), make_record(2, ""), make_record(3, "")]);
        let (model, _) = update(model, key(KeyCode::Down));

        let data = AppData::from_load(
            PathBuf::from("/tmp/archive.json"),
            ArchiveLoad {
                records: vec![make_record(0, ""), make_record(2, ""), make_record(9, "")],
                ..ArchiveLoad::default()
            },
        );
        let model = model.with_data(data);
        let View::Archive(view) = &model.view else {
            panic!("expected archive view");
        };
        assert_eq!(view.selected, 1);
        assert_eq!(view.selected_id, Some(SessionId::Number(2)));
    }

    #[test]
    fn help_toggles_and_swallows_next_key() {
        let model = archive_model(vec![make_record(1, "")]);
        let (model, _) = update(model, key(KeyCode::F(1)));
        assert!(model.help_open);
        let (model, command) = update(model, key(KeyCode::Enter));
        assert_eq!(command, AppCommand::None);
        assert!(!model.help_open);
    }

    #[test]
    fn ctrl_r_requests_reload() {
        let model = archive_model(Vec::new());
        let event = AppEvent::Key(KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL));
        let (_model, command) = update(model, event);
        assert_eq!(command, AppCommand::Reload);
    }

    #[test]
    fn reload_keeps_the_selected_row_among_duplicate_ids() {
        let records = vec![make_record(5, "a"), make_record(5, "b"), make_record(5, "c")];
        let model = archive_model(records.clone());
        let (model, _) = update(model, key(KeyCode::End));

        let data = AppData::from_load(
            PathBuf::from("/tmp/archive.json"),
            ArchiveLoad {
                records,
                ..ArchiveLoad::default()
            },
        );
        let model = model.with_data(data);
        let View::Archive(view) = &model.view else {
            panic!("expected archive view");
        };
        assert_eq!(view.selected, 2);
    }

    #[test]
    fn appended_notice_keeps_the_earlier_one() {
        let model = archive_model(Vec::new())
            .with_notice(Some("Archive not found: /tmp/missing".to_string()))
            .with_appended_notice("Auto-reload disabled".to_string());
        assert_eq!(
            model.notice.as_deref(),
            Some("Archive not found: /tmp/missing  ·  Auto-reload disabled")
        );

        let model = archive_model(Vec::new()).with_appended_notice("Auto-reload disabled".to_string());
        assert_eq!(model.notice.as_deref(), Some("Auto-reload disabled"));
    }
}
