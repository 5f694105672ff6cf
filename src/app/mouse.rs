use super::{AppCommand, AppModel, View};
use crate::ui::{body_area, detail_back_targets, rect_contains};
use crossterm::event::{MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

const SCROLL_STEP: usize = 3;

pub(super) fn update_on_mouse(model: AppModel, mouse: MouseEvent) -> (AppModel, AppCommand) {
    let mut model = model;
    if model.terminal_size.0 == 0 || model.terminal_size.1 == 0 {
        return (model, AppCommand::None);
    }

    match mouse.kind {
        MouseEventKind::ScrollUp => {
            model = apply_scroll(model, mouse.column, mouse.row, ScrollDirection::Up);
            (model, AppCommand::None)
        }
        MouseEventKind::ScrollDown => {
            model = apply_scroll(model, mouse.column, mouse.row, ScrollDirection::Down);
            (model, AppCommand::None)
        }
        MouseEventKind::Down(MouseButton::Left) => apply_left_click(model, mouse.column, mouse.row),
        _ => (model, AppCommand::None),
    }
}

#[derive(Clone, Copy, Debug)]
enum ScrollDirection {
    Up,
    Down,
}

fn apply_scroll(mut model: AppModel, col: u16, row: u16, direction: ScrollDirection) -> AppModel {
    if model.help_open {
        return model;
    }

    match model.view.clone() {
        View::Archive(mut view) => {
            let total = model.data.records.len();
            let next = scroll_index(view.selected, total, direction);
            view.select(next, &model.data.records);
            model.view = View::Archive(view);
        }
        View::SessionDetail(mut view) => {
            let body = body_area(model.terminal_size);
            if !rect_contains(body, col, row) {
                return model;
            }
            let step = usize_to_u16(SCROLL_STEP);
            match direction {
                ScrollDirection::Up => {
                    view.scroll = view.scroll.saturating_sub(step);
                }
                ScrollDirection::Down => {
                    view.scroll = view.scroll.saturating_add(step);
                }
            }
            model.view = View::SessionDetail(view);
        }
        View::Home => {}
    }

    model
}

/// A click on an archive row selects and activates it, emitting one selection per click.
fn apply_left_click(mut model: AppModel, col: u16, row: u16) -> (AppModel, AppCommand) {
    if model.help_open {
        model.help_open = false;
        return (model, AppCommand::None);
    }

    match model.view.clone() {
        View::Archive(mut view) => {
            let list_area = body_area(model.terminal_size);
            let Some(index) = hit_test_list_click(
                list_area,
                view.selected,
                model.data.records.len(),
                col,
                row,
            ) else {
                return (model, AppCommand::None);
            };
            view.select(index, &model.data.records);
            let command = view
                .activate(&model.data.records)
                .map(AppCommand::from)
                .unwrap_or(AppCommand::None);
            model.view = View::Archive(view);
            (model, command)
        }
        View::SessionDetail(view) => {
            let hit = detail_back_targets(model.terminal_size, &view)
                .into_iter()
                .any(|target| rect_contains(target, col, row));
            if hit {
                (model, view.back().into())
            } else {
                (model, AppCommand::None)
            }
        }
        View::Home => (model, AppCommand::None),
    }
}

fn hit_test_list_click(
    list_area: Rect,
    selected: usize,
    total: usize,
    col: u16,
    row: u16,
) -> Option<usize> {
    if total == 0 {
        return None;
    }
    if list_area.width == 0 || list_area.height < 3 {
        return None;
    }
    if col < list_area.x || col >= list_area.x.saturating_add(list_area.width) {
        return None;
    }

    let inner_y = list_area.y.saturating_add(1);
    let inner_height = list_area.height.saturating_sub(2) as usize;
    if inner_height == 0 {
        return None;
    }
    if row < inner_y
        || row
            >= list_area
                .y
                .saturating_add(list_area.height)
                .saturating_sub(1)
    {
        return None;
    }
    let clicked_row = (row - inner_y) as usize;
    if clicked_row >= inner_height {
        return None;
    }

    let offset = list_offset(selected, inner_height, total);
    let index = offset.saturating_add(clicked_row);
    if index >= total { None } else { Some(index) }
}

fn list_offset(selected: usize, viewport_height: usize, total: usize) -> usize {
    if viewport_height == 0 || total <= viewport_height {
        return 0;
    }
    let max_offset = total.saturating_sub(viewport_height);
    let raw_offset = selected.saturating_add(1).saturating_sub(viewport_height);
    raw_offset.min(max_offset)
}

fn scroll_index(selected: usize, total: usize, direction: ScrollDirection) -> usize {
    if total == 0 {
        return 0;
    }

    match direction {
        ScrollDirection::Up => selected.saturating_sub(SCROLL_STEP),
        ScrollDirection::Down => selected
            .saturating_add(SCROLL_STEP)
            .min(total.saturating_sub(1)),
    }
}

fn usize_to_u16(value: usize) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}
