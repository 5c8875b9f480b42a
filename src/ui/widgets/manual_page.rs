use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::backend::{PartAction, PartitionKind, PartitionOps, PartitionPlace};
use crate::partition::manual::{CreateDialog, DialogField, EditDialog, ManualPartPage, PartDialog};
use crate::partition::tree::CheckState;
use crate::ui::{Layout, Theme};

use super::bar::draw_partitions_bar;

const BAR_BLOCK_HEIGHT: u16 = 4;

/// Draw the manual-partitioning page: the tree table, the selected
/// disk's partition bar, and the action hints; a create/edit dialog
/// renders on top when open.
pub fn draw_manual_page(
    frame: &mut Frame,
    area: Rect,
    page: &mut ManualPartPage,
    ops: &dyn PartitionOps,
    theme: &Theme,
) {
    if area.height < 8 || area.width < 40 {
        return;
    }

    let chunks = ratatui::layout::Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(6),
            Constraint::Length(BAR_BLOCK_HEIGHT),
            Constraint::Length(1),
        ])
        .split(area);

    draw_tree_table(frame, chunks[0], page, ops, theme);

    let bar_area = Rect::new(
        chunks[1].x,
        chunks[1].y + 1,
        chunks[1].width,
        chunks[1].height - 1,
    );
    page.set_bar_area(bar_area);
    if let Some(bar) = page.active_bar() {
        draw_partitions_bar(frame, bar_area, bar, theme);
    }

    draw_action_hints(frame, chunks[2], page, theme);

    if page.dialog().is_some() {
        draw_dialog(frame, area, page, theme);
    }
}

fn draw_tree_table(
    frame: &mut Frame,
    area: Rect,
    page: &ManualPartPage,
    ops: &dyn PartitionOps,
    theme: &Theme,
) {
    let headers = page.tree().headers();
    let header = format_columns(
        headers[0],
        headers[1],
        headers[2],
        headers[3],
        headers[4],
        headers[5],
    );
    frame.render_widget(
        Paragraph::new(header).style(theme.title_style()),
        Rect::new(area.x, area.y, area.width, 1),
    );

    let visible = area.height.saturating_sub(1) as usize;
    if visible == 0 {
        return;
    }
    let offset = page.selected().saturating_sub(visible.saturating_sub(1));

    for (line, (idx, row)) in page
        .tree()
        .rows()
        .iter()
        .enumerate()
        .skip(offset)
        .take(visible)
        .enumerate()
    {
        let format_cell = match row.format_column() {
            CheckState::Hidden => "",
            CheckState::Unchecked => "[ ]",
            CheckState::Checked => "[x]",
        };
        let text = format_columns(
            &row.name_column(),
            &row.type_column(),
            &row.mountpoint_column(ops),
            format_cell,
            &row.size_column(),
            &row.used_column(),
        );
        let style = if idx == page.selected() {
            theme.style().add_modifier(Modifier::REVERSED)
        } else {
            theme.style()
        };
        frame.render_widget(
            Paragraph::new(text).style(style),
            Rect::new(area.x, area.y + 1 + line as u16, area.width, 1),
        );
    }
}

fn format_columns(
    name: &str,
    kind: &str,
    mountpoint: &str,
    format: &str,
    size: &str,
    used: &str,
) -> String {
    format!(
        "{name:<26.26} {kind:<10.10} {mountpoint:<12.12} {format:<7.7} {size:>10.10} {used:>10.10}"
    )
}

fn draw_action_hints(frame: &mut Frame, area: Rect, page: &ManualPartPage, theme: &Theme) {
    let hints = [
        ("[t] new table", page.action_enabled(PartAction::NewLabel)),
        ("[n] new", page.action_enabled(PartAction::New)),
        ("[e] edit", page.action_enabled(PartAction::Edit)),
        ("[d] delete", page.action_enabled(PartAction::Delete)),
        ("[f] format", true),
        ("[u] undo", page.undo_enabled()),
    ];
    let mut spans = Vec::new();
    for (text, enabled) in hints {
        let style = if enabled {
            theme.secondary_style()
        } else {
            theme.muted_style()
        };
        spans.push(Span::styled(text, style));
        spans.push(Span::raw("  "));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_dialog(frame: &mut Frame, area: Rect, page: &ManualPartPage, theme: &Theme) {
    let dialog_area = Layout::centered_box(area, 52, 12);
    frame.render_widget(Clear, dialog_area);

    let (title, lines) = match page.dialog() {
        Some(PartDialog::Create(dialog)) => (" Create partition ", create_lines(dialog, theme)),
        Some(PartDialog::Edit(dialog)) => (" Edit partition ", edit_lines(dialog, theme)),
        None => return,
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border_style())
        .title(title)
        .title_style(theme.title_style());
    frame.render_widget(block, dialog_area);

    let inner = dialog_area.inner(Margin::new(2, 1));
    let mut y = inner.y;
    for line in lines {
        if y >= inner.bottom() {
            break;
        }
        frame.render_widget(Paragraph::new(line), Rect::new(inner.x, y, inner.width, 1));
        y += 1;
    }

    let hint = Line::from(Span::styled(
        "Enter apply · Esc cancel · Tab next field",
        theme.muted_style(),
    ));
    let hint_y = dialog_area.bottom().saturating_sub(2);
    frame.render_widget(
        Paragraph::new(hint),
        Rect::new(inner.x, hint_y, inner.width, 1),
    );
}

fn radio(selected: bool) -> &'static str {
    if selected { "(•)" } else { "( )" }
}

fn field_style(theme: &Theme, focused: bool, enabled: bool) -> Style {
    if !enabled {
        theme.muted_style()
    } else if focused {
        theme.primary_style().add_modifier(Modifier::BOLD)
    } else {
        theme.style()
    }
}

fn create_lines<'a>(dialog: &'a CreateDialog, theme: &Theme) -> Vec<Line<'a>> {
    let mut lines = Vec::new();

    lines.push(size_line(
        dialog.size_mb.content(),
        format!("(up to {} MB)", dialog.max_size_mb),
        dialog.focus == DialogField::Size,
        theme,
    ));

    if dialog.show_kind {
        let primary = dialog.kind == PartitionKind::Primary;
        lines.push(Line::from(Span::styled(
            format!(
                "Type:        {} Primary  {} Logical",
                radio(primary),
                radio(!primary)
            ),
            field_style(theme, dialog.focus == DialogField::Kind, true),
        )));
    }

    let beginning = dialog.place == PartitionPlace::Beginning;
    lines.push(Line::from(Span::styled(
        format!(
            "Location:    {} Beginning  {} End",
            radio(beginning),
            radio(!beginning)
        ),
        field_style(theme, dialog.focus == DialogField::Place, true),
    )));

    let method = dialog
        .methods
        .get(dialog.method_index)
        .map(|m| m.description.as_str())
        .unwrap_or("-");
    lines.push(Line::from(Span::styled(
        format!("Use as:      ◂ {method} ▸"),
        field_style(theme, dialog.focus == DialogField::Method, true),
    )));

    let mountpoint = dialog
        .mountpoints
        .get(dialog.mount_index)
        .map(String::as_str)
        .unwrap_or("-");
    lines.push(Line::from(Span::styled(
        format!("Mount point: ◂ {mountpoint} ▸"),
        field_style(
            theme,
            dialog.focus == DialogField::Mountpoint,
            dialog.mount_enabled,
        ),
    )));

    lines
}

fn edit_lines<'a>(dialog: &'a EditDialog, theme: &Theme) -> Vec<Line<'a>> {
    let mut lines = Vec::new();

    if dialog.show_size {
        lines.push(size_line(
            dialog.size_mb.content(),
            format!("({}-{} MB)", dialog.min_size_mb, dialog.max_size_mb),
            dialog.focus == DialogField::Size,
            theme,
        ));
    }

    let method = dialog
        .methods
        .get(dialog.method_index)
        .map(|m| m.description.as_str())
        .unwrap_or("-");
    lines.push(Line::from(Span::styled(
        format!("Use as:      ◂ {method} ▸"),
        field_style(theme, dialog.focus == DialogField::Method, true),
    )));

    if dialog.show_format {
        let checkbox = if dialog.format { "[x]" } else { "[ ]" };
        lines.push(Line::from(Span::styled(
            format!("Format?:     {checkbox}"),
            field_style(
                theme,
                dialog.focus == DialogField::Format,
                dialog.format_enabled,
            ),
        )));
    }

    let mountpoint = dialog
        .mountpoints
        .get(dialog.mount_index)
        .map(String::as_str)
        .unwrap_or("-");
    lines.push(Line::from(Span::styled(
        format!("Mount point: ◂ {mountpoint} ▸"),
        field_style(
            theme,
            dialog.focus == DialogField::Mountpoint,
            dialog.mount_enabled,
        ),
    )));

    lines
}

fn size_line(content: &str, bounds: String, focused: bool, theme: &Theme) -> Line<'static> {
    let cursor = if focused { "_" } else { "" };
    Line::from(vec![
        Span::styled(
            format!("Size (MB):   {content}{cursor} "),
            field_style(theme, focused, true),
        ),
        Span::styled(bounds, theme.muted_style()),
    ])
}
