use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::partition::auto::{AutoFocus, AutoPartPage};
use crate::ui::Theme;

use super::bar::draw_partitions_bar;

const BAR_BLOCK_HEIGHT: u16 = 3;

/// Draw the autopartitioning page: the exclusive choice list, the disk
/// selector for the active choice, the before/after preview bars, and
/// the crypto passphrase pair. Records the after-bar's rect on the page
/// so pointer events can be mapped back to it.
pub fn draw_auto_page(frame: &mut Frame, area: Rect, page: &mut AutoPartPage, theme: &Theme) {
    if area.height < 8 || area.width < 20 {
        return;
    }

    let mut y = area.y;

    for (idx, (label, _)) in page.choice_labels().enumerate() {
        if y >= area.bottom() {
            return;
        }
        let selected = idx == page.selected_index();
        let marker = if selected { "(*)" } else { "( )" };
        let style = if selected && page.focus == AutoFocus::Choices {
            theme.primary_style().add_modifier(Modifier::BOLD)
        } else if selected {
            theme.primary_style()
        } else {
            theme.style()
        };
        frame.render_widget(
            Paragraph::new(format!("{marker} {label}")).style(style),
            Rect::new(area.x + 1, y, area.width - 1, 1),
        );
        y += 1;
    }
    y += 1;

    let disks = page.current_disks();
    if !disks.is_empty() && y < area.bottom() {
        let text = disks
            .get(page.disk_index())
            .map(|disk| disk.text.as_str())
            .unwrap_or_default();
        let style = if page.focus == AutoFocus::Disks {
            theme.primary_style().add_modifier(Modifier::BOLD)
        } else {
            theme.secondary_style()
        };
        let selector = format!(
            "Disk: ◂ {text} ▸  ({}/{})",
            page.disk_index() + 1,
            disks.len()
        );
        frame.render_widget(
            Paragraph::new(selector).style(style),
            Rect::new(area.x + 1, y, area.width - 1, 1),
        );
        y += 2;

        if y + 2 * (BAR_BLOCK_HEIGHT + 1) <= area.bottom() {
            let before_area = Rect::new(area.x + 1, y + 1, area.width - 2, BAR_BLOCK_HEIGHT);
            let after_area = Rect::new(
                area.x + 1,
                y + BAR_BLOCK_HEIGHT + 2,
                area.width - 2,
                BAR_BLOCK_HEIGHT,
            );
            page.set_after_bar_area(after_area);

            frame.render_widget(
                Paragraph::new("Before:").style(theme.muted_style()),
                Rect::new(area.x + 1, y, area.width - 1, 1),
            );
            frame.render_widget(
                Paragraph::new("After:").style(theme.muted_style()),
                Rect::new(area.x + 1, y + BAR_BLOCK_HEIGHT + 1, area.width - 1, 1),
            );
            if let Some(disk) = page.current_disk() {
                draw_partitions_bar(frame, before_area, &disk.before, theme);
                draw_partitions_bar(frame, after_area, &disk.after, theme);
            }
            y += 2 * (BAR_BLOCK_HEIGHT + 1);
        }
    }

    if page.selected_kind() == Some(crate::partition::auto::AutoChoiceKind::Crypto) {
        draw_passphrase_fields(frame, area, &mut y, page, theme);
    }
}

fn draw_passphrase_fields(
    frame: &mut Frame,
    area: Rect,
    y: &mut u16,
    page: &AutoPartPage,
    theme: &Theme,
) {
    if *y + 3 > area.bottom() {
        return;
    }
    let fields = [
        ("Security key:", &page.passphrase, 0usize),
        ("Confirm key: ", &page.passphrase_confirm, 1usize),
    ];
    for (label, buffer, index) in fields {
        let focused = page.focus == AutoFocus::Passphrase(index);
        let style = if focused {
            theme.primary_style()
        } else {
            theme.muted_style()
        };
        let cursor = if focused { "_" } else { "" };
        let line = format!("{label} {}{cursor}", buffer.display('*'));
        frame.render_widget(
            Paragraph::new(line).style(style),
            Rect::new(area.x + 1, *y, area.width - 1, 1),
        );
        *y += 1;
    }
    if page.passphrase_mismatch {
        frame.render_widget(
            Paragraph::new("Passphrases do not match").style(theme.error_style()),
            Rect::new(area.x + 1, *y, area.width - 1, 1),
        );
    }
    *y += 1;
}
