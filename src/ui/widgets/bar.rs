use ratatui::prelude::*;
use ratatui::widgets::{Block, Paragraph};

use crate::partition::bar::SWATCH_OFFSET;
use crate::partition::{PartitionsBar, format_size};
use crate::ui::Theme;

/// Draw one partition bar: a proportional strip of colored segments
/// with dividers and the resize handle, and a two-line label block
/// (name, size) with a color swatch per segment underneath.
pub fn draw_partitions_bar(frame: &mut Frame, area: Rect, bar: &PartitionsBar, theme: &Theme) {
    if area.height < 1 || area.width < 2 {
        return;
    }

    let widths = bar.segment_widths(area.width);
    let mut x = area.x;
    for (idx, part) in bar.partitions().iter().enumerate() {
        let width = widths[idx];
        if width > 0 && x < area.right() {
            let segment = Rect::new(x, area.y, width.min(area.right() - x), 1);
            let color = theme.segment_color(idx, &part.fs);
            frame.render_widget(Block::default().style(Style::default().bg(color)), segment);
            if idx > 0 && x > area.x {
                // divider between adjacent segments
                let divider =
                    Paragraph::new("│").style(Style::default().fg(theme.border).bg(color));
                frame.render_widget(divider, Rect::new(x, area.y, 1, 1));
            }
        }
        x = x.saturating_add(width);
    }

    if let (Some(handle_x), Some(target)) = (bar.handle_x(area.width), bar.resize_target()) {
        let part = &bar.partitions()[target.index];
        let glyph = match (part.size > target.minsize, part.size < target.maxsize) {
            (true, true) => "↔",
            (true, false) => "◂",
            (false, true) => "▸",
            (false, false) => "│",
        };
        let column = area.x.saturating_add(handle_x);
        if column < area.right() {
            let style = Style::default()
                .fg(theme.foreground)
                .add_modifier(Modifier::BOLD);
            frame.render_widget(Paragraph::new(glyph).style(style), Rect::new(column, area.y, 1, 1));
        }
    }

    if area.height < 3 {
        return;
    }
    for (idx, (part, slot)) in bar
        .partitions()
        .iter()
        .zip(bar.label_positions())
        .enumerate()
    {
        let x = area.x.saturating_add(slot);
        if x >= area.right() {
            break;
        }
        let swatch = Paragraph::new("■").style(Style::default().fg(theme.segment_color(idx, &part.fs)));
        frame.render_widget(swatch, Rect::new(x, area.y + 1, 1, 1));

        let text_x = x.saturating_add(SWATCH_OFFSET);
        if text_x >= area.right() {
            continue;
        }
        let text_width = area.right() - text_x;
        frame.render_widget(
            Paragraph::new(part.name.as_str()).style(theme.style()),
            Rect::new(text_x, area.y + 1, text_width, 1),
        );
        frame.render_widget(
            Paragraph::new(format_size(part.size)).style(theme.muted_style()),
            Rect::new(text_x, area.y + 2, text_width, 1),
        );
    }
}
