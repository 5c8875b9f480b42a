use ratatui::style::{Color, Modifier, Style};

#[derive(Debug, Clone)]
pub struct Theme {
    pub primary: Color,
    pub secondary: Color,
    pub background: Color,
    pub foreground: Color,
    pub error: Color,
    pub success: Color,
    pub border: Color,
    pub muted: Color,
    /// Fixed palette cycled by segment index on the partition bar.
    pub partition_palette: [Color; 4],
    /// Free space always gets the same neutral color.
    pub free_segment: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary: Color::Yellow,
            secondary: Color::Cyan,
            background: Color::Reset,
            foreground: Color::White,
            error: Color::Red,
            success: Color::Green,
            border: Color::DarkGray,
            muted: Color::DarkGray,
            partition_palette: [
                Color::Rgb(0x44, 0x8e, 0xca),
                Color::Rgb(0xa5, 0xcc, 0x42),
                Color::Rgb(0xd8, 0x7e, 0x30),
                Color::Rgb(0xff, 0xbd, 0xbd),
            ],
            free_segment: Color::Rgb(0x77, 0x77, 0x77),
        }
    }
}

impl Theme {
    pub fn style(&self) -> Style {
        Style::default().fg(self.foreground).bg(self.background)
    }

    pub fn primary_style(&self) -> Style {
        Style::default().fg(self.primary)
    }

    pub fn secondary_style(&self) -> Style {
        Style::default().fg(self.secondary)
    }

    pub fn error_style(&self) -> Style {
        Style::default().fg(self.error)
    }

    pub fn border_style(&self) -> Style {
        Style::default().fg(self.border)
    }

    pub fn muted_style(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn title_style(&self) -> Style {
        Style::default()
            .fg(self.primary)
            .add_modifier(Modifier::BOLD)
    }

    pub fn segment_color(&self, index: usize, fs: &str) -> Color {
        if fs == "free" {
            self.free_segment
        } else {
            self.partition_palette[index % self.partition_palette.len()]
        }
    }
}
