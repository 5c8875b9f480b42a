use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use meridian_installer::backend::mock::{DemoGate, MockBackend};
use meridian_installer::backend::StepGate;
use meridian_installer::config::LayoutConfig;
use meridian_installer::error::{InstallerError, Result};
use meridian_installer::event::{Event, EventHandler};
use meridian_installer::partition::ManualPartPage;
use meridian_installer::ui::{self, Layout, Theme};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use std::io::stdout;
use std::panic;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "meridian-partman")]
#[command(author, version, about = "Manual partitioning page against a mock backend")]
struct Args {
    /// Path to a disk layout file (default: built-in sample layout)
    #[arg(long)]
    layout: Option<String>,

    /// Log file path (logging disabled if not specified)
    #[arg(long)]
    log_file: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(ref log_path) = args.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .ok();

        if let Some(file) = file {
            let filter =
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(file)
                .with_ansi(false)
                .init();

            info!("Starting meridian-partman");
        }
    }

    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        original_hook(panic_info);
    }));

    let mut terminal = setup_terminal()?;
    let result = run(&mut terminal, args.layout.as_deref()).await;
    restore_terminal()?;

    if let Err(ref e) = result {
        error!("partman error: {}", e);
    }

    result
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<std::io::Stdout>>> {
    enable_raw_mode().map_err(|e| InstallerError::Terminal(e.to_string()))?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .map_err(|e| InstallerError::Terminal(e.to_string()))?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).map_err(|e| InstallerError::Terminal(e.to_string()))?;
    Ok(terminal)
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode().map_err(|e| InstallerError::Terminal(e.to_string()))?;
    execute!(stdout(), LeaveAlternateScreen, DisableMouseCapture)
        .map_err(|e| InstallerError::Terminal(e.to_string()))?;
    Ok(())
}

async fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    layout_path: Option<&str>,
) -> Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut events = EventHandler::new(tick_rate);

    let config = match layout_path {
        Some(path) => LayoutConfig::load_from(path).unwrap_or_default(),
        None => LayoutConfig::load().unwrap_or_default(),
    };

    let mut backend = MockBackend::new(config.to_cache());
    let mut gate = DemoGate::new();
    let mut page = ManualPartPage::new(config.os_prober_index());
    page.update(backend.cache());
    page.refresh_selection(&backend);

    let theme = Theme::default();

    loop {
        terminal
            .draw(|frame| {
                let layout = Layout::new(frame.area());
                frame.render_widget(
                    Paragraph::new("Prepare partitions").style(theme.title_style()),
                    layout.header,
                );
                ui::widgets::draw_manual_page(frame, layout.content, &mut page, &backend, &theme);
                if !gate.allowed_change_step() {
                    frame.render_widget(
                        Paragraph::new("Applying change...").style(theme.secondary_style()),
                        layout.message,
                    );
                }
                frame.render_widget(
                    Paragraph::new("j/k select · Enter activate · drag the bar handle · q quit")
                        .style(theme.muted_style()),
                    layout.status,
                );
            })
            .map_err(|e| InstallerError::Terminal(e.to_string()))?;

        if let Some(event) = events.next().await {
            match event {
                Event::Key(key) => {
                    if key.code == crossterm::event::KeyCode::Char('q')
                        && page.dialog().is_none()
                    {
                        break;
                    }
                    page.handle_key(key, &mut backend, &mut gate);
                }
                Event::Mouse(mouse) => {
                    let _ = page.handle_mouse(mouse);
                }
                Event::Resize => {}
                Event::Tick => {}
            }
        }

        // the mock applies requests synchronously; rebuild the views
        // and reopen the gate as the host would after a request
        if backend.take_dirty() {
            gate.allow_change_step(true);
            page.update(backend.cache());
            page.refresh_selection(&backend);
        }
    }

    Ok(())
}
