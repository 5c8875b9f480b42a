use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use meridian_installer::backend::mock::DemoGate;
use meridian_installer::backend::StepGate;
use meridian_installer::config::LayoutConfig;
use meridian_installer::error::{InstallerError, Result};
use meridian_installer::event::{Event, EventHandler};
use meridian_installer::partition::{AutoPartChoice, AutoPartPage};
use meridian_installer::ui::{self, Layout, Theme};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use std::io::stdout;
use std::panic;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "meridian-autopart")]
#[command(author, version, about = "Autopartitioning choice page against a mock backend")]
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

            info!("Starting meridian-autopart");
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
        error!("autopart error: {}", e);
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

    let mut gate = DemoGate::new();
    let mut page = AutoPartPage::new();
    page.setup_choices(
        config.auto_options(),
        &config.disk_layouts(),
        &config.choice_labels(),
        &config.release_name,
        &config.os_prober_index(),
        &mut gate,
    );

    let theme = Theme::default();
    let mut resolved: Option<AutoPartChoice> = None;

    loop {
        terminal
            .draw(|frame| {
                let layout = Layout::new(frame.area());
                frame.render_widget(
                    Paragraph::new("Installation type").style(theme.title_style()),
                    layout.header,
                );
                ui::widgets::draw_auto_page(frame, layout.content, &mut page, &theme);
                if let Some(choice) = &resolved {
                    let text = format!(
                        "choice: ({}, {}, {})",
                        choice.label,
                        choice.detail.as_deref().unwrap_or("None"),
                        choice.method
                    );
                    frame.render_widget(
                        Paragraph::new(text).style(theme.secondary_style()),
                        layout.message,
                    );
                }
                let forward = if gate.forward_allowed() {
                    "continue enabled"
                } else {
                    "continue disabled"
                };
                let status = format!(
                    "j/k choice · h/l disk · Tab focus · Enter resolve · drag the handle · q quit ({forward})"
                );
                frame.render_widget(
                    Paragraph::new(status).style(theme.muted_style()),
                    layout.status,
                );
            })
            .map_err(|e| InstallerError::Terminal(e.to_string()))?;

        if let Some(event) = events.next().await {
            match event {
                Event::Key(key) => {
                    use crossterm::event::KeyCode;
                    use meridian_installer::partition::auto::AutoFocus;
                    if key.code == KeyCode::Char('q')
                        && !matches!(page.focus, AutoFocus::Passphrase(_))
                    {
                        break;
                    }
                    if let Some(choice) = page.handle_key(key, &mut gate) {
                        info!("resolved autopartitioning choice: {choice:?}");
                        resolved = Some(choice);
                    }
                }
                Event::Mouse(mouse) => {
                    let _ = page.handle_mouse(mouse);
                }
                Event::Resize => {}
                Event::Tick => {}
            }
        }
    }

    Ok(())
}
