use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use encore_tui::api::ApiClient;
use encore_tui::app::{App, AppEvent};
use encore_tui::layout::FileLayoutStore;
use encore_tui::ui;

/// Log to a file under the user data directory; the terminal belongs to
/// the TUI.
fn init_tracing() -> Result<()> {
    let Some(data_dir) = dirs::data_dir() else {
        return Ok(());
    };
    let log_dir = data_dir.join("encore");
    std::fs::create_dir_all(&log_dir).context("Could not create data directory")?;

    let log_file = std::fs::File::create(log_dir.join("encore-tui.log"))
        .context("Could not create log file")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::sync::Mutex::new(log_file))
        .with_ansi(false)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("Usage: encore-tui");
        println!();
        println!("Environment:");
        println!("  ENCORE_SERVER_URL  Backend base URL (default http://localhost:3000)");
        println!();
        println!("Credentials are read from the auth file written by the platform's");
        println!("login tooling.");
        return Ok(());
    }

    // Get server URL from environment
    let server_url = std::env::var("ENCORE_SERVER_URL")
        .unwrap_or_else(|_| "http://localhost:3000".to_string());

    let mut api = ApiClient::new(&server_url);
    if !api.load_token().unwrap_or(false) {
        eprintln!("Error: no credentials found.");
        eprintln!("Log in with the Encore CLI first, then start the TUI again.");
        std::process::exit(1);
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    let app = App::new(api, Box::new(FileLayoutStore::load()));
    let res = run_app(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
) -> Result<()> {
    // Create event channel
    let (tx, mut rx) = mpsc::channel::<AppEvent>(100);

    // Spawn input handler
    let tx_input = tx.clone();
    tokio::spawn(async move {
        loop {
            if event::poll(Duration::from_millis(100)).unwrap_or(false) {
                match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                        let _ = tx_input.send(AppEvent::Key(key)).await;
                    }
                    Ok(Event::Mouse(mouse)) => {
                        let _ = tx_input.send(AppEvent::Mouse(mouse)).await;
                    }
                    _ => {}
                }
            }
            // Send tick events for UI refresh and debounce timers
            let _ = tx_input.send(AppEvent::Tick).await;
        }
    });

    app.load_projects(&tx);

    loop {
        terminal.draw(|f| ui::draw(f, &mut app))?;

        if let Some(event) = rx.recv().await {
            match event {
                AppEvent::Key(key) => {
                    if app.handle_key(key, &tx)? {
                        return Ok(());
                    }
                }
                AppEvent::Mouse(mouse) => {
                    app.handle_mouse(mouse, &tx);
                }
                AppEvent::Tick => {
                    app.on_tick(&tx);
                }
                AppEvent::ProjectsLoaded(projects) => {
                    app.on_projects_loaded(projects);
                }
                AppEvent::ProjectDataLoaded {
                    project_id,
                    tasks,
                    custom_fields,
                    members,
                } => {
                    app.on_project_data_loaded(project_id, tasks, custom_fields, members);
                }
                AppEvent::TasksRefreshed { project_id, tasks } => {
                    app.on_tasks_refreshed(project_id, tasks);
                }
                AppEvent::Error(msg) => {
                    app.set_loading(false, "");
                    app.set_error(msg);
                }
            }
        }
    }
}
