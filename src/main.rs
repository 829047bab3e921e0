use color_eyre::Result;
use nimbus_tui::{
    app::{App, Command},
    config::Config,
    events::{Event, EventHandler},
    logging, ui, WeatherProvider, WeatherStore,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use tokio::sync::mpsc::UnboundedSender;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Instrumentation and safety
    let _log_guard = logging::initialize_logging();
    color_eyre::install()?;
    install_panic_hook();

    let config = Config::load();
    let store = WeatherStore::open(&config.storage.path)?;
    let provider = WeatherProvider::new(&config)?;
    info!("Using cache at {}", config.storage.path);

    // Ready terminal and state
    let mut terminal = setup_terminal()?;
    let mut app = App::new(store);
    let mut events = EventHandler::new(150);

    let first = app.initial_command();
    dispatch(first, &provider, &app, &events.tx);

    // Main loop
    while !app.should_quit {
        terminal.draw(|f| ui::render(f, &app))?;

        if let Some(event) = events.next().await {
            match event {
                Event::Tick => app.on_tick(),
                Event::Input(key) => {
                    if let Some(cmd) = app.handle_key(key) {
                        dispatch(cmd, &provider, &app, &events.tx);
                    }
                }
                Event::WeatherFetched {
                    request,
                    current,
                    forecast,
                } => app.apply_fetch(request, current, forecast),
            }
        }
    }

    restore_terminal(terminal)?;
    Ok(())
}

/// Runs a fetch in the background; the result comes back as an event and is
/// cached by the main loop.
fn dispatch(cmd: Command, provider: &WeatherProvider, app: &App, tx: &UnboundedSender<Event>) {
    match cmd {
        Command::Fetch { city } => {
            let provider = provider.clone();
            let settings = app.settings.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let (current, forecast) = tokio::join!(
                    provider.fetch_current_weather(&city, &settings),
                    provider.fetch_forecast(&city, &settings)
                );
                let _ = tx.send(Event::WeatherFetched {
                    request: city,
                    current,
                    forecast,
                });
            });
        }
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    crossterm::terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen, crossterm::cursor::Hide)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    crossterm::terminal::disable_raw_mode()?;
    crossterm::execute!(terminal.backend_mut(), crossterm::terminal::LeaveAlternateScreen, crossterm::cursor::Show)?;
    Ok(())
}

fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        // Force terminal cleanup!
        crossterm::terminal::disable_raw_mode().ok();
        crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen, crossterm::cursor::Show).ok();
        original_hook(panic_info);
    }));
}
