use crate::error::WeatherError;
use crate::models::{CurrentWeather, Forecast};
use crate::settings::{self, Settings};
use crate::store::WeatherStore;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, info, warn};

#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub enum ViewMode {
    #[default]
    Weather,
    AddCity,
    Settings,
}

/// Work the main loop should start on behalf of the app.
#[derive(Debug, PartialEq, Clone)]
pub enum Command {
    /// Fetch current conditions and forecast; an empty city means the
    /// current location.
    Fetch { city: String },
}

/// Rows of the settings view, in display order.
pub const SETTINGS_ROWS: usize = 3;

pub struct App {
    pub view_mode: ViewMode,
    pub store: WeatherStore,
    pub settings: Settings,

    // One page per known city
    pub cities: Vec<String>,
    pub selected_index: usize,
    pub current: Option<CurrentWeather>,
    pub forecast: Option<Forecast>,

    pub input: String,
    pub settings_selected_index: usize,
    settings_changed: bool,

    // Fetch bookkeeping
    pub in_flight: usize,
    awaiting: Option<String>,
    pub offline: bool,

    pub status: Option<String>,
    pub tick_count: usize,
    pub should_quit: bool,
}

impl App {
    /// Builds the app from whatever the cache already holds.
    pub fn new(store: WeatherStore) -> Self {
        let settings = settings::load(&store);
        let mut app = Self {
            view_mode: ViewMode::Weather,
            store,
            settings,
            cities: Vec::new(),
            selected_index: 0,
            current: None,
            forecast: None,
            input: String::new(),
            settings_selected_index: 0,
            settings_changed: false,
            in_flight: 0,
            awaiting: None,
            offline: false,
            status: None,
            tick_count: 0,
            should_quit: false,
        };
        app.reload_cities();
        app.load_page();
        app
    }

    /// First fetch after start-up: the first saved city, or the current
    /// location on a fresh install.
    pub fn initial_command(&mut self) -> Command {
        let city = self.selected_city().unwrap_or_default().to_string();
        self.request(city)
    }

    pub fn selected_city(&self) -> Option<&str> {
        self.cities.get(self.selected_index).map(String::as_str)
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    pub fn on_tick(&mut self) {
        self.tick_count = self.tick_count.wrapping_add(1);
    }

    fn request(&mut self, city: String) -> Command {
        self.in_flight += 1;
        self.awaiting = Some(city.clone());
        Command::Fetch { city }
    }

    fn reload_cities(&mut self) {
        match self.store.list_known_cities() {
            Ok(cities) => self.cities = cities,
            Err(e) => warn!("Could not list cached cities: {}", e),
        }
        if self.selected_index >= self.cities.len() {
            self.selected_index = self.cities.len().saturating_sub(1);
        }
    }

    /// Shows the cached records for the selected city.
    fn load_page(&mut self) {
        match self.selected_city().map(str::to_string) {
            Some(city) => {
                self.current = self.store.read_current(&city);
                self.forecast = self.store.read_forecast(&city);
            }
            None => {
                self.current = None;
                self.forecast = None;
            }
        }
    }

    fn select_city(&mut self, city: &str) {
        if let Some(i) = self.cities.iter().position(|c| c == city) {
            self.selected_index = i;
        }
    }

    /// Persists a finished fetch and updates the visible page.
    pub fn apply_fetch(
        &mut self,
        request: String,
        current: Result<CurrentWeather, WeatherError>,
        forecast: Result<Forecast, WeatherError>,
    ) {
        self.in_flight = self.in_flight.saturating_sub(1);
        let is_latest = self.awaiting.as_deref() == Some(request.as_str());

        let fetched_city = match &current {
            Ok(weather) => {
                if let Err(e) = self.store.persist_current(weather) {
                    warn!("Failed to cache weather for {}: {}", weather.city, e);
                }
                Some(weather.city.clone())
            }
            Err(_) => None,
        };

        // A forecast alone does not make a page; only cache it next to
        // current conditions, fresh or already stored.
        if let Ok(f) = &forecast {
            let has_page = fetched_city.as_deref() == Some(f.city.as_str())
                || self.cities.iter().any(|c| *c == f.city);
            if !has_page {
                debug!("Skipping forecast cache for {}: no current conditions", f.city);
            } else if let Err(e) = self.store.persist_forecast(f) {
                warn!("Failed to cache forecast for {}: {}", f.city, e);
            }
        }

        self.reload_cities();

        match (current, fetched_city) {
            (Ok(_), Some(city)) => {
                self.offline = false;
                if is_latest {
                    self.select_city(&city);
                    self.status = match &forecast {
                        Err(e) => Some(format!("Forecast unavailable: {}", e.user_message())),
                        Ok(_) => None,
                    };
                }
                info!("Weather for {} updated", city);
            }
            (Err(e), _) => {
                self.offline = e.is_offline();
                if is_latest {
                    self.status = Some(if self.offline {
                        "Offline - showing cached data".to_string()
                    } else {
                        e.user_message()
                    });
                }
            }
            (Ok(_), None) => {}
        }

        if is_latest {
            self.awaiting = None;
        }
        self.load_page();
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Command> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return None;
        }

        match self.view_mode {
            ViewMode::Weather => self.handle_weather_key(key),
            ViewMode::AddCity => self.handle_add_city_key(key),
            ViewMode::Settings => self.handle_settings_key(key),
        }
    }

    fn handle_weather_key(&mut self, key: KeyEvent) -> Option<Command> {
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                None
            }
            KeyCode::Right | KeyCode::Char('l') => self.switch_page(1),
            KeyCode::Left | KeyCode::Char('h') => self.switch_page(-1),
            KeyCode::Char('r') => {
                let city = self.selected_city().unwrap_or_default().to_string();
                Some(self.request(city))
            }
            KeyCode::Char('c') => {
                self.status = Some("Locating...".to_string());
                Some(self.request(String::new()))
            }
            KeyCode::Char('a') => {
                self.input.clear();
                self.view_mode = ViewMode::AddCity;
                None
            }
            KeyCode::Char('d') => {
                self.delete_selected();
                None
            }
            KeyCode::Char('s') => {
                self.settings_changed = false;
                self.view_mode = ViewMode::Settings;
                None
            }
            _ => None,
        }
    }

    fn switch_page(&mut self, step: isize) -> Option<Command> {
        if self.cities.len() < 2 {
            return None;
        }
        let len = self.cities.len() as isize;
        self.selected_index = (self.selected_index as isize + step).rem_euclid(len) as usize;
        self.status = None;
        self.load_page();
        let city = self.selected_city()?.to_string();
        Some(self.request(city))
    }

    fn delete_selected(&mut self) {
        let Some(city) = self.selected_city().map(str::to_string) else {
            return;
        };
        match self.store.delete_city(&city) {
            Ok(()) => {
                info!("Removed {}", city);
                self.status = Some(format!("Removed {}", city));
            }
            Err(e) => self.status = Some(e.user_message()),
        }
        // The next city slides into the freed slot; the last one falls back.
        self.reload_cities();
        self.load_page();
    }

    fn handle_add_city_key(&mut self, key: KeyEvent) -> Option<Command> {
        match key.code {
            KeyCode::Esc => {
                self.view_mode = ViewMode::Weather;
                None
            }
            KeyCode::Enter => {
                let city = self.input.trim().to_string();
                if city.is_empty() {
                    return None;
                }
                self.input.clear();
                self.view_mode = ViewMode::Weather;
                self.status = Some(format!("Looking up {}...", city));
                Some(self.request(city))
            }
            KeyCode::Backspace => {
                self.input.pop();
                None
            }
            KeyCode::Char(c) => {
                self.input.push(c);
                None
            }
            _ => None,
        }
    }

    fn handle_settings_key(&mut self, key: KeyEvent) -> Option<Command> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.view_mode = ViewMode::Weather;
                if std::mem::take(&mut self.settings_changed) {
                    // Cached pages were fetched with the old units/language.
                    let city = self.selected_city().unwrap_or_default().to_string();
                    return Some(self.request(city));
                }
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.settings_selected_index = (self.settings_selected_index + 1) % SETTINGS_ROWS;
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.settings_selected_index = self
                    .settings_selected_index
                    .checked_sub(1)
                    .unwrap_or(SETTINGS_ROWS - 1);
                None
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                let next = match self.settings_selected_index {
                    0 => self.settings.with_next_units(),
                    1 => self.settings.with_next_lang(),
                    _ => self.settings.with_next_step_count(),
                };
                self.save_settings(next);
                None
            }
            KeyCode::Char('x') => {
                match settings::reset(&self.store) {
                    Ok(()) => {
                        self.settings = settings::load(&self.store);
                        self.settings_changed = true;
                        self.status = Some("Settings reset to defaults".to_string());
                    }
                    Err(e) => self.status = Some(e.user_message()),
                }
                None
            }
            _ => None,
        }
    }

    fn save_settings(&mut self, next: Settings) {
        match settings::save(&self.store, next) {
            Ok(saved) => {
                self.settings = saved;
                self.settings_changed = true;
                self.status = Some("Settings saved".to_string());
            }
            Err(e) => self.status = Some(e.user_message()),
        }
    }
}
