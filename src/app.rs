//! Render orchestrator.
//!
//! `App` owns the four widgets and decides when each of them draws:
//!
//! ```text
//! ┌──────────── day 1──day 2──day 3 ────────────┐  day menu (row 0)
//! ┌ forecast ──────────────┐┌ outlook ──────────┐
//! │ text discussion       ▐││ map image         │  panels
//! └────────────────────────┘└───────────────────┘
//! ──────────────── quit ────────────────────────   key menu (last row)
//! ```
//!
//! Fetches run as spawned tasks and come back as [`ContentUpdate`]s on an
//! mpsc channel. Each one is tagged with the generation of the request that
//! started it, and only the most recent generation is ever shown.

use std::io;
use std::ops::ControlFlow;
use std::sync::Arc;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::{LayoutConfig, Theme};
use crate::source::{ImageRenderer, MapDisplay, MenuEntry, OutlookSource};
use crate::ui::text::fit_to_width;
use crate::ui::{DrawLock, MenuBar, MenuBarOptions, Panel, PanelFlags, PanelOptions, Rect};

/// Forecast text shown when an outlook cannot be fetched
pub const NOT_FOUND: &str = "Not found";

/// Identifies the request a fetch result belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTag {
    pub generation: u64,
    /// Day menu index selected when the fetch started
    pub index: usize,
}

/// Result of one outlook fetch
#[derive(Debug, Clone)]
pub struct ContentUpdate {
    pub tag: FetchTag,
    /// Discussion text, or [`NOT_FOUND`]
    pub forecast: String,
    /// Map image bytes, `None` when not fetched or unavailable
    pub image: Option<Vec<u8>>,
    pub image_url: String,
}

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct AppOptions {
    pub layout: LayoutConfig,
    pub theme: Theme,
    /// How the outlook map is drawn
    pub map: MapDisplay,
}

pub struct App {
    source: Arc<dyn OutlookSource>,
    renderer: Box<dyn ImageRenderer>,
    lock: DrawLock,
    options: AppOptions,
    entries: Vec<MenuEntry>,

    // Widgets are `None` when the terminal is too small for them
    day_menu: Option<MenuBar>,
    forecast: Option<Panel>,
    outlook: Option<Panel>,
    key_menu: Option<MenuBar>,

    cols: u16,
    rows: u16,
    show_forecast: bool,
    show_outlook: bool,
    selected: usize,

    // Last applied content, reapplied after a re-layout
    forecast_text: String,
    image: Option<Vec<u8>>,
    image_url: String,

    generation: u64,
    updates: mpsc::UnboundedSender<ContentUpdate>,
}

impl App {
    /// Create the orchestrator and the receiving end of its fetch channel
    pub fn new(
        source: Arc<dyn OutlookSource>,
        renderer: Box<dyn ImageRenderer>,
        lock: DrawLock,
        entries: Vec<MenuEntry>,
        options: AppOptions,
    ) -> (Self, mpsc::UnboundedReceiver<ContentUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = Self {
            source,
            renderer,
            lock,
            options,
            entries,
            day_menu: None,
            forecast: None,
            outlook: None,
            key_menu: None,
            cols: 0,
            rows: 0,
            show_forecast: true,
            show_outlook: true,
            selected: 0,
            forecast_text: String::new(),
            image: None,
            image_url: String::new(),
            generation: 0,
            updates: tx,
        };
        (app, rx)
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[cfg(test)]
    pub fn forecast(&self) -> Option<&Panel> {
        self.forecast.as_ref()
    }

    #[cfg(test)]
    pub fn outlook(&self) -> Option<&Panel> {
        self.outlook.as_ref()
    }

    #[cfg(test)]
    pub fn key_menu(&self) -> Option<&MenuBar> {
        self.key_menu.as_ref()
    }

    /// Lay out for the initial terminal size and fetch the first outlook
    pub async fn start(&mut self, cols: u16, rows: u16) -> io::Result<()> {
        self.layout(cols, rows).await?;
        self.request_fetch();
        Ok(())
    }

    /// Main loop: terminal events and fetch results until the user quits
    pub async fn run<S>(
        &mut self,
        mut events: S,
        mut updates: mpsc::UnboundedReceiver<ContentUpdate>,
    ) -> io::Result<()>
    where
        S: Stream<Item = io::Result<Event>> + Unpin,
    {
        loop {
            tokio::select! {
                event = events.next() => match event {
                    Some(Ok(event)) => {
                        if self.handle_event(event).await?.is_break() {
                            info!("quit requested");
                            break;
                        }
                    }
                    Some(Err(e)) => return Err(e),
                    None => break,
                },
                Some(update) = updates.recv() => {
                    self.apply_update(update).await?;
                }
            }
        }
        Ok(())
    }

    pub async fn handle_event(&mut self, event: Event) -> io::Result<ControlFlow<()>> {
        match event {
            Event::Key(key) => self.handle_key(key).await,
            Event::Resize(cols, rows) => {
                self.layout(cols, rows).await?;
                Ok(ControlFlow::Continue(()))
            }
            _ => Ok(ControlFlow::Continue(())),
        }
    }

    pub async fn handle_key(&mut self, key: KeyEvent) -> io::Result<ControlFlow<()>> {
        if key.kind != KeyEventKind::Press {
            return Ok(ControlFlow::Continue(()));
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Char('c') if ctrl => return Ok(ControlFlow::Break(())),
            KeyCode::Char('q') => return Ok(ControlFlow::Break(())),
            KeyCode::Char('d') if ctrl => {
                let half = self.page_height() / 2;
                self.scroll_forecast(half).await?;
            }
            KeyCode::Char('u') if ctrl => {
                let half = self.page_height() / 2;
                self.scroll_forecast(-half).await?;
            }
            KeyCode::Down | KeyCode::Char('j') => self.scroll_forecast(1).await?,
            KeyCode::Up | KeyCode::Char('k') => self.scroll_forecast(-1).await?,
            KeyCode::Char(c @ '1'..='4') => {
                self.select_day(c as usize - '1' as usize).await?;
            }
            KeyCode::Char('f') => {
                self.show_forecast = !self.show_forecast;
                self.layout(self.cols, self.rows).await?;
            }
            KeyCode::Char('o') => {
                self.show_outlook = !self.show_outlook;
                self.layout(self.cols, self.rows).await?;
            }
            _ => {}
        }
        Ok(ControlFlow::Continue(()))
    }

    fn page_height(&self) -> i32 {
        self.forecast
            .as_ref()
            .map(|panel| panel.content_height() as i32)
            .unwrap_or(0)
    }

    async fn scroll_forecast(&mut self, delta: i32) -> io::Result<()> {
        if let Some(panel) = self.forecast.as_mut() {
            panel.move_scroll_y(delta);
            panel.draw(&self.lock).await?;
        }
        Ok(())
    }

    /// Select a day, start fetching it and redraw the day menu.
    ///
    /// Indices past the end of the menu are ignored.
    pub async fn select_day(&mut self, index: usize) -> io::Result<()> {
        if index >= self.entries.len() {
            return Ok(());
        }
        self.selected = index;
        self.request_fetch();
        if let Some(menu) = self.day_menu.as_mut() {
            menu.set_selected_index(index);
            menu.draw(&self.lock).await?;
        }
        Ok(())
    }

    /// Start fetching the selected outlook in the background
    pub fn request_fetch(&mut self) -> Option<FetchTag> {
        let id = self.entries.get(self.selected)?.id.clone();
        self.generation += 1;
        let tag = FetchTag {
            generation: self.generation,
            index: self.selected,
        };
        debug!(generation = tag.generation, %id, "fetch requested");

        let source = Arc::clone(&self.source);
        let images = self.options.map.fetches_images();
        let tx = self.updates.clone();
        tokio::spawn(async move {
            let update = fetch_content(source.as_ref(), tag, &id, images).await;
            // Closed only when the app is gone
            let _ = tx.send(update);
        });
        Some(tag)
    }

    /// Show a fetch result. Returns `false` when it was stale and dropped.
    pub async fn apply_update(&mut self, update: ContentUpdate) -> io::Result<bool> {
        if update.tag.generation != self.generation {
            debug!(
                stale = update.tag.generation,
                latest = self.generation,
                "discarding stale fetch result"
            );
            return Ok(false);
        }

        self.forecast_text = update.forecast;
        self.image = update.image;
        self.image_url = update.image_url;
        self.draw_panels().await?;
        Ok(true)
    }

    /// Rebuild every widget for a `cols` x `rows` terminal and redraw
    pub async fn layout(&mut self, cols: u16, rows: u16) -> io::Result<()> {
        self.cols = cols;
        self.rows = rows;
        debug!(cols, rows, "layout");

        {
            let mut surface = self.lock.lock().await;
            surface.clear()?;
            surface.flush()?;
        }

        self.day_menu = self.build_day_menu();
        self.key_menu = self.build_key_menu();
        let (forecast_rect, outlook_rect) = self.panel_rects();
        self.forecast = forecast_rect.and_then(|rect| self.build_forecast(rect));
        self.outlook = outlook_rect.and_then(|rect| self.build_outlook(rect));

        if let Some(menu) = self.day_menu.as_mut() {
            menu.draw(&self.lock).await?;
        }
        if let Some(menu) = self.key_menu.as_mut() {
            menu.draw(&self.lock).await?;
        }
        self.draw_panels().await
    }

    async fn draw_panels(&mut self) -> io::Result<()> {
        if let Some(panel) = self.forecast.as_mut() {
            panel.set_content(self.forecast_text.as_str());
            panel.draw(&self.lock).await?;
        }
        let content = match self.outlook.as_ref() {
            Some(panel) => self.outlook_content(panel),
            None => return Ok(()),
        };
        if let Some(panel) = self.outlook.as_mut() {
            panel.set_content(content);
            panel.draw(&self.lock).await?;
        }
        Ok(())
    }

    /// The rendered map, or a line naming its URL when it cannot be shown
    fn outlook_content(&self, panel: &Panel) -> String {
        let width = panel.content_width();
        if let Some(bytes) = &self.image {
            match self.renderer.render(bytes, width, panel.content_height()) {
                Ok(blob) => return blob,
                Err(e) => debug!(error = %e, url = %self.image_url, "map not rendered"),
            }
        }
        if self.image_url.is_empty() {
            return String::new();
        }
        let placeholder = format!("Map: {}", self.image_url);
        if self.options.map == MapDisplay::Inline {
            // Image panels write their content as-is
            fit_to_width(&placeholder, 0, width)
        } else {
            placeholder
        }
    }

    /// Forecast and outlook rectangles for the current size and visibility
    fn panel_rects(&self) -> (Option<Rect>, Option<Rect>) {
        let (cols, rows) = (self.cols, self.rows);
        let (Some(right), Some(bottom)) = (cols.checked_sub(1), rows.checked_sub(2)) else {
            return (None, None);
        };
        let split = self.options.layout.forecast_width;

        let forecast = self.show_forecast.then(|| {
            let forecast_right = if self.show_outlook {
                split.saturating_sub(1).min(right)
            } else {
                right
            };
            Rect::new(1, 0, bottom, forecast_right)
        });
        let outlook = self.show_outlook.then(|| {
            let left = if self.show_forecast { split } else { 0 };
            Rect::new(1, left, bottom, right)
        });

        let checked = |rect: Option<Result<Rect, _>>, name: &str| match rect? {
            Ok(rect) => Some(rect),
            Err(e) => {
                warn!(panel = name, error = %e, "panel does not fit");
                None
            }
        };
        (checked(forecast, "forecast"), checked(outlook, "outlook"))
    }

    fn build_forecast(&self, rect: Rect) -> Option<Panel> {
        let theme = &self.options.theme;
        let options = PanelOptions {
            title: Some(theme.title("forecast", theme.forecast_color)),
            flags: PanelFlags::OUTLINE | PanelFlags::SCROLLBAR | PanelFlags::SCROLLABLE,
            style: theme.forecast.clone(),
            ..PanelOptions::new(rect)
        };
        Panel::new(options)
            .map_err(|e| warn!(panel = "forecast", error = %e, "panel skipped"))
            .ok()
    }

    fn build_outlook(&self, rect: Rect) -> Option<Panel> {
        let theme = &self.options.theme;
        let mut flags = PanelFlags::OUTLINE;
        if self.options.map == MapDisplay::Inline {
            flags |= PanelFlags::IMAGE;
        }
        let options = PanelOptions {
            title: Some(theme.title("outlook", theme.outlook_color)),
            flags,
            style: theme.outlook.clone(),
            ..PanelOptions::new(rect)
        };
        Panel::new(options)
            .map_err(|e| warn!(panel = "outlook", error = %e, "panel skipped"))
            .ok()
    }

    fn build_day_menu(&self) -> Option<MenuBar> {
        let rect = Rect::row(0, 0, self.cols.checked_sub(1)?).ok()?;
        let items = self.entries.iter().map(|entry| entry.label.clone()).collect();
        let mut menu = MenuBar::new(MenuBarOptions {
            spacing: self.options.layout.menu_spacing,
            selectable: true,
            action_keys: ["1", "2", "3", "4"].map(String::from).to_vec(),
            style: self.options.theme.day_menu.clone(),
            ..MenuBarOptions::new(rect, items)
        });
        menu.set_selected_index(self.selected);
        Some(menu)
    }

    fn build_key_menu(&self) -> Option<MenuBar> {
        // Needs a row of its own below the day menu
        let top = self.rows.checked_sub(1).filter(|&top| top > 0)?;
        let rect = Rect::row(top, 0, self.cols.checked_sub(1)?).ok()?;
        let mut items = vec!["quit".to_string()];
        if !self.show_forecast {
            items.push("forecast".to_string());
        }
        if !self.show_outlook {
            items.push("outlook".to_string());
        }
        Some(MenuBar::new(MenuBarOptions {
            spacing: self.options.layout.menu_spacing,
            action_keys: ["q", "f", "o"].map(String::from).to_vec(),
            style: self.options.theme.key_menu.clone(),
            ..MenuBarOptions::new(rect, items)
        }))
    }
}

/// Fetch one outlook and, when wanted, its map
async fn fetch_content(
    source: &dyn OutlookSource,
    tag: FetchTag,
    id: &str,
    images: bool,
) -> ContentUpdate {
    let outlook = match source.fetch_outlook(id).await {
        Ok(outlook) => outlook,
        Err(e) => {
            warn!(%id, error = %e, "outlook fetch failed");
            return ContentUpdate {
                tag,
                forecast: NOT_FOUND.to_string(),
                image: None,
                image_url: String::new(),
            };
        }
    };

    let image = if images && !outlook.image_url.is_empty() {
        match source.fetch_image(&outlook.image_url).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(url = %outlook.image_url, error = %e, "map fetch failed");
                None
            }
        }
    } else {
        None
    };

    ContentUpdate {
        tag,
        forecast: outlook.text,
        image,
        image_url: outlook.image_url,
    }
}
