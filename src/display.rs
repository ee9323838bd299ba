use crate::{
    chart::{Direction, Palette, RateChart},
    device::CounterSource,
    input::InputEvent,
    layout::{Arrangement, LayoutCache, Panes},
    logger::RateLogger,
    monitor::{DeviceState, MonitorSet},
    panels::{
        grid_header, device_frame, GidCache, GridHeader, RawCounters, SingleHeader, TextPanel,
        CLOCK_FORMAT,
    },
    session::{Control, Session, ViewMode},
};
use anyhow::Result;
use chrono::Local;
use crossterm::{
    cursor,
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::Rect,
    widgets::Block,
    Frame, Terminal,
};
use std::io;
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy)]
pub struct DisplayOptions {
    pub interval: Duration,
    /// Stop after this long; `None` runs until quit.
    pub duration: Option<Duration>,
    pub palette: Palette,
}

/// Tick-loop state: the monitored devices plus everything only the screen
/// needs. Layout and GID caches can be dropped and rebuilt at any time
/// without touching device history.
pub struct Dashboard<'a> {
    source: &'a dyn CounterSource,
    monitors: MonitorSet,
    session: Session,
    options: DisplayOptions,
    logger: Option<RateLogger>,
    layout: LayoutCache,
    gid_caches: Vec<GidCache>,
    /// When the next sample is due; `None` samples on the next tick.
    next_sample_at: Option<Instant>,
}

impl<'a> Dashboard<'a> {
    pub fn new(
        source: &'a dyn CounterSource,
        monitors: MonitorSet,
        session: Session,
        options: DisplayOptions,
        logger: Option<RateLogger>,
    ) -> Self {
        let gid_caches = (0..monitors.len()).map(|_| GidCache::new()).collect();
        Self {
            source,
            monitors,
            session,
            options,
            logger,
            layout: LayoutCache::new(),
            gid_caches,
            next_sample_at: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn monitors(&self) -> &MonitorSet {
        &self.monitors
    }

    /// Applies at most one input event, then samples and logs if a sample
    /// is due at `now`. Input that arrives between samples only changes the
    /// session; the next sample stays one interval after the previous one.
    pub fn step(&mut self, event: Option<InputEvent>, now: Instant) -> Control {
        if let Some(event) = event {
            if self.session.apply(event) == Control::Quit {
                return Control::Quit;
            }
        }

        if self.session.fast_switch || !self.sample_due(now) {
            return Control::Continue;
        }

        // paused ticks keep the schedule too
        self.next_sample_at = Some(now + self.options.interval);
        let records = self.monitors.tick(self.source, self.session.tick_control());
        if let Some(logger) = self.logger.as_mut() {
            for record in &records {
                logger.log(record);
            }
        }
        Control::Continue
    }

    pub fn sample_due(&self, now: Instant) -> bool {
        self.next_sample_at.map_or(true, |at| now >= at)
    }

    /// Time left before the next sample is due.
    pub fn until_next_sample(&self, now: Instant) -> Duration {
        self.next_sample_at
            .map_or(Duration::ZERO, |at| at.saturating_duration_since(now))
    }

    /// One pass of the loop: input and sampling, then any pending resize,
    /// then a redraw.
    pub fn tick<B: Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        event: Option<InputEvent>,
        now: Instant,
    ) -> Result<Control> {
        if self.step(event, now) == Control::Quit {
            return Ok(Control::Quit);
        }

        if self.handle_resize() {
            terminal.autoresize()?;
            terminal.clear()?;
        }

        self.draw(terminal)?;
        Ok(Control::Continue)
    }

    /// Invalidates cached geometry when a resize was signalled.
    pub fn handle_resize(&mut self) -> bool {
        if self.session.take_resize() {
            debug!("terminal resized");
            self.layout.invalidate();
            true
        } else {
            false
        }
    }

    pub fn draw<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        terminal.draw(|frame| self.render(frame))?;
        Ok(())
    }

    fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let palette = self.options.palette;
        frame.render_widget(Block::default().style(palette.text_style()), area);

        let Self {
            source,
            monitors,
            session,
            options,
            layout,
            gid_caches,
            ..
        } = self;
        let geometry = layout.get(area, monitors.len(), session.view_mode);
        let now = Instant::now();

        if let Arrangement::Single = geometry.arrangement {
            let Some(device) = monitors.devices().first() else {
                return;
            };
            frame.render_widget(
                SingleHeader {
                    device,
                    session,
                    interval: options.interval,
                    clock: Local::now().format(CLOCK_FORMAT).to_string(),
                    palette,
                },
                geometry.header,
            );
        } else {
            frame.render_widget(
                GridHeader {
                    text: grid_header(monitors.len(), session.view_mode, session.paused),
                    palette,
                },
                geometry.header,
            );
        }

        let grid = matches!(geometry.arrangement, Arrangement::Grid { .. });
        for ((device, cell), gids) in monitors
            .devices()
            .iter()
            .zip(&geometry.devices)
            .zip(gid_caches.iter_mut())
        {
            let name = &device.id().name;
            match cell.panes {
                Panes::Plot { rx, tx } => {
                    if grid {
                        frame.render_widget(device_frame(name, &palette), cell.frame);
                    }
                    render_chart(frame, device, session, palette, Direction::Rx, rx);
                    render_chart(frame, device, session, palette, Direction::Tx, tx);
                }
                Panes::Counters { rx, tx, other } => {
                    let raw = RawCounters::collect(*source, device);
                    frame.render_widget(TextPanel::counters(" RX Raw Counters ", &raw.rx, palette), rx);
                    frame.render_widget(TextPanel::counters(" TX Raw Counters ", &raw.tx, palette), tx);
                    frame.render_widget(TextPanel::counters(" Other Counters ", &raw.other, palette), other);
                }
                Panes::Full { body } => match session.view_mode {
                    ViewMode::Info => {
                        let entries = gids.refresh(*source, device.id(), now);
                        let title = if grid {
                            format!(" {name} - GIDs ")
                        } else {
                            " GID Table (non-zero) ".to_string()
                        };
                        frame.render_widget(TextPanel::gids(title, entries, palette), body);
                    }
                    _ => {
                        let raw = RawCounters::collect(*source, device);
                        frame.render_widget(
                            TextPanel::counters(format!(" {name} - Raw Counters "), raw.all(), palette),
                            body,
                        );
                    }
                },
            }
        }
    }

    /// Runs the tick loop until quit or the configured duration elapses.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        let started = Instant::now();

        loop {
            let event = poll_event()?;
            if self.tick(terminal, event, Instant::now())? == Control::Quit {
                info!("quit requested");
                break;
            }

            let fast_switch = self.session.fast_switch;
            self.session.finish_tick();

            if let Some(limit) = self.options.duration {
                if started.elapsed() >= limit {
                    info!(elapsed = ?started.elapsed(), "run duration reached");
                    break;
                }
            }

            if !fast_switch {
                // input ends the wait early; sampling still waits for its deadline
                let remaining = self.until_next_sample(Instant::now());
                if !remaining.is_zero() {
                    let _ = event::poll(remaining)?;
                }
            }
        }

        Ok(())
    }
}

fn render_chart(
    frame: &mut Frame,
    device: &DeviceState,
    session: &Session,
    palette: Palette,
    direction: Direction,
    area: Rect,
) {
    let series = match direction {
        Direction::Rx => device.rx_history(),
        Direction::Tx => device.tx_history(),
    };
    frame.render_widget(
        RateChart {
            series,
            sample: device.last_sample(),
            direction,
            link_rate_gbps: device.link_rate_gbps(),
            unit: session.unit,
            palette,
            stale: device.is_stale(),
        },
        area,
    );
}

/// Non-blocking read of at most one terminal event.
fn poll_event() -> Result<Option<InputEvent>> {
    if event::poll(Duration::ZERO)? {
        let event: Event = event::read()?;
        Ok(Some(InputEvent::from_event(event)))
    } else {
        Ok(None)
    }
}

/// Takes over the terminal, runs the dashboard and always restores the
/// terminal before returning.
pub fn run_ui(
    source: &dyn CounterSource,
    monitors: MonitorSet,
    session: Session,
    options: DisplayOptions,
    logger: Option<RateLogger>,
) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen, cursor::Hide) {
        let _ = disable_raw_mode();
        return Err(e.into());
    }

    let result = Terminal::new(CrosstermBackend::new(io::stdout()))
        .map_err(anyhow::Error::from)
        .and_then(|mut terminal| {
            let mut dashboard = Dashboard::new(source, monitors, session, options, logger);
            dashboard.run(&mut terminal)
        });

    let _ = disable_raw_mode();
    let _ = execute!(stdout, LeaveAlternateScreen, cursor::Show);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Background, DisplayUnit};
    use crate::device::fake::FakeSource;
    use crate::device::DeviceId;
    use ratatui::backend::TestBackend;

    fn options() -> DisplayOptions {
        DisplayOptions {
            interval: Duration::from_millis(100),
            duration: None,
            palette: Palette::new(Background::Black),
        }
    }

    fn dashboard<'a>(source: &'a FakeSource, names: &[&str]) -> Dashboard<'a> {
        let ids = names.iter().map(|n| DeviceId::new(*n, 1)).collect();
        let monitors = MonitorSet::open(source, ids, 5).unwrap();
        Dashboard::new(source, monitors, Session::new(DisplayUnit::Bits), options(), None)
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    fn at(start: Instant, ticks: u32) -> Instant {
        start + options().interval * ticks
    }

    fn history_len(dash: &Dashboard) -> usize {
        dash.monitors().devices()[0].rx_history().len()
    }

    #[test]
    fn test_step_samples_and_pause_suppresses() {
        let source = FakeSource::new().with_device("mlx5_0", None);
        let mut dash = dashboard(&source, &["mlx5_0"]);
        let t0 = Instant::now();

        assert_eq!(dash.step(None, t0), Control::Continue);
        assert_eq!(history_len(&dash), 1);

        dash.step(Some(InputEvent::TogglePause), at(t0, 1));
        dash.step(None, at(t0, 2));
        assert_eq!(history_len(&dash), 1);

        dash.step(Some(InputEvent::TogglePause), at(t0, 3));
        assert_eq!(history_len(&dash), 2);
    }

    #[test]
    fn test_input_between_samples_does_not_sample() {
        let source = FakeSource::new().with_device("mlx5_0", None);
        let mut dash = dashboard(&source, &["mlx5_0"]);
        let t0 = Instant::now();
        let interval = options().interval;

        dash.step(None, t0);
        assert_eq!(history_len(&dash), 1);
        assert_eq!(dash.until_next_sample(t0), interval);

        let early = t0 + interval / 4;
        for event in [InputEvent::Unknown, InputEvent::ToggleUnits, InputEvent::Unknown] {
            dash.step(Some(event), early);
        }
        assert_eq!(history_len(&dash), 1);
        assert_eq!(dash.session().unit, DisplayUnit::Bytes);
        assert!(!dash.sample_due(early));
        assert_eq!(dash.until_next_sample(early), interval - interval / 4);

        dash.step(None, at(t0, 1));
        assert_eq!(history_len(&dash), 2);
    }

    #[test]
    fn test_paused_ticks_keep_schedule() {
        let source = FakeSource::new().with_device("mlx5_0", None);
        let mut dash = dashboard(&source, &["mlx5_0"]);
        let t0 = Instant::now();

        dash.step(Some(InputEvent::TogglePause), t0);
        assert_eq!(history_len(&dash), 0);
        assert_eq!(dash.until_next_sample(t0), options().interval);
    }

    #[test]
    fn test_view_switch_skips_one_sample() {
        let source = FakeSource::new().with_device("mlx5_0", None);
        let mut dash = dashboard(&source, &["mlx5_0"]);
        let t0 = Instant::now();

        dash.step(Some(InputEvent::ToggleRawCounters), t0);
        assert_eq!(history_len(&dash), 0);
        dash.session.finish_tick();

        dash.step(None, t0);
        assert_eq!(history_len(&dash), 1);
    }

    #[test]
    fn test_quit_stops_before_sampling() {
        let source = FakeSource::new().with_device("mlx5_0", None);
        let mut dash = dashboard(&source, &["mlx5_0"]);
        assert_eq!(dash.step(Some(InputEvent::Quit), Instant::now()), Control::Quit);
        assert_eq!(history_len(&dash), 0);
    }

    #[test]
    fn test_resize_invalidates_layout() {
        let source = FakeSource::new().with_device("mlx5_0", None);
        let mut dash = dashboard(&source, &["mlx5_0"]);
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        dash.draw(&mut terminal).unwrap();
        assert!(dash.layout.is_valid());

        dash.step(Some(InputEvent::Resize), Instant::now());
        assert!(dash.handle_resize());
        assert!(!dash.layout.is_valid());
        assert!(!dash.handle_resize());
        assert_eq!(history_len(&dash), 1);
    }

    #[test]
    fn test_resize_handled_before_same_tick_draw() {
        let source = FakeSource::new().with_device("mlx5_0", None);
        let mut dash = dashboard(&source, &["mlx5_0"]);
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        let t0 = Instant::now();
        dash.tick(&mut terminal, None, t0).unwrap();

        terminal.backend_mut().resize(100, 30);
        let control = dash
            .tick(&mut terminal, Some(InputEvent::Resize), at(t0, 1))
            .unwrap();

        assert_eq!(control, Control::Continue);
        assert!(!dash.session().resize_pending);
        assert!(dash.layout.is_valid());
        assert_eq!(terminal.get_frame().area(), Rect::new(0, 0, 100, 30));
        assert!(screen_text(&terminal).lines().all(|line| line.chars().count() == 100));
    }

    #[test]
    fn test_single_device_plot_screen() {
        let source = FakeSource::new().with_device("mlx5_0", Some("100 Gb/sec (4X EDR)"));
        let mut dash = dashboard(&source, &["mlx5_0"]);
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        dash.step(None, Instant::now());
        dash.draw(&mut terminal).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("InfiniBand Bandwidth Monitor"));
        assert!(text.contains("mlx5_0 port 1"));
        assert!(text.contains("Rate: 100 Gb/sec (4X EDR)"));
        assert!(text.contains(" RX "));
        assert!(text.contains(" TX "));
    }

    #[test]
    fn test_raw_counter_and_info_views() {
        let source = FakeSource::new().with_device("mlx5_0", None);
        source.set("mlx5_0", "port_xmit_packets", 77);
        let mut dash = dashboard(&source, &["mlx5_0"]);
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();

        dash.step(Some(InputEvent::ToggleRawCounters), Instant::now());
        dash.draw(&mut terminal).unwrap();
        let text = screen_text(&terminal);
        assert!(text.contains("RX Raw Counters"));
        assert!(text.contains("Other Counters"));
        assert!(text.contains("[DATA]"));
        assert!(text.contains(&format!("port_xmit_packets:{:>20}", 77)));

        dash.step(Some(InputEvent::ToggleInfo), Instant::now());
        dash.draw(&mut terminal).unwrap();
        let text = screen_text(&terminal);
        assert!(text.contains("GID Table (non-zero)"));
        assert!(text.contains("IB/RoCE v1"));
    }

    #[test]
    fn test_grid_screen_names_every_device() {
        let source = FakeSource::new()
            .with_device("mlx5_0", None)
            .with_device("mlx5_1", None)
            .with_device("mlx5_2", None);
        let mut dash = dashboard(&source, &["mlx5_0", "mlx5_1", "mlx5_2"]);
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        dash.step(Some(InputEvent::TogglePause), Instant::now());
        dash.draw(&mut terminal).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("multi-device (3) [PLOT]"));
        assert!(text.contains("[PAUSED]"));
        for name in ["mlx5_0", "mlx5_1", "mlx5_2"] {
            assert!(text.contains(&format!(" {name} ")));
        }

        dash.step(Some(InputEvent::ToggleRawCounters), Instant::now());
        dash.draw(&mut terminal).unwrap();
        assert!(screen_text(&terminal).contains("mlx5_2 - Raw Counters"));
    }

    #[test]
    fn test_tiny_terminal_renders() {
        let source = FakeSource::new()
            .with_device("mlx5_0", None)
            .with_device("mlx5_1", None);
        let mut dash = dashboard(&source, &["mlx5_0", "mlx5_1"]);
        let t0 = Instant::now();
        for (i, (w, h)) in [(1, 1), (10, 4), (30, 7)].into_iter().enumerate() {
            let mut terminal = Terminal::new(TestBackend::new(w, h)).unwrap();
            dash.tick(&mut terminal, None, at(t0, i as u32)).unwrap();
        }
    }
}
