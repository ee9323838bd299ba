//! Header lines, raw-counter panels and the GID table.

use crate::chart::Palette;
use crate::device::{CounterGroup, CounterSource, DeviceId, GidEntry};
use crate::monitor::DeviceState;
use crate::session::{Session, ViewMode};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::Line,
    widgets::{Block, Borders, Padding, Paragraph, Widget},
};
use std::time::{Duration, Instant};
use tracing::debug;

pub const HEADER_TITLE: &str = " InfiniBand Bandwidth Monitor ";
pub const CLOCK_FORMAT: &str = "%B-%d-%Y %H:%M:%S";
pub const GID_TABLE_HEADING: &str = "Idx  Type        Ndev              GID";

/// Minimum age of a cached GID table before it is read again.
pub const GID_REFRESH: Duration = Duration::from_secs(1);

const KEY_HELP: &str = "[q:quit u:units p:pause d:data i:info]";

/// One labelled raw counter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterReading {
    pub label: &'static str,
    pub value: u64,
    pub words: bool,
}

impl CounterReading {
    /// `"port_rcv_data:    <value> (words)"`, value right-aligned in 20 columns.
    pub fn line(&self) -> String {
        let suffix = if self.words { " (words)" } else { "" };
        format!("{:<18}{:>20}{suffix}", format!("{}:", self.label), self.value)
    }
}

/// Raw counters of one device split into the RX, TX and Other panels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCounters {
    pub rx: Vec<CounterReading>,
    pub tx: Vec<CounterReading>,
    pub other: Vec<CounterReading>,
}

impl RawCounters {
    /// Base counters come from the last snapshot; optional counters are
    /// read now and omitted when unreadable.
    pub fn collect(source: &dyn CounterSource, device: &DeviceState) -> Self {
        let snapshot = device.last_snapshot();
        let handles = device.handles();
        let words = snapshot.words_mode;

        let base = |label, value, words| CounterReading {
            label,
            value,
            words,
        };
        let mut counters = Self {
            rx: vec![
                base("port_rcv_data", snapshot.rx_data, words),
                base("port_rcv_packets", snapshot.rx_packets, false),
            ],
            tx: vec![
                base("port_xmit_data", snapshot.tx_data, words),
                base("port_xmit_packets", snapshot.tx_packets, false),
            ],
            other: Vec::new(),
        };

        for (counter, handle) in &handles.optional {
            let Ok(value) = source.read_value(handle) else {
                continue;
            };
            let reading = base(counter.label(), value, false);
            match counter.group() {
                CounterGroup::Rx => counters.rx.push(reading),
                CounterGroup::Tx => counters.tx.push(reading),
                CounterGroup::Other => counters.other.push(reading),
            }
        }

        counters
    }

    /// All groups in display order, for the single grid-cell panel.
    pub fn all(&self) -> impl Iterator<Item = &CounterReading> {
        self.rx.iter().chain(&self.tx).chain(&self.other)
    }
}

fn panel_block(title: String, palette: &Palette) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(palette.border_style())
        .style(palette.text_style())
        .padding(Padding::horizontal(1))
        .title(title)
}

/// A bordered list of text lines, clipped to the pane.
pub struct TextPanel {
    pub title: String,
    pub lines: Vec<String>,
    pub palette: Palette,
}

impl TextPanel {
    pub fn counters<'a>(
        title: impl Into<String>,
        readings: impl IntoIterator<Item = &'a CounterReading>,
        palette: Palette,
    ) -> Self {
        Self {
            title: title.into(),
            lines: readings.into_iter().map(CounterReading::line).collect(),
            palette,
        }
    }

    pub fn gids(title: impl Into<String>, entries: &[GidEntry], palette: Palette) -> Self {
        let lines = std::iter::once(GID_TABLE_HEADING.to_string())
            .chain(entries.iter().map(gid_row))
            .collect();
        Self {
            title: title.into(),
            lines,
            palette,
        }
    }
}

impl Widget for TextPanel {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let style = self.palette.text_style();
        let lines: Vec<Line> = self.lines.into_iter().map(Line::from).collect();
        Paragraph::new(lines)
            .style(style)
            .block(panel_block(self.title, &self.palette))
            .render(area, buf);
    }
}

pub fn gid_row(entry: &GidEntry) -> String {
    format!(
        "{:>3}  {:<10}  {:<16}  {}",
        entry.index, entry.gid_type, entry.ndev, entry.gid
    )
}

/// GID table of one device, re-read at most once per [`GID_REFRESH`].
#[derive(Debug, Default)]
pub struct GidCache {
    entries: Vec<GidEntry>,
    fetched_at: Option<Instant>,
}

impl GidCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refresh(&mut self, source: &dyn CounterSource, device: &DeviceId, now: Instant) -> &[GidEntry] {
        let due = self
            .fetched_at
            .map_or(true, |at| now.saturating_duration_since(at) > GID_REFRESH);
        if due {
            self.entries = source.gid_table(device).unwrap_or_else(|e| {
                debug!(device = %device, error = %e, "GID table unavailable");
                Vec::new()
            });
            self.fetched_at = Some(now);
        }
        &self.entries
    }

    pub fn entries(&self) -> &[GidEntry] {
        &self.entries
    }
}

/// The bordered four-row header shown above a single device.
pub struct SingleHeader<'a> {
    pub device: &'a DeviceState,
    pub session: &'a Session,
    pub interval: Duration,
    pub clock: String,
    pub palette: Palette,
}

impl Widget for SingleHeader<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let style = self.palette.text_style();
        Block::default()
            .borders(Borders::ALL)
            .border_style(self.palette.border_style())
            .style(style)
            .title(HEADER_TITLE)
            .render(area, buf);

        let width = area.width;
        let mut put = |col: u16, row: u16, text: &str| {
            if row < area.height && col < width {
                buf.set_stringn(
                    area.x + col,
                    area.y + row,
                    text,
                    usize::from(width - col),
                    style,
                );
            }
        };

        let clock_col = width
            .saturating_sub(u16::try_from(self.clock.len()).unwrap_or(u16::MAX))
            .saturating_sub(2)
            .max(2);
        put(clock_col, 0, &self.clock);
        match self.session.view_mode {
            ViewMode::RawCounters => put(32, 0, "[DATA]"),
            ViewMode::Info => put(40, 0, "[INFO]"),
            ViewMode::Plot => {}
        }

        let id = self.device.id();
        put(2, 1, &format!("{} port {}", id.name, id.port));
        // sits on the bottom border, clear of the link columns
        put(2, 3, KEY_HELP);
        put(
            2,
            2,
            &format!(
                "Interval: {:.0} ms   Units: {}",
                self.interval.as_secs_f64() * 1000.0,
                self.session.unit.as_str()
            ),
        );
        if let Some(link_layer) = self.device.link_layer() {
            put(width / 2, 1, &format!("Link: {link_layer}"));
        }
        if let Some(rate) = self.device.link_rate() {
            put(width / 2, 2, &format!("Rate: {rate}"));
        }
        if self.session.paused {
            put(width.saturating_sub(12), 1, "[PAUSED]");
        }
    }
}

/// One-line header above the device grid.
pub fn grid_header(device_count: usize, view_mode: ViewMode, paused: bool) -> String {
    let paused = if paused { " [PAUSED]" } else { "" };
    format!(
        " ibwatch - multi-device ({device_count}) [{}] {KEY_HELP}{paused} ",
        view_mode.name()
    )
}

pub struct GridHeader {
    pub text: String,
    pub palette: Palette,
}

impl Widget for GridHeader {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let style = self.palette.text_style();
        buf.set_style(area, style);
        if area.width > 2 && area.height > 0 {
            buf.set_stringn(
                area.x + 2,
                area.y,
                &self.text,
                usize::from(area.width - 2),
                style,
            );
        }
    }
}

/// Border and name around one device cell of the grid.
pub fn device_frame(name: &str, palette: &Palette) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(palette.border_style())
        .style(palette.text_style())
        .title(format!(" {name} "))
}
