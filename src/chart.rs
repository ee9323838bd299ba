//! Bar chart of one rate series.
//!
//! [`ChartPlan`] holds the pure scaling and sizing decisions; [`RateChart`]
//! draws a plan into a ratatui buffer.

use crate::cli::{Background, DisplayUnit};
use crate::history::HistorySeries;
use crate::stats::RateSample;
use crate::units::{human_pps, human_rate, scale_label, zero_label};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Widget},
};

/// Label columns assumed before the labels are measured.
pub const DEFAULT_LABEL_WIDTH: u16 = 12;
pub const MIN_PLOT_ROWS: u16 = 3;
pub const MIN_PLOT_COLUMNS: u16 = 10;

/// Space plus `|` plus one column of margin after each label.
const LABEL_DECORATION: u16 = 3;
const MAX_LABEL_PASSES: usize = 8;

const BAR: char = '|';
const FIELD: char = '.';

/// Colours derived from the `--bg` choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Color,
    pub text: Color,
    pub border: Color,
    pub rx: Color,
    pub tx: Color,
}

impl Palette {
    pub fn new(background: Background) -> Self {
        match background {
            Background::Black => Self {
                background: Color::Black,
                text: Color::White,
                border: Color::White,
                rx: Color::Cyan,
                tx: Color::Red,
            },
            Background::Terminal => Self {
                background: Color::Reset,
                text: Color::Reset,
                border: Color::Reset,
                rx: Color::Cyan,
                tx: Color::Red,
            },
        }
    }

    pub fn text_style(&self) -> Style {
        Style::default().fg(self.text).bg(self.background)
    }

    pub fn border_style(&self) -> Style {
        Style::default().fg(self.border).bg(self.background)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Rx,
    Tx,
}

impl Direction {
    pub fn label(self) -> &'static str {
        match self {
            Self::Rx => "RX",
            Self::Tx => "TX",
        }
    }

    pub fn color(self, palette: &Palette) -> Color {
        match self {
            Self::Rx => palette.rx,
            Self::Tx => palette.tx,
        }
    }
}

/// Sizing and scaling for one chart body.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPlan {
    pub plot_height: u16,
    pub plot_width: u16,
    /// Columns reserved left of the plot, labels included.
    pub label_width: u16,
    /// Vertical scale ceiling, in display units.
    pub max_value: f64,
    pub top_label: String,
    pub mid_label: String,
    pub zero_label: &'static str,
    /// Bar heights, oldest first; the last bar sits in the rightmost column.
    pub bars: Vec<u16>,
}

impl ChartPlan {
    /// Plans a chart for the area inside a pane's border.
    ///
    /// Returns `None` when the area or the series is too small to draw.
    pub fn compute(
        series: &HistorySeries,
        link_rate_gbps: f64,
        unit: DisplayUnit,
        inner_width: u16,
        inner_height: u16,
    ) -> Option<Self> {
        let plot_height = inner_height.saturating_sub(1);
        if plot_height < MIN_PLOT_ROWS
            || inner_width.saturating_sub(DEFAULT_LABEL_WIDTH) < MIN_PLOT_COLUMNS
            || !series.is_plottable()
        {
            return None;
        }

        let zero = zero_label(unit);
        let mut label_width = label_columns(zero.len());
        let mut scaled = Scaled::measure(series, link_rate_gbps, unit, inner_width, label_width);

        // Wider labels shrink the window, which can only lower the scale, so
        // the width grows monotonically until the labels fit.
        for _ in 0..MAX_LABEL_PASSES {
            let needed = label_columns(
                scaled
                    .top_label
                    .len()
                    .max(scaled.mid_label.len())
                    .max(zero.len()),
            );
            if needed <= label_width {
                break;
            }
            label_width = needed;
            scaled = Scaled::measure(series, link_rate_gbps, unit, inner_width, label_width);
        }

        let plot_height_f = f64::from(plot_height);
        let bars = scaled
            .values
            .iter()
            .map(|value| {
                let height = (value * unit.factor() / scaled.max_value * plot_height_f).round();
                height.clamp(0.0, plot_height_f) as u16
            })
            .collect();

        Some(Self {
            plot_height,
            plot_width: plot_width(inner_width, label_width),
            label_width,
            max_value: scaled.max_value,
            top_label: scaled.top_label,
            mid_label: scaled.mid_label,
            zero_label: zero,
            bars,
        })
    }

    /// Column offset of the oldest bar from the start of the plot area.
    pub fn first_bar_offset(&self) -> u16 {
        let drawn = u16::try_from(self.bars.len()).unwrap_or(u16::MAX);
        self.plot_width.saturating_sub(drawn)
    }
}

/// Window, scale and labels for one candidate label width.
struct Scaled {
    values: Vec<f64>,
    max_value: f64,
    top_label: String,
    mid_label: String,
}

impl Scaled {
    fn measure(
        series: &HistorySeries,
        link_rate_gbps: f64,
        unit: DisplayUnit,
        inner_width: u16,
        label_width: u16,
    ) -> Self {
        let values = series.window(usize::from(plot_width(inner_width, label_width)));
        let max_value = scale_ceiling(&values, link_rate_gbps, unit);
        Self {
            top_label: scale_label(max_value, unit),
            mid_label: scale_label(max_value / 2.0, unit),
            values,
            max_value,
        }
    }
}

fn label_columns(longest: usize) -> u16 {
    u16::try_from(longest)
        .unwrap_or(u16::MAX)
        .saturating_add(LABEL_DECORATION)
}

fn plot_width(inner_width: u16, label_width: u16) -> u16 {
    inner_width.saturating_sub(label_width).max(1)
}

/// Largest displayed value, at least 1, never above the link's bit rate.
pub fn scale_ceiling(bytes_per_sec: &[f64], link_rate_gbps: f64, unit: DisplayUnit) -> f64 {
    let observed = bytes_per_sec
        .iter()
        .map(|v| v * unit.factor())
        .fold(1.0_f64, f64::max);

    if unit == DisplayUnit::Bits && link_rate_gbps > 0.0 {
        let link_bits = link_rate_gbps * 1e9;
        if link_bits < observed {
            return link_bits;
        }
    }
    observed
}

/// `" RX  100.00 Gb/s    1.20 Mpps "`, with a stale marker when needed.
pub fn pane_title(direction: Direction, rate: &RateSample, unit: DisplayUnit, stale: bool) -> String {
    let (bytes, packets) = match direction {
        Direction::Rx => (rate.rx_bytes_per_sec, rate.rx_packets_per_sec),
        Direction::Tx => (rate.tx_bytes_per_sec, rate.tx_packets_per_sec),
    };
    let marker = if stale { " [STALE]" } else { "" };
    format!(
        " {}  {}  {}{marker} ",
        direction.label(),
        human_rate(bytes, unit),
        human_pps(packets)
    )
}

/// A bordered pane with a rate chart for one direction.
pub struct RateChart<'a> {
    pub series: &'a HistorySeries,
    pub sample: RateSample,
    pub direction: Direction,
    pub link_rate_gbps: f64,
    pub unit: DisplayUnit,
    pub palette: Palette,
    pub stale: bool,
}

impl Widget for RateChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.palette.border_style())
            .style(self.palette.text_style())
            .title(pane_title(self.direction, &self.sample, self.unit, self.stale));
        let inner = block.inner(area);
        block.render(area, buf);

        let Some(plan) = ChartPlan::compute(
            self.series,
            self.link_rate_gbps,
            self.unit,
            inner.width,
            inner.height,
        ) else {
            return;
        };

        let text = self.palette.text_style();
        let label_cols = usize::from(plan.label_width - LABEL_DECORATION);
        let rows = [
            (0, plan.top_label.as_str()),
            (plan.plot_height / 2, plan.mid_label.as_str()),
            (plan.plot_height - 1, plan.zero_label),
        ];
        for (row, label) in rows {
            buf.set_stringn(
                inner.x,
                inner.y + row,
                format!("{label:>label_cols$} |"),
                usize::from(inner.width),
                text,
            );
        }

        let bar_style = Style::default()
            .fg(self.direction.color(&self.palette))
            .bg(self.palette.background);
        let base = inner.x + plan.label_width + plan.first_bar_offset();
        for (i, height) in plan.bars.iter().enumerate() {
            let x = base + i as u16;
            if x >= inner.right() {
                break;
            }
            for level in 0..plan.plot_height {
                let y = inner.y + plan.plot_height - 1 - level;
                let symbol = if level < *height { BAR } else { FIELD };
                if let Some(cell) = buf.cell_mut((x, y)) {
                    cell.set_char(symbol).set_style(bar_style);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> HistorySeries {
        let mut series = HistorySeries::new(64);
        for v in values {
            series.append(*v);
        }
        series
    }

    fn row_text(buf: &Buffer, y: u16) -> String {
        (buf.area.x..buf.area.right())
            .map(|x| buf[(x, y)].symbol().to_string())
            .collect()
    }

    #[test]
    fn test_equal_values_give_full_height_bars() {
        let s = series(&[5.0; 20]);
        let plan = ChartPlan::compute(&s, 0.0, DisplayUnit::Bytes, 60, 10).unwrap();
        assert_eq!(plan.plot_height, 9);
        assert_eq!(plan.max_value, 5.0);
        assert_eq!(plan.bars.len(), 20);
        assert!(plan.bars.iter().all(|h| *h == plan.plot_height));
    }

    #[test]
    fn test_link_rate_clamps_scale_in_bits() {
        // 150 Gb/s peak observed on a 100 Gb/s link
        let peak_bytes = 150e9 / 8.0;
        let s = series(&[1e9, peak_bytes, 2e9]);
        let plan = ChartPlan::compute(&s, 100.0, DisplayUnit::Bits, 80, 12).unwrap();
        assert_eq!(plan.max_value, 100e9);
        assert_eq!(plan.top_label, "100.00 Gb/s");
        assert_eq!(plan.mid_label, " 50.00 Gb/s");
        assert_eq!(plan.bars[1], plan.plot_height);
    }

    #[test]
    fn test_link_rate_ignored_in_bytes() {
        let s = series(&[1e9, 150e9 / 8.0]);
        assert_eq!(scale_ceiling(&s.window(10), 100.0, DisplayUnit::Bytes), 150e9 / 8.0);
        assert_eq!(scale_ceiling(&s.window(10), 0.0, DisplayUnit::Bits), 150e9);
    }

    #[test]
    fn test_scale_is_at_least_one() {
        assert_eq!(scale_ceiling(&[0.0, 0.0], 0.0, DisplayUnit::Bytes), 1.0);
        assert_eq!(scale_ceiling(&[0.01], 0.0, DisplayUnit::Bits), 1.0);
    }

    #[test]
    fn test_too_small_or_too_short_is_skipped() {
        let s = series(&[1.0, 2.0, 3.0]);
        assert!(ChartPlan::compute(&s, 0.0, DisplayUnit::Bits, 60, 3).is_none());
        assert!(ChartPlan::compute(&s, 0.0, DisplayUnit::Bits, 21, 10).is_none());
        assert!(ChartPlan::compute(&s, 0.0, DisplayUnit::Bits, 22, 10).is_some());
        assert!(ChartPlan::compute(&series(&[1.0]), 0.0, DisplayUnit::Bits, 60, 10).is_none());
    }

    #[test]
    fn test_window_is_most_recent_and_right_aligned() {
        let values: Vec<f64> = (1..=50).map(f64::from).collect();
        let s = series(&values);
        let plan = ChartPlan::compute(&s, 0.0, DisplayUnit::Bytes, 30, 8).unwrap();

        assert_eq!(usize::from(plan.plot_width), plan.bars.len());
        assert_eq!(plan.first_bar_offset(), 0);
        assert_eq!(plan.max_value, 50.0);
        assert_eq!(*plan.bars.last().unwrap(), plan.plot_height);

        let short = ChartPlan::compute(&series(&[1.0, 2.0]), 0.0, DisplayUnit::Bytes, 30, 8).unwrap();
        assert_eq!(short.first_bar_offset(), short.plot_width - 2);
    }

    #[test]
    fn test_label_width_fits_longest_label() {
        let s = series(&[1e6, 2e6]);
        let plan = ChartPlan::compute(&s, 0.0, DisplayUnit::Bits, 60, 10).unwrap();
        assert_eq!(plan.top_label, " 16.00 Mb/s");
        assert_eq!(plan.label_width, 14);
        assert_eq!(plan.plot_width, 46);
    }

    #[test]
    fn test_bars_are_monotonic_in_value() {
        let s = series(&[0.0, 10.0, 20.0, 40.0, 80.0, 100.0]);
        let plan = ChartPlan::compute(&s, 0.0, DisplayUnit::Bytes, 40, 12).unwrap();
        assert!(plan.bars.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(plan.bars[0], 0);
    }

    #[test]
    fn test_pane_title_format() {
        let rate = RateSample {
            rx_bytes_per_sec: 12_500_000_000.0,
            tx_bytes_per_sec: 0.0,
            rx_packets_per_sec: 1_200_000.0,
            tx_packets_per_sec: 0.0,
        };
        assert_eq!(
            pane_title(Direction::Rx, &rate, DisplayUnit::Bits, false),
            " RX  100.00 Gb/s    1.20 Mpps "
        );
        assert!(pane_title(Direction::Tx, &rate, DisplayUnit::Bits, true).contains("[STALE]"));
    }

    #[test]
    fn test_render_draws_labels_and_bars() {
        let s = series(&[10.0, 10.0, 10.0]);
        let area = Rect::new(0, 0, 40, 8);
        let mut buf = Buffer::empty(area);
        RateChart {
            series: &s,
            sample: RateSample::default(),
            direction: Direction::Tx,
            link_rate_gbps: 0.0,
            unit: DisplayUnit::Bytes,
            palette: Palette::new(Background::Black),
            stale: false,
        }
        .render(area, &mut buf);

        let top = row_text(&buf, 1);
        assert!(top.contains(" 10.00 B/s |"));
        assert!(top.trim_end_matches('│').ends_with("|||"));
        let bottom = row_text(&buf, 5);
        assert!(bottom.contains("0.00 B/s |"));
        assert_eq!(buf[(36, 5)].fg, Color::Red);
    }

    #[test]
    fn test_render_tiny_pane_draws_frame_only() {
        let s = series(&[1.0, 2.0, 3.0]);
        let area = Rect::new(0, 0, 12, 4);
        let mut buf = Buffer::empty(area);
        RateChart {
            series: &s,
            sample: RateSample::default(),
            direction: Direction::Rx,
            link_rate_gbps: 0.0,
            unit: DisplayUnit::Bits,
            palette: Palette::new(Background::Terminal),
            stale: false,
        }
        .render(area, &mut buf);

        assert!(!row_text(&buf, 1).contains('|'));
        assert!(!row_text(&buf, 2).contains('.'));
    }
}
