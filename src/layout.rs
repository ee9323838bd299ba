//! Screen geometry for the single-device and grid arrangements.
//!
//! All arithmetic saturates and every rectangle is clipped to the terminal
//! area, so undersized terminals yield empty rectangles rather than panics.

use crate::session::ViewMode;
use ratatui::layout::{Margin, Rect};
use tracing::debug;

/// Header rows above a single device.
pub const SINGLE_HEADER_HEIGHT: u16 = 4;
/// Header rows above the device grid.
pub const GRID_HEADER_HEIGHT: u16 = 1;
pub const MIN_CELL_HEIGHT: u16 = 6;
pub const MIN_CELL_WIDTH: u16 = 20;

const MIN_PLOT_BODY: u16 = 6;
const MIN_COUNTERS_BODY: u16 = 9;
const MIN_CELL_INNER: u16 = 4;

/// Drawing surfaces inside one device region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panes {
    Plot { rx: Rect, tx: Rect },
    Counters { rx: Rect, tx: Rect, other: Rect },
    Full { body: Rect },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceGeometry {
    /// Whole region owned by the device.
    pub frame: Rect,
    pub panes: Panes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrangement {
    Single,
    Grid { columns: u16, rows: u16 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Geometry {
    pub header: Rect,
    pub arrangement: Arrangement,
    pub devices: Vec<DeviceGeometry>,
}

/// Computes the full screen geometry.
pub fn compute(area: Rect, device_count: usize, view: ViewMode) -> Geometry {
    if device_count <= 1 {
        let mut geometry = single(area, view);
        if device_count == 0 {
            geometry.devices.clear();
        }
        geometry
    } else {
        grid(area, device_count, view)
    }
}

/// A horizontal band of `area`, clipped to it.
fn band(area: Rect, offset: u16, height: u16) -> Rect {
    Rect::new(area.x, area.y.saturating_add(offset), area.width, height).intersection(area)
}

fn single(area: Rect, view: ViewMode) -> Geometry {
    let header = band(area, 0, SINGLE_HEADER_HEIGHT);
    let top = SINGLE_HEADER_HEIGHT;
    let available = area.height.saturating_sub(top);

    let (body_height, panes) = match view {
        ViewMode::Plot => {
            let remaining = available.max(MIN_PLOT_BODY);
            let rx_h = remaining / 2;
            let tx_h = remaining - rx_h;
            let panes = Panes::Plot {
                rx: band(area, top, rx_h),
                tx: band(area, top.saturating_add(rx_h), tx_h),
            };
            (remaining, panes)
        }
        ViewMode::RawCounters => {
            let remaining = available.max(MIN_COUNTERS_BODY);
            let each = remaining / 3;
            let other_h = remaining - 2 * each;
            let panes = Panes::Counters {
                rx: band(area, top, each),
                tx: band(area, top.saturating_add(each), each),
                other: band(area, top.saturating_add(2 * each), other_h),
            };
            (remaining, panes)
        }
        ViewMode::Info => {
            let remaining = available.max(MIN_PLOT_BODY);
            (
                remaining,
                Panes::Full {
                    body: band(area, top, remaining),
                },
            )
        }
    };

    Geometry {
        header,
        arrangement: Arrangement::Single,
        devices: vec![DeviceGeometry {
            frame: band(area, top, body_height),
            panes,
        }],
    }
}

/// Smallest `c` with `c * c >= n`.
fn grid_columns(n: usize) -> usize {
    let mut columns = (n as f64).sqrt().ceil() as usize;
    while columns * columns < n {
        columns += 1;
    }
    columns.max(1)
}

fn grid(area: Rect, device_count: usize, view: ViewMode) -> Geometry {
    let columns = grid_columns(device_count);
    let rows = device_count.div_ceil(columns);
    let columns_u16 = u16::try_from(columns).unwrap_or(u16::MAX);
    let rows_u16 = u16::try_from(rows).unwrap_or(u16::MAX);

    let header = band(area, 0, GRID_HEADER_HEIGHT);
    let cell_h = (area.height.saturating_sub(GRID_HEADER_HEIGHT) / rows_u16).max(MIN_CELL_HEIGHT);
    let cell_w = (area.width / columns_u16).max(MIN_CELL_WIDTH);

    let devices = (0..device_count)
        .map(|i| {
            let r = u16::try_from(i / columns).unwrap_or(u16::MAX);
            let c = u16::try_from(i % columns).unwrap_or(u16::MAX);

            let y = GRID_HEADER_HEIGHT.saturating_add(r.saturating_mul(cell_h));
            let x = c.saturating_mul(cell_w);
            // the last row and column absorb the remainder
            let h = if r + 1 == rows_u16 {
                area.height.saturating_sub(y)
            } else {
                cell_h
            };
            let w = if c + 1 == columns_u16 {
                area.width.saturating_sub(x)
            } else {
                cell_w
            };

            let frame = Rect::new(
                area.x.saturating_add(x),
                area.y.saturating_add(y),
                w,
                h,
            )
            .intersection(area);

            DeviceGeometry {
                frame,
                panes: cell_panes(frame, view),
            }
        })
        .collect();

    Geometry {
        header,
        arrangement: Arrangement::Grid {
            columns: columns_u16,
            rows: rows_u16,
        },
        devices,
    }
}

/// Splits a bordered grid cell into stacked RX/TX panes.
fn cell_panes(frame: Rect, view: ViewMode) -> Panes {
    if view != ViewMode::Plot {
        return Panes::Full { body: frame };
    }

    let inner = frame.inner(Margin::new(1, 1));
    let inner_h = frame.height.saturating_sub(2).max(MIN_CELL_INNER);
    let rx_h = inner_h / 2;
    let tx_h = inner_h - rx_h;

    Panes::Plot {
        rx: band(inner, 0, rx_h),
        tx: band(inner, rx_h, tx_h),
    }
}

/// Keeps the last geometry until the terminal size, device count or view
/// changes, or a resize notification invalidates it.
#[derive(Debug, Default)]
pub struct LayoutCache {
    key: Option<(Rect, usize, ViewMode)>,
    geometry: Option<Geometry>,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidate(&mut self) {
        self.key = None;
    }

    pub fn is_valid(&self) -> bool {
        self.key.is_some()
    }

    pub fn get(&mut self, area: Rect, device_count: usize, view: ViewMode) -> &Geometry {
        let key = (area, device_count, view);
        if self.key != Some(key) {
            debug!(
                width = area.width,
                height = area.height,
                device_count,
                view = view.name(),
                "recomputing layout"
            );
            self.geometry = Some(compute(area, device_count, view));
            self.key = Some(key);
        }
        self.geometry
            .get_or_insert_with(|| compute(area, device_count, view))
    }
}
