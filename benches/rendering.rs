use criterion::{criterion_group, criterion_main, Criterion};
use ibwatch::{
    chart::{ChartPlan, Direction, Palette, RateChart},
    cli::{Background, DisplayUnit},
    history::{HistorySeries, HISTORY_CAPACITY},
    layout,
    session::ViewMode,
    stats::RateSample,
};
use ratatui::{buffer::Buffer, layout::Rect, widgets::Widget};
use std::hint::black_box;

fn busy_series() -> HistorySeries {
    let mut series = HistorySeries::new(HISTORY_CAPACITY);
    for i in 0..HISTORY_CAPACITY {
        series.append(((i % 97) as f64) * 1.0e8);
    }
    series
}

fn benchmark_layout(c: &mut Criterion) {
    let area = Rect::new(0, 0, 240, 70);
    c.bench_function("layout_grid_16_devices", |b| {
        b.iter(|| layout::compute(black_box(area), black_box(16), ViewMode::Plot));
    });
}

fn benchmark_chart_plan(c: &mut Criterion) {
    let series = busy_series();
    c.bench_function("chart_plan_200_columns", |b| {
        b.iter(|| {
            ChartPlan::compute(
                black_box(&series),
                black_box(200.0),
                DisplayUnit::Bits,
                black_box(212),
                black_box(30),
            )
        });
    });
}

fn benchmark_chart_render(c: &mut Criterion) {
    let series = busy_series();
    let palette = Palette::new(Background::Black);
    let area = Rect::new(0, 0, 214, 32);

    c.bench_function("chart_render_full_pane", |b| {
        b.iter(|| {
            let mut buf = Buffer::empty(area);
            RateChart {
                series: &series,
                sample: RateSample::default(),
                direction: Direction::Rx,
                link_rate_gbps: 200.0,
                unit: DisplayUnit::Bits,
                palette,
                stale: false,
            }
            .render(area, &mut buf);
            black_box(buf);
        });
    });
}

criterion_group!(
    benches,
    benchmark_layout,
    benchmark_chart_plan,
    benchmark_chart_render
);
criterion_main!(benches);
