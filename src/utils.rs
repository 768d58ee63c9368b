use std::error::Error;
use std::path::Path;

use plotters::prelude::*;

pub fn moving_average(window: usize, vector: &[f64]) -> Vec<f64> {
    let window = window.max(1);
    let mut aux: usize = 0;
    let mut result: Vec<f64> = vec![];
    while aux < vector.len() {
        let end: usize = if aux + window < vector.len() {
            aux + window
        } else {
            vector.len()
        };
        let slice: &[f64] = &vector[aux..end];
        let r: f64 = slice.iter().sum();
        result.push(r / slice.len() as f64);
        aux = end;
    }
    result
}

pub fn plot_moving_average(
    values: &[Vec<f64>],
    colors: &[&RGBColor],
    legends: &[&str],
    title: &str,
    path: &Path,
) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(path, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let len = values.iter().map(Vec::len).max().unwrap_or(0).max(1);
    let (min, max) = values
        .iter()
        .flatten()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
    let (min, max) = if min < max {
        (min, max)
    } else if min.is_finite() {
        (min - 0.5, min + 0.5)
    } else {
        (0.0, 1.0)
    };

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0..len, min..max)?;
    chart.configure_mesh().draw()?;

    for ((series, color), legend) in values.iter().zip(colors).zip(legends) {
        let color: RGBColor = **color;
        chart
            .draw_series(LineSeries::new(
                series.iter().enumerate().map(|(i, v)| (i, *v)),
                &color,
            ))?
            .label(*legend)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}
