use crate::aggregate::ChartData;
use crate::chart::{ChartKind, ChartSpec};
use crate::palette::{parse_color, ColorPalette};
use crate::{OutputFormat, RenderOptions};
use anyhow::{Context, Result};
use image::ImageEncoder;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::ops::Range;

const DEFAULT_BAR_COLOR: RGBColor = RGBColor(31, 119, 180);

/// Drawing surface for one chart
pub struct Canvas<'a> {
    options: &'a RenderOptions,
    title: &'a str,
    x_desc: String,
    y_desc: String,
}

impl<'a> Canvas<'a> {
    pub fn new(options: &'a RenderOptions, spec: &'a ChartSpec) -> Self {
        Self {
            options,
            title: &spec.title,
            x_desc: spec.key.name().to_string(),
            y_desc: spec.measure.name().to_string(),
        }
    }

    /// Draw the data and encode it in the configured format
    pub fn render(&self, kind: ChartKind, data: &ChartData) -> Result<Vec<u8>> {
        let (width, height) = (self.options.width, self.options.height);
        match self.options.format {
            OutputFormat::Png => {
                let mut buffer = vec![0u8; width as usize * height as usize * 3];
                {
                    let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
                    self.draw(&root, kind, data)?;
                    root.present().context("Failed to present drawing")?;
                }
                encode_png(&buffer, width, height)
            }
            OutputFormat::Svg => {
                let mut svg = String::new();
                {
                    let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
                    self.draw(&root, kind, data)?;
                    root.present().context("Failed to present drawing")?;
                }
                Ok(svg.into_bytes())
            }
        }
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>, kind: ChartKind, data: &ChartData) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        root.fill(&WHITE).context("Failed to fill background")?;

        match (kind, data) {
            (ChartKind::Bar, ChartData::Categories(pairs)) => self.draw_bars(root, pairs),
            (ChartKind::HorizontalBar, ChartData::Categories(pairs)) => self.draw_horizontal_bars(root, pairs),
            (ChartKind::Pie, ChartData::Categories(pairs)) => self.draw_pie(root, pairs),
            (ChartKind::Scatter, ChartData::Points(points)) => self.draw_scatter(root, points),
            (ChartKind::Line, ChartData::Series { x_labels, series }) => self.draw_lines(root, x_labels, series),
            (ChartKind::Line, ChartData::Categories(pairs)) => {
                let x_labels: Vec<String> = pairs.iter().map(|(l, _)| l.clone()).collect();
                let series = vec![(self.y_desc.clone(), pairs.iter().map(|(_, v)| Some(*v)).collect())];
                self.draw_lines(root, &x_labels, &series)
            }
            (kind, _) => anyhow::bail!("{} chart cannot be drawn from this data shape", kind),
        }
    }

    fn font(&self, size: u32) -> FontDesc<'_> {
        (self.options.font_family.as_str(), size).into_font()
    }

    fn bar_color(&self) -> RGBColor {
        self.options
            .bar_color
            .as_deref()
            .and_then(parse_color)
            .unwrap_or(DEFAULT_BAR_COLOR)
    }

    /// Vertical bars, one per category
    fn draw_bars<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>, pairs: &[(String, f64)]) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        if pairs.is_empty() {
            anyhow::bail!("Cannot create bar chart with no data");
        }
        let n = pairs.len() as i32;
        let values: Vec<f64> = pairs.iter().map(|(_, v)| *v).collect();

        let mut chart = ChartBuilder::on(root)
            .margin(10)
            .caption(self.title, self.font(20))
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d((0..n).into_segmented(), value_range(&values))
            .context("Failed to build chart")?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(pairs.len() + 1)
            .x_label_style(self.font(12))
            .x_label_formatter(&|x| match x {
                SegmentValue::CenterOf(idx) => pairs
                    .get(*idx as usize)
                    .map(|(label, _)| label.clone())
                    .unwrap_or_default(),
                _ => String::new(),
            })
            .x_desc(self.x_desc.as_str())
            .y_desc(self.y_desc.as_str())
            .draw()
            .context("Failed to draw mesh")?;

        let color = self.bar_color();
        chart
            .draw_series(values.iter().enumerate().map(|(idx, &v)| {
                let idx = idx as i32;
                let mut bar = Rectangle::new(
                    [(SegmentValue::Exact(idx), 0.0), (SegmentValue::Exact(idx + 1), v)],
                    color.filled(),
                );
                bar.set_margin(0, 0, 6, 6);
                bar
            }))
            .context("Failed to draw bars")?;

        Ok(())
    }

    /// Horizontal bars, first category at the top
    fn draw_horizontal_bars<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        pairs: &[(String, f64)],
    ) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        if pairs.is_empty() {
            anyhow::bail!("Cannot create bar chart with no data");
        }
        let n = pairs.len() as i32;
        let values: Vec<f64> = pairs.iter().map(|(_, v)| *v).collect();
        let row_of = |idx: i32| n - 1 - idx;

        let mut chart = ChartBuilder::on(root)
            .margin(10)
            .caption(self.title, self.font(20))
            .x_label_area_size(40)
            .y_label_area_size(140)
            .build_cartesian_2d(value_range(&values), (0..n).into_segmented())
            .context("Failed to build chart")?;

        chart
            .configure_mesh()
            .disable_y_mesh()
            .y_labels(pairs.len() + 1)
            .y_label_style(self.font(12))
            .y_label_formatter(&|y| match y {
                SegmentValue::CenterOf(row) => pairs
                    .get(row_of(*row) as usize)
                    .map(|(label, _)| label.clone())
                    .unwrap_or_default(),
                _ => String::new(),
            })
            .x_desc(self.y_desc.as_str())
            .draw()
            .context("Failed to draw mesh")?;

        let color = self.bar_color();
        chart
            .draw_series(values.iter().enumerate().map(|(idx, &v)| {
                let row = row_of(idx as i32);
                let mut bar = Rectangle::new(
                    [(0.0, SegmentValue::Exact(row)), (v, SegmentValue::Exact(row + 1))],
                    color.filled(),
                );
                bar.set_margin(4, 4, 0, 0);
                bar
            }))
            .context("Failed to draw bars")?;

        Ok(())
    }

    /// Pie with percentage labels; non-positive slices are left out
    fn draw_pie<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>, pairs: &[(String, f64)]) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        let slices: Vec<&(String, f64)> = pairs.iter().filter(|(_, v)| *v > 0.0).collect();
        if slices.is_empty() {
            anyhow::bail!("Cannot create pie chart without positive values");
        }

        let area = root
            .titled(self.title, self.font(20))
            .context("Failed to draw title")?;
        let (w, h) = area.dim_in_pixel();
        let center = (w as i32 / 2, h as i32 / 2);
        let radius = f64::from(w.min(h)) * 0.38;

        let sizes: Vec<f64> = slices.iter().map(|(_, v)| *v).collect();
        let labels: Vec<String> = slices.iter().map(|(l, _)| l.clone()).collect();
        let colors = ColorPalette::category10().take(slices.len());

        let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
        pie.start_angle(-90.0);
        pie.label_style(self.font(14));
        pie.percentages(self.font(12).color(&WHITE));
        area.draw(&pie).context("Failed to draw pie")?;

        Ok(())
    }

    fn draw_scatter<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>, points: &[(f64, f64)]) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        if points.is_empty() {
            anyhow::bail!("Cannot create scatter plot with no data points");
        }
        let xs: Vec<f64> = points.iter().map(|p| p.0).collect();
        let ys: Vec<f64> = points.iter().map(|p| p.1).collect();

        let mut chart = ChartBuilder::on(root)
            .margin(10)
            .caption(self.title, self.font(20))
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d(padded_range(&xs), padded_range(&ys))
            .context("Failed to build chart")?;

        chart
            .configure_mesh()
            .x_desc(self.x_desc.as_str())
            .y_desc(self.y_desc.as_str())
            .draw()
            .context("Failed to draw mesh")?;

        let color = self.bar_color();
        chart
            .draw_series(points.iter().map(|&(x, y)| Circle::new((x, y), 4, color.filled())))
            .context("Failed to draw point series")?;

        Ok(())
    }

    /// One coloured line per series over categorical x positions; gaps break the line
    fn draw_lines<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        x_labels: &[String],
        series: &[(String, Vec<Option<f64>>)],
    ) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        let values: Vec<f64> = series.iter().flat_map(|(_, v)| v.iter().flatten().copied()).collect();
        if x_labels.is_empty() || values.is_empty() {
            anyhow::bail!("Cannot create line chart with no data");
        }
        let n = x_labels.len() as i32;

        let mut chart = ChartBuilder::on(root)
            .margin(10)
            .caption(self.title, self.font(20))
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d((0..n).into_segmented(), padded_range(&values))
            .context("Failed to build chart")?;

        chart
            .configure_mesh()
            .x_labels(x_labels.len() + 1)
            .x_label_style(self.font(12))
            .x_label_formatter(&|x| match x {
                SegmentValue::CenterOf(idx) => x_labels.get(*idx as usize).cloned().unwrap_or_default(),
                _ => String::new(),
            })
            .x_desc(self.x_desc.as_str())
            .y_desc(self.y_desc.as_str())
            .draw()
            .context("Failed to draw mesh")?;

        let palette = ColorPalette::category10();
        for (series_idx, (name, ys)) in series.iter().enumerate() {
            let color = palette.color(series_idx);
            let mut labelled = false;

            for run in contiguous_runs(ys) {
                let points: Vec<(SegmentValue<i32>, f64)> = run
                    .into_iter()
                    .map(|(idx, y)| (SegmentValue::CenterOf(idx as i32), y))
                    .collect();

                chart
                    .draw_series(points.iter().map(|(x, y)| Circle::new((x.clone(), *y), 3, color.filled())))
                    .context("Failed to draw line markers")?;

                let anno = chart
                    .draw_series(LineSeries::new(points, color.stroke_width(2)))
                    .context("Failed to draw line series")?;
                if !labelled {
                    anno.label(name.as_str())
                        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
                    labelled = true;
                }
            }
        }

        chart
            .configure_series_labels()
            .label_font(self.font(12))
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .context("Failed to draw legend")?;

        Ok(())
    }
}

/// Render one chart to image bytes
pub fn render_chart(spec: &ChartSpec, data: &ChartData, options: &RenderOptions) -> Result<Vec<u8>> {
    Canvas::new(options, spec)
        .render(spec.kind, data)
        .with_context(|| format!("Failed to render chart '{}'", spec.id))
}

fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let mut png_bytes = Vec::new();
    {
        let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
        encoder
            .write_image(buffer, width, height, image::ColorType::Rgb8)
            .context("Failed to encode PNG")?;
    }
    Ok(png_bytes)
}

/// Split a gappy series into runs of (index, value)
fn contiguous_runs(values: &[Option<f64>]) -> Vec<Vec<(usize, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for (idx, value) in values.iter().enumerate() {
        match value {
            Some(v) => current.push((idx, *v)),
            None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Axis range for bar lengths: always includes zero, with headroom
fn value_range(values: &[f64]) -> Range<f64> {
    let min = values.iter().copied().fold(0.0, f64::min);
    let max = values.iter().copied().fold(0.0, f64::max);
    if min == max {
        return 0.0..1.0;
    }
    let headroom = (max - min) * 0.1;
    let low = if min < 0.0 { min - headroom } else { 0.0 };
    let high = if max > 0.0 { max + headroom } else { 0.0 };
    low..high
}

fn padded_range(values: &[f64]) -> Range<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        (min - 1.0)..(max + 1.0)
    } else {
        let padding = (max - min) * 0.05;
        (min - padding)..(max + padding)
    }
}
