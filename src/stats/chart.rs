//! SVG line charts for the statistics panel.

use super::bucketer::{ActivitySeries, Granularity, HourlySeries};

pub const TAKEN_COLOR: &str = "#339cff";
pub const GIVEN_COLOR: &str = "#27ae60";

const MARGIN_TOP: f64 = 20.0;
const MARGIN_RIGHT: f64 = 80.0;
const MARGIN_BOTTOM: f64 = 60.0;
const MARGIN_LEFT: f64 = 60.0;
const MAX_Y_TICKS: u32 = 10;

#[derive(Debug, Clone)]
pub struct ChartPoint {
    pub label: String,
    pub taken: u32,
    pub given: u32,
}

#[derive(Debug, Clone)]
pub struct ChartOptions {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub x_axis_label: String,
    pub y_axis_label: String,
    /// Leave 5% of the x range empty on both sides.
    pub pad_x: bool,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 300,
            title: String::new(),
            x_axis_label: String::new(),
            y_axis_label: "Number of Transactions".to_string(),
            pad_x: true,
        }
    }
}

pub fn activity_chart(series: &ActivitySeries) -> String {
    let points: Vec<ChartPoint> = series
        .buckets
        .iter()
        .map(|b| ChartPoint {
            label: b.label.clone(),
            taken: b.taken_count,
            given: b.given_count,
        })
        .collect();
    let x_axis_label = match series.granularity {
        Granularity::Day => "Date",
        Granularity::Week => "Week",
        Granularity::Month => "Month",
    };
    render_line_chart(
        &points,
        &ChartOptions {
            title: format!("Activity ({})", series.period),
            x_axis_label: x_axis_label.to_string(),
            ..ChartOptions::default()
        },
    )
}

pub fn hourly_chart(series: &HourlySeries) -> String {
    let points: Vec<ChartPoint> = series
        .buckets
        .iter()
        .map(|b| ChartPoint {
            label: b.label.clone(),
            taken: b.taken_count,
            given: b.given_count,
        })
        .collect();
    render_line_chart(
        &points,
        &ChartOptions {
            title: format!("Hourly activity on {}", series.date.format("%Y-%m-%d")),
            x_axis_label: "Hour of Day".to_string(),
            pad_x: false,
            ..ChartOptions::default()
        },
    )
}

/// Renders a two-series (taken/given) line chart as a standalone SVG document.
pub fn render_line_chart(points: &[ChartPoint], options: &ChartOptions) -> String {
    let width = f64::from(options.width);
    let height = f64::from(options.height);
    let inner_width = (width - MARGIN_LEFT - MARGIN_RIGHT).max(1.0);
    let inner_height = (height - MARGIN_TOP - MARGIN_BOTTOM).max(1.0);

    let max_value = points
        .iter()
        .map(|p| p.taken.max(p.given))
        .max()
        .unwrap_or(0)
        .max(1);

    let x = |index: usize| -> f64 {
        let n = points.len();
        if n <= 1 {
            return inner_width / 2.0;
        }
        let span = (n - 1) as f64;
        if options.pad_x {
            (index as f64 + span * 0.05) / (span * 1.1) * inner_width
        } else {
            index as f64 / span * inner_width
        }
    };
    let y = |value: u32| -> f64 { inner_height - f64::from(value) / f64::from(max_value) * inner_height };

    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif" font-size="11">"#,
        w = options.width,
        h = options.height,
    ));
    if !options.title.is_empty() {
        svg.push_str(&format!("<title>{}</title>", escape_xml(&options.title)));
    }
    svg.push_str(&format!(
        r#"<g transform="translate({},{})">"#,
        MARGIN_LEFT, MARGIN_TOP
    ));

    // y axis
    svg.push_str(&format!(
        r##"<line x1="0" y1="0" x2="0" y2="{:.1}" stroke="#333"/>"##,
        inner_height
    ));
    for tick in y_ticks(max_value) {
        let ty = y(tick);
        svg.push_str(&format!(
            r##"<line x1="-6" y1="{ty:.1}" x2="0" y2="{ty:.1}" stroke="#333"/><line x1="0" y1="{ty:.1}" x2="{iw:.1}" y2="{ty:.1}" stroke="#eee"/><text x="-9" y="{ty:.1}" dy="0.32em" text-anchor="end">{tick}</text>"##,
            ty = ty,
            iw = inner_width,
            tick = tick,
        ));
    }

    // x axis
    svg.push_str(&format!(
        r##"<line x1="0" y1="{ih:.1}" x2="{iw:.1}" y2="{ih:.1}" stroke="#333"/>"##,
        ih = inner_height,
        iw = inner_width,
    ));
    for (index, point) in points.iter().enumerate() {
        let tx = x(index);
        svg.push_str(&format!(
            r##"<line x1="{tx:.1}" y1="{ih:.1}" x2="{tx:.1}" y2="{ty:.1}" stroke="#333"/><text transform="translate({tx:.1},{ly:.1}) rotate(-45)" text-anchor="end">{label}</text>"##,
            tx = tx,
            ih = inner_height,
            ty = inner_height + 6.0,
            ly = inner_height + 10.0,
            label = escape_xml(&point.label),
        ));
    }

    let series: [(&str, fn(&ChartPoint) -> u32); 2] =
        [(TAKEN_COLOR, |p| p.taken), (GIVEN_COLOR, |p| p.given)];
    for (color, value_of) in series {
        let path: Vec<String> = points
            .iter()
            .enumerate()
            .map(|(i, p)| format!("{:.1},{:.1}", x(i), y(value_of(p))))
            .collect();
        if !path.is_empty() {
            svg.push_str(&format!(
                r#"<polyline fill="none" stroke="{}" stroke-width="2" points="{}"/>"#,
                color,
                path.join(" ")
            ));
        }
        for (i, p) in points.iter().enumerate() {
            svg.push_str(&format!(
                r#"<circle cx="{:.1}" cy="{:.1}" r="3" fill="{}"/>"#,
                x(i),
                y(value_of(p)),
                color
            ));
        }
    }

    // axis labels
    svg.push_str(&format!(
        r#"<text x="{:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
        inner_width / 2.0,
        inner_height + MARGIN_BOTTOM - 5.0,
        escape_xml(&options.x_axis_label)
    ));
    svg.push_str(&format!(
        r#"<text transform="rotate(-90)" x="{:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
        -inner_height / 2.0,
        -MARGIN_LEFT + 15.0,
        escape_xml(&options.y_axis_label)
    ));

    // legend
    for (row, (color, label)) in [(TAKEN_COLOR, "Books Taken"), (GIVEN_COLOR, "Books Given")]
        .into_iter()
        .enumerate()
    {
        let ly = row as f64 * 20.0;
        svg.push_str(&format!(
            r#"<rect x="{lx:.1}" y="{ly:.1}" width="12" height="12" fill="{color}"/><text x="{tx:.1}" y="{ty:.1}">{label}</text>"#,
            lx = inner_width + 10.0,
            ly = ly,
            color = color,
            tx = inner_width + 26.0,
            ty = ly + 10.0,
            label = label,
        ));
    }

    svg.push_str("</g></svg>");
    svg
}

/// At most ten integer ticks from 0 to `max_value`.
fn y_ticks(max_value: u32) -> Vec<u32> {
    let step = max_value.div_ceil(MAX_Y_TICKS).max(1);
    (0..=max_value).step_by(step as usize).collect()
}

pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::bucketer::{bucket_by_hour, bucket_by_period, Period};
    use chrono::{NaiveDate, TimeZone, Utc};

    #[test]
    fn test_y_ticks() {
        assert_eq!(y_ticks(1), vec![0, 1]);
        assert_eq!(y_ticks(4), vec![0, 1, 2, 3, 4]);
        let ticks = y_ticks(95);
        assert!(ticks.len() <= 11);
        assert_eq!(ticks[1], 10);
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("<a & 'b'>"), "&lt;a &amp; &apos;b&apos;&gt;");
    }

    #[test]
    fn test_empty_activity_chart_is_valid_svg() {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap();
        let svg = activity_chart(&bucket_by_period(&[], Period::OneWeek, &now));

        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains(TAKEN_COLOR));
        assert!(svg.contains(GIVEN_COLOR));
        assert!(svg.contains("10/16"));
        assert!(svg.contains("Books Taken"));
        assert!(svg.contains("rotate(-45)"));
    }

    #[test]
    fn test_hourly_chart_has_every_hour() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let svg = hourly_chart(&bucket_by_hour(&[], date, &Utc));
        assert!(svg.contains(">0:00<"));
        assert!(svg.contains(">23:00<"));
        assert!(svg.contains("Hour of Day"));
    }

    #[test]
    fn test_labels_are_escaped() {
        let points = vec![ChartPoint {
            label: "<script>".to_string(),
            taken: 2,
            given: 1,
        }];
        let svg = render_line_chart(&points, &ChartOptions::default());
        assert!(!svg.contains("<script>"));
        assert!(svg.contains("&lt;script&gt;"));
    }
}
