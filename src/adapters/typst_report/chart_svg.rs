//! SVG line chart of the NAV series for reports.

use crate::domain::portfolio::NavPoint;
use chrono::NaiveDate;

const CHART_WIDTH: f64 = 600.0;
const CHART_HEIGHT: f64 = 300.0;
const MARGIN_LEFT: f64 = 60.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 30.0;
const MARGIN_BOTTOM: f64 = 40.0;

const NAV_COLOR: &str = "#2563eb";
const BENCHMARK_COLOR: &str = "#9ca3af";

/// Render the NAV (and optional benchmark) as a standalone SVG document.
///
/// The x axis is calendar time, so series with different observation dates
/// still line up. Returns an empty string when there is nothing to draw.
pub fn generate_nav_svg(nav: &[NavPoint], benchmark: Option<(&str, &[NavPoint])>) -> String {
    let (Some(first), Some(last)) = (nav.first(), nav.last()) else {
        return String::new();
    };
    let start_date = first.date;
    let end_date = last.date;

    let bench = benchmark.filter(|(_, series)| !series.is_empty());
    let all_values = nav
        .iter()
        .chain(bench.iter().flat_map(|(_, series)| series.iter()))
        .map(|p| p.value);
    let (min_value, max_value) = all_values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    let range = (max_value - min_value).max(1.0);

    let plot_width = CHART_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let span_days = (end_date - start_date).num_days().max(1) as f64;

    let x_scale = |date: NaiveDate| -> f64 {
        MARGIN_LEFT + ((date - start_date).num_days() as f64 / span_days) * plot_width
    };
    let y_scale =
        |v: f64| -> f64 { MARGIN_TOP + plot_height - ((v - min_value) / range) * plot_height };

    let path_data = |series: &[NavPoint]| -> String {
        let mut data = String::new();
        for (i, point) in series.iter().enumerate() {
            let cmd = if i == 0 { "M" } else { " L" };
            data.push_str(&format!(
                "{} {:.1} {:.1}",
                cmd,
                x_scale(point.date),
                y_scale(point.value)
            ));
        }
        data
    };

    let mut svg = String::new();
    svg.push_str(&format!(
        r##"<svg width="{}" height="{}" viewBox="0 0 {} {}" xmlns="http://www.w3.org/2000/svg">"##,
        CHART_WIDTH, CHART_HEIGHT, CHART_WIDTH, CHART_HEIGHT
    ));
    svg.push_str("\n  <rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n");
    svg.push_str(&format!(
        "  <line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"#ccc\" stroke-width=\"1\"/>\n",
        MARGIN_LEFT,
        MARGIN_TOP,
        MARGIN_LEFT,
        CHART_HEIGHT - MARGIN_BOTTOM
    ));
    svg.push_str(&format!(
        "  <line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"#ccc\" stroke-width=\"1\"/>\n",
        MARGIN_LEFT,
        CHART_HEIGHT - MARGIN_BOTTOM,
        CHART_WIDTH - MARGIN_RIGHT,
        CHART_HEIGHT - MARGIN_BOTTOM
    ));

    for (y, value) in [
        (MARGIN_TOP + 5.0, max_value),
        (MARGIN_TOP + plot_height / 2.0, (max_value + min_value) / 2.0),
        (CHART_HEIGHT - MARGIN_BOTTOM - 5.0, min_value),
    ] {
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" text-anchor=\"end\" font-size=\"10\" fill=\"#666\">{:.1}</text>\n",
            MARGIN_LEFT - 5.0,
            y,
            value
        ));
    }
    for (x, date) in [
        (MARGIN_LEFT, start_date),
        (CHART_WIDTH - MARGIN_RIGHT, end_date),
    ] {
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" text-anchor=\"middle\" font-size=\"10\" fill=\"#666\">{}</text>\n",
            x, CHART_HEIGHT, date
        ));
    }

    if let Some((ticker, series)) = bench {
        svg.push_str(&format!(
            "  <path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1.5\"/>\n",
            path_data(series),
            BENCHMARK_COLOR
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"15\" font-size=\"11\" fill=\"{}\">{}</text>\n",
            MARGIN_LEFT + 90.0,
            BENCHMARK_COLOR,
            ticker
        ));
    }
    svg.push_str(&format!(
        "  <path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"2\"/>\n",
        path_data(nav),
        NAV_COLOR
    ));
    svg.push_str(&format!(
        "  <text x=\"{}\" y=\"15\" font-size=\"11\" fill=\"{}\">Strategy NAV</text>\n",
        MARGIN_LEFT, NAV_COLOR
    ));
    svg.push_str("</svg>");
    svg
}

/// Wrap an SVG document in a Typst `image.decode` call.
pub fn embed(svg: &str, fallback: &str) -> String {
    if svg.is_empty() {
        return fallback.to_string();
    }
    format!(
        "#image.decode(\n\"{}\",\n  width: 100%,\n)",
        svg.replace('\\', "\\\\").replace('"', "\\\"")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nav(values: &[(u32, f64)]) -> Vec<NavPoint> {
        values
            .iter()
            .map(|&(day, value)| NavPoint {
                date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
                value,
            })
            .collect()
    }

    #[test]
    fn empty_nav_renders_nothing() {
        assert!(generate_nav_svg(&[], None).is_empty());
        assert_eq!(embed("", "_No NAV data._"), "_No NAV data._");
    }

    #[test]
    fn single_point_renders() {
        let svg = generate_nav_svg(&nav(&[(1, 100.0)]), None);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("M 60.0"));
    }

    #[test]
    fn benchmark_is_drawn_and_labelled() {
        let strategy = nav(&[(1, 100.0), (15, 104.0), (31, 110.0)]);
        let bench = nav(&[(1, 100.0), (31, 102.0)]);
        let svg = generate_nav_svg(&strategy, Some(("SPY", &bench)));
        assert_eq!(svg.matches("<path").count(), 2);
        assert!(svg.contains("SPY"));
        assert!(svg.contains(BENCHMARK_COLOR));
    }

    #[test]
    fn embed_escapes_quotes() {
        let out = embed(r#"<svg a="1"/>"#, "");
        assert!(out.starts_with("#image.decode("));
        assert!(out.contains(r#"a=\"1\""#));
    }
}
