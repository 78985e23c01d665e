//! Equity curve chart as a standalone SVG document.

use crate::domain::portfolio::EquityPoint;

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 320.0;
const PADDING: f64 = 50.0;

pub(crate) fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Polyline of equity over bar index, labelled with the value range and the
/// first and last timestamps. Empty curves yield an empty string.
pub fn generate_equity_svg(title: &str, equity_curve: &[EquityPoint]) -> String {
    let (Some(first), Some(last)) = (equity_curve.first(), equity_curve.last()) else {
        return String::new();
    };

    let (lo, hi) = equity_curve
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.equity), hi.max(p.equity))
        });

    let plot_w = WIDTH - 2.0 * PADDING;
    let plot_h = HEIGHT - 2.0 * PADDING;
    let range = hi - lo;
    let scale_y = if range > 0.0 { plot_h / range } else { 0.0 };
    let scale_x = if equity_curve.len() > 1 {
        plot_w / (equity_curve.len() - 1) as f64
    } else {
        0.0
    };
    let baseline = if range > 0.0 { HEIGHT - PADDING } else { HEIGHT / 2.0 };

    let points = equity_curve
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let x = PADDING + i as f64 * scale_x;
            let y = baseline - (p.equity - lo) * scale_y;
            format!("{x:.1},{y:.1}")
        })
        .collect::<Vec<_>>()
        .join(" ");

    let bottom = HEIGHT - PADDING;
    let right = WIDTH - PADDING;
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}">
<rect width="100%" height="100%" fill="#ffffff"/>
<text x="{PADDING}" y="24" font-family="sans-serif" font-size="14">{title}</text>
<line x1="{PADDING}" y1="{PADDING}" x2="{PADDING}" y2="{bottom}" stroke="#555"/>
<line x1="{PADDING}" y1="{bottom}" x2="{right}" y2="{bottom}" stroke="#555"/>
<text x="4" y="{top_label:.1}" font-family="sans-serif" font-size="10">{hi:.2}</text>
<text x="4" y="{bottom:.1}" font-family="sans-serif" font-size="10">{lo:.2}</text>
<text x="{PADDING}" y="{date_y:.1}" font-family="sans-serif" font-size="10">{start}</text>
<text x="{right}" y="{date_y:.1}" font-family="sans-serif" font-size="10" text-anchor="end">{end}</text>
<polyline fill="none" stroke="#1f77b4" stroke-width="1.5" points="{points}"/>
</svg>
"##,
        title = escape_xml(title),
        top_label = PADDING + 4.0,
        date_y = bottom + 16.0,
        start = first.timestamp.format("%Y-%m-%d %H:%M"),
        end = last.timestamp.format("%Y-%m-%d %H:%M"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn curve(values: &[f64]) -> Vec<EquityPoint> {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &equity)| EquityPoint {
                timestamp: start + chrono::Duration::minutes(i as i64),
                equity,
            })
            .collect()
    }

    #[test]
    fn empty_curve_renders_nothing() {
        assert!(generate_equity_svg("x", &[]).is_empty());
    }

    #[test]
    fn polyline_has_one_point_per_bar() {
        let svg = generate_equity_svg("sma_crossover ETHBTC", &curve(&[100.0, 105.0, 98.0, 110.0]));
        assert!(svg.starts_with("<svg"));
        let points = svg
            .split("points=\"")
            .nth(1)
            .and_then(|s| s.split('"').next())
            .unwrap();
        assert_eq!(points.split(' ').count(), 4);
        assert!(svg.contains("110.00"));
        assert!(svg.contains("2025-01-01 00:03"));
    }

    #[test]
    fn flat_curve_is_drawn_mid_height() {
        let svg = generate_equity_svg("flat", &curve(&[100.0, 100.0]));
        assert!(svg.contains("50.0,160.0 750.0,160.0"));
    }

    #[test]
    fn title_is_escaped() {
        let svg = generate_equity_svg("a<b & c", &curve(&[1.0]));
        assert!(svg.contains("a&lt;b &amp; c"));
    }
}
