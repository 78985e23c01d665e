//! Pair x strategy heatmap of total return.

use super::chart_svg::escape_xml;
use crate::domain::table::Heatmap;

const CELL_W: f64 = 110.0;
const CELL_H: f64 = 28.0;
const LABEL_W: f64 = 120.0;
const HEADER_H: f64 = 60.0;

/// Red for losses, green for gains, intensity scaled to the largest
/// absolute value. Missing cells are grey.
fn cell_color(value: f64, scale: f64) -> String {
    let t = if scale > 0.0 {
        (value.abs() / scale).min(1.0)
    } else {
        0.0
    };
    let fade = (255.0 - 155.0 * t).round() as u8;
    if value >= 0.0 {
        format!("rgb({fade},255,{fade})")
    } else {
        format!("rgb(255,{fade},{fade})")
    }
}

pub fn generate_heatmap_svg(heatmap: &Heatmap) -> String {
    let pairs = heatmap.pairs();
    let strategies = heatmap.strategies();
    let width = LABEL_W + CELL_W * strategies.len().max(1) as f64 + 10.0;
    let height = HEADER_H + CELL_H * pairs.len().max(1) as f64 + 10.0;
    let scale = heatmap
        .value_range()
        .map(|(lo, hi)| lo.abs().max(hi.abs()))
        .unwrap_or(0.0);

    let mut svg = format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">
<rect width="100%" height="100%" fill="#ffffff"/>
<text x="10" y="22" font-family="sans-serif" font-size="14">Total return (%) by pair and strategy</text>
"##
    );

    if heatmap.is_empty() {
        svg.push_str(&format!(
            "<text x=\"10\" y=\"{:.1}\" font-family=\"sans-serif\" font-size=\"12\">No successful runs.</text>\n",
            HEADER_H + 18.0
        ));
    }

    for (col, strategy) in strategies.iter().enumerate() {
        let x = LABEL_W + CELL_W * (col as f64 + 0.5);
        svg.push_str(&format!(
            "<text x=\"{x:.1}\" y=\"{:.1}\" font-family=\"sans-serif\" font-size=\"11\" text-anchor=\"middle\">{}</text>\n",
            HEADER_H - 8.0,
            escape_xml(strategy)
        ));
    }

    for (row, pair) in pairs.iter().enumerate() {
        let y = HEADER_H + CELL_H * row as f64;
        svg.push_str(&format!(
            "<text x=\"10\" y=\"{:.1}\" font-family=\"sans-serif\" font-size=\"11\">{}</text>\n",
            y + CELL_H * 0.65,
            escape_xml(pair)
        ));
        for (col, strategy) in strategies.iter().enumerate() {
            let x = LABEL_W + CELL_W * col as f64;
            let value = heatmap.get(pair, strategy);
            let fill = value
                .map(|v| cell_color(v, scale))
                .unwrap_or_else(|| "#dddddd".to_string());
            svg.push_str(&format!(
                "<rect x=\"{x:.1}\" y=\"{y:.1}\" width=\"{CELL_W}\" height=\"{CELL_H}\" fill=\"{fill}\" stroke=\"#ffffff\"/>\n"
            ));
            if let Some(v) = value {
                svg.push_str(&format!(
                    "<text x=\"{:.1}\" y=\"{:.1}\" font-family=\"sans-serif\" font-size=\"11\" text-anchor=\"middle\">{v:.2}</text>\n",
                    x + CELL_W / 2.0,
                    y + CELL_H * 0.65
                ));
            }
        }
    }

    svg.push_str("</svg>\n");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::metrics::RunMetrics;
    use crate::domain::simulator::Simulation;
    use crate::domain::table::{MetricsTable, RunResult};

    fn row(strategy: &str, pair: &str, total_return: f64) -> RunResult {
        RunResult::succeeded(
            strategy,
            pair,
            Simulation {
                initial_capital: 100.0,
                equity_curve: Vec::new(),
                closed_trades: Vec::new(),
                open_position: None,
                metrics: RunMetrics {
                    total_return,
                    sharpe_ratio: 0.0,
                    max_drawdown: 0.0,
                    win_rate: 0.0,
                    trades: 0,
                },
            },
        )
    }

    #[test]
    fn cell_colors() {
        assert_eq!(cell_color(10.0, 10.0), "rgb(100,255,100)");
        assert_eq!(cell_color(-10.0, 10.0), "rgb(255,100,100)");
        assert_eq!(cell_color(0.0, 0.0), "rgb(255,255,255)");
    }

    #[test]
    fn renders_cells_and_gaps() {
        let table: MetricsTable = vec![
            row("sma_crossover", "ETHBTC", 4.0),
            row("rsi_bb", "ETHBTC", -2.0),
            row("sma_crossover", "BNBBTC", 1.25),
        ]
        .into_iter()
        .collect();
        let svg = generate_heatmap_svg(&table.heatmap());

        assert!(svg.contains(">4.00<"));
        assert!(svg.contains(">-2.00<"));
        assert!(svg.contains(">1.25<"));
        assert_eq!(svg.matches("#dddddd").count(), 1);
        assert!(svg.contains(">BNBBTC<"));
        assert!(svg.contains(">rsi_bb<"));
    }

    #[test]
    fn empty_heatmap_still_renders() {
        let svg = generate_heatmap_svg(&Heatmap::default());
        assert!(svg.contains("No successful runs."));
        assert!(svg.ends_with("</svg>\n"));
    }
}
