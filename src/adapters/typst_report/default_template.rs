//! Built-in Typst report template.

const TEMPLATE: &str = r#"#set page(paper: "a4", margin: (x: 2cm, y: 2cm), numbering: "1")
#set text(size: 10pt)
#set table(stroke: 0.5pt + luma(200), inset: 5pt)

= Value Screen Backtest Report

Equal-weight portfolio of the lowest-PE stocks, rebalanced on a fixed
schedule with a per-sector cap.

== Run Summary

{{RUN_SUMMARY}}

== Performance Metrics

{{METRICS_TABLE}}

== NAV

{{NAV_CHART_SVG}}

== NAV at Rebalance Dates

{{PERFORMANCE_TABLE}}

#pagebreak()

== Holdings

{{CONSTITUENTS_TABLE}}

== Period Log

{{PERIOD_LOG}}
"#;

pub fn template() -> &'static str {
    TEMPLATE
}
