//! Typst report generation.
//!
//! Reads a Typst template (either the built-in default or a custom file via
//! `template_path`), resolves all `{{PLACEHOLDER}}` markers by calling helpers
//! from `chart_svg` and `tables`, and writes the final `.typ` file. Compiling
//! it to PDF is left to the `typst` CLI.

pub mod chart_svg;
pub mod default_template;
pub mod tables;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::domain::error::ValueScreenError;
use crate::ports::report_port::{ReportInput, ReportPort};

/// Resolve all `{{PLACEHOLDER}}`s in the given template string and return
/// the final Typst markup ready to be written to a `.typ` file.
pub fn resolve(template: &str, input: &ReportInput<'_>) -> String {
    let mut output = template.to_string();

    output = output.replace(
        "{{RUN_SUMMARY}}",
        &tables::render_run_summary(input.config, input.result),
    );
    output = output.replace(
        "{{METRICS_TABLE}}",
        &tables::render_metrics_table(input.metrics),
    );

    let svg = chart_svg::generate_nav_svg(&input.result.nav, input.benchmark);
    output = output.replace(
        "{{NAV_CHART_SVG}}",
        &chart_svg::embed(&svg, "_No NAV data._"),
    );

    output = output.replace(
        "{{PERFORMANCE_TABLE}}",
        &tables::render_performance_table(input.result, input.benchmark),
    );
    output = output.replace(
        "{{CONSTITUENTS_TABLE}}",
        &tables::render_constituents_table(input.result),
    );
    output = output.replace("{{PERIOD_LOG}}", &tables::render_period_log(input.result));

    output
}

pub struct TypstReportAdapter {
    template_path: Option<PathBuf>,
}

impl TypstReportAdapter {
    pub fn new(template_path: Option<PathBuf>) -> Self {
        Self { template_path }
    }

    fn load_template(&self) -> Result<String, ValueScreenError> {
        match &self.template_path {
            Some(path) => fs::read_to_string(path).map_err(|e| ValueScreenError::Data {
                reason: format!("failed to read template {}: {}", path.display(), e),
            }),
            None => Ok(default_template::template().to_string()),
        }
    }
}

impl ReportPort for TypstReportAdapter {
    fn export(&self, input: &ReportInput<'_>, destination: &Path) -> Result<(), ValueScreenError> {
        let template = self.load_template()?;
        let markup = resolve(&template, input);

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(destination, markup)?;
        info!("Wrote Typst report to {}", destination.display());
        Ok(())
    }
}
