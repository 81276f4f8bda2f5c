//! Helpers for rendering a population in the Prometheus text exposition format.

use crate::family::Family;
use crate::population::Population;
use crate::series::Label;

/// Content type of the Prometheus text exposition format.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Renders every family of the population in the Prometheus [exposition format].
///
/// [exposition format]: https://github.com/prometheus/docs/blob/main/content/docs/instrumenting/exposition_formats.md#text-format-details
pub fn render_text(population: &Population) -> String {
    let mut output = String::new();

    for family in population.families() {
        write_family(&mut output, family);
    }

    output
}

fn write_family(buffer: &mut String, family: &Family) {
    write_type_line(buffer, family.name(), family.metric_type().as_str());
    for series in family.series() {
        write_metric_line(buffer, family.name(), series.labels(), series.value());
    }
    buffer.push('\n');
}

/// Writes a metric type line in the Prometheus [exposition format].
///
/// [exposition format]: https://github.com/prometheus/docs/blob/main/content/docs/instrumenting/exposition_formats.md#text-format-details
pub fn write_type_line(buffer: &mut String, name: &str, metric_type: &str) {
    buffer.push_str("# TYPE ");
    buffer.push_str(name);
    buffer.push(' ');
    buffer.push_str(metric_type);
    buffer.push('\n');
}

/// Writes a metric in the Prometheus [exposition format].
///
/// [exposition format]: https://github.com/prometheus/docs/blob/main/content/docs/instrumenting/exposition_formats.md#text-format-details
pub fn write_metric_line(buffer: &mut String, name: &str, labels: &[Label], value: f64) {
    buffer.push_str(name);

    if !labels.is_empty() {
        buffer.push('{');

        let mut first = true;
        for label in labels {
            if first {
                first = false;
            } else {
                buffer.push(',');
            }
            buffer.push_str(label.key());
            buffer.push_str("=\"");
            buffer.push_str(&escape_label_value(label.value()));
            buffer.push('"');
        }

        buffer.push('}');
    }

    buffer.push(' ');
    buffer.push_str(&format_value(value));
    buffer.push('\n');
}

/// Formats a sample value, spelling out the special values the way Prometheus expects them.
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_owned()
    } else if value == f64::INFINITY {
        "+Inf".to_owned()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_owned()
    } else {
        value.to_string()
    }
}

/// Escapes a label value for the Prometheus [exposition format].
///
/// Backslashes, double quotes, and line feeds must be escaped; everything else passes through.
///
/// [exposition format]: https://github.com/prometheus/docs/blob/main/content/docs/instrumenting/exposition_formats.md#text-format-details
pub fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());

    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }

    escaped
}
