//! Explanation rendering
//!
//! Turns an `Explanation` into a self-contained HTML fragment (inline styles
//! only, no scripts or external resources) that a UI host can embed in a frame,
//! or into pretty JSON.

use std::fmt::Write as _;

use crate::error::CdssError;
use crate::types::Explanation;

/// Frame height a host should reserve for the rendered report
pub const DEFAULT_FRAME_HEIGHT: u32 = 520;

const RISK_COLOR: &str = "#d9534f";
const NO_RISK_COLOR: &str = "#5b8def";

/// Renderer for explanation reports
#[derive(Debug, Clone)]
pub struct ReportRenderer {
    frame_height: u32,
}

impl Default for ReportRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportRenderer {
    /// Create a renderer with the default frame height
    pub fn new() -> Self {
        Self {
            frame_height: DEFAULT_FRAME_HEIGHT,
        }
    }

    /// Create a renderer for a specific frame height
    pub fn with_frame_height(frame_height: u32) -> Self {
        Self { frame_height }
    }

    pub fn frame_height(&self) -> u32 {
        self.frame_height
    }

    /// Render a standalone HTML fragment
    pub fn render_html(&self, explanation: &Explanation) -> String {
        let mut html = String::with_capacity(4096);
        let _ = write!(
            html,
            "<div class=\"cdss-report\" style=\"height:{}px;overflow:auto\">",
            self.frame_height
        );
        html.push_str(STYLE);

        self.write_probabilities(&mut html, explanation);
        self.write_contributions(&mut html, explanation);
        self.write_values(&mut html, explanation);

        let _ = write!(
            html,
            "<p class=\"cdss-footer\">Local fit R&sup2; {:.3} &middot; intercept {:.3} &middot; \
             local prediction {:.3} &middot; {} samples &middot; {}</p>",
            explanation.score,
            explanation.intercept,
            explanation.local_prediction,
            explanation.num_samples,
            explanation.computed_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        html.push_str("</div>");
        html
    }

    /// Render the explanation as pretty JSON
    pub fn render_json(&self, explanation: &Explanation) -> Result<String, CdssError> {
        serde_json::to_string_pretty(explanation).map_err(CdssError::Json)
    }

    fn write_probabilities(&self, html: &mut String, explanation: &Explanation) {
        html.push_str("<section><h3>Prediction probabilities</h3><table>");
        for (idx, (name, p)) in explanation
            .class_names
            .iter()
            .zip(explanation.predicted_proba)
            .enumerate()
        {
            let color = if idx == 1 { RISK_COLOR } else { NO_RISK_COLOR };
            let _ = write!(
                html,
                "<tr><td class=\"cdss-label\">{}</td><td class=\"cdss-track\">\
                 <div class=\"cdss-bar\" style=\"width:{:.1}%;background:{color}\"></div></td>\
                 <td class=\"cdss-num\">{p:.2}</td></tr>",
                escape_html(name),
                percent(p)
            );
        }
        html.push_str("</table></section>");
    }

    fn write_contributions(&self, html: &mut String, explanation: &Explanation) {
        let risk = explanation
            .class_names
            .get(1)
            .map_or("risk", String::as_str);
        let _ = write!(
            html,
            "<section><h3>Contributions towards {}</h3><table>",
            escape_html(risk)
        );

        let max_weight = explanation
            .contributions
            .iter()
            .map(|c| c.weight.abs())
            .fold(0.0_f64, f64::max);

        for contribution in &explanation.contributions {
            let width = if max_weight > 0.0 {
                contribution.weight.abs() / max_weight * 50.0
            } else {
                0.0
            };
            let (color, offset) = if contribution.weight >= 0.0 {
                (RISK_COLOR, 50.0)
            } else {
                (NO_RISK_COLOR, 50.0 - width)
            };
            let _ = write!(
                html,
                "<tr><td class=\"cdss-label\">{}</td><td class=\"cdss-track\">\
                 <div class=\"cdss-bar\" style=\"margin-left:{offset:.1}%;width:{width:.1}%;\
                 background:{color}\"></div></td><td class=\"cdss-num\">{:+.3}</td></tr>",
                escape_html(&contribution.condition),
                contribution.weight
            );
        }
        html.push_str("</table></section>");
    }

    fn write_values(&self, html: &mut String, explanation: &Explanation) {
        html.push_str(
            "<section><h3>Feature values</h3><table class=\"cdss-values\">\
             <tr><th>Feature</th><th>Value</th></tr>",
        );
        for contribution in &explanation.contributions {
            let value = match contribution.raw_value {
                Some(raw) => format_number(raw),
                None => format!("{:.2} (scaled)", contribution.value),
            };
            let _ = write!(
                html,
                "<tr><td>{}</td><td class=\"cdss-num\">{}</td></tr>",
                escape_html(&contribution.feature),
                value
            );
        }
        html.push_str("</table></section>");
    }
}

const STYLE: &str = "<style>\
.cdss-report{font-family:sans-serif;font-size:13px;color:#222}\
.cdss-report h3{font-size:14px;margin:8px 0 4px}\
.cdss-report table{border-collapse:collapse;width:100%}\
.cdss-report td,.cdss-report th{padding:2px 6px;text-align:left}\
.cdss-report .cdss-label{width:40%}\
.cdss-report .cdss-track{width:45%;background:#f2f2f2}\
.cdss-report .cdss-bar{height:12px}\
.cdss-report .cdss-num{text-align:right;font-variant-numeric:tabular-nums}\
.cdss-report .cdss-footer{color:#777;font-size:11px}\
</style>";

fn percent(p: f64) -> f64 {
    (p * 100.0).clamp(0.0, 100.0)
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e9 {
        format!("{}", value as i64)
    } else {
        format!("{value:.2}")
    }
}

/// Escape text for HTML element and attribute content
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FeatureContribution;
    use chrono::Utc;

    fn make_test_explanation() -> Explanation {
        Explanation {
            class_names: vec!["No PCOS".to_string(), "PCOS".to_string()],
            predicted_proba: [0.13, 0.87],
            contributions: vec![
                FeatureContribution {
                    feature: "Cycle(R/I)".to_string(),
                    condition: "Cycle(R/I) > 0.25".to_string(),
                    weight: 0.21,
                    value: 1.6,
                    raw_value: Some(1.0),
                },
                FeatureContribution {
                    feature: "Age (yrs)".to_string(),
                    condition: "Age (yrs) <= -0.40".to_string(),
                    weight: -0.05,
                    value: -0.9,
                    raw_value: None,
                },
            ],
            intercept: 0.42,
            local_prediction: 0.83,
            score: 0.61,
            num_samples: 5000,
            computed_at: Utc::now(),
        }
    }

    #[test]
    fn test_html_is_self_contained() {
        let html = ReportRenderer::new().render_html(&make_test_explanation());

        assert!(!html.contains("<script"));
        assert!(!html.contains("http"));
        assert!(html.contains("height:520px"));
        assert!(html.starts_with("<div class=\"cdss-report\""));
        assert!(html.ends_with("</div>"));
    }

    #[test]
    fn test_html_escapes_conditions() {
        let html = ReportRenderer::new().render_html(&make_test_explanation());

        assert!(html.contains("Age (yrs) &lt;= -0.40"));
        assert!(html.contains("Cycle(R/I) &gt; 0.25"));
        assert!(!html.contains("<= -0.40"));
    }

    #[test]
    fn test_html_shows_values_and_probabilities() {
        let html = ReportRenderer::with_frame_height(300).render_html(&make_test_explanation());

        assert!(html.contains("height:300px"));
        assert!(html.contains(">0.87<"));
        assert!(html.contains("+0.210"));
        assert!(html.contains("-0.050"));
        assert!(html.contains("-0.90 (scaled)"));
        assert!(html.contains("<td class=\"cdss-num\">1</td>"));
    }

    #[test]
    fn test_render_json() {
        let json = ReportRenderer::new()
            .render_json(&make_test_explanation())
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["predicted_proba"][1], 0.87);
        assert_eq!(value["contributions"][0]["feature"], "Cycle(R/I)");
        assert!(value["contributions"][1].get("raw_value").is_none());
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a<b & \"c\""), "a&lt;b &amp; &quot;c&quot;");
    }
}
