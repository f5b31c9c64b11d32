//! Terminal renderer: horizontal bars scaled to the series maximum

use portal_charts_config::EffectiveStyle;
use portal_charts_pipeline::{RenderError, RenderHandle, Renderer};

const BAR_WIDTH: usize = 40;

pub struct TextRenderer;

impl Renderer for TextRenderer {
    fn render(
        &self,
        container_id: &str,
        labels: &[String],
        values: &[f64],
        style: &EffectiveStyle,
    ) -> Result<RenderHandle, RenderError> {
        if values.is_empty() || labels.len() != values.len() {
            return Err(RenderError::Failed {
                message: format!(
                    "mismatched chart data: {} labels, {} values",
                    labels.len(),
                    values.len()
                ),
            });
        }

        let max = values.iter().fold(0.0_f64, |acc, v| acc.max(*v));

        println!();
        println!("  {} [{}]", style.title, style.chart_kind);
        if style.toggles.grid {
            println!("  {}", "-".repeat(BAR_WIDTH + 20));
        }
        for (label, value) in labels.iter().zip(values) {
            let width = if max > 0.0 {
                ((value / max) * BAR_WIDTH as f64).round() as usize
            } else {
                0
            };
            println!("  {:>10} | {} {}", label, "#".repeat(width), value);
        }
        if style.toggles.legend {
            println!(
                "  {} puntos, color {}",
                values.len(),
                style.color_primary
            );
        }
        println!();

        Ok(RenderHandle::new(container_id))
    }
}
