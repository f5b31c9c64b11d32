//! Render capability boundary
//!
//! Charts are drawn by an external capability (a browser charting library,
//! a terminal plotter). The pipeline only needs readiness, a plot call, and
//! a handle to refer to what was drawn.

use portal_charts_config::EffectiveStyle;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("container {container} is not available")]
    ContainerUnavailable { container: String },

    #[error("render failed: {message}")]
    Failed { message: String },
}

/// Reference to a rendered chart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderHandle {
    pub id: Uuid,
    pub container: String,
}

impl RenderHandle {
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            container: container.into(),
        }
    }
}

/// External charting capability.
///
/// Implementations may need startup time (script loading, terminal setup);
/// the pipeline polls `is_ready` before the first draw.
pub trait Renderer: Send + Sync {
    /// Whether the capability can draw right now
    fn is_ready(&self) -> bool {
        true
    }

    /// Draw `labels`/`values` into the container, styled by `style`
    fn render(
        &self,
        container_id: &str,
        labels: &[String],
        values: &[f64],
        style: &EffectiveStyle,
    ) -> Result<RenderHandle, RenderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_distinct() {
        let a = RenderHandle::new("grafico-empresas");
        let b = RenderHandle::new("grafico-empresas");
        assert_ne!(a.id, b.id);
        assert_eq!(a.container, b.container);
    }
}
