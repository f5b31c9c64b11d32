//! Built-in per-series style defaults
//!
//! Every series key renders with a sensible style out of the box; a saved
//! configuration only overrides the fields it explicitly sets.

use crate::{ChartKind, EffectiveStyle, SavedConfiguration, StyleToggles};
use portal_charts_shared::SeriesKey;

/// Default style for a series key
pub fn default_style(key: SeriesKey) -> EffectiveStyle {
    match key {
        SeriesKey::Empresas => empresas_style(),
        SeriesKey::Usuarios => usuarios_style(),
        SeriesKey::Eventos => eventos_style(),
    }
}

/// Layer an optional saved configuration over the key's defaults,
/// field by field: a field set in the configuration wins, an absent
/// field keeps the default.
pub fn merge_style(key: SeriesKey, saved: Option<&SavedConfiguration>) -> EffectiveStyle {
    let mut style = default_style(key);
    let Some(config) = saved else {
        return style;
    };

    if let Some(kind) = config.chart_kind {
        style.chart_kind = kind;
    }
    if let Some(color) = &config.color_primary {
        style.color_primary = color.clone();
    }
    if let Some(toggles) = config.toggles {
        style.toggles = toggles;
    }
    if !config.name.is_empty() {
        style.title = config.name.clone();
    }
    style
}

fn empresas_style() -> EffectiveStyle {
    EffectiveStyle {
        chart_kind: ChartKind::Line,
        color_primary: "#1e88e5".to_string(), // Blue
        toggles: StyleToggles::default(),
        title: "Empresas".to_string(),
    }
}

fn usuarios_style() -> EffectiveStyle {
    EffectiveStyle {
        chart_kind: ChartKind::Bar,
        color_primary: "#43a047".to_string(), // Green
        toggles: StyleToggles::default(),
        title: "Usuarios".to_string(),
    }
}

fn eventos_style() -> EffectiveStyle {
    EffectiveStyle {
        chart_kind: ChartKind::Doughnut,
        color_primary: "#fb8c00".to_string(), // Orange
        toggles: StyleToggles {
            grid: false, // Segment charts have no axes to grid
            legend: true,
            tooltips: true,
            animation: true,
        },
        title: "Eventos".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_key_has_distinct_defaults() {
        let empresas = default_style(SeriesKey::Empresas);
        let usuarios = default_style(SeriesKey::Usuarios);
        let eventos = default_style(SeriesKey::Eventos);

        assert_eq!(empresas.chart_kind, ChartKind::Line);
        assert_eq!(usuarios.chart_kind, ChartKind::Bar);
        assert_eq!(eventos.chart_kind, ChartKind::Doughnut);
        assert_ne!(empresas.color_primary, usuarios.color_primary);
        assert!(!eventos.toggles.grid);
    }

    #[test]
    fn test_merge_without_saved_config_is_the_default() {
        assert_eq!(
            merge_style(SeriesKey::Empresas, None),
            default_style(SeriesKey::Empresas)
        );
    }

    #[test]
    fn test_merge_explicit_fields_win() {
        let mut config = SavedConfiguration::for_series("mi vista", SeriesKey::Empresas);
        config.chart_kind = Some(ChartKind::Pie);
        config.color_primary = Some("#000000".to_string());

        let style = merge_style(SeriesKey::Empresas, Some(&config));
        assert_eq!(style.chart_kind, ChartKind::Pie);
        assert_eq!(style.color_primary, "#000000");
        assert_eq!(style.title, "mi vista");
        // Toggles were not set, so the defaults hold
        assert_eq!(style.toggles, StyleToggles::default());
    }

    #[test]
    fn test_merge_absent_fields_keep_defaults() {
        let config = SavedConfiguration::for_series("solo nombre", SeriesKey::Usuarios);
        let style = merge_style(SeriesKey::Usuarios, Some(&config));

        assert_eq!(style.chart_kind, ChartKind::Bar);
        assert_eq!(style.color_primary, "#43a047");
        assert_eq!(style.title, "solo nombre");
    }

    #[test]
    fn test_merge_toggles_replace_as_a_block() {
        let mut config = SavedConfiguration::for_series("sin animacion", SeriesKey::Eventos);
        config.toggles = Some(StyleToggles {
            grid: true,
            legend: false,
            tooltips: true,
            animation: false,
        });

        let style = merge_style(SeriesKey::Eventos, Some(&config));
        assert!(style.toggles.grid);
        assert!(!style.toggles.legend);
        assert!(!style.toggles.animation);
    }
}
