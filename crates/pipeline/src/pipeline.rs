//! The load-and-render orchestrator

use crate::config::{PortalConfig, RenderConfig, SourcesConfig};
use crate::render::{RenderHandle, Renderer};
use crate::status::{LogStatusSink, StatusLevel, StatusSink};
use log::{debug, warn};
use parking_lot::Mutex;
use portal_charts_config::{
    merge_style, ConfigurationStore, EffectiveStyle, JsonFileBackend,
};
use portal_charts_data::{
    CacheKey, FallbackSeriesGenerator, RecordNormalizer, SharedSeriesCache, SourceClient,
};
use portal_charts_shared::{Provenance, Series, SeriesKey};
use std::collections::BTreeMap;

/// Per-request load parameters
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Optional reporting period forwarded as the `periodo` query parameter
    pub period: Option<String>,
    /// Extra query filters, ordered by name
    pub filters: BTreeMap<String, String>,
    /// Skip the cache read (the freshly loaded series is still stored)
    pub force_refresh: bool,
}

impl LoadOptions {
    /// Query parameters for the source request, period first
    pub fn request_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::with_capacity(self.filters.len() + 1);
        if let Some(period) = &self.period {
            params.push(("periodo".to_string(), period.clone()));
        }
        for (name, value) in &self.filters {
            params.push((name.clone(), value.clone()));
        }
        params
    }
}

/// What a load produced and where it came from
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub series: Series,
    pub style: EffectiveStyle,
    pub provenance: Provenance,
    pub from_cache: bool,
}

/// A load plus the result of handing it to the render capability
#[derive(Debug)]
pub struct RenderOutcome {
    pub outcome: LoadOutcome,
    pub handle: Option<RenderHandle>,
}

/// Orchestrates source fetch, normalization, caching, fallback, style
/// resolution, and rendering.
///
/// `load` never fails: a series always comes back, marked `Synthetic` when
/// every source was exhausted. Failures surface to the user through the
/// status sink, not as errors.
pub struct ChartPipeline {
    client: SourceClient,
    cache: SharedSeriesCache,
    normalizer: Mutex<RecordNormalizer>,
    fallback: Mutex<FallbackSeriesGenerator>,
    store: ConfigurationStore,
    sources: SourcesConfig,
    render_config: RenderConfig,
    status: Box<dyn StatusSink>,
    renderer: Option<Box<dyn Renderer>>,
}

impl ChartPipeline {
    pub fn new(
        config: PortalConfig,
        store: ConfigurationStore,
        status: Box<dyn StatusSink>,
    ) -> Self {
        Self {
            client: SourceClient::new(config.request_timeout()),
            cache: SharedSeriesCache::with_ttl(config.cache_ttl()),
            normalizer: Mutex::new(RecordNormalizer::new()),
            fallback: Mutex::new(FallbackSeriesGenerator::new()),
            store,
            sources: config.sources,
            render_config: config.render,
            status,
            renderer: None,
        }
    }

    /// Standard wiring: file-backed stores at the configured paths, status
    /// messages forwarded to the log
    pub fn from_config(config: PortalConfig) -> Self {
        let store = ConfigurationStore::new(
            Box::new(JsonFileBackend::new("primary", &config.stores.primary_path)),
            Box::new(JsonFileBackend::new(
                "secondary",
                &config.stores.secondary_path,
            )),
        );
        Self::new(config, store, Box::new(LogStatusSink))
    }

    pub fn with_renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn store(&self) -> &ConfigurationStore {
        &self.store
    }

    /// Load a series and its effective style.
    ///
    /// Sequence: cache read (unless refreshing), source fetch across the
    /// key's endpoint chain, normalization, fallback on total source
    /// failure, cache write, style resolution. Cache hits count as live:
    /// only normalized series are stored, synthetic ones already tagged.
    pub async fn load(&self, key: SeriesKey, options: &LoadOptions) -> LoadOutcome {
        let display_name = key.schema().display_name;
        self.status.set_status(
            &format!("Cargando {}...", display_name),
            StatusLevel::Info,
        );

        let cache_key = CacheKey::new(key, options.period.as_deref(), &options.filters);

        if !options.force_refresh {
            if let Some(series) = self.cache.get(&cache_key) {
                self.status.set_status(
                    &format!("Estadísticas de {} actualizadas", display_name),
                    StatusLevel::Success,
                );
                return LoadOutcome {
                    series,
                    style: self.effective_style(key),
                    provenance: Provenance::Live,
                    from_cache: true,
                };
            }
        }

        let params = options.request_params();
        let endpoints = self.sources.endpoints_for(key);

        let (series, provenance) = match self.client.fetch_series(key, endpoints, &params).await {
            Ok(payload) => {
                let series = self.normalizer.lock().normalize(&payload.raw, key);
                debug!(
                    "loaded {} records for {} from {}",
                    series.len(),
                    key,
                    payload.endpoint
                );
                (series, Provenance::Live)
            }
            Err(err) => {
                warn!("falling back to synthetic data for {}: {}", key, err);
                let series = self.fallback.lock().generate(key);
                (series, Provenance::Synthetic)
            }
        };

        self.cache.put(cache_key, series.clone());

        match provenance {
            Provenance::Live => self.status.set_status(
                &format!("Estadísticas de {} actualizadas", display_name),
                StatusLevel::Success,
            ),
            Provenance::Synthetic => self.status.set_status(
                &format!("Mostrando datos de ejemplo para {}", display_name),
                StatusLevel::Warning,
            ),
        }

        LoadOutcome {
            series,
            style: self.effective_style(key),
            provenance,
            from_cache: false,
        }
    }

    /// Load a series and draw it into `container_id`.
    ///
    /// Waits for the render capability to become ready (bounded polling)
    /// before the draw call. Render failures are reported through the
    /// status sink and leave cache and configuration untouched.
    pub async fn render_into(
        &self,
        container_id: &str,
        key: SeriesKey,
        options: &LoadOptions,
    ) -> RenderOutcome {
        let outcome = self.load(key, options).await;

        let Some(renderer) = self.renderer.as_deref() else {
            self.status.set_status(
                "El módulo de gráficos no está disponible",
                StatusLevel::Error,
            );
            return RenderOutcome {
                outcome,
                handle: None,
            };
        };

        if !self.wait_for_renderer(renderer).await {
            warn!(
                "renderer not ready after {} attempts",
                self.render_config.poll_attempts
            );
            self.status.set_status(
                "El módulo de gráficos no está disponible",
                StatusLevel::Error,
            );
            return RenderOutcome {
                outcome,
                handle: None,
            };
        }

        let handle = match renderer.render(
            container_id,
            &outcome.series.labels(),
            &outcome.series.values(),
            &outcome.style,
        ) {
            Ok(handle) => {
                self.status.set_status(
                    &format!("Gráfico de {} actualizado", key.schema().display_name),
                    StatusLevel::Success,
                );
                Some(handle)
            }
            Err(err) => {
                warn!("render into {} failed: {}", container_id, err);
                self.status
                    .set_status("No se pudo dibujar el gráfico", StatusLevel::Error);
                None
            }
        };

        RenderOutcome { outcome, handle }
    }

    /// The saved configuration applies only when it targets this key;
    /// anything else resolves to the built-in defaults.
    fn effective_style(&self, key: SeriesKey) -> EffectiveStyle {
        let saved = self
            .store
            .resolve_effective()
            .filter(|config| config.series_key() == Some(key));
        merge_style(key, saved.as_ref())
    }

    /// One readiness check up front, then one more after each of the capped
    /// poll intervals, so readiness reached during the final interval still
    /// counts.
    async fn wait_for_renderer(&self, renderer: &dyn Renderer) -> bool {
        for attempt in 0..=self.render_config.poll_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.render_config.poll_interval()).await;
            }
            if renderer.is_ready() {
                if attempt > 0 {
                    debug!("renderer ready after {} polls", attempt);
                }
                return true;
            }
        }
        false
    }
}
