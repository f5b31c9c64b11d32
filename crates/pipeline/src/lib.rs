//! Chart pipeline orchestrator
//!
//! Ties the source client, normalizer, cache, configuration store, and
//! fallback generator into one load sequence, and drives an external render
//! capability once a series and its effective style are resolved. The load
//! sequence is total: whatever fails along the way, the caller always gets a
//! renderable series with a provenance marker.

pub mod config;
pub mod pipeline;
pub mod render;
pub mod status;

pub use config::{CacheConfig, PortalConfig, RenderConfig, SourcesConfig, StoresConfig};
pub use pipeline::{ChartPipeline, LoadOptions, LoadOutcome, RenderOutcome};
pub use render::{RenderError, RenderHandle, Renderer};
pub use status::{LogStatusSink, StatusLevel, StatusSink};
