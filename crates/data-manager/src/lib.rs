//! Data management for the portal's statistics series
//!
//! Fetching across ordered candidate endpoints, normalization of the
//! heterogeneous payload shapes the origins answer with, TTL caching, and
//! synthetic fallback when every origin fails.

pub mod cache;
pub mod client;
pub mod fallback;
pub mod normalize;

pub use cache::{CacheKey, SeriesCache, SharedSeriesCache, DEFAULT_CACHE_TTL};
pub use client::{
    Endpoint, EndpointAction, FetchedPayload, RawSeries, SourceClient, SourceError,
    DEFAULT_REQUEST_TIMEOUT,
};
pub use fallback::{FallbackSeriesGenerator, MAX_FALLBACK_POINTS};
pub use normalize::RecordNormalizer;
