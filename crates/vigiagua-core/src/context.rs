use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::boundary::{load_boundaries, BoundaryPolygon};
use crate::config::SourceConfig;
use crate::records::{load_records, SupplyRecord};
use crate::trend::YearAxis;
use crate::VigiaguaResult;

/// Read-only datasets shared by every selection for as long as they are
/// valid.
#[derive(Debug, Clone)]
pub struct DatasetContext {
    pub records: Vec<SupplyRecord>,
    pub boundaries: Vec<BoundaryPolygon>,
    pub years: YearAxis,
    pub loaded_at: DateTime<Utc>,
}

impl DatasetContext {
    /// Load both datasets. Either failing fails the whole load.
    pub fn load(config: &SourceConfig) -> VigiaguaResult<Self> {
        config.validate()?;
        let records = load_records(config)?;
        let boundaries = load_boundaries(config)?;
        Ok(Self::from_parts(records, boundaries))
    }

    pub fn from_parts(records: Vec<SupplyRecord>, boundaries: Vec<BoundaryPolygon>) -> Self {
        let years = YearAxis::from_records(&records);
        Self {
            records,
            boundaries,
            years,
            loaded_at: Utc::now(),
        }
    }
}

struct Entry {
    value: Arc<DatasetContext>,
    expires_at: Option<Instant>,
}

/// Load-once holder of the [`DatasetContext`] with an optional time-to-live.
///
/// An expired context is never served: the next `get` reloads and, if that
/// fails, returns the error.
pub struct ContextCache {
    config: SourceConfig,
    ttl: Option<Duration>,
    loader: Box<dyn Fn(&SourceConfig) -> VigiaguaResult<DatasetContext>>,
    current: Option<Entry>,
}

impl ContextCache {
    pub fn new(config: SourceConfig) -> Self {
        Self::with_loader(config, DatasetContext::load)
    }

    /// Cache driven by a custom loader.
    pub fn with_loader<F>(config: SourceConfig, loader: F) -> Self
    where
        F: Fn(&SourceConfig) -> VigiaguaResult<DatasetContext> + 'static,
    {
        let ttl = config.ttl_secs.map(Duration::from_secs);
        Self {
            config,
            ttl,
            loader: Box::new(loader),
            current: None,
        }
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// The current context, loading it first if absent or expired.
    pub fn get(&mut self) -> VigiaguaResult<Arc<DatasetContext>> {
        let now = Instant::now();
        if let Some(entry) = &self.current {
            match entry.expires_at {
                Some(at) if now > at => {
                    tracing::info!("dataset context expired, reloading");
                }
                _ => return Ok(Arc::clone(&entry.value)),
            }
        }
        // Drop the stale entry before loading so a failed reload cannot be
        // papered over on the next call.
        self.current = None;

        let start = Instant::now();
        let context = Arc::new((self.loader)(&self.config)?);
        tracing::info!(
            records = context.records.len(),
            boundaries = context.boundaries.len(),
            years = context.years.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "dataset context loaded"
        );
        self.current = Some(Entry {
            value: Arc::clone(&context),
            expires_at: self.ttl.map(|ttl| Instant::now() + ttl),
        });
        Ok(context)
    }

    /// Force the next `get` to reload.
    pub fn invalidate(&mut self) {
        self.current = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.current.is_some()
    }
}
