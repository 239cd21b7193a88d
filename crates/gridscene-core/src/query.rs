use std::io;
use std::rc::Rc;
use std::time::Duration;

use futures_util::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::grid::{Grid, GridError, IdentityProjector, Projector};

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("No grid found for place '{0}'")]
    NotFound(String),

    #[error("Query for '{place}' timed out after {timeout:?}")]
    Timeout { place: String, timeout: Duration },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid grid: {0}")]
    Grid(#[from] GridError),

    #[error("Query failed: {0}")]
    Other(String),
}

#[derive(Error, Debug, PartialEq)]
pub enum OptionsError {
    #[error("Load options resolve to an empty place")]
    EmptyPlace,

    #[error("Query timeout must be positive")]
    ZeroTimeout,
}

/// Executes a query for one resolved load. The returned future runs on the caller's thread.
pub trait GridQuery {
    fn run(&self, options: &LoadOptions) -> LocalBoxFuture<'static, Result<Grid, QueryError>>;
}

/// Parameters forwarded to the query collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryParams {
    pub timeout: Duration,
    #[serde(default)]
    pub extra: Map<String, Value>,
}

/// Values every load starts from before the filter and overrides are applied.
#[derive(Debug, Clone)]
pub struct LoadDefaults {
    pub timeout: Duration,
    /// Projector already used by the scene, so new layers line up with old ones.
    pub projector: Option<Rc<dyn Projector>>,
}

impl Default for LoadDefaults {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            projector: None,
        }
    }
}

/// Caller-supplied overrides for a single load.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawLoadOptions {
    pub place: Option<String>,
    #[serde(skip)]
    pub projector: Option<Rc<dyn Projector>>,
    pub timeout_secs: Option<u64>,
    pub extra: Map<String, Value>,
}

impl RawLoadOptions {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_projector(mut self, projector: Rc<dyn Projector>) -> Self {
        self.projector = Some(projector);
        self
    }
}

/// Fully resolved configuration for one load.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Target identifier; also becomes the layer id.
    pub place: String,
    pub projector: Rc<dyn Projector>,
    pub params: QueryParams,
}

impl LoadOptions {
    /// Resolve options. Later sources win: defaults, then the filter, then `raw`.
    pub fn parse(
        defaults: &LoadDefaults,
        filter: &str,
        raw: RawLoadOptions,
    ) -> Result<Self, OptionsError> {
        let place = raw
            .place
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| filter.trim().to_string());
        if place.is_empty() {
            return Err(OptionsError::EmptyPlace);
        }

        let timeout = raw
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);
        if timeout.is_zero() {
            return Err(OptionsError::ZeroTimeout);
        }

        let projector = raw
            .projector
            .or_else(|| defaults.projector.clone())
            .unwrap_or_else(|| Rc::new(IdentityProjector));

        Ok(Self {
            place,
            projector,
            params: QueryParams {
                timeout,
                extra: raw.extra,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::grid::OffsetProjector;

    #[test]
    fn test_filter_becomes_place() {
        let opts = LoadOptions::parse(&LoadDefaults::default(), " region-A ", RawLoadOptions::default())
            .unwrap();
        assert_eq!(opts.place, "region-A");
        assert_eq!(opts.params.timeout, Duration::from_secs(30));
        assert_eq!(opts.projector.project(Point::new(1.0, 2.0)), Point::new(1.0, 2.0));
    }

    #[test]
    fn test_overrides_win() {
        let raw = RawLoadOptions::from_json(r#"{"place": "region-B", "timeout_secs": 5, "extra": {"k": 1}}"#)
            .unwrap();
        let opts = LoadOptions::parse(&LoadDefaults::default(), "region-A", raw).unwrap();
        assert_eq!(opts.place, "region-B");
        assert_eq!(opts.params.timeout, Duration::from_secs(5));
        assert_eq!(opts.params.extra["k"], 1);
    }

    #[test]
    fn test_default_projector_reused() {
        let defaults = LoadDefaults {
            projector: Some(Rc::new(OffsetProjector::new(Point::new(1.0, 1.0), 1.0))),
            ..LoadDefaults::default()
        };
        let opts = LoadOptions::parse(&defaults, "x", RawLoadOptions::default()).unwrap();
        assert_eq!(opts.projector.project(Point::new(1.0, 1.0)), Point::new(0.0, 0.0));

        let raw = RawLoadOptions::default().with_projector(Rc::new(IdentityProjector));
        let opts = LoadOptions::parse(&defaults, "x", raw).unwrap();
        assert_eq!(opts.projector.project(Point::new(1.0, 1.0)), Point::new(1.0, 1.0));
    }

    #[test]
    fn test_invalid_options() {
        let defaults = LoadDefaults::default();
        assert_eq!(
            LoadOptions::parse(&defaults, "  ", RawLoadOptions::default()).unwrap_err(),
            OptionsError::EmptyPlace
        );
        let raw = RawLoadOptions {
            timeout_secs: Some(0),
            ..RawLoadOptions::default()
        };
        assert_eq!(
            LoadOptions::parse(&defaults, "x", raw).unwrap_err(),
            OptionsError::ZeroTimeout
        );
    }
}
