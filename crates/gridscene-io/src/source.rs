use std::io;
use std::path::{Path, PathBuf};

use futures_util::future::LocalBoxFuture;
use gridscene_core::{Grid, GridQuery, LoadOptions, QueryError};

/// Answers grid queries from `<dir>/<place>.json` documents.
#[derive(Debug, Clone)]
pub struct FileGridSource {
    dir: PathBuf,
}

impl FileGridSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the document for `place`. Places that would escape the directory are refused.
    pub fn document_path(&self, place: &str) -> Result<PathBuf, QueryError> {
        if place.is_empty() || place.contains(['/', '\\']) || place.starts_with('.') {
            return Err(QueryError::Other(format!("invalid place name '{}'", place)));
        }
        Ok(self.dir.join(format!("{}.json", place)))
    }
}

impl GridQuery for FileGridSource {
    fn run(&self, options: &LoadOptions) -> LocalBoxFuture<'static, Result<Grid, QueryError>> {
        let place = options.place.clone();
        let path = self.document_path(&place);
        Box::pin(async move {
            let path = path?;
            log::debug!("reading grid '{}' from {}", place, path.display());
            let json = match tokio::fs::read_to_string(&path).await {
                Ok(json) => json,
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    return Err(QueryError::NotFound(place));
                }
                Err(err) => return Err(err.into()),
            };
            Ok(Grid::from_json(&json)?)
        })
    }
}
