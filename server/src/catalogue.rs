use std::path::Path;

use terra_shared::Region;
use terra_shared::region::{RegionError, parse_regions};
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum CatalogueError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error(transparent)]
    Invalid(#[from] RegionError),
}

/// Load the region catalogue. A missing file is not fatal: the server runs
/// with no regions. A malformed one is.
pub async fn load_regions(path: &Path) -> Result<Vec<Region>, CatalogueError> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "region catalogue not found, serving no regions");
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(CatalogueError::Io {
                path: path.display().to_string(),
                source,
            });
        }
    };

    let regions = parse_regions(&raw)?;
    info!(path = %path.display(), count = regions.len(), "Loaded region catalogue");
    Ok(regions)
}
