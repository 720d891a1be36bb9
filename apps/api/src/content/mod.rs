//! REST layer over the JSON snapshots.
//!
//! `GET /api/<kind>` returns `<data_dir>/<kind>.json` read fresh on every
//! request, so edits show up without a restart. When the file is missing the
//! snapshot compiled into the binary is served instead.

pub mod handlers;

use std::path::PathBuf;

use anyhow::Context;
use serde_json::Value;
use tracing::debug;

use crate::errors::AppError;
use crate::loader::ResourceKind;

const BUNDLED_PROFILE: &str = include_str!("../../data/profile.json");
const BUNDLED_TARGETS: &str = include_str!("../../data/targets.json");
const BUNDLED_POSTS: &str = include_str!("../../data/posts.json");

fn bundled(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Profile => BUNDLED_PROFILE,
        ResourceKind::Targets => BUNDLED_TARGETS,
        ResourceKind::Posts => BUNDLED_POSTS,
    }
}

pub struct ContentRepository {
    data_dir: PathBuf,
}

impl ContentRepository {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// The current snapshot for `kind`. Malformed JSON is an internal error:
    /// it means the deployment is broken, not that the content is missing.
    pub async fn read(&self, kind: ResourceKind) -> Result<Value, AppError> {
        let path = self.data_dir.join(kind.file_name());

        let value = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                debug!("serving {kind} from {}", path.display());
                serde_json::from_slice(&bytes)
                    .with_context(|| format!("{} is not valid JSON", path.display()))?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("serving bundled {kind} snapshot");
                serde_json::from_str(bundled(kind))
                    .with_context(|| format!("bundled {kind} snapshot is not valid JSON"))?
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("failed to read {}", path.display()))
                    .into())
            }
        };
        Ok(value)
    }
}
