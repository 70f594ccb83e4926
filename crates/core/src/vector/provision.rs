use std::time::Duration;

use crate::{
    backoff::{Backoff, poll_until},
    config::IndexConfig,
    error::{IngestError, Result},
    layout::index_name,
    types::{IndexState, VectorIndexHandle},
    vector::{IndexDescription, IndexSpec, VectorIndex},
};

/// Make sure the class's index exists and is ready.
///
/// An existing index is reused as-is: its dimension and metric are not
/// compared against the configuration. Creation errors are returned without
/// retrying here.
pub async fn ensure_index(
    index: &dyn VectorIndex,
    class_name: &str,
    config: &IndexConfig,
) -> Result<VectorIndexHandle> {
    let name = index_name(class_name);

    let created = match index.describe(&name).await? {
        Some(existing) => {
            tracing::info!(
                index = %name,
                dimension = existing.dimension,
                metric = %existing.metric,
                ready = existing.ready,
                "reusing existing index"
            );
            if existing.ready {
                return Ok(ready_handle(name, false));
            }
            false
        }
        None => {
            tracing::info!(index = %name, dimension = config.dimension, metric = %config.metric, "creating index");
            index.create(&IndexSpec::from_config(&name, config)).await?;
            true
        }
    };

    wait_until_ready(index, &name, config).await?;
    tracing::info!(index = %name, created, "index ready");
    Ok(ready_handle(name, created))
}

async fn wait_until_ready(
    index: &dyn VectorIndex,
    name: &str,
    config: &IndexConfig,
) -> Result<IndexDescription> {
    let backoff = Backoff::new(
        Duration::from_millis(config.poll_initial_ms),
        Duration::from_millis(config.poll_max_ms),
    );

    poll_until(
        &format!("index {name} to become ready"),
        backoff,
        config.ready_timeout(),
        || async move {
            let description = index.describe(name).await?;
            Ok::<_, IngestError>(description.filter(|d| d.ready))
        },
    )
    .await
}

fn ready_handle(name: String, created: bool) -> VectorIndexHandle {
    VectorIndexHandle {
        name,
        state: IndexState::Ready,
        created,
    }
}
