use anyhow::Context;
use mongofuse_core::{DocumentStore, MemoryStore, ProjectionEngine, StoreError};
use mongofuse_fuse::MongoFuse;
use serde_json::json;
use std::env;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Demo mount over the in-memory store. A networked store client plugs in by
/// implementing `DocumentStore` and swapping the construction below.
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("MONGOFUSE_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mountpoint = env::args().nth(1).context("usage: mount <mountpoint>")?;
    let store = Arc::new(MemoryStore::new());
    seed(&*store)?;
    let engine = Arc::new(ProjectionEngine::new(store as Arc<dyn DocumentStore>));
    let fs = MongoFuse::new(engine);
    fuser::mount2(fs, &mountpoint, &[]).context("mount failed")?;
    Ok(())
}

fn seed(store: &dyn DocumentStore) -> Result<(), StoreError> {
    store.upsert(
        "test",
        "people",
        json!({"_id": {"$oid": "4f8e7b9c2a1d3e5f60718293"}, "name": "svetlana", "age": 25}),
    )?;
    store.upsert(
        "test",
        "people",
        json!({"_id": {"$oid": "4f8e7b9c2a1d3e5f60718294"}, "name": "boris", "age": 27}),
    )?;
    store.create_collection("test", "places")?;
    Ok(())
}
