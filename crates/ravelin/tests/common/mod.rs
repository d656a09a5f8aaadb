//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Once;

use ravelin::{Definition, LoadOptions};
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness. Set `RUST_LOG` to see it.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub async fn petstore() -> Definition {
    load_fixture("petstore.yaml", LoadOptions::default()).await
}

pub async fn load_fixture(name: &str, options: LoadOptions) -> Definition {
    init_tracing();
    Definition::from_file(fixture(name), options)
        .await
        .expect("fixture should load")
}

/// The petstore document as a mutable value, for building broken variants.
pub fn petstore_document() -> serde_json::Value {
    let text = std::fs::read_to_string(fixture("petstore.yaml")).expect("read petstore");
    serde_yaml::from_str(&text).expect("parse petstore")
}

pub async fn load_value(document: serde_json::Value) -> Definition {
    init_tracing();
    Definition::load(document, LoadOptions::default())
        .await
        .expect("document should load")
}
