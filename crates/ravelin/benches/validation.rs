//! Benchmarks for loading, document validation and request validation.
//!
//! Run with: cargo bench -p ravelin

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::{json, Value};
use tokio::runtime::Runtime;

use ravelin::{Definition, HttpRequest, HttpResponse, LoadOptions};

fn petstore_document() -> Value {
    let text = include_str!("../tests/fixtures/petstore.yaml");
    serde_yaml::from_str(text).expect("petstore fixture should parse")
}

/// Petstore with `count` extra paths and definitions, each chaining a `$ref`.
fn widened_document(count: usize) -> Value {
    let mut document = petstore_document();
    for i in 0..count {
        document["definitions"][format!("Item{i}")] = json!({
            "type": "object",
            "required": ["id"],
            "properties": {
                "id": {"type": "integer", "format": "int64"},
                "pet": {"$ref": "#/definitions/Pet"}
            }
        });
        document["paths"][format!("/items{i}/{{itemId}}")] = json!({
            "get": {
                "operationId": format!("getItem{i}"),
                "parameters": [
                    {"name": "itemId", "in": "path", "required": true, "type": "integer"}
                ],
                "responses": {
                    "200": {
                        "description": "ok",
                        "schema": {"$ref": format!("#/definitions/Item{i}")}
                    }
                }
            }
        });
    }
    document
}

fn load(runtime: &Runtime, document: Value) -> Definition {
    runtime
        .block_on(Definition::load(document, LoadOptions::default()))
        .expect("document should load")
}

fn bench_load(c: &mut Criterion) {
    let runtime = Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("load");

    for count in [0, 10, 50] {
        let document = widened_document(count);
        group.bench_with_input(BenchmarkId::new("paths", count), &document, |b, document| {
            b.iter(|| load(&runtime, black_box(document.clone())))
        });
    }

    group.finish();
}

fn bench_validate_document(c: &mut Criterion) {
    let runtime = Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("validate_document");

    for count in [0, 10, 50] {
        let definition = load(&runtime, widened_document(count));
        group.bench_with_input(BenchmarkId::new("paths", count), &definition, |b, definition| {
            b.iter(|| black_box(definition.validate()))
        });
    }

    group.finish();
}

fn bench_requests(c: &mut Criterion) {
    let runtime = Runtime::new().expect("runtime");
    let definition = load(&runtime, widened_document(50));
    let mut group = c.benchmark_group("requests");

    group.bench_function("lookup_literal", |b| {
        let req = HttpRequest::new("GET", "/v2/pet/findByStatus?status=sold");
        b.iter(|| black_box(definition.operation_for_request(black_box(&req))))
    });

    group.bench_function("lookup_last_template", |b| {
        let req = HttpRequest::new("GET", "/v2/items49/7");
        b.iter(|| black_box(definition.operation_for_request(black_box(&req))))
    });

    let add_pet = definition.operation_by_id("addPet").expect("addPet");
    let valid = HttpRequest::new("POST", "/v2/pet")
        .with_header("Content-Type", "application/json")
        .with_json(json!({
            "id": 7,
            "name": "rex",
            "photoUrls": ["https://example.com/rex.png"],
            "tags": [{"id": 1, "name": "good"}],
            "status": "available"
        }));
    group.bench_function("validate_body_valid", |b| {
        b.iter(|| black_box(add_pet.validate_request(black_box(&valid))))
    });

    let invalid = HttpRequest::new("POST", "/v2/pet").with_json(json!({"photoUrls": "nope"}));
    group.bench_function("validate_body_invalid", |b| {
        b.iter(|| black_box(add_pet.validate_request(black_box(&invalid))))
    });

    let find = definition
        .operation_by_id("findPetsByStatus")
        .expect("findPetsByStatus");
    let query = HttpRequest::new("GET", "/v2/pet/findByStatus?status=available&status=pending");
    group.bench_function("validate_query_multi", |b| {
        b.iter(|| black_box(find.validate_request(black_box(&query))))
    });

    let get_pet = definition.operation_by_id("getPetById").expect("getPetById");
    let response = HttpResponse::new(200)
        .with_header("Content-Type", "application/json")
        .with_json(json!({"id": 7, "name": "rex", "photoUrls": []}));
    group.bench_function("validate_response", |b| {
        b.iter(|| black_box(get_pet.validate_response(black_box(&response))))
    });

    group.finish();
}

criterion_group!(benches, bench_load, bench_validate_document, bench_requests);
criterion_main!(benches);
