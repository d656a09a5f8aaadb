//! The loaded API definition and its lookups.

use std::sync::Arc;

use ravelin_refs::{
    location_to_url, parse_document, pointer, JsonRefResolver, ReferenceOutcome, Resolution,
};
use ravelin_router::{PathMatcher, Router};
use ravelin_schema::ValidationResults;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use crate::error::{DefinitionError, RegistryError};
use crate::message::HttpRequest;
use crate::operation::Operation;
use crate::options::LoadOptions;
use crate::parameter::Parameter;
use crate::path::Path;
use crate::registry::{CustomValidator, Registry, ValidatorId};
use crate::response::Response;
use crate::validation;

/// HTTP methods a path item may declare, in document model order.
pub const HTTP_METHODS: &[&str] = &["get", "put", "post", "delete", "options", "head", "patch"];

/// A Swagger 2.0 document with its references resolved and its paths,
/// operations, parameters and responses modelled.
#[derive(Debug, Clone)]
pub struct Definition {
    resolution: Resolution,
    base_path: String,
    paths: Vec<Path>,
    router: Router,
    registry: Arc<Registry>,
}

impl Definition {
    /// Resolve references in `document` and build the model.
    #[instrument(skip_all, fields(base = options.base_location.as_deref()))]
    pub async fn load(document: Value, options: LoadOptions) -> Result<Self, DefinitionError> {
        let base = options
            .base_location
            .as_deref()
            .map(location_to_url)
            .transpose()?;

        let resolution = match &options.resolver {
            Some(resolver) => resolver.resolve(document, base).await?,
            None => {
                JsonRefResolver::new(Arc::clone(&options.loader))
                    .resolve_document(document, base)
                    .await?
            }
        };

        let registry = Arc::new(Registry::new(options.formats, options.validators));
        let definition = Self::from_resolution(resolution, registry)?;
        info!(
            paths = definition.paths.len(),
            references = definition.resolution.references.len(),
            "definition loaded"
        );
        Ok(definition)
    }

    /// Parse YAML (or JSON, which YAML subsumes) text and load it.
    pub async fn from_yaml_str(text: &str, options: LoadOptions) -> Result<Self, DefinitionError> {
        let location = options.base_location.as_deref().unwrap_or("<inline>");
        let document = parse_document(location, text)?;
        Self::load(document, options).await
    }

    pub async fn from_json_str(text: &str, options: LoadOptions) -> Result<Self, DefinitionError> {
        let document =
            serde_json::from_str(text).map_err(|e| DefinitionError::Parse(e.to_string()))?;
        Self::load(document, options).await
    }

    /// Read and load the document at `location`. Relative references
    /// resolve against it unless a base location is already set.
    pub async fn from_file(
        location: impl AsRef<std::path::Path>,
        mut options: LoadOptions,
    ) -> Result<Self, DefinitionError> {
        let location = location.as_ref();
        let text = tokio::fs::read_to_string(location)
            .await
            .map_err(|e| DefinitionError::Parse(format!("{}: {e}", location.display())))?;
        if options.base_location.is_none() {
            options.base_location = Some(location.display().to_string());
        }
        Self::from_yaml_str(&text, options).await
    }

    fn from_resolution(
        resolution: Resolution,
        registry: Arc<Registry>,
    ) -> Result<Self, DefinitionError> {
        let root = resolution
            .resolved
            .as_object()
            .ok_or_else(|| DefinitionError::InvalidDocument("document must be an object".into()))?;

        let base_path = root
            .get("basePath")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let global = Inherited {
            consumes: string_list(root.get("consumes")),
            produces: string_list(root.get("produces")),
            security: root
                .get("security")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
        };

        let mut paths = Vec::new();
        let mut router = Router::new();
        if let Some(items) = root.get("paths") {
            let items = expect_object(items, &["paths".to_string()])?;
            for (template, item) in items {
                if template.starts_with("x-") {
                    continue;
                }
                let path = build_path(&base_path, template, item, &global, &registry)?;
                router.insert(PathMatcher::clone(&path.matcher));
                paths.push(path);
            }
        }

        debug!(base_path = %base_path, paths = paths.len(), "built document model");
        Ok(Self {
            resolution,
            base_path,
            paths,
            router,
            registry,
        })
    }

    /// The document as given.
    pub fn original(&self) -> &Value {
        &self.resolution.original
    }

    /// Local references inlined, remote ones left in place.
    pub fn local_resolved(&self) -> &Value {
        &self.resolution.local_resolved
    }

    /// Remote references inlined, local ones left in place.
    pub fn remotes_resolved(&self) -> &Value {
        &self.resolution.remotes_resolved
    }

    /// Every resolvable reference inlined.
    pub fn resolved(&self) -> &Value {
        &self.resolution.resolved
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Resolution outcome of every `$ref` in the original document.
    pub fn references(&self) -> &[ReferenceOutcome] {
        &self.resolution.references
    }

    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    /// The path item with exactly this template.
    pub fn path(&self, template: &str) -> Option<&Path> {
        self.paths.iter().find(|p| p.template() == template)
    }

    /// The path matching the request URL (`original_url` first).
    pub fn path_for_request(&self, req: &HttpRequest) -> Option<&Path> {
        self.path_for_url(req.target_url()?)
    }

    /// The most specific path whose template matches `url`. The URL
    /// includes the base path; a query string is ignored.
    pub fn path_for_url(&self, url: &str) -> Option<&Path> {
        let found = self.router.lookup(url)?;
        self.paths.get(found.index)
    }

    /// Every operation, in path then method order.
    pub fn operations(&self) -> Vec<&Operation> {
        self.paths.iter().flat_map(|p| p.operations()).collect()
    }

    pub fn operations_for_path(&self, template: &str) -> Vec<&Operation> {
        self.path(template)
            .map(|p| p.operations().iter().collect())
            .unwrap_or_default()
    }

    /// Look up by template and method. Without a method, `template` is
    /// matched as an operationId.
    pub fn operation(&self, template: &str, method: Option<&str>) -> Option<&Operation> {
        match method {
            Some(method) => self.path(template)?.operation(method),
            None => self.operation_by_id(template),
        }
    }

    pub fn operation_by_id(&self, operation_id: &str) -> Option<&Operation> {
        self.paths
            .iter()
            .flat_map(|p| p.operations())
            .find(|op| op.operation_id() == Some(operation_id))
    }

    /// The operation serving `req`, by URL and method.
    pub fn operation_for_request(&self, req: &HttpRequest) -> Option<&Operation> {
        self.path_for_request(req)?.operation(&req.method)
    }

    pub fn operations_by_tag(&self, tag: &str) -> Vec<&Operation> {
        self.paths
            .iter()
            .flat_map(|p| p.operations_by_tag(tag))
            .collect()
    }

    /// Register a string format used by every later validation.
    pub fn register_format<F>(&self, name: &str, validator: F) -> Result<(), RegistryError>
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.registry.register_format(name, validator)
    }

    /// Returns whether a format was removed.
    pub fn unregister_format(&self, name: &str) -> Result<bool, RegistryError> {
        self.registry.unregister_format(name)
    }

    /// Register a sample generator for a string format.
    pub fn register_format_generator<F>(&self, name: &str, generator: F) -> Result<(), RegistryError>
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.registry.register_generator(name, generator)
    }

    pub fn unregister_format_generator(&self, name: &str) -> Result<bool, RegistryError> {
        self.registry.unregister_generator(name)
    }

    /// Register a document-level validator run by [`Definition::validate`]
    /// after the built-in checks.
    pub fn register_validator<F>(&self, validator: F) -> ValidatorId
    where
        F: Fn(&Definition) -> ValidationResults + Send + Sync + 'static,
    {
        let validator: CustomValidator = Arc::new(validator);
        self.registry.add_validator(validator)
    }

    /// Returns whether the validator was registered.
    pub fn unregister_validator(&self, id: ValidatorId) -> bool {
        self.registry.remove_validator(id)
    }

    /// Validate the document: references, structure, then semantics, then
    /// registered validators.
    pub fn validate(&self) -> ValidationResults {
        validation::validate_definition(self)
    }

    pub(crate) fn custom_validators(&self) -> Vec<CustomValidator> {
        self.registry.validators()
    }

    pub(crate) fn formats(&self) -> ravelin_schema::FormatRegistry {
        self.registry.formats()
    }
}

/// Document-level values operations inherit when they omit their own.
struct Inherited {
    consumes: Vec<String>,
    produces: Vec<String>,
    security: Vec<Value>,
}

fn build_path(
    base_path: &str,
    template: &str,
    item: &Value,
    global: &Inherited,
    registry: &Arc<Registry>,
) -> Result<Path, DefinitionError> {
    let location = vec!["paths".to_string(), template.to_string()];
    let fields = expect_object(item, &location)?;
    let matcher = Arc::new(PathMatcher::compile(base_path, template)?);
    let parameters = build_parameters(fields.get("parameters"), &location, &matcher, registry)?;

    let mut operations = Vec::new();
    for method in HTTP_METHODS {
        let Some(op) = fields.get(*method) else {
            continue;
        };
        let mut op_location = location.clone();
        op_location.push((*method).to_string());
        operations.push(build_operation(
            method,
            template,
            op,
            op_location,
            &parameters,
            global,
            &matcher,
            registry,
        )?);
    }

    Ok(Path {
        template: template.to_string(),
        path: location,
        definition: item.clone(),
        matcher,
        parameters,
        operations,
    })
}

#[allow(clippy::too_many_arguments)]
fn build_operation(
    method: &str,
    template: &str,
    op: &Value,
    location: Vec<String>,
    path_parameters: &[Parameter],
    global: &Inherited,
    matcher: &Arc<PathMatcher>,
    registry: &Arc<Registry>,
) -> Result<Operation, DefinitionError> {
    let fields = expect_object(op, &location)?;

    let mut parameters = build_parameters(fields.get("parameters"), &location, matcher, registry)?;
    let inherited: Vec<Parameter> = path_parameters
        .iter()
        .filter(|p| {
            !parameters
                .iter()
                .any(|own| own.name() == p.name() && own.location() == p.location())
        })
        .cloned()
        .collect();
    parameters.extend(inherited);

    let consumes = match fields.get("consumes") {
        Some(list) => string_list(Some(list)),
        None => global.consumes.clone(),
    };
    let produces = match fields.get("produces") {
        Some(list) => string_list(Some(list)),
        None => global.produces.clone(),
    };
    let security = match fields.get("security").and_then(Value::as_array) {
        Some(own) => own.clone(),
        None => global.security.clone(),
    };

    let mut responses = Vec::new();
    if let Some(declared) = fields.get("responses") {
        let mut responses_location = location.clone();
        responses_location.push("responses".to_string());
        for (code, response) in expect_object(declared, &responses_location)? {
            if code.starts_with("x-") {
                continue;
            }
            let mut response_location = responses_location.clone();
            response_location.push(code.clone());
            expect_object(response, &response_location)?;
            responses.push(Response::new(
                code.clone(),
                response_location,
                response.clone(),
                produces.clone(),
                Arc::clone(registry),
            ));
        }
    }

    Ok(Operation {
        method: method.to_string(),
        path_template: template.to_string(),
        path: location,
        definition: op.clone(),
        consumes,
        produces,
        security,
        parameters,
        responses,
    })
}

fn build_parameters(
    list: Option<&Value>,
    owner: &[String],
    matcher: &Arc<PathMatcher>,
    registry: &Arc<Registry>,
) -> Result<Vec<Parameter>, DefinitionError> {
    let Some(list) = list else {
        return Ok(Vec::new());
    };
    let mut list_location = owner.to_vec();
    list_location.push("parameters".to_string());
    let items = list.as_array().ok_or_else(|| {
        DefinitionError::InvalidDocument(format!(
            "{} must be an array",
            pointer::to_ptr(&list_location)
        ))
    })?;

    let mut parameters = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let mut location = list_location.clone();
        location.push(index.to_string());
        expect_object(item, &location)?;
        match Parameter::from_definition(item, location.clone(), Arc::clone(matcher), Arc::clone(registry)) {
            Some(parameter) => parameters.push(parameter),
            None => debug!(
                parameter = %pointer::to_ptr(&location),
                "skipping parameter without a name or known location"
            ),
        }
    }
    Ok(parameters)
}

fn expect_object<'a>(
    value: &'a Value,
    location: &[String],
) -> Result<&'a Map<String, Value>, DefinitionError> {
    value.as_object().ok_or_else(|| {
        DefinitionError::InvalidDocument(format!(
            "{} must be an object",
            pointer::to_ptr(location)
        ))
    })
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> Value {
        json!({
            "swagger": "2.0",
            "info": {"title": "Pets", "version": "1.0"},
            "basePath": "/api",
            "produces": ["application/json"],
            "security": [{"key": []}],
            "securityDefinitions": {"key": {"type": "apiKey", "name": "X-Key", "in": "header"}},
            "parameters": {
                "petId": {"name": "petId", "in": "path", "required": true, "type": "integer"}
            },
            "paths": {
                "/pets/{petId}": {
                    "parameters": [
                        {"$ref": "#/parameters/petId"},
                        {"name": "verbose", "in": "query", "type": "boolean"}
                    ],
                    "get": {
                        "operationId": "getPet",
                        "tags": ["pets"],
                        "parameters": [{"name": "verbose", "in": "query", "type": "string"}],
                        "responses": {"200": {"description": "ok"}, "default": {"description": "err"}}
                    },
                    "delete": {
                        "security": [],
                        "produces": ["text/plain"],
                        "responses": {"204": {"description": "gone"}}
                    }
                },
                "/pets/mine": {
                    "get": {"tags": ["pets", "mine"], "responses": {"200": {"description": "ok"}}}
                },
                "x-internal": {"note": true}
            }
        })
    }

    async fn load() -> Definition {
        Definition::load(document(), LoadOptions::default())
            .await
            .expect("load")
    }

    #[tokio::test]
    async fn builds_paths_and_operations() {
        let def = load().await;
        assert_eq!(def.base_path(), "/api");
        assert_eq!(def.paths().len(), 2);
        assert_eq!(def.operations().len(), 3);
        assert_eq!(def.operations_for_path("/pets/{petId}").len(), 2);
        assert!(def.operations_for_path("/nope").is_empty());
    }

    #[tokio::test]
    async fn operation_parameters_override_path_parameters() {
        let def = load().await;
        let get = def.operation("/pets/{petId}", Some("GET")).expect("get");
        assert_eq!(get.parameters().len(), 2);
        let verbose = get.parameter("verbose", None).expect("verbose");
        assert_eq!(verbose.schema()["type"], json!("string"));
        assert_eq!(verbose.path()[2], "get");

        let pet_id = get.parameter("petId", Some(crate::Location::Path)).expect("petId");
        assert_eq!(pet_id.ptr(), "#/paths/~1pets~1{petId}/parameters/0");
        assert!(get.parameter("petId", Some(crate::Location::Query)).is_none());
    }

    #[tokio::test]
    async fn inherited_and_overridden_settings() {
        let def = load().await;
        let get = def.operation_by_id("getPet").expect("getPet");
        assert_eq!(get.produces(), ["application/json"]);
        assert_eq!(get.security().len(), 1);

        let delete = def.operation("/pets/{petId}", Some("delete")).expect("delete");
        assert_eq!(delete.produces(), ["text/plain"]);
        assert!(delete.security().is_empty());
        assert!(delete.operation_id().is_none());
    }

    #[tokio::test]
    async fn lookups_by_url_and_request() {
        let def = load().await;
        assert_eq!(
            def.path_for_url("/api/pets/mine").map(Path::template),
            Some("/pets/mine")
        );
        assert_eq!(
            def.path_for_url("/api/pets/7?x=1").map(Path::template),
            Some("/pets/{petId}")
        );
        assert!(def.path_for_url("/pets/7").is_none());

        let req = HttpRequest::new("delete", "/api/pets/7");
        let op = def.operation_for_request(&req).expect("operation");
        assert_eq!(op.method(), "delete");
        assert!(def
            .operation_for_request(&HttpRequest::new("PUT", "/api/pets/7"))
            .is_none());
    }

    #[tokio::test]
    async fn operations_by_tag() {
        let def = load().await;
        assert_eq!(def.operations_by_tag("pets").len(), 2);
        assert_eq!(def.operations_by_tag("mine").len(), 1);
        let path = def.path("/pets/{petId}").expect("path");
        assert_eq!(path.operations_by_tag("pets").len(), 1);
        assert_eq!(path.operation("getPet").map(Operation::method), Some("get"));
    }

    #[tokio::test]
    async fn response_fallback_to_default() {
        let def = load().await;
        let get = def.operation_by_id("getPet").expect("getPet");
        assert_eq!(get.response(Some("200")).map(Response::status_code), Some("200"));
        assert_eq!(get.response(Some("404")).map(Response::status_code), Some("default"));
        assert_eq!(get.response(None).map(Response::status_code), Some("default"));

        let delete = def.operation("/pets/{petId}", Some("delete")).expect("delete");
        assert!(delete.response(Some("500")).is_none());
    }

    #[tokio::test]
    async fn non_object_path_item_is_rejected() {
        let mut doc = document();
        doc["paths"]["/broken"] = json!([]);
        let err = Definition::load(doc, LoadOptions::default())
            .await
            .expect_err("invalid");
        assert!(matches!(err, DefinitionError::InvalidDocument(_)));
        assert!(err.to_string().contains("#/paths/~1broken"));
    }

    #[tokio::test]
    async fn unbalanced_template_is_rejected() {
        let mut doc = document();
        doc["paths"]["/pets/{id"] = json!({});
        let err = Definition::load(doc, LoadOptions::default())
            .await
            .expect_err("invalid");
        assert!(matches!(err, DefinitionError::Route(_)));
    }

    #[tokio::test]
    async fn registries_are_shared_with_the_model() {
        let def = load().await;
        assert_eq!(def.register_format("", |_| true), Err(RegistryError::NameRequired));
        def.register_format("even", |s| s.len() % 2 == 0).expect("register");
        assert!(def.formats().format("even").is_some());
        assert_eq!(def.unregister_format("even"), Ok(true));

        let id = def.register_validator(|_| ValidationResults::new());
        assert_eq!(def.custom_validators().len(), 1);
        assert!(def.unregister_validator(id));
    }

    #[tokio::test]
    async fn parses_yaml_and_json_text() {
        let yaml = "swagger: '2.0'\ninfo: {title: t, version: '1'}\npaths: {}\n";
        let def = Definition::from_yaml_str(yaml, LoadOptions::default())
            .await
            .expect("yaml");
        assert!(def.paths().is_empty());

        let err = Definition::from_json_str("{", LoadOptions::default())
            .await
            .expect_err("bad json");
        assert!(matches!(err, DefinitionError::Parse(_)));
    }
}
