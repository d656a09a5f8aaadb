//! JSON Reference resolution.
//!
//! Resolution runs in two phases. Every remote document reachable from the
//! root is loaded first (the only asynchronous work). The expanded trees are
//! then built synchronously from that document set.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::{Map, Value};
use tracing::{debug, warn};
use url::Url;

use crate::error::RefError;
use crate::loader::{DocumentLoader, FileLoader};
use crate::pointer;
use crate::reference::{collect_refs, is_opaque, ref_uri, ReferenceKind, ReferenceOutcome};

/// Upper bound on `$ref` hops followed while locating a single target.
const MAX_HOPS: usize = 64;

/// The document trees produced by resolution.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The document as given.
    pub original: Value,
    /// Local references inlined, remote references left in place.
    pub local_resolved: Value,
    /// Remote references inlined, local references left in place.
    pub remotes_resolved: Value,
    /// Every resolvable reference inlined. Circular references become `{}`.
    pub resolved: Value,
    /// One outcome per `$ref` in the original document, in document order.
    pub references: Vec<ReferenceOutcome>,
}

/// Turns a raw document into a [`Resolution`].
pub trait ReferenceResolver: Send + Sync {
    fn resolve<'a>(
        &'a self,
        document: Value,
        base: Option<Url>,
    ) -> BoxFuture<'a, Result<Resolution, RefError>>;
}

/// Default resolver backed by a [`DocumentLoader`].
#[derive(Clone)]
pub struct JsonRefResolver {
    loader: Arc<dyn DocumentLoader>,
}

impl JsonRefResolver {
    pub fn new(loader: Arc<dyn DocumentLoader>) -> Self {
        Self { loader }
    }

    /// Resolve `document`, loading remote documents relative to `base`.
    pub async fn resolve_document(
        &self,
        document: Value,
        base: Option<Url>,
    ) -> Result<Resolution, RefError> {
        if !document.is_object() {
            return Err(RefError::NotAnObject);
        }

        let docs = self.preload(document, base).await;
        let references = docs.outcomes();

        let mut circular = HashSet::new();
        let local_resolved = Expander::new(&docs, Mode::Local).run(&mut circular);
        let remotes_resolved = Expander::new(&docs, Mode::Remote).run(&mut circular);
        let resolved = Expander::new(&docs, Mode::All).run(&mut circular);

        let references = references
            .into_iter()
            .map(|mut outcome| {
                outcome.circular = circular.contains(&outcome.path);
                outcome
            })
            .collect();

        Ok(Resolution {
            original: docs.root,
            local_resolved,
            remotes_resolved,
            resolved,
            references,
        })
    }

    async fn preload(&self, root: Value, base: Option<Url>) -> Documents {
        let mut docs = Documents {
            root,
            base: base.or_else(cwd_url),
            remote: HashMap::new(),
            failed: HashMap::new(),
        };

        let mut queue: VecDeque<String> = collect_refs(&docs.root)
            .into_iter()
            .filter_map(|site| match docs.target_of(&DocId::Root, &site.uri) {
                Ok((DocId::Remote(url), _)) => Some(url),
                _ => None,
            })
            .collect();

        while let Some(location) = queue.pop_front() {
            if docs.remote.contains_key(&location) || docs.failed.contains_key(&location) {
                continue;
            }
            let url = match Url::parse(&location) {
                Ok(url) => url,
                Err(e) => {
                    docs.failed.insert(location, e.to_string());
                    continue;
                }
            };
            match self.loader.load(&url).await {
                Ok(value) => {
                    let doc_id = DocId::Remote(location.clone());
                    for site in collect_refs(&value) {
                        if let Ok((DocId::Remote(next), _)) = docs.target_of(&doc_id, &site.uri) {
                            queue.push_back(next);
                        }
                    }
                    debug!(location = %location, "loaded referenced document");
                    docs.remote.insert(location, value);
                }
                Err(e) => {
                    warn!(location = %location, error = %e, "failed to load referenced document");
                    docs.failed.insert(location, e.to_string());
                }
            }
        }

        docs
    }
}

impl Default for JsonRefResolver {
    fn default() -> Self {
        Self::new(Arc::new(FileLoader))
    }
}

impl std::fmt::Debug for JsonRefResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRefResolver").finish_non_exhaustive()
    }
}

impl ReferenceResolver for JsonRefResolver {
    fn resolve<'a>(
        &'a self,
        document: Value,
        base: Option<Url>,
    ) -> BoxFuture<'a, Result<Resolution, RefError>> {
        Box::pin(self.resolve_document(document, base))
    }
}

/// Convert a base location (URL or filesystem path) into a URL.
pub fn location_to_url(location: &str) -> Result<Url, RefError> {
    if let Ok(url) = Url::parse(location) {
        // Single-letter schemes are Windows drive letters.
        if url.scheme().len() > 1 {
            return Ok(url);
        }
    }
    let path = std::path::Path::new(location);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|source| RefError::Io {
                location: location.to_string(),
                source,
            })?
            .join(path)
    };
    Url::from_file_path(&absolute).map_err(|_| RefError::InvalidUri(location.to_string()))
}

fn cwd_url() -> Option<Url> {
    let dir = std::env::current_dir().ok()?;
    Url::from_directory_path(dir).ok()
}

fn describe_parse_error(e: url::ParseError) -> String {
    match e {
        url::ParseError::EmptyHost => "HTTP URIs must have a host.".to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum DocId {
    Root,
    Remote(String),
}

struct Documents {
    root: Value,
    base: Option<Url>,
    remote: HashMap<String, Value>,
    failed: HashMap<String, String>,
}

impl Documents {
    fn node(&self, doc: &DocId, path: &[String]) -> Option<&Value> {
        let value = match doc {
            DocId::Root => &self.root,
            DocId::Remote(location) => self.remote.get(location)?,
        };
        pointer::get(value, path)
    }

    fn base_of(&self, doc: &DocId) -> Option<Url> {
        match doc {
            DocId::Root => self.base.clone(),
            DocId::Remote(location) => Url::parse(location).ok(),
        }
    }

    /// Where `uri` points when it appears inside `doc`.
    fn target_of(&self, doc: &DocId, uri: &str) -> Result<(DocId, Vec<String>), String> {
        if uri.starts_with('#') {
            let path = pointer::to_path(uri).map_err(|e| e.to_string())?;
            return Ok((doc.clone(), path));
        }

        let mut url = match Url::parse(uri) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = self
                    .base_of(doc)
                    .ok_or_else(|| format!("Cannot resolve relative reference: {uri}"))?;
                base.join(uri).map_err(describe_parse_error)?
            }
            Err(e) => return Err(describe_parse_error(e)),
        };
        let fragment = uri.split_once('#').map(|(_, f)| f).unwrap_or("");
        let path = pointer::to_path(fragment).map_err(|e| e.to_string())?;
        url.set_fragment(None);
        Ok((DocId::Remote(url.to_string()), path))
    }

    /// Follow `$ref` hops along `path` until reaching the node that actually
    /// lives at the target.
    fn canonical(&self, doc: &DocId, path: &[String]) -> Option<(DocId, Vec<String>)> {
        let mut doc = doc.clone();
        let mut resolved: Vec<String> = Vec::new();
        let mut remaining: VecDeque<String> = path.iter().cloned().collect();
        let mut hops = 0;

        while let Some(segment) = remaining.front() {
            let node = self.node(&doc, &resolved)?;
            if let Some(uri) = ref_uri(node) {
                hops += 1;
                if hops > MAX_HOPS {
                    return None;
                }
                let (next_doc, next_path) = self.target_of(&doc, uri).ok()?;
                doc = next_doc;
                resolved = next_path;
                continue;
            }
            resolved.push(segment.clone());
            remaining.pop_front();
        }

        self.node(&doc, &resolved)?;
        Some((doc, resolved))
    }

    fn outcomes(&self) -> Vec<ReferenceOutcome> {
        collect_refs(&self.root)
            .into_iter()
            .map(|site| {
                let mut outcome = ReferenceOutcome {
                    kind: classify(&site.uri),
                    path: site.path,
                    uri: site.uri,
                    missing: false,
                    circular: false,
                    error: None,
                    extra: site.extra,
                };
                match self.target_of(&DocId::Root, &outcome.uri) {
                    Err(message) => {
                        outcome.kind = ReferenceKind::Invalid;
                        outcome.error = Some(message);
                    }
                    Ok((target_doc, target_path)) => {
                        let load_error = match &target_doc {
                            DocId::Remote(location) => self.failed.get(location).cloned(),
                            DocId::Root => None,
                        };
                        if let Some(message) = load_error {
                            outcome.missing = true;
                            outcome.error = Some(message);
                        } else if self.canonical(&target_doc, &target_path).is_none() {
                            outcome.missing = true;
                            outcome.error = Some(format!(
                                "JSON Pointer points to missing location: {}",
                                outcome.uri
                            ));
                        }
                    }
                }
                if outcome.missing {
                    warn!(reference = %outcome.uri, at = %outcome.ptr(), "unresolvable reference");
                }
                outcome
            })
            .collect()
    }
}

fn classify(uri: &str) -> ReferenceKind {
    if uri.starts_with('#') {
        return ReferenceKind::Local;
    }
    match Url::parse(uri) {
        Ok(_) => ReferenceKind::Remote,
        Err(url::ParseError::RelativeUrlWithoutBase) => ReferenceKind::Relative,
        Err(_) => ReferenceKind::Invalid,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Local,
    Remote,
    All,
}

/// Builds one expanded tree from the loaded document set.
struct Expander<'a> {
    docs: &'a Documents,
    mode: Mode,
    /// Reference sites currently being expanded.
    chain: Vec<(DocId, Vec<String>)>,
    /// Finished expansions of targets whose walk met no circular reference.
    expanded: HashMap<(DocId, Vec<String>), Value>,
    /// Circular references met so far.
    hits: usize,
}

impl<'a> Expander<'a> {
    fn new(docs: &'a Documents, mode: Mode) -> Self {
        Self {
            docs,
            mode,
            chain: Vec::new(),
            expanded: HashMap::new(),
            hits: 0,
        }
    }

    fn run(mut self, circular: &mut HashSet<Vec<String>>) -> Value {
        let docs = self.docs;
        let mut location = Vec::new();
        self.expand(&docs.root, &DocId::Root, &mut location, circular)
    }

    fn expand(
        &mut self,
        value: &Value,
        doc: &DocId,
        location: &mut Vec<String>,
        circular: &mut HashSet<Vec<String>>,
    ) -> Value {
        match value {
            Value::Object(map) => {
                if let Some(uri) = ref_uri(value) {
                    return self
                        .follow(uri, doc, location, circular)
                        .unwrap_or_else(|| value.clone());
                }
                let parent = location.last().cloned();
                let mut out = Map::with_capacity(map.len());
                for (key, child) in map {
                    let expanded = if is_opaque(parent.as_deref(), key) {
                        child.clone()
                    } else {
                        location.push(key.clone());
                        let expanded = self.expand(child, doc, location, circular);
                        location.pop();
                        expanded
                    };
                    out.insert(key.clone(), expanded);
                }
                Value::Object(out)
            }
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, child) in items.iter().enumerate() {
                    location.push(i.to_string());
                    out.push(self.expand(child, doc, location, circular));
                    location.pop();
                }
                Value::Array(out)
            }
            _ => value.clone(),
        }
    }

    fn follow(
        &mut self,
        uri: &str,
        doc: &DocId,
        location: &mut Vec<String>,
        circular: &mut HashSet<Vec<String>>,
    ) -> Option<Value> {
        let docs = self.docs;
        let (target_doc, target_path) = docs.target_of(doc, uri).ok()?;
        let inline = *doc != DocId::Root
            || match self.mode {
                Mode::Local => target_doc == DocId::Root,
                Mode::Remote => target_doc != DocId::Root,
                Mode::All => true,
            };
        if !inline {
            return None;
        }

        let (target_doc, target_path) = docs.canonical(&target_doc, &target_path)?;
        let is_circular = (target_doc == *doc && pointer::is_prefix(&target_path, location))
            || self
                .chain
                .iter()
                .any(|(d, l)| *d == target_doc && pointer::is_prefix(&target_path, l));
        if is_circular {
            self.hits += 1;
            if *doc == DocId::Root {
                circular.insert(location.clone());
            }
            return Some(Value::Object(Map::new()));
        }

        // An expansion without circular hits does not depend on the chain.
        let key = (target_doc, target_path);
        if let Some(expanded) = self.expanded.get(&key) {
            return Some(expanded.clone());
        }

        let target = docs.node(&key.0, &key.1)?;
        let hits = self.hits;
        self.chain.push((doc.clone(), location.clone()));
        let mut target_location = key.1.clone();
        let expanded = self.expand(target, &key.0, &mut target_location, circular);
        self.chain.pop();
        if self.hits == hits {
            self.expanded.insert(key, expanded.clone());
        }
        Some(expanded)
    }
}
