//! Watched object store
//!
//! Enumeration and annotation updates for the objects a `StatusAlert`
//! watches. The Kubernetes implementation works on `DynamicObject`s so any
//! kind can be watched without compiling its type in.

use super::object::WatchedObject;
use super::types::{Error, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use kube::api::{Api, DynamicObject, ListParams, Patch, PatchParams};
use kube::core::GroupVersionKind;
use kube::discovery::{ApiResource, Scope};
use kube::Client;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::{debug, warn};

/// List/update access to watched objects
#[async_trait]
pub trait WatchedObjectStore: Send + Sync {
    /// Every object of the watched kind, optionally restricted to one namespace
    async fn list(&self, namespace: Option<&str>) -> Result<Vec<WatchedObject>>;

    /// Merge `annotations` into the object's metadata
    async fn patch_annotations(
        &self,
        object: &WatchedObject,
        annotations: BTreeMap<String, String>,
    ) -> Result<()>;
}

/// A watched kind resolved through discovery
#[derive(Debug, Clone)]
pub struct ResolvedKind {
    pub resource: ApiResource,
    pub namespaced: bool,
}

/// Split `group/version` (or a bare core `version`) and attach `kind`
pub fn parse_gvk(api_version: &str, kind: &str) -> Result<GroupVersionKind> {
    let api_version = api_version.trim();
    let kind = kind.trim();
    if kind.is_empty() {
        return Err(Error::ConfigError("watchKind must not be empty".to_string()));
    }

    let (group, version) = match api_version.split_once('/') {
        Some((group, version)) => (group, version),
        None => ("", api_version),
    };
    if version.is_empty() || version.contains('/') || (api_version.contains('/') && group.is_empty()) {
        return Err(Error::ConfigError(format!(
            "Invalid apiVersion '{api_version}'"
        )));
    }

    Ok(GroupVersionKind::gvk(group, version, kind))
}

/// Resolve a kind through discovery, caching the answer per `apiVersion/kind`
pub async fn resolve_kind(
    client: &Client,
    cache: &DashMap<String, ResolvedKind>,
    api_version: &str,
    kind: &str,
) -> Result<ResolvedKind> {
    let cache_key = format!("{api_version}/{kind}");
    if let Some(resolved) = cache.get(&cache_key) {
        return Ok(resolved.clone());
    }

    let gvk = parse_gvk(api_version, kind)?;
    let (resource, capabilities) = kube::discovery::pinned_kind(client, &gvk)
        .await
        .map_err(|source| Error::Discovery {
            api_version: api_version.to_string(),
            kind: kind.to_string(),
            source,
        })?;

    let resolved = ResolvedKind {
        resource,
        namespaced: capabilities.scope == Scope::Namespaced,
    };
    debug!(
        api_version = %api_version,
        kind = %kind,
        plural = %resolved.resource.plural,
        namespaced = resolved.namespaced,
        "Resolved watched kind"
    );
    cache.insert(cache_key, resolved.clone());
    Ok(resolved)
}

/// Watched objects served by the Kubernetes API
pub struct KubeObjectStore {
    client: Client,
    kind: ResolvedKind,
    page_size: u32,
}

impl KubeObjectStore {
    pub fn new(client: Client, kind: ResolvedKind, page_size: u32) -> Self {
        Self {
            client,
            kind,
            page_size,
        }
    }

    fn api_for(&self, namespace: Option<&str>) -> Api<DynamicObject> {
        match namespace {
            Some(ns) if self.kind.namespaced => {
                Api::namespaced_with(self.client.clone(), ns, &self.kind.resource)
            }
            _ => Api::all_with(self.client.clone(), &self.kind.resource),
        }
    }
}

#[async_trait]
impl WatchedObjectStore for KubeObjectStore {
    async fn list(&self, namespace: Option<&str>) -> Result<Vec<WatchedObject>> {
        if namespace.is_some() && !self.kind.namespaced {
            warn!(
                kind = %self.kind.resource.kind,
                "Namespace filter ignored for cluster-scoped kind"
            );
        }

        let api = self.api_for(namespace);
        let mut params = ListParams::default().limit(self.page_size);
        let mut objects = Vec::new();

        loop {
            let page = api.list(&params).await?;
            for item in &page.items {
                match WatchedObject::from_dynamic(item) {
                    Ok(object) => objects.push(object),
                    Err(e) => warn!(error = %e, "Skipping watched object without a name"),
                }
            }

            match page.metadata.continue_.as_deref() {
                Some(token) if !token.is_empty() => {
                    params = params.continue_token(token);
                }
                _ => break,
            }
        }

        Ok(objects)
    }

    async fn patch_annotations(
        &self,
        object: &WatchedObject,
        annotations: BTreeMap<String, String>,
    ) -> Result<()> {
        let namespace = (!object.namespace.is_empty()).then_some(object.namespace.as_str());
        let api = self.api_for(namespace);
        let patch = json!({
            "metadata": {
                "annotations": annotations
            }
        });

        api.patch(&object.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }
}

/// Watched objects held in process memory, keyed by `namespace/name`
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<BTreeMap<String, WatchedObject>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, object: WatchedObject) {
        if let Ok(mut objects) = self.objects.lock() {
            objects.insert(object.qualified_name(), object);
        }
    }

    /// Change the observed state of a stored object
    pub fn set_state(&self, namespace: &str, name: &str, state: &str) {
        if let Ok(mut objects) = self.objects.lock() {
            if let Some(object) = objects.get_mut(&format!("{namespace}/{name}")) {
                object.state = state.to_string();
            }
        }
    }

    pub fn get(&self, namespace: &str, name: &str) -> Option<WatchedObject> {
        self.objects
            .lock()
            .ok()
            .and_then(|objects| objects.get(&format!("{namespace}/{name}")).cloned())
    }
}

#[async_trait]
impl WatchedObjectStore for InMemoryObjectStore {
    async fn list(&self, namespace: Option<&str>) -> Result<Vec<WatchedObject>> {
        let objects = self
            .objects
            .lock()
            .map_err(|_| Error::Store("object store lock poisoned".to_string()))?;
        Ok(objects
            .values()
            .filter(|object| namespace.map_or(true, |ns| object.namespace == ns))
            .cloned()
            .collect())
    }

    async fn patch_annotations(
        &self,
        object: &WatchedObject,
        annotations: BTreeMap<String, String>,
    ) -> Result<()> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| Error::Store("object store lock poisoned".to_string()))?;
        let stored = objects
            .get_mut(&object.qualified_name())
            .ok_or_else(|| Error::Store(format!("{} not found", object.qualified_name())))?;
        stored.annotations.extend(annotations);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_grouped_api_version() {
        let gvk = parse_gvk("example.com/v1", "TestObject").unwrap();
        assert_eq!(gvk.group, "example.com");
        assert_eq!(gvk.version, "v1");
        assert_eq!(gvk.kind, "TestObject");
    }

    #[test]
    fn test_parse_core_api_version() {
        let gvk = parse_gvk("v1", "Pod").unwrap();
        assert_eq!(gvk.group, "");
        assert_eq!(gvk.version, "v1");
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        assert!(parse_gvk("example.com/v1/extra", "TestObject").is_err());
        assert!(parse_gvk("example.com/", "TestObject").is_err());
        assert!(parse_gvk("/v1", "TestObject").is_err());
        assert!(parse_gvk("example.com/v1", "  ").is_err());
    }

    #[tokio::test]
    async fn test_in_memory_store_filters_and_patches() {
        let store = InMemoryObjectStore::new();
        store.insert(WatchedObject::new("default", "a", "Running", ""));
        store.insert(WatchedObject::new("other", "b", "Failed", ""));

        assert_eq!(store.list(None).await.unwrap().len(), 2);
        let scoped = store.list(Some("other")).await.unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].name, "b");

        let mut annotations = BTreeMap::new();
        annotations.insert("key".to_string(), "value".to_string());
        store
            .patch_annotations(&scoped[0], annotations)
            .await
            .unwrap();
        assert_eq!(
            store.get("other", "b").unwrap().annotations.get("key"),
            Some(&"value".to_string())
        );

        let missing = WatchedObject::new("default", "missing", "", "");
        assert!(store
            .patch_annotations(&missing, BTreeMap::new())
            .await
            .is_err());
    }
}
