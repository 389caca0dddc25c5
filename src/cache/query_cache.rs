use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use super::backend::CacheStats;
use super::memory_backend::MemoryBackend;
use super::multilevel::MultiLevelCache;
use super::ttl_backend::TtlBackend;
use crate::config::QueryCacheConfig;

/// One positional or keyword argument contributing to a default cache key.
/// `Id` mirrors the source's "prefer `.id` over `str()`" rule for any
/// argument exposing an id attribute.
#[derive(Debug, Clone)]
pub enum KeyPart {
    Str(String),
    Id(Uuid),
}

impl KeyPart {
    fn render(&self) -> String {
        match self {
            KeyPart::Str(s) => s.clone(),
            KeyPart::Id(id) => id.to_string(),
        }
    }
}

type KeyGenerator = Box<dyn Fn(&[KeyPart], &[(String, KeyPart)]) -> String + Send + Sync>;

/// Builds the default stable key: op name, then positional args in order,
/// then keyword args sorted by name — so two calls differing only in
/// keyword insertion order produce the same key (spec §4.4, P9).
///
/// Grounded in `advanced_caching.py`'s default key builder: op name +
/// positional args (preferring `.id`) + kwargs sorted by key (preferring
/// `.id`), joined by `:`.
pub fn default_key(op: &str, args: &[KeyPart], kwargs: &[(String, KeyPart)]) -> String {
    let mut parts = vec![op.to_string()];
    parts.extend(args.iter().map(KeyPart::render));

    let mut sorted_kwargs: Vec<&(String, KeyPart)> = kwargs.iter().collect();
    sorted_kwargs.sort_by(|a, b| a.0.cmp(&b.0));
    parts.extend(
        sorted_kwargs
            .into_iter()
            .map(|(k, v)| format!("{k}:{}", v.render())),
    );

    parts.join(":")
}

/// Fills `{name}` placeholders in a pattern template from a context map.
/// Returns `None` (logged at warn by the caller) if any placeholder has no
/// matching context entry — spec §4.4's InvalidationTemplateFailure.
fn fill_template(template: &str, ctx: &HashMap<String, String>) -> Option<String> {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        let Some(end) = rest[start..].find('}') else {
            result.push_str(rest);
            return Some(result);
        };
        let end = start + end;
        let name = &rest[start + 1..end];
        let value = ctx.get(name)?;
        result.push_str(&rest[..start]);
        result.push_str(value);
        rest = &rest[end + 1..];
    }
    result.push_str(rest);
    Some(result)
}

struct Tables {
    rules: HashMap<String, Vec<String>>,
    generators: HashMap<String, KeyGenerator>,
}

/// Operation-keyed façade over a [`MultiLevelCache`] (C4). Values are
/// erased to `Vec<u8>` (JSON) internally so one generic cache can back
/// heterogeneously-typed operation results — the boundary is grounded in
/// `contracts/.../cache.rs`'s `set<T: Serialize>`/`get<T: DeserializeOwned>`.
pub struct QueryCache {
    cache: MultiLevelCache<Vec<u8>>,
    tables: Mutex<Tables>,
}

impl QueryCache {
    pub fn new(config: &QueryCacheConfig) -> Self {
        let cache = MultiLevelCache::new(vec![
            Box::new(MemoryBackend::new(config.lru_capacity)),
            Box::new(TtlBackend::new(config.ttl_capacity, config.ttl_default)),
        ]);

        Self {
            cache,
            tables: Mutex::new(Tables {
                rules: HashMap::new(),
                generators: HashMap::new(),
            }),
        }
    }

    fn key_for(&self, op: &str, args: &[KeyPart], kwargs: &[(String, KeyPart)]) -> String {
        let tables = self.tables.lock().expect("query cache tables mutex poisoned");
        match tables.generators.get(op) {
            Some(generator) => generator(args, kwargs),
            None => default_key(op, args, kwargs),
        }
    }

    pub fn lookup<T: DeserializeOwned>(
        &self,
        op: &str,
        args: &[KeyPart],
        kwargs: &[(String, KeyPart)],
    ) -> Option<T> {
        let key = self.key_for(op, args, kwargs);
        let bytes = self.cache.get(&key)?;
        serde_json::from_slice(&bytes).ok()
    }

    pub fn store<T: Serialize>(
        &self,
        op: &str,
        args: &[KeyPart],
        kwargs: &[(String, KeyPart)],
        value: &T,
        ttl: Option<Duration>,
    ) {
        let key = self.key_for(op, args, kwargs);
        if let Ok(bytes) = serde_json::to_vec(value) {
            self.cache.set(&key, bytes, ttl);
        }
    }

    pub fn register_key_generator(&self, op: &str, generator: KeyGenerator) {
        let mut tables = self.tables.lock().expect("query cache tables mutex poisoned");
        tables.generators.insert(op.to_string(), generator);
    }

    pub fn register_invalidation_rule(&self, event: &str, patterns: Vec<String>) {
        let mut tables = self.tables.lock().expect("query cache tables mutex poisoned");
        tables.rules.entry(event.to_string()).or_default().extend(patterns);
    }

    /// Fires an invalidation event: every registered pattern template for
    /// `event` is filled from `ctx` and deleted from every cache level.
    /// A template with a missing substitution key is skipped (logged at
    /// warn) without aborting the rest (spec §4.4).
    pub fn invalidate_on_event(&self, event: &str, ctx: &HashMap<String, String>) -> usize {
        let templates = {
            let tables = self.tables.lock().expect("query cache tables mutex poisoned");
            tables.rules.get(event).cloned().unwrap_or_default()
        };

        let mut total = 0;
        for template in templates {
            match fill_template(&template, ctx) {
                Some(pattern) => total += self.cache.delete_pattern(&pattern),
                None => {
                    tracing::warn!(event, template, "invalidation template missing context key, skipping");
                }
            }
        }
        total
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    pub fn stats(&self) -> Vec<CacheStats> {
        self.cache.stats_per_level()
    }
}
