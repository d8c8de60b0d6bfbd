use std::sync::{Arc, Barrier};
use std::thread;

use proptest::prelude::*;
use stgen_templates::{
    BuiltinTemplateStore, FsTemplateStore, LayeredTemplateStore, MemoryTemplateStore,
    TemplateCache, TemplateError, TemplateStore,
};

/// Wraps a memory store so tests can read its load counter after the cache
/// has taken ownership.
struct Shared(Arc<MemoryTemplateStore>);

impl TemplateStore for Shared {
    fn load(&self, key: &stgen_templates::TemplateKey) -> Result<String, TemplateError> {
        self.0.load(key)
    }

    fn describe(&self) -> String {
        self.0.describe()
    }
}

#[test]
fn concurrent_cold_resolution_compiles_once() {
    let store = Arc::new(
        MemoryTemplateStore::new().with("AI", "default", "{{ variable_name }} := {{ hard_channel }};"),
    );
    let cache = TemplateCache::new(Shared(Arc::clone(&store)));
    let barrier = Barrier::new(2);

    let templates: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..2)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    cache.resolve("AI", "default").expect("resolve")
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("thread"))
            .collect()
    });

    assert!(Arc::ptr_eq(&templates[0], &templates[1]));
    let stats = cache.get_statistics();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.total_requests, 2);
    assert_eq!(store.loads(), 1);
    assert_eq!(stats.lifetime_compilations, 1);
}

#[test]
fn filesystem_store_reads_type_directories() {
    let dir = tempfile::tempdir().expect("tempdir");
    let ai_dir = dir.path().join("AI");
    std::fs::create_dir_all(&ai_dir).expect("mkdir");
    std::fs::write(ai_dir.join("v2.tera"), "(* v2 *) {{ variable_name }}").expect("write");

    let cache = TemplateCache::new(FsTemplateStore::new(dir.path()));
    let template = cache.resolve("ai", "v2").expect("resolve");
    assert_eq!(template.key().to_string(), "AI/v2");

    let err = cache.resolve("AI", "v3").unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("v3.tera"), "{err}");
}

#[test]
fn layered_store_prefers_filesystem_override() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir_all(dir.path().join("DI")).expect("mkdir");
    std::fs::write(dir.path().join("DI/default.tera"), "OVERRIDE {{ variable_name }}").expect("write");

    let store = LayeredTemplateStore::with_builtin_fallback(dir.path());
    let di = store
        .load(&stgen_templates::TemplateKey::new("DI", "default"))
        .expect("DI");
    assert!(di.starts_with("OVERRIDE"));
    let ai = store
        .load(&stgen_templates::TemplateKey::new("AI", "default"))
        .expect("AI");
    assert_eq!(ai, BuiltinTemplateStore::source("AI").expect("builtin AI"));
}

#[derive(Debug, Clone)]
enum Op {
    Resolve(usize),
    Invalidate(usize),
    Clear,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (0usize..4).prop_map(Op::Resolve),
        1 => (0usize..4).prop_map(Op::Invalidate),
        1 => Just(Op::Clear),
    ]
}

const TAGS: [&str; 4] = ["AI", "DI", "DO", "MISSING"];

proptest! {
    #[test]
    fn hits_plus_misses_equals_requests(ops in proptest::collection::vec(op(), 0..64)) {
        let cache = TemplateCache::new(
            MemoryTemplateStore::new()
                .with("AI", "default", "{{ a }}")
                .with("DI", "default", "{{ b }}")
                .with("DO", "default", "{{ c }}"),
        );
        for op in ops {
            match op {
                Op::Resolve(i) => { let _ = cache.resolve(TAGS[i], "default"); }
                Op::Invalidate(i) => { cache.invalidate(TAGS[i], "default"); }
                Op::Clear => cache.clear(),
            }
            let stats = cache.get_statistics();
            prop_assert_eq!(stats.hits + stats.misses, stats.total_requests);
            prop_assert!(stats.lifetime_requests >= stats.total_requests);
            prop_assert!(stats.total_entries <= 3);
        }
    }
}

#[test]
fn statistics_snapshot_serializes_for_reporting() {
    let cache = TemplateCache::new(BuiltinTemplateStore);
    cache.resolve("DI", "default").expect("resolve");
    cache.resolve("di", "default").expect("resolve");
    cache.clear();

    let value = serde_json::to_value(cache.get_statistics()).expect("serialize");
    assert_eq!(value["total_requests"], 0);
    assert_eq!(value["lifetime_requests"], 2);
    assert_eq!(value["lifetime_compilations"], 1);
    assert_eq!(value["eviction_policy"], "none");
    assert!(value["last_cleanup"].is_string());
    assert!(value["entries_by_type"].as_object().is_some_and(|map| map.is_empty()));
}
