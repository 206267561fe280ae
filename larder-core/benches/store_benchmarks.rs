/*!
Performance benchmarks for the workbench store.

Every mutation rewrites the whole store file, so these measure how persist
and load costs grow with the number and size of stored workspaces.
*/

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use larder_core::{
    open_store, BodyAspect, HeaderAspect, HeaderEntry, MemoryStorage, NoCompression, Request,
    RequestAspect, StoreConfig, WorkbenchStore, Workspace,
};
use tempfile::TempDir;

// Workspace with `requests` open requests carrying headers and a body
fn generate_workspace(name: &str, requests: usize) -> Workspace {
    let mut workspace = Workspace::new(name);
    for i in 0..requests {
        let headers = (0..5)
            .map(|h| HeaderEntry::new(format!("X-Header-{h}"), format!("value-{i}-{h}")))
            .collect();
        workspace.open_request(
            Request::new(format!("request {i}"))
                .with_aspect(RequestAspect::Headers(HeaderAspect { entries: headers }))
                .with_aspect(RequestAspect::Body(BodyAspect {
                    content_type: Some("application/json".to_string()),
                    body: format!(r#"{{"index":{i},"payload":"{}"}}"#, "x".repeat(256)),
                })),
        );
    }
    workspace
}

fn memory_store() -> WorkbenchStore {
    WorkbenchStore::open(
        Box::new(MemoryStorage::new()),
        Box::new(NoCompression::new()),
        "bench.db",
    )
    .unwrap()
}

fn benchmark_persist_workspace(c: &mut Criterion) {
    let mut group = c.benchmark_group("persist_workspace");

    for requests in [1, 10, 100].iter() {
        group.throughput(Throughput::Elements(*requests as u64));

        group.bench_with_input(BenchmarkId::new("memory", requests), requests, |b, &requests| {
            let store = memory_store();
            let mut workspace = generate_workspace("bench", requests);
            store.persist_workspace(&mut workspace).unwrap();

            b.iter(|| store.persist_workspace(black_box(&mut workspace)).unwrap());
        });

        group.bench_with_input(BenchmarkId::new("local_gzip", requests), requests, |b, &requests| {
            let temp_dir = TempDir::new().unwrap();
            let store = open_store(&StoreConfig::at_path(temp_dir.path().join("bench.db"))).unwrap();
            let mut workspace = generate_workspace("bench", requests);
            store.persist_workspace(&mut workspace).unwrap();

            b.iter(|| store.persist_workspace(black_box(&mut workspace)).unwrap());
        });
    }

    group.finish();
}

fn benchmark_load_workspace(c: &mut Criterion) {
    let mut group = c.benchmark_group("load_workspace");

    for stored in [1, 50, 500].iter() {
        let store = memory_store();
        for i in 0..*stored {
            store
                .persist_workspace(&mut generate_workspace(&format!("workspace {i}"), 5))
                .unwrap();
        }
        let target = format!("workspace {}", stored - 1);

        group.bench_with_input(BenchmarkId::new("by_name", stored), &target, |b, target| {
            b.iter(|| {
                black_box(store.load_workspace_by_name(black_box(target)).unwrap());
            });
        });

        group.bench_with_input(BenchmarkId::new("names", stored), stored, |b, _| {
            b.iter(|| black_box(store.list_workspace_names().unwrap()));
        });
    }

    group.finish();
}

fn benchmark_reopen(c: &mut Criterion) {
    let mut group = c.benchmark_group("reopen");

    let temp_dir = TempDir::new().unwrap();
    let config = StoreConfig::at_path(temp_dir.path().join("reopen.db"));
    let store = open_store(&config).unwrap();
    for i in 0..100 {
        store
            .persist_workspace(&mut generate_workspace(&format!("workspace {i}"), 10))
            .unwrap();
    }
    store.close().unwrap();

    group.bench_function("local_gzip_100_workspaces", |b| {
        b.iter(|| {
            let store = open_store(black_box(&config)).unwrap();
            store.close().unwrap();
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_persist_workspace,
    benchmark_load_workspace,
    benchmark_reopen
);
criterion_main!(benches);
