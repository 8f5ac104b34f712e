use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rift_http_mock::{m, Pattern, PatternKind, Request, Router, RouterConfig};

fn build_router(route_count: usize) -> Router {
    let router = Router::with_config(RouterConfig {
        assert_all_mocked: false,
        base_url: Some("https://api.example.com/v1/".to_string()),
        ..Default::default()
    })
    .unwrap();
    for i in 0..route_count {
        router
            .get(format!("/endpoint{i}/").as_str())
            .unwrap()
            .respond(200);
    }
    router
}

fn request(path: &str) -> Request {
    Request::get(&format!("https://api.example.com/v1{path}")).unwrap()
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");

    for route_count in [10, 100, 500].iter() {
        let router = build_router(*route_count);

        let first = request("/endpoint0/");
        let last = request(&format!("/endpoint{}/", route_count - 1));
        let none = request("/not/found/");

        group.throughput(Throughput::Elements(1));
        for (name, req) in [("match_first", &first), ("match_last", &last), ("match_none", &none)] {
            group.bench_with_input(BenchmarkId::new(name, route_count), route_count, |b, _| {
                b.iter(|| {
                    let resolved = router.resolve(black_box(req));
                    // keep call logs from growing across iterations
                    router.reset();
                    resolved
                });
            });
        }
    }

    group.finish();
}

fn bench_pattern_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("pattern_matching");
    let request = Request::get("https://api.example.com/v1/users/42/?page=2&sort=name")
        .unwrap()
        .header("x-api-key", "secret");

    let exact = m!(method = "GET", url = "https://api.example.com/v1/users/42/?page=2&sort=name")
        .unwrap();
    let regex = Pattern::regex(PatternKind::Path, r"^/v1/users/(?P<id>\d+)/$").unwrap()
        & Pattern::method("GET");
    let items = m!(params__contains = "page=2", headers__contains = [("x-api-key", "secret")])
        .unwrap();

    group.throughput(Throughput::Elements(1));
    group.bench_function("exact_url", |b| b.iter(|| exact.matches(black_box(&request))));
    group.bench_function("regex_path", |b| b.iter(|| regex.matches(black_box(&request))));
    group.bench_function("multi_items", |b| b.iter(|| items.matches(black_box(&request))));

    group.finish();
}

criterion_group!(benches, bench_resolve, bench_pattern_matching);
criterion_main!(benches);
