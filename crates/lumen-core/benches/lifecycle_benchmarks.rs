use criterion::{criterion_group, criterion_main, Criterion};
use lumen_core::{EngineHost, HostOptions};
use lumen_runtime::{AppContext, MockBackend};
use lumen_schema::{baseline_batch, EngineSettings, FatalPolicy};

fn mock_host() -> EngineHost {
    let options = HostOptions {
        fatal_policy: FatalPolicy::Return,
        ..HostOptions::default()
    };
    EngineHost::new(Box::new(MockBackend::new()), options)
}

fn bench_full_cycle(c: &mut Criterion) {
    let host = mock_host();
    let ctx = AppContext::default();
    c.bench_function("host_create_init_destroy_mock", |b| {
        b.iter(|| {
            host.create(&ctx).unwrap();
            host.apply_profile(1).unwrap();
            host.init().unwrap();
            host.destroy().unwrap();
        });
    });
}

fn bench_dispatch(c: &mut Criterion) {
    let host = mock_host();
    host.create(&AppContext::default()).unwrap();
    host.init().unwrap();
    c.bench_function("host_dispatch_seek", |b| {
        b.iter(|| host.dispatch(&["seek", "5", "relative"]).unwrap());
    });

    let args: Vec<String> = (0..128).map(|i| format!("arg{i}")).collect();
    c.bench_function("host_dispatch_128_args", |b| {
        b.iter(|| host.dispatch(&args).unwrap());
    });
    host.destroy().unwrap();
}

fn bench_profile_switch(c: &mut Criterion) {
    let host = mock_host();
    host.create(&AppContext::default()).unwrap();
    let mut index = 0i64;
    c.bench_function("host_apply_profile_rotate", |b| {
        b.iter(|| {
            host.apply_profile(index % 3).unwrap();
            index += 1;
        });
    });
    host.destroy().unwrap();
}

fn bench_baseline_batch(c: &mut Criterion) {
    let settings = EngineSettings::default();
    c.bench_function("baseline_batch_build", |b| {
        b.iter(|| baseline_batch(&settings, None));
    });
}

criterion_group!(
    benches,
    bench_full_cycle,
    bench_dispatch,
    bench_profile_switch,
    bench_baseline_batch
);
criterion_main!(benches);
