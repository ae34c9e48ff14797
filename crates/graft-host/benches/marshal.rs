use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use graft_host::objects;
use graft_sdk::{build_value, release, unpack, Handle};

fn bench_unpack(c: &mut Criterion) {
    graft_host::install();
    let mut group = c.benchmark_group("unpack");

    let ints = objects::tuple((0..3).map(objects::int).collect());
    group.bench_with_input(BenchmarkId::new("ints", 3), &ints, |b, args| {
        b.iter(|| unpack::<(i32, i32, i32)>(black_box(args.as_ptr())))
    });

    let mixed = objects::tuple(vec![
        objects::int(7),
        objects::float(2.5),
        objects::string("graft"),
        objects::tuple(vec![objects::int(1), objects::int(2)]),
    ]);
    group.bench_with_input(BenchmarkId::new("mixed", 4), &mixed, |b, args| {
        b.iter(|| unpack::<(i64, f64, String, (u8, u16))>(black_box(args.as_ptr())))
    });

    group.finish();
}

fn bench_build(c: &mut Criterion) {
    graft_host::install();
    let mut group = c.benchmark_group("build_value");

    group.bench_function("single", |b| {
        b.iter(|| unsafe { release(build_value(black_box(&(42i64,)))) })
    });

    let shared: Handle = objects::string("shared");
    group.bench_function("nested", |b| {
        b.iter(|| {
            let values = (1i32, (2.5f64, String::from("x")), shared.clone());
            unsafe { release(build_value(black_box(&values))) }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_unpack, bench_build);
criterion_main!(benches);
