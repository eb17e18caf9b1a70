use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sim::{execute, RunOptions, ScenarioConfig};
use track_eval::{load_run, Dataset, RunMetrics};

fn make_run(dir: &std::path::Path, steps: u32) {
    let config = ScenarioConfig {
        name: "clutter".into(),
        p_detect: 0.9,
        clutter_prob: 0.25,
        steps,
        ..Default::default()
    };
    execute(&config, &RunOptions::default(), dir).unwrap();
}

fn bench_join_and_metrics(c: &mut Criterion) {
    let tmp = tempfile::tempdir().unwrap();
    let mut group = c.benchmark_group("join_metrics");

    for steps in [250, 800, 5000] {
        let dir = tmp.path().join(format!("run_{steps}"));
        make_run(&dir, steps);

        group.bench_function(format!("{steps}_steps_load"), |b| {
            b.iter(|| black_box(load_run(&dir).unwrap()));
        });

        let run = load_run(&dir).unwrap();
        group.bench_function(format!("{steps}_steps_metrics"), |b| {
            b.iter(|| black_box(RunMetrics::compute(&run.records)));
        });
        group.bench_function(format!("{steps}_steps_dataset"), |b| {
            b.iter(|| {
                let mut ds = Dataset::new();
                ds.extend_run(&run);
                black_box(ds.len())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_join_and_metrics);
criterion_main!(benches);
