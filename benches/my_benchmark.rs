use criterion::{black_box, criterion_group, criterion_main, Criterion};
use detailed_place::*;

fn shifted_moves(ctx: &DesignContext, count: uint) -> Vec<CellMove> {
    ctx.cells()
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_movable())
        .take(count)
        .map(|(id, c)| CellMove::new(id, c.pos(), (c.x + 1.0, c.y)))
        .collect()
}

fn abu_updates(c: &mut Criterion) {
    let ctx = synthetic_design().width(600.0).height(300.0).seed(1).call();
    let moves = shifted_moves(&ctx, 4);
    let mut metric = UtilizationMetric::new(&ctx, AbuParams::builder().bin_rows(2.0).build());

    let mut group = c.benchmark_group("abu");
    group
        .warm_up_time(std::time::Duration::from_millis(300))
        .measurement_time(std::time::Duration::from_secs(1));
    group.bench_function("delta_reject", |b| {
        b.iter(|| {
            let change = metric.delta(&ctx, black_box(&moves));
            metric.reject();
            change
        })
    });
    group.bench_function("measure", |b| b.iter(|| metric.measure_abu(black_box(&ctx), false)));
    group.finish();
}

fn matching(c: &mut Criterion) {
    let base = synthetic_design().width(400.0).height(200.0).seed(3).call();
    let mut group = c.benchmark_group("matching");
    group.sample_size(10);
    for strategy in ["binning", "kdtree", "colour"] {
        group.bench_function(strategy, |b| {
            b.iter_batched(
                || base.clone(),
                |mut ctx| MatchingOptimizer::default().run(&mut ctx, &format!("mis -g {strategy}")),
                criterion::BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, abu_updates, matching);
criterion_main!(benches);
