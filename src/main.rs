use detailed_place::*;
use log::{Level, LevelFilter};
use pretty_env_logger::formatted_builder;

fn init_logger_with_target_filter() {
    formatted_builder()
        .filter_level(LevelFilter::Info)
        .filter_module("abu", LevelFilter::Warn)
        .init();
}

#[builder]
fn perform_refinement<'a, 'b>(
    ctx: &'a mut DesignContext,
    abu_params: AbuParams,
    command: &'b str,
    #[builder(default = true)] report: bool,
) -> MatchSummary {
    let mut metric = UtilizationMetric::new(ctx, abu_params);
    let mut hpwl = HpwlObjective::new(ctx);
    if report {
        metric.calculate_abu(ctx, true);
    }
    info!(
        "Scaled HPWL before matching: {:.3}",
        metric.scaled_hpwl(hpwl.curr())
    );

    let summary = MatchingOptimizer::default().run(ctx, command);

    // the moves are already committed; replay them through both cost terms
    let objectives: [&mut dyn DetailedObjective; 2] = [&mut metric, &mut hpwl];
    for objective in objectives {
        let change = objective.delta(ctx, &summary.moves);
        objective.accept();
        info!("{} changed by {:.6}, now {:.6}", objective.name(), change, objective.curr());
    }
    info!(
        "Scaled HPWL after matching: {:.3}",
        metric.scaled_hpwl(hpwl.curr())
    );

    let measured = metric.measure_abu(ctx, report);
    if approx_eq(measured, metric.curr(), 1e-9) {
        info!("Incremental ABU agrees with a full recomputation");
    } else {
        warn!(
            "Incremental ABU {:.9} differs from full recomputation {:.9}",
            metric.curr(),
            measured
        );
    }
    summary
}

fn main() {
    init_logger_with_target_filter();
    let tmr = timer!(Level::Info; "Detailed placement refinement");
    let mut ctx = synthetic_design()
        .width(600.0)
        .height(300.0)
        .density(0.75)
        .num_fixed(4)
        .seed(2024)
        .call();
    let abu_params = AbuParams::builder().bin_rows(3.0).target_util(0.7).build();

    let summary = perform_refinement()
        .ctx(&mut ctx)
        .abu_params(abu_params.clone())
        .command("mis -p 4 -t 0.001 -g binning -v")
        .call();
    summary.print();

    let summary = perform_refinement()
        .ctx(&mut ctx)
        .abu_params(abu_params)
        .command("mis -d -a -s 1.5 -g colour")
        .report(false)
        .call();
    summary.print();
    finish!(tmr);
}
