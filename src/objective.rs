use crate::*;

/// A proposed (or committed) relocation of one cell, lower-left corners.
#[derive(Debug, Clone, Copy, PartialEq, new, Serialize, Deserialize)]
pub struct CellMove {
    pub cell: CellId,
    pub from: Vector2,
    pub to: Vector2,
}

/// Cost term the outer move loop composes.
///
/// Every `delta` must be followed by exactly one `accept` or `reject` before the
/// next `delta`. `delta` returns `new - curr()`, so a negative value is an improvement.
pub trait DetailedObjective {
    fn name(&self) -> &str;
    fn curr(&self) -> float;
    fn delta(&mut self, ctx: &DesignContext, moves: &[CellMove]) -> float;
    fn accept(&mut self);
    fn reject(&mut self);
}

/// Plain half-perimeter wirelength over all nets.
#[derive(Debug, Clone)]
pub struct HpwlObjective {
    curr: float,
    pending: Option<float>,
}
impl HpwlObjective {
    pub fn new(ctx: &DesignContext) -> Self {
        Self {
            curr: ctx.total_hpwl(),
            pending: None,
        }
    }
}
impl DetailedObjective for HpwlObjective {
    fn name(&self) -> &str {
        "hpwl"
    }
    fn curr(&self) -> float {
        self.curr
    }
    fn delta(&mut self, ctx: &DesignContext, moves: &[CellMove]) -> float {
        debug_assert!(
            self.pending.is_none(),
            "delta called with an outstanding speculative move"
        );
        // first `from` and last `to` per cell, so committed moves can be replayed
        let mut start: Vec<(CellId, Vector2)> = Vec::new();
        let mut end: Vec<(CellId, Vector2)> = Vec::new();
        for m in moves {
            if !start.iter().any(|(c, _)| *c == m.cell) {
                start.push((m.cell, m.from));
            }
            match end.iter_mut().find(|(c, _)| *c == m.cell) {
                Some(last) => last.1 = m.to,
                None => end.push((m.cell, m.to)),
            }
        }
        let nets = start
            .iter()
            .flat_map(|&(c, _)| ctx.cell(c).nets().iter().copied())
            .unique()
            .collect_vec();
        let old: float = nets.iter().map(|&n| ctx.net_hpwl_with(n, &start)).sum();
        let new: float = nets.iter().map(|&n| ctx.net_hpwl_with(n, &end)).sum();
        let change = new - old;
        self.pending = Some(self.curr + change);
        change
    }
    fn accept(&mut self) {
        if let Some(value) = self.pending.take() {
            self.curr = value;
        }
    }
    fn reject(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hpwl_delta_accept_tracks_total() {
        let die = DieSize::builder()
            .x_upper_right(40.0)
            .y_upper_right(10.0)
            .build();
        let mut ctx = DesignContext::new(die, 10.0);
        let a = ctx.add_cell("a", (0.0, 0.0), (2.0, 10.0), false);
        let b = ctx.add_cell("b", (30.0, 0.0), (2.0, 10.0), false);
        ctx.add_net("n", &[(a, (1.0, 5.0)), (b, (1.0, 5.0))]);

        let mut objective = HpwlObjective::new(&ctx);
        assert!(objective.curr() == 30.0);

        let moves = [CellMove::new(a, (0.0, 0.0), (20.0, 0.0))];
        let change = objective.delta(&ctx, &moves);
        assert!(change == -20.0);
        objective.reject();
        assert!(objective.curr() == 30.0);

        objective.delta(&ctx, &moves);
        objective.accept();
        ctx.apply_moves(&moves);
        assert!(objective.curr() == ctx.total_hpwl());
    }

    #[test]
    fn hpwl_replays_committed_moves() {
        let mut ctx = synthetic_design().seed(4).call();
        let mut objective = HpwlObjective::new(&ctx);
        let summary = MatchingOptimizer::default().run(&mut ctx, "-p 3 -t 0");
        objective.delta(&ctx, &summary.moves);
        objective.accept();
        assert!(approx_eq(objective.curr(), ctx.total_hpwl(), 1e-9));
    }
}
