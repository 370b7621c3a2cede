use crate::*;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub objective: MatchObjective,
    pub passes: uint,
    pub moves: Vec<CellMove>,
    pub initial_cost: float,
    pub final_cost: float,
}
impl MatchSummary {
    /// Relative objective reduction in percent.
    pub fn improvement(&self) -> float {
        if self.initial_cost.abs() > float::EPSILON {
            (self.initial_cost - self.final_cost) / self.initial_cost * 100.0
        } else {
            0.0
        }
    }
    pub fn print(&self) {
        let mut table = Table::new();
        table.add_row(row!["Matching", "Value"]);
        table.add_row(row!["Objective", self.objective]);
        table.add_row(row!["Passes", self.passes]);
        table.add_row(row!["Moves", self.moves.len()]);
        table.add_row(row!["Initial", format!("{:.3}", self.initial_cost)]);
        table.add_row(row!["Final", format!("{:.3}", self.final_cost)]);
        table.add_row(row!["Improvement", format!("{:.2}%", self.improvement())]);
        table.printstd();
    }
}

/// Members of one colour class, with the lookup structure its strategy needs.
pub struct ClassView {
    members: Vec<CellId>,
    tree: Option<ImmutableKdTree<float, 2>>,
    sweep_pos: Dict<CellId, uint>,
}

/// Matching-based local search: groups of independent same-size cells are
/// permuted over their own locations by a min-cost assignment.
pub struct MatchingOptimizer {
    params: MatchParams,
    rng: StdRng,
    candidates: Vec<CellId>,
    is_candidate: Vec<bool>,
    times_used: Vec<uint>,
    grouped: Vec<bool>,
    grid: CandidateGrid,
    row_edges: RowEdges,
    colors: ColorClasses,
}
impl Default for MatchingOptimizer {
    fn default() -> Self {
        Self::new(MatchParams::default())
    }
}

impl MatchingOptimizer {
    pub fn new(params: MatchParams) -> Self {
        Self {
            rng: StdRng::seed_from_u64(params.seed),
            params,
            candidates: Vec::new(),
            is_candidate: Vec::new(),
            times_used: Vec::new(),
            grouped: Vec::new(),
            grid: CandidateGrid::default(),
            row_edges: RowEdges::default(),
            colors: ColorClasses::default(),
        }
    }
    pub fn params(&self) -> &MatchParams {
        &self.params
    }
    pub fn times_used(&self, cell: CellId) -> uint {
        self.times_used.get(cell).copied().unwrap_or_default()
    }

    // --- Entry points ---

    /// Runs with options from a command line such as `"mis -p 2 -d"`.
    pub fn run(&mut self, ctx: &mut DesignContext, command: &str) -> MatchSummary {
        self.run_args(ctx, &command.split_whitespace().collect_vec())
    }
    pub fn run_args<S: AsRef<str>>(&mut self, ctx: &mut DesignContext, args: &[S]) -> MatchSummary {
        let (params, errors) = parse_args(args.iter().map(AsRef::as_ref));
        for error in &errors {
            warn!(target:"matching", "{error}, keeping the default");
        }
        self.params = params;
        self.run_with(ctx)
    }
    /// Runs with the current parameters.
    #[time("Matching")]
    pub fn run_with(&mut self, ctx: &mut DesignContext) -> MatchSummary {
        self.rng = StdRng::seed_from_u64(self.params.seed);
        self.times_used = vec![0; ctx.num_cells()];
        let initial_cost = self.objective_value(ctx);
        info!(target:"matching",
            "{} strategy {}, objective {}, initial {:.3}",
            "Matching:".bold(),
            self.params.strategy,
            self.params.objective,
            initial_cost
        );

        let mut summary = MatchSummary {
            objective: self.params.objective,
            initial_cost,
            final_cost: initial_cost,
            ..Default::default()
        };
        for pass in 1..=self.params.max_passes {
            let moves = self.run_pass(ctx);
            let cost = self.objective_value(ctx);
            info!(target:"matching", "Pass {pass} of matching; objective is {cost:.3}, {} moves", moves.len());
            let change = (summary.final_cost - cost) / summary.final_cost.abs().max(float::EPSILON);
            summary.passes = pass;
            summary.final_cost = cost;
            let stalled = moves.is_empty();
            summary.moves.extend(moves);
            if stalled || change.abs() <= self.params.tolerance {
                break;
            }
        }
        info!(target:"matching",
            "End of matching; objective is {:.3}, improvement is {}",
            summary.final_cost,
            format!("{:.2}%", summary.improvement()).green()
        );
        summary
    }
    fn objective_value(&self, ctx: &DesignContext) -> float {
        match self.params.objective {
            MatchObjective::Hpwl => ctx.total_hpwl_skipping(self.params.skip_nets_larger_than),
            MatchObjective::Disp => ctx.total_displacement(),
        }
    }
    fn run_pass(&mut self, ctx: &mut DesignContext) -> Vec<CellMove> {
        self.collect_movable_cells(ctx);
        if self.candidates.len() < 2 {
            return Vec::new();
        }
        self.build_grid(ctx);
        self.populate_grid(ctx);
        self.color_cells(ctx);
        self.row_edges = RowEdges::new(ctx);
        self.grouped = vec![false; ctx.num_cells()];

        let classes = if self.params.use_same_color {
            self.colors.classes().to_vec()
        } else {
            vec![self.candidates.clone()]
        };
        let bar = if self.params.verbose {
            let bar = ProgressBar::new(classes.len() as u64);
            if let Ok(style) = ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>5}/{len:5} {msg}") {
                bar.set_style(style.progress_chars("##-"));
            }
            bar
        } else {
            ProgressBar::hidden()
        };
        let mut moves = Vec::new();
        for class in classes {
            moves.extend(self.process_class(ctx, class));
            bar.set_message(format!("{} moves", moves.len()));
            bar.inc(1);
        }
        bar.finish_and_clear();
        self.clear_grid();
        moves
    }

    // --- Candidates ---

    /// Movable single-row cells that still have uses left.
    pub fn collect_movable_cells(&mut self, ctx: &DesignContext) -> &[CellId] {
        if self.times_used.len() != ctx.num_cells() {
            self.times_used = vec![0; ctx.num_cells()];
        }
        self.candidates = (0..ctx.num_cells())
            .filter(|&c| ctx.cell(c).is_movable())
            .filter(|&c| !ctx.is_multi_row(c))
            .filter(|&c| self.times_used[c] < self.params.max_times_used)
            .collect();
        self.is_candidate = vec![false; ctx.num_cells()];
        for &c in &self.candidates {
            self.is_candidate[c] = true;
        }
        &self.candidates
    }
    pub fn build_grid(&mut self, ctx: &DesignContext) {
        self.grid = CandidateGrid::builder()
            .region(ctx.die_dimensions.rect())
            .num_cells(self.candidates.len())
            .occupancy(self.params.bucket_occupancy)
            .build();
        let (nx, ny) = self.grid.dims();
        debug!(target:"matching", "Candidate grid {nx}x{ny}, step {:.3}", self.grid.step());
    }
    pub fn populate_grid(&mut self, ctx: &DesignContext) {
        self.grid.populate(ctx, &self.candidates);
    }
    pub fn clear_grid(&mut self) {
        self.grid.clear();
    }
    pub fn color_cells(&mut self, ctx: &DesignContext) -> &ColorClasses {
        self.colors = color_cells(ctx, &self.candidates, self.params.skip_nets_larger_than);
        &self.colors
    }

    // --- Grouping ---

    fn is_available(&self, cell: CellId) -> bool {
        self.is_candidate[cell]
            && !self.grouped[cell]
            && self.times_used[cell] < self.params.max_times_used
    }
    /// Whether `a` may take the location of `b`.
    fn compatible(&self, ctx: &DesignContext, a: CellId, b: CellId) -> bool {
        let ((wa, ha), (wb, hb)) = (ctx.cell(a).size(), ctx.cell(b).size());
        if self.params.use_same_size {
            wa == wb && ha == hb
        } else {
            ha == hb && wa.max(wb) / wa.min(wb) <= self.params.size_tol
        }
    }
    /// Whether `cell` fits the free span that starts at `loc`.
    fn fits(&self, ctx: &DesignContext, cell: CellId, loc: Vector2) -> bool {
        let (width, height) = ctx.cell(cell).size();
        self.params.use_same_size || loc.0 + width <= self.row_edges.span_end(loc, height) + 1e-9
    }
    fn admits(&self, ctx: &DesignContext, seed: CellId, cell: CellId) -> bool {
        cell != seed
            && self.is_available(cell)
            && (!self.params.use_same_color || self.colors.color_of(cell) == self.colors.color_of(seed))
            && self.compatible(ctx, seed, cell)
    }
    pub fn class_view(&self, ctx: &DesignContext, mut members: Vec<CellId>) -> ClassView {
        let mut tree = None;
        let mut sweep_pos = Dict::new();
        match self.params.strategy {
            GatherStrategy::KdTree => {
                let points: Vec<[float; 2]> = members.iter().map(|&c| ctx.cell(c).pos().into()).collect();
                tree = Some(ImmutableKdTree::new_from_slice(&points));
            }
            GatherStrategy::Colour => {
                members.sort_by_key(|&c| {
                    let (x, y) = ctx.cell(c).pos();
                    (OrderedFloat(y), OrderedFloat(x), c)
                });
                sweep_pos = members.iter().enumerate().map(|(i, &c)| (c, i)).collect();
            }
            GatherStrategy::Binning => {}
        }
        ClassView {
            members,
            tree,
            sweep_pos,
        }
    }
    /// Seed plus up to `max_problem_size - 1` admissible cells near it.
    pub fn gather_neighbours(&self, ctx: &DesignContext, seed: CellId, class: &ClassView) -> Vec<CellId> {
        let limit = self.params.max_problem_size;
        let mut group = vec![seed];
        let seed_pos = ctx.cell(seed).pos();
        match self.params.strategy {
            GatherStrategy::Binning => {
                let center = self
                    .grid
                    .bucket_of(seed)
                    .unwrap_or_else(|| self.grid.bucket_index(seed_pos));
                for radius in 0..=self.params.traversal.min(self.grid.max_radius()) {
                    let mut queue: PriorityQueue<CellId, Reverse<(OrderedFloat<float>, CellId)>> =
                        PriorityQueue::default();
                    for bucket in self.grid.ring(center, radius) {
                        for &cell in self.grid.cells_in(bucket) {
                            if self.admits(ctx, seed, cell) {
                                let dist = norm1(seed_pos, ctx.cell(cell).pos());
                                queue.push(cell, Reverse((OrderedFloat(dist), cell)));
                            }
                        }
                    }
                    while let Some((cell, _)) = queue.pop() {
                        group.push(cell);
                        if group.len() >= limit {
                            return group;
                        }
                    }
                }
            }
            GatherStrategy::KdTree => {
                let (Some(tree), Some(k)) = (&class.tree, NonZero::new(class.members.len().min(4 * limit)))
                else {
                    return group;
                };
                for nearest in tree.nearest_n::<SquaredEuclidean>(&seed_pos.into(), k) {
                    let cell = class.members[nearest.item.uint()];
                    if self.admits(ctx, seed, cell) {
                        group.push(cell);
                        if group.len() >= limit {
                            break;
                        }
                    }
                }
            }
            GatherStrategy::Colour => {
                let start = class.sweep_pos.get(&seed).map_or(0, |&i| i + 1);
                for &cell in &class.members[start.min(class.members.len())..] {
                    if self.admits(ctx, seed, cell) {
                        group.push(cell);
                        if group.len() >= limit {
                            break;
                        }
                    }
                }
            }
        }
        group
    }
    fn process_class(&mut self, ctx: &mut DesignContext, class: Vec<CellId>) -> Vec<CellMove> {
        if class.len() < 2 {
            return Vec::new();
        }
        let view = self.class_view(ctx, class);
        let mut seeds = view.members.clone();
        if self.params.strategy != GatherStrategy::Colour {
            seeds.shuffle(&mut self.rng);
        }
        let mut moves = Vec::new();
        for seed in seeds {
            if !self.is_available(seed) {
                continue;
            }
            let group = self.gather_neighbours(ctx, seed, &view);
            if group.len() < 2 {
                continue;
            }
            for &cell in &group {
                self.grouped[cell] = true;
                self.times_used[cell] += 1;
            }
            if let Some(perm) = self.solve_match(ctx, &group) {
                moves.extend(self.place(ctx, &group, &perm));
            }
        }
        moves
    }

    // --- Costs ---

    /// Wirelength of the counted nets of `cell` with the cell placed at `loc`.
    pub fn get_hpwl(&self, ctx: &DesignContext, cell: CellId, loc: Vector2) -> float {
        ctx.cell(cell)
            .nets()
            .iter()
            .filter(|&&n| ctx.net(n).degree() <= self.params.skip_nets_larger_than)
            .map(|&n| ctx.net_hpwl_with(n, &[(cell, loc)]))
            .sum()
    }
    pub fn get_disp(&self, ctx: &DesignContext, cell: CellId, loc: Vector2) -> float {
        norm1(loc, ctx.cell(cell).orig_pos())
    }
    fn cost(&self, ctx: &DesignContext, cell: CellId, loc: Vector2) -> float {
        match self.params.objective {
            MatchObjective::Hpwl => self.get_hpwl(ctx, cell, loc),
            MatchObjective::Disp => self.get_disp(ctx, cell, loc),
        }
    }
    /// Permutation of `group` over its own locations, restricted to improving
    /// cycles; `None` when nothing improves.
    pub fn solve_match(&self, ctx: &DesignContext, group: &[CellId]) -> Option<Vec<uint>> {
        let n = group.len();
        let locations = group.iter().map(|&c| ctx.cell(c).pos()).collect_vec();
        let rows: Vec<Vec<float>> = group
            .par_iter()
            .map(|&cell| {
                group
                    .iter()
                    .zip(&locations)
                    .map(|(&owner, &loc)| {
                        if owner == cell || (self.compatible(ctx, cell, owner) && self.fits(ctx, cell, loc)) {
                            self.cost(ctx, cell, loc)
                        } else {
                            float::INFINITY
                        }
                    })
                    .collect()
            })
            .collect();
        let costs = Array2::from_shape_fn((n, n), |(i, j)| rows[i][j]);
        let assignment = solve_assignment(&costs)?;

        // cells sharing nets make per-cell wirelength costs overlap
        let joint = self.params.objective == MatchObjective::Hpwl && !self.params.use_same_color;
        let mut accepted: Vec<(CellId, Vector2)> = Vec::new();
        let mut perm = (0..n).collect_vec();
        for cycle in permutation_cycles(&assignment) {
            let identity: float = cycle.iter().map(|&i| costs[[i, i]]).sum();
            let assigned: float = cycle.iter().map(|&i| costs[[i, assignment[i]]]).sum();
            if identity - assigned <= 1e-9 * (1.0 + identity.abs()) {
                continue;
            }
            if joint {
                let moved = cycle.iter().map(|&i| (group[i], locations[assignment[i]])).collect_vec();
                if !self.improves_jointly(ctx, &accepted, &moved) {
                    continue;
                }
                accepted.extend(moved);
            }
            for &i in &cycle {
                perm[i] = assignment[i];
            }
        }
        perm.iter().enumerate().any(|(i, &j)| i != j).then_some(perm)
    }
    /// Exact wirelength gain of `moved` on top of the already `accepted` cycles.
    fn improves_jointly(
        &self,
        ctx: &DesignContext,
        accepted: &[(CellId, Vector2)],
        moved: &[(CellId, Vector2)],
    ) -> bool {
        let nets = moved
            .iter()
            .flat_map(|&(c, _)| ctx.cell(c).nets().iter().copied())
            .filter(|&n| ctx.net(n).degree() <= self.params.skip_nets_larger_than)
            .unique()
            .collect_vec();
        let with_cycle = accepted.iter().chain(moved).copied().collect_vec();
        let before: float = nets.iter().map(|&n| ctx.net_hpwl_with(n, accepted)).sum();
        let after: float = nets.iter().map(|&n| ctx.net_hpwl_with(n, &with_cycle)).sum();
        before - after > 1e-9 * (1.0 + before.abs())
    }
    /// Commits `perm`: cell `i` of `group` takes the location of cell `perm[i]`.
    pub fn place(&mut self, ctx: &mut DesignContext, group: &[CellId], perm: &[uint]) -> Vec<CellMove> {
        let locations = group.iter().map(|&c| ctx.cell(c).pos()).collect_vec();
        let moves = (0..group.len())
            .filter(|&i| perm[i] != i)
            .map(|i| CellMove::new(group[i], locations[i], locations[perm[i]]))
            .collect_vec();
        for mv in &moves {
            ctx.move_cell(mv.cell, mv.to);
            self.grid.relocate(mv.cell, mv.to);
        }
        debug!(target:"matching", "Group of {} committed {} moves", group.len(), moves.len());
        moves
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strip_design() -> DesignContext {
        let die = DieSize::builder()
            .x_upper_right(100.0)
            .y_upper_right(10.0)
            .build();
        DesignContext::new(die, 10.0)
    }
    fn sorted_positions(ctx: &DesignContext) -> Vec<(OrderedFloat<float>, OrderedFloat<float>)> {
        ctx.cells()
            .iter()
            .filter(|c| c.is_movable())
            .map(|c| (OrderedFloat(c.x), OrderedFloat(c.y)))
            .sorted()
            .collect()
    }

    #[test]
    fn cells_at_anchor_are_not_swapped() {
        let mut ctx = strip_design();
        ctx.add_cell("a", (0.0, 0.0), (4.0, 10.0), false);
        ctx.add_cell("b", (10.0, 0.0), (4.0, 10.0), false);
        let summary = MatchingOptimizer::default().run(&mut ctx, "mis -d");
        assert!(summary.moves.is_empty());
        assert!(ctx.cell(0).pos() == (0.0, 0.0));
    }

    #[test]
    fn swap_restores_displacement_anchors() {
        let mut ctx = strip_design();
        let a = ctx.add_cell("a", (0.0, 0.0), (4.0, 10.0), false);
        let b = ctx.add_cell("b", (10.0, 0.0), (4.0, 10.0), false);
        ctx.set_orig_pos(a, (10.0, 0.0));
        ctx.set_orig_pos(b, (0.0, 0.0));
        let summary = MatchingOptimizer::default().run(&mut ctx, "-d");
        assert!(summary.moves.len() == 2);
        assert!(ctx.total_displacement() == 0.0);
        assert!(summary.final_cost == 0.0 && summary.initial_cost == 20.0);
    }

    #[test]
    fn swap_reduces_wirelength() {
        let mut ctx = strip_design();
        let a = ctx.add_cell("a", (0.0, 0.0), (4.0, 10.0), false);
        let b = ctx.add_cell("b", (50.0, 0.0), (4.0, 10.0), false);
        let right = ctx.add_cell("right", (96.0, 0.0), (4.0, 10.0), true);
        let left = ctx.add_cell("left", (0.0, 0.0), (0.0, 0.0), true);
        ctx.add_net("na", &[(a, (2.0, 5.0)), (right, (2.0, 5.0))]);
        ctx.add_net("nb", &[(b, (2.0, 5.0)), (left, (0.0, 5.0))]);
        for strategy in ["binning", "kdtree", "colour"] {
            let mut ctx = ctx.clone();
            let before = ctx.total_hpwl();
            let summary = MatchingOptimizer::default().run(&mut ctx, &format!("-g {strategy}"));
            assert!(summary.moves.len() == 2);
            assert!(ctx.cell(a).pos() == (50.0, 0.0));
            assert!(ctx.total_hpwl() < before);
        }
    }

    #[test]
    fn optimal_placement_is_left_alone() {
        for strategy in ["0", "1", "2"] {
            let mut ctx = synthetic_design().seed(21).call();
            let before = ctx.clone();
            let summary = MatchingOptimizer::default().run(&mut ctx, &format!("-d -p 3 -g {strategy}"));
            assert!(summary.moves.is_empty());
            assert!(ctx.cells().iter().zip(before.cells()).all(|(a, b)| a.pos() == b.pos()));
        }
    }

    #[test]
    fn matching_permutes_locations_and_never_worsens() {
        let mut ctx = synthetic_design().seed(13).call();
        let locations = sorted_positions(&ctx);
        let mut optimizer = MatchingOptimizer::default();
        let summary = optimizer.run(&mut ctx, "mis -p 4 -t 0");
        assert!(!summary.moves.is_empty());
        assert!(summary.final_cost <= summary.initial_cost);
        assert_eq!(locations, sorted_positions(&ctx));

        let cells = ctx.cells();
        for i in 0..cells.len() {
            for j in i + 1..cells.len() {
                assert!(cells[i].rect().intersection_area(&cells[j].rect()) == 0.0);
            }
        }
        let max_used = optimizer.params().max_times_used;
        assert!((0..ctx.num_cells()).all(|c| optimizer.times_used(c) <= max_used));
    }

    #[test]
    fn seeded_runs_are_deterministic() {
        let base = synthetic_design().seed(30).call();
        let (mut a, mut b) = (base.clone(), base);
        let first = MatchingOptimizer::default().run(&mut a, "-p 2 --seed 5 -g kdtree");
        let second = MatchingOptimizer::default().run(&mut b, "-p 2 --seed 5 -g kdtree");
        assert_eq!(first.moves, second.moves);
    }

    #[test]
    fn bad_options_fall_back() {
        let mut ctx = synthetic_design().seed(2).call();
        let mut optimizer = MatchingOptimizer::default();
        optimizer.run_args(&mut ctx, &["mis", "-g", "9", "-n", "zero", "-q"]);
        assert!(optimizer.params().strategy == GatherStrategy::Binning);
        assert!(optimizer.params().max_problem_size == 15);
    }

    #[test]
    fn fixed_and_multi_row_cells_are_not_candidates() {
        let mut ctx = strip_design();
        ctx.die_dimensions = DieSize::builder()
            .x_upper_right(100.0)
            .y_upper_right(20.0)
            .build();
        ctx.add_cell("a", (0.0, 0.0), (4.0, 10.0), false);
        ctx.add_cell("tall", (10.0, 0.0), (4.0, 20.0), false);
        ctx.add_cell("fixed", (20.0, 0.0), (4.0, 10.0), true);
        let mut optimizer = MatchingOptimizer::default();
        assert!(optimizer.collect_movable_cells(&ctx) == [0]);
    }

    #[test]
    fn group_members_share_colour_and_size() {
        let ctx = synthetic_design().seed(8).call();
        let mut optimizer = MatchingOptimizer::default();
        optimizer.collect_movable_cells(&ctx);
        optimizer.build_grid(&ctx);
        optimizer.populate_grid(&ctx);
        optimizer.color_cells(&ctx);
        optimizer.grouped = vec![false; ctx.num_cells()];
        let seed = optimizer.candidates[0];
        let view = optimizer.class_view(&ctx, optimizer.candidates.clone());
        let group = optimizer.gather_neighbours(&ctx, seed, &view);
        assert!(group.len() >= 2 && group.len() <= 15);
        assert!(group.iter().all_unique());
        for &cell in &group {
            assert!(optimizer.colors.color_of(cell) == optimizer.colors.color_of(seed));
            assert!(ctx.cell(cell).size() == ctx.cell(seed).size());
        }
    }

    #[test]
    fn metric_follows_matching_moves() {
        let mut ctx = synthetic_design().density(0.8).seed(17).call();
        let params = AbuParams::builder().bin_rows(1.0).target_util(0.7).build();
        let mut metric = UtilizationMetric::new(&ctx, params);
        let summary = MatchingOptimizer::default().run(&mut ctx, "-a -s 1.5 -p 2");
        metric.delta(&ctx, &summary.moves);
        metric.accept();
        assert!(approx_eq(metric.curr(), metric.measure_abu(&ctx, false), 1e-9));
    }

    fn no_overlaps(ctx: &DesignContext) -> bool {
        let cells = ctx.cells();
        (0..cells.len()).all(|i| {
            (i + 1..cells.len()).all(|j| cells[i].rect().intersection_area(&cells[j].rect()) == 0.0)
        })
    }

    #[test]
    fn wider_cell_never_takes_a_narrower_slot() {
        let mut ctx = strip_design();
        let a = ctx.add_cell("a", (0.0, 0.0), (3.0, 10.0), false);
        let b = ctx.add_cell("b", (50.0, 0.0), (2.0, 10.0), false);
        ctx.set_orig_pos(a, (50.0, 0.0));
        ctx.set_orig_pos(b, (0.0, 0.0));

        let mut blocked = ctx.clone();
        blocked.add_cell("block", (52.0, 0.0), (4.0, 10.0), true);
        let summary = MatchingOptimizer::default().run(&mut blocked, "-d -a -s 1.5");
        assert!(summary.moves.is_empty());
        assert!(no_overlaps(&blocked));

        ctx.add_cell("block", (60.0, 0.0), (4.0, 10.0), true);
        let summary = MatchingOptimizer::default().run(&mut ctx, "-d -a -s 1.5");
        assert!(summary.moves.len() == 2);
        assert!(ctx.cell(a).pos() == (50.0, 0.0));
        assert!(no_overlaps(&ctx));
    }

    #[test]
    fn approximate_sizes_keep_placement_legal() {
        for strategy in ["binning", "kdtree", "colour"] {
            let mut ctx = synthetic_design().density(0.8).seed(17).call();
            assert!(no_overlaps(&ctx));
            let summary =
                MatchingOptimizer::default().run(&mut ctx, &format!("-a -s 1.5 -p 3 -g {strategy}"));
            assert!(summary.final_cost <= summary.initial_cost);
            assert!(no_overlaps(&ctx));
            let die = ctx.die_dimensions.rect();
            assert!(ctx.cells().iter().all(|c| c.x + c.width <= die.xmax + 1e-9));
        }
    }

    #[test]
    fn uncoloured_groups_reject_swaps_on_shared_nets() {
        let die = DieSize::builder()
            .x_upper_right(100.0)
            .y_upper_right(20.0)
            .build();
        let mut ctx = DesignContext::new(die, 10.0);
        let a = ctx.add_cell("a", (0.0, 0.0), (4.0, 10.0), false);
        let b = ctx.add_cell("b", (40.0, 0.0), (4.0, 10.0), false);
        let pa = ctx.add_cell("pa", (0.0, 10.0), (1.0, 10.0), true);
        let pb = ctx.add_cell("pb", (40.0, 10.0), (1.0, 10.0), true);
        ctx.add_net("ab0", &[(a, (2.0, 5.0)), (b, (2.0, 5.0))]);
        ctx.add_net("ab1", &[(a, (2.0, 5.0)), (b, (2.0, 5.0))]);
        ctx.add_net("na", &[(a, (2.0, 5.0)), (pa, (0.5, 5.0))]);
        ctx.add_net("nb", &[(b, (2.0, 5.0)), (pb, (0.5, 5.0))]);
        assert!(ctx.total_hpwl() == 103.0);

        for command in ["-nc -t 0", "-t 0"] {
            let mut ctx = ctx.clone();
            let summary = MatchingOptimizer::default().run(&mut ctx, command);
            assert!(summary.moves.is_empty());
            assert!(ctx.total_hpwl() == 103.0);
            assert!(ctx.cell(a).pos() == (0.0, 0.0));
        }
    }

    #[test]
    fn uncoloured_groups_still_take_real_gains() {
        let mut ctx = synthetic_design().seed(13).call();
        let before = ctx.total_hpwl();
        let summary = MatchingOptimizer::default().run(&mut ctx, "-nc -p 3 -t 0 -k 1000");
        assert!(summary.final_cost <= summary.initial_cost);
        assert!(ctx.total_hpwl() <= before + 1e-9);
        assert!(no_overlaps(&ctx));
    }
}
