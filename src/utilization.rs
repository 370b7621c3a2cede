use crate::*;

pub const NUM_UTIL_BUCKETS: uint = 10;
const BAND_FRACTIONS: [float; 4] = [0.02, 0.05, 0.10, 0.20];
const BAND_WEIGHTS: [float; 4] = [10.0, 4.0, 2.0, 1.0];
const BAND_LABELS: [&str; 4] = ["ABU2", "ABU5", "ABU10", "ABU20"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddSub {
    Add,
    Sub,
}
impl AddSub {
    fn sign(self) -> float {
        match self {
            AddSub::Add => 1.0,
            AddSub::Sub => -1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
pub struct AbuParams {
    /// Bin edge in rows, ignored when `grid_unit` is set.
    #[builder(default = 9.0)]
    pub bin_rows: float,
    pub grid_unit: Option<float>,
    #[builder(default = 1.0)]
    pub target_util: float,
    /// Targets for the 2%, 5%, 10% and 20% bands.
    pub band_targets: Option<[float; 4]>,
    #[builder(default = 0.2)]
    pub free_space_threshold: float,
    #[builder(default = 0.2)]
    pub bin_area_threshold: float,
    #[builder(default = 1.0)]
    pub alpha: float,
}
impl Default for AbuParams {
    fn default() -> Self {
        Self::builder().build()
    }
}
impl AbuParams {
    fn resolved_targets(&self) -> (float, [float; 4]) {
        let base = if self.target_util.is_finite() && self.target_util > 0.0 {
            self.target_util
        } else {
            warn!(target:"abu", "Target utilization {} is not positive, using 1.0", self.target_util);
            1.0
        };
        let bands = match self.band_targets {
            None => [base; 4],
            Some(bands) => {
                let ordered = bands.iter().all(|t| t.is_finite() && *t >= base)
                    && bands.windows(2).all(|w| w[0] >= w[1]);
                if ordered {
                    bands
                } else {
                    warn!(target:"abu", "Band targets {:?} are out of order, using {} for every band", bands, base);
                    [base; 4]
                }
            }
        };
        (base, bands)
    }
    fn resolved_unit(&self, row_height: float, die: &DieSize) -> float {
        let unit = self.grid_unit.unwrap_or(self.bin_rows * row_height);
        if unit.is_finite() && unit > 0.0 {
            unit
        } else {
            warn!(target:"abu", "Bin unit {} is degenerate, using a single bin", unit);
            die.width().max(die.height()).max(1.0)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DensityBin {
    pub id: uint,
    pub lx: float,
    pub hx: float,
    pub ly: float,
    pub hy: float,
    pub area: float,
    pub m_util: float,
    pub c_util: float,
    pub f_util: float,
    pub free_space: float,
}
impl DensityBin {
    pub fn rect(&self) -> Rect {
        Rect::from_bbox([[self.lx, self.ly], [self.hx, self.hy]])
    }
    fn refresh_free_space(&mut self) {
        self.free_space = self.area - self.f_util - self.m_util;
    }
}

/// Band utilizations and the penalty derived from them.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AbuReport {
    pub penalty: float,
    pub abu: [float; 4],
    pub band_sizes: [uint; 4],
    pub num_bins: uint,
    pub num_eligible: uint,
}

/// Average-bin-utilization penalty over a uniform bin grid, with
/// speculative updates that are either accepted or rolled back.
#[derive(Debug, Clone)]
pub struct UtilizationMetric {
    params: AbuParams,
    region: Rect,
    grid_unit: float,
    grid_num_x: uint,
    grid_num_y: uint,
    target_util: float,
    band_targets: [float; 4],
    bins: Vec<DensityBin>,
    eligible: Vec<bool>,
    num_eligible: uint,
    util_buckets: Vec<BTreeSet<uint>>,
    util_totals: Vec<float>,
    bucket_of: Vec<uint>,
    bucket_util: Vec<float>,
    changed_bins: Vec<uint>,
    changed_mask: Vec<bool>,
    curr_penalty: float,
    pending: Option<float>,
}

impl UtilizationMetric {
    pub fn new(ctx: &DesignContext, params: AbuParams) -> Self {
        let mut metric = Self {
            params,
            region: Rect::default(),
            grid_unit: 0.0,
            grid_num_x: 0,
            grid_num_y: 0,
            target_util: 1.0,
            band_targets: [1.0; 4],
            bins: Vec::new(),
            eligible: Vec::new(),
            num_eligible: 0,
            util_buckets: Vec::new(),
            util_totals: Vec::new(),
            bucket_of: Vec::new(),
            bucket_util: Vec::new(),
            changed_bins: Vec::new(),
            changed_mask: Vec::new(),
            curr_penalty: 0.0,
            pending: None,
        };
        metric.init(ctx);
        metric
    }

    #[time("Initialize ABU grid")]
    pub fn init(&mut self, ctx: &DesignContext) {
        let die = ctx.die_dimensions;
        self.region = die.rect();
        self.grid_unit = self.params.resolved_unit(ctx.row_height, &die);
        (self.target_util, self.band_targets) = self.params.resolved_targets();
        self.grid_num_x = (die.width() / self.grid_unit).ceil().uint().max(1);
        self.grid_num_y = (die.height() / self.grid_unit).ceil().uint().max(1);

        let (nx, ny, unit, region) = (self.grid_num_x, self.grid_num_y, self.grid_unit, self.region);
        let edge = |i: uint, n: uint, lo: float, hi: float| {
            if i == n {
                hi
            } else {
                lo + i.float() * unit
            }
        };
        self.bins = (0..nx * ny)
            .map(|id| {
                let (ix, iy) = (id % nx, id / nx);
                let lx = edge(ix, nx, region.xmin, region.xmax);
                let hx = edge(ix + 1, nx, region.xmin, region.xmax);
                let ly = edge(iy, ny, region.ymin, region.ymax);
                let hy = edge(iy + 1, ny, region.ymin, region.ymax);
                let area = (hx - lx).max(0.0) * (hy - ly).max(0.0);
                DensityBin {
                    id,
                    lx,
                    hx,
                    ly,
                    hy,
                    area,
                    free_space: area,
                    ..Default::default()
                }
            })
            .collect();
        let num_bins = self.bins.len();
        self.eligible = vec![false; num_bins];
        self.changed_mask = vec![false; num_bins];
        self.changed_bins.clear();
        self.bucket_of = vec![0; num_bins];
        self.bucket_util = vec![0.0; num_bins];
        self.util_buckets = vec![BTreeSet::new(); NUM_UTIL_BUCKETS];
        self.util_totals = vec![0.0; NUM_UTIL_BUCKETS];
        self.pending = None;

        self.compute_utils(ctx);
        self.compute_buckets();
        self.curr_penalty = self.evaluate().penalty;
        info!(target:"abu",
            "ABU grid {}x{} (unit {:.3}), {} eligible bins, penalty {:.6}",
            nx, ny, unit, self.num_eligible, self.curr_penalty
        );
    }

    // --- Bin bookkeeping ---

    /// Bin index range covering `rect`, padded by one bin on each side.
    fn bin_span(&self, rect: &Rect) -> (uint, uint, uint, uint) {
        let index = |v: float, lo: float, n: uint| {
            (((v - lo) / self.grid_unit).floor().max(0.0).uint()).min(n - 1)
        };
        let ix0 = index(rect.xmin, self.region.xmin, self.grid_num_x).saturating_sub(1);
        let ix1 = (index(rect.xmax, self.region.xmin, self.grid_num_x) + 1).min(self.grid_num_x - 1);
        let iy0 = index(rect.ymin, self.region.ymin, self.grid_num_y).saturating_sub(1);
        let iy1 = (index(rect.ymax, self.region.ymin, self.grid_num_y) + 1).min(self.grid_num_y - 1);
        (ix0, ix1, iy0, iy1)
    }
    fn overlapping_bins(&self, rect: &Rect) -> Vec<(uint, float)> {
        let Some(clipped) = rect.intersection(&self.region) else {
            return Vec::new();
        };
        let (ix0, ix1, iy0, iy1) = self.bin_span(&clipped);
        (iy0..=iy1)
            .cartesian_product(ix0..=ix1)
            .map(|(iy, ix)| iy * self.grid_num_x + ix)
            .filter_map(|id| {
                let overlap = self.bins[id].rect().intersection_area(&clipped);
                (overlap > 0.0).then_some((id, overlap))
            })
            .collect()
    }
    pub fn clear_utils(&mut self) {
        for bin in &mut self.bins {
            bin.m_util = 0.0;
            bin.c_util = 0.0;
            bin.f_util = 0.0;
            bin.refresh_free_space();
        }
        self.eligible.fill(false);
        self.num_eligible = 0;
        self.clear_bins();
    }
    pub fn compute_utils(&mut self, ctx: &DesignContext) {
        self.clear_utils();
        for cell in ctx.cells() {
            for (id, overlap) in self.overlapping_bins(&cell.rect()) {
                let bin = &mut self.bins[id];
                if cell.fixed {
                    bin.f_util += overlap;
                } else {
                    bin.m_util += overlap;
                }
            }
        }
        let min_area = self.params.bin_area_threshold * self.grid_unit * self.grid_unit;
        let free_threshold = self.params.free_space_threshold;
        for bin in &mut self.bins {
            bin.f_util = bin.f_util.min(bin.area);
            bin.c_util = bin.m_util;
            bin.refresh_free_space();
            self.eligible[bin.id] = bin.area > 0.0
                && bin.area >= min_area
                && bin.area - bin.f_util > free_threshold * bin.area;
        }
        self.num_eligible = self.eligible.iter().filter(|&&e| e).count();
        if self.num_eligible == 0 {
            warn!(target:"abu", "No bin passes the eligibility thresholds, penalty is always 0");
        }
    }
    /// Applies or removes the footprint of `cell` placed at lower-left `(x, y)`.
    pub fn update_bins(&mut self, cell: &Cell, x: float, y: float, add_sub: AddSub) {
        debug_assert!(cell.is_movable(), "fixed cell {} passed to update_bins", cell.name);
        for (id, overlap) in self.overlapping_bins(&cell.rect_at((x, y))) {
            if !self.changed_mask[id] {
                self.changed_mask[id] = true;
                self.changed_bins.push(id);
            }
            let bin = &mut self.bins[id];
            bin.m_util += add_sub.sign() * overlap;
            bin.refresh_free_space();
            self.rebucket(id);
        }
    }
    pub fn accept_bins(&mut self) {
        for &id in &self.changed_bins {
            self.bins[id].c_util = self.bins[id].m_util;
        }
        self.clear_bins();
    }
    pub fn reject_bins(&mut self) {
        let changed = std::mem::take(&mut self.changed_bins);
        for &id in &changed {
            let bin = &mut self.bins[id];
            bin.m_util = bin.c_util;
            bin.refresh_free_space();
            self.rebucket(id);
        }
        self.changed_bins = changed;
        self.clear_bins();
    }
    pub fn clear_bins(&mut self) {
        for &id in &self.changed_bins {
            self.changed_mask[id] = false;
        }
        self.changed_bins.clear();
    }

    // --- Occupancy buckets ---

    pub fn occupancy(&self, id: uint) -> float {
        if self.eligible[id] {
            let bin = &self.bins[id];
            bin.m_util / (bin.area - bin.f_util)
        } else {
            0.0
        }
    }
    pub fn get_bucket_id(&self, id: uint, occ: float) -> uint {
        if !self.eligible[id] || !(occ > 0.0) {
            0
        } else {
            ((occ * NUM_UTIL_BUCKETS.float()).floor().uint()).min(NUM_UTIL_BUCKETS - 1)
        }
    }
    pub fn clear_buckets(&mut self) {
        self.util_buckets.iter_mut().for_each(BTreeSet::clear);
        self.util_totals.fill(0.0);
    }
    pub fn compute_buckets(&mut self) {
        self.clear_buckets();
        for id in 0..self.bins.len() {
            let occ = self.occupancy(id);
            let bucket = self.get_bucket_id(id, occ);
            self.util_buckets[bucket].insert(id);
            self.util_totals[bucket] += occ;
            self.bucket_of[id] = bucket;
            self.bucket_util[id] = occ;
        }
    }
    fn rebucket(&mut self, id: uint) {
        let occ = self.occupancy(id);
        let old = self.bucket_of[id];
        let new = self.get_bucket_id(id, occ);
        self.util_totals[old] -= self.bucket_util[id];
        self.util_totals[new] += occ;
        if old != new {
            self.util_buckets[old].remove(&id);
            self.util_buckets[new].insert(id);
            self.bucket_of[id] = new;
        }
        self.bucket_util[id] = occ;
    }

    // --- Penalty ---

    fn band_sizes(&self) -> [uint; 4] {
        let n = self.num_eligible.max(1);
        BAND_FRACTIONS.map(|f| (f * n.float()).ceil().uint().clamp(1, n))
    }
    /// `sorted` holds eligible occupancies in descending order, at least the top 20% band.
    fn report_from_sorted(&self, sorted: &[float]) -> AbuReport {
        let mut report = AbuReport {
            num_bins: self.bins.len(),
            num_eligible: self.num_eligible,
            ..Default::default()
        };
        if self.num_eligible == 0 {
            return report;
        }
        report.band_sizes = self.band_sizes();
        let mut weighted = 0.0;
        for k in 0..4 {
            let count = report.band_sizes[k];
            debug_assert!(sorted.len() >= count);
            report.abu[k] = sorted[..count].iter().sum::<float>() / count.float();
            weighted += BAND_WEIGHTS[k] * (report.abu[k] / self.band_targets[k] - 1.0).max(0.0);
        }
        report.penalty = weighted / BAND_WEIGHTS.iter().sum::<float>();
        report
    }
    /// Full evaluation over every eligible bin.
    pub fn evaluate(&self) -> AbuReport {
        let sorted = (0..self.bins.len())
            .filter(|&id| self.eligible[id])
            .map(|id| self.occupancy(id))
            .sorted_unstable_by(|a, b| b.total_cmp(a))
            .collect_vec();
        self.report_from_sorted(&sorted)
    }
    /// Penalty from the top buckets only, enough to fill the widest band.
    fn bucket_penalty(&self) -> float {
        if self.num_eligible == 0 {
            return 0.0;
        }
        let needed = self.band_sizes()[3];
        let mut sorted = Vec::with_capacity(needed);
        for bucket in self.util_buckets.iter().rev() {
            let mut values = bucket
                .iter()
                .filter(|&&id| self.eligible[id])
                .map(|&id| self.occupancy(id))
                .collect_vec();
            values.sort_unstable_by(|a, b| b.total_cmp(a));
            sorted.extend(values);
            if sorted.len() >= needed {
                break;
            }
        }
        self.report_from_sorted(&sorted).penalty
    }

    #[time("Calculate ABU")]
    pub fn calculate_abu(&mut self, ctx: &DesignContext, print: bool) -> float {
        debug_assert!(
            self.pending.is_none(),
            "calculate_abu called with an outstanding speculative move"
        );
        self.compute_utils(ctx);
        self.compute_buckets();
        let report = self.evaluate();
        if print {
            self.print_report(&report);
        }
        self.curr_penalty = report.penalty;
        report.penalty
    }
    /// From-scratch penalty of the live placement; leaves this metric untouched.
    pub fn measure_abu(&self, ctx: &DesignContext, print: bool) -> float {
        let scratch = Self::new(ctx, self.params.clone());
        let report = scratch.evaluate();
        if print {
            scratch.print_report(&report);
        }
        report.penalty
    }
    pub fn print_report(&self, report: &AbuReport) {
        let mut table = Table::new();
        table.add_row(row!["Band", "Bins", "Utilization", "Target", "Weight", "Overflow"]);
        for k in 0..4 {
            let label = BAND_LABELS[k];
            let target = self.band_targets[k];
            let overflow = (report.abu[k] / target - 1.0).max(0.0);
            table.add_row(row![
                label,
                report.band_sizes[k],
                format!("{:.4}", report.abu[k]),
                format!("{:.4}", target),
                BAND_WEIGHTS[k],
                format!("{:.4}", overflow)
            ]);
        }
        table.printstd();

        let mut histogram = Table::new();
        histogram.add_row(row!["Occupancy", "Bins", "Total"]);
        for (b, bucket) in self.util_buckets.iter().enumerate() {
            let range = format!(
                "[{:.1}, {:.1})",
                b.float() / NUM_UTIL_BUCKETS.float(),
                (b + 1).float() / NUM_UTIL_BUCKETS.float()
            );
            histogram.add_row(row![range, bucket.len(), format!("{:.3}", self.util_totals[b])]);
        }
        histogram.printstd();
        info!(target:"abu",
            "ABU penalty {} over {}/{} eligible bins",
            format!("{:.6}", report.penalty).bold(),
            report.num_eligible,
            report.num_bins
        );
    }

    // --- Accessors ---

    pub fn params(&self) -> &AbuParams {
        &self.params
    }
    pub fn free_space_threshold(&self) -> float {
        self.params.free_space_threshold
    }
    pub fn bin_area_threshold(&self) -> float {
        self.params.bin_area_threshold
    }
    pub fn alpha(&self) -> float {
        self.params.alpha
    }
    pub fn target_util(&self) -> float {
        self.target_util
    }
    pub fn band_targets(&self) -> [float; 4] {
        self.band_targets
    }
    /// HPWL inflated by the current penalty.
    pub fn scaled_hpwl(&self, hpwl: float) -> float {
        hpwl * (1.0 + self.params.alpha * self.curr_penalty)
    }
    pub fn grid_unit(&self) -> float {
        self.grid_unit
    }
    pub fn grid_dims(&self) -> (uint, uint) {
        (self.grid_num_x, self.grid_num_y)
    }
    pub fn bins(&self) -> &[DensityBin] {
        &self.bins
    }
    pub fn is_eligible(&self, id: uint) -> bool {
        self.eligible[id]
    }
    pub fn num_eligible(&self) -> uint {
        self.num_eligible
    }
    pub fn bucket_members(&self, bucket: uint) -> &BTreeSet<uint> {
        &self.util_buckets[bucket]
    }
    pub fn bucket_of(&self, id: uint) -> uint {
        self.bucket_of[id]
    }
    pub fn bucket_total(&self, bucket: uint) -> float {
        self.util_totals[bucket]
    }
    pub fn changed_bins(&self) -> &[uint] {
        &self.changed_bins
    }
}

impl DetailedObjective for UtilizationMetric {
    fn name(&self) -> &str {
        "abu"
    }
    fn curr(&self) -> float {
        self.curr_penalty
    }
    fn delta(&mut self, ctx: &DesignContext, moves: &[CellMove]) -> float {
        debug_assert!(
            self.pending.is_none(),
            "delta called with an outstanding speculative move"
        );
        for mv in moves {
            let cell = ctx.cell(mv.cell);
            if !cell.is_movable() {
                continue;
            }
            self.update_bins(cell, mv.from.0, mv.from.1, AddSub::Sub);
            self.update_bins(cell, mv.to.0, mv.to.1, AddSub::Add);
        }
        let penalty = self.bucket_penalty();
        self.pending = Some(penalty);
        penalty - self.curr_penalty
    }
    fn accept(&mut self) {
        self.accept_bins();
        self.curr_penalty = match self.pending.take() {
            Some(penalty) => penalty,
            None => self.bucket_penalty(),
        };
    }
    fn reject(&mut self) {
        self.reject_bins();
        self.pending = None;
    }
}
