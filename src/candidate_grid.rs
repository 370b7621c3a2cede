use crate::*;

#[derive(Debug, Clone, Default)]
pub struct Bucket {
    pub cells: BTreeSet<CellId>,
}

/// Coarse uniform grid over the region; cells are binned by lower-left corner.
#[derive(Debug, Clone, Default)]
pub struct CandidateGrid {
    region: Rect,
    step: float,
    num_x: uint,
    num_y: uint,
    buckets: Vec<Bucket>,
    cell_bucket: Dict<CellId, uint>,
}

#[bon]
impl CandidateGrid {
    /// Step is chosen so a bucket holds about `occupancy` of `num_cells` cells.
    #[builder]
    pub fn new(region: Rect, num_cells: uint, #[builder(default = 8.0)] occupancy: float) -> Self {
        let step = (region.area() * occupancy / num_cells.max(1).float()).sqrt();
        let step = if step.is_finite() && step > 0.0 {
            step
        } else {
            region.width().max(region.height()).max(1.0)
        };
        let num_x = (region.width() / step).ceil().uint().max(1);
        let num_y = (region.height() / step).ceil().uint().max(1);
        let buckets = vec![Bucket::default(); num_x * num_y];
        Self {
            region,
            step,
            num_x,
            num_y,
            buckets,
            cell_bucket: Dict::new(),
        }
    }
    pub fn populate(&mut self, ctx: &DesignContext, cells: &[CellId]) {
        self.clear();
        for &cell in cells {
            let bucket = self.bucket_index(ctx.cell(cell).pos());
            self.buckets[bucket].cells.insert(cell);
            self.cell_bucket.insert(cell, bucket);
        }
    }
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.cells.clear();
        }
        self.cell_bucket.clear();
    }
    /// Bucket containing `pos`, clamped to the grid.
    pub fn bucket_index(&self, pos: Vector2) -> uint {
        let index = |v: float, lo: float, n: uint| ((v - lo) / self.step).floor().max(0.0).uint().min(n - 1);
        let ix = index(pos.0, self.region.xmin, self.num_x);
        let iy = index(pos.1, self.region.ymin, self.num_y);
        iy * self.num_x + ix
    }
    pub fn bucket_of(&self, cell: CellId) -> Option<uint> {
        self.cell_bucket.get(&cell).copied()
    }
    /// Moves an indexed cell to the bucket of its new position.
    pub fn relocate(&mut self, cell: CellId, pos: Vector2) {
        let Some(old) = self.bucket_of(cell) else {
            return;
        };
        let new = self.bucket_index(pos);
        if old != new {
            self.buckets[old].cells.remove(&cell);
            self.buckets[new].cells.insert(cell);
            self.cell_bucket.insert(cell, new);
        }
    }
    /// Buckets at exactly Chebyshev distance `radius` from `center`.
    pub fn ring(&self, center: uint, radius: uint) -> Vec<uint> {
        let (cx, cy) = (center % self.num_x, center / self.num_x);
        if radius == 0 {
            return vec![center];
        }
        let (cx, cy, r) = (cx.int(), cy.int(), radius.int());
        let (nx, ny) = (self.num_x.int(), self.num_y.int());
        (cy - r..=cy + r)
            .cartesian_product(cx - r..=cx + r)
            .filter(|&(y, x)| (x - cx).abs().max((y - cy).abs()) == r)
            .filter(|&(y, x)| x >= 0 && x < nx && y >= 0 && y < ny)
            .map(|(y, x)| (y * nx + x).uint())
            .collect()
    }
    pub fn cells_in(&self, bucket: uint) -> &BTreeSet<CellId> {
        &self.buckets[bucket].cells
    }
    pub fn dims(&self) -> (uint, uint) {
        (self.num_x, self.num_y)
    }
    pub fn step(&self) -> float {
        self.step
    }
    pub fn max_radius(&self) -> uint {
        self.num_x.max(self.num_y)
    }
    pub fn num_cells(&self) -> uint {
        self.cell_bucket.len()
    }
}

/// Left edges of all cells per placement row.
///
/// Slots are only ever permuted among equal-height cells, so the edge set
/// stays valid for a whole pass.
#[derive(Debug, Clone, Default)]
pub struct RowEdges {
    ymin: float,
    row_height: float,
    xmax: float,
    rows: Vec<BTreeSet<OrderedFloat<float>>>,
}
impl RowEdges {
    pub fn new(ctx: &DesignContext) -> Self {
        let region = ctx.die_dimensions.rect();
        let row_height = if ctx.row_height > 0.0 {
            ctx.row_height
        } else {
            region.height().max(1.0)
        };
        let num_rows = (region.height() / row_height).ceil().uint().max(1);
        let mut edges = Self {
            ymin: region.ymin,
            row_height,
            xmax: region.xmax,
            rows: vec![BTreeSet::new(); num_rows],
        };
        for cell in ctx.cells() {
            for row in edges.rows_of(cell.y, cell.height) {
                edges.rows[row].insert(OrderedFloat(cell.x));
            }
        }
        edges
    }
    fn rows_of(&self, y: float, height: float) -> std::ops::Range<uint> {
        let lo = ((y - self.ymin) / self.row_height + 1e-9).floor().max(0.0).uint();
        let hi = ((y + height - self.ymin) / self.row_height - 1e-9).ceil().max(0.0).uint();
        lo.min(self.rows.len())..hi.min(self.rows.len())
    }
    /// Right end of the free span starting at `pos`: the next left edge in
    /// any row the span covers, or the region border.
    pub fn span_end(&self, pos: Vector2, height: float) -> float {
        self.rows_of(pos.1, height)
            .filter_map(|row| self.rows[row].range(OrderedFloat(pos.0 + 1e-9)..).next())
            .map(|x| x.into_inner())
            .fold(self.xmax, float::min)
    }
}
