use crate::*;

pub type CellId = usize;
pub type PinId = usize;
pub type NetId = usize;

#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
pub struct DieSize {
    pub x_lower_left: float,
    pub y_lower_left: float,
    x_upper_right: float,
    y_upper_right: float,
    area: float,
}
#[bon]
impl DieSize {
    #[builder]
    pub fn new(
        #[builder(default = 0.0)] x_lower_left: float,
        #[builder(default = 0.0)] y_lower_left: float,
        x_upper_right: float,
        y_upper_right: float,
    ) -> Self {
        let area = (x_upper_right - x_lower_left) * (y_upper_right - y_lower_left);
        Self {
            x_lower_left,
            y_lower_left,
            x_upper_right,
            y_upper_right,
            area,
        }
    }
    pub fn width(&self) -> float {
        self.x_upper_right - self.x_lower_left
    }
    pub fn height(&self) -> float {
        self.y_upper_right - self.y_lower_left
    }
    pub fn area(&self) -> float {
        self.area
    }
    pub fn rect(&self) -> Rect {
        Rect::from_bbox([
            [self.x_lower_left, self.y_lower_left],
            [self.x_upper_right, self.y_upper_right],
        ])
    }
}

/// A pin sits at a fixed offset from the lower-left corner of its cell.
#[derive(Debug, Clone, new)]
pub struct Pin {
    pub cell: CellId,
    pub net: NetId,
    pub offset: Vector2,
}

#[derive(Debug, Clone, new)]
pub struct Net {
    #[new(into)]
    pub name: String,
    #[new(default)]
    pub pins: Vec<PinId>,
}
impl Net {
    pub fn degree(&self) -> uint {
        self.pins.len()
    }
}

#[derive(Debug, Clone)]
pub struct Cell {
    pub name: String,
    pub x: float,
    pub y: float,
    pub width: float,
    pub height: float,
    pub fixed: bool,
    /// Anchor used by the displacement objective.
    pub orig_x: float,
    pub orig_y: float,
    pins: Vec<PinId>,
    nets: Vec<NetId>,
}
impl Cell {
    pub fn pos(&self) -> Vector2 {
        (self.x, self.y)
    }
    pub fn orig_pos(&self) -> Vector2 {
        (self.orig_x, self.orig_y)
    }
    pub fn size(&self) -> Vector2 {
        (self.width, self.height)
    }
    pub fn area(&self) -> float {
        self.width * self.height
    }
    pub fn is_movable(&self) -> bool {
        !self.fixed
    }
    pub fn rect(&self) -> Rect {
        Rect::from_size(self.x, self.y, self.width, self.height)
    }
    pub fn rect_at(&self, pos: Vector2) -> Rect {
        Rect::from_size(pos.0, pos.1, self.width, self.height)
    }
    pub fn pins(&self) -> &[PinId] {
        &self.pins
    }
    /// Distinct nets touching this cell, in first-seen order.
    pub fn nets(&self) -> &[NetId] {
        &self.nets
    }
}

/// The cell/network and region model the optimisers read from.
///
/// Topology is append-only; positions are the only thing the optimisers write back.
#[derive(Debug, Clone)]
pub struct DesignContext {
    pub die_dimensions: DieSize,
    pub row_height: float,
    cells: Vec<Cell>,
    pins: Vec<Pin>,
    nets: Vec<Net>,
}
impl DesignContext {
    pub fn new(die_dimensions: DieSize, row_height: float) -> Self {
        Self {
            die_dimensions,
            row_height,
            cells: Vec::new(),
            pins: Vec::new(),
            nets: Vec::new(),
        }
    }
    pub fn add_cell(
        &mut self,
        name: impl Into<String>,
        pos: Vector2,
        size: Vector2,
        fixed: bool,
    ) -> CellId {
        let id = self.cells.len();
        self.cells.push(Cell {
            name: name.into(),
            x: pos.0,
            y: pos.1,
            width: size.0,
            height: size.1,
            fixed,
            orig_x: pos.0,
            orig_y: pos.1,
            pins: Vec::new(),
            nets: Vec::new(),
        });
        id
    }
    /// Connects `(cell, pin offset)` pairs into a new net.
    pub fn add_net(&mut self, name: impl Into<String>, terminals: &[(CellId, Vector2)]) -> NetId {
        let net_id = self.nets.len();
        let mut net = Net::new(name);
        for &(cell_id, offset) in terminals {
            let pin_id = self.pins.len();
            self.pins.push(Pin::new(cell_id, net_id, offset));
            net.pins.push(pin_id);
            let cell = &mut self.cells[cell_id];
            cell.pins.push(pin_id);
            if !cell.nets.contains(&net_id) {
                cell.nets.push(net_id);
            }
        }
        self.nets.push(net);
        net_id
    }
    pub fn set_orig_pos(&mut self, id: CellId, pos: Vector2) {
        let cell = &mut self.cells[id];
        cell.orig_x = pos.0;
        cell.orig_y = pos.1;
    }

    // --- Accessors ---

    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id]
    }
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }
    pub fn num_cells(&self) -> uint {
        self.cells.len()
    }
    pub fn net(&self, id: NetId) -> &Net {
        &self.nets[id]
    }
    pub fn nets(&self) -> &[Net] {
        &self.nets
    }
    pub fn pin(&self, id: PinId) -> &Pin {
        &self.pins[id]
    }
    pub fn is_multi_row(&self, id: CellId) -> bool {
        self.cells[id].height > self.row_height * (1.0 + 1e-9)
    }

    // --- Wirelength ---

    pub fn pin_pos(&self, id: PinId) -> Vector2 {
        let pin = &self.pins[id];
        let (x, y) = self.cells[pin.cell].pos();
        (x + pin.offset.0, y + pin.offset.1)
    }
    /// Half-perimeter of the pin bounding box, with `moved` overriding cell positions.
    pub fn net_hpwl_with(&self, net: NetId, moved: &[(CellId, Vector2)]) -> float {
        let pins = &self.nets[net].pins;
        if pins.len() < 2 {
            return 0.0;
        }
        let (mut xmin, mut ymin) = (float::INFINITY, float::INFINITY);
        let (mut xmax, mut ymax) = (float::NEG_INFINITY, float::NEG_INFINITY);
        for &pin_id in pins {
            let pin = &self.pins[pin_id];
            let (x, y) = moved
                .iter()
                .find(|(c, _)| *c == pin.cell)
                .map_or_else(|| self.cells[pin.cell].pos(), |(_, p)| *p);
            let (px, py) = (x + pin.offset.0, y + pin.offset.1);
            xmin = xmin.min(px);
            xmax = xmax.max(px);
            ymin = ymin.min(py);
            ymax = ymax.max(py);
        }
        (xmax - xmin) + (ymax - ymin)
    }
    pub fn net_hpwl(&self, net: NetId) -> float {
        self.net_hpwl_with(net, &[])
    }
    pub fn total_hpwl(&self) -> float {
        self.total_hpwl_skipping(uint::MAX)
    }
    /// Total HPWL over nets with at most `max_degree` pins.
    pub fn total_hpwl_skipping(&self, max_degree: uint) -> float {
        (0..self.nets.len())
            .into_par_iter()
            .filter(|&n| self.nets[n].degree() <= max_degree)
            .map(|n| self.net_hpwl(n))
            .sum()
    }
    /// Manhattan displacement of every movable cell from its anchor.
    pub fn total_displacement(&self) -> float {
        self.cells
            .iter()
            .filter(|c| c.is_movable())
            .map(|c| norm1(c.pos(), c.orig_pos()))
            .sum()
    }

    // --- Mutation ---

    pub fn move_cell(&mut self, id: CellId, pos: Vector2) {
        let cell = &mut self.cells[id];
        cell.x = pos.0;
        cell.y = pos.1;
    }
    pub fn apply_moves(&mut self, moves: &[CellMove]) {
        for mv in moves {
            self.move_cell(mv.cell, mv.to);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_cell_design() -> DesignContext {
        let die = DieSize::builder()
            .x_upper_right(100.0)
            .y_upper_right(50.0)
            .build();
        let mut ctx = DesignContext::new(die, 10.0);
        let a = ctx.add_cell("a", (0.0, 0.0), (4.0, 10.0), false);
        let b = ctx.add_cell("b", (20.0, 10.0), (4.0, 10.0), false);
        ctx.add_net("n0", &[(a, (1.0, 5.0)), (b, (3.0, 5.0))]);
        ctx
    }

    #[test]
    fn hpwl_uses_pin_offsets() {
        let ctx = two_cell_design();
        // pins at (1,5) and (23,15)
        assert!(ctx.net_hpwl(0) == 22.0 + 10.0);
        assert!(ctx.total_hpwl() == 32.0);
    }

    #[test]
    fn hpwl_with_override_does_not_mutate() {
        let ctx = two_cell_design();
        let moved = ctx.net_hpwl_with(0, &[(0, (20.0, 10.0))]);
        assert!(moved == 2.0);
        assert!(ctx.cell(0).pos() == (0.0, 0.0));
    }

    #[test]
    fn cells_record_distinct_nets() {
        let mut ctx = two_cell_design();
        ctx.add_net("n1", &[(0, (0.0, 0.0)), (0, (2.0, 0.0)), (1, (0.0, 0.0))]);
        assert!(ctx.cell(0).nets() == [0, 1]);
        assert!(ctx.cell(0).pins().len() == 3);
        assert!(ctx.net(1).degree() == 3);
    }

    #[test]
    fn displacement_measured_from_anchor() {
        let mut ctx = two_cell_design();
        ctx.move_cell(0, (3.0, 10.0));
        assert!(ctx.total_displacement() == 13.0);
        assert!(!ctx.is_multi_row(0));
    }
}
