use crate::*;

/// Row-based random design: single-row cells packed left to right on a site grid,
/// a few fixed blocks, and local random nets.
#[builder]
pub fn synthetic_design(
    #[builder(default = 200.0)] width: float,
    #[builder(default = 100.0)] height: float,
    #[builder(default = 10.0)] row_height: float,
    #[builder(default = 1.0)] site_width: float,
    #[builder(default = 0.7)] density: float,
    #[builder(default = 2)] num_fixed: uint,
    #[builder(default = 4)] max_net_degree: uint,
    #[builder(default = 0)] seed: u64,
) -> DesignContext {
    let mut rng = StdRng::seed_from_u64(seed);
    let die = DieSize::builder()
        .x_upper_right(width)
        .y_upper_right(height)
        .build();
    let mut ctx = DesignContext::new(die, row_height);
    let num_rows = (height / row_height).floor().uint();

    // --- Fixed blocks, row aligned ---
    let mut blocks: Vec<Rect> = Vec::new();
    let block_size = ((width / 8.0 / site_width).floor() * site_width, 2.0 * row_height);
    if num_rows >= 2 && block_size.0 > 0.0 {
        for i in 0..num_fixed {
            let col = rng.gen_range(0..((width - block_size.0) / site_width).floor().uint().max(1));
            let row = rng.gen_range(0..num_rows - 1);
            let pos = (col.float() * site_width, row.float() * row_height);
            blocks.push(Rect::from_size(pos.0, pos.1, block_size.0, block_size.1));
            ctx.add_cell(format!("B{i}"), pos, block_size, true);
        }
    }

    // --- Movable cells ---
    let widths = [2.0, 3.0, 4.0].map(|w| w * site_width);
    let mut movable = Vec::new();
    for row in 0..num_rows {
        let y = row.float() * row_height;
        let mut x = 0.0;
        loop {
            let w = *widths.choose(&mut rng).unwrap_or(&site_width);
            if x + w > width {
                break;
            }
            let rect = Rect::from_size(x, y, w, row_height);
            if rng.gen_bool(density.clamp(0.0, 1.0))
                && blocks.iter().all(|b| b.intersection_area(&rect) == 0.0)
            {
                let id = ctx.add_cell(format!("C{}", movable.len()), (x, y), (w, row_height), false);
                movable.push(id);
            }
            x += w;
        }
    }

    // --- Nets among index-local cells, so connectivity stays spatially loose ---
    let fixed = (0..ctx.num_cells()).filter(|&c| ctx.cell(c).fixed).collect_vec();
    if movable.len() >= 2 {
        let window = 40.min(movable.len());
        for n in 0..movable.len() {
            let degree = rng.gen_range(2..=max_net_degree.max(2));
            let start = rng.gen_range(0..=movable.len() - window);
            let mut members = movable[start..start + window]
                .choose_multiple(&mut rng, degree.min(window))
                .copied()
                .collect_vec();
            if !fixed.is_empty() && rng.gen_bool(0.1) {
                members.push(fixed[rng.gen_range(0..fixed.len())]);
            }
            let terminals = members
                .into_iter()
                .map(|c| {
                    let (w, h) = ctx.cell(c).size();
                    let ox = (rng.gen_range(0.0..w) / site_width).floor() * site_width;
                    (c, (ox, h / 2.0))
                })
                .collect_vec();
            ctx.add_net(format!("N{n}"), &terminals);
        }
    }
    debug!(
        "Synthetic design: {} cells ({} fixed), {} nets",
        ctx.num_cells(),
        fixed.len(),
        ctx.nets().len()
    );
    ctx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_design_is_legal_and_seeded() {
        let a = synthetic_design().seed(7).call();
        let b = synthetic_design().seed(7).call();
        assert!(a.num_cells() == b.num_cells());
        assert!(a.cells().iter().zip(b.cells()).all(|(x, y)| x.pos() == y.pos()));

        let cells = a.cells();
        for i in 0..cells.len() {
            for j in i + 1..cells.len() {
                assert!(cells[i].rect().intersection_area(&cells[j].rect()) == 0.0);
            }
        }
        assert!(a.nets().iter().all(|n| n.degree() >= 2));
    }
}
