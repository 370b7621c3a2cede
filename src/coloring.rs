use crate::*;

/// Colour per candidate cell; cells of one colour share no counted net.
#[derive(Debug, Clone, Default)]
pub struct ColorClasses {
    colors: Dict<CellId, uint>,
    classes: Vec<Vec<CellId>>,
}
impl ColorClasses {
    pub fn color_of(&self, cell: CellId) -> Option<uint> {
        self.colors.get(&cell).copied()
    }
    pub fn classes(&self) -> &[Vec<CellId>] {
        &self.classes
    }
    pub fn num_colors(&self) -> uint {
        self.classes.len()
    }
}

/// Candidates connected through a net with at most `skip` pins.
fn conflict_graph(ctx: &DesignContext, candidates: &[CellId], skip: uint) -> Vec<Vec<uint>> {
    let local: Dict<CellId, uint> = candidates.iter().enumerate().map(|(i, &c)| (c, i)).collect();
    candidates
        .iter()
        .map(|&cell| {
            ctx.cell(cell)
                .nets()
                .iter()
                .map(|&n| ctx.net(n))
                .filter(|net| net.degree() <= skip)
                .flat_map(|net| net.pins.iter().map(|&p| ctx.pin(p).cell))
                .filter(|&other| other != cell)
                .filter_map(|other| local.get(&other).copied())
                .unique()
                .collect()
        })
        .collect()
}

/// Greedy Welsh-Powell colouring: highest degree first, smallest free colour.
#[time("Color cells")]
pub fn color_cells(ctx: &DesignContext, candidates: &[CellId], skip: uint) -> ColorClasses {
    let graph = conflict_graph(ctx, candidates, skip);
    let order = (0..candidates.len())
        .sorted_by_key(|&i| (Reverse(graph[i].len()), candidates[i]))
        .collect_vec();

    let mut color = vec![uint::MAX; candidates.len()];
    let mut taken = Vec::new();
    for i in order {
        taken.clear();
        taken.extend(graph[i].iter().map(|&j| color[j]).filter(|&c| c != uint::MAX));
        color[i] = (0..).find(|c| !taken.contains(c)).unwrap_or_default();
    }

    let num_colors = color.iter().max().map_or(0, |&c| c + 1);
    let mut classes = vec![Vec::new(); num_colors];
    for (i, &c) in color.iter().enumerate() {
        classes[c].push(candidates[i]);
    }
    classes.iter_mut().for_each(|class| class.sort_unstable());
    debug!(target:"matching", "{} candidates in {} colour classes", candidates.len(), num_colors);
    ColorClasses {
        colors: candidates.iter().copied().zip(color).collect(),
        classes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_color_cells_share_no_counted_net() {
        let ctx = synthetic_design().seed(12).call();
        let candidates = (0..ctx.num_cells()).filter(|&c| ctx.cell(c).is_movable()).collect_vec();
        let skip = 3;
        let colors = color_cells(&ctx, &candidates, skip);

        assert!(candidates.iter().all(|&c| colors.color_of(c).is_some()));
        let total: uint = colors.classes().iter().map(Vec::len).sum();
        assert!(total == candidates.len());
        for net in ctx.nets().iter().filter(|n| n.degree() <= skip) {
            let cells = net.pins.iter().map(|&p| ctx.pin(p).cell).unique().collect_vec();
            for (a, b) in cells.iter().tuple_combinations() {
                if let (Some(ca), Some(cb)) = (colors.color_of(*a), colors.color_of(*b)) {
                    assert!(ca != cb);
                }
            }
        }
    }

    #[test]
    fn skipped_nets_do_not_conflict() {
        let ctx = synthetic_design().seed(12).call();
        let candidates = (0..ctx.num_cells()).filter(|&c| ctx.cell(c).is_movable()).collect_vec();
        let colors = color_cells(&ctx, &candidates, 1);
        assert!(colors.num_colors() == 1);
        assert!(color_cells(&ctx, &[], 10).num_colors() == 0);
    }
}
