//! Dense min-cost assignment (Hungarian algorithm, potentials form).
//!
//! Costs are `rows x cols` with `rows <= cols`; `float::INFINITY` marks an
//! excluded pair.
use crate::*;

/// Column chosen for each row, or `None` when every complete assignment
/// has to use an excluded pair.
pub fn solve_assignment(costs: &Array2<float>) -> Option<Vec<uint>> {
    let (n, m) = costs.dim();
    if n == 0 {
        return Some(Vec::new());
    }
    if n > m {
        return None;
    }
    // excluded pairs become a cost no feasible assignment can reach
    let finite_total: float = costs.iter().filter(|c| c.is_finite()).map(|c| c.abs()).sum();
    let big = (finite_total + 1.0) * 2.0;
    let cost = |i: uint, j: uint| {
        let c = costs[[i, j]];
        if c.is_finite() {
            c
        } else {
            big
        }
    };

    let mut u = vec![0.0; n + 1];
    let mut v = vec![0.0; m + 1];
    let mut p = vec![0; m + 1];
    let mut way = vec![0; m + 1];
    for i in 1..=n {
        p[0] = i;
        let mut j0 = 0;
        let mut minv = vec![float::INFINITY; m + 1];
        let mut used = vec![false; m + 1];
        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = float::INFINITY;
            let mut j1 = 0;
            for j in 1..=m {
                if used[j] {
                    continue;
                }
                let cur = cost(i0 - 1, j - 1) - u[i0] - v[j];
                if cur < minv[j] {
                    minv[j] = cur;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }
            for j in 0..=m {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }
            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }
        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut assignment = vec![0; n];
    for j in 1..=m {
        if p[j] > 0 {
            assignment[p[j] - 1] = j - 1;
        }
    }
    let feasible = assignment
        .iter()
        .enumerate()
        .all(|(i, &j)| costs[[i, j]].is_finite());
    feasible.then_some(assignment)
}

pub fn assignment_cost(costs: &Array2<float>, assignment: &[uint]) -> float {
    assignment.iter().enumerate().map(|(i, &j)| costs[[i, j]]).sum()
}

/// Non-trivial cycles of a square permutation, each starting at its smallest index.
pub fn permutation_cycles(perm: &[uint]) -> Vec<Vec<uint>> {
    let mut seen = vec![false; perm.len()];
    let mut cycles = Vec::new();
    for start in 0..perm.len() {
        if seen[start] || perm[start] == start {
            continue;
        }
        let mut cycle = Vec::new();
        let mut i = start;
        while !seen[i] {
            seen[i] = true;
            cycle.push(i);
            i = perm[i];
        }
        cycles.push(cycle);
    }
    cycles
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn brute_force_min(costs: &Array2<float>) -> float {
        let n = costs.nrows();
        (0..n)
            .permutations(n)
            .map(|perm| assignment_cost(costs, &perm))
            .fold(float::INFINITY, float::min)
    }

    #[test]
    fn solves_small_assignment() {
        let costs = array![[4.0, 1.0, 3.0], [2.0, 0.0, 5.0], [3.0, 2.0, 2.0]];
        let assignment = solve_assignment(&costs).unwrap();
        assert!(assignment_cost(&costs, &assignment) == 5.0);
        assert!(assignment.iter().unique().count() == 3);
    }

    #[test]
    fn matches_brute_force_on_random_matrices() {
        let mut rng = StdRng::seed_from_u64(42);
        for n in 1..=6 {
            let costs = Array2::from_shape_fn((n, n), |_| rng.gen_range(0.0..100.0));
            let assignment = solve_assignment(&costs).unwrap();
            assert!(approx_eq(
                assignment_cost(&costs, &assignment),
                brute_force_min(&costs),
                1e-9
            ));
        }
    }

    #[test]
    fn excluded_pairs_are_never_chosen() {
        let inf = float::INFINITY;
        let costs = array![[0.0, inf, 1.0], [inf, 0.0, inf], [5.0, inf, 9.0]];
        let assignment = solve_assignment(&costs).unwrap();
        assert!(assignment == vec![2, 1, 0]);

        let blocked = array![[inf, inf], [0.0, 1.0]];
        assert!(solve_assignment(&blocked).is_none());
    }

    #[test]
    fn rectangular_uses_distinct_columns() {
        let costs = array![[3.0, 1.0, 7.0, 2.0], [1.0, 1.0, 9.0, 0.5]];
        let assignment = solve_assignment(&costs).unwrap();
        assert!(assignment == vec![1, 3]);
    }

    #[test]
    fn cycles_skip_fixed_points() {
        let cycles = permutation_cycles(&[2, 1, 0, 4, 5, 3]);
        assert!(cycles == vec![vec![0, 2], vec![3, 4, 5]]);
        assert!(permutation_cycles(&[0, 1, 2]).is_empty());
    }
}
