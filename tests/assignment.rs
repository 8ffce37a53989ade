use approx::assert_relative_eq;
use glyph2strokes::assignment::solve_max;
use glyph2strokes::{solve, SquareMatrix};

/// Small deterministic generator so failures reproduce.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 33) % 1000) as f64 / 10.0
    }
}

fn permutations(n: usize) -> Vec<Vec<usize>> {
    if n == 0 {
        return vec![vec![]];
    }
    let mut result = Vec::new();
    for perm in permutations(n - 1) {
        for slot in 0..n {
            let mut p = perm.clone();
            p.insert(slot, n - 1);
            result.push(p);
        }
    }
    result
}

fn brute_force_min(cost: &SquareMatrix) -> f64 {
    permutations(cost.len())
        .iter()
        .map(|p| p.iter().enumerate().map(|(i, &j)| cost[(i, j)]).sum::<f64>())
        .fold(f64::INFINITY, f64::min)
}

#[test]
fn solver_is_optimal_on_small_matrices() {
    let mut rng = Lcg(7);
    for n in 1..=6 {
        for _ in 0..20 {
            let cost = SquareMatrix::from_fn(n, |_, _| rng.next() - 50.0);
            let assignment = solve(&cost).unwrap();

            let mut cols = assignment.row_to_col.clone();
            cols.sort_unstable();
            assert_eq!(cols, (0..n).collect::<Vec<_>>(), "not a permutation");

            let matched: f64 = (0..n).map(|i| cost[(i, assignment.row_to_col[i])]).sum();
            assert_relative_eq!(matched, assignment.total_cost, epsilon = 1e-9);
            assert_relative_eq!(assignment.total_cost, brute_force_min(&cost), epsilon = 1e-9);
        }
    }
}

#[test]
fn maximizing_is_minimizing_the_negation() {
    let mut rng = Lcg(11);
    for n in 2..=5 {
        let score = SquareMatrix::from_fn(n, |_, _| rng.next());
        let negated = SquareMatrix::from_fn(n, |i, j| -score[(i, j)]);
        let best = solve_max(&score).unwrap();
        assert_relative_eq!(best.total_cost, -brute_force_min(&negated), epsilon = 1e-9);
    }
}

#[test]
fn rectangular_costs_are_padded() {
    // Two rows, three columns: one column stays with the padding row.
    let rows = vec![vec![4.0, 1.0, 5.0], vec![2.0, 3.0, 6.0]];
    let cost = SquareMatrix::padded(&rows, 3, 100.0).unwrap();
    assert_eq!(cost.len(), 3);
    let assignment = solve(&cost).unwrap();
    assert_relative_eq!(assignment.total_cost, 103.0);
    assert_eq!(assignment.row_to_col[0], 1);
    assert_eq!(assignment.row_to_col[1], 0);
}
