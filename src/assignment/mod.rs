//! Bipartite matching and stroke ordering.

mod hungarian;
mod order;

pub use hungarian::{solve, solve_max, Assignment, SquareMatrix};
pub use order::{
    expected_order, order_strokes, stroke_cost, ExpectedStroke, Orientation, StrokeLabel,
    StrokeOrder,
};
