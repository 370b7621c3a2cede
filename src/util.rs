pub use crate::geometry::Rect;
pub use crate::numeric::*;
pub use bon::{bon, builder, Builder};
pub use colored::Colorize;
pub use derive_new::new;
pub use foldhash::{HashMapExt, HashSetExt};
pub use indicatif::{ProgressBar, ProgressStyle};
pub use itertools::Itertools;
pub use kiddo::{ImmutableKdTree, SquaredEuclidean};
pub use log::{debug, info, warn};
pub use logging_timer::{finish, time, timer};
pub use ndarray::Array2;
pub use ordered_float::OrderedFloat;
pub use prettytable::{row, Table};
pub use rand::rngs::StdRng;
pub use rand::seq::SliceRandom;
pub use rand::{Rng, SeedableRng};
pub use rayon::prelude::*;
pub use serde::{Deserialize, Serialize};
pub use std::cmp::Reverse;
pub use std::collections::BTreeSet;
pub use std::num::NonZero;

pub type PriorityQueue<T, K> = priority_queue::PriorityQueue<T, K, foldhash::fast::RandomState>;
pub type Dict<K, V> = foldhash::HashMap<K, V>;
pub type Vector2 = (float, float);

pub fn norm1(p1: Vector2, p2: Vector2) -> float {
    (p1.0 - p2.0).abs() + (p1.1 - p2.1).abs()
}

/// Approximate float equality scaled by magnitude.
pub fn approx_eq(a: float, b: float, tol: float) -> bool {
    (a - b).abs() <= tol * (1.0 + a.abs().max(b.abs()))
}

use std::str::FromStr;
pub fn parse_next<'a, T: FromStr>(
    it: &mut impl Iterator<Item = &'a str>,
) -> Option<Result<T, &'a str>> {
    it.next().map(|raw| raw.parse::<T>().map_err(|_| raw))
}
