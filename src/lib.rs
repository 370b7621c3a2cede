mod geometry;

mod numeric;

pub mod util;
pub use util::*;

mod network;
pub use network::*;

mod objective;
pub use objective::*;

mod utilization;
pub use utilization::*;

mod candidate_grid;
pub use candidate_grid::*;

mod coloring;
pub use coloring::*;

mod assignment;
pub use assignment::*;

mod match_params;
pub use match_params::*;

mod matching;
pub use matching::*;

mod helper;
pub use helper::*;
