use crate::*;
use derive_more::Display;
use thiserror::Error;

/// How a seed cell collects the rest of its matching group.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatherStrategy {
    #[display("kdtree")]
    KdTree,
    #[default]
    #[display("binning")]
    Binning,
    #[display("colour")]
    Colour,
}
impl GatherStrategy {
    pub fn from_id(id: int) -> Option<Self> {
        match id {
            0 => Some(Self::KdTree),
            1 => Some(Self::Binning),
            2 => Some(Self::Colour),
            _ => None,
        }
    }
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "kdtree" | "kd" => Some(Self::KdTree),
            "binning" | "bin" => Some(Self::Binning),
            "colour" | "color" => Some(Self::Colour),
            other => other.parse::<int>().ok().and_then(Self::from_id),
        }
    }
}

#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchObjective {
    #[default]
    #[display("hpwl")]
    Hpwl,
    #[display("disp")]
    Disp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
pub struct MatchParams {
    #[builder(default = 15)]
    pub max_problem_size: uint,
    #[builder(default = 1)]
    pub max_passes: uint,
    /// Width ratio allowed between grouped cells when sizes need not match exactly.
    #[builder(default = 1.10)]
    pub size_tol: float,
    #[builder(default = 50)]
    pub skip_nets_larger_than: uint,
    #[builder(default)]
    pub strategy: GatherStrategy,
    #[builder(default = true)]
    pub use_same_size: bool,
    #[builder(default = true)]
    pub use_same_color: bool,
    #[builder(default = 20)]
    pub traversal: uint,
    #[builder(default = 2)]
    pub max_times_used: uint,
    #[builder(default)]
    pub objective: MatchObjective,
    #[builder(default = 0.01)]
    pub tolerance: float,
    /// Target number of cells per candidate bucket.
    #[builder(default = 8.0)]
    pub bucket_occupancy: float,
    #[builder(default = 0)]
    pub seed: u64,
    #[builder(default = false)]
    pub verbose: bool,
}
impl Default for MatchParams {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    #[error("option {0} expects a value")]
    MissingValue(String),

    #[error("invalid value '{value}' for option {flag}")]
    InvalidValue { flag: String, value: String },

    #[error("unknown strategy '{0}'")]
    UnknownStrategy(String),

    #[error("unknown option '{0}'")]
    UnknownOption(String),
}

fn invalid(flag: &str, value: &str) -> ParamError {
    ParamError::InvalidValue {
        flag: flag.to_string(),
        value: value.to_string(),
    }
}

/// Parses the value after `flag`, keeping only values accepted by `valid`.
fn value_of<'a, T: std::str::FromStr>(
    flag: &str,
    it: &mut impl Iterator<Item = &'a str>,
    valid: impl Fn(&T) -> bool,
) -> Result<T, ParamError> {
    match parse_next::<T>(it) {
        None => Err(ParamError::MissingValue(flag.to_string())),
        Some(Ok(v)) if valid(&v) => Ok(v),
        Some(Ok(_)) => Err(invalid(flag, "out of range")),
        Some(Err(raw)) => Err(invalid(flag, raw)),
    }
}

/// Reads matching options from command tokens.
///
/// A leading token that is not a flag names the command and is skipped. Every
/// rejected option keeps its default and is reported in the returned list.
pub fn parse_args<'a>(args: impl IntoIterator<Item = &'a str>) -> (MatchParams, Vec<ParamError>) {
    let mut params = MatchParams::default();
    let mut errors = Vec::new();
    let mut it = args.into_iter().peekable();
    if it.peek().is_some_and(|first| !first.starts_with('-')) {
        it.next();
    }
    while let Some(flag) = it.next() {
        let outcome = match flag {
            "-p" => value_of(flag, &mut it, |&v: &uint| v >= 1).map(|v| params.max_passes = v),
            "-t" => value_of(flag, &mut it, |&v: &float| v >= 0.0).map(|v| params.tolerance = v),
            "-d" => {
                params.objective = MatchObjective::Disp;
                Ok(())
            }
            "-h" => {
                params.objective = MatchObjective::Hpwl;
                Ok(())
            }
            "-n" => value_of(flag, &mut it, |&v: &uint| v >= 2).map(|v| params.max_problem_size = v),
            "-s" => value_of(flag, &mut it, |&v: &float| v >= 1.0).map(|v| params.size_tol = v),
            "-k" => value_of(flag, &mut it, |_: &uint| true).map(|v| params.skip_nets_larger_than = v),
            "-g" => match it.next() {
                None => Err(ParamError::MissingValue(flag.to_string())),
                Some(name) => GatherStrategy::from_name(name)
                    .map(|s| params.strategy = s)
                    .ok_or_else(|| ParamError::UnknownStrategy(name.to_string())),
            },
            "-r" => value_of(flag, &mut it, |_: &uint| true).map(|v| params.traversal = v),
            "-u" => value_of(flag, &mut it, |&v: &uint| v >= 1).map(|v| params.max_times_used = v),
            "-x" => {
                params.use_same_size = true;
                Ok(())
            }
            "-a" => {
                params.use_same_size = false;
                Ok(())
            }
            "-c" => {
                params.use_same_color = true;
                Ok(())
            }
            "-nc" => {
                params.use_same_color = false;
                Ok(())
            }
            "-o" => value_of(flag, &mut it, |&v: &float| v > 0.0 && v.is_finite())
                .map(|v| params.bucket_occupancy = v),
            "--seed" => value_of(flag, &mut it, |_: &u64| true).map(|v| params.seed = v),
            "-v" => {
                params.verbose = true;
                Ok(())
            }
            other => Err(ParamError::UnknownOption(other.to_string())),
        };
        if let Err(e) = outcome {
            errors.push(e);
        }
    }
    (params, errors)
}
