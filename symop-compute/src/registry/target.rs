use crate::error::unknown_target;
use std::{fmt, str::FromStr};
use symop_error::Error;

/// A source language that expressions can be rendered to.
///
/// The set of targets is closed: every operator registers one renderer per target it supports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Target {
    /// C++ with Armadillo-style fixed-size types: `Mat44 { ... }` constructors and `m(r,c)`
    /// element access.
    C,

    /// JavaScript with `Float64Array` storage, flat `m[r + 4*c]` element access and `Geom3D`
    /// runtime helpers.
    Js,
}

impl Target {
    /// Every target.
    pub const ALL: [Target; 2] = [Target::C, Target::Js];

    /// The name of the target.
    pub fn name(self) -> &'static str {
        match self {
            Target::C => "c",
            Target::Js => "js",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Target {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|target| target.name() == s)
            .ok_or_else(|| unknown_target(s, Self::ALL.map(Target::name).to_vec()))
    }
}
