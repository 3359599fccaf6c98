//! Typesetting parameters.
//!
//! The breakers never snapshot parameters.
//! They go through a [ParameterContext] and re-read every value they need
//!     each time a breakpoint is evaluated,
//!     so a parameter changed in the middle of a list
//!     affects all breakpoints evaluated after the change.

use crate::error::{Error, Result};
use galley_core::{Glue, GlueOrder, Scaled};
use std::collections::BTreeMap;

const fn pt(n: i32) -> Scaled {
    Scaled(n << 16)
}

/// All of the parameters read by the breakers.
///
/// The defaults are the values in plain TeX.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Params {
    /// Badness threshold of the second pass of the paragraph breaker.
    pub tolerance: i32,
    /// Badness threshold of the first pass; a negative value skips the first pass.
    pub pretolerance: i32,
    pub line_penalty: i32,
    pub hyphen_penalty: i32,
    pub ex_hyphen_penalty: i32,
    pub double_hyphen_demerits: i32,
    pub final_hyphen_demerits: i32,
    pub adj_demerits: i32,
    pub club_penalty: i32,
    pub widow_penalty: i32,
    pub inter_line_penalty: i32,
    pub broken_penalty: i32,
    pub looseness: i32,
    pub emergency_stretch: Scaled,
    /// Target width of each line; the last value repeats for further lines.
    pub line_widths: Vec<Scaled>,
    pub par_fill_skip: Glue,
    pub baseline_skip: Glue,
    pub line_skip: Glue,
    pub line_skip_limit: Scaled,
    pub hbadness: i32,
    pub hfuzz: Scaled,
    pub vbadness: i32,
    pub vfuzz: Scaled,
    pub page_goal: Scaled,
    /// Badness threshold of a page break.
    pub page_tolerance: i32,
    pub max_depth: Scaled,
    pub top_skip: Glue,
    pub split_top_skip: Glue,
    pub float_separation: Scaled,
    /// Maximum height of the insertions of a class on one page; classes not present are unlimited.
    pub insertion_max: BTreeMap<u8, Scaled>,
    /// Glue added above the first insertion of a class on a page.
    pub insertion_skip: BTreeMap<u8, Glue>,
    /// Maximum number of nodes in a list passed to a breaker.
    pub max_list_len: usize,
    /// Penalties at or above this value forbid a break.
    pub forbidding_threshold: i32,
}

impl Default for Params {
    fn default() -> Self {
        Params {
            tolerance: 9999,
            pretolerance: 100,
            line_penalty: 10,
            hyphen_penalty: 50,
            ex_hyphen_penalty: 50,
            double_hyphen_demerits: 10000,
            final_hyphen_demerits: 5000,
            adj_demerits: 10000,
            club_penalty: 150,
            widow_penalty: 150,
            inter_line_penalty: 0,
            broken_penalty: 100,
            looseness: 0,
            emergency_stretch: Scaled::ZERO,
            line_widths: vec![pt(345)],
            par_fill_skip: Glue {
                stretch: Scaled::ONE,
                stretch_order: GlueOrder::Fil,
                ..Default::default()
            },
            baseline_skip: Glue::rigid(pt(12)),
            line_skip: Glue::rigid(pt(1)),
            line_skip_limit: Scaled::ZERO,
            hbadness: 1000,
            // 0.1pt
            hfuzz: Scaled(6554),
            vbadness: 1000,
            vfuzz: Scaled(6554),
            page_goal: pt(592),
            page_tolerance: 10000,
            max_depth: pt(4),
            top_skip: Glue::rigid(pt(10)),
            split_top_skip: Glue::rigid(pt(10)),
            float_separation: pt(12),
            insertion_max: BTreeMap::new(),
            insertion_skip: BTreeMap::new(),
            max_list_len: 1_000_000,
            forbidding_threshold: 10000,
        }
    }
}

impl Params {
    /// Target width of the line with the given 1-based number.
    pub fn line_width(&self, line: usize) -> Scaled {
        let i = line.clamp(1, self.line_widths.len().max(1)) - 1;
        self.line_widths.get(i).copied().unwrap_or(Scaled::ZERO)
    }

    /// Maximum insertion height for a class.
    pub fn insertion_max(&self, class: u8) -> Scaled {
        self.insertion_max
            .get(&class)
            .copied()
            .unwrap_or(Scaled::MAX_DIMEN)
    }

    /// Glue placed above the insertions of a class.
    pub fn insertion_skip(&self, class: u8) -> Glue {
        self.insertion_skip.get(&class).copied().unwrap_or_default()
    }

    /// Checks that the parameters are usable.
    pub fn validate(&self) -> Result<()> {
        if !(0..=10000).contains(&self.tolerance) {
            return Err(invalid("tolerance", "must be between 0 and 10000"));
        }
        if self.pretolerance > 10000 {
            return Err(invalid("pretolerance", "must be at most 10000"));
        }
        if self.line_widths.is_empty() {
            return Err(invalid("line_widths", "at least one width is required"));
        }
        if self.page_goal < Scaled::ZERO {
            return Err(invalid("page_goal", "must not be negative"));
        }
        if self.max_depth < Scaled::ZERO {
            return Err(invalid("max_depth", "must not be negative"));
        }
        Ok(())
    }
}

fn invalid(name: &'static str, reason: &str) -> Error {
    Error::InvalidParameter {
        name,
        reason: reason.into(),
    }
}

/// Source of typesetting parameters for the breakers.
///
/// The breakers call [ParameterContext::before_breakpoint] immediately before
///     evaluating each legal breakpoint and then read [ParameterContext::params].
pub trait ParameterContext {
    fn params(&self) -> &Params;

    /// Hook invoked before the breakpoint at the given list position is evaluated.
    fn before_breakpoint(&mut self, position: usize) {
        let _ = position;
    }
}

impl ParameterContext for Params {
    fn params(&self) -> &Params {
        self
    }
}

/// A parameter context that runs a closure before every breakpoint.
///
/// This is how embedders emulate parameter assignments made in the middle of a list.
pub struct WithHook<F> {
    pub params: Params,
    hook: F,
}

impl<F: FnMut(usize, &mut Params)> WithHook<F> {
    pub fn new(params: Params, hook: F) -> Self {
        WithHook { params, hook }
    }
}

impl<F: FnMut(usize, &mut Params)> ParameterContext for WithHook<F> {
    fn params(&self) -> &Params {
        &self.params
    }

    fn before_breakpoint(&mut self, position: usize) {
        (self.hook)(position, &mut self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_line_width_repeats() {
        let params = Params {
            line_widths: vec![pt(100), pt(200)],
            ..Default::default()
        };
        assert_eq!(params.line_width(1), pt(100));
        assert_eq!(params.line_width(2), pt(200));
        assert_eq!(params.line_width(7), pt(200));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let params = Params {
            tolerance: 10001,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(Error::InvalidParameter {
                name: "tolerance",
                ..
            })
        ));
        let params = Params {
            line_widths: vec![],
            ..Default::default()
        };
        assert!(params.validate().is_err());
        assert_eq!(Params::default().validate(), Ok(()));
    }

    #[test]
    fn hook_mutates_params() {
        let mut ctx = WithHook::new(Params::default(), |position, params: &mut Params| {
            params.looseness = position as i32;
        });
        ctx.before_breakpoint(3);
        assert_eq!(ctx.params().looseness, 3);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn missing_fields_take_defaults() {
        let params: Params = serde_json::from_str(r#"{"tolerance": 200}"#).unwrap();
        assert_eq!(params.tolerance, 200);
        assert_eq!(params.line_penalty, 10);
    }
}
