//! The primitive commands of the expander.
//!
//! Use [register] to add all of them to an expander, or [all] to get them as a map.

use crate::command::{BuiltIn, Tag};
use crate::Expander;
use std::collections::HashMap;

pub mod conditional;
pub mod def;
pub mod expansion;

/// Returns every primitive, keyed by name.
pub fn all() -> HashMap<&'static str, BuiltIn> {
    HashMap::from([
        ("def", def::get_def()),
        ("gdef", def::get_gdef()),
        ("edef", def::get_edef()),
        ("xdef", def::get_xdef()),
        ("global", def::get_global()),
        ("long", def::get_long()),
        ("outer", def::get_outer()),
        ("protected", def::get_protected()),
        ("let", def::get_let()),
        //
        ("relax", BuiltIn::new_unexpandable("relax").with_doc("Do nothing")),
        ("par", BuiltIn::new_unexpandable("par").with_doc("End the current paragraph")),
        ("noexpand", expansion::get_noexpand()),
        ("expandafter", expansion::get_expandafter()),
        ("csname", expansion::get_csname()),
        ("endcsname", expansion::get_endcsname()),
        ("string", expansion::get_string()),
        ("begingroup", expansion::get_begingroup()),
        ("endgroup", expansion::get_endgroup()),
        //
        ("ifnum", conditional::get_ifnum()),
        ("ifdim", conditional::get_ifdim()),
        ("ifodd", conditional::get_ifodd()),
        ("ifx", conditional::get_ifx()),
        ("if", conditional::get_if()),
        ("ifcat", conditional::get_ifcat()),
        ("iftrue", conditional::get_iftrue()),
        ("iffalse", conditional::get_iffalse()),
        ("ifcase", conditional::get_ifcase()),
        ("ifdefined", conditional::get_ifdefined()),
        ("ifcsname", conditional::get_ifcsname()),
        ("ifvmode", conditional::get_ifvmode()),
        ("ifhmode", conditional::get_ifhmode()),
        ("ifmmode", conditional::get_ifmmode()),
        ("ifinner", conditional::get_ifinner()),
        ("else", conditional::get_else()),
        ("or", conditional::get_or()),
        ("fi", conditional::get_fi()),
        ("unless", conditional::get_unless()),
    ])
}

/// Registers every primitive in the expander.
pub fn register(expander: &mut Expander) {
    let mut built_ins: Vec<(&'static str, BuiltIn)> = all().into_iter().collect();
    // Sorted so that control sequence names are interned in a fixed order.
    built_ins.sort_by_key(|(name, _)| *name);
    for (name, built_in) in built_ins {
        expander.register_built_in(name, built_in);
    }
}

/// Whether the primitive is one of the conditionals.
pub fn is_conditional(built_in: &BuiltIn) -> bool {
    matches!(built_in.cmd().tag(), Some(Tag::Conditional(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_primitive_is_documented() {
        for (name, built_in) in all() {
            assert!(built_in.doc().is_some(), "\\{name} has no documentation");
        }
    }

    #[test]
    fn conditionals() {
        let all = all();
        assert_eq!(all.values().filter(|b| is_conditional(b)).count(), 15);
    }
}
