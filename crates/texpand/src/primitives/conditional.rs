//! The conditional primitives.
//!
//! Each conditional is an expansion primitive tagged with its [ConditionalKind].
//! The tag is what allows the expander to track nesting while skipping branches,
//!     whatever name the conditional is bound to.

use crate::command::{BuiltIn, Tag};
use crate::conditional::{self, ConditionalKind};
use crate::error;
use crate::expander::Expander;
use crate::token::Token;

macro_rules! conditionals {
    ( $( ($getter: ident, $primitive: ident, $kind: ident, $doc: expr), )+ ) => {
        $(
            #[doc = concat!("Get the `", $doc, "` conditional.")]
            pub fn $getter() -> BuiltIn {
                BuiltIn::new_expansion($primitive)
                    .with_tag(Tag::Conditional(ConditionalKind::$kind))
                    .with_doc($doc)
            }

            fn $primitive(token: Token, expander: &mut Expander) -> error::Result<()> {
                expander.evaluate_conditional(token, ConditionalKind::$kind)
            }
        )+
    };
}

conditionals![
    (get_ifnum, ifnum_primitive_fn, Num, r"\ifnum"),
    (get_ifdim, ifdim_primitive_fn, Dim, r"\ifdim"),
    (get_ifodd, ifodd_primitive_fn, Odd, r"\ifodd"),
    (get_ifx, ifx_primitive_fn, X, r"\ifx"),
    (get_if, if_primitive_fn, Char, r"\if"),
    (get_ifcat, ifcat_primitive_fn, Cat, r"\ifcat"),
    (get_iftrue, iftrue_primitive_fn, True, r"\iftrue"),
    (get_iffalse, iffalse_primitive_fn, False, r"\iffalse"),
    (get_ifcase, ifcase_primitive_fn, Case, r"\ifcase"),
    (get_ifdefined, ifdefined_primitive_fn, Defined, r"\ifdefined"),
    (get_ifcsname, ifcsname_primitive_fn, CsName, r"\ifcsname"),
    (get_ifvmode, ifvmode_primitive_fn, VMode, r"\ifvmode"),
    (get_ifhmode, ifhmode_primitive_fn, HMode, r"\ifhmode"),
    (get_ifmmode, ifmmode_primitive_fn, MMode, r"\ifmmode"),
    (get_ifinner, ifinner_primitive_fn, Inner, r"\ifinner"),
];

/// Get the `\else` primitive.
pub fn get_else() -> BuiltIn {
    BuiltIn::new_expansion(conditional::else_primitive)
        .with_tag(Tag::Else)
        .with_doc("Begin the false branch of a conditional")
}

/// Get the `\or` primitive.
pub fn get_or() -> BuiltIn {
    BuiltIn::new_expansion(conditional::or_primitive)
        .with_tag(Tag::Or)
        .with_doc("Begin the next case of \\ifcase")
}

/// Get the `\fi` primitive.
pub fn get_fi() -> BuiltIn {
    BuiltIn::new_expansion(conditional::fi_primitive)
        .with_tag(Tag::Fi)
        .with_doc("End a conditional")
}

/// Get the `\unless` primitive.
pub fn get_unless() -> BuiltIn {
    BuiltIn::new_expansion(conditional::unless_primitive)
        .with_tag(Tag::Unless)
        .with_doc("Negate the next conditional")
}

#[cfg(test)]
mod tests {
    use texpand_testing::*;

    test_suite![
        expansion_equality_tests(
            (iftrue_base_case, r"\iftrue a\else b\fi c", "ac"),
            (iftrue_no_else, r"\iftrue a\fi c", "ac"),
            (iftrue_skip_nested_ifs, r"\iftrue a\else b\iftrue \else c\fi d\fi e", "ae"),
            (iffalse_base_case, r"\iffalse a\else b\fi c", "bc"),
            (iffalse_no_else, r"\iffalse a\fi c", "c"),
            (iffalse_skip_nested_ifs, r"\iffalse \iftrue a\else b\fi c\else d\fi e", "de"),
            (
                iffalse_and_iftrue_1,
                r"\iffalse a\else b\iftrue c\else d\fi e\fi f",
                "bcef"
            ),
            (
                iffalse_and_iftrue_2,
                r"\iftrue a\iffalse b\else c\fi d\else e\fi f",
                "acdf"
            ),
            (ifnum_greater_true, r"\ifnum 3>2 A\else B\fi", "A"),
            (ifnum_greater_false, r"\ifnum 2>3 A\else B\fi", "B"),
            (ifnum_less_than_true, r"\ifnum 4<5a\else b\fi c", "ac"),
            (ifnum_less_than_false, r"\ifnum 5<4a\else b\fi c", "bc"),
            (ifnum_equal_true, r"\ifnum 4=4a\else b\fi c", "ac"),
            (ifnum_equal_false, r"\ifnum 5=4a\else b\fi c", "bc"),
            (ifnum_negative, r"\ifnum -5<-4a\else b\fi c", "ac"),
            (ifnum_from_macros, r"\def\a{7}\def\b{3}\ifnum\a>\b y\else n\fi", "y"),
            (ifnum_terminated_by_fi, r"\ifnum 1<2\fi x", "x"),
            (ifnum_terminated_by_else, r"\ifnum 2<1\else y\fi", "y"),
            (ifdim_true, r"\ifdim 1pt<2pt a\else b\fi", "a"),
            (ifdim_units, r"\ifdim 1pc=12pt a\else b\fi", "a"),
            (ifdim_false, r"\ifdim 1pc<11pt a\else b\fi", "b"),
            (ifodd_odd, r"\ifodd 3a\else b\fi c", "ac"),
            (ifodd_even, r"\ifodd 4a\else b\fi c", "bc"),
            (ifodd_negative, r"\ifodd -3a\else b\fi c", "ac"),
            (ifcase_zero, r"\ifcase 0 a\or b\or c\else d\fi e", "ae"),
            (ifcase_one, r"\ifcase 1 a\or b\or c\else d\fi e", "be"),
            (ifcase_two, r"\ifcase 2 a\or b\or c\else d\fi e", "ce"),
            (ifcase_else, r"\ifcase 3 a\or b\or c\else d\fi e", "de"),
            (ifcase_negative, r"\ifcase -1 a\or b\or c\else d\fi e", "de"),
            (ifcase_no_else, r"\ifcase 3 a\or b\or c\fi e", "e"),
            (
                ifcase_nested,
                r"\ifcase 1 a\or b\ifcase 1 x\or y\or z\fi\or c\fi e",
                "bye"
            ),
            (
                ifcase_skip_nested,
                r"\ifcase 2 a\or \ifcase 0 x\or y\fi\or c\fi e",
                "ce"
            ),
            (ifx_same_character, r"\ifx aay\else n\fi", "y"),
            (ifx_different_catcode, r"\ifx a1y\else n\fi", "n"),
            (ifx_same_macro, r"\def\a{x}\def\b{x}\ifx\a\b y\else n\fi", "y"),
            (ifx_different_macros, r"\def\a{x}\def\b{z}\ifx\a\b y\else n\fi", "n"),
            (ifx_different_flags, r"\def\a{x}\long\def\b{x}\ifx\a\b y\else n\fi", "n"),
            (ifx_let, r"\let\a\relax\ifx\a\relax y\else n\fi", "y"),
            (ifx_undefined, r"\ifx\undefinedA\undefinedB y\else n\fi", "y"),
            (ifx_primitives, r"\ifx\ifnum\ifdim y\else n\fi", "n"),
            (ifx_character_alias, r"\let\a=x\ifx\a xy\else n\fi", "y"),
            (if_same_character, r"\if aay\else n\fi", "y"),
            (if_different_characters, r"\if ab y\else n\fi", "n"),
            (if_expands, r"\def\a{b}\if b\a y\else n\fi", "y"),
            (if_control_sequences, r"\if\relax\relax y\else n\fi", "y"),
            (if_noexpand, r"\def\a{b}\if\noexpand\a\relax y\else n\fi", "y"),
            (ifcat_letters, r"\ifcat aby\else n\fi", "y"),
            (ifcat_letter_other, r"\ifcat a1y\else n\fi", "n"),
            (ifdefined_true, r"\def\a{}\ifdefined\a y\else n\fi", "y"),
            (ifdefined_false, r"\ifdefined\a y\else n\fi", "n"),
            (ifdefined_primitive, r"\ifdefined\relax y\else n\fi", "y"),
            (ifcsname_true, r"\def\ab{}\ifcsname ab\endcsname y\else n\fi", "y"),
            (ifcsname_false, r"\ifcsname ab\endcsname y\else n\fi\ifdefined\ab y\else n\fi", "nn"),
            (ifvmode, r"\ifvmode y\else n\fi", "y"),
            (ifhmode, r"\ifhmode y\else n\fi", "n"),
            (ifmmode, r"\ifmmode y\else n\fi", "n"),
            (ifinner, r"\ifinner y\else n\fi", "n"),
            (unless_true, r"\unless\iftrue y\else n\fi", "n"),
            (unless_ifnum, r"\unless\ifnum 1<2 y\else n\fi", "n"),
            (unless_ifx, r"\unless\ifx aby\else n\fi", "y"),
            (
                skipped_branch_with_undefined,
                r"\iffalse \undefined\else y\fi",
                "y"
            ),
            (
                skipped_branch_with_unless,
                r"\iffalse \unless\iftrue a\else b\fi\else y\fi",
                "y"
            ),
            (
                conditional_in_macro,
                r"\def\test#1{\ifnum #1>2 big\else small\fi}\test3 \test1",
                "big small"
            ),
            (
                tail_recursion,
                r"\def\a#1{\ifx#1e\else x\expandafter\a\fi}\a abce",
                "xxx"
            ),
        ),
        failure_tests(
            (else_not_expected, r"a\else", FatalSyntax),
            (fi_not_expected, r"a\fi", FatalSyntax),
            (or_not_expected, r"a\or", FatalSyntax),
            (or_outside_ifcase, r"\iftrue a\or b\fi", FatalSyntax),
            (or_in_skipped_if, r"\iffalse a\or b\fi", FatalSyntax),
            (double_else, r"\iffalse a\else b\else c\fi", FatalSyntax),
            (missing_fi, r"\iftrue a", FatalSyntax),
            (missing_fi_skipping, r"\iffalse a", FatalSyntax),
            (missing_fi_nested, r"\iftrue \iftrue a\fi", FatalSyntax),
            (ifnum_missing_relation, r"\ifnum 1 2 a\fi", InvalidNumber),
            (ifnum_missing_number, r"\ifnum a<2 a\fi", InvalidNumber),
            (ifnum_end_of_input, r"\ifnum 1<", EndOfInput),
            (ifdim_missing_unit, r"\ifdim 1<2pt a\fi", InvalidNumber),
            (unless_ifcase, r"\unless\ifcase 0 a\fi", FatalSyntax),
            (unless_character, r"\unless a", FatalSyntax),
            (outer_in_skipped_branch, r"\outer\def\o{}\iffalse\o\fi", OuterInPreamble),
        ),
    ];

    test_suite![
        options(TestOption::Mode(Mode::Horizontal)),
        expansion_equality_tests(
            (ifhmode_in_horizontal_mode, r"\ifhmode y\else n\fi", "y"),
            (ifvmode_in_horizontal_mode, r"\ifvmode y\else n\fi", "n"),
        ),
    ];

    test_suite![
        options(TestOption::Mode(Mode::Math)),
        expansion_equality_tests(
            (ifmmode_in_math_mode, r"\ifmmode y\else n\fi", "y"),
            (ifinner_in_math_mode, r"\ifinner y\else n\fi", "y"),
        ),
    ];
}
