//! Helpers for testing code built on Texpand.
//!
//! There are two kinds of case:
//!
//! - An *expansion* case, checked by [run_expansion_equality_test], expands a TeX snippet
//!     with the standard primitives and compares the result to a second snippet.
//!     The second snippet is lexed but never expanded,
//!     so it may name control sequences that are undefined.
//!
//! - A *failure* case, checked by [run_failure_test], expands a snippet to the end
//!     and expects an error of a given [Kind].
//!     Groups and conditionals left open at the end of input count as errors.
//!
//! Suites of cases are usually declared with [test_suite], which makes one `#[test]` per case.

use texpand::token::lexer::Lexer;
use texpand::token::{CommandRef, CsNameInterner, Token, Value};
use texpand::Expander;

pub use texpand::error::Kind;
pub use texpand::mode::Mode;

/// Changes how the expander of a test case is set up.
#[derive(Debug, Clone, Copy)]
pub enum TestOption {
    /// Maximum number of expansions without progress.
    ///
    /// Overrides previous `MaxExpansionDepth` options.
    MaxExpansionDepth(usize),

    /// The mode reported to mode-dependent conditionals like `\ifhmode`.
    ///
    /// Overrides previous `Mode` options.
    Mode(Mode),
}

struct ResolvedOptions {
    config: texpand::Config,
    mode: Mode,
}

impl ResolvedOptions {
    fn new(options: &[TestOption]) -> Self {
        let mut resolved = Self {
            config: Default::default(),
            mode: Default::default(),
        };
        for option in options {
            match option {
                TestOption::MaxExpansionDepth(n) => resolved.config.max_expansion_depth = *n,
                TestOption::Mode(mode) => resolved.mode = *mode,
            }
        }
        resolved
    }
}

fn initialize_expander(input: &str, options: &ResolvedOptions) -> Expander {
    let mut expander = Expander::new(Lexer::new("testing.tex", input))
        .with_config(options.config)
        .with_mode_oracle(texpand::mode::FixedMode(options.mode));
    texpand::primitives::register(&mut expander);
    expander
}

/// Asserts that `input` expands to the tokens of `expected`.
///
/// Trailing spaces on either side are ignored.
pub fn run_expansion_equality_test(input: &str, expected: &str, options: &[TestOption]) {
    let options = ResolvedOptions::new(options);
    let mut expander = initialize_expander(input, &options);
    let actual = match expander.expand_all() {
        Ok(tokens) => tokens,
        Err(err) => panic!("expanding the input failed:\n{err}"),
    };
    let mut interner = CsNameInterner::default();
    let expected_tokens = lex(expected, &mut interner);

    let actual_descriptions = describe(&actual, expander.interner());
    let expected_descriptions = describe(&expected_tokens, &interner);
    if actual_descriptions == expected_descriptions {
        return;
    }
    let first_difference = actual_descriptions
        .iter()
        .zip(&expected_descriptions)
        .position(|(a, b)| a != b)
        .unwrap_or(actual_descriptions.len().min(expected_descriptions.len()));
    panic!(
        "expansion differs at token {first_difference}\n   actual: '{}' ({} tokens)\n expected: '{}' ({} tokens)",
        texpand::token::write_tokens(&actual, expander.interner()),
        actual_descriptions.len(),
        texpand::token::write_tokens(&expected_tokens, &interner),
        expected_descriptions.len(),
    );
}

/// Asserts that expanding `input` to the end fails with an error of the given kind.
pub fn run_failure_test(input: &str, kind: Kind, options: &[TestOption]) {
    let options = ResolvedOptions::new(options);
    let mut expander = initialize_expander(input, &options);
    match expander.expand_all() {
        Ok(output) => {
            panic!(
                "expected a {kind:?} error but expansion succeeded with '{}'",
                texpand::token::write_tokens(&output, expander.interner())
            );
        }
        Err(err) => {
            println!("{err}");
            assert_eq!(err.kind(), kind, "Expansion failed with the wrong error kind");
        }
    }
}

fn lex(input: &str, interner: &mut CsNameInterner) -> Vec<Token> {
    use texpand::TokenSource;
    let mut lexer = Lexer::new("expected.tex", input);
    let mut tokens = vec![];
    loop {
        match lexer.next(interner) {
            Ok(Some(token)) => tokens.push(token),
            Ok(None) => return tokens,
            Err(err) => panic!("lexing the expected tokens failed:\n{err}"),
        }
    }
}

/// Describes tokens independently of the interner that produced them.
fn describe(tokens: &[Token], interner: &CsNameInterner) -> Vec<String> {
    let mut descriptions: Vec<String> = tokens
        .iter()
        .map(|token| match token.value() {
            Value::CommandRef(CommandRef::ControlSequence(name)) => {
                format!("\\{}", interner.resolve(name))
            }
            Value::CommandRef(CommandRef::ActiveCharacter(c)) => format!("active {c:?}"),
            _ => match (token.char(), token.cat_code()) {
                (Some(c), Some(cat_code)) => format!("{c:?} {cat_code}"),
                _ => format!("{:?}", token.value()),
            },
        })
        .collect();
    while descriptions
        .last()
        .is_some_and(|last| last.ends_with(&format!("{}", texpand::token::CatCode::Space)))
    {
        descriptions.pop();
    }
    descriptions
}

/// Declares a suite of test cases.
///
/// ```
/// # use texpand_testing::*;
/// test_suite![
///     options(TestOption::Mode(Mode::Horizontal)),
///     expansion_equality_tests(
///         (case_1, r"\def\a{b}\a", "b"),
///         (case_2, r"\ifhmode y\fi", "y"),
///     ),
///     failure_tests(
///         (case_3, r"\undefined", UndefinedControlSequence),
///         (case_4, r"\iftrue", FatalSyntax),
///     ),
/// ];
/// ```
///
/// Expansion cases are `(name, input, expected)` and failure cases are `(name, input, kind)`,
///     where `kind` names a variant of [Kind].
/// The optional `options(...)` list of [TestOption] values comes first and applies to every case.
#[macro_export]
macro_rules! test_suite {
    ( options $options: tt, expansion_equality_tests ( $( ($name: ident, $input: expr, $expected: expr $(,)? ) ),* $(,)? ) $(,)? ) => (
        $(
            #[test]
            fn $name() {
                let options: Vec<$crate::TestOption> = vec! $options;
                $crate::run_expansion_equality_test(&$input, &$expected, &options);
            }
        )*
    );
    ( options $options: tt, expansion_equality_tests $test_body: tt $(,)? ) => (
        compile_error!("expansion_equality_tests cases are (name, input, expected)");
    );
    ( options $options: tt, failure_tests ( $( ($name: ident, $input: expr, $kind: ident $(,)? ) ),* $(,)? ) $(,)? ) => (
        $(
            #[test]
            fn $name() {
                let options: Vec<$crate::TestOption> = vec! $options;
                $crate::run_failure_test(&$input, $crate::Kind::$kind, &options);
            }
        )*
    );
    ( options $options: tt, failure_tests $test_body: tt $(,)? ) => (
        compile_error!("failure_tests cases are (name, input, kind)");
    );
    ( options $options: tt, $test_kind: ident $test_cases: tt $(,)? ) => (
        compile_error!("test_suite! accepts `options`, `expansion_equality_tests` and `failure_tests`");
    );
    ( options $options: tt, $( $test_kind: ident $test_cases: tt ),+ $(,)? ) => (
        $(
            $crate::test_suite![options $options, $test_kind $test_cases,];
        )+
    );
    ( $( $test_kind: ident $test_cases: tt ),+ $(,)? ) => (
        $crate::test_suite![options (), $( $test_kind $test_cases, )+ ];
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    test_suite![
        expansion_equality_tests(
            (trailing_space_ignored, r"a ", "a"),
            (rhs_is_not_expanded, r"\def\a{b}\noexpand\a", r"\a"),
        ),
        failure_tests((undefined, r"\undefined", UndefinedControlSequence),),
    ];

    test_suite![
        options(TestOption::MaxExpansionDepth(5)),
        failure_tests((depth, r"\def\a{\a}\a", ExpansionDepthExceeded),),
    ];
}
