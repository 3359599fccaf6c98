//! Inputs and drivers shared by the benchmarks.

use galley::node::{Horizontal, Vertical};
use galley::text::{FixedPitch, NoHyphenation, TextBuilder};
use galley::{Params, VerticalList};
use galley_core::Scaled;
use rand::Rng;
use texpand::token::lexer::Lexer;
use texpand::Expander;

static WORDS: [&str; 16] = [
    "the", "galley", "proof", "is", "set", "in", "lines", "of", "type", "and", "broken", "into",
    "pages", "before", "printing", "begins",
];

/// Random text of the given number of words.
pub fn random_text(rng: &mut rand::prelude::StdRng, num_words: usize) -> String {
    let mut result = String::new();
    for i in 0..num_words {
        if i > 0 {
            result.push(' ');
        }
        result.push_str(WORDS[rng.gen_range(0..WORDS.len())]);
    }
    result
}

/// A document in which `\x` expands into `2^depth` letters through `depth` levels of macros.
pub fn doubling_macros(depth: usize) -> String {
    let mut result = String::from(r"\expandafter\def\csname m0\endcsname{x}");
    for i in 1..=depth {
        result.push_str(&format![
            r"\expandafter\def\csname m{i}\endcsname{{\csname m{}\endcsname\csname m{}\endcsname}}",
            i - 1,
            i - 1
        ]);
    }
    result.push_str(&format![r"\csname m{depth}\endcsname"]);
    result
}

pub fn run_expander(input: &str) -> usize {
    let mut expander = Expander::new(Lexer::new("bench.tex", input));
    texpand::primitives::register(&mut expander);
    expander.expand_all().unwrap().len()
}

/// Horizontal list for the text, set in a fixed-pitch font.
pub fn horizontal_list(text: &str) -> Vec<Horizontal> {
    let metrics = FixedPitch::default();
    let mut builder = TextBuilder::new(&metrics, &NoHyphenation);
    builder.add_text(text);
    builder.finish()
}

/// Vertical list of the given number of paragraphs with the given number of words each.
pub fn vertical_list(
    rng: &mut rand::prelude::StdRng,
    num_paragraphs: usize,
    num_words: usize,
    params: &mut Params,
) -> Vec<Vertical> {
    let mut vlist = VerticalList::new();
    for _ in 0..num_paragraphs {
        let list = horizontal_list(&random_text(rng, num_words));
        let paragraph = galley::break_paragraph(list, params).unwrap();
        vlist.append_paragraph(paragraph, params);
    }
    vlist.into_list()
}

pub fn params() -> Params {
    Params {
        line_widths: vec![Scaled(300 << 16)],
        baseline_skip: galley_core::Glue {
            width: Scaled(12 << 16),
            stretch: Scaled(1 << 16),
            ..Default::default()
        },
        ..Default::default()
    }
}
