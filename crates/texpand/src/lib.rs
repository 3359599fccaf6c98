//! # Texpand: a TeX macro and conditional expander.
//!
//! Texpand consumes a stream of category-coded tokens and presents a flat stream
//!     of fully expanded tokens: macro invocations are replaced by their substituted
//!     replacement texts, conditionals are evaluated and their untaken branches dropped,
//!     and definitions and grouping are executed.
//!
//! ```
//! use texpand::{token::lexer::Lexer, Expander};
//!
//! let mut expander = Expander::new(Lexer::new("doc.tex", r"\def\double#1{#1#1}\double{ab}"));
//! texpand::primitives::register(&mut expander);
//! let tokens = expander.expand_all().unwrap();
//! assert_eq!(texpand::token::write_tokens(&tokens, expander.interner()), "abab");
//! ```

pub mod command;
pub mod conditional;
pub mod error;
pub mod expander;
pub mod matcher;
pub mod mode;
pub mod parse;
pub mod primitives;
pub mod source;
pub mod texmacro;
pub mod token;

pub use error::Error;
pub use expander::Config;
pub use expander::Expander;
pub use source::TokenSource;
pub use token::Token;
