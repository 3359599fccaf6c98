use clap::Parser;
use colored::Colorize;
use galley::node::{Horizontal, Mark, Vertical};
use galley::text::{FixedPitch, NoHyphenation, TextBuilder};
use galley::{BestVerticalBreak, Page, Params, VerticalList};
use galley_core::{Scaled, ScaledUnit};
use std::fs;
use std::path::PathBuf;
use texpand::token::lexer::Lexer;
use texpand::token::{CommandRef, Value};
use texpand::Expander;

/// Galley: expand TeX macros and break paragraphs into lines and pages
#[derive(Parser)]
#[clap(version)]
struct Cli {
    /// Log more; repeat for even more output
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[clap(subcommand)]
    sub_command: SubCommand,
}

#[derive(Parser)]
enum SubCommand {
    Expand(Expand),
    Typeset(Typeset),
}

fn main() {
    let args: Cli = Cli::parse();
    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    let result = match args.sub_command {
        SubCommand::Expand(expand) => expand.run(),
        SubCommand::Typeset(typeset) => typeset.run(),
    };
    if let Err(err) = result {
        eprintln!["{err}"];
        std::process::exit(1);
    }
}

/// Expand a TeX file and print the resulting tokens.
#[derive(Parser)]
struct Expand {
    /// Path to the TeX file.
    path: PathBuf,
}

impl Expand {
    fn run(self) -> Result<(), String> {
        let mut expander = expander(&self.path)?;
        let tokens = expander.expand_all().map_err(|err| err.to_string())?;
        println!(
            "{}",
            texpand::token::write_tokens(&tokens, expander.interner())
        );
        Ok(())
    }
}

/// Expand a TeX file, break it into lines and pages, and print the pages.
///
/// Every blank-line separated block of the expanded text becomes a paragraph.
/// Text is set in a fixed-pitch font without hyphenation.
#[derive(Parser)]
struct Typeset {
    /// Path to the TeX file.
    path: PathBuf,

    /// JSON file with typesetting parameters; missing fields take their default values.
    #[clap(long)]
    params: Option<PathBuf>,

    /// Width of every line, like `345pt` or `4.5in`.
    #[clap(long, value_parser = parse_dimension)]
    width: Option<Scaled>,

    /// Height of every page.
    #[clap(long, value_parser = parse_dimension)]
    page_goal: Option<Scaled>,
}

impl Typeset {
    fn run(self) -> Result<(), String> {
        let mut params = match &self.params {
            None => Params::default(),
            Some(path) => {
                let raw = read(path)?;
                serde_json::from_str(&raw)
                    .map_err(|err| format!["invalid parameters in {path:?}: {err}"])?
            }
        };
        if let Some(width) = self.width {
            params.line_widths = vec![width];
        }
        if let Some(page_goal) = self.page_goal {
            params.page_goal = page_goal;
        }

        let mut expander = expander(&self.path)?;
        let tokens = expander.expand_all().map_err(|err| err.to_string())?;
        let paragraphs = paragraphs(&tokens, &expander);
        log::info!("typesetting {} paragraphs", paragraphs.len());

        let metrics = FixedPitch::default();
        let mut vlist = VerticalList::new();
        for (k, text) in paragraphs.iter().enumerate() {
            let mut builder = TextBuilder::new(&metrics, &NoHyphenation);
            builder.push(Horizontal::Mark(Mark {
                class: 0,
                payload: format!["paragraph {}", k + 1],
            }));
            builder.add_text(text);
            let paragraph =
                galley::break_paragraph(builder.finish(), &mut params).map_err(|err| error(&err))?;
            for diagnostic in &paragraph.diagnostics {
                println!("{} paragraph {}: {diagnostic}", "warning:".yellow(), k + 1);
            }
            vlist.append_paragraph(paragraph, &params);
        }
        let pages = galley::break_pages(vlist.into_list(), &mut params, &BestVerticalBreak)
            .map_err(|err| error(&err))?;
        for (k, page) in pages.iter().enumerate() {
            print_page(k + 1, page);
        }
        Ok(())
    }
}

fn read(path: &PathBuf) -> Result<String, String> {
    fs::read_to_string(path).map_err(|err| format!["failed to open file {path:?}: {err}"])
}

fn expander(path: &PathBuf) -> Result<Expander, String> {
    let source = read(path)?;
    let mut expander = Expander::new(Lexer::new(&path.to_string_lossy(), source));
    texpand::primitives::register(&mut expander);
    Ok(expander)
}

fn error(err: &galley::Error) -> String {
    format!["{} {err}", "error:".bright_red().bold()]
}

/// Splits expanded tokens into paragraphs of text at each `\par`.
fn paragraphs(tokens: &[texpand::Token], expander: &Expander) -> Vec<String> {
    let mut paragraphs = vec![];
    let mut current = String::new();
    let mut flush = |current: &mut String| {
        let text = current.trim();
        if !text.is_empty() {
            paragraphs.push(text.to_string());
        }
        current.clear();
    };
    for token in tokens {
        match token.value() {
            Value::Letter(c) | Value::Other(c) => current.push(c),
            Value::Space(_) => current.push(' '),
            Value::CommandRef(CommandRef::ControlSequence(name))
                if expander.interner().resolve(name) == "par" =>
            {
                flush(&mut current)
            }
            _ => {}
        }
    }
    flush(&mut current);
    paragraphs
}

/// Parses a dimension like `12pt`; the unit defaults to points.
fn parse_dimension(s: &str) -> Result<Scaled, String> {
    let s = s.trim();
    let split = s
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);
    let unit = if unit.is_empty() {
        ScaledUnit::Point
    } else {
        ScaledUnit::parse(unit).ok_or_else(|| format!["unknown unit `{unit}`"])?
    };
    let (integer, fraction) = number.split_once('.').unwrap_or((number, ""));
    let integer: i32 = if integer.is_empty() {
        0
    } else {
        integer
            .parse()
            .map_err(|_| format!["invalid number `{number}`"])?
    };
    let digits = fraction
        .chars()
        .map(|c| c.to_digit(10).map(|d| d as u8))
        .collect::<Option<Vec<u8>>>()
        .ok_or_else(|| format!["invalid number `{number}`"])?;
    Scaled::new(integer, &digits, unit).map_err(|err| err.to_string())
}

fn print_page(number: usize, page: &Page) {
    println!("{}", format!["Page {number}"].bold());
    for float in &page.floats_top {
        println!("  [float {} tall]", float.height);
    }
    for node in &page.content.list {
        if let Vertical::HList(line) = node {
            let glue = match line.glue_sign {
                galley::node::GlueSign::Normal => String::new(),
                sign => format![" ({sign:?} {:.3} {:?})", line.glue_ratio.0, line.glue_order],
            };
            println!("  |{}|{}", line_text(&line.list), glue.dimmed());
        }
    }
    for float in &page.floats_bottom {
        println!("  [float {} tall]", float.height);
    }
    for (class, insertion) in &page.insertions {
        println!("  [insertion {class}: {} tall]", insertion.height);
    }
    for (class, marks) in &page.marks {
        println!(
            "  marks {class}: top={:?} first={:?} bot={:?}",
            marks.top, marks.first, marks.bot
        );
    }
    for diagnostic in &page.diagnostics {
        println!("  {} {diagnostic}", "warning:".yellow());
    }
}

fn line_text(list: &[Horizontal]) -> String {
    let mut text = String::new();
    for node in list {
        match node {
            Horizontal::Char(c) => text.push(c.char),
            Horizontal::Glue(_) => text.push(' '),
            Horizontal::Discretionary(d) => text.push_str(&line_text(&d.no_break)),
            _ => {}
        }
    }
    text.trim_end().to_string()
}
