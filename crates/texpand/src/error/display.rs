use super::Error;
use colored::*;

pub fn format_error(f: &mut std::fmt::Formatter<'_>, err: &Error) -> std::fmt::Result {
    writeln!(
        f,
        "{}: {}",
        format!["Error ({})", err.kind()].bright_red().bold(),
        err.title().bold()
    )?;
    let margin = match err.trace() {
        None => 1,
        Some(trace) => trace.line_number.to_string().len() + 1,
    };
    let bar = format!["{}|", " ".repeat(margin)].bright_blue().bold();
    if let Some(trace) = err.trace() {
        writeln!(
            f,
            "{}{} {}:{}:{}",
            " ".repeat(margin - 1),
            "-->".bright_blue().bold(),
            trace.file_name,
            trace.line_number,
            trace.index + 1
        )?;
        writeln!(f, "{bar}")?;
        writeln!(
            f,
            "{} {}",
            format!["{} |", trace.line_number].bright_blue().bold(),
            trace.line_content
        )?;
        let underline = "^".repeat(trace.value.chars().count().max(1));
        writeln!(
            f,
            "{bar} {}{}",
            " ".repeat(trace.index),
            underline.bright_red().bold()
        )?;
    } else if let Some(token) = err.token() {
        writeln!(f, "{bar} while reading `{token}`")?;
    }
    for note in err.notes() {
        writeln!(f, "{} {} {}", bar, "=".bright_blue().bold(), note)?;
    }
    if let Some(context) = err.context() {
        write!(
            f,
            "{} {} {} group(s) open, {} conditional(s) open, expansion depth {}",
            bar,
            "context:".bold(),
            context.group_depth,
            context.conditional_depth,
            context.expansion_depth,
        )?;
        if !context.macro_stack.is_empty() {
            write!(
                f,
                "\n{} {} {}",
                bar,
                "expanding:".bold(),
                context.macro_stack.join(" > ")
            )?;
        }
    }
    Ok(())
}
