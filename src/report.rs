// Pretty error reporting with source highlighting using ariadne

use crate::error::CompileError;
use ariadne::{Color, Label, Report, ReportKind, Source};
use std::ops::Range;
use std::process;

/// Report a compilation error with source highlighting
///
/// Malformed-AST errors also print the IR emitted before the failure.
pub fn report_error(filename: &str, source: &str, error: &CompileError) {
    let span = error
        .line()
        .and_then(|line| line_span(source, line))
        .unwrap_or(0..0);

    let report = build_report(error, span);
    if let Err(e) = report.eprint(Source::from(source)) {
        eprintln!("failed to print error report: {}", e);
    }

    // Print filename for context
    match error.line() {
        Some(line) => eprintln!("  --> {}:{}", filename, line),
        None => eprintln!("  --> {}", filename),
    }

    if let Some(dump) = error.ir_dump()
        && !dump.is_empty()
    {
        eprintln!("IR emitted so far:\n{}", dump);
    }
}

/// Report and terminate the process with status 1
pub fn fatal(filename: &str, source: &str, error: &CompileError) -> ! {
    report_error(filename, source, error);
    process::exit(1)
}

/// Byte range of a 1-based line, without its newline
fn line_span(source: &str, line: usize) -> Option<Range<usize>> {
    let mut start = 0;
    for (index, text) in source.split('\n').enumerate() {
        if index + 1 == line {
            return Some(start..start + text.len());
        }
        start += text.len() + 1;
    }
    None
}

/// Build an ariadne Report from a CompileError
fn build_report(error: &CompileError, span: Range<usize>) -> Report<'static, Range<usize>> {
    let has_line = error.line().is_some();

    match error {
        CompileError::MalformedAst { message, .. } => {
            let report = Report::build(ReportKind::Error, span.clone())
                .with_code("E001")
                .with_message("Malformed syntax tree");
            let report = if has_line {
                report.with_label(
                    Label::new(span)
                        .with_message(message.clone())
                        .with_color(Color::Red),
                )
            } else {
                report.with_note(message.clone())
            };
            report
                .with_help("The front end produced a shape the back end cannot lower")
                .finish()
        }

        CompileError::NonConstantGlobal { name, .. } => {
            let report = Report::build(ReportKind::Error, span.clone())
                .with_code("E002")
                .with_message(format!("Initializer of global `{}` is not a constant", name));
            let report = if has_line {
                report.with_label(
                    Label::new(span)
                        .with_message("cannot be computed at load time")
                        .with_color(Color::Red),
                )
            } else {
                report
            };
            report
                .with_help("Global initializers may only use literals and operators")
                .finish()
        }

        CompileError::UnresolvedOperand { variable, context } => {
            Report::build(ReportKind::Error, span)
                .with_code("E003")
                .with_message(format!("Internal error: unresolved operand `{}`", variable))
                .with_note(context.clone())
                .finish()
        }

        CompileError::InvalidConfig(reason) => Report::build(ReportKind::Error, span)
            .with_code("E004")
            .with_message("Invalid configuration")
            .with_note(reason.clone())
            .finish(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_span() {
        let source = "int x;\nint y = z;\n";
        assert_eq!(line_span(source, 1), Some(0..6));
        assert_eq!(line_span(source, 2), Some(7..17));
        assert_eq!(line_span(source, 9), None);
    }

    #[test]
    fn test_every_error_kind_builds_a_report() {
        let errors = vec![
            CompileError::MalformedAst {
                line: 2,
                message: "bad".to_string(),
                ir_dump: "fn.f:\n".to_string(),
            },
            CompileError::NonConstantGlobal {
                name: "y".to_string(),
                line: 2,
            },
            CompileError::unresolved("x.l", "no slot"),
            CompileError::InvalidConfig("nope".to_string()),
        ];
        for error in &errors {
            let span = error.line().and_then(|l| line_span("a\nb\n", l)).unwrap_or(0..0);
            let _ = build_report(error, span);
        }
    }
}
