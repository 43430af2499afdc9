//! Delimiter matching: one algorithm interpreting every [`Delimiter`] family.
//!
//! Each rule compiles to a header regex plus, for banner families, a
//! terminator regex. Bodies are found by scanning for a header, then for the
//! first terminator line after it.

use regex::Regex;

use dbgsplit_shared::{Delimiter, Family, Result, SplitError, Termination};

/// A compiled delimiter rule.
#[derive(Debug, Clone)]
pub(crate) enum Matcher {
    /// Header line followed by a body running up to the next terminator line.
    Banner { header: Regex, terminator: Regex },
    /// A single line; the line itself is the capture.
    Marker { line: Regex },
}

impl Matcher {
    pub(crate) fn compile(delimiter: &Delimiter, termination: Termination) -> Result<Self> {
        let literal = regex::escape(delimiter.literal());
        let family = delimiter.family();

        let matcher = match family {
            Family::Marker => Matcher::Marker {
                line: build(&format!(r"(?m)^{literal}[^\n]*"))?,
            },
            Family::Asterisk | Family::Equals => {
                let run = run_pattern(family);
                Matcher::Banner {
                    header: build(&format!(
                        r"(?m)^{run}[ \t]*{literal}[ \t]*{run}[ \t]*\r?$"
                    ))?,
                    terminator: terminator(family, termination)?,
                }
            }
            Family::Dash => {
                let run = run_pattern(family);
                // `!address -summary` headers carry column titles after the title run.
                Matcher::Banner {
                    header: build(&format!(r"(?m)^{run}[ \t]*{literal}[ \t]*-[^\n]*$"))?,
                    terminator: terminator(family, termination)?,
                }
            }
        };

        Ok(matcher)
    }

    /// All non-overlapping captures in document order.
    pub(crate) fn find_all<'a>(&self, text: &'a str) -> Vec<&'a str> {
        match self {
            Matcher::Marker { line } => line
                .find_iter(text)
                .map(|m| m.as_str().strip_suffix('\r').unwrap_or(m.as_str()))
                .collect(),
            Matcher::Banner { header, terminator } => {
                let mut bodies = Vec::new();
                let mut cursor = 0;

                while let Some(head) = header.find_at(text, cursor) {
                    let body_start = skip_newline(text, head.end());
                    let body_end = terminator
                        .find_at(text, body_start)
                        .map_or(text.len(), |t| t.start());

                    bodies.push(strip_line_ending(&text[body_start..body_end]));

                    // The terminator line may itself open the next section.
                    cursor = body_end;
                    if cursor >= text.len() {
                        break;
                    }
                }

                bodies
            }
        }
    }
}

fn build(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| SplitError::catalog(format!("invalid pattern {pattern}: {e}")))
}

/// `\*{1,}`, `={3,}`, `-{3,}`.
fn run_pattern(family: Family) -> String {
    let symbol = family.symbol().map(|c| regex::escape(&c.to_string())).unwrap_or_default();
    format!("{symbol}{{{},}}", family.min_run())
}

fn terminator(family: Family, termination: Termination) -> Result<Regex> {
    let runs = match termination {
        Termination::FamilyScoped => run_pattern(family),
        Termination::AnyBanner => Family::BANNERS
            .iter()
            .map(|f| run_pattern(*f))
            .collect::<Vec<_>>()
            .join("|"),
    };
    build(&format!("(?m)^(?:{runs})"))
}

/// Position just past the line break at `pos` (if any).
fn skip_newline(text: &str, pos: usize) -> usize {
    if text[pos..].starts_with('\n') {
        pos + 1
    } else {
        pos
    }
}

/// Drop one trailing `\n` or `\r\n`; the break belongs to the following line.
fn strip_line_ending(body: &str) -> &str {
    match body.strip_suffix('\n') {
        Some(rest) => rest.strip_suffix('\r').unwrap_or(rest),
        None => body,
    }
}
