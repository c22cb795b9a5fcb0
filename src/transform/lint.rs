//! A small sanity check for scripts before bundling. Catches the classic
//! leftovers: loose equality, `debugger` statements and `eval` calls.
//! Warnings never fail the build.

/// One finding, pointing at a 1-based source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub line: usize,
    pub message: &'static str,
}

/// Scans a script and returns all findings in line order.
pub fn scan(source: &str) -> Vec<Warning> {
    let masked = mask(source);
    let mut warnings = Vec::new();

    for (index, line) in masked.lines().enumerate() {
        let number = index + 1;
        let bytes = line.as_bytes();

        for i in 0..bytes.len() {
            if loose_equality(bytes, i) {
                warnings.push(Warning {
                    line: number,
                    message: "Expected '===' and instead saw '=='.",
                });
            }
            if loose_inequality(bytes, i) {
                warnings.push(Warning {
                    line: number,
                    message: "Expected '!==' and instead saw '!='.",
                });
            }
            if word_at(line, i, "debugger") {
                warnings.push(Warning {
                    line: number,
                    message: "Unexpected 'debugger' statement.",
                });
            }
            if eval_call(line, i) {
                warnings.push(Warning {
                    line: number,
                    message: "eval can be harmful.",
                });
            }
        }
    }

    warnings
}

/// Replaces comments and string literals with spaces, keeping newlines so
/// line numbers survive. Regex literals are not recognized; a `==` inside
/// one is rare enough not to matter for a dev-time check.
fn mask(source: &str) -> String {
    enum State {
        Code,
        Line,
        Block,
        Str(char),
    }

    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut state = State::Code;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        match state {
            State::Code => match c {
                '/' if chars.peek() == Some(&'/') => {
                    state = State::Line;
                    out.push(' ');
                }
                '/' if chars.peek() == Some(&'*') => {
                    state = State::Block;
                    out.push(' ');
                }
                '\'' | '"' | '`' => {
                    state = State::Str(c);
                    out.push(' ');
                }
                _ => out.push(c),
            },
            State::Line => {
                if c == '\n' {
                    state = State::Code;
                    out.push('\n');
                } else {
                    out.push(' ');
                }
            }
            State::Block => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    state = State::Code;
                    out.push_str("  ");
                } else if c == '\n' {
                    out.push('\n');
                } else {
                    out.push(' ');
                }
            }
            State::Str(quote) => {
                if escaped {
                    escaped = false;
                    out.push(if c == '\n' { '\n' } else { ' ' });
                } else if c == '\\' {
                    escaped = true;
                    out.push(' ');
                } else if c == quote {
                    state = State::Code;
                    out.push(' ');
                } else if c == '\n' {
                    // template literals span lines
                    out.push('\n');
                } else {
                    out.push(' ');
                }
            }
        }
    }

    out
}

fn loose_equality(bytes: &[u8], i: usize) -> bool {
    bytes[i] == b'='
        && bytes.get(i + 1) == Some(&b'=')
        && bytes.get(i + 2) != Some(&b'=')
        && (i == 0 || !matches!(bytes[i - 1], b'=' | b'!' | b'<' | b'>'))
}

fn loose_inequality(bytes: &[u8], i: usize) -> bool {
    bytes[i] == b'!' && bytes.get(i + 1) == Some(&b'=') && bytes.get(i + 2) != Some(&b'=')
}

fn is_ident(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'$'
}

fn word_at(line: &str, i: usize, word: &str) -> bool {
    if !line.is_char_boundary(i) {
        return false;
    }

    let bytes = line.as_bytes();
    line[i..].starts_with(word)
        && (i == 0 || !is_ident(bytes[i - 1]))
        && bytes.get(i + word.len()).is_none_or(|&b| !is_ident(b))
}

fn eval_call(line: &str, i: usize) -> bool {
    if !word_at(line, i, "eval") || (i > 0 && line.as_bytes()[i - 1] == b'.') {
        return false;
    }

    line[i + 4..].trim_start().starts_with('(')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loose_equality() {
        let warnings = scan("if (a == b) {}\nif (a != b) {}");
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].line, 1);
        assert_eq!(warnings[1].line, 2);
    }

    #[test]
    fn test_strict_equality_passes() {
        assert!(scan("if (a === b || a !== c) {}").is_empty());
    }

    #[test]
    fn test_comparison_operators_pass() {
        assert!(scan("if (a <= b && a >= c) { a = b; }").is_empty());
    }

    #[test]
    fn test_debugger_statement() {
        let warnings = scan("function f() {\n  debugger;\n}");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].line, 2);
        assert_eq!(warnings[0].message, "Unexpected 'debugger' statement.");
    }

    #[test]
    fn test_eval_call() {
        let warnings = scan("eval('2 + 2');");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].message, "eval can be harmful.");
    }

    #[test]
    fn test_eval_lookalikes_pass() {
        assert!(scan("evaluate(x); retrieval(y); obj.eval(z);").is_empty());
    }

    #[test]
    fn test_strings_and_comments_are_ignored() {
        let source = r#"
// a == b in a comment
/* debugger inside
   a block comment */
var s = "a == b";
var t = 'eval(x)';
"#;
        assert!(scan(source).is_empty());
    }

    #[test]
    fn test_template_literal_spans_lines() {
        let source = "var s = `first\na == b\nlast`;\nvar x = a == b;";
        let warnings = scan(source);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].line, 4);
    }
}
