//! Best-effort reformatting of overlong generated lines.
//!
//! These are textual heuristics, not a parser. Precedence: method chains,
//! then very long call argument lists, then string concatenation, then
//! assignments. A line no heuristic can handle is returned unchanged; a long
//! line is preferable to broken code.

const MAX_LINE_LENGTH: usize = 120;
const CONTINUATION_INDENT: &str = "    ";

/// Fix common lint issues: wrap overlong lines and strip trailing whitespace.
pub fn format_code(code: &str) -> String {
    let wrapped = format_long_lines(code, MAX_LINE_LENGTH);
    wrapped
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_long_lines(code: &str, max_length: usize) -> String {
    let mut formatted = Vec::new();

    for line in code.lines() {
        if line.len() <= max_length {
            formatted.push(line.to_string());
        } else {
            formatted.extend(break_long_line(line, max_length));
        }
    }

    formatted.join("\n")
}

/// Break a single overlong line into continuation lines.
///
/// Known limitation: the chain heuristic splits on every `.`, so segments
/// containing nested parentheses or string literals with embedded dots can
/// produce syntactically invalid continuations. Callers accept this.
pub fn break_long_line(line: &str, max_length: usize) -> Vec<String> {
    // Comments can stay long
    if line.trim_start().starts_with('#') {
        return vec![line.to_string()];
    }

    // 1. Method chaining
    if line.matches('.').count() > 1 {
        return break_chain(line, max_length);
    }

    // 2. Function calls with many arguments: only attempted for extreme
    //    lengths, otherwise fall through to the next heuristic
    if line.contains('(') && line.matches(',').count() > 2 && line.len() > max_length * 3 / 2 {
        if let Some(paren) = line.find('(') {
            return vec![
                line[..=paren].to_string(),
                format!("{CONTINUATION_INDENT}{}", &line[paren + 1..]),
            ];
        }
    }

    // 3. String concatenation
    if line.matches(" + ").count() > 1 {
        return break_concatenation(line, max_length);
    }

    // 4. Assignment with a long right-hand side
    if let Some((lhs, rhs)) = line.split_once(" = ") {
        if rhs.len() + lhs.len() + 3 > max_length {
            let indent = leading_whitespace(line);
            return vec![
                format!("{lhs} = ("),
                format!("{indent}{CONTINUATION_INDENT}{rhs})"),
            ];
        }
    }

    vec![line.to_string()]
}

fn break_chain(line: &str, max_length: usize) -> Vec<String> {
    let parts: Vec<&str> = line.split('.').collect();
    let mut result = Vec::new();
    let mut current = parts[0].to_string();

    for part in &parts[1..] {
        if current.len() + 1 + part.len() <= max_length {
            current.push('.');
            current.push_str(part);
        } else {
            result.push(current.trim_end().to_string());
            current = format!("{CONTINUATION_INDENT}.{part}");
        }
    }

    if !current.trim().is_empty() {
        result.push(current);
    }

    if result.len() > 1 {
        result
    } else {
        vec![line.to_string()]
    }
}

fn break_concatenation(line: &str, max_length: usize) -> Vec<String> {
    let parts: Vec<&str> = line.split(" + ").collect();
    let indent = leading_whitespace(line);
    let mut result = Vec::new();
    let mut current = parts[0].to_string();

    for part in &parts[1..] {
        if current.len() + 3 + part.len() <= max_length {
            current.push_str(" + ");
            current.push_str(part);
        } else {
            result.push(format!("{} +", current.trim_end()));
            current = format!("{indent}{CONTINUATION_INDENT}{}", part.trim_start());
        }
    }

    if !current.trim().is_empty() {
        result.push(current);
    }

    if result.len() > 1 {
        result
    } else {
        vec![line.to_string()]
    }
}

fn leading_whitespace(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}
