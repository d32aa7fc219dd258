//! Value evaluation after variable substitution.
//!
//! - `~"text"` escapes are replaced by their unquoted contents
//! - `+`, `-`, `*` between numbers separated by whitespace are computed
//! - `/` is only computed inside parentheses, so `font: 12px/1.5` survives
//! - Parenthesised groups that reduce to a single number lose their parens
//!
//! Function arguments (`calc(...)`, `scale(...)`, `url(...)`) are left as
//! written. Operands with different units are left unevaluated.

/// Evaluate escapes and arithmetic in a substituted value.
///
/// # Examples
///
/// ```
/// use stylebuild::less::evaluate;
///
/// assert_eq!(evaluate("10px * 2"), "20px");
/// assert_eq!(evaluate("(20px / 4) 1em"), "5px 1em");
/// assert_eq!(evaluate("12px/1.5 sans-serif"), "12px/1.5 sans-serif");
/// assert_eq!(evaluate("~\"ms:alwaysHasItsOwnSyntax()\""), "ms:alwaysHasItsOwnSyntax()");
/// ```
pub fn evaluate(value: &str) -> String {
    let unescaped = unescape(value);
    let grouped = evaluate_groups(&unescaped);
    evaluate_operations(&grouped, false).unwrap_or(grouped)
}

/// Replace `~"..."` and `~'...'` with their contents.
fn unescape(value: &str) -> String {
    if !value.contains('~') {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            out.push(c);
            continue;
        }
        match c {
            '~' if matches!(chars.peek(), Some('"') | Some('\'')) => {
                let Some(q) = chars.next() else { break };
                for inner in chars.by_ref() {
                    if inner == q {
                        break;
                    }
                    out.push(inner);
                }
            }
            '"' | '\'' => {
                quote = Some(c);
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Evaluate bare parenthesised groups, innermost first.
fn evaluate_groups(value: &str) -> String {
    if !value.contains('(') {
        return value.to_string();
    }

    let chars: Vec<char> = value.chars().collect();
    let mut out = String::with_capacity(value.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '"' || c == '\'' {
            let end = chars[i + 1..].iter().position(|&ch| ch == c).map_or(chars.len(), |p| i + 2 + p);
            out.extend(&chars[i..end]);
            i = end;
            continue;
        }

        if c != '(' {
            out.push(c);
            i += 1;
            continue;
        }

        let Some(close) = matching_paren(&chars, i) else {
            out.extend(&chars[i..]);
            break;
        };

        let is_function = chars[..i].last().is_some_and(|&p| p.is_alphanumeric() || p == '-' || p == '_');
        let inner: String = chars[i + 1..close].iter().collect();

        if is_function {
            out.push('(');
            out.push_str(&inner);
            out.push(')');
        } else {
            let inner = evaluate_groups(&inner);
            match evaluate_operations(&inner, true) {
                Some(result) if parse_number(&result).is_some() => out.push_str(&result),
                Some(result) => {
                    out.push('(');
                    out.push_str(&result);
                    out.push(')');
                }
                None if parse_number(inner.trim()).is_some() => out.push_str(inner.trim()),
                None => {
                    out.push('(');
                    out.push_str(&inner);
                    out.push(')');
                }
            }
        }
        i = close + 1;
    }
    out
}

fn matching_paren(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, &c) in chars[open..].iter().enumerate() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Fold arithmetic between whitespace-separated numeric tokens.
///
/// Returns `None` when nothing was computed, so callers keep the original
/// spelling of untouched values.
fn evaluate_operations(value: &str, allow_division: bool) -> Option<String> {
    let mut tokens = split_tokens(value);
    if tokens.len() < 3 {
        return None;
    }

    let multiplicative: &[&str] = if allow_division { &["*", "/"] } else { &["*"] };
    let folded_mul = fold(&mut tokens, multiplicative);
    let folded_add = fold(&mut tokens, &["+", "-"]);

    (folded_mul || folded_add).then(|| tokens.join(" "))
}

fn fold(tokens: &mut Vec<String>, operators: &[&str]) -> bool {
    let mut changed = false;
    let mut i = 1;

    while i + 1 < tokens.len() {
        if operators.contains(&tokens[i].as_str()) {
            let result = match (parse_number(&tokens[i - 1]), parse_number(&tokens[i + 1])) {
                (Some(lhs), Some(rhs)) => apply(lhs, &tokens[i], rhs),
                _ => None,
            };
            if let Some(result) = result {
                tokens.splice(i - 1..=i + 1, [result]);
                changed = true;
                continue;
            }
        }
        i += 1;
    }
    changed
}

fn apply(lhs: (f64, &str), op: &str, rhs: (f64, &str)) -> Option<String> {
    let (a, a_unit) = lhs;
    let (b, b_unit) = rhs;

    let unit = match (a_unit.is_empty(), b_unit.is_empty()) {
        (true, _) => b_unit,
        (_, true) => a_unit,
        _ if a_unit.eq_ignore_ascii_case(b_unit) => a_unit,
        _ => return None,
    };

    let result = match op {
        "+" => a + b,
        "-" => a - b,
        "*" => a * b,
        "/" if b != 0.0 => a / b,
        _ => return None,
    };

    Some(format_number(result, unit))
}

/// Split on whitespace outside parentheses and quotes.
fn split_tokens(value: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for c in value.chars() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            current.push(c);
            continue;
        }
        match c {
            '"' | '\'' => {
                quote = Some(c);
                current.push(c);
            }
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Parse `-1.5px`, `10`, `50%` into a number and unit.
fn parse_number(token: &str) -> Option<(f64, &str)> {
    let unsigned = token.strip_prefix(['-', '+']).unwrap_or(token);
    let digits = unsigned.find(|c: char| !(c.is_ascii_digit() || c == '.')).unwrap_or(unsigned.len());
    let (number, unit) = unsigned.split_at(digits);

    if !number.chars().any(|c| c.is_ascii_digit()) || number.matches('.').count() > 1 {
        return None;
    }
    if !(unit.is_empty() || unit == "%" || unit.chars().all(|c| c.is_ascii_alphabetic())) {
        return None;
    }

    let sign_len = token.len() - unsigned.len();
    let value: f64 = token[..sign_len + number.len()].parse().ok()?;
    Some((value, unit))
}

fn format_number(value: f64, unit: &str) -> String {
    let rounded = (value * 1e8).round() / 1e8;
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{}{}", rounded, unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_values_unchanged() {
        assert_eq!(evaluate("1px solid #333"), "1px solid #333");
        assert_eq!(evaluate("0 -5px"), "0 -5px");
        assert_eq!(evaluate("Helvetica,  Arial"), "Helvetica,  Arial");
    }

    #[test]
    fn test_multiplication_and_addition() {
        assert_eq!(evaluate("10px * 2"), "20px");
        assert_eq!(evaluate("2 * 10px"), "20px");
        assert_eq!(evaluate("10px + 5px * 2"), "20px");
        assert_eq!(evaluate("1em - 0.25em"), "0.75em");
    }

    #[test]
    fn test_mismatched_units_left_alone() {
        assert_eq!(evaluate("10px + 1em"), "10px + 1em");
    }

    #[test]
    fn test_division_only_in_parens() {
        assert_eq!(evaluate("12px/1.5"), "12px/1.5");
        assert_eq!(evaluate("10px / 2"), "10px / 2");
        assert_eq!(evaluate("(10px / 2)"), "5px");
        assert_eq!(evaluate("(1 / 3)"), "0.33333333");
    }

    #[test]
    fn test_functions_untouched() {
        assert_eq!(evaluate("calc(100% - 10px)"), "calc(100% - 10px)");
        assert_eq!(evaluate("scale(1) rotate(45deg)"), "scale(1) rotate(45deg)");
        assert_eq!(evaluate("url(\"a (1).png\")"), "url(\"a (1).png\")");
    }

    #[test]
    fn test_nested_groups() {
        assert_eq!(evaluate("((2px + 2px) * 2)"), "8px");
        assert_eq!(evaluate("(4px) 0"), "4px 0");
    }

    #[test]
    fn test_unescape() {
        assert_eq!(evaluate("~\"progid:DXImageTransform.Microsoft.gradient()\""), "progid:DXImageTransform.Microsoft.gradient()");
        assert_eq!(evaluate("\"~keep\""), "\"~keep\"");
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("10px"), Some((10.0, "px")));
        assert_eq!(parse_number("-1.5em"), Some((-1.5, "em")));
        assert_eq!(parse_number("50%"), Some((50.0, "%")));
        assert_eq!(parse_number(".5"), Some((0.5, "")));
        assert_eq!(parse_number("#fff"), None);
        assert_eq!(parse_number("1e3"), None);
        assert_eq!(parse_number("-"), None);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(20.0, "px"), "20px");
        assert_eq!(format_number(-0.0, ""), "0");
        assert_eq!(format_number(0.1 + 0.2, "em"), "0.3em");
    }
}
