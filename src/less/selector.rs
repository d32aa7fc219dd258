//! Selector list splitting and nested selector joining.

/// Split a selector list on top-level commas, normalising whitespace.
///
/// Commas inside parentheses, brackets, or quotes do not split.
pub fn split_selector_list(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for c in text.chars() {
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
            '(' | '[' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                parts.push(normalize_whitespace(&current));
                current.clear();
            }
            _ => current.push(c),
        }
    }
    parts.push(normalize_whitespace(&current));
    parts.retain(|p| !p.is_empty());
    parts
}

/// Collapse whitespace runs outside quotes into single spaces and trim.
pub fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut pending_space = false;

    for c in text.trim().chars() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            out.push(c);
            continue;
        }
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        if c == '"' || c == '\'' {
            quote = Some(c);
        }
        out.push(c);
    }
    out
}

/// Combine parent and child selector lists for a nested rule.
///
/// A child containing `&` has every `&` replaced by the parent; any other
/// child becomes a descendant of the parent. Lists combine as a cartesian
/// product, parents outermost.
pub fn join_selectors(parents: &[String], children: &[String]) -> Vec<String> {
    if parents.is_empty() {
        return children
            .iter()
            .map(|child| normalize_whitespace(&child.replace('&', "")))
            .filter(|s| !s.is_empty())
            .collect();
    }

    let mut joined = Vec::with_capacity(parents.len() * children.len());
    for parent in parents {
        for child in children {
            let selector = if child.contains('&') {
                child.replace('&', parent)
            } else {
                format!("{} {}", parent, child)
            };
            joined.push(normalize_whitespace(&selector));
        }
    }
    joined
}

/// Whether `name` can be called as a mixin: `.name` or `#name`.
pub fn is_simple_mixin_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some('.') | Some('#') => {
            let rest = chars.as_str();
            !rest.is_empty() && rest.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        }
        _ => false,
    }
}

/// Name under which a selector-list entry can be called as a mixin.
///
/// `.name` and `.name()` are callable as `.name`; anything else is not.
pub fn callable_name(part: &str) -> Option<&str> {
    match mixin_definition(part) {
        Some(MixinDefinition::Plain) => part.find('(').map(|open| part[..open].trim_end()),
        Some(MixinDefinition::Parametric) => None,
        None => is_simple_mixin_name(part).then_some(part),
    }
}

/// Whether a rule selector declares a mixin that is never output itself.
///
/// `.name()` declares one; `.name(@arg)` is a parametric mixin, which is
/// reported separately as unsupported.
pub fn mixin_definition(selector: &str) -> Option<MixinDefinition> {
    let selector = selector.trim();
    let open = selector.find('(')?;
    if !selector.ends_with(')') || !is_simple_mixin_name(selector[..open].trim_end()) {
        return None;
    }
    let params = selector[open + 1..selector.len() - 1].trim();
    if params.is_empty() {
        Some(MixinDefinition::Plain)
    } else {
        Some(MixinDefinition::Parametric)
    }
}

/// Kind of mixin declared by a rule selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixinDefinition {
    /// `.name() { ... }`
    Plain,
    /// `.name(@a; @b) { ... }`
    Parametric,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_split_selector_list() {
        assert_eq!(split_selector_list(".a,\n  .b  > .c"), list(&[".a", ".b > .c"]));
        assert_eq!(split_selector_list(":is(.a, .b)"), list(&[":is(.a, .b)"]));
        assert_eq!(split_selector_list("[title=\"x, y\"]"), list(&["[title=\"x, y\"]"]));
    }

    #[test]
    fn test_normalize_whitespace_keeps_strings() {
        assert_eq!(normalize_whitespace("  a   [t=\"x   y\"]\n b "), "a [t=\"x   y\"] b");
    }

    #[test]
    fn test_join_descendant() {
        assert_eq!(join_selectors(&list(&[".nav"]), &list(&["li", "a"])), list(&[".nav li", ".nav a"]));
    }

    #[test]
    fn test_join_parent_reference() {
        assert_eq!(join_selectors(&list(&[".btn"]), &list(&["&:hover"])), list(&[".btn:hover"]));
        assert_eq!(join_selectors(&list(&[".btn"]), &list(&["&-primary"])), list(&[".btn-primary"]));
        assert_eq!(join_selectors(&list(&[".a"]), &list(&[".ie &"])), list(&[".ie .a"]));
    }

    #[test]
    fn test_join_cartesian() {
        assert_eq!(
            join_selectors(&list(&[".a", ".b"]), &list(&["&.x", "span"])),
            list(&[".a.x", ".a span", ".b.x", ".b span"])
        );
    }

    #[test]
    fn test_join_at_root() {
        assert_eq!(join_selectors(&[], &list(&[".a", "&.b"])), list(&[".a", ".b"]));
    }

    #[test]
    fn test_mixin_names() {
        assert!(is_simple_mixin_name(".bordered"));
        assert!(is_simple_mixin_name("#ns"));
        assert!(!is_simple_mixin_name(".a .b"));
        assert!(!is_simple_mixin_name("a"));
        assert!(!is_simple_mixin_name("."));
    }

    #[test]
    fn test_callable_name() {
        assert_eq!(callable_name(".bordered"), Some(".bordered"));
        assert_eq!(callable_name(".rounded ( )"), Some(".rounded"));
        assert_eq!(callable_name(".size(@w)"), None);
        assert_eq!(callable_name(".a > .b"), None);
    }

    #[test]
    fn test_mixin_definition() {
        assert_eq!(mixin_definition(".rounded()"), Some(MixinDefinition::Plain));
        assert_eq!(mixin_definition(".rounded ( )"), Some(MixinDefinition::Plain));
        assert_eq!(mixin_definition(".size(@w; @h)"), Some(MixinDefinition::Parametric));
        assert_eq!(mixin_definition(".a:not(.b)"), None);
        assert_eq!(mixin_definition(".rounded"), None);
    }
}
