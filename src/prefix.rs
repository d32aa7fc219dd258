//! Vendor prefixing of compiled CSS
//!
//! Browser targets come from browserslist queries; lightningcss inserts the
//! prefixed declarations those targets need. Each prefixed variant is
//! printed as its own declaration line. With `cascade` enabled the variants
//! of one property are additionally aligned so their values line up.
//!
//! Unlike autoprefixer, this step also runs lightningcss's safe
//! optimizations over `main.css`: longhands merge into shorthands
//! (`margin-top: 0` .. `margin-left: 0` becomes `margin: 0`), colors take
//! their shortest form (`#ff0000` becomes `red`), and media queries may be
//! rewritten in range syntax (`(min-width: 1px)` becomes `(width >= 1px)`)
//! when every target supports it. Rendering is unchanged.
//!
//! Declarations and rules lightningcss cannot read, such as the IE star
//! hack `*zoom: 1`, are dropped with a warning instead of failing the build.

use std::fmt;
use std::sync::{Arc, RwLock};

use lightningcss::error::Error as CssError;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use thiserror::Error;

use crate::config::StylesConfig;

/// Vendor prefixes recognised when aligning declarations.
const VENDOR_PREFIXES: &[&str] = &["-webkit-", "-moz-", "-ms-", "-o-"];

/// Error raised by the prefixing step
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PrefixError {
    /// A browserslist query could not be resolved
    #[error("invalid browser query: {0}")]
    Browsers(String),
    /// The compiled CSS could not be parsed
    #[error("failed to parse CSS: {0}")]
    Parse(String),
    /// Prefix insertion failed
    #[error("failed to apply prefixes: {0}")]
    Transform(String),
    /// The prefixed stylesheet could not be printed
    #[error("failed to print CSS: {0}")]
    Print(String),
}

/// Options for the prefixing step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixOptions {
    /// Browserslist queries selecting the targets
    pub browsers: Vec<String>,
    /// Align the prefixed variants of a declaration
    pub cascade: bool,
}

impl Default for PrefixOptions {
    fn default() -> Self {
        Self::from_styles(&StylesConfig::default())
    }
}

impl PrefixOptions {
    /// Options for the browsers in effect for a `[styles]` section.
    pub fn from_styles(styles: &StylesConfig) -> Self {
        Self { browsers: styles.effective_browsers(), cascade: styles.cascade }
    }

    /// Explicit browser list with cascade alignment disabled.
    pub fn with_browsers<S: Into<String>>(browsers: impl IntoIterator<Item = S>) -> Self {
        Self { browsers: browsers.into_iter().map(Into::into).collect(), cascade: false }
    }

    /// Resolve the browserslist queries into lightningcss targets.
    pub fn targets(&self) -> Result<Targets, PrefixError> {
        let browsers = Browsers::from_browserslist(self.browsers.iter().map(String::as_str))
            .map_err(|e| PrefixError::Browsers(e.to_string()))?;
        Ok(browsers.map(Targets::from).unwrap_or_default())
    }
}

/// A prefixed stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prefixed {
    /// Prefixed CSS in the readable layout
    pub css: String,
    /// Unreadable declarations and rules that were skipped
    pub warnings: Vec<String>,
}

/// Add the vendor prefixes `options` calls for.
///
/// The output keeps the readable layout: one declaration per line,
/// two-space indentation.
pub fn prefix(css: &str, options: &PrefixOptions) -> Result<Prefixed, PrefixError> {
    let targets = options.targets()?;
    prefix_with_targets(css, targets, options.cascade, "")
}

/// Add prefixes for already resolved targets.
///
/// `filename` names the stylesheet the CSS was compiled from; it only
/// appears in messages.
pub fn prefix_with_targets(
    css: &str,
    targets: Targets,
    cascade: bool,
    filename: &str,
) -> Result<Prefixed, PrefixError> {
    let warnings = Arc::new(RwLock::new(Vec::new()));
    let parser_options = ParserOptions {
        filename: filename.to_string(),
        error_recovery: true,
        warnings: Some(Arc::clone(&warnings)),
        ..ParserOptions::default()
    };
    let mut stylesheet = StyleSheet::parse(css, parser_options).map_err(|e| PrefixError::Parse(describe(&e)))?;

    stylesheet
        .minify(MinifyOptions { targets, ..Default::default() })
        .map_err(|e| PrefixError::Transform(describe(&e)))?;

    let printed = stylesheet
        .to_css(PrinterOptions { minify: false, targets, ..Default::default() })
        .map_err(|e| PrefixError::Print(describe(&e)))?;

    let warnings = warnings.read().map(|list| list.iter().map(describe).collect()).unwrap_or_default();
    let css = if cascade { align_prefixed(&printed.code) } else { printed.code };
    Ok(Prefixed { css, warnings })
}

/// Render a lightningcss error with a 1-based line. Locations point into the
/// compiled CSS, not into the LESS source.
fn describe<T: fmt::Display>(error: &CssError<T>) -> String {
    match &error.loc {
        Some(loc) if loc.filename.is_empty() => {
            format!("{} (compiled CSS line {}, column {})", error.kind, loc.line + 1, loc.column)
        }
        Some(loc) => format!(
            "{} (CSS compiled from {}, line {}, column {})",
            error.kind,
            loc.filename,
            loc.line + 1,
            loc.column
        ),
        None => error.kind.to_string(),
    }
}

/// Split a vendor prefix off a property name.
fn split_vendor(property: &str) -> (&str, &str) {
    for prefix in VENDOR_PREFIXES {
        if let Some(rest) = property.strip_prefix(prefix) {
            return (prefix, rest);
        }
    }
    ("", property)
}

/// A declaration line split into indentation, vendor prefix and the rest.
struct DeclLine<'a> {
    indent: &'a str,
    vendor: &'a str,
    unprefixed: &'a str,
    rest: &'a str,
}

fn parse_decl_line(line: &str) -> Option<DeclLine<'_>> {
    let trimmed = line.trim_start();
    let indent = &line[..line.len() - trimmed.len()];
    let colon = trimmed.find(':')?;
    let property = &trimmed[..colon];
    if property.is_empty() || !property.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return None;
    }
    let (vendor, unprefixed) = split_vendor(property);
    Some(DeclLine { indent, vendor, unprefixed, rest: &trimmed[colon..] })
}

/// Pad runs of vendor variants so the unprefixed names line up:
///
/// ```text
///   -webkit-transform: scale(1);
///           transform: scale(1);
/// ```
pub fn align_prefixed(css: &str) -> String {
    let lines: Vec<&str> = css.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        let Some(first) = parse_decl_line(lines[i]) else {
            out.push(lines[i].to_string());
            i += 1;
            continue;
        };

        let mut group = vec![first];
        let mut j = i + 1;
        while j < lines.len() {
            match parse_decl_line(lines[j]) {
                Some(next) if next.indent == group[0].indent && next.unprefixed == group[0].unprefixed => {
                    group.push(next);
                    j += 1;
                }
                _ => break,
            }
        }

        let widest = group.iter().map(|d| d.vendor.len()).max().unwrap_or(0);
        let prefixed = group.iter().any(|d| !d.vendor.is_empty());
        for decl in &group {
            let pad = if prefixed { widest - decl.vendor.len() } else { 0 };
            out.push(format!("{}{}{}{}{}", decl.indent, " ".repeat(pad), decl.vendor, decl.unprefixed, decl.rest));
        }
        i = j;
    }

    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PrefixProfile;

    fn safari8() -> PrefixOptions {
        PrefixOptions::with_browsers(["safari 8"])
    }

    #[test]
    fn test_transform_prefixed_on_own_line() {
        let css = prefix(".x {\n  transform: scale(1);\n}\n", &safari8()).unwrap().css;
        assert!(css.contains("  -webkit-transform: scale(1);\n"), "got: {}", css);
        assert!(css.contains("  transform: scale(1);\n"), "got: {}", css);
    }

    #[test]
    fn test_plain_declaration_preserved() {
        let css = prefix(".box {\n  color: red;\n}\n", &PrefixOptions::default()).unwrap().css;
        assert!(css.contains(".box {"));
        assert!(css.contains("color: red;"));
    }

    #[test]
    fn test_profiles_resolve_targets() {
        for profile in [PrefixProfile::Default, PrefixProfile::Legacy] {
            let options = PrefixOptions { browsers: profile.browsers(), cascade: false };
            assert!(options.targets().is_ok(), "profile {} should resolve", profile);
        }
    }

    #[test]
    fn test_legacy_profile_prefixes_flexbox() {
        let options = PrefixOptions { browsers: PrefixProfile::Legacy.browsers(), cascade: false };
        let css = prefix(".row {\n  display: flex;\n}\n", &options).unwrap().css;
        assert!(css.contains("display: -webkit-") || css.contains("display: -ms-"), "got: {}", css);
        assert!(css.contains("display: flex;"));
    }

    #[test]
    fn test_invalid_query_rejected() {
        let options = PrefixOptions::with_browsers(["not a real browser 99"]);
        assert!(matches!(options.targets(), Err(PrefixError::Browsers(_))));
    }

    #[test]
    fn test_star_hack_skipped_with_warning() {
        let options = PrefixOptions { browsers: PrefixProfile::Legacy.browsers(), cascade: false };
        let prefixed = prefix(".a { *zoom: 1; color: red; }", &options).unwrap();
        assert!(prefixed.css.contains("color: red;"), "got: {}", prefixed.css);
        assert!(!prefixed.css.contains("zoom"), "got: {}", prefixed.css);
        assert!(!prefixed.warnings.is_empty());
        assert!(prefixed.warnings[0].contains("compiled CSS line 1"), "got: {:?}", prefixed.warnings);
    }

    #[test]
    fn test_warnings_name_source_file() {
        let targets = safari8().targets().unwrap();
        let prefixed = prefix_with_targets("..a { color: red; }\n.b { color: blue; }\n", targets, false, "styles.less").unwrap();
        assert!(prefixed.css.contains(".b {"), "got: {}", prefixed.css);
        assert!(!prefixed.warnings.is_empty());
        assert!(prefixed.warnings[0].contains("CSS compiled from styles.less, line 1"), "got: {:?}", prefixed.warnings);
    }

    #[test]
    fn test_clean_input_has_no_warnings() {
        let prefixed = prefix(".a {\n  color: red;\n}\n", &safari8()).unwrap();
        assert!(prefixed.warnings.is_empty());
    }

    #[test]
    fn test_cascade_aligns_variants() {
        let options = PrefixOptions { cascade: true, ..safari8() };
        let css = prefix(".x {\n  transform: scale(1);\n}\n", &options).unwrap().css;
        assert!(css.contains("  -webkit-transform: scale(1);\n          transform: scale(1);\n"), "got: {}", css);
    }

    #[test]
    fn test_align_prefixed() {
        let input = ".a {\n  -webkit-box-sizing: border-box;\n  -moz-box-sizing: border-box;\n  box-sizing: border-box;\n  color: red;\n}";
        let expected = ".a {\n  -webkit-box-sizing: border-box;\n     -moz-box-sizing: border-box;\n          box-sizing: border-box;\n  color: red;\n}";
        assert_eq!(align_prefixed(input), expected);
    }

    #[test]
    fn test_align_leaves_unprefixed_runs() {
        let input = ".a {\n  margin: 0;\n  margin: 1px;\n}\n";
        assert_eq!(align_prefixed(input), input);
    }

    #[test]
    fn test_align_ignores_selectors() {
        let input = "a:hover {\n  color: red;\n}\n";
        assert_eq!(align_prefixed(input), input);
    }
}
