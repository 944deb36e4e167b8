//! Media query packing.
//!
//! Top-level `@media` rules with the same query are merged into one and
//! moved after every other rule, ordered so that a mobile-first (or
//! desktop-first) cascade holds.

use std::cmp::Ordering;
use std::sync::LazyLock;

use lightningcss::error::PrinterError;
use lightningcss::rules::media::MediaRule;
use lightningcss::rules::{CssRule, CssRuleList};
use lightningcss::stylesheet::PrinterOptions;
use lightningcss::targets::Targets;
use lightningcss::traits::ToCss;
use regex::Regex;

use crate::config::MediaSort;

// ASCII classes only: the regex build has no `unicode-perl`.

/// `(min-width: 768px)`
static LEGACY_FEATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\([ \t\n\r\x0C]*(min|max)-(width|height)[ \t\n\r\x0C]*:[ \t\n\r\x0C]*(-?[0-9]*\.?[0-9]+)(px|em|rem)?")
        .expect("valid regex")
});

/// `(width >= 768px)`
static RANGE_FEATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\([ \t\n\r\x0C]*(width|height)[ \t\n\r\x0C]*(>=|>|<=|<)[ \t\n\r\x0C]*(-?[0-9]*\.?[0-9]+)(px|em|rem)?")
        .expect("valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Feature {
    MinWidth,
    MinHeight,
    MaxWidth,
    MaxHeight,
}

/// Merge identical top-level media rules and move them to the end, sorted.
///
/// Queries are compared as printed with `targets`, the same way they will
/// appear in the output.
pub fn pack(
    rules: &mut CssRuleList<'_>,
    sort: MediaSort,
    targets: Targets,
) -> Result<(), PrinterError> {
    let mut others = Vec::with_capacity(rules.0.len());
    let mut packed: Vec<(String, MediaRule<'_>)> = Vec::new();

    for rule in rules.0.drain(..) {
        let media = match rule {
            CssRule::Media(media) => media,
            other => {
                others.push(other);
                continue;
            }
        };

        let query = media.query.to_css_string(PrinterOptions {
            targets,
            ..PrinterOptions::default()
        })?;

        match packed.iter_mut().find(|(seen, _)| *seen == query) {
            Some((_, existing)) => existing.rules.0.extend(media.rules.0),
            None => packed.push((query, media)),
        }
    }

    let mut keyed: Vec<_> = packed
        .into_iter()
        .map(|(query, media)| (sort_key(&query, sort), media))
        .collect();
    keyed.sort_by(|(a, _), (b, _)| compare(*a, *b));

    others.extend(keyed.into_iter().map(|(_, media)| CssRule::Media(media)));
    rules.0 = others;
    Ok(())
}

/// `(group, value)`; values of descending groups are negated.
fn sort_key(query: &str, sort: MediaSort) -> (u8, f64) {
    let Some((feature, value)) = breakpoint(query) else {
        return (4, 0.0);
    };

    let group = match (sort, feature) {
        (MediaSort::MobileFirst, Feature::MinWidth) => 0,
        (MediaSort::MobileFirst, Feature::MinHeight) => 1,
        (MediaSort::MobileFirst, Feature::MaxWidth) => 2,
        (MediaSort::MobileFirst, Feature::MaxHeight) => 3,
        (MediaSort::DesktopFirst, Feature::MaxWidth) => 0,
        (MediaSort::DesktopFirst, Feature::MaxHeight) => 1,
        (MediaSort::DesktopFirst, Feature::MinWidth) => 2,
        (MediaSort::DesktopFirst, Feature::MinHeight) => 3,
    };

    match feature {
        Feature::MinWidth | Feature::MinHeight => (group, value),
        Feature::MaxWidth | Feature::MaxHeight => (group, -value),
    }
}

fn compare(a: (u8, f64), b: (u8, f64)) -> Ordering {
    a.0.cmp(&b.0).then(a.1.total_cmp(&b.1))
}

/// First width/height breakpoint of a query, in px.
fn breakpoint(query: &str) -> Option<(Feature, f64)> {
    let query = query.to_ascii_lowercase();

    let legacy = LEGACY_FEATURE.captures(&query).and_then(|caps| {
        let feature = match (&caps[1], &caps[2]) {
            ("min", "width") => Feature::MinWidth,
            ("min", _) => Feature::MinHeight,
            (_, "width") => Feature::MaxWidth,
            _ => Feature::MaxHeight,
        };
        let px = to_px(&caps[3], caps.get(4).map(|m| m.as_str()))?;
        Some((caps.get(0)?.start(), feature, px))
    });

    let range = RANGE_FEATURE.captures(&query).and_then(|caps| {
        let feature = match (caps[2].starts_with('>'), &caps[1]) {
            (true, "width") => Feature::MinWidth,
            (true, _) => Feature::MinHeight,
            (false, "width") => Feature::MaxWidth,
            (false, _) => Feature::MaxHeight,
        };
        let px = to_px(&caps[3], caps.get(4).map(|m| m.as_str()))?;
        Some((caps.get(0)?.start(), feature, px))
    });

    let first = match (legacy, range) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    };
    first.map(|(_, feature, px)| (feature, px))
}

fn to_px(value: &str, unit: Option<&str>) -> Option<f64> {
    let value: f64 = value.parse().ok()?;
    Some(match unit {
        Some("em" | "rem") => value * 16.0,
        _ => value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lightningcss::stylesheet::{ParserOptions, StyleSheet};

    fn order(queries: &[&str], sort: MediaSort) -> Vec<String> {
        let mut keyed: Vec<_> = queries.iter().map(|q| (sort_key(q, sort), *q)).collect();
        keyed.sort_by(|(a, _), (b, _)| compare(*a, *b));
        keyed.into_iter().map(|(_, q)| q.to_string()).collect()
    }

    #[test]
    fn test_breakpoint_syntaxes() {
        assert_eq!(breakpoint("(min-width: 768px)"), Some((Feature::MinWidth, 768.0)));
        assert_eq!(breakpoint("(width >= 48em)"), Some((Feature::MinWidth, 768.0)));
        assert_eq!(breakpoint("(max-height:600px)"), Some((Feature::MaxHeight, 600.0)));
        assert_eq!(breakpoint("screen and (height < 20rem)"), Some((Feature::MaxHeight, 320.0)));
        assert_eq!(breakpoint("print"), None);
        assert_eq!(breakpoint("(orientation: landscape)"), None);
        assert_eq!(breakpoint("(min-width:\t0.5em)"), Some((Feature::MinWidth, 8.0)));
    }

    #[test]
    fn test_mobile_first_order() {
        let sorted = order(
            &[
                "print",
                "(max-width: 600px)",
                "(min-width: 1024px)",
                "(max-width: 900px)",
                "(min-height: 400px)",
                "(min-width: 768px)",
                "(orientation: landscape)",
            ],
            MediaSort::MobileFirst,
        );
        assert_eq!(
            sorted,
            [
                "(min-width: 768px)",
                "(min-width: 1024px)",
                "(min-height: 400px)",
                "(max-width: 900px)",
                "(max-width: 600px)",
                "print",
                "(orientation: landscape)",
            ]
        );
    }

    #[test]
    fn test_desktop_first_order() {
        let sorted = order(
            &["(min-width: 768px)", "(max-width: 600px)", "(max-width: 900px)"],
            MediaSort::DesktopFirst,
        );
        assert_eq!(
            sorted,
            ["(max-width: 900px)", "(max-width: 600px)", "(min-width: 768px)"]
        );
    }

    #[test]
    fn test_pack_merges_and_moves_to_end() {
        let css = "\
@media (min-width: 1024px) { .a { color: #123456 } }
.b { color: #654321 }
@media (min-width: 768px) { .c { color: #abcdef } }
@media (min-width: 1024px) { .d { color: #fedcba } }
.e { color: #111111 }
";
        let mut sheet = StyleSheet::parse(css, ParserOptions::default()).unwrap();
        pack(&mut sheet.rules, MediaSort::MobileFirst, Targets::default()).unwrap();
        let out = sheet.to_css(PrinterOptions::default()).unwrap().code;

        assert_eq!(out.matches("@media").count(), 2);
        let b = out.find(".b").unwrap();
        let e = out.find(".e").unwrap();
        let small = out.find("768px").unwrap();
        let large = out.find("1024px").unwrap();
        assert!(b < e && e < small && small < large);
        // merged in source order
        assert!(out.find(".a").unwrap() < out.find(".d").unwrap());
        assert!(out.find(".d").unwrap() > large);
    }
}
