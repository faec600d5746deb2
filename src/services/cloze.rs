//! Cloze ("fill-in-the-blank") ordinal analysis.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

macro_rules! lazy_regex {
    ($pattern:expr) => {
        LazyLock::new(|| Regex::new($pattern).unwrap_or_else(|_| unreachable!()))
    };
}

/// Opening of a cloze deletion: `{{c<N>::`.
static CLOZE_OPENING: LazyLock<Regex> = lazy_regex!(r"\{\{c(\d+)::");

/// Substring that marks a template as cloze-producing.
pub const CLOZE_TEMPLATE_MARKER: &str = "{{cloze:";

/// Returns the sorted, de-duplicated card ordinals required by `text`.
///
/// Every `{{cN::...}}` marker contributes `N - 1`. `c0` is not a valid
/// marker and is ignored, as is an opening that is never closed.
#[must_use]
pub fn ordinals(text: &str) -> Vec<u32> {
    let mut found = BTreeSet::new();
    for caps in CLOZE_OPENING.captures_iter(text) {
        let (Some(whole), Some(number)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if !text[whole.end()..].contains("}}") {
            continue;
        }
        match number.as_str().parse::<u32>() {
            Ok(n) if n > 0 => {
                found.insert(n - 1);
            },
            _ => {},
        }
    }
    found.into_iter().collect()
}

/// Returns true if any template markup references a cloze field.
pub fn is_cloze_markup<'a>(markup: impl IntoIterator<Item = &'a str>) -> bool {
    markup.into_iter().any(|m| m.contains(CLOZE_TEMPLATE_MARKER))
}
