//! `${name}` placeholder substitution.
//!
//! Every placeholder in a template must have a replacement and every
//! replacement must be used. A mismatch is a generator bug and fails the
//! run instead of silently emitting a half-filled header.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use anyhow::{Result, bail};
use regex::Regex;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder regex"));

/// Names of all placeholders referenced by `template`, deduplicated.
pub fn placeholders(template: &str) -> BTreeSet<&str> {
    PLACEHOLDER
        .captures_iter(template)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect()
}

/// Verify that the placeholders of `template` and the keys of
/// `replacements` are the same set.
pub fn check_exhaustive(template: &str, replacements: &[(&str, &str)]) -> Result<()> {
    let used = placeholders(template);
    let mut supplied = BTreeSet::new();
    for (key, _) in replacements {
        if !supplied.insert(*key) {
            bail!("template replacement <{key}> supplied more than once");
        }
    }

    let missing: Vec<&str> = used.difference(&supplied).copied().collect();
    let unused: Vec<&str> = supplied.difference(&used).copied().collect();
    if !missing.is_empty() || !unused.is_empty() {
        bail!(
            "template placeholders do not match replacements: missing [{}], unused [{}]",
            missing.join(", "),
            unused.join(", ")
        );
    }
    Ok(())
}

/// Replace every `${name}` in `template` with its value from
/// `replacements`.
pub fn substitute(template: &str, replacements: &[(&str, &str)]) -> Result<String> {
    check_exhaustive(template, replacements)?;

    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(template) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&template[last..whole.start()]);
        // check_exhaustive guarantees the lookup succeeds.
        if let Some((_, value)) = replacements.iter().find(|(k, _)| *k == name.as_str()) {
            out.push_str(value);
        }
        last = whole.end();
    }
    out.push_str(&template[last..]);
    Ok(out)
}
