//! Column name normalisation.

use std::collections::HashSet;

/// Canonical column name: trimmed, lower-cased, whitespace removed.
/// `" Tract ID "` → `"tractid"`, `"Pop 65 Plus"` → `"pop65plus"`.
pub fn normalise_field_name(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Make names unique while keeping their order. The first occurrence keeps
/// its name; later ones get `_2`, `_3`, ... (skipping suffixes already taken).
pub fn dedupe_names<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let names: Vec<String> = names.into_iter().map(Into::into).collect();
    let mut taken: HashSet<String> = HashSet::with_capacity(names.len());
    let mut out = Vec::with_capacity(names.len());

    for name in names {
        if taken.insert(name.clone()) {
            out.push(name);
            continue;
        }
        let mut n = 2usize;
        let renamed = loop {
            let candidate = format!("{name}_{n}");
            if !taken.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };
        tracing::warn!(column = %name, renamed = %renamed, "Duplicate column name after normalisation");
        taken.insert(renamed.clone());
        out.push(renamed);
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
