//! Directory-safe city names
//!
//! Autocomplete labels look like `"Lyon (69)"` or `"Paris 11e, Paris"`.

/// Normalizes a place label into the directory name used for its corpus
///
/// Lower-cases, drops parenthesised segments, collapses runs of commas and
/// whitespace into `_`, and removes path separators so the result can never
/// escape the data root.
pub fn city_slug(name: &str) -> String {
    let lowered = name.to_lowercase();

    let mut without_parens = String::with_capacity(lowered.len());
    let mut depth = 0usize;
    for c in lowered.chars() {
        match c {
            '(' => depth += 1,
            ')' if depth > 0 => depth -= 1,
            _ if depth == 0 => without_parens.push(c),
            _ => {}
        }
    }

    let mut slug = String::with_capacity(without_parens.len());
    let mut pending_sep = false;
    for c in without_parens.chars() {
        if c == ',' || c.is_whitespace() {
            pending_sep = true;
            continue;
        }
        if matches!(c, '/' | '\\' | '\0') {
            continue;
        }
        if pending_sep && !slug.is_empty() {
            slug.push('_');
        }
        pending_sep = false;
        slug.push(c);
    }

    let slug = slug.trim_matches('_');
    if slug.chars().all(|c| c == '.') {
        return String::new();
    }
    slug.to_string()
}
