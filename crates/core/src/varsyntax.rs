//! Variable syntax inside cells: `${scalar}`, `@{list}`, `&{dict}`, `%{ENV}`.

use serde::Serialize;

/// One `${...}`-style occurrence found in a cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableUse {
    pub sigil: char,
    /// Text between the braces, verbatim.
    pub name: String,
    /// Byte range of the whole occurrence in the cell.
    pub start: usize,
    pub end: usize,
}

impl VariableUse {
    pub fn full_text(&self) -> String {
        format!("{}{{{}}}", self.sigil, self.name)
    }
}

fn is_sigil(c: char) -> bool {
    matches!(c, '$' | '@' | '&' | '%')
}

/// All top-level variable occurrences in `text`. Escaped sigils (`\${x}`) and
/// unterminated openings are skipped.
pub fn find_variables(text: &str) -> Vec<VariableUse> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut found = Vec::new();
    let mut pos = 0usize;

    while pos + 1 < chars.len() {
        let (start, c) = chars[pos];
        if c == '\\' {
            pos += 2;
            continue;
        }
        if !is_sigil(c) || chars[pos + 1].1 != '{' {
            pos += 1;
            continue;
        }
        let mut depth = 0usize;
        let mut close = None;
        for (idx, &(_, ch)) in chars.iter().enumerate().skip(pos + 1) {
            match ch {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        close = Some(idx);
                        break;
                    }
                }
                _ => {}
            }
        }
        let Some(close) = close else {
            pos += 1;
            continue;
        };
        let inner_start = chars[pos + 2].0.min(chars[close].0);
        let inner_end = chars[close].0;
        let end = chars.get(close + 1).map_or(text.len(), |(b, _)| *b);
        found.push(VariableUse {
            sigil: c,
            name: text[inner_start..inner_end].to_owned(),
            start,
            end,
        });
        pos = close + 1;
    }
    found
}

pub fn contains_variable(text: &str) -> bool {
    !find_variables(text).is_empty()
}

/// True when the whole cell is exactly one variable, e.g. `${x}` or `@{items}`.
pub fn is_variable(text: &str) -> bool {
    match find_variables(text).as_slice() {
        [only] => only.start == 0 && only.end == text.len() && only.sigil != '%',
        _ => false,
    }
}

/// Assignment cell at the start of an executable row: `${x}=`, `${x} =`, `@{x}`.
pub fn is_assignment(text: &str) -> bool {
    let target = text.strip_suffix('=').unwrap_or(text);
    let target = target.strip_suffix(' ').unwrap_or(target);
    let uses = find_variables(target);
    let [only] = uses.as_slice() else {
        return false;
    };
    if only.start != 0 || only.sigil == '%' || only.name.is_empty() {
        return false;
    }
    // Item access such as `${x}[0]` may follow the variable.
    let mut rest = &target[only.end..];
    while let Some(after) = rest.strip_prefix('[') {
        match after.find(']') {
            Some(close) => rest = &after[close + 1..],
            None => return false,
        }
    }
    rest.is_empty()
}

/// Lowercase with spaces and underscores removed.
pub fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != ' ' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Normalized base name of a declared or used variable, dropping the sigil,
/// braces, any trailing `=` and item access (`${x}[0]`).
pub fn base_name(text: &str) -> Option<String> {
    let trimmed = text.trim().trim_end_matches('=').trim_end();
    let first = find_variables(trimmed).into_iter().next()?;
    if first.start != 0 {
        return None;
    }
    Some(normalize(&first.name))
}

/// Base names of extended syntax: `${obj.attr}` and `${x + 1}` refer to the
/// variable named by the leading identifier.
pub fn lookup_names(name: &str) -> Vec<String> {
    let full = normalize(name);
    let mut names = vec![full.clone()];
    if let Some(cut) = name.find(|c: char| matches!(c, '.' | '[' | '+' | '-' | '*' | '/')) {
        let head = normalize(&name[..cut]);
        if !head.is_empty() && head != full {
            names.push(head);
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_nested_and_skips_escaped() {
        let uses = find_variables(r"a ${x} \${not} @{l${i}} end");
        let names: Vec<&str> = uses.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["x", "l${i}"]);
        assert_eq!(uses[1].full_text(), "@{l${i}}");
    }

    #[test]
    fn unterminated_variable_is_ignored() {
        assert!(find_variables("${open").is_empty());
        assert!(!contains_variable("plain text"));
    }

    #[test]
    fn assignment_cells() {
        assert!(is_assignment("${x}="));
        assert!(is_assignment("${x} ="));
        assert!(is_assignment("@{items}"));
        assert!(is_assignment("&{d}"));
        assert!(!is_assignment("Log"));
        assert!(!is_assignment("${a}${b}"));
        assert!(!is_assignment("%{HOME}"));
    }

    #[test]
    fn base_names_ignore_sigil_case_and_spacing() {
        assert_eq!(base_name("${My Var}=").as_deref(), Some("myvar"));
        assert_eq!(base_name("@{MY_VAR}").as_deref(), Some("myvar"));
        assert_eq!(base_name("invalid_1"), None);
        assert!(is_variable("${x}"));
        assert!(!is_variable("${x} y"));
    }

    #[test]
    fn extended_names_fall_back_to_leading_identifier() {
        assert_eq!(lookup_names("obj.attr"), vec!["obj.attr", "obj"]);
        assert_eq!(lookup_names("x"), vec!["x"]);
    }
}
