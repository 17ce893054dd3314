//! Embedded arguments: keyword names such as `Wait ${n} seconds` that match
//! literal usages like `Wait 5 seconds`.

use regex::{Regex, RegexBuilder};

use crate::error::EmbeddedError;
use crate::varsyntax;

/// Pattern for an embedded argument without a custom regex.
const DEFAULT_ARGUMENT: &str = ".*?";

/// A compiled keyword-name pattern.
#[derive(Debug, Clone)]
pub struct EmbeddedPattern {
    regex: Regex,
    arguments: Vec<String>,
}

impl EmbeddedPattern {
    /// Compile `name` into a matcher. Returns `Ok(None)` for a name with no
    /// `${...}` placeholder. `${n:\d+}` restricts the argument to a custom
    /// regex.
    pub fn compile(name: &str) -> Result<Option<EmbeddedPattern>, EmbeddedError> {
        let uses: Vec<_> = varsyntax::find_variables(name)
            .into_iter()
            .filter(|u| u.sigil == '$')
            .collect();
        if uses.is_empty() {
            return Ok(None);
        }

        let mut source = String::from("^");
        let mut arguments = Vec::with_capacity(uses.len());
        let mut literal_start = 0;
        for (i, var) in uses.iter().enumerate() {
            source.push_str(&regex::escape(&name[literal_start..var.start]));
            let (arg, pattern) = match var.name.split_once(':') {
                Some((arg, pattern)) if !pattern.is_empty() => (arg, pattern),
                _ => (var.name.as_str(), DEFAULT_ARGUMENT),
            };
            source.push_str(&format!("(?P<arg{i}>{pattern})"));
            arguments.push(arg.trim().to_owned());
            literal_start = var.end;
        }
        source.push_str(&regex::escape(&name[literal_start..]));
        source.push('$');

        let regex = RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .map_err(|source| EmbeddedError::InvalidPattern {
                name: name.to_owned(),
                source,
            })?;
        Ok(Some(EmbeddedPattern { regex, arguments }))
    }

    /// Argument names in declaration order.
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    pub fn matches(&self, usage: &str) -> bool {
        self.regex.is_match(usage)
    }

    /// The value each argument takes in `usage`, if it matches.
    pub fn bind(&self, usage: &str) -> Option<Vec<(String, String)>> {
        let captures = self.regex.captures(usage)?;
        let values = self
            .arguments
            .iter()
            .enumerate()
            .map(|(i, arg)| {
                let value = captures
                    .name(&format!("arg{i}"))
                    .map_or("", |m| m.as_str());
                (arg.clone(), value.to_owned())
            })
            .collect();
        Some(values)
    }
}

/// Whether `usage` matches the keyword `name`, either literally (ignoring
/// case, spaces and underscores) or through embedded arguments. A pattern
/// that does not compile never matches.
pub fn name_matches(name: &str, usage: &str) -> bool {
    if varsyntax::normalize(name) == varsyntax::normalize(usage) {
        return true;
    }
    matches!(EmbeddedPattern::compile(name), Ok(Some(p)) if p.matches(usage))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_usage_binds_the_argument() {
        let pattern = EmbeddedPattern::compile("Wait ${n} seconds").unwrap().unwrap();
        assert!(pattern.matches("Wait 5 seconds"));
        assert!(pattern.matches("wait 5 SECONDS"));
        assert!(!pattern.matches("Wait"));
        assert_eq!(
            pattern.bind("Wait 5 seconds"),
            Some(vec![("n".to_owned(), "5".to_owned())])
        );
    }

    #[test]
    fn custom_patterns_restrict_the_argument() {
        let pattern = EmbeddedPattern::compile(r"Add ${count:\d+} items to ${list}")
            .unwrap()
            .unwrap();
        assert!(pattern.matches("Add 3 items to cart"));
        assert!(!pattern.matches("Add some items to cart"));
        assert_eq!(pattern.arguments(), ["count", "list"]);
    }

    #[test]
    fn names_without_placeholders_are_not_patterns() {
        assert!(EmbeddedPattern::compile("Log").unwrap().is_none());
        assert!(EmbeddedPattern::compile("Open ${x:[}").is_err());
        assert!(name_matches("Open Browser", "open_browser"));
        assert!(!name_matches("Open ${x:[}", "Open ["));
    }

    #[test]
    fn regex_metacharacters_in_literals_are_escaped() {
        let pattern = EmbeddedPattern::compile("Price is $${amount} (net)").unwrap().unwrap();
        assert!(pattern.matches("Price is $10 (net)"));
        assert!(!pattern.matches("Price is $10 net"));
    }
}
