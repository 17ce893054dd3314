//! Argument descriptors for library keywords and user keywords.

use std::fmt;

use serde::Serialize;

use crate::varsyntax;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArgumentKind {
    Required,
    Optional,
    /// `*args` / `@{args}`.
    VarArgs,
    /// Accepted only by name, after a bare `*` / `@{}` marker.
    NamedOnly,
    /// `**kwargs` / `&{kwargs}`.
    KwArgs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArgumentSpec {
    pub name: String,
    pub kind: ArgumentKind,
    pub default: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArgumentsDescriptor {
    pub arguments: Vec<ArgumentSpec>,
}

impl ArgumentsDescriptor {
    /// From library introspection specs: `name`, `name=default`, `*varargs`,
    /// `**kwargs` and a bare `*` before named-only arguments.
    pub fn from_library_specs<S: AsRef<str>>(specs: &[S]) -> Self {
        let mut arguments = Vec::new();
        let mut named_only = false;
        for spec in specs {
            let spec = spec.as_ref().trim();
            if spec.is_empty() {
                continue;
            }
            if spec == "*" {
                named_only = true;
                continue;
            }
            let argument = if let Some(name) = spec.strip_prefix("**") {
                ArgumentSpec::new(name, ArgumentKind::KwArgs, None)
            } else if let Some(name) = spec.strip_prefix('*') {
                named_only = true;
                ArgumentSpec::new(name, ArgumentKind::VarArgs, None)
            } else {
                let (name, default) = split_default(spec);
                ArgumentSpec::positional(name, default, named_only)
            };
            arguments.push(argument);
        }
        ArgumentsDescriptor { arguments }
    }

    /// From the cells of a user keyword's `[Arguments]` setting: `${a}`,
    /// `${b}=1`, `@{rest}`, `&{named}` and a bare `@{}` marker.
    pub fn from_keyword_arguments<S: AsRef<str>>(cells: &[S]) -> Self {
        let mut arguments = Vec::new();
        let mut named_only = false;
        for cell in cells {
            let cell = cell.as_ref().trim();
            if cell == "@{}" {
                named_only = true;
                continue;
            }
            let (target, default) = split_default(cell);
            let Some(var) = varsyntax::find_variables(target).into_iter().next() else {
                continue;
            };
            let argument = match var.sigil {
                '@' => {
                    named_only = true;
                    ArgumentSpec::new(&var.name, ArgumentKind::VarArgs, None)
                }
                '&' => ArgumentSpec::new(&var.name, ArgumentKind::KwArgs, None),
                _ => ArgumentSpec::positional(&var.name, default, named_only),
            };
            arguments.push(argument);
        }
        ArgumentsDescriptor { arguments }
    }

    pub fn required_count(&self) -> usize {
        self.count(ArgumentKind::Required)
    }

    pub fn optional_count(&self) -> usize {
        self.count(ArgumentKind::Optional)
    }

    pub fn has_varargs(&self) -> bool {
        self.count(ArgumentKind::VarArgs) > 0
    }

    pub fn has_kwargs(&self) -> bool {
        self.count(ArgumentKind::KwArgs) > 0
    }

    /// Whether a call with `positional` positional arguments fits.
    pub fn accepts(&self, positional: usize) -> bool {
        positional >= self.required_count()
            && (self.has_varargs() || positional <= self.required_count() + self.optional_count())
    }

    fn count(&self, kind: ArgumentKind) -> usize {
        self.arguments.iter().filter(|a| a.kind == kind).count()
    }
}

impl ArgumentSpec {
    fn new(name: &str, kind: ArgumentKind, default: Option<&str>) -> Self {
        ArgumentSpec {
            name: name.trim().to_owned(),
            kind,
            default: default.map(str::to_owned),
        }
    }

    fn positional(name: &str, default: Option<&str>, named_only: bool) -> Self {
        let kind = match (named_only, default) {
            (true, _) => ArgumentKind::NamedOnly,
            (false, Some(_)) => ArgumentKind::Optional,
            (false, None) => ArgumentKind::Required,
        };
        ArgumentSpec::new(name, kind, default)
    }
}

fn split_default(spec: &str) -> (&str, Option<&str>) {
    match spec.split_once('=') {
        Some((name, default)) => (name.trim_end(), Some(default.trim_start())),
        None => (spec, None),
    }
}

impl fmt::Display for ArgumentsDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for arg in &self.arguments {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            match arg.kind {
                ArgumentKind::VarArgs => write!(f, "*{}", arg.name)?,
                ArgumentKind::KwArgs => write!(f, "**{}", arg.name)?,
                _ => match &arg.default {
                    Some(default) => write!(f, "{}={}", arg.name, default)?,
                    None => f.write_str(&arg.name)?,
                },
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_specs() {
        let args =
            ArgumentsDescriptor::from_library_specs(&["msg", "level=INFO", "*values", "**kw"]);
        assert_eq!(args.required_count(), 1);
        assert_eq!(args.optional_count(), 1);
        assert!(args.has_varargs());
        assert!(args.has_kwargs());
        assert!(args.accepts(7));
        assert!(!args.accepts(0));
        assert_eq!(args.to_string(), "msg, level=INFO, *values, **kw");
    }

    #[test]
    fn keyword_arguments_setting() {
        let args = ArgumentsDescriptor::from_keyword_arguments(&["${a}", "${b}=1", "@{rest}"]);
        assert_eq!(args.required_count(), 1);
        assert_eq!(args.optional_count(), 1);
        assert!(args.has_varargs());
        assert_eq!(args.arguments[1].default.as_deref(), Some("1"));

        let fixed = ArgumentsDescriptor::from_keyword_arguments(&["${x}", "${y}"]);
        assert!(fixed.accepts(2));
        assert!(!fixed.accepts(3));
    }

    #[test]
    fn named_only_arguments_do_not_count_positionally() {
        let args = ArgumentsDescriptor::from_library_specs(&["a", "*", "b", "c=1"]);
        assert_eq!(args.required_count(), 1);
        assert_eq!(args.arguments[1].kind, ArgumentKind::NamedOnly);
        let kw = ArgumentsDescriptor::from_keyword_arguments(&["@{}", "${named}"]);
        assert_eq!(kw.arguments[0].kind, ArgumentKind::NamedOnly);
    }
}
