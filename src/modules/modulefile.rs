//! Parser for the legacy `Modulefile` module descriptor.
//!
//! A Modulefile is a sequence of directives, one per line, each taking
//! one or more quoted string arguments:
//!
//! ```text
//! name    'puppetlabs-apache'
//! version '0.9.0'
//! dependency 'puppetlabs/stdlib', '>= 2.4.0'
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// File name of the single-module descriptor.
pub const MODULEFILE: &str = "Modulefile";

const DIRECTIVES: &[&str] = &[
    "name",
    "version",
    "author",
    "license",
    "summary",
    "description",
    "project_page",
    "source",
    "dependency",
];

/// A dependency declared with the `dependency` directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDependency {
    /// Full name of the required module.
    pub name: String,
    /// Version requirement, if any.
    pub version_requirement: Option<String>,
    /// Repository to fetch from, if any.
    pub repository: Option<String>,
}

/// Parsed contents of a Modulefile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modulefile {
    /// Full module name as declared, e.g. `puppetlabs-apache`.
    pub full_name: Option<String>,
    pub version: Option<String>,
    pub author: Option<String>,
    pub license: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub project_page: Option<String>,
    pub source: Option<String>,
    pub dependencies: Vec<ModuleDependency>,
}

impl Modulefile {
    /// Reads and parses a Modulefile.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Parses Modulefile source text.
    ///
    /// Only a malformed `name` is an error. Other directives whose
    /// arguments are not plain string literals are skipped with a warning.
    pub fn parse(content: &str) -> std::result::Result<Self, String> {
        let mut modulefile = Modulefile::default();

        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let lineno = idx + 1;

            let (directive, rest) = match line.find(|c: char| c.is_whitespace() || c == '(') {
                Some(pos) => (&line[..pos], &line[pos..]),
                None => (line, ""),
            };
            if !DIRECTIVES.contains(&directive) {
                tracing::warn!(directive = %directive, line = lineno, "ignoring unknown Modulefile directive");
                continue;
            }

            let args = parse_args(rest).and_then(|args| {
                if args.is_empty() {
                    Err(format!("`{}` needs a value", directive))
                } else {
                    Ok(args)
                }
            });
            let mut args = match args {
                Ok(args) => args.into_iter(),
                Err(e) if directive == "name" => return Err(format!("line {}: {}", lineno, e)),
                Err(e) => {
                    tracing::warn!(directive = %directive, line = lineno, error = %e, "skipping Modulefile directive");
                    continue;
                }
            };
            let Some(value) = args.next() else {
                continue;
            };

            match directive {
                "name" => modulefile.full_name = Some(value),
                "version" => modulefile.version = Some(value),
                "author" => modulefile.author = Some(value),
                "license" => modulefile.license = Some(value),
                "summary" => modulefile.summary = Some(value),
                "description" => modulefile.description = Some(value),
                "project_page" => modulefile.project_page = Some(value),
                "source" => modulefile.source = Some(value),
                _ => modulefile.dependencies.push(ModuleDependency {
                    name: value,
                    version_requirement: args.next(),
                    repository: args.next(),
                }),
            }
        }

        Ok(modulefile)
    }

    /// Returns the short module name used as the directory under `modules/`.
    ///
    /// `puppetlabs-apache` and `puppetlabs/apache` both yield `apache`.
    pub fn module_name(&self) -> Result<String> {
        let full_name = self.full_name.as_deref().ok_or_else(|| {
            Error::Config(
                "The Modulefile does not define the 'name' key. \
                 Please add: `name '<author>-<module_name>'` to Modulefile and retry"
                    .to_string(),
            )
        })?;

        match full_name.split_once(['-', '/']) {
            Some((author, name)) if !author.is_empty() && !name.is_empty() => Ok(name.to_string()),
            _ => Err(Error::Config(format!(
                "'{}' is not a valid full module name. \
                 Please use `name '<author>-<module_name>'` in Modulefile and retry",
                full_name
            ))),
        }
    }
}

/// Parses a comma separated list of quoted strings, optionally in parens.
fn parse_args(input: &str) -> std::result::Result<Vec<String>, String> {
    let mut input = strip_comment(input).trim();
    if let Some(inner) = input.strip_prefix('(') {
        input = inner
            .trim_end()
            .strip_suffix(')')
            .ok_or_else(|| "unbalanced parenthesis".to_string())?;
    }

    let mut args = Vec::new();
    let mut chars = input.chars().peekable();
    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let quote = match chars.next() {
            None => break,
            Some(c @ ('\'' | '"')) => c,
            Some('#') => break,
            Some(c) => return Err(format!("expected a quoted string, found `{}`", c)),
        };

        let mut value = String::new();
        loop {
            match chars.next() {
                None => return Err("unterminated string".to_string()),
                Some('\\') => {
                    if let Some(escaped) = chars.next() {
                        value.push(escaped);
                    }
                }
                Some(c) if c == quote => break,
                Some(c) => value.push(c),
            }
        }
        args.push(value);

        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        match chars.next() {
            None | Some('#') => break,
            Some(',') => continue,
            Some(c) => return Err(format!("expected `,` between values, found `{}`", c)),
        }
    }

    Ok(args)
}

/// Cuts a trailing `# ...` comment that is not inside a string literal.
fn strip_comment(input: &str) -> &str {
    let mut quote = None;
    let mut escaped = false;
    for (pos, c) in input.char_indices() {
        match (quote, c) {
            _ if escaped => escaped = false,
            (Some(_), '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (None, '\'' | '"') => quote = Some(c),
            (None, '#') => return &input[..pos],
            _ => {}
        }
    }
    input
}

#[cfg(test)]
mod tests {
    use super::*;

    const APACHE: &str = r#"
name    'puppetlabs-apache'
version '0.9.0'
source 'git://github.com/puppetlabs/puppetlabs-apache.git'
author  'puppetlabs'
license "Apache 2.0"
summary 'Puppet module for Apache'

## Add dependencies, if any:
dependency 'puppetlabs/stdlib', '>= 2.4.0'
dependency('puppetlabs/concat', '>= 1.0.0')
"#;

    #[test]
    fn modulefile_parses_directives() {
        let modulefile = Modulefile::parse(APACHE).unwrap();

        assert_eq!(modulefile.full_name.as_deref(), Some("puppetlabs-apache"));
        assert_eq!(modulefile.version.as_deref(), Some("0.9.0"));
        assert_eq!(modulefile.license.as_deref(), Some("Apache 2.0"));
        assert_eq!(modulefile.dependencies.len(), 2);
        assert_eq!(modulefile.dependencies[0].name, "puppetlabs/stdlib");
        assert_eq!(
            modulefile.dependencies[1].version_requirement.as_deref(),
            Some(">= 1.0.0")
        );
    }

    #[test]
    fn module_name_strips_author() {
        let modulefile = Modulefile::parse(APACHE).unwrap();
        assert_eq!(modulefile.module_name().unwrap(), "apache");

        let slashed = Modulefile::parse("name 'example/ntp'").unwrap();
        assert_eq!(slashed.module_name().unwrap(), "ntp");
    }

    #[test]
    fn missing_name_explains_how_to_declare_it() {
        let modulefile = Modulefile::parse("version '1.0.0'\n").unwrap();
        let err = modulefile.module_name().unwrap_err();

        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("name '<author>-<module_name>'"));
    }

    #[test]
    fn name_without_author_is_rejected() {
        let modulefile = Modulefile::parse("name 'apache'\n").unwrap();
        assert!(modulefile.module_name().is_err());
    }

    #[test]
    fn trailing_comments_are_ignored() {
        let modulefile = Modulefile::parse("name 'acme-web' # the web module\n").unwrap();
        assert_eq!(modulefile.full_name.as_deref(), Some("acme-web"));
    }

    #[test]
    fn unquoted_values_are_rejected() {
        let err = Modulefile::parse("name acme-web\n").unwrap_err();
        assert!(err.contains("line 1"));
    }

    #[test]
    fn computed_values_are_skipped_when_name_is_literal() {
        let modulefile =
            Modulefile::parse("name 'acme-web'\nversion File.read('VERSION').strip\n").unwrap();

        assert_eq!(modulefile.full_name.as_deref(), Some("acme-web"));
        assert_eq!(modulefile.version, None);
        assert_eq!(modulefile.module_name().unwrap(), "web");
    }

    #[test]
    fn comment_after_parenthesized_args_is_ignored() {
        let content = "name 'acme-web'\ndependency('puppetlabs/stdlib', '>= 1.0') # pinned\n";
        let modulefile = Modulefile::parse(content).unwrap();

        assert_eq!(modulefile.dependencies.len(), 1);
        assert_eq!(modulefile.dependencies[0].name, "puppetlabs/stdlib");
        assert_eq!(
            modulefile.dependencies[0].version_requirement.as_deref(),
            Some(">= 1.0")
        );
    }

    #[test]
    fn hash_inside_string_is_not_a_comment() {
        let modulefile = Modulefile::parse("name 'acme-web'\nsummary 'issue #42 fix'\n").unwrap();
        assert_eq!(modulefile.summary.as_deref(), Some("issue #42 fix"));
    }

    #[test]
    fn dotted_author_is_accepted() {
        let modulefile = Modulefile::parse("name 'my.org-web'\n").unwrap();
        assert_eq!(modulefile.module_name().unwrap(), "web");
    }

    #[test]
    fn unterminated_string_is_rejected() {
        assert!(Modulefile::parse("name 'acme-web\n").is_err());
    }
}
