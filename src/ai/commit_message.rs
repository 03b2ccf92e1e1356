use std::fmt::{Display, Formatter};
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Conventional commit type. This enum is the only list of allowed types:
/// the tool schema, the prompt taxonomy and reply validation all read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CommitType {
    Build,
    Chore,
    Ci,
    Docs,
    Feat,
    Fix,
    Perf,
    Refactor,
    Revert,
    Style,
    Test,
}

impl CommitType {
    pub const ALL: [CommitType; 11] = [
        CommitType::Build,
        CommitType::Chore,
        CommitType::Ci,
        CommitType::Docs,
        CommitType::Feat,
        CommitType::Fix,
        CommitType::Perf,
        CommitType::Refactor,
        CommitType::Revert,
        CommitType::Style,
        CommitType::Test,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommitType::Build => "build",
            CommitType::Chore => "chore",
            CommitType::Ci => "ci",
            CommitType::Docs => "docs",
            CommitType::Feat => "feat",
            CommitType::Fix => "fix",
            CommitType::Perf => "perf",
            CommitType::Refactor => "refactor",
            CommitType::Revert => "revert",
            CommitType::Style => "style",
            CommitType::Test => "test",
        }
    }

    /// One-line meaning shown to the model in the prompt.
    pub fn meaning(&self) -> &'static str {
        match self {
            CommitType::Build => "Build system or dependency updates.",
            CommitType::Chore => "Tasks or config changes.",
            CommitType::Ci => "CI updates.",
            CommitType::Docs => "Documentation changes.",
            CommitType::Feat => "New features.",
            CommitType::Fix => "Bug fixes.",
            CommitType::Perf => "Performance improvements.",
            CommitType::Refactor => "Code restructuring.",
            CommitType::Revert => "Revert a commit.",
            CommitType::Style => "Code style changes.",
            CommitType::Test => "Test updates.",
        }
    }
}

impl Display for CommitType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCommitType(pub String);

impl FromStr for CommitType {
    type Err = UnknownCommitType;

    /// Exact, case-sensitive match against the allowed names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommitType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownCommitType(s.to_string()))
    }
}

/// # generate_commit_message
/// Generate a structured git commit message based on code changes, following specific formatting rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CommitMessageDraft {
    /// Select the appropriate commit type from the allowed list.
    #[serde(rename = "type")]
    pub kind: CommitType,
    /// Specify the affected area/scope of the change. Use null if not applicable.
    #[serde(default)]
    pub scope: Option<String>,
    /// A concise and clear summary of the change (max 50 chars). Proper nouns remain in their original language.
    pub title: String,
    /// Optional array of concise points summarizing changes (0-5 points, max 50 chars each).
    #[serde(default)]
    pub description: Vec<String>,
}

impl CommitMessageDraft {
    /// `type(scope): title`, or `type: title` without a scope.
    pub fn header(&self) -> String {
        match &self.scope {
            Some(scope) => format!("{}({}): {}", self.kind, scope, self.title),
            None => format!("{}: {}", self.kind, self.title),
        }
    }
}

impl Display for CommitMessageDraft {
    /// Renders the final commit message: the header line, then a blank line
    /// and one `- ` bullet per description entry when there are any.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.header())?;
        if !self.description.is_empty() {
            write!(f, "\n\n")?;
            for (i, line) in self.description.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                write!(f, "- {line}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Splits a header line back into its parts.
    fn parse_header(line: &str) -> (CommitType, Option<String>, String) {
        let (prefix, title) = line.split_once(": ").unwrap();
        let (kind, scope) = match prefix.split_once('(') {
            Some((kind, rest)) => (kind, Some(rest.strip_suffix(')').unwrap().to_string())),
            None => (prefix, None),
        };
        (kind.parse().unwrap(), scope, title.to_string())
    }

    fn draft(kind: CommitType, scope: Option<&str>, title: &str, description: &[&str]) -> CommitMessageDraft {
        CommitMessageDraft {
            kind,
            scope: scope.map(str::to_string),
            title: title.to_string(),
            description: description.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn formats_scope_and_bullets() {
        let msg = draft(
            CommitType::Feat,
            Some("api"),
            "add user endpoint",
            &["add POST /users", "add validation"],
        );
        assert_eq!(
            msg.to_string(),
            "feat(api): add user endpoint\n\n- add POST /users\n- add validation"
        );
    }

    #[test]
    fn header_only_has_no_trailing_blank_line() {
        let msg = draft(CommitType::Fix, None, "correct null check", &[]);
        assert_eq!(msg.to_string(), "fix: correct null check");
    }

    #[test]
    fn text_is_not_recased_or_truncated() {
        let title = "Rewrite The Whole Parser Because It Was Slow And Also Hard To Read";
        let msg = draft(CommitType::Refactor, Some("Parser"), title, &["Keep 'quotes' & \"marks\""]);
        let rendered = msg.to_string();
        assert!(rendered.starts_with(&format!("refactor(Parser): {title}")));
        assert!(rendered.ends_with("- Keep 'quotes' & \"marks\""));
    }

    #[test]
    fn header_round_trips_for_every_type() {
        for kind in CommitType::ALL {
            for scope in [None, Some("core"), Some("ui/button")] {
                let msg = draft(kind, scope, "do: the thing", &["one"]);
                let rendered = msg.to_string();
                let header = rendered.lines().next().unwrap();
                let (parsed_kind, parsed_scope, parsed_title) = parse_header(header);
                assert_eq!(parsed_kind, kind);
                assert_eq!(parsed_scope.as_deref(), scope);
                assert_eq!(parsed_title, "do: the thing");
            }
        }
    }

    #[test]
    fn commit_type_parsing_is_exact() {
        assert_eq!("perf".parse::<CommitType>(), Ok(CommitType::Perf));
        assert!("Feat".parse::<CommitType>().is_err());
        assert!("banana".parse::<CommitType>().is_err());
        assert!("".parse::<CommitType>().is_err());
    }

    #[test]
    fn serde_names_match_as_str() {
        for kind in CommitType::ALL {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, serde_json::Value::String(kind.as_str().to_string()));
        }
    }
}
