//! `{token}` substitution for activity messages.

/// Placeholder names understood by the message templates.
pub mod token {
    pub const FILENAME: &str = "{filename}";
    pub const WORKSPACE: &str = "{workspace}";
    pub const EDITOR: &str = "{editor}";
    pub const LANGUAGE: &str = "{language}";
    pub const LINE: &str = "{line}";
    pub const ACTION: &str = "{action}";
}

/// Replace every occurrence of every known token in one left-to-right pass.
/// Inserted values are never rescanned. Unknown `{...}` markers are left
/// verbatim.
#[must_use]
pub fn render(template: &str, substitutions: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        rest = &rest[open..];
        match substitutions
            .iter()
            .find(|(token, _)| rest.starts_with(*token))
        {
            Some((token, value)) => {
                out.push_str(value);
                rest = &rest[token.len()..];
            }
            None => {
                out.push('{');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Substitutions for one payload build.
///
/// The action template is rendered first; its result is exposed as
/// `{action}` to every other template.
#[derive(Debug, Clone)]
pub struct Substitutions {
    pairs: Vec<(&'static str, String)>,
}

impl Substitutions {
    #[must_use]
    pub fn new(filename: &str, workspace: &str, editor: &str, language: &str) -> Self {
        Self {
            pairs: vec![
                (token::FILENAME, filename.to_string()),
                (token::WORKSPACE, workspace.to_string()),
                (token::EDITOR, editor.to_string()),
                (token::LANGUAGE, language.to_string()),
            ],
        }
    }

    #[must_use]
    pub fn with_line(mut self, line: i64) -> Self {
        self.pairs.push((token::LINE, line.to_string()));
        self
    }

    /// Render `action_template` and make the result available as `{action}`.
    #[must_use]
    pub fn with_action(mut self, action_template: &str) -> Self {
        let action = self.render(action_template);
        self.pairs.retain(|(token, _)| *token != token::ACTION);
        self.pairs.push((token::ACTION, action));
        self
    }

    #[must_use]
    pub fn action(&self) -> &str {
        self.pairs
            .iter()
            .find(|(token, _)| *token == token::ACTION)
            .map_or("", |(_, value)| value.as_str())
    }

    #[must_use]
    pub fn render(&self, template: &str) -> String {
        let borrowed: Vec<(&str, &str)> = self
            .pairs
            .iter()
            .map(|(token, value)| (*token, value.as_str()))
            .collect();
        render(template, &borrowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_without_tokens_is_unchanged() {
        assert_eq!(render("plain text", &[("{filename}", "a.rs")]), "plain text");
    }

    #[test]
    fn every_occurrence_is_replaced() {
        let out = render(
            "{filename} / {filename} in {workspace}",
            &[("{filename}", "a.rs"), ("{workspace}", "proj")],
        );
        assert_eq!(out, "a.rs / a.rs in proj");
    }

    #[test]
    fn unknown_tokens_are_left_verbatim() {
        assert_eq!(
            render("{filename} {nope}", &[("{filename}", "x")]),
            "x {nope}"
        );
    }

    #[test]
    fn action_is_available_to_other_templates() {
        let subs = Substitutions::new("main.go", "svc", "helix", "go")
            .with_action("Editing {filename}");

        assert_eq!(subs.action(), "Editing main.go");
        assert_eq!(subs.render("{action} ({language})"), "Editing main.go (go)");
    }

    #[test]
    fn line_token_resolves_in_action() {
        let subs = Substitutions::new("main.go", "svc", "helix", "go")
            .with_line(42)
            .with_action("Editing {filename}:{line}");

        assert_eq!(subs.action(), "Editing main.go:42");
    }

    #[test]
    fn inserted_values_are_not_rescanned() {
        let subs = Substitutions::new("{language}.txt", "{action}", "helix", "go")
            .with_action("Viewing {filename}");

        assert_eq!(subs.action(), "Viewing {language}.txt");
        assert_eq!(subs.render("In {workspace}"), "In {action}");
        assert_eq!(
            render("{filename}{", &[("{filename}", "{editor}"), ("{editor}", "x")]),
            "{editor}{"
        );
    }

    #[test]
    fn action_template_cannot_reference_itself() {
        let subs = Substitutions::new("a", "w", "e", "l").with_action("{action}!");
        assert_eq!(subs.action(), "{action}!");
    }
}
