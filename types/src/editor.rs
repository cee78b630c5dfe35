use std::fmt;

/// Lower-cased editor name as reported in `clientInfo.name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct EditorName(String);

/// Editors whose icon is pinned regardless of the reported client name.
const ICON_OVERRIDES: &[(&str, &str)] = &[
    ("visual studio code", "vscode"),
    ("visual studio code - insiders", "vscode"),
    ("code", "vscode"),
    ("vscodium", "vscode"),
];

impl EditorName {
    #[must_use]
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Name of the icon asset for this editor.
    #[must_use]
    pub fn icon_name(&self) -> &str {
        ICON_OVERRIDES
            .iter()
            .find(|(name, _)| *name == self.0)
            .map_or(self.0.as_str(), |(_, icon)| icon)
    }
}

impl fmt::Display for EditorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Presence-service application identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ApplicationId(String);

impl ApplicationId {
    const NEOVIM: &'static str = "1352048301633044521";
    const HELIX: &'static str = "1351256971059396679";
    const DEFAULT: &'static str = "1351257618227920896";

    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Pick the application registered for `editor`, unless `override_id` is set.
    #[must_use]
    pub fn resolve(editor: &EditorName, override_id: &str) -> Self {
        let override_id = override_id.trim();
        if !override_id.is_empty() {
            return Self::new(override_id);
        }
        let id = match editor.as_str() {
            "neovim" | "nvim" => Self::NEOVIM,
            "helix" => Self::HELIX,
            _ => Self::DEFAULT,
        };
        Self::new(id)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
