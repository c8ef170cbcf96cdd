use serde::{Deserialize, Serialize};

/// One stack as reported by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Type identifier, e.g. "minecraft:filled_map"
    pub name: String,
    pub count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<Display>,
}

/// Display metadata. The marketplace abuses `lore` to carry price and seller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Display {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<TextComponent>,
    #[serde(default)]
    pub lore: Vec<TextComponent>,
}

/// Styled text: a run of text plus nested child runs.
///
/// The bridge sends either a bare string or `{text, extra}`; both decode here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawComponent")]
pub struct TextComponent {
    pub text: String,
    pub extra: Vec<TextComponent>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawComponent {
    Plain(String),
    Styled {
        #[serde(default)]
        text: String,
        #[serde(default)]
        extra: Vec<TextComponent>,
    },
}

impl From<RawComponent> for TextComponent {
    fn from(raw: RawComponent) -> Self {
        match raw {
            RawComponent::Plain(text) => TextComponent {
                text,
                extra: Vec::new(),
            },
            RawComponent::Styled { text, extra } => TextComponent { text, extra },
        }
    }
}

impl TextComponent {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            extra: Vec::new(),
        }
    }

    /// Concatenate this run and all children, depth first.
    pub fn flatten(&self) -> String {
        let mut out = String::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(&self, out: &mut String) {
        out.push_str(&self.text);
        for child in &self.extra {
            child.flatten_into(out);
        }
    }
}

impl Item {
    pub fn new(name: impl Into<String>, count: u32) -> Self {
        Self {
            name: name.into(),
            count,
            display: None,
        }
    }

    /// Attach plain lore lines (used by tests and the fake server).
    pub fn with_lore<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let display = self.display.get_or_insert_with(Display::default);
        display.lore = lines.into_iter().map(TextComponent::plain).collect();
        self
    }

    pub fn is(&self, kind: &str) -> bool {
        self.name == kind
    }

    /// Lore as plain lines. `None` when the item carries no display metadata.
    pub fn lore_lines(&self) -> Option<Vec<String>> {
        let display = self.display.as_ref()?;
        Some(display.lore.iter().map(TextComponent::flatten).collect())
    }
}
