//! Typed schema for the declarative style, rank and user files.

use crate::access::{RankAccessRule, UserOverride};
use crate::style::{Animation, StyleKind};
use serde::{Deserialize, Serialize};

/// A base word substituted into category templates.
///
/// Accepts either a bare string or a table with an explicit value:
///
/// ```toml
/// words = ["Devoted", { word = "Ruby", value = "#E0115F" }]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BaseWordRepr")]
pub struct BaseWord {
    pub word: String,
    pub value: Option<String>,
}

impl BaseWord {
    pub fn new(word: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            value: None,
        }
    }

    /// The value substituted for `{value}`; falls back to the word itself.
    pub fn value_or_word(&self) -> &str {
        self.value.as_deref().unwrap_or(&self.word)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BaseWordRepr {
    Plain(String),
    Detailed { word: String, value: Option<String> },
}

impl From<BaseWordRepr> for BaseWord {
    fn from(repr: BaseWordRepr) -> Self {
        match repr {
            BaseWordRepr::Plain(word) => Self { word, value: None },
            BaseWordRepr::Detailed { word, value } => Self { word, value },
        }
    }
}

/// A named list of base words.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordGroup {
    pub name: String,
    #[serde(default)]
    pub words: Vec<BaseWord>,
}

impl WordGroup {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("group name must not be empty".to_string());
        }
        if self.name == crate::access::WILDCARD {
            return Err("'*' is reserved and cannot name a group".to_string());
        }
        Ok(())
    }
}

/// One way of rendering a base word within a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleTemplate {
    /// Appended to the word to form the display name: `"<word> <name>"`.
    pub name: String,
    /// Value template; `{word}` and `{value}` are substituted.
    pub format: String,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub glow: bool,
    #[serde(default)]
    pub condition: Option<String>,
}

impl StyleTemplate {
    pub fn render(&self, word: &BaseWord) -> String {
        self.format
            .replace("{word}", &word.word)
            .replace("{value}", word.value_or_word())
    }
}

/// A named set of templates producing options of one kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleCategory {
    pub name: String,
    pub kind: StyleKind,
    #[serde(default, rename = "template")]
    pub templates: Vec<StyleTemplate>,
}

impl StyleCategory {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("category name must not be empty".to_string());
        }
        if self.name == crate::access::WILDCARD {
            return Err("'*' is reserved and cannot name a category".to_string());
        }
        for template in &self.templates {
            if template.name.trim().is_empty() {
                return Err(format!(
                    "category '{}': template name must not be empty",
                    self.name
                ));
            }
        }
        Ok(())
    }
}

/// A bespoke option that bypasses generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecificOption {
    pub id: String,
    pub display_name: String,
    pub kind: StyleKind,
    pub value: String,
    #[serde(default)]
    pub ranks: Vec<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub glow: bool,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub animation: Option<Animation>,
    #[serde(default)]
    pub required_capability: Option<String>,
}

impl SpecificOption {
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("option id must not be empty".to_string());
        }
        if self.display_name.trim().is_empty() {
            return Err(format!("option '{}': display_name must not be empty", self.id));
        }
        if let Some(animation) = &self.animation {
            if animation.frames.is_empty() {
                return Err(format!("option '{}': animation has no frames", self.id));
            }
        }
        Ok(())
    }
}

/// Contents of `styles.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StylesConfig {
    #[serde(default, rename = "group")]
    pub groups: Vec<WordGroup>,
    #[serde(default, rename = "category")]
    pub categories: Vec<StyleCategory>,
    #[serde(default, rename = "option")]
    pub options: Vec<SpecificOption>,
}

impl StylesConfig {
    pub fn group(&self, name: &str) -> Option<&WordGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn category(&self, name: &str) -> Option<&StyleCategory> {
        self.categories.iter().find(|c| c.name == name)
    }
}

/// Contents of `ranks.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RanksConfig {
    #[serde(default, rename = "rank")]
    pub ranks: Vec<RankAccessRule>,
}

/// Contents of `users.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsersConfig {
    #[serde(default, rename = "user")]
    pub users: Vec<UserOverride>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_styles_from_toml() {
        let styles: StylesConfig = toml::from_str(
            r##"
            [[group]]
            name = "gems"
            words = ["Ruby", { word = "Jade", value = "#00A86B" }]

            [[category]]
            name = "shimmer"
            kind = "gradient_color"

            [[category.template]]
            name = "Shimmer"
            format = "<gradient:{value}:#FFFFFF>"
            glow = true

            [[option]]
            id = "founder"
            display_name = "Founder"
            kind = "prefix"
            value = "[Founder]"
            ranks = ["admin"]
            "##,
        )
        .unwrap();

        let gems = styles.group("gems").unwrap();
        assert_eq!(gems.words[0], BaseWord::new("Ruby"));
        assert_eq!(gems.words[1].value_or_word(), "#00A86B");

        let shimmer = styles.category("shimmer").unwrap();
        assert_eq!(shimmer.kind, StyleKind::GradientColor);
        assert_eq!(
            shimmer.templates[0].render(&gems.words[1]),
            "<gradient:#00A86B:#FFFFFF>"
        );
        assert_eq!(styles.options[0].ranks, vec!["admin".to_string()]);
    }

    #[test]
    fn test_category_rejects_wildcard_name() {
        let category = StyleCategory {
            name: "*".to_string(),
            kind: StyleKind::Prefix,
            templates: vec![],
        };
        assert!(category.validate().is_err());
    }
}
