//! Catalog compilation.
//!
//! Turns the styles file and the rank rules into an immutable, indexed set of
//! [`StyleOption`]s. Generation walks rank rules in declaration order, then
//! each rule's base words, then its categories, then each category's
//! templates. Two paths producing the same `(kind, display name)` yield one
//! option: the first-seen instance keeps its metadata and later paths only add
//! rank and group membership.

use super::model::{OptionOrigin, StyleKind, StyleOption, slugify};
use crate::access::{RankAccessRule, WILDCARD};
use crate::config::{SpecificOption, StyleCategory, StyleTemplate, StylesConfig, WordGroup};
use std::collections::{BTreeSet, HashMap};

/// A frozen set of compiled options.
#[derive(Debug, Clone, Default)]
pub struct StyleCatalog {
    options: Vec<StyleOption>,
    by_id: HashMap<(StyleKind, String), usize>,
    by_kind: HashMap<StyleKind, Vec<usize>>,
    group_names: Vec<String>,
    category_names: Vec<String>,
}

impl StyleCatalog {
    /// Compiles a catalog. Returns the catalog and any warnings about
    /// dangling references or rejected options.
    pub fn compile(styles: &StylesConfig, ranks: &[RankAccessRule]) -> (Self, Vec<String>) {
        let mut builder = CatalogBuilder::default();

        for rule in ranks {
            let groups = expand(&rule.groups, styles.groups.iter().map(|g| g.name.as_str()));
            let categories = expand(
                &rule.categories,
                styles.categories.iter().map(|c| c.name.as_str()),
            );

            let groups: Vec<&WordGroup> = groups
                .iter()
                .filter_map(|name| match styles.group(name) {
                    Some(group) => Some(group),
                    None => {
                        builder.warn(format!("rank '{}' references unknown group '{}'", rule.name, name));
                        None
                    }
                })
                .collect();
            let categories: Vec<&StyleCategory> = categories
                .iter()
                .filter_map(|name| match styles.category(name) {
                    Some(category) => Some(category),
                    None => {
                        builder.warn(format!(
                            "rank '{}' references unknown category '{}'",
                            rule.name, name
                        ));
                        None
                    }
                })
                .collect();

            for group in &groups {
                for word in &group.words {
                    for category in &categories {
                        for template in &category.templates {
                            builder.insert(generate(&rule.name, group, word, category, template));
                        }
                    }
                }
            }
        }

        for specific in &styles.options {
            builder.insert_specific(specific);
        }

        for rule in ranks {
            for id in &rule.options {
                if !builder.grant(id, &rule.name) {
                    builder.warn(format!("rank '{}' grants unknown option '{}'", rule.name, id));
                }
            }
        }

        let (mut catalog, warnings) = builder.finish();
        catalog.group_names = styles.groups.iter().map(|g| g.name.clone()).collect();
        catalog.category_names = styles.categories.iter().map(|c| c.name.clone()).collect();
        (catalog, warnings)
    }

    pub fn get(&self, kind: StyleKind, id: &str) -> Option<&StyleOption> {
        self.by_id
            .get(&(kind, id.to_string()))
            .map(|&idx| &self.options[idx])
    }

    /// Looks an option up by id across all kinds.
    pub fn find(&self, id: &str) -> Option<&StyleOption> {
        self.options.iter().find(|o| o.id == id)
    }

    /// Every compiled option, in generation order.
    pub fn options(&self) -> &[StyleOption] {
        &self.options
    }

    /// Options of one kind, in generation order.
    pub fn options_of_kind(&self, kind: StyleKind) -> impl Iterator<Item = &StyleOption> {
        self.by_kind
            .get(&kind)
            .into_iter()
            .flatten()
            .map(|&idx| &self.options[idx])
    }

    /// All word group names known to this catalog, in declaration order.
    pub fn group_names(&self) -> &[String] {
        &self.group_names
    }

    pub fn category_names(&self) -> &[String] {
        &self.category_names
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

/// Expands `"*"` against `known` while keeping first-seen order and
/// dropping duplicates.
pub fn expand<'a>(names: &[String], known: impl Iterator<Item = &'a str> + Clone) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in names {
        if name == WILDCARD {
            for k in known.clone() {
                if !out.iter().any(|o| o == k) {
                    out.push(k.to_string());
                }
            }
        } else if !out.iter().any(|o| o == name) {
            out.push(name.clone());
        }
    }
    out
}

fn generate(
    rank: &str,
    group: &WordGroup,
    word: &crate::config::BaseWord,
    category: &StyleCategory,
    template: &StyleTemplate,
) -> StyleOption {
    let display_name = format!("{} {}", word.word, template.name);
    StyleOption {
        id: slugify(&display_name),
        display_name,
        kind: category.kind,
        value: template.render(word),
        allowed_ranks: BTreeSet::from([rank.to_string()]),
        groups: BTreeSet::from([group.name.clone()]),
        category: Some(category.name.clone()),
        material: template.material.clone(),
        glow: template.glow,
        condition: template.condition.clone(),
        animation: None,
        required_capability: None,
        origin: OptionOrigin::Generated,
    }
}

#[derive(Default)]
struct CatalogBuilder {
    options: Vec<StyleOption>,
    by_display: HashMap<(StyleKind, String), usize>,
    by_id: HashMap<(StyleKind, String), usize>,
    warnings: Vec<String>,
}

impl CatalogBuilder {
    fn warn(&mut self, message: String) {
        self.warnings.push(message);
    }

    /// Inserts a generated option, merging into an existing one with the same
    /// display name. Generated ids are made unique within their kind.
    fn insert(&mut self, mut option: StyleOption) {
        if self.merge(&option) {
            return;
        }
        let base = option.id.clone();
        let mut n = 2;
        while self.by_id.contains_key(&(option.kind, option.id.clone())) {
            option.id = format!("{}_{}", base, n);
            n += 1;
        }
        self.push(option);
    }

    fn insert_specific(&mut self, specific: &SpecificOption) {
        let option = StyleOption {
            id: specific.id.clone(),
            display_name: specific.display_name.clone(),
            kind: specific.kind,
            value: specific.value.clone(),
            allowed_ranks: specific.ranks.iter().cloned().collect(),
            groups: specific.group.iter().cloned().collect(),
            category: None,
            material: specific.material.clone(),
            glow: specific.glow,
            condition: specific.condition.clone(),
            animation: specific.animation.clone(),
            required_capability: specific.required_capability.clone(),
            origin: OptionOrigin::Specific,
        };
        if self.merge(&option) {
            return;
        }
        if self.by_id.contains_key(&(option.kind, option.id.clone())) {
            self.warn(format!(
                "option '{}' ({}) collides with an existing id and was skipped",
                option.id, option.kind
            ));
            return;
        }
        self.push(option);
    }

    fn merge(&mut self, option: &StyleOption) -> bool {
        let key = (option.kind, option.display_name.clone());
        match self.by_display.get(&key) {
            Some(&idx) => {
                let existing = &mut self.options[idx];
                existing.allowed_ranks.extend(option.allowed_ranks.iter().cloned());
                existing.groups.extend(option.groups.iter().cloned());
                true
            }
            None => false,
        }
    }

    fn push(&mut self, option: StyleOption) {
        let idx = self.options.len();
        self.by_display
            .insert((option.kind, option.display_name.clone()), idx);
        self.by_id.insert((option.kind, option.id.clone()), idx);
        self.options.push(option);
    }

    /// Adds `rank` to every option with `id`, whatever its kind.
    fn grant(&mut self, id: &str, rank: &str) -> bool {
        let mut found = false;
        for option in self.options.iter_mut().filter(|o| o.id == id) {
            option.allowed_ranks.insert(rank.to_string());
            found = true;
        }
        found
    }

    fn finish(self) -> (StyleCatalog, Vec<String>) {
        let mut by_kind: HashMap<StyleKind, Vec<usize>> = HashMap::new();
        for (idx, option) in self.options.iter().enumerate() {
            by_kind.entry(option.kind).or_default().push(idx);
        }
        let catalog = StyleCatalog {
            options: self.options,
            by_id: self.by_id,
            by_kind,
            group_names: Vec::new(),
            category_names: Vec::new(),
        };
        (catalog, self.warnings)
    }
}
