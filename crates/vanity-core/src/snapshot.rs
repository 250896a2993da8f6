//! Immutable catalog snapshot and access resolution over it.
//!
//! A snapshot bundles everything one config load produced: the compiled
//! catalog, the rank rules, user overrides and the text policies. Readers hold
//! an `Arc` to a snapshot for the duration of a call; reloads build a new one.

use crate::access::{Capability, RankAccessRule, UserOverride, WILDCARD};
use crate::condition::{ConditionContext, Season};
use crate::config::{ConfigBundle, NicknameSettings, TagSettings};
use crate::error::Result;
use crate::style::{OptionOrigin, StyleCatalog, StyleKind, StyleOption};
use crate::validation::TextPolicy;
use std::collections::{BTreeSet, HashMap};

/// Groups a player may draw options from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupAccess {
    /// Every accessible group, wildcards expanded.
    pub groups: BTreeSet<String>,
    /// The subset granted by a user override. Options in these groups are
    /// available regardless of which ranks generated them.
    pub granted: BTreeSet<String>,
}

#[derive(Debug, Clone)]
struct CompiledOverride {
    source: UserOverride,
    custom: Vec<StyleOption>,
}

#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    catalog: StyleCatalog,
    rules: Vec<RankAccessRule>,
    rule_index: HashMap<String, usize>,
    overrides: HashMap<String, CompiledOverride>,
    tags: TagSettings,
    nickname: NicknameSettings,
    seasons: Vec<Season>,
    tag_policy: TextPolicy,
    nickname_policy: TextPolicy,
    warnings: Vec<String>,
}

impl CatalogSnapshot {
    /// Compiles a snapshot from a loaded config bundle.
    ///
    /// Fails only when the text policies cannot be compiled; dangling
    /// references and duplicates become warnings.
    pub fn build(bundle: &ConfigBundle) -> Result<Self> {
        let (catalog, mut warnings) =
            StyleCatalog::compile(&bundle.styles, &bundle.ranks.ranks);

        let mut rule_index = HashMap::new();
        for (idx, rule) in bundle.ranks.ranks.iter().enumerate() {
            if rule_index.contains_key(&rule.name) {
                warnings.push(format!("rank '{}' is declared more than once", rule.name));
                continue;
            }
            rule_index.insert(rule.name.clone(), idx);
        }

        let mut overrides = HashMap::new();
        for user in &bundle.users.users {
            let key = user.username.to_lowercase();
            if overrides.contains_key(&key) {
                warnings.push(format!("user '{}' is declared more than once", user.username));
                continue;
            }
            let custom = user
                .custom_options
                .iter()
                .map(|c| StyleOption {
                    id: c.id.clone(),
                    display_name: c.display_name.clone(),
                    kind: c.kind,
                    value: c.value.clone(),
                    allowed_ranks: BTreeSet::new(),
                    groups: BTreeSet::new(),
                    category: None,
                    material: None,
                    glow: false,
                    condition: None,
                    animation: None,
                    required_capability: None,
                    origin: OptionOrigin::UserCustom,
                })
                .collect();
            overrides.insert(
                key,
                CompiledOverride {
                    source: user.clone(),
                    custom,
                },
            );
        }

        let settings = &bundle.settings;
        let tag_policy = TextPolicy::new(
            settings.tags.min_length,
            settings.tags.max_length,
            &settings.tags.allowed_pattern,
            &settings.tags.forbidden_words,
        )?;
        let nickname_policy = TextPolicy::new(
            1,
            settings.nickname.max_length,
            &settings.nickname.allowed_pattern,
            &settings.tags.forbidden_words,
        )?;

        tracing::debug!(
            options = catalog.len(),
            ranks = rule_index.len(),
            overrides = overrides.len(),
            warnings = warnings.len(),
            "Compiled catalog snapshot"
        );

        Ok(Self {
            catalog,
            rules: bundle.ranks.ranks.clone(),
            rule_index,
            overrides,
            tags: settings.tags.clone(),
            nickname: settings.nickname.clone(),
            seasons: settings.seasons.clone(),
            tag_policy,
            nickname_policy,
            warnings,
        })
    }

    pub fn catalog(&self) -> &StyleCatalog {
        &self.catalog
    }

    pub fn rule(&self, rank: &str) -> Option<&RankAccessRule> {
        self.rule_index.get(rank).map(|&idx| &self.rules[idx])
    }

    /// Rank rules in declaration order.
    pub fn rules(&self) -> &[RankAccessRule] {
        &self.rules
    }

    pub fn rank_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.name.as_str())
    }

    /// Case-insensitive lookup.
    pub fn user_override(&self, username: &str) -> Option<&UserOverride> {
        self.overrides
            .get(&username.to_lowercase())
            .map(|o| &o.source)
    }

    /// Bespoke options configured for one user, every kind.
    pub fn custom_options(&self, username: &str) -> &[StyleOption] {
        self.overrides
            .get(&username.to_lowercase())
            .map(|o| o.custom.as_slice())
            .unwrap_or(&[])
    }

    pub fn tag_settings(&self) -> &TagSettings {
        &self.tags
    }

    pub fn nickname_settings(&self) -> &NicknameSettings {
        &self.nickname
    }

    pub fn seasons(&self) -> &[Season] {
        &self.seasons
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Rule flag lookup. Unknown ranks have no capabilities.
    pub fn has_capability(&self, rank: &str, capability: Capability) -> bool {
        self.rule(rank)
            .map(|r| r.allow.allows(capability))
            .unwrap_or(false)
    }

    /// Tag policy with the rank's length limits applied.
    pub fn tag_policy_for(&self, rank: &str) -> TextPolicy {
        let limits = self.rule(rank).map(|r| &r.limits);
        let min = limits
            .and_then(|l| l.tag_min_length)
            .unwrap_or(self.tag_policy.min_length());
        let max = limits
            .and_then(|l| l.tag_max_length)
            .unwrap_or(self.tag_policy.max_length());
        self.tag_policy.with_bounds(min, max)
    }

    pub fn nickname_policy_for(&self, rank: &str) -> TextPolicy {
        match self.rule(rank).and_then(|r| r.limits.nickname_max_length) {
            Some(max) => self.nickname_policy.with_bounds(1, max),
            None => self.nickname_policy.clone(),
        }
    }

    pub fn nickname_cooldown_for(&self, rank: &str) -> chrono::Duration {
        let secs = self
            .rule(rank)
            .and_then(|r| r.limits.nickname_cooldown_secs)
            .unwrap_or(self.nickname.cooldown_secs);
        chrono::Duration::seconds(secs as i64)
    }

    /// Resolves the groups a player may draw options from.
    ///
    /// `override_groups` replaces the rank's groups outright; otherwise
    /// `additional_groups` extend them. `"*"` expands to every group known to
    /// this snapshot.
    pub fn accessible_groups(&self, rank: &str, username: &str) -> GroupAccess {
        let known = self.catalog.group_names();
        let expand = |names: &[String], into: &mut BTreeSet<String>| {
            for name in names {
                if name == WILDCARD {
                    into.extend(known.iter().cloned());
                } else {
                    into.insert(name.clone());
                }
            }
        };

        let mut access = GroupAccess::default();
        let user = self.user_override(username);
        match user.and_then(|u| u.override_groups.as_ref()) {
            Some(replacement) => {
                expand(replacement, &mut access.granted);
                access.groups = access.granted.clone();
            }
            None => {
                if let Some(rule) = self.rule(rank) {
                    expand(&rule.groups, &mut access.groups);
                }
                if let Some(user) = user {
                    expand(&user.additional_groups, &mut access.granted);
                    access.groups.extend(access.granted.iter().cloned());
                }
            }
        }
        access
    }

    /// Options of `kind` the player may select right now, in catalog order,
    /// followed by the player's bespoke options.
    pub fn resolve(
        &self,
        rank: &str,
        username: &str,
        kind: StyleKind,
        ctx: &ConditionContext<'_>,
    ) -> Vec<StyleOption> {
        let access = self.accessible_groups(rank, username);
        let rule = self.rule(rank);

        let mut resolved: Vec<StyleOption> = self
            .catalog
            .options_of_kind(kind)
            .filter(|option| is_eligible(option, rank, &access))
            .filter(|option| match &option.required_capability {
                Some(cap) => rule.map(|r| r.has_capability_named(cap)).unwrap_or(false),
                None => true,
            })
            .filter(|option| match &option.condition {
                Some(condition) => ctx.holds(condition),
                None => true,
            })
            .cloned()
            .collect();

        if let Some(user) = self.overrides.get(&username.to_lowercase()) {
            resolved.extend(user.custom.iter().filter(|o| o.kind == kind).cloned());
        }
        resolved
    }

    /// Looks up one resolvable option by id.
    pub fn resolve_one(
        &self,
        rank: &str,
        username: &str,
        kind: StyleKind,
        option_id: &str,
        ctx: &ConditionContext<'_>,
    ) -> Option<StyleOption> {
        self.resolve(rank, username, kind, ctx)
            .into_iter()
            .find(|o| o.id == option_id)
    }
}

fn is_eligible(option: &StyleOption, rank: &str, access: &GroupAccess) -> bool {
    if option.groups.is_empty() {
        return option.is_allowed_for(rank);
    }
    let in_accessible = option.groups.iter().any(|g| access.groups.contains(g));
    let granted = option.groups.iter().any(|g| access.granted.contains(g));
    in_accessible && (option.is_allowed_for(rank) || granted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::HashSet;

    const STYLES: &str = r##"
        [[group]]
        name = "gems"
        words = ["Ruby", "Jade"]

        [[group]]
        name = "metals"
        words = ["Gold"]

        [[category]]
        name = "solid"
        kind = "solid_color"

        [[category.template]]
        name = "Tone"
        format = "{word}"

        [[category.template]]
        name = "Frost"
        format = "{word}"
        condition = "winter"

        [[option]]
        id = "staff_red"
        display_name = "Staff Red"
        kind = "solid_color"
        value = "#FF0000"
        ranks = ["staff"]

        [[option]]
        id = "rainbow"
        display_name = "Rainbow"
        kind = "solid_color"
        value = "rainbow"
        ranks = ["staff"]
        required_capability = "animated"
    "##;

    const RANKS: &str = r#"
        [[rank]]
        name = "member"
        groups = ["gems"]
        categories = ["solid"]
        allow = { color = true }

        [[rank]]
        name = "staff"
        groups = ["*"]
        categories = ["*"]
        capabilities = ["animated"]
        allow = { color = true, custom_tags = true }
        limits = { tag_max_length = 20 }
    "#;

    const USERS: &str = r##"
        [[user]]
        username = "Alex"
        additional_groups = ["metals"]

        [[user.custom]]
        id = "alex_teal"
        display_name = "Alex Teal"
        kind = "solid_color"
        value = "#008080"

        [[user]]
        username = "Sam"
        override_groups = ["metals"]
    "##;

    fn bundle() -> ConfigBundle {
        ConfigBundle {
            styles: toml::from_str(STYLES).unwrap(),
            ranks: toml::from_str(RANKS).unwrap(),
            users: toml::from_str(USERS).unwrap(),
            settings: toml::from_str(
                r#"
                [[season]]
                name = "winter"
                start = "12-01"
                end = "02-28"
                "#,
            )
            .unwrap(),
        }
    }

    fn ids(options: &[StyleOption]) -> Vec<&str> {
        options.iter().map(|o| o.id.as_str()).collect()
    }

    fn resolve(
        snapshot: &CatalogSnapshot,
        rank: &str,
        user: &str,
        month: u32,
    ) -> Vec<StyleOption> {
        let events = HashSet::new();
        let ctx = ConditionContext {
            now: Utc.with_ymd_and_hms(2025, month, 10, 0, 0, 0).unwrap(),
            seasons: snapshot.seasons(),
            active_events: &events,
        };
        snapshot.resolve(rank, user, StyleKind::SolidColor, &ctx)
    }

    #[test]
    fn test_resolve_member_filters_season() {
        let snapshot = CatalogSnapshot::build(&bundle()).unwrap();

        let summer = resolve(&snapshot, "member", "Steve", 7);
        assert_eq!(ids(&summer), vec!["ruby_tone", "jade_tone"]);

        let winter = resolve(&snapshot, "member", "Steve", 1);
        assert_eq!(
            ids(&winter),
            vec!["ruby_tone", "ruby_frost", "jade_tone", "jade_frost"]
        );
    }

    #[test]
    fn test_additional_groups_and_custom_options() {
        let snapshot = CatalogSnapshot::build(&bundle()).unwrap();
        let alex = resolve(&snapshot, "member", "alex", 7);
        assert_eq!(
            ids(&alex),
            vec!["ruby_tone", "jade_tone", "gold_tone", "alex_teal"]
        );
    }

    #[test]
    fn test_override_groups_replace_rank_groups() {
        let snapshot = CatalogSnapshot::build(&bundle()).unwrap();
        let sam = resolve(&snapshot, "member", "Sam", 7);
        assert_eq!(ids(&sam), vec!["gold_tone"]);
    }

    #[test]
    fn test_required_capability_and_ungrouped_specifics() {
        let snapshot = CatalogSnapshot::build(&bundle()).unwrap();
        let staff = resolve(&snapshot, "staff", "Op", 7);
        assert!(ids(&staff).contains(&"staff_red"));
        assert!(ids(&staff).contains(&"rainbow"));

        let member = resolve(&snapshot, "member", "Steve", 7);
        assert!(!ids(&member).contains(&"staff_red"));
    }

    #[test]
    fn test_wildcard_is_superset_of_explicit_group() {
        let wildcard = CatalogSnapshot::build(&bundle()).unwrap();

        let mut explicit_bundle = bundle();
        explicit_bundle.ranks.ranks[1].groups = vec!["metals".to_string()];
        let explicit = CatalogSnapshot::build(&explicit_bundle).unwrap();

        for month in [1, 7] {
            let wide = resolve(&wildcard, "staff", "Op", month);
            let narrow = resolve(&explicit, "staff", "Op", month);
            assert!(!narrow.is_empty());
            assert!(narrow.iter().all(|o| wide.contains(o)));
        }
    }

    #[test]
    fn test_gates_and_policies() {
        let snapshot = CatalogSnapshot::build(&bundle()).unwrap();
        assert!(snapshot.has_capability("staff", Capability::CustomTags));
        assert!(!snapshot.has_capability("member", Capability::CustomTags));
        assert!(!snapshot.has_capability("ghost", Capability::Color));

        assert_eq!(snapshot.tag_policy_for("staff").max_length(), 20);
        assert_eq!(snapshot.tag_policy_for("member").max_length(), 16);
        assert_eq!(
            snapshot.nickname_cooldown_for("member"),
            chrono::Duration::hours(1)
        );
        assert!(snapshot.user_override("ALEX").is_some());
    }
}
