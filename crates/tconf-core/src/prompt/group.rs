//! Prompts repeated once per operator-chosen alias.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::capability::Capability;
use crate::context::RunContext;
use crate::error::ValidationFailure;
use crate::properties::{Node, PropertyStore, join_path};
use crate::remote::PromptError;

use super::value::capitalize;
use super::{Answer, MemberRef, NO_HELP, Prompt, PromptOutcome, ValuePrompt, read_answer};

/// Reserved member holding group-wide defaults.
pub const DEFAULTS_ALIAS: &str = "defaults";

static ALIAS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("alias pattern is valid"));

/// A member alias that is well formed and not the reserved defaults entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemberAlias(String);

impl MemberAlias {
    pub fn parse(raw: &str) -> Result<Self, ValidationFailure> {
        if raw == DEFAULTS_ALIAS {
            return Err(ValidationFailure::new(format!(
                "You may not use '{DEFAULTS_ALIAS}' as an alias"
            )));
        }
        if !ALIAS.is_match(raw) {
            return Err(ValidationFailure::new(
                "The new alias must consist only of letters, digits, and underscore (_)",
            ));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Members of one group as found in a property store.
#[derive(Debug, Clone, Default)]
pub struct MemberMap {
    members: BTreeMap<MemberAlias, PropertyStore>,
    defaults: Option<PropertyStore>,
    rejected: Vec<String>,
}

impl MemberMap {
    pub fn load(store: &PropertyStore, group: &str) -> Self {
        let mut map = Self::default();
        for key in store.member_aliases(group) {
            let values = store.subtree(&join_path(group, &key));
            if key == DEFAULTS_ALIAS {
                map.defaults = Some(values);
                continue;
            }
            match MemberAlias::parse(&key) {
                Ok(alias) => {
                    map.members.insert(alias, values);
                }
                Err(_) => map.rejected.push(key),
            }
        }
        map
    }

    pub fn aliases(&self) -> impl Iterator<Item = &MemberAlias> {
        self.members.keys()
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.members.keys().any(|a| a.as_str() == alias)
    }

    pub fn member(&self, alias: &str) -> Option<&PropertyStore> {
        self.members
            .iter()
            .find(|(a, _)| a.as_str() == alias)
            .map(|(_, values)| values)
    }

    pub fn defaults(&self) -> Option<&PropertyStore> {
        self.defaults.as_ref()
    }

    /// Keys under the group that are not usable aliases.
    pub fn rejected(&self) -> &[String] {
        &self.rejected
    }

    /// A member setting, falling back to the defaults entry.
    pub fn value(&self, alias: &str, leaf: &str) -> Option<&str> {
        self.member(alias)
            .and_then(|m| m.get(leaf))
            .or_else(|| self.defaults.as_ref().and_then(|d| d.get(leaf)))
            .filter(|v| !v.is_empty())
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    ConfirmDelete(String),
    Template(String, usize),
}

impl Item {
    fn alias(&self) -> &str {
        match self {
            Item::ConfirmDelete(alias) | Item::Template(alias, _) => alias,
        }
    }
}

enum Deletion {
    Delete,
    Keep,
    Leave(PromptOutcome),
}

enum NewAlias {
    Done,
    Added(MemberAlias),
    Leave(PromptOutcome),
}

/// A set of template prompts asked once per member alias.
pub struct GroupPrompt {
    name: String,
    text: String,
    singular: String,
    plural: String,
    weight: i32,
    description: Option<String>,
    templates: Vec<ValuePrompt>,
}

impl GroupPrompt {
    pub fn new(
        name: impl Into<String>,
        text: impl Into<String>,
        singular: impl Into<String>,
        plural: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            singular: singular.into().to_lowercase(),
            plural: plural.into().to_lowercase(),
            weight: 0,
            description: None,
            templates: Vec::new(),
        }
    }

    pub fn with_weight(mut self, weight: i32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_template(mut self, template: ValuePrompt) -> Self {
        self.templates.push(template);
        self
    }

    pub fn members(&self, store: &PropertyStore) -> MemberMap {
        MemberMap::load(store, &self.name)
    }

    fn bind(&self, alias: &str, index: usize) -> Option<ValuePrompt> {
        self.templates
            .get(index)
            .map(|t| t.for_member(MemberRef::new(&self.name, alias, &self.singular)))
    }

    /// Every member/template pair for the current members.
    fn bound_prompts(&self, ctx: &RunContext) -> Vec<ValuePrompt> {
        let members = self.members(ctx.store());
        members
            .aliases()
            .flat_map(|alias| {
                (0..self.templates.len()).filter_map(move |i| self.bind(alias.as_str(), i))
            })
            .collect()
    }

    fn member_items(&self, alias: &str) -> impl Iterator<Item = Item> + '_ {
        let alias = alias.to_string();
        (0..self.templates.len()).map(move |i| Item::Template(alias.clone(), i))
    }

    /// Stores defaults for queued member prompts. Members entered in this run
    /// exist only in the queue until one of their values is stored.
    fn commit_pending(&self, ctx: &mut RunContext, pending: &[Item]) {
        for item in pending {
            let Item::Template(alias, index) = item else {
                continue;
            };
            if let Some(prompt) = self.bind(alias, *index) {
                if prompt.enabled(ctx) {
                    prompt.save_current_value(ctx);
                } else {
                    prompt.save_disabled_value(ctx);
                }
            }
        }
    }

    fn help_text(&self) -> &str {
        self.description.as_deref().unwrap_or(NO_HELP)
    }

    fn ask_delete(&self, ctx: &mut RunContext, alias: &str) -> anyhow::Result<Deletion> {
        let question = format!("Delete {} '{alias}'?", self.singular);
        loop {
            match read_answer(ctx, &question, "no", self.help_text())? {
                Answer::Leave(outcome) => return Ok(Deletion::Leave(outcome)),
                Answer::Value(answer) => match answer.to_ascii_lowercase().as_str() {
                    "y" | "yes" => return Ok(Deletion::Delete),
                    "n" | "no" => return Ok(Deletion::Keep),
                    _ => ctx.error("Please answer yes or no"),
                },
            }
        }
    }

    fn ask_new_alias(&self, ctx: &mut RunContext) -> anyhow::Result<NewAlias> {
        ctx.say(&format!(
            "Enter an alias for the next {}.  Enter nothing to stop entering {}.",
            self.singular, self.plural
        ));
        let label = format!("New {} alias", self.singular);
        loop {
            let raw = match read_answer(ctx, &label, "", self.help_text())? {
                Answer::Leave(outcome) => return Ok(NewAlias::Leave(outcome)),
                Answer::Value(raw) => raw,
            };
            if raw.is_empty() {
                return Ok(NewAlias::Done);
            }
            match MemberAlias::parse(&raw) {
                Err(err) => ctx.error(&err.message),
                Ok(_) if self.members(ctx.store()).contains(&raw) => {
                    ctx.error(&format!("'{raw}' is already being used as an alias"))
                }
                Ok(alias) => return Ok(NewAlias::Added(alias)),
            }
        }
    }
}

impl Capability for GroupPrompt {
    type Outcome = anyhow::Result<PromptOutcome>;

    fn enabled(&self, _ctx: &RunContext) -> bool {
        true
    }

    fn run(&self, ctx: &mut RunContext) -> anyhow::Result<PromptOutcome> {
        if let Some(description) = &self.description {
            ctx.say("");
            ctx.divider();
            ctx.say(description);
            ctx.say("");
        }

        let mut queue: Vec<Item> = Vec::new();
        for alias in self.members(ctx.store()).aliases() {
            queue.push(Item::ConfirmDelete(alias.to_string()));
            queue.extend(self.member_items(alias.as_str()));
        }

        let mut pos = 0;
        let mut history: Vec<usize> = Vec::new();
        let mut announced: Option<String> = None;

        loop {
            if pos == queue.len() {
                match self.ask_new_alias(ctx)? {
                    NewAlias::Done => break,
                    NewAlias::Added(alias) => {
                        queue.extend(self.member_items(alias.as_str()));
                        continue;
                    }
                    NewAlias::Leave(PromptOutcome::Previous) => match history.pop() {
                        Some(previous) => {
                            pos = previous;
                            continue;
                        }
                        None => return Ok(PromptOutcome::Previous),
                    },
                    NewAlias::Leave(outcome) => return Ok(outcome),
                }
            }

            let item = queue[pos].clone();
            if announced.as_deref() != Some(item.alias()) {
                ctx.say(&self.text.replace("@value", item.alias()));
                announced = Some(item.alias().to_string());
            }

            let outcome = match &item {
                Item::ConfirmDelete(alias) => match self.ask_delete(ctx, alias)? {
                    Deletion::Delete => {
                        ctx.store_mut().remove(&join_path(&self.name, alias));
                        let tail = queue.split_off(pos);
                        queue.extend(tail.into_iter().filter(|i| i.alias() != alias));
                        history.retain(|&i| i < pos);
                        announced = None;
                        continue;
                    }
                    Deletion::Keep => {
                        history.push(pos);
                        pos += 1;
                        continue;
                    }
                    Deletion::Leave(outcome) => outcome,
                },
                Item::Template(alias, index) => {
                    let Some(prompt) = self.bind(alias, *index) else {
                        pos += 1;
                        continue;
                    };
                    let outcome = prompt.run(ctx)?;
                    if outcome == PromptOutcome::Next && prompt.allow_previous(ctx) {
                        history.push(pos);
                    }
                    outcome
                }
            };

            match outcome {
                PromptOutcome::Next => pos += 1,
                PromptOutcome::Previous => match history.pop() {
                    Some(previous) => pos = previous,
                    None => return Ok(PromptOutcome::Previous),
                },
                PromptOutcome::AcceptAllDefaults => {
                    self.commit_pending(ctx, &queue[pos..]);
                    return Ok(PromptOutcome::AcceptAllDefaults);
                }
                other => return Ok(other),
            }
        }

        let members = self.members(ctx.store());
        let names: Vec<&str> = members.aliases().map(MemberAlias::as_str).collect();
        ctx.say(&format!(
            "{} information defined for {}",
            capitalize(&self.singular),
            names.join(", ")
        ));
        Ok(PromptOutcome::Next)
    }
}

impl Prompt for GroupPrompt {
    fn name(&self) -> &str {
        &self.name
    }

    fn weight(&self) -> i32 {
        self.weight
    }

    fn save_current_value(&self, ctx: &mut RunContext) {
        for prompt in self.bound_prompts(ctx) {
            prompt.save_current_value(ctx);
        }
    }

    fn save_disabled_value(&self, ctx: &mut RunContext) {
        for prompt in self.bound_prompts(ctx) {
            prompt.save_disabled_value(ctx);
        }
    }

    fn fill_disabled(&self, ctx: &mut RunContext) {
        for prompt in self.bound_prompts(ctx) {
            prompt.fill_disabled(ctx);
        }
    }

    fn is_valid(&self, ctx: &RunContext) -> Vec<PromptError> {
        let members = self.members(ctx.store());
        let mut errors: Vec<PromptError> = members
            .rejected()
            .iter()
            .filter_map(|key| {
                let message = MemberAlias::parse(key).err()?.message;
                Some(PromptError::new(
                    join_path(&self.name, key),
                    self.text.replace("@value", key),
                    message,
                    None,
                ))
            })
            .collect();
        for prompt in self.bound_prompts(ctx) {
            errors.extend(prompt.is_valid(ctx));
        }
        errors
    }

    fn keys(&self, ctx: &RunContext) -> Vec<String> {
        let mut keys: Vec<String> = self
            .bound_prompts(ctx)
            .iter()
            .map(|p| p.key().to_string())
            .collect();
        if let Some(Node::Map(_)) = ctx.store().node(&join_path(&self.name, DEFAULTS_ALIAS)) {
            for template in &self.templates {
                let member = MemberRef::new(&self.name, DEFAULTS_ALIAS, &self.singular);
                keys.push(member.key(template.leaf()));
            }
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_context as ctx;

    fn hosts_group() -> GroupPrompt {
        GroupPrompt::new("hosts", "Host @value", "Host", "Hosts")
            .with_template(ValuePrompt::new("host", "Hostname").with_computed_default(|env| {
                env.member_alias().map(str::to_string)
            }))
            .with_template(ValuePrompt::new("userid", "System user").with_default("tungsten"))
    }

    #[test]
    fn defaults_alias_is_reserved() {
        assert_eq!(
            MemberAlias::parse("defaults").unwrap_err().message,
            "You may not use 'defaults' as an alias"
        );
        assert!(MemberAlias::parse("db-1").is_err());
        assert_eq!(MemberAlias::parse("db_1").unwrap().as_str(), "db_1");
    }

    #[test]
    fn member_map_separates_defaults() {
        let mut store = PropertyStore::new();
        store.set("hosts.db1.userid", Some("admin"));
        store.set("hosts.defaults.userid", Some("tungsten"));
        store.set("hosts.db2.host", Some("db2.example.com"));

        let members = MemberMap::load(&store, "hosts");

        assert_eq!(members.len(), 2);
        assert!(!members.contains("defaults"));
        assert_eq!(members.value("db1", "userid"), Some("admin"));
        assert_eq!(members.value("db2", "userid"), Some("tungsten"));
    }

    #[test]
    fn new_members_are_added_until_empty_alias() {
        let group = hosts_group();
        let mut ctx = ctx(&["defaults", "db1", "", "", "db1", ""]);
        assert_eq!(group.run(&mut ctx).unwrap(), PromptOutcome::AcceptAllDefaults);

        let outcome = group.run(&mut ctx).unwrap();
        assert_eq!(outcome, PromptOutcome::Next);
        assert_eq!(ctx.store().get("hosts.db1.host"), Some("db1"));
        assert_eq!(ctx.store().get("hosts.db1.userid"), Some("tungsten"));
        assert!(ctx
            .console()
            .captured()
            .contains("ERROR >> 'db1' is already being used as an alias"));
    }

    #[test]
    fn accepting_defaults_keeps_a_new_member() {
        let group = hosts_group();
        let mut ctx = ctx(&["db3", "defaults"]);

        assert_eq!(group.run(&mut ctx).unwrap(), PromptOutcome::AcceptAllDefaults);

        assert_eq!(ctx.store().get("hosts.db3.host"), Some("db3"));
        assert_eq!(ctx.store().get("hosts.db3.userid"), Some("tungsten"));
    }

    #[test]
    fn deleting_a_member_skips_its_prompts() {
        let group = hosts_group();
        let mut ctx = ctx(&["yes", "no", "", "", ""]);
        ctx.store_mut().set("hosts.db1.host", Some("db1"));
        ctx.store_mut().set("hosts.db2.host", Some("db2"));

        assert_eq!(group.run(&mut ctx).unwrap(), PromptOutcome::Next);

        assert!(!ctx.store().contains("hosts.db1"));
        assert_eq!(ctx.store().get("hosts.db2.host"), Some("db2"));
        assert!(ctx.console().captured().contains("Host information defined for db2"));
    }

    #[test]
    fn keys_cover_every_member_and_template() {
        let group = hosts_group();
        let mut ctx = ctx(&[]);
        ctx.store_mut().set("hosts.db1.host", Some("db1"));
        ctx.store_mut().set("hosts.defaults.userid", Some("tungsten"));

        let keys = group.keys(&ctx);

        assert!(keys.contains(&"hosts.db1.host".to_string()));
        assert!(keys.contains(&"hosts.db1.userid".to_string()));
        assert!(keys.contains(&"hosts.defaults.userid".to_string()));

        let errors = group.is_valid(&ctx);
        assert!(errors.is_empty(), "{errors:?}");
    }
}
