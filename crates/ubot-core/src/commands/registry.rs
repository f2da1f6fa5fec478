use std::{collections::HashMap, sync::Arc};

use arc_swap::ArcSwap;
use tracing::{debug, warn};

use crate::{
    commands::{CommandDescriptor, ParamKind},
    errors::Error,
    tags::Tag,
    Result,
};

/// What a piece of invocation text resolved to.
#[derive(Clone, Debug)]
pub enum Invocable {
    Command(Arc<CommandDescriptor>),
    Tag(Arc<Tag>),
}

#[derive(Clone, Debug)]
pub struct Resolved {
    pub target: Invocable,
    /// The command name or alias exactly as written.
    pub invoked_as: String,
    pub remainder: String,
}

/// Immutable table of tag triggers. Replaced wholesale, never mutated.
#[derive(Debug, Default)]
pub struct DynamicSet {
    entries: HashMap<String, Arc<Tag>>,
}

impl DynamicSet {
    pub fn get(&self, trigger: &str) -> Option<&Arc<Tag>> {
        self.entries.get(&normalize(trigger))
    }

    pub fn triggers(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Static commands (fixed once the registry is shared) plus a swappable
/// snapshot of tag-backed commands.
///
/// Names and aliases are matched case-insensitively, by whole words, longest
/// match first. Static triggers always win: a tag trigger that collides with a
/// static one is dropped when the dynamic set is installed.
pub struct CommandRegistry {
    commands: Vec<Arc<CommandDescriptor>>,
    statics: HashMap<String, Arc<CommandDescriptor>>,
    max_words: usize,
    dynamic: ArcSwap<DynamicSet>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            statics: HashMap::new(),
            max_words: 1,
            dynamic: ArcSwap::from_pointee(DynamicSet::default()),
        }
    }

    /// Register a static command. Rejects trigger collisions and a
    /// `Remainder` parameter anywhere but last.
    pub fn register(&mut self, desc: CommandDescriptor) -> Result<()> {
        if let Some(pos) = desc
            .params
            .iter()
            .position(|p| p.kind == ParamKind::Remainder)
        {
            if pos + 1 != desc.params.len() {
                return Err(Error::Config(format!(
                    "command `{}`: remainder parameter must be last",
                    desc.name
                )));
            }
        }

        let keys: Vec<String> = desc.triggers().map(normalize).collect();
        for key in &keys {
            if key.is_empty() || self.statics.contains_key(key) {
                return Err(Error::DuplicateCommand(key.clone()));
            }
        }

        let desc = Arc::new(desc);
        for key in keys {
            self.max_words = self.max_words.max(key.split(' ').count());
            self.statics.insert(key, desc.clone());
        }
        self.commands.push(desc);
        Ok(())
    }

    /// Static commands in registration order.
    pub fn commands(&self) -> &[Arc<CommandDescriptor>] {
        &self.commands
    }

    pub fn is_static(&self, trigger: &str) -> bool {
        self.statics.contains_key(&normalize(trigger))
    }

    /// The currently installed dynamic set. Readers never wait on a swap.
    pub fn snapshot(&self) -> Arc<DynamicSet> {
        self.dynamic.load_full()
    }

    /// Build a new dynamic set from `tags` and install it in one swap. Static
    /// commands are untouched. Among tags, a later trigger replaces an earlier
    /// one.
    pub fn replace_dynamic_set(&self, tags: impl IntoIterator<Item = Tag>) {
        let mut set = DynamicSet::default();
        for tag in tags {
            let tag = Arc::new(tag);
            for trigger in tag.triggers() {
                let key = normalize(trigger);
                if key.is_empty() {
                    continue;
                }
                if self.statics.contains_key(&key) {
                    warn!(tag = %tag.name, trigger = %key, "tag trigger shadows a built-in command; skipped");
                    continue;
                }
                set.entries.insert(key, tag.clone());
            }
        }

        debug!(triggers = set.len(), "installing dynamic command set");
        self.dynamic.store(Arc::new(set));
    }

    /// Resolve the leading words of `text` to a command or tag.
    pub fn resolve(&self, text: &str) -> Option<Resolved> {
        let spans = word_spans(text, self.max_words);
        if spans.is_empty() {
            return None;
        }
        let dynamic = self.snapshot();

        for n in (1..=spans.len()).rev() {
            let (start, end) = (spans[0].0, spans[n - 1].1);
            let written = &text[start..end];
            let key = normalize(written);

            let target = match self.statics.get(&key) {
                Some(cmd) => Invocable::Command(cmd.clone()),
                None => match dynamic.entries.get(&key) {
                    Some(tag) => Invocable::Tag(tag.clone()),
                    None => continue,
                },
            };

            return Some(Resolved {
                target,
                invoked_as: written.to_string(),
                remainder: text[end..].trim_start().to_string(),
            });
        }
        None
    }
}

/// Lowercase and collapse internal whitespace.
fn normalize(s: &str) -> String {
    s.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Byte spans of the first `limit` whitespace-separated words.
fn word_spans(text: &str, limit: usize) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut start: Option<usize> = None;

    for (i, c) in text.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                out.push((s, i));
                start = None;
                if out.len() == limit {
                    return out;
                }
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push((s, text.len()));
    }
    out.truncate(limit);
    out
}
