use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Warning;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct ActorId(pub usize);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ActorKind {
    #[default]
    Participant,
    Actor,
}

impl ActorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Participant => "participant",
            Self::Actor => "actor",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    /// Display name; differs from `id` when declared with an `as` alias.
    pub name: String,
    pub kind: ActorKind,
    /// Whether the actor was declared explicitly, as opposed to being
    /// created by its first message reference.
    pub explicit: bool,
}

/// Message operator: line style × head, the sequence analogue of the flow
/// dialect's edge-type token.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum MessageKind {
    #[default]
    Solid,
    SolidArrow,
    SolidCross,
    Dotted,
    DottedArrow,
    DottedCross,
}

impl MessageKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Solid => "->",
            Self::SolidArrow => "->>",
            Self::SolidCross => "-x",
            Self::Dotted => "-->",
            Self::DottedArrow => "-->>",
            Self::DottedCross => "--x",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub from: ActorId,
    pub to: ActorId,
    pub kind: MessageKind,
    pub text: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NotePlacement {
    LeftOf,
    RightOf,
    Over,
}

impl NotePlacement {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LeftOf => "left of",
            Self::RightOf => "right of",
            Self::Over => "over",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Note {
    pub placement: NotePlacement,
    pub anchor: ActorId,
    /// Second anchor for `Note over A,B`.
    pub second_anchor: Option<ActorId>,
    pub text: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BlockKind {
    Alt,
    Opt,
    Loop,
    Par,
}

impl BlockKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Alt => "alt",
            Self::Opt => "opt",
            Self::Loop => "loop",
            Self::Par => "par",
        }
    }

    /// Keyword that opens an alternate branch inside this block, if any.
    #[must_use]
    pub const fn alternate_keyword(self) -> Option<&'static str> {
        match self {
            Self::Alt => Some("else"),
            Self::Par => Some("and"),
            Self::Opt | Self::Loop => None,
        }
    }
}

/// One document-ordered entry of a sequence diagram.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum SequenceItem {
    Message(Message),
    Note(Note),
    BlockStart {
        kind: BlockKind,
        title: Option<String>,
    },
    BlockAlternate {
        title: Option<String>,
    },
    BlockEnd,
    Activate(ActorId),
    Deactivate(ActorId),
}

/// Graph database for the sequence dialect.
#[derive(Debug, Clone, Default)]
pub struct SequenceDb {
    actors: Vec<Actor>,
    actor_lookup: FxHashMap<String, ActorId>,
    items: Vec<SequenceItem>,
    title: Option<String>,
    autonumber: bool,
    warnings: Vec<Warning>,
}

impl SequenceDb {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Explicit `participant`/`actor` declaration. A declaration after an
    /// implicit reference upgrades the existing actor in place.
    pub fn declare_actor(&mut self, id: &str, name: Option<&str>, kind: ActorKind) -> ActorId {
        if let Some(&existing) = self.actor_lookup.get(id) {
            let actor = &mut self.actors[existing.0];
            actor.kind = kind;
            actor.explicit = true;
            if let Some(name) = name {
                actor.name = name.to_string();
            }
            return existing;
        }
        self.insert_actor(id, name, kind, true)
    }

    /// Actor referenced by a message or note; created on first use.
    pub fn ensure_actor(&mut self, id: &str) -> ActorId {
        if let Some(&existing) = self.actor_lookup.get(id) {
            return existing;
        }
        self.insert_actor(id, None, ActorKind::Participant, false)
    }

    fn insert_actor(
        &mut self,
        id: &str,
        name: Option<&str>,
        kind: ActorKind,
        explicit: bool,
    ) -> ActorId {
        let actor_id = ActorId(self.actors.len());
        debug!(actor = id, "new actor");
        self.actors.push(Actor {
            id: id.to_string(),
            name: name.unwrap_or(id).to_string(),
            kind,
            explicit,
        });
        self.actor_lookup.insert(id.to_string(), actor_id);
        actor_id
    }

    pub fn add_message(&mut self, from: &str, to: &str, kind: MessageKind, text: &str) {
        let from = self.ensure_actor(from);
        let to = self.ensure_actor(to);
        self.items.push(SequenceItem::Message(Message {
            from,
            to,
            kind,
            text: text.to_string(),
        }));
    }

    pub fn add_note(
        &mut self,
        placement: NotePlacement,
        anchor: &str,
        second_anchor: Option<&str>,
        text: &str,
    ) {
        let anchor = self.ensure_actor(anchor);
        let second_anchor = second_anchor.map(|id| self.ensure_actor(id));
        self.items.push(SequenceItem::Note(Note {
            placement,
            anchor,
            second_anchor,
            text: text.to_string(),
        }));
    }

    pub fn begin_block(&mut self, kind: BlockKind, title: Option<&str>) {
        self.items.push(SequenceItem::BlockStart {
            kind,
            title: title.map(str::to_string),
        });
    }

    pub fn alternate_block(&mut self, title: Option<&str>) {
        self.items.push(SequenceItem::BlockAlternate {
            title: title.map(str::to_string),
        });
    }

    pub fn end_block(&mut self) {
        self.items.push(SequenceItem::BlockEnd);
    }

    pub fn activate(&mut self, id: &str) {
        let actor = self.ensure_actor(id);
        self.items.push(SequenceItem::Activate(actor));
    }

    pub fn deactivate(&mut self, id: &str) {
        let actor = self.ensure_actor(id);
        self.items.push(SequenceItem::Deactivate(actor));
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = Some(title.to_string());
    }

    pub fn enable_autonumber(&mut self) {
        self.autonumber = true;
    }

    #[must_use]
    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    #[must_use]
    pub fn actor(&self, id: ActorId) -> &Actor {
        &self.actors[id.0]
    }

    #[must_use]
    pub fn actor_by_id(&self, id: &str) -> Option<&Actor> {
        self.actor_lookup.get(id).map(|&slot| &self.actors[slot.0])
    }

    #[must_use]
    pub fn items(&self) -> &[SequenceItem] {
        &self.items
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.items.iter().filter_map(|item| match item {
            SequenceItem::Message(message) => Some(message),
            _ => None,
        })
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    #[must_use]
    pub fn autonumber(&self) -> bool {
        self.autonumber
    }

    #[must_use]
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn clear(&mut self) {
        self.actors.clear();
        self.actor_lookup.clear();
        self.items.clear();
        self.title = None;
        self.autonumber = false;
        self.warnings.clear();
    }
}
