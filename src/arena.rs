//! Relation instances live in a session-scoped arena addressed by stable
//! indices rather than owned references (spec §9: "Cyclic object graphs").
//! `joined_to` back-references and `id_cast` hold [`RelationId`]s, not
//! handles, so the (conceptually cyclic) join graph needs no `Rc`/`RefCell`
//! reference cycles to express.

use crate::relation::RelationInstance;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationId(pub(crate) usize);

#[derive(Default)]
pub struct Arena {
    instances: Vec<RelationInstance>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, instance: RelationInstance) -> RelationId {
        let id = RelationId(self.instances.len());
        self.instances.push(instance);
        id
    }

    pub fn get(&self, id: RelationId) -> &RelationInstance {
        &self.instances[id.0]
    }

    pub fn get_mut(&mut self, id: RelationId) -> &mut RelationInstance {
        &mut self.instances[id.0]
    }
}
