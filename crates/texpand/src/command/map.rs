//! The macro table: a scoped mapping from control sequences and active characters to commands.
//!
//! Mutations performed inside a group are rolled back when the group ends,
//!     unless they were made in the global scope.
//! Each group records, for every key it changed, how to undo the change:
//!     either restore the previous value or delete the key.

use super::Command;
use crate::token::CommandRef;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Where a change to the table lives.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Scope {
    /// Undone when the innermost open group ends.
    #[default]
    Local,
    /// Survives every open group, and cancels pending local undos of the same key.
    Global,
}

#[derive(Debug)]
enum EndOfGroupAction {
    Revert(Command),
    Delete,
}

/// [Map::end_group] was called with no group open.
#[derive(Debug, PartialEq, Eq)]
pub struct NoGroupToEndError;

/// The macro table.
#[derive(Debug, Default)]
pub struct Map {
    commands: HashMap<CommandRef, Command>,
    // One undo log per open group, innermost last.
    groups: Vec<HashMap<CommandRef, EndOfGroupAction>>,
}

impl Map {
    #[inline]
    pub fn get(&self, key: &CommandRef) -> Option<&Command> {
        self.commands.get(key)
    }

    /// Inserts the command in the provided scope.
    ///
    /// Returns whether a command was already bound to this key.
    pub fn insert(&mut self, key: CommandRef, mut command: Command, scope: Scope) -> bool {
        let group = match scope {
            Scope::Local => self.groups.last_mut(),
            Scope::Global => {
                for group in &mut self.groups {
                    group.remove(&key);
                }
                None
            }
        };
        match (self.commands.get_mut(&key), group) {
            (None, None) => {
                self.commands.insert(key, command);
                false
            }
            (None, Some(group)) => {
                // Keep an undo recorded earlier in this group, such as a local removal.
                group.entry(key).or_insert(EndOfGroupAction::Delete);
                self.commands.insert(key, command);
                false
            }
            (Some(current), None) => {
                *current = command;
                true
            }
            (Some(current), Some(group)) => {
                std::mem::swap(&mut command, current);
                if let Entry::Vacant(vacant) = group.entry(key) {
                    vacant.insert(EndOfGroupAction::Revert(command));
                };
                true
            }
        }
    }

    /// Removes the binding for the key in the provided scope.
    ///
    /// A local removal is reverted at the end of the current group.
    pub fn remove(&mut self, key: CommandRef, scope: Scope) {
        match scope {
            Scope::Local => {
                let old = match self.commands.remove(&key) {
                    None => return,
                    Some(old) => old,
                };
                if let Some(group) = self.groups.last_mut() {
                    if let Entry::Vacant(vacant) = group.entry(key) {
                        vacant.insert(EndOfGroupAction::Revert(old));
                    }
                }
            }
            Scope::Global => {
                for group in &mut self.groups {
                    group.remove(&key);
                }
                self.commands.remove(&key);
            }
        }
    }

    pub fn begin_group(&mut self) {
        self.groups.push(HashMap::new());
    }

    /// Ends the innermost group, undoing its local changes.
    pub fn end_group(&mut self) -> Result<(), NoGroupToEndError> {
        let group = self.groups.pop().ok_or(NoGroupToEndError)?;
        for (key, action) in group.into_iter() {
            match action {
                EndOfGroupAction::Delete => {
                    self.commands.remove(&key);
                }
                EndOfGroupAction::Revert(old) => {
                    self.commands.insert(key, old);
                }
            }
        }
        Ok(())
    }

    /// Number of groups currently open.
    pub fn group_depth(&self) -> usize {
        self.groups.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Value;

    fn key(c: char) -> CommandRef {
        CommandRef::ActiveCharacter(c)
    }

    fn alias(c: char) -> Command {
        Command::CharacterTokenAlias(Value::Letter(c))
    }

    fn value_of(map: &Map, k: char) -> Option<Value> {
        match map.get(&key(k)) {
            Some(Command::CharacterTokenAlias(v)) => Some(*v),
            _ => None,
        }
    }

    #[test]
    fn insert_after_begin_group() {
        let mut map: Map = Default::default();
        map.insert(key('a'), alias('x'), Scope::Local);
        map.begin_group();
        map.insert(key('a'), alias('y'), Scope::Local);
        assert_eq!(value_of(&map, 'a'), Some(Value::Letter('y')));
        assert_eq!(map.end_group(), Ok(()));
        assert_eq!(value_of(&map, 'a'), Some(Value::Letter('x')));
    }

    #[test]
    fn insert_in_group_is_deleted() {
        let mut map: Map = Default::default();
        map.begin_group();
        map.insert(key('a'), alias('x'), Scope::Local);
        assert_eq!(map.end_group(), Ok(()));
        assert_eq!(value_of(&map, 'a'), None);
    }

    #[test]
    fn global_insert_survives_groups() {
        let mut map: Map = Default::default();
        map.insert(key('a'), alias('x'), Scope::Local);
        map.begin_group();
        map.begin_group();
        map.insert(key('a'), alias('y'), Scope::Local);
        map.insert(key('a'), alias('z'), Scope::Global);
        assert_eq!(map.end_group(), Ok(()));
        assert_eq!(map.end_group(), Ok(()));
        assert_eq!(value_of(&map, 'a'), Some(Value::Letter('z')));
    }

    #[test]
    fn local_remove_is_reverted() {
        let mut map: Map = Default::default();
        map.insert(key('a'), alias('x'), Scope::Local);
        map.begin_group();
        map.remove(key('a'), Scope::Local);
        assert_eq!(value_of(&map, 'a'), None);
        assert_eq!(map.end_group(), Ok(()));
        assert_eq!(value_of(&map, 'a'), Some(Value::Letter('x')));
    }

    #[test]
    fn insert_after_local_remove_is_reverted() {
        let mut map: Map = Default::default();
        map.insert(key('a'), alias('x'), Scope::Local);
        map.begin_group();
        map.remove(key('a'), Scope::Local);
        map.insert(key('a'), alias('y'), Scope::Local);
        assert_eq!(value_of(&map, 'a'), Some(Value::Letter('y')));
        assert_eq!(map.end_group(), Ok(()));
        assert_eq!(value_of(&map, 'a'), Some(Value::Letter('x')));
    }

    #[test]
    fn global_remove() {
        let mut map: Map = Default::default();
        map.insert(key('a'), alias('x'), Scope::Local);
        map.begin_group();
        map.insert(key('a'), alias('y'), Scope::Local);
        map.remove(key('a'), Scope::Global);
        assert_eq!(map.end_group(), Ok(()));
        assert_eq!(value_of(&map, 'a'), None);
    }

    #[test]
    fn end_group_without_group() {
        let mut map: Map = Default::default();
        assert_eq!(map.end_group(), Err(NoGroupToEndError));
    }
}
