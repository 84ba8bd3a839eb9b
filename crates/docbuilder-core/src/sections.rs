//! Ordered section list with the editor operations.
//!
//! Sort orders are kept dense (`0..n`) and match vector position after every
//! operation.

use serde::{Deserialize, Serialize};
use shared_types::{Section, CUSTOM_SECTION_PREFIX};

use crate::error::SectionError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionList {
    sections: Vec<Section>,
}

impl SectionList {
    pub fn new(mut sections: Vec<Section>) -> Self {
        sections.sort_by_key(|s| s.sort_order);
        let mut list = Self { sections };
        list.renumber();
        list
    }

    pub fn as_slice(&self) -> &[Section] {
        &self.sections
    }

    pub fn into_vec(self) -> Vec<Section> {
        self.sections
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.key == key)
    }

    fn position(&self, key: &str) -> Result<usize, SectionError> {
        self.sections
            .iter()
            .position(|s| s.key == key)
            .ok_or_else(|| SectionError::NotFound(key.to_string()))
    }

    fn renumber(&mut self) {
        for (i, s) in self.sections.iter_mut().enumerate() {
            s.sort_order = i as u32;
        }
    }

    /// Append an empty custom section and return its key.
    pub fn add_custom(&mut self, title: &str) -> Result<String, SectionError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(SectionError::EmptyTitle);
        }
        let next = self
            .sections
            .iter()
            .filter_map(|s| s.key.strip_prefix(CUSTOM_SECTION_PREFIX))
            .filter_map(|n| n.parse::<u32>().ok())
            .max()
            .map_or(1, |n| n + 1);
        let key = format!("{}{}", CUSTOM_SECTION_PREFIX, next);
        let mut section = Section::new(key.clone(), title, "");
        section.sort_order = self.sections.len() as u32;
        self.sections.push(section);
        Ok(key)
    }

    /// Remove a section. Locked and required sections stay.
    pub fn remove(&mut self, key: &str) -> Result<Section, SectionError> {
        let idx = self.position(key)?;
        let section = &self.sections[idx];
        if section.locked {
            return Err(SectionError::Locked(key.to_string()));
        }
        if section.required {
            return Err(SectionError::Required(key.to_string()));
        }
        let removed = self.sections.remove(idx);
        self.renumber();
        Ok(removed)
    }

    /// Returns `false` when the section is already first.
    pub fn move_up(&mut self, key: &str) -> Result<bool, SectionError> {
        let idx = self.position(key)?;
        if idx == 0 {
            return Ok(false);
        }
        self.sections.swap(idx - 1, idx);
        self.renumber();
        Ok(true)
    }

    /// Returns `false` when the section is already last.
    pub fn move_down(&mut self, key: &str) -> Result<bool, SectionError> {
        let idx = self.position(key)?;
        if idx + 1 >= self.sections.len() {
            return Ok(false);
        }
        self.sections.swap(idx, idx + 1);
        self.renumber();
        Ok(true)
    }

    pub fn rename(&mut self, key: &str, title: &str) -> Result<(), SectionError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(SectionError::EmptyTitle);
        }
        let idx = self.editable(key)?;
        self.sections[idx].title = title.to_string();
        Ok(())
    }

    pub fn update_content(&mut self, key: &str, content: &str) -> Result<(), SectionError> {
        let idx = self.editable(key)?;
        self.sections[idx].content = content.to_string();
        Ok(())
    }

    fn editable(&self, key: &str) -> Result<usize, SectionError> {
        let idx = self.position(key)?;
        if self.sections[idx].locked {
            return Err(SectionError::Locked(key.to_string()));
        }
        Ok(idx)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: any sequence of moves keeps sort orders a dense permutation and loses no section
        #[test]
        fn moves_preserve_permutation(
            n in 1usize..10,
            moves in prop::collection::vec((any::<bool>(), 0usize..10), 0..40),
        ) {
            let sections = (0..n)
                .map(|i| {
                    let mut s = Section::new(format!("s{}", i), format!("S{}", i), "");
                    s.sort_order = i as u32;
                    s
                })
                .collect();
            let mut list = SectionList::new(sections);
            for (up, i) in moves {
                let key = format!("s{}", i % n);
                if up {
                    list.move_up(&key).unwrap();
                } else {
                    list.move_down(&key).unwrap();
                }
                let orders: Vec<u32> = list.as_slice().iter().map(|s| s.sort_order).collect();
                prop_assert_eq!(orders, (0..n as u32).collect::<Vec<_>>());
                let mut keys: Vec<String> = list.as_slice().iter().map(|s| s.key.clone()).collect();
                keys.sort();
                let mut expected: Vec<String> = (0..n).map(|i| format!("s{}", i)).collect();
                expected.sort();
                prop_assert_eq!(keys, expected);
            }
        }
    }
}
