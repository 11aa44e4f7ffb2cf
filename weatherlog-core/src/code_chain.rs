//! Weather code arena and resolution of `associated_code` chains.
//!
//! Codes reference each other by [`CodeId`], which is also the code's position
//! in the arena. A link only ever points forward to the code that should be
//! displayed instead, so resolving a code means walking links until a code
//! without one is reached.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{CodeChainError, StoreError};
use crate::model::{Code, CodeId};

/// Upper bound on links followed by [`CodeBook::resolve`].
pub const MAX_CHAIN_HOPS: usize = 32;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodeBook {
    codes: Vec<Code>,
}

impl CodeBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: CodeId) -> Option<&Code> {
        self.codes.get(id.0 as usize).filter(|code| code.id == id)
    }

    pub fn find_by_value(&self, value: i32) -> Option<&Code> {
        self.codes.iter().find(|code| code.value == value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Code> {
        self.codes.iter()
    }

    /// Adds a code without any associated link.
    pub fn insert(
        &mut self,
        value: i32,
        description: impl Into<String>,
        icon_url: impl Into<String>,
        is_default: bool,
    ) -> CodeId {
        let id = CodeId(self.codes.len() as u32);
        self.codes.push(Code {
            id,
            value,
            description: description.into(),
            icon_url: icon_url.into(),
            is_default,
            associated_code: None,
        });
        id
    }

    /// Points `from` at `to`, or clears the link when `to` is `None`.
    pub fn link(&mut self, from: CodeId, to: Option<CodeId>) -> Result<(), StoreError> {
        if self.get(from).is_none() {
            return Err(StoreError::UnknownCode(from));
        }

        if let Some(to) = to {
            if self.get(to).is_none() {
                return Err(StoreError::UnknownCode(to));
            }
            if self.reaches(to, from) {
                return Err(StoreError::CodeCycle { from, to });
            }
        }

        self.codes[from.0 as usize].associated_code = to;
        Ok(())
    }

    /// Follows the chain from `start` to the code that should be displayed.
    ///
    /// `None` in means `None` out: a record without a code resolves to no code.
    pub fn resolve(&self, start: Option<CodeId>) -> Result<Option<&Code>, CodeChainError> {
        let Some(start) = start else {
            return Ok(None);
        };

        let mut current = self.get(start).ok_or(CodeChainError::UnknownCode(start))?;
        let mut seen = HashSet::from([start]);
        let mut hops = 0;

        while let Some(next) = current.associated_code {
            hops += 1;
            if hops > MAX_CHAIN_HOPS || !seen.insert(next) {
                return Err(CodeChainError::CycleDetected { start, hops });
            }
            current = self.get(next).ok_or(CodeChainError::UnknownCode(next))?;
        }

        Ok(Some(current))
    }

    // True when walking links from `from` arrives at `target`.
    fn reaches(&self, from: CodeId, target: CodeId) -> bool {
        let mut seen = HashSet::new();
        let mut current = Some(from);

        while let Some(id) = current {
            if id == target {
                return true;
            }
            if !seen.insert(id) {
                return false;
            }
            current = self.get(id).and_then(|code| code.associated_code);
        }

        false
    }

    #[cfg(test)]
    fn force_link(&mut self, from: CodeId, to: CodeId) {
        self.codes[from.0 as usize].associated_code = Some(to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(len: usize) -> (CodeBook, Vec<CodeId>) {
        let mut book = CodeBook::new();
        let ids: Vec<CodeId> = (0..len)
            .map(|i| {
                let icon = format!("media/weather/{i}.png");
                book.insert(i as i32, format!("code {i}"), icon, true)
            })
            .collect();
        for pair in ids.windows(2) {
            book.link(pair[0], Some(pair[1])).expect("linking forward must succeed");
        }
        (book, ids)
    }

    #[test]
    fn chain_resolves_to_terminal_code_from_any_member() {
        let (book, ids) = chain(3);

        let from_a = book.resolve(Some(ids[0])).unwrap().unwrap();
        let from_b = book.resolve(Some(ids[1])).unwrap().unwrap();

        assert_eq!(from_a.id, ids[2]);
        assert_eq!(from_b.id, ids[2]);
    }

    #[test]
    fn code_without_link_resolves_to_itself() {
        let mut book = CodeBook::new();
        let sunny = book.insert(113, "Sunny", "media/weather/sunny.png", true);

        let resolved = book.resolve(Some(sunny)).unwrap().unwrap();
        assert_eq!(resolved.id, sunny);
        assert_eq!(resolved.description, "Sunny");
    }

    #[test]
    fn absent_code_resolves_to_none() {
        let book = CodeBook::new();
        assert_eq!(book.resolve(None).unwrap(), None);
    }

    #[test]
    fn chain_at_hop_ceiling_resolves() {
        let (book, ids) = chain(MAX_CHAIN_HOPS + 1);

        let resolved = book.resolve(Some(ids[0])).unwrap().unwrap();
        assert_eq!(resolved.id, *ids.last().unwrap());
    }

    #[test]
    fn chain_longer_than_ceiling_is_rejected() {
        let (book, ids) = chain(MAX_CHAIN_HOPS + 2);

        let err = book.resolve(Some(ids[0])).unwrap_err();
        assert!(matches!(err, CodeChainError::CycleDetected { start, .. } if start == ids[0]));
    }

    #[test]
    fn revisited_code_is_reported_as_cycle() {
        let (mut book, ids) = chain(3);
        book.force_link(ids[2], ids[0]);

        let err = book.resolve(Some(ids[1])).unwrap_err();
        assert!(matches!(err, CodeChainError::CycleDetected { hops: 3, .. }));
    }

    #[test]
    fn dangling_link_is_reported() {
        let mut book = CodeBook::new();
        let a = book.insert(1, "a", "a.png", false);
        book.force_link(a, CodeId(99));

        assert_eq!(book.resolve(Some(a)).unwrap_err(), CodeChainError::UnknownCode(CodeId(99)));
    }

    #[test]
    fn link_refuses_to_close_a_cycle() {
        let (mut book, ids) = chain(3);

        let err = book.link(ids[2], Some(ids[0])).unwrap_err();
        assert!(matches!(err, StoreError::CodeCycle { .. }));

        let err = book.link(ids[0], Some(ids[0])).unwrap_err();
        assert!(matches!(err, StoreError::CodeCycle { .. }));
    }

    #[test]
    fn link_can_be_cleared() {
        let (mut book, ids) = chain(2);
        book.link(ids[0], None).unwrap();

        assert_eq!(book.resolve(Some(ids[0])).unwrap().unwrap().id, ids[0]);
    }

    #[test]
    fn find_by_value_returns_first_match() {
        let (book, ids) = chain(4);
        assert_eq!(book.find_by_value(2).map(|c| c.id), Some(ids[2]));
        assert!(book.find_by_value(42).is_none());
    }
}
