//! Sets of numeric resource ids in the API's compact range notation

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::errors::{AccountLinkError, Result};

/// Ordered, de-duplicated resource ids
///
/// Formats as comma separated ids with consecutive runs collapsed into
/// ranges, e.g. `1,5-8,22`, which is what GET paths accept in place of a
/// single id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct IdSet {
    ids: BTreeSet<u64>,
}

impl IdSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every id from `from` to `to` inclusive; empty when `to < from`
    pub fn range(from: u64, to: u64) -> Self {
        Self::new().add_range(from, to)
    }

    pub fn add(mut self, id: u64) -> Self {
        self.ids.insert(id);
        self
    }

    pub fn add_range(mut self, from: u64, to: u64) -> Self {
        if to >= from {
            self.ids.extend(from..=to);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.ids.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.ids.iter().copied()
    }

    /// Chunks of at most `batch_size` ids, in ascending order
    pub fn split(&self, batch_size: usize) -> Result<Vec<IdSet>> {
        if batch_size == 0 {
            return Err(AccountLinkError::InvalidInput("Batch size must be a positive integer".into()));
        }
        let ids: Vec<u64> = self.iter().collect();
        Ok(ids.chunks(batch_size).map(|chunk| chunk.iter().copied().collect()).collect())
    }

    /// Inclusive runs of consecutive ids
    fn runs(&self) -> Vec<(u64, u64)> {
        let mut runs: Vec<(u64, u64)> = Vec::new();
        for id in self.iter() {
            match runs.last_mut() {
                Some((_, to)) if to.checked_add(1) == Some(id) => *to = id,
                _ => runs.push((id, id)),
            }
        }
        runs
    }
}

impl FromIterator<u64> for IdSet {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        Self { ids: iter.into_iter().collect() }
    }
}

impl Extend<u64> for IdSet {
    fn extend<I: IntoIterator<Item = u64>>(&mut self, iter: I) {
        self.ids.extend(iter);
    }
}

impl fmt::Display for IdSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (from, to)) in self.runs().into_iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            if from == to {
                write!(f, "{from}")?;
            } else {
                write!(f, "{from}-{to}")?;
            }
        }
        Ok(())
    }
}

impl FromStr for IdSet {
    type Err = AccountLinkError;

    /// Parses ids and `from-to` ranges separated by `,` or `.`
    fn from_str(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Err(AccountLinkError::InvalidInput("Cannot parse id set: string is empty".into()));
        }
        let invalid = |part: &str, what: &str| {
            AccountLinkError::InvalidInput(format!("Cannot parse id set: {part} is not a valid {what}"))
        };

        let mut set = IdSet::new();
        for part in s.split([',', '.']).map(str::trim) {
            set = match part.split_once('-') {
                Some((from, to)) => {
                    let from = from.trim().parse().map_err(|_| invalid(part, "range"))?;
                    let to = to.trim().parse().map_err(|_| invalid(part, "range"))?;
                    set.add_range(from, to)
                }
                None => set.add(part.parse().map_err(|_| invalid(part, "id"))?),
            };
        }
        Ok(set)
    }
}
