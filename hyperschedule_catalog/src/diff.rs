//! Computing and replaying differences between catalog snapshots.
//!
//! Each refresh produces an [`Update`] describing how the new snapshot differs from the previous
//! one. A client that last synchronized at some timestamp is answered by folding every update
//! recorded after that timestamp into a single [`Update`] with [`replay`], and then resolving the
//! keys against the current snapshot with [`Update::materialize`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::course::{Course, CourseAttr, CourseKey, PartialCourse};
use crate::index::CourseIndex;

/// An invariant of the update history was violated.
///
/// This never happens when updates are recorded by the store in non-decreasing timestamp order;
/// seeing one means the history can no longer be used to produce correct diffs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConsistencyFault {
    #[error("course {key} was modified after it had been removed")]
    ModifiedAfterRemoval { key: CourseKey },

    #[error("course {key} was added while already present")]
    AddedWhilePresent { key: CourseKey },

    #[error("course {key} was removed while already absent")]
    RemovedWhileAbsent { key: CourseKey },

    #[error("course {key} is expected in the current snapshot but is missing")]
    MissingFromIndex { key: CourseKey },
}

/// Keys added, removed and modified between two points in time
///
/// Within one update computed by [`compute_update`] the three collections are disjoint. After
/// [`Update::merge`] a key may be both added and modified; it is never both added and removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    pub added: BTreeSet<CourseKey>,
    pub removed: BTreeSet<CourseKey>,
    pub modified: BTreeMap<CourseKey, BTreeSet<CourseAttr>>,
}

/// Compute the update that turns the `old` snapshot into the `new` one.
pub fn compute_update(old: &CourseIndex, new: &CourseIndex) -> Update {
    let mut update = Update::default();
    for new_course in new.courses() {
        let key = new_course.key();
        match old.get(&key) {
            None => {
                update.added.insert(key);
            }
            Some(old_course) => {
                let attrs = old_course.changed_attrs(new_course);
                if !attrs.is_empty() {
                    update.modified.insert(key, attrs.into_iter().collect());
                }
            }
        }
    }
    update.removed = old
        .keys()
        .filter(|key| !new.contains_key(key))
        .cloned()
        .collect();
    update
}

impl Update {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    /// Fold the next update in time order into this one.
    ///
    /// A course that was removed and then added again is reported as modified in all of its
    /// attributes, since nothing is known about how it changed while it was gone. A course that
    /// was added and then removed again disappears from the result.
    pub fn merge(&mut self, next: &Self) -> Result<(), ConsistencyFault> {
        for (key, attrs) in &next.modified {
            if self.removed.contains(key) {
                return Err(ConsistencyFault::ModifiedAfterRemoval { key: key.clone() });
            }
            self.modified
                .entry(key.clone())
                .or_default()
                .extend(attrs.iter().copied());
        }

        for key in &next.added {
            if self.modified.contains_key(key) || self.added.contains(key) {
                return Err(ConsistencyFault::AddedWhilePresent { key: key.clone() });
            }
            if self.removed.remove(key) {
                self.modified
                    .insert(key.clone(), CourseAttr::ALL.into_iter().collect());
            } else {
                self.added.insert(key.clone());
            }
        }

        for key in &next.removed {
            if self.removed.contains(key) {
                return Err(ConsistencyFault::RemovedWhileAbsent { key: key.clone() });
            }
            self.modified.remove(key);
            if !self.added.remove(key) {
                self.removed.insert(key.clone());
            }
        }

        Ok(())
    }

    /// Resolve the keys of this update against the `current` snapshot.
    ///
    /// Added courses are returned in full, removed courses as identity-only placeholders and
    /// modified courses with their identity plus the attributes that changed.
    pub fn materialize(&self, current: &CourseIndex) -> Result<CourseDiff, ConsistencyFault> {
        let lookup = |key: &CourseKey| {
            current
                .get(key)
                .ok_or_else(|| ConsistencyFault::MissingFromIndex { key: key.clone() })
        };

        let added = self
            .added
            .iter()
            .map(|key| lookup(key).cloned())
            .collect::<Result<Vec<_>, _>>()?;
        let removed = self.removed.iter().map(PartialCourse::from_key).collect();
        let modified = self
            .modified
            .iter()
            .map(|(key, attrs)| lookup(key).map(|course| PartialCourse::project(course, attrs)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CourseDiff {
            added,
            removed,
            modified,
        })
    }
}

/// Fold every update recorded strictly after `since` into one, oldest first.
pub fn replay<'a>(
    history: impl IntoIterator<Item = &'a (i64, Update)>,
    since: i64,
) -> Result<Update, ConsistencyFault> {
    let mut acc = Update::default();
    for (timestamp, update) in history {
        if *timestamp > since {
            acc.merge(update)?;
        }
    }
    Ok(acc)
}

/// The materialized form of an [`Update`], ready to be sent to a client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseDiff {
    pub added: Vec<Course>,
    pub removed: Vec<PartialCourse>,
    pub modified: Vec<PartialCourse>,
}

impl CourseDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}
