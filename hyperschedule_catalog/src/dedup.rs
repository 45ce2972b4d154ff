//! Assign code suffixes to courses that share an identity key.
//!
//! The upstream course listing occasionally contains several distinct courses with identical
//! course codes. They are told apart by giving each member of such a group a suffix letter,
//! `A`, `B`, `C`, ... in listing order.

use std::collections::BTreeMap;

use crate::course::{Course, CourseKey};
use crate::{CatalogError, Result};

/// Suffix letters available for disambiguation
const SUFFIX_LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Make the identity keys of `courses` unique by assigning code suffixes in place.
///
/// Every group of courses sharing a key gets suffixes `A`, `B`, ... in input order. If any
/// member of such a group already carries a suffix, or the group is larger than the number of
/// available letters, an error is returned and no course is modified.
pub fn deduplicate_course_keys(courses: &mut [Course]) -> Result<()> {
    let mut groups: BTreeMap<CourseKey, Vec<usize>> = BTreeMap::new();
    for (i, course) in courses.iter().enumerate() {
        groups.entry(course.key()).or_default().push(i);
    }

    let duplicates: Vec<&Vec<usize>> = groups.values().filter(|group| group.len() > 1).collect();

    // validate every group before touching anything
    for group in &duplicates {
        if let Some(&i) = group
            .iter()
            .find(|&&i| !courses[i].course_code_suffix.is_empty())
        {
            return Err(CatalogError::DuplicateWithSuffix {
                course_code: courses[i].course_code(),
            });
        }
        if group.len() > SUFFIX_LETTERS.len() {
            return Err(CatalogError::SuffixesExhausted {
                course_code: courses[group[0]].course_code(),
                count: group.len(),
            });
        }
    }

    for group in duplicates {
        for (&i, &letter) in group.iter().zip(SUFFIX_LETTERS) {
            courses[i].course_code_suffix = char::from(letter).to_string();
        }
    }

    Ok(())
}
