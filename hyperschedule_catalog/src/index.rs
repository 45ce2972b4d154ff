//! Key → course lookup over one catalog snapshot.

use std::collections::HashMap;

use crate::course::{Course, CourseKey};
use crate::dedup::deduplicate_course_keys;
use crate::{CatalogError, Result};

/// An ordered list of courses together with a lookup from identity key to course
///
/// Construction guarantees that no two courses share a [`CourseKey`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourseIndex {
    courses: Vec<Course>,
    positions: HashMap<CourseKey, usize>,
}

impl CourseIndex {
    /// Deduplicate `courses` and index them
    pub fn build(mut courses: Vec<Course>) -> Result<Self> {
        deduplicate_course_keys(&mut courses)?;
        Self::from_deduplicated(courses)
    }

    /// Index courses that have already been passed through [`deduplicate_course_keys`]
    ///
    /// A key seen twice here means deduplication produced a collision, which is reported rather
    /// than resolved.
    pub fn from_deduplicated(courses: Vec<Course>) -> Result<Self> {
        let mut positions = HashMap::with_capacity(courses.len());
        for (i, course) in courses.iter().enumerate() {
            let key = course.key();
            if !key.is_encodable() {
                return Err(CatalogError::InvalidIdentity {
                    course_code: course.course_code(),
                });
            }
            if positions.insert(key, i).is_some() {
                return Err(CatalogError::DuplicateAfterDedup {
                    course_code: course.course_code(),
                });
            }
        }
        Ok(Self { courses, positions })
    }

    pub fn get(&self, key: &CourseKey) -> Option<&Course> {
        self.positions.get(key).map(|&i| &self.courses[i])
    }

    pub fn contains_key(&self, key: &CourseKey) -> bool {
        self.positions.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &CourseKey> {
        self.positions.keys()
    }

    /// The indexed courses in their original order
    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }
}
