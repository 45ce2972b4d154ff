//! JSON shapes of the `/api/v2` routes, shared by the server and the client.

use hyperschedule_catalog::store::{CatalogSnapshot, CoursesSince};
use hyperschedule_catalog::{Course, CourseDiff};
use serde::{Deserialize, Serialize};

/// Body of `GET /api/v2/all-courses`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllCoursesResponse {
    pub courses: Vec<Course>,
    pub timestamp: i64,
    pub malformed_course_count: usize,
}

impl From<&CatalogSnapshot> for AllCoursesResponse {
    fn from(snapshot: &CatalogSnapshot) -> Self {
        Self {
            courses: snapshot.courses().to_vec(),
            timestamp: snapshot.timestamp(),
            malformed_course_count: snapshot.malformed_count(),
        }
    }
}

/// Body of `GET /api/v2/courses-since/{timestamp}`
///
/// Exactly one of `diff` (when `incremental`) and `courses` (otherwise) is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoursesSinceResponse {
    pub incremental: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<CourseDiff>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub courses: Option<Vec<Course>>,
    pub timestamp: i64,
    pub malformed_course_count: usize,
}

impl From<CoursesSince> for CoursesSinceResponse {
    fn from(since: CoursesSince) -> Self {
        match since {
            CoursesSince::Incremental {
                diff,
                timestamp,
                malformed_count,
            } => Self {
                incremental: true,
                diff: Some(diff),
                courses: None,
                timestamp,
                malformed_course_count: malformed_count,
            },
            CoursesSince::Full(snapshot) => Self {
                incremental: false,
                diff: None,
                courses: Some(snapshot.courses().to_vec()),
                timestamp: snapshot.timestamp(),
                malformed_course_count: snapshot.malformed_count(),
            },
        }
    }
}

/// Body of `GET /api/v2/malformed-courses`
pub type MalformedCoursesResponse = Vec<String>;

#[cfg(test)]
mod tests {
    use super::*;
    use hyperschedule_catalog::CourseStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn incremental_response_omits_courses() {
        let response = CoursesSinceResponse::from(CoursesSince::Incremental {
            diff: CourseDiff::default(),
            timestamp: 200,
            malformed_count: 2,
        });
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "incremental": true,
                "diff": {"added": [], "removed": [], "modified": []},
                "timestamp": 200,
                "malformedCourseCount": 2,
            })
        );
    }

    #[test]
    fn full_response_omits_diff() {
        let store = CourseStore::new();
        store.apply_refresh(100, vec![], vec!["X".to_string()]).unwrap();
        let response = CoursesSinceResponse::from(store.courses_since(0).unwrap());
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "incremental": false,
                "courses": [],
                "timestamp": 100,
                "malformedCourseCount": 1,
            })
        );

        let all = AllCoursesResponse::from(store.snapshot().unwrap().as_ref());
        assert_eq!(
            serde_json::to_value(&all).unwrap(),
            json!({"courses": [], "timestamp": 100, "malformedCourseCount": 1})
        );
    }
}
