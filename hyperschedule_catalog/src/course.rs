//! The course record, its identity key and the set of attributes that are tracked for diffing.
//!
//! Two courses with equal [`CourseKey`]s occupy the same slot in the catalog. Whether a course in
//! that slot has been modified between two refreshes is decided only by the attributes listed in
//! [`CourseAttr::ALL`]; anything captured in [`Course::extra`] is carried through but never
//! compared.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use thiserror::Error;

/// Separator between the identity values in the textual form of a [`CourseKey`]
pub const KEY_SEPARATOR: char = '/';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseStatus {
    Open,
    Closed,
    Reopened,
}

/// One meeting slot of a course
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSlot {
    /// Days of the week, e.g. `MWF`
    pub days: String,
    pub location: String,
    /// `HH:MM`, 24 hour clock
    pub start_time: String,
    /// `HH:MM`, 24 hour clock
    pub end_time: String,
}

/// A single catalog entry as served by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub department: String,
    pub course_number: u32,
    #[serde(default)]
    pub course_code_suffix: String,
    pub school: String,
    pub section: u32,
    pub course_name: String,
    pub course_status: CourseStatus,
    pub faculty: Vec<String>,
    pub open_seats: u32,
    pub total_seats: u32,
    pub quarter_credits: u32,
    pub schedule: Vec<ScheduleSlot>,
    pub first_half_semester: bool,
    pub second_half_semester: bool,
    pub start_date: String,
    pub end_date: String,
    /// Attributes outside the tracked set, passed through untouched
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Course {
    /// The identity key of this course
    pub fn key(&self) -> CourseKey {
        CourseKey {
            department: self.department.clone(),
            course_number: self.course_number,
            course_code_suffix: self.course_code_suffix.clone(),
            school: self.school.clone(),
            section: self.section,
        }
    }

    /// Human readable course code, e.g. `CS 070A HM-01`
    pub fn course_code(&self) -> String {
        format_course_code(
            &self.department,
            self.course_number,
            &self.course_code_suffix,
            &self.school,
            self.section,
        )
    }

    /// Whether `attr` has a different value in `self` and `other`
    pub fn differs_in(&self, other: &Self, attr: CourseAttr) -> bool {
        match attr {
            CourseAttr::CourseCodeSuffix => self.course_code_suffix != other.course_code_suffix,
            CourseAttr::CourseName => self.course_name != other.course_name,
            CourseAttr::CourseNumber => self.course_number != other.course_number,
            CourseAttr::CourseStatus => self.course_status != other.course_status,
            CourseAttr::Department => self.department != other.department,
            CourseAttr::EndDate => self.end_date != other.end_date,
            CourseAttr::Faculty => self.faculty != other.faculty,
            CourseAttr::FirstHalfSemester => self.first_half_semester != other.first_half_semester,
            CourseAttr::OpenSeats => self.open_seats != other.open_seats,
            CourseAttr::QuarterCredits => self.quarter_credits != other.quarter_credits,
            CourseAttr::Schedule => self.schedule != other.schedule,
            CourseAttr::School => self.school != other.school,
            CourseAttr::SecondHalfSemester => {
                self.second_half_semester != other.second_half_semester
            }
            CourseAttr::Section => self.section != other.section,
            CourseAttr::StartDate => self.start_date != other.start_date,
            CourseAttr::TotalSeats => self.total_seats != other.total_seats,
        }
    }

    /// The set of tracked attributes that differ between `self` and `other`
    pub fn changed_attrs(&self, other: &Self) -> Vec<CourseAttr> {
        CourseAttr::ALL
            .into_iter()
            .filter(|attr| self.differs_in(other, *attr))
            .collect()
    }
}

fn format_course_code(
    department: &str,
    course_number: u32,
    suffix: &str,
    school: &str,
    section: u32,
) -> String {
    format!("{department} {course_number:03}{suffix} {school}-{section:02}")
}

/// The attributes whose changes are reported as modifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CourseAttr {
    CourseCodeSuffix,
    CourseName,
    CourseNumber,
    CourseStatus,
    Department,
    EndDate,
    Faculty,
    FirstHalfSemester,
    OpenSeats,
    QuarterCredits,
    Schedule,
    School,
    SecondHalfSemester,
    Section,
    StartDate,
    TotalSeats,
}

impl CourseAttr {
    /// Every tracked attribute
    pub const ALL: [Self; 16] = [
        Self::CourseCodeSuffix,
        Self::CourseName,
        Self::CourseNumber,
        Self::CourseStatus,
        Self::Department,
        Self::EndDate,
        Self::Faculty,
        Self::FirstHalfSemester,
        Self::OpenSeats,
        Self::QuarterCredits,
        Self::Schedule,
        Self::School,
        Self::SecondHalfSemester,
        Self::Section,
        Self::StartDate,
        Self::TotalSeats,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::CourseCodeSuffix => "courseCodeSuffix",
            Self::CourseName => "courseName",
            Self::CourseNumber => "courseNumber",
            Self::CourseStatus => "courseStatus",
            Self::Department => "department",
            Self::EndDate => "endDate",
            Self::Faculty => "faculty",
            Self::FirstHalfSemester => "firstHalfSemester",
            Self::OpenSeats => "openSeats",
            Self::QuarterCredits => "quarterCredits",
            Self::Schedule => "schedule",
            Self::School => "school",
            Self::SecondHalfSemester => "secondHalfSemester",
            Self::Section => "section",
            Self::StartDate => "startDate",
            Self::TotalSeats => "totalSeats",
        }
    }
}

impl fmt::Display for CourseAttr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyParseError {
    #[error("course key {0:?} does not have exactly five components")]
    WrongArity(String),

    #[error("course key {key:?} has a non-numeric {attr}")]
    NotANumber { key: String, attr: CourseAttr },
}

/// The identity tuple of a course
///
/// The textual form joins the five identity values with [`KEY_SEPARATOR`], e.g. `CS/70/A/HM/1`.
/// Parsing that text yields the same key again as long as none of the textual identity values
/// contain the separator, see [`CourseKey::is_encodable`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CourseKey {
    pub department: String,
    pub course_number: u32,
    pub course_code_suffix: String,
    pub school: String,
    pub section: u32,
}

impl CourseKey {
    /// Whether the textual form of this key can be parsed back into an equal key
    pub fn is_encodable(&self) -> bool {
        [&self.department, &self.course_code_suffix, &self.school]
            .iter()
            .all(|value| !value.contains(KEY_SEPARATOR))
    }

    pub fn course_code(&self) -> String {
        format_course_code(
            &self.department,
            self.course_number,
            &self.course_code_suffix,
            &self.school,
            self.section,
        )
    }
}

impl fmt::Display for CourseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}{sep}{}{sep}{}",
            self.department,
            self.course_number,
            self.course_code_suffix,
            self.school,
            self.section,
            sep = KEY_SEPARATOR,
        )
    }
}

impl FromStr for CourseKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(KEY_SEPARATOR).collect();
        let [department, course_number, suffix, school, section] = parts[..] else {
            return Err(KeyParseError::WrongArity(s.to_string()));
        };
        let number = |value: &str, attr| {
            value.parse::<u32>().map_err(|_| KeyParseError::NotANumber {
                key: s.to_string(),
                attr,
            })
        };
        Ok(Self {
            department: department.to_string(),
            course_number: number(course_number, CourseAttr::CourseNumber)?,
            course_code_suffix: suffix.to_string(),
            school: school.to_string(),
            section: number(section, CourseAttr::Section)?,
        })
    }
}

impl Serialize for CourseKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CourseKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// A course carrying its identity attributes and only a subset of the others
///
/// Used for courses that were removed (identity only) and for modifications, where only the
/// attributes that changed are included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialCourse {
    pub department: String,
    pub course_number: u32,
    pub course_code_suffix: String,
    pub school: String,
    pub section: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_status: Option<CourseStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faculty: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_seats: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_seats: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quarter_credits: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Vec<ScheduleSlot>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_half_semester: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_half_semester: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

impl PartialCourse {
    /// A placeholder holding only the identity attributes encoded in `key`
    pub fn from_key(key: &CourseKey) -> Self {
        Self {
            department: key.department.clone(),
            course_number: key.course_number,
            course_code_suffix: key.course_code_suffix.clone(),
            school: key.school.clone(),
            section: key.section,
            course_name: None,
            course_status: None,
            faculty: None,
            open_seats: None,
            total_seats: None,
            quarter_credits: None,
            schedule: None,
            first_half_semester: None,
            second_half_semester: None,
            start_date: None,
            end_date: None,
        }
    }

    /// The identity attributes of `course` plus the given attributes copied from it
    pub fn project<'a>(course: &Course, attrs: impl IntoIterator<Item = &'a CourseAttr>) -> Self {
        let mut partial = Self::from_key(&course.key());
        for attr in attrs {
            match attr {
                CourseAttr::CourseName => partial.course_name = Some(course.course_name.clone()),
                CourseAttr::CourseStatus => partial.course_status = Some(course.course_status),
                CourseAttr::Faculty => partial.faculty = Some(course.faculty.clone()),
                CourseAttr::OpenSeats => partial.open_seats = Some(course.open_seats),
                CourseAttr::TotalSeats => partial.total_seats = Some(course.total_seats),
                CourseAttr::QuarterCredits => {
                    partial.quarter_credits = Some(course.quarter_credits)
                }
                CourseAttr::Schedule => partial.schedule = Some(course.schedule.clone()),
                CourseAttr::FirstHalfSemester => {
                    partial.first_half_semester = Some(course.first_half_semester)
                }
                CourseAttr::SecondHalfSemester => {
                    partial.second_half_semester = Some(course.second_half_semester)
                }
                CourseAttr::StartDate => partial.start_date = Some(course.start_date.clone()),
                CourseAttr::EndDate => partial.end_date = Some(course.end_date.clone()),
                // always present
                CourseAttr::Department
                | CourseAttr::CourseNumber
                | CourseAttr::CourseCodeSuffix
                | CourseAttr::School
                | CourseAttr::Section => {}
            }
        }
        partial
    }

    pub fn key(&self) -> CourseKey {
        CourseKey {
            department: self.department.clone(),
            course_number: self.course_number,
            course_code_suffix: self.course_code_suffix.clone(),
            school: self.school.clone(),
            section: self.section,
        }
    }
}
