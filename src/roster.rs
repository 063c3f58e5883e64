//! Record types of the trainer dashboard: the student roster and the
//! submission review queue, with their table schemas and demo data.

use std::cmp::Ordering;

use chrono::{NaiveDate, NaiveDateTime};

use crate::domain::ViewError;
use crate::schema::{Record, Schema};

pub const PENDING_REVIEW: &str = "Pending Review";
pub const PROJECTS: &[&str] = &["Project 1", "Project 2", "Project 3"];

/// Filter hotkeys per table, resolved by the controller.
pub const STUDENT_FILTER_KEYS: &[(char, &str)] = &[('b', "batch"), ('t', "track"), ('s', "status")];
pub const SUBMISSION_FILTER_KEYS: &[(char, &str)] =
    &[('r', "review"), ('p', "project"), ('t', "track")];

#[derive(Debug, Clone, PartialEq)]
pub struct Student {
    pub id: String,
    pub name: String,
    pub email: String,
    pub track: String,
    pub batch: String,
    pub progress: u8,
    pub current_project: String,
    pub checkpoints_completed: u8,
    pub checkpoints_total: u8,
    pub last_active: String,
    pub online: bool,
    pub status: String,
    pub joined: String,
}

impl Record for Student {
    fn id(&self) -> &str {
        &self.id
    }

    fn columns() -> &'static [&'static str] {
        &[
            "Name",
            "Track",
            "Batch",
            "Progress",
            "Project",
            "Checkpoints",
            "Last active",
            "Status",
        ]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.track.clone(),
            self.batch.clone(),
            format!("{}%", self.progress),
            self.current_project.clone(),
            format!("{}/{}", self.checkpoints_completed, self.checkpoints_total),
            self.last_active.clone(),
            self.status.clone(),
        ]
    }

    fn details(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Name", self.name.clone()),
            ("Email", self.email.clone()),
            ("Track", self.track.clone()),
            ("Batch", self.batch.clone()),
            ("Status", self.status.clone()),
            ("Progress", format!("{}%", self.progress)),
            ("Current project", self.current_project.clone()),
            (
                "Checkpoints",
                format!("{} of {}", self.checkpoints_completed, self.checkpoints_total),
            ),
            ("Joined", self.joined.clone()),
            ("Last active", self.last_active.clone()),
        ]
    }
}

fn student_name(s: &Student) -> &str {
    &s.name
}

fn student_batch(s: &Student) -> &str {
    &s.batch
}

fn student_track(s: &Student) -> &str {
    &s.track
}

fn student_status(s: &Student) -> &str {
    &s.status
}

fn progress_high_low(a: &Student, b: &Student) -> Ordering {
    b.progress.cmp(&a.progress)
}

fn progress_low_high(a: &Student, b: &Student) -> Ordering {
    a.progress.cmp(&b.progress)
}

fn student_name_az(a: &Student, b: &Student) -> Ordering {
    a.name.to_lowercase().cmp(&b.name.to_lowercase())
}

// Online students first, the rest by their activity label.
fn last_active(a: &Student, b: &Student) -> Ordering {
    b.online
        .cmp(&a.online)
        .then_with(|| a.last_active.cmp(&b.last_active))
}

pub fn student_schema() -> Result<Schema<Student>, ViewError> {
    Schema::builder(student_name)
        .filter("batch", &["Batch 1", "Batch 2"], student_batch)
        .filter("track", &["DP", "FSD"], student_track)
        .filter("status", &["Active", "Inactive", "Blocked"], student_status)
        .sort("ProgressHL", progress_high_low)
        .sort("ProgressLH", progress_low_high)
        .sort("NameAZ", student_name_az)
        .sort("LastActive", last_active)
        .default_sort("ProgressHL")
        .build()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub id: String,
    pub student: String,
    pub track: String,
    pub project: String,
    pub submitted_at: NaiveDateTime,
    pub relative: String,
    pub attempt: u8,
    pub status: String,
    pub repo_url: String,
    pub reviewer: Option<String>,
}

impl Submission {
    pub fn submitted_label(&self) -> String {
        self.submitted_at.format("%b %d %Y %-I:%M %p").to_string()
    }
}

impl Record for Submission {
    fn id(&self) -> &str {
        &self.id
    }

    fn columns() -> &'static [&'static str] {
        &[
            "Student", "Track", "Project", "Submitted", "Attempt", "Status", "Reviewer",
        ]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.student.clone(),
            self.track.clone(),
            self.project.clone(),
            format!("{} ({})", self.submitted_label(), self.relative),
            self.attempt.to_string(),
            self.status.clone(),
            self.reviewer.clone().unwrap_or_else(|| "-".to_string()),
        ]
    }

    fn details(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Submission", self.id.clone()),
            ("Student", self.student.clone()),
            ("Track", self.track.clone()),
            ("Project", self.project.clone()),
            ("Submitted", self.submitted_label()),
            ("Attempt", self.attempt.to_string()),
            ("Status", self.status.clone()),
            ("Repository", self.repo_url.clone()),
            (
                "Reviewer",
                self.reviewer.clone().unwrap_or_else(|| "-".to_string()),
            ),
        ]
    }
}

fn submission_student(s: &Submission) -> &str {
    &s.student
}

fn submission_review(s: &Submission) -> &str {
    if s.status == PENDING_REVIEW {
        "Pending"
    } else {
        "Reviewed"
    }
}

// Declared project the title starts with, "Project 2: ML Model" -> "Project 2"
fn submission_project(s: &Submission) -> &str {
    PROJECTS
        .iter()
        .copied()
        .find(|p| s.project.starts_with(*p))
        .unwrap_or("")
}

fn submission_track(s: &Submission) -> &str {
    &s.track
}

fn newest(a: &Submission, b: &Submission) -> Ordering {
    b.submitted_at.cmp(&a.submitted_at)
}

fn oldest(a: &Submission, b: &Submission) -> Ordering {
    a.submitted_at.cmp(&b.submitted_at)
}

fn submission_name_az(a: &Submission, b: &Submission) -> Ordering {
    a.student.to_lowercase().cmp(&b.student.to_lowercase())
}

pub fn submission_schema() -> Result<Schema<Submission>, ViewError> {
    Schema::builder(submission_student)
        .filter("review", &["Pending", "Reviewed"], submission_review)
        .filter("project", PROJECTS, submission_project)
        .filter("track", &["DP", "FSD"], submission_track)
        .sort("Newest", newest)
        .sort("Oldest", oldest)
        .sort("NameAZ", submission_name_az)
        .default_sort("Newest")
        .build()
}

/// Submissions still waiting for a trainer, over the whole collection.
pub fn pending_count(submissions: &[Submission]) -> usize {
    submissions
        .iter()
        .filter(|s| s.status == PENDING_REVIEW)
        .count()
}

#[allow(clippy::too_many_arguments)]
fn student(
    id: &str,
    name: &str,
    email: &str,
    track: &str,
    batch: &str,
    progress: u8,
    current_project: &str,
    checkpoints: (u8, u8),
    last_active: (&str, bool),
    status: &str,
    joined: &str,
) -> Student {
    Student {
        id: id.to_string(),
        name: name.to_string(),
        email: email.to_string(),
        track: track.to_string(),
        batch: batch.to_string(),
        progress,
        current_project: current_project.to_string(),
        checkpoints_completed: checkpoints.0,
        checkpoints_total: checkpoints.1,
        last_active: last_active.0.to_string(),
        online: last_active.1,
        status: status.to_string(),
        joined: joined.to_string(),
    }
}

pub fn demo_students() -> Vec<Student> {
    vec![
        student(
            "s1",
            "John Doe",
            "john@example.com",
            "DP",
            "Batch 1",
            88,
            "Project 2",
            (4, 5),
            ("Online now", true),
            "Active",
            "Aug 10, 2025",
        ),
        student(
            "s2",
            "Sarah Lee",
            "sarah@example.com",
            "FSD",
            "Batch 1",
            76,
            "Project 1",
            (3, 5),
            ("2 hours ago", false),
            "Active",
            "Aug 12, 2025",
        ),
        student(
            "s3",
            "Mike Chen",
            "mike@example.com",
            "DP",
            "Batch 2",
            42,
            "Project 1",
            (2, 5),
            ("5 hours ago", false),
            "Inactive",
            "Aug 20, 2025",
        ),
        student(
            "s4",
            "Priya Singh",
            "priya@example.com",
            "FSD",
            "Batch 2",
            63,
            "Project 1",
            (3, 5),
            ("Yesterday", false),
            "Active",
            "Aug 25, 2025",
        ),
        student(
            "s5",
            "Arjun Kumar",
            "arjun@example.com",
            "DP",
            "Batch 1",
            95,
            "Project 3",
            (5, 5),
            ("2 days ago", false),
            "Active",
            "Aug 8, 2025",
        ),
    ]
}

fn at(month: u32, day: u32, hour: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, month, day)
        .and_then(|d| d.and_hms_opt(hour, min, 0))
        .unwrap_or_default()
}

#[allow(clippy::too_many_arguments)]
fn submission(
    id: &str,
    student: &str,
    track: &str,
    project: &str,
    submitted_at: NaiveDateTime,
    relative: &str,
    attempt: u8,
    status: &str,
    repo_url: &str,
    reviewer: Option<&str>,
) -> Submission {
    Submission {
        id: id.to_string(),
        student: student.to_string(),
        track: track.to_string(),
        project: project.to_string(),
        submitted_at,
        relative: relative.to_string(),
        attempt,
        status: status.to_string(),
        repo_url: repo_url.to_string(),
        reviewer: reviewer.map(str::to_string),
    }
}

pub fn demo_submissions() -> Vec<Submission> {
    vec![
        submission(
            "r1",
            "John Doe",
            "DP",
            "Project 1 - Data Analysis",
            at(10, 10, 14, 30),
            "2 days ago",
            1,
            PENDING_REVIEW,
            "https://github.com/john/project1",
            None,
        ),
        submission(
            "r2",
            "Sarah Lee",
            "FSD",
            "Project 1 - React Foundations",
            at(10, 11, 9, 12),
            "1 day ago",
            2,
            PENDING_REVIEW,
            "https://github.com/sarah/react-p1",
            None,
        ),
        submission(
            "r3",
            "Arjun Kumar",
            "DP",
            "Project 2 - ML Model",
            at(10, 8, 15, 0),
            "3 days ago",
            1,
            "Approved",
            "https://github.com/arjun/ml-model",
            Some("Priya"),
        ),
        submission(
            "r4",
            "Mike Chen",
            "DP",
            "Project 1 - Data Analysis",
            at(10, 9, 18, 40),
            "2 days ago",
            1,
            "Changes Requested",
            "https://github.com/mike/data-analysis",
            Some("Priya"),
        ),
        submission(
            "r5",
            "Priya Singh",
            "FSD",
            "Project 1 - React Foundations",
            at(10, 7, 17, 5),
            "4 days ago",
            1,
            "Approved",
            "https://github.com/priya/react-foundations",
            Some("Priya"),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::table::TabularViewController;

    fn submissions() -> TabularViewController<Submission> {
        TabularViewController::new(
            demo_submissions().into(),
            Arc::new(submission_schema().unwrap()),
            5,
        )
        .unwrap()
    }

    fn ids<R: Record>(rows: &[&R]) -> Vec<String> {
        rows.iter().map(|r| r.id().to_string()).collect()
    }

    #[test]
    fn schemas_are_valid() {
        assert!(student_schema().is_ok());
        assert!(submission_schema().is_ok());
    }

    #[test]
    fn last_active_puts_online_students_first() {
        let mut students = demo_students();
        students.sort_by(last_active);
        assert_eq!(students[0].id, "s1");
        // Remaining labels in lexicographic order
        let labels: Vec<&str> = students[1..].iter().map(|s| s.last_active.as_str()).collect();
        assert_eq!(labels, vec!["2 days ago", "2 hours ago", "5 hours ago", "Yesterday"]);
    }

    #[test]
    fn submissions_default_to_newest_first() {
        let ctrl = submissions();
        assert_eq!(ids(&ctrl.view().rows), vec!["r2", "r1", "r4", "r3", "r5"]);
    }

    #[test]
    fn review_filter_splits_pending_from_reviewed() {
        let mut ctrl = submissions();
        ctrl.set_filter("review", "Pending").unwrap();
        assert_eq!(ids(&ctrl.view().rows), vec!["r2", "r1"]);
        ctrl.set_filter("review", "Reviewed").unwrap();
        assert_eq!(ids(&ctrl.view().rows), vec!["r4", "r3", "r5"]);
    }

    #[test]
    fn project_filter_matches_title_prefix() {
        let mut ctrl = submissions();
        ctrl.set_filter("project", "Project 2").unwrap();
        assert_eq!(ids(&ctrl.view().rows), vec!["r3"]);
        ctrl.set_filter("project", "Project 3").unwrap();
        assert_eq!(ctrl.view().total_matching, 0);
        assert_eq!(ctrl.view().page_count, 1);
    }

    #[test]
    fn project_filter_accepts_any_title_separator() {
        let mut subs = demo_submissions();
        subs[0].project = "Project 1: Data Analysis".to_string();
        subs[2].project = "Project 2 \u{2013} ML Model".to_string();
        let mut ctrl =
            TabularViewController::new(subs.into(), Arc::new(submission_schema().unwrap()), 5)
                .unwrap();
        ctrl.set_filter("project", "Project 1").unwrap();
        assert_eq!(ids(&ctrl.view().rows), vec!["r2", "r1", "r4", "r5"]);
        ctrl.set_filter("project", "Project 2").unwrap();
        assert_eq!(ids(&ctrl.view().rows), vec!["r3"]);
    }

    #[test]
    fn oldest_and_name_sorts() {
        let mut ctrl = submissions();
        ctrl.set_sort("Oldest").unwrap();
        assert_eq!(ids(&ctrl.view().rows), vec!["r5", "r3", "r4", "r1", "r2"]);
        ctrl.set_sort("NameAZ").unwrap();
        assert_eq!(ids(&ctrl.view().rows), vec!["r3", "r1", "r4", "r5", "r2"]);
    }

    #[test]
    fn pending_count_covers_whole_collection() {
        assert_eq!(pending_count(&demo_submissions()), 2);
    }

    #[test]
    fn submission_cells_follow_columns() {
        let subs = demo_submissions();
        let cells = subs[2].cells();
        assert_eq!(cells.len(), Submission::columns().len());
        assert_eq!(cells[3], "Oct 08 2025 3:00 PM (3 days ago)");
        assert_eq!(cells[6], "Priya");
        assert_eq!(subs[0].cells()[6], "-");
    }
}
