use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::NaiveDateTime;
use polars::prelude::*;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::domain::AppError;
use crate::roster::{Student, Submission};

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%b %d %Y %I:%M %p",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    CSV,
    PARQUET,
    ARROW,
}

#[derive(Debug)]
pub struct FileInfo {
    pub path: PathBuf,
    pub file_size: u64,
    pub file_type: FileType,
}

struct Column {
    name: String,
    data: Vec<Option<String>>,
}

/// All columns of a file as strings, addressed by header name.
pub struct RawTable {
    nrows: usize,
    columns: HashMap<String, Vec<Option<String>>>,
}

impl RawTable {
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    fn required(&self, row: usize, name: &str) -> Result<&str, AppError> {
        let column = self
            .columns
            .get(name)
            .ok_or_else(|| AppError::MissingColumn(name.to_string()))?;
        match column[row].as_deref() {
            Some(value) => Ok(value),
            None => Err(AppError::InvalidValue {
                row,
                column: name.to_string(),
                value: String::new(),
            }),
        }
    }

    fn optional(&self, row: usize, name: &str) -> Option<&str> {
        self.columns
            .get(name)
            .and_then(|c| c[row].as_deref())
            .filter(|v| !v.is_empty())
    }

    fn parse<T: std::str::FromStr>(&self, row: usize, name: &str, default: T) -> Result<T, AppError> {
        match self.optional(row, name) {
            Some(value) => value.trim().parse().map_err(|_| AppError::InvalidValue {
                row,
                column: name.to_string(),
                value: value.to_string(),
            }),
            None => Ok(default),
        }
    }
}

pub fn detect_file_type(path: &Path) -> Result<FileType, AppError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("CSV") => Ok(FileType::CSV),
        Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
        _ => Err(AppError::UnknownFileType),
    }
}

pub fn get_file_info(path: PathBuf) -> Result<FileInfo, AppError> {
    let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => AppError::FileNotFound,
        ErrorKind::PermissionDenied => AppError::PermissionDenied,
        _ => AppError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(AppError::LoadingFailed("Not a file!".into()));
    }

    let file_type = detect_file_type(&path)?;
    Ok(FileInfo {
        path,
        file_size: metadata.len(),
        file_type,
    })
}

pub fn load_table(path: PathBuf) -> Result<RawTable, AppError> {
    let file_info = get_file_info(path)?;
    debug!("Loading {:?}", file_info);
    let frame = match file_info.file_type {
        FileType::CSV => load_csv(&file_info.path)?,
        FileType::PARQUET => load_parquet(&file_info.path)?,
        FileType::ARROW => load_arrow(&file_info.path)?,
    };

    // Each column is converted in its own thread
    let start_time = Instant::now();
    let df = frame.collect()?;
    let columns: Result<Vec<Column>, PolarsError> = df
        .get_column_names()
        .par_iter()
        .map(|name| load_column(&df, name))
        .collect();
    let columns = columns?;

    info!(
        "Loading {} rows from {:?} took {}ms ...",
        df.height(),
        file_info.path,
        start_time.elapsed().as_millis()
    );
    Ok(RawTable {
        nrows: df.height(),
        columns: columns.into_iter().map(|c| (c.name, c.data)).collect(),
    })
}

fn load_column(df: &DataFrame, col_name: &str) -> Result<Column, PolarsError> {
    let col = df.column(col_name)?.cast(&DataType::String)?;
    let series = col.str()?;
    let data = series
        .into_iter()
        .map(|value| value.map(|s| s.trim().to_string()))
        .collect();
    Ok(Column {
        name: col_name.trim().to_lowercase(),
        data,
    })
}

fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .finish()
}

fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
}

fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}

fn parse_bool(row: usize, column: &str, value: Option<&str>) -> Result<bool, AppError> {
    match value.map(|v| v.to_lowercase()).as_deref() {
        None => Ok(false),
        Some("true") | Some("1") | Some("yes") => Ok(true),
        Some("false") | Some("0") | Some("no") => Ok(false),
        Some(other) => Err(AppError::InvalidValue {
            row,
            column: column.to_string(),
            value: other.to_string(),
        }),
    }
}

fn parse_timestamp(row: usize, column: &str, value: &str) -> Result<NaiveDateTime, AppError> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .ok_or_else(|| AppError::InvalidValue {
            row,
            column: column.to_string(),
            value: value.to_string(),
        })
}

pub fn students_from(table: &RawTable) -> Result<Vec<Student>, AppError> {
    (0..table.nrows())
        .map(|row| {
            Ok(Student {
                id: table.required(row, "id")?.to_string(),
                name: table.required(row, "name")?.to_string(),
                email: table.optional(row, "email").unwrap_or_default().to_string(),
                track: table.required(row, "track")?.to_string(),
                batch: table.required(row, "batch")?.to_string(),
                progress: table.parse(row, "progress", 0u8)?.min(100),
                current_project: table
                    .optional(row, "current_project")
                    .unwrap_or_default()
                    .to_string(),
                checkpoints_completed: table.parse(row, "checkpoints_completed", 0)?,
                checkpoints_total: table.parse(row, "checkpoints_total", 0)?,
                last_active: table
                    .optional(row, "last_active")
                    .unwrap_or("-")
                    .to_string(),
                online: parse_bool(row, "online", table.optional(row, "online"))?,
                status: table.required(row, "status")?.to_string(),
                joined: table.optional(row, "joined").unwrap_or_default().to_string(),
            })
        })
        .collect()
}

pub fn submissions_from(table: &RawTable) -> Result<Vec<Submission>, AppError> {
    (0..table.nrows())
        .map(|row| {
            Ok(Submission {
                id: table.required(row, "id")?.to_string(),
                student: table.required(row, "student")?.to_string(),
                track: table.required(row, "track")?.to_string(),
                project: table.required(row, "project")?.to_string(),
                submitted_at: parse_timestamp(
                    row,
                    "submitted_at",
                    table.required(row, "submitted_at")?,
                )?,
                relative: table.optional(row, "relative").unwrap_or_default().to_string(),
                attempt: table.parse(row, "attempt", 1)?,
                status: table.required(row, "status")?.to_string(),
                repo_url: table.optional(row, "repo_url").unwrap_or_default().to_string(),
                reviewer: table.optional(row, "reviewer").map(str::to_string),
            })
        })
        .collect()
}

pub fn load_students(path: PathBuf) -> Result<Vec<Student>, AppError> {
    students_from(&load_table(path)?)
}

pub fn load_submissions(path: PathBuf) -> Result<Vec<Submission>, AppError> {
    submissions_from(&load_table(path)?)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn detects_file_types_by_extension() {
        assert_eq!(detect_file_type(Path::new("a.csv")).unwrap(), FileType::CSV);
        assert_eq!(detect_file_type(Path::new("a.PQ")).unwrap(), FileType::PARQUET);
        assert_eq!(detect_file_type(Path::new("a.feather")).unwrap(), FileType::ARROW);
        assert!(matches!(
            detect_file_type(Path::new("a.xlsx")),
            Err(AppError::UnknownFileType)
        ));
        assert!(matches!(
            detect_file_type(Path::new("roster")),
            Err(AppError::UnknownFileType)
        ));
    }

    #[test]
    fn missing_file_and_directory_are_rejected() {
        assert!(matches!(
            get_file_info(PathBuf::from("/definitely/not/here.csv")),
            Err(AppError::FileNotFound)
        ));
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            get_file_info(dir.path().to_path_buf()),
            Err(AppError::LoadingFailed(_))
        ));
    }

    #[test]
    fn loads_students_from_csv() {
        let file = csv(
            "id,name,email,track,batch,progress,online,status\n\
             s1,John Doe,john@example.com,DP,Batch 1,88,true,Active\n\
             s2,Sarah Lee,,FSD,Batch 1,76,false,Active\n",
        );
        let students = load_students(file.path().to_path_buf()).unwrap();
        assert_eq!(students.len(), 2);
        assert_eq!(students[0].name, "John Doe");
        assert_eq!(students[0].progress, 88);
        assert!(students[0].online);
        assert_eq!(students[1].email, "");
        assert!(!students[1].online);
        assert_eq!(students[1].last_active, "-");
    }

    #[test]
    fn missing_student_column_is_reported() {
        let file = csv("id,name,track,progress,status\ns1,John Doe,DP,88,Active\n");
        let res = load_students(file.path().to_path_buf());
        assert!(matches!(res, Err(AppError::MissingColumn(c)) if c == "batch"));
    }

    #[test]
    fn loads_submissions_from_csv() {
        let file = csv(
            "id,student,track,project,submitted_at,attempt,status,reviewer\n\
             r1,John Doe,DP,Project 1 - Data Analysis,2025-10-10 14:30,1,Pending Review,\n\
             r3,Arjun Kumar,DP,Project 2 - ML Model,2025-10-08 15:00,2,Approved,Priya\n",
        );
        let subs = load_submissions(file.path().to_path_buf()).unwrap();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].submitted_label(), "Oct 10 2025 2:30 PM");
        assert_eq!(subs[0].reviewer, None);
        assert_eq!(subs[1].attempt, 2);
        assert_eq!(subs[1].reviewer.as_deref(), Some("Priya"));
    }

    #[test]
    fn bad_timestamp_is_an_invalid_value() {
        let file = csv(
            "id,student,track,project,submitted_at,status\n\
             r1,John Doe,DP,Project 1,yesterday,Pending Review\n",
        );
        let res = load_submissions(file.path().to_path_buf());
        assert!(matches!(
            res,
            Err(AppError::InvalidValue { row: 0, ref column, .. }) if column == "submitted_at"
        ));
    }
}
