//! Spreadsheet export for list and table blocks.

use super::session::ProjectSession;
use super::{IoContext, ProjectError, ProjectResult};
use log::info;
use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};
use serde_json::Value;
use std::fs;
use std::path::Path;

impl ProjectSession {
    /// Writes `rows` to a single-sheet `.xlsx` workbook at `target`.
    ///
    /// Numbers and booleans keep their cell type, `null` leaves the cell
    /// empty and nested values are written as JSON text.
    pub fn save_excel(&self, target: &Path, rows: &[Vec<Value>]) -> ProjectResult<()> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (row_index, row) in rows.iter().enumerate() {
            let row_num = u32::try_from(row_index).map_err(|_| too_large("row", row_index))?;
            for (col_index, value) in row.iter().enumerate() {
                let col_num =
                    u16::try_from(col_index).map_err(|_| too_large("column", col_index))?;
                write_cell(sheet, row_num, col_num, value)
                    .map_err(|err| xlsx_error(target, err))?;
            }
        }

        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).at(parent)?;
        }
        workbook.save(target).map_err(|err| xlsx_error(target, err))?;
        info!(
            "event=excel_save module=project status=ok rows={}",
            rows.len()
        );
        Ok(())
    }
}

fn write_cell(sheet: &mut Worksheet, row: u32, col: u16, value: &Value) -> Result<(), XlsxError> {
    match value {
        Value::Null => return Ok(()),
        Value::Bool(flag) => sheet.write_boolean(row, col, *flag)?,
        Value::Number(number) => match number.as_f64() {
            Some(number) => sheet.write_number(row, col, number)?,
            None => sheet.write_string(row, col, number.to_string())?,
        },
        Value::String(text) => sheet.write_string(row, col, text)?,
        nested => sheet.write_string(row, col, nested.to_string())?,
    };
    Ok(())
}

fn too_large(axis: &str, index: usize) -> ProjectError {
    ProjectError::InvalidInput(format!("spreadsheet {axis} {index} is out of range"))
}

fn xlsx_error(target: &Path, err: XlsxError) -> ProjectError {
    match err {
        XlsxError::IoError(source) => ProjectError::io(target, source),
        other => ProjectError::InvalidInput(format!("spreadsheet cannot be written: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ShellConfig;
    use crate::project::{ErrorKind, ProjectSession};
    use serde_json::json;
    use std::fs;

    #[test]
    fn rows_are_written_as_xlsx_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let session = ProjectSession::new(ShellConfig::with_home(dir.path()));
        let target = dir.path().join("exports/scores.xlsx");
        let rows = vec![
            vec![json!("name"), json!("score"), json!("passed")],
            vec![json!("kim"), json!(92.5), json!(true)],
            vec![json!("lee"), json!(null), json!({"retry": 1})],
        ];

        session.save_excel(&target, &rows).unwrap();
        let bytes = fs::read(&target).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn empty_rows_still_produce_a_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let session = ProjectSession::new(ShellConfig::with_home(dir.path()));
        let target = dir.path().join("empty.xlsx");

        session.save_excel(&target, &[]).unwrap();
        assert!(target.is_file());
    }

    #[test]
    fn unwritable_target_is_a_file_system_error() {
        let dir = tempfile::tempdir().unwrap();
        let session = ProjectSession::new(ShellConfig::with_home(dir.path()));
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"file").unwrap();

        let err = session
            .save_excel(&blocker.join("out.xlsx"), &[vec![json!(1)]])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileSystem);
    }
}
