use ndarray::Array2;
use std::io::Write;

use crate::error::Result;
use crate::model::{StudentRecord, FEATURE_COUNT};

/// Text columns every uploaded row must fill. Rows are keyed by `Student_ID`
/// once the roster is read back, so a file without it cannot be shown.
pub const IDENTITY_COLUMNS: [&str; 2] = ["Student_ID", "Name"];

/// Score columns, in prediction-feature order.
pub const SCORE_COLUMNS: [&str; FEATURE_COUNT] = [
    "Internal_Assessment_1",
    "Internal_Assessment_2",
    "Attendance_Percentage",
    "Previous_Semester_Grade",
    "Participation_Score",
];

/// Checks a roster file before it is sent to the roster store.
///
/// Returns the number of rows, or the message to show when the file is rejected.
pub fn validate_upload(file_name: &str, contents: &[u8]) -> std::result::Result<usize, String> {
    if !file_name.to_lowercase().ends_with(".csv") {
        return Err("Invalid file format! Please upload a CSV file.".to_string());
    }

    let mut reader = csv::Reader::from_reader(contents);
    let headers = reader
        .headers()
        .map_err(|e| format!("Error processing file: {}", e))?
        .clone();
    let position = |column: &str| headers.iter().position(|header| header.trim() == column);

    let missing: Vec<&str> = IDENTITY_COLUMNS
        .iter()
        .chain(SCORE_COLUMNS.iter())
        .copied()
        .filter(|column| position(*column).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(format!("CSV file missing required columns: {}", missing.join(", ")));
    }

    let identity: Vec<(&str, usize)> = IDENTITY_COLUMNS
        .iter()
        .filter_map(|column| position(*column).map(|index| (*column, index)))
        .collect();
    let scores: Vec<(&str, usize)> = SCORE_COLUMNS
        .iter()
        .filter_map(|column| position(*column).map(|index| (*column, index)))
        .collect();

    let mut rows = 0;
    for (line, result) in reader.records().enumerate() {
        let row = line + 1;
        let record = result.map_err(|e| format!("Error processing file: row {}: {}", row, e))?;

        for &(column, index) in &identity {
            if record.get(index).map_or(true, |value| value.trim().is_empty()) {
                return Err(format!("Error processing file: row {}: {} is empty", row, column));
            }
        }
        for &(column, index) in &scores {
            let value = record.get(index).unwrap_or("").trim();
            if value.parse::<f64>().is_err() {
                return Err(format!(
                    "Error processing file: row {}: {} is not a number: '{}'",
                    row, column, value
                ));
            }
        }
        rows += 1;
    }

    Ok(rows)
}

/// Writes the roster with the same headers the roster store uses.
pub fn write_roster<W: Write>(records: &[StudentRecord], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// One row per student, columns in prediction-feature order.
pub fn feature_matrix(records: &[StudentRecord]) -> Array2<f64> {
    Array2::from_shape_fn((records.len(), FEATURE_COUNT), |(row, column)| {
        records[row].features()[column]
    })
}
