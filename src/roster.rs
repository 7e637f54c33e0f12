use crate::model::{StudentId, StudentRecord};

/// Students whose name contains `term`, ignoring case. Roster order is kept.
pub fn search<'a>(records: &'a [StudentRecord], term: &str) -> Vec<&'a StudentRecord> {
    let needle = term.trim().to_lowercase();
    records
        .iter()
        .filter(|record| record.name.to_lowercase().contains(&needle))
        .collect()
}

/// First `limit` matches for the dashboard list, with the total match count.
pub fn preview<'a>(records: &'a [StudentRecord], term: &str, limit: usize) -> (usize, Vec<&'a StudentRecord>) {
    let mut matches = search(records, term);
    let total = matches.len();
    matches.truncate(limit);
    (total, matches)
}

pub fn find_by_id<'a>(records: &'a [StudentRecord], id: &StudentId) -> Option<&'a StudentRecord> {
    records.iter().find(|record| &record.id == id)
}
