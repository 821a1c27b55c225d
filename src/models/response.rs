//! Survey response records and the per-entity pivot table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One row of `responses.csv`: a single rater's answer to one DISCERN
/// question for one article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub entity_id: i64,
    /// Rater id.
    pub uid: String,
    #[serde(rename = "questionID")]
    pub question_id: String,
    pub answer: f64,
}

/// Responses pivoted to `questionID -> uid -> answer`.
///
/// Duplicate (question, rater) cells are median-aggregated.
pub type Responses = BTreeMap<String, BTreeMap<String, f64>>;

/// Pivot one entity's response rows into a `questionID x uid` table,
/// taking the median over duplicate cells.
pub fn pivot_responses<'a, I>(records: I) -> Responses
where
    I: IntoIterator<Item = &'a ResponseRecord>,
{
    let mut cells: BTreeMap<String, BTreeMap<String, Vec<f64>>> = BTreeMap::new();
    for record in records {
        cells
            .entry(record.question_id.clone())
            .or_default()
            .entry(record.uid.clone())
            .or_default()
            .push(record.answer);
    }

    cells
        .into_iter()
        .map(|(question, raters)| {
            let medians = raters
                .into_iter()
                .map(|(uid, answers)| (uid, median(answers)))
                .collect();
            (question, medians)
        })
        .collect()
}

fn median(mut values: Vec<f64>) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(question: &str, uid: &str, answer: f64) -> ResponseRecord {
        ResponseRecord {
            entity_id: 1,
            uid: uid.to_string(),
            question_id: question.to_string(),
            answer,
        }
    }

    #[test]
    fn test_pivot_groups_by_question_and_rater() {
        let records = vec![
            record("q1", "a", 3.0),
            record("q1", "b", 5.0),
            record("q2", "a", 1.0),
        ];
        let pivot = pivot_responses(&records);
        assert_eq!(pivot["q1"]["a"], 3.0);
        assert_eq!(pivot["q1"]["b"], 5.0);
        assert_eq!(pivot["q2"]["a"], 1.0);
    }

    #[test]
    fn test_pivot_median_over_duplicate_cells() {
        let records = vec![
            record("q1", "a", 1.0),
            record("q1", "a", 2.0),
            record("q1", "a", 10.0),
        ];
        let pivot = pivot_responses(&records);
        assert_eq!(pivot["q1"]["a"], 2.0);
    }

    #[test]
    fn test_pivot_median_even_count_averages() {
        let records = vec![record("q1", "a", 2.0), record("q1", "a", 4.0)];
        let pivot = pivot_responses(&records);
        assert_eq!(pivot["q1"]["a"], 3.0);
    }
}
