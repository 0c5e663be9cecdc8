//! Classification metrics over evaluator output, and the anonymisation
//! applied before a result leaves the data owner.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One model output paired with the dataset's ground truth.
///
/// Labels are compared by their JSON form, so `1` and `"1"` are
/// different classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledPrediction {
    pub prediction: Value,
    pub label: Value,
}

/// Accuracy plus support-weighted precision, recall and F1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    /// Number of samples scored.
    pub support: usize,
}

#[derive(Default)]
struct ClassCounts {
    true_positive: usize,
    false_positive: usize,
    false_negative: usize,
}

impl ClassCounts {
    fn support(&self) -> usize {
        self.true_positive + self.false_negative
    }

    fn precision(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    fn recall(&self) -> f64 {
        ratio(self.true_positive, self.support())
    }

    fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

/// Score `samples`. Returns `None` when there is nothing to score.
///
/// Per-class precision and recall are zero when undefined, and each class
/// is weighted by how often it occurs as a label.
pub fn classification_metrics(samples: &[LabeledPrediction]) -> Option<ClassificationMetrics> {
    if samples.is_empty() {
        return None;
    }

    let mut classes: BTreeMap<String, ClassCounts> = BTreeMap::new();
    let mut correct = 0usize;

    for sample in samples {
        let predicted = sample.prediction.to_string();
        let actual = sample.label.to_string();
        if predicted == actual {
            correct += 1;
            classes.entry(actual).or_default().true_positive += 1;
        } else {
            classes.entry(predicted).or_default().false_positive += 1;
            classes.entry(actual).or_default().false_negative += 1;
        }
    }

    let total = samples.len();
    let weighted = |metric: fn(&ClassCounts) -> f64| -> f64 {
        classes
            .values()
            .map(|c| metric(c) * c.support() as f64)
            .sum::<f64>()
            / total as f64
    };

    Some(ClassificationMetrics {
        accuracy: ratio(correct, total),
        precision: weighted(ClassCounts::precision),
        recall: weighted(ClassCounts::recall),
        f1_score: weighted(ClassCounts::f1),
        support: total,
    })
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/* --------------------------------------------------------------------------
Anonymisation
-------------------------------------------------------------------------- */

/// Round every non-integer number in `value` to two decimals, at any
/// depth. Integers, strings and other values pass through.
pub fn anonymize(value: Value) -> Value {
    match value {
        Value::Number(n) if n.is_f64() => {
            let rounded = n.as_f64().map(|f| (f * 100.0).round() / 100.0);
            rounded
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Number(n))
        }
        Value::Array(items) => Value::Array(items.into_iter().map(anonymize).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, v)| (key, anonymize(v)))
                .collect(),
        ),
        other => other,
    }
}
