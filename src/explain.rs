//! Top phrases per reduced component.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    error::{FeatureError, Result},
    pipeline::FittedPipeline,
    table::{Table, Value},
    utils::sort::{argsort_asc_stable, argsort_desc_stable},
};

/// Sign group of a phrase within one component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Positive,
    Negative,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Positive => "positive",
            Direction::Negative => "negative",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a component explanation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentPhrase {
    pub component: usize,
    pub direction: Direction,
    /// 1-based
    pub rank: usize,
    pub phrase: String,
    pub weight: f64,
}

/// Most positive and most negative terms of each component
///
/// # Arguments
/// * `pipeline` - fitted pipeline
/// * `top_n` - terms per sign group, clamped to the vocabulary size
/// * `component_ids` - components to explain, `None` for all
///
/// # Returns
/// Rows ordered by component, then direction (`negative` before
/// `positive`), then rank. Within a group the weights run from the
/// strongest to the weakest; equal weights keep vocabulary order.
pub fn explain_components<E>(
    pipeline: &FittedPipeline<E>,
    top_n: usize,
    component_ids: Option<&[usize]>,
) -> Result<Vec<ComponentPhrase>> {
    pipeline.validate()?;

    let k = pipeline.n_components();
    let ids: Vec<usize> = match component_ids {
        Some(ids) => {
            if let Some(&bad) = ids.iter().find(|&&c| c >= k) {
                return Err(FeatureError::InvalidComponent {
                    index: bad,
                    available: k,
                });
            }
            ids.to_vec()
        }
        None => (0..k).collect(),
    };

    let vocabulary: Vec<&str> = pipeline.vocabulary().collect();
    let n = top_n.min(vocabulary.len());
    let components = pipeline.components();

    let mut rows = Vec::with_capacity(ids.len() * n * 2);
    for &c in &ids {
        let weights = components.row(c).to_vec();
        let groups = [
            (Direction::Positive, argsort_desc_stable(&weights)),
            (Direction::Negative, argsort_asc_stable(&weights)),
        ];
        for (direction, order) in groups {
            for (rank, &term) in order.iter().take(n).enumerate() {
                rows.push(ComponentPhrase {
                    component: c,
                    direction,
                    rank: rank + 1,
                    phrase: vocabulary[term].to_string(),
                    weight: weights[term],
                });
            }
        }
    }

    rows.sort_by(|a, b| {
        a.component
            .cmp(&b.component)
            .then_with(|| a.direction.as_str().cmp(b.direction.as_str()))
            .then_with(|| a.rank.cmp(&b.rank))
    });
    Ok(rows)
}

/// Tidy table with columns `component, direction, rank, phrase, weight`
pub fn phrases_to_table(phrases: &[ComponentPhrase]) -> Table {
    let mut component = Vec::with_capacity(phrases.len());
    let mut direction = Vec::with_capacity(phrases.len());
    let mut rank = Vec::with_capacity(phrases.len());
    let mut phrase = Vec::with_capacity(phrases.len());
    let mut weight = Vec::with_capacity(phrases.len());
    for p in phrases {
        component.push(Value::from(p.component));
        direction.push(Value::from(p.direction.as_str()));
        rank.push(Value::from(p.rank));
        phrase.push(Value::from(p.phrase.as_str()));
        weight.push(Value::from(p.weight));
    }

    let columns = [
        ("component", component),
        ("direction", direction),
        ("rank", rank),
        ("phrase", phrase),
        ("weight", weight),
    ]
    .into_iter()
    .map(|(name, cells)| (name.to_string(), cells))
    .collect();
    Table::from_parts(columns, phrases.len())
}
