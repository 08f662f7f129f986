use crate::classes::{DamageClass, CLASS_COUNT};
use crate::error::InputError;

/// one image after joining predictions with ground truth
#[derive(Clone, Debug, PartialEq)]
pub struct EvaluationRow {
    pub image: String,
    pub probabilities: [f64; CLASS_COUNT],
    pub flags: [bool; CLASS_COUNT],
}

/// column pair for one class
#[derive(Clone, Debug, Default)]
pub(crate) struct ClassColumn {
    pub(crate) probs: Vec<f64>,
    pub(crate) flags: Vec<bool>,
}

/// joined probability/label table stored column-wise, one column pair per class.
/// immutable after construction; shared read-only by every evaluation.
#[derive(Clone, Debug, Default)]
pub struct EvaluationTable {
    images: Vec<String>,
    columns: [ClassColumn; CLASS_COUNT],
}

impl EvaluationTable {
    /// validate rows and transpose them into columns.
    /// probabilities must be finite and non-negative (values above 1 are accepted).
    pub fn from_rows<I>(rows: I) -> Result<Self, InputError>
    where
        I: IntoIterator<Item = EvaluationRow>,
    {
        profiling::scope!("EvaluationTable::from_rows");
        let mut table = Self::default();
        for row in rows {
            for class in DamageClass::ALL {
                let p = row.probabilities[class.index()];
                if !p.is_finite() || p < 0.0 {
                    return Err(InputError::invalid_probability(&row.image, class, p));
                }
            }
            table.push(row);
        }
        Ok(table)
    }

    fn push(&mut self, row: EvaluationRow) {
        for class in DamageClass::ALL {
            let col = &mut self.columns[class.index()];
            col.probs.push(row.probabilities[class.index()]);
            col.flags.push(row.flags[class.index()]);
        }
        self.images.push(row.image);
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    #[inline]
    pub(crate) fn column(&self, class: DamageClass) -> &ClassColumn {
        &self.columns[class.index()]
    }

    /// rebuild row `i` (mainly for tests and debugging)
    pub fn row(&self, i: usize) -> Option<EvaluationRow> {
        let image = self.images.get(i)?.clone();
        let mut probabilities = [0.0; CLASS_COUNT];
        let mut flags = [false; CLASS_COUNT];
        for class in DamageClass::ALL {
            let col = self.column(class);
            probabilities[class.index()] = col.probs[i];
            flags[class.index()] = col.flags[i];
        }
        Some(EvaluationRow {
            image,
            probabilities,
            flags,
        })
    }
}
