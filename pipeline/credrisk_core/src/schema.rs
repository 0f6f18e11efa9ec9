//! Canonical feature ordering.
//!
//! The order here is the coordinate system of the whole pipeline: the
//! classifier and the attribution method were fitted against it, so entries
//! must never be reordered.

/// Number of features every vector carries.
pub const FEATURE_COUNT: usize = 10;

/// One schema entry: the external input field and the training column it
/// feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feature {
    /// Field name as submitted by the form layer.
    pub field: &'static str,
    /// Column name the classifier was trained on.
    pub column: &'static str,
}

/// The fixed, ordered feature list.
#[derive(Debug)]
pub struct FeatureSchema {
    features: [Feature; FEATURE_COUNT],
}

/// The process-wide schema instance.
pub static SCHEMA: FeatureSchema = FeatureSchema {
    features: [
        Feature {
            field: "credit_utilization",
            column: "RevolvingUtilizationOfUnsecuredLines",
        },
        Feature {
            field: "applicant_age",
            column: "age",
        },
        Feature {
            field: "late_30_59",
            column: "NumberOfTime30-59DaysPastDueNotWorse",
        },
        Feature {
            field: "debt_ratio",
            column: "DebtRatio",
        },
        Feature {
            field: "monthly_income",
            column: "MonthlyIncome",
        },
        Feature {
            field: "open_credit_lines",
            column: "NumberOfOpenCreditLinesAndLoans",
        },
        Feature {
            field: "late_90",
            column: "NumberOfTimes90DaysLate",
        },
        Feature {
            field: "dependents",
            column: "NumberOfDependents",
        },
        Feature {
            field: "real_estate_loans",
            column: "NumberRealEstateLoansOrLines",
        },
        Feature {
            field: "late_60_89",
            column: "NumberOfTime60-89DaysPastDueNotWorse",
        },
    ],
};

impl FeatureSchema {
    /// Field names in schema order.
    pub fn order(&self) -> impl ExactSizeIterator<Item = &'static str> + '_ {
        self.features.iter().map(|f| f.field)
    }

    /// Training column names in schema order.
    pub fn columns(&self) -> impl ExactSizeIterator<Item = &'static str> + '_ {
        self.features.iter().map(|f| f.column)
    }

    /// All entries in schema order.
    pub fn features(&self) -> &[Feature; FEATURE_COUNT] {
        &self.features
    }

    /// Always [`FEATURE_COUNT`].
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Never true; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Position of `field` in the schema.
    pub fn index_of(&self, field: &str) -> Option<usize> {
        self.features.iter().position(|f| f.field == field)
    }

    /// Training column fed by `field`.
    pub fn column_of(&self, field: &str) -> Option<&'static str> {
        self.features
            .iter()
            .find(|f| f.field == field)
            .map(|f| f.column)
    }

    /// Whether `names` lists this schema's columns (or fields) in order.
    pub fn matches(&self, names: &[String]) -> bool {
        names.len() == FEATURE_COUNT
            && (names.iter().zip(self.columns()).all(|(a, b)| a == b)
                || names.iter().zip(self.order()).all(|(a, b)| a == b))
    }
}
