//! Income and expense totals over a collection of records.

use super::core::Record;

/// The summed income and expenses of a group of records.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Statistics {
    /// The sum of amounts of income records.
    pub income: f64,
    /// The sum of amounts of expense records.
    pub expenses: f64,
}

impl Statistics {
    /// Sum `records` split by the income flag.
    pub fn of<'a>(records: impl IntoIterator<Item = &'a Record>) -> Self {
        records
            .into_iter()
            .fold(Self::default(), |mut totals, record| {
                if record.is_income() {
                    totals.income += record.amount;
                } else {
                    totals.expenses += record.amount;
                }
                totals
            })
    }

    /// The income total with two fraction digits, e.g. "12.00".
    pub fn income_label(&self) -> String {
        format_amount(self.income)
    }

    /// The expense total with two fraction digits, e.g. "3.50".
    pub fn expenses_label(&self) -> String {
        format_amount(self.expenses)
    }

    /// Both totals formatted as `(income, expenses)`.
    pub fn labels(&self) -> (String, String) {
        (self.income_label(), self.expenses_label())
    }
}

/// Format `amount` as fixed-point with two fraction digits and no grouping.
pub fn format_amount(amount: f64) -> String {
    format!("{amount:.2}")
}
