use crate::error::DivebombError;

/// A column of raw input values.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Numeric(Vec<f64>),
    Text(Vec<String>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(values) => values.len(),
            Column::Text(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build a column from text cells, numeric when every non-empty cell parses.
    ///
    /// Empty cells of a numeric column become NaN.
    pub fn infer(cells: Vec<String>) -> Self {
        let numeric: Option<Vec<f64>> = cells
            .iter()
            .map(|cell| {
                let cell = cell.trim();
                if cell.is_empty() {
                    Some(f64::NAN)
                } else {
                    cell.parse::<f64>().ok()
                }
            })
            .collect();

        match numeric {
            Some(values) if cells.iter().any(|c| !c.trim().is_empty()) => Column::Numeric(values),
            _ => Column::Text(cells),
        }
    }
}

/// Named, equally long columns of a tabular depth recording.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    names: Vec<String>,
    columns: Vec<Column>,
}

impl RawTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column. Fails on a duplicate name or a length mismatch.
    pub fn with_column(
        mut self,
        name: impl Into<String>,
        column: Column,
    ) -> Result<Self, DivebombError> {
        let name = name.into();
        if self.names.contains(&name) {
            return Err(DivebombError::InvalidConfig(format!(
                "duplicate column: {name}"
            )));
        }
        if let Some(existing) = self.columns.first() {
            if existing.len() != column.len() {
                return Err(DivebombError::InvalidConfig(format!(
                    "column {name} has {} rows, expected {}",
                    column.len(),
                    existing.len()
                )));
            }
        }
        self.names.push(name);
        self.columns.push(column);
        Ok(self)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.columns[i])
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }
}
