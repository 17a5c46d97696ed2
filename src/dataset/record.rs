//! Record and schema definitions for decoded listings
//!
//! Every listing kind has a fixed, ordered set of columns. A record always
//! carries a value for every column; fields the page did not provide hold the
//! column's sentinel instead of being left out.

/// One column of a listing schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// Stable field name used in code and tests
    pub key: &'static str,

    /// Label written to the header row of the output file
    pub header: &'static str,

    /// Value stored when the page does not provide the field
    pub sentinel: &'static str,
}

impl Column {
    pub const fn new(key: &'static str, header: &'static str, sentinel: &'static str) -> Self {
        Self {
            key,
            header,
            sentinel,
        }
    }
}

/// Ordered set of columns for one listing kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    columns: &'static [Column],
}

impl Schema {
    pub const fn new(columns: &'static [Column]) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &'static [Column] {
        self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Position of a column by key
    pub fn position(&self, key: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.key == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> {
        self.columns.iter().map(|c| c.key)
    }

    /// Starts a record for this schema with every field set to its sentinel
    pub fn record(&self) -> RecordBuilder {
        RecordBuilder {
            schema: *self,
            values: vec![None; self.columns.len()],
        }
    }
}

/// A single decoded listing: field name to text value, in schema order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(&'static str, String)>,
}

impl Record {
    /// Looks up a field by key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Iterates over `(key, value)` pairs in schema order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Collects field values for one record
///
/// Unknown keys are ignored; fields never set fall back to their sentinel.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    schema: Schema,
    values: Vec<Option<String>>,
}

impl RecordBuilder {
    /// Sets a field if the value is present and not blank
    pub fn field(mut self, key: &str, value: Option<String>) -> Self {
        if let (Some(pos), Some(value)) = (self.schema.position(key), value) {
            if !value.trim().is_empty() {
                self.values[pos] = Some(value);
            }
        }
        self
    }

    pub fn build(self) -> Record {
        let fields = self
            .schema
            .columns()
            .iter()
            .zip(self.values)
            .map(|(column, value)| {
                (
                    column.key,
                    value.unwrap_or_else(|| column.sentinel.to_string()),
                )
            })
            .collect();

        Record { fields }
    }
}
