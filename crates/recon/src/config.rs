use serde::Deserialize;

pub const DEFAULT_JOURNALS_TABLE: &str = "Journals";
pub const DEFAULT_ATTRIBUTES_TABLE: &str = "journal_attributes";

/// Where the record lives inside a dump.
///
/// Positions are zero-based indices into a tuple of the insert statement.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DumpLayout {
    pub journals_table: String,
    pub attributes_table: String,
    pub identifier_position: usize,
    pub title_position: usize,
    pub attribute_key_position: usize,
    pub attribute_value_position: usize,
}

impl Default for DumpLayout {
    fn default() -> Self {
        Self {
            journals_table: DEFAULT_JOURNALS_TABLE.into(),
            attributes_table: DEFAULT_ATTRIBUTES_TABLE.into(),
            identifier_position: 0,
            title_position: 3,
            attribute_key_position: 1,
            attribute_value_position: 2,
        }
    }
}

impl DumpLayout {
    pub fn validate(&self) -> Result<(), String> {
        if self.journals_table.trim().is_empty() {
            return Err("journals_table must not be empty".into());
        }
        if self.attributes_table.trim().is_empty() {
            return Err("attributes_table must not be empty".into());
        }
        if self.journals_table == self.attributes_table {
            return Err("journals_table and attributes_table must differ".into());
        }
        if self.identifier_position == self.title_position {
            return Err("identifier_position and title_position must differ".into());
        }
        if self.attribute_key_position == self.attribute_value_position {
            return Err("attribute_key_position and attribute_value_position must differ".into());
        }
        Ok(())
    }

    /// Minimum tuple width for a journals row.
    pub fn journals_width(&self) -> usize {
        self.identifier_position.max(self.title_position) + 1
    }

    /// Minimum tuple width for an attributes row.
    pub fn attributes_width(&self) -> usize {
        self.attribute_key_position.max(self.attribute_value_position) + 1
    }
}
