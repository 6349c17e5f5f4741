//! Data model: sheets, columns, cells, and the views returned to callers.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Number;
use uuid::Uuid;

use crate::type_system::integral;

/// Position of a cell inside its column.
pub type CellIndex = u32;

/// Globally unique sheet identifier, generated when the sheet is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SheetId(Uuid);

impl SheetId {
    /// Generates a fresh identifier.
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for SheetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for SheetId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Boolean,
    Int,
    Double,
    String,
}

impl ColumnType {
    pub const ALL: [ColumnType; 4] = [
        ColumnType::Boolean,
        ColumnType::Int,
        ColumnType::Double,
        ColumnType::String,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Boolean => "boolean",
            ColumnType::Int => "int",
            ColumnType::Double => "double",
            ColumnType::String => "string",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ColumnType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown column type '{}'", s))
    }
}

/// Column declaration used when creating a sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// A literal held by a cell.
///
/// `Int` holds any integral JSON number, including those beyond the `i64`
/// range.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Boolean(bool),
    Int(Number),
    Double(f64),
    String(String),
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Bool(b) => Ok(CellValue::Boolean(b)),
            serde_json::Value::String(s) => Ok(CellValue::String(s)),
            serde_json::Value::Number(n) => match integral(&n) {
                Some(whole) => Ok(CellValue::Int(whole)),
                None => n
                    .as_f64()
                    .map(CellValue::Double)
                    .ok_or_else(|| de::Error::custom(format!("unsupported number {}", n))),
            },
            other => Err(de::Error::custom(format!(
                "cell literal must be a boolean, number or string, got {}",
                other
            ))),
        }
    }
}

impl CellValue {
    pub fn int(value: i64) -> Self {
        CellValue::Int(Number::from(value))
    }

    /// Short name of the runtime kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            CellValue::Boolean(_) => "boolean",
            CellValue::Int(_) => "int",
            CellValue::Double(_) => "double",
            CellValue::String(_) => "string",
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CellValue::Boolean(b) => serde_json::Value::Bool(*b),
            CellValue::Int(n) => serde_json::Value::Number(n.clone()),
            CellValue::Double(d) => serde_json::Value::from(*d),
            CellValue::String(s) => serde_json::Value::String(s.clone()),
        }
    }
}

/// Address of a cell within a sheet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellRef {
    pub column_name: String,
    pub cell_index: CellIndex,
}

impl CellRef {
    pub fn new(column_name: impl Into<String>, cell_index: CellIndex) -> Self {
        Self {
            column_name: column_name.into(),
            cell_index,
        }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.column_name, self.cell_index)
    }
}

/// What a stored cell holds: a literal or a reference to another cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellContent {
    Literal(CellValue),
    Lookup(CellRef),
}

/// One column of a [`SheetGraph`], cells unresolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnGraph {
    pub column_type: ColumnType,
    pub cells: BTreeMap<CellIndex, CellContent>,
}

impl ColumnGraph {
    pub fn new(column_type: ColumnType) -> Self {
        Self {
            column_type,
            cells: BTreeMap::new(),
        }
    }
}

/// One-hop image of a sheet as stored: lookups are edges, not values.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetGraph {
    pub sheet_id: SheetId,
    /// Columns keyed (and therefore ordered) by name.
    pub columns: BTreeMap<String, ColumnGraph>,
}

impl SheetGraph {
    pub fn new(sheet_id: SheetId) -> Self {
        Self {
            sheet_id,
            columns: BTreeMap::new(),
        }
    }

    pub fn with_column(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.columns.insert(name.into(), ColumnGraph::new(column_type));
        self
    }

    /// Inserts or replaces a cell. Returns `false` if the column is unknown.
    pub fn set_cell(&mut self, column: &str, cell_index: CellIndex, content: CellContent) -> bool {
        match self.columns.get_mut(column) {
            Some(col) => {
                col.cells.insert(cell_index, content);
                true
            }
            None => false,
        }
    }

    pub fn cell(&self, cell: &CellRef) -> Option<&CellContent> {
        self.columns
            .get(&cell.column_name)
            .and_then(|col| col.cells.get(&cell.cell_index))
    }

    pub fn cell_count(&self) -> usize {
        self.columns.values().map(|col| col.cells.len()).sum()
    }
}

/// A cell in a resolved view; `value` is the effective value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellView {
    pub cell_index: CellIndex,
    pub value: Option<CellValue>,
}

/// Cell returned by a write, carrying the value actually persisted.
pub type PersistedCell = CellView;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnView {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub cells: Vec<CellView>,
}

impl ColumnView {
    pub fn cell(&self, cell_index: CellIndex) -> Option<&CellView> {
        self.cells.iter().find(|c| c.cell_index == cell_index)
    }
}

/// Resolved sheet returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetView {
    pub sheet_id: SheetId,
    pub columns: Vec<ColumnView>,
}

impl SheetView {
    pub fn column(&self, name: &str) -> Option<&ColumnView> {
        self.columns.iter().find(|c| c.name == name)
    }
}
