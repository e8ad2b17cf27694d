use crate::error::{ReportError, Result};
use serde_json::Value;
use std::path::Path;

/// Markers treated as missing values in addition to an empty cell
const NULL_MARKERS: &[&str] = &["NaN", "nan", "NA", "N/A", "null", "NULL", "None"];

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// A single typed cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    /// Parsed value plus the trimmed source text, kept for labels
    Number(f64, String),
    Text(String),
}

impl Cell {
    /// Type a raw field: empty or a null marker is `Null`, a finite float is `Number`
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || NULL_MARKERS.contains(&trimmed) {
            return Cell::Null;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Cell::Number(n, trimmed.to_string()),
            _ => Cell::Text(trimmed.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(n, _) => Some(*n),
            _ => None,
        }
    }

    /// The cell as a category label, exactly as written in the input
    pub fn as_label(&self) -> Option<String> {
        match self {
            Cell::Null => None,
            Cell::Number(_, raw) | Cell::Text(raw) => Some(raw.clone()),
        }
    }
}

/// Format a number without a trailing `.0` for integral values
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Parsed input table with named columns
#[derive(Debug, Clone)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { headers, rows }
    }

    /// Parse delimited text. The bytes must be UTF-8; a leading BOM is ignored.
    pub fn from_csv_bytes(bytes: &[u8], delimiter: u8) -> Result<Self> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        if let Err(e) = std::str::from_utf8(bytes) {
            return Err(ReportError::Parse(format!(
                "input is not valid UTF-8 (first invalid byte at offset {})",
                e.valid_up_to()
            )));
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(ReportError::Parse("missing header row".to_string()));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(Cell::parse).collect());
        }

        Ok(Self { headers, rows })
    }

    /// Read and parse a delimited file
    pub fn from_path(path: &Path, delimiter: u8) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_csv_bytes(&bytes, delimiter)
    }

    /// Create a table from a JSON array of flat objects
    pub fn from_json(value: &Value) -> Result<Self> {
        let array = value
            .as_array()
            .ok_or_else(|| ReportError::Parse("input data must be a JSON array of objects".to_string()))?;

        let Some(first) = array.first() else {
            return Err(ReportError::Parse("input data array is empty".to_string()));
        };

        // Headers come from the first object
        let first_obj = first
            .as_object()
            .ok_or_else(|| ReportError::Parse("items in array must be objects".to_string()))?;
        let headers: Vec<String> = first_obj.keys().cloned().collect();

        let mut rows = Vec::with_capacity(array.len());
        for item in array {
            let obj = item
                .as_object()
                .ok_or_else(|| ReportError::Parse("items in array must be objects".to_string()))?;

            let mut row = Vec::with_capacity(headers.len());
            for header in &headers {
                let cell = match obj.get(header) {
                    Some(Value::String(s)) => Cell::parse(s),
                    Some(Value::Number(n)) => n
                        .as_f64()
                        .map(|f| Cell::Number(f, n.to_string()))
                        .unwrap_or(Cell::Null),
                    Some(Value::Bool(b)) => Cell::Text(b.to_string()),
                    Some(Value::Null) | None => Cell::Null,
                    _ => {
                        return Err(ReportError::Parse(format!(
                            "unsupported value type for field '{}'",
                            header
                        )))
                    }
                };
                row.push(cell);
            }
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    /// Case-insensitive header lookup
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&Cell::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cell_typing() {
        assert_eq!(Cell::parse(""), Cell::Null);
        assert_eq!(Cell::parse("  NaN "), Cell::Null);
        assert_eq!(Cell::parse(" 12.5 "), Cell::Number(12.5, "12.5".to_string()));
        assert_eq!(Cell::parse("月曜日"), Cell::Text("月曜日".to_string()));
        assert_eq!(Cell::parse("inf"), Cell::Text("inf".to_string()));
    }

    #[test]
    fn test_label_keeps_source_text() {
        assert_eq!(Cell::parse("001").as_label().unwrap(), "001");
        assert_eq!(Cell::parse("1.50").as_label().unwrap(), "1.50");
        assert_eq!(Cell::parse("1.50").as_f64(), Some(1.5));
        assert_eq!(Cell::Null.as_label(), None);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(0.15), "0.15");
    }

    #[test]
    fn test_from_csv_bytes() {
        let csv = "商品名,単価,数量\nおにぎり,120,3\nパン,,2\n";
        let table = Table::from_csv_bytes(csv.as_bytes(), b',').unwrap();
        assert_eq!(table.headers, vec!["商品名", "単価", "数量"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, 1).as_f64(), Some(120.0));
        assert!(table.cell(1, 1).is_null());
    }

    #[test]
    fn test_from_csv_bytes_strips_bom() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"a,b\n1,2\n");
        let table = Table::from_csv_bytes(&bytes, b',').unwrap();
        assert_eq!(table.column_index("a"), Some(0));
    }

    #[test]
    fn test_from_csv_bytes_rejects_invalid_utf8() {
        // Shift_JIS encoded header
        let bytes = [0x8f, 0xa4, 0x95, 0x69, b',', b'x', b'\n'];
        let err = Table::from_csv_bytes(&bytes, b',').unwrap_err();
        assert!(matches!(err, ReportError::Parse(_)));
        assert!(err.to_string().contains("UTF-8"));
    }

    #[test]
    fn test_from_csv_bytes_rejects_ragged_rows() {
        let csv = "a,b\n1,2\n3,4,5\n";
        let err = Table::from_csv_bytes(csv.as_bytes(), b',').unwrap_err();
        assert!(matches!(err, ReportError::Parse(_)));
    }

    #[test]
    fn test_from_csv_bytes_rejects_empty_input() {
        let err = Table::from_csv_bytes(b"", b',').unwrap_err();
        assert!(err.to_string().contains("header"));
    }

    #[test]
    fn test_header_only_table_is_empty() {
        let table = Table::from_csv_bytes(b"a,b\n", b',').unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_custom_delimiter() {
        let table = Table::from_csv_bytes(b"a;b\n1;2\n", b';').unwrap();
        assert_eq!(table.headers.len(), 2);
        assert_eq!(table.cell(0, 1).as_f64(), Some(2.0));
    }

    #[test]
    fn test_column_index_is_case_insensitive() {
        let table = Table::new(vec!["Unit_Price".to_string()], vec![]);
        assert_eq!(table.column_index("unit_price"), Some(0));
        assert_eq!(table.column_index("price"), None);
    }

    #[test]
    fn test_from_json() {
        let value = json!([
            {"product": "A", "price": 100, "qty": "2"},
            {"product": "B", "price": null, "qty": 4}
        ]);
        let table = Table::from_json(&value).unwrap();
        let price = table.column_index("price").unwrap();
        let qty = table.column_index("qty").unwrap();
        assert_eq!(table.cell(0, price).as_f64(), Some(100.0));
        assert_eq!(table.cell(0, qty).as_f64(), Some(2.0));
        assert!(table.cell(1, price).is_null());
    }

    #[test]
    fn test_from_json_rejects_non_array() {
        assert!(Table::from_json(&json!({"a": 1})).is_err());
        assert!(Table::from_json(&json!([])).is_err());
        assert!(Table::from_json(&json!([{"a": [1, 2]}])).is_err());
    }
}
