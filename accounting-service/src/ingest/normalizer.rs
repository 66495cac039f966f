//! Raw spreadsheet rows to canonical record rows.
//!
//! Headers are matched once per batch against a fixed alias table; every row
//! is then read through the resolved column positions. The whole batch fails
//! on the first unusable row so a file is never partially accepted.

use crate::error::IngestError;
use crate::models::FlowType;
use chrono::{Days, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;
use std::str::FromStr;

/// A cell as decoded from the source file, before any interpretation.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
}

impl RawCell {
    fn is_blank(&self) -> bool {
        match self {
            RawCell::Empty => true,
            RawCell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for RawCell {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            RawCell::Empty
        } else {
            RawCell::Text(value.to_string())
        }
    }
}

/// Header row plus data rows of the first worksheet.
#[derive(Debug, Clone, Default)]
pub struct RawSheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<RawCell>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Date,
    Category,
    Subcategory,
    Description,
    FlowType,
    Amount,
    Account,
    Project,
    ProjectCode,
    Counterparty,
    DocumentType,
    DocumentNumber,
    Verified,
    Comments,
}

struct AliasSpec {
    field: Field,
    required: bool,
    /// Canonical header forms; the first one is the name shown in errors.
    aliases: &'static [&'static str],
}

const ALIAS_SPECS: &[AliasSpec] = &[
    AliasSpec {
        field: Field::Date,
        required: true,
        aliases: &["fecha", "date", "fecha_movimiento"],
    },
    AliasSpec {
        field: Field::Category,
        required: true,
        aliases: &["categoria", "category"],
    },
    AliasSpec {
        field: Field::Subcategory,
        required: true,
        aliases: &["subcategoria", "subcategory", "sub_categoria"],
    },
    AliasSpec {
        field: Field::Description,
        required: true,
        aliases: &["descripcion", "description", "concepto", "detalle"],
    },
    AliasSpec {
        field: Field::FlowType,
        required: true,
        aliases: &["tipo", "flow_type", "type", "tipo_movimiento"],
    },
    AliasSpec {
        field: Field::Amount,
        required: true,
        aliases: &["monto", "amount", "importe", "valor"],
    },
    AliasSpec {
        field: Field::Account,
        required: false,
        aliases: &["cuenta", "account"],
    },
    AliasSpec {
        field: Field::Project,
        required: false,
        aliases: &["proyecto", "project"],
    },
    AliasSpec {
        field: Field::ProjectCode,
        required: false,
        aliases: &["codigo_proyecto", "project_code", "cod_proyecto"],
    },
    AliasSpec {
        field: Field::Counterparty,
        required: false,
        aliases: &["emisor_receptor", "counterparty", "tercero"],
    },
    AliasSpec {
        field: Field::DocumentType,
        required: false,
        aliases: &["tipo_documento", "document_type"],
    },
    AliasSpec {
        field: Field::DocumentNumber,
        required: false,
        aliases: &["numero_documento", "document_number", "num_documento", "no_documento"],
    },
    AliasSpec {
        field: Field::Verified,
        required: false,
        aliases: &["verificado", "verified"],
    },
    AliasSpec {
        field: Field::Comments,
        required: false,
        aliases: &["comentarios", "comments", "observaciones"],
    },
];

/// Largest value a NUMERIC(14, 2) column holds.
fn max_amount() -> Decimal {
    Decimal::new(99_999_999_999_999, 2)
}

/// Lower-case, strip accents and unify separators so `Categoría`,
/// `CATEGORIA ` and `codigo proyecto` match their canonical alias.
pub fn canonical_header(header: &str) -> String {
    let mut out = String::with_capacity(header.len());
    for ch in header.trim().chars().flat_map(char::to_lowercase) {
        let folded = match ch {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            ' ' | '-' | '.' | '/' => '_',
            other => other,
        };
        if folded == '_' && out.ends_with('_') {
            continue;
        }
        out.push(folded);
    }
    out
}

/// Column positions of the known fields, resolved once per batch.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    columns: HashMap<Field, usize>,
}

impl ColumnMap {
    pub fn resolve(headers: &[String]) -> Result<Self, IngestError> {
        let mut columns: HashMap<Field, usize> = HashMap::new();

        for (index, header) in headers.iter().enumerate() {
            let canonical = canonical_header(header);
            if canonical.is_empty() {
                continue;
            }
            let Some(spec) = ALIAS_SPECS
                .iter()
                .find(|spec| spec.aliases.contains(&canonical.as_str()))
            else {
                continue;
            };
            if let Some(previous) = columns.insert(spec.field, index) {
                return Err(IngestError::validation(format!(
                    "Columns '{}' and '{}' both map to '{}'; keep only one of them",
                    headers[previous].trim(),
                    header.trim(),
                    spec.aliases[0]
                )));
            }
        }

        let mut missing: Vec<&str> = ALIAS_SPECS
            .iter()
            .filter(|spec| spec.required && !columns.contains_key(&spec.field))
            .map(|spec| spec.aliases[0])
            .collect();
        if !missing.is_empty() {
            missing.sort_unstable();
            return Err(IngestError::validation(format!(
                "Missing required columns: {}",
                missing.join(", ")
            )));
        }

        Ok(Self { columns })
    }

    fn cell<'a>(&self, row: &'a [RawCell], field: Field) -> &'a RawCell {
        static EMPTY: RawCell = RawCell::Empty;
        self.columns
            .get(&field)
            .and_then(|&index| row.get(index))
            .unwrap_or(&EMPTY)
    }
}

/// A spreadsheet row in canonical form, ready for fingerprinting.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    /// Spreadsheet row number (header is row 1).
    pub row_number: usize,
    pub date: NaiveDate,
    pub account: String,
    pub category: String,
    pub subcategory: String,
    pub project: String,
    pub project_code: String,
    pub counterparty: String,
    pub description: String,
    pub document_type: String,
    pub document_number: String,
    pub flow_type: FlowType,
    pub amount: Decimal,
    pub verified: Option<bool>,
    pub comments: String,
}

/// Normalize every non-blank row of `sheet`, preserving file order.
pub fn normalize(sheet: &RawSheet) -> Result<Vec<NormalizedRow>, IngestError> {
    let columns = ColumnMap::resolve(&sheet.headers)?;

    let mut rows = Vec::with_capacity(sheet.rows.len());
    for (index, raw) in sheet.rows.iter().enumerate() {
        if raw.iter().all(RawCell::is_blank) {
            continue;
        }
        let row_number = index + 2;
        rows.push(normalize_row(&columns, raw, row_number)?);
    }

    if rows.is_empty() {
        return Err(IngestError::validation(
            "The file has a header row but no data rows",
        ));
    }

    Ok(rows)
}

fn normalize_row(
    columns: &ColumnMap,
    raw: &[RawCell],
    row_number: usize,
) -> Result<NormalizedRow, IngestError> {
    let text = |field| cell_text(columns.cell(raw, field));

    let date = parse_date(columns.cell(raw, Field::Date))
        .map_err(|message| IngestError::row(row_number, message))?;
    let amount = parse_amount(columns.cell(raw, Field::Amount))
        .map_err(|message| IngestError::row(row_number, message))?;
    let flow_type = match columns.cell(raw, Field::FlowType) {
        RawCell::Text(token) => FlowType::parse(token),
        _ => None,
    }
    .ok_or_else(|| {
        IngestError::row(
            row_number,
            format!(
                "type '{}' must be ingreso or egreso (income or expense)",
                text(Field::FlowType)
            ),
        )
    })?;

    Ok(NormalizedRow {
        row_number,
        date,
        account: text(Field::Account),
        category: text(Field::Category),
        subcategory: text(Field::Subcategory),
        project: text(Field::Project),
        project_code: text(Field::ProjectCode),
        counterparty: text(Field::Counterparty),
        description: text(Field::Description),
        document_type: text(Field::DocumentType),
        document_number: text(Field::DocumentNumber),
        flow_type,
        amount,
        verified: parse_verified(columns.cell(raw, Field::Verified)),
        comments: text(Field::Comments),
    })
}

fn cell_text(cell: &RawCell) -> String {
    match cell {
        RawCell::Empty => String::new(),
        RawCell::Text(s) => s.trim().to_string(),
        RawCell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
        RawCell::Number(n) => n.to_string(),
        RawCell::Bool(b) => b.to_string(),
        RawCell::Date(d) => d.format("%Y-%m-%d").to_string(),
    }
}

/// Day zero of the 1900 date system as used by spreadsheet serials.
fn serial_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default()
}

fn parse_date(cell: &RawCell) -> Result<NaiveDate, String> {
    match cell {
        RawCell::Date(date) => Ok(*date),
        RawCell::Number(serial) if serial.is_finite() && *serial >= 1.0 => serial_epoch()
            .checked_add_days(Days::new(serial.floor() as u64))
            .ok_or_else(|| format!("date serial {} is out of range", serial)),
        RawCell::Text(s) => parse_date_text(s.trim())
            .ok_or_else(|| format!("date '{}' is not a valid date (use YYYY-MM-DD)", s.trim())),
        RawCell::Empty => Err("date is empty".to_string()),
        other => Err(format!("date '{}' is not a valid date", cell_text(other))),
    }
}

/// ISO dates (optionally followed by a time) and day-first local formats.
pub(crate) fn parse_date_text(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }
    const FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];
    if let Some(date) = FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
    {
        return Some(date);
    }
    match (s.get(..10), s.get(10..11)) {
        (Some(day), Some(" " | "T")) => NaiveDate::parse_from_str(day, "%Y-%m-%d").ok(),
        _ => None,
    }
}

fn parse_amount(cell: &RawCell) -> Result<Decimal, String> {
    let value = match cell {
        RawCell::Number(n) if n.is_finite() => {
            Decimal::try_from(*n).map_err(|_| format!("amount {} is out of range", n))?
        }
        RawCell::Text(s) => parse_amount_text(s.trim())
            .ok_or_else(|| format!("amount '{}' is not a number", s.trim()))?,
        RawCell::Empty => return Err("amount is empty".to_string()),
        other => return Err(format!("amount '{}' is not a number", cell_text(other))),
    };

    if value.is_sign_negative() && !value.is_zero() {
        return Err(format!(
            "amount {} is negative; use type egreso for outflows",
            value
        ));
    }

    let mut amount = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    amount.rescale(2);
    amount.set_sign_positive(true);
    if amount > max_amount() {
        return Err(format!("amount {} exceeds the maximum {}", amount, max_amount()));
    }
    Ok(amount)
}

/// Accepts `1234.5`, `1,234.50`, `1.234,50`, `1234,5` and currency symbols.
fn parse_amount_text(s: &str) -> Option<Decimal> {
    let cleaned: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '$' | '€' | '£'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let last_comma = cleaned.rfind(',');
    let last_dot = cleaned.rfind('.');
    let numeric = match (last_comma, last_dot) {
        (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(comma), None) => {
            let decimals = cleaned.len() - comma - 1;
            if cleaned.matches(',').count() == 1 && (1..=2).contains(&decimals) {
                cleaned.replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
        _ => cleaned,
    };

    if numeric.contains(['e', 'E']) {
        Decimal::from_scientific(&numeric).ok()
    } else {
        Decimal::from_str(&numeric).ok()
    }
}

fn parse_verified(cell: &RawCell) -> Option<bool> {
    match cell {
        RawCell::Bool(b) => Some(*b),
        RawCell::Number(n) if *n == 1.0 => Some(true),
        RawCell::Number(n) if *n == 0.0 => Some(false),
        RawCell::Text(s) => match canonical_header(s).as_str() {
            "si" | "yes" | "true" | "1" | "x" | "verificado" => Some(true),
            "no" | "false" | "0" | "pendiente" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
