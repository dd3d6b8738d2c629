use chrono::{Days, NaiveDate, NaiveTime};
use log::debug;

use crate::config::JournalConfig;
use crate::error::JournalError;
use crate::model::{parse_plain_number, CellValue, RowTable};

/// Return a corrected copy of `table`: designated columns upper-cased, the
/// reversal flag coerced to a number, date columns rewritten as ISO text and
/// grouping columns forward-filled. The input is left untouched.
///
/// Applying it twice yields the same table as applying it once.
pub fn normalize(table: &RowTable, config: &JournalConfig) -> Result<RowTable, JournalError> {
    let mut out = table.clone();

    uppercase_columns(&mut out, &config.uppercase_columns);

    if let Some(ref column) = config.reversal_column {
        coerce_reversal(&mut out, column, config.reversal_default);
    }

    for column in &config.date_columns {
        normalize_dates(&mut out, column, config)?;
    }

    forward_fill(&mut out, &config.grouping_columns());

    debug!("normalized {} rows", out.len());
    Ok(out)
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

fn uppercase_columns(table: &mut RowTable, columns: &[String]) {
    for row in &mut table.rows {
        for column in columns {
            if let CellValue::Text(s) = row.get(column) {
                let upper = s.to_uppercase();
                if &upper != s {
                    row.set(column, CellValue::Text(upper));
                }
            }
        }
    }
}

fn coerce_reversal(table: &mut RowTable, column: &str, default: f64) {
    for row in &mut table.rows {
        let value = row.get(column).as_number().unwrap_or(default);
        row.set(column, CellValue::Number(value));
    }
}

fn normalize_dates(
    table: &mut RowTable,
    column: &str,
    config: &JournalConfig,
) -> Result<(), JournalError> {
    for row in &mut table.rows {
        let cell = row.get(column);
        if cell.is_empty() {
            continue;
        }
        let date = parse_day_first(cell).ok_or_else(|| JournalError::InvalidDateFormat {
            column: column.to_string(),
            row: config.physical_row(row.origin),
            value: cell.as_text(),
        })?;
        row.set(column, CellValue::Text(date.format("%Y-%m-%d").to_string()));
    }
    Ok(())
}

/// Empty cells take the value of the nearest filled cell above them. Leading
/// empty cells stay empty.
fn forward_fill(table: &mut RowTable, columns: &[&str]) {
    for column in columns {
        let mut last: Option<CellValue> = None;
        for row in &mut table.rows {
            let cell = row.get(column);
            if cell.is_empty() {
                match last {
                    Some(ref value) => row.set(column, value.clone()),
                    None => row.set(column, CellValue::Empty),
                }
            } else {
                last = Some(cell.clone());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Date parsing
// ---------------------------------------------------------------------------

/// Parse a cell as a calendar date, reading ambiguous numeric forms day
/// first. Numbers, and text holding a plain number, are spreadsheet serials
/// (1900 date system).
pub fn parse_day_first(cell: &CellValue) -> Option<NaiveDate> {
    match cell {
        CellValue::Date(d) => Some(*d),
        CellValue::Number(n) => from_serial(*n),
        CellValue::Text(s) => parse_date_text(s.trim()),
        CellValue::Empty => None,
    }
}

fn parse_date_text(s: &str) -> Option<NaiveDate> {
    if let Some(serial) = parse_plain_number(s) {
        return from_serial(serial);
    }
    if let Some(date) = parse_numeric_date(s) {
        return Some(date);
    }
    for fmt in ["%d %b %Y", "%d-%b-%Y", "%d %B %Y", "%d-%B-%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }
    None
}

/// `YYYY-MM-DD[ time]`, `YYYY/MM/DD`, or day-first `DD/MM/YY[YY]` with `/`,
/// `-` or `.` separators.
fn parse_numeric_date(s: &str) -> Option<NaiveDate> {
    let (date_part, time_part) = match s.split_once(['T', ' ']) {
        Some((date, time)) => (date, Some(time.trim())),
        None => (s, None),
    };
    let sep = ['/', '-', '.'].into_iter().find(|c| date_part.contains(*c))?;
    let parts: Vec<&str> = date_part.split(sep).collect();
    let all_digits = |p: &&str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
    if parts.len() != 3 || !parts.iter().all(all_digits) {
        return None;
    }
    // A suffix is only accepted after an ISO-style date, and only when it
    // is a time of day.
    if let Some(time) = time_part {
        if parts[0].len() != 4 || !is_time_of_day(time) {
            return None;
        }
    }

    let num = |p: &str| p.parse::<u32>().ok();
    let (year, month, day) = if parts[0].len() == 4 {
        (num(parts[0])? as i32, num(parts[1])?, num(parts[2])?)
    } else {
        let year = match parts[2].len() {
            4 => num(parts[2])? as i32,
            2 => expand_two_digit_year(num(parts[2])?),
            _ => return None,
        };
        (year, num(parts[1])?, num(parts[0])?)
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// `HH:MM`, `HH:MM:SS` or `HH:MM:SS.fff`.
fn is_time_of_day(s: &str) -> bool {
    ["%H:%M:%S%.f", "%H:%M"]
        .iter()
        .any(|fmt| NaiveTime::parse_from_str(s, fmt).is_ok())
}

/// 00-68 → 2000s, 69-99 → 1900s.
fn expand_two_digit_year(yy: u32) -> i32 {
    if yy < 69 {
        2000 + yy as i32
    } else {
        1900 + yy as i32
    }
}

const MAX_SERIAL: f64 = 2_958_465.0; // 9999-12-31

fn from_serial(serial: f64) -> Option<NaiveDate> {
    if !(1.0..=MAX_SERIAL).contains(&serial) {
        return None;
    }
    let days = serial.trunc() as i64;
    // Serial 60 is the phantom 1900-02-29 kept for Lotus compatibility.
    let base = match days {
        60 => return None,
        d if d < 60 => NaiveDate::from_ymd_opt(1899, 12, 31)?,
        _ => NaiveDate::from_ymd_opt(1899, 12, 30)?,
    };
    let offset = if days < 60 { days - 1 } else { days };
    base.checked_add_days(Days::new(offset as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Row;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.into())
    }

    #[test]
    fn day_first_forms() {
        assert_eq!(parse_day_first(&text("31/01/2024")), Some(ymd(2024, 1, 31)));
        assert_eq!(parse_day_first(&text("02/03/2024")), Some(ymd(2024, 3, 2)));
        assert_eq!(parse_day_first(&text("02-03-2024")), Some(ymd(2024, 3, 2)));
        assert_eq!(parse_day_first(&text("02.03.24")), Some(ymd(2024, 3, 2)));
        assert_eq!(parse_day_first(&text("2024-03-02")), Some(ymd(2024, 3, 2)));
        assert_eq!(parse_day_first(&text("2024/03/02")), Some(ymd(2024, 3, 2)));
        assert_eq!(parse_day_first(&text("2024-03-02 00:00:00")), Some(ymd(2024, 3, 2)));
        assert_eq!(parse_day_first(&text("2024-03-02T08:30:00")), Some(ymd(2024, 3, 2)));
        assert_eq!(parse_day_first(&text("2024-03-02 08:30")), Some(ymd(2024, 3, 2)));
        assert_eq!(parse_day_first(&text("2024-03-02 08:30:00.250")), Some(ymd(2024, 3, 2)));
        assert_eq!(parse_day_first(&text("2 Mar 2024")), Some(ymd(2024, 3, 2)));
        assert_eq!(parse_day_first(&text("02-Mar-2024")), Some(ymd(2024, 3, 2)));
    }

    #[test]
    fn impossible_and_garbage_dates_fail() {
        assert_eq!(parse_day_first(&text("31/02/2024")), None);
        assert_eq!(parse_day_first(&text("13/13/2024")), None);
        assert_eq!(parse_day_first(&text("not a date")), None);
        assert_eq!(parse_day_first(&text("02/03/2024 10:00")), None);
        assert_eq!(parse_day_first(&text("1/2")), None);
        assert_eq!(parse_day_first(&text("2024-01-31 garbage")), None);
        assert_eq!(parse_day_first(&text("2024-01-31T")), None);
        assert_eq!(parse_day_first(&text("2024-01-31 25:00")), None);
    }

    #[test]
    fn spreadsheet_serials() {
        assert_eq!(parse_day_first(&CellValue::Number(1.0)), Some(ymd(1900, 1, 1)));
        assert_eq!(parse_day_first(&CellValue::Number(59.0)), Some(ymd(1900, 2, 28)));
        assert_eq!(parse_day_first(&CellValue::Number(61.0)), Some(ymd(1900, 3, 1)));
        assert_eq!(parse_day_first(&CellValue::Number(45322.0)), Some(ymd(2024, 1, 31)));
        assert_eq!(parse_day_first(&CellValue::Number(45322.75)), Some(ymd(2024, 1, 31)));
        assert_eq!(parse_day_first(&CellValue::Number(60.0)), None);
        assert_eq!(parse_day_first(&CellValue::Number(-3.0)), None);
        assert_eq!(parse_day_first(&text("45322")), Some(ymd(2024, 1, 31)));
    }

    fn config() -> JournalConfig {
        JournalConfig::default()
    }

    fn row(origin: usize, cells: &[(&str, &str)]) -> Row {
        cells
            .iter()
            .fold(Row::new(origin), |r, (c, v)| r.with(c, CellValue::parse(v)))
    }

    #[test]
    fn normalize_rewrites_and_fills() {
        let table = RowTable::new(
            vec![],
            vec![
                row(0, &[("Group By", "G1"), ("Site", "uk"), ("AccountingDate", "31/01/2024"), ("Curr", "gbp")]),
                row(1, &[("Reversing Y/N (1=No 2=Yes)", "2"), ("BP", "acme")]),
                row(2, &[("Site", "fr"), ("Reversing Y/N (1=No 2=Yes)", "maybe")]),
            ],
        );
        let out = normalize(&table, &config()).unwrap();

        assert_eq!(out.rows[0].get("Site"), &text("UK"));
        assert_eq!(out.rows[0].get("AccountingDate"), &text("2024-01-31"));
        assert_eq!(out.rows[0].get("Reversing Y/N (1=No 2=Yes)"), &CellValue::Number(1.0));
        assert_eq!(out.rows[1].get("Reversing Y/N (1=No 2=Yes)"), &CellValue::Number(2.0));
        assert_eq!(out.rows[2].get("Reversing Y/N (1=No 2=Yes)"), &CellValue::Number(1.0));
        assert_eq!(out.rows[1].get("BP"), &text("ACME"));

        // forward fill
        assert_eq!(out.rows[1].get("Group By"), &text("G1"));
        assert_eq!(out.rows[1].get("Site"), &text("UK"));
        assert_eq!(out.rows[2].get("Site"), &text("FR"));
        assert_eq!(out.rows[2].get("AccountingDate"), &text("2024-01-31"));
        assert_eq!(out.rows[2].get("Curr"), &text("GBP"));

        // input untouched
        assert_eq!(table.rows[0].get("Site"), &text("uk"));
        assert_eq!(table.rows[1].get("Group By"), &CellValue::Empty);
    }

    #[test]
    fn leading_missing_stays_empty() {
        let table = RowTable::new(
            vec![],
            vec![row(0, &[("Site", "UK")]), row(1, &[("Group By", "G2")])],
        );
        let out = normalize(&table, &config()).unwrap();
        assert_eq!(out.rows[0].get("Group By"), &CellValue::Empty);
        assert_eq!(out.rows[1].get("Site"), &text("UK"));
    }

    #[test]
    fn invalid_date_reports_physical_row() {
        let table = RowTable::new(
            vec![],
            vec![
                row(0, &[("AccountingDate", "01/01/2024")]),
                row(1, &[("VAT date", "31/02/2024")]),
            ],
        );
        let err = normalize(&table, &config()).unwrap_err();
        assert_eq!(
            err,
            JournalError::InvalidDateFormat {
                column: "VAT date".into(),
                row: 3,
                value: "31/02/2024".into(),
            }
        );
    }

    #[test]
    fn numeric_text_is_not_rewritten() {
        let table = RowTable::new(vec![], vec![row(0, &[("Tax", "020"), ("Site", "uk")])]);
        let out = normalize(&table, &config()).unwrap();
        assert_eq!(out.rows[0].get("Tax"), &text("020"));
    }

    #[test]
    fn idempotent() {
        let table = RowTable::new(
            vec![],
            vec![
                row(0, &[("Group By", "a"), ("Site", "uk"), ("AccountingDate", "45322")]),
                row(1, &[("Site", ""), ("VAT date", "2 Mar 2024")]),
            ],
        );
        let once = normalize(&table, &config()).unwrap();
        let twice = normalize(&once, &config()).unwrap();
        assert_eq!(once, twice);
    }
}
