use serde_json::Value;
use std::io;

use mortgage_risk_core::amortization::{AmortizationRow, SCHEDULE_COLUMNS};

use super::{flatten, format_scalar, result_of};

/// Write the amortization schedule in the export column layout.
pub fn print_schedule_csv(rows: &[AmortizationRow]) -> Result<(), Box<dyn std::error::Error>> {
    let stdout = io::stdout();
    write_schedule(stdout.lock(), rows)
}

fn write_schedule<W: io::Write>(
    writer: W,
    rows: &[AmortizationRow],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(SCHEDULE_COLUMNS)?;
    for row in rows {
        wtr.write_record(row.to_record())?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write output as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match result_of(value) {
        Value::Object(map) => {
            // Two-column CSV: field, value
            let _ = wtr.write_record(["field", "value"]);
            for (key, val) in flatten(map) {
                let _ = wtr.write_record([key, val]);
            }
        }
        Value::Array(arr) => write_array_csv(&mut wtr, arr),
        other => {
            let _ = wtr.write_record([format_scalar(other)]);
        }
    }

    let _ = wtr.flush();
}

fn write_array_csv<W: io::Write>(wtr: &mut csv::Writer<W>, arr: &[Value]) {
    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(format_scalar).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([format_scalar(item)]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mortgage_risk_core::amortization::build_schedule;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn test_schedule_csv_layout() {
        let rows = build_schedule(dec!(320_000), dec!(6.5), 30).unwrap();
        let mut buffer = Vec::new();
        write_schedule(&mut buffer, &rows).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next(),
            Some("Month,Beginning Balance,Interest,Principal,Ending Balance,Cumulative Interest")
        );
        assert_eq!(
            lines.next(),
            Some("1,320000.00,1733.33,289.28,319710.72,1733.33")
        );
        assert_eq!(text.lines().count(), rows.len() + 1);
    }
}
