use crate::domain::models::{ErrorBody, JsonErr, JsonOut, StepOutcome};
use serde::Serialize;

/// Prints the `{ok, data}` envelope. `ok` is false for reports that carry a failure.
pub fn print_envelope<T: Serialize>(ok: bool, data: T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&JsonOut { ok, data })?);
    Ok(())
}

pub fn print_out<T: Serialize>(
    json: bool,
    data: &[T],
    row: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        return print_envelope(true, data);
    }
    for d in data {
        println!("{}", row(d));
    }
    Ok(())
}

pub fn print_one<T: Serialize>(
    json: bool,
    data: T,
    row: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        return print_envelope(true, data);
    }
    println!("{}", row(&data));
    Ok(())
}

/// Tab-separated text row. A trailing detail column is only added when present.
/// Embedded tabs and newlines are flattened so one record stays on one line.
pub fn tsv_row(fields: &[&str], detail: Option<&str>) -> String {
    fields
        .iter()
        .copied()
        .chain(detail)
        .map(|f| f.replace(['\t', '\n', '\r'], " "))
        .collect::<Vec<_>>()
        .join("\t")
}

pub fn step_row(s: &StepOutcome) -> String {
    tsv_row(&[&s.step, &s.status], s.detail.as_deref())
}

/// Error envelope goes to stdout in JSON mode so callers parse one stream.
pub fn print_error(json: bool, code: &str, message: &str) {
    if json {
        let body = JsonErr {
            ok: false,
            error: ErrorBody {
                code: code.to_string(),
                message: message.to_string(),
            },
        };
        match serde_json::to_string_pretty(&body) {
            Ok(s) => println!("{}", s),
            Err(_) => eprintln!("error: {}", message),
        }
    } else {
        eprintln!("error: {}", message);
    }
}
