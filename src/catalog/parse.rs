//! Delimited-text catalog parser.
//!
//! One item per record, 48 fields:
//!
//! ```text
//! id, axis, prompt_en, prompt_zh,
//! a_en, a_zh, b_en, b_zh, c_en, c_zh, d_en, d_zh,
//! difficulty, information_value, stage, targets,
//! 32 coefficients (8 archetypes of option A, then B, C, D)
//! ```
//!
//! Quoted fields may contain the delimiter, newlines, and quotes escaped as
//! `""` or `\"`. Rows that fail to parse are reported and skipped.
//! [`render_catalog`] writes the same format back out.

use std::collections::HashSet;

use crate::archetype::{Archetype, Axis, Stage, ARCHETYPE_COUNT};

use super::{Item, ItemOption, LocalizedText, OptionKey, OPTION_COUNT};

const FIXED_FIELDS: usize = 16;
pub const FIELD_COUNT: usize = FIXED_FIELDS + OPTION_COUNT * ARCHETYPE_COUNT;

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    /// 1-based line on which the record starts.
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct ParseReport {
    pub items: Vec<Item>,
    pub skipped: Vec<SkippedRow>,
}

pub fn parse_catalog(text: &str) -> ParseReport {
    parse_catalog_with_delimiter(text, ',')
}

pub fn parse_catalog_with_delimiter(text: &str, delimiter: char) -> ParseReport {
    let mut report = ParseReport::default();
    let mut seen: HashSet<String> = HashSet::new();

    for record in split_records(text, delimiter) {
        let Record { line, fields } = record;
        let first = fields.first().map(|f| f.trim()).unwrap_or("");
        if fields.len() == 1 && first.is_empty() {
            continue;
        }
        if first.starts_with('#') || first.eq_ignore_ascii_case("id") {
            continue;
        }

        match parse_item(&fields) {
            Ok(item) => {
                if !seen.insert(item.id.clone()) {
                    report.skipped.push(SkippedRow {
                        line,
                        reason: format!("duplicate item id '{}'", item.id),
                    });
                    continue;
                }
                if item.has_degenerate_impacts() {
                    tracing::warn!(
                        item_id = %item.id,
                        line,
                        "item carries non-positive impact coefficients"
                    );
                }
                report.items.push(item);
            }
            Err(reason) => report.skipped.push(SkippedRow { line, reason }),
        }
    }

    for row in &report.skipped {
        tracing::warn!(line = row.line, reason = %row.reason, "skipped catalog row");
    }
    report
}

/// Render items in the catalog text format, header row first.
pub fn render_catalog(items: &[Item]) -> String {
    let mut out = String::from("id,axis,prompt_en,prompt_zh");
    for key in OptionKey::ALL {
        let k = key.as_str().to_ascii_lowercase();
        out.push_str(&format!(",{k}_en,{k}_zh"));
    }
    out.push_str(",difficulty,information_value,stage,targets");
    for key in OptionKey::ALL {
        for a in Archetype::ALL {
            out.push_str(&format!(",{}_{}", key.as_str().to_ascii_lowercase(), a.as_str()));
        }
    }
    out.push('\n');

    for item in items {
        let mut fields: Vec<String> = vec![
            item.id.clone(),
            item.axis.as_str().to_string(),
            item.prompt.en.clone(),
            item.prompt.zh.clone(),
        ];
        for option in &item.options {
            fields.push(option.text.en.clone());
            fields.push(option.text.zh.clone());
        }
        fields.push(item.difficulty.to_string());
        fields.push(item.information_value.to_string());
        fields.push(item.stage.map(|s| s.as_str().to_string()).unwrap_or_default());
        fields.push(
            item.targets
                .iter()
                .map(|a| a.as_str())
                .collect::<Vec<_>>()
                .join(";"),
        );
        for option in &item.options {
            fields.extend(option.impacts.iter().map(|c| c.to_string()));
        }

        let line: Vec<String> = fields.iter().map(|f| quote_field(f)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

fn quote_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

// ---------------------------------------------------------------------
//  Record splitting
// ---------------------------------------------------------------------

#[derive(Debug)]
struct Record {
    line: usize,
    fields: Vec<String>,
}

fn split_records(text: &str, delimiter: char) -> Vec<Record> {
    let mut records = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1usize;
    let mut record_line = 1usize;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '\\' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push('\n');
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
            }
            c if c == delimiter => fields.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                fields.push(std::mem::take(&mut field));
                records.push(Record {
                    line: record_line,
                    fields: std::mem::take(&mut fields),
                });
                line += 1;
                record_line = line;
            }
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        records.push(Record {
            line: record_line,
            fields,
        });
    }
    records
}

// ---------------------------------------------------------------------
//  Field decoding
// ---------------------------------------------------------------------

fn parse_item(fields: &[String]) -> Result<Item, String> {
    if fields.len() != FIELD_COUNT {
        return Err(format!(
            "expected {FIELD_COUNT} fields, found {}",
            fields.len()
        ));
    }
    let f = |i: usize| fields[i].trim();

    let id = f(0).to_string();
    if id.is_empty() {
        return Err("empty item id".to_string());
    }
    let axis: Axis = f(1).parse()?;
    let prompt = LocalizedText::new(f(2), f(3));

    let difficulty = parse_number(f(12), "difficulty")?;
    let information_value = parse_number(f(13), "information_value")?;

    let stage = if f(14).is_empty() {
        None
    } else {
        Some(f(14).parse::<Stage>()?)
    };

    let targets = parse_targets(f(15))?;

    let mut options = Vec::with_capacity(OPTION_COUNT);
    for (o, key) in OptionKey::ALL.iter().enumerate() {
        let text = LocalizedText::new(f(4 + 2 * o), f(5 + 2 * o));
        let mut impacts = [0.0; ARCHETYPE_COUNT];
        for (a, slot) in impacts.iter_mut().enumerate() {
            let idx = FIXED_FIELDS + o * ARCHETYPE_COUNT + a;
            *slot = parse_number(f(idx), "coefficient")?;
            if *slot < 0.0 {
                return Err(format!("negative coefficient in field {}", idx + 1));
            }
        }
        options.push(ItemOption {
            key: *key,
            text,
            impacts,
        });
    }
    let options: [ItemOption; OPTION_COUNT] = options
        .try_into()
        .map_err(|_| "option count mismatch".to_string())?;

    Ok(Item {
        id,
        axis,
        prompt,
        options,
        difficulty,
        information_value,
        stage,
        targets,
    })
}

fn parse_number(raw: &str, what: &str) -> Result<f64, String> {
    let v: f64 = raw
        .parse()
        .map_err(|_| format!("non-numeric {what} '{raw}'"))?;
    if !v.is_finite() {
        return Err(format!("non-finite {what} '{raw}'"));
    }
    Ok(v)
}

fn parse_targets(raw: &str) -> Result<Vec<Archetype>, String> {
    let mut out = Vec::new();
    for part in raw.split(|c| c == ';' || c == '|' || c == ',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let a: Archetype = part.parse()?;
        if !out.contains(&a) {
            out.push(a);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, prompt_en: &str, coeff: &str) -> String {
        let mut fields: Vec<String> = vec![
            id.to_string(),
            "intrinsic".to_string(),
            prompt_en.to_string(),
            "提示".to_string(),
        ];
        for o in ["a", "b", "c", "d"] {
            fields.push(format!("option {o}"));
            fields.push(format!("选项 {o}"));
        }
        fields.extend(["0.5", "0.6", "exploration", "qian;kun"].map(String::from));
        for _ in 0..32 {
            fields.push(coeff.to_string());
        }
        fields.join(",")
    }

    #[test]
    fn parses_well_formed_row() {
        let text = row("i1", "Hello", "0.5");
        let report = parse_catalog(&text);
        assert!(report.skipped.is_empty(), "{:?}", report.skipped);
        assert_eq!(report.items.len(), 1);
        let item = &report.items[0];
        assert_eq!(item.id, "i1");
        assert_eq!(item.axis, Axis::Intrinsic);
        assert_eq!(item.stage, Some(Stage::Exploration));
        assert_eq!(item.targets, vec![Archetype::Qian, Archetype::Kun]);
        assert_eq!(item.option(OptionKey::C).text.en, "option c");
        assert!((item.information_value - 0.6).abs() < 1e-12);
    }

    #[test]
    fn quoted_fields_keep_delimiters_and_escaped_quotes() {
        let text = row("i1", r#""Say ""hi"", then \"bye\"""#, "0.5");
        let report = parse_catalog(&text);
        assert_eq!(report.items.len(), 1, "{:?}", report.skipped);
        assert_eq!(report.items[0].prompt.en, r#"Say "hi", then "bye""#);
    }

    #[test]
    fn quoted_field_may_span_lines() {
        let text = row("i1", "\"two\nlines\"", "0.5");
        let text = format!("{text}\n{}", row("i2", "next", "0.5"));
        let report = parse_catalog(&text);
        assert_eq!(report.items.len(), 2, "{:?}", report.skipped);
        assert_eq!(report.items[0].prompt.en, "two\nlines");
    }

    #[test]
    fn malformed_rows_are_skipped_not_fatal() {
        let good = row("good", "ok", "0.5");
        let bad_number = row("bad_number", "ok", "abc");
        let short = "short,intrinsic,only three".to_string();
        let text = format!(
            "# comment\nid,axis,header\n{good}\n{bad_number}\n\n{short}\n{}",
            row("good", "dup", "0.5")
        );
        let report = parse_catalog(&text);
        assert_eq!(report.items.len(), 1);
        assert_eq!(report.items[0].id, "good");
        assert_eq!(report.skipped.len(), 3);
        assert!(report.skipped[0].reason.contains("non-numeric"));
        assert_eq!(report.skipped[0].line, 4);
        assert!(report.skipped[1].reason.contains("expected 48 fields"));
        assert!(report.skipped[2].reason.contains("duplicate"));
    }

    #[test]
    fn zero_coefficients_are_kept() {
        let report = parse_catalog(&row("zero", "ok", "0"));
        assert_eq!(report.items.len(), 1);
        assert!(report.items[0].has_degenerate_impacts());
    }

    #[test]
    fn tab_delimiter_is_supported() {
        let text = row("t1", "tabbed", "0.4").replace(',', "\t");
        let report = parse_catalog_with_delimiter(&text, '\t');
        assert_eq!(report.items.len(), 1, "{:?}", report.skipped);
        assert_eq!(report.items[0].targets, vec![Archetype::Qian, Archetype::Kun]);
    }

    #[test]
    fn rendered_catalog_parses_back() {
        let items = crate::catalog::defaults::default_catalog().items().to_vec();
        let mut tricky = items[0].clone();
        tricky.id = "tricky".to_string();
        tricky.prompt.en = "Commas, \"quotes\"\nand lines".to_string();
        let mut all = items.clone();
        all.push(tricky.clone());

        let report = parse_catalog(&render_catalog(&all));
        assert!(report.skipped.is_empty(), "{:?}", report.skipped);
        assert_eq!(report.items.len(), all.len());
        assert_eq!(report.items.last(), Some(&tricky));
        assert_eq!(report.items[..items.len()], items[..]);
    }
}
