//! `hosts[N][field]` form field encoding.

use std::collections::BTreeMap;

use snowfinch_reconcile::SubmittedRow;
use thiserror::Error;

/// Per-row form fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowField {
    Id,
    Host,
    Destroy,
}

impl RowField {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowField::Id => "id",
            RowField::Host => "host",
            RowField::Destroy => "_destroy",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "id" => Some(RowField::Id),
            "host" => Some(RowField::Host),
            "_destroy" => Some(RowField::Destroy),
            _ => None,
        }
    }
}

/// `hosts[3][host]` and friends.
pub fn field_name(index: usize, field: RowField) -> String {
    format!("hosts[{index}][{}]", field.as_str())
}

fn parse_field_name(name: &str) -> Option<(usize, RowField)> {
    let rest = name.strip_prefix("hosts[")?;
    let (index, rest) = rest.split_once("][")?;
    let field = rest.strip_suffix(']')?;
    Some((index.parse().ok()?, RowField::parse(field)?))
}

fn truthy(value: &str) -> bool {
    matches!(value, "1" | "true" | "on")
}

/// Form fields for `rows`, numbered by position.
pub fn encode_rows(rows: &[SubmittedRow]) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(rows.len() * 2);
    for (index, row) in rows.iter().enumerate() {
        if let Some(id) = &row.id {
            pairs.push((field_name(index, RowField::Id), id.clone()));
        }
        pairs.push((field_name(index, RowField::Host), row.host.clone()));
        if row.destroy {
            pairs.push((field_name(index, RowField::Destroy), "1".to_string()));
        }
    }
    pairs
}

/// Host row fields whose names could not be read.
///
/// Carries the rows that were readable so a rejected form can still be
/// shown with what the user entered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unreadable host row fields: {}", .fields.join(", "))]
pub struct RowDecodeError {
    pub fields: Vec<String>,
    pub rows: Vec<SubmittedRow>,
}

/// Collects host rows from decoded form fields, ordered by row number.
///
/// Row numbers need not be contiguous. Fields outside `hosts[...]` are
/// ignored; if a field repeats, the last value wins. A `hosts[...]` field
/// with an unreadable row number or field is an error, never skipped.
pub fn decode_rows<'a>(
    pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Result<Vec<SubmittedRow>, RowDecodeError> {
    let mut rows: BTreeMap<usize, SubmittedRow> = BTreeMap::new();
    let mut unreadable = Vec::new();

    for (name, value) in pairs {
        if !name.starts_with("hosts[") {
            continue;
        }
        let Some((index, field)) = parse_field_name(name) else {
            unreadable.push(name.to_string());
            continue;
        };
        let row = rows.entry(index).or_default();
        match field {
            RowField::Id => row.id = Some(value.to_string()),
            RowField::Host => row.host = value.to_string(),
            RowField::Destroy => row.destroy = truthy(value),
        }
    }

    let rows = rows.into_values().collect();
    if unreadable.is_empty() {
        Ok(rows)
    } else {
        Err(RowDecodeError {
            fields: unreadable,
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn decode(pairs: &[(&str, &str)]) -> Vec<SubmittedRow> {
        decode_rows(pairs.iter().copied()).unwrap()
    }

    #[test]
    fn test_encode_then_decode_preserves_rows() {
        let rows = vec![
            SubmittedRow {
                id: Some("hst_01HV4Z4NYPLTRS0JTUA8XDME5F".to_string()),
                host: "myspace.com".to_string(),
                destroy: true,
            },
            SubmittedRow::new("jaiku.com"),
        ];
        let pairs = encode_rows(&rows);
        assert_eq!(pairs[0].0, "hosts[0][id]");
        let decoded = decode_rows(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))).unwrap();
        assert_eq!(decoded, rows);
    }

    #[test]
    fn test_rows_ordered_numerically_with_gaps() {
        let rows = decode(&[
            ("name", "Social Media"),
            ("hosts[1700000000123][host]", "twitter.com"),
            ("hosts[10][host]", "facebook.com"),
            ("hosts[9][host]", "aaa.com"),
        ]);
        let hosts: Vec<_> = rows.iter().map(|r| r.host.as_str()).collect();
        assert_eq!(hosts, vec!["aaa.com", "facebook.com", "twitter.com"]);
    }

    #[rstest]
    #[case("1", true)]
    #[case("true", true)]
    #[case("on", true)]
    #[case("0", false)]
    #[case("", false)]
    fn test_destroy_values(#[case] value: &str, #[case] expected: bool) {
        let rows = decode(&[("hosts[0][host]", "x.com"), ("hosts[0][_destroy]", value)]);
        assert_eq!(rows[0].destroy, expected);
    }

    #[test]
    fn test_last_value_wins() {
        // A hidden "0" followed by a checked checkbox.
        let rows = decode(&[
            ("hosts[0][_destroy]", "0"),
            ("hosts[0][_destroy]", "1"),
        ]);
        assert!(rows[0].destroy);
    }

    #[rstest]
    #[case("hosts[x][host]")]
    #[case("hosts[0][color]")]
    #[case("hosts[0]host")]
    #[case("hosts[-1][host]")]
    #[case("hosts[99999999999999999999][host]")]
    fn test_unreadable_host_fields_are_rejected(#[case] name: &str) {
        let err = decode_rows([("hosts[0][host]", "facebook.com"), (name, "lost.com")]).unwrap_err();
        assert_eq!(err.fields, vec![name.to_string()]);
        assert_eq!(err.rows, vec![SubmittedRow::new("facebook.com")]);
    }

    #[rstest]
    #[case("sensor[hosts][0][host]")]
    #[case("host")]
    #[case("commit")]
    fn test_unrelated_fields_ignored(#[case] name: &str) {
        assert!(decode(&[(name, "facebook.com")]).is_empty());
    }
}
