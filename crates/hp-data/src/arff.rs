//! ARFF parsing.
//!
//! OpenML serves datasets as ARFF: a header declaring the relation name and
//! typed attributes, followed by a comma-separated `@data` section. Nominal
//! attributes keep their declared category order, which label binarization
//! depends on.

use csv::{ReaderBuilder, Trim};
use hp_types::{Column, ColumnData, DataError, Dataset, HpResult};

#[derive(Debug, Clone, PartialEq)]
enum AttributeKind {
    Numeric,
    Nominal(Vec<String>),
    /// Free text; categories are collected in order of first appearance.
    Text,
}

#[derive(Debug, Clone)]
struct Attribute {
    name: String,
    kind: AttributeKind,
}

/// Parse ARFF text into a [`Dataset`].
pub fn parse_arff(text: &str) -> HpResult<Dataset> {
    let mut relation = String::new();
    let mut attributes = Vec::new();
    let mut data_start = None;

    for (idx, raw) in text.lines().enumerate() {
        let line_num = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('%') {
            continue;
        }

        let lower = line.to_ascii_lowercase();
        if lower.starts_with("@relation") {
            relation = unquote(line["@relation".len()..].trim()).to_string();
        } else if lower.starts_with("@attribute") {
            attributes.push(parse_attribute(&line["@attribute".len()..], line_num)?);
        } else if lower.starts_with("@data") {
            data_start = Some(idx + 1);
            break;
        } else {
            return Err(DataError::ParseError {
                line: line_num,
                message: format!("unexpected header line: {line}"),
            }
            .into());
        }
    }

    let data_start = data_start.ok_or_else(|| DataError::InvalidFormat {
        message: "missing @data section".to_string(),
    })?;
    if attributes.is_empty() {
        return Err(DataError::InvalidFormat {
            message: "no attributes declared".to_string(),
        }
        .into());
    }

    let body: String = text
        .lines()
        .skip(data_start)
        .collect::<Vec<_>>()
        .join("\n");
    let columns = parse_data(&body, data_start, &attributes)?;

    tracing::debug!(
        "Parsed ARFF relation {} with {} attributes and {} rows",
        relation,
        attributes.len(),
        columns.first().map(|c| c.data.len()).unwrap_or(0)
    );

    Ok(Dataset::new(relation, columns))
}

fn parse_attribute(rest: &str, line: usize) -> HpResult<Attribute> {
    let rest = rest.trim();
    let (name, type_spec) = split_name(rest).ok_or_else(|| DataError::ParseError {
        line,
        message: format!("malformed attribute declaration: {rest}"),
    })?;

    let type_spec = type_spec.trim();
    let kind = if type_spec.starts_with('{') {
        let inner = type_spec
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
            .ok_or_else(|| DataError::ParseError {
                line,
                message: format!("unterminated nominal specification for {name}"),
            })?;
        let categories: Vec<String> = split_quoted(inner)
            .into_iter()
            .map(|c| unquote(c.trim()).to_string())
            .collect();
        AttributeKind::Nominal(categories)
    } else {
        match type_spec.to_ascii_lowercase().as_str() {
            "numeric" | "real" | "integer" => AttributeKind::Numeric,
            "string" => AttributeKind::Text,
            other => {
                return Err(DataError::ParseError {
                    line,
                    message: format!("unsupported attribute type {other} for {name}"),
                }
                .into())
            }
        }
    };

    Ok(Attribute { name, kind })
}

/// Split `'name with spaces' type` or `name type` into its two parts.
fn split_name(rest: &str) -> Option<(String, &str)> {
    let first = rest.chars().next()?;
    if first == '\'' || first == '"' {
        let close = rest[1..].find(first)? + 1;
        Some((rest[1..close].to_string(), &rest[close + 1..]))
    } else {
        let end = rest.find(char::is_whitespace)?;
        Some((rest[..end].to_string(), &rest[end..]))
    }
}

/// Split on commas that are not inside single or double quotes.
fn split_quoted(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, ch) in s.char_indices() {
        match (quote, ch) {
            (None, '\'') | (None, '"') => quote = Some(ch),
            (Some(q), c) if c == q => quote = None,
            (None, ',') => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

fn unquote(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() >= 2
        && (bytes[0] == b'\'' || bytes[0] == b'"')
        && bytes[bytes.len() - 1] == bytes[0]
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn parse_data(body: &str, line_offset: usize, attributes: &[Attribute]) -> HpResult<Vec<Column>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .quote(b'\'')
        .comment(Some(b'%'))
        .trim(Trim::All)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut columns: Vec<ColumnData> = attributes
        .iter()
        .map(|a| match &a.kind {
            AttributeKind::Numeric => ColumnData::Numeric(Vec::new()),
            AttributeKind::Nominal(categories) => ColumnData::Nominal {
                categories: categories.clone(),
                codes: Vec::new(),
            },
            AttributeKind::Text => ColumnData::Nominal {
                categories: Vec::new(),
                codes: Vec::new(),
            },
        })
        .collect();

    for result in rdr.records() {
        let record = result.map_err(|e| DataError::InvalidFormat {
            message: format!("failed to read ARFF data record: {e}"),
        })?;
        let line = line_offset + record.position().map(|p| p.line() as usize).unwrap_or(0);

        if record.len() == 1 && record.get(0).map(str::is_empty).unwrap_or(true) {
            continue;
        }
        if record.get(0).map(|f| f.starts_with('{')).unwrap_or(false) {
            return Err(DataError::ParseError {
                line,
                message: "sparse ARFF rows are not supported".to_string(),
            }
            .into());
        }
        if record.len() != attributes.len() {
            return Err(DataError::ParseError {
                line,
                message: format!(
                    "row has {} values, expected {}",
                    record.len(),
                    attributes.len()
                ),
            }
            .into());
        }

        for ((field, attr), column) in record.iter().zip(attributes).zip(columns.iter_mut()) {
            let field = unquote(field);
            let missing = field == "?";
            match column {
                ColumnData::Numeric(values) => {
                    let value = if missing {
                        None
                    } else {
                        Some(field.parse::<f64>().map_err(|e| DataError::ParseError {
                            line,
                            message: format!("invalid numeric value {field:?} for {}: {e}", attr.name),
                        })?)
                    };
                    values.push(value);
                }
                ColumnData::Nominal { categories, codes } => {
                    let code = if missing {
                        None
                    } else if let Some(pos) = categories.iter().position(|c| c == field) {
                        Some(pos)
                    } else if attr.kind == AttributeKind::Text {
                        categories.push(field.to_string());
                        Some(categories.len() - 1)
                    } else {
                        return Err(DataError::ParseError {
                            line,
                            message: format!("value {field:?} is not a category of {}", attr.name),
                        }
                        .into());
                    };
                    codes.push(code);
                }
            }
        }
    }

    Ok(attributes
        .iter()
        .zip(columns)
        .map(|(attr, data)| Column {
            name: attr.name.clone(),
            data,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIABETES_SNIPPET: &str = "\
% Pima Indians Diabetes Database
@relation 'diabetes'
@attribute 'preg' real
@attribute plas numeric
@attribute 'class' { tested_negative, tested_positive}

@data
6,148,tested_positive
1,85,tested_negative
% inline comment
8,?,'tested_positive'
";

    #[test]
    fn parses_header_and_rows() {
        let ds = parse_arff(DIABETES_SNIPPET).unwrap();
        assert_eq!(ds.name, "diabetes");
        assert_eq!(ds.n_columns(), 3);
        assert_eq!(ds.n_rows(), 3);

        match &ds.column("plas").unwrap().data {
            ColumnData::Numeric(values) => assert_eq!(values, &vec![Some(148.0), Some(85.0), None]),
            other => panic!("unexpected plas column: {other:?}"),
        }
    }

    #[test]
    fn nominal_keeps_declared_order() {
        let ds = parse_arff(DIABETES_SNIPPET).unwrap();
        match &ds.column("class").unwrap().data {
            ColumnData::Nominal { categories, codes } => {
                assert_eq!(categories, &vec!["tested_negative", "tested_positive"]);
                assert_eq!(codes, &vec![Some(1), Some(0), Some(1)]);
            }
            other => panic!("unexpected class column: {other:?}"),
        }
    }

    #[test]
    fn quoted_categories_with_commas() {
        let text = "@relation r\n@attribute c {'a,b', \"c\", d}\n@data\n'a,b'\nd\n";
        let ds = parse_arff(text).unwrap();
        match &ds.columns[0].data {
            ColumnData::Nominal { categories, codes } => {
                assert_eq!(categories, &vec!["a,b", "c", "d"]);
                assert_eq!(codes, &vec![Some(0), Some(2)]);
            }
            other => panic!("unexpected column: {other:?}"),
        }
    }

    #[test]
    fn unknown_category_is_error() {
        let text = "@relation r\n@attribute c {x,y}\n@data\nz\n";
        assert!(parse_arff(text).is_err());
    }

    #[test]
    fn wrong_arity_is_error() {
        let text = "@relation r\n@attribute a numeric\n@attribute b numeric\n@data\n1\n";
        assert!(parse_arff(text).is_err());
    }

    #[test]
    fn missing_data_section_is_error() {
        let text = "@relation r\n@attribute a numeric\n";
        assert!(parse_arff(text).is_err());
    }

    #[test]
    fn string_attributes_collect_categories() {
        let text = "@relation r\n@attribute s string\n@data\nfoo\nbar\nfoo\n";
        let ds = parse_arff(text).unwrap();
        match &ds.columns[0].data {
            ColumnData::Nominal { categories, codes } => {
                assert_eq!(categories, &vec!["foo", "bar"]);
                assert_eq!(codes, &vec![Some(0), Some(1), Some(0)]);
            }
            other => panic!("unexpected column: {other:?}"),
        }
    }
}
