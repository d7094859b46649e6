use crate::honeycomb::query::AnalyticsQuery;
use serde::Serialize;
use serde_json::ser::Formatter;
use std::io;

/// Builds a link that opens `query` against `dataset` using Honeycomb's query
/// template links (https://docs.honeycomb.io/investigate/collaborate/share-query/).
///
/// The JSON is appended without URL escaping. Existing shared links were produced
/// with `<`, `>`, `&`, U+2028 and U+2029 escaped as `\uXXXX`, so the encoding does
/// the same to keep links byte-identical.
pub fn query_to_url(
    query: &AnalyticsQuery,
    base_url: &str,
    dataset: &str,
) -> Result<String, serde_json::Error> {
    let json = to_link_json(query)?;
    Ok(format!("{base_url}/datasets/{dataset}?query={json}"))
}

fn to_link_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, LinkSafeFormatter);
    value.serialize(&mut serializer)?;
    String::from_utf8(buf).map_err(|e| serde::ser::Error::custom(e.to_string()))
}

/// Compact JSON with HTML-sensitive characters escaped.
struct LinkSafeFormatter;

impl Formatter for LinkSafeFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (i, c) in fragment.char_indices() {
            let escaped = match c {
                '<' => "\\u003c",
                '>' => "\\u003e",
                '&' => "\\u0026",
                '\u{2028}' => "\\u2028",
                '\u{2029}' => "\\u2029",
                _ => continue,
            };
            writer.write_all(fragment[start..i].as_bytes())?;
            writer.write_all(escaped.as_bytes())?;
            start = i + c.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }

    // Whole floats such as `2.0` are written as `2`, matching existing links.
    fn write_f64<W>(&mut self, writer: &mut W, value: f64) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if value.fract() == 0.0 && value.abs() < 1e21 {
            write!(writer, "{value}")
        } else {
            serde_json::ser::CompactFormatter.write_f64(writer, value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::honeycomb::query::{Calculation, Filter, Having, Order};
    use serde_json::json;

    fn sample_query() -> AnalyticsQuery {
        AnalyticsQuery {
            breakdowns: vec!["http.route".to_string()],
            calculations: vec![
                Calculation {
                    op: "HEATMAP".to_string(),
                    column: Some(json!("duration_ms")),
                },
                Calculation {
                    op: "COUNT".to_string(),
                    column: None,
                },
            ],
            orders: vec![Order {
                op: "COUNT".to_string(),
                order: "descending".to_string(),
                ..Default::default()
            }],
            time_range: 7200,
            ..Default::default()
        }
    }

    #[test]
    fn concatenates_without_url_escaping() {
        let base = "https://ui.honeycomb.io/acme/environments/prod";
        let url = query_to_url(&sample_query(), base, "frontend").unwrap();

        assert_eq!(
            url,
            "https://ui.honeycomb.io/acme/environments/prod/datasets/frontend?query=\
             {\"breakdowns\":[\"http.route\"],\
             \"calculations\":[{\"op\":\"HEATMAP\",\"column\":\"duration_ms\"},{\"op\":\"COUNT\"}],\
             \"orders\":[{\"op\":\"COUNT\",\"order\":\"descending\"}],\
             \"time_range\":7200}"
        );
    }

    #[test]
    fn output_is_stable_across_calls() {
        let query = sample_query();
        let first = query_to_url(&query, "https://ui.honeycomb.io/x", "d").unwrap();
        for _ in 0..10 {
            assert_eq!(query_to_url(&query, "https://ui.honeycomb.io/x", "d").unwrap(), first);
        }
    }

    #[test]
    fn escapes_html_sensitive_characters() {
        let query = AnalyticsQuery {
            filters: vec![Filter {
                op: ">".to_string(),
                column: Some(json!("duration_ms")),
                value: Some(json!("a<b&c")),
            }],
            ..Default::default()
        };
        let url = query_to_url(&query, "https://h", "d").unwrap();
        assert_eq!(
            url,
            r#"https://h/datasets/d?query={"filters":[{"op":"\u003e","column":"duration_ms","value":"a\u003cb\u0026c"}]}"#
        );
    }

    #[test]
    fn whole_floats_drop_the_fraction() {
        let query = AnalyticsQuery {
            filters: vec![Filter {
                op: ">".to_string(),
                column: Some(json!("duration_ms")),
                value: Some(json!(2.0)),
            }],
            havings: vec![Having {
                calculate_op: "P99".to_string(),
                column: Some(json!("duration_ms")),
                op: ">".to_string(),
                value: 250,
            }],
            ..Default::default()
        };
        let url = query_to_url(&query, "https://h", "d").unwrap();
        assert!(url.contains(r#""value":2}"#), "{url}");

        let fractional = AnalyticsQuery {
            filters: vec![Filter {
                op: "=".to_string(),
                column: Some(json!("ratio")),
                value: Some(json!(0.25)),
            }],
            ..Default::default()
        };
        let url = query_to_url(&fractional, "https://h", "d").unwrap();
        assert!(url.contains(r#""value":0.25}"#), "{url}");
    }

    #[test]
    fn decoded_payload_round_trips() {
        let query = sample_query();
        let url = query_to_url(&query, "https://h", "d").unwrap();
        let payload = url.split_once("?query=").unwrap().1;
        let decoded: AnalyticsQuery = serde_json::from_str(payload).unwrap();
        assert_eq!(decoded, query);
    }
}
