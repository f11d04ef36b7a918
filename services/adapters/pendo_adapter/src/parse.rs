//! Lenient decoding of API item lists

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

/// Items that decoded, each with its raw document, plus a count of the rest
#[derive(Debug)]
pub struct Parsed<T> {
    pub items: Vec<T>,
    pub skipped: usize,
}

/// Decode every item, skipping (and logging) the ones that do not fit `T`
pub fn parse_items<T: DeserializeOwned>(raw: Vec<Value>, context: &str) -> Parsed<(T, Value)> {
    let mut items = Vec::with_capacity(raw.len());
    let mut skipped = 0;

    for value in raw {
        match serde_json::from_value::<T>(value.clone()) {
            Ok(item) => items.push((item, value)),
            Err(e) => {
                skipped += 1;
                let id = value.get("id").and_then(Value::as_str).unwrap_or("<no id>");
                warn!("Skipping {} {}: {}", context, id, e);
            }
        }
    }

    Parsed { items, skipped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use types::Guide;

    #[test]
    fn test_keeps_raw_document() {
        let parsed = parse_items::<Guide>(
            vec![json!({"id": "g1", "extra": 1}), json!({"name": "no id"}), json!(3)],
            "guide",
        );
        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.skipped, 2);
        assert_eq!(parsed.items[0].1["extra"], 1);
    }
}
