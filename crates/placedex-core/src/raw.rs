// crates/placedex-core/src/raw.rs
use serde::Deserialize;
use serde_json::{Map, Value};

/// Raw place record as it comes from the catalog's `results` array.
///
/// Only `id` and `name` are interpreted; every other field is carried
/// through to the stored record untouched.
/// {
///   "mindate": "1892-08-01",
///   "maxdate": "2015-05-01",
///   "name": "Washington",
///   "datacoverage": 1,
///   "id": "FIPS:53"
/// }
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceRaw {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// `metadata.resultset` of a paginated response.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultSetRaw {
    pub count: u64,
    #[serde(default)]
    pub offset: Option<u64>,
    #[serde(default)]
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetadataRaw {
    pub resultset: ResultSetRaw,
}

/// Answer to the minimal `limit=1` request used to learn a category's size.
#[derive(Debug, Clone, Deserialize)]
pub struct CountResponse {
    pub metadata: MetadataRaw,
}

/// One page of places. An empty page comes back as `{}`, hence the default.
#[derive(Debug, Clone, Deserialize)]
pub struct PageResponse {
    #[serde(default)]
    pub results: Option<Vec<PlaceRaw>>,
}

/// The `{status, message}` pair the catalog sends when throttling.
/// `status` arrives as a string ("429") but tolerate a number too.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusBody {
    pub status: Value,
    #[serde(default)]
    pub message: String,
}

impl StatusBody {
    pub fn is_rate_limited(&self) -> bool {
        match &self.status {
            Value::String(s) => s.trim() == "429",
            Value::Number(n) => n.as_u64() == Some(429),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn place_keeps_unknown_fields() {
        let raw: PlaceRaw = serde_json::from_str(
            r#"{"id":"FIPS:53","name":"Washington","datacoverage":1,"mindate":"1892-08-01"}"#,
        )
        .unwrap();
        assert_eq!(raw.id.as_deref(), Some("FIPS:53"));
        assert_eq!(raw.name.as_deref(), Some("Washington"));
        assert_eq!(raw.attributes.get("datacoverage"), Some(&Value::from(1)));
        assert!(!raw.attributes.contains_key("id"));
    }

    #[test]
    fn count_and_empty_page() {
        let count: CountResponse =
            serde_json::from_str(r#"{"metadata":{"resultset":{"offset":1,"count":1234,"limit":1}},"results":[]}"#)
                .unwrap();
        assert_eq!(count.metadata.resultset.count, 1234);

        let page: PageResponse = serde_json::from_str("{}").unwrap();
        assert!(page.results.is_none());
    }

    #[test]
    fn status_accepts_string_or_number() {
        let s: StatusBody = serde_json::from_str(r#"{"status":"429","message":"x"}"#).unwrap();
        assert!(s.is_rate_limited());
        let n: StatusBody = serde_json::from_str(r#"{"status":429}"#).unwrap();
        assert!(n.is_rate_limited());
        let ok: StatusBody = serde_json::from_str(r#"{"status":"200"}"#).unwrap();
        assert!(!ok.is_rate_limited());
    }
}
