//! Collapsing multi-valued request parameters for logging.

use serde::{Serialize, Serializer};

use crate::request::Params;

/// Request parameters with one value per name, in first-seen order.
///
/// Serialises as a JSON object whose keys keep that order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ParamMap(Vec<(String, String)>);

impl ParamMap {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Compact JSON, e.g. `{"name":"Amy"}`.
    pub fn to_json(&self) -> String {
        // String keys and values always serialise.
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_owned())
    }
}

impl Serialize for ParamMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

/// Keeps the first submitted value of every parameter.
///
/// Later values under the same name are dropped: `a=1&a=2` yields `a → 1`.
/// Names submitted without any value are skipped.
pub fn first_values(params: &Params) -> ParamMap {
    ParamMap(
        params
            .iter()
            .filter_map(|(name, values)| {
                values.first().map(|v| (name.to_owned(), v.clone()))
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_value_wins() {
        let params: Params = [("a", "1"), ("a", "2")].into_iter().collect();
        let map = first_values(&params);
        assert_eq!(map.get("a"), Some("1"));
        assert_eq!(map.len(), 1);
        assert_eq!(map.to_json(), r#"{"a":"1"}"#);
    }

    #[test]
    fn empty_params_give_empty_object() {
        let map = first_values(&Params::new());
        assert!(map.is_empty());
        assert_eq!(map.to_json(), "{}");
    }

    #[test]
    fn keys_keep_submission_order() {
        let params: Params = [("z", "1"), ("a", "2"), ("m", "3"), ("z", "4")]
            .into_iter()
            .collect();
        assert_eq!(first_values(&params).to_json(), r#"{"z":"1","a":"2","m":"3"}"#);
    }

    #[test]
    fn values_are_json_escaped() {
        let params: Params = [("q", "say \"hi\"")].into_iter().collect();
        assert_eq!(first_values(&params).to_json(), r#"{"q":"say \"hi\""}"#);
    }
}
