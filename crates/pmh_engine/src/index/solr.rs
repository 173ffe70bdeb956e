use std::time::Duration;

use pmh_core::{IndexRecord, IndexSettings, Query};
use pmh_logging::pmh_debug;
use reqwest::Url;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{FieldValue, IndexQuery, IndexService, QueryResult};
use crate::{IndexError, IndexFailureKind};

/// Index client speaking the Solr JSON select API.
#[derive(Debug, Clone)]
pub struct SolrIndex {
    select_url: Url,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SelectResponse {
    response: ResultBlock,
    #[serde(default)]
    facet_counts: Option<FacetCounts>,
}

#[derive(Debug, Deserialize)]
struct ResultBlock {
    #[serde(rename = "numFound")]
    num_found: u64,
    #[serde(default)]
    docs: Vec<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct FacetCounts {
    #[serde(default)]
    facet_fields: Map<String, Value>,
}

impl SolrIndex {
    pub fn new(settings: &IndexSettings) -> Result<Self, IndexError> {
        let base = settings.url.trim_end_matches('/');
        let select_url = Url::parse(&format!("{base}/select"))
            .map_err(|err| IndexError::new(IndexFailureKind::InvalidUrl, err.to_string()))?;
        let client = build_client(settings.connect_timeout(), settings.request_timeout())?;
        Ok(Self { select_url, client })
    }

    async fn select(&self, params: &[(&str, String)]) -> Result<SelectResponse, IndexError> {
        let mut url = self.select_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("wt", "json");
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }
        pmh_debug!("index select {}", url);

        let response = self.client.get(url).send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(IndexError::new(
                IndexFailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        serde_json::from_slice(&body)
            .map_err(|err| IndexError::new(IndexFailureKind::Decode, err.to_string()))
    }

    async fn facet(&self, field: &str, predicate: &Query) -> Result<Vec<FieldValue>, IndexError> {
        let params = [
            ("q", predicate.to_string()),
            ("rows", "0".to_string()),
            ("facet", "true".to_string()),
            ("facet.field", field.to_string()),
            ("facet.limit", "-1".to_string()),
            ("facet.mincount", "1".to_string()),
            ("facet.sort", "index".to_string()),
        ];
        let response = self.select(&params).await?;
        let counts = response
            .facet_counts
            .as_ref()
            .and_then(|facets| facets.facet_fields.get(field))
            .and_then(Value::as_array)
            .ok_or_else(|| {
                IndexError::new(IndexFailureKind::Decode, format!("no facet for {field}"))
            })?;
        // Solr lays facet results out flat: [value, count, value, count, ...].
        Ok(counts
            .chunks(2)
            .filter_map(|pair| match pair {
                [value, count] => Some(FieldValue {
                    value: scalar_to_string(value)?,
                    count: count.as_u64()?,
                }),
                _ => None,
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl IndexService for SolrIndex {
    async fn query(&self, query: &IndexQuery) -> Result<QueryResult, IndexError> {
        let sort = query
            .sort
            .iter()
            .map(|(field, order)| format!("{field} {}", order.as_str()))
            .collect::<Vec<_>>()
            .join(",");
        let mut params = vec![
            ("q", query.predicate.to_string()),
            ("start", query.offset.to_string()),
            ("rows", query.limit.to_string()),
        ];
        if !sort.is_empty() {
            params.push(("sort", sort));
        }
        let response = self.select(&params).await?;
        Ok(QueryResult {
            total: response.response.num_found,
            records: response.response.docs.iter().map(doc_to_record).collect(),
        })
    }

    async fn distinct_value_count(
        &self,
        field: &str,
        predicate: &Query,
    ) -> Result<u64, IndexError> {
        // A facet count is the number of records holding the value, so the
        // sum is the number of (record, distinct value) pairs.
        Ok(self
            .facet(field, predicate)
            .await?
            .iter()
            .map(|value| value.count)
            .sum())
    }

    async fn field_values(
        &self,
        field: &str,
        predicate: &Query,
    ) -> Result<Vec<FieldValue>, IndexError> {
        self.facet(field, predicate).await
    }
}

fn build_client(
    connect_timeout: Duration,
    request_timeout: Duration,
) -> Result<reqwest::Client, IndexError> {
    reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(request_timeout)
        .build()
        .map_err(|err| IndexError::new(IndexFailureKind::Network, err.to_string()))
}

fn doc_to_record(doc: &Map<String, Value>) -> IndexRecord {
    let mut record = IndexRecord::new();
    for (field, value) in doc {
        match value {
            Value::Array(values) => {
                for value in values.iter().filter_map(scalar_to_string) {
                    record.push(field, value);
                }
            }
            other => {
                if let Some(value) = scalar_to_string(other) {
                    record.push(field, value);
                }
            }
        }
    }
    record
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn map_reqwest_error(err: reqwest::Error) -> IndexError {
    if err.is_timeout() {
        return IndexError::new(IndexFailureKind::Timeout, err.to_string());
    }
    IndexError::new(IndexFailureKind::Network, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn documents_flatten_to_string_values() {
        let doc = json!({
            "PI": "PPN1",
            "ISWORK": true,
            "DATEUPDATED": [1420070400000i64, 1420156799999i64],
            "LANGUAGE": ["de", "en"],
            "NESTED": {"ignored": 1}
        });
        let record = doc_to_record(doc.as_object().unwrap());
        assert_eq!(record.identifier(), Some("PPN1"));
        assert_eq!(record.first("ISWORK"), Some("true"));
        assert_eq!(record.values("LANGUAGE"), ["de", "en"]);
        assert_eq!(record.datestamp_millis(), Some(1_420_156_799_999));
        assert!(record.values("NESTED").is_empty());
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let settings = IndexSettings {
            url: "not a url".into(),
            connect_timeout_ms: 10,
            request_timeout_ms: 10,
            max_attempts: 1,
        };
        let err = SolrIndex::new(&settings).unwrap_err();
        assert_eq!(err.kind, IndexFailureKind::InvalidUrl);
    }
}
