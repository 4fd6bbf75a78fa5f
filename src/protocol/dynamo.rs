//! DynamoDB query client for the block index

use super::s3::error::from_sdk;
use crate::backend::index::PARTITION_KEY;
use crate::backend::{Backend, BackendError, BackendResult, IndexQuery, IndexRecord};
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::config::Region;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as AwsDynamoClient;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{Number, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::trace;

/// DynamoDB client, cheap to clone
#[derive(Clone)]
pub struct DynamoClient {
    client: AwsDynamoClient,
    timeout: Duration,
}

impl DynamoClient {
    /// Build a client from the standard AWS provider chain.
    ///
    /// Credentials come from the environment, profile or instance metadata;
    /// `region` overrides the chain's region when set.
    pub async fn new(region: Option<String>, timeout: Duration) -> Self {
        let region_provider = match region {
            Some(region) => RegionProviderChain::first_try(Region::new(region)),
            None => RegionProviderChain::default_provider(),
        };
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await;

        let timeout_config = aws_sdk_dynamodb::config::timeout::TimeoutConfig::builder()
            .operation_timeout(timeout)
            .build();
        let config = aws_sdk_dynamodb::config::Builder::from(&aws_config)
            .timeout_config(timeout_config)
            .build();

        Self {
            client: AwsDynamoClient::from_conf(config),
            timeout,
        }
    }
}

#[async_trait]
impl IndexQuery for DynamoClient {
    async fn query_by_multihash(
        &self,
        table: &str,
        multihash: &str,
    ) -> BackendResult<Vec<IndexRecord>> {
        let mut records = Vec::new();
        let mut start_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let response = self
                .client
                .query()
                .table_name(table)
                .key_condition_expression("#pk = :hash")
                .expression_attribute_names("#pk", PARTITION_KEY)
                .expression_attribute_values(":hash", AttributeValue::S(multihash.to_string()))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| from_sdk(Backend::Index, e, self.timeout))?;

            for item in response.items() {
                records.push(item_to_record(item)?);
            }

            match response.last_evaluated_key() {
                Some(key) if !key.is_empty() => {
                    trace!(table, multihash, rows_so_far = records.len(), "querying next page");
                    start_key = Some(key.clone());
                }
                _ => break,
            }
        }

        Ok(records)
    }
}

/// Decode one DynamoDB item into a JSON object
pub fn item_to_record(item: &HashMap<String, AttributeValue>) -> BackendResult<IndexRecord> {
    item.iter()
        .map(|(name, value)| {
            attribute_to_json(value)
                .map(|json| (name.clone(), json))
                .map_err(|reason| {
                    BackendError::malformed(Backend::Index, format!("attribute {}: {}", name, reason))
                })
        })
        .collect()
}

/// Decode a single attribute value
pub fn attribute_to_json(value: &AttributeValue) -> Result<Value, String> {
    Ok(match value {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => Value::Number(parse_number(n)?),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::B(blob) => Value::String(STANDARD.encode(blob.as_ref())),
        AttributeValue::Ss(items) => items.iter().cloned().map(Value::String).collect(),
        AttributeValue::Ns(items) => items
            .iter()
            .map(|n| parse_number(n).map(Value::Number))
            .collect::<Result<_, _>>()?,
        AttributeValue::Bs(items) => items
            .iter()
            .map(|blob| Value::String(STANDARD.encode(blob.as_ref())))
            .collect(),
        AttributeValue::L(items) => items
            .iter()
            .map(attribute_to_json)
            .collect::<Result<_, _>>()?,
        AttributeValue::M(map) => Value::Object(
            map.iter()
                .map(|(k, v)| attribute_to_json(v).map(|json| (k.clone(), json)))
                .collect::<Result<_, _>>()?,
        ),
        other => return Err(format!("unsupported attribute type {:?}", other)),
    })
}

fn parse_number(n: &str) -> Result<Number, String> {
    n.parse::<Number>()
        .map_err(|e| format!("invalid number {:?}: {}", n, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_dynamodb::primitives::Blob;
    use serde_json::json;

    #[test]
    fn test_scalar_attributes() {
        assert_eq!(
            attribute_to_json(&AttributeValue::S("zQm".into())).unwrap(),
            json!("zQm")
        );
        assert_eq!(
            attribute_to_json(&AttributeValue::N("96".into())).unwrap(),
            json!(96)
        );
        assert_eq!(
            attribute_to_json(&AttributeValue::N("1.5".into())).unwrap(),
            json!(1.5)
        );
        assert_eq!(
            attribute_to_json(&AttributeValue::Bool(true)).unwrap(),
            json!(true)
        );
        assert_eq!(
            attribute_to_json(&AttributeValue::Null(true)).unwrap(),
            Value::Null
        );
        assert_eq!(
            attribute_to_json(&AttributeValue::B(Blob::new(vec![1u8, 2, 3]))).unwrap(),
            json!("AQID")
        );
    }

    #[test]
    fn test_nested_attributes() {
        let mut inner = HashMap::new();
        inner.insert("offset".to_string(), AttributeValue::N("10".into()));
        let value = AttributeValue::L(vec![
            AttributeValue::M(inner),
            AttributeValue::Ss(vec!["a".into(), "b".into()]),
        ]);
        assert_eq!(
            attribute_to_json(&value).unwrap(),
            json!([{"offset": 10}, ["a", "b"]])
        );
    }

    #[test]
    fn test_bad_number() {
        assert!(attribute_to_json(&AttributeValue::N("ten".into())).is_err());
    }

    #[test]
    fn test_item_to_record() {
        let mut item = HashMap::new();
        item.insert(
            "blockmultihash".to_string(),
            AttributeValue::S("zQmdf".into()),
        );
        item.insert(
            "carpath".to_string(),
            AttributeValue::S("us-east-2/dotstorage-prod-1/raw/x.car".into()),
        );
        item.insert("length".to_string(), AttributeValue::N("1024".into()));

        let record = item_to_record(&item).unwrap();
        assert_eq!(record["length"], json!(1024));
        assert_eq!(record.len(), 3);
    }

    #[test]
    fn test_item_with_bad_attribute_is_malformed() {
        let mut item = HashMap::new();
        item.insert("offset".to_string(), AttributeValue::N("x".into()));
        let err = item_to_record(&item).unwrap_err();
        assert!(matches!(err, BackendError::Malformed { .. }));
        assert!(err.to_string().contains("offset"));
    }
}
