use async_trait::async_trait;
use indexmap::IndexMap;
use sea_orm::DatabaseTransaction;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::CoreResult;
use crate::services::credential_service::CredentialService;

/// One option of a data source in one environment
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionValue {
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub encrypted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_id: Option<Uuid>,
}

/// Flattened option record handed to connector option parsers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptionEntry {
    pub key: String,
    pub value: Option<Value>,
    pub encrypted: bool,
    pub credential_id: Option<Uuid>,
}

impl OptionEntry {
    pub fn plain(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value: Some(value),
            encrypted: false,
            credential_id: None,
        }
    }

    pub fn secret(key: impl Into<String>, value: Option<Value>) -> Self {
        Self {
            key: key.into(),
            value,
            encrypted: true,
            credential_id: None,
        }
    }

    /// Drops the credential reference and any inline value of an encrypted entry.
    /// The secret is carried over separately by the credential propagator.
    pub fn without_secret(mut self) -> Self {
        if self.encrypted {
            self.value = None;
            self.credential_id = None;
        }
        self
    }
}

/// Key-ordered connection options, stored as JSON in `data_source_options.options`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionsDocument(IndexMap<String, OptionValue>);

impl OptionsDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(value: &Value) -> Result<Self, serde_json::Error> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value.clone())
    }

    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: OptionValue) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn encrypted(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.iter().filter(|(_, option)| option.encrypted)
    }

    /// Credential rows referenced by encrypted entries
    pub fn credential_ids(&self) -> Vec<Uuid> {
        self.encrypted()
            .filter_map(|(_, option)| option.credential_id)
            .collect()
    }

    pub fn to_entries(&self) -> Vec<OptionEntry> {
        self.0
            .iter()
            .map(|(key, option)| OptionEntry {
                key: key.clone(),
                value: option.value.clone(),
                encrypted: option.encrypted,
                credential_id: option.credential_id,
            })
            .collect()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = OptionEntry>) -> Self {
        Self(
            entries
                .into_iter()
                .map(|entry| {
                    (
                        entry.key,
                        OptionValue {
                            value: entry.value,
                            encrypted: entry.encrypted,
                            credential_id: entry.credential_id,
                        },
                    )
                })
                .collect(),
        )
    }
}

/// Connector-specific conversion of flat option records into a stored document
#[async_trait]
pub trait OptionParser: Send + Sync {
    async fn parse_options_for_create(
        &self,
        entries: Vec<OptionEntry>,
        test_mode: bool,
        txn: &DatabaseTransaction,
    ) -> CoreResult<OptionsDocument>;
}

/// Default parser: every encrypted entry gets its own fresh credential row
#[derive(Clone, Debug, Default)]
pub struct CredentialOptionParser {
    credentials: CredentialService,
}

impl CredentialOptionParser {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OptionParser for CredentialOptionParser {
    async fn parse_options_for_create(
        &self,
        entries: Vec<OptionEntry>,
        test_mode: bool,
        txn: &DatabaseTransaction,
    ) -> CoreResult<OptionsDocument> {
        let mut document = OptionsDocument::new();

        for entry in entries {
            if !entry.encrypted || test_mode {
                document.insert(
                    entry.key,
                    OptionValue {
                        value: entry.value,
                        encrypted: entry.encrypted,
                        credential_id: None,
                    },
                );
                continue;
            }

            let ciphertext = match entry.value {
                Some(Value::String(sealed)) => sealed,
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            };
            let credential = self.credentials.create(&ciphertext, txn).await?;

            document.insert(
                entry.key,
                OptionValue {
                    value: None,
                    encrypted: true,
                    credential_id: Some(credential.id),
                },
            );
        }

        Ok(document)
    }
}
