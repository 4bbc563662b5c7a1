use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use tracing::debug;
use uuid::Uuid;

use crate::database::entities::credentials;
use crate::errors::{CoreResult, DataSourceError};
use crate::services::data_source_options::OptionsDocument;

/// Credential rows and the ciphertext propagation used when options are cloned.
///
/// Ciphertext is opaque here: it is stored and copied, never decrypted.
#[derive(Clone, Debug, Default)]
pub struct CredentialService;

impl CredentialService {
    pub fn new() -> Self {
        Self
    }

    pub async fn create<C>(&self, ciphertext: &str, conn: &C) -> CoreResult<credentials::Model>
    where
        C: ConnectionTrait,
    {
        let now = Utc::now();
        let credential = credentials::ActiveModel {
            id: Set(Uuid::new_v4()),
            value_ciphertext: Set(ciphertext.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(conn)
        .await?;

        Ok(credential)
    }

    pub async fn find<C>(&self, id: Uuid, conn: &C) -> CoreResult<credentials::Model>
    where
        C: ConnectionTrait,
    {
        let credential = credentials::Entity::find_by_id(id)
            .one(conn)
            .await?
            .ok_or(DataSourceError::CredentialNotFound(id))?;
        Ok(credential)
    }

    /// Copies the ciphertext of every encrypted option of `source` into the
    /// credential referenced by the same key in `target`. Returns the number
    /// of credentials written.
    pub async fn propagate<C>(
        &self,
        target: &OptionsDocument,
        source: &OptionsDocument,
        conn: &C,
    ) -> CoreResult<usize>
    where
        C: ConnectionTrait,
    {
        let mut copied = 0;

        for (key, option) in target.encrypted() {
            let target_id = option
                .credential_id
                .ok_or_else(|| DataSourceError::MissingCredentialRef(key.to_string()))?;
            let source_id = source
                .get(key)
                .ok_or_else(|| DataSourceError::MissingOption(key.to_string()))?
                .credential_id
                .ok_or_else(|| DataSourceError::MissingCredentialRef(key.to_string()))?;

            let source_credential = self.find(source_id, conn).await?;
            let target_credential = self.find(target_id, conn).await?;

            let mut active: credentials::ActiveModel = target_credential.into();
            active.value_ciphertext = Set(source_credential.value_ciphertext);
            active.updated_at = Set(Utc::now());
            active.update(conn).await?;

            debug!(
                "Propagated credential for option '{}' ({} -> {})",
                key, source_id, target_id
            );
            copied += 1;
        }

        Ok(copied)
    }

    /// Removes the credentials referenced by `document`; missing rows are ignored
    pub async fn delete_for_document<C>(&self, document: &OptionsDocument, conn: &C) -> CoreResult<u64>
    where
        C: ConnectionTrait,
    {
        let ids = document.credential_ids();
        if ids.is_empty() {
            return Ok(0);
        }

        let result = credentials::Entity::delete_many()
            .filter(credentials::Column::Id.is_in(ids))
            .exec(conn)
            .await?;
        Ok(result.rows_affected)
    }
}
