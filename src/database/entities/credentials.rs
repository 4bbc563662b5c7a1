use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Secret referenced by one encrypted connection option. Never shared between data sources.
#[derive(Clone, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "credentials")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Opaque sealed secret; copied byte-for-byte, never decrypted here
    #[sea_orm(column_type = "Text")]
    pub value_ciphertext: String,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

// Keeps ciphertext out of logs.
impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("value_ciphertext", &"<redacted>")
            .finish()
    }
}
