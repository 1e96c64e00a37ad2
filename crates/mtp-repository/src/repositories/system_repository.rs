use std::sync::Arc;

use sea_orm::{
    ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    sea_query::OnConflict,
};

use crate::{
    error::Result,
    models::system_param::{ActiveModel, Column, Entity},
};

/// Key/value system table. Holds the master-wallet transaction cursor and
/// whatever other scalar state the workers need to survive a restart.
#[derive(Clone)]
pub struct SystemRepository {
    conn: Arc<DatabaseConnection>,
}

impl SystemRepository {
    pub fn new(conn: Arc<DatabaseConnection>) -> Self {
        Self { conn }
    }

    /// Returns the stored value, or `None` when the key was never set.
    pub async fn get_param(&self, key: &str) -> Result<Option<String>> {
        Ok(Entity::find()
            .filter(Column::Key.eq(key))
            .one(self.conn.as_ref())
            .await?
            .map(|row| row.value))
    }

    pub async fn set_param(&self, key: &str, value: &str) -> Result<()> {
        let model = ActiveModel {
            key: ActiveValue::Set(key.to_string()),
            value: ActiveValue::Set(value.to_string()),
        };

        Entity::insert(model)
            .on_conflict(
                OnConflict::column(Column::Key)
                    .update_column(Column::Value)
                    .to_owned(),
            )
            .exec(self.conn.as_ref())
            .await?;

        Ok(())
    }
}
