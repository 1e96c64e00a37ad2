use std::sync::Arc;

use sea_orm::{
    ActiveValue, ColumnTrait, Condition, DatabaseConnection, DbBackend, EntityTrait,
    FromQueryResult, QueryFilter, Statement,
    sea_query::{Expr, OnConflict},
};

use crate::{
    error::Result,
    models::storage_contract::{ActiveModel, Column, Entity},
    types::{ContractRelation, ProofCheckUpdate, StorageContractUpsert},
};

#[derive(Clone)]
pub struct ContractRepository {
    conn: Arc<DatabaseConnection>,
}

impl ContractRepository {
    pub fn new(conn: Arc<DatabaseConnection>) -> Self {
        Self { conn }
    }

    /// Fans each discovered contract out into one row per accepting provider.
    /// Re-discovered relations only advance their transaction cursor.
    pub async fn add_storage_contracts(&self, contracts: &[StorageContractUpsert]) -> Result<()> {
        let rows: Vec<ActiveModel> = contracts
            .iter()
            .flat_map(|contract| {
                contract
                    .provider_addresses
                    .iter()
                    .map(|provider_address| ActiveModel {
                        address: ActiveValue::Set(contract.address.clone()),
                        provider_address: ActiveValue::Set(provider_address.clone()),
                        bag_id: ActiveValue::Set(contract.bag_id.to_lowercase()),
                        owner_address: ActiveValue::Set(contract.owner_address.clone()),
                        size: ActiveValue::Set(contract.size),
                        chunk_size: ActiveValue::Set(contract.chunk_size),
                        last_tx_lt: ActiveValue::Set(contract.last_tx_lt),
                        reason: ActiveValue::NotSet,
                        reason_timestamp: ActiveValue::NotSet,
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        if rows.is_empty() {
            return Ok(());
        }

        Entity::insert_many(rows)
            .on_conflict(
                OnConflict::columns([Column::Address, Column::ProviderAddress])
                    .update_column(Column::LastTxLt)
                    .to_owned(),
            )
            .exec(self.conn.as_ref())
            .await?;

        Ok(())
    }

    /// Loads every relation joined with its provider's pubkey; relations
    /// whose provider row is gone are not checkable and are skipped by the
    /// join.
    pub async fn get_relations(&self) -> Result<Vec<ContractRelation>> {
        const SQL: &str = r#"
            SELECT
                p.public_key AS provider_public_key,
                sc.provider_address,
                sc.address AS contract_address,
                sc.bag_id,
                sc.size
            FROM storage_contracts sc
                JOIN providers p ON p.address = sc.provider_address
        "#;

        Ok(ContractRelation::find_by_statement(Statement::from_string(
            DbBackend::Postgres,
            SQL,
        ))
        .all(self.conn.as_ref())
        .await?)
    }

    /// Drops relations whose provider was evicted from the contract's
    /// on-chain provider set. Deleting removes them from all future proof
    /// rounds; the contract's other providers are unaffected.
    pub async fn delete_rejected(&self, rejected: &[ContractRelation]) -> Result<u64> {
        if rejected.is_empty() {
            return Ok(0);
        }

        let mut condition = Condition::any();
        for relation in rejected {
            condition = condition.add(
                Condition::all()
                    .add(Column::Address.eq(relation.contract_address.clone()))
                    .add(Column::ProviderAddress.eq(relation.provider_address.clone())),
            );
        }

        let result = Entity::delete_many()
            .filter(condition)
            .exec(self.conn.as_ref())
            .await?;

        Ok(result.rows_affected)
    }

    /// Latest proof outcomes for one provider's contracts.
    pub async fn get_checks_by_pubkey(
        &self,
        public_key: &str,
    ) -> Result<Vec<crate::types::ContractCheckRow>> {
        const SQL: &str = r#"
            SELECT
                sc.address AS contract_address,
                p.public_key AS provider_public_key,
                sc.bag_id,
                sc.reason,
                sc.reason_timestamp
            FROM storage_contracts sc
                JOIN providers p ON p.address = sc.provider_address
            WHERE p.public_key = $1
        "#;

        Ok(crate::types::ContractCheckRow::find_by_statement(
            Statement::from_sql_and_values(
                DbBackend::Postgres,
                SQL,
                [public_key.to_lowercase().into()],
            ),
        )
        .all(self.conn.as_ref())
        .await?)
    }

    /// Writes the proof outcome per relation.
    pub async fn update_proof_checks(&self, checks: &[ProofCheckUpdate]) -> Result<()> {
        let started = std::time::Instant::now();

        for check in checks {
            let result = Entity::update_many()
                .col_expr(Column::Reason, Expr::value(check.reason))
                .col_expr(Column::ReasonTimestamp, Expr::value(check.checked_at))
                .filter(Column::Address.eq(check.contract_address.clone()))
                .filter(Column::ProviderAddress.eq(check.provider_address.clone()))
                .exec(self.conn.as_ref())
                .await;

            if let Err(err) = result {
                mtp_observability::record_repository_query(
                    "storage_contracts",
                    "update_proof_checks",
                    "error",
                    started.elapsed(),
                );
                return Err(err.into());
            }
        }

        mtp_observability::record_repository_query(
            "storage_contracts",
            "update_proof_checks",
            "ok",
            started.elapsed(),
        );

        Ok(())
    }
}
