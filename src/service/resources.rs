//! Resource operations: read pages and records, and run store/update/destroy as one
//! transaction each.

use crate::config::ResolvedResource;
use crate::error::AppError;
use crate::response::Paginator;
use crate::service::{Messages, RelationWriter, RequestValidator, UploadMapper, UploadedFiles};
use crate::state::AppState;
use crate::store::{key_text, Record, Transaction};
use serde_json::Value;

const MAX_PER_PAGE: u32 = 100;

pub struct ResourceService<'a> {
    state: &'a AppState,
    resource: &'a ResolvedResource,
}

impl<'a> ResourceService<'a> {
    pub fn new(state: &'a AppState, resource: &'a ResolvedResource) -> Self {
        ResourceService { state, resource }
    }

    pub fn messages(&self) -> Messages<'a> {
        Messages::new(&self.state.lang)
    }

    /// Page of live records; `per_page` falls back to the resource setting and is capped.
    pub async fn paginate(&self, page: Option<u32>, per_page: Option<u32>) -> Result<Paginator, AppError> {
        let page = page.unwrap_or(1).max(1);
        let per_page = per_page
            .unwrap_or(self.resource.per_page)
            .clamp(1, MAX_PER_PAGE);
        let result = self
            .state
            .store
            .paginate(&self.resource.table, per_page, page)
            .await?;
        Ok(Paginator::new(result.rows, result.total, page, per_page))
    }

    /// Look a record up by route key; trashed rows only when the resource includes them.
    pub async fn find(&self, key: &str) -> Result<Option<Record>, AppError> {
        let castable = self
            .resource
            .table
            .column(&self.resource.route_key)
            .map(|c| c.accepts_text(key))
            .unwrap_or(true);
        if !castable {
            tracing::debug!(resource = %self.resource.name, key = %key, "route key does not fit its column type");
            return Ok(None);
        }
        self.state
            .store
            .find_by(
                &self.resource.table,
                &self.resource.route_key,
                &Value::String(key.to_string()),
                self.resource.with_trashed,
            )
            .await
    }

    /// Validate, then insert the record, its nested relations and its files in one transaction.
    /// Returns the stored record and the success message.
    pub async fn store(&self, fields: Record, files: UploadedFiles) -> Result<(Record, String), AppError> {
        RequestValidator::new(&self.resource.validation, &self.resource.messages).validate(&fields)?;
        let relations = self.relation_writer();
        let nested = relations.extract(&fields)?;
        let uploads = self.upload_mapper(&relations);
        uploads.check(&files)?;

        let mut tx = self.state.store.begin().await?;
        let written = async {
            let data = self.resource.table.fillable(&fields);
            let record = tx.insert(&self.resource.table, &data).await?;
            let record = relations.persist(tx.as_mut(), record, &nested).await?;
            uploads.apply(tx.as_mut(), record, files).await
        }
        .await;
        let record = self
            .finish(tx, written, || self.messages().store_failed())
            .await?;

        let number = key_text(&record, &self.resource.route_key);
        tracing::info!(resource = %self.resource.name, key = %number, "record stored");
        Ok((record, self.messages().store_successful(&number)))
    }

    /// PUT (`partial == false`) checks every rule; PATCH only the submitted fields.
    pub async fn update(
        &self,
        key: &str,
        record: Record,
        fields: Record,
        files: UploadedFiles,
        partial: bool,
    ) -> Result<(Record, String), AppError> {
        let validator = RequestValidator::new(&self.resource.validation, &self.resource.messages);
        if partial {
            validator.validate_partial(&fields)?;
        } else {
            validator.validate(&fields)?;
        }
        let relations = self.relation_writer();
        let nested = relations.extract(&fields)?;
        let uploads = self.upload_mapper(&relations);
        uploads.check(&files)?;

        let table = &self.resource.table;
        let id = record.get(&table.pk).cloned().unwrap_or(Value::Null);
        let mut tx = self.state.store.begin().await?;
        let written = async {
            let mut data = table.fillable(&fields);
            data.remove(&table.pk);
            let record = tx
                .update(table, &id, &data)
                .await?
                .ok_or_else(|| AppError::NotFound(key.to_string()))?;
            let record = relations.persist(tx.as_mut(), record, &nested).await?;
            uploads.apply(tx.as_mut(), record, files).await
        }
        .await;
        let record = self
            .finish(tx, written, || self.messages().update_failed(key))
            .await?;

        tracing::info!(resource = %self.resource.name, key = %key, "record updated");
        Ok((record, self.messages().update_successful(key)))
    }

    /// Soft delete the record when the resource soft-deletes; remove it otherwise.
    /// A record that is already trashed cannot be destroyed again.
    pub async fn destroy(&self, key: &str, record: Record) -> Result<(Record, String), AppError> {
        let table = &self.resource.table;
        if table.is_trashed(&record) {
            tracing::warn!(resource = %self.resource.name, key = %key, "destroy of a trashed record refused");
            return Err(AppError::Refused(self.messages().destroy_failed(key)));
        }
        let id = record.get(&table.pk).cloned().unwrap_or(Value::Null);
        let mut tx = self.state.store.begin().await?;
        let written = async {
            let removed = match &table.soft_delete_column {
                Some(column) => {
                    let mut data = Record::new();
                    data.insert(column.clone(), Value::String(chrono::Utc::now().to_rfc3339()));
                    tx.update(table, &id, &data).await?
                }
                None => tx.delete(table, &id).await?,
            };
            removed.ok_or_else(|| AppError::NotFound(key.to_string()))
        }
        .await;
        let record = self
            .finish(tx, written, || self.messages().destroy_failed(key))
            .await?;

        tracing::info!(resource = %self.resource.name, key = %key, "record destroyed");
        Ok((record, self.messages().destroy_successful(key)))
    }

    fn relation_writer(&self) -> RelationWriter<'a> {
        RelationWriter::new(&self.state.model, self.resource, &self.state.lang)
    }

    fn upload_mapper<'r>(&self, relations: &'r RelationWriter<'a>) -> UploadMapper<'r>
    where
        'a: 'r,
    {
        UploadMapper::new(
            self.resource,
            relations,
            self.state.storage.as_ref(),
            &self.state.lang,
            &self.state.settings.upload_relative_path,
        )
    }

    /// Commit on success. On failure roll back and, unless the request itself was at fault,
    /// replace the error with the templated failure message.
    async fn finish(
        &self,
        tx: Box<dyn Transaction>,
        written: Result<Record, AppError>,
        failure: impl FnOnce() -> String,
    ) -> Result<Record, AppError> {
        let err = match written {
            Ok(record) => match tx.commit().await {
                Ok(()) => return Ok(record),
                Err(e) => e,
            },
            Err(e) => {
                tracing::warn!(resource = %self.resource.name, error = %e, "rolling back transaction");
                if let Err(rollback) = tx.rollback().await {
                    tracing::error!(resource = %self.resource.name, error = %rollback, "rollback failed");
                }
                e
            }
        };
        if err.is_client_error() {
            return Err(err);
        }
        let message = failure();
        tracing::error!(resource = %self.resource.name, error = %err, "{}", message);
        Err(AppError::Failed {
            message,
            source: Box::new(err),
        })
    }
}
