//! Uploaded files mapped onto the resource row or onto related rows.

use crate::config::ResolvedResource;
use crate::error::AppError;
use crate::lang::Translator;
use crate::service::{Messages, RelationWriter};
use crate::storage::{FileStorage, UploadedFile};
use crate::store::{Record, Transaction};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Files of one top-level form name.
#[derive(Clone, Debug)]
pub enum FileField {
    /// `avatar`
    Single(UploadedFile),
    /// `photos[]` (no key) or `photos[3]` (key names the related row).
    Many(Vec<(Option<String>, UploadedFile)>),
}

impl FileField {
    pub fn files(&self) -> Vec<&UploadedFile> {
        match self {
            FileField::Single(f) => vec![f],
            FileField::Many(items) => items.iter().map(|(_, f)| f).collect(),
        }
    }

    fn into_single(self) -> Option<UploadedFile> {
        match self {
            FileField::Single(f) => Some(f),
            FileField::Many(mut items) if items.len() == 1 => items.pop().map(|(_, f)| f),
            FileField::Many(_) => None,
        }
    }
}

pub type UploadedFiles = BTreeMap<String, FileField>;

pub struct UploadMapper<'a> {
    resource: &'a ResolvedResource,
    relations: &'a RelationWriter<'a>,
    storage: &'a dyn FileStorage,
    lang: &'a Translator,
    relative_path: String,
}

impl<'a> UploadMapper<'a> {
    pub fn new(
        resource: &'a ResolvedResource,
        relations: &'a RelationWriter<'a>,
        storage: &'a dyn FileStorage,
        lang: &'a Translator,
        default_relative_path: &str,
    ) -> Self {
        let mut relative_path = resource
            .uploads
            .relative_path
            .clone()
            .unwrap_or_else(|| default_relative_path.to_string());
        if !relative_path.is_empty() && !relative_path.ends_with('/') {
            relative_path.push('/');
        }
        UploadMapper {
            resource,
            relations,
            storage,
            lang,
            relative_path,
        }
    }

    fn is_column_target(&self, name: &str) -> bool {
        self.resource.uploads.columns.contains(name)
    }

    /// Every name must target an upload column or a relation, and every file must have
    /// arrived intact; nothing is stored otherwise.
    pub fn check(&self, files: &UploadedFiles) -> Result<(), AppError> {
        for name in files.keys() {
            if !self.is_column_target(name) && self.resource.relation(name).is_none() {
                return Err(AppError::UnknownUploadTarget {
                    name: name.clone(),
                    message: Messages::new(self.lang).file_to_missing_relation(name),
                });
            }
        }
        for field in files.values() {
            if let Some(bad) = field.files().into_iter().find(|f| !f.is_valid()) {
                return Err(AppError::Upload {
                    field: bad.field.clone(),
                    message: Messages::new(self.lang).upload_failed(&bad.field),
                });
            }
        }
        Ok(())
    }

    async fn store(&self, file: &UploadedFile) -> Result<String, AppError> {
        let name = match file.extension() {
            Some(ext) => format!("{}.{}", uuid::Uuid::new_v4().simple(), ext),
            None => uuid::Uuid::new_v4().simple().to_string(),
        };
        let location = format!("{}{}", self.relative_path, name);
        self.storage.put(&location, file.data.clone()).await?;
        tracing::debug!(
            field = %file.field,
            location = %location,
            root = %self.storage.root().display(),
            "upload stored"
        );
        Ok(location)
    }

    fn location_entry(&self, location: String) -> Record {
        let mut entry = Map::new();
        entry.insert(
            self.resource.uploads.location_column.clone(),
            Value::String(location),
        );
        entry
    }

    /// Store the files and write their locations. Returns the parent as last persisted.
    pub async fn apply(
        &self,
        tx: &mut dyn Transaction,
        mut parent: Record,
        files: UploadedFiles,
    ) -> Result<Record, AppError> {
        let mut columns = Record::new();
        for (name, field) in files {
            if self.is_column_target(&name) {
                let file = field.into_single().ok_or_else(|| {
                    AppError::BadRequest(format!("'{}' accepts a single file", name))
                })?;
                let location = self.store(&file).await?;
                columns.insert(name, Value::String(location));
                continue;
            }

            let relation = self.relations.relation(&name)?;
            let data = if relation.association.is_plural() {
                let items = match field {
                    FileField::Single(f) => vec![(None, f)],
                    FileField::Many(items) => items,
                };
                let mut entries = Vec::with_capacity(items.len());
                for (key, file) in items {
                    let mut entry = self.location_entry(self.store(&file).await?);
                    if let Some(key) = key {
                        let related_pk = &self.relations.related_table(relation)?.pk;
                        entry.insert(related_pk.clone(), Value::String(key));
                    }
                    entries.push(Value::Object(entry));
                }
                Value::Array(entries)
            } else {
                let file = field.into_single().ok_or_else(|| {
                    AppError::BadRequest(format!("relation '{}' accepts a single file", name))
                })?;
                Value::Object(self.location_entry(self.store(&file).await?))
            };
            if let Some(updated) = self.relations.upsert(tx, relation, &parent, &data).await? {
                parent = updated;
            }
        }

        if !columns.is_empty() {
            let table = &self.resource.table;
            let id = parent.get(&table.pk).cloned().unwrap_or(Value::Null);
            parent = tx
                .update(table, &id, &columns)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("{} row", table.qualified_name())))?;
        }
        Ok(parent)
    }
}
