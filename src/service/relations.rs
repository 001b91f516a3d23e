//! Nested request data persisted through the resource's declared relations.
//!
//! Object or array valued fields that are not columns are relation payloads. Every payload name
//! is checked before anything is written; then each association kind applies its own upsert.

use crate::config::{Association, Morph, ResolvedModel, ResolvedRelation, ResolvedResource, ResolvedTable};
use crate::error::{AppError, ConfigError};
use crate::lang::Translator;
use crate::service::Messages;
use crate::store::{Record, Transaction};
use serde_json::Value;

/// Identifier taken from request data; empty form strings count as absent.
fn present(v: Option<&Value>) -> Option<Value> {
    match v {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(v) => Some(v.clone()),
    }
}

/// Entries of a plural payload: `{ "1": {...}, "2": {...} }` or `[{...}, {...}]`.
fn entries(data: &Value) -> Vec<(Option<&str>, &Value)> {
    match data {
        Value::Object(map) => map.iter().map(|(k, v)| (Some(k.as_str()), v)).collect(),
        Value::Array(items) => items.iter().map(|v| (None, v)).collect(),
        other => vec![(None, other)],
    }
}

fn loose_eq(a: &Value, b: &Value) -> bool {
    let text = |v: &Value| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    a == b || (!a.is_null() && !b.is_null() && text(a) == text(b))
}

fn scope(column: &str, value: &Value, morph: Option<&Morph>) -> Vec<(String, Value)> {
    let mut filters = vec![(column.to_string(), value.clone())];
    if let Some(m) = morph {
        filters.push((m.type_column.clone(), Value::String(m.class.clone())));
    }
    filters
}

fn stamp(payload: &mut Record, filters: &[(String, Value)]) {
    for (col, val) in filters {
        payload.insert(col.clone(), val.clone());
    }
}

fn key_of(record: &Record, column: &str) -> Result<Value, AppError> {
    present(record.get(column))
        .ok_or_else(|| AppError::BadRequest(format!("record has no value for key '{}'", column)))
}

fn single_object<'v>(data: &'v Value) -> Result<&'v Record, AppError> {
    data.as_object()
        .ok_or_else(|| AppError::BadRequest("expected a single nested record".into()))
}

impl Association {
    /// Write `data` for this association of `parent`. Returns the parent when the write
    /// changed it (belongs_to association of a newly created related row).
    pub async fn upsert(
        &self,
        tx: &mut dyn Transaction,
        parent_table: &ResolvedTable,
        parent: &Record,
        related: &ResolvedTable,
        data: &Value,
    ) -> Result<Option<Record>, AppError> {
        match self {
            Association::OneToOneOwned {
                foreign_key,
                local_key,
                morph,
            } => {
                let filters = scope(foreign_key, &key_of(parent, local_key)?, morph.as_ref());
                let mut payload = related.fillable(single_object(data)?);
                payload.remove(&related.pk);
                stamp(&mut payload, &filters);
                match tx.select_where(related, &filters).await?.into_iter().next() {
                    Some(existing) => {
                        tx.update(related, &key_of(&existing, &related.pk)?, &payload).await?;
                    }
                    None => {
                        tx.insert(related, &payload).await?;
                    }
                }
                Ok(None)
            }
            Association::OneToOneOwning {
                foreign_key,
                owner_key,
            } => {
                let mut payload = related.fillable(single_object(data)?);
                payload.remove(&related.pk);
                let existing = match present(parent.get(foreign_key)) {
                    Some(fk) => tx
                        .select_where(related, &[(owner_key.clone(), fk)])
                        .await?
                        .into_iter()
                        .next(),
                    None => None,
                };
                if let Some(existing) = existing {
                    tx.update(related, &key_of(&existing, &related.pk)?, &payload).await?;
                    return Ok(None);
                }
                let created = tx.insert(related, &payload).await?;
                let mut association = Record::new();
                association.insert(foreign_key.clone(), key_of(&created, owner_key)?);
                let updated = tx
                    .update(parent_table, &key_of(parent, &parent_table.pk)?, &association)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("{} parent row", parent_table.qualified_name())))?;
                Ok(Some(updated))
            }
            Association::OneToManyOwned {
                foreign_key,
                local_key,
                morph,
            } => {
                let filters = scope(foreign_key, &key_of(parent, local_key)?, morph.as_ref());
                for (_, entry) in entries(data) {
                    let mut payload = related.fillable(single_object(entry)?);
                    stamp(&mut payload, &filters);
                    let Some(id) = present(payload.get(&related.pk)) else {
                        payload.remove(&related.pk);
                        tx.insert(related, &payload).await?;
                        continue;
                    };
                    let mut owned = filters.clone();
                    owned.push((related.pk.clone(), id.clone()));
                    if tx.select_where(related, &owned).await?.is_empty() {
                        tx.insert(related, &payload).await?;
                    } else {
                        payload.remove(&related.pk);
                        tx.update(related, &id, &payload).await?;
                    }
                }
                Ok(None)
            }
            Association::ManyToMany {
                pivot,
                foreign_pivot_key,
                related_pivot_key,
                parent_key,
                related_key,
                morph,
            } => {
                let mut ids: Vec<Value> = Vec::new();
                for (key, entry) in entries(data) {
                    let id = match entry {
                        Value::Object(obj) => {
                            let mut payload = related.fillable(obj);
                            let row = match present(payload.get(&related.pk)) {
                                Some(id) => {
                                    payload.remove(&related.pk);
                                    match tx.update(related, &id, &payload).await? {
                                        Some(row) => row,
                                        None => {
                                            payload.insert(related.pk.clone(), id);
                                            tx.insert(related, &payload).await?
                                        }
                                    }
                                }
                                None => {
                                    payload.remove(&related.pk);
                                    tx.insert(related, &payload).await?
                                }
                            };
                            key_of(&row, related_key)?
                        }
                        // `{ "3": "on" }` checkbox maps name the identifier in the key.
                        scalar => match (key, data.is_object()) {
                            (Some(k), true) => Value::String(k.to_string()),
                            _ => match present(Some(scalar)) {
                                Some(id) => id,
                                None => continue,
                            },
                        },
                    };
                    if !ids.iter().any(|known| loose_eq(known, &id)) {
                        ids.push(id);
                    }
                }
                sync_pivot(
                    tx,
                    pivot,
                    &scope(foreign_pivot_key, &key_of(parent, parent_key)?, morph.as_ref()),
                    related_pivot_key,
                    &ids,
                )
                .await?;
                Ok(None)
            }
        }
    }
}

/// Reconcile the join rows of one parent to exactly `ids`.
async fn sync_pivot(
    tx: &mut dyn Transaction,
    pivot: &ResolvedTable,
    owner: &[(String, Value)],
    related_pivot_key: &str,
    ids: &[Value],
) -> Result<(), AppError> {
    let current: Vec<Value> = tx
        .select_where(pivot, owner)
        .await?
        .into_iter()
        .filter_map(|row| row.get(related_pivot_key).cloned())
        .collect();

    let mut detached = 0;
    for old in current.iter().filter(|old| !ids.iter().any(|id| loose_eq(id, old))) {
        let mut filters = owner.to_vec();
        filters.push((related_pivot_key.to_string(), old.clone()));
        detached += tx.delete_where(pivot, &filters).await?;
    }
    let mut attached = 0;
    for id in ids.iter().filter(|id| !current.iter().any(|old| loose_eq(id, old))) {
        let mut row = Record::new();
        stamp(&mut row, owner);
        row.insert(related_pivot_key.to_string(), id.clone());
        tx.insert(pivot, &row).await?;
        attached += 1;
    }
    tracing::debug!(pivot = %pivot.qualified_name(), attached, detached, "synced join rows");
    Ok(())
}

pub struct RelationWriter<'a> {
    model: &'a ResolvedModel,
    resource: &'a ResolvedResource,
    lang: &'a Translator,
}

impl<'a> RelationWriter<'a> {
    pub fn new(model: &'a ResolvedModel, resource: &'a ResolvedResource, lang: &'a Translator) -> Self {
        RelationWriter {
            model,
            resource,
            lang,
        }
    }

    /// Resolve the relation named `name` or fail with the catalog message.
    pub fn relation(&self, name: &str) -> Result<&'a ResolvedRelation, AppError> {
        self.resource
            .relation(name)
            .ok_or_else(|| AppError::UnknownRelation {
                name: name.to_string(),
                message: Messages::new(self.lang).data_to_missing_relation(name),
            })
    }

    pub fn related_table(&self, relation: &ResolvedRelation) -> Result<&'a ResolvedTable, AppError> {
        self.model
            .resource(&relation.related)
            .map(|r| &r.table)
            .ok_or_else(|| {
                AppError::Config(ConfigError::MissingReference {
                    kind: "related resource",
                    id: relation.related.clone(),
                })
            })
    }

    /// Pick the relation payloads out of request data. Fails on the first unknown name,
    /// before anything has been written.
    pub fn extract(&self, data: &Record) -> Result<Vec<(&'a ResolvedRelation, Value)>, AppError> {
        data.iter()
            .filter(|(k, v)| (v.is_object() || v.is_array()) && !self.resource.table.has_column(k))
            .map(|(k, v)| self.relation(k).map(|r| (r, v.clone())))
            .collect()
    }

    pub async fn upsert(
        &self,
        tx: &mut dyn Transaction,
        relation: &ResolvedRelation,
        parent: &Record,
        data: &Value,
    ) -> Result<Option<Record>, AppError> {
        let related = self.related_table(relation)?;
        tracing::debug!(
            resource = %self.resource.name,
            relation = %relation.name,
            kind = relation.kind.as_str(),
            "writing nested relation data"
        );
        relation
            .association
            .upsert(tx, &self.resource.table, parent, related, data)
            .await
    }

    /// Write every payload for `parent`; returns the parent as last persisted.
    pub async fn persist(
        &self,
        tx: &mut dyn Transaction,
        mut parent: Record,
        nested: &[(&'a ResolvedRelation, Value)],
    ) -> Result<Record, AppError> {
        for (relation, data) in nested {
            if let Some(updated) = self.upsert(tx, relation, &parent, data).await? {
                parent = updated;
            }
        }
        Ok(parent)
    }
}
