//! Load resource definitions from JSON and resolve them into the runtime model.

use crate::config::resolved::{
    Association, ColumnInfo, Morph, PkType, ResolvedModel, ResolvedRelation, ResolvedResource,
    ResolvedTable, UploadSettings,
};
use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use crate::lang::Translator;
use std::collections::HashMap;
use std::path::Path;

const DEFAULT_SCHEMA: &str = "public";
const DEFAULT_PER_PAGE: u32 = 15;
const DEFAULT_LOCATION_COLUMN: &str = "location";
const DEFAULT_PIVOT_KEY: &str = "id";

/// Read `{ "resources": [...] }` from a JSON file.
pub async fn load_from_path(path: impl AsRef<Path>) -> Result<FullConfig, ConfigError> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    load_from_str(&raw)
}

pub fn load_from_str(raw: &str) -> Result<FullConfig, ConfigError> {
    serde_json::from_str(raw).map_err(|e| ConfigError::Load(e.to_string()))
}

fn pk_type(cfg: &PkTypeConfig) -> PkType {
    match cfg {
        PkTypeConfig::Bigint => PkType::BigInt,
        PkTypeConfig::Int => PkType::Int,
        PkTypeConfig::Uuid => PkType::Uuid,
        PkTypeConfig::Text => PkType::Text,
    }
}

fn resolve_table(r: &ResourceConfig) -> ResolvedTable {
    let pk_type = pk_type(&r.pk_type);
    let mut columns = vec![ColumnInfo {
        name: r.primary_key.clone(),
        pg_type: pk_type.pg_type().to_string(),
        nullable: false,
        has_default: !matches!(pk_type, PkType::Text),
    }];
    for c in &r.columns {
        if c.name() == r.primary_key {
            continue;
        }
        columns.push(match c {
            ColumnConfig::Name(name) => ColumnInfo {
                name: name.clone(),
                pg_type: "text".into(),
                nullable: true,
                has_default: false,
            },
            ColumnConfig::Spec {
                name,
                type_,
                nullable,
                has_default,
            } => ColumnInfo {
                name: name.clone(),
                pg_type: type_.clone().unwrap_or_else(|| "text".into()),
                nullable: *nullable,
                has_default: *has_default,
            },
        });
    }
    if let Some(sd) = &r.soft_delete_column {
        if !columns.iter().any(|c| &c.name == sd) {
            columns.push(ColumnInfo {
                name: sd.clone(),
                pg_type: "timestamptz".into(),
                nullable: true,
                has_default: true,
            });
        }
    }
    ResolvedTable {
        schema: r.schema.clone().unwrap_or_else(|| DEFAULT_SCHEMA.into()),
        name: r.table.clone(),
        pk: r.primary_key.clone(),
        pk_type,
        columns,
        soft_delete_column: r.soft_delete_column.clone(),
    }
}

/// Join tables are described by their key columns only. The row id column is part of the
/// table only when `pivot_key` is configured.
fn pivot_table(
    owner: &ResolvedTable,
    rel: &RelationConfig,
    foreign_pivot_key: &str,
    related_pivot_key: &str,
    morph: Option<&Morph>,
    key_types: (&str, &str),
) -> ResolvedTable {
    let pk = rel.pivot_key.clone().unwrap_or_else(|| DEFAULT_PIVOT_KEY.into());
    let mut columns = Vec::with_capacity(4);
    if rel.pivot_key.is_some() {
        columns.push(ColumnInfo {
            name: pk.clone(),
            pg_type: "bigint".into(),
            nullable: false,
            has_default: true,
        });
    }
    columns.extend([
        ColumnInfo {
            name: foreign_pivot_key.to_string(),
            pg_type: key_types.0.to_string(),
            nullable: false,
            has_default: false,
        },
        ColumnInfo {
            name: related_pivot_key.to_string(),
            pg_type: key_types.1.to_string(),
            nullable: false,
            has_default: false,
        },
    ]);
    if let Some(m) = morph {
        columns.push(ColumnInfo {
            name: m.type_column.clone(),
            pg_type: "text".into(),
            nullable: false,
            has_default: false,
        });
    }
    ResolvedTable {
        schema: rel.pivot_schema.clone().unwrap_or_else(|| owner.schema.clone()),
        name: rel.pivot.clone().unwrap_or_default(),
        pk,
        pk_type: PkType::BigInt,
        columns,
        soft_delete_column: None,
    }
}

fn resolve_relation(
    owner: &ResourceConfig,
    owner_table: &ResolvedTable,
    rel: &RelationConfig,
    tables: &HashMap<&str, ResolvedTable>,
) -> Result<ResolvedRelation, ConfigError> {
    let related = tables.get(rel.related.as_str()).ok_or_else(|| ConfigError::MissingReference {
        kind: "related resource",
        id: rel.related.clone(),
    })?;
    let morph_class = owner.morph_class.clone().unwrap_or_else(|| owner.name.clone());
    let morph = rel.morph_name.as_ref().filter(|_| rel.kind.is_morph()).map(|m| Morph {
        type_column: format!("{}_type", m),
        class: morph_class,
    });
    let local_key = rel.local_key.clone().unwrap_or_else(|| owner_table.pk.clone());
    let owned_fk = || -> String {
        match (&rel.morph_name, rel.kind.is_morph()) {
            (Some(m), true) => format!("{}_id", m),
            _ => rel.foreign_key.clone().unwrap_or_default(),
        }
    };

    let association = match rel.kind {
        RelationKind::HasOne | RelationKind::MorphOne => Association::OneToOneOwned {
            foreign_key: owned_fk(),
            local_key,
            morph,
        },
        RelationKind::HasMany | RelationKind::MorphMany => Association::OneToManyOwned {
            foreign_key: owned_fk(),
            local_key,
            morph,
        },
        RelationKind::BelongsTo => Association::OneToOneOwning {
            foreign_key: rel.foreign_key.clone().unwrap_or_default(),
            owner_key: rel.owner_key.clone().unwrap_or_else(|| related.pk.clone()),
        },
        RelationKind::BelongsToMany | RelationKind::MorphToMany => {
            let foreign_pivot_key = rel.foreign_pivot_key.clone().unwrap_or_else(owned_fk);
            let related_pivot_key = rel.related_pivot_key.clone().unwrap_or_default();
            let related_key = rel.related_key.clone().unwrap_or_else(|| related.pk.clone());
            let key_type = |t: &ResolvedTable, col: &str| {
                t.column(col)
                    .map(|c| c.pg_type.clone())
                    .unwrap_or_else(|| "text".into())
            };
            let parent_type = key_type(owner_table, &local_key);
            let related_type = key_type(related, &related_key);
            let pivot = pivot_table(
                owner_table,
                rel,
                &foreign_pivot_key,
                &related_pivot_key,
                morph.as_ref(),
                (&parent_type, &related_type),
            );
            Association::ManyToMany {
                pivot,
                foreign_pivot_key,
                related_pivot_key,
                parent_key: local_key,
                related_key,
                morph,
            }
        }
    };

    Ok(ResolvedRelation {
        name: rel.name.clone(),
        kind: rel.kind,
        related: rel.related.clone(),
        association,
    })
}

/// Build resolved model from full config (validates first).
pub fn resolve(config: &FullConfig, lang: &Translator) -> Result<ResolvedModel, ConfigError> {
    validate(config, lang)?;

    let tables: HashMap<&str, ResolvedTable> = config
        .resources
        .iter()
        .map(|r| (r.name.as_str(), resolve_table(r)))
        .collect();

    let mut resources = Vec::with_capacity(config.resources.len());
    let mut resource_by_name = HashMap::new();
    for r in &config.resources {
        let table = tables
            .get(r.name.as_str())
            .cloned()
            .ok_or_else(|| ConfigError::MissingReference {
                kind: "resource",
                id: r.name.clone(),
            })?;
        let relations = r
            .relations
            .iter()
            .map(|rel| resolve_relation(r, &table, rel, &tables))
            .collect::<Result<Vec<_>, _>>()?;
        let uploads = UploadSettings {
            columns: r.uploads.columns.iter().cloned().collect(),
            location_column: r
                .uploads
                .location_column
                .clone()
                .unwrap_or_else(|| DEFAULT_LOCATION_COLUMN.into()),
            relative_path: r.uploads.relative_path.clone(),
        };
        resource_by_name.insert(r.name.clone(), resources.len());
        resources.push(ResolvedResource {
            name: r.name.clone(),
            route_key: r.route_key.clone().unwrap_or_else(|| table.pk.clone()),
            table,
            with_trashed: r.with_trashed,
            relations,
            uploads,
            validation: r.validation.clone(),
            messages: r.messages.clone(),
            per_page: r.per_page.unwrap_or(DEFAULT_PER_PAGE).max(1),
            alias: r.alias.clone(),
            module: r.module.clone(),
            morph_class: r.morph_class.clone().unwrap_or_else(|| r.name.clone()),
            routes: r.routes,
        });
    }

    tracing::debug!(resources = resources.len(), "resolved resource model");
    Ok(ResolvedModel {
        resources,
        resource_by_name,
    })
}
