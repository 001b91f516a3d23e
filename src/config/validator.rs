//! Config validation: required properties, referential integrity, relation keys.

use crate::config::{FullConfig, RelationConfig, RelationKind, ResourceConfig};
use crate::error::ConfigError;
use crate::lang::Translator;
use std::collections::{HashMap, HashSet};

fn property_not_set(lang: &Translator, property: &'static str) -> ConfigError {
    ConfigError::PropertyNotSet {
        property,
        message: crate::service::Messages::new(lang).property_not_set(property),
    }
}

fn invalid(resource: &ResourceConfig, relation: &RelationConfig, reason: &str) -> ConfigError {
    ConfigError::InvalidRelation {
        resource: resource.name.clone(),
        relation: relation.name.clone(),
        reason: reason.to_string(),
    }
}

fn column_names(resource: &ResourceConfig) -> HashSet<&str> {
    let mut names: HashSet<&str> = resource.columns.iter().map(|c| c.name()).collect();
    names.insert(resource.primary_key.as_str());
    if let Some(sd) = &resource.soft_delete_column {
        names.insert(sd.as_str());
    }
    names
}

pub fn validate(config: &FullConfig, lang: &Translator) -> Result<(), ConfigError> {
    let mut by_name: HashMap<&str, &ResourceConfig> = HashMap::new();
    for r in &config.resources {
        if r.name.trim().is_empty() {
            return Err(property_not_set(lang, "name"));
        }
        if r.table.trim().is_empty() {
            return Err(property_not_set(lang, "table"));
        }
        if by_name.insert(r.name.as_str(), r).is_some() {
            return Err(ConfigError::DuplicateResource(r.name.clone()));
        }
    }

    for r in &config.resources {
        let own_columns = column_names(r);
        if let Some(rk) = &r.route_key {
            if !own_columns.contains(rk.as_str()) {
                return Err(ConfigError::MissingReference {
                    kind: "route key column",
                    id: format!("{}.{}", r.name, rk),
                });
            }
        }
        for col in &r.uploads.columns {
            if !own_columns.contains(col.as_str()) {
                return Err(ConfigError::MissingReference {
                    kind: "upload column",
                    id: format!("{}.{}", r.name, col),
                });
            }
        }

        let mut relation_names = HashSet::new();
        for rel in &r.relations {
            if !relation_names.insert(rel.name.as_str()) {
                return Err(invalid(r, rel, "duplicate relation name"));
            }
            if own_columns.contains(rel.name.as_str()) {
                return Err(invalid(r, rel, "relation name shadows a column"));
            }
            let related = by_name.get(rel.related.as_str()).ok_or_else(|| {
                ConfigError::MissingReference {
                    kind: "related resource",
                    id: rel.related.clone(),
                }
            })?;
            let related_columns = column_names(related);
            validate_relation(r, rel, &own_columns, &related_columns)?;
        }
    }
    Ok(())
}

fn validate_relation(
    resource: &ResourceConfig,
    rel: &RelationConfig,
    own_columns: &HashSet<&str>,
    related_columns: &HashSet<&str>,
) -> Result<(), ConfigError> {
    if rel.kind.is_morph() && rel.morph_name.as_deref().map_or(true, str::is_empty) {
        return Err(invalid(resource, rel, "morph relations require morph_name"));
    }
    match rel.kind {
        RelationKind::HasOne | RelationKind::HasMany => {
            let fk = rel
                .foreign_key
                .as_deref()
                .ok_or_else(|| invalid(resource, rel, "foreign_key is required"))?;
            if !related_columns.contains(fk) {
                return Err(invalid(resource, rel, "foreign_key is not a column of the related resource"));
            }
        }
        RelationKind::MorphOne | RelationKind::MorphMany => {
            let morph = rel.morph_name.as_deref().unwrap_or_default();
            for col in [format!("{}_id", morph), format!("{}_type", morph)] {
                if !related_columns.contains(col.as_str()) {
                    return Err(invalid(
                        resource,
                        rel,
                        &format!("related resource lacks morph column {}", col),
                    ));
                }
            }
        }
        RelationKind::BelongsTo => {
            let fk = rel
                .foreign_key
                .as_deref()
                .ok_or_else(|| invalid(resource, rel, "foreign_key is required"))?;
            if !own_columns.contains(fk) {
                return Err(invalid(resource, rel, "foreign_key is not a column of this resource"));
            }
        }
        RelationKind::BelongsToMany | RelationKind::MorphToMany => {
            if rel.pivot.as_deref().map_or(true, str::is_empty) {
                return Err(invalid(resource, rel, "pivot table is required"));
            }
            if rel.related_pivot_key.is_none() {
                return Err(invalid(resource, rel, "related_pivot_key is required"));
            }
            if rel.kind == RelationKind::BelongsToMany && rel.foreign_pivot_key.is_none() {
                return Err(invalid(resource, rel, "foreign_pivot_key is required"));
            }
        }
    }
    if let Some(local) = &rel.local_key {
        if !own_columns.contains(local.as_str()) {
            return Err(invalid(resource, rel, "local_key is not a column of this resource"));
        }
    }
    for key in [&rel.owner_key, &rel.related_key].into_iter().flatten() {
        if !related_columns.contains(key.as_str()) {
            return Err(invalid(resource, rel, "key is not a column of the related resource"));
        }
    }
    Ok(())
}
