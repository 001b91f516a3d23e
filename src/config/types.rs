//! Raw resource definitions as read from the resources JSON document.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Top-level document: `{ "resources": [...] }`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FullConfig {
    #[serde(default)]
    pub resources: Vec<ResourceConfig>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PkTypeConfig {
    Bigint,
    Int,
    Uuid,
    Text,
}

impl Default for PkTypeConfig {
    fn default() -> Self {
        PkTypeConfig::Bigint
    }
}

/// A column is either a bare name (text column) or a full spec.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnConfig {
    Name(String),
    Spec {
        name: String,
        #[serde(rename = "type", default)]
        type_: Option<String>,
        #[serde(default = "default_true")]
        nullable: bool,
        /// Whether the database fills the column when omitted (e.g. NOW()).
        #[serde(default)]
        has_default: bool,
    },
}

impl ColumnConfig {
    pub fn name(&self) -> &str {
        match self {
            ColumnConfig::Name(n) => n,
            ColumnConfig::Spec { name, .. } => name,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    HasOne,
    MorphOne,
    BelongsTo,
    HasMany,
    MorphMany,
    BelongsToMany,
    MorphToMany,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::HasOne => "has_one",
            RelationKind::MorphOne => "morph_one",
            RelationKind::BelongsTo => "belongs_to",
            RelationKind::HasMany => "has_many",
            RelationKind::MorphMany => "morph_many",
            RelationKind::BelongsToMany => "belongs_to_many",
            RelationKind::MorphToMany => "morph_to_many",
        }
    }

    pub fn is_morph(&self) -> bool {
        matches!(
            self,
            RelationKind::MorphOne | RelationKind::MorphMany | RelationKind::MorphToMany
        )
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelationConfig {
    /// Request field name that carries the nested data.
    pub name: String,
    pub kind: RelationKind,
    /// Name of the related resource.
    pub related: String,
    /// has_one/has_many: column on the related table. belongs_to: column on this table.
    #[serde(default)]
    pub foreign_key: Option<String>,
    /// Key on this table referenced by the related rows (default: primary key).
    #[serde(default)]
    pub local_key: Option<String>,
    /// belongs_to: key on the related table referenced by `foreign_key` (default: its primary key).
    #[serde(default)]
    pub owner_key: Option<String>,
    /// Morph relations: prefix of the `{morph_name}_id` / `{morph_name}_type` columns.
    #[serde(default)]
    pub morph_name: Option<String>,
    /// Many-to-many: join table name (same schema as this resource unless `pivot_schema`).
    #[serde(default)]
    pub pivot: Option<String>,
    #[serde(default)]
    pub pivot_schema: Option<String>,
    /// Join table primary key column (default `id`).
    #[serde(default)]
    pub pivot_key: Option<String>,
    /// Join table column pointing at this resource.
    #[serde(default)]
    pub foreign_pivot_key: Option<String>,
    /// Join table column pointing at the related resource.
    #[serde(default)]
    pub related_pivot_key: Option<String>,
    /// Key on the related table stored in the join table (default: its primary key).
    #[serde(default)]
    pub related_key: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Columns of this resource that accept a single uploaded file.
    #[serde(default)]
    pub columns: Vec<String>,
    /// Column written on related rows when files target a relation.
    #[serde(default)]
    pub location_column: Option<String>,
    /// Storage directory relative to the storage root.
    #[serde(default)]
    pub relative_path: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Route base, view directory and route-name segment.
    #[serde(default)]
    pub name: String,
    /// Backing table.
    #[serde(default)]
    pub table: String,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default = "default_pk")]
    pub primary_key: String,
    #[serde(default)]
    pub pk_type: PkTypeConfig,
    /// Column used to look records up from the URL (default: primary key).
    #[serde(default)]
    pub route_key: Option<String>,
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
    /// Set when the model soft-deletes (usually `deleted_at`).
    #[serde(default)]
    pub soft_delete_column: Option<String>,
    /// Controller flag: show/edit/update/destroy also reach soft-deleted rows.
    #[serde(default)]
    pub with_trashed: bool,
    #[serde(default)]
    pub relations: Vec<RelationConfig>,
    #[serde(default)]
    pub uploads: UploadConfig,
    #[serde(default)]
    pub validation: HashMap<String, ValidationRule>,
    /// Custom validation messages keyed `field.rule`.
    #[serde(default)]
    pub messages: HashMap<String, String>,
    #[serde(default)]
    pub per_page: Option<u32>,
    /// Route-name prefix (`{alias}.{name}.{action}`).
    #[serde(default)]
    pub alias: Option<String>,
    /// View directory prefix (`{module}/{name}/{action}`).
    #[serde(default)]
    pub module: Option<String>,
    /// Value stored in `{morph}_type` columns for this resource.
    #[serde(default)]
    pub morph_class: Option<String>,
    /// Mount the REST routes; false for resources used only as relation targets.
    #[serde(default = "default_true")]
    pub routes: bool,
}

fn default_pk() -> String {
    "id".into()
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}
