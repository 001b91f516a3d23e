//! Resolved resource model: config validated and flattened for runtime use.

use crate::config::{RelationKind, ValidationRule};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

/// Primary key type for parsing path/body ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PkType {
    Uuid,
    BigInt,
    Int,
    Text,
}

impl PkType {
    pub fn pg_type(&self) -> &'static str {
        match self {
            PkType::Uuid => "uuid",
            PkType::BigInt => "bigint",
            PkType::Int => "integer",
            PkType::Text => "text",
        }
    }
}

#[derive(Clone, Debug)]
pub struct ColumnInfo {
    pub name: String,
    /// PostgreSQL type used to cast bound parameters (e.g. "timestamptz").
    pub pg_type: String,
    pub nullable: bool,
    /// Whether the column has a DB default (e.g. gen_random_uuid(), NOW()).
    pub has_default: bool,
}

impl ColumnInfo {
    /// Whether `text` can be cast to this column's type. Keys taken from a URL are checked
    /// before they reach the database, so `/users/abc` on a bigint key is simply not found.
    pub fn accepts_text(&self, text: &str) -> bool {
        match self.pg_type.to_ascii_lowercase().as_str() {
            "smallint" | "int2" => text.parse::<i16>().is_ok(),
            "integer" | "int" | "int4" | "serial" => text.parse::<i32>().is_ok(),
            "bigint" | "int8" | "bigserial" => text.parse::<i64>().is_ok(),
            "real" | "float4" | "double precision" | "float8" | "numeric" | "decimal" => {
                text.parse::<f64>().map(f64::is_finite).unwrap_or(false)
            }
            "uuid" => uuid::Uuid::parse_str(text).is_ok(),
            _ => true,
        }
    }
}

/// One physical table: a resource's own table or a many-to-many join table.
#[derive(Clone, Debug)]
pub struct ResolvedTable {
    pub schema: String,
    pub name: String,
    pub pk: String,
    pub pk_type: PkType,
    /// All columns including the primary key.
    pub columns: Vec<ColumnInfo>,
    pub soft_delete_column: Option<String>,
}

impl ResolvedTable {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// True when the row carries a non-null soft-delete timestamp.
    pub fn is_trashed(&self, row: &Map<String, Value>) -> bool {
        self.soft_delete_column
            .as_deref()
            .and_then(|c| row.get(c))
            .map(|v| !v.is_null())
            .unwrap_or(false)
    }

    /// Keep only the entries that name a column of this table.
    pub fn fillable(&self, data: &Map<String, Value>) -> Map<String, Value> {
        data.iter()
            .filter(|(k, _)| self.has_column(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Polymorphic type column and the value identifying the parent resource.
#[derive(Clone, Debug)]
pub struct Morph {
    pub type_column: String,
    pub class: String,
}

/// Closed set of association shapes. Each relation kind maps onto exactly one of these;
/// the write strategy lives in `service::relations`.
#[derive(Clone, Debug)]
pub enum Association {
    /// has_one / morph_one: the related row holds `foreign_key` = parent `local_key`.
    OneToOneOwned {
        foreign_key: String,
        local_key: String,
        morph: Option<Morph>,
    },
    /// belongs_to: the parent holds `foreign_key` = related `owner_key`.
    OneToOneOwning { foreign_key: String, owner_key: String },
    /// has_many / morph_many.
    OneToManyOwned {
        foreign_key: String,
        local_key: String,
        morph: Option<Morph>,
    },
    /// belongs_to_many / morph_to_many through a join table.
    ManyToMany {
        pivot: ResolvedTable,
        foreign_pivot_key: String,
        related_pivot_key: String,
        parent_key: String,
        related_key: String,
        morph: Option<Morph>,
    },
}

impl Association {
    pub fn is_plural(&self) -> bool {
        matches!(
            self,
            Association::OneToManyOwned { .. } | Association::ManyToMany { .. }
        )
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedRelation {
    pub name: String,
    pub kind: RelationKind,
    /// Related resource name (lookup in the model).
    pub related: String,
    pub association: Association,
}

#[derive(Clone, Debug)]
pub struct UploadSettings {
    pub columns: HashSet<String>,
    pub location_column: String,
    pub relative_path: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ResolvedResource {
    pub name: String,
    pub table: ResolvedTable,
    pub route_key: String,
    pub with_trashed: bool,
    pub relations: Vec<ResolvedRelation>,
    pub uploads: UploadSettings,
    pub validation: HashMap<String, ValidationRule>,
    pub messages: HashMap<String, String>,
    pub per_page: u32,
    pub alias: Option<String>,
    pub module: Option<String>,
    pub morph_class: String,
    pub routes: bool,
}

impl ResolvedResource {
    pub fn relation(&self, name: &str) -> Option<&ResolvedRelation> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// Named route for an action: `[{alias}.]{name}.{action}`.
    pub fn route_name(&self, action: &str) -> String {
        match &self.alias {
            Some(alias) => format!("{}.{}.{}", alias, self.name, action),
            None => format!("{}.{}", self.name, action),
        }
    }

    /// Template name for an action: `[{module}/]{name}/[ajax/]{action}`.
    pub fn view_location(&self, action: &str, ajax: bool) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(4);
        if let Some(module) = &self.module {
            parts.push(module);
        }
        parts.push(&self.name);
        if ajax {
            parts.push("ajax");
        }
        parts.push(action);
        parts.join("/")
    }

    /// Empty record with every fillable column set to null (model for the create form).
    pub fn blank_record(&self) -> Map<String, Value> {
        self.table
            .columns
            .iter()
            .map(|c| (c.name.clone(), Value::Null))
            .collect()
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResolvedModel {
    pub resources: Vec<ResolvedResource>,
    pub resource_by_name: HashMap<String, usize>,
}

impl ResolvedModel {
    pub fn resource(&self, name: &str) -> Option<&ResolvedResource> {
        self.resource_by_name.get(name).map(|&i| &self.resources[i])
    }
}
