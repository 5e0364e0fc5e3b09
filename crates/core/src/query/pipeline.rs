//! Aggregation pipelines.
//!
//! A [`Pipeline`] is an ordered list of [`Stage`]s. Callers usually build one
//! from a list of optional stages (`Option<Stage>`), each produced by a small
//! predicate function, so that every stage can be tested in isolation.

use serde_json::{Map, Value, json};

use super::filter::Filter;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn as_i32(self) -> i32 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }
}

/// How a projected field obtains its value.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectField {
    /// Copy the field with the same name.
    Include,
    /// Copy the value at another (possibly dotted) path.
    Path(String),
}

/// One aggregation stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Filter),
    Lookup { from: String, local_field: String, foreign_field: String, as_field: String },
    Unwind { path: String, preserve_null_and_empty: bool },
    Project(Vec<(String, ProjectField)>),
    Sort(Vec<(String, SortDirection)>),
    Skip(u64),
    Limit(u64),
}

impl Stage {
    pub fn lookup(from: &str, local_field: &str, foreign_field: &str, as_field: &str) -> Self {
        Stage::Lookup {
            from: from.to_string(),
            local_field: local_field.to_string(),
            foreign_field: foreign_field.to_string(),
            as_field: as_field.to_string(),
        }
    }

    pub fn unwind(path: &str, preserve_null_and_empty: bool) -> Self {
        Stage::Unwind { path: path.to_string(), preserve_null_and_empty }
    }

    /// Render the Mongo-style stage document.
    pub fn to_document(&self) -> Value {
        match self {
            Stage::Match(filter) => json!({ "$match": filter.to_document() }),
            Stage::Lookup { from, local_field, foreign_field, as_field } => json!({
                "$lookup": {
                    "from": from,
                    "localField": local_field,
                    "foreignField": foreign_field,
                    "as": as_field,
                }
            }),
            Stage::Unwind { path, preserve_null_and_empty } => json!({
                "$unwind": { "path": format!("${path}"), "preserveNullAndEmptyArrays": preserve_null_and_empty }
            }),
            Stage::Project(fields) => {
                let mut spec = Map::new();
                for (name, field) in fields {
                    let value = match field {
                        ProjectField::Include => json!(1),
                        ProjectField::Path(path) => Value::String(format!("${path}")),
                    };
                    spec.insert(name.clone(), value);
                }
                json!({ "$project": spec })
            }
            Stage::Sort(keys) => {
                let mut spec = Map::new();
                for (field, direction) in keys {
                    spec.insert(field.clone(), json!(direction.as_i32()));
                }
                json!({ "$sort": spec })
            }
            Stage::Skip(n) => json!({ "$skip": n }),
            Stage::Limit(n) => json!({ "$limit": n }),
        }
    }
}

/// Ordered aggregation pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the present stages, in order.
    pub fn from_optional(stages: impl IntoIterator<Item = Option<Stage>>) -> Self {
        Self { stages: stages.into_iter().flatten().collect() }
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Collections referenced by `$lookup` stages, deduplicated.
    pub fn foreign_collections(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for stage in &self.stages {
            if let Stage::Lookup { from, .. } = stage
                && !names.contains(from)
            {
                names.push(from.clone());
            }
        }
        names
    }

    pub fn to_document(&self) -> Value {
        Value::Array(self.stages.iter().map(Stage::to_document).collect())
    }
}

/// `$match` stage, skipped for an empty filter.
pub fn match_stage(filter: Filter) -> Option<Stage> {
    (!filter.is_empty()).then_some(Stage::Match(filter))
}

/// `$skip` stage, skipped when zero.
pub fn skip_stage(skip: u64) -> Option<Stage> {
    (skip > 0).then_some(Stage::Skip(skip))
}

/// `$limit` stage, skipped when absent.
pub fn limit_stage(limit: Option<u64>) -> Option<Stage> {
    limit.map(Stage::Limit)
}

/// `$sort` stage, skipped when there are no keys.
pub fn sort_stage(keys: Vec<(String, SortDirection)>) -> Option<Stage> {
    (!keys.is_empty()).then_some(Stage::Sort(keys))
}
