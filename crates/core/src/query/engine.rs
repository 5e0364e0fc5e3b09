//! In-process evaluation of aggregation pipelines over JSON documents.
//!
//! The document store loads a collection (plus every collection referenced by
//! a `$lookup`) and hands the documents to [`run`]. Stages apply in order.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde_json::{Map, Value};

use super::filter::{compare_values, lookup_path, values_equal};
use super::pipeline::{Pipeline, ProjectField, SortDirection, Stage};
use crate::Error;

/// Documents of the collections a pipeline joins against, keyed by name.
pub type ForeignCollections = HashMap<String, Vec<Value>>;

/// Run a pipeline over `docs`.
///
/// # Errors
///
/// Returns `Error::Query` if a `$lookup` names a collection missing from
/// `foreign`.
pub fn run(docs: Vec<Value>, pipeline: &Pipeline, foreign: &ForeignCollections) -> Result<Vec<Value>, Error> {
    pipeline
        .stages()
        .iter()
        .try_fold(docs, |docs, stage| apply(docs, stage, foreign))
}

fn apply(docs: Vec<Value>, stage: &Stage, foreign: &ForeignCollections) -> Result<Vec<Value>, Error> {
    Ok(match stage {
        Stage::Match(filter) => docs.into_iter().filter(|d| filter.matches(d)).collect(),
        Stage::Lookup { from, local_field, foreign_field, as_field } => {
            let others = foreign
                .get(from)
                .ok_or_else(|| Error::Query(format!("lookup collection not loaded: {from}")))?;
            docs.into_iter()
                .map(|doc| lookup(doc, others, local_field, foreign_field, as_field))
                .collect()
        }
        Stage::Unwind { path, preserve_null_and_empty } => {
            docs.into_iter().flat_map(|doc| unwind(doc, path, *preserve_null_and_empty)).collect()
        }
        Stage::Project(fields) => docs.iter().map(|doc| project(doc, fields)).collect(),
        Stage::Sort(keys) => {
            let mut docs = docs;
            docs.sort_by(|a, b| compare_by_keys(a, b, keys));
            docs
        }
        Stage::Skip(n) => docs.into_iter().skip(clamp(*n)).collect(),
        Stage::Limit(n) => docs.into_iter().take(clamp(*n)).collect(),
    })
}

fn clamp(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

fn lookup(mut doc: Value, others: &[Value], local_field: &str, foreign_field: &str, as_field: &str) -> Value {
    let joined: Vec<Value> = match lookup_path(&doc, local_field) {
        Some(local) if !local.is_null() => others
            .iter()
            .filter(|other| lookup_path(other, foreign_field).is_some_and(|f| values_equal(f, local)))
            .cloned()
            .collect(),
        _ => Vec::new(),
    };
    if let Value::Object(map) = &mut doc {
        map.insert(as_field.to_string(), Value::Array(joined));
    }
    doc
}

fn unwind(doc: Value, path: &str, preserve: bool) -> Vec<Value> {
    let Value::Object(mut map) = doc else {
        return Vec::new();
    };
    match map.remove(path) {
        Some(Value::Array(items)) if !items.is_empty() => items
            .into_iter()
            .map(|item| {
                let mut copy = map.clone();
                copy.insert(path.to_string(), item);
                Value::Object(copy)
            })
            .collect(),
        Some(Value::Array(_)) | None => {
            if preserve {
                vec![Value::Object(map)]
            } else {
                Vec::new()
            }
        }
        Some(Value::Null) => {
            if preserve {
                map.insert(path.to_string(), Value::Null);
                vec![Value::Object(map)]
            } else {
                Vec::new()
            }
        }
        Some(other) => {
            map.insert(path.to_string(), other);
            vec![Value::Object(map)]
        }
    }
}

fn project(doc: &Value, fields: &[(String, ProjectField)]) -> Value {
    let mut out = Map::new();
    if let Some(id) = doc.get("_id") {
        out.insert("_id".to_string(), id.clone());
    }
    for (name, field) in fields {
        let source = match field {
            ProjectField::Include => name.as_str(),
            ProjectField::Path(path) => path.as_str(),
        };
        if let Some(value) = lookup_path(doc, source) {
            out.insert(name.clone(), value.clone());
        }
    }
    Value::Object(out)
}

fn compare_by_keys(a: &Value, b: &Value, keys: &[(String, SortDirection)]) -> Ordering {
    for (field, direction) in keys {
        let ordering = total_order(lookup_path(a, field), lookup_path(b, field));
        let ordering = match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Rank of a value kind: missing/null < numbers < strings < objects < arrays < bools.
fn kind_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

fn total_order(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let (rank_a, rank_b) = (kind_rank(a), kind_rank(b));
    if rank_a != rank_b {
        return rank_a.cmp(&rank_b);
    }
    match (a, b) {
        (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::filter::Filter;
    use serde_json::json;

    fn products() -> Vec<Value> {
        vec![
            json!({"_id": "p1", "name": "Runner", "price": 20, "categoryId": "c1"}),
            json!({"_id": "p2", "name": "Loafer", "price": 10, "categoryId": "c2"}),
            json!({"_id": "p3", "name": "Orphan", "price": 15, "categoryId": "missing"}),
            json!({"_id": "p4", "name": "Boot", "price": 10, "categoryId": "c1"}),
        ]
    }

    fn categories() -> ForeignCollections {
        let mut foreign = ForeignCollections::new();
        foreign.insert(
            "categories".to_string(),
            vec![
                json!({"_id": "c1", "name": "Shoes", "slug": "shoes"}),
                json!({"_id": "c2", "name": "Formal", "slug": "formal"}),
            ],
        );
        foreign
    }

    fn ids(docs: &[Value]) -> Vec<&str> {
        docs.iter().map(|d| d["_id"].as_str().unwrap()).collect()
    }

    #[test]
    fn test_empty_pipeline_is_identity() {
        let out = run(products(), &Pipeline::new(), &ForeignCollections::new()).unwrap();
        assert_eq!(ids(&out), vec!["p1", "p2", "p3", "p4"]);
    }

    #[test]
    fn test_lookup_and_unwind_drop_unmatched() {
        let pipeline = Pipeline::new()
            .stage(Stage::lookup("categories", "categoryId", "_id", "category"))
            .stage(Stage::unwind("category", false));
        let out = run(products(), &pipeline, &categories()).unwrap();

        assert_eq!(ids(&out), vec!["p1", "p2", "p4"]);
        assert_eq!(out[0]["category"]["slug"], "shoes");
    }

    #[test]
    fn test_unwind_preserve_keeps_unmatched() {
        let pipeline = Pipeline::new()
            .stage(Stage::lookup("categories", "categoryId", "_id", "category"))
            .stage(Stage::unwind("category", true));
        let out = run(products(), &pipeline, &categories()).unwrap();

        assert_eq!(out.len(), 4);
        assert!(out[2].get("category").is_none());
    }

    #[test]
    fn test_unwind_fans_out_arrays() {
        let docs = vec![json!({"_id": "a", "sizes": [40, 41, 42]})];
        let pipeline = Pipeline::new().stage(Stage::unwind("sizes", false));
        let out = run(docs, &pipeline, &ForeignCollections::new()).unwrap();
        let sizes: Vec<i64> = out.iter().map(|d| d["sizes"].as_i64().unwrap()).collect();
        assert_eq!(sizes, vec![40, 41, 42]);
    }

    #[test]
    fn test_missing_lookup_collection_errors() {
        let pipeline = Pipeline::new().stage(Stage::lookup("brands", "brandId", "_id", "brand"));
        let result = run(products(), &pipeline, &ForeignCollections::new());
        assert!(matches!(result, Err(Error::Query(_))));
    }

    #[test]
    fn test_match_on_joined_field() {
        let pipeline = Pipeline::new()
            .stage(Stage::lookup("categories", "categoryId", "_id", "category"))
            .stage(Stage::unwind("category", false))
            .stage(Stage::Match(Filter::new().eq("category.slug", "shoes").gte("price", 15)));
        let out = run(products(), &pipeline, &categories()).unwrap();
        assert_eq!(ids(&out), vec!["p1"]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_keys() {
        let pipeline = Pipeline::new().stage(Stage::Sort(vec![("price".into(), SortDirection::Asc)]));
        let out = run(products(), &pipeline, &ForeignCollections::new()).unwrap();
        assert_eq!(ids(&out), vec!["p2", "p4", "p3", "p1"]);

        let pipeline = Pipeline::new().stage(Stage::Sort(vec![("price".into(), SortDirection::Desc)]));
        let out = run(products(), &pipeline, &ForeignCollections::new()).unwrap();
        assert_eq!(ids(&out), vec!["p1", "p3", "p2", "p4"]);
    }

    #[test]
    fn test_sort_places_missing_first() {
        let docs = vec![json!({"_id": "a", "rank": 2}), json!({"_id": "b"}), json!({"_id": "c", "rank": 1})];
        let pipeline = Pipeline::new().stage(Stage::Sort(vec![("rank".into(), SortDirection::Asc)]));
        let out = run(docs, &pipeline, &ForeignCollections::new()).unwrap();
        assert_eq!(ids(&out), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_skip_and_limit() {
        let pipeline = Pipeline::new().stage(Stage::Skip(1)).stage(Stage::Limit(2));
        let out = run(products(), &pipeline, &ForeignCollections::new()).unwrap();
        assert_eq!(ids(&out), vec!["p2", "p3"]);

        let pipeline = Pipeline::new().stage(Stage::Skip(10));
        assert!(run(products(), &pipeline, &ForeignCollections::new()).unwrap().is_empty());
    }

    #[test]
    fn test_project_flattens_joined_fields() {
        let pipeline = Pipeline::new()
            .stage(Stage::lookup("categories", "categoryId", "_id", "category"))
            .stage(Stage::unwind("category", false))
            .stage(Stage::Project(vec![
                ("name".into(), ProjectField::Include),
                ("categoryName".into(), ProjectField::Path("category.name".into())),
                ("absent".into(), ProjectField::Include),
            ]));
        let out = run(products(), &pipeline, &categories()).unwrap();
        assert_eq!(out[0], json!({"_id": "p1", "name": "Runner", "categoryName": "Shoes"}));
    }
}
