//! Catalog aggregation pipelines.
//!
//! Each function yields one optional stage so listings can be assembled with
//! [`Pipeline::from_optional`] and every predicate tested on its own.

use crate::Error;
use crate::query::pipeline::{limit_stage, match_stage, skip_stage, sort_stage};
use crate::query::{CategoryQuery, Filter, Pipeline, PriceRange, ProductQuery, ProjectField, SortDirection, Stage};
use crate::store::collections;

/// Join the owning category into `category`; products without one are dropped.
pub fn category_lookup() -> [Option<Stage>; 2] {
    [
        Some(Stage::lookup(collections::CATEGORIES, "categoryId", "_id", "category")),
        Some(Stage::unwind("category", false)),
    ]
}

/// Join the subcategory into `subcategory`, keeping products without one.
pub fn subcategory_lookup() -> [Option<Stage>; 2] {
    [
        Some(Stage::lookup(collections::SUBCATEGORIES, "subcategoryId", "_id", "subcategory")),
        Some(Stage::unwind("subcategory", true)),
    ]
}

pub fn category_slug_stage(slug: &str) -> Option<Stage> {
    match_stage(Filter::new().eq("category.slug", slug))
}

pub fn sex_stage(sex: Option<&str>) -> Option<Stage> {
    sex.and_then(|sex| match_stage(Filter::new().eq("sex", sex)))
}

pub fn price_stage(price: &PriceRange) -> Option<Stage> {
    match_stage(price.apply(Filter::new(), "price"))
}

pub fn subcategory_slug_stage(slug: Option<&str>) -> Option<Stage> {
    slug.and_then(|slug| match_stage(Filter::new().eq("subcategory.slug", slug)))
}

/// Flatten a joined product into the `ProductView` shape.
pub fn view_projection() -> Option<Stage> {
    let include = |name: &str| (name.to_string(), ProjectField::Include);
    let path = |name: &str, path: &str| (name.to_string(), ProjectField::Path(path.to_string()));
    Some(Stage::Project(vec![
        include("name"),
        include("description"),
        include("images"),
        include("price"),
        include("inventory"),
        include("sex"),
        path("categoryName", "category.name"),
        path("categorySlug", "category.slug"),
        path("subcategoryName", "subcategory.name"),
        path("subcategorySlug", "subcategory.slug"),
        include("createdAt"),
    ]))
}

/// Products matching `query` that have a category. Listings page over this
/// population and count it for `pageCount`.
pub fn listed_products(query: &ProductQuery) -> Pipeline {
    let [cat_lookup, cat_unwind] = category_lookup();
    Pipeline::from_optional([match_stage(query.filter()), cat_lookup, cat_unwind])
}

/// Paginated listing: filter and join the category, then order and page.
pub fn product_list(query: &ProductQuery) -> Pipeline {
    let [cat_lookup, cat_unwind] = category_lookup();
    let [sub_lookup, sub_unwind] = subcategory_lookup();
    Pipeline::from_optional([
        match_stage(query.filter()),
        cat_lookup,
        cat_unwind,
        sort_stage(query.sort.keys()),
        skip_stage(query.skip()),
        limit_stage(Some(query.per_page)),
        sub_lookup,
        sub_unwind,
        view_projection(),
    ])
}

/// Products of the category with `slug`, narrowed by the validated filters.
pub fn products_in_category(slug: &str, query: &CategoryQuery) -> Pipeline {
    let [cat_lookup, cat_unwind] = category_lookup();
    let [sub_lookup, sub_unwind] = subcategory_lookup();
    Pipeline::from_optional([
        cat_lookup,
        cat_unwind,
        sub_lookup,
        sub_unwind,
        category_slug_stage(slug),
        sex_stage(query.sex.as_deref()),
        price_stage(&query.price),
        subcategory_slug_stage(query.subcategory.as_deref()),
        sort_stage(query.sort.keys()),
        view_projection(),
    ])
}

/// One product by id, joined.
pub fn single_product(id: &str) -> Pipeline {
    let [cat_lookup, cat_unwind] = category_lookup();
    let [sub_lookup, sub_unwind] = subcategory_lookup();
    Pipeline::from_optional([
        match_stage(Filter::new().eq("_id", id)),
        limit_stage(Some(1)),
        cat_lookup,
        cat_unwind,
        sub_lookup,
        sub_unwind,
        view_projection(),
    ])
}

/// Newest products sharing `category_id`, excluding `product_id`.
pub fn related(product_id: &str, category_id: &str, limit: u64) -> Pipeline {
    let [cat_lookup, cat_unwind] = category_lookup();
    let [sub_lookup, sub_unwind] = subcategory_lookup();
    Pipeline::from_optional([
        match_stage(Filter::new().eq("categoryId", category_id).ne("_id", product_id)),
        sort_stage(vec![("createdAt".to_string(), SortDirection::Desc)]),
        limit_stage(Some(limit)),
        cat_lookup,
        cat_unwind,
        sub_lookup,
        sub_unwind,
        view_projection(),
    ])
}

/// Case-insensitive name search; `query` is matched literally.
///
/// # Errors
///
/// Returns `Error::Query` if the escaped pattern fails to compile.
pub fn name_search(query: &str, limit: u64) -> Result<Pipeline, Error> {
    let filter = Filter::new().regex("name", &regex::escape(query), true)?;
    Ok(Pipeline::from_optional([
        match_stage(filter),
        sort_stage(vec![("name".to_string(), SortDirection::Asc)]),
        limit_stage(Some(limit)),
        Some(Stage::lookup(collections::CATEGORIES, "categoryId", "_id", "category")),
        Some(Stage::unwind("category", true)),
        Some(Stage::Project(vec![
            ("name".to_string(), ProjectField::Include),
            ("categoryName".to_string(), ProjectField::Path("category.name".to_string())),
        ])),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{CategoryFilters, PageLimits, SearchParams};
    use serde_json::json;

    #[test]
    fn test_category_lookup_drops_orphans() {
        let [lookup, unwind] = category_lookup();
        assert_eq!(
            lookup.unwrap().to_document(),
            json!({"$lookup": {
                "from": "categories", "localField": "categoryId", "foreignField": "_id", "as": "category"
            }})
        );
        assert_eq!(unwind.unwrap(), Stage::unwind("category", false));
    }

    #[test]
    fn test_subcategory_lookup_preserves_missing() {
        let [_, unwind] = subcategory_lookup();
        assert_eq!(unwind.unwrap(), Stage::unwind("subcategory", true));
    }

    #[test]
    fn test_optional_predicates() {
        assert!(sex_stage(None).is_none());
        assert_eq!(sex_stage(Some("men")).unwrap().to_document(), json!({"$match": {"sex": "men"}}));

        assert!(price_stage(&PriceRange::default()).is_none());
        let price = PriceRange { min: Some(50.0), max: None };
        assert_eq!(price_stage(&price).unwrap().to_document(), json!({"$match": {"price": {"$gte": 50.0}}}));

        assert!(subcategory_slug_stage(None).is_none());
        assert_eq!(
            subcategory_slug_stage(Some("sneakers")).unwrap().to_document(),
            json!({"$match": {"subcategory.slug": "sneakers"}})
        );
        assert_eq!(category_slug_stage("shoes").unwrap().to_document(), json!({"$match": {"category.slug": "shoes"}}));
    }

    #[test]
    fn test_view_projection_fields() {
        let doc = view_projection().unwrap().to_document();
        assert_eq!(doc["$project"]["categoryName"], "$category.name");
        assert_eq!(doc["$project"]["subcategorySlug"], "$subcategory.slug");
        assert_eq!(doc["$project"]["price"], 1);
    }

    #[test]
    fn test_category_pipeline_for_men_over_fifty() {
        let filters = CategoryFilters { sex: Some("men".into()), gte: Some("50".into()), ..Default::default() };
        let pipeline = products_in_category("shoes", &filters.validate().unwrap());
        let stages = pipeline.to_document();

        assert!(stages.as_array().unwrap().contains(&json!({"$match": {"category.slug": "shoes"}})));
        assert!(stages.as_array().unwrap().contains(&json!({"$match": {"sex": "men"}})));
        assert!(stages.as_array().unwrap().contains(&json!({"$match": {"price": {"$gte": 50.0}}})));
        assert!(stages.as_array().unwrap().contains(&json!({"$sort": {"createdAt": -1}})));
    }

    #[test]
    fn test_product_list_pages_after_category_join() {
        let query = SearchParams::from_pairs([("per_page", "2"), ("page", "2"), ("sort", "price.asc")])
            .validate(&PageLimits::default())
            .unwrap();
        let stages = product_list(&query).to_document();
        assert_eq!(stages[1], json!({"$unwind": {"path": "$category", "preserveNullAndEmptyArrays": false}}));
        assert_eq!(stages[2], json!({"$sort": {"price": 1}}));
        assert_eq!(stages[3], json!({"$skip": 2}));
        assert_eq!(stages[4], json!({"$limit": 2}));
        assert_eq!(product_list(&query).foreign_collections(), vec!["categories", "subcategories"]);

        let counted = listed_products(&query).to_document();
        assert_eq!(counted.as_array().unwrap().len(), 2);
        assert_eq!(stages.as_array().unwrap()[..2], counted.as_array().unwrap()[..]);
    }

    #[test]
    fn test_related_excludes_self() {
        let stages = related("p1", "c1", 4).to_document();
        assert_eq!(stages[0], json!({"$match": {"categoryId": "c1", "_id": {"$ne": "p1"}}}));
        assert_eq!(stages[2], json!({"$limit": 4}));
    }

    #[test]
    fn test_name_search_escapes_query() {
        let stages = name_search("a.b(", 10).unwrap().to_document();
        assert_eq!(stages[0], json!({"$match": {"name": {"$regex": "a\\.b\\(", "$options": "i"}}}));
    }
}
