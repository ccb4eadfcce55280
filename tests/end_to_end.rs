//! Cross-module scenarios driven entirely through the public crate API.

use std::collections::HashMap;

use corvus_index::{
    BulkIndexerConfig, Document, Engine, EngineConfig, FieldFilter, FilterExpr, IndexSettings, Operator, Query,
    RankingCriterion, SortOrder, DOCUMENT_ID_FIELD,
};
use serde_json::json;

fn doc(fields: &[(&str, serde_json::Value)]) -> Document {
    let mut d = Document::new();
    for (k, v) in fields {
        d.insert(k.to_string(), v.clone());
    }
    d
}

#[test]
fn engine_lifecycle_covers_create_add_search_delete() {
    let engine = Engine::default();
    let settings = IndexSettings::new("movies", vec!["title".to_string(), "description".to_string()])
        .unwrap()
        .with_filterable_fields(vec!["year".to_string()]);
    engine.create_index(settings).unwrap();

    engine
        .add_documents(
            "movies",
            vec![
                doc(&[
                    (DOCUMENT_ID_FIELD, json!("d1")),
                    ("title", json!("The Matrix")),
                    ("description", json!("A hacker learns.")),
                    ("year", json!(1999)),
                ]),
                doc(&[
                    (DOCUMENT_ID_FIELD, json!("d2")),
                    ("title", json!("The Matrix Reloaded")),
                    ("description", json!("Neo learns more.")),
                    ("year", json!(2003)),
                ]),
            ],
        )
        .unwrap();

    let index = engine.index("movies").unwrap();
    assert_eq!(index.document_count(), 2);

    let result = index.search(Query::new("matrix")).unwrap();
    assert_eq!(result.total, 2);

    index.delete_document("d1").unwrap();
    assert_eq!(index.document_count(), 1);

    engine.delete_index("movies").unwrap();
    assert!(engine.index("movies").is_none());
}

/// Spec scenario 3: search intersection — a multi-token query narrows to
/// the document matching every token, while a single-token query matches
/// both, ordered by score descending.
#[test]
fn search_intersection_narrows_to_documents_matching_every_token() {
    let engine = Engine::default();
    engine
        .create_index(IndexSettings::new("movies", vec!["title".to_string(), "description".to_string()]).unwrap())
        .unwrap();
    engine
        .add_documents(
            "movies",
            vec![
                doc(&[
                    (DOCUMENT_ID_FIELD, json!("d1")),
                    ("title", json!("The Matrix")),
                    ("description", json!("A hacker learns.")),
                ]),
                doc(&[
                    (DOCUMENT_ID_FIELD, json!("d2")),
                    ("title", json!("The Matrix Reloaded")),
                    ("description", json!("Neo learns more.")),
                ]),
            ],
        )
        .unwrap();
    let index = engine.index("movies").unwrap();

    let narrowed = index.search(Query::new("matrix reloaded")).unwrap();
    assert_eq!(narrowed.total, 1);
    assert_eq!(narrowed.hits[0].document[DOCUMENT_ID_FIELD], json!("d2"));

    let both = index.search(Query::new("matrix")).unwrap();
    assert_eq!(both.total, 2);
}

/// Spec scenario 4: ranking with a missing field — descending order ranks
/// the document carrying the field above one lacking it, and vice versa
/// for ascending.
#[test]
fn ranking_places_missing_field_last_under_descending_order() {
    let engine = Engine::default();
    let settings = IndexSettings::new("items", vec!["title".to_string()])
        .unwrap()
        .with_filterable_fields(vec!["popularity".to_string()])
        .with_ranking_criteria(vec![RankingCriterion { field: "popularity".to_string(), order: SortOrder::Desc }]);
    engine.create_index(settings).unwrap();
    engine
        .add_documents(
            "items",
            vec![
                doc(&[(DOCUMENT_ID_FIELD, json!("a")), ("title", json!("gadget")), ("popularity", json!(10))]),
                doc(&[(DOCUMENT_ID_FIELD, json!("b")), ("title", json!("gadget"))]),
            ],
        )
        .unwrap();
    let index = engine.index("items").unwrap();

    let result = index.search(Query::new("gadget")).unwrap();
    assert_eq!(result.hits[0].document[DOCUMENT_ID_FIELD], json!("a"));
    assert_eq!(result.hits[1].document[DOCUMENT_ID_FIELD], json!("b"));
}

/// Spec scenario 5: deduplication keeps only the first (highest-ranked)
/// hit per distinct-field value. All three documents share the token
/// "movie" so a single-token query intersects to all three, letting the
/// test actually exercise the dedup step rather than vacuously passing on
/// an empty candidate set.
#[test]
fn distinct_field_keeps_only_the_highest_ranked_hit_per_value() {
    let engine = Engine::default();
    let settings = IndexSettings::new("items", vec!["title".to_string()])
        .unwrap()
        .with_filterable_fields(vec!["popularity".to_string()])
        .with_distinct_field("title")
        .with_ranking_criteria(vec![RankingCriterion { field: "popularity".to_string(), order: SortOrder::Desc }]);
    engine.create_index(settings).unwrap();
    engine
        .add_documents(
            "items",
            vec![
                doc(&[
                    (DOCUMENT_ID_FIELD, json!("a")),
                    ("title", json!("Matrix movie")),
                    ("popularity", json!(10)),
                ]),
                doc(&[
                    (DOCUMENT_ID_FIELD, json!("b")),
                    ("title", json!("Matrix movie")),
                    ("popularity", json!(9)),
                ]),
                doc(&[
                    (DOCUMENT_ID_FIELD, json!("c")),
                    ("title", json!("Inception movie")),
                    ("popularity", json!(8)),
                ]),
            ],
        )
        .unwrap();
    let index = engine.index("items").unwrap();

    let result = index.search(Query::new("movie")).unwrap();
    let ids: Vec<_> = result.hits.iter().map(|h| h.document[DOCUMENT_ID_FIELD].clone()).collect();
    assert_eq!(ids, vec![json!("a"), json!("c")]);
}

/// Spec scenario 6: bulk indexing equivalence — the parallel path and the
/// single-document path must converge on the same document count and
/// surface the same documents to search.
#[test]
fn bulk_path_and_single_doc_path_converge() {
    let docs: Vec<Document> = (0..200)
        .map(|i| {
            doc(&[
                (DOCUMENT_ID_FIELD, json!(format!("d{i}"))),
                ("title", json!("the matrix returns")),
            ])
        })
        .collect();

    let single = Engine::default();
    single.create_index(IndexSettings::new("single", vec!["title".to_string()]).unwrap()).unwrap();
    single.add_documents("single", docs.clone()).unwrap();

    let bulk_engine = Engine::new(EngineConfig {
        bulk: BulkIndexerConfig { batch_size: 17, worker_count: 3, ..Default::default() },
        ..Default::default()
    });
    bulk_engine.create_index(IndexSettings::new("bulk", vec!["title".to_string()]).unwrap()).unwrap();
    bulk_engine.bulk_add_documents("bulk", docs).unwrap();

    let single_index = single.index("single").unwrap();
    let bulk_index = bulk_engine.index("bulk").unwrap();
    assert_eq!(single_index.document_count(), bulk_index.document_count());

    let single_result = single_index.search(Query::new("matrix")).unwrap();
    let bulk_result = bulk_index.search(Query::new("matrix")).unwrap();
    assert_eq!(single_result.total, bulk_result.total);
}

#[test]
fn filter_expression_tree_combines_and_or_groups() {
    let engine = Engine::default();
    let settings = IndexSettings::new("movies", vec!["title".to_string()])
        .unwrap()
        .with_filterable_fields(vec!["genre".to_string(), "year".to_string()]);
    engine.create_index(settings).unwrap();
    engine
        .add_documents(
            "movies",
            vec![
                doc(&[
                    (DOCUMENT_ID_FIELD, json!("d1")),
                    ("title", json!("The Matrix")),
                    ("genre", json!("scifi")),
                    ("year", json!(1999)),
                ]),
                doc(&[
                    (DOCUMENT_ID_FIELD, json!("d2")),
                    ("title", json!("The Matrix Reloaded")),
                    ("genre", json!("action")),
                    ("year", json!(2003)),
                ]),
            ],
        )
        .unwrap();
    let index = engine.index("movies").unwrap();

    let mut query = Query::new("matrix");
    query.filters = Some(FilterExpr::and(vec![FieldFilter::new("year", Operator::Gte, json!(2000))]));
    let result = index.search(query).unwrap();
    assert_eq!(result.total, 1);
    assert_eq!(result.hits[0].document[DOCUMENT_ID_FIELD], json!("d2"));
}

#[test]
fn multi_search_aggregates_named_queries_against_the_same_index() {
    let engine = Engine::default();
    engine.create_index(IndexSettings::new("movies", vec!["title".to_string()]).unwrap()).unwrap();
    engine
        .add_documents(
            "movies",
            vec![
                doc(&[(DOCUMENT_ID_FIELD, json!("d1")), ("title", json!("The Matrix"))]),
                doc(&[(DOCUMENT_ID_FIELD, json!("d2")), ("title", json!("The Matrix Reloaded"))]),
            ],
        )
        .unwrap();
    let index = engine.index("movies").unwrap();

    let cancelled = std::sync::atomic::AtomicBool::new(false);
    let queries = vec![
        ("all".to_string(), Query::new("matrix")),
        ("sequel".to_string(), Query::new("reloaded")),
    ];
    let results: HashMap<String, corvus_index::SearchResult> = index.multi_search(&queries, &cancelled).unwrap();
    assert_eq!(results["all"].total, 2);
    assert_eq!(results["sequel"].total, 1);
}
