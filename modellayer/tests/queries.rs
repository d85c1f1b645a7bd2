//! End-to-end finder behavior against the memory backend.

mod common;

use common::{Article, User, database};
use modellayer::bson::{Bson, doc, oid::ObjectId};
use modellayer::prelude::*;

#[tokio::test]
async fn find_by_id_returns_the_stored_entity() {
    let (db, _) = database();
    let id = ObjectId::parse_str("507f191e810c19729de860ea").unwrap();
    db.collection("articles")
        .insert_one(doc! { "_id": id, "title": "Hello" })
        .await
        .unwrap();

    let articles = Repository::<Article>::new(&db);
    let found = articles
        .find_by_id("507f191e810c19729de860ea", None)
        .unwrap()
        .exec()
        .await
        .unwrap()
        .expect("article should be found");

    assert_eq!(found.get("title").unwrap().as_str(), Some("Hello"));
    assert_eq!(found.id_str().as_deref(), Some("507f191e810c19729de860ea"));
}

#[tokio::test]
async fn find_by_id_miss_is_a_normal_outcome() {
    let (db, _) = database();
    let articles = Repository::<Article>::new(&db);

    let found = articles
        .find_by_id(ObjectId::new(), None)
        .unwrap()
        .exec()
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn invalid_identifier_fails_before_any_store_call() {
    let (db, client) = database();
    let articles = Repository::<Article>::new(&db);

    let err = articles.find_by_id("not-an-id", None).unwrap_err();
    assert!(matches!(err, ModelError::InvalidIdentifier(_)));
    assert_eq!(client.operation_count(), 0);
}

#[tokio::test]
async fn find_honors_sort_skip_and_limit_options() {
    let (db, _) = database();
    let articles = Repository::<Article>::new(&db);

    for (title, rank) in [("c", 3), ("a", 1), ("d", 4), ("b", 2)] {
        let mut doc = ValueMap::new();
        doc.insert("title".to_string(), title.into());
        doc.insert("meta".to_string(), {
            let mut meta = ValueMap::new();
            meta.insert("rank".to_string(), Value::Int(rank));
            Value::Object(meta)
        });
        articles.insert(doc).await.unwrap();
    }

    let mut options = QueryOptions::with_sort(doc! { "title": 1 });
    options.skip = 1;
    options.limit = 2;

    let found = articles.find(doc! {}, Some(options)).exec().await.unwrap();
    let titles: Vec<_> = found
        .iter()
        .map(|entity| entity.get("title").unwrap().as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, vec!["b", "c"]);
}

#[tokio::test]
async fn consecutive_finder_calls_share_no_staged_state() {
    let (db, _) = database();
    let articles = Repository::<Article>::new(&db);

    for title in ["a", "b", "c"] {
        let mut doc = ValueMap::new();
        doc.insert("title".to_string(), title.into());
        articles.insert(doc).await.unwrap();
    }

    // First call stages a heavy restriction.
    let restricted = articles
        .find(doc! {}, Some(QueryOptions::with_pagination(2, 1)))
        .exec()
        .await
        .unwrap();
    assert_eq!(restricted.len(), 1);

    // The next call starts from defaults: no skip, ceiling limit.
    let all = articles.find(doc! {}, None).exec().await.unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn hidden_fields_require_the_all_fields_tier() {
    let (db, _) = database();
    db.collection("articles")
        .insert_one(doc! { "title": "Hello", "review_state": "pending" })
        .await
        .unwrap();

    let articles = Repository::<Article>::new(&db);

    let public = articles
        .find_one(doc! { "title": "Hello" }, None)
        .exec()
        .await
        .unwrap()
        .unwrap();
    assert!(public.get("review_state").is_none());

    let admin = articles
        .find_one(doc! { "title": "Hello" }, None)
        .all_fields()
        .exec()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(admin.get("review_state").unwrap().as_str(), Some("pending"));
}

#[tokio::test]
async fn undeclared_store_fields_never_reach_the_entity() {
    let (db, _) = database();
    db.collection("articles")
        .insert_one(doc! { "title": "Hello", "legacy_column": "junk" })
        .await
        .unwrap();

    let articles = Repository::<Article>::new(&db);
    let found = articles
        .find_one(doc! {}, None)
        .all_fields()
        .exec()
        .await
        .unwrap()
        .unwrap();
    assert!(found.get("legacy_column").is_none());
}

#[tokio::test]
async fn population_resolves_owners_with_one_lookup_each() {
    let (db, client) = database();
    let users = Repository::<User>::new(&db);
    let articles = Repository::<Article>::new(&db);

    let mut ada = ValueMap::new();
    ada.insert("name".to_string(), "Ada".into());
    let ada_id = users.insert(ada).await.unwrap();

    let mut owned = ValueMap::new();
    owned.insert("title".to_string(), "Owned".into());
    owned.insert("owner_id".to_string(), Value::Id(ada_id));
    articles.insert(owned).await.unwrap();

    let mut blank = ValueMap::new();
    blank.insert("title".to_string(), "Blank owner".into());
    blank.insert("owner_id".to_string(), Value::String(String::new()));
    articles.insert(blank).await.unwrap();

    let mut orphan = ValueMap::new();
    orphan.insert("title".to_string(), "No owner".into());
    articles.insert(orphan).await.unwrap();

    let before = client.operation_count();
    let found = articles
        .find(doc! {}, Some(QueryOptions::with_sort(doc! { "title": 1 })))
        .populate::<User>("owner_id", "owner")
        .exec()
        .await
        .unwrap();

    // One find plus exactly one lookup for the single non-empty source.
    assert_eq!(client.operation_count() - before, 2);
    assert_eq!(found.len(), 3);

    let blank_owner = &found[0];
    assert!(blank_owner.get("owner").unwrap().is_null());

    let orphan = &found[1];
    assert!(orphan.get("owner").unwrap().is_null());

    let owned = &found[2];
    let owner = owned.get("owner").unwrap().as_object().unwrap();
    assert_eq!(owner.get("name").unwrap().as_str(), Some("Ada"));
    assert_eq!(owner.get(ID_FIELD).unwrap().as_id(), Some(&ada_id));
}

#[tokio::test]
async fn single_mode_population_is_unconditional() {
    let (db, _) = database();
    let users = Repository::<User>::new(&db);
    let articles = Repository::<Article>::new(&db);

    let mut ada = ValueMap::new();
    ada.insert("name".to_string(), "Ada".into());
    let ada_id = users.insert(ada).await.unwrap();

    let mut owned = ValueMap::new();
    owned.insert("title".to_string(), "Owned".into());
    owned.insert("owner_id".to_string(), Value::Id(ada_id));
    articles.insert(owned).await.unwrap();

    let found = articles
        .find_one(doc! { "title": "Owned" }, None)
        .populate::<User>("owner_id", "owner")
        .exec()
        .await
        .unwrap()
        .unwrap();
    let owner = found.get("owner").unwrap().as_object().unwrap();
    assert_eq!(owner.get("name").unwrap().as_str(), Some("Ada"));

    // No short-circuit in single-result mode: a missing source surfaces as
    // an identifier error instead of resolving to null.
    let mut orphan = ValueMap::new();
    orphan.insert("title".to_string(), "No owner".into());
    articles.insert(orphan).await.unwrap();

    let err = articles
        .find_one(doc! { "title": "No owner" }, None)
        .populate::<User>("owner_id", "owner")
        .exec()
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::InvalidIdentifier(_)));
}

#[tokio::test]
async fn distinct_returns_raw_values() {
    let (db, _) = database();
    let articles = Repository::<Article>::new(&db);

    for tags in [vec!["cms", "docs"], vec!["docs", "news"]] {
        let mut doc = ValueMap::new();
        doc.insert("title".to_string(), "x".into());
        doc.insert(
            "tags".to_string(),
            Value::List(tags.into_iter().map(Into::into).collect()),
        );
        articles.insert(doc).await.unwrap();
    }

    let mut values = articles
        .distinct("tags", doc! {}, None)
        .exec()
        .await
        .unwrap();
    values.sort_by_key(|value| value.as_str().unwrap_or_default().to_string());
    assert_eq!(
        values,
        vec![
            Bson::String("cms".into()),
            Bson::String("docs".into()),
            Bson::String("news".into()),
        ]
    );
}

#[tokio::test]
async fn aggregate_executes_immediately_and_returns_entities() {
    let (db, _) = database();
    let articles = Repository::<Article>::new(&db);

    for title in ["alpha", "beta", "gamma"] {
        let mut doc = ValueMap::new();
        doc.insert("title".to_string(), title.into());
        articles.insert(doc).await.unwrap();
    }

    let found = articles
        .aggregate(vec![
            doc! { "$match": { "title": { "$ne": "beta" } } },
            doc! { "$sort": { "title": -1 } },
        ])
        .await
        .unwrap();

    let titles: Vec<_> = found
        .iter()
        .map(|entity| entity.get("title").unwrap().as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, vec!["gamma", "alpha"]);
}
