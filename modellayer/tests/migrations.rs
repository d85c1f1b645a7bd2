//! End-to-end migration chain behavior against the memory backend.

mod common;

use common::database;
use modellayer::bson::doc;
use modellayer::prelude::*;

struct CreateArticles;

#[async_trait::async_trait]
impl Migration for CreateArticles {
    fn id(&self) -> &'static str {
        "001_articles"
    }

    fn previous_id(&self) -> Option<&'static str> {
        None
    }

    async fn up(&self, schema: &SchemaExecutor<'_>) -> ModelResult<()> {
        schema
            .insert_record("articles", doc! { "title": "Seeded", "label": "old" })
            .await?;
        Ok(())
    }

    async fn down(&self, schema: &SchemaExecutor<'_>) -> ModelResult<()> {
        schema.remove_records("articles", doc! {}).await?;
        Ok(())
    }
}

struct RenameLabel;

#[async_trait::async_trait]
impl Migration for RenameLabel {
    fn id(&self) -> &'static str {
        "002_rename_label"
    }

    fn previous_id(&self) -> Option<&'static str> {
        Some("001_articles")
    }

    async fn up(&self, schema: &SchemaExecutor<'_>) -> ModelResult<()> {
        schema.rename_field("articles", "label", "badge").await?;
        schema.add_field_if_missing("articles", "pinned", false).await?;
        Ok(())
    }

    async fn down(&self, schema: &SchemaExecutor<'_>) -> ModelResult<()> {
        schema.rename_field("articles", "badge", "label").await?;
        schema.remove_field("articles", "pinned").await?;
        Ok(())
    }
}

struct AppMigrations;

impl Migrations for AppMigrations {
    fn migrations() -> Vec<MigrationRef> {
        vec![Box::new(CreateArticles), Box::new(RenameLabel)]
    }
}

#[tokio::test]
async fn upgrade_applies_the_chain_and_records_the_revision() {
    let (db, _) = database();
    let runner = MigrationRunner::<AppMigrations>::new();

    runner.upgrade(&db).await.unwrap();

    let schema = SchemaExecutor::new(&db);
    assert_eq!(
        schema.current_revision().await.unwrap().as_deref(),
        Some("002_rename_label")
    );

    let seeded = db
        .collection("articles")
        .find_one(doc! {}, Default::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(seeded.get_str("badge").unwrap(), "old");
    assert!(seeded.get("label").is_none());
    assert_eq!(seeded.get_bool("pinned").unwrap(), false);
}

#[tokio::test]
async fn upgrade_is_incremental_from_the_stored_revision() {
    let (db, _) = database();
    let runner = MigrationRunner::<AppMigrations>::new();

    runner.upgrade_to(&db, "001_articles").await.unwrap();
    let schema = SchemaExecutor::new(&db);
    assert_eq!(
        schema.current_revision().await.unwrap().as_deref(),
        Some("001_articles")
    );

    runner.upgrade(&db).await.unwrap();
    assert_eq!(
        schema.current_revision().await.unwrap().as_deref(),
        Some("002_rename_label")
    );

    // Only one seeded record: 001 must not have run twice.
    let count = db
        .collection("articles")
        .count_documents(doc! {})
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn downgrade_reverses_migrations_down_to_the_target() {
    let (db, _) = database();
    let runner = MigrationRunner::<AppMigrations>::new();

    runner.upgrade(&db).await.unwrap();
    runner.downgrade_to(&db, "001_articles").await.unwrap();

    let schema = SchemaExecutor::new(&db);
    assert_eq!(
        schema.current_revision().await.unwrap().as_deref(),
        Some("001_articles")
    );

    let seeded = db
        .collection("articles")
        .find_one(doc! {}, Default::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(seeded.get_str("label").unwrap(), "old");
    assert!(seeded.get("badge").is_none());
    assert!(seeded.get("pinned").is_none());
}

#[tokio::test]
async fn full_downgrade_clears_the_revision() {
    let (db, _) = database();
    let runner = MigrationRunner::<AppMigrations>::new();

    runner.upgrade(&db).await.unwrap();
    runner.downgrade(&db).await.unwrap();

    let schema = SchemaExecutor::new(&db);
    assert!(schema.current_revision().await.unwrap().is_none());

    let count = db
        .collection("articles")
        .count_documents(doc! {})
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn executor_add_field_overwrites_and_guarded_add_does_not() {
    let (db, _) = database();
    let articles = db.collection("articles");
    articles
        .insert_one(doc! { "title": "a", "status": "live" })
        .await
        .unwrap();
    articles.insert_one(doc! { "title": "b" }).await.unwrap();

    let schema = SchemaExecutor::new(&db);

    schema
        .add_field_if_missing("articles", "status", "draft")
        .await
        .unwrap();
    let live = db
        .collection("articles")
        .count_documents(doc! { "status": "live" })
        .await
        .unwrap();
    assert_eq!(live, 1);

    schema.add_field("articles", "status", "archived").await.unwrap();
    let archived = db
        .collection("articles")
        .count_documents(doc! { "status": "archived" })
        .await
        .unwrap();
    assert_eq!(archived, 2);
}

#[tokio::test]
async fn global_database_slot_installs_and_clears() {
    let (db, _) = database();

    Database::install(db.clone());
    let instance = Database::instance().unwrap();
    assert_eq!(instance.name(), "cms_test");

    Database::uninstall();
    assert!(Database::instance().is_err());
}
