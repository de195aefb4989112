mod common;

use chrono::{DateTime, Utc};
use cask_orm::{Database, Direction, FromAttributes, Op, Value, attributes};
use common::{Post, setup};

async fn seed(db: &Database) -> Result<(), Box<dyn std::error::Error>> {
    db.model::<Post>()
        .create_many(vec![
            attributes! { "title" => "Alice", "body" => "first", "views" => 5 },
            attributes! { "title" => "Bob", "body" => "second", "views" => 10 },
            attributes! { "title" => "Charlie", "body" => "third", "views" => 15, "summary" => "c" },
            attributes! { "title" => "David", "body" => "fourth", "views" => 20 },
            attributes! { "title" => "Eve", "body" => "fifth", "views" => 25 },
        ])
        .await?;
    Ok(())
}

fn titles(posts: &[cask_orm::Instance<Post>]) -> Result<Vec<String>, cask_orm::Error> {
    posts.iter().map(|p| p.get_as::<String>("title")).collect()
}

#[tokio::test]
async fn test_pair_maps_columns_in_order() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;
    db.model::<Post>().create(attributes! { "title" => "A", "body" => "B" }).await?;
    db.model::<Post>().create(attributes! { "title" => "C", "body" => "D" }).await?;

    let pairs = db.model::<Post>().order_by("id", Direction::Asc).pair("id", "title").await?;
    assert_eq!(pairs, vec![(Value::Int(1), Value::from("A")), (Value::Int(2), Value::from("C"))]);

    Ok(())
}

#[tokio::test]
async fn test_pair_with_repeated_keys_keeps_last_value() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;
    db.model::<Post>().create(attributes! { "title" => "A", "body" => "1" }).await?;
    db.model::<Post>().create(attributes! { "title" => "B", "body" => "2" }).await?;
    db.model::<Post>().create(attributes! { "title" => "A", "body" => "3" }).await?;

    let pairs = db.model::<Post>().order_by("id", Direction::Asc).pair("title", "body").await?;
    assert_eq!(pairs, vec![(Value::from("A"), Value::from("3")), (Value::from("B"), Value::from("2"))]);

    Ok(())
}

#[tokio::test]
async fn test_ids_and_pick() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;
    seed(&db).await?;

    let ids = db.model::<Post>().filter("views", Op::Gte, 15).order_by("id", Direction::Asc).ids().await?;
    assert_eq!(ids, vec![Value::Int(3), Value::Int(4), Value::Int(5)]);

    let first_two = db.model::<Post>().pick(2).await?;
    assert_eq!(titles(&first_two)?, vec!["Alice", "Bob"]);

    let last_two = db.model::<Post>().pick_inverse(2).await?;
    assert_eq!(titles(&last_two)?, vec!["Eve", "David"]);

    Ok(())
}

#[tokio::test]
async fn test_first_orders_by_primary_key() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;
    assert!(db.model::<Post>().first().await?.is_none());

    seed(&db).await?;
    let first = db.model::<Post>().first().await?.ok_or("no first post")?;
    assert_eq!(first.get("id"), Some(&Value::Int(1)));

    let latest = db.model::<Post>().order_by("views", Direction::Desc).first().await?.ok_or("no post")?;
    assert_eq!(latest.get_as::<String>("title")?, "Eve");

    let bob = db.model::<Post>().find_by("title", "Bob").await?.ok_or("no Bob")?;
    assert_eq!(bob.get_as::<i64>("views")?, 10);

    Ok(())
}

#[tokio::test]
async fn test_filters() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;
    seed(&db).await?;

    let either = db.model::<Post>().equals("title", "Alice").or_filter("views", Op::Gt, 20).fetch().await?;
    assert_eq!(titles(&either)?, vec!["Alice", "Eve"]);

    let listed = db.model::<Post>().in_list("id", [1, 3]).or_in_list("id", [5]).fetch().await?;
    assert_eq!(listed.len(), 3);

    let excluded = db.model::<Post>().not_in_list("id", [1, 2, 3]).count().await?;
    assert_eq!(excluded, 2);

    assert!(db.model::<Post>().in_list("id", Vec::<i64>::new()).fetch().await?.is_empty());

    let ranged = db.model::<Post>().between("views", 10, 20).count().await?;
    assert_eq!(ranged, 3);

    let raw = db.model::<Post>().where_raw("views > ? AND views < ?", [5, 25]).count().await?;
    assert_eq!(raw, 3);

    let grouped = db
        .model::<Post>()
        .equals("body", "first")
        .or_group(|q| q.filter("views", Op::Gt, 10).not_filter("title", Op::Eq, "Eve"))
        .order_by("id", Direction::Asc)
        .fetch()
        .await?;
    assert_eq!(titles(&grouped)?, vec!["Alice", "Charlie", "David"]);

    assert_eq!(db.model::<Post>().is_not_null("summary").count().await?, 1);
    assert_eq!(db.model::<Post>().is_null("summary").count().await?, 4);
    assert_eq!(db.model::<Post>().filter("title", Op::Like, "%e").count().await?, 3);

    Ok(())
}

#[tokio::test]
async fn test_limit_offset_and_count() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;
    seed(&db).await?;

    let window = db.model::<Post>().order("id ASC").limit(2).offset(1).fetch().await?;
    assert_eq!(titles(&window)?, vec!["Bob", "Charlie"]);

    let tail = db.model::<Post>().order_by("id", Direction::Asc).offset(3).fetch().await?;
    assert_eq!(titles(&tail)?, vec!["David", "Eve"]);

    assert_eq!(db.model::<Post>().limit(1).count().await?, 5);
    assert_eq!(db.model::<Post>().all().await?.len(), 5);

    Ok(())
}

#[tokio::test]
async fn test_paginate() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;
    seed(&db).await?;

    let page = db.model::<Post>().order_by("id", Direction::Asc).paginate(2, 2).await?;
    assert_eq!(page.total, 5);
    assert_eq!(page.page, 2);
    assert_eq!(page.per_page, 2);
    assert_eq!(page.last_page, 3);
    assert!(page.has_more_pages());
    assert_eq!(titles(&page.data)?, vec!["Charlie", "David"]);

    let empty = db.model::<Post>().equals("title", "nobody").paginate(1, 10).await?;
    assert_eq!(empty.total, 0);
    assert_eq!(empty.last_page, 1);
    assert!(empty.data.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_bulk_update_and_delete() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;
    seed(&db).await?;

    let before = db.model::<Post>().find_or_fail(1).await?;
    let updated = db.model::<Post>().filter("views", Op::Lt, 15).update(attributes! { "summary" => "low" }).await?;
    assert_eq!(updated, 2);

    let after = db.model::<Post>().find_or_fail(1).await?;
    assert_eq!(after.get_as::<String>("summary")?, "low");
    let touched: DateTime<Utc> = after.get_as("updated_at")?;
    let original: DateTime<Utc> = before.get_as("updated_at")?;
    assert!(touched >= original);

    let deleted = db.model::<Post>().filter("views", Op::Gt, 20).delete().await?;
    assert_eq!(deleted, 1);
    assert_eq!(db.model::<Post>().count().await?, 4);

    Ok(())
}

#[tokio::test]
async fn test_find_or_create() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let created = db
        .model::<Post>()
        .find_or_create(attributes! { "title" => "Unique" }, attributes! { "body" => "made" })
        .await?;
    let found = db
        .model::<Post>()
        .find_or_create(attributes! { "title" => "Unique" }, attributes! { "body" => "ignored" })
        .await?;

    assert_eq!(created.primary_key_value(), found.primary_key_value());
    assert_eq!(found.get_as::<String>("body")?, "made");
    assert_eq!(db.model::<Post>().count().await?, 1);

    Ok(())
}

#[derive(Debug, FromAttributes)]
struct Headline {
    id: i64,
    #[orm(column = "title")]
    headline: String,
}

#[tokio::test]
async fn test_typed_projections_and_raw_queries() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;
    seed(&db).await?;

    let posts: Vec<Post> = db.model::<Post>().equals("title", "Bob").fetch_as().await?;
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].views, 10);

    // Raw rows are plain attribute maps, not model instances.
    let rows = db.raw("SELECT id, title FROM posts WHERE views > ? ORDER BY id").bind(15).fetch_all().await?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("title"), Some(&Value::from("David")));
    assert!(!rows[0].contains_key("body"));

    let headlines: Vec<Headline> = db.raw("SELECT id, title FROM posts ORDER BY id").fetch_as().await?;
    assert_eq!(headlines[0].id, 1);
    assert_eq!(headlines[4].headline, "Eve");

    let partial = db.model::<Post>().select("id, title").equals("id", 2).first().await?.ok_or("no post 2")?;
    assert_eq!(partial.attributes().len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_generated_sql() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let sql = db.model::<Post>().equals("title", "A").order_by("id", Direction::Desc).limit(2).debug().to_sql()?;
    assert_eq!(
        sql,
        "SELECT \"id\", \"title\", \"body\", \"views\", \"summary\", \"created_at\", \"updated_at\" \
         FROM \"posts\" WHERE (\"title\" = ?) ORDER BY \"id\" DESC LIMIT 2"
    );

    let unbalanced = db.model::<Post>().where_raw("views > ? AND views < ?", [1]).fetch().await;
    assert!(matches!(unbalanced, Err(cask_orm::Error::Encode(_))));

    Ok(())
}
