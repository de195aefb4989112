mod common;

use cask_orm::{Error, Instance, Value, attributes};
use common::{Post, setup};

#[tokio::test]
async fn test_create_then_find() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let post = db.model::<Post>().create(attributes! { "title" => "A", "body" => "B" }).await?;
    assert_eq!(post.get("id"), Some(&Value::Int(1)));
    assert!(post.is_persisted());
    assert!(!post.is_dirty());
    assert!(matches!(post.get("created_at"), Some(Value::Timestamp(_))));

    let found = db.model::<Post>().find(1).await?.ok_or("post 1 not found")?;
    assert_eq!(found.get_as::<String>("title")?, "A");
    assert_eq!(found.original(), found.attributes());
    assert_eq!(found.get("created_at"), post.get("created_at"));

    Ok(())
}

#[tokio::test]
async fn test_save_inserts_then_updates_dirty_columns() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let mut post = Instance::<Post>::with_attributes(attributes! { "title" => "Draft", "body" => "..." });
    assert!(post.is_new());
    assert_eq!(post.primary_key_value(), None);

    post.save(&db).await?;
    assert!(post.is_persisted());
    let id = post.primary_key_value().cloned().ok_or("no key assigned")?;

    post.set("title", "Final")?;
    assert!(post.is_dirty());
    assert_eq!(post.dirty().keys().collect::<Vec<_>>(), vec!["title"]);
    post.save(&db).await?;
    assert!(!post.is_dirty());

    let stored = db.model::<Post>().find_or_fail(id).await?;
    assert_eq!(stored.get_as::<String>("title")?, "Final");
    assert_eq!(stored.get_as::<String>("body")?, "...");

    Ok(())
}

#[tokio::test]
async fn test_clean_save_issues_no_update() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let mut post = db.model::<Post>().create(attributes! { "title" => "A", "body" => "B" }).await?;
    let updated_at = post.get("updated_at").cloned();

    post.save(&db).await?;
    assert_eq!(post.get("updated_at").cloned(), updated_at);

    Ok(())
}

#[tokio::test]
async fn test_from_model_keeps_typed_fields() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let mut post = Instance::from_model(Post {
        id: None,
        title: "Typed".to_string(),
        body: "Body".to_string(),
        views: 7,
        summary: None,
        created_at: None,
        updated_at: None,
    });
    post.save(&db).await?;

    let typed: Post = post.to_model()?;
    assert_eq!(typed.id, Some(1));
    assert_eq!(typed.views, 7);
    assert!(typed.created_at.is_some());

    Ok(())
}

#[tokio::test]
async fn test_delete_freezes_instance() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let mut post = db.model::<Post>().create(attributes! { "title" => "A", "body" => "B" }).await?;
    post.delete(&db).await?;

    assert!(post.is_frozen());
    assert_eq!(post.get_as::<String>("title")?, "A");
    assert!(matches!(post.set("title", "B"), Err(Error::FrozenInstance { .. })));
    assert!(matches!(post.save(&db).await, Err(Error::FrozenInstance { .. })));
    assert!(matches!(post.delete(&db).await, Err(Error::FrozenInstance { .. })));

    assert!(db.model::<Post>().find(1).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_delete_of_new_instance_fails() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let mut post = Instance::<Post>::with_attributes(attributes! { "title" => "A", "body" => "B" });
    assert!(matches!(post.delete(&db).await, Err(Error::NotPersisted { .. })));
    assert!(!post.is_frozen());

    Ok(())
}

#[tokio::test]
async fn test_primary_key_is_immutable_once_persisted() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let mut post = db.model::<Post>().create(attributes! { "title" => "A", "body" => "B" }).await?;
    assert!(matches!(post.set("id", 99), Err(Error::ImmutablePrimaryKey { .. })));
    post.set("id", 1)?;

    let result = post.fill(attributes! { "title" => "changed", "id" => 5 });
    assert!(matches!(result, Err(Error::ImmutablePrimaryKey { .. })));
    assert_eq!(post.get_as::<String>("title")?, "A");

    let mut fresh = Instance::<Post>::new();
    fresh.set("id", 42)?;
    Ok(())
}

#[tokio::test]
async fn test_find_or_fail_reports_missing_rows() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    assert!(db.model::<Post>().find(7).await?.is_none());

    let err = db.model::<Post>().find_or_fail(7).await.err().ok_or("expected an error")?;
    assert!(err.is_not_found());
    assert!(matches!(err, Error::ModelNotFound { ref table, .. } if table == "posts"));

    let err = db.model::<Post>().find_by_or_fail("title", "nope").await.err().ok_or("expected an error")?;
    assert!(err.is_not_found());
    assert!(db.model::<Post>().first_or_fail().await.is_err());

    Ok(())
}

#[tokio::test]
async fn test_fill_and_reload() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let mut post = db.model::<Post>().create(attributes! { "title" => "A", "body" => "B" }).await?;
    post.fill(attributes! { "title" => "C", "summary" => "short" })?;
    post.save(&db).await?;

    db.model::<Post>().equals("id", 1).update(attributes! { "body" => "from elsewhere" }).await?;
    assert_eq!(post.get_as::<String>("body")?, "B");

    post.reload(&db).await?;
    assert_eq!(post.get_as::<String>("body")?, "from elsewhere");
    assert_eq!(post.get_as::<Option<String>>("summary")?, Some("short".to_string()));
    assert!(!post.is_dirty());

    let mut gone = db.model::<Post>().find_or_fail(1).await?;
    db.model::<Post>().force_delete().await?;
    assert!(gone.reload(&db).await.is_err_and(|e| e.is_not_found()));

    Ok(())
}

#[tokio::test]
async fn test_get_as_reports_conversion_errors() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let post = db.model::<Post>().create(attributes! { "title" => "A", "body" => "B" }).await?;
    assert!(matches!(post.get_as::<i64>("title"), Err(Error::Conversion { .. })));
    assert_eq!(post.get_as::<Option<String>>("missing")?, None);

    Ok(())
}

#[tokio::test]
async fn test_generated_keys_are_written_back() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let first = db.model::<Post>().create(attributes! { "title" => "one", "body" => "x" }).await?;
    let mut second = Instance::<Post>::with_attributes(attributes! { "title" => "two", "body" => "y" });
    second.save(&db).await?;

    assert_eq!(first.primary_key_value(), Some(&Value::Int(1)));
    assert_eq!(second.primary_key_value(), Some(&Value::Int(2)));

    second.reload(&db).await?;
    assert_eq!(second.get_as::<String>("title")?, "two");
    second.delete(&db).await?;
    assert_eq!(db.model::<Post>().ids().await?, vec![Value::Int(1)]);
    Ok(())
}

#[tokio::test]
async fn test_failed_insert_leaves_instance_untouched() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    // `title` is NOT NULL, so the INSERT is rejected.
    let mut post = Instance::<Post>::with_attributes(attributes! { "body" => "no title" });
    assert!(post.save(&db).await.is_err());
    assert!(post.is_new());
    assert!(post.get("created_at").is_none());
    assert!(post.get("updated_at").is_none());

    post.set("title", "fixed")?;
    post.save(&db).await?;
    assert!(matches!(post.get("created_at"), Some(Value::Timestamp(_))));
    Ok(())
}

#[tokio::test]
async fn test_saving_a_vanished_row_fails() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let mut post = db.model::<Post>().create(attributes! { "title" => "A", "body" => "B" }).await?;
    let updated_at = post.get("updated_at").cloned();
    db.raw("DELETE FROM posts").execute().await?;

    post.set("title", "C")?;
    assert!(matches!(post.save(&db).await, Err(Error::ModelNotFound { .. })));
    assert!(post.is_dirty());
    assert_eq!(post.get("updated_at").cloned(), updated_at);
    Ok(())
}
