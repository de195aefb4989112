mod common;

use cask_orm::{Error, Value, attributes};
use common::{Article, setup};

#[tokio::test]
async fn test_soft_deleted_rows_are_hidden_by_default() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let mut kept = db.model::<Article>().create(attributes! { "title" => "kept" }).await?;
    let mut trashed = db.model::<Article>().create(attributes! { "title" => "trashed" }).await?;
    trashed.delete(&db).await?;

    assert!(trashed.is_trashed());
    assert!(trashed.is_frozen());
    assert!(!kept.is_trashed());

    assert_eq!(db.model::<Article>().count().await?, 1);
    assert_eq!(db.model::<Article>().with_trashed().count().await?, 2);

    let only = db.model::<Article>().only_trashed().ids().await?;
    assert_eq!(only, vec![Value::Int(2)]);

    assert!(db.model::<Article>().find(2).await?.is_none());
    let found = db.model::<Article>().with_trashed().find(2).await?.ok_or("trashed row missing")?;
    assert!(found.is_trashed());
    assert!(found.is_frozen());

    kept.set("title", "still here")?;
    kept.save(&db).await?;
    Ok(())
}

#[tokio::test]
async fn test_restore_clears_delete_timestamp() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let mut article = db.model::<Article>().create(attributes! { "title" => "oops" }).await?;
    article.delete(&db).await?;
    assert!(matches!(article.set("title", "x"), Err(Error::FrozenInstance { .. })));

    let mut loaded = db.model::<Article>().only_trashed().first_or_fail().await?;
    loaded.restore(&db).await?;
    assert!(!loaded.is_trashed());
    assert_eq!(loaded.get("deleted_at"), Some(&Value::Null));
    assert_eq!(db.model::<Article>().count().await?, 1);

    // The frozen instance can be restored too and becomes writable again.
    article.delete(&db).await.err().ok_or("expected frozen error")?;
    db.model::<Article>().delete().await?;
    article.restore(&db).await?;
    assert!(!article.is_frozen());
    article.set("title", "back")?;
    article.save(&db).await?;

    let stored = db.model::<Article>().find_or_fail(1).await?;
    assert_eq!(stored.get_as::<String>("title")?, "back");
    Ok(())
}

#[tokio::test]
async fn test_force_delete_removes_the_row() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let mut article = db.model::<Article>().create(attributes! { "title" => "gone" }).await?;
    article.force_delete(&db).await?;

    assert!(article.is_frozen());
    assert_eq!(db.model::<Article>().with_trashed().count().await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_bulk_delete_is_soft() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    db.model::<Article>()
        .create_many([attributes! { "title" => "a" }, attributes! { "title" => "b" }, attributes! { "title" => "c" }])
        .await?;

    let affected = db.model::<Article>().equals("title", "a").delete().await?;
    assert_eq!(affected, 1);
    assert_eq!(db.model::<Article>().count().await?, 2);
    assert_eq!(db.model::<Article>().with_trashed().count().await?, 3);

    let purged = db.model::<Article>().only_trashed().force_delete().await?;
    assert_eq!(purged, 1);
    assert_eq!(db.model::<Article>().with_trashed().count().await?, 2);
    Ok(())
}

#[tokio::test]
async fn test_loaded_trashed_rows_are_read_only() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let mut article = db.model::<Article>().create(attributes! { "title" => "old" }).await?;
    article.delete(&db).await?;
    let deleted_at = article.get("deleted_at").cloned();

    let mut loaded = db.model::<Article>().with_trashed().first_or_fail().await?;
    assert!(loaded.is_frozen());
    assert!(matches!(loaded.set("title", "new"), Err(Error::FrozenInstance { .. })));
    assert!(matches!(loaded.fill(attributes! { "title" => "new" }), Err(Error::FrozenInstance { .. })));
    assert!(matches!(loaded.save(&db).await, Err(Error::FrozenInstance { .. })));
    assert!(matches!(loaded.delete(&db).await, Err(Error::FrozenInstance { .. })));

    let stored = db.model::<Article>().only_trashed().first_or_fail().await?;
    assert_eq!(stored.get("deleted_at").cloned(), deleted_at);
    assert_eq!(stored.get_as::<String>("title")?, "old");

    loaded.restore(&db).await?;
    assert!(!loaded.is_frozen());
    loaded.set("title", "new")?;
    loaded.save(&db).await?;
    Ok(())
}
