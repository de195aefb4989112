mod common;

use cask_orm::{Instance, Model, Projection, Value, attributes};
use common::{Article, Post, Status, Token, User, setup};
use uuid::Uuid;

#[test]
fn test_derived_conventions() {
    let post = Post::config();
    assert_eq!(post.table(), "posts");
    assert_eq!(post.primary_key(), "id");
    assert!(post.incrementing());
    assert_eq!(post.created_at(), Some("created_at"));
    assert_eq!(post.updated_at(), Some("updated_at"));
    assert_eq!(post.deleted_at(), None);
    assert_eq!(post.projection(), &Projection::All);

    let columns: Vec<&str> = Post::columns().iter().map(|c| c.name).collect();
    assert_eq!(columns, vec!["id", "title", "body", "views", "summary", "created_at", "updated_at"]);
    assert!(Post::columns()[0].is_primary_key);

    let article = Article::config();
    assert_eq!(article.deleted_at(), Some("deleted_at"));
    assert!(article.soft_deletes());

    let token = Token::config();
    assert!(!token.incrementing());
    assert_eq!(token.created_at(), None);
    assert_eq!(token.updated_at(), None);

    assert_eq!(User::config().projection().hidden().to_vec(), vec!["password".to_string()]);
}

#[tokio::test]
async fn test_hidden_fields_stay_out_of_json() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let user = db
        .model::<User>()
        .create(attributes! { "email" => "ann@example.com", "password" => "secret", "status" => Status::OnHold })
        .await?;

    let json = user.to_json();
    assert_eq!(json["email"], "ann@example.com");
    assert_eq!(json["status"], "on_hold");
    assert!(json.get("password").is_none());
    assert!(json["created_at"].is_string());

    let serialized = serde_json::to_value(&user)?;
    assert_eq!(serialized, json);

    // Reads still see hidden attributes.
    assert_eq!(user.get_as::<String>("password")?, "secret");
    let typed: User = db.model::<User>().find_or_fail(1).await?.to_model()?;
    assert_eq!(typed.status, Status::OnHold);

    Ok(())
}

#[tokio::test]
async fn test_non_incrementing_key_is_left_alone() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let id = Uuid::new_v4();
    let mut token = Instance::from_model(Token { id, name: "api".to_string() });
    token.save(&db).await?;
    assert_eq!(token.get("id"), Some(&Value::from(id)));

    let found = db.model::<Token>().find_or_fail(id).await?;
    assert_eq!(found.get_as::<Uuid>("id")?, id);
    assert_eq!(found.to_model::<Token>()?, Token { id, name: "api".to_string() });

    Ok(())
}

#[test]
fn test_enum_text_representation() -> Result<(), Box<dyn std::error::Error>> {
    assert_eq!(Status::OnHold.to_string(), "on_hold");
    assert_eq!("active".parse::<Status>()?, Status::Active);
    assert!("Active".parse::<Status>().is_err());
    assert_eq!(Value::from(Status::Active), Value::Text("active".to_string()));
    Ok(())
}

#[test]
fn test_visible_and_hidden_are_exclusive() {
    let mut config = User::config();
    config.set_visible(&["id", "email"]);
    assert!(config.projection().hidden().is_empty());

    let projected = config.projection().apply(&attributes! { "id" => 1, "email" => "a", "password" => "p" });
    assert_eq!(projected.len(), 2);
    assert!(!projected.contains_key("password"));
}
