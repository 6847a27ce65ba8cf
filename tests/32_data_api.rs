mod common;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::TestServer;

#[tokio::test]
async fn category_create_search_delete_round() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.seed_user("root", true, true).await?;
    let admin = server.bearer("root").await?;

    let id = server.create_category(&admin, "Cats & Kittens").await?;
    server.create_category(&admin, "Dogs").await?;

    let body: Value = server
        .client
        .get(server.url("/categories?search[name]=cAtS"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["count"], json!(1));
    assert_eq!(body["result"][0]["_id"], json!(id));

    let res = server.client.delete(server.url(&format!("/categories/{}", id))).header("Authorization", &admin).send().await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = server.client.get(server.url(&format!("/categories/{}", id))).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await?;
    assert_eq!(body["message"], json!("Category not found"));

    let res = server.client.delete(server.url(&format!("/categories/{}", id))).header("Authorization", &admin).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn blog_author_comes_from_caller_and_relations_expand() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.seed_user("root", true, true).await?;
    let ada_id = server.seed_user("ada", false, true).await?;
    let category = server.create_category(&server.bearer("root").await?, "rust").await?;
    let auth = server.bearer("ada").await?;

    let res = server
        .client
        .post(server.url("/blogs"))
        .header("Authorization", &auth)
        .json(&json!({ "blogCategoryId": category, "title": "Ownership", "content": "...", "userId": "someone-else" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await?;
    assert_eq!(body["result"]["userId"], json!(ada_id));

    let list: Value = server.client.get(server.url("/blogs")).send().await?.json().await?;
    assert_eq!(list["count"], json!(1));
    assert_eq!(list["result"][0]["userId"]["username"], json!("ada"));
    assert!(list["result"][0]["userId"].get("password").is_none());
    assert_eq!(list["result"][0]["blogCategoryId"]["name"], json!("rust"));
    assert_eq!(list["details"]["pages"], json!(false));
    Ok(())
}

#[tokio::test]
async fn blog_views_count_once_per_address() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.seed_user("root", true, true).await?;
    let admin = server.bearer("root").await?;
    let category = server.create_category(&admin, "rust").await?;
    let blog = server.create_blog(&admin, &category, "Views").await?;
    let path = format!("/blogs/{}", blog);

    for (address, expected) in [("198.51.100.1", 1), ("198.51.100.1", 1), ("198.51.100.2", 2)] {
        let body: Value = server
            .client
            .get(server.url(&path))
            .header("X-Forwarded-For", address)
            .send()
            .await?
            .json()
            .await?;
        assert_eq!(body["views"], json!(expected));
    }

    let res = server.client.get(server.url("/blogs/missing")).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn likes_toggle_per_user() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.seed_user("root", true, true).await?;
    let ada_id = server.seed_user("ada", false, true).await?;
    let admin = server.bearer("root").await?;
    let ada = server.bearer("ada").await?;
    let category = server.create_category(&admin, "rust").await?;
    let blog = server.create_blog(&admin, &category, "Likes").await?;

    let like_url = server.url(&format!("/blogs/{}/postLike", blog));
    let body: Value = server.client.post(&like_url).header("Authorization", &ada).send().await?.json().await?;
    assert_eq!(body["didUserLike"], json!(true));
    assert_eq!(body["countOfLikes"], json!(1));
    assert_eq!(body["likes"], json!([ada_id]));

    let body: Value = server
        .client
        .get(server.url(&format!("/blogs/{}/getLike", blog)))
        .header("Authorization", &admin)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["didUserLike"], json!(false));
    assert_eq!(body["countOfLikes"], json!(1));

    let body: Value = server.client.post(&like_url).header("Authorization", &ada).send().await?.json().await?;
    assert_eq!(body["didUserLike"], json!(false));
    assert_eq!(body["countOfLikes"], json!(0));

    let res = server.client.post(&like_url).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn only_owner_or_admin_modifies_blog() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.seed_user("root", true, true).await?;
    server.seed_user("ada", false, true).await?;
    server.seed_user("bob", false, true).await?;
    let admin = server.bearer("root").await?;
    let ada = server.bearer("ada").await?;
    let bob = server.bearer("bob").await?;
    let category = server.create_category(&admin, "rust").await?;
    let blog = server.create_blog(&ada, &category, "Mine").await?;
    let path = server.url(&format!("/blogs/{}", blog));

    let res = server.client.put(&path).header("Authorization", &bob).json(&json!({ "title": "Stolen" })).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = server.client.patch(&path).header("Authorization", &ada).json(&json!({ "title": "Renamed" })).send().await?;
    assert_eq!(res.status(), StatusCode::ACCEPTED);
    let body: Value = res.json().await?;
    assert_eq!(body["result"]["modifiedCount"], json!(1));
    assert_eq!(body["newData"]["title"], json!("Renamed"));

    let res = server.client.delete(&path).header("Authorization", &bob).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let res = server.client.delete(&path).header("Authorization", &admin).send().await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let res = server.client.delete(&path).header("Authorization", &admin).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn comments_attach_to_existing_blogs() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.seed_user("root", true, true).await?;
    let admin = server.bearer("root").await?;
    let category = server.create_category(&admin, "rust").await?;
    let blog = server.create_blog(&admin, &category, "Discuss").await?;

    let res = server
        .client
        .post(server.url("/comments"))
        .header("Authorization", &admin)
        .json(&json!({ "blogId": "missing", "comment": "hi" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = server
        .client
        .post(server.url("/comments"))
        .header("Authorization", &admin)
        .json(&json!({ "blogId": blog, "comment": "first!" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await?;
    let comment = body["result"]["_id"].as_str().context("comment id")?.to_string();

    let body: Value = server.client.get(server.url(&format!("/comments/{}", comment))).send().await?.json().await?;
    assert_eq!(body["result"]["blogId"]["title"], json!("Discuss"));

    let body: Value = server.client.get(server.url("/comments")).send().await?.json().await?;
    assert_eq!(body["result"][0]["userId"]["username"], json!("root"));
    Ok(())
}

#[tokio::test]
async fn registration_enforces_uniqueness_and_strips_flags() -> Result<()> {
    let server = TestServer::spawn().await?;
    let payload = json!({ "username": "ada", "email": "ada@example.com", "password": "pw", "isAdmin": true });

    let res = server.client.post(server.url("/users")).json(&payload).send().await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await?;
    assert_eq!(body["result"]["isAdmin"], json!(false));
    assert!(body["result"].get("password").is_none());
    let id = body["result"]["_id"].as_str().context("user id")?.to_string();

    let res = server.client.post(server.url("/users")).json(&payload).send().await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = server
        .client
        .post(server.url("/auth/login"))
        .json(&json!({ "email": "ada@example.com", "password": "pw" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let login: Value = res.json().await?;
    let auth = format!("Bearer {}", login["bearer"]["access"].as_str().context("access")?);

    let res = server.client.get(server.url(&format!("/users/{}", id))).header("Authorization", &auth).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let other = server.seed_user("bob", false, true).await?;
    let res = server.client.get(server.url(&format!("/users/{}", other))).header("Authorization", &auth).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn malformed_bodies_are_rejected() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.seed_user("root", true, true).await?;
    let admin = server.bearer("root").await?;

    let res = server
        .client
        .post(server.url("/categories"))
        .header("Authorization", &admin)
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server
        .client
        .post(server.url("/categories"))
        .header("Authorization", &admin)
        .json(&json!({ "title": "no name" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = server
        .client
        .post(server.url("/categories"))
        .header("Authorization", &admin)
        .json(&json!({ "name": "   " }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}
