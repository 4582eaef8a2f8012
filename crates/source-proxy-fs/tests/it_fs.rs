use source_proxy::policy::Policy;
use source_proxy::service::{API_KEY_HEADER, ProxyServiceBuilder};
use source_proxy::source::{Source, SourceError};
use source_proxy::spool::Spool;
use source_proxy_fs::FileSystem;

use std::fs;

use anyhow::Result;
use axum::Router;
use axum::body::Body;
use http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

const POLICY: &str = r#"{
    "api_keys": { "key-0001": ["exporters"] },
    "rules": [{ "resource": "tenant-a/*", "group": "exporters", "methods": ["GET", "PUT"] }]
}"#;

fn setup() -> Result<(TempDir, FileSystem)> {
    let dir = tempfile::tempdir()?;
    let fs = FileSystem::new(dir.path())?;
    Ok((dir, fs))
}

async fn fetch_string(fs: &FileSystem, prefix: &str, filename: &str) -> Result<String, SourceError> {
    let mut out = Vec::new();
    fs.fetch(prefix, filename, &mut out).await?;
    Ok(String::from_utf8(out).unwrap())
}

#[tokio::test]
async fn store_and_fetch() -> Result<()> {
    let (dir, fs) = setup()?;

    let mut body = Spool::from_bytes("id,value\n1,42\n").await?;
    let name = fs.store("tenant-a", "data-1.csv", &mut body).await?;
    assert_eq!(name, "data-1.csv");

    let on_disk = fs::read_to_string(dir.path().join("tenant-a").join("data-1.csv"))?;
    assert_eq!(on_disk, "id,value\n1,42\n");
    assert_eq!(fetch_string(&fs, "tenant-a", "data-1.csv").await?, "id,value\n1,42\n");
    Ok(())
}

#[tokio::test]
async fn store_replaces_and_leaves_no_temp_files() -> Result<()> {
    let (dir, fs) = setup()?;

    fs.store("tenant-a", "f", &mut Spool::from_bytes("first version").await?).await?;
    fs.store("tenant-a", "f", &mut Spool::from_bytes("second").await?).await?;
    assert_eq!(fetch_string(&fs, "tenant-a", "f").await?, "second");

    let names: Vec<_> = fs::read_dir(dir.path().join("tenant-a"))?
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(names, ["f"]);
    Ok(())
}

#[tokio::test]
async fn failed_store_removes_temp_file() -> Result<()> {
    let (dir, fs) = setup()?;
    let prefix_dir = dir.path().join("tenant-a");
    fs::create_dir_all(prefix_dir.join("taken"))?;
    fs::write(prefix_dir.join("taken").join("inner"), "x")?;

    let mut body = Spool::from_bytes("new").await?;
    assert!(fs.store("tenant-a", "taken", &mut body).await.is_err());

    let names: Vec<_> = fs::read_dir(&prefix_dir)?
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(names, ["taken"]);
    Ok(())
}

#[tokio::test]
async fn fetch_missing() -> Result<()> {
    let (dir, fs) = setup()?;
    fs::create_dir(dir.path().join("tenant-a"))?;
    fs::create_dir(dir.path().join("tenant-a").join("subdir"))?;

    let mut out = Vec::new();
    assert!(matches!(fs.fetch("tenant-a", "nope", &mut out).await, Err(SourceError::NotFound)));
    assert!(matches!(fs.fetch("tenant-b", "nope", &mut out).await, Err(SourceError::NotFound)));
    assert!(matches!(fs.fetch("tenant-a", "subdir", &mut out).await, Err(SourceError::NotFound)));
    Ok(())
}

#[tokio::test]
async fn escaping_names_are_rejected() -> Result<()> {
    let (_dir, fs) = setup()?;
    let mut out = Vec::new();

    for (prefix, filename) in [("..", "etc"), ("tenant-a", ".."), ("tenant-a", ".secret")] {
        let result = fs.fetch(prefix, filename, &mut out).await;
        assert!(matches!(result, Err(SourceError::Io(_))), "{prefix}/{filename}");
    }

    let mut body = Spool::from_bytes("x").await?;
    assert!(fs.store("tenant-a", ".hidden", &mut body).await.is_err());
    Ok(())
}

#[tokio::test]
async fn fetch_next_in_name_order() -> Result<()> {
    let (dir, fs) = setup()?;
    let prefix_dir = dir.path().join("tenant-a");
    fs::create_dir(&prefix_dir)?;
    for name in ["c.csv", "a.csv", "b.csv", ".a.tmp"] {
        fs::write(prefix_dir.join(name), name)?;
    }
    fs::create_dir(prefix_dir.join("aa-dir"))?;

    assert_eq!(fs.fetch_next("tenant-a", "").await?, "a.csv");
    assert_eq!(fs.fetch_next("tenant-a", "a.csv").await?, "b.csv");
    assert_eq!(fs.fetch_next("tenant-a", "b").await?, "b.csv");
    assert_eq!(fs.fetch_next("tenant-a", "b.csv").await?, "c.csv");
    assert!(matches!(fs.fetch_next("tenant-a", "c.csv").await, Err(SourceError::NotFound)));
    assert!(matches!(fs.fetch_next("tenant-b", "").await, Err(SourceError::NotFound)));
    Ok(())
}

async fn send(router: &Router, method: Method, uri: &str, body: impl Into<Body>) -> Result<(StatusCode, String)> {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header(API_KEY_HEADER, "key-0001")
        .body(body.into())?;
    let resp = router.clone().oneshot(req).await?;
    let status = resp.status();
    let body = resp.into_body().collect().await?.to_bytes();
    Ok((status, String::from_utf8(body.to_vec())?))
}

#[tokio::test]
async fn export_series_over_http() -> Result<()> {
    let (dir, fs) = setup()?;
    let (keys, permissions) = Policy::from_json(POLICY)?.into_parts();

    let mut b = ProxyServiceBuilder::new(fs);
    b.set_key_resolver(keys);
    b.set_permissions(permissions);
    let router = b.build()?.router();

    let (status, name) = send(&router, Method::PUT, "/export/tenant-a/part-000.csv", "zero").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(name, "part-001.csv");

    let (_, name) = send(&router, Method::PUT, &format!("/export/tenant-a/{name}"), "one").await?;
    assert_eq!(name, "part-002.csv");

    let (status, next) = send(&router, Method::GET, "/next/tenant-a", Body::empty()).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(next, r#""part-001.csv""#);

    let (_, next) = send(&router, Method::GET, "/next/tenant-a/part-001.csv", Body::empty()).await?;
    assert_eq!(next, r#""part-002.csv""#);

    let (status, body) = send(&router, Method::GET, "/get/tenant-a/part-002.csv", Body::empty()).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "one");

    let (status, _) = send(&router, Method::GET, "/next/tenant-a/part-002.csv", Body::empty()).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(dir.path().join("tenant-a").join("part-001.csv").is_file());
    Ok(())
}
