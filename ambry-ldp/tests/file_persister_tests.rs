use ambry_ldp::{LdpFilePersister, RemoteFile};
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn persister(server: &MockServer) -> LdpFilePersister {
    LdpFilePersister::new(format!("{}/sync/", server.uri()), reqwest::Client::new())
}

fn container_body(members: &[&str]) -> serde_json::Value {
    serde_json::json!({
        "ldp:contains": members.iter().map(|m| serde_json::json!({"@id": m})).collect::<Vec<_>>()
    })
}

// --- ensure_path ---

#[tokio::test]
async fn ensure_path_creates_missing_parents_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/sync/a/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/sync/a/b/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sync/a/"))
        .and(header("Slug", "b"))
        .and(header("Link", "<http://www.w3.org/ns/ldp#BasicContainer>; rel=\"type\""))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    persister(&server).ensure_path("a/b/c.txt").await.unwrap();
}

#[tokio::test]
async fn ensure_path_tolerates_already_existing_container() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/sync/a/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    // Another writer raced us; 409 from the pod still means the container exists.
    Mock::given(method("POST"))
        .and(path("/sync/"))
        .respond_with(ResponseTemplate::new(409))
        .mount(&server)
        .await;

    persister(&server).ensure_path("a/f.txt").await.unwrap();
}

#[tokio::test]
async fn ensure_path_propagates_unexpected_probe_status() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/sync/a/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = persister(&server).ensure_path("a/f.txt").await.unwrap_err();
    assert!(err.to_string().contains("500"));
}

// --- put / get / stat / delete ---

#[tokio::test]
async fn put_file_returns_etag_and_sets_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/sync/notes.txt"))
        .and(header("Content-Type", "text/plain; charset=utf-8"))
        .and(body_string("hello"))
        .respond_with(ResponseTemplate::new(201).insert_header("ETag", "\"v1\""))
        .mount(&server)
        .await;

    let etag = persister(&server)
        .put_file("notes.txt", b"hello", "text/plain; charset=utf-8")
        .await
        .unwrap();
    assert_eq!(etag.as_deref(), Some("\"v1\""));
}

#[tokio::test]
async fn put_file_encodes_path_segments() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/sync/my%20docs/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/sync/my%20docs/a%20b.txt"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let etag = persister(&server)
        .put_file("my docs/a b.txt", b"x", "application/octet-stream")
        .await
        .unwrap();
    assert_eq!(etag, None);
}

#[tokio::test]
async fn get_file_returns_bytes_and_etag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sync/notes.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"v2\"")
                .set_body_bytes(b"hello".to_vec()),
        )
        .mount(&server)
        .await;

    let fetched = persister(&server).get_file("notes.txt").await.unwrap().unwrap();
    assert_eq!(fetched.bytes, b"hello");
    assert_eq!(fetched.etag.as_deref(), Some("\"v2\""));
}

#[tokio::test]
async fn get_file_missing_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sync/gone.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert!(persister(&server).get_file("gone.txt").await.unwrap().is_none());
}

#[tokio::test]
async fn stat_file_reads_etag_and_size() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/sync/notes.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"v3\"")
                .insert_header("Content-Length", "5"),
        )
        .mount(&server)
        .await;

    let stat = persister(&server).stat_file("notes.txt").await.unwrap().unwrap();
    assert_eq!(stat.etag.as_deref(), Some("\"v3\""));
    assert_eq!(stat.size, 5);
}

#[tokio::test]
async fn stat_file_without_length_defaults_to_zero() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/sync/notes.txt"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let stat = persister(&server).stat_file("notes.txt").await.unwrap().unwrap();
    assert_eq!(stat.etag, None);
    assert_eq!(stat.size, 0);
}

#[tokio::test]
async fn delete_file_is_idempotent() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/sync/gone.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    persister(&server).delete_file("gone.txt").await.unwrap();
}

// --- listing ---

#[tokio::test]
async fn list_files_recurses_into_sub_containers() {
    let server = MockServer::start().await;
    let base = format!("{}/sync/", server.uri());
    Mock::given(method("GET"))
        .and(path("/sync/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(container_body(&[
            &format!("{base}top.txt"),
            &format!("{base}sub/"),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sync/sub/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(container_body(&[&format!("{base}sub/inner.txt")])),
        )
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/sync/top.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"t\"")
                .insert_header("Content-Length", "3"),
        )
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/sync/sub/inner.txt"))
        .respond_with(ResponseTemplate::new(200).insert_header("ETag", "\"i\""))
        .mount(&server)
        .await;

    let mut files = persister(&server).list_files(None).await.unwrap();
    files.sort_by(|a, b| a.path.cmp(&b.path));
    assert_eq!(
        files,
        vec![
            RemoteFile { path: "sub/inner.txt".into(), etag: Some("\"i\"".into()), size: 0 },
            RemoteFile { path: "top.txt".into(), etag: Some("\"t\"".into()), size: 3 },
        ]
    );
}

#[tokio::test]
async fn list_files_follows_pagination_and_dedupes() {
    let server = MockServer::start().await;
    let base = format!("{}/sync/", server.uri());
    let next = format!("{}/sync/page2", server.uri());
    Mock::given(method("GET"))
        .and(path("/sync/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Link", format!("<{next}>; rel=\"next\"").as_str())
                .set_body_json(container_body(&[&format!("{base}a.txt")])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sync/page2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(container_body(&[
            &format!("{base}a.txt"),
            &format!("{base}b.txt"),
        ])))
        .mount(&server)
        .await;
    for name in ["a.txt", "b.txt"] {
        Mock::given(method("HEAD"))
            .and(path(format!("/sync/{name}")))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
    }

    let files = persister(&server).list_files(None).await.unwrap();
    let mut paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
    paths.sort();
    assert_eq!(paths, vec!["a.txt", "b.txt"]);
}

#[tokio::test]
async fn list_files_decodes_member_urls_and_skips_foreign_members() {
    let server = MockServer::start().await;
    let base = format!("{}/sync/", server.uri());
    Mock::given(method("GET"))
        .and(path("/sync/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(container_body(&[
            &format!("{base}my%20docs%2Fa.txt"),
            "https://elsewhere.example/other.txt",
        ])))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/sync/my%20docs/a.txt"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let files = persister(&server).list_files(None).await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].path, "my docs/a.txt");
}

#[tokio::test]
async fn delete_all_removes_every_listed_file() {
    let server = MockServer::start().await;
    let base = format!("{}/sync/", server.uri());
    Mock::given(method("GET"))
        .and(path("/sync/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(container_body(&[
            &format!("{base}a.txt"),
            &format!("{base}b.txt"),
        ])))
        .mount(&server)
        .await;
    for name in ["a.txt", "b.txt"] {
        Mock::given(method("HEAD"))
            .and(path(format!("/sync/{name}")))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path(format!("/sync/{name}")))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
    }

    persister(&server).delete_all().await.unwrap();
}
