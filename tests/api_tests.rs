// Integration tests for the REST surface
// Drives the router directly with tower's oneshot; no TCP socket involved

mod api_tests {
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use forgeboard_lib::file_storage::lock::LockManager;
    use forgeboard_lib::server::{build_router, AppState};
    use forgeboard_lib::shutdown::ShutdownState;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::util::ServiceExt;

    fn test_app(data_dir: &TempDir) -> Router {
        test_app_with_locks(data_dir, Arc::new(LockManager::new()))
    }

    fn test_app_with_locks(data_dir: &TempDir, locks: Arc<LockManager>) -> Router {
        let state = AppState::new(
            data_dir.path().to_path_buf(),
            locks,
            ShutdownState::new(),
        );
        build_router(state)
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(v) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(v.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            // Extractor rejections (e.g. deny_unknown_fields) are answered by
            // axum with a text/plain body; surface those as Null rather than
            // panicking so callers can assert on the status class alone.
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn register_workspace(app: &Router, workspace: &TempDir) -> String {
        let (status, body) = send(
            app,
            "POST",
            "/instances",
            Some(json!({ "path": workspace.path().to_string_lossy() })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "register failed: {}", body);
        body["id"].as_str().unwrap().to_string()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_instance_lifecycle() {
        let data_dir = TempDir::new().unwrap();
        let workspace = TempDir::new().unwrap();
        let app = test_app(&data_dir);

        // Register
        let (status, body) = send(
            &app,
            "POST",
            "/instances",
            Some(json!({
                "path": workspace.path().to_string_lossy(),
                "name": "Acme App"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let id = body["id"].as_str().unwrap().to_string();
        assert!(id.starts_with("inst_"));
        assert_eq!(body["name"], "Acme App");

        // Registration initializes the workspace layout
        assert!(workspace.path().join(".forgeboard").exists());

        // List
        let (status, body) = send(&app, "GET", "/instances", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["instances"].as_array().unwrap().len(), 1);

        // Re-registering the same path keeps the id (upsert)
        let (_, body) = send(
            &app,
            "POST",
            "/instances",
            Some(json!({ "path": workspace.path().to_string_lossy() })),
        )
        .await;
        assert_eq!(body["id"], id.as_str());
        let (_, body) = send(&app, "GET", "/instances", None).await;
        assert_eq!(body["instances"].as_array().unwrap().len(), 1);

        // Remove
        let (status, _) = send(&app, "DELETE", &format!("/instances/{}", id), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, body) = send(&app, "GET", "/instances", None).await;
        assert!(body["instances"].as_array().unwrap().is_empty());

        // Removing again is a structured 404
        let (status, body) = send(&app, "DELETE", &format!("/instances/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "not_found");
        assert_eq!(body["retryable"], false);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_prd_create_list_update() {
        let data_dir = TempDir::new().unwrap();
        let workspace = TempDir::new().unwrap();
        let app = test_app(&data_dir);
        let id = register_workspace(&app, &workspace).await;
        let prds_uri = format!("/instances/{}/prds", id);

        // Create
        let (status, body) = send(
            &app,
            "POST",
            &prds_uri,
            Some(json!({
                "filename": "auth-flow.md",
                "title": "Auth flow",
                "priority": "high",
                "tags": ["Backend", "security"]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["filename"], "auth-flow.md");
        assert_eq!(body["status"], "pending");
        assert_eq!(body["priority"], "high");
        // Tags come back normalized and sorted
        assert_eq!(body["tags"], json!(["backend", "security"]));
        assert!(body["createdAt"].is_string());

        // Duplicate filename is a structured conflict
        let (status, body) = send(
            &app,
            "POST",
            &prds_uri,
            Some(json!({ "filename": "auth-flow.md", "title": "Again" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "duplicate_filename");
        assert_eq!(body["retryable"], false);

        // List carries records, the tag index, and derived stats
        let (status, body) = send(&app, "GET", &prds_uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prds"].as_array().unwrap().len(), 1);
        assert_eq!(body["tags"], json!(["backend", "security"]));
        assert_eq!(body["stats"]["pending"], 1);
        assert_eq!(body["stats"]["total"], 1);

        // Move the card; response pairs the record with fresh counts
        let (status, body) = send(
            &app,
            "PATCH",
            &prds_uri,
            Some(json!({ "filename": "auth-flow.md", "status": "in-progress" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prd"]["status"], "in-progress");
        assert_eq!(body["stats"]["pending"], 0);
        assert_eq!(body["stats"]["inProgress"], 1);

        // Updating a missing record is a 404
        let (status, body) = send(
            &app,
            "PATCH",
            &prds_uri,
            Some(json!({ "filename": "ghost.md", "status": "blocked" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "not_found");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_prd_validation_errors() {
        let data_dir = TempDir::new().unwrap();
        let workspace = TempDir::new().unwrap();
        let app = test_app(&data_dir);
        let id = register_workspace(&app, &workspace).await;
        let prds_uri = format!("/instances/{}/prds", id);

        // Traversal-shaped filename never reaches the filesystem
        let (status, body) = send(
            &app,
            "POST",
            &prds_uri,
            Some(json!({ "filename": "../evil.md", "title": "Nope" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "validation_failed");
        assert_eq!(body["retryable"], false);

        // Unknown fields in a partial update are rejected at the extractor
        let (status, _) = send(
            &app,
            "PATCH",
            &prds_uri,
            Some(json!({ "filename": "a.md", "owner": "me" })),
        )
        .await;
        assert!(status.is_client_error());

        // Nothing was created along the way
        let (_, body) = send(&app, "GET", &prds_uri, None).await;
        assert!(body["prds"].as_array().unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_prd_listing_filters() {
        let data_dir = TempDir::new().unwrap();
        let workspace = TempDir::new().unwrap();
        let app = test_app(&data_dir);
        let id = register_workspace(&app, &workspace).await;
        let prds_uri = format!("/instances/{}/prds", id);

        for (filename, title, tags) in [
            ("api-auth.md", "API auth", json!(["backend", "security"])),
            ("api-docs.md", "API docs", json!(["docs"])),
            ("ui-theme.md", "Theme picker", json!(["frontend"])),
        ] {
            let (status, _) = send(
                &app,
                "POST",
                &prds_uri,
                Some(json!({ "filename": filename, "title": title, "tags": tags })),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        // Archive one record
        let (status, _) = send(
            &app,
            "PATCH",
            &prds_uri,
            Some(json!({ "filename": "ui-theme.md", "archived": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        // Substring query over title, filename, and tags
        let (_, body) = send(&app, "GET", &format!("{}?query=auth", prds_uri), None).await;
        assert_eq!(body["prds"].as_array().unwrap().len(), 1);
        assert_eq!(body["prds"][0]["filename"], "api-auth.md");

        // Tag filter is AND
        let (_, body) = send(
            &app,
            "GET",
            &format!("{}?tags=backend,security", prds_uri),
            None,
        )
        .await;
        assert_eq!(body["prds"].as_array().unwrap().len(), 1);

        // Archived records are hidden by default and shown on request
        let (_, body) = send(&app, "GET", &prds_uri, None).await;
        assert_eq!(body["prds"].as_array().unwrap().len(), 2);
        let (_, body) = send(
            &app,
            "GET",
            &format!("{}?includeArchived=true", prds_uri),
            None,
        )
        .await;
        assert_eq!(body["prds"].as_array().unwrap().len(), 3);

        // Filtering narrows the record list only; the tag index and the
        // stats always describe the whole collection
        let (_, body) = send(&app, "GET", &format!("{}?query=auth", prds_uri), None).await;
        assert_eq!(body["stats"]["total"], 3);
        assert_eq!(body["stats"]["archived"], 1);
        assert_eq!(body["tags"], json!(["backend", "docs", "security"]));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_prd_content_round_trip() {
        let data_dir = TempDir::new().unwrap();
        let workspace = TempDir::new().unwrap();
        let app = test_app(&data_dir);
        let id = register_workspace(&app, &workspace).await;

        let (status, _) = send(
            &app,
            "POST",
            &format!("/instances/{}/prds", id),
            Some(json!({ "filename": "auth.md", "title": "Placeholder" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let content_uri = format!("/instances/{}/prds/auth.md/content", id);

        // A record without a written body reads as empty
        let (status, body) = send(&app, "GET", &content_uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["filename"], "auth.md");
        assert_eq!(body["content"], "");

        // Writing a body re-derives the title from the first heading
        let (status, body) = send(
            &app,
            "PUT",
            &content_uri,
            Some(json!({ "content": "# Auth Flow\n\nDetails here.\n" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Auth Flow");

        let (_, body) = send(&app, "GET", &content_uri, None).await;
        assert_eq!(body["content"], "# Auth Flow\n\nDetails here.\n");

        // Content of an unregistered record is a 404, even though the
        // route filename is well formed
        let (status, body) = send(
            &app,
            "GET",
            &format!("/instances/{}/prds/ghost.md/content", id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "not_found");

        // A traversal-shaped segment is rejected before any path is built
        let (status, body) = send(
            &app,
            "PUT",
            &format!("/instances/{}/prds/..%2Fevil.md/content", id),
            Some(json!({ "content": "x" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "validation_failed");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_skill_crud() {
        let data_dir = TempDir::new().unwrap();
        let workspace = TempDir::new().unwrap();
        let app = test_app(&data_dir);
        let id = register_workspace(&app, &workspace).await;
        let skills_uri = format!("/instances/{}/skills", id);

        let (status, body) = send(
            &app,
            "POST",
            &skills_uri,
            Some(json!({
                "filename": "error-handling.md",
                "title": "Error handling",
                "category": "conventions",
                "tags": ["rust"],
                "content": "Prefer Result over panics."
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["category"], "conventions");
        assert!(body["updatedAt"].is_string());

        // Creating without content is a validation failure
        let (status, body) = send(
            &app,
            "POST",
            &skills_uri,
            Some(json!({
                "filename": "empty.md",
                "title": "Empty",
                "category": "misc",
                "content": "   "
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "validation_failed");

        // Update by url filename
        let (status, body) = send(
            &app,
            "PUT",
            &format!("{}/error-handling.md", skills_uri),
            Some(json!({ "content": "Prefer Result; reserve panics for bugs." })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["content"], "Prefer Result; reserve panics for bugs.");
        assert_eq!(body["title"], "Error handling");

        let (_, body) = send(&app, "GET", &skills_uri, None).await;
        assert_eq!(body["skills"].as_array().unwrap().len(), 1);
        assert_eq!(body["tags"], json!(["rust"]));

        // Delete
        let (status, _) = send(
            &app,
            "DELETE",
            &format!("{}/error-handling.md", skills_uri),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = send(
            &app,
            "DELETE",
            &format!("{}/error-handling.md", skills_uri),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "not_found");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_skill_export_import_between_instances() {
        let data_dir = TempDir::new().unwrap();
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let app = test_app(&data_dir);
        let source_id = register_workspace(&app, &source).await;
        let target_id = register_workspace(&app, &target).await;

        for name in ["a.md", "b.md"] {
            let (status, _) = send(
                &app,
                "POST",
                &format!("/instances/{}/skills", source_id),
                Some(json!({
                    "filename": name,
                    "title": name,
                    "category": "general",
                    "content": format!("Content of {}", name)
                })),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        // Export from the source instance
        let (status, export) = send(
            &app,
            "POST",
            "/skills/export",
            Some(json!({ "instanceId": source_id, "skillFiles": ["a.md", "b.md"] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(export["skillCount"], 2);
        assert!(export["exportedAt"].is_string());

        // Export is all-or-nothing
        let (status, body) = send(
            &app,
            "POST",
            "/skills/export",
            Some(json!({ "instanceId": source_id, "skillFiles": ["a.md", "missing.md"] })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "not_found");

        // Import the bundle into the target instance
        let (status, report) = send(
            &app,
            "POST",
            "/skills/import",
            Some(json!({ "instanceId": target_id, "skills": export["skills"] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["imported"], 2);
        assert_eq!(report["skipped"], 0);
        assert!(report["errors"].as_array().unwrap().is_empty());

        // Re-importing is an idempotent no-op: duplicates skip silently
        let (status, report) = send(
            &app,
            "POST",
            "/skills/import",
            Some(json!({ "instanceId": target_id, "skills": export["skills"] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["imported"], 0);
        assert_eq!(report["skipped"], 2);
        assert!(report["errors"].as_array().unwrap().is_empty());

        let (_, body) = send(&app, "GET", &format!("/instances/{}/skills", target_id), None).await;
        assert_eq!(body["skills"].as_array().unwrap().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_skill_import_partial_success() {
        let data_dir = TempDir::new().unwrap();
        let workspace = TempDir::new().unwrap();
        let app = test_app(&data_dir);
        let id = register_workspace(&app, &workspace).await;

        let (status, report) = send(
            &app,
            "POST",
            "/skills/import",
            Some(json!({
                "instanceId": id,
                "skills": [
                    {
                        "filename": "good.md",
                        "title": "Good",
                        "category": "general",
                        "content": "Fine."
                    },
                    {
                        "filename": "../evil.md",
                        "title": "Evil",
                        "category": "general",
                        "content": "Escape attempt."
                    },
                    42
                ]
            })),
        )
        .await;

        // One bad record never aborts the batch
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["imported"], 1);
        assert_eq!(report["skipped"], 2);
        let errors = report["errors"].as_array().unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0]["filename"], "../evil.md");
        assert!(errors[1]["filename"].is_null());

        let (_, body) = send(&app, "GET", &format!("/instances/{}/skills", id), None).await;
        assert_eq!(body["skills"].as_array().unwrap().len(), 1);
        assert_eq!(body["skills"][0]["filename"], "good.md");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_unknown_instance_is_not_found() {
        let data_dir = TempDir::new().unwrap();
        let app = test_app(&data_dir);

        let (status, body) = send(&app, "GET", "/instances/inst_missing0000/prds", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "not_found");
        assert!(body["error"].as_str().unwrap().contains("inst_missing0000"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_held_lock_surfaces_as_retryable_503() {
        let data_dir = TempDir::new().unwrap();
        let workspace = TempDir::new().unwrap();
        let locks = Arc::new(LockManager::with_timeouts(
            Duration::from_millis(150),
            Duration::from_secs(30),
        ));
        let app = test_app_with_locks(&data_dir, locks);
        let id = register_workspace(&app, &workspace).await;

        // Simulate another live process holding the store lock: a fresh
        // lock file owned by our own (alive) pid is not reclaimable
        let lock_path = workspace.path().join(".forgeboard").join("prds.json.lock");
        let info = forgeboard_lib::file_storage::lock::LockInfo::new();
        std::fs::write(&lock_path, serde_json::to_string(&info).unwrap()).unwrap();

        let (status, body) = send(
            &app,
            "POST",
            &format!("/instances/{}/prds", id),
            Some(json!({ "filename": "blocked.md", "title": "Blocked" })),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "lock_timeout");
        assert_eq!(body["retryable"], true);

        std::fs::remove_file(&lock_path).unwrap();

        // Once the holder is gone the same request goes through
        let (status, _) = send(
            &app,
            "POST",
            &format!("/instances/{}/prds", id),
            Some(json!({ "filename": "blocked.md", "title": "Blocked" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
}
