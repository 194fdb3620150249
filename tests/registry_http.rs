//! HTTP tests for the BSR client.
//!
//! A `wiremock` server stands in for the registry's Connect endpoints.

use std::fs;

use bufpush::core::module::{Module, ModuleBundle, ModuleFile};
use bufpush::core::types::{CommitId, ModuleIdentity, Secret};
use bufpush::registry::bsr::BsrClient;
use bufpush::registry::{RegistryClient, RegistryError};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PREFIX: &str = "/buf.alpha.registry.v1alpha1";

fn module() -> ModuleIdentity {
    ModuleIdentity::parse("buf.build/foo/bar").unwrap()
}

fn client(server: &MockServer) -> BsrClient {
    BsrClient::with_api_base(Secret::new("bsr_token"), server.uri())
}

fn rpc(service_method: &str) -> String {
    format!("{}.{}", PREFIX, service_method)
}

fn connect_error(status: u16, code: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({"code": code, "message": message}))
}

mod track_head {
    use super::*;

    #[tokio::test]
    async fn returns_commit_and_tags() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(rpc("RepositoryCommitService/GetRepositoryCommitByReference")))
            .and(header("authorization", "Bearer bsr_token"))
            .and(header("connect-protocol-version", "1"))
            .and(body_json(json!({
                "repositoryOwner": "foo",
                "repositoryName": "bar",
                "reference": "main",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "repositoryCommit": {
                    "id": "1",
                    "name": "c0",
                    "tags": [{"name": "v1"}, {"name": "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"}],
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let head = client(&server)
            .get_track_head(&module(), "main")
            .await
            .unwrap();
        assert_eq!(head.commit.as_str(), "c0");
        assert_eq!(
            head.tags,
            vec!["v1", "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"]
        );
    }

    #[tokio::test]
    async fn error_codes_stay_distinct() {
        let cases = [
            ("not_found", 404),
            ("failed_precondition", 400),
            ("unavailable", 503),
        ];
        for (code, status) in cases {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(connect_error(status, code, "nope"))
                .mount(&server)
                .await;

            let err = client(&server)
                .get_track_head(&module(), "main")
                .await
                .unwrap_err();
            match code {
                "not_found" => assert_eq!(err, RegistryError::NotFound("nope".into())),
                "failed_precondition" => {
                    assert_eq!(err, RegistryError::FailedPrecondition("nope".into()))
                }
                _ => assert_eq!(
                    err,
                    RegistryError::Rpc {
                        code: "unavailable".into(),
                        message: "nope".into()
                    }
                ),
            }
        }
    }

    #[tokio::test]
    async fn malformed_response_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;
        assert!(matches!(
            client(&server).get_track_head(&module(), "main").await,
            Err(RegistryError::InvalidResponse(_))
        ));
    }
}

mod push {
    use super::*;

    fn bundle() -> ModuleBundle {
        ModuleBundle::new(vec![ModuleFile {
            path: "foo/v1/foo.proto".into(),
            content: b"syntax = \"proto3\";".to_vec(),
        }])
    }

    /// A module directory with a lock file, documentation and license
    /// alongside its one schema file.
    fn module_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let write = |rel: &str, content: &str| {
            let path = dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        };
        write(
            "buf.yaml",
            "version: v1\nname: buf.build/foo/bar\ndeps:\n  - buf.build/acme/dep\n",
        );
        write(
            "buf.lock",
            "version: v1\ndeps:\n  - remote: buf.build\n    owner: acme\n    repository: dep\n    commit: c0ffee\n",
        );
        write("buf.md", "# bar");
        write("LICENSE", "MIT");
        write("foo/v1/foo.proto", "syntax = \"proto3\";");
        dir
    }

    #[tokio::test]
    async fn sends_files_tags_and_tracks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(rpc("PushService/Push")))
            .and(body_json(json!({
                "owner": "foo",
                "repository": "bar",
                "branch": "",
                "module": {
                    "files": [
                        {"path": "foo/v1/foo.proto", "content": "c3ludGF4ID0gInByb3RvMyI7"}
                    ],
                    "dependencies": [
                        {"remote": "buf.build", "owner": "acme", "repository": "dep", "commit": "c0ffee"}
                    ],
                    "documentation": "# bar",
                    "documentationPath": "buf.md",
                    "license": "MIT",
                },
                "tags": ["cccccccccccccccccccccccccccccccccccccccc"],
                "tracks": ["main"],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "localModulePin": {
                    "remote": "buf.build",
                    "owner": "foo",
                    "repository": "bar",
                    "commit": "c1",
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = module_dir();
        let local = Module::read(dir.path()).unwrap();
        assert!(local.bundle.files().iter().all(|f| f.path.ends_with(".proto")));

        let commit = client(&server)
            .push(
                &local.identity,
                &local.bundle,
                &["cccccccccccccccccccccccccccccccccccccccc".to_string()],
                &["main".to_string()],
            )
            .await
            .unwrap();
        assert_eq!(commit.as_str(), "c1");
    }

    #[tokio::test]
    async fn bare_bundle_omits_metadata_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(rpc("PushService/Push")))
            .and(body_json(json!({
                "owner": "foo",
                "repository": "bar",
                "branch": "",
                "module": {
                    "files": [
                        {"path": "foo/v1/foo.proto", "content": "c3ludGF4ID0gInByb3RvMyI7"}
                    ]
                },
                "tags": [],
                "tracks": ["main"],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "localModulePin": {"commit": "c1"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let commit = client(&server)
            .push(&module(), &bundle(), &[], &["main".to_string()])
            .await
            .unwrap();
        assert_eq!(commit.as_str(), "c1");
    }

    #[tokio::test]
    async fn identical_content_is_already_exists() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(rpc("PushService/Push")))
            .respond_with(connect_error(409, "already_exists", "module content unchanged"))
            .mount(&server)
            .await;

        let err = client(&server)
            .push(&module(), &bundle(), &[], &["main".to_string()])
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::AlreadyExists("module content unchanged".into())
        );
    }
}

mod tag_existing_commit {
    use super::*;

    async fn mount_repository(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path(rpc("RepositoryService/GetRepositoryByFullName")))
            .and(body_json(json!({"fullName": "foo/bar"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "repository": {"id": "repo-1", "name": "bar"}
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn looks_up_repository_then_creates_tag() {
        let server = MockServer::start().await;
        mount_repository(&server).await;
        Mock::given(method("POST"))
            .and(path(rpc("RepositoryTagService/CreateRepositoryTag")))
            .and(body_json(json!({
                "repositoryId": "repo-1",
                "name": "tag-1",
                "commitName": "c0",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "repositoryTag": {"name": "tag-1", "commitName": "c0"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tag = client(&server)
            .tag_existing_commit(&module(), "tag-1", &CommitId::new("c0").unwrap())
            .await
            .unwrap();
        assert_eq!(tag.name, "tag-1");
        assert_eq!(tag.commit.as_str(), "c0");
    }

    #[tokio::test]
    async fn missing_repository_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(rpc("RepositoryService/GetRepositoryByFullName")))
            .respond_with(connect_error(404, "not_found", "repository not found"))
            .mount(&server)
            .await;

        let err = client(&server)
            .tag_existing_commit(&module(), "t", &CommitId::new("c0").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(_)));
    }

    #[tokio::test]
    async fn missing_commit_is_reference_not_found() {
        let server = MockServer::start().await;
        mount_repository(&server).await;
        Mock::given(method("POST"))
            .and(path(rpc("RepositoryTagService/CreateRepositoryTag")))
            .respond_with(connect_error(404, "not_found", "commit not found"))
            .mount(&server)
            .await;

        let err = client(&server)
            .tag_existing_commit(&module(), "t", &CommitId::new("c0").unwrap())
            .await
            .unwrap_err();
        assert_eq!(err, RegistryError::ReferenceNotFound("c0".into()));
    }

    #[tokio::test]
    async fn taken_tag_is_already_exists() {
        let server = MockServer::start().await;
        mount_repository(&server).await;
        Mock::given(method("POST"))
            .and(path(rpc("RepositoryTagService/CreateRepositoryTag")))
            .respond_with(connect_error(409, "already_exists", "tag exists"))
            .mount(&server)
            .await;

        let err = client(&server)
            .tag_existing_commit(&module(), "t", &CommitId::new("c0").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyExists(_)));
    }
}

mod delete_track {
    use super::*;

    #[tokio::test]
    async fn deletes_by_name() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(rpc("RepositoryTrackService/DeleteRepositoryTrackByName")))
            .and(body_json(json!({
                "ownerName": "foo",
                "repositoryName": "bar",
                "name": "feature",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .delete_track(&module(), "feature")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unknown_track_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(connect_error(404, "not_found", "track not found"))
            .mount(&server)
            .await;

        assert!(matches!(
            client(&server).delete_track(&module(), "feature").await,
            Err(RegistryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn non_connect_error_falls_back_to_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        assert_eq!(
            client(&server).delete_track(&module(), "feature").await,
            Err(RegistryError::PermissionDenied("forbidden".into()))
        );
    }
}
