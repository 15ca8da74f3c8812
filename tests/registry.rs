//! Registry client tests against a mocked npm style registry.

use std::time::Duration;

use semver::Version;
use serde_json::json;
use stencil::prelude::*;
use stencil::core::version::VersionResolver;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> Registry {
    Registry::new(server.uri(), Duration::from_secs(5)).expect("failed to create client")
}

fn name(s: &str) -> PackageName {
    PackageName::parse(s).unwrap()
}

async fn mount_versions(server: &MockServer, route: &str, versions: &[&str]) {
    let versions: serde_json::Map<_, _> = versions
        .iter()
        .map(|v| (v.to_string(), json!({ "version": v })))
        .collect();

    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "ignored",
            "dist-tags": { "latest": "1.0.0" },
            "versions": versions,
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn lists_published_versions() {
    let server = MockServer::start().await;
    mount_versions(&server, "/@stencil-cli/init", &["1.0.0", "1.2.0", "0.9.0"]).await;

    let mut versions = client(&server)
        .package_versions(&name("@stencil-cli/init"))
        .await
        .expect("fetch failed");
    versions.sort();

    assert_eq!(versions, vec!["0.9.0", "1.0.0", "1.2.0"]);
}

#[tokio::test]
async fn unknown_package_has_no_versions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/nope"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let registry = client(&server);
    assert!(registry.package_versions(&name("nope")).await.unwrap().is_empty());

    let err = VersionResolver::new(&registry)
        .resolve_newest(&name("nope"))
        .await
        .unwrap_err();
    assert!(matches!(err, StencilError::PackageNotFound(_)));
}

#[tokio::test]
async fn server_error_is_a_registry_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client(&server)
        .package_versions(&name("broken"))
        .await
        .unwrap_err();
    assert!(matches!(err, StencilError::Registry { ref package, .. } if package == "broken"));
}

#[tokio::test]
async fn malformed_body_is_a_registry_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/garbled"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let err = client(&server)
        .get_package_info(&name("garbled"))
        .await
        .unwrap_err();
    assert!(matches!(err, StencilError::Registry { .. }));
}

#[tokio::test]
async fn newest_skips_prereleases_and_junk() {
    let server = MockServer::start().await;
    mount_versions(
        &server,
        "/tool",
        &["1.0.0", "2.0.0-beta.1", "1.4.2", "not-a-version", "2.0.0-alpha"],
    )
    .await;

    let registry = client(&server);
    let resolver = VersionResolver::new(&registry);

    // prereleases still order above the stable line they lead up to
    assert_eq!(
        resolver.resolve_newest(&name("tool")).await.unwrap(),
        Version::parse("2.0.0-beta.1").unwrap()
    );
    assert_eq!(
        resolver
            .resolve_latest_at_least(&name("tool"), &Version::new(1, 2, 0))
            .await
            .unwrap(),
        Some(Version::parse("2.0.0-beta.1").unwrap())
    );
    assert_eq!(
        resolver
            .resolve_latest_at_least(&name("tool"), &Version::new(3, 0, 0))
            .await
            .unwrap(),
        None
    );
}

#[test]
fn trailing_slash_is_trimmed() {
    let registry = Registry::new("https://registry.example/", Duration::from_secs(1)).unwrap();
    assert_eq!(registry.base_url(), "https://registry.example");
    assert_eq!(registry.registry_url(), "https://registry.example");
}

async fn mount_raw(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_string(body),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn equal_precedence_keeps_registry_order() {
    let server = MockServer::start().await;
    mount_raw(
        &server,
        "/tpl",
        r#"{"versions":{"1.0.0+build.2":{},"0.9.0":{},"1.0.0+build.1":{}}}"#,
    )
    .await;

    let registry = client(&server);
    let versions = VersionResolver::new(&registry)
        .list_versions(&name("tpl"))
        .await
        .unwrap();

    assert_eq!(
        versions,
        vec![
            Version::parse("1.0.0+build.2").unwrap(),
            Version::parse("1.0.0+build.1").unwrap(),
            Version::parse("0.9.0").unwrap(),
        ]
    );
}

#[tokio::test]
async fn broken_old_releases_dont_block_listing() {
    let server = MockServer::start().await;
    mount_raw(
        &server,
        "/tpl",
        r#"{"versions":{
            "1.0.0":{"dist":{"shasum":"abc"}},
            "1.5.0":{"dist":{"tarball":"https://registry.example/tpl-1.5.0.tgz"}},
            "2.0.0":null
        }}"#,
    )
    .await;

    let registry = client(&server);
    assert_eq!(
        VersionResolver::new(&registry)
            .resolve_newest(&name("tpl"))
            .await
            .unwrap(),
        Version::new(2, 0, 0)
    );

    let dist = registry
        .get_version_dist(&name("tpl"), &Version::new(1, 5, 0))
        .await
        .unwrap()
        .expect("dist for 1.5.0");
    assert_eq!(dist.tarball, "https://registry.example/tpl-1.5.0.tgz");
    assert!(dist.integrity.is_none());

    assert!(
        registry
            .get_version_dist(&name("tpl"), &Version::new(2, 0, 0))
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        registry
            .get_version_dist(&name("tpl"), &Version::new(3, 0, 0))
            .await
            .unwrap()
            .is_none()
    );
    assert!(matches!(
        registry
            .get_version_dist(&name("tpl"), &Version::new(1, 0, 0))
            .await,
        Err(StencilError::Registry { .. })
    ));
}
