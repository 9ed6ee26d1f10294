// Test assertions for TestResponse

use crate::test_client::TestResponse;
use http::StatusCode;

/// Assert response status
pub fn assert_status(response: &TestResponse, expected: StatusCode) {
    assert_eq!(
        response.status(),
        expected,
        "Expected status {}, got {} (body: {})",
        expected,
        response.status(),
        response.body_string()
    );
}

/// Assert 2xx status
pub fn assert_success(response: &TestResponse) {
    assert!(
        response.status().is_success(),
        "Expected success status, got {}",
        response.status()
    );
}

/// Assert 4xx status
pub fn assert_client_error(response: &TestResponse) {
    assert!(
        response.status().is_client_error(),
        "Expected client error status, got {}",
        response.status()
    );
}

/// Assert 5xx status
pub fn assert_server_error(response: &TestResponse) {
    assert!(
        response.status().is_server_error(),
        "Expected server error status, got {}",
        response.status()
    );
}

/// Assert header value
pub fn assert_header(response: &TestResponse, name: &str, expected: &str) {
    match response.header(name) {
        Some(value) => assert_eq!(
            value, expected,
            "Expected header '{}' to be '{}', got '{}'",
            name, expected, value
        ),
        None => panic!("Header '{}' not found", name),
    }
}

/// Assert header exists
pub fn assert_header_exists(response: &TestResponse, name: &str) {
    assert!(
        response.header(name).is_some(),
        "Expected header '{}' to exist",
        name
    );
}

/// Assert the body parses as JSON equal to `expected`.
pub fn assert_json(response: &TestResponse, expected: &serde_json::Value) {
    let actual: serde_json::Value = response.body_json().unwrap_or_else(|e| {
        panic!(
            "Expected JSON body, parse failed: {} (body: {})",
            e,
            response.body_string()
        )
    });
    assert_eq!(&actual, expected, "JSON body mismatch");
}

/// Assert body contains substring
pub fn assert_body_contains(response: &TestResponse, substring: &str) {
    let body = response.body_string();
    assert!(
        body.contains(substring),
        "Expected body to contain '{}', got '{}'",
        substring,
        body
    );
}

/// Assert a validation envelope names the given field/rule pair.
pub fn assert_violation(response: &TestResponse, field: &str, rule: &str) {
    let body: serde_json::Value = response
        .body_json()
        .unwrap_or_else(|e| panic!("Expected JSON body, parse failed: {}", e));
    let found = body["errors"]
        .as_array()
        .map(|errors| {
            errors
                .iter()
                .any(|e| e["field"] == field && e["rule"] == rule)
        })
        .unwrap_or(false);
    assert!(
        found,
        "Expected violation {}/{} in {}",
        field, rule, body
    );
}
