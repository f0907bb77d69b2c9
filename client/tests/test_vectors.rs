//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs, expected requests, simulated responses,
//! and expected parse results or error codes. All vectors use the Connect
//! JSON flavour. Comparing parsed JSON (not raw strings) avoids false
//! negatives from field-ordering differences.

use serde_json::Value;
use todo_client::{ApiError, ClientProtocol, HttpRequest, HttpResponse, Status, Todo, ToDoClient, TodoInput};

const BASE_URL: &str = "http://localhost:50051";

fn client() -> ToDoClient {
    ToDoClient::new(BASE_URL, ClientProtocol::ConnectJson)
}

fn cases(raw: &str) -> Vec<Value> {
    let vectors: Value = serde_json::from_str(raw).unwrap();
    vectors["cases"].as_array().unwrap().clone()
}

fn status(name: &Value) -> Status {
    Status::from_str_name(name.as_str().unwrap()).unwrap()
}

fn input(case: &Value) -> TodoInput {
    let input = &case["input"];
    TodoInput::new(input["title"].as_str().unwrap())
        .description(input["description"].as_str().unwrap())
        .status(status(&input["status"]))
}

fn input_id(case: &Value) -> i64 {
    case["input_id"].as_i64().unwrap()
}

fn todo(expected: &Value) -> Todo {
    let wire: todo_proto::ToDoItem = serde_json::from_value(expected.clone()).unwrap();
    Todo::try_from(wire).unwrap()
}

/// Check a built request against `expected_request`.
fn assert_request(name: &str, req: &HttpRequest, case: &Value) {
    let expected = &case["expected_request"];
    assert_eq!(
        req.url,
        format!("{BASE_URL}{}", expected["path"].as_str().unwrap()),
        "{name}: url"
    );

    let expected_headers: Vec<(String, String)> = expected["headers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| {
            let pair = h.as_array().unwrap();
            (
                pair[0].as_str().unwrap().to_string(),
                pair[1].as_str().unwrap().to_string(),
            )
        })
        .collect();
    assert_eq!(req.headers, expected_headers, "{name}: headers");

    let body: Value = serde_json::from_slice(&req.body).unwrap();
    assert_eq!(body, expected["body"], "{name}: body");
}

fn simulated_response(case: &Value) -> HttpResponse {
    let sim = &case["simulated_response"];
    HttpResponse {
        status: sim["status"].as_u64().unwrap() as u16,
        headers: vec![("content-type".into(), "application/json".into())],
        body: sim["body"].as_str().unwrap().as_bytes().to_vec(),
    }
}

/// Check a failed parse against `expected_error`, a Connect code name.
fn assert_error(name: &str, err: ApiError, case: &Value) {
    let expected = case["expected_error"].as_str().unwrap();
    assert_eq!(
        err.code().map(todo_proto::connect::code_name),
        Some(expected),
        "{name}: error code"
    );
    if expected == "not_found" {
        assert!(matches!(err, ApiError::NotFound(_)), "{name}: expected NotFound");
    }
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[test]
fn create_test_vectors() {
    let c = client();
    for case in cases(include_str!("../../test-vectors/create.json")) {
        let name = case["name"].as_str().unwrap();

        let req = c.build_create(&input(&case)).unwrap();
        assert_request(name, &req, &case);

        let result = c.parse_create(simulated_response(&case));
        if case.get("expected_error").is_some() {
            assert_error(name, result.unwrap_err(), &case);
        } else {
            assert_eq!(result.unwrap(), todo(&case["expected_result"]), "{name}: parsed result");
        }
    }
}

// ---------------------------------------------------------------------------
// GetAll
// ---------------------------------------------------------------------------

#[test]
fn get_all_test_vectors() {
    let c = client();
    for case in cases(include_str!("../../test-vectors/get_all.json")) {
        let name = case["name"].as_str().unwrap();

        let req = c.build_get_all().unwrap();
        assert_request(name, &req, &case);

        let todos = c.parse_get_all(simulated_response(&case)).unwrap();
        let expected: Vec<Todo> = case["expected_result"]
            .as_array()
            .unwrap()
            .iter()
            .map(todo)
            .collect();
        assert_eq!(todos, expected, "{name}: parsed result");
    }
}

// ---------------------------------------------------------------------------
// GetOne
// ---------------------------------------------------------------------------

#[test]
fn get_one_test_vectors() {
    let c = client();
    for case in cases(include_str!("../../test-vectors/get_one.json")) {
        let name = case["name"].as_str().unwrap();

        let req = c.build_get_one(input_id(&case)).unwrap();
        assert_request(name, &req, &case);

        let result = c.parse_get_one(simulated_response(&case));
        if case.get("expected_error").is_some() {
            assert_error(name, result.unwrap_err(), &case);
        } else {
            assert_eq!(result.unwrap(), todo(&case["expected_result"]), "{name}: parsed result");
        }
    }
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

#[test]
fn update_test_vectors() {
    let c = client();
    for case in cases(include_str!("../../test-vectors/update.json")) {
        let name = case["name"].as_str().unwrap();

        let req = c.build_update(input_id(&case), &input(&case)).unwrap();
        assert_request(name, &req, &case);

        let updated = c.parse_update(simulated_response(&case)).unwrap();
        assert_eq!(updated, todo(&case["expected_result"]), "{name}: parsed result");
    }
}

// ---------------------------------------------------------------------------
// UpdateStatus
// ---------------------------------------------------------------------------

#[test]
fn update_status_test_vectors() {
    let c = client();
    for case in cases(include_str!("../../test-vectors/update_status.json")) {
        let name = case["name"].as_str().unwrap();

        let req = c
            .build_update_status(input_id(&case), status(&case["input_status"]))
            .unwrap();
        assert_request(name, &req, &case);

        let result = c.parse_update_status(simulated_response(&case));
        if case.get("expected_error").is_some() {
            assert_error(name, result.unwrap_err(), &case);
        } else {
            assert!(result.is_ok(), "{name}: expected success");
        }
    }
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[test]
fn delete_test_vectors() {
    let c = client();
    for case in cases(include_str!("../../test-vectors/delete.json")) {
        let name = case["name"].as_str().unwrap();

        let req = c.build_delete(input_id(&case)).unwrap();
        assert_request(name, &req, &case);

        let result = c.parse_delete(simulated_response(&case));
        if case.get("expected_error").is_some() {
            assert_error(name, result.unwrap_err(), &case);
        } else {
            assert!(result.is_ok(), "{name}: expected success");
        }
    }
}
