//! Unit tests for fetch request construction and validation.

use rdsbadger::{FetchRequest, RequestError};

#[test]
fn new_trims_the_instance_identifier() {
    let request = FetchRequest::new("  db1  ", 0).expect("trimmed request should be valid");
    assert_eq!(request.instance_id, "db1");
    assert_eq!(request.cutoff_millis, 0);
}

#[test]
fn new_rejects_blank_instance_identifiers() {
    for raw in ["", "   ", "\t"] {
        let error = FetchRequest::new(raw, 0).expect_err("blank identifier should fail");
        assert_eq!(error, RequestError::Validation(String::from("instance_id")));
    }
}

#[test]
fn new_rejects_negative_cutoffs() {
    let error = FetchRequest::new("db1", -1).expect_err("negative cutoff should fail");
    assert_eq!(error, RequestError::NegativeCutoff(-1));
}

#[test]
fn validate_rejects_a_blank_identifier_set_after_construction() {
    let request = FetchRequest {
        instance_id: String::from("  "),
        cutoff_millis: 0,
    };
    let error = request.validate().expect_err("field should be required");
    assert_eq!(error, RequestError::Validation(String::from("instance_id")));
}
