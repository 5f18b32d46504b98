// SPDX-License-Identifier: Apache-2.0

use bazaar_core::{Error, UserId, UserIdProblem};

fn problem(raw: &str) -> Option<UserIdProblem> {
    match UserId::new(raw) {
        Err(Error::UserId { problem, .. }) => Some(problem),
        _ => None,
    }
}

#[test]
fn user_id_names_what_is_wrong_with_a_subject() {
    assert_eq!(problem(""), Some(UserIdProblem::Empty));
    assert_eq!(problem("Alice"), Some(UserIdProblem::BadCharacter('A')));
    assert_eq!(problem("has space"), Some(UserIdProblem::BadCharacter(' ')));
    assert_eq!(problem(&"a".repeat(65)), Some(UserIdProblem::TooLong));
    assert_eq!(problem(&"a".repeat(64)), None);
    assert!(UserId::new("user_01-b").is_ok());

    let err = UserId::new("Bob").expect_err("uppercase");
    assert!(err.to_string().starts_with("user id `Bob` contains 'B'"), "{err}");
}

#[test]
fn user_id_serde_validates_on_the_way_in() {
    let ok: UserId = serde_json::from_str("\"buyer-1\"").expect("valid id");
    assert_eq!(ok.as_str(), "buyer-1");
    assert_eq!(serde_json::to_string(&ok).expect("json"), "\"buyer-1\"");
    assert!(serde_json::from_str::<UserId>("\"has space\"").is_err());
}
