// SPDX-License-Identifier: Apache-2.0

use bazaar_core::ResultExt;

#[test]
fn result_ext_attaches_static_context() {
    let r: Result<(), &str> = Err("locked");
    let err = r.with_context("open store").expect_err("must error");
    assert_eq!(err.context, "open store");
    assert_eq!(err.source, "locked");
    assert_eq!(err.to_string(), "open store: locked");
}
