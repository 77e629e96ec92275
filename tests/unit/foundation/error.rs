use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        PixcacheError::not_found("x")
            .to_string()
            .contains("not found:")
    );
    assert!(
        PixcacheError::bad_request("x")
            .to_string()
            .contains("bad request:")
    );
    assert!(
        PixcacheError::internal("x")
            .to_string()
            .contains("internal error:")
    );
    assert!(
        PixcacheError::config("x")
            .to_string()
            .contains("config error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = PixcacheError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn kinds_map_to_status_codes() {
    assert_eq!(PixcacheError::not_found("x").kind().status_code(), 404);
    assert_eq!(PixcacheError::bad_request("x").kind().status_code(), 400);
    assert_eq!(PixcacheError::internal("x").kind().status_code(), 500);
    assert_eq!(PixcacheError::config("x").kind(), ErrorKind::InternalError);
    let wrapped = PixcacheError::from(anyhow::anyhow!("io"));
    assert_eq!(wrapped.kind(), ErrorKind::InternalError);
}
