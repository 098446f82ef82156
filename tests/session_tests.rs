use graphsocial::error::Error;
use graphsocial::models::Uid;
use graphsocial::session::{SessionCodec, SessionDirective};

const ALICE: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa1";
const BOB: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb2";

#[test]
fn issue_then_verify_roundtrip() {
    let codec = SessionCodec::new("a long lived secret");
    let id = Uid::parse(ALICE).unwrap();

    let SessionDirective::Set(token) = codec.issue(&id) else {
        panic!("issue must produce a token to set");
    };
    assert_eq!(codec.verify(Some(&token)), Some(id));
}

#[test]
fn roundtrip_holds_for_any_identifier() {
    let codec = SessionCodec::new("secret");
    for raw in [ALICE, BOB, "0123456789abcdef0123456789abcdef"] {
        let id = Uid::parse(raw).unwrap();
        let token = codec.issue(&id).token().unwrap().to_string();
        assert_eq!(codec.verify(Some(&token)), Some(id));
    }
}

#[test]
fn identifier_case_is_insignificant() {
    let codec = SessionCodec::new("secret");
    let id = Uid::parse(ALICE).unwrap();
    let token = codec.issue(&id).token().unwrap().to_string();

    // Upper-case the id portion; the code still authenticates the
    // normalized identifier.
    let (raw_id, code) = token.split_once('.').unwrap();
    let shouted = format!("{}.{}", raw_id.to_uppercase(), code);
    assert_eq!(codec.verify(Some(&shouted)), Some(id));
}

#[test]
fn absent_and_malformed_tokens_verify_to_none() {
    let codec = SessionCodec::new("secret");
    assert_eq!(codec.verify(None), None);
    assert_eq!(codec.verify(Some("")), None);
    assert_eq!(codec.verify(Some("not-a-token")), None);
    assert_eq!(codec.verify(Some("tooshort.abcd")), None);
    assert_eq!(codec.verify(Some(&format!("{}.not-hex", ALICE))), None);
}

#[test]
fn tampered_code_is_rejected() {
    let codec = SessionCodec::new("secret");
    let id = Uid::parse(ALICE).unwrap();
    let token = codec.issue(&id).token().unwrap().to_string();

    let mut bytes = token.into_bytes();
    let last = bytes.last_mut().unwrap();
    *last = if *last == b'0' { b'1' } else { b'0' };
    let tampered = String::from_utf8(bytes).unwrap();
    assert_eq!(codec.verify(Some(&tampered)), None);
}

#[test]
fn swapped_identifier_is_rejected() {
    let codec = SessionCodec::new("secret");
    let id = Uid::parse(ALICE).unwrap();
    let token = codec.issue(&id).token().unwrap().to_string();

    let (_, code) = token.split_once('.').unwrap();
    let forged = format!("{}.{}", BOB, code);
    assert_eq!(codec.verify(Some(&forged)), None);
}

#[test]
fn tokens_from_another_key_are_rejected() {
    let ours = SessionCodec::new("our secret");
    let theirs = SessionCodec::new("their secret");
    let id = Uid::parse(ALICE).unwrap();

    let token = theirs.issue(&id).token().unwrap().to_string();
    assert_eq!(ours.verify(Some(&token)), None);
    assert_eq!(theirs.verify(Some(&token)), Some(id));
}

#[test]
fn revoke_issues_a_clear_directive() {
    let codec = SessionCodec::new("secret");
    let directive = codec.revoke();
    assert_eq!(directive, SessionDirective::Clear);
    assert_eq!(directive.token(), None);
}

#[test]
fn authenticate_fails_without_identity() {
    let codec = SessionCodec::new("secret");
    assert!(matches!(codec.authenticate(None), Err(Error::Authentication)));
    assert!(matches!(
        codec.authenticate(Some("garbage")),
        Err(Error::Authentication)
    ));

    let id = Uid::parse(ALICE).unwrap();
    let token = codec.issue(&id).token().unwrap().to_string();
    assert_eq!(codec.authenticate(Some(&token)).unwrap(), id);
}
