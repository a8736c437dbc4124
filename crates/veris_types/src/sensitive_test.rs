use pretty_assertions::assert_eq;
use rstest::rstest;
use strum::IntoEnumIterator;

use crate::sensitive::{
    is_governance_type_url,
    is_identity_verification_type_url,
    SensitiveTxType,
};

#[test]
fn type_url_mapping_round_trips() {
    for category in SensitiveTxType::iter() {
        assert_eq!(SensitiveTxType::from_type_url(category.type_url()), Some(category));
    }
}

#[rstest]
#[case::bank_send("/veris.bank.v1.MsgSend")]
#[case::empty("")]
#[case::close_but_wrong("/veris.veid.v1.MsgRotateKeys")]
fn unknown_type_urls_are_non_sensitive(#[case] type_url: &str) {
    assert_eq!(SensitiveTxType::from_type_url(type_url), None);
}

#[test]
fn identity_verification_set_membership() {
    assert!(is_identity_verification_type_url("/veris.veid.v1.MsgSubmitVerification"));
    assert!(is_identity_verification_type_url("/veris.veid.v1.MsgRotateKey"));
    assert!(!is_identity_verification_type_url("/veris.bank.v1.MsgSend"));
}

#[test]
fn governance_prefix_match() {
    assert!(is_governance_type_url("/veris.gov.v1.MsgSubmitProposal"));
    assert!(!is_governance_type_url("/veris.market.v1.MsgCreateHighValueOrder"));
}
