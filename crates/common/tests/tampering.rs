//! Integration tests for links and records that have been tampered with

mod common;

use ::common::crypto::{OsRandom, SymmetricKey};
use ::common::link::{KeyPlacement, ShareLink};
use ::common::prelude::*;

use crate::common::{codec, CountingStore, Tamper, TamperingStore};

async fn share_and_open(tamper: Tamper) -> ShareError {
    let protocol = ShareProtocol::new(TamperingStore::new(tamper), codec(KeyPlacement::Query));
    let shared = protocol
        .share(&ShareRequest::new(SecretBundle::multi(vec![SecretPair::new(
            "API_KEY", "abc123",
        )])))
        .await
        .unwrap();
    protocol.open(&shared.url).await.unwrap_err()
}

#[tokio::test]
async fn test_flipped_ciphertext_fails_authentication() {
    let err = share_and_open(Tamper::Ciphertext).await;
    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert_eq!(err.to_string(), "failed to open shared secret");
}

#[tokio::test]
async fn test_flipped_tag_fails_authentication() {
    let err = share_and_open(Tamper::Tag).await;
    assert_eq!(err.kind(), ErrorKind::Authentication);
}

#[tokio::test]
async fn test_short_iv_is_rejected() {
    let err = share_and_open(Tamper::TruncateIv).await;
    assert_eq!(err.kind(), ErrorKind::InvalidIv);
}

#[tokio::test]
async fn test_record_hash_mismatch_fails_authentication() {
    let err = share_and_open(Tamper::HashedHex).await;
    assert_eq!(err.kind(), ErrorKind::Authentication);
}

#[tokio::test]
async fn test_key_not_matching_link_hash_is_rejected_before_fetch() {
    let protocol = ShareProtocol::new(CountingStore::default(), codec(KeyPlacement::Query));
    let shared = protocol
        .share(&ShareRequest::new(SecretBundle::single("mismatch")))
        .await
        .unwrap();
    let link = LinkCodec::parse(&shared.url).unwrap();

    let other_key = SymmetricKey::generate(&OsRandom).unwrap();
    let forged = protocol
        .codec()
        .build(&ShareLink {
            key: other_key.to_hex(),
            ..link
        })
        .unwrap();

    let err = protocol.open(&forged).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert_eq!(protocol.store().fetches(), 0);

    // the untouched link still opens
    let opened = protocol.open(&shared.url).await.unwrap();
    assert_eq!(opened.bundle, SecretBundle::single("mismatch"));
    assert_eq!(protocol.store().fetches(), 1);
}

#[tokio::test]
async fn test_matching_forged_pair_is_not_found() {
    // a self-consistent key and hash for someone else's id reveal nothing
    let protocol = ShareProtocol::new(CountingStore::default(), codec(KeyPlacement::Query));
    let shared = protocol
        .share(&ShareRequest::new(SecretBundle::single("private")))
        .await
        .unwrap();

    let attacker_key = SymmetricKey::generate(&OsRandom).unwrap();
    let forged = protocol
        .codec()
        .build(&ShareLink {
            id: shared.id.clone(),
            hashed_hex: attacker_key.lookup_hash().to_hex(),
            key: attacker_key.to_hex(),
            is_multi: false,
        })
        .unwrap();

    let err = protocol.open(&forged).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(protocol.store().fetches(), 1);
}
