use std::{collections::HashSet, fs, path::Path};

use sn_install_pfx::{
    CONTAINER_PREFIX, Error, HashState, UserIdentity, derive_container_name, hash64, resolve_key_file,
};
use tempfile::tempdir;

const PBES2_PFX: &[u8] = include_bytes!("assets/signing.pfx");
const LEGACY_PFX: &[u8] = include_bytes!("assets/signing-legacy.pfx");

fn user(s: &str) -> UserIdentity {
    UserIdentity::from_qualified(s)
}

/// Simple LCG so the generated blobs are the same on every run.
fn blobs(count: usize, len: usize) -> Vec<Vec<u8>> {
    let mut state = 0x2545_F491_4F6C_DD1Du64;
    (0..count)
        .map(|_| {
            (0..len)
                .map(|_| {
                    state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                    (state >> 56) as u8
                })
                .collect()
        })
        .collect()
}

fn assert_format(name: &str) {
    let digits = name.strip_prefix(CONTAINER_PREFIX).expect("VS_KEY_ prefix");
    assert_eq!(digits.len(), 16, "{name}");
    assert!(
        digits.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)),
        "{name}"
    );
}

#[test]
fn test_empty_hash_is_initial_state() {
    assert_eq!(hash64(&[]), (17339221u64 << 32) | 19619429);
    assert_eq!(HashState::new().finish(), hash64(&[]));
}

#[test]
fn test_golden_vectors() {
    assert_eq!(hash64(&[0x01, 0x02, 0x03]), 0xFDA91A4E33A8035A);

    let name = derive_container_name(&[0xDE, 0xAD, 0xBE, 0xEF], &user("HOST\\user")).unwrap();
    assert_eq!(name.as_str(), "VS_KEY_D8483EA2C7BCC0F6");
}

#[test]
fn test_fixture_golden_names() {
    let alice = user("CORP\\alice");
    let bob = user("corp\\bob");

    assert_eq!(derive_container_name(PBES2_PFX, &alice).unwrap().as_str(), "VS_KEY_266C0BAE7523E04E");
    assert_eq!(derive_container_name(PBES2_PFX, &bob).unwrap().as_str(), "VS_KEY_951585CCAD248FA8");
    assert_eq!(derive_container_name(LEGACY_PFX, &alice).unwrap().as_str(), "VS_KEY_10DD715CCB6F0542");
}

#[test]
fn test_deterministic() {
    let identity = user("HOST\\user");
    let first = derive_container_name(PBES2_PFX, &identity).unwrap();
    for _ in 0..3 {
        assert_eq!(derive_container_name(PBES2_PFX, &identity).unwrap(), first);
    }
}

#[test]
fn test_identity_is_case_insensitive() {
    let blob = [0xDE, 0xAD, 0xBE, 0xEF];
    let lower = derive_container_name(&blob, &user("alice")).unwrap();

    assert_eq!(derive_container_name(&blob, &user("Alice")).unwrap(), lower);
    assert_eq!(derive_container_name(&blob, &user("ALICE")).unwrap(), lower);
    assert_eq!(
        derive_container_name(&blob, &UserIdentity::new("HOST", "USER")).unwrap(),
        derive_container_name(&blob, &user("host\\user")).unwrap()
    );
}

#[test]
fn test_single_byte_changes_the_name() {
    let identity = user("CORP\\alice");
    let reference = derive_container_name(PBES2_PFX, &identity).unwrap();

    for i in (0..PBES2_PFX.len()).step_by(17) {
        let mut changed = PBES2_PFX.to_vec();
        changed[i] = changed[i].wrapping_add(1);
        assert_ne!(
            derive_container_name(&changed, &identity).unwrap(),
            reference,
            "changing byte {i} must change the name"
        );
    }
}

#[test]
fn test_names_differ_across_blobs_and_users() {
    let users = ["CORP\\alice", "CORP\\bob", "HOST\\alice", "HOST\\bob", "alice"];
    let mut seen = HashSet::new();

    for blob in blobs(200, 64) {
        for u in users {
            let name = derive_container_name(&blob, &user(u)).unwrap();
            assert_format(name.as_str());
            assert!(seen.insert(name.clone()), "duplicate container name {name}");
        }
    }
}

#[test]
fn test_empty_identity_is_invalid() {
    let err = derive_container_name(PBES2_PFX, &user("")).unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[test]
fn test_resolve_key_file() {
    let dir = tempdir().unwrap();
    let identity = user("CORP\\alice");

    let lower = dir.path().join("signing.pfx");
    let upper = dir.path().join("SIGNING.PFX");
    fs::write(&lower, PBES2_PFX).unwrap();
    fs::write(&upper, PBES2_PFX).unwrap();

    assert_eq!(resolve_key_file(&lower, &identity).unwrap().as_str(), "VS_KEY_266C0BAE7523E04E");
    assert_eq!(
        resolve_key_file(&upper, &identity).unwrap(),
        resolve_key_file(&lower, &identity).unwrap()
    );
}

#[test]
fn test_resolve_rejects_other_extensions() {
    let dir = tempdir().unwrap();
    let text = dir.path().join("signing.txt");
    fs::write(&text, PBES2_PFX).unwrap();

    let err = resolve_key_file(&text, &user("CORP\\alice")).unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)), "{err:?}");

    let err = resolve_key_file(Path::new(""), &user("CORP\\alice")).unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)), "{err:?}");
}

#[test]
fn test_resolve_unreadable_file() {
    let dir = tempdir().unwrap();
    let err = resolve_key_file(&dir.path().join("missing.pfx"), &user("CORP\\alice")).unwrap_err();
    assert!(matches!(err, Error::IoFailure { .. }), "{err:?}");
}
