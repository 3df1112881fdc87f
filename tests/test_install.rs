use std::{fs, path::PathBuf};

use sn_install_pfx::{
    ContainerFlags, ContainerName, CryptoError, Error, FileKeyStore, KeyContainerStore, KeyInstaller,
    PrivateKey, UserIdentity, derive_container_name, parse_pfx,
};
use tempfile::{TempDir, tempdir};

const PASSWORD: &str = "changeit";

fn asset(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("assets").join(name)
}

fn expected_key() -> PrivateKey {
    PrivateKey::from_der(&fs::read(asset("signing-key.pk8")).unwrap()).unwrap()
}

fn setup() -> (TempDir, KeyInstaller<FileKeyStore>) {
    let dir = tempdir().unwrap();
    let installer = KeyInstaller::new(FileKeyStore::new(dir.path().join("containers")));
    (dir, installer)
}

fn derived_name(file: &str) -> ContainerName {
    let data = fs::read(asset(file)).unwrap();
    derive_container_name(&data, &UserIdentity::from_qualified("CORP\\alice")).unwrap()
}

#[test]
fn test_parse_pbes2_pfx() {
    let pair = parse_pfx(&fs::read(asset("signing.pfx")).unwrap(), PASSWORD).unwrap();

    assert!(pair.key().is_rsa());
    assert_eq!(pair.key(), &expected_key());
    assert_eq!(pair.friendly_name(), Some("strong-name"));

    let cert = pair.certificate().unwrap();
    assert_eq!(cert.subject(), "CN=Strong Name Test");
    assert!(cert.is_self_signed());
}

#[cfg(feature = "pbes1")]
#[test]
fn test_parse_legacy_pfx() {
    let pair = parse_pfx(&fs::read(asset("signing-legacy.pfx")).unwrap(), PASSWORD).unwrap();

    assert_eq!(pair.key(), &expected_key());
    assert_eq!(pair.certificate().unwrap().subject(), "CN=Strong Name Test");
}

#[test]
fn test_install_derived_container() {
    let (_dir, installer) = setup();
    let name = derived_name("signing.pfx");
    assert_eq!(name.as_str(), "VS_KEY_266C0BAE7523E04E");
    assert!(!installer.is_installed(&name).unwrap());

    let installed = installer.install(&asset("signing.pfx"), PASSWORD, &name).unwrap();
    assert_eq!(installed.container, name);
    assert_eq!(installed.certificate_subject.as_deref(), Some("CN=Strong Name Test"));
    assert!(installer.is_installed(&name).unwrap());

    let stored = installer.store().load(&name).unwrap().unwrap();
    assert_eq!(stored.flags(), ContainerFlags::STRONG_NAME);
    assert!(stored.matches(&expected_key()));
    assert!(stored.export_key().is_none());
}

#[cfg(feature = "pbes1")]
#[test]
fn test_install_legacy_container() {
    let (_dir, installer) = setup();
    let name = derived_name("signing-legacy.pfx");
    assert_eq!(name.as_str(), "VS_KEY_10DD715CCB6F0542");

    installer.install(&asset("signing-legacy.pfx"), PASSWORD, &name).unwrap();
    assert!(installer.store().load(&name).unwrap().unwrap().matches(&expected_key()));
}

#[test]
fn test_install_named_container() {
    let (_dir, installer) = setup();
    let name = ContainerName::new("MyKeys").unwrap();

    installer.install(&asset("signing.pfx"), PASSWORD, &name).unwrap();
    assert!(installer.store().container_path(&name).ends_with("MyKeys.key"));
    assert!(installer.is_installed(&name).unwrap());
    assert!(!installer.is_installed(&derived_name("signing.pfx")).unwrap());
}

#[test]
fn test_already_installed() {
    let (_dir, installer) = setup();
    let name = derived_name("signing.pfx");
    installer.install(&asset("signing.pfx"), PASSWORD, &name).unwrap();
    let before = fs::read(installer.store().container_path(&name)).unwrap();

    // the existing container is reported before the password is checked
    let err = installer.install(&asset("signing.pfx"), "wrong", &name).unwrap_err();
    assert!(matches!(&err, Error::AlreadyInstalled(n) if *n == name), "{err:?}");

    let err = installer.store().install(&name, &expected_key(), ContainerFlags::STRONG_NAME).unwrap_err();
    assert!(matches!(err, Error::AlreadyInstalled(_)), "{err:?}");

    assert_eq!(fs::read(installer.store().container_path(&name)).unwrap(), before);
}

#[test]
fn test_wrong_password() {
    let (_dir, installer) = setup();
    let name = derived_name("signing.pfx");

    let err = installer.install(&asset("signing.pfx"), "not-the-password", &name).unwrap_err();
    match err {
        Error::CryptoFailure(e) => assert!(e.is_bad_password(), "{e:?}"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!installer.is_installed(&name).unwrap());
}

#[test]
fn test_corrupt_file() {
    let (dir, installer) = setup();
    let data = fs::read(asset("signing.pfx")).unwrap();
    let truncated = dir.path().join("truncated.pfx");
    fs::write(&truncated, &data[..data.len() / 2]).unwrap();

    let name = ContainerName::new("Truncated").unwrap();
    let err = installer.install(&truncated, PASSWORD, &name).unwrap_err();
    match err {
        Error::CryptoFailure(e) => assert!(e.is_corrupt_file(), "{e:?}"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!installer.is_installed(&name).unwrap());
}

#[test]
fn test_missing_file() {
    let (dir, installer) = setup();
    let name = ContainerName::new("Missing").unwrap();

    let err = installer.install(&dir.path().join("missing.pfx"), PASSWORD, &name).unwrap_err();
    assert!(matches!(err, Error::IoFailure { .. }), "{err:?}");
}

#[test]
fn test_ec_key_rejected() {
    let (_dir, installer) = setup();
    let name = derived_name("ec.pfx");
    assert_eq!(name.as_str(), "VS_KEY_B6113A5EED5C882B");

    let err = installer.install(&asset("ec.pfx"), PASSWORD, &name).unwrap_err();
    assert!(
        matches!(err, Error::CryptoFailure(CryptoError::UnsupportedKeyAlgorithm(_))),
        "{err:?}"
    );
    assert!(!installer.is_installed(&name).unwrap());
}

#[test]
fn test_user_scoped_flags_rejected() {
    let (_dir, installer) = setup();
    let name = ContainerName::new("UserScoped").unwrap();
    let flags = ContainerFlags {
        machine_scoped: false,
        exportable: true,
    };

    let err = installer.store().install(&name, &expected_key(), flags).unwrap_err();
    assert!(
        matches!(err, Error::CryptoFailure(CryptoError::InstallRejected(_))),
        "{err:?}"
    );
}
