use dna_identity::identity::Identity;
use dna_identity::{backup, certificate};

#[test]
fn export_import_round_trip() {
    let identity = Identity::generate();
    let fp_before = identity.fingerprint();
    let exported = identity.export();
    let imported = Identity::import(&exported).expect("import");
    assert_eq!(fp_before, imported.fingerprint());
}

#[test]
fn fingerprint_is_128_hex_chars() {
    let identity = Identity::generate();
    let fp = identity.fingerprint();
    assert_eq!(fp.len(), 128);
    assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn import_rejects_wrong_length() {
    let err = Identity::import(&[0u8; 16]).unwrap_err();
    assert!(matches!(err, dna_identity::IdentityError::InvalidExport));
}

#[test]
fn certificate_round_trip() {
    let identity = Identity::generate();
    let cert = certificate::issue(&identity, "scratchpad-node", 1_700_000_000);
    assert!(cert.verify().is_ok());
    assert_eq!(cert.fingerprint(), identity.fingerprint());
}

#[test]
fn certificate_truncates_long_node_names() {
    let identity = Identity::generate();
    let long_name = "x".repeat(200);
    let cert = certificate::issue(&identity, &long_name, 0);
    assert_eq!(cert.node_name.len(), certificate::MAX_NODE_NAME_BYTES);
    assert!(cert.verify().is_ok());
}

// Scenario A (spec.md §8): generate an identity, back it up under a
// recovery phrase, and recover it after simulated process restart.
#[tokio::test]
async fn identity_backup_round_trip_on_disk() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let identity = Identity::generate();
    let fingerprint = identity.fingerprint();
    let phrase = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    let path = backup::save(&identity, phrase, Some(tmp.path()))
        .await
        .expect("save");
    assert!(path.exists());

    let recovered = backup::load(&fingerprint, phrase, Some(tmp.path()))
        .await
        .expect("load");
    assert_eq!(recovered.fingerprint(), fingerprint);
}

#[tokio::test]
async fn identity_backup_rejects_wrong_phrase() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let identity = Identity::generate();
    let fingerprint = identity.fingerprint();
    let phrase = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
    let wrong_phrase = "zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo vote";

    backup::save(&identity, phrase, Some(tmp.path())).await.expect("save");
    let result = backup::load(&fingerprint, wrong_phrase, Some(tmp.path())).await;
    assert!(result.is_err());
}

#[test]
fn export_with_certificate_round_trip() {
    let identity = Identity::generate();
    let cert = certificate::issue(&identity, "laptop", 1_700_000_000);
    let exported = identity.export_with_certificate(&cert);
    let (imported, imported_cert) = Identity::import_with_certificate(&exported).expect("import");
    assert_eq!(identity.fingerprint(), imported.fingerprint());
    assert_eq!(imported_cert.node_name, "laptop");
}

#[test]
fn import_with_certificate_rejects_mismatched_keys() {
    let identity = Identity::generate();
    let other = Identity::generate();
    let cert = certificate::issue(&other, "impostor", 0);
    let exported = identity.export_with_certificate(&cert);
    let err = Identity::import_with_certificate(&exported).unwrap_err();
    assert!(matches!(err, dna_identity::IdentityError::CertificateInvalid));
}

#[test]
fn certificate_encode_decode_round_trip() {
    let identity = Identity::generate();
    let cert = certificate::issue(&identity, "roundtrip-node", 42);
    let encoded = cert.encode();
    let decoded = certificate::Certificate::decode(&encoded).expect("decode");
    assert!(decoded.verify().is_ok());
    assert_eq!(decoded.node_name, "roundtrip-node");
    assert_eq!(decoded.issued_at_s, 42);
}

#[test]
fn generate_from_seed_returns_usable_phrase() {
    let seed = [7u8; 32];
    let (identity, phrase) = Identity::generate_from_seed(&seed).expect("generate_from_seed");
    assert!(!phrase.is_empty());
    // The phrase is a valid BIP-39 mnemonic, usable with the backup layer.
    assert!(bip39::Mnemonic::parse(&phrase).is_ok());
    assert_eq!(identity.fingerprint().len(), 128);
}

#[test]
fn generate_from_seed_is_deterministic_in_the_seed() {
    let seed = [42u8; 32];
    let (identity_a, phrase_a) = Identity::generate_from_seed(&seed).expect("generate_from_seed");
    let (identity_b, phrase_b) = Identity::generate_from_seed(&seed).expect("generate_from_seed");
    assert_eq!(phrase_a, phrase_b);
    assert_eq!(identity_a.fingerprint(), identity_b.fingerprint());
    assert_eq!(identity_a.export(), identity_b.export());
}

#[test]
fn generate_from_seed_differs_across_seeds() {
    let (identity_a, _) = Identity::generate_from_seed(&[1u8; 32]).expect("generate_from_seed");
    let (identity_b, _) = Identity::generate_from_seed(&[2u8; 32]).expect("generate_from_seed");
    assert_ne!(identity_a.fingerprint(), identity_b.fingerprint());
}

#[test]
fn identity_backup_seal_self_round_trip() {
    let identity = Identity::generate();
    let sealed = backup::seal_self(&identity).expect("seal_self");
    let recovered = backup::open_self(&identity.kem_sk, &sealed).expect("open_self");
    assert_eq!(identity.fingerprint(), recovered.fingerprint());
}

#[test]
fn dht_identity_singleton_lifecycle() {
    // Each test process only gets one singleton, so this exercises the
    // full new -> started -> shutdown cycle in one place.
    if dna_identity::DhtIdentity::state() == dna_identity::LifecycleState::New {
        dna_identity::DhtIdentity::start_new().expect("start");
    }
    let fp = dna_identity::DhtIdentity::with(|id| id.fingerprint());
    assert!(fp.is_ok());
}
