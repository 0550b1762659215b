use dna_envelope::envelope::EnvelopeKind;
use dna_envelope::error::DecodeError;
use dna_envelope::{kem, selfenc, signature};
use dna_envelope::selfenc::SelfEncryptIdentity;

const KIND: EnvelopeKind = EnvelopeKind::AddressBook;
const VERSION: u8 = dna_envelope::ENVELOPE_VERSION;

fn identity() -> (kem::KemPublicKey, kem::KemSecretKey, signature::SignPublicKey, signature::SignSecretKey) {
    let (kem_pk, kem_sk) = kem::keygen();
    let (sign_pk, sign_sk) = signature::keygen();
    (kem_pk, kem_sk, sign_pk, sign_sk)
}

#[test]
fn self_encrypt_round_trip() {
    let (kem_pk, kem_sk, sign_pk, sign_sk) = identity();
    let id = SelfEncryptIdentity {
        kem_pk: &kem_pk,
        kem_sk: &kem_sk,
        sign_pk: &sign_pk,
        sign_sk: &sign_sk,
    };

    let plaintext = b"durable application state, round one";
    let sealed = selfenc::seal(KIND, VERSION, &id, plaintext, 1_000, 2_000_000).expect("seal");
    let opened = selfenc::open(KIND, VERSION, VERSION, &id, &sealed, 0).expect("open");
    assert_eq!(opened, plaintext);
}

#[test]
fn self_encrypt_round_trip_empty_plaintext() {
    let (kem_pk, kem_sk, sign_pk, sign_sk) = identity();
    let id = SelfEncryptIdentity {
        kem_pk: &kem_pk,
        kem_sk: &kem_sk,
        sign_pk: &sign_pk,
        sign_sk: &sign_sk,
    };

    let sealed = selfenc::seal(KIND, VERSION, &id, b"", 1_000, 2_000_000).expect("seal");
    let opened = selfenc::open(KIND, VERSION, VERSION, &id, &sealed, 0).expect("open");
    assert!(opened.is_empty());
}

#[test]
fn expired_envelope_is_rejected() {
    let (kem_pk, kem_sk, sign_pk, sign_sk) = identity();
    let id = SelfEncryptIdentity {
        kem_pk: &kem_pk,
        kem_sk: &kem_sk,
        sign_pk: &sign_pk,
        sign_sk: &sign_sk,
    };

    let sealed = selfenc::seal(KIND, VERSION, &id, b"stale", 1_000, 1_500).expect("seal");
    let err = selfenc::open(KIND, VERSION, VERSION, &id, &sealed, 2_000).unwrap_err();
    assert_eq!(err, DecodeError::Expired);
}

#[test]
fn tampered_payload_byte_fails_authentication() {
    let (kem_pk, kem_sk, sign_pk, sign_sk) = identity();
    let id = SelfEncryptIdentity {
        kem_pk: &kem_pk,
        kem_sk: &kem_sk,
        sign_pk: &sign_pk,
        sign_sk: &sign_sk,
    };

    let mut sealed = selfenc::seal(KIND, VERSION, &id, b"untouched", 1_000, 2_000_000).expect("seal");
    // Flip a byte in the middle of the payload (well inside the header).
    let mid = sealed.len() / 2;
    sealed[mid] ^= 0x01;

    let err = selfenc::open(KIND, VERSION, VERSION, &id, &sealed, 0).unwrap_err();
    assert!(matches!(
        err,
        DecodeError::SignatureInvalid | DecodeError::DecryptFail | DecodeError::KemFail
    ));
}

#[test]
fn wrong_recipient_cannot_decapsulate() {
    let (kem_pk, _kem_sk, sign_pk, sign_sk) = identity();
    let (_other_pk, other_kem_sk, _op, _os) = identity();

    let sender_id = SelfEncryptIdentity {
        kem_pk: &kem_pk,
        kem_sk: &_kem_sk,
        sign_pk: &sign_pk,
        sign_sk: &sign_sk,
    };
    let sealed = selfenc::seal(KIND, VERSION, &sender_id, b"for my eyes only", 1_000, 2_000_000).expect("seal");

    let wrong_id = SelfEncryptIdentity {
        kem_pk: &kem_pk,
        kem_sk: &other_kem_sk,
        sign_pk: &sign_pk,
        sign_sk: &sign_sk,
    };
    let err = selfenc::open(KIND, VERSION, VERSION, &wrong_id, &sealed, 0).unwrap_err();
    assert!(matches!(err, DecodeError::DecryptFail | DecodeError::KemFail));
}

#[test]
fn sender_mismatch_is_detected_via_open_from() {
    let (kem_pk, kem_sk, sign_pk, sign_sk) = identity();
    let (_other_kem_pk, _other_kem_sk, impostor_pk, _impostor_sk) = identity();

    let id = SelfEncryptIdentity {
        kem_pk: &kem_pk,
        kem_sk: &kem_sk,
        sign_pk: &sign_pk,
        sign_sk: &sign_sk,
    };
    let sealed = selfenc::seal(KIND, VERSION, &id, b"group value", 1_000, 2_000_000).expect("seal");

    let err = selfenc::open_from(KIND, VERSION, VERSION, &kem_sk, &sign_pk, Some(&impostor_pk), &sealed, 0).unwrap_err();
    assert_eq!(err, DecodeError::SenderMismatch);
}

#[test]
fn seal_to_with_distinct_recipient_and_author_round_trips() {
    let (recipient_kem_pk, recipient_kem_sk) = kem::keygen();
    let (author_pk, author_sk) = signature::keygen();

    let sealed = selfenc::seal_to(KIND, VERSION, &recipient_kem_pk, &author_sk, b"shared-key message", 1_000, 2_000_000)
        .expect("seal_to");
    let opened = selfenc::open_from(KIND, VERSION, VERSION, &recipient_kem_sk, &author_pk, None, &sealed, 0)
        .expect("open_from");
    assert_eq!(opened, b"shared-key message");
}

#[test]
fn open_from_accepts_matching_expected_author() {
    let (kem_pk, kem_sk, sign_pk, sign_sk) = identity();

    let id = SelfEncryptIdentity {
        kem_pk: &kem_pk,
        kem_sk: &kem_sk,
        sign_pk: &sign_pk,
        sign_sk: &sign_sk,
    };
    let sealed = selfenc::seal(KIND, VERSION, &id, b"group value", 1_000, 2_000_000).expect("seal");

    let opened = selfenc::open_from(KIND, VERSION, VERSION, &kem_sk, &sign_pk, Some(&sign_pk), &sealed, 0).expect("open_from");
    assert_eq!(opened, b"group value");
}
