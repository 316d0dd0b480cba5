//! Every single-byte corruption must be reported as a wrong passphrase

use callisto_crypto::{decrypt, encrypt, CryptoError, KdfParams, Passphrase, HEADER_LEN};

#[test]
fn test_every_flipped_byte_fails_uniformly() {
    let passphrase = Passphrase::new("solidasarock1234rock");
    let blob = encrypt(b"{\"question_1\":\"a\"}", &passphrase, &KdfParams::insecure_for_tests())
        .unwrap();
    assert!(blob.len() > HEADER_LEN);

    for at in 0..blob.len() {
        let mut tampered = blob.clone();
        tampered[at] ^= 0x80;
        assert_eq!(
            decrypt(&tampered, &passphrase).unwrap_err(),
            CryptoError::WrongPassphrase,
            "byte {at} was not rejected"
        );
    }
}

#[test]
fn test_similar_passphrases_fail() {
    let params = KdfParams::insecure_for_tests();
    let blob = encrypt(b"data", &"super secret".into(), &params).unwrap();

    for wrong in ["super secret ", "Super secret", "super secre", ""] {
        assert_eq!(
            decrypt(&blob, &wrong.into()).unwrap_err(),
            CryptoError::WrongPassphrase
        );
    }
}
