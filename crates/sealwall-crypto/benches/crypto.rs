use std::sync::OnceLock;

use sealwall_crypto::{
    decrypt_message, encrypt_message, pack, unpack_aligned, CryptoProvider, EncryptedEnvelope,
    KeyPair, RsaOaep, CIPHER_BLOCK_SIZE,
};

fn pair() -> &'static KeyPair {
    static PAIR: OnceLock<KeyPair> = OnceLock::new();
    PAIR.get_or_init(|| RsaOaep::default().generate_key_pair().unwrap())
}

fn make_message(size: usize) -> String {
    (0..size)
        .map(|i| char::from(b'a' + (i.wrapping_mul(7) % 26) as u8))
        .collect()
}

#[divan::bench(args = [16, 190, 1024, 4096])]
fn bench_encrypt_message(bencher: divan::Bencher, size: usize) {
    let provider = RsaOaep::default();
    let message = make_message(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            encrypt_message(
                &provider,
                divan::black_box(pair().public()),
                divan::black_box(&message),
            )
            .unwrap()
        });
}

#[divan::bench(args = [16, 190, 1024, 4096])]
fn bench_decrypt_message(bencher: divan::Bencher, size: usize) {
    let provider = RsaOaep::default();
    let envelope = encrypt_message(&provider, pair().public(), &make_message(size)).unwrap();
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            decrypt_message(
                &provider,
                divan::black_box(pair().private()),
                divan::black_box(&envelope),
            )
            .unwrap()
        });
}

#[divan::bench(args = [1, 8, 64])]
fn bench_pack_unpack(bencher: divan::Bencher, blocks: usize) {
    let envelope = EncryptedEnvelope::from_blocks(vec![vec![0x5Au8; CIPHER_BLOCK_SIZE]; blocks]);
    bencher
        .counter(divan::counter::BytesCount::new(blocks * CIPHER_BLOCK_SIZE))
        .bench(|| {
            let record = pack(divan::black_box(&envelope.blocks));
            unpack_aligned(&record, CIPHER_BLOCK_SIZE).unwrap()
        });
}

fn main() {
    divan::main();
}
