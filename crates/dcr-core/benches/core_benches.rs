//! Criterion benchmarks for hashing, key derivation and transaction codec.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use dcr_core::blake256::blake256;
use dcr_core::hdkeychain::ExtendedKey;
use dcr_core::params::{Network, HARDENED_KEY_START};
use dcr_core::script::p2pkh_script;
use dcr_core::types::{Hash256, OutPoint};
use dcr_core::wire::{MsgTx, TxIn, TxOut};

fn sample_tx() -> MsgTx {
    let mut tx = MsgTx::new();
    for i in 0..4u8 {
        let mut input = TxIn::new(OutPoint::new(Hash256([i; 32]), i as u32, 0), 1_000_000);
        input.signature_script = vec![0u8; 108];
        tx.tx_in.push(input);
    }
    tx.tx_out.push(TxOut::new(2_000_000, p2pkh_script(&[0xcc; 20])));
    tx.tx_out.push(TxOut::new(1_990_000, p2pkh_script(&[0xdd; 20])));
    tx
}

fn bench_blake256(c: &mut Criterion) {
    let small = [0u8; 64];
    let large = vec![0u8; 16 * 1024];

    c.bench_function("blake256_64_bytes", |b| b.iter(|| blake256(black_box(&small))));
    c.bench_function("blake256_16_kib", |b| b.iter(|| blake256(black_box(&large))));
}

fn bench_child_derivation(c: &mut Criterion) {
    let master = ExtendedKey::new_master(&[42u8; 32], Network::Mainnet).expect("master key");
    let account = master.child(HARDENED_KEY_START).expect("account key");
    let xpub = account.neuter().expect("neuter");

    c.bench_function("child_private_hardened", |b| {
        b.iter(|| master.child(black_box(HARDENED_KEY_START + 7)))
    });
    c.bench_function("child_public_address", |b| {
        b.iter(|| xpub.child(black_box(0)).and_then(|k| k.child(5)).and_then(|k| k.address()))
    });
}

fn bench_tx_codec(c: &mut Criterion) {
    let tx = sample_tx();
    let bytes = tx.to_bytes();

    c.bench_function("tx_serialize", |b| b.iter(|| black_box(&tx).to_bytes()));
    c.bench_function("tx_deserialize", |b| b.iter(|| MsgTx::from_bytes(black_box(&bytes))));
    c.bench_function("tx_hash", |b| b.iter(|| black_box(&tx).tx_hash()));
}

criterion_group!(benches, bench_blake256, bench_child_derivation, bench_tx_codec);
criterion_main!(benches);
