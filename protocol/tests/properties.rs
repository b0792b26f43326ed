//! Property tests: hardening bounds, codec round trips, and value
//! conservation through the builder.

use proptest::prelude::*;

use conway_tx::config::{
    ExUnitPrices, ProtocolParameters, UnitInterval, HARDENED_OFFSET, TESTNET_NETWORK_ID,
};
use conway_tx::crypto::{derive_path, harden, DerivationPath, RootKey};
use conway_tx::primitives::{
    Address, AssetName, Credential, Ed25519KeyHash, MultiAsset, PolicyId, ScriptHash,
    TransactionHash, Value,
};
use conway_tx::transaction::{
    from_canonical_bytes, LinearFee, TransactionBuilder, TransactionInput, TransactionOutput,
};

fn params() -> ProtocolParameters {
    ProtocolParameters::builder()
        .fee_algo(LinearFee::new(44, 155_381))
        .coins_per_utxo_byte(4_310)
        .pool_deposit(500_000_000)
        .key_deposit(2_000_000)
        .drep_deposit(500_000_000)
        .voting_proposal_deposit(100_000_000_000)
        .max_tx_size(16_384)
        .max_value_size(5_000)
        .ex_unit_prices(ExUnitPrices {
            mem_price: UnitInterval::new(577, 10_000).unwrap(),
            step_price: UnitInterval::new(721, 10_000_000).unwrap(),
        })
        .build()
        .unwrap()
}

fn credential(hash: [u8; 28], script: bool) -> Credential {
    if script {
        Credential::from_scripthash(ScriptHash::new(hash))
    } else {
        Credential::from_keyhash(Ed25519KeyHash::new(hash))
    }
}

fn value_strategy() -> impl Strategy<Value = Value> {
    let asset = (
        any::<[u8; 28]>(),
        proptest::collection::vec(any::<u8>(), 0..=32),
        1u64..u64::MAX,
    );
    (any::<u64>(), proptest::collection::vec(asset, 0..4)).prop_map(|(coin, assets)| {
        let mut multiasset = MultiAsset::new();
        for (policy, name, amount) in assets {
            multiasset.set(PolicyId::new(policy), AssetName::new(name).unwrap(), amount);
        }
        Value::new_with_assets(coin, multiasset)
    })
}

proptest! {
    #[test]
    fn harden_stays_in_upper_half(i in 0u32..HARDENED_OFFSET) {
        let hardened = harden(i).unwrap();
        prop_assert!(hardened >= HARDENED_OFFSET);
        prop_assert_eq!(hardened - HARDENED_OFFSET, i);
    }

    #[test]
    fn harden_rejects_upper_half(i in HARDENED_OFFSET..=u32::MAX) {
        prop_assert!(harden(i).is_err());
    }

    #[test]
    fn derivation_is_deterministic(entropy in any::<[u8; 16]>(), account in 0u32..8, index in 0u32..100) {
        let root = RootKey::from_entropy(&entropy, "");
        let path: DerivationPath = format!("m/1852'/1815'/{}'/0/{}", account, index).parse().unwrap();
        let a = derive_path(&root, &path);
        let b = derive_path(&root, &path);
        prop_assert_eq!(a.public_key(), b.public_key());
        let (key_a, key_b) = (a.private_key_bytes(), b.private_key_bytes());
        prop_assert!(*key_a == *key_b);
    }

    #[test]
    fn hash_hex_round_trip(bytes in any::<[u8; 32]>()) {
        let hash = TransactionHash::new(bytes);
        prop_assert_eq!(TransactionHash::from_hex(&hash.to_hex()).unwrap(), hash);
    }

    #[test]
    fn address_round_trips(
        network in 0u8..16,
        payment in any::<[u8; 28]>(),
        stake in any::<[u8; 28]>(),
        payment_script in any::<bool>(),
        stake_script in any::<bool>(),
    ) {
        let address = Address::base(
            network,
            credential(payment, payment_script),
            credential(stake, stake_script),
        )
        .unwrap();
        prop_assert_eq!(Address::from_bytes(&address.to_bytes()).unwrap(), address);
        prop_assert_eq!(Address::from_bech32(&address.to_bech32()).unwrap(), address);

        let cbor = minicbor::to_vec(address).unwrap();
        prop_assert_eq!(from_canonical_bytes::<Address>(&cbor, "address").unwrap(), address);
    }

    #[test]
    fn value_round_trips(value in value_strategy()) {
        let cbor = minicbor::to_vec(&value).unwrap();
        prop_assert_eq!(cbor.len(), value.encoded_size());
        prop_assert_eq!(from_canonical_bytes::<Value>(&cbor, "value").unwrap(), value);
    }

    #[test]
    fn input_round_trips(id in any::<[u8; 32]>(), index in any::<u32>()) {
        let input = TransactionInput::new(TransactionHash::new(id), index);
        let cbor = minicbor::to_vec(input).unwrap();
        prop_assert_eq!(from_canonical_bytes::<TransactionInput>(&cbor, "input").unwrap(), input);
    }

    #[test]
    fn builder_conserves_value(
        input_coin in 3_000_000u64..1_000_000_000_000,
        share in 0u64..=1_000,
        ttl in proptest::option::of(1u64..200_000_000),
    ) {
        let address = Address::base(
            TESTNET_NETWORK_ID,
            credential([1; 28], false),
            credential([2; 28], false),
        )
        .unwrap();
        let output_coin = 1_000_000 + (input_coin - 3_000_000) * share / 1_000;

        let mut builder = TransactionBuilder::new(&params());
        builder
            .add_input(&address, TransactionInput::new(TransactionHash::new([9; 32]), 0), Value::new(input_coin))
            .unwrap()
            .add_output(TransactionOutput::new(address, Value::new(output_coin)))
            .unwrap();
        if let Some(slot) = ttl {
            builder.set_ttl(slot).unwrap();
        }
        builder.add_change_if_needed(&address).unwrap();
        let tx = builder.build().unwrap();

        let produced: u64 = tx.body().outputs.iter().map(|o| o.amount.coin).sum();
        prop_assert_eq!(input_coin, produced + tx.fee());
        prop_assert!(tx.fee() >= builder.min_fee().unwrap());
    }
}
