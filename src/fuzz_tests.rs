//! Property-based tests over the cryptographic core.
//!
//! Properties tested:
//! - Derivation purity: equal inputs produce bitwise equal outputs
//! - ECDH symmetry: sender and scanner always agree on the shared secret
//! - Address codec round-trip over arbitrary URLs and keys
//! - Scan candidate filter never panics on arbitrary feed entries

#[cfg(test)]
mod property_tests {
    use proptest::prelude::*;

    use crate::config::{format_address, parse_address};
    use crate::crypto::{
        create_silent_output, ecdh, point_from_priv, scalar_from_bytes,
    };
    use crate::scan::candidate_point;
    use crate::types::split_amount;

    // Strategy for 32-byte values that reduce to a usable scalar.
    fn scalar_bytes() -> impl Strategy<Value = [u8; 32]> {
        prop::array::uniform32(any::<u8>())
            .prop_filter("usable scalar", |bytes| scalar_from_bytes(bytes).is_ok())
    }

    // Arbitrary 33-byte shared-secret input; derivation only hashes it.
    fn shared_secret() -> impl Strategy<Value = [u8; 33]> {
        (prop::array::uniform32(any::<u8>()), prop_oneof![Just(0x02u8), Just(0x03u8)]).prop_map(
            |(body, prefix)| {
                let mut out = [0u8; 33];
                out[0] = prefix;
                out[1..].copy_from_slice(&body);
                out
            },
        )
    }

    proptest! {
        #[test]
        fn derivation_is_pure(
            shared in shared_secret(),
            spend in scalar_bytes(),
            index in 0u8..8,
            amount in 0u64..=1 << 20,
        ) {
            let spend_pub = point_from_priv(&scalar_from_bytes(&spend).unwrap());
            let a = create_silent_output(amount, "00a7f2d9c14b8e30", &shared, &spend_pub, index).unwrap();
            let b = create_silent_output(amount, "00a7f2d9c14b8e30", &shared, &spend_pub, index).unwrap();
            prop_assert_eq!(a.secret, b.secret);
            prop_assert_eq!(a.r, b.r);
            prop_assert_eq!(a.blinded, b.blinded);
        }

        #[test]
        fn ecdh_commutes(a in scalar_bytes(), b in scalar_bytes()) {
            let sa = scalar_from_bytes(&a).unwrap();
            let sb = scalar_from_bytes(&b).unwrap();
            prop_assert_eq!(
                ecdh(&sa, &point_from_priv(&sb)),
                ecdh(&sb, &point_from_priv(&sa))
            );
        }

        #[test]
        fn address_round_trips(
            host in "[a-z][a-z0-9.-]{0,24}",
            port in 1u16..,
            scan_body in prop::array::uniform32(any::<u8>()),
            spend_body in prop::array::uniform32(any::<u8>()),
            scan_prefix in prop_oneof![Just(0x02u8), Just(0x03u8)],
            spend_prefix in prop_oneof![Just(0x02u8), Just(0x03u8)],
        ) {
            let mint_url = format!("http://{host}:{port}");
            let mut scan = [0u8; 33];
            scan[0] = scan_prefix;
            scan[1..].copy_from_slice(&scan_body);
            let mut spend = [0u8; 33];
            spend[0] = spend_prefix;
            spend[1..].copy_from_slice(&spend_body);

            let parsed = parse_address(&format_address(&mint_url, &scan, &spend)).unwrap();
            prop_assert_eq!(parsed.mint_url, mint_url);
            prop_assert_eq!(parsed.scan_pubkey, scan);
            prop_assert_eq!(parsed.spend_pubkey, spend);
        }

        #[test]
        fn candidate_filter_never_panics(entry in ".{0,80}") {
            // Feed entries are attacker-controlled; the filter may only
            // answer yes or no.
            let _ = candidate_point(&entry);
        }

        #[test]
        fn candidate_filter_rejects_wrong_length(entry in "[0-9a-f]{0,100}") {
            if entry.len() != 66 {
                prop_assert!(candidate_point(&entry).is_none());
            }
        }

        #[test]
        fn split_amount_reassembles(amount in 0u64..=1 << 40) {
            let parts = split_amount(amount);
            prop_assert_eq!(parts.iter().sum::<u64>(), amount);
            prop_assert!(parts.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(parts.iter().all(|p| p.is_power_of_two()));
        }
    }
}
