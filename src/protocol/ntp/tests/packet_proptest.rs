use proptest::prelude::*;

use crate::protocol::ntp::{NtpPacket, NtpShort, NtpTimestamp, join_fixed, split_fixed};

fn timestamp() -> impl Strategy<Value = NtpTimestamp> {
    (any::<u32>(), any::<u32>()).prop_map(|(s, f)| NtpTimestamp::new(s, f))
}

proptest! {
    #[test]
    fn test_decode_any_bytes(bytes in proptest::collection::vec(any::<u8>(), 0..100)) {
        // Should not panic, return either Ok or Err
        let _ = NtpPacket::decode(&bytes);
    }

    #[test]
    fn test_packet_encode_decode_roundtrip(
        leap in 0u8..4,
        version in 0u8..8,
        mode in 0u8..8,
        stratum in any::<u8>(),
        poll in any::<u8>(),
        precision in any::<i8>(),
        root_delay in any::<u32>(),
        root_dispersion in any::<u32>(),
        reference_id in any::<u32>(),
        stamps in (timestamp(), timestamp(), timestamp(), timestamp()),
    ) {
        let (reference, originate, receive, transmit) = stamps;
        let packet = NtpPacket {
            leap,
            version,
            mode,
            stratum,
            poll,
            precision,
            root_delay: NtpShort::from_bits(root_delay),
            root_dispersion: NtpShort::from_bits(root_dispersion),
            reference_id,
            reference,
            originate,
            receive,
            transmit,
        };

        let encoded = packet.encode().expect("Encode failed");
        let decoded = NtpPacket::decode(&encoded).expect("Decode failed");
        prop_assert_eq!(decoded, packet);
    }

    #[test]
    fn test_wire_decode_encode_roundtrip(
        bytes in proptest::array::uniform32(any::<u8>()),
        tail in proptest::array::uniform16(any::<u8>())
    ) {
        let mut wire = [0u8; 48];
        wire[..32].copy_from_slice(&bytes);
        wire[32..].copy_from_slice(&tail);

        let packet = NtpPacket::decode(&wire).unwrap();
        prop_assert_eq!(packet.encode().unwrap(), wire);
    }

    #[test]
    fn test_join_fixed_monotonic_in_fraction(integer in 0i64..1_000_000, a in any::<u32>(), b in any::<u32>()) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(join_fixed(integer, u64::from(lo), 32) <= join_fixed(integer, u64::from(hi), 32));

        let (lo16, hi16) = (lo >> 16, hi >> 16);
        prop_assert!(join_fixed(integer, u64::from(lo16), 16) <= join_fixed(integer, u64::from(hi16), 16));
    }

    #[test]
    fn test_split_join_never_overshoots(value in 0.0f64..65_536.0) {
        for bits in [16u32, 32] {
            let (integer, fraction) = split_fixed(value, bits);
            let rebuilt = join_fixed(integer, fraction, bits);
            prop_assert!(rebuilt <= value);
            prop_assert!(value - rebuilt < 1.0 / f64::from(1u32 << (bits - 1)));
        }
    }

    #[test]
    fn test_short_bits_roundtrip(bits in any::<u32>()) {
        prop_assert_eq!(NtpShort::from_bits(bits).to_bits(), bits);
    }
}
