//! Property-based tests for the enum codec.
//!
//! - Round-trip: decode(encode(v)) == v for every defined value
//! - Fail-closed: anything outside the accepted spellings is rejected

use proptest::prelude::*;

use super::enums::{DebitOrCredit, RemoteEnum, Status};

fn accepted<E: RemoteEnum>(raw: &str) -> bool {
    E::ALL
        .iter()
        .map(|v| v.encode())
        .chain(E::SYNONYMS.iter().map(|(token, _)| *token))
        .any(|token| raw == token || raw == token.to_ascii_lowercase())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Every defined value survives encode then decode.
    #[test]
    fn prop_round_trip(index in 0usize..2) {
        let balance = DebitOrCredit::ALL[index];
        prop_assert_eq!(DebitOrCredit::decode(balance.encode()), Ok(balance));

        let status = Status::ALL[index];
        prop_assert_eq!(Status::decode(status.encode()), Ok(status));
    }

    /// Arbitrary strings decode only when they are an accepted spelling.
    #[test]
    fn prop_unknown_strings_rejected(raw in "\\PC{0,12}") {
        prop_assert_eq!(DebitOrCredit::decode(&raw).is_ok(), accepted::<DebitOrCredit>(&raw));
        prop_assert_eq!(Status::decode(&raw).is_ok(), accepted::<Status>(&raw));
    }

    /// Mixed-case spellings of a canonical token are rejected.
    #[test]
    fn prop_mixed_case_rejected(mask in prop::collection::vec(any::<bool>(), 6)) {
        let mixed: String = "CREDIT"
            .chars()
            .zip(mask.iter())
            .map(|(c, lower)| if *lower { c.to_ascii_lowercase() } else { c })
            .collect();
        let uniform = mixed == "CREDIT" || mixed == "credit";
        prop_assert_eq!(DebitOrCredit::decode(&mixed).is_ok(), uniform);
    }
}
