use sha2::{Digest, Sha256};

/// Compute the canonical digest of a deck list.
///
/// The digest is a pure function of the sorted card-id multiset, so any
/// permutation of the same list (including repeated copies of a card)
/// produces the same value. Used to resolve equivalent deck lists to a
/// single shared row.
pub fn deck_digest(card_ids: &[String]) -> String {
    let mut sorted: Vec<&str> = card_ids.iter().map(String::as_str).collect();
    sorted.sort_unstable();

    let mut hasher = Sha256::new();
    for card_id in &sorted {
        hasher.update(card_id.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

/// Sorted copy of a card-id list, the canonical stored form.
pub fn canonical_card_list(card_ids: &[String]) -> Vec<String> {
    let mut sorted = card_ids.to_vec();
    sorted.sort_unstable();
    sorted
}
