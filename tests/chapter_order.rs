// tests/chapter_order.rs
use chapter_feed::chapter::ChapterKey;
use rand::Rng;
use std::cmp::Ordering;

fn random_key<R: Rng>(rng: &mut R) -> ChapterKey {
    match rng.random_range(0..4) {
        0 => ChapterKey::Numeric(rng.random_range(0..50)),
        1 => ChapterKey::Pair(rng.random_range(0..50), rng.random_range(0..10)),
        2 => {
            let suffix = ["a", "b", "-extra", " side"][rng.random_range(0..4)];
            ChapterKey::PartialNumeric(rng.random_range(0..50), suffix.to_string())
        }
        _ => {
            let label = ["", "Oneshot", "Prologue", "Extra"][rng.random_range(0..4)];
            ChapterKey::Opaque(label.to_string())
        }
    }
}

#[test]
fn ordering_is_a_total_order_over_mixed_keys() {
    let mut rng = rand::rng();
    let keys: Vec<ChapterKey> = (0..120).map(|_| random_key(&mut rng)).collect();

    for a in &keys {
        assert_eq!(a.cmp(a), Ordering::Equal);
        for b in &keys {
            // antisymmetry
            assert_eq!(a.cmp(b), b.cmp(a).reverse());
            assert_eq!(a.cmp(b) == Ordering::Equal, a == b);
            for c in keys.iter().take(30) {
                if a <= b && b <= c {
                    assert!(a <= c, "{a} <= {b} <= {c}");
                }
            }
        }
    }
}

#[test]
fn sorting_groups_by_variant_then_fields() {
    let mut keys = vec![
        ChapterKey::parse("10.5"),
        ChapterKey::parse("Oneshot"),
        ChapterKey::parse("99"),
        ChapterKey::parse("3a"),
        ChapterKey::parse("2"),
        ChapterKey::parse("1.10"),
        ChapterKey::none(),
    ];
    keys.sort();
    let shown: Vec<String> = keys.iter().map(ToString::to_string).collect();
    assert_eq!(shown, vec!["", "Oneshot", "2", "99", "3a", "1.10", "10.5"]);
}

#[test]
fn plain_integers_display_as_parsed() {
    let mut rng = rand::rng();
    for _ in 0..200 {
        let n: u64 = rng.random_range(0..1_000_000);
        let label = n.to_string();
        let key = ChapterKey::parse(&label);
        assert_eq!(key, ChapterKey::Numeric(n));
        assert_eq!(key.to_string(), label);
    }
}
