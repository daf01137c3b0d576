//! Unit tests for the Elo engine.

use head2head_server::rating::engine::{
    duel_deltas, expected_score, ffa_deltas, team_deltas, K_FACTOR,
};
use head2head_server::rating::outcome::SideResult;

/// Closed-form Elo update for one side, recomputed independently.
fn closed_form(own: i32, other: i32, actual: f64) -> i32 {
    let expected = 1.0 / (1.0 + 10f64.powf((other - own) as f64 / 400.0));
    (K_FACTOR * (actual - expected)).round() as i32
}

#[test]
fn expected_score_is_half_for_equal_ratings() {
    assert!((expected_score(1000, 1000) - 0.5).abs() < 1e-12);
}

#[test]
fn equal_ratings_decisive_duel_swings_sixteen() {
    let (dw, dl) = duel_deltas(1000, 1000, SideResult::AWins);
    assert_eq!((dw, dl), (16, -16));
}

#[test]
fn equal_ratings_tie_gives_zero_delta() {
    let (da, db) = duel_deltas(1000, 1000, SideResult::Draw);
    assert_eq!((da, db), (0, 0));
}

#[test]
fn duel_deltas_match_closed_form_independently() {
    // Deltas need not be zero-sum after rounding; each side must match the
    // closed-form update on its own.
    for (a, b) in [(1016, 984), (1200, 950), (987, 1432), (1000, 1001)] {
        let (dw, dl) = duel_deltas(a, b, SideResult::AWins);
        assert_eq!(dw, closed_form(a, b, 1.0));
        assert_eq!(dl, closed_form(b, a, 0.0));

        let (da, db) = duel_deltas(a, b, SideResult::Draw);
        assert_eq!(da, closed_form(a, b, 0.5));
        assert_eq!(db, closed_form(b, a, 0.5));
    }
}

#[test]
fn rematch_after_first_result_uses_updated_ratings() {
    // A and B start at 1000; A wins, then B wins the rematch.
    let (d1w, d1l) = duel_deltas(1000, 1000, SideResult::AWins);
    let a = 1000 + d1w; // 1016
    let b = 1000 + d1l; // 984
    assert_eq!((a, b), (1016, 984));

    let (d2w, d2l) = duel_deltas(b, a, SideResult::AWins);
    assert_eq!(d2w, closed_form(984, 1016, 1.0));
    assert_eq!(d2l, closed_form(1016, 984, 0.0));
    assert_eq!((b + d2w, a + d2l), (1001, 999));
}

#[test]
fn ffa_with_two_entrants_reduces_to_duel() {
    let cases = [
        (1000, 1000, 1, 2, SideResult::AWins),
        (1234, 987, 1, 2, SideResult::AWins),
        (900, 1300, 2, 1, SideResult::BWins),
        (1100, 1100, 1, 1, SideResult::Draw),
        (1016, 984, 2, 1, SideResult::BWins),
    ];
    for (ra, rb, pa, pb, result) in cases {
        let ffa = ffa_deltas(&[(ra, pa), (rb, pb)]);
        let (da, db) = duel_deltas(ra, rb, result);
        assert_eq!(ffa, vec![da, db], "ratings {ra}/{rb} places {pa}/{pb}");
    }
}

#[test]
fn three_way_ffa_at_equal_ratings() {
    let deltas = ffa_deltas(&[(1000, 1), (1000, 2), (1000, 3)]);
    assert_eq!(deltas, vec![16, 0, -16]);

    // Pairwise comparisons are zero-sum before rounding; the rounded sum may
    // drift, but by no more than one point per entrant.
    let drift: i32 = deltas.iter().sum();
    assert!(drift.abs() <= deltas.len() as i32);
}

#[test]
fn ffa_place_labels_only_order_matters() {
    let compact = ffa_deltas(&[(1050, 1), (990, 2), (1000, 3)]);
    let sparse = ffa_deltas(&[(1050, 3), (990, 17), (1000, 40)]);
    assert_eq!(compact, sparse);
}

#[test]
fn ffa_equal_places_score_as_draws() {
    let deltas = ffa_deltas(&[(1000, 1), (1000, 1), (1000, 2)]);
    assert_eq!(deltas, vec![8, 8, -16]);
}

#[test]
fn team_match_splits_side_delta_evenly() {
    let (winners, losers) = team_deltas(&[1000, 1000], &[1000, 1000], SideResult::AWins);
    assert_eq!(winners, vec![8, 8]);
    assert_eq!(losers, vec![-8, -8]);
}

#[test]
fn team_split_rounds_per_member_without_redistribution() {
    // Team-level delta is 16; a third of that rounds to 5, so the members
    // carry 15 in total. The remainder is deliberately dropped.
    let (winners, losers) = team_deltas(&[1000, 1000, 1000], &[1000, 1000, 1000], SideResult::AWins);
    assert_eq!(winners, vec![5, 5, 5]);
    assert_eq!(losers, vec![-5, -5, -5]);
}

#[test]
fn team_sides_play_as_their_mean_rating() {
    let (winners, losers) = team_deltas(&[1000, 1200], &[1000, 1000], SideResult::AWins);
    let expected = 1.0 / (1.0 + 10f64.powf((1000.0 - 1100.0) / 400.0));
    let per_member = (K_FACTOR * (1.0 - expected) / 2.0).round() as i32;
    assert_eq!(winners, vec![per_member, per_member]);
    assert_eq!(winners, vec![6, 6]);
    assert_eq!(losers, vec![-6, -6]);
}

#[test]
fn team_tie_between_equal_sides_is_flat() {
    let (a, b) = team_deltas(&[1000, 1000], &[1000, 1000], SideResult::Draw);
    assert_eq!(a, vec![0, 0]);
    assert_eq!(b, vec![0, 0]);
}
