//! Confidence fusion: raw model probability boosted by corroborating evidence.

/// Boost per matched keyword, capped at [`KEYWORD_BOOST_CAP`].
pub const KEYWORD_BOOST_STEP: f64 = 0.1;
pub const KEYWORD_BOOST_CAP: f64 = 0.3;

/// Boost per resolved location, capped at [`LOCATION_BOOST_CAP`].
pub const LOCATION_BOOST_STEP: f64 = 0.1;
pub const LOCATION_BOOST_CAP: f64 = 0.2;

/// Fuse a disaster probability with keyword and location counts.
///
/// Always returns a value in `[0, 1]`. A non-finite or negative probability
/// counts as zero.
pub fn fuse(probability: f64, keyword_count: usize, location_count: usize) -> f64 {
    let base = if probability.is_finite() {
        probability.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let keyword_boost = (keyword_count as f64 * KEYWORD_BOOST_STEP).min(KEYWORD_BOOST_CAP);
    let location_boost = (location_count as f64 * LOCATION_BOOST_STEP).min(LOCATION_BOOST_CAP);

    (base + keyword_boost + location_boost).min(1.0)
}
