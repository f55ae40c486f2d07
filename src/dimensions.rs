//! Codec for the marketplace's compact shipping string `"<h>x<w>x<l>,<grams>"`

use crate::models::Dimensions;

/// Decodes a dimension string into centimeters and kilograms.
///
/// Anything malformed (missing comma, wrong number of `x` separators,
/// non-numeric or negative parts) decodes to all zeros instead of failing.
pub fn decode(raw: Option<&str>) -> (Dimensions, f64) {
    raw.and_then(try_decode).unwrap_or_default()
}

fn try_decode(raw: &str) -> Option<(Dimensions, f64)> {
    let (size, grams) = match raw.split(',').collect::<Vec<_>>().as_slice() {
        [size, grams] => (*size, *grams),
        _ => return None,
    };

    let [height, width, length] = match size.split('x').collect::<Vec<_>>().as_slice() {
        [h, w, l] => [parse_measure(h)?, parse_measure(w)?, parse_measure(l)?],
        _ => return None,
    };

    let weight = parse_measure(grams)? / 1000.0;

    Some((
        Dimensions {
            height,
            width,
            length,
        },
        weight,
    ))
}

fn parse_measure(part: &str) -> Option<f64> {
    part.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value >= 0.0)
}

/// Encodes centimeters plus kilograms, rounding the weight to whole grams.
pub fn encode(dimensions: &Dimensions, weight_kg: f64) -> String {
    format!(
        "{}x{}x{},{}",
        dimensions.height,
        dimensions.width,
        dimensions.length,
        kilograms_to_grams(weight_kg)
    )
}

pub fn kilograms_to_grams(weight_kg: f64) -> u64 {
    (weight_kg * 1000.0).round().max(0.0) as u64
}
