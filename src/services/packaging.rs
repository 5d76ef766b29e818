//! Package weight and dimension calculation from the free-text specification
//! strings sellers type into the catalog ("8.5 kg", "38 x 26 x 50 cm").

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::PackagingConfig;
use crate::entities::product::Model as ProductModel;

static WEIGHT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(\d+(?:[.,]\d+)?)\s*(kilograms?|kgs?|grams?|gms?|gm|g|pounds?|lbs?)\b",
    )
    .expect("valid weight regex")
});

static DIMENSIONS_RE: Lazy<Regex> = Lazy::new(|| {
    let number = r"(\d+(?:[.,]\d+)?)";
    let unit = r"(mm|cm|m|inches|inch|in)?";
    let last_unit = r"(?:(mm|cm|m|inches|inch|in)\b)?";
    let sep = r"\s*[x×*]\s*";
    Regex::new(&format!(
        r"(?i){n}\s*{u}{s}{n}\s*{u}{s}{n}\s*{lu}",
        n = number,
        u = unit,
        s = sep,
        lu = last_unit
    ))
    .expect("valid dimensions regex")
});

const LB_TO_KG: f64 = 0.453_592_37;
const INCH_TO_CM: f64 = 2.54;

fn parse_number(raw: &str) -> Option<f64> {
    raw.replace(',', ".").parse::<f64>().ok().filter(|v| v.is_finite())
}

/// First `<number><unit>` weight in `text`, converted to kilograms
pub fn parse_weight_kg(text: &str) -> Option<f64> {
    let caps = WEIGHT_RE.captures(text)?;
    let value = parse_number(caps.get(1)?.as_str())?;
    let unit = caps.get(2)?.as_str().to_ascii_lowercase();

    let kg = if unit.starts_with('k') {
        value
    } else if unit.starts_with('g') {
        value / 1000.0
    } else {
        value * LB_TO_KG
    };

    (kg > 0.0).then_some(kg)
}

fn unit_factor_cm(unit: &str) -> f64 {
    match unit.to_ascii_lowercase().as_str() {
        "mm" => 0.1,
        "m" => 100.0,
        "in" | "inch" | "inches" => INCH_TO_CM,
        _ => 1.0,
    }
}

/// `L x B x H` in centimetres. A number without its own unit takes the
/// trailing unit, or centimetres when none is given.
pub fn parse_dimensions_cm(text: &str) -> Option<(f64, f64, f64)> {
    let caps = DIMENSIONS_RE.captures(text)?;

    let trailing_unit = caps.get(6).map(|m| m.as_str()).unwrap_or("cm");
    let mut values = [0.0_f64; 3];
    for (i, value) in values.iter_mut().enumerate() {
        let number = parse_number(caps.get(1 + i * 2)?.as_str())?;
        let unit = caps
            .get(2 + i * 2)
            .map(|m| m.as_str())
            .unwrap_or(trailing_unit);
        *value = number * unit_factor_cm(unit);
    }

    values
        .iter()
        .all(|v| *v > 0.0)
        .then_some((values[0], values[1], values[2]))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Rounds up to two decimals; courier slabs bill any started 10 grams.
fn ceil2(value: f64) -> f64 {
    ((value * 100.0) - 1e-9).ceil() / 100.0
}

/// Measurements of a single unit of a product
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ItemMeasurements {
    pub weight_kg: f64,
    pub length_cm: f64,
    pub breadth_cm: f64,
    pub height_cm: f64,
    /// At least one measurement fell back to the configured defaults
    pub estimated: bool,
}

/// Packed parcel for a whole order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PackageDetails {
    pub weight_kg: f64,
    pub length_cm: f64,
    pub breadth_cm: f64,
    pub height_cm: f64,
    pub volumetric_weight_kg: f64,
    pub chargeable_weight_kg: f64,
    pub estimated: bool,
    pub item_count: u32,
}

#[derive(Debug, Clone)]
pub struct PackageCalculator {
    defaults: PackagingConfig,
}

impl Default for PackageCalculator {
    fn default() -> Self {
        Self::new(PackagingConfig::default())
    }
}

impl PackageCalculator {
    pub fn new(defaults: PackagingConfig) -> Self {
        Self { defaults }
    }

    /// Reads weight and size from labelled specification pairs. When the
    /// labelled entry is missing or unreadable every value is scanned.
    pub fn measure(&self, specifications: &[(String, String)]) -> ItemMeasurements {
        let labelled = |needles: &[&str]| {
            specifications
                .iter()
                .find(|(key, _)| {
                    let key = key.to_lowercase();
                    needles.iter().any(|n| key.contains(n))
                })
                .map(|(_, value)| value.as_str())
        };

        let weight = labelled(&["weight"])
            .and_then(parse_weight_kg)
            .or_else(|| specifications.iter().find_map(|(_, v)| parse_weight_kg(v)));

        let dimensions = labelled(&["dimension", "size"])
            .and_then(parse_dimensions_cm)
            .or_else(|| {
                specifications
                    .iter()
                    .find_map(|(_, v)| parse_dimensions_cm(v))
            });

        let (length_cm, breadth_cm, height_cm) = dimensions.unwrap_or((
            self.defaults.default_length_cm,
            self.defaults.default_breadth_cm,
            self.defaults.default_height_cm,
        ));

        ItemMeasurements {
            weight_kg: weight.unwrap_or(self.defaults.default_item_weight_kg),
            length_cm,
            breadth_cm,
            height_cm,
            estimated: weight.is_none() || dimensions.is_none(),
        }
    }

    pub fn measure_product(&self, product: &ProductModel) -> ItemMeasurements {
        self.measure(&product.specification_pairs())
    }

    /// Units are stacked: heights add up, the footprint is the largest item's.
    pub fn aggregate(&self, lines: &[(ItemMeasurements, u32)]) -> PackageDetails {
        let mut weight = 0.0;
        let mut length: f64 = 0.0;
        let mut breadth: f64 = 0.0;
        let mut height = 0.0;
        let mut estimated = false;
        let mut item_count = 0;

        for (item, quantity) in lines.iter().filter(|(_, q)| *q > 0) {
            let qty = f64::from(*quantity);
            weight += item.weight_kg * qty;
            length = length.max(item.length_cm);
            breadth = breadth.max(item.breadth_cm);
            height += item.height_cm * qty;
            estimated |= item.estimated;
            item_count += quantity;
        }

        let volumetric = length * breadth * height / self.defaults.volumetric_divisor;
        let chargeable = weight
            .max(volumetric)
            .max(self.defaults.min_chargeable_weight_kg);

        PackageDetails {
            weight_kg: round2(weight),
            length_cm: round2(length),
            breadth_cm: round2(breadth),
            height_cm: round2(height),
            volumetric_weight_kg: round2(volumetric),
            chargeable_weight_kg: ceil2(chargeable),
            estimated,
            item_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[rstest]
    #[case("8.5 kg", 8.5)]
    #[case("8,5 Kg", 8.5)]
    #[case("Net weight 12kgs approx", 12.0)]
    #[case("8500 g", 8.5)]
    #[case("750gms", 0.75)]
    #[case("2 kilograms", 2.0)]
    #[case("10 lbs", 4.5359237)]
    #[case("1 pound", 0.45359237)]
    fn weights(#[case] text: &str, #[case] expected: f64) {
        let kg = parse_weight_kg(text).unwrap();
        assert!(close(kg, expected), "{} -> {}", text, kg);
    }

    #[rstest]
    #[case("heavy")]
    #[case("5 gallons")]
    #[case("0 kg")]
    #[case("")]
    fn unreadable_weights(#[case] text: &str) {
        assert_eq!(parse_weight_kg(text), None);
    }

    #[rstest]
    #[case("38 x 26 x 50 cm", (38.0, 26.0, 50.0))]
    #[case("38X26X50", (38.0, 26.0, 50.0))]
    #[case("38 × 26 × 50", (38.0, 26.0, 50.0))]
    #[case("380*260*500 mm", (38.0, 26.0, 50.0))]
    #[case("0.4 m x 0.3 m x 0.5 m", (40.0, 30.0, 50.0))]
    #[case("10 x 5 x 20 inches", (25.4, 12.7, 50.8))]
    #[case("L x B x H: 38,5 x 26 x 50cm", (38.5, 26.0, 50.0))]
    fn dimensions(#[case] text: &str, #[case] expected: (f64, f64, f64)) {
        let (l, b, h) = parse_dimensions_cm(text).unwrap();
        assert!(
            close(l, expected.0) && close(b, expected.1) && close(h, expected.2),
            "{} -> {:?}",
            text,
            (l, b, h)
        );
    }

    #[test]
    fn two_numbers_are_not_dimensions() {
        assert_eq!(parse_dimensions_cm("38 x 26 cm"), None);
    }

    fn specs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn labelled_keys_win() {
        let calc = PackageCalculator::default();
        let item = calc.measure(&specs(&[
            ("Capacity", "10 L storage, 2 kg filter pack"),
            ("Product Dimensions", "38 x 26 x 50 cm"),
            ("Weight", "8.5 kg"),
        ]));
        assert!(close(item.weight_kg, 8.5));
        assert!(close(item.height_cm, 50.0));
        assert!(!item.estimated);
    }

    #[test]
    fn unlabelled_values_are_scanned() {
        let calc = PackageCalculator::default();
        let item = calc.measure(&specs(&[("Box", "Packed 40x30x20 cm, 6 kg")]));
        assert!(close(item.weight_kg, 6.0));
        assert!(close(item.length_cm, 40.0));
        assert!(!item.estimated);
    }

    #[test]
    fn missing_measurements_fall_back_to_defaults() {
        let calc = PackageCalculator::default();
        let item = calc.measure(&specs(&[("Weight", "light"), ("Colour", "White")]));
        assert!(close(item.weight_kg, 5.0));
        assert!(close(item.length_cm, 40.0));
        assert!(close(item.breadth_cm, 30.0));
        assert!(close(item.height_cm, 50.0));
        assert!(item.estimated);
    }

    #[test]
    fn aggregation_stacks_units_and_charges_volumetric_weight() {
        let calc = PackageCalculator::default();
        let purifier = ItemMeasurements {
            weight_kg: 8.5,
            length_cm: 38.0,
            breadth_cm: 26.0,
            height_cm: 50.0,
            estimated: false,
        };
        let filter = ItemMeasurements {
            weight_kg: 0.5,
            length_cm: 30.0,
            breadth_cm: 10.0,
            height_cm: 10.0,
            estimated: false,
        };

        let package = calc.aggregate(&[(purifier, 1), (filter, 2)]);
        assert!(close(package.weight_kg, 9.5));
        assert!(close(package.length_cm, 38.0));
        assert!(close(package.breadth_cm, 26.0));
        assert!(close(package.height_cm, 70.0));
        // 38 * 26 * 70 / 5000 = 13.832
        assert!(close(package.volumetric_weight_kg, 13.83));
        assert!(close(package.chargeable_weight_kg, 13.84));
        assert_eq!(package.item_count, 3);
        assert!(!package.estimated);
    }

    #[test]
    fn tiny_parcels_pay_the_minimum_slab() {
        let calc = PackageCalculator::default();
        let cartridge = ItemMeasurements {
            weight_kg: 0.2,
            length_cm: 10.0,
            breadth_cm: 5.0,
            height_cm: 5.0,
            estimated: true,
        };
        let package = calc.aggregate(&[(cartridge, 1)]);
        assert!(close(package.chargeable_weight_kg, 0.5));
        assert!(package.estimated);
    }

    proptest! {
        #[test]
        fn parsers_never_panic(text in "\\PC{0,64}") {
            let _ = parse_weight_kg(&text);
            let _ = parse_dimensions_cm(&text);
        }

        #[test]
        fn chargeable_weight_is_never_below_actual_or_minimum(
            w in 0.01f64..100.0,
            l in 1.0f64..200.0,
            b in 1.0f64..200.0,
            h in 1.0f64..200.0,
            qty in 1u32..10,
        ) {
            let calc = PackageCalculator::default();
            let item = ItemMeasurements { weight_kg: w, length_cm: l, breadth_cm: b, height_cm: h, estimated: false };
            let package = calc.aggregate(&[(item, qty)]);
            prop_assert!(package.chargeable_weight_kg + 1e-9 >= w * f64::from(qty));
            prop_assert!(package.chargeable_weight_kg >= 0.5);
        }
    }
}
