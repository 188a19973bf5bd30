use serde_json::Value;

use super::{format_scalar, result_of};

/// Key answers in priority order. Dotted paths reach into nested objects.
const PRIORITY_KEYS: [&str; 6] = [
    "affordability.home_price",
    "monthly_payment",
    "risk_score",
    "summary.monthly_payment",
    "home_price_change",
    "total_interest",
];

/// Print just the key answer value from the output.
///
/// Heuristic: look for well-known result fields in order of priority,
/// then fall back to the first field in the result object.
pub fn print_minimal(value: &Value) {
    println!("{}", minimal_answer(value));
}

fn minimal_answer(value: &Value) -> String {
    let result = result_of(value);

    for key in PRIORITY_KEYS {
        if let Some(val) = lookup(result, key) {
            if !val.is_null() {
                return format_scalar(val);
            }
        }
    }

    if let Value::Object(map) = result {
        if let Some((key, val)) = map.iter().next() {
            return format!("{}: {}", key, format_scalar(val));
        }
    }
    format_scalar(result)
}

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |node, key| node.get(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scenario_prefers_home_price() {
        let value = json!({
            "result": {
                "affordability": { "home_price": "292504.11" },
                "total_interest": "408142.36"
            }
        });
        assert_eq!(minimal_answer(&value), "292504.11");
    }

    #[test]
    fn test_payment_answer() {
        let value = json!({ "result": { "monthly_payment": "2022.62", "periods": 360 } });
        assert_eq!(minimal_answer(&value), "2022.62");
    }

    #[test]
    fn test_fallback_to_first_field() {
        let value = json!({ "result": { "alpha": 1, "beta": 2 } });
        assert_eq!(minimal_answer(&value), "alpha: 1");
    }
}
