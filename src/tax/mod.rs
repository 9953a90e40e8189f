pub mod calculator;

use serde_json::{json, Value};

use crate::error::ChatError;

/// Route a model-requested tool call to the matching calculator.
///
/// Optional arguments take their documented defaults; a missing or
/// non-numeric principal argument aborts with `InvalidArgument`.
pub fn dispatch(name: &str, args: &Value) -> Result<Value, ChatError> {
    let result = match name {
        "calculate_pit" => {
            let income = number_arg(args, "income")?;
            let is_student = bool_arg(args, "is_student", false);
            serde_json::to_value(calculator::calculate_pit(income, is_student))
        }
        "calculate_cit" => {
            let profit = number_arg(args, "profit")?;
            let category = str_arg(args, "category", "standard");
            serde_json::to_value(calculator::calculate_cit(profit, &category))
        }
        "calculate_vat" => {
            let amount = number_arg(args, "amount")?;
            let includes_vat = bool_arg(args, "includes_vat", true);
            serde_json::to_value(calculator::calculate_vat(amount, includes_vat))
        }
        other => {
            return Err(ChatError::InvalidArgument(format!(
                "unknown tool '{other}'"
            )))
        }
    };

    result.map_err(|e| ChatError::InvalidArgument(e.to_string()))
}

/// Core 2025 rates, served on `/api/rates`.
pub fn core_rates() -> Value {
    json!({
        "year": 2025,
        "pit": "12%",
        "cit": "15%",
        "vat": "12%",
    })
}

fn number_arg(args: &Value, key: &str) -> Result<f64, ChatError> {
    args.get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| ChatError::InvalidArgument(format!("missing numeric argument '{key}'")))
}

fn bool_arg(args: &Value, key: &str, default: bool) -> bool {
    args.get(key).and_then(Value::as_bool).unwrap_or(default)
}

fn str_arg(args: &Value, key: &str, default: &str) -> String {
    args.get(key)
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}
