//! Scalar coercion from raw strings to typed values.

use meridian_core::{ConverterRegistry, ParamType, ParameterSpec};
use serde_json::{Number, Value};

use crate::error::BindingError;

/// Coerces the raw values found for a parameter.
///
/// Lists take every value. Scalars take the first. A parameter with no
/// usable value falls back to its default, then to an error if required,
/// then to `null` (or `[]` for lists).
pub(crate) fn coerce_param(
    spec: &ParameterSpec,
    raw: &[String],
    converters: &ConverterRegistry,
) -> Result<Value, BindingError> {
    let invalid = |reason: String| BindingError::invalid(spec.source(), spec.name(), reason);

    if let ParamType::List(inner) = spec.target() {
        let values: Vec<&str> = raw.iter().map(String::as_str).collect();
        let values = match (values.is_empty(), spec.default()) {
            (true, Some(default)) => vec![default],
            _ => values,
        };
        if values.is_empty() && spec.is_required() {
            return Err(BindingError::missing(spec.source(), spec.name()));
        }
        return values
            .into_iter()
            .map(|value| coerce_scalar(inner, value, converters).map_err(&invalid))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array);
    }

    let present = raw
        .first()
        .map(String::as_str)
        .filter(|value| !value.is_empty() || accepts_empty(spec.target()));
    match (present, spec.default()) {
        (Some(value), _) | (None, Some(value)) => {
            coerce_scalar(spec.target(), value, converters).map_err(invalid)
        }
        (None, None) if spec.is_required() => {
            Err(BindingError::missing(spec.source(), spec.name()))
        }
        (None, None) => Ok(Value::Null),
    }
}

/// Empty strings are real values only for string-like targets.
fn accepts_empty(target: &ParamType) -> bool {
    matches!(target, ParamType::String | ParamType::Custom(_))
}

/// Converts one raw value to `target`.
pub(crate) fn coerce_scalar(
    target: &ParamType,
    raw: &str,
    converters: &ConverterRegistry,
) -> Result<Value, String> {
    let expected = || format!("'{raw}' is not a valid {}", target.describe());
    match target {
        ParamType::String => Ok(Value::String(raw.to_string())),
        ParamType::Bool => {
            if raw.eq_ignore_ascii_case("true") {
                Ok(Value::Bool(true))
            } else if raw.eq_ignore_ascii_case("false") {
                Ok(Value::Bool(false))
            } else {
                Err(expected())
            }
        }
        ParamType::Char => {
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Value::String(c.to_string())),
                _ => Err(expected()),
            }
        }
        ParamType::I32 => raw.parse::<i32>().map(Value::from).map_err(|_| expected()),
        ParamType::I64 => raw.parse::<i64>().map(Value::from).map_err(|_| expected()),
        ParamType::U32 => raw.parse::<u32>().map(Value::from).map_err(|_| expected()),
        ParamType::U64 => raw.parse::<u64>().map(Value::from).map_err(|_| expected()),
        ParamType::F64 => raw
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(expected),
        ParamType::Custom(name) => converters
            .get(name)
            .ok_or_else(|| format!("no converter registered for {name}"))?
            .convert(raw),
        ParamType::List(inner) => {
            coerce_scalar(inner, raw, converters).map(|value| Value::Array(vec![value]))
        }
        ParamType::Bean(_) | ParamType::Entity(_) | ParamType::Context(_) => Err(format!(
            "{} cannot be read from a string",
            target.describe()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::ParamSource;
    use serde_json::json;

    fn raw(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    fn converters() -> ConverterRegistry {
        let mut converters = ConverterRegistry::new();
        converters.register_from_str::<std::net::Ipv4Addr>("Ipv4");
        converters
    }

    #[test]
    fn test_scalars() {
        let c = converters();
        assert_eq!(coerce_scalar(&ParamType::I64, "123", &c).unwrap(), json!(123));
        assert_eq!(coerce_scalar(&ParamType::I32, "-7", &c).unwrap(), json!(-7));
        assert_eq!(coerce_scalar(&ParamType::U64, "7", &c).unwrap(), json!(7));
        assert_eq!(coerce_scalar(&ParamType::Bool, "TRUE", &c).unwrap(), json!(true));
        assert_eq!(coerce_scalar(&ParamType::Char, "x", &c).unwrap(), json!("x"));
        assert_eq!(coerce_scalar(&ParamType::F64, "1.5", &c).unwrap(), json!(1.5));
        assert_eq!(
            coerce_scalar(&ParamType::custom("Ipv4"), "10.0.0.1", &c).unwrap(),
            json!("10.0.0.1")
        );
    }

    #[test]
    fn test_malformed_scalars() {
        let c = converters();
        assert!(coerce_scalar(&ParamType::I64, "abc", &c).is_err());
        assert!(coerce_scalar(&ParamType::U32, "-1", &c).is_err());
        assert!(coerce_scalar(&ParamType::I32, "3000000000", &c).is_err());
        assert!(coerce_scalar(&ParamType::Bool, "yes", &c).is_err());
        assert!(coerce_scalar(&ParamType::Char, "xy", &c).is_err());
        assert!(coerce_scalar(&ParamType::F64, "NaN", &c).is_err());
        assert!(coerce_scalar(&ParamType::custom("Ipv4"), "nope", &c).is_err());
        assert!(coerce_scalar(&ParamType::custom("Missing"), "x", &c).is_err());
    }

    #[test]
    fn test_absent_values() {
        let c = converters();
        let optional = ParameterSpec::query("limit", ParamType::U32);
        assert_eq!(coerce_param(&optional, &[], &c).unwrap(), Value::Null);

        let defaulted = ParameterSpec::query("limit", ParamType::U32).default_value("20");
        assert_eq!(coerce_param(&defaulted, &[], &c).unwrap(), json!(20));
        assert_eq!(coerce_param(&defaulted, &raw(&[""]), &c).unwrap(), json!(20));

        let required = ParameterSpec::query("limit", ParamType::U32).required();
        let err = coerce_param(&required, &[], &c).unwrap_err();
        assert_eq!(err.param_source(), ParamSource::Query);
        assert_eq!(err.kind(), crate::BindingErrorKind::Missing);
    }

    #[test]
    fn test_empty_string_is_a_string() {
        let c = converters();
        let name = ParameterSpec::query("name", ParamType::String).default_value("anon");
        assert_eq!(coerce_param(&name, &raw(&[""]), &c).unwrap(), json!(""));
    }

    #[test]
    fn test_first_value_wins_for_scalars() {
        let c = converters();
        let spec = ParameterSpec::query("id", ParamType::I64);
        assert_eq!(coerce_param(&spec, &raw(&["1", "2"]), &c).unwrap(), json!(1));
    }

    #[test]
    fn test_lists() {
        let c = converters();
        let tags = ParameterSpec::query("tag", ParamType::list(ParamType::String));
        assert_eq!(coerce_param(&tags, &[], &c).unwrap(), json!([]));
        assert_eq!(
            coerce_param(&tags, &raw(&["a", "b"]), &c).unwrap(),
            json!(["a", "b"])
        );

        let ids = ParameterSpec::query("id", ParamType::list(ParamType::I64)).default_value("0");
        assert_eq!(coerce_param(&ids, &[], &c).unwrap(), json!([0]));
        assert!(coerce_param(&ids, &raw(&["1", "x"]), &c).is_err());
    }
}
