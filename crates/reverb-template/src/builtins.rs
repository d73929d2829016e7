//! 内建函数与方法

use std::rc::Rc;

use crate::{
    error::*,
    interpreter::Interpreter,
    value::{Native, Value, join, number_to_fixed},
};

pub fn call_native(interp: &mut Interpreter, native: Native, args: Vec<Value>) -> Result<Value> {
    match native {
        Native::Print => {
            interp.write(&join(&args, ""));
            Ok(Value::Undefined)
        }
        Native::String => Ok(Value::string(
            args.first().map_or_else(String::new, Value::to_string),
        )),
        Native::Number => Ok(Value::Number(args.first().map_or(0., Value::to_number))),
        Native::JqueryEach => {
            let (collection, callback) = (arg(&args, 0), arg(&args, 1));
            for (key, value) in entries(&collection) {
                let result = interp.call(&callback, value.clone(), vec![key, value])?;
                if let Value::Bool(false) = result {
                    break;
                }
            }
            Ok(collection)
        }
        Native::UnderscoreEach => {
            let (collection, callback) = (arg(&args, 0), arg(&args, 1));
            for (key, value) in entries(&collection) {
                interp.call(&callback, Value::Undefined, vec![value, key, collection.clone()])?;
            }
            Ok(collection)
        }
    }
}

/// 调用内建方法, 不存在时返回 None
pub fn call_method(
    interp: &mut Interpreter,
    this: &Value,
    name: &str,
    args: Vec<Value>,
) -> Result<Option<Value>> {
    Ok(Some(match (this, name) {
        (Value::Array(items), "join") => {
            let sep = match arg(&args, 0) {
                Value::Undefined => ",".to_string(),
                sep => sep.to_string(),
            };
            Value::string(join(items, &sep))
        }
        (Value::Array(items), "forEach") => {
            let callback = arg(&args, 0);
            for (i, item) in items.iter().enumerate() {
                interp.call(&callback, Value::Undefined, vec![
                    item.clone(),
                    Value::from(i as f64),
                    this.clone(),
                ])?;
            }
            Value::Undefined
        }
        (Value::Array(items), "map") => {
            let callback = arg(&args, 0);
            let mut mapped = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                mapped.push(interp.call(&callback, Value::Undefined, vec![
                    item.clone(),
                    Value::from(i as f64),
                    this.clone(),
                ])?);
            }
            Value::Array(Rc::new(mapped))
        }
        (Value::Array(items), "filter") => {
            let callback = arg(&args, 0);
            let mut kept = Vec::new();
            for (i, item) in items.iter().enumerate() {
                let keep = interp.call(&callback, Value::Undefined, vec![
                    item.clone(),
                    Value::from(i as f64),
                    this.clone(),
                ])?;
                if keep.is_truthy() {
                    kept.push(item.clone());
                }
            }
            Value::Array(Rc::new(kept))
        }
        (Value::Array(items), "indexOf") => {
            let needle = arg(&args, 0);
            let index = items.iter().position(|item| item.strict_equals(&needle));
            Value::from(index.map_or(-1., |i| i as f64))
        }
        (Value::Array(items), "slice") => {
            let (start, end) = bounds(&args, items.len());
            Value::Array(Rc::new(items[start..end.max(start)].to_vec()))
        }
        (Value::String(s), "toUpperCase") => Value::string(s.to_uppercase()),
        (Value::String(s), "toLowerCase") => Value::string(s.to_lowercase()),
        (Value::String(s), "trim") => Value::string(s.trim()),
        (Value::String(s), "indexOf") => {
            let needle = arg(&args, 0).to_string();
            let index = s.find(&needle).map(|byte| s[..byte].chars().count());
            Value::from(index.map_or(-1., |i| i as f64))
        }
        (Value::String(s), "slice") => {
            let chars = s.chars().collect::<Vec<_>>();
            let (start, end) = bounds(&args, chars.len());
            Value::string(chars[start..end.max(start)].iter().collect::<String>())
        }
        (Value::String(s), "split") => {
            let parts = match arg(&args, 0) {
                Value::Undefined => vec![Value::String(s.clone())],
                sep => match sep.to_string().as_str() {
                    "" => s.chars().map(|c| Value::string(c.to_string())).collect(),
                    sep => s.split(sep).map(Value::from).collect(),
                },
            };
            Value::Array(Rc::new(parts))
        }
        // 仅替换第一处
        (Value::String(s), "replace") => {
            let (pattern, replacement) = (arg(&args, 0).to_string(), arg(&args, 1).to_string());
            Value::string(s.replacen(&pattern, &replacement, 1))
        }
        (Value::Number(n), "toFixed") => {
            let digits = arg(&args, 0).to_number();
            let digits = if digits.is_nan() { 0. } else { digits.trunc() };
            if !(0. ..=100.).contains(&digits) {
                return Err(Error::Range(
                    "toFixed() digits argument must be between 0 and 100".to_string(),
                ));
            }
            Value::string(number_to_fixed(*n, digits as usize))
        }
        (_, "toString") => Value::string(this.to_string()),
        _ => return Ok(None),
    }))
}

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

/// `$.each` / `_.each` 遍历的 (键, 值)
fn entries(collection: &Value) -> Vec<(Value, Value)> {
    match collection {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| (Value::from(i as f64), item.clone()))
            .collect(),
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| (Value::from(key.as_str()), value.clone()))
            .collect(),
        _ => Vec::new(),
    }
}

/// slice 的起止下标, 负数从末尾计
fn bounds(args: &[Value], len: usize) -> (usize, usize) {
    let index = |value: Value, default: usize| match value {
        Value::Undefined => default,
        value => {
            let n = value.to_number();
            if n.is_nan() {
                0
            } else if n < 0. {
                (len as f64 + n.trunc()).max(0.) as usize
            } else {
                n.trunc().min(len as f64) as usize
            }
        }
    };
    (index(arg(args, 0), 0), index(arg(args, 1), len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        let args = |a: f64, b: f64| vec![Value::from(a), Value::from(b)];

        assert_eq!(bounds(&[], 5), (0, 5));
        assert_eq!(bounds(&args(1., 3.), 5), (1, 3));
        assert_eq!(bounds(&args(-2., 10.), 5), (3, 5));
        assert_eq!(bounds(&args(-10., -1.), 5), (0, 4));
    }

    #[test]
    fn test_entries() {
        let value = Value::from(&serde_json::json!({"a": 1, "b": 2}));
        let keys = entries(&value)
            .into_iter()
            .map(|(key, _)| key.to_string())
            .collect::<Vec<_>>();

        assert_eq!(keys, ["a", "b"]);
        assert!(entries(&Value::Null).is_empty());
    }
}
