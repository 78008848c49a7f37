//! Built-in container methods, iterators and the global namespace

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use futures::future::FutureExt;
use rustc_hash::FxHashMap;
use tracing::info;

use crate::bridge;
use crate::value::{Callable, MapKey, NativeFn, Runtime, Value};

/// Bind a built-in method of a list, map or string receiver.
///
/// The returned callable closes over the receiver, so `let f = xs.push`
/// keeps pushing onto `xs`. `None` when the receiver has no such method.
pub fn method(rt: &Runtime, receiver: &Value, name: &str) -> Option<Value> {
    let ty = receiver.ty()?.property(name)?.ty.clone();
    let native = match receiver {
        Value::List(list) => {
            let list = Rc::clone(list);
            match name {
                "length" => NativeFn::new(name, Some(0), move |rt, _| Ok(rt.number(list.items.borrow().len() as f64))),
                "get" => NativeFn::new(name, Some(1), move |_, args| {
                    let items = list.items.borrow();
                    Ok(index(&args[0], items.len()).map_or(Value::Undefined, |i| items[i].clone()))
                }),
                "set" => NativeFn::new(name, Some(2), move |_, args| {
                    let mut items = list.items.borrow_mut();
                    let len = items.len();
                    let i = index(&args[0], len)
                        .ok_or_else(|| format!("list index {} out of range for length {}", args[0], len))?;
                    items[i] = args[1].clone();
                    Ok(args[1].clone())
                }),
                "push" => NativeFn::new(name, Some(1), move |rt, args| {
                    let mut items = list.items.borrow_mut();
                    items.push(args[0].clone());
                    Ok(rt.number(items.len() as f64))
                }),
                "pop" => NativeFn::new(name, Some(0), move |_, _| {
                    Ok(list.items.borrow_mut().pop().unwrap_or(Value::Undefined))
                }),
                "iter" => NativeFn::new(name, Some(0), move |rt, _| {
                    let list = Rc::clone(&list);
                    Ok(sequence(rt, move |_, pos| list.items.borrow().get(pos).cloned()))
                }),
                _ => return None,
            }
        }

        Value::Map(map) => {
            let map = Rc::clone(map);
            match name {
                "get" => NativeFn::new(name, Some(1), move |_, args| {
                    let entries = map.entries.borrow();
                    Ok(entries.get(&MapKey(args[0].clone())).cloned().unwrap_or(Value::Undefined))
                }),
                "set" => NativeFn::new(name, Some(2), move |_, args| {
                    map.entries.borrow_mut().insert(MapKey(args[0].clone()), args[1].clone());
                    Ok(args[1].clone())
                }),
                "has" => NativeFn::new(name, Some(1), move |rt, args| {
                    Ok(rt.boolean(map.entries.borrow().contains_key(&MapKey(args[0].clone()))))
                }),
                "delete" => NativeFn::new(name, Some(1), move |rt, args| {
                    let removed = map.entries.borrow_mut().shift_remove(&MapKey(args[0].clone()));
                    Ok(rt.boolean(removed.is_some()))
                }),
                "size" => NativeFn::new(name, Some(0), move |rt, _| Ok(rt.number(map.entries.borrow().len() as f64))),
                "iter" => NativeFn::new(name, Some(0), move |rt, _| {
                    let map = Rc::clone(&map);
                    Ok(sequence(rt, move |rt, pos| {
                        let entries = map.entries.borrow();
                        entries.get_index(pos).map(|(k, v)| rt.list(vec![k.0.clone(), v.clone()]))
                    }))
                }),
                "keys" => NativeFn::new(name, Some(0), move |rt, _| {
                    let map = Rc::clone(&map);
                    Ok(sequence(rt, move |_, pos| map.entries.borrow().get_index(pos).map(|(k, _)| k.0.clone())))
                }),
                "values" => NativeFn::new(name, Some(0), move |rt, _| {
                    let map = Rc::clone(&map);
                    Ok(sequence(rt, move |_, pos| map.entries.borrow().get_index(pos).map(|(_, v)| v.clone())))
                }),
                _ => return None,
            }
        }

        _ => {
            let chars: Rc<[char]> = receiver.as_str()?.chars().collect();
            match name {
                "length" => NativeFn::new(name, Some(0), move |rt, _| Ok(rt.number(chars.len() as f64))),
                "get" => NativeFn::new(name, Some(1), move |rt, args| {
                    Ok(index(&args[0], chars.len()).map_or(Value::Undefined, |i| rt.string(&chars[i].to_string())))
                }),
                "iter" => NativeFn::new(name, Some(0), move |rt, _| {
                    let chars = Rc::clone(&chars);
                    Ok(sequence(rt, move |rt, pos| chars.get(pos).map(|c| rt.string(&c.to_string()))))
                }),
                _ => return None,
            }
        }
    };

    Some(rt.callable(Callable::Native(native), ty))
}

/// A fresh zero-argument iterator over `next(pos)`.
/// Returns null once `next` runs out, and keeps returning null after that.
fn sequence(rt: &Runtime, next: impl Fn(&Runtime, usize) -> Option<Value> + 'static) -> Value {
    let pos = Cell::new(0);
    let done = Cell::new(false);
    rt.native("next", Some(0), move |rt, _| {
        if done.get() {
            return Ok(rt.null());
        }
        match next(rt, pos.get()) {
            Some(value) => {
                pos.set(pos.get() + 1);
                Ok(value)
            }
            None => {
                done.set(true);
                Ok(rt.null())
            }
        }
    })
}

/// Integral, in-range index from a number value.
fn index(value: &Value, len: usize) -> Option<usize> {
    let n = value.as_number()?;
    if n.fract() != 0.0 || n < 0.0 || n >= len as f64 {
        return None;
    }
    Some(n as usize)
}

fn numbers(name: &str, args: &[Value]) -> Result<(f64, f64), String> {
    match args {
        [a, b] => match (a.as_number(), b.as_number()) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(format!("{}() requires numbers, got {} and {}", name, a.type_name(), b.type_name())),
        },
        _ => Err(format!("{}() takes 2 arguments", name)),
    }
}

fn integers(name: &str, args: &[Value]) -> Result<(i64, i64), String> {
    let (a, b) = numbers(name, args)?;
    Ok((integer(name, a)?, integer(name, b)?))
}

fn integer(name: &str, n: f64) -> Result<i64, String> {
    if n.fract() == 0.0 && n.is_finite() {
        Ok(n as i64)
    } else {
        Err(format!("{}() requires integers, got {}", name, n))
    }
}

fn compare(name: &str, args: &[Value], test: fn(std::cmp::Ordering) -> bool) -> Result<bool, String> {
    match args {
        [a, b] => {
            let ordering = match (a.as_number(), b.as_number(), a.as_str(), b.as_str()) {
                (Some(x), Some(y), _, _) => x.partial_cmp(&y),
                (_, _, Some(x), Some(y)) => Some(x.cmp(y)),
                _ => return Err(format!("{}() cannot compare {} with {}", name, a.type_name(), b.type_name())),
            };
            Ok(ordering.map_or(false, test))
        }
        _ => Err(format!("{}() takes 2 arguments", name)),
    }
}

/// Populate the global namespace with intrinsics and the host library.
pub fn install(rt: &Runtime, globals: &mut FxHashMap<String, Value>) {
    let natives = vec![
        // add(a, b): numbers add, strings concatenate
        NativeFn::new("add", Some(2), |rt, args| match (args[0].as_str(), args[1].as_str()) {
            (Some(a), Some(b)) => Ok(rt.string(&format!("{}{}", a, b))),
            _ => numbers("add", args).map(|(a, b)| rt.number(a + b)),
        }),
        NativeFn::new("sub", Some(2), |rt, args| numbers("sub", args).map(|(a, b)| rt.number(a - b))),
        NativeFn::new("mul", Some(2), |rt, args| numbers("mul", args).map(|(a, b)| rt.number(a * b))),
        NativeFn::new("div", Some(2), |rt, args| {
            let (a, b) = numbers("div", args)?;
            if b == 0.0 {
                return Err("Division by zero".to_string());
            }
            Ok(rt.number(a / b))
        }),
        NativeFn::new("mod", Some(2), |rt, args| {
            let (a, b) = numbers("mod", args)?;
            if b == 0.0 {
                return Err("Modulo by zero".to_string());
            }
            Ok(rt.number(a % b))
        }),
        NativeFn::new("neg", Some(1), |rt, args| {
            args[0]
                .as_number()
                .map(|n| rt.number(-n))
                .ok_or_else(|| format!("neg() requires a number, got {}", args[0].type_name()))
        }),

        // eq(a, b): identity, which is value equality for scalars
        NativeFn::new("eq", Some(2), |rt, args| Ok(rt.boolean(args[0].same(&args[1])))),
        NativeFn::new("ne", Some(2), |rt, args| Ok(rt.boolean(!args[0].same(&args[1])))),
        NativeFn::new("lt", Some(2), |rt, args| compare("lt", args, |o| o.is_lt()).map(|b| rt.boolean(b))),
        NativeFn::new("le", Some(2), |rt, args| compare("le", args, |o| o.is_le()).map(|b| rt.boolean(b))),
        NativeFn::new("gt", Some(2), |rt, args| compare("gt", args, |o| o.is_gt()).map(|b| rt.boolean(b))),
        NativeFn::new("ge", Some(2), |rt, args| compare("ge", args, |o| o.is_ge()).map(|b| rt.boolean(b))),
        NativeFn::new("not", Some(1), |rt, args| Ok(rt.boolean(!args[0].is_truthy()))),

        NativeFn::new("band", Some(2), |rt, args| integers("band", args).map(|(a, b)| rt.number((a & b) as f64))),
        NativeFn::new("bor", Some(2), |rt, args| integers("bor", args).map(|(a, b)| rt.number((a | b) as f64))),
        NativeFn::new("bxor", Some(2), |rt, args| integers("bxor", args).map(|(a, b)| rt.number((a ^ b) as f64))),
        NativeFn::new("bnot", Some(1), |rt, args| {
            let n = args[0]
                .as_number()
                .ok_or_else(|| format!("bnot() requires a number, got {}", args[0].type_name()))?;
            Ok(rt.number(!integer("bnot", n)? as f64))
        }),
        NativeFn::new("shl", Some(2), |rt, args| {
            let (a, b) = integers("shl", args)?;
            let shift = u32::try_from(b).map_err(|_| format!("shl() shift out of range: {}", b))?;
            a.checked_shl(shift)
                .map(|n| rt.number(n as f64))
                .ok_or_else(|| format!("shl() shift out of range: {}", b))
        }),
        NativeFn::new("shr", Some(2), |rt, args| {
            let (a, b) = integers("shr", args)?;
            let shift = u32::try_from(b).map_err(|_| format!("shr() shift out of range: {}", b))?;
            a.checked_shr(shift)
                .map(|n| rt.number(n as f64))
                .ok_or_else(|| format!("shr() shift out of range: {}", b))
        }),

        // concat(...): display forms joined
        NativeFn::new("concat", None, |rt, args| {
            let joined: String = args.iter().map(|v| v.to_string()).collect();
            Ok(rt.string(&joined))
        }),
        NativeFn::new("str", Some(1), |rt, args| Ok(rt.string(&args[0].to_string()))),
        NativeFn::new("type", Some(1), |rt, args| Ok(rt.string(args[0].type_name()))),

        // log(...): space-separated, through tracing
        NativeFn::new("log", None, |rt, args| {
            let line: Vec<String> = args.iter().map(|v| v.to_string()).collect();
            info!(target: "ember::log", "{}", line.join(" "));
            Ok(rt.null())
        }),
    ];

    for native in natives {
        globals.insert(native.name.clone(), rt.native_fn(native));
    }

    // sleep(ms)
    globals.insert(
        "sleep".to_string(),
        rt.native_async("sleep", Some(1), |rt, args| {
            async move {
                let ms = args[0]
                    .as_number()
                    .filter(|ms| *ms >= 0.0 && ms.is_finite())
                    .ok_or_else(|| format!("sleep() requires a non-negative number, got {}", args[0]))?;
                tokio::time::sleep(Duration::from_secs_f64(ms / 1000.0)).await;
                Ok::<_, String>(rt.null())
            }
            .boxed_local()
        }),
    );

    // yield_now()
    globals.insert(
        "yield_now".to_string(),
        rt.native_async("yield_now", Some(0), |rt, _| {
            async move {
                tokio::task::yield_now().await;
                Ok::<_, String>(rt.null())
            }
            .boxed_local()
        }),
    );

    let json = rt.object([
        (
            "parse",
            rt.native("parse", Some(1), |rt, args| {
                let text = args[0]
                    .as_str()
                    .ok_or_else(|| format!("json.parse() requires a string, got {}", args[0].type_name()))?;
                let parsed: serde_json::Value = serde_json::from_str(text).map_err(|e| format!("json.parse(): {}", e))?;
                Ok(bridge::import_value(rt, &parsed))
            }),
        ),
        (
            "stringify",
            rt.native("stringify", Some(1), |rt, args| {
                let exported = bridge::export_value(&args[0]).map_err(|e| format!("json.stringify(): {}", e))?;
                Ok(rt.string(&exported.to_string()))
            }),
        ),
    ]);
    globals.insert("json".to_string(), json);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(rt: &Runtime, callee: &Value, args: &[Value]) -> Result<Value, String> {
        match callee.as_callable().map(|c| &c.callable) {
            Some(Callable::Native(native)) => (native.func)(rt, args),
            _ => Err("not a native".to_string()),
        }
    }

    fn globals(rt: &Runtime) -> FxHashMap<String, Value> {
        let mut globals = FxHashMap::default();
        install(rt, &mut globals);
        globals
    }

    #[test]
    fn list_methods_share_the_receiver() {
        let rt = Runtime::new();
        let list = rt.list(vec![rt.number(1.0)]);
        let push = method(&rt, &list, "push").expect("push");
        assert!(call(&rt, &push, &[rt.number(2.0)]).map(|n| n.same(&rt.number(2.0))).unwrap_or(false));
        assert_eq!(list.to_string(), "[1, 2]");

        let pop = method(&rt, &list, "pop").expect("pop");
        let _ = call(&rt, &pop, &[]);
        let _ = call(&rt, &pop, &[]);
        assert!(call(&rt, &pop, &[]).map(|v| v.is_undefined()).unwrap_or(false));
        assert!(method(&rt, &list, "nope").is_none());
    }

    #[test]
    fn get_out_of_range_is_undefined() {
        let rt = Runtime::new();
        let list = rt.list(vec![rt.number(1.0)]);
        let get = method(&rt, &list, "get").expect("get");
        assert!(call(&rt, &get, &[rt.number(3.0)]).map(|v| v.is_undefined()).unwrap_or(false));
        assert!(call(&rt, &get, &[rt.number(0.5)]).map(|v| v.is_undefined()).unwrap_or(false));

        let set = method(&rt, &list, "set").expect("set");
        assert!(call(&rt, &set, &[rt.number(4.0), rt.null()]).is_err());
    }

    #[test]
    fn string_iteration_yields_characters() {
        let rt = Runtime::new();
        let s = rt.string("hé");
        let iter = method(&rt, &s, "iter").expect("iter");
        let next = call(&rt, &iter, &[]).expect("iterator");
        let drained: Vec<String> = (0..4)
            .map(|_| call(&rt, &next, &[]).map(|v| v.to_string()).unwrap_or_default())
            .collect();
        assert_eq!(drained, vec!["h", "é", "null", "null"]);
    }

    #[test]
    fn map_delete_keeps_insertion_order() {
        let rt = Runtime::new();
        let map = rt.map(vec![
            (rt.string("a"), rt.number(1.0)),
            (rt.string("b"), rt.number(2.0)),
            (rt.string("c"), rt.number(3.0)),
        ]);
        let delete = method(&rt, &map, "delete").expect("delete");
        assert!(call(&rt, &delete, &[rt.string("a")]).map(|v| v.is_truthy()).unwrap_or(false));
        assert!(call(&rt, &delete, &[rt.string("a")]).map(|v| !v.is_truthy()).unwrap_or(false));

        let keys = method(&rt, &map, "keys").expect("keys");
        let next = call(&rt, &keys, &[]).expect("iterator");
        let first = call(&rt, &next, &[]).map(|v| v.to_string());
        assert_eq!(first, Ok("b".to_string()));
    }

    #[test]
    fn arithmetic_intrinsics() {
        let rt = Runtime::new();
        let g = globals(&rt);
        let add = &g["add"];
        assert_eq!(call(&rt, add, &[rt.number(2.0), rt.number(3.0)]).map(|v| v.to_string()), Ok("5".into()));
        assert_eq!(call(&rt, add, &[rt.string("a"), rt.string("b")]).map(|v| v.to_string()), Ok("ab".into()));
        assert!(call(&rt, add, &[rt.string("a"), rt.number(1.0)]).is_err());
        assert!(call(&rt, &g["div"], &[rt.number(1.0), rt.number(0.0)]).is_err());
        assert_eq!(call(&rt, &g["shl"], &[rt.number(1.0), rt.number(4.0)]).map(|v| v.to_string()), Ok("16".into()));
        assert_eq!(call(&rt, &g["bnot"], &[rt.number(0.0)]).map(|v| v.to_string()), Ok("-1".into()));
    }

    #[test]
    fn comparisons_and_identity() {
        let rt = Runtime::new();
        let g = globals(&rt);
        let yes = |v: Result<Value, String>| v.map(|v| v.is_truthy()).unwrap_or(false);
        assert!(yes(call(&rt, &g["eq"], &[rt.string("x"), rt.string("x")])));
        assert!(yes(call(&rt, &g["ne"], &[rt.list(Vec::new()), rt.list(Vec::new())])));
        assert!(yes(call(&rt, &g["lt"], &[rt.number(1.0), rt.number(2.0)])));
        assert!(yes(call(&rt, &g["ge"], &[rt.string("b"), rt.string("a")])));
        assert!(call(&rt, &g["lt"], &[rt.number(1.0), rt.string("a")]).is_err());
    }

    #[test]
    fn json_round_trips_through_the_bridge() {
        let rt = Runtime::new();
        let g = globals(&rt);
        let json = match &g["json"] {
            Value::Object(o) => Rc::clone(o),
            _ => panic!("json is an object"),
        };
        let parse = json.get("parse").expect("parse");
        let stringify = json.get("stringify").expect("stringify");
        let parsed = call(&rt, &parse, &[rt.string(r#"{"a":[1,true]}"#)]).expect("parse");
        assert_eq!(parsed.to_string(), "{a: [1, true]}");
        let text = call(&rt, &stringify, &[parsed]).map(|v| v.to_string());
        assert_eq!(text, Ok(r#"{"a":[1,true]}"#.to_string()));
    }
}
