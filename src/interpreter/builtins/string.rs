use super::*;

fn string_call(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    match args.first() {
        Some(value) => Ok(JsValue::String(interp.to_string(value)?)),
        None => Ok(JsValue::String(JsString::empty())),
    }
}

fn string_construct(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let value = string_call(interp, this, args)?;
    Ok(JsValue::Object(interp.wrap_primitive(value)))
}

/// `this` converted to a string for the generic prototype methods.
fn this_string(interp: &mut Interpreter, this: &JsValue) -> JsResult<JsString> {
    let value = match this {
        JsValue::Undefined | JsValue::Null => JsValue::Object(interp.realm.global),
        other => other.clone(),
    };
    interp.to_string(&value)
}

fn string_value(interp: &mut Interpreter, this: &JsValue) -> JsResult<JsValue> {
    match interp.this_primitive(this) {
        Some(value @ JsValue::String(_)) => Ok(value),
        _ => Err(interp.throw_error(ErrorKind::TypeError, "String.prototype.valueOf called on incompatible object")),
    }
}

/// Position argument clamped to `0..=len`.
fn clamped_position(interp: &mut Interpreter, value: &JsValue, len: usize) -> JsResult<usize> {
    let n = interp.to_integer(value)?;
    Ok(n.max(0.0).min(len as f64) as usize)
}

fn map_case(s: &JsString, upper: bool) -> JsString {
    let mut units = Vec::with_capacity(s.len());
    let mut buf = [0u16; 2];
    for decoded in char::decode_utf16(s.as_units().iter().copied()) {
        match decoded {
            Ok(c) if upper => c.to_uppercase().for_each(|m| units.extend_from_slice(m.encode_utf16(&mut buf))),
            Ok(c) => c.to_lowercase().for_each(|m| units.extend_from_slice(m.encode_utf16(&mut buf))),
            Err(e) => units.push(e.unpaired_surrogate()),
        }
    }
    JsString::from_units(units)
}

impl Interpreter {
    pub(super) fn setup_string(&mut self) {
        let class = self.classes.string.clone();
        let object_prototype = self.realm.object_prototype;
        let proto = self.new_object_with(class, Some(object_prototype), ObjectKind::String(JsString::empty()));
        self.define_property(
            proto,
            atoms::LENGTH,
            JsValue::Number(0.0),
            Attributes::READ_ONLY | Attributes::DONT_ENUM | Attributes::DONT_DELETE,
        );
        self.realm.string_prototype = proto;
        let ctor = self.create_constructor("String", 1, string_call, string_construct, proto);

        self.define_method(ctor, "fromCharCode", 1, |interp, _this, args| {
            let mut units = Vec::with_capacity(args.len());
            for value in args {
                units.push(interp.to_uint16(value)?);
            }
            Ok(JsValue::String(JsString::from_units(units)))
        });

        self.define_method(proto, "toString", 0, |interp, this, _args| string_value(interp, &this));
        self.define_method(proto, "valueOf", 0, |interp, this, _args| string_value(interp, &this));

        self.define_method(proto, "charAt", 1, |interp, this, args| {
            let s = this_string(interp, &this)?;
            let pos = interp.to_integer(&arg(args, 0))?;
            if pos < 0.0 || pos >= s.len() as f64 {
                return Ok(JsValue::String(JsString::empty()));
            }
            let pos = pos as usize;
            Ok(JsValue::String(s.slice_utf16(pos, pos + 1)))
        });
        self.define_method(proto, "charCodeAt", 1, |interp, this, args| {
            let s = this_string(interp, &this)?;
            let pos = interp.to_integer(&arg(args, 0))?;
            if pos < 0.0 || pos >= s.len() as f64 {
                return Ok(JsValue::Number(f64::NAN));
            }
            Ok(JsValue::Number(f64::from(s.as_units()[pos as usize])))
        });
        self.define_method(proto, "indexOf", 1, |interp, this, args| {
            let s = this_string(interp, &this)?;
            let search = interp.to_string(&arg(args, 0))?;
            let from = clamped_position(interp, &arg(args, 1), s.len())?;
            Ok(JsValue::Number(s.index_of(&search, from).map_or(-1.0, |i| i as f64)))
        });
        self.define_method(proto, "lastIndexOf", 1, |interp, this, args| {
            let s = this_string(interp, &this)?;
            let search = interp.to_string(&arg(args, 0))?;
            let from = interp.to_number(&arg(args, 1))?;
            let from = if from.is_nan() {
                s.len()
            } else {
                from.max(0.0).min(s.len() as f64) as usize
            };
            Ok(JsValue::Number(s.last_index_of(&search, from).map_or(-1.0, |i| i as f64)))
        });
        self.define_method(proto, "substring", 2, |interp, this, args| {
            let s = this_string(interp, &this)?;
            let start = clamped_position(interp, &arg(args, 0), s.len())?;
            let end = match arg(args, 1) {
                JsValue::Undefined => s.len(),
                end => clamped_position(interp, &end, s.len())?,
            };
            Ok(JsValue::String(s.slice_utf16(start.min(end), start.max(end))))
        });
        self.define_method(proto, "slice", 2, |interp, this, args| {
            let s = this_string(interp, &this)?;
            let len = s.len() as f64;
            let relative = |n: f64| (if n < 0.0 { (len + n).max(0.0) } else { n.min(len) }) as usize;
            let start = relative(interp.to_integer(&arg(args, 0))?);
            let end = match arg(args, 1) {
                JsValue::Undefined => s.len(),
                end => relative(interp.to_integer(&end)?),
            };
            Ok(JsValue::String(s.slice_utf16(start, end)))
        });
        self.define_method(proto, "toLowerCase", 0, |interp, this, _args| {
            let s = this_string(interp, &this)?;
            Ok(JsValue::String(map_case(&s, false)))
        });
        self.define_method(proto, "toUpperCase", 0, |interp, this, _args| {
            let s = this_string(interp, &this)?;
            Ok(JsValue::String(map_case(&s, true)))
        });

        // Separator strings only; RegExp separators are not supported.
        self.define_method(proto, "split", 2, |interp, this, args| {
            let s = this_string(interp, &this)?;
            let limit = match arg(args, 1) {
                JsValue::Undefined => u32::MAX,
                limit => interp.to_uint32(&limit)?,
            } as usize;
            let mut parts = Vec::new();
            match arg(args, 0) {
                JsValue::Undefined => parts.push(JsValue::String(s)),
                separator => {
                    let separator = interp.to_string(&separator)?;
                    if separator.is_empty() {
                        parts.extend((0..s.len()).map(|i| JsValue::String(s.slice_utf16(i, i + 1))));
                    } else {
                        let mut start = 0;
                        while let Some(found) = s.index_of(&separator, start) {
                            parts.push(JsValue::String(s.slice_utf16(start, found)));
                            start = found + separator.len();
                        }
                        parts.push(JsValue::String(s.slice_utf16(start, s.len())));
                    }
                }
            }
            parts.truncate(limit);
            Ok(JsValue::Object(interp.array_from(parts)))
        });
        self.define_method(proto, "concat", 1, |interp, this, args| {
            let mut s = this_string(interp, &this)?;
            for value in args {
                let next = interp.to_string(value)?;
                s = s.concat(&next);
            }
            Ok(JsValue::String(s))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(src: &str) -> String {
        let mut interp = Interpreter::new(Config::default());
        let v = interp.evaluate("string", src).unwrap().unwrap_or(JsValue::Undefined);
        interp.value_to_string(&v)
    }

    #[test]
    fn wrapper_objects() {
        assert_eq!(run("var s = new String('abc'); typeof s + ':' + s.length + ':' + (s == 'abc')"), "object:3:true");
        assert_eq!(run("String(12) + String()"), "12");
        assert_eq!(run("'abc'.length = 1; 'abc'.length"), "3");
        assert_eq!(run("var r; try { String.prototype.toString.call(1); } catch (e) { r = e.name; } r"), "TypeError");
    }

    #[test]
    fn character_access() {
        assert_eq!(run("'abc'.charAt(5) + '|' + 'abc'.charCodeAt(0) + '|' + 'abc'.charCodeAt(-1)"), "|97|NaN");
        assert_eq!(run("String.fromCharCode(104, 105, 65536 + 33)"), "hi!");
    }

    #[test]
    fn searching() {
        assert_eq!(run("'abcabc'.indexOf('c') + ',' + 'abcabc'.indexOf('c', 3) + ',' + 'abc'.indexOf('z')"), "2,5,-1");
        assert_eq!(run("'abcabc'.lastIndexOf('a') + ',' + 'abcabc'.lastIndexOf('a', 2)"), "3,0");
    }

    #[test]
    fn substrings() {
        assert_eq!(run("'hello'.substring(3, 1) + '|' + 'hello'.substring(-2, 2) + '|' + 'hello'.substring(2)"), "el|he|llo");
        assert_eq!(run("'hello'.slice(-3) + '|' + 'hello'.slice(1, -1)"), "llo|ell");
    }

    #[test]
    fn case_mapping() {
        assert_eq!(run("'MiXeD'.toLowerCase() + 'MiXeD'.toUpperCase()"), "mixedMIXED");
    }

    #[test]
    fn split_on_strings() {
        assert_eq!(run("'a,b,,c'.split(',').length"), "4");
        assert_eq!(run("'abc'.split('').join('-')"), "a-b-c");
        assert_eq!(run("'a b c'.split(' ', 2).join('|')"), "a|b");
        assert_eq!(run("'abc'.split().length"), "1");
    }

    #[test]
    fn concat_converts_arguments() {
        assert_eq!(run("'a'.concat(1, null, [2, 3])"), "a1null2,3");
    }
}
