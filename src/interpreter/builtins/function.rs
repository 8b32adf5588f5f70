use super::*;

// §15.3.2.1: every argument but the last is a formal parameter list
fn function_construct(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let mut params = Vec::new();
    for value in args.iter().take(args.len().saturating_sub(1)) {
        params.push(interp.to_string(value)?.to_rust_string());
    }
    let body = match args.last() {
        Some(value) => interp.to_string(value)?.to_rust_string(),
        None => String::new(),
    };
    let literal = match interp.parse_function("Function", &params.join(","), &body) {
        Ok(literal) => literal,
        Err(e) => return Err(interp.syntax_error(&e)),
    };
    let scope = Scope::empty().push(interp.realm.global);
    Ok(JsValue::Object(interp.instantiate_function(&literal, scope)))
}

fn this_callable(interp: &mut Interpreter, this: &JsValue) -> JsResult<ObjectId> {
    match this {
        JsValue::Object(id) if interp.is_callable(this) => Ok(*id),
        _ => Err(interp.throw_error(ErrorKind::TypeError, "Function.prototype method called on incompatible object")),
    }
}

impl Interpreter {
    pub(super) fn setup_function(&mut self) {
        let proto = self.realm.function_prototype;
        self.create_constructor("Function", 1, function_construct, function_construct, proto);

        self.define_method(proto, "toString", 0, |interp, this, _args| {
            let func = this_callable(interp, &this)?;
            let text = match (interp.function_data(func), interp.native_function(func)) {
                (Some(data), _) => {
                    let literal = &data.literal;
                    let name = literal.name.map(|n| interp.atom_string(n).to_rust_string()).unwrap_or_default();
                    let params: Vec<String> = literal
                        .params
                        .iter()
                        .map(|p| interp.atom_string(*p).to_rust_string())
                        .collect();
                    format!("function {name}({}) {{{}}}", params.join(", "), literal.body_text)
                }
                (None, Some(native)) => format!("function {}() {{ [native code] }}", native.name),
                (None, None) => "function () { [host code] }".to_string(),
            };
            Ok(JsValue::String(JsString::from_str(&text)))
        });

        // §15.3.4.3
        self.define_method(proto, "apply", 2, |interp, this, args| {
            let func = this_callable(interp, &this)?;
            let list = match arg(args, 1) {
                JsValue::Undefined | JsValue::Null => Vec::new(),
                JsValue::Object(array) => {
                    let length = interp.get(array, atoms::LENGTH)?;
                    let length = interp.to_uint32(&length)?;
                    let mut list = Vec::with_capacity(length as usize);
                    for i in 0..length {
                        let index = interp.index_atom(i);
                        list.push(interp.get(array, index)?);
                    }
                    list
                }
                _ => return Err(interp.throw_error(ErrorKind::TypeError, "second argument to apply must be an array")),
            };
            interp.call_object(func, arg(args, 0), &list)
        });
        self.define_method(proto, "call", 1, |interp, this, args| {
            let func = this_callable(interp, &this)?;
            let rest = args.get(1..).unwrap_or(&[]);
            interp.call_object(func, arg(args, 0), rest)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(src: &str) -> String {
        let mut interp = Interpreter::new(Config::default());
        let v = interp.evaluate("function", src).unwrap().unwrap_or(JsValue::Undefined);
        interp.value_to_string(&v)
    }

    #[test]
    fn function_constructor_uses_global_scope() {
        assert_eq!(run("var add = new Function('a', 'b', 'return a + b;'); add(2, 3)"), "5");
        assert_eq!(run("var x = 'global'; function f() { var x = 'local'; return Function('return x')(); } f()"), "global");
        assert_eq!(run("Function('a, b', 'return b')(1, 2)"), "2");
    }

    #[test]
    fn function_constructor_reports_syntax_errors() {
        assert_eq!(run("var r; try { Function('return +'); } catch (e) { r = e.name; } r"), "SyntaxError");
    }

    #[test]
    fn call_and_apply_set_this() {
        assert_eq!(run("function f(a, b) { return this.v + a + b; } f.call({ v: 1 }, 2, 3)"), "6");
        assert_eq!(run("function f(a, b) { return this.v + a + b; } f.apply({ v: 1 }, [2, 3])"), "6");
        assert_eq!(run("var v = 'g'; function f() { return this.v; } f.call(null)"), "g");
        assert_eq!(run("Math.max.apply(null, [1, 5, 2])"), "5");
    }

    #[test]
    fn to_string_shows_source() {
        assert_eq!(run("function f(a, b) { return a; } f.toString()"), "function f(a, b) { return a; }");
        assert_eq!(run("Math.abs.toString()"), "function abs() { [native code] }");
    }
}
