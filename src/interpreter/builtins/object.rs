use super::*;

fn object_call(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    match arg(args, 0) {
        JsValue::Undefined | JsValue::Null => Ok(JsValue::Object(interp.new_object())),
        value => Ok(JsValue::Object(interp.to_object(&value)?)),
    }
}

fn own_attributes(interp: &mut Interpreter, obj: ObjectId, name: Atom) -> Option<Attributes> {
    interp
        .own_keys(obj)
        .into_iter()
        .find(|(n, attrs)| *n == name && !attrs.contains(Attributes::INTERNAL))
        .map(|(_, attrs)| attrs)
}

impl Interpreter {
    pub(super) fn setup_object(&mut self) {
        let proto = self.realm.object_prototype;
        self.create_constructor("Object", 1, object_call, object_call, proto);

        // §15.2.4.2
        self.define_method(proto, "toString", 0, |interp, this, _args| {
            let obj = interp.this_object(&this)?;
            let class = interp.class_of(obj).class_name();
            Ok(JsValue::String(JsString::from_str(&format!("[object {class}]"))))
        });
        self.define_method(proto, "toLocaleString", 0, |interp, this, _args| {
            let obj = interp.this_object(&this)?;
            let method = interp.get(obj, atoms::TO_STRING)?;
            match method {
                JsValue::Object(f) if interp.is_callable(&method) => interp.call_object(f, this, &[]),
                _ => Err(interp.throw_error(ErrorKind::TypeError, "toString is not a function")),
            }
        });
        self.define_method(proto, "valueOf", 0, |interp, this, _args| {
            Ok(JsValue::Object(interp.this_object(&this)?))
        });
        self.define_method(proto, "hasOwnProperty", 1, |interp, this, args| {
            let obj = interp.this_object(&this)?;
            let name = interp.to_property_name(&arg(args, 0))?;
            Ok(JsValue::Boolean(own_attributes(interp, obj, name).is_some()))
        });
        self.define_method(proto, "isPrototypeOf", 1, |interp, this, args| {
            let obj = interp.this_object(&this)?;
            let JsValue::Object(mut current) = arg(args, 0) else {
                return Ok(JsValue::Boolean(false));
            };
            while let Some(next) = interp.prototype_of(current) {
                if interp.joined(next, obj) {
                    return Ok(JsValue::Boolean(true));
                }
                current = next;
            }
            Ok(JsValue::Boolean(false))
        });
        self.define_method(proto, "propertyIsEnumerable", 1, |interp, this, args| {
            let obj = interp.this_object(&this)?;
            let name = interp.to_property_name(&arg(args, 0))?;
            let enumerable = own_attributes(interp, obj, name).is_some_and(|attrs| !attrs.contains(Attributes::DONT_ENUM));
            Ok(JsValue::Boolean(enumerable))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(src: &str) -> String {
        let mut interp = Interpreter::new(Config::default());
        let v = interp.evaluate("object", src).unwrap().unwrap_or(JsValue::Undefined);
        interp.value_to_string(&v)
    }

    #[test]
    fn to_string_reports_class() {
        assert_eq!(run("({}).toString()"), "[object Object]");
        assert_eq!(run("Object.prototype.toString.call([])"), "[object Array]");
        assert_eq!(run("Object.prototype.toString.call(function () {})"), "[object Function]");
        assert_eq!(run("Object.prototype.toString.call(new Error('x'))"), "[object Error]");
    }

    #[test]
    fn object_wraps_primitives() {
        assert_eq!(run("typeof Object(1) + ':' + typeof new Object('s') + ':' + typeof Object(null)"), "object:object:object");
        assert_eq!(run("var o = {}; Object(o) === o"), "true");
    }

    #[test]
    fn own_property_queries() {
        assert_eq!(
            run("var o = { a: 1 }; o.hasOwnProperty('a') + ':' + o.hasOwnProperty('toString') + ':' + ('toString' in o)"),
            "true:false:true"
        );
        assert_eq!(run("[1].propertyIsEnumerable(0) + ':' + [1].propertyIsEnumerable('length')"), "true:false");
        assert_eq!(run("function F() {} var f = new F(); F.prototype.isPrototypeOf(f) + ':' + Object.prototype.isPrototypeOf(f)"), "true:true");
    }
}
