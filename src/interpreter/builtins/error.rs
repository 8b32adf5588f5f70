use super::*;

/// Shared by the seven error constructors; `K` indexes [`ErrorKind::ALL`].
fn error_construct<const K: usize>(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let class = interp.classes.error.clone();
    let proto = interp.realm.error_prototypes[K];
    let obj = interp.new_object_with(class, Some(proto), ObjectKind::Error);
    match arg(args, 0) {
        JsValue::Undefined => {}
        message => {
            let message = interp.to_string(&message)?;
            interp.define_property(obj, atoms::MESSAGE, JsValue::String(message), Attributes::DONT_ENUM);
        }
    }
    Ok(JsValue::Object(obj))
}

const CONSTRUCTORS: [NativeFn; 7] = [
    error_construct::<0>,
    error_construct::<1>,
    error_construct::<2>,
    error_construct::<3>,
    error_construct::<4>,
    error_construct::<5>,
    error_construct::<6>,
];

impl Interpreter {
    pub(super) fn setup_errors(&mut self) {
        let object_prototype = self.realm.object_prototype;
        let mut base = object_prototype;
        for kind in ErrorKind::ALL {
            let class = self.classes.object.clone();
            let proto = self.new_object_with(class, Some(base), ObjectKind::Ordinary);
            self.define_property(proto, atoms::NAME, JsValue::string(kind.name()), Attributes::DONT_ENUM);
            self.define_property(proto, atoms::MESSAGE, JsValue::String(JsString::empty()), Attributes::DONT_ENUM);
            self.realm.error_prototypes[kind.index()] = proto;
            let construct = CONSTRUCTORS[kind.index()];
            self.create_constructor(kind.name(), 1, construct, construct, proto);
            if kind == ErrorKind::Error {
                base = proto;
            }
        }

        let error_prototype = self.realm.error_prototypes[ErrorKind::Error.index()];
        self.define_method(error_prototype, "toString", 0, |interp, this, _args| {
            let obj = interp.this_object(&this)?;
            let name = interp.get(obj, atoms::NAME)?;
            let name = interp.to_string(&name)?;
            let message = interp.get(obj, atoms::MESSAGE)?;
            let message = interp.to_string(&message)?;
            if message.is_empty() {
                return Ok(JsValue::String(name));
            }
            Ok(JsValue::String(name.concat(&JsString::from_str(": ")).concat(&message)))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(src: &str) -> String {
        let mut interp = Interpreter::new(Config::default());
        let v = interp.evaluate("error", src).unwrap().unwrap_or(JsValue::Undefined);
        interp.value_to_string(&v)
    }

    #[test]
    fn constructors_with_and_without_new() {
        assert_eq!(run("new TypeError('bad').toString()"), "TypeError: bad");
        assert_eq!(run("RangeError('r').name + ':' + RangeError('r').message"), "RangeError:r");
        assert_eq!(run("new Error().toString()"), "Error");
        assert_eq!(run("new URIError('u').name"), "URIError");
    }

    #[test]
    fn native_errors_inherit_from_error() {
        assert_eq!(
            run("var e = new SyntaxError('s'); (e instanceof SyntaxError) + ':' + (e instanceof Error) + ':' + (e instanceof TypeError)"),
            "true:true:false"
        );
        assert_eq!(run("EvalError.prototype.toString === Error.prototype.toString"), "true");
    }

    #[test]
    fn engine_errors_match_script_errors() {
        assert_eq!(
            run("var r; try { undefinedName; } catch (e) { r = (e instanceof ReferenceError) + ':' + e.name; } r"),
            "true:ReferenceError"
        );
    }

    #[test]
    fn message_is_not_enumerable() {
        assert_eq!(run("var s = ''; for (var k in new Error('m')) s += k; s"), "");
    }
}
