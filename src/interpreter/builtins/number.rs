use super::*;
use crate::types::number_ops;

fn number_call(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    match args.first() {
        Some(value) => Ok(JsValue::Number(interp.to_number(value)?)),
        None => Ok(JsValue::Number(0.0)),
    }
}

fn number_construct(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let value = number_call(interp, this, args)?;
    Ok(JsValue::Object(interp.wrap_primitive(value)))
}

fn this_number(interp: &mut Interpreter, this: &JsValue) -> JsResult<f64> {
    match interp.this_primitive(this) {
        Some(JsValue::Number(n)) => Ok(n),
        _ => Err(interp.throw_error(ErrorKind::TypeError, "Number.prototype method called on incompatible object")),
    }
}

fn number_to_string(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let n = this_number(interp, &this)?;
    let radix = match arg(args, 0) {
        JsValue::Undefined => 10.0,
        radix => interp.to_integer(&radix)?,
    };
    if !(2.0..=36.0).contains(&radix) {
        return Err(interp.throw_error(ErrorKind::RangeError, "radix must be between 2 and 36"));
    }
    let text = number_ops::to_string_radix(n, radix as u32);
    Ok(JsValue::String(JsString::from_str(&text)))
}

impl Interpreter {
    pub(super) fn setup_number(&mut self) {
        let class = self.classes.number.clone();
        let object_prototype = self.realm.object_prototype;
        let proto = self.new_object_with(class, Some(object_prototype), ObjectKind::Number(0.0));
        self.realm.number_prototype = proto;
        let ctor = self.create_constructor("Number", 1, number_call, number_construct, proto);

        self.define_constant(ctor, "MAX_VALUE", JsValue::Number(f64::MAX));
        self.define_constant(ctor, "MIN_VALUE", JsValue::Number(5e-324));
        self.define_constant(ctor, "NaN", JsValue::Number(f64::NAN));
        self.define_constant(ctor, "NEGATIVE_INFINITY", JsValue::Number(f64::NEG_INFINITY));
        self.define_constant(ctor, "POSITIVE_INFINITY", JsValue::Number(f64::INFINITY));

        self.define_method(proto, "toString", 1, number_to_string);
        self.define_method(proto, "toLocaleString", 0, number_to_string);
        self.define_method(proto, "valueOf", 0, |interp, this, _args| {
            Ok(JsValue::Number(this_number(interp, &this)?))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(src: &str) -> String {
        let mut interp = Interpreter::new(Config::default());
        let v = interp.evaluate("number", src).unwrap().unwrap_or(JsValue::Undefined);
        interp.value_to_string(&v)
    }

    #[test]
    fn conversion_and_wrapping() {
        assert_eq!(run("Number('0x1f') + Number() + Number(' 12 ')"), "43");
        assert_eq!(run("typeof new Number(1) + ':' + (new Number(5) + 1)"), "object:6");
    }

    #[test]
    fn constants_are_read_only() {
        assert_eq!(run("Number.MAX_VALUE = 1; Number.MAX_VALUE === 1.7976931348623157e308"), "true");
        assert_eq!(run("Number.MIN_VALUE + ':' + Number.NEGATIVE_INFINITY"), "5e-324:-Infinity");
    }

    #[test]
    fn to_string_with_radix() {
        assert_eq!(run("(255).toString(16) + ':' + (255).toString(2) + ':' + (-8).toString(8)"), "ff:11111111:-10");
        assert_eq!(run("(0.5).toString() + ':' + (1e21).toString()"), "0.5:1e+21");
        assert_eq!(run("var r; try { (1).toString(1); } catch (e) { r = e.name; } r"), "RangeError");
        assert_eq!(run("var r; try { Number.prototype.toString.call('1'); } catch (e) { r = e.name; } r"), "TypeError");
    }
}
