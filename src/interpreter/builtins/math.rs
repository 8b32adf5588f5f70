use super::*;

fn number_arg(interp: &mut Interpreter, args: &[JsValue], i: usize) -> JsResult<f64> {
    interp.to_number(&arg(args, i))
}

macro_rules! unary_math {
    ($interp:ident, $obj:ident, $($name:literal => $f:expr,)*) => {
        $(
            $interp.define_method($obj, $name, 1, |interp, _this, args| {
                let x = number_arg(interp, args, 0)?;
                let f: fn(f64) -> f64 = $f;
                Ok(JsValue::Number(f(x)))
            });
        )*
    };
}

// §15.8.2.13: the cases where IEEE pow and ECMAScript disagree
fn pow(x: f64, y: f64) -> f64 {
    if y.is_nan() || (x.abs() == 1.0 && y.is_infinite()) {
        return f64::NAN;
    }
    x.powf(y)
}

// §15.8.2.15
fn round(x: f64) -> f64 {
    if !x.is_finite() || x == 0.0 {
        return x;
    }
    if (-0.5..0.0).contains(&x) {
        return -0.0;
    }
    (x + 0.5).floor()
}

fn extremum(interp: &mut Interpreter, args: &[JsValue], max: bool) -> JsResult<JsValue> {
    let mut result = if max { f64::NEG_INFINITY } else { f64::INFINITY };
    for value in args {
        let x = interp.to_number(value)?;
        if x.is_nan() {
            result = f64::NAN;
        } else if result.is_nan() {
            continue;
        } else if max && (x > result || (x == 0.0 && result == 0.0 && result.is_sign_negative())) {
            result = x;
        } else if !max && (x < result || (x == 0.0 && result == 0.0 && x.is_sign_negative())) {
            result = x;
        }
    }
    Ok(JsValue::Number(result))
}

impl Interpreter {
    /// xorshift64* step over the interpreter's seed.
    fn next_random(&mut self) -> f64 {
        let mut x = self.random_state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.random_state = x;
        let bits = x.wrapping_mul(0x2545_f491_4f6c_dd1d) >> 11;
        bits as f64 / (1u64 << 53) as f64
    }

    pub(super) fn setup_math(&mut self) {
        let class = self.classes.math.clone();
        let proto = self.realm.object_prototype;
        let math = self.new_object_with(class, Some(proto), ObjectKind::Ordinary);
        let global = self.realm.global;
        self.define_property(global, atoms::MATH, JsValue::Object(math), Attributes::DONT_ENUM);
        self.realm.intrinsics.push(math);

        self.define_constant(math, "E", JsValue::Number(std::f64::consts::E));
        self.define_constant(math, "LN10", JsValue::Number(std::f64::consts::LN_10));
        self.define_constant(math, "LN2", JsValue::Number(std::f64::consts::LN_2));
        self.define_constant(math, "LOG2E", JsValue::Number(std::f64::consts::LOG2_E));
        self.define_constant(math, "LOG10E", JsValue::Number(std::f64::consts::LOG10_E));
        self.define_constant(math, "PI", JsValue::Number(std::f64::consts::PI));
        self.define_constant(math, "SQRT1_2", JsValue::Number(std::f64::consts::FRAC_1_SQRT_2));
        self.define_constant(math, "SQRT2", JsValue::Number(std::f64::consts::SQRT_2));

        unary_math!(self, math,
            "abs" => f64::abs,
            "acos" => f64::acos,
            "asin" => f64::asin,
            "atan" => f64::atan,
            "ceil" => f64::ceil,
            "cos" => f64::cos,
            "exp" => f64::exp,
            "floor" => f64::floor,
            "log" => f64::ln,
            "round" => round,
            "sin" => f64::sin,
            "sqrt" => f64::sqrt,
            "tan" => f64::tan,
        );
        self.define_method(math, "atan2", 2, |interp, _this, args| {
            let y = number_arg(interp, args, 0)?;
            let x = number_arg(interp, args, 1)?;
            Ok(JsValue::Number(y.atan2(x)))
        });
        self.define_method(math, "pow", 2, |interp, _this, args| {
            let x = number_arg(interp, args, 0)?;
            let y = number_arg(interp, args, 1)?;
            Ok(JsValue::Number(pow(x, y)))
        });
        self.define_method(math, "max", 2, |interp, _this, args| extremum(interp, args, true));
        self.define_method(math, "min", 2, |interp, _this, args| extremum(interp, args, false));
        self.define_method(math, "random", 0, |interp, _this, _args| Ok(JsValue::Number(interp.next_random())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(src: &str) -> String {
        let mut interp = Interpreter::new(Config::default());
        let v = interp.evaluate("math", src).unwrap().unwrap_or(JsValue::Undefined);
        interp.value_to_string(&v)
    }

    #[test]
    fn rounding() {
        assert_eq!(run("Math.round(2.5) + ',' + Math.round(-2.5) + ',' + Math.round(-2.6)"), "3,-2,-3");
        assert_eq!(run("1 / Math.round(-0.2)"), "-Infinity");
        assert_eq!(run("Math.floor(-1.5) + ',' + Math.ceil(-1.5) + ',' + Math.abs(-3)"), "-2,-1,3");
    }

    #[test]
    fn extremes() {
        assert_eq!(run("Math.max() + ',' + Math.min() + ',' + Math.max(1, 3, 2) + ',' + Math.min(1, NaN)"), "-Infinity,Infinity,3,NaN");
        assert_eq!(run("1 / Math.max(-0, 0) + ',' + 1 / Math.min(0, -0)"), "Infinity,-Infinity");
    }

    #[test]
    fn pow_edge_cases() {
        assert_eq!(run("Math.pow(2, 10) + ',' + Math.pow(1, NaN) + ',' + Math.pow(1, Infinity) + ',' + Math.pow(NaN, 0)"), "1024,NaN,NaN,1");
    }

    #[test]
    fn random_is_in_unit_interval() {
        assert_eq!(
            run("var ok = true; for (var i = 0; i < 200; i++) { var r = Math.random(); if (!(r >= 0 && r < 1)) ok = false; } ok"),
            "true"
        );
    }

    #[test]
    fn constants() {
        assert_eq!(run("Math.PI = 3; Math.PI > 3.14"), "true");
        assert_eq!(run("Object.prototype.toString.call(Math)"), "[object Math]");
    }
}
