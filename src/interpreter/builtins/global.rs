use super::*;
use crate::types::number_ops;

// §15.1.2.2
fn parse_int(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let input = interp.to_string(&arg(args, 0))?;
    let mut radix = interp.to_int32(&arg(args, 1))?;
    let units = input.as_units();
    let start = units
        .iter()
        .position(|&c| !number_ops::is_str_whitespace(c))
        .unwrap_or(units.len());
    let mut rest = &units[start..];
    let mut sign = 1.0;
    if let Some(&c) = rest.first()
        && (c == u16::from(b'-') || c == u16::from(b'+'))
    {
        if c == u16::from(b'-') {
            sign = -1.0;
        }
        rest = &rest[1..];
    }
    let has_hex_prefix = rest.len() >= 2 && rest[0] == u16::from(b'0') && (rest[1] | 0x20) == u16::from(b'x');
    if radix == 0 {
        radix = if has_hex_prefix { 16 } else { 10 };
    }
    if !(2..=36).contains(&radix) {
        return Ok(JsValue::Number(f64::NAN));
    }
    if radix == 16 && has_hex_prefix {
        rest = &rest[2..];
    }
    let digits: Vec<u32> = rest
        .iter()
        .map_while(|&c| char::from_u32(u32::from(c)).and_then(|c| c.to_digit(radix as u32)))
        .collect();
    if digits.is_empty() {
        return Ok(JsValue::Number(f64::NAN));
    }
    let value = if radix == 10 {
        let text: String = digits.iter().filter_map(|&d| char::from_digit(d, 10)).collect();
        text.parse::<f64>().unwrap_or(f64::NAN)
    } else {
        digits.iter().fold(0.0, |acc, &d| acc * f64::from(radix) + f64::from(d))
    };
    Ok(JsValue::Number(sign * value))
}

/// Length of the longest StrDecimalLiteral prefix of `s`.
fn decimal_prefix(s: &[u8]) -> usize {
    let mut i = 0;
    if matches!(s.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    if s[i..].starts_with(b"Infinity") {
        return i + "Infinity".len();
    }
    let int_start = i;
    while s.get(i).is_some_and(u8::is_ascii_digit) {
        i += 1;
    }
    let mut digits = i - int_start;
    if s.get(i) == Some(&b'.') {
        let frac_start = i + 1;
        let mut j = frac_start;
        while s.get(j).is_some_and(u8::is_ascii_digit) {
            j += 1;
        }
        if digits > 0 || j > frac_start {
            digits += j - frac_start;
            i = j;
        }
    }
    if digits == 0 {
        return 0;
    }
    if matches!(s.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(s.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_start = j;
        while s.get(j).is_some_and(u8::is_ascii_digit) {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }
    i
}

// §15.1.2.3
fn parse_float(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let input = interp.to_string(&arg(args, 0))?;
    let units = input.as_units();
    let start = units
        .iter()
        .position(|&c| !number_ops::is_str_whitespace(c))
        .unwrap_or(units.len());
    let ascii: Vec<u8> = units[start..]
        .iter()
        .map_while(|&c| u8::try_from(c).ok().filter(u8::is_ascii))
        .collect();
    let len = decimal_prefix(&ascii);
    if len == 0 {
        return Ok(JsValue::Number(f64::NAN));
    }
    let text = String::from_utf8_lossy(&ascii[..len]);
    let value = match text.trim_start_matches(['+', '-']) {
        "Infinity" => f64::INFINITY,
        body => body.parse::<f64>().unwrap_or(f64::NAN),
    };
    Ok(JsValue::Number(if text.starts_with('-') { -value } else { value }))
}

// Annex B.2.1
fn escape(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let input = interp.to_string(&arg(args, 0))?;
    let mut out = String::with_capacity(input.len());
    for &unit in input.as_units() {
        match u8::try_from(unit) {
            Ok(b) if b.is_ascii_alphanumeric() || b"@*_+-./".contains(&b) => out.push(char::from(b)),
            Ok(b) => out.push_str(&format!("%{b:02X}")),
            Err(_) => out.push_str(&format!("%u{unit:04X}")),
        }
    }
    Ok(JsValue::String(JsString::from_str(&out)))
}

// Annex B.2.2
fn unescape(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let input = interp.to_string(&arg(args, 0))?;
    let units = input.as_units();
    let hex = |slice: &[u16]| -> Option<u16> {
        let text = String::from_utf16(slice).ok()?;
        if !text.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        u16::from_str_radix(&text, 16).ok()
    };
    let mut out = Vec::with_capacity(units.len());
    let mut i = 0;
    while i < units.len() {
        if units[i] == u16::from(b'%') {
            if units.get(i + 1) == Some(&u16::from(b'u'))
                && let Some(decoded) = units.get(i + 2..i + 6).and_then(hex)
            {
                out.push(decoded);
                i += 6;
                continue;
            }
            if let Some(decoded) = units.get(i + 1..i + 3).and_then(hex) {
                out.push(decoded);
                i += 3;
                continue;
            }
        }
        out.push(units[i]);
        i += 1;
    }
    Ok(JsValue::String(JsString::from_units(out)))
}

fn indirect_eval(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let JsValue::String(source) = arg(args, 0) else {
        return Ok(arg(args, 0));
    };
    let context = interp.global_context(Attributes::empty());
    interp.eval_in_context(&source, context)
}

impl Interpreter {
    pub(super) fn setup_global_functions(&mut self) {
        let global = self.realm.global;
        let fixed = Attributes::DONT_ENUM | Attributes::DONT_DELETE;
        self.define_property(global, atoms::NAN, JsValue::Number(f64::NAN), fixed);
        self.define_property(global, atoms::INFINITY, JsValue::Number(f64::INFINITY), fixed);
        self.define_property(global, atoms::UNDEFINED, JsValue::Undefined, fixed);

        let eval = self.create_function("eval", 1, indirect_eval);
        self.define_property(global, atoms::EVAL, JsValue::Object(eval), Attributes::DONT_ENUM);
        self.realm.eval_function = eval;

        self.define_method(global, "parseInt", 2, parse_int);
        self.define_method(global, "parseFloat", 1, parse_float);
        self.define_method(global, "isNaN", 1, |interp, _this, args| {
            Ok(JsValue::Boolean(interp.to_number(&arg(args, 0))?.is_nan()))
        });
        self.define_method(global, "isFinite", 1, |interp, _this, args| {
            Ok(JsValue::Boolean(interp.to_number(&arg(args, 0))?.is_finite()))
        });
        if self.config.compat.contains(CompatFlags::ANNEX_B) {
            self.define_method(global, "escape", 1, escape);
            self.define_method(global, "unescape", 1, unescape);
        }
    }

    /// A parse failure raised as a script-visible SyntaxError.
    pub(crate) fn syntax_error(&mut self, error: &ParseError) -> Exception {
        let text = JsString::from_str(&format!("{}:{}: {}", error.source_name, error.line, error.message));
        let obj = self.new_error_object(ErrorKind::SyntaxError, &text);
        self.throw_value(JsValue::Object(obj))
    }

    /// `eval(x)` from a call expression: the program runs with the caller's
    /// variable object, scope and `this`. Its `var`s stay deletable.
    pub(crate) fn direct_eval(&mut self, args: &[JsValue]) -> JsResult<JsValue> {
        let JsValue::String(source) = arg(args, 0) else {
            return Ok(arg(args, 0));
        };
        let caller = self.context();
        let context = Context {
            activation: caller.activation,
            variable: caller.variable,
            var_attrs: Attributes::empty(),
            this: caller.this,
            scope: caller.scope.clone(),
            function: caller.function,
            arguments: caller.arguments,
            result: None,
        };
        self.eval_in_context(&source, context)
    }

    fn eval_in_context(&mut self, source: &JsString, context: Context) -> JsResult<JsValue> {
        let program = match self.parse("eval", &source.to_rust_string()) {
            Ok(program) => program,
            Err(e) => return Err(self.syntax_error(&e)),
        };
        let body = program.body;
        tracing::trace!(statements = body.statements.len(), "running eval code");

        // No collection while the caller's temporaries live only on the Rust stack.
        self.call_depth += 1;
        self.contexts.push(context);
        let depth = self.contexts.len();
        let saved_location = std::mem::replace(
            &mut self.location,
            Location {
                source_name: body.source_name.clone(),
                line: 1,
            },
        );
        let completion = self.bind_declarations(&body).and_then(|()| self.run_body(&body));
        self.location = saved_location;
        self.contexts.truncate(depth);
        let result = self.contexts.pop().and_then(|ctx| ctx.result);
        self.call_depth -= 1;
        completion?;
        Ok(result.unwrap_or(JsValue::Undefined))
    }
}
