use super::*;
use crate::ast::BinaryOp;
use crate::types::number_ops;

// §9.2 ToBoolean
pub fn to_boolean(value: &JsValue) -> bool {
    match value {
        JsValue::Undefined | JsValue::Null => false,
        JsValue::Boolean(b) => *b,
        JsValue::Number(n) => !(n.is_nan() || *n == 0.0),
        JsValue::String(s) => !s.is_empty(),
        JsValue::Object(_) => true,
    }
}

// §9.3 ToNumber for primitives
pub fn primitive_to_number(value: &JsValue) -> f64 {
    match value {
        JsValue::Undefined => f64::NAN,
        JsValue::Null => 0.0,
        JsValue::Boolean(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        JsValue::Number(n) => *n,
        JsValue::String(s) => number_ops::from_string(s.as_units()),
        JsValue::Object(_) => f64::NAN,
    }
}

// §9.8 ToString for primitives
pub fn primitive_to_string(value: &JsValue) -> JsString {
    match value {
        JsValue::Undefined => JsString::from_str("undefined"),
        JsValue::Null => JsString::from_str("null"),
        JsValue::Boolean(true) => JsString::from_str("true"),
        JsValue::Boolean(false) => JsString::from_str("false"),
        JsValue::Number(n) => JsString::from_str(&number_ops::to_string(*n)),
        JsValue::String(s) => s.clone(),
        JsValue::Object(_) => JsString::from_str("[object]"),
    }
}

// §11.6.1 addition once both operands are primitive
pub fn primitive_add(left: &JsValue, right: &JsValue) -> JsValue {
    if matches!(left, JsValue::String(_)) || matches!(right, JsValue::String(_)) {
        let l = primitive_to_string(left);
        let r = primitive_to_string(right);
        return JsValue::String(l.concat(&r));
    }
    JsValue::Number(primitive_to_number(left) + primitive_to_number(right))
}

/// Operators that only ever see two numbers.
pub fn numeric_binary(op: BinaryOp, a: f64, b: f64) -> Option<f64> {
    Some(match op {
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Mod => a % b,
        BinaryOp::LShift => number_ops::left_shift(a, b),
        BinaryOp::RShift => number_ops::signed_right_shift(a, b),
        BinaryOp::URShift => number_ops::unsigned_right_shift(a, b),
        BinaryOp::BitAnd => number_ops::bitwise_and(a, b),
        BinaryOp::BitOr => number_ops::bitwise_or(a, b),
        BinaryOp::BitXor => number_ops::bitwise_xor(a, b),
        _ => return None,
    })
}

// §11.8.5 abstract relational comparison of primitives; None is "undefined"
pub fn primitive_less_than(x: &JsValue, y: &JsValue) -> Option<bool> {
    if let (JsValue::String(a), JsValue::String(b)) = (x, y) {
        return Some(a.as_units() < b.as_units());
    }
    let a = primitive_to_number(x);
    let b = primitive_to_number(y);
    if a.is_nan() || b.is_nan() {
        return None;
    }
    Some(a < b)
}

// §11.9.6 strict equality; objects compare with `same_object`
pub fn strict_equals_with(a: &JsValue, b: &JsValue, same_object: impl Fn(ObjectId, ObjectId) -> bool) -> bool {
    match (a, b) {
        (JsValue::Undefined, JsValue::Undefined) | (JsValue::Null, JsValue::Null) => true,
        (JsValue::Number(x), JsValue::Number(y)) => x == y,
        (JsValue::String(x), JsValue::String(y)) => x == y,
        (JsValue::Boolean(x), JsValue::Boolean(y)) => x == y,
        (JsValue::Object(x), JsValue::Object(y)) => same_object(*x, *y),
        _ => false,
    }
}

// §11.9.3 abstract equality when neither side is an object
pub fn primitive_loose_equals(a: &JsValue, b: &JsValue) -> bool {
    match (a, b) {
        (JsValue::Undefined | JsValue::Null, JsValue::Undefined | JsValue::Null) => true,
        (JsValue::Undefined | JsValue::Null, _) | (_, JsValue::Undefined | JsValue::Null) => false,
        (JsValue::Number(_), JsValue::String(_)) | (JsValue::String(_), JsValue::Number(_)) => {
            primitive_to_number(a) == primitive_to_number(b)
        }
        (JsValue::Boolean(_), _) => primitive_loose_equals(&JsValue::Number(primitive_to_number(a)), b),
        (_, JsValue::Boolean(_)) => primitive_loose_equals(a, &JsValue::Number(primitive_to_number(b))),
        _ => strict_equals_with(a, b, |x, y| x == y),
    }
}

/// Evaluates an operator over two primitives without touching any object.
/// Returns `None` for operators that need the object model.
pub fn fold_binary(op: BinaryOp, left: &JsValue, right: &JsValue) -> Option<JsValue> {
    if left.is_object() || right.is_object() {
        return None;
    }
    Some(match op {
        BinaryOp::Add => primitive_add(left, right),
        BinaryOp::Eq => JsValue::Boolean(primitive_loose_equals(left, right)),
        BinaryOp::NotEq => JsValue::Boolean(!primitive_loose_equals(left, right)),
        BinaryOp::StrictEq => JsValue::Boolean(strict_equals_with(left, right, |x, y| x == y)),
        BinaryOp::StrictNotEq => JsValue::Boolean(!strict_equals_with(left, right, |x, y| x == y)),
        BinaryOp::Lt => JsValue::Boolean(primitive_less_than(left, right) == Some(true)),
        BinaryOp::Gt => JsValue::Boolean(primitive_less_than(right, left) == Some(true)),
        BinaryOp::LtEq => JsValue::Boolean(primitive_less_than(right, left) == Some(false)),
        BinaryOp::GtEq => JsValue::Boolean(primitive_less_than(left, right) == Some(false)),
        BinaryOp::In | BinaryOp::Instanceof => return None,
        _ => JsValue::Number(numeric_binary(
            op,
            primitive_to_number(left),
            primitive_to_number(right),
        )?),
    })
}

impl Interpreter {
    // §9.1 ToPrimitive
    pub fn to_primitive(&mut self, value: &JsValue, hint: Option<Hint>) -> JsResult<JsValue> {
        match value {
            JsValue::Object(id) => self.default_value(*id, hint),
            _ => Ok(value.clone()),
        }
    }

    // §9.3 ToNumber
    pub fn to_number(&mut self, value: &JsValue) -> JsResult<f64> {
        match value {
            JsValue::Object(_) => {
                let prim = self.to_primitive(value, Some(Hint::Number))?;
                Ok(primitive_to_number(&prim))
            }
            _ => Ok(primitive_to_number(value)),
        }
    }

    // §9.8 ToString
    pub fn to_string(&mut self, value: &JsValue) -> JsResult<JsString> {
        match value {
            JsValue::Object(_) => {
                let prim = self.to_primitive(value, Some(Hint::String))?;
                Ok(primitive_to_string(&prim))
            }
            _ => Ok(primitive_to_string(value)),
        }
    }

    pub fn to_int32(&mut self, value: &JsValue) -> JsResult<i32> {
        Ok(number_ops::to_int32(self.to_number(value)?))
    }

    pub fn to_uint32(&mut self, value: &JsValue) -> JsResult<u32> {
        Ok(number_ops::to_uint32(self.to_number(value)?))
    }

    pub fn to_uint16(&mut self, value: &JsValue) -> JsResult<u16> {
        Ok(number_ops::to_uint16(self.to_number(value)?))
    }

    pub fn to_integer(&mut self, value: &JsValue) -> JsResult<f64> {
        Ok(number_ops::to_integer(self.to_number(value)?))
    }

    // §9.9 ToObject
    pub fn to_object(&mut self, value: &JsValue) -> JsResult<ObjectId> {
        match value {
            JsValue::Undefined | JsValue::Null => Err(self.throw_error(
                ErrorKind::TypeError,
                &format!("{} has no properties", primitive_to_string(value)),
            )),
            JsValue::Object(id) => Ok(*id),
            _ => Ok(self.wrap_primitive(value.clone())),
        }
    }

    /// Creates the Boolean, Number or String object wrapping a primitive.
    pub(crate) fn wrap_primitive(&mut self, value: JsValue) -> ObjectId {
        let (class, proto, kind) = match value {
            JsValue::Boolean(b) => (
                self.classes.boolean.clone(),
                self.realm.boolean_prototype,
                ObjectKind::Boolean(b),
            ),
            JsValue::Number(n) => (
                self.classes.number.clone(),
                self.realm.number_prototype,
                ObjectKind::Number(n),
            ),
            JsValue::String(s) => {
                let len = s.len();
                let class = self.classes.string.clone();
                let proto = self.realm.string_prototype;
                let id = self.new_object_with(class, Some(proto), ObjectKind::String(s));
                self.define_property(
                    id,
                    atoms::LENGTH,
                    JsValue::Number(len as f64),
                    Attributes::READ_ONLY | Attributes::DONT_ENUM | Attributes::DONT_DELETE,
                );
                return id;
            }
            _ => return self.new_object(),
        };
        self.new_object_with(class, Some(proto), kind)
    }

    /// ToString followed by interning, for property access.
    pub fn to_property_name(&mut self, value: &JsValue) -> JsResult<Atom> {
        match value {
            JsValue::String(s) => Ok(self.interner.intern(s)),
            JsValue::Number(n) if *n >= 0.0 && *n < 4294967295.0 && n.fract() == 0.0 => {
                Ok(self.index_atom(*n as u32))
            }
            _ => {
                let s = self.to_string(value)?;
                Ok(self.interner.intern(&s))
            }
        }
    }

    /// The atom for an array index.
    pub fn index_atom(&mut self, index: u32) -> Atom {
        self.interner.intern_str(&index.to_string())
    }

    pub fn intern(&mut self, name: &str) -> Atom {
        self.interner.intern_str(name)
    }

    pub fn atom_string(&self, atom: Atom) -> JsString {
        self.interner.resolve(atom).clone()
    }

    // §8.7.1 GetValue
    pub(crate) fn get_value(&mut self, operand: Operand) -> JsResult<JsValue> {
        match operand {
            Operand::Value(v) => Ok(v),
            Operand::Reference(Reference { base: Some(base), name }) => self.get(base, name),
            Operand::Reference(Reference { base: None, name }) => {
                if self.config.compat.contains(CompatFlags::UNDEFDEF) {
                    return Ok(JsValue::Undefined);
                }
                let name = self.interner.resolve(name).to_rust_string();
                Err(self.throw_error(ErrorKind::ReferenceError, &format!("{name} is not defined")))
            }
        }
    }

    // §8.7.2 PutValue
    pub(crate) fn put_value(&mut self, operand: &Operand, value: JsValue) -> JsResult<()> {
        match operand {
            Operand::Reference(Reference { base: Some(base), name }) => self.put(*base, *name, value),
            Operand::Reference(Reference { base: None, name }) => {
                let global = self.realm.global;
                self.put(global, *name, value)
            }
            Operand::Value(_) => Err(self.throw_error(ErrorKind::ReferenceError, "invalid assignment target")),
        }
    }

    /// A member reference `base[name]`; the base is converted with ToObject.
    pub(crate) fn member_reference(&mut self, base: &JsValue, name: &JsValue) -> JsResult<Reference> {
        let object = self.to_object(base)?;
        let name = self.to_property_name(name)?;
        Ok(Reference {
            base: Some(object),
            name,
        })
    }

    pub(crate) fn binary_op(&mut self, op: BinaryOp, left: &JsValue, right: &JsValue) -> JsResult<JsValue> {
        match op {
            BinaryOp::Add => {
                let l = self.to_primitive(left, None)?;
                let r = self.to_primitive(right, None)?;
                Ok(primitive_add(&l, &r))
            }
            BinaryOp::Eq => Ok(JsValue::Boolean(self.loose_equals(left, right)?)),
            BinaryOp::NotEq => Ok(JsValue::Boolean(!self.loose_equals(left, right)?)),
            BinaryOp::StrictEq => Ok(JsValue::Boolean(self.strict_equals(left, right))),
            BinaryOp::StrictNotEq => Ok(JsValue::Boolean(!self.strict_equals(left, right))),
            BinaryOp::Lt => Ok(JsValue::Boolean(self.less_than(left, right)? == Some(true))),
            BinaryOp::Gt => Ok(JsValue::Boolean(self.less_than(right, left)? == Some(true))),
            BinaryOp::LtEq => Ok(JsValue::Boolean(self.less_than(right, left)? == Some(false))),
            BinaryOp::GtEq => Ok(JsValue::Boolean(self.less_than(left, right)? == Some(false))),
            BinaryOp::Instanceof => {
                let JsValue::Object(func) = right else {
                    return Err(self.throw_error(
                        ErrorKind::TypeError,
                        "right-hand side of instanceof is not an object",
                    ));
                };
                Ok(JsValue::Boolean(self.has_instance(*func, left)?))
            }
            BinaryOp::In => {
                let JsValue::Object(obj) = right else {
                    return Err(self.throw_error(ErrorKind::TypeError, "right-hand side of 'in' is not an object"));
                };
                let name = self.to_property_name(left)?;
                Ok(JsValue::Boolean(self.has_property(*obj, name)?))
            }
            _ => {
                let a = self.to_number(left)?;
                let b = self.to_number(right)?;
                match numeric_binary(op, a, b) {
                    Some(n) => Ok(JsValue::Number(n)),
                    None => self.abort("unhandled binary operator"),
                }
            }
        }
    }

    // §11.8.5; `x` is converted first
    fn less_than(&mut self, x: &JsValue, y: &JsValue) -> JsResult<Option<bool>> {
        let px = self.to_primitive(x, Some(Hint::Number))?;
        let py = self.to_primitive(y, Some(Hint::Number))?;
        Ok(primitive_less_than(&px, &py))
    }

    // §11.9.3 abstract equality
    pub fn loose_equals(&mut self, a: &JsValue, b: &JsValue) -> JsResult<bool> {
        match (a, b) {
            (JsValue::Object(x), JsValue::Object(y)) => Ok(self.joined(*x, *y)),
            (JsValue::Object(_), JsValue::Number(_) | JsValue::String(_)) => {
                let pa = self.to_primitive(a, None)?;
                self.loose_equals(&pa, b)
            }
            (JsValue::Number(_) | JsValue::String(_), JsValue::Object(_)) => {
                let pb = self.to_primitive(b, None)?;
                self.loose_equals(a, &pb)
            }
            (JsValue::Boolean(_), JsValue::Object(_)) => {
                self.loose_equals(&JsValue::Number(primitive_to_number(a)), b)
            }
            (JsValue::Object(_), JsValue::Boolean(_)) => {
                self.loose_equals(a, &JsValue::Number(primitive_to_number(b)))
            }
            (JsValue::Object(_), _) | (_, JsValue::Object(_)) => Ok(false),
            _ => Ok(primitive_loose_equals(a, b)),
        }
    }

    // §11.9.6 strict equality; joined objects are equal
    pub fn strict_equals(&self, a: &JsValue, b: &JsValue) -> bool {
        strict_equals_with(a, b, |x, y| self.joined(x, y))
    }

    // §11.4.3 typeof
    pub fn type_of(&self, value: &JsValue) -> &'static str {
        match value {
            JsValue::Object(_) if self.is_callable(value) => "function",
            _ => value.type_name(),
        }
    }

    /// typeof applied to an operand: unresolved references give "undefined".
    pub(crate) fn type_of_operand(&mut self, operand: Operand) -> JsResult<JsString> {
        if let Operand::Reference(Reference { base: None, .. }) = operand {
            return Ok(JsString::from_str("undefined"));
        }
        let value = self.get_value(operand)?;
        Ok(JsString::from_str(self.type_of(&value)))
    }

    // §11.4.1 delete
    pub(crate) fn delete_operand(&mut self, operand: Operand) -> JsResult<bool> {
        match operand {
            Operand::Reference(Reference { base: Some(base), name }) => self.delete(base, name),
            Operand::Reference(Reference { base: None, .. }) | Operand::Value(_) => Ok(true),
        }
    }

    /// `++`/`--`: returns (old number, new number) after storing the new one.
    pub(crate) fn update_operand(&mut self, operand: &Operand, delta: f64) -> JsResult<(f64, f64)> {
        let old = self.get_value(operand.clone())?;
        let old = self.to_number(&old)?;
        let new = old + delta;
        self.put_value(operand, JsValue::Number(new))?;
        Ok((old, new))
    }

    /// Calls the value of a call expression's callee. `this` is the base of
    /// a member reference, or the global object for anything else. A direct
    /// call of the global `eval` runs in the caller's context.
    pub(crate) fn call_operand(&mut self, callee: Operand, args: &[JsValue]) -> JsResult<JsValue> {
        let this = match &callee {
            Operand::Reference(Reference { base: Some(base), .. }) if !self.is_activation(*base) => Some(*base),
            _ => None,
        };
        let func = self.get_value(callee)?;
        let JsValue::Object(func_id) = func else {
            let msg = format!("{} is not a function", primitive_to_string(&func));
            return Err(self.throw_error(ErrorKind::TypeError, &msg));
        };
        if !self.is_callable(&func) {
            return Err(self.throw_error(ErrorKind::TypeError, "object is not a function"));
        }
        if func_id == self.realm.eval_function {
            return self.direct_eval(args);
        }
        let this = JsValue::Object(this.unwrap_or(self.realm.global));
        self.call_object(func_id, this, args)
    }

    pub(crate) fn construct_value(&mut self, callee: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
        let JsValue::Object(func) = callee else {
            let msg = format!("{} is not a constructor", primitive_to_string(callee));
            return Err(self.throw_error(ErrorKind::TypeError, &msg));
        };
        self.construct_object(*func, args)
    }

    /// Converts a value for display by the host; exceptions from user
    /// conversions fall back to a bracketed class name.
    pub fn value_to_string(&mut self, value: &JsValue) -> String {
        match value {
            JsValue::Object(id) => {
                let id = *id;
                match self.protect(|interp| interp.to_string(&JsValue::Object(id))) {
                    Ok(s) => s.to_rust_string(),
                    Err(_) => {
                        let class = self.class_of(id).class_name();
                        format!("[object {class}]")
                    }
                }
            }
            _ => primitive_to_string(value).to_rust_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &str) -> JsValue {
        JsValue::string(text)
    }

    #[test]
    fn to_boolean_table() {
        assert!(!to_boolean(&JsValue::Number(f64::NAN)));
        assert!(!to_boolean(&JsValue::Number(-0.0)));
        assert!(!to_boolean(&s("")));
        assert!(to_boolean(&s("0")));
        assert!(!to_boolean(&JsValue::Null));
    }

    #[test]
    fn string_to_number() {
        assert_eq!(primitive_to_number(&s("  12.5 \n")), 12.5);
        assert_eq!(primitive_to_number(&s("")), 0.0);
        assert_eq!(primitive_to_number(&s("0x1F")), 31.0);
        assert!(primitive_to_number(&s("12px")).is_nan());
        assert_eq!(primitive_to_number(&s("-Infinity")), f64::NEG_INFINITY);
    }

    #[test]
    fn addition_prefers_strings() {
        assert_eq!(primitive_add(&s("a"), &JsValue::Number(1.0)), s("a1"));
        assert_eq!(primitive_add(&JsValue::Boolean(true), &JsValue::Number(1.0)), JsValue::Number(2.0));
        assert_eq!(primitive_add(&JsValue::Null, &JsValue::Undefined).to_string(), "NaN");
    }

    #[test]
    fn loose_equality_of_primitives() {
        assert!(primitive_loose_equals(&JsValue::Null, &JsValue::Undefined));
        assert!(!primitive_loose_equals(&JsValue::Null, &JsValue::Number(0.0)));
        assert!(primitive_loose_equals(&s("1"), &JsValue::Boolean(true)));
        assert!(primitive_loose_equals(&s(" 2 "), &JsValue::Number(2.0)));
        assert!(!primitive_loose_equals(&JsValue::Number(f64::NAN), &JsValue::Number(f64::NAN)));
    }

    #[test]
    fn relational_comparison_with_nan_is_false_both_ways() {
        let nan = JsValue::Number(f64::NAN);
        let one = JsValue::Number(1.0);
        for op in [BinaryOp::Lt, BinaryOp::Gt, BinaryOp::LtEq, BinaryOp::GtEq] {
            assert_eq!(fold_binary(op, &nan, &one), Some(JsValue::Boolean(false)));
        }
        assert_eq!(fold_binary(BinaryOp::Lt, &s("a"), &s("b")), Some(JsValue::Boolean(true)));
    }

    #[test]
    fn fold_refuses_object_operators() {
        assert_eq!(fold_binary(BinaryOp::In, &s("a"), &s("b")), None);
        assert_eq!(
            fold_binary(BinaryOp::URShift, &JsValue::Number(-1.0), &JsValue::Number(0.0)),
            Some(JsValue::Number(4294967295.0))
        );
    }

    #[test]
    fn unresolved_reference_read_and_write() {
        let mut interp = Interpreter::new(Config::default());
        let v = interp
            .evaluate("t", "var r; try { nosuch; } catch (e) { r = e.name; } r")
            .unwrap();
        assert_eq!(v, Some(s("ReferenceError")));
        interp.evaluate("t", "created = 5").unwrap();
        let name = interp.intern("created");
        let global = interp.global_object();
        assert_eq!(interp.get(global, name).unwrap(), JsValue::Number(5.0));
    }

    #[test]
    fn undefdef_reads_unresolved_as_undefined() {
        let mut interp = Interpreter::new(Config {
            compat: CompatFlags::UNDEFDEF,
            ..Config::default()
        });
        assert_eq!(interp.evaluate("t", "typeof nosuch + ':' + nosuch").unwrap(), Some(s("undefined:undefined")));
    }

    #[test]
    fn wrappers_convert_back() {
        let mut interp = Interpreter::new(Config::default());
        let v = interp
            .evaluate("t", "var n = new Number(4); var b = new Boolean(false); (n + 1) + ':' + (b ? 'y' : 'n') + ':' + ('ab'.length)")
            .unwrap();
        assert_eq!(v, Some(s("5:y:2")));
    }
}
