use super::*;
use crate::types::number_ops;

impl Interpreter {
    pub(crate) fn eval_value(&mut self, expr: &Expression) -> JsResult<JsValue> {
        let operand = self.eval_expr(expr)?;
        self.get_value(operand)
    }

    /// Evaluates an expression to a value or an unresolved reference.
    pub(crate) fn eval_expr(&mut self, expr: &Expression) -> JsResult<Operand> {
        let value = match expr {
            Expression::Literal(lit) => literal_value(lit),
            Expression::Identifier(name) => return Ok(Operand::Reference(self.lookup(*name)?)),
            Expression::This => JsValue::Object(self.context().this),
            Expression::Array(elements) => self.eval_array_literal(elements)?,
            Expression::Object(props) => {
                let obj = self.new_object();
                for (name, value) in props {
                    let value = self.eval_value(value)?;
                    self.put(obj, *name, value)?;
                }
                JsValue::Object(obj)
            }
            Expression::Function(literal) => JsValue::Object(self.function_expression(literal)),
            Expression::Unary(op, operand) => self.eval_unary(*op, operand)?,
            Expression::Update(op, prefix, target) => {
                let delta = match op {
                    UpdateOp::Increment => 1.0,
                    UpdateOp::Decrement => -1.0,
                };
                let target = self.eval_expr(target)?;
                let (old, new) = self.update_operand(&target, delta)?;
                JsValue::Number(if *prefix { new } else { old })
            }
            Expression::Binary(op, left, right) => {
                let l = self.eval_value(left)?;
                let r = self.eval_value(right)?;
                self.binary_op(*op, &l, &r)?
            }
            Expression::Logical(op, left, right) => {
                let l = self.eval_value(left)?;
                match (op, to_boolean(&l)) {
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => l,
                    _ => self.eval_value(right)?,
                }
            }
            Expression::Conditional(test, consequent, alternate) => {
                let test = self.eval_value(test)?;
                if to_boolean(&test) {
                    self.eval_value(consequent)?
                } else {
                    self.eval_value(alternate)?
                }
            }
            Expression::Assign(op, target, value) => self.eval_assign(*op, target, value)?,
            Expression::Call(callee, args) => {
                let callee = self.eval_expr(callee)?;
                let args = self.eval_arguments(args)?;
                self.call_operand(callee, &args)?
            }
            Expression::New(callee, args) => {
                let callee = self.eval_value(callee)?;
                let args = self.eval_arguments(args)?;
                self.construct_value(&callee, &args)?
            }
            Expression::Member(object, property) => {
                let base = self.eval_value(object)?;
                let reference = match property {
                    MemberProperty::Dot(name) => Reference {
                        base: Some(self.to_object(&base)?),
                        name: *name,
                    },
                    MemberProperty::Computed(expr) => {
                        let name = self.eval_value(expr)?;
                        self.member_reference(&base, &name)?
                    }
                };
                return Ok(Operand::Reference(reference));
            }
            Expression::Sequence(exprs) => {
                let mut last = JsValue::Undefined;
                for e in exprs {
                    last = self.eval_value(e)?;
                }
                last
            }
        };
        Ok(Operand::Value(value))
    }

    fn eval_arguments(&mut self, args: &[Expression]) -> JsResult<Vec<JsValue>> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval_value(arg)?);
        }
        Ok(values)
    }

    // §11.1.4: trailing elisions still count towards the length
    fn eval_array_literal(&mut self, elements: &[Option<Expression>]) -> JsResult<JsValue> {
        let array = self.new_array();
        for (i, element) in elements.iter().enumerate() {
            if let Some(expr) = element {
                let value = self.eval_value(expr)?;
                let index = self.index_atom(i as u32);
                self.put(array, index, value)?;
            }
        }
        self.put(array, atoms::LENGTH, JsValue::Number(elements.len() as f64))?;
        Ok(JsValue::Object(array))
    }

    fn eval_unary(&mut self, op: UnaryOp, operand: &Expression) -> JsResult<JsValue> {
        match op {
            UnaryOp::Delete => {
                let target = self.eval_expr(operand)?;
                Ok(JsValue::Boolean(self.delete_operand(target)?))
            }
            UnaryOp::Typeof => {
                let target = self.eval_expr(operand)?;
                Ok(JsValue::String(self.type_of_operand(target)?))
            }
            UnaryOp::Void => {
                self.eval_value(operand)?;
                Ok(JsValue::Undefined)
            }
            UnaryOp::Not => {
                let v = self.eval_value(operand)?;
                Ok(JsValue::Boolean(!to_boolean(&v)))
            }
            UnaryOp::Minus => {
                let v = self.eval_value(operand)?;
                Ok(JsValue::Number(-self.to_number(&v)?))
            }
            UnaryOp::Plus => {
                let v = self.eval_value(operand)?;
                Ok(JsValue::Number(self.to_number(&v)?))
            }
            UnaryOp::BitNot => {
                let v = self.eval_value(operand)?;
                Ok(JsValue::Number(number_ops::bitwise_not(self.to_number(&v)?)))
            }
        }
    }

    // §11.13
    fn eval_assign(&mut self, op: AssignOp, target: &Expression, value: &Expression) -> JsResult<JsValue> {
        let target = self.eval_expr(target)?;
        let result = match op.binary_op() {
            None => self.eval_value(value)?,
            Some(bop) => {
                let old = self.get_value(target.clone())?;
                let rhs = self.eval_value(value)?;
                self.binary_op(bop, &old, &rhs)?
            }
        };
        self.put_value(&target, result.clone())?;
        Ok(result)
    }
}

pub(crate) fn literal_value(lit: &Literal) -> JsValue {
    match lit {
        Literal::Null => JsValue::Null,
        Literal::Boolean(b) => JsValue::Boolean(*b),
        Literal::Number(n) => JsValue::Number(*n),
        Literal::String(s) => JsValue::String(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(src: &str) -> String {
        let mut interp = Interpreter::new(Config::default());
        let v = interp.evaluate("eval", src).unwrap().unwrap_or(JsValue::Undefined);
        interp.value_to_string(&v)
    }

    #[test]
    fn operands_evaluate_left_to_right() {
        assert_eq!(
            run("var log = ''; function a() { log += 'a'; return 1; } function b() { log += 'b'; return 2; } a() + b(); log"),
            "ab"
        );
        assert_eq!(
            run("var log = ''; var o = { valueOf: function () { log += 'o'; return 1; } }; \
                 var p = { valueOf: function () { log += 'p'; return 2; } }; o < p; p > o; log"),
            "opop"
        );
    }

    #[test]
    fn greater_than_converts_right_operand_first() {
        assert_eq!(
            run("var log = ''; var o = { valueOf: function () { log += 'o'; return 1; } }; \
                 var p = { valueOf: function () { log += 'p'; return 2; } }; o > p; log"),
            "po"
        );
    }

    #[test]
    fn compound_assignment_reads_before_rhs() {
        assert_eq!(run("var x = 1; x += (x = 10); x"), "11");
        assert_eq!(run("var o = { n: 'a' }; o.n += 'b'; o['n'] += 'c'; o.n"), "abc");
    }

    #[test]
    fn update_expressions() {
        assert_eq!(run("var i = 5; var a = i++; var b = ++i; a + ',' + b + ',' + i"), "5,7,7");
        assert_eq!(run("var s = '3'; s--; s"), "2");
    }

    #[test]
    fn logical_operators_return_operands() {
        assert_eq!(run("(0 || 'x') + (1 && 'y') + (null && boom())"), "xynull");
    }

    #[test]
    fn typeof_and_delete() {
        assert_eq!(run("typeof undeclared + typeof null + typeof function () {} + typeof 1"), "undefinedobjectfunctionnumber");
        assert_eq!(run("var o = { a: 1 }; delete o.a; 'a' in o"), "false");
        assert_eq!(run("var v = 1; delete v"), "false");
        assert_eq!(run("delete 5"), "true");
    }

    #[test]
    fn assignment_to_non_reference_throws() {
        let mut interp = Interpreter::new(Config::default());
        let v = interp
            .evaluate("t", "var r; function f() {} try { f() = 1; } catch (e) { r = e.name; } r")
            .unwrap();
        assert_eq!(v, Some(JsValue::string("ReferenceError")));
    }

    #[test]
    fn method_calls_bind_this_to_base() {
        assert_eq!(run("var o = { v: 7, m: function () { return this.v; } }; o.m() + o['m']()"), "14");
        assert_eq!(run("var v = 'global'; function f() { return this.v; } f()"), "global");
        assert_eq!(run("'abc'.charAt(1)"), "b");
    }

    #[test]
    fn array_literal_with_elisions() {
        assert_eq!(run("var a = [1, , 3, ]; a.length + ':' + (1 in a) + ':' + a[2]"), "3:false:3");
        assert_eq!(run("[,,].length"), "2");
    }

    #[test]
    fn calling_non_function_is_a_type_error() {
        assert_eq!(run("var r; try { (1)(); } catch (e) { r = e.name; } r"), "TypeError");
        assert_eq!(run("var r; try { new 5; } catch (e) { r = e.name; } r"), "TypeError");
    }

    #[test]
    fn equality_table() {
        assert_eq!(run("(null == undefined) + ',' + (null == 0) + ',' + ('1' == 1) + ',' + (true == 1) + ',' + (NaN == NaN)"), "true,false,true,true,false");
        assert_eq!(run("var o = {}; (o == o) + ',' + (o == {}) + ',' + ({ valueOf: function () { return 3; } } == 3)"), "true,false,true");
    }
}
