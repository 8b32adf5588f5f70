use super::*;

impl Interpreter {
    pub(super) fn setup_boolean(&mut self) {
        let class = self.classes.boolean.clone();
        let object_prototype = self.realm.object_prototype;
        let proto = self.new_object_with(class, Some(object_prototype), ObjectKind::Boolean(false));
        self.realm.boolean_prototype = proto;
        self.create_constructor(
            "Boolean",
            1,
            |_interp, _this, args| Ok(JsValue::Boolean(to_boolean(&arg(args, 0)))),
            |interp, _this, args| {
                let value = JsValue::Boolean(to_boolean(&arg(args, 0)));
                Ok(JsValue::Object(interp.wrap_primitive(value)))
            },
            proto,
        );

        self.define_method(proto, "toString", 0, |interp, this, _args| match interp.this_primitive(&this) {
            Some(JsValue::Boolean(b)) => Ok(JsValue::string(if b { "true" } else { "false" })),
            _ => Err(interp.throw_error(ErrorKind::TypeError, "Boolean.prototype.toString called on incompatible object")),
        });
        self.define_method(proto, "valueOf", 0, |interp, this, _args| match interp.this_primitive(&this) {
            Some(value @ JsValue::Boolean(_)) => Ok(value),
            _ => Err(interp.throw_error(ErrorKind::TypeError, "Boolean.prototype.valueOf called on incompatible object")),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(src: &str) -> String {
        let mut interp = Interpreter::new(Config::default());
        let v = interp.evaluate("boolean", src).unwrap().unwrap_or(JsValue::Undefined);
        interp.value_to_string(&v)
    }

    #[test]
    fn boolean_objects() {
        assert_eq!(run("Boolean('') + ':' + Boolean('x') + ':' + new Boolean(false).toString()"), "false:true:false");
        assert_eq!(run("if (new Boolean(false)) 'truthy'; else 'falsy';"), "truthy");
    }
}
