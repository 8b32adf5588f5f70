pub(crate) mod array;
mod boolean;
mod error;
mod function;
mod global;
mod math;
mod number;
mod object;
mod string;

use super::*;

/// The `i`th argument, or undefined when absent.
pub(crate) fn arg(args: &[JsValue], i: usize) -> JsValue {
    args.get(i).cloned().unwrap_or(JsValue::Undefined)
}

const CONSTANT: Attributes = Attributes::READ_ONLY
    .union(Attributes::DONT_ENUM)
    .union(Attributes::DONT_DELETE);

impl Interpreter {
    /// Builds the global object and every intrinsic reachable from it.
    pub(crate) fn setup_globals(&mut self) {
        let object_class = self.classes.object.clone();
        let object_prototype = self.new_object_with(object_class, None, ObjectKind::Ordinary);
        self.realm.object_prototype = object_prototype;

        // §15.3.4: Function.prototype is itself a function returning undefined
        let function_class = self.classes.native_function.clone();
        let function_prototype = self.new_object_with(
            function_class,
            Some(object_prototype),
            ObjectKind::Native(NativeFunction {
                name: "",
                length: 0,
                call: |_interp, _this, _args| Ok(JsValue::Undefined),
                construct: None,
            }),
        );
        self.define_property(function_prototype, atoms::LENGTH, JsValue::Number(0.0), CONSTANT);
        self.realm.function_prototype = function_prototype;

        let global_class = self.classes.global.clone();
        let global = self.new_object_with(global_class, Some(object_prototype), ObjectKind::Ordinary);
        self.realm.global = global;

        self.setup_object();
        self.setup_function();
        self.setup_array();
        self.setup_string();
        self.setup_number();
        self.setup_boolean();
        self.setup_math();
        self.setup_errors();
        self.setup_global_functions();
    }

    /// Creates a built-in function object with a read-only `length`.
    pub fn create_function(&mut self, name: &'static str, length: u32, call: NativeFn) -> ObjectId {
        self.create_native(NativeFunction {
            name,
            length,
            call,
            construct: None,
        })
    }

    fn create_native(&mut self, native: NativeFunction) -> ObjectId {
        let class = self.classes.native_function.clone();
        let proto = self.realm.function_prototype;
        let length = native.length;
        let func = self.new_object_with(class, Some(proto), ObjectKind::Native(native));
        self.define_property(func, atoms::LENGTH, JsValue::Number(length as f64), CONSTANT);
        func
    }

    /// Creates a constructor wired to `prototype` in both directions and
    /// binds it on the global object.
    pub(crate) fn create_constructor(
        &mut self,
        name: &'static str,
        length: u32,
        call: NativeFn,
        construct: NativeFn,
        prototype: ObjectId,
    ) -> ObjectId {
        let ctor = self.create_native(NativeFunction {
            name,
            length,
            call,
            construct: Some(construct),
        });
        self.define_property(ctor, atoms::PROTOTYPE, JsValue::Object(prototype), CONSTANT);
        self.define_property(prototype, atoms::CONSTRUCTOR, JsValue::Object(ctor), Attributes::DONT_ENUM);
        let global = self.realm.global;
        let atom = self.intern(name);
        self.define_property(global, atom, JsValue::Object(ctor), Attributes::DONT_ENUM);
        self.realm.intrinsics.push(ctor);
        ctor
    }

    /// Adds a non-enumerable built-in method to `obj`.
    pub(crate) fn define_method(&mut self, obj: ObjectId, name: &'static str, length: u32, call: NativeFn) {
        let func = self.create_function(name, length, call);
        let atom = self.intern(name);
        self.define_property(obj, atom, JsValue::Object(func), Attributes::DONT_ENUM);
    }

    pub(crate) fn define_constant(&mut self, obj: ObjectId, name: &str, value: JsValue) {
        let atom = self.intern(name);
        self.define_property(obj, atom, value, CONSTANT);
    }

    /// Resolves the `this` of a built-in call to an object; a missing `this`
    /// means the global object.
    pub(crate) fn this_object(&mut self, this: &JsValue) -> JsResult<ObjectId> {
        match this {
            JsValue::Object(id) => Ok(*id),
            JsValue::Undefined | JsValue::Null => Ok(self.realm.global),
            primitive => self.to_object(primitive),
        }
    }

    /// The primitive wrapped by `this` when it is a primitive of the wanted
    /// type or a wrapper object around one.
    pub(crate) fn this_primitive(&self, this: &JsValue) -> Option<JsValue> {
        match this {
            JsValue::Object(id) => self.object(*id).and_then(|o| o.primitive_value()),
            other => Some(other.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(src: &str) -> String {
        let mut interp = Interpreter::new(Config::default());
        let v = interp.evaluate("builtins", src).unwrap().unwrap_or(JsValue::Undefined);
        interp.value_to_string(&v)
    }

    #[test]
    fn global_constants_are_not_deletable() {
        assert_eq!(run("typeof NaN + ':' + Infinity + ':' + typeof undefined"), "number:Infinity:undefined");
        assert_eq!(run("delete NaN"), "false");
    }

    #[test]
    fn constructors_are_not_enumerable_on_global() {
        assert_eq!(run("var s = ''; for (var k in this) s += k + ','; s"), "s,k,");
    }

    #[test]
    fn builtin_lengths_are_read_only() {
        assert_eq!(run("Array.prototype.push.length = 9; Array.prototype.push.length"), "1");
        assert_eq!(run("Object.length + ':' + Function.prototype.length"), "1:0");
    }

    #[test]
    fn prototype_links_to_constructor() {
        assert_eq!(
            run("(Object.prototype.constructor === Object) + ':' + (String.prototype.constructor === String)"),
            "true:true"
        );
        assert_eq!(run("Function.prototype()"), "undefined");
    }
}
